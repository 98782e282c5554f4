//! Request mode resolution
//!
//! A discussion request addresses at most one entity chain (group, forum,
//! topic, message), arrives through one of three surfaces, and may carry an
//! action name and a preview flag. `resolve_modes` turns that context into
//! the ordered list of modes the dispatcher executes.
//!
//! The mapping is a single data table rather than branching code, so the
//! whole behavior can be read (and tested) row by row. Resolution is by
//! precedence: the most specific addressed entity picks the branch, the
//! surface picks the sub-table, the action and preview flag pick the row.
//! A surface with no sub-table for a branch (the administrative surface
//! never acts on an addressed topic or message) falls through to the next
//! addressed entity.

use serde::Serialize;

/// Where the discussion engine was invoked from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// The plain discussion board UI
    Standalone,
    /// The administration panel
    Admin,
    /// Embedded in another page, which renders around the result
    Embedded,
}

/// A named unit of work executed by the dispatcher
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    GroupPostAdd,
    GroupPostEdit,
    GroupsDelete,
    AdminGroupList,
    ForumAdd,
    ForumPostAdd,
    ForumPostEdit,
    ForumDelete,
    ForumsDelete,
    ForumList,
    AdminForumList,
    TopicAdd,
    TopicQuote,
    TopicPostAdd,
    TopicEdit,
    TopicPostEdit,
    TopicMove,
    TopicPostMove,
    TopicDelete,
    TopicList,
    MessageList,
    EmbeddedMessageList,
    MessageQuote,
    MessagePostAdd,
    MessageEdit,
    MessagePostEdit,
    MessageDelete,
    MessageSetDisplay,
}

impl Mode {
    /// The result-view name reported to the caller
    pub fn view_name(&self) -> &'static str {
        match self {
            Mode::GroupPostAdd => "group-post-add",
            Mode::GroupPostEdit => "group-post-edit",
            Mode::GroupsDelete => "groups-delete",
            Mode::AdminGroupList => "admin-group-list",
            Mode::ForumAdd => "forum-add",
            Mode::ForumPostAdd => "forum-post-add",
            Mode::ForumPostEdit => "forum-post-edit",
            Mode::ForumDelete => "forum-delete",
            Mode::ForumsDelete => "forums-delete",
            Mode::ForumList => "forum-list",
            Mode::AdminForumList => "admin-forum-list",
            Mode::TopicAdd => "topic-add",
            Mode::TopicQuote => "topic-quote",
            Mode::TopicPostAdd => "topic-post-add",
            Mode::TopicEdit => "topic-edit",
            Mode::TopicPostEdit => "topic-post-edit",
            Mode::TopicMove => "topic-move",
            Mode::TopicPostMove => "topic-post-move",
            Mode::TopicDelete => "topic-delete",
            Mode::TopicList => "topic-list",
            Mode::MessageList => "message-list",
            Mode::EmbeddedMessageList => "embedded-message-list",
            Mode::MessageQuote => "message-quote",
            Mode::MessagePostAdd => "message-post-add",
            Mode::MessageEdit => "message-edit",
            Mode::MessagePostEdit => "message-post-edit",
            Mode::MessageDelete => "message-delete",
            Mode::MessageSetDisplay => "message-set-display",
        }
    }
}

/// Entity-presence branch, most specific first
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Branch {
    Message,
    Topic,
    Forum,
    Group,
    /// Nothing addressed
    Root,
}

/// One resolution rule
///
/// `action` None is the branch default and also catches unrecognized
/// actions. `preview` and `group_is_zero` None mean "don't care". Within a
/// (branch, surface) sub-table the first matching rule wins, so rows with
/// a preview flag sit above their preview-insensitive sibling.
struct Rule {
    branch: Branch,
    surface: Surface,
    action: Option<&'static str>,
    preview: Option<bool>,
    group_is_zero: Option<bool>,
    modes: &'static [Mode],
}

const fn rule(
    branch: Branch,
    surface: Surface,
    action: Option<&'static str>,
    preview: Option<bool>,
    group_is_zero: Option<bool>,
    modes: &'static [Mode],
) -> Rule {
    Rule {
        branch,
        surface,
        action,
        preview,
        group_is_zero,
        modes,
    }
}

use Branch::*;
use Mode::*;
use Surface::*;

#[rustfmt::skip]
static RULES: &[Rule] = &[
    // ----- message addressed, embedded surface ---------------------------
    rule(Message, Embedded, Some("add"), None, None, &[EmbeddedMessageList]),
    rule(Message, Embedded, Some("quote"), None, None, &[MessageQuote, EmbeddedMessageList]),
    rule(Message, Embedded, Some("post-add"), Some(true), None, &[EmbeddedMessageList]),
    rule(Message, Embedded, Some("post-add"), None, None, &[MessagePostAdd, EmbeddedMessageList]),
    rule(Message, Embedded, Some("edit"), None, None, &[MessageEdit, EmbeddedMessageList]),
    rule(Message, Embedded, Some("post-edit"), Some(true), None, &[EmbeddedMessageList]),
    rule(Message, Embedded, Some("post-edit"), None, None, &[MessagePostEdit, EmbeddedMessageList]),
    rule(Message, Embedded, Some("delete"), None, None, &[MessageDelete, EmbeddedMessageList]),
    rule(Message, Embedded, Some("set-display"), None, None, &[MessageSetDisplay, EmbeddedMessageList]),
    rule(Message, Embedded, None, None, None, &[EmbeddedMessageList]),
    // ----- message addressed, standalone surface -------------------------
    rule(Message, Standalone, Some("add"), None, None, &[MessageList]),
    rule(Message, Standalone, Some("quote"), None, None, &[MessageQuote, MessageList]),
    rule(Message, Standalone, Some("post-add"), Some(true), None, &[MessageList]),
    rule(Message, Standalone, Some("post-add"), None, None, &[MessagePostAdd, MessageList]),
    rule(Message, Standalone, Some("edit"), None, None, &[MessageEdit, MessageList]),
    rule(Message, Standalone, Some("post-edit"), Some(true), None, &[MessageList]),
    rule(Message, Standalone, Some("post-edit"), None, None, &[MessagePostEdit, MessageList]),
    rule(Message, Standalone, Some("delete"), None, None, &[MessageDelete, MessageList]),
    rule(Message, Standalone, Some("set-display"), None, None, &[MessageSetDisplay, MessageList]),
    rule(Message, Standalone, None, None, None, &[MessageList]),
    // (no administrative sub-table for an addressed message)

    // ----- topic addressed, embedded surface ------------------------------
    rule(Topic, Embedded, Some("add"), None, None, &[EmbeddedMessageList]),
    rule(Topic, Embedded, Some("quote"), None, None, &[TopicQuote, EmbeddedMessageList]),
    rule(Topic, Embedded, Some("post-add"), Some(true), None, &[EmbeddedMessageList]),
    rule(Topic, Embedded, Some("post-add"), None, None, &[MessagePostAdd, EmbeddedMessageList]),
    rule(Topic, Embedded, Some("edit"), None, None, &[TopicEdit, EmbeddedMessageList]),
    rule(Topic, Embedded, Some("post-edit"), Some(true), None, &[EmbeddedMessageList]),
    rule(Topic, Embedded, Some("post-edit"), None, None, &[TopicPostEdit, EmbeddedMessageList]),
    rule(Topic, Embedded, Some("set-display"), None, None, &[MessageSetDisplay, EmbeddedMessageList]),
    rule(Topic, Embedded, None, None, None, &[EmbeddedMessageList]),
    // ----- topic addressed, standalone surface ----------------------------
    rule(Topic, Standalone, Some("add"), None, None, &[MessageList]),
    rule(Topic, Standalone, Some("quote"), None, None, &[TopicQuote, MessageList]),
    rule(Topic, Standalone, Some("post-add"), Some(true), None, &[MessageList]),
    rule(Topic, Standalone, Some("post-add"), None, None, &[MessagePostAdd, MessageList]),
    rule(Topic, Standalone, Some("edit"), None, None, &[TopicEdit, MessageList]),
    rule(Topic, Standalone, Some("post-edit"), Some(true), None, &[MessageList]),
    rule(Topic, Standalone, Some("post-edit"), None, None, &[TopicPostEdit, MessageList]),
    rule(Topic, Standalone, Some("delete"), None, None, &[TopicDelete, TopicList]),
    rule(Topic, Standalone, Some("move"), None, None, &[TopicMove]),
    rule(Topic, Standalone, Some("post-move"), None, None, &[TopicPostMove, TopicList]),
    rule(Topic, Standalone, Some("set-display"), None, None, &[MessageSetDisplay, MessageList]),
    rule(Topic, Standalone, None, None, None, &[MessageList]),
    // (no administrative sub-table for an addressed topic)

    // ----- forum addressed -------------------------------------------------
    rule(Forum, Admin, Some("post-edit"), None, None, &[ForumPostEdit, AdminForumList]),
    rule(Forum, Admin, None, None, None, &[AdminForumList]),
    rule(Forum, Embedded, None, None, None, &[EmbeddedMessageList]),
    rule(Forum, Standalone, Some("add"), None, None, &[TopicAdd]),
    rule(Forum, Standalone, Some("post-add"), Some(true), None, &[TopicAdd]),
    rule(Forum, Standalone, Some("post-add"), None, None, &[TopicPostAdd, TopicList]),
    rule(Forum, Standalone, Some("delete"), None, None, &[ForumDelete, ForumList]),
    rule(Forum, Standalone, None, None, None, &[TopicList]),

    // ----- group addressed --------------------------------------------------
    rule(Group, Admin, Some("post-add"), None, None, &[ForumPostAdd, AdminForumList]),
    rule(Group, Admin, Some("post-edit"), None, None, &[GroupPostEdit, AdminGroupList]),
    rule(Group, Admin, Some("delete"), None, None, &[ForumsDelete, AdminForumList]),
    rule(Group, Admin, None, None, Some(false), &[AdminGroupList]),
    rule(Group, Admin, None, None, Some(true), &[AdminForumList]),
    rule(Group, Embedded, None, None, None, &[EmbeddedMessageList]),
    rule(Group, Standalone, Some("post-add"), None, None, &[ForumPostAdd, ForumList]),
    rule(Group, Standalone, None, None, None, &[ForumList]),

    // ----- nothing addressed ------------------------------------------------
    rule(Root, Admin, Some("post-add"), None, None, &[GroupPostAdd, AdminGroupList]),
    rule(Root, Admin, Some("delete"), None, None, &[GroupsDelete, AdminGroupList]),
    rule(Root, Admin, None, None, None, &[AdminGroupList]),
    rule(Root, Embedded, None, None, None, &[EmbeddedMessageList]),
    rule(Root, Standalone, Some("add"), None, None, &[ForumAdd]),
    rule(Root, Standalone, Some("post-add"), None, None, &[ForumPostAdd, ForumList]),
    rule(Root, Standalone, None, None, None, &[ForumList]),
];

/// Entity presence flags for mode resolution
#[derive(Clone, Copy, Debug, Default)]
pub struct Presence {
    pub has_group: bool,
    pub has_forum: bool,
    pub has_topic: bool,
    pub has_message: bool,
    /// Whether the addressed group is the "no group" bucket
    pub group_is_zero: bool,
}

/// Resolve the ordered mode list for a request context
///
/// Pure and total: every input combination yields a non-empty list, and
/// identical inputs always yield identical output.
pub fn resolve_modes(
    surface: Surface,
    action: Option<&str>,
    preview: bool,
    presence: Presence,
) -> Vec<Mode> {
    let branches = [
        (Branch::Message, presence.has_message),
        (Branch::Topic, presence.has_topic),
        (Branch::Forum, presence.has_forum),
        (Branch::Group, presence.has_group),
        (Branch::Root, true),
    ];

    for (branch, addressed) in branches {
        if !addressed {
            continue;
        }
        let sub_table: Vec<&Rule> = RULES
            .iter()
            .filter(|r| r.branch == branch && r.surface == surface)
            .collect();
        if sub_table.is_empty() {
            // No sub-table for this surface: the next addressed entity
            // decides instead.
            continue;
        }

        // Specific action rows first, branch default last.
        let matched = sub_table
            .iter()
            .find(|r| {
                r.action.is_some()
                    && r.action == action
                    && r.preview.map_or(true, |p| p == preview)
                    && r.group_is_zero.map_or(true, |z| z == presence.group_is_zero)
            })
            .or_else(|| {
                sub_table.iter().find(|r| {
                    r.action.is_none()
                        && r.preview.map_or(true, |p| p == preview)
                        && r.group_is_zero.map_or(true, |z| z == presence.group_is_zero)
                })
            });

        if let Some(rule) = matched {
            return rule.modes.to_vec();
        }
    }

    // The Root/Standalone default above is unconditional; the loop cannot
    // fall out without matching.
    unreachable!("mode table has no row for surface {:?}", surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence(
        has_group: bool,
        has_forum: bool,
        has_topic: bool,
        has_message: bool,
    ) -> Presence {
        Presence {
            has_group,
            has_forum,
            has_topic,
            has_message,
            group_is_zero: false,
        }
    }

    const MESSAGE: Presence = Presence {
        has_group: true,
        has_forum: true,
        has_topic: true,
        has_message: true,
        group_is_zero: false,
    };
    const TOPIC: Presence = Presence {
        has_group: false,
        has_forum: true,
        has_topic: true,
        has_message: false,
        group_is_zero: false,
    };
    const FORUM: Presence = Presence {
        has_group: false,
        has_forum: true,
        has_topic: false,
        has_message: false,
        group_is_zero: false,
    };
    const GROUP: Presence = Presence {
        has_group: true,
        has_forum: false,
        has_topic: false,
        has_message: false,
        group_is_zero: false,
    };
    const ROOT: Presence = Presence {
        has_group: false,
        has_forum: false,
        has_topic: false,
        has_message: false,
        group_is_zero: false,
    };

    /// Every row of the resolution table, checked explicitly.
    #[test]
    fn test_full_mode_table() {
        use Mode::*;
        #[rustfmt::skip]
        let cases: &[(Surface, Option<&str>, bool, Presence, &[Mode])] = &[
            // message branch, standalone
            (Standalone, Some("add"), false, MESSAGE, &[MessageList]),
            (Standalone, Some("quote"), false, MESSAGE, &[MessageQuote, MessageList]),
            (Standalone, Some("post-add"), false, MESSAGE, &[MessagePostAdd, MessageList]),
            (Standalone, Some("post-add"), true, MESSAGE, &[MessageList]),
            (Standalone, Some("edit"), false, MESSAGE, &[MessageEdit, MessageList]),
            (Standalone, Some("post-edit"), false, MESSAGE, &[MessagePostEdit, MessageList]),
            (Standalone, Some("post-edit"), true, MESSAGE, &[MessageList]),
            (Standalone, Some("delete"), false, MESSAGE, &[MessageDelete, MessageList]),
            (Standalone, Some("set-display"), false, MESSAGE, &[MessageSetDisplay, MessageList]),
            (Standalone, None, false, MESSAGE, &[MessageList]),
            (Standalone, Some("bogus"), false, MESSAGE, &[MessageList]),
            // message branch, embedded
            (Embedded, Some("add"), false, MESSAGE, &[EmbeddedMessageList]),
            (Embedded, Some("quote"), false, MESSAGE, &[MessageQuote, EmbeddedMessageList]),
            (Embedded, Some("post-add"), false, MESSAGE, &[MessagePostAdd, EmbeddedMessageList]),
            (Embedded, Some("post-add"), true, MESSAGE, &[EmbeddedMessageList]),
            (Embedded, Some("edit"), false, MESSAGE, &[MessageEdit, EmbeddedMessageList]),
            (Embedded, Some("post-edit"), false, MESSAGE, &[MessagePostEdit, EmbeddedMessageList]),
            (Embedded, Some("post-edit"), true, MESSAGE, &[EmbeddedMessageList]),
            (Embedded, Some("delete"), false, MESSAGE, &[MessageDelete, EmbeddedMessageList]),
            (Embedded, Some("set-display"), false, MESSAGE, &[MessageSetDisplay, EmbeddedMessageList]),
            (Embedded, None, false, MESSAGE, &[EmbeddedMessageList]),
            // topic branch, standalone
            (Standalone, Some("add"), false, TOPIC, &[MessageList]),
            (Standalone, Some("quote"), false, TOPIC, &[TopicQuote, MessageList]),
            (Standalone, Some("post-add"), false, TOPIC, &[MessagePostAdd, MessageList]),
            (Standalone, Some("post-add"), true, TOPIC, &[MessageList]),
            (Standalone, Some("edit"), false, TOPIC, &[TopicEdit, MessageList]),
            (Standalone, Some("post-edit"), false, TOPIC, &[TopicPostEdit, MessageList]),
            (Standalone, Some("post-edit"), true, TOPIC, &[MessageList]),
            (Standalone, Some("delete"), false, TOPIC, &[TopicDelete, TopicList]),
            (Standalone, Some("move"), false, TOPIC, &[TopicMove]),
            (Standalone, Some("post-move"), false, TOPIC, &[TopicPostMove, TopicList]),
            (Standalone, Some("set-display"), false, TOPIC, &[MessageSetDisplay, MessageList]),
            (Standalone, None, false, TOPIC, &[MessageList]),
            // topic branch, embedded (no delete/move rows)
            (Embedded, Some("add"), false, TOPIC, &[EmbeddedMessageList]),
            (Embedded, Some("quote"), false, TOPIC, &[TopicQuote, EmbeddedMessageList]),
            (Embedded, Some("post-add"), false, TOPIC, &[MessagePostAdd, EmbeddedMessageList]),
            (Embedded, Some("post-add"), true, TOPIC, &[EmbeddedMessageList]),
            (Embedded, Some("edit"), false, TOPIC, &[TopicEdit, EmbeddedMessageList]),
            (Embedded, Some("post-edit"), false, TOPIC, &[TopicPostEdit, EmbeddedMessageList]),
            (Embedded, Some("post-edit"), true, TOPIC, &[EmbeddedMessageList]),
            (Embedded, Some("delete"), false, TOPIC, &[EmbeddedMessageList]),
            (Embedded, Some("move"), false, TOPIC, &[EmbeddedMessageList]),
            (Embedded, Some("set-display"), false, TOPIC, &[MessageSetDisplay, EmbeddedMessageList]),
            (Embedded, None, false, TOPIC, &[EmbeddedMessageList]),
            // forum branch
            (Admin, Some("post-edit"), false, FORUM, &[ForumPostEdit, AdminForumList]),
            (Admin, Some("anything"), false, FORUM, &[AdminForumList]),
            (Admin, None, false, FORUM, &[AdminForumList]),
            (Embedded, None, false, FORUM, &[EmbeddedMessageList]),
            (Embedded, Some("post-add"), false, FORUM, &[EmbeddedMessageList]),
            (Standalone, Some("add"), false, FORUM, &[TopicAdd]),
            (Standalone, Some("post-add"), false, FORUM, &[TopicPostAdd, TopicList]),
            (Standalone, Some("post-add"), true, FORUM, &[TopicAdd]),
            (Standalone, Some("delete"), false, FORUM, &[ForumDelete, ForumList]),
            (Standalone, None, false, FORUM, &[TopicList]),
            // group branch
            (Admin, Some("post-add"), false, GROUP, &[ForumPostAdd, AdminForumList]),
            (Admin, Some("post-edit"), false, GROUP, &[GroupPostEdit, AdminGroupList]),
            (Admin, Some("delete"), false, GROUP, &[ForumsDelete, AdminForumList]),
            (Admin, None, false, GROUP, &[AdminGroupList]),
            (Embedded, None, false, GROUP, &[EmbeddedMessageList]),
            (Standalone, Some("post-add"), false, GROUP, &[ForumPostAdd, ForumList]),
            (Standalone, None, false, GROUP, &[ForumList]),
            // nothing addressed
            (Admin, Some("post-add"), false, ROOT, &[GroupPostAdd, AdminGroupList]),
            (Admin, Some("delete"), false, ROOT, &[GroupsDelete, AdminGroupList]),
            (Admin, None, false, ROOT, &[AdminGroupList]),
            (Embedded, None, false, ROOT, &[EmbeddedMessageList]),
            (Standalone, Some("add"), false, ROOT, &[ForumAdd]),
            (Standalone, Some("post-add"), false, ROOT, &[ForumPostAdd, ForumList]),
            (Standalone, None, false, ROOT, &[ForumList]),
            (Standalone, Some("bogus"), false, ROOT, &[ForumList]),
        ];

        for (surface, action, preview, presence, expected) in cases {
            let modes = resolve_modes(*surface, *action, *preview, *presence);
            assert_eq!(
                &modes, expected,
                "surface {:?}, action {:?}, preview {}",
                surface, action, preview
            );
        }
    }

    #[test]
    fn test_group_zero_selects_forum_listing() {
        let zero = Presence {
            has_group: true,
            group_is_zero: true,
            ..Presence::default()
        };
        assert_eq!(
            resolve_modes(Admin, None, false, zero),
            vec![Mode::AdminForumList]
        );
        let nonzero = Presence {
            has_group: true,
            group_is_zero: false,
            ..Presence::default()
        };
        assert_eq!(
            resolve_modes(Admin, None, false, nonzero),
            vec![Mode::AdminGroupList]
        );
    }

    /// The most specific addressed entity decides the branch.
    #[test]
    fn test_precedence_short_circuit() {
        for action in [None, Some("post-add"), Some("delete"), Some("edit")] {
            for preview in [false, true] {
                let full = resolve_modes(Standalone, action, preview, MESSAGE);
                let only_message = resolve_modes(
                    Standalone,
                    action,
                    preview,
                    presence(false, false, false, true),
                );
                assert_eq!(full, only_message);

                let topic_chain = resolve_modes(Standalone, action, preview, TOPIC);
                let only_topic =
                    resolve_modes(Standalone, action, preview, presence(false, false, true, false));
                assert_eq!(topic_chain, only_topic);
            }
        }
    }

    /// The administrative surface has no message/topic sub-tables and
    /// falls through to the next addressed entity.
    #[test]
    fn test_admin_falls_through_addressed_topic() {
        let modes = resolve_modes(Admin, Some("post-edit"), false, MESSAGE);
        // message and topic branches skipped, forum branch decides
        assert_eq!(modes, vec![Mode::ForumPostEdit, Mode::AdminForumList]);

        let topic_no_forum = presence(false, false, true, false);
        assert_eq!(
            resolve_modes(Admin, None, false, topic_no_forum),
            vec![Mode::AdminGroupList]
        );
    }

    /// Resolution is exhaustively total and repeatable.
    #[test]
    fn test_total_and_idempotent() {
        let actions = [
            None,
            Some("add"),
            Some("quote"),
            Some("post-add"),
            Some("edit"),
            Some("post-edit"),
            Some("delete"),
            Some("move"),
            Some("post-move"),
            Some("set-display"),
            Some("unknown-action"),
        ];
        for surface in [Standalone, Admin, Embedded] {
            for action in actions {
                for preview in [false, true] {
                    for bits in 0..32u32 {
                        let presence = Presence {
                            has_group: bits & 1 != 0,
                            has_forum: bits & 2 != 0,
                            has_topic: bits & 4 != 0,
                            has_message: bits & 8 != 0,
                            group_is_zero: bits & 16 != 0,
                        };
                        let first = resolve_modes(surface, action, preview, presence);
                        let second = resolve_modes(surface, action, preview, presence);
                        assert!(!first.is_empty());
                        assert_eq!(first, second);
                    }
                }
            }
        }
    }
}
