//! Action dispatch
//!
//! Executes a resolved mode list against the repository. The whole list
//! runs inside one transaction with a single commit: at the end of the
//! list, or immediately before a redirect cuts the list short. Every mode
//! asserts its capability before touching data, and ownership-gated modes
//! additionally require authorship or moderator standing.
//!
//! Mutation modes finish with a redirect back to the original path so a
//! reload cannot resubmit the form. Message mutations on the embedded
//! surface skip that redirect: the embedding page renders around the
//! result, so the sequence runs to completion instead.

use chrono::Utc;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;

use crate::config::DiscussionConfig;
use crate::entity::message::REPLY_TO_TOPIC;
use crate::entity::{forum, group, message, topic};
use crate::error::{AppError, AppResult};
use crate::modes::{resolve_modes, Mode, Presence, Surface};
use crate::notify::{self, Composer, Mailer, Notification};
use crate::permission::{Capability, CapabilitySource, IdentityDirectory};
use crate::render::TextRenderer;
use crate::repository::{
    self, ForumListing, ForumOrder, GroupListing, GroupOrder, TopicListing, TopicOrder,
};
use crate::session::{DisplayMode, ViewerSession};
use crate::tree::{self, MessageNode};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Posted form values, all optional
#[derive(Clone, Debug, Default)]
pub struct FormFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub moderators: Vec<String>,
    /// Target group for forum add/edit
    pub group: Option<i64>,
    /// Target forum for forum edit
    pub forum: Option<i64>,
    /// Move target
    pub new_forum: Option<i64>,
    /// Bulk-delete selection
    pub selection: Vec<i64>,
    pub order: Option<String>,
    pub asc: Option<bool>,
    pub desc: Option<bool>,
    /// Topic listing offset
    pub start: Option<i64>,
    pub display: Option<String>,
}

/// One discussion request, already stripped of transport concerns
#[derive(Clone, Debug)]
pub struct DiscussionRequest {
    pub surface: Surface,
    pub action: Option<String>,
    pub preview: bool,
    /// Authenticated identity of the caller
    pub authname: String,
    /// Original path, echoed in the post-mutation redirect
    pub path: String,
    pub group_id: Option<i64>,
    pub forum_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub message_id: Option<i64>,
    pub form: FormFields,
}

/// What the caller should do with the result
#[derive(Debug)]
pub enum Outcome {
    Render {
        view: &'static str,
        payload: Box<Payload>,
    },
    Redirect {
        location: String,
    },
}

// ---------------------------------------------------------------------------
// Payload views
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct GroupView {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forums: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ForumView {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub time: i64,
    pub moderators: Vec<String>,
    pub group: i64,
    pub subject: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lasttopic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastreply: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TopicView {
    pub id: i64,
    pub forum: i64,
    pub subject: String,
    pub author: String,
    pub body: String,
    pub time: i64,
    pub lastreply: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<i64>,
    /// Created since the viewer's last visit
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub new: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub forum: i64,
    pub topic: i64,
    pub replyto: i64,
    pub time: i64,
    pub author: String,
    pub body: String,
}

/// Accumulated render data for the result view
#[derive(Debug, Default, Serialize)]
pub struct Payload {
    pub authname: String,
    pub is_moderator: bool,
    /// Server time of the request
    pub time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum: Option<ForumView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<TopicView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forums: Option<Vec<ForumView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<TopicView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<MessageNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<&'static str>,
    /// Known identities for moderator selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<bool>,
    // Raw values refilling an edit form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_moderators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_group: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_body: Option<String>,
    // Rendered previews of submitted form values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_body: Option<String>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Collaborators the dispatcher acts through
pub struct Dispatcher<'a> {
    pub db: &'a DatabaseConnection,
    pub caps: &'a dyn CapabilitySource,
    pub directory: &'a dyn IdentityDirectory,
    pub viewer: &'a dyn ViewerSession,
    pub renderer: &'a dyn TextRenderer,
    pub mailer: &'a dyn Mailer,
    pub discussion: &'a DiscussionConfig,
}

/// Loaded request context, updated as modes execute
struct Exec {
    group: Option<group::Model>,
    forum: Option<forum::Model>,
    topic: Option<topic::Model>,
    message: Option<message::Model>,
    is_moderator: bool,
    topic_new: bool,
    now: i64,
}

enum Flow {
    Continue,
    Redirect,
}

impl<'a> Dispatcher<'a> {
    /// Execute one discussion request
    pub async fn process(&self, req: &DiscussionRequest) -> AppResult<Outcome> {
        let now = Utc::now().timestamp();
        let txn = self.db.begin().await?;

        let mut exec = self.load_entities(&txn, req, now).await?;

        let presence = Presence {
            has_group: exec.group.is_some(),
            has_forum: exec.forum.is_some(),
            has_topic: exec.topic.is_some(),
            has_message: exec.message.is_some(),
            group_is_zero: exec.group.as_ref().map_or(false, |g| g.id == 0),
        };
        let modes = resolve_modes(req.surface, req.action.as_deref(), req.preview, presence);
        tracing::debug!("resolved modes: {:?}", modes);

        let mut payload = Payload {
            authname: req.authname.clone(),
            is_moderator: exec.is_moderator,
            time: now,
            ..Payload::default()
        };
        let mut pending: Vec<Notification> = Vec::new();

        let mut redirect = false;
        for mode in &modes {
            tracing::debug!("executing mode {:?}", mode);
            let flow = self
                .execute_mode(&txn, *mode, req, &mut exec, &mut payload, &mut pending)
                .await?;
            if matches!(flow, Flow::Redirect) {
                redirect = true;
                break;
            }
        }

        txn.commit().await?;

        // The data is committed; delivery is best-effort from here on.
        for notification in pending {
            notify::send_best_effort(self.mailer, notification).await;
        }

        if redirect {
            return Ok(Outcome::Redirect {
                location: req.path.clone(),
            });
        }

        self.fill_addressed_views(&exec, &mut payload);
        Ok(Outcome::Render {
            view: modes.last().expect("mode list is never empty").view_name(),
            payload: Box::new(payload),
        })
    }

    /// Load addressed entities, completing the chain upward
    ///
    /// An identifier that resolves to nothing is treated as not addressed
    /// at all; the resolver then falls back to a broader listing. A loaded
    /// message fills in its topic, and a loaded topic its forum, so the
    /// moderator check always sees the owning forum.
    async fn load_entities(
        &self,
        txn: &DatabaseTransaction,
        req: &DiscussionRequest,
        now: i64,
    ) -> AppResult<Exec> {
        let group = match req.group_id {
            Some(id) => Some(repository::get_group(txn, id).await?),
            None => None,
        };
        let message = match req.message_id {
            Some(id) => repository::get_message(txn, id).await?,
            None => None,
        };
        let topic = match req.topic_id.or(message.as_ref().map(|m| m.topic)) {
            Some(id) => repository::get_topic(txn, id).await?,
            None => None,
        };
        let forum = match req.forum_id.or(topic.as_ref().map(|t| t.forum)) {
            Some(id) => repository::get_forum(txn, id).await?,
            None => None,
        };

        let is_admin = self
            .caps
            .has_capability(&req.authname, Capability::Admin)
            .await;
        let is_moderator = match &forum {
            Some(f) => f.has_moderator(&req.authname) || is_admin,
            None => is_admin,
        };

        Ok(Exec {
            group,
            forum,
            topic,
            message,
            is_moderator,
            topic_new: false,
            now,
        })
    }

    async fn require(&self, authname: &str, capability: Capability) -> AppResult<()> {
        if self.caps.has_capability(authname, capability).await {
            Ok(())
        } else {
            Err(AppError::CapabilityRequired(capability))
        }
    }

    /// Ownership gate for edits: author or moderator
    fn require_author_or_moderator(
        &self,
        exec: &Exec,
        author: &str,
        authname: &str,
        what: &str,
    ) -> AppResult<()> {
        if exec.is_moderator || author == authname {
            Ok(())
        } else {
            Err(AppError::ModerationRequired(what.to_string()))
        }
    }

    /// Moderator gate for move/delete
    fn require_moderator(&self, exec: &Exec) -> AppResult<()> {
        if exec.is_moderator {
            Ok(())
        } else {
            Err(AppError::ModerationRequired("Forum moderate".to_string()))
        }
    }

    async fn execute_mode(
        &self,
        txn: &DatabaseTransaction,
        mode: Mode,
        req: &DiscussionRequest,
        exec: &mut Exec,
        payload: &mut Payload,
        pending: &mut Vec<Notification>,
    ) -> AppResult<Flow> {
        let form = &req.form;
        let authname = req.authname.as_str();

        match mode {
            Mode::ForumList => {
                self.require(authname, Capability::View).await?;

                let order = form.order.clone().unwrap_or_else(|| "id".to_string());
                let asc = form.asc.unwrap_or(true);
                payload.order = Some(order.clone());
                payload.asc = Some(asc);
                payload.groups =
                    Some(self.group_views(txn, GroupOrder::default(), false).await?);
                payload.forums = Some(
                    self.forum_views(txn, ForumOrder::parse(&order), asc).await?,
                );
            }

            Mode::AdminGroupList => {
                self.require(authname, Capability::Admin).await?;

                let order = form.order.clone().unwrap_or_else(|| "id".to_string());
                let desc = form.desc.unwrap_or(false);
                payload.order = Some(order.clone());
                payload.desc = Some(desc);
                if let Some(g) = &exec.group {
                    payload.edit_name = Some(g.name.clone());
                    payload.edit_description = Some(g.description.clone());
                }
                payload.groups = Some(
                    self.group_views(txn, GroupOrder::parse(&order), desc).await?,
                );
            }

            Mode::AdminForumList => {
                self.require(authname, Capability::Admin).await?;

                let order = form.order.clone().unwrap_or_else(|| "id".to_string());
                let asc = form.asc.unwrap_or(true);
                payload.order = Some(order.clone());
                payload.asc = Some(asc);
                if let Some(f) = &exec.forum {
                    payload.edit_name = Some(f.name.clone());
                    payload.edit_subject = Some(f.subject.clone());
                    payload.edit_description = Some(f.description.clone());
                    payload.edit_moderators = Some(f.moderator_list());
                    payload.edit_group = Some(f.group);
                }
                payload.users = Some(self.directory.known_users().await?);
                payload.groups =
                    Some(self.group_views(txn, GroupOrder::default(), false).await?);
                payload.forums = Some(
                    self.forum_views(txn, ForumOrder::parse(&order), asc).await?,
                );
            }

            Mode::ForumAdd => {
                self.require(authname, Capability::Admin).await?;

                payload.users = Some(self.directory.known_users().await?);
                payload.groups =
                    Some(self.group_views(txn, GroupOrder::default(), false).await?);
            }

            Mode::ForumPostAdd => {
                self.require(authname, Capability::Admin).await?;

                let group_id = form
                    .group
                    .or(exec.group.as_ref().map(|g| g.id))
                    .unwrap_or(0);
                repository::add_forum(
                    txn,
                    form.name.as_deref().unwrap_or(""),
                    authname,
                    form.subject.as_deref().unwrap_or(""),
                    form.description.as_deref().unwrap_or(""),
                    &form.moderators,
                    group_id,
                    exec.now,
                )
                .await?;
                return Ok(Flow::Redirect);
            }

            Mode::ForumPostEdit => {
                self.require(authname, Capability::Admin).await?;

                let forum_id = form
                    .forum
                    .or(exec.forum.as_ref().map(|f| f.id))
                    .ok_or_else(|| AppError::BadRequest("no forum to edit".to_string()))?;
                repository::edit_forum(
                    txn,
                    forum_id,
                    form.name.as_deref().unwrap_or(""),
                    form.subject.as_deref().unwrap_or(""),
                    form.description.as_deref().unwrap_or(""),
                    &form.moderators,
                    form.group.unwrap_or(0),
                )
                .await?;
                return Ok(Flow::Redirect);
            }

            Mode::ForumDelete => {
                self.require(authname, Capability::Admin).await?;

                let forum = exec
                    .forum
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no forum to delete".to_string()))?;
                repository::delete_forum(txn, forum.id).await?;
                return Ok(Flow::Redirect);
            }

            Mode::ForumsDelete => {
                self.require(authname, Capability::Admin).await?;

                for forum_id in &form.selection {
                    repository::delete_forum(txn, *forum_id).await?;
                }
                return Ok(Flow::Redirect);
            }

            Mode::GroupPostAdd => {
                self.require(authname, Capability::Admin).await?;

                repository::add_group(
                    txn,
                    form.name.as_deref().unwrap_or(""),
                    form.description.as_deref().unwrap_or(""),
                )
                .await?;
                return Ok(Flow::Redirect);
            }

            Mode::GroupPostEdit => {
                self.require(authname, Capability::Admin).await?;

                let group_id = form
                    .group
                    .or(exec.group.as_ref().map(|g| g.id))
                    .ok_or_else(|| AppError::BadRequest("no group to edit".to_string()))?;
                repository::edit_group(
                    txn,
                    group_id,
                    form.name.as_deref().unwrap_or(""),
                    form.description.as_deref().unwrap_or(""),
                )
                .await?;
                return Ok(Flow::Redirect);
            }

            Mode::GroupsDelete => {
                self.require(authname, Capability::Admin).await?;

                for group_id in &form.selection {
                    repository::delete_group(txn, *group_id).await?;
                }
                return Ok(Flow::Redirect);
            }

            Mode::TopicList => {
                self.require(authname, Capability::View).await?;

                let forum = exec
                    .forum
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no forum addressed".to_string()))?;
                let order = form.order.clone().unwrap_or_else(|| "lastreply".to_string());
                let asc = form.asc.unwrap_or(false);
                let start = form.start.unwrap_or(0).max(0);
                let page = self.discussion.topics_per_page;

                payload.order = Some(order.clone());
                payload.asc = Some(asc);
                payload.topics = Some(
                    self.topic_views(txn, forum.id, start, page, TopicOrder::parse(&order), asc)
                        .await?,
                );

                let topic_count = repository::count_topics(txn, forum.id).await?;
                payload.topic_count = Some(topic_count);
                payload.next_page = if (start + page as i64) < topic_count as i64 {
                    Some(start + page as i64)
                } else {
                    None
                };
                payload.prev_page = if start > 0 {
                    Some((start - page as i64).max(0))
                } else {
                    None
                };
            }

            Mode::TopicAdd => {
                self.require(authname, Capability::Append).await?;

                if let Some(subject) = &form.subject {
                    payload.preview_subject = Some(self.renderer.render_inline(subject));
                }
                if let Some(author) = &form.author {
                    payload.preview_author = Some(self.renderer.render_inline(author));
                }
                if let Some(body) = &form.body {
                    payload.preview_body = Some(self.renderer.render(body));
                }
            }

            Mode::TopicQuote => {
                self.require(authname, Capability::Append).await?;

                let topic = exec
                    .topic
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no topic addressed".to_string()))?;
                payload.edit_body = Some(quote(&topic.body));
            }

            Mode::TopicPostAdd => {
                self.require(authname, Capability::Append).await?;

                let forum = exec
                    .forum
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no forum addressed".to_string()))?;
                let author = form.author.clone().unwrap_or_else(|| authname.to_string());
                let new_topic = repository::add_topic(
                    txn,
                    forum.id,
                    form.subject.as_deref().unwrap_or(""),
                    &author,
                    form.body.as_deref().unwrap_or(""),
                    exec.now,
                )
                .await?;

                let to = repository::topic_recipients(txn, new_topic.id).await?;
                pending.push(Composer::new(self.discussion).topic_created(forum, &new_topic, to));
                return Ok(Flow::Redirect);
            }

            Mode::TopicEdit => {
                self.require(authname, Capability::Append).await?;
                let topic = exec
                    .topic
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no topic addressed".to_string()))?;
                self.require_author_or_moderator(exec, &topic.author, authname, "Topic edit")?;

                payload.edit_subject = Some(topic.subject.clone());
                payload.edit_body = Some(topic.body.clone());
            }

            Mode::TopicPostEdit => {
                self.require(authname, Capability::Append).await?;
                let topic = exec
                    .topic
                    .clone()
                    .ok_or_else(|| AppError::BadRequest("no topic addressed".to_string()))?;
                self.require_author_or_moderator(exec, &topic.author, authname, "Topic edit")?;

                let subject = form.subject.clone().unwrap_or_else(|| topic.subject.clone());
                let body = form.body.clone().unwrap_or_else(|| topic.body.clone());
                repository::edit_topic(txn, topic.id, topic.forum, &subject, &body).await?;

                if let Some(t) = exec.topic.as_mut() {
                    t.subject = subject;
                    t.body = body;
                }
                return Ok(Flow::Redirect);
            }

            Mode::TopicMove => {
                self.require(authname, Capability::Moderate).await?;
                self.require_moderator(exec)?;

                payload.forums = Some(self.forum_views(txn, ForumOrder::Subject, false).await?);
            }

            Mode::TopicPostMove => {
                self.require(authname, Capability::Moderate).await?;
                self.require_moderator(exec)?;

                let topic = exec
                    .topic
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no topic addressed".to_string()))?;
                let new_forum = form
                    .new_forum
                    .ok_or_else(|| AppError::BadRequest("no target forum".to_string()))?;
                repository::move_topic(txn, topic.id, new_forum).await?;
                return Ok(Flow::Redirect);
            }

            Mode::TopicDelete => {
                self.require(authname, Capability::Moderate).await?;
                self.require_moderator(exec)?;

                let topic = exec
                    .topic
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no topic addressed".to_string()))?;
                repository::delete_topic(txn, topic.id).await?;
                return Ok(Flow::Redirect);
            }

            Mode::MessageList => {
                self.require(authname, Capability::View).await?;
                self.prepare_message_list(txn, req, exec, payload).await?;
            }

            Mode::EmbeddedMessageList => {
                // The embedding page does its own access control.
                if exec.topic.is_some() {
                    self.prepare_message_list(txn, req, exec, payload).await?;
                }
            }

            Mode::MessageQuote => {
                self.require(authname, Capability::Append).await?;

                let message = exec
                    .message
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no message addressed".to_string()))?;
                payload.edit_body = Some(quote(&message.body));
            }

            Mode::MessagePostAdd => {
                self.require(authname, Capability::Append).await?;

                let forum = exec
                    .forum
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no forum addressed".to_string()))?;
                let topic = exec
                    .topic
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no topic addressed".to_string()))?;
                let replyto = exec
                    .message
                    .as_ref()
                    .map(|m| m.id)
                    .unwrap_or(REPLY_TO_TOPIC);
                if !repository::reply_target_valid(txn, topic.id, replyto).await? {
                    return Err(AppError::BadRequest(format!(
                        "message {} is not in topic {}",
                        replyto, topic.id
                    )));
                }

                let author = form.author.clone().unwrap_or_else(|| authname.to_string());
                let new_message = repository::add_message(
                    txn,
                    forum.id,
                    topic.id,
                    replyto,
                    &author,
                    form.body.as_deref().unwrap_or(""),
                    exec.now,
                )
                .await?;

                let to = repository::topic_recipients(txn, topic.id).await?;
                pending.push(
                    Composer::new(self.discussion).message_created(forum, topic, &new_message, to),
                );

                if req.surface != Surface::Embedded {
                    return Ok(Flow::Redirect);
                }
            }

            Mode::MessageEdit => {
                self.require(authname, Capability::Append).await?;
                let message = exec
                    .message
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no message addressed".to_string()))?;
                self.require_author_or_moderator(exec, &message.author, authname, "Message edit")?;

                payload.edit_body = Some(message.body.clone());
            }

            Mode::MessagePostEdit => {
                self.require(authname, Capability::Append).await?;
                let message = exec
                    .message
                    .clone()
                    .ok_or_else(|| AppError::BadRequest("no message addressed".to_string()))?;
                self.require_author_or_moderator(exec, &message.author, authname, "Message edit")?;

                let body = form.body.clone().unwrap_or_else(|| message.body.clone());
                repository::edit_message(
                    txn,
                    message.id,
                    message.forum,
                    message.topic,
                    message.replyto,
                    &body,
                )
                .await?;
                if let Some(m) = exec.message.as_mut() {
                    m.body = body;
                }

                if req.surface != Surface::Embedded {
                    return Ok(Flow::Redirect);
                }
            }

            Mode::MessageDelete => {
                self.require(authname, Capability::Moderate).await?;
                self.require_moderator(exec)?;

                let message = exec
                    .message
                    .as_ref()
                    .ok_or_else(|| AppError::BadRequest("no message addressed".to_string()))?;
                repository::delete_message(txn, message.id).await?;

                if req.surface != Surface::Embedded {
                    return Ok(Flow::Redirect);
                }
            }

            Mode::MessageSetDisplay => {
                self.require(authname, Capability::View).await?;

                let display = DisplayMode::parse(form.display.as_deref().unwrap_or(""));
                self.viewer.set_display(display).await?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Shared message-list preparation
    ///
    /// Reads and rewrites the viewer's visit time for the topic, echoes any
    /// submitted form values as a rendered preview, and assembles the
    /// message listing in the viewer's preferred shape.
    async fn prepare_message_list(
        &self,
        txn: &DatabaseTransaction,
        req: &DiscussionRequest,
        exec: &mut Exec,
        payload: &mut Payload,
    ) -> AppResult<()> {
        let topic = exec
            .topic
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("no topic addressed".to_string()))?;

        let visit_time = self.viewer.last_visit(topic.id).await?;
        self.viewer.record_visit(topic.id, exec.now).await?;
        exec.topic_new = topic.time > visit_time;

        let form = &req.form;
        if let Some(author) = &form.author {
            payload.preview_author = Some(self.renderer.render_inline(author));
        }
        if let Some(subject) = &form.subject {
            payload.preview_subject = Some(self.renderer.render_inline(subject));
        }
        if let Some(body) = &form.body {
            payload.preview_body = Some(self.renderer.render(body));
        }

        let display = self.viewer.display().await?;
        payload.display = Some(display.as_str());
        payload.messages = Some(match display {
            DisplayMode::Threaded => {
                let rows = repository::list_messages(txn, topic.id, true).await?;
                tree::threaded(&rows, visit_time, self.renderer)?
            }
            DisplayMode::FlatAsc => {
                let rows = repository::list_messages(txn, topic.id, true).await?;
                tree::flat(&rows, visit_time, self.renderer)
            }
            DisplayMode::FlatDesc => {
                let rows = repository::list_messages(txn, topic.id, false).await?;
                tree::flat(&rows, visit_time, self.renderer)
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // View construction
    // ------------------------------------------------------------------

    fn group_view(&self, listing: GroupListing) -> GroupView {
        GroupView {
            id: listing.group.id,
            name: self.renderer.render_inline(&listing.group.name),
            description: self.renderer.render_inline(&listing.group.description),
            forums: Some(listing.forums),
        }
    }

    async fn group_views(
        &self,
        txn: &DatabaseTransaction,
        order: GroupOrder,
        desc: bool,
    ) -> AppResult<Vec<GroupView>> {
        Ok(repository::list_groups(txn, order, desc)
            .await?
            .into_iter()
            .map(|listing| self.group_view(listing))
            .collect())
    }

    fn forum_view(&self, listing: ForumListing) -> ForumView {
        let forum = listing.forum;
        ForumView {
            id: forum.id,
            name: self.renderer.render_inline(&forum.name),
            author: self.renderer.render_inline(&forum.author),
            time: forum.time,
            moderators: forum.moderator_list(),
            group: forum.group,
            subject: self.renderer.render_inline(&forum.subject),
            description: self.renderer.render_inline(&forum.description),
            topics: Some(listing.topics),
            replies: Some(listing.replies),
            lasttopic: listing.lasttopic,
            lastreply: listing.lastreply,
        }
    }

    async fn forum_views(
        &self,
        txn: &DatabaseTransaction,
        order: ForumOrder,
        asc: bool,
    ) -> AppResult<Vec<ForumView>> {
        Ok(repository::list_forums(txn, order, asc)
            .await?
            .into_iter()
            .map(|listing| self.forum_view(listing))
            .collect())
    }

    fn topic_view(&self, listing: TopicListing) -> TopicView {
        let topic = listing.topic;
        TopicView {
            id: topic.id,
            forum: topic.forum,
            subject: self.renderer.render_inline(&topic.subject),
            author: self.renderer.render_inline(&topic.author),
            body: self.renderer.render(&topic.body),
            time: topic.time,
            lastreply: topic.lastreply,
            replies: Some(listing.replies),
            new: false,
        }
    }

    async fn topic_views(
        &self,
        txn: &DatabaseTransaction,
        forum_id: i64,
        offset: i64,
        page: u64,
        order: TopicOrder,
        asc: bool,
    ) -> AppResult<Vec<TopicView>> {
        Ok(repository::list_topics(txn, forum_id, offset, page, order, asc)
            .await?
            .into_iter()
            .map(|listing| self.topic_view(listing))
            .collect())
    }

    /// Views of the addressed entities, built after the modes ran so edits
    /// made during the request are reflected
    fn fill_addressed_views(&self, exec: &Exec, payload: &mut Payload) {
        if let Some(g) = &exec.group {
            payload.group = Some(GroupView {
                id: g.id,
                name: self.renderer.render_inline(&g.name),
                description: self.renderer.render_inline(&g.description),
                forums: None,
            });
        }
        if let Some(f) = &exec.forum {
            payload.forum = Some(ForumView {
                id: f.id,
                name: self.renderer.render_inline(&f.name),
                author: self.renderer.render_inline(&f.author),
                time: f.time,
                moderators: f.moderator_list(),
                group: f.group,
                subject: self.renderer.render_inline(&f.subject),
                description: self.renderer.render_inline(&f.description),
                topics: None,
                replies: None,
                lasttopic: None,
                lastreply: None,
            });
        }
        if let Some(t) = &exec.topic {
            payload.topic = Some(TopicView {
                id: t.id,
                forum: t.forum,
                subject: self.renderer.render_inline(&t.subject),
                author: self.renderer.render_inline(&t.author),
                body: self.renderer.render(&t.body),
                time: t.time,
                lastreply: t.lastreply,
                replies: None,
                new: exec.topic_new,
            });
        }
        if let Some(m) = &exec.message {
            payload.message = Some(MessageView {
                id: m.id,
                forum: m.forum,
                topic: m.topic,
                replyto: m.replyto,
                time: m.time,
                author: self.renderer.render_inline(&m.author),
                body: self.renderer.render(&m.body),
            });
        }
    }
}

/// Prefix every line of a body for quoting in a reply form
fn quote(body: &str) -> String {
    body.lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_prefixes_every_line() {
        assert_eq!(quote("one\ntwo"), "> one\n> two");
        assert_eq!(quote(""), "");
    }
}
