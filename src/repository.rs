//! Entity repository
//!
//! All storage access for the four discussion entities lives here. The
//! functions are generic over `ConnectionTrait` so the dispatcher can run a
//! whole mode sequence inside one transaction. Cascading deletes and the
//! topic-move rewrite keep the §3 invariants of the schema; aggregate
//! listing data (topic/reply counts, last activity) is computed on demand,
//! never stored, except for the cached `lastreply` column on topic.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

use crate::entity::message::REPLY_TO_TOPIC;
use crate::entity::{forum, group, message, topic};

// ---------------------------------------------------------------------------
// Ordering allow-lists
// ---------------------------------------------------------------------------

/// Group listing order columns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupOrder {
    #[default]
    Id,
    Name,
    Description,
}

impl GroupOrder {
    /// Normalize a requested column, falling back to the default
    pub fn parse(value: &str) -> Self {
        match value {
            "name" => GroupOrder::Name,
            "description" => GroupOrder::Description,
            _ => GroupOrder::Id,
        }
    }
}

/// Forum listing order columns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForumOrder {
    #[default]
    Id,
    Name,
    Author,
    Time,
    Subject,
    Topics,
    Replies,
    LastTopic,
    LastReply,
}

impl ForumOrder {
    pub fn parse(value: &str) -> Self {
        match value {
            "name" => ForumOrder::Name,
            "author" => ForumOrder::Author,
            "time" => ForumOrder::Time,
            "subject" => ForumOrder::Subject,
            "topics" => ForumOrder::Topics,
            "replies" => ForumOrder::Replies,
            "lasttopic" => ForumOrder::LastTopic,
            "lastreply" => ForumOrder::LastReply,
            _ => ForumOrder::Id,
        }
    }
}

/// Topic listing order columns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopicOrder {
    Id,
    Time,
    Subject,
    Author,
    Replies,
    #[default]
    LastReply,
}

impl TopicOrder {
    pub fn parse(value: &str) -> Self {
        match value {
            "id" => TopicOrder::Id,
            "time" => TopicOrder::Time,
            "subject" => TopicOrder::Subject,
            "author" => TopicOrder::Author,
            "replies" => TopicOrder::Replies,
            _ => TopicOrder::LastReply,
        }
    }
}

// ---------------------------------------------------------------------------
// Listing rows
// ---------------------------------------------------------------------------

/// Group row with its forum count
#[derive(Clone, Debug)]
pub struct GroupListing {
    pub group: group::Model,
    pub forums: i64,
}

/// Forum row with aggregate activity data
#[derive(Clone, Debug)]
pub struct ForumListing {
    pub forum: forum::Model,
    pub topics: i64,
    pub replies: i64,
    pub lasttopic: Option<i64>,
    pub lastreply: Option<i64>,
}

/// Topic row with its reply count
#[derive(Clone, Debug)]
pub struct TopicListing {
    pub topic: topic::Model,
    pub replies: i64,
}

// ---------------------------------------------------------------------------
// Single item lookups
// ---------------------------------------------------------------------------

/// Fetch a group; misses resolve to the synthetic "no group" bucket
pub async fn get_group<C: ConnectionTrait>(db: &C, id: i64) -> Result<group::Model, DbErr> {
    if id == 0 {
        return Ok(group::Model::no_group());
    }
    Ok(group::Entity::find_by_id(id)
        .one(db)
        .await?
        .unwrap_or_else(group::Model::no_group))
}

pub async fn get_forum<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<forum::Model>, DbErr> {
    forum::Entity::find_by_id(id).one(db).await
}

pub async fn get_topic<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<topic::Model>, DbErr> {
    topic::Entity::find_by_id(id).one(db).await
}

pub async fn get_message<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<message::Model>, DbErr> {
    message::Entity::find_by_id(id).one(db).await
}

// ---------------------------------------------------------------------------
// Inserts
// ---------------------------------------------------------------------------

pub async fn add_group<C: ConnectionTrait>(
    db: &C,
    name: &str,
    description: &str,
) -> Result<group::Model, DbErr> {
    tracing::debug!("insert group '{}'", name);
    group::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn add_forum<C: ConnectionTrait>(
    db: &C,
    name: &str,
    author: &str,
    subject: &str,
    description: &str,
    moderators: &[String],
    group_id: i64,
    time: i64,
) -> Result<forum::Model, DbErr> {
    tracing::debug!("insert forum '{}'", name);
    forum::ActiveModel {
        name: Set(name.to_string()),
        author: Set(author.to_string()),
        time: Set(time),
        group: Set(group_id),
        moderators: Set(forum::join_moderators(moderators)),
        subject: Set(subject.to_string()),
        description: Set(description.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a topic; `lastreply` starts at the creation time
///
/// Returns the inserted row with its store-assigned id. Callers must not
/// re-read the row by creation time: that lookup races under concurrent
/// inserts within the same second.
pub async fn add_topic<C: ConnectionTrait>(
    db: &C,
    forum_id: i64,
    subject: &str,
    author: &str,
    body: &str,
    time: i64,
) -> Result<topic::Model, DbErr> {
    tracing::debug!("insert topic '{}' in forum {}", subject, forum_id);
    topic::ActiveModel {
        forum: Set(forum_id),
        subject: Set(subject.to_string()),
        author: Set(author.to_string()),
        body: Set(body.to_string()),
        time: Set(time),
        lastreply: Set(time),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a message and advance its topic's `lastreply`
///
/// The advance is forward-only: an older timestamp never moves the cached
/// value back.
#[allow(clippy::too_many_arguments)]
pub async fn add_message<C: ConnectionTrait>(
    db: &C,
    forum_id: i64,
    topic_id: i64,
    replyto: i64,
    author: &str,
    body: &str,
    time: i64,
) -> Result<message::Model, DbErr> {
    tracing::debug!("insert message in topic {} replying to {}", topic_id, replyto);
    let inserted = message::ActiveModel {
        forum: Set(forum_id),
        topic: Set(topic_id),
        replyto: Set(replyto),
        time: Set(time),
        author: Set(author.to_string()),
        body: Set(body.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    topic::Entity::update_many()
        .col_expr(topic::Column::Lastreply, Expr::value(time))
        .filter(topic::Column::Id.eq(topic_id))
        .filter(topic::Column::Lastreply.lt(time))
        .exec(db)
        .await?;

    Ok(inserted)
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

pub async fn edit_group<C: ConnectionTrait>(
    db: &C,
    id: i64,
    name: &str,
    description: &str,
) -> Result<(), DbErr> {
    tracing::debug!("update group {}", id);
    group::Entity::update_many()
        .col_expr(group::Column::Name, Expr::value(name))
        .col_expr(group::Column::Description, Expr::value(description))
        .filter(group::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn edit_forum<C: ConnectionTrait>(
    db: &C,
    id: i64,
    name: &str,
    subject: &str,
    description: &str,
    moderators: &[String],
    group_id: i64,
) -> Result<(), DbErr> {
    tracing::debug!("update forum {}", id);
    forum::Entity::update_many()
        .col_expr(forum::Column::Name, Expr::value(name))
        .col_expr(forum::Column::Subject, Expr::value(subject))
        .col_expr(forum::Column::Description, Expr::value(description))
        .col_expr(
            forum::Column::Moderators,
            Expr::value(forum::join_moderators(moderators)),
        )
        .col_expr(forum::Column::Group, Expr::value(group_id))
        .filter(forum::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn edit_topic<C: ConnectionTrait>(
    db: &C,
    id: i64,
    forum_id: i64,
    subject: &str,
    body: &str,
) -> Result<(), DbErr> {
    tracing::debug!("update topic {}", id);
    topic::Entity::update_many()
        .col_expr(topic::Column::Forum, Expr::value(forum_id))
        .col_expr(topic::Column::Subject, Expr::value(subject))
        .col_expr(topic::Column::Body, Expr::value(body))
        .filter(topic::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn edit_message<C: ConnectionTrait>(
    db: &C,
    id: i64,
    forum_id: i64,
    topic_id: i64,
    replyto: i64,
    body: &str,
) -> Result<(), DbErr> {
    tracing::debug!("update message {}", id);
    message::Entity::update_many()
        .col_expr(message::Column::Forum, Expr::value(forum_id))
        .col_expr(message::Column::Topic, Expr::value(topic_id))
        .col_expr(message::Column::Replyto, Expr::value(replyto))
        .col_expr(message::Column::Body, Expr::value(body))
        .filter(message::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Move a topic to another forum
///
/// Rewrites the topic's forum and the denormalised forum of every message
/// under it, so no message ever points at a different forum than its topic.
pub async fn move_topic<C: ConnectionTrait>(
    db: &C,
    topic_id: i64,
    new_forum: i64,
) -> Result<(), DbErr> {
    tracing::debug!("move topic {} to forum {}", topic_id, new_forum);
    topic::Entity::update_many()
        .col_expr(topic::Column::Forum, Expr::value(new_forum))
        .filter(topic::Column::Id.eq(topic_id))
        .exec(db)
        .await?;
    message::Entity::update_many()
        .col_expr(message::Column::Forum, Expr::value(new_forum))
        .filter(message::Column::Topic.eq(topic_id))
        .exec(db)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Deletes
// ---------------------------------------------------------------------------

/// Delete a group; its forums are reassigned to the "no group" bucket
pub async fn delete_group<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
    tracing::debug!("delete group {}", id);
    group::Entity::delete_by_id(id).exec(db).await?;
    forum::Entity::update_many()
        .col_expr(forum::Column::Group, Expr::value(0_i64))
        .filter(forum::Column::Group.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Delete a forum with everything under it: messages, then topics, then
/// the forum row
pub async fn delete_forum<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
    tracing::debug!("delete forum {}", id);
    message::Entity::delete_many()
        .filter(message::Column::Forum.eq(id))
        .exec(db)
        .await?;
    topic::Entity::delete_many()
        .filter(topic::Column::Forum.eq(id))
        .exec(db)
        .await?;
    forum::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Delete a topic and all of its messages
pub async fn delete_topic<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
    tracing::debug!("delete topic {}", id);
    message::Entity::delete_many()
        .filter(message::Column::Topic.eq(id))
        .exec(db)
        .await?;
    topic::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Delete a message and its whole reply subtree
///
/// The subtree is collected with a worklist (reply trees can be deep),
/// then removed children-first.
pub async fn delete_message<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
    tracing::debug!("delete message {} and replies", id);

    let mut subtree = vec![id];
    let mut cursor = 0;
    while cursor < subtree.len() {
        let parent = subtree[cursor];
        cursor += 1;
        let replies: Vec<i64> = message::Entity::find()
            .filter(message::Column::Replyto.eq(parent))
            .all(db)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        subtree.extend(replies);
    }

    for message_id in subtree.into_iter().rev() {
        message::Entity::delete_by_id(message_id).exec(db).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// List groups with forum counts; the synthetic "no group" bucket comes
/// first, then the stored groups in the requested order
pub async fn list_groups<C: ConnectionTrait>(
    db: &C,
    order: GroupOrder,
    desc: bool,
) -> Result<Vec<GroupListing>, DbErr> {
    let ungrouped = forum::Entity::find()
        .filter(forum::Column::Group.eq(0_i64))
        .count(db)
        .await? as i64;

    let counts: HashMap<i64, i64> = forum::Entity::find()
        .select_only()
        .column(forum::Column::Group)
        .column_as(forum::Column::Id.count(), "forums")
        .group_by(forum::Column::Group)
        .into_tuple::<(i64, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let mut rows: Vec<GroupListing> = group::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|g| {
            let forums = counts.get(&g.id).copied().unwrap_or(0);
            GroupListing { group: g, forums }
        })
        .collect();

    rows.sort_by(|a, b| {
        let ordering = match order {
            GroupOrder::Id => a.group.id.cmp(&b.group.id),
            GroupOrder::Name => a.group.name.cmp(&b.group.name),
            GroupOrder::Description => a.group.description.cmp(&b.group.description),
        };
        if desc {
            ordering.reverse()
        } else {
            ordering
        }
    });

    let mut listings = vec![GroupListing {
        group: group::Model::no_group(),
        forums: ungrouped,
    }];
    listings.extend(rows);
    Ok(listings)
}

/// List forums with their activity aggregates in the requested order
pub async fn list_forums<C: ConnectionTrait>(
    db: &C,
    order: ForumOrder,
    asc: bool,
) -> Result<Vec<ForumListing>, DbErr> {
    let topic_stats: HashMap<i64, (i64, i64)> = topic::Entity::find()
        .select_only()
        .column(topic::Column::Forum)
        .column_as(topic::Column::Id.count(), "topics")
        .column_as(topic::Column::Time.max(), "lasttopic")
        .group_by(topic::Column::Forum)
        .into_tuple::<(i64, i64, i64)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(forum_id, topics, lasttopic)| (forum_id, (topics, lasttopic)))
        .collect();

    // Messages carry their topic's forum, so reply aggregates group directly.
    let reply_stats: HashMap<i64, (i64, i64)> = message::Entity::find()
        .select_only()
        .column(message::Column::Forum)
        .column_as(message::Column::Id.count(), "replies")
        .column_as(message::Column::Time.max(), "lastreply")
        .group_by(message::Column::Forum)
        .into_tuple::<(i64, i64, i64)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(forum_id, replies, lastreply)| (forum_id, (replies, lastreply)))
        .collect();

    let mut rows: Vec<ForumListing> = forum::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|f| {
            let (topics, lasttopic) = match topic_stats.get(&f.id) {
                Some(&(topics, lasttopic)) => (topics, Some(lasttopic)),
                None => (0, None),
            };
            let (replies, lastreply) = match reply_stats.get(&f.id) {
                Some(&(replies, lastreply)) => (replies, Some(lastreply)),
                None => (0, None),
            };
            ForumListing {
                forum: f,
                topics,
                replies,
                lasttopic,
                lastreply,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let ordering = match order {
            ForumOrder::Id => a.forum.id.cmp(&b.forum.id),
            ForumOrder::Name => a.forum.name.cmp(&b.forum.name),
            ForumOrder::Author => a.forum.author.cmp(&b.forum.author),
            ForumOrder::Time => a.forum.time.cmp(&b.forum.time),
            ForumOrder::Subject => a.forum.subject.cmp(&b.forum.subject),
            ForumOrder::Topics => a.topics.cmp(&b.topics),
            ForumOrder::Replies => a.replies.cmp(&b.replies),
            ForumOrder::LastTopic => a.lasttopic.cmp(&b.lasttopic),
            ForumOrder::LastReply => a.lastreply.cmp(&b.lastreply),
        };
        if asc {
            ordering
        } else {
            ordering.reverse()
        }
    });

    Ok(rows)
}

pub async fn count_topics<C: ConnectionTrait>(db: &C, forum_id: i64) -> Result<u64, DbErr> {
    topic::Entity::find()
        .filter(topic::Column::Forum.eq(forum_id))
        .count(db)
        .await
}

/// One page of a forum's topics with reply counts
///
/// A negative offset is clamped to zero.
pub async fn list_topics<C: ConnectionTrait>(
    db: &C,
    forum_id: i64,
    offset: i64,
    page_size: u64,
    order: TopicOrder,
    asc: bool,
) -> Result<Vec<TopicListing>, DbErr> {
    let offset = offset.max(0) as usize;

    let counts: HashMap<i64, i64> = message::Entity::find()
        .select_only()
        .column(message::Column::Topic)
        .column_as(message::Column::Id.count(), "replies")
        .filter(message::Column::Forum.eq(forum_id))
        .group_by(message::Column::Topic)
        .into_tuple::<(i64, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let mut rows: Vec<TopicListing> = topic::Entity::find()
        .filter(topic::Column::Forum.eq(forum_id))
        .all(db)
        .await?
        .into_iter()
        .map(|t| {
            let replies = counts.get(&t.id).copied().unwrap_or(0);
            TopicListing { topic: t, replies }
        })
        .collect();

    rows.sort_by(|a, b| {
        let ordering = match order {
            TopicOrder::Id => a.topic.id.cmp(&b.topic.id),
            TopicOrder::Time => a.topic.time.cmp(&b.topic.time),
            TopicOrder::Subject => a.topic.subject.cmp(&b.topic.subject),
            TopicOrder::Author => a.topic.author.cmp(&b.topic.author),
            TopicOrder::Replies => a.replies.cmp(&b.replies),
            TopicOrder::LastReply => a.topic.lastreply.cmp(&b.topic.lastreply),
        };
        if asc {
            ordering
        } else {
            ordering.reverse()
        }
    });

    Ok(rows.into_iter().skip(offset).take(page_size as usize).collect())
}

/// All messages of a topic ordered by creation time
pub async fn list_messages<C: ConnectionTrait>(
    db: &C,
    topic_id: i64,
    asc: bool,
) -> Result<Vec<message::Model>, DbErr> {
    let direction = if asc { Order::Asc } else { Order::Desc };
    message::Entity::find()
        .filter(message::Column::Topic.eq(topic_id))
        .order_by(message::Column::Time, direction)
        .all(db)
        .await
}

// ---------------------------------------------------------------------------
// Notification recipients
// ---------------------------------------------------------------------------

/// The topic author plus every message author under the topic, deduplicated
pub async fn topic_recipients<C: ConnectionTrait>(
    db: &C,
    topic_id: i64,
) -> Result<Vec<String>, DbErr> {
    let mut recipients = Vec::new();

    if let Some(topic) = get_topic(db, topic_id).await? {
        recipients.push(topic.author);
    }

    let authors: Vec<String> = message::Entity::find()
        .select_only()
        .column(message::Column::Author)
        .filter(message::Column::Topic.eq(topic_id))
        .into_tuple::<String>()
        .all(db)
        .await?;

    for author in authors {
        if !recipients.contains(&author) {
            recipients.push(author);
        }
    }
    Ok(recipients)
}

// ---------------------------------------------------------------------------
// Search and timeline feeds
// ---------------------------------------------------------------------------

/// A search or timeline hit
#[derive(Clone, Debug, serde::Serialize)]
pub struct Hit {
    /// "forum", "topic" or "message"
    pub kind: &'static str,
    pub id: i64,
    pub forum: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<i64>,
    pub time: i64,
    pub author: String,
    /// Subject line of the item (topic subject for messages)
    pub title: String,
    /// Raw body; the request layer renders it before display
    pub body: String,
}

/// Substring search over topics (subject and body) and message bodies
pub async fn search<C: ConnectionTrait>(db: &C, query: &str) -> Result<Vec<Hit>, DbErr> {
    let mut hits = Vec::new();

    let topics = topic::Entity::find()
        .filter(
            Condition::any()
                .add(topic::Column::Subject.contains(query))
                .add(topic::Column::Body.contains(query)),
        )
        .all(db)
        .await?;
    for t in topics {
        hits.push(Hit {
            kind: "topic",
            id: t.id,
            forum: t.forum,
            topic: None,
            time: t.time,
            author: t.author,
            title: t.subject,
            body: t.body,
        });
    }

    let messages = message::Entity::find()
        .filter(message::Column::Body.contains(query))
        .all(db)
        .await?;
    let subjects = topic_subjects(db, messages.iter().map(|m| m.topic)).await?;
    for m in messages {
        hits.push(Hit {
            kind: "message",
            id: m.id,
            forum: m.forum,
            topic: Some(m.topic),
            time: m.time,
            author: m.author,
            title: subjects.get(&m.topic).cloned().unwrap_or_default(),
            body: m.body,
        });
    }

    Ok(hits)
}

/// Forums, topics and messages created in the given time window, newest
/// first
pub async fn recent_activity<C: ConnectionTrait>(
    db: &C,
    start: i64,
    stop: i64,
) -> Result<Vec<Hit>, DbErr> {
    let mut hits = Vec::new();

    let forums = forum::Entity::find()
        .filter(forum::Column::Time.between(start, stop))
        .all(db)
        .await?;
    for f in forums {
        hits.push(Hit {
            kind: "forum",
            id: f.id,
            forum: f.id,
            topic: None,
            time: f.time,
            author: f.author,
            title: f.name,
            body: format!("{} - {}", f.subject, f.description),
        });
    }

    let topics = topic::Entity::find()
        .filter(topic::Column::Time.between(start, stop))
        .all(db)
        .await?;
    for t in topics {
        hits.push(Hit {
            kind: "topic",
            id: t.id,
            forum: t.forum,
            topic: None,
            time: t.time,
            author: t.author,
            title: t.subject,
            body: t.body,
        });
    }

    let messages = message::Entity::find()
        .filter(message::Column::Time.between(start, stop))
        .all(db)
        .await?;
    let subjects = topic_subjects(db, messages.iter().map(|m| m.topic)).await?;
    for m in messages {
        hits.push(Hit {
            kind: "message",
            id: m.id,
            forum: m.forum,
            topic: Some(m.topic),
            time: m.time,
            author: m.author,
            title: subjects.get(&m.topic).cloned().unwrap_or_default(),
            body: m.body,
        });
    }

    hits.sort_by(|a, b| b.time.cmp(&a.time));
    Ok(hits)
}

async fn topic_subjects<C: ConnectionTrait>(
    db: &C,
    topic_ids: impl Iterator<Item = i64>,
) -> Result<HashMap<i64, String>, DbErr> {
    let mut ids: Vec<i64> = topic_ids.collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(topic::Entity::find()
        .filter(topic::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.subject))
        .collect())
}

/// Does the reply target exist within the topic? Used before attaching a
/// new message to a parent.
pub async fn reply_target_valid<C: ConnectionTrait>(
    db: &C,
    topic_id: i64,
    replyto: i64,
) -> Result<bool, DbErr> {
    if replyto == REPLY_TO_TOPIC {
        return Ok(true);
    }
    Ok(message::Entity::find()
        .filter(message::Column::Id.eq(replyto))
        .filter(message::Column::Topic.eq(topic_id))
        .count(db)
        .await?
        > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_normalization() {
        assert_eq!(ForumOrder::parse("lastreply"), ForumOrder::LastReply);
        assert_eq!(ForumOrder::parse("subject"), ForumOrder::Subject);
        // anything outside the allow-list falls back to the default
        assert_eq!(ForumOrder::parse("1; DROP TABLE forum"), ForumOrder::Id);
        assert_eq!(TopicOrder::parse("nonsense"), TopicOrder::LastReply);
        assert_eq!(GroupOrder::parse("nonsense"), GroupOrder::Id);
    }
}
