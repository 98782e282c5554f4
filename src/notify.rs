//! Creation notifications
//!
//! When a topic or message is created, everyone who wrote in the topic is
//! notified, with a fixed operator address on cc. Composition happens here;
//! delivery belongs to the `Mailer` collaborator and is best-effort: a
//! failed handoff is logged and never surfaces to the request that caused
//! it, since the data is already committed.

use async_trait::async_trait;
use chrono::DateTime;

use crate::config::DiscussionConfig;
use crate::entity::{forum, message, topic};

/// A composed notification ready for handoff
#[derive(Clone, Debug)]
pub struct Notification {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Extra mail header fields (Message-ID, In-Reply-To, ...)
    pub headers: Vec<(String, String)>,
}

/// Delivery collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Mailer that only records the handoff in the log
///
/// Stands in where no delivery backend is wired up; real delivery is the
/// operator's transport to provide.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        tracing::info!(
            "notification handoff: to=[{}] cc=[{}] subject='{}'",
            notification.to.join(", "),
            notification.cc.join(", "),
            notification.subject
        );
        Ok(())
    }
}

/// Hand a notification to the mailer, swallowing delivery failures
pub async fn send_best_effort(mailer: &dyn Mailer, notification: Notification) {
    let subject = notification.subject.clone();
    if let Err(err) = mailer.deliver(notification).await {
        tracing::warn!("notification '{}' not delivered: {}", subject, err);
    }
}

/// Composes notifications for created topics and messages
pub struct Composer<'a> {
    config: &'a DiscussionConfig,
}

impl<'a> Composer<'a> {
    pub fn new(config: &'a DiscussionConfig) -> Self {
        Self { config }
    }

    /// Mail domain taken from the configured from-address
    fn host(&self) -> &str {
        let from = &self.config.from_email;
        match from.find('@') {
            Some(at) => &from[at + 1..],
            None => "localhost",
        }
    }

    /// Stable RFC 2822 Message-ID for an item
    ///
    /// Topic notifications and topic-level replies use message id 0.
    pub fn message_id(&self, forum_id: i64, topic_id: i64, message_id: i64) -> String {
        let message_id = message_id.max(0);
        format!(
            "<{}.{}.{}@{}>",
            forum_id,
            topic_id,
            message_id,
            self.host()
        )
    }

    fn subject(&self, topic_subject: &str, is_reply: bool) -> String {
        let re = if is_reply { "Re: " } else { "" };
        format!("{} {}{}", self.config.subject_prefix, re, topic_subject)
    }

    fn body(
        &self,
        title: &str,
        id: i64,
        author: &str,
        time: i64,
        body: &str,
        link: &str,
        moderators: &str,
    ) -> String {
        format!(
            "{} #{}\n    Author:  {}\n      Time:  {}\n\n{}\n\n{}\nModerators:  {}\n",
            title,
            id,
            author,
            format_time(time),
            body,
            link,
            moderators
        )
    }

    /// Notification for a freshly created topic
    pub fn topic_created(
        &self,
        forum: &forum::Model,
        topic: &topic::Model,
        to: Vec<String>,
    ) -> Notification {
        let link = format!("{}/discussion/{}/{}", self.config.base_url, forum.id, topic.id);
        let headers = vec![
            (
                "Message-ID".to_string(),
                self.message_id(forum.id, topic.id, 0),
            ),
            ("X-Forumd-Topic-ID".to_string(), topic.id.to_string()),
            ("X-Forumd-Discussion-URL".to_string(), link.clone()),
        ];

        Notification {
            to,
            cc: vec![self.config.operator_cc.clone()],
            subject: self.subject(&topic.subject, false),
            body: self.body(
                "Topic",
                topic.id,
                &topic.author,
                topic.time,
                &topic.body,
                &link,
                &forum.moderators,
            ),
            headers,
        }
    }

    /// Notification for a freshly created message
    pub fn message_created(
        &self,
        forum: &forum::Model,
        topic: &topic::Model,
        message: &message::Model,
        to: Vec<String>,
    ) -> Notification {
        let link = format!(
            "{}/discussion/{}/{}/{}#{}",
            self.config.base_url, forum.id, topic.id, message.id, message.id
        );
        // Thread the mail under the replied-to item.
        let parent_id = self.message_id(forum.id, topic.id, message.replyto);
        let headers = vec![
            (
                "Message-ID".to_string(),
                self.message_id(forum.id, topic.id, message.id),
            ),
            ("X-Forumd-Message-ID".to_string(), message.id.to_string()),
            ("X-Forumd-Discussion-URL".to_string(), link.clone()),
            ("In-Reply-To".to_string(), parent_id.clone()),
            ("References".to_string(), parent_id),
        ];

        Notification {
            to,
            cc: vec![self.config.operator_cc.clone()],
            subject: self.subject(&topic.subject, true),
            body: self.body(
                "Message",
                message.id,
                &message.author,
                message.time,
                &message.body,
                &link,
                &forum.moderators,
            ),
            headers,
        }
    }
}

fn format_time(time: i64) -> String {
    match DateTime::from_timestamp(time, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => time.to_string(),
    }
}
