//! Message entity - replies within a topic
//!
//! Table name: message
//!
//! `replyto` is -1 for direct replies to the topic, otherwise the id of
//! the parent message. `forum` is denormalised from the topic at creation
//! time and rewritten when the topic moves.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// replyto value marking a direct reply to the topic
pub const REPLY_TO_TOPIC: i64 = -1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Forum of the owning topic, denormalised
    pub forum: i64,

    /// Topic the message belongs to
    pub topic: i64,

    /// Parent message id, or REPLY_TO_TOPIC
    pub replyto: i64,

    /// Creation time (unix seconds)
    pub time: i64,

    /// Username of the message author
    #[sea_orm(column_type = "String(Some(64))")]
    pub author: String,

    /// Message body text
    #[sea_orm(column_type = "Text")]
    pub body: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this message replies directly to its topic
    pub fn is_topic_reply(&self) -> bool {
        self.replyto == REPLY_TO_TOPIC
    }
}
