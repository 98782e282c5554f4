//! Topic entity - discussion threads
//!
//! Table name: topic
//!
//! `lastreply` starts at the creation time and is advanced (never moved
//! back) whenever a message is added under the topic.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "topic")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Forum the topic belongs to
    pub forum: i64,

    /// Topic subject line
    #[sea_orm(column_type = "Text")]
    pub subject: String,

    /// Username of the topic author
    #[sea_orm(column_type = "String(Some(64))")]
    pub author: String,

    /// Topic body text
    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Creation time (unix seconds)
    pub time: i64,

    /// Time of the newest message under the topic
    pub lastreply: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
