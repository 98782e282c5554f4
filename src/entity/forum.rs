//! Forum entity - named discussion boards
//!
//! Table name: forum
//!
//! Moderators are stored as a single space-joined column, ordered as
//! entered. `group` 0 means the forum belongs to no group.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Forum name
    #[sea_orm(column_type = "String(Some(128))")]
    pub name: String,

    /// Username of the creator
    #[sea_orm(column_type = "String(Some(64))")]
    pub author: String,

    /// Creation time (unix seconds)
    pub time: i64,

    /// Owning group id, 0 when ungrouped
    #[sea_orm(column_name = "forum_group")]
    pub group: i64,

    /// Space-joined moderator usernames, in moderator order
    #[sea_orm(column_type = "Text")]
    pub moderators: String,

    /// One-line forum subject
    #[sea_orm(column_type = "Text")]
    pub subject: String,

    /// Forum description
    #[sea_orm(column_type = "Text")]
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Moderator usernames split out of the stored column
    pub fn moderator_list(&self) -> Vec<String> {
        self.moderators
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Whether the given username moderates this forum
    pub fn has_moderator(&self, username: &str) -> bool {
        self.moderators.split_whitespace().any(|m| m == username)
    }
}

/// Join usernames into the stored moderator column format
pub fn join_moderators(moderators: &[String]) -> String {
    moderators.join(" ")
}
