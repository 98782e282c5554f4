//! Group entity - forum category buckets
//!
//! Table name: forum_group
//!
//! Group id 0 is the reserved "no group" bucket. It is never a row in this
//! table; lookups that miss resolve to the synthetic default instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Group name
    #[sea_orm(column_type = "String(Some(128))")]
    pub name: String,

    /// Group description
    #[sea_orm(column_type = "Text")]
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Forum membership is resolved by querying the forum table's group column.

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The virtual "no group" bucket every board has
    pub fn no_group() -> Self {
        Self {
            id: 0,
            name: "None".to_string(),
            description: "No Group".to_string(),
        }
    }
}
