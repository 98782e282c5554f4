//! CasbinRule entity - persisted authorization policies
//!
//! Table name: casbin_rule

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "casbin_rule")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Policy type: 'p' (policy) or 'g' (grouping/role)
    #[sea_orm(column_type = "String(Some(10))")]
    pub ptype: String,

    /// For 'p' the subject, for 'g' the user
    #[sea_orm(column_type = "String(Some(64))")]
    pub v0: String,

    /// For 'p' the object, for 'g' the role
    #[sea_orm(column_type = "String(Some(64))")]
    pub v1: String,

    /// For 'p' the action, empty for 'g'
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub v2: Option<String>,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub v3: Option<String>,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub v4: Option<String>,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub v5: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert a stored rule into a casbin policy vector
    pub fn to_policy_vec(&self) -> Vec<String> {
        let mut policy = vec![self.v0.clone(), self.v1.clone()];
        for extra in [&self.v2, &self.v3, &self.v4, &self.v5] {
            if let Some(value) = extra {
                if !value.is_empty() {
                    policy.push(value.clone());
                }
            }
        }
        policy
    }
}

/// Build a 'p' policy record
pub fn new_policy(sub: &str, obj: &str, act: &str) -> ActiveModel {
    use sea_orm::Set;
    ActiveModel {
        ptype: Set("p".to_string()),
        v0: Set(sub.to_string()),
        v1: Set(obj.to_string()),
        v2: Set(Some(act.to_string())),
        ..Default::default()
    }
}
