//! Entity module - SeaORM entity definitions
//!
//! One module per database table of the discussion schema, plus the
//! persisted casbin policy table.

pub mod casbin_rule;
pub mod forum;
pub mod group;
pub mod message;
pub mod topic;
