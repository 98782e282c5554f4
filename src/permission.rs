//! Permission module using Casbin
//!
//! The discussion board knows four capabilities. Checks go through the
//! `CapabilitySource` trait so the dispatcher can be exercised with a stub;
//! the production implementation wraps a casbin enforcer whose policies are
//! persisted in the `casbin_rule` table. Checks fail closed.

use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, MgmtApi};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::entity::casbin_rule;
use crate::error::AppResult;

/// Action constant used in stored policies
pub const ACTION_ACCESS: &str = "access";

/// Prefix distinguishing role subjects from usernames in stored rules
pub const ROLE_PREFIX: &str = "role:";

/// Discussion board capabilities
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    View,
    Append,
    Moderate,
    Admin,
}

impl Capability {
    /// Policy object name as stored in casbin rules
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::Append => "append",
            Capability::Moderate => "moderate",
            Capability::Admin => "admin",
        }
    }

    /// All capabilities, weakest first
    pub const ALL: [Capability; 4] = [
        Capability::View,
        Capability::Append,
        Capability::Moderate,
        Capability::Admin,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::View => "VIEW",
            Capability::Append => "APPEND",
            Capability::Moderate => "MODERATE",
            Capability::Admin => "ADMIN",
        };
        f.write_str(name)
    }
}

/// Authorization oracle consulted by the dispatcher
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Whether the subject holds the capability. Must fail closed.
    async fn has_capability(&self, subject: &str, capability: Capability) -> bool;
}

/// Permission enforcer wrapper
#[derive(Clone)]
pub struct PermissionEnforcer {
    enforcer: Arc<RwLock<Enforcer>>,
    db: DatabaseConnection,
}

impl PermissionEnforcer {
    /// Create a new permission enforcer
    pub async fn new(db: DatabaseConnection, model_path: &str) -> anyhow::Result<Self> {
        let model = DefaultModel::from_file(model_path).await?;
        let enforcer = Enforcer::new(model, ()).await?;

        let perm_enforcer = Self {
            enforcer: Arc::new(RwLock::new(enforcer)),
            db,
        };

        // Load policies from database
        perm_enforcer.load_policies().await?;

        Ok(perm_enforcer)
    }

    /// Load all policies from database
    pub async fn load_policies(&self) -> anyhow::Result<()> {
        let rules = casbin_rule::Entity::find().all(&self.db).await?;

        let mut enforcer = self.enforcer.write().await;
        enforcer.clear_policy().await?;

        for rule in rules {
            let policy = rule.to_policy_vec();
            if rule.ptype == "p" {
                let _ = enforcer.add_policy(policy).await;
            } else if rule.ptype == "g" {
                let _ = enforcer.add_grouping_policy(policy).await;
            }
        }

        Ok(())
    }

    /// Check if the subject may access the given object
    pub async fn check(&self, subject: &str, obj: &str, act: &str) -> bool {
        let enforcer = self.enforcer.read().await;
        enforcer.enforce((subject, obj, act)).unwrap_or(false)
    }

    /// Grant a capability to a subject, persisting the policy
    pub async fn grant(&self, subject: &str, capability: Capability) -> anyhow::Result<()> {
        let rule = casbin_rule::new_policy(subject, capability.as_str(), ACTION_ACCESS);
        rule.insert(&self.db).await?;

        let mut enforcer = self.enforcer.write().await;
        enforcer
            .add_policy(vec![
                subject.to_string(),
                capability.as_str().to_string(),
                ACTION_ACCESS.to_string(),
            ])
            .await?;

        Ok(())
    }

    /// Grant every capability the configured admin is missing
    ///
    /// Runs at startup so a fresh installation has a usable administrator.
    pub async fn ensure_admin(&self, admin_user: &str) -> anyhow::Result<()> {
        for capability in Capability::ALL {
            if !self.has_capability(admin_user, capability).await {
                self.grant(admin_user, capability).await?;
                tracing::info!("Granted {} to {}", capability, admin_user);
            }
        }
        Ok(())
    }

    /// Known user identities: distinct policy subjects that are not roles
    ///
    /// Serves the moderator-selection listing. Never consulted for
    /// authorization decisions.
    pub async fn known_subjects(&self) -> anyhow::Result<Vec<String>> {
        let rules = casbin_rule::Entity::find().all(&self.db).await?;

        let mut users: Vec<String> = Vec::new();
        for rule in rules {
            if rule.v0.starts_with(ROLE_PREFIX) {
                continue;
            }
            if !users.contains(&rule.v0) {
                users.push(rule.v0.clone());
            }
        }
        users.sort();
        Ok(users)
    }
}

#[async_trait]
impl CapabilitySource for PermissionEnforcer {
    async fn has_capability(&self, subject: &str, capability: Capability) -> bool {
        self.check(subject, capability.as_str(), ACTION_ACCESS).await
    }
}

/// Enumerates known user identities for the moderator-selection UI
///
/// Not part of any authorization decision.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn known_users(&self) -> AppResult<Vec<String>>;
}

#[async_trait]
impl IdentityDirectory for PermissionEnforcer {
    async fn known_users(&self) -> AppResult<Vec<String>> {
        Ok(self.known_subjects().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::Moderate.as_str(), "moderate");
        assert_eq!(Capability::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_all_capabilities_distinct() {
        let names: std::collections::HashSet<_> =
            Capability::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names.len(), 4);
    }
}
