use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::notify::Mailer;
use crate::permission::PermissionEnforcer;
use crate::render::TextRenderer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Permission enforcer
    pub perm: PermissionEnforcer,
    /// Application configuration
    pub config: Arc<Config>,
    /// Notification delivery collaborator
    pub mailer: Arc<dyn Mailer>,
    /// Body text renderer
    pub renderer: Arc<dyn TextRenderer>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: DatabaseConnection,
        perm: PermissionEnforcer,
        config: Config,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn TextRenderer>,
    ) -> Self {
        Self {
            db,
            perm,
            config: Arc::new(config),
            mailer,
            renderer,
        }
    }
}
