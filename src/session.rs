//! Per-viewer session state
//!
//! The discussion core needs two pieces of caller-scoped state that survive
//! across requests: the last time the viewer opened each topic (for "new"
//! message marking) and the preferred message-list display. Both live
//! behind the `ViewerSession` trait so the dispatcher receives them as an
//! explicit dependency.

use async_trait::async_trait;
use std::collections::HashMap;
use tower_sessions::Session;

use crate::error::AppResult;

/// Session key holding the topic-id -> last-visit-time map
pub const VISITED_TOPICS_KEY: &str = "visited-topics";
/// Session key holding the message list display preference
pub const DISPLAY_KEY: &str = "message-list-display";

/// Message list display preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Reply tree, roots in ascending time order
    #[default]
    Threaded,
    /// Flat, ascending by time
    FlatAsc,
    /// Flat, descending by time
    FlatDesc,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Threaded => "threaded",
            DisplayMode::FlatAsc => "flat-asc",
            DisplayMode::FlatDesc => "flat-desc",
        }
    }

    /// Parse a stored or submitted display value, defaulting to threaded
    pub fn parse(value: &str) -> Self {
        match value {
            "flat-asc" => DisplayMode::FlatAsc,
            "flat-desc" => DisplayMode::FlatDesc,
            _ => DisplayMode::Threaded,
        }
    }
}

/// Caller-scoped view state, read and rewritten once per message listing
#[async_trait]
pub trait ViewerSession: Send + Sync {
    /// Last time the viewer opened the topic, 0 when never
    async fn last_visit(&self, topic_id: i64) -> AppResult<i64>;

    /// Record that the viewer opened the topic now
    async fn record_visit(&self, topic_id: i64, time: i64) -> AppResult<()>;

    /// The viewer's message list display preference
    async fn display(&self) -> AppResult<DisplayMode>;

    /// Store the viewer's message list display preference
    async fn set_display(&self, display: DisplayMode) -> AppResult<()>;
}

/// `ViewerSession` over the tower-sessions cookie session
#[derive(Clone)]
pub struct HttpSession {
    session: Session,
}

impl HttpSession {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    async fn visited(&self) -> AppResult<HashMap<String, i64>> {
        Ok(self
            .session
            .get::<HashMap<String, i64>>(VISITED_TOPICS_KEY)
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl ViewerSession for HttpSession {
    async fn last_visit(&self, topic_id: i64) -> AppResult<i64> {
        let visited = self.visited().await?;
        Ok(visited.get(&topic_id.to_string()).copied().unwrap_or(0))
    }

    async fn record_visit(&self, topic_id: i64, time: i64) -> AppResult<()> {
        let mut visited = self.visited().await?;
        visited.insert(topic_id.to_string(), time);
        self.session.insert(VISITED_TOPICS_KEY, visited).await?;
        Ok(())
    }

    async fn display(&self) -> AppResult<DisplayMode> {
        let stored = self.session.get::<String>(DISPLAY_KEY).await?;
        Ok(stored
            .map(|value| DisplayMode::parse(&value))
            .unwrap_or_default())
    }

    async fn set_display(&self, display: DisplayMode) -> AppResult<()> {
        self.session
            .insert(DISPLAY_KEY, display.as_str().to_string())
            .await?;
        Ok(())
    }
}

/// In-memory `ViewerSession` used by the tests
#[derive(Default)]
pub struct MemorySession {
    visited: std::sync::Mutex<HashMap<i64, i64>>,
    display: std::sync::Mutex<Option<DisplayMode>>,
}

#[async_trait]
impl ViewerSession for MemorySession {
    async fn last_visit(&self, topic_id: i64) -> AppResult<i64> {
        Ok(self
            .visited
            .lock()
            .unwrap()
            .get(&topic_id)
            .copied()
            .unwrap_or(0))
    }

    async fn record_visit(&self, topic_id: i64, time: i64) -> AppResult<()> {
        self.visited.lock().unwrap().insert(topic_id, time);
        Ok(())
    }

    async fn display(&self) -> AppResult<DisplayMode> {
        Ok(self.display.lock().unwrap().unwrap_or_default())
    }

    async fn set_display(&self, display: DisplayMode) -> AppResult<()> {
        *self.display.lock().unwrap() = Some(display);
        Ok(())
    }
}
