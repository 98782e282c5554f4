//! Discussion timeline handler
//!
//! Recent forum/topic/message creations in a time window, VIEW-gated.

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::permission::{Capability, CapabilitySource};
use crate::repository;

/// Default look-back window in days
const DEFAULT_DAYSBACK: i64 = 90;

#[derive(Debug, Default, Deserialize)]
pub struct TimelineParams {
    /// Window start (unix seconds); defaults to 90 days back
    pub since: Option<i64>,
    /// Window end (unix seconds); defaults to now
    pub until: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TimelineEvent {
    pub kind: &'static str,
    pub id: i64,
    pub forum: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<i64>,
    pub time: i64,
    pub author: String,
    pub title: String,
}

/// GET /discussion/timeline
pub async fn timeline(
    State(state): State<crate::AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<TimelineParams>,
) -> AppResult<Json<Vec<TimelineEvent>>> {
    if !state
        .perm
        .has_capability(&user.username, Capability::View)
        .await
    {
        return Err(AppError::CapabilityRequired(Capability::View));
    }

    let until = params.until.unwrap_or_else(|| Utc::now().timestamp());
    let since = params
        .since
        .unwrap_or(until - DEFAULT_DAYSBACK * 24 * 60 * 60);

    let events = repository::recent_activity(&state.db, since, until)
        .await?
        .into_iter()
        .map(|hit| TimelineEvent {
            kind: hit.kind,
            id: hit.id,
            forum: hit.forum,
            topic: hit.topic,
            time: hit.time,
            author: state.renderer.render_inline(&hit.author),
            title: state.renderer.render_inline(&hit.title),
        })
        .collect();

    Ok(Json(events))
}
