//! Discussion search handler
//!
//! Substring search over topics and message bodies, VIEW-gated.

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::permission::{Capability, CapabilitySource};
use crate::repository;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub kind: &'static str,
    pub id: i64,
    pub forum: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<i64>,
    pub time: i64,
    pub author: String,
    pub title: String,
    pub excerpt: String,
}

/// GET /discussion/search?q=
pub async fn search(
    State(state): State<crate::AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<SearchHit>>> {
    if !state
        .perm
        .has_capability(&user.username, Capability::View)
        .await
    {
        return Err(AppError::CapabilityRequired(Capability::View));
    }

    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let hits = repository::search(&state.db, query)
        .await?
        .into_iter()
        .map(|hit| SearchHit {
            kind: hit.kind,
            id: hit.id,
            forum: hit.forum,
            topic: hit.topic,
            time: hit.time,
            author: state.renderer.render_inline(&hit.author),
            title: state.renderer.render_inline(&hit.title),
            excerpt: excerpt(&state.renderer.render_inline(&hit.body)),
        })
        .collect();

    Ok(Json(hits))
}

/// Shorten a body to a result line
fn excerpt(body: &str) -> String {
    const MAX: usize = 240;
    if body.chars().count() <= MAX {
        return body.to_string();
    }
    let cut: String = body.chars().take(MAX).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_body_unchanged() {
        assert_eq!(excerpt("hello"), "hello");
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        let result = excerpt(&long);
        assert!(result.ends_with("..."));
        assert!(result.chars().count() <= 243);
    }
}
