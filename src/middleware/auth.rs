//! Identity middleware
//!
//! The board does not store or validate credentials. Identity comes from
//! the session (set by whatever login flow the deployment fronts the
//! service with) or from the `x-remote-user` header a reverse proxy doing
//! HTTP authentication injects. Everyone else is `anonymous`; what an
//! anonymous caller may do is purely a policy question for the
//! authorization rules.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tower_sessions::Session;

/// Session key for storing the username
pub const SESSION_USER_KEY: &str = "user";

/// Header carrying a proxy-authenticated username
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Identity of unauthenticated callers
pub const ANONYMOUS: &str = "anonymous";

/// Extension storing the current caller in the request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub username: String,
}

impl CurrentUser {
    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS
    }
}

/// Resolve the caller identity and stash it in the request extensions
pub async fn auth_layer(session: Session, mut request: Request<Body>, next: Next) -> Response {
    let from_session: Option<String> = session.get(SESSION_USER_KEY).await.unwrap_or(None);

    let username = match from_session {
        Some(username) if !username.is_empty() => username,
        _ => request
            .headers()
            .get(REMOTE_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_string(),
    };

    tracing::debug!("request identity: {}", username);
    request.extensions_mut().insert(CurrentUser { username });

    next.run(request).await
}
