use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::handlers;
use crate::middleware::auth_layer;
use crate::state::AppState;

pub mod health;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // Session store (in-memory for now)
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false) // Set to true in production with HTTPS
        .with_http_only(true);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let discussion = get(handlers::discussion::standalone).post(handlers::discussion::standalone);
    let admin = get(handlers::discussion::admin).post(handlers::discussion::admin);
    let embedded = get(handlers::discussion::embedded).post(handlers::discussion::embedded);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Static discussion endpoints; registered before the id captures
        .route("/discussion/redirect", get(handlers::discussion::redirect))
        .route("/discussion/search", get(handlers::search::search))
        .route("/discussion/timeline", get(handlers::timeline::timeline))
        // Standalone board
        .route("/discussion", discussion.clone())
        .route("/discussion/:forum", discussion.clone())
        .route("/discussion/:forum/:topic", discussion.clone())
        .route("/discussion/:forum/:topic/:message", discussion)
        // Administration panel
        .route("/admin/discussion", admin.clone())
        .route("/admin/discussion/:forum", admin)
        // Embedded listing for pages that render around it
        .route("/embed/discussion", embedded.clone())
        .route("/embed/discussion/:forum", embedded.clone())
        .route("/embed/discussion/:forum/:topic", embedded.clone())
        .route("/embed/discussion/:forum/:topic/:message", embedded)
        .layer(middleware::from_fn(auth_layer))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
