//! Discussion request handlers
//!
//! Translates HTTP requests into `DiscussionRequest`s for the dispatcher
//! and its outcome back into a response. Three surfaces share one request
//! shape: the standalone board, the administration panel and the embedded
//! listing. Path segments address forum/topic/message; anything may also
//! arrive as a query or form field, with form values winning.

use axum::{
    extract::{Extension, Form, OriginalUri, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower_sessions::Session;

use crate::dispatch::{Dispatcher, DiscussionRequest, FormFields, Outcome, Payload};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::modes::Surface;
use crate::session::HttpSession;
use crate::state::AppState;

/// Query/form parameters of a discussion request
///
/// Everything is optional; absence and presence both carry meaning (the
/// preview flag is presence-only, like a submit button).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DiscussionParams {
    pub group: Option<i64>,
    pub forum: Option<i64>,
    pub topic: Option<i64>,
    pub message: Option<i64>,
    #[serde(rename = "discussion_action")]
    pub action: Option<String>,
    pub preview: Option<String>,
    pub submit: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
    /// Space-separated moderator usernames
    pub moderators: Option<String>,
    pub new_forum: Option<i64>,
    /// Comma-separated ids for bulk deletes
    pub selection: Option<String>,
    pub order: Option<String>,
    pub asc: Option<String>,
    pub desc: Option<String>,
    pub start: Option<i64>,
    pub display: Option<String>,
}

impl DiscussionParams {
    /// Merge form values over query values
    fn merged(query: Self, form: Option<Self>) -> Self {
        let Some(form) = form else { return query };
        Self {
            group: form.group.or(query.group),
            forum: form.forum.or(query.forum),
            topic: form.topic.or(query.topic),
            message: form.message.or(query.message),
            action: form.action.or(query.action),
            preview: form.preview.or(query.preview),
            submit: form.submit.or(query.submit),
            name: form.name.or(query.name),
            description: form.description.or(query.description),
            subject: form.subject.or(query.subject),
            author: form.author.or(query.author),
            body: form.body.or(query.body),
            moderators: form.moderators.or(query.moderators),
            new_forum: form.new_forum.or(query.new_forum),
            selection: form.selection.or(query.selection),
            order: form.order.or(query.order),
            asc: form.asc.or(query.asc),
            desc: form.desc.or(query.desc),
            start: form.start.or(query.start),
            display: form.display.or(query.display),
        }
    }
}

fn parse_flag(value: &Option<String>) -> Option<bool> {
    value.as_deref().map(|v| v == "1" || v == "true")
}

fn parse_id_list(value: &Option<String>) -> Vec<i64> {
    value
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

fn parse_name_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Build the dispatcher request from the merged parameters
fn build_request(
    surface: Surface,
    user: &CurrentUser,
    path: String,
    path_ids: &HashMap<String, String>,
    params: DiscussionParams,
) -> DiscussionRequest {
    let path_id = |key: &str| path_ids.get(key).and_then(|raw| raw.parse::<i64>().ok());

    DiscussionRequest {
        surface,
        action: params.action.clone(),
        preview: params.preview.is_some(),
        authname: user.username.clone(),
        path,
        group_id: params.group,
        forum_id: path_id("forum").or(params.forum),
        topic_id: path_id("topic").or(params.topic),
        message_id: path_id("message").or(params.message),
        form: FormFields {
            name: params.name,
            description: params.description,
            subject: params.subject,
            author: params.author,
            body: params.body,
            moderators: parse_name_list(&params.moderators),
            group: params.group,
            forum: params.forum,
            new_forum: params.new_forum,
            selection: parse_id_list(&params.selection),
            order: params.order,
            asc: parse_flag(&params.asc),
            desc: parse_flag(&params.desc),
            start: params.start,
            display: params.display,
        },
    }
}

/// Rendered result: the chosen view plus the accumulated data
#[derive(Serialize)]
struct Rendered {
    view: &'static str,
    #[serde(flatten)]
    payload: Box<Payload>,
}

async fn serve(
    state: AppState,
    session: Session,
    user: CurrentUser,
    surface: Surface,
    uri: OriginalUri,
    path_ids: HashMap<String, String>,
    query: DiscussionParams,
    form: Option<DiscussionParams>,
) -> AppResult<Response> {
    let params = DiscussionParams::merged(query, form);
    let request = build_request(surface, &user, uri.path().to_string(), &path_ids, params);

    let viewer = HttpSession::new(session);
    let dispatcher = Dispatcher {
        db: &state.db,
        caps: &state.perm,
        directory: &state.perm,
        viewer: &viewer,
        renderer: state.renderer.as_ref(),
        mailer: state.mailer.as_ref(),
        discussion: &state.config.discussion,
    };

    match dispatcher.process(&request).await? {
        Outcome::Render { view, payload } => Ok(Json(Rendered { view, payload }).into_response()),
        Outcome::Redirect { location } => Ok(Redirect::to(&location).into_response()),
    }
}

/// GET/POST /discussion[/{forum}[/{topic}[/{message}]]]
pub async fn standalone(
    State(state): State<AppState>,
    session: Session,
    Extension(user): Extension<CurrentUser>,
    uri: OriginalUri,
    Path(path_ids): Path<HashMap<String, String>>,
    Query(query): Query<DiscussionParams>,
    form: Option<Form<DiscussionParams>>,
) -> AppResult<Response> {
    serve(
        state,
        session,
        user,
        Surface::Standalone,
        uri,
        path_ids,
        query,
        form.map(|Form(f)| f),
    )
    .await
}

/// GET/POST /admin/discussion[...]
pub async fn admin(
    State(state): State<AppState>,
    session: Session,
    Extension(user): Extension<CurrentUser>,
    uri: OriginalUri,
    Path(path_ids): Path<HashMap<String, String>>,
    Query(query): Query<DiscussionParams>,
    form: Option<Form<DiscussionParams>>,
) -> AppResult<Response> {
    serve(
        state,
        session,
        user,
        Surface::Admin,
        uri,
        path_ids,
        query,
        form.map(|Form(f)| f),
    )
    .await
}

/// GET/POST /embed/discussion[...]
pub async fn embedded(
    State(state): State<AppState>,
    session: Session,
    Extension(user): Extension<CurrentUser>,
    uri: OriginalUri,
    Path(path_ids): Path<HashMap<String, String>>,
    Query(query): Query<DiscussionParams>,
    form: Option<Form<DiscussionParams>>,
) -> AppResult<Response> {
    serve(
        state,
        session,
        user,
        Surface::Embedded,
        uri,
        path_ids,
        query,
        form.map(|Form(f)| f),
    )
    .await
}

#[derive(Deserialize)]
pub struct RedirectParams {
    pub href: Option<String>,
}

/// GET /discussion/redirect?href= - post-mutation bounce target
pub async fn redirect(Query(params): Query<RedirectParams>) -> AppResult<Response> {
    let href = params.href.unwrap_or_else(|| "/discussion".to_string());
    // Local paths only.
    if !href.starts_with('/') || href.starts_with("//") {
        return Err(AppError::BadRequest("invalid redirect target".to_string()));
    }
    Ok(Redirect::to(&href).into_response())
}
