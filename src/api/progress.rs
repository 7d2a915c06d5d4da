use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use utoipa::{IntoParams, ToSchema};

use super::{ApiJson, ApiQuery, AppState, SharedTracker, require_user};
use crate::{
    error::Result,
    progress::{
        CourseShape, ProgressRecord, ProgressSummary, ProgressTracker, SqliteProgressStore,
        UserProgress,
    },
};

async fn tracker(state: &AppState, user_id: i64) -> SharedTracker {
    let database = state.database.clone();
    let shape = state.shape;
    state
        .trackers
        .get_with(user_id, async move {
            let store = SqliteProgressStore::new(database);
            let tracker = ProgressTracker::load(Some(user_id.to_string()), store)
                .await
                .with_shape(shape);
            Arc::new(tokio::sync::Mutex::new(tracker))
        })
        .await
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChapterRequest {
    pub course_id: String,
    pub module_index: u32,
    pub chapter_index: u32,
    /// Minutes spent, only used when completing
    #[serde(default)]
    pub time_spent: u32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub course_id: String,
    /// Each dimension falls back to the configured course shape on its own
    pub modules: Option<u32>,
    pub chapters_per_module: Option<u32>,
}

#[utoipa::path(
    context_path = "/api",
    path = "/progress",
    method(get),
    responses(
        (status = 200, description = "course id -> module index -> chapter index -> record"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<UserProgress>> {
    let user_id = require_user(&session, "track progress").await?;
    let tracker = tracker(&state, user_id).await;
    let tracker = tracker.lock().await;
    Ok(Json(tracker.progress().clone()))
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/complete",
    method(post),
    request_body = ChapterRequest,
    responses(
        (status = 200, description = "Updated chapter", body = ProgressRecord),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn complete_chapter(
    State(state): State<Arc<AppState>>,
    session: Session,
    ApiJson(req): ApiJson<ChapterRequest>,
) -> Result<Json<ProgressRecord>> {
    let user_id = require_user(&session, "track progress").await?;
    let tracker = tracker(&state, user_id).await;
    let mut tracker = tracker.lock().await;
    tracker
        .mark_chapter_complete(&req.course_id, req.module_index, req.chapter_index, req.time_spent)
        .await;
    Ok(Json(tracker.chapter_progress(
        &req.course_id,
        req.module_index,
        req.chapter_index,
    )))
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/incomplete",
    method(post),
    request_body = ChapterRequest,
    responses(
        (status = 200, description = "Updated chapter", body = ProgressRecord),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn incomplete_chapter(
    State(state): State<Arc<AppState>>,
    session: Session,
    ApiJson(req): ApiJson<ChapterRequest>,
) -> Result<Json<ProgressRecord>> {
    let user_id = require_user(&session, "track progress").await?;
    let tracker = tracker(&state, user_id).await;
    let mut tracker = tracker.lock().await;
    tracker
        .mark_chapter_incomplete(&req.course_id, req.module_index, req.chapter_index)
        .await;
    Ok(Json(tracker.chapter_progress(
        &req.course_id,
        req.module_index,
        req.chapter_index,
    )))
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/summary",
    method(get),
    params(SummaryQuery),
    responses(
        (status = 200, description = "Progress, study time and streak", body = ProgressSummary),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn summary(
    State(state): State<Arc<AppState>>,
    session: Session,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<ProgressSummary>> {
    let user_id = require_user(&session, "track progress").await?;
    let shape = CourseShape::new(
        query.modules.unwrap_or(state.shape.modules),
        query.chapters_per_module.unwrap_or(state.shape.chapters_per_module),
    );
    let tracker = tracker(&state, user_id).await;
    let tracker = tracker.lock().await;
    Ok(Json(tracker.summary(&query.course_id, shape)))
}

pub fn get_progress_scope() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/progress",
        Router::new()
            .route("/", get(get_progress))
            .route("/complete", post(complete_chapter))
            .route("/incomplete", post(incomplete_chapter))
            .route("/summary", get(summary)),
    )
}
