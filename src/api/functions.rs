use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::post,
};

use super::{ApiJson, AppState};
use crate::{
    course::GeneratedCourse,
    error::{Error, Result},
    generator::{ContentRequest, ContentResponse, GenerateCourseRequest},
    search::{
        ArticleSearch, ArticleSearchRequest, SearchResults, VideoSearch, VideoSearchRequest,
        VideoSearchResponse,
    },
};

fn require_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::Validation("Query is required".to_string()));
    }
    Ok(query)
}

#[utoipa::path(
    context_path = "/api/functions",
    path = "/generate-course",
    method(post),
    request_body = GenerateCourseRequest,
    responses(
        (status = 200, description = "Generated course", body = GeneratedCourse),
        (status = 400, description = "Title and level are required"),
        (status = 500, description = "Generation failed")
    )
)]
pub async fn generate_course(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GenerateCourseRequest>,
) -> Result<Json<GeneratedCourse>> {
    Ok(Json(state.generator.generate_course(req).await?))
}

#[utoipa::path(
    context_path = "/api/functions",
    path = "/generate-content",
    method(post),
    request_body = ContentRequest,
    responses(
        (status = 200, description = "Markdown chapter body", body = ContentResponse),
        (status = 400, description = "Topic is required"),
        (status = 500, description = "Generation failed")
    )
)]
pub async fn generate_content(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<Json<ContentResponse>> {
    Ok(Json(state.generator.generate_content(req).await?))
}

#[utoipa::path(
    context_path = "/api/functions",
    path = "/search-articles",
    method(post),
    request_body = ArticleSearchRequest,
    responses(
        (status = 200, description = "Web and news results", body = SearchResults),
        (status = 400, description = "Query is required"),
        (status = 500, description = "Search failed")
    )
)]
pub async fn search_articles(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ArticleSearchRequest>,
) -> Result<Json<SearchResults>> {
    let query = require_query(&req.query)?;
    let results = state
        .articles
        .search(query, req.limit)
        .await
        .map_err(Error::remote)?;
    Ok(Json(results))
}

#[utoipa::path(
    context_path = "/api/functions",
    path = "/get-youtube-videos",
    method(post),
    request_body = VideoSearchRequest,
    responses(
        (status = 200, description = "Videos with details", body = VideoSearchResponse),
        (status = 400, description = "Query is required"),
        (status = 500, description = "Search failed")
    )
)]
pub async fn get_youtube_videos(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VideoSearchRequest>,
) -> Result<Json<VideoSearchResponse>> {
    let query = require_query(&req.query)?;
    let videos = state
        .videos
        .search(query, req.max_results)
        .await
        .map_err(Error::remote)?;
    Ok(Json(VideoSearchResponse { videos }))
}

pub fn get_functions_scope() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/functions",
        Router::new()
            .route("/generate-course", post(generate_course))
            .route("/generate-content", post(generate_content))
            .route("/search-articles", post(search_articles))
            .route("/get-youtube-videos", post(get_youtube_videos)),
    )
}
