use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use tower_sessions::Session;

use super::{ApiJson, AppState, require_user};
use crate::{
    course::{Course, GeneratedCourse},
    error::{Error, Result},
};

#[utoipa::path(
    context_path = "/api",
    path = "/courses",
    method(post),
    request_body = GeneratedCourse,
    responses(
        (status = 200, description = "Saved course", body = Course),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn save_course(
    State(state): State<Arc<AppState>>,
    session: Session,
    ApiJson(course): ApiJson<GeneratedCourse>,
) -> Result<Json<Course>> {
    let user_id = require_user(&session, "save courses").await?;
    if course.title.trim().is_empty() {
        return Err(Error::Validation("Course title is required".to_string()));
    }
    let saved = state
        .courses
        .insert(user_id, &course)
        .await
        .map_err(Error::storage)?;
    Ok(Json(saved))
}

#[utoipa::path(
    context_path = "/api",
    path = "/courses",
    method(get),
    responses(
        (status = 200, description = "Courses of the signed in user, newest first", body = Vec<Course>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Vec<Course>>> {
    let user_id = require_user(&session, "view your courses").await?;
    let courses = state
        .courses
        .list_for_user(user_id)
        .await
        .map_err(Error::storage)?;
    Ok(Json(courses))
}

#[utoipa::path(
    context_path = "/api",
    path = "/courses/{id}",
    method(get),
    params(
        ("id" = i64, Path, description = "Course id")
    ),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<Course>> {
    let user_id = require_user(&session, "view your courses").await?;
    state
        .courses
        .get(user_id, id)
        .await
        .map_err(Error::storage)?
        .map(Json)
        .ok_or(Error::NotFound("Course"))
}

pub fn get_courses_scope() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses", get(list_courses).post(save_course))
        .route("/courses/{id}", get(get_course))
}
