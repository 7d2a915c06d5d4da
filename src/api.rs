pub mod courses;
pub mod functions;
pub mod progress;
pub mod user;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use moka::future::Cache;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    ai_utils::LlmClient,
    config::Config,
    course::repository::CourseRepository,
    error::Error,
    generator::CourseGenerator,
    progress::{CourseShape, ProgressTracker, SqliteProgressStore},
    search::{GoogleArticleSearch, YouTubeSearch},
};

/// Session key of the signed in user's id
pub const USER_ID_KEY: &str = "user_id";

pub type SharedTracker = Arc<Mutex<ProgressTracker<SqliteProgressStore>>>;
/// One progress tracker per user, so a user has a single writer per process
pub type TrackerCache = Cache<i64, SharedTracker>;

pub struct AppState {
    pub database: SqlitePool,
    pub generator: CourseGenerator<YouTubeSearch>,
    pub articles: GoogleArticleSearch,
    pub videos: YouTubeSearch,
    pub courses: CourseRepository,
    pub trackers: TrackerCache,
    pub shape: CourseShape,
}

impl AppState {
    pub fn new(config: &Config, database: SqlitePool) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let videos = YouTubeSearch::new(http.clone(), config.search.clone());
        let generator = CourseGenerator::new(
            LlmClient::new(&config.ai),
            videos.clone(),
            config.generation.clone(),
        );
        Ok(Self {
            generator,
            articles: GoogleArticleSearch::new(http, config.search.clone()),
            videos,
            courses: CourseRepository::new(database.clone()),
            trackers: Cache::builder()
                .max_capacity(1000)
                .time_to_idle(Duration::from_secs(60 * 60))
                .build(),
            shape: config.progress,
            database,
        })
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::IncompleteCourse | Error::Remote(_) | Error::Storage(_) => {
                error!("request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `Json` extractor whose rejections render like every other error
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

/// Id of the signed in user, or an error naming what `action` needed it for
pub async fn require_user(session: &Session, action: &'static str) -> Result<i64, Error> {
    match session.get::<i64>(USER_ID_KEY).await {
        Ok(Some(id)) => Ok(id),
        Ok(None) => Err(Error::Unauthenticated(action)),
        Err(e) => {
            error!("session read failed: {}", e);
            Err(Error::Unauthenticated(action))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        functions::generate_course,
        functions::generate_content,
        functions::search_articles,
        functions::get_youtube_videos,
        user::create_user,
        user::login,
        user::logout,
        user::user_info,
        courses::save_course,
        courses::list_courses,
        courses::get_course,
        progress::get_progress,
        progress::complete_chapter,
        progress::incomplete_chapter,
        progress::summary,
    ),
    info(title = "AI course generator", version = "0.1.0")
)]
pub struct ApiDoc;

pub fn openapi_json() -> anyhow::Result<String> {
    Ok(ApiDoc::openapi().to_pretty_json()?)
}

pub fn router<Store: SessionStore + Clone>(state: Arc<AppState>, store: Store) -> Router {
    let sessions = SessionManagerLayer::new(store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(5)));
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .merge(functions::get_functions_scope())
        .merge(user::get_user_scope())
        .merge(courses::get_courses_scope())
        .merge(progress::get_progress_scope())
        .layer(sessions);

    Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TimeoutLayer::new(Duration::from_secs(180)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, header},
    };
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::{AiConfig, SearchConfig};

    pub(crate) async fn test_app(base_url: String) -> (Router, Arc<AppState>) {
        let config = Config {
            ai: AiConfig {
                api_key: "test".into(),
                base_url: base_url.clone(),
                ..Default::default()
            },
            search: SearchConfig {
                google_base_url: base_url.clone(),
                news_base_url: base_url.clone(),
                youtube_base_url: base_url,
                ..Default::default()
            },
            ..Default::default()
        };
        let database = crate::db::test_pool().await;
        let state = Arc::new(AppState::new(&config, database).unwrap());
        (router(state.clone(), MemoryStore::default()), state)
    }

    pub(crate) fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub(crate) async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Create a user, sign in and return the session cookie
    pub(crate) async fn sign_in(app: &Router, email: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/user/create_user",
                json!({"name": "Ada", "email": email, "password": "hunter2"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/user/login",
                json!({"email": email, "password": "hunter2"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn errors_render_as_json() {
        let response = Error::Validation("Topic is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "Topic is required"}));

        let response = Error::IncompleteCourse.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn openapi_lists_every_route() {
        let json = openapi_json().unwrap();
        for path in [
            "/api/functions/generate-course",
            "/api/user/login",
            "/api/courses/{id}",
            "/api/progress/summary",
        ] {
            assert!(json.contains(path), "{path} missing");
        }
    }

    #[tokio::test]
    async fn swagger_ui_is_served() {
        let (app, _) = test_app("http://127.0.0.1:9".into()).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
