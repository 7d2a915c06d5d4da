use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{ApiJson, AppState, USER_ID_KEY, require_user};
use crate::user::{self, UserInfo};

fn bad_request(message: String) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    context_path = "/api/user",
    path = "/create_user",
    method(post),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created successfully"),
        (status = 400, description = "Invalid or duplicate user")
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> impl IntoResponse {
    let CreateUserRequest {
        name,
        email,
        password,
    } = req;
    match user::create_user(&state.database, name, email, password).await {
        Ok(id) => {
            info!("created user {}", id);
            Json("User created successfully").into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    context_path = "/api/user",
    path = "/login",
    method(post),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 400, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    ApiJson(req): ApiJson<LoginRequest>,
) -> impl IntoResponse {
    let LoginRequest { email, password } = req;
    match user::login(&state.database, email, password).await {
        Ok(id) => match session.insert(USER_ID_KEY, id).await {
            Ok(_) => Json("Login successful").into_response(),
            Err(e) => {
                error!("session write failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        },
        Err(e) => bad_request(e.to_string()),
    }
}

#[utoipa::path(
    context_path = "/api/user",
    path = "/logout",
    method(post),
    responses(
        (status = 200, description = "Logout successful")
    )
)]
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.delete().await;
    Json("Logout successful").into_response()
}

#[utoipa::path(
    context_path = "/api/user",
    path = "/user_info",
    method(get),
    responses(
        (status = 200, description = "Signed in user", body = UserInfo),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn user_info(State(state): State<Arc<AppState>>, session: Session) -> impl IntoResponse {
    let user_id = match require_user(&session, "view your account").await {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match user::get_user_info(&state.database, user_id).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub fn get_user_scope() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/user",
        Router::new()
            .route("/create_user", post(create_user))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/user_info", get(user_info)),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::tests::{body_json, json_request, sign_in, test_app};

    fn user_info(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/user/user_info");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn session_follows_login_and_logout() {
        let (app, _) = test_app("http://127.0.0.1:9".into()).await;
        let response = app.clone().oneshot(user_info(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let cookie = sign_in(&app, "ada@example.com").await;
        let response = app.clone().oneshot(user_info(Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let user = body_json(response).await;
        assert_eq!(user["email"], "ada@example.com");

        let logout = Request::builder()
            .method(Method::POST)
            .uri("/api/user/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(logout).await.unwrap().status(), StatusCode::OK);
        let response = app.oneshot(user_info(Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (app, _) = test_app("http://127.0.0.1:9".into()).await;
        sign_in(&app, "grace@example.com").await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/user/login",
                json!({"email": "grace@example.com", "password": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn duplicate_email_is_reported_plainly() {
        let (app, _) = test_app("http://127.0.0.1:9".into()).await;
        sign_in(&app, "ada@example.com").await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/user/create_user",
                json!({"name": "Ada", "email": "ada@example.com", "password": "other"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Email already registered"})
        );
    }
}
