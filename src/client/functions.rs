use std::future::Future;

use anyhow::bail;
use reqwest::{Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, error};

use crate::{
    course::{Course, GeneratedCourse},
    generator::{ContentRequest, ContentResponse, GenerateCourseRequest},
    search::{ArticleSearchRequest, SearchResults, VideoSearchRequest, VideoSearchResponse},
    user::UserInfo,
};

/// The remote functions a client calls. Generated courses come back as raw json
/// so the caller can check them for completeness.
pub trait CourseFunctions: Send + Sync {
    fn generate_course(
        &self,
        request: &GenerateCourseRequest,
    ) -> impl Future<Output = anyhow::Result<serde_json::Value>> + Send;

    fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> impl Future<Output = anyhow::Result<ContentResponse>> + Send;

    fn search_articles(
        &self,
        request: &ArticleSearchRequest,
    ) -> impl Future<Output = anyhow::Result<SearchResults>> + Send;

    fn search_videos(
        &self,
        request: &VideoSearchRequest,
    ) -> impl Future<Output = anyhow::Result<VideoSearchResponse>> + Send;

    fn save_course(
        &self,
        course: &GeneratedCourse,
    ) -> impl Future<Output = anyhow::Result<Course>> + Send;
}

/// Message of a failed call: the `error` field of a json body, the body text, or the status.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
            return error.to_string();
        }
    }
    if text.trim().is_empty() {
        format!("Request failed with status {}", status)
    } else {
        text
    }
}

/// [`CourseFunctions`] over the service's HTTP api, keeping the session cookie
#[derive(Debug, Clone)]
pub struct HttpFunctions {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFunctions {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn check(response: Response) -> anyhow::Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        if response.status() == StatusCode::UNAUTHORIZED {
            bail!("Please sign in first");
        }
        let message = error_message(response).await;
        error!("remote call failed: {}", message);
        bail!(message)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        debug!("POST {}", path);
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Start a cookie session for `email`
    pub async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<UserInfo> {
        let response = self
            .http
            .post(self.url("/user/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;
        Self::check(response).await?;
        let response = self.http.get(self.url("/user/user_info")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn list_courses(&self) -> anyhow::Result<Vec<Course>> {
        let response = self.http.get(self.url("/courses")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

impl CourseFunctions for HttpFunctions {
    async fn generate_course(
        &self,
        request: &GenerateCourseRequest,
    ) -> anyhow::Result<serde_json::Value> {
        self.post("/functions/generate-course", request).await
    }

    async fn generate_content(&self, request: &ContentRequest) -> anyhow::Result<ContentResponse> {
        self.post("/functions/generate-content", request).await
    }

    async fn search_articles(&self, request: &ArticleSearchRequest) -> anyhow::Result<SearchResults> {
        self.post("/functions/search-articles", request).await
    }

    async fn search_videos(
        &self,
        request: &VideoSearchRequest,
    ) -> anyhow::Result<VideoSearchResponse> {
        self.post("/functions/get-youtube-videos", request).await
    }

    async fn save_course(&self, course: &GeneratedCourse) -> anyhow::Result<Course> {
        self.post("/courses", course).await
    }
}
