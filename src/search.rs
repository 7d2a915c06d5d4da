pub mod articles;
pub mod videos;

use std::future::Future;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use articles::GoogleArticleSearch;
pub use videos::YouTubeSearch;

/// Upstream APIs never return more than this per page
pub const MAX_PAGE_SIZE: u32 = 10;

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub display_link: String,
    #[serde(default)]
    pub formatted_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub source: String,
    pub published_at: Option<String>,
    pub url_to_image: Option<String>,
}

/// Web and news hits for one query, already merged upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub web_results: Vec<WebResult>,
    pub news_results: Vec<NewsArticle>,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.web_results.len() + self.news_results.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Thumbnail {
    pub default: Option<String>,
    pub medium: Option<String>,
    pub high: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Thumbnail,
    #[serde(default)]
    pub channel_title: String,
    pub published_at: Option<String>,
    /// ISO 8601 duration, e.g. `PT12M3S`
    pub duration: Option<String>,
    pub view_count: Option<String>,
    pub like_count: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_limit")]
    pub max_results: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VideoSearchResponse {
    pub videos: Vec<Video>,
}

pub trait ArticleSearch: Send + Sync {
    fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> impl Future<Output = anyhow::Result<SearchResults>> + Send;
}

pub trait VideoSearch: Send + Sync {
    fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> impl Future<Output = anyhow::Result<Vec<Video>>> + Send;
}
