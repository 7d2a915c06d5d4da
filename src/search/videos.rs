use std::collections::HashMap;

use anyhow::bail;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::{Thumbnail, Video, VideoSearch};
use crate::config::SearchConfig;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct ThumbnailUrl {
    url: String,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    default: Option<ThumbnailUrl>,
    medium: Option<ThumbnailUrl>,
    high: Option<ThumbnailUrl>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    #[serde(default)]
    channel_title: String,
    published_at: Option<String>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Snippet,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize, Default)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsItem {
    id: String,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    items: Vec<DetailsItem>,
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// YouTube Data API v3: `search` for ids, then `videos` for duration and statistics
#[derive(Debug, Clone)]
pub struct YouTubeSearch {
    http: reqwest::Client,
    config: SearchConfig,
}

impl YouTubeSearch {
    pub fn new(http: reqwest::Client, config: SearchConfig) -> Self {
        Self { http, config }
    }

    async fn details(&self, key: &str, ids: &[&str]) -> anyhow::Result<HashMap<String, DetailsItem>> {
        let ids = ids.join(",");
        let response = self
            .http
            .get(format!("{}/videos", self.config.youtube_base_url))
            .query(&[
                ("part", "contentDetails,statistics"),
                ("id", ids.as_str()),
                ("key", key),
            ])
            .send()
            .await?
            .error_for_status()?;
        let data: DetailsResponse = response.json().await?;
        Ok(data
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect())
    }
}

impl VideoSearch for YouTubeSearch {
    async fn search(&self, query: &str, max_results: u32) -> anyhow::Result<Vec<Video>> {
        let Some(key) = &self.config.youtube_api_key else {
            bail!("YouTube API key not configured");
        };
        info!("Searching YouTube for: {}", query);
        let max_results = max_results.to_string();
        let response = self
            .http
            .get(format!("{}/search", self.config.youtube_base_url))
            .query(&[
                ("part", "snippet"),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("type", "video"),
                ("key", key.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            error!("YouTube API error: {}", response.text().await.unwrap_or_default());
            bail!("YouTube API error: {}", status.as_u16());
        }
        let data: SearchResponse = response.json().await?;
        let items: Vec<(String, Snippet)> = data
            .items
            .into_iter()
            .filter_map(|item| Some((item.id.video_id?, item.snippet)))
            .collect();
        if items.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<&str> = items.iter().map(|(id, _)| id.as_str()).collect();
        let mut details = match self.details(key, &ids).await {
            Ok(details) => details,
            Err(e) => {
                warn!("YouTube video details unavailable: {}", e);
                HashMap::new()
            }
        };

        let videos = items
            .into_iter()
            .map(|(id, snippet)| {
                let detail = details.remove(&id);
                let (content_details, statistics) = detail
                    .map(|d| (d.content_details, d.statistics))
                    .unwrap_or_default();
                Video {
                    url: watch_url(&id),
                    title: snippet.title,
                    description: snippet.description,
                    thumbnail: Thumbnail {
                        default: snippet.thumbnails.default.map(|t| t.url),
                        medium: snippet.thumbnails.medium.map(|t| t.url),
                        high: snippet.thumbnails.high.map(|t| t.url),
                    },
                    channel_title: snippet.channel_title,
                    published_at: snippet.published_at,
                    duration: content_details.duration,
                    view_count: statistics.view_count,
                    like_count: statistics.like_count,
                    id,
                }
            })
            .collect();
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn config(server: &mockito::Server) -> SearchConfig {
        SearchConfig {
            youtube_api_key: Some("ykey".into()),
            youtube_base_url: server.url(),
            ..Default::default()
        }
    }

    async fn mock_search(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "rust tutorial".into()),
                Matcher::UrlEncoded("maxResults".into(), "2".into()),
                Matcher::UrlEncoded("type".into(), "video".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                json!({"items": [
                    {
                        "id": {"kind": "youtube#video", "videoId": "abc"},
                        "snippet": {
                            "title": "Rust in 100 seconds",
                            "description": "fast",
                            "thumbnails": {"default": {"url": "https://i.ytimg.com/abc/default.jpg"}},
                            "channelTitle": "Fireship",
                            "publishedAt": "2021-09-01T00:00:00Z"
                        }
                    },
                    {
                        "id": {"kind": "youtube#channel", "channelId": "xyz"},
                        "snippet": {"title": "not a video"}
                    }
                ]})
                .to_string(),
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn merges_details_by_id() {
        let mut server = mockito::Server::new_async().await;
        let _search = mock_search(&mut server).await;
        let _details = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "abc".into()))
            .with_header("content-type", "application/json")
            .with_body(
                json!({"items": [{
                    "id": "abc",
                    "contentDetails": {"duration": "PT2M20S"},
                    "statistics": {"viewCount": "100", "likeCount": "7"}
                }]})
                .to_string(),
            )
            .create_async()
            .await;

        let search = YouTubeSearch::new(reqwest::Client::new(), config(&server));
        let videos = search.search("rust tutorial", 2).await.unwrap();
        assert_eq!(videos.len(), 1);
        let video = &videos[0];
        assert_eq!(video.url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(video.duration.as_deref(), Some("PT2M20S"));
        assert_eq!(video.like_count.as_deref(), Some("7"));
        assert_eq!(video.thumbnail.medium, None);
        assert_eq!(video.channel_title, "Fireship");
    }

    #[tokio::test]
    async fn details_failure_still_returns_videos() {
        let mut server = mockito::Server::new_async().await;
        let _search = mock_search(&mut server).await;
        let _details = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let search = YouTubeSearch::new(reqwest::Client::new(), config(&server));
        let videos = search.search("rust tutorial", 2).await.unwrap();
        assert_eq!(videos[0].id, "abc");
        assert_eq!(videos[0].view_count, None);
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let server = mockito::Server::new_async().await;
        let mut config = config(&server);
        config.youtube_api_key = None;
        let search = YouTubeSearch::new(reqwest::Client::new(), config);
        assert!(search.search("rust", 3).await.is_err());
    }
}
