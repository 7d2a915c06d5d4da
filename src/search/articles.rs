use anyhow::bail;
use serde::Deserialize;
use tracing::{error, info};

use super::{ArticleSearch, MAX_PAGE_SIZE, NewsArticle, SearchResults, WebResult};
use crate::config::SearchConfig;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
    #[serde(default)]
    formatted_url: String,
}

#[derive(Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Deserialize)]
struct NewsSource {
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    description: Option<String>,
    source: Option<NewsSource>,
    published_at: Option<String>,
    url_to_image: Option<String>,
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsItem>,
}

impl From<CseItem> for WebResult {
    fn from(item: CseItem) -> Self {
        WebResult {
            title: item.title,
            url: item.link,
            snippet: item.snippet,
            display_link: item.display_link,
            formatted_url: item.formatted_url,
        }
    }
}

impl From<NewsItem> for NewsArticle {
    fn from(item: NewsItem) -> Self {
        NewsArticle {
            title: item.title,
            url: item.url,
            description: item.description,
            source: item.source.and_then(|s| s.name).unwrap_or_default(),
            published_at: item.published_at,
            url_to_image: item.url_to_image,
        }
    }
}

/// Google Custom Search for web pages, NewsAPI for news when a key is configured
#[derive(Debug, Clone)]
pub struct GoogleArticleSearch {
    http: reqwest::Client,
    config: SearchConfig,
}

impl GoogleArticleSearch {
    pub fn new(http: reqwest::Client, config: SearchConfig) -> Self {
        Self { http, config }
    }

    async fn web(&self, query: &str, limit: u32) -> anyhow::Result<Vec<WebResult>> {
        let (Some(key), Some(cx)) = (&self.config.google_api_key, &self.config.google_cse_id)
        else {
            bail!("Google Search API credentials not configured");
        };
        let num = limit.min(MAX_PAGE_SIZE).to_string();
        let response = self
            .http
            .get(&self.config.google_base_url)
            .query(&[("key", key.as_str()), ("cx", cx.as_str()), ("q", query), ("num", num.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            error!("Google Search API error: {}", response.text().await.unwrap_or_default());
            bail!("Google Search API error: {}", status.as_u16());
        }
        let data: CseResponse = response.json().await?;
        Ok(data.items.into_iter().map(WebResult::from).collect())
    }

    async fn news(&self, key: &str, query: &str, limit: u32) -> anyhow::Result<Vec<NewsArticle>> {
        let page_size = limit.min(MAX_PAGE_SIZE).to_string();
        let response = self
            .http
            .get(format!("{}/everything", self.config.news_base_url))
            .query(&[
                ("q", query),
                ("sortBy", "relevancy"),
                ("pageSize", page_size.as_str()),
                ("apiKey", key),
            ])
            .send()
            .await?
            .error_for_status()?;
        let data: NewsResponse = response.json().await?;
        Ok(data.articles.into_iter().map(NewsArticle::from).collect())
    }
}

impl ArticleSearch for GoogleArticleSearch {
    async fn search(&self, query: &str, limit: u32) -> anyhow::Result<SearchResults> {
        info!("Searching articles for: {}", query);
        let web_results = self.web(query, limit).await?;
        let news_results = match &self.config.news_api_key {
            Some(key) => match self.news(key, query, limit).await {
                Ok(news) => news,
                Err(e) => {
                    // news is optional, keep the web results
                    error!("News API error: {}", e);
                    vec![]
                }
            },
            None => vec![],
        };
        Ok(SearchResults {
            web_results,
            news_results,
        })
    }
}
