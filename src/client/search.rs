use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use tracing::warn;

use super::{CourseFunctions, Notifications};
use crate::{
    error::{Error, Result},
    search::{ArticleSearchRequest, MAX_PAGE_SIZE, SearchResults, Video, VideoSearchRequest},
};

/// Clears the loading flag when the search ends, however it ends
struct Loading<'a>(&'a AtomicBool);

impl<'a> Loading<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn found(notifications: &Notifications, count: usize) {
    notifications.success("Search complete", format!("Found {} results", count));
}

fn require_query(notifications: &Notifications, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        notifications.error("Search Error", "Please enter a search query");
        return Err(Error::Validation("Please enter a search query".to_string()));
    }
    Ok(())
}

/// Web and news articles for a topic
pub struct ArticleSearchClient<F> {
    functions: Arc<F>,
    results: Mutex<SearchResults>,
    loading: AtomicBool,
    notifications: Notifications,
}

impl<F: CourseFunctions> ArticleSearchClient<F> {
    pub fn new(functions: Arc<F>, notifications: Notifications) -> Self {
        Self {
            functions,
            results: Mutex::default(),
            loading: AtomicBool::new(false),
            notifications,
        }
    }

    pub fn results(&self) -> SearchResults {
        self.results.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        *self.results.lock() = SearchResults::default();
    }

    pub async fn search(&self, query: &str, limit: u32) -> Result<SearchResults> {
        require_query(&self.notifications, query)?;
        let _loading = Loading::start(&self.loading);
        self.clear();
        let request = ArticleSearchRequest {
            query: query.trim().to_string(),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        };
        match self.functions.search_articles(&request).await {
            Ok(results) => {
                *self.results.lock() = results.clone();
                found(&self.notifications, results.len());
                Ok(results)
            }
            Err(e) => {
                warn!("article search failed: {}", e);
                let message = format!("Search failed: {}", e);
                self.notifications.error("Search Error", message.clone());
                Err(Error::Remote(message))
            }
        }
    }
}

/// Videos for a topic
pub struct VideoSearchClient<F> {
    functions: Arc<F>,
    videos: Mutex<Vec<Video>>,
    loading: AtomicBool,
    notifications: Notifications,
}

impl<F: CourseFunctions> VideoSearchClient<F> {
    pub fn new(functions: Arc<F>, notifications: Notifications) -> Self {
        Self {
            functions,
            videos: Mutex::default(),
            loading: AtomicBool::new(false),
            notifications,
        }
    }

    pub fn videos(&self) -> Vec<Video> {
        self.videos.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.videos.lock().clear();
    }

    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Video>> {
        require_query(&self.notifications, query)?;
        let _loading = Loading::start(&self.loading);
        self.clear();
        let request = VideoSearchRequest {
            query: query.trim().to_string(),
            max_results: max_results.max(1),
        };
        match self.functions.search_videos(&request).await {
            Ok(response) => {
                *self.videos.lock() = response.videos.clone();
                found(&self.notifications, response.videos.len());
                Ok(response.videos)
            }
            Err(e) => {
                warn!("video search failed: {}", e);
                let message = format!("Video search failed: {}", e);
                self.notifications.error("Search Error", message.clone());
                Err(Error::Remote(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{NotificationKind, fake::FakeFunctions},
        search::{Thumbnail, VideoSearchResponse, WebResult},
    };

    fn web_result(title: &str) -> WebResult {
        WebResult {
            title: title.into(),
            url: format!("https://example.com/{title}"),
            snippet: String::new(),
            display_link: "example.com".into(),
            formatted_url: String::new(),
        }
    }

    fn video(id: &str) -> Video {
        Video {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            url: format!("https://www.youtube.com/watch?v={id}"),
            thumbnail: Thumbnail::default(),
            channel_title: String::new(),
            published_at: None,
            duration: None,
            view_count: None,
            like_count: None,
        }
    }

    #[tokio::test]
    async fn blank_query_is_rejected_locally() {
        let functions = Arc::new(FakeFunctions::default());
        let client = ArticleSearchClient::new(functions.clone(), Notifications::default());
        assert!(client.search(" ", 5).await.is_err());
        assert_eq!(functions.calls(), 0);
        assert!(!client.is_loading());
    }

    #[tokio::test]
    async fn blank_video_query_is_rejected_locally() {
        let functions = Arc::new(FakeFunctions::default());
        let notifications = Notifications::default();
        let client = VideoSearchClient::new(functions.clone(), notifications.clone());
        let err = client.search("\t ", 3).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(functions.calls(), 0);
        assert!(!client.is_loading());
        let notification = notifications.take().pop().unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.title, "Search Error");
    }

    #[tokio::test]
    async fn failure_clears_previous_results() {
        let functions = Arc::new(FakeFunctions::default());
        functions.articles.lock().push_back(Ok(SearchResults {
            web_results: vec![web_result("a"), web_result("b")],
            news_results: vec![],
        }));
        functions
            .articles
            .lock()
            .push_back(Err(anyhow::anyhow!("Google Search API error: 403")));
        let notifications = Notifications::default();
        let client = ArticleSearchClient::new(functions.clone(), notifications.clone());

        assert_eq!(client.search("rust", 10).await.unwrap().len(), 2);
        assert_eq!(client.results().web_results.len(), 2);
        assert_eq!(notifications.take()[0].description, "Found 2 results");

        let err = client.search("rust", 10).await.unwrap_err();
        assert_eq!(err.to_string(), "Search failed: Google Search API error: 403");
        assert!(client.results().is_empty());
        assert!(!client.is_loading());
        assert_eq!(notifications.take()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn video_search_keeps_results() {
        let functions = Arc::new(FakeFunctions::default());
        functions.videos.lock().push_back(Ok(VideoSearchResponse {
            videos: vec![video("abc")],
        }));
        functions
            .videos
            .lock()
            .push_back(Err(anyhow::anyhow!("YouTube API key not configured")));
        let client = VideoSearchClient::new(functions, Notifications::default());

        client.search("rust", 3).await.unwrap();
        assert_eq!(client.videos()[0].id, "abc");
        let err = client.search("rust", 3).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Video search failed: YouTube API key not configured"
        );
        assert!(client.videos().is_empty());
        client.clear();
    }
}
