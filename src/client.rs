//! Caller side of the course functions: request lifecycle state, validation
//! before any remote call, and user facing notifications.

pub mod functions;
pub mod generation;
pub mod search;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

pub use functions::{CourseFunctions, HttpFunctions};
pub use generation::{GenerationClient, GenerationState};
pub use search::{ArticleSearchClient, VideoSearchClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Toast style message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

/// Shared queue of notifications, drained by whatever renders them
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    queue: Arc<Mutex<Vec<Notification>>>,
}

impl Notifications {
    pub fn success(&self, title: impl Into<String>, description: impl Into<String>) {
        self.push(NotificationKind::Success, title.into(), description.into());
    }

    pub fn error(&self, title: impl Into<String>, description: impl Into<String>) {
        self.push(NotificationKind::Error, title.into(), description.into());
    }

    fn push(&self, kind: NotificationKind, title: String, description: String) {
        self.queue.lock().push(Notification {
            kind,
            title,
            description,
        });
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.queue.lock())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::oneshot;

    use super::*;
    use crate::{
        course::{Course, GeneratedCourse},
        generator::{ContentRequest, ContentResponse, GenerateCourseRequest},
        search::{ArticleSearchRequest, SearchResults, VideoSearchRequest, VideoSearchResponse},
    };

    type Gate = Option<oneshot::Receiver<()>>;

    /// Scripted remote functions, every call pops the next queued answer
    #[derive(Default)]
    pub struct FakeFunctions {
        pub generate: Mutex<VecDeque<(Gate, anyhow::Result<serde_json::Value>)>>,
        pub content: Mutex<VecDeque<anyhow::Result<ContentResponse>>>,
        pub articles: Mutex<VecDeque<anyhow::Result<SearchResults>>>,
        pub videos: Mutex<VecDeque<anyhow::Result<VideoSearchResponse>>>,
        pub saved: Mutex<Vec<GeneratedCourse>>,
        pub fail_save: Mutex<Option<String>>,
        pub calls: AtomicUsize,
    }

    impl FakeFunctions {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn queue_course(&self, response: anyhow::Result<serde_json::Value>) {
            self.generate.lock().push_back((None, response));
        }

        /// Answer is held back until the returned sender fires
        pub fn queue_gated_course(&self, response: serde_json::Value) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.generate.lock().push_back((Some(rx), Ok(response)));
            tx
        }
    }

    fn next<T>(queue: &Mutex<VecDeque<anyhow::Result<T>>>) -> anyhow::Result<T> {
        queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted response")))
    }

    impl CourseFunctions for FakeFunctions {
        async fn generate_course(
            &self,
            _request: &GenerateCourseRequest,
        ) -> anyhow::Result<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.generate.lock().pop_front();
            let Some((gate, response)) = next else {
                anyhow::bail!("no scripted response");
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            response
        }

        async fn generate_content(&self, _request: &ContentRequest) -> anyhow::Result<ContentResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            next(&self.content)
        }

        async fn search_articles(
            &self,
            _request: &ArticleSearchRequest,
        ) -> anyhow::Result<SearchResults> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            next(&self.articles)
        }

        async fn search_videos(
            &self,
            _request: &VideoSearchRequest,
        ) -> anyhow::Result<VideoSearchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            next(&self.videos)
        }

        async fn save_course(&self, course: &GeneratedCourse) -> anyhow::Result<Course> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = self.fail_save.lock().clone() {
                anyhow::bail!(message);
            }
            let mut saved = self.saved.lock();
            saved.push(course.clone());
            Ok(Course {
                id: saved.len() as i64,
                user_id: 1,
                course: course.clone(),
                created_at: crate::utils::now_utc(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_drains_in_order() {
        let notifications = Notifications::default();
        let shared = notifications.clone();
        notifications.success("Saved", "ok");
        shared.error("Failed", "boom");
        let taken = notifications.take();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].kind, NotificationKind::Success);
        assert_eq!(taken[1].description, "boom");
        assert!(shared.take().is_empty());
    }
}
