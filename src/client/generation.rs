use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::{CourseFunctions, Notification, Notifications};
use crate::{
    course::{Course, CourseLevel, GeneratedCourse},
    error::{Error, Result},
    generator::{ContentRequest, GenerateCourseRequest},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
    Ready(GeneratedCourse),
    Failed(String),
}

impl GenerationState {
    pub fn is_generating(&self) -> bool {
        matches!(self, GenerationState::Generating)
    }

    pub fn course(&self) -> Option<&GeneratedCourse> {
        match self {
            GenerationState::Ready(course) => Some(course),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            GenerationState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Requests generated courses and tracks the lifecycle of the latest request.
///
/// Every `generate` call takes a sequence number. Only the response of the most
/// recent call touches the state, older ones are handed back to their caller and
/// otherwise dropped.
pub struct GenerationClient<F> {
    functions: Arc<F>,
    user_id: Mutex<Option<i64>>,
    state: Mutex<GenerationState>,
    sequence: AtomicU64,
    notifications: Notifications,
}

impl<F: CourseFunctions> GenerationClient<F> {
    pub fn new(functions: Arc<F>, notifications: Notifications) -> Self {
        Self {
            functions,
            user_id: Mutex::new(None),
            state: Mutex::new(GenerationState::Idle),
            sequence: AtomicU64::new(0),
            notifications,
        }
    }

    pub fn set_user(&self, user_id: Option<i64>) {
        *self.user_id.lock() = user_id;
    }

    pub fn state(&self) -> GenerationState {
        self.state.lock().clone()
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        self.notifications.take()
    }

    fn is_latest(sequence: &AtomicU64, ticket: u64) -> bool {
        sequence.load(Ordering::SeqCst) == ticket
    }

    fn require_user(&self, action: &'static str) -> Result<i64> {
        match *self.user_id.lock() {
            Some(id) => Ok(id),
            None => {
                self.notifications
                    .error("Authentication Required", format!("Please sign in to {action}"));
                Err(Error::Unauthenticated(action))
            }
        }
    }

    pub async fn generate(&self, title: &str, level: CourseLevel) -> Result<GeneratedCourse> {
        if title.trim().is_empty() {
            self.notifications
                .error("Title Required", "Please enter a course title");
            return Err(Error::Validation("Please enter a course title".to_string()));
        }
        self.require_user("generate courses")?;

        let ticket = {
            let mut state = self.state.lock();
            *state = GenerationState::Generating;
            self.sequence.fetch_add(1, Ordering::SeqCst) + 1
        };
        info!("generating course \"{}\" ({}), request #{}", title, level, ticket);

        let request = GenerateCourseRequest {
            title: title.trim().to_string(),
            level: Some(level),
        };
        let result = match self.functions.generate_course(&request).await {
            Ok(value) => GeneratedCourse::from_response(value),
            Err(e) => Err(Error::remote(e)),
        };

        // tickets are issued under the state lock, so the check and the write are atomic
        let mut state = self.state.lock();
        if !Self::is_latest(&self.sequence, ticket) {
            debug!("discarding response of superseded request #{}", ticket);
            return result;
        }
        match &result {
            Ok(course) => {
                *state = GenerationState::Ready(course.clone());
                self.notifications.success(
                    "Course Generated!",
                    format!("Your course \"{}\" is ready", course.title),
                );
            }
            Err(e) => {
                error!("course generation failed: {}", e);
                *state = GenerationState::Failed(e.to_string());
                self.notifications.error("Generation Failed", e.to_string());
            }
        }
        result
    }

    /// Store the current course in the user's library
    pub async fn save(&self) -> Result<Course> {
        self.require_user("save courses")?;
        let Some(course) = self.state.lock().course().cloned() else {
            self.notifications
                .error("No Course to Save", "Generate a course first");
            return Err(Error::Validation("No course to save".to_string()));
        };
        match self.functions.save_course(&course).await {
            Ok(saved) => {
                self.notifications
                    .success("Course Saved", format!("\"{}\" was added to your library", saved.course.title));
                Ok(saved)
            }
            Err(e) => {
                self.notifications.error("Failed to Save", e.to_string());
                Err(Error::Storage(e.to_string()))
            }
        }
    }

    /// Markdown body of one chapter, generated on demand
    pub async fn chapter_content(&self, topic: &str, context: Option<&str>) -> Result<String> {
        if topic.trim().is_empty() {
            return Err(Error::Validation("Topic is required".to_string()));
        }
        let request = ContentRequest {
            topic: topic.to_string(),
            context: context.map(str::to_string),
        };
        match self.functions.generate_content(&request).await {
            Ok(response) => Ok(response.content),
            Err(e) => {
                self.notifications.error("Content Unavailable", e.to_string());
                Err(Error::remote(e))
            }
        }
    }
}
