pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::course::GeneratedCourse;
use crate::utils::now_utc;

pub use store::{MemoryProgressStore, ProgressStore, SqliteProgressStore};

/// Completion state of one chapter, for the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub completed: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub completed_at: Option<OffsetDateTime>,
    /// Minutes
    #[serde(default)]
    pub time_spent: u32,
}

/// chapter index -> record
pub type ModuleProgress = BTreeMap<u32, ProgressRecord>;
/// module index -> chapters
pub type CourseProgress = BTreeMap<u32, ModuleProgress>;

/// course id -> module index -> chapter index -> record.
///
/// A missing key at any level means "not started". Reads go through the
/// get-or-default accessors and never insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProgress {
    courses: BTreeMap<String, CourseProgress>,
}

impl UserProgress {
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn course_ids(&self) -> impl Iterator<Item = &str> {
        self.courses.keys().map(String::as_str)
    }

    pub fn course(&self, course_id: &str) -> Option<&CourseProgress> {
        self.courses.get(course_id)
    }

    pub fn module(&self, course_id: &str, module_index: u32) -> Option<&ModuleProgress> {
        self.course(course_id)?.get(&module_index)
    }

    pub fn chapter(&self, course_id: &str, module_index: u32, chapter_index: u32) -> ProgressRecord {
        self.module(course_id, module_index)
            .and_then(|module| module.get(&chapter_index))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_chapter(
        &mut self,
        course_id: &str,
        module_index: u32,
        chapter_index: u32,
        record: ProgressRecord,
    ) {
        self.courses
            .entry(course_id.to_string())
            .or_default()
            .entry(module_index)
            .or_default()
            .insert(chapter_index, record);
    }

    /// All stored records, optionally restricted to one course
    pub fn records<'a>(
        &'a self,
        course_id: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ProgressRecord> + 'a {
        self.courses
            .iter()
            .filter(move |(id, _)| course_id.is_none_or(|c| c == id.as_str()))
            .flat_map(|(_, modules)| modules.values())
            .flat_map(|chapters| chapters.values())
    }
}

/// Grid of modules x chapters a course is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CourseShape {
    pub modules: u32,
    pub chapters_per_module: u32,
}

impl Default for CourseShape {
    fn default() -> Self {
        Self {
            modules: 6,
            chapters_per_module: 6,
        }
    }
}

impl CourseShape {
    pub fn new(modules: u32, chapters_per_module: u32) -> Self {
        Self {
            modules,
            chapters_per_module,
        }
    }

    /// Shape of a generated course, sized by its longest module
    pub fn of(course: &GeneratedCourse) -> Self {
        let modules = &course.content.modules;
        Self {
            modules: modules.len() as u32,
            chapters_per_module: modules
                .iter()
                .map(|m| m.lessons.len() as u32)
                .max()
                .unwrap_or(0),
        }
    }

    pub fn total_chapters(&self) -> u64 {
        u64::from(self.modules) * u64::from(self.chapters_per_module)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressSummary {
    pub course_id: String,
    pub course_progress: u8,
    pub course_study_time: u64,
    pub total_study_time: u64,
    pub completed_courses: usize,
    pub streak_days: u32,
}

fn percentage(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Learning progress of one signed in user, mirrored to a [`ProgressStore`]
/// after every mutation.
pub struct ProgressTracker<S> {
    user_id: Option<String>,
    progress: UserProgress,
    shape: CourseShape,
    store: S,
}

impl<S: ProgressStore> ProgressTracker<S> {
    pub fn storage_key(user_id: &str) -> String {
        format!("progress_{user_id}")
    }

    /// Read the saved map of `user_id`. Missing or unreadable data starts empty.
    pub async fn load(user_id: Option<String>, store: S) -> Self {
        let mut progress = UserProgress::default();
        if let Some(user_id) = &user_id {
            let key = Self::storage_key(user_id);
            match store.load(&key).await {
                Ok(Some(saved)) => match serde_json::from_str(&saved) {
                    Ok(saved) => progress = saved,
                    Err(e) => error!("Error parsing saved progress {}: {}", key, e),
                },
                Ok(None) => debug!("No saved progress for {}", key),
                Err(e) => error!("Error loading saved progress {}: {}", key, e),
            }
        }
        Self {
            user_id,
            progress,
            shape: CourseShape::default(),
            store,
        }
    }

    /// Shape used by [`Self::completed_courses_count`]
    pub fn with_shape(mut self, shape: CourseShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub async fn mark_chapter_complete(
        &mut self,
        course_id: &str,
        module_index: u32,
        chapter_index: u32,
        time_spent: u32,
    ) -> bool {
        self.mark_chapter_complete_at(course_id, module_index, chapter_index, time_spent, now_utc())
            .await
    }

    /// Returns false when no user is signed in, nothing is changed then.
    pub async fn mark_chapter_complete_at(
        &mut self,
        course_id: &str,
        module_index: u32,
        chapter_index: u32,
        time_spent: u32,
        completed_at: OffsetDateTime,
    ) -> bool {
        if self.user_id.is_none() {
            return false;
        }
        self.progress.set_chapter(
            course_id,
            module_index,
            chapter_index,
            ProgressRecord {
                completed: true,
                completed_at: Some(completed_at),
                time_spent,
            },
        );
        self.persist().await;
        true
    }

    pub async fn mark_chapter_incomplete(
        &mut self,
        course_id: &str,
        module_index: u32,
        chapter_index: u32,
    ) -> bool {
        if self.user_id.is_none() {
            return false;
        }
        let time_spent = self
            .progress
            .chapter(course_id, module_index, chapter_index)
            .time_spent;
        self.progress.set_chapter(
            course_id,
            module_index,
            chapter_index,
            ProgressRecord {
                completed: false,
                completed_at: None,
                time_spent,
            },
        );
        self.persist().await;
        true
    }

    /// Failures are logged only, the in memory state stays authoritative.
    async fn persist(&self) {
        let Some(user_id) = &self.user_id else {
            return;
        };
        if self.progress.is_empty() {
            return;
        }
        let key = Self::storage_key(user_id);
        let value = match serde_json::to_string(&self.progress) {
            Ok(value) => value,
            Err(e) => {
                error!("Error serializing progress {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.save(&key, &value).await {
            error!("Error saving progress {}: {}", key, e);
        }
    }

    pub fn is_chapter_completed(&self, course_id: &str, module_index: u32, chapter_index: u32) -> bool {
        self.progress
            .module(course_id, module_index)
            .and_then(|module| module.get(&chapter_index))
            .is_some_and(|record| record.completed)
    }

    pub fn chapter_progress(&self, course_id: &str, module_index: u32, chapter_index: u32) -> ProgressRecord {
        self.progress.chapter(course_id, module_index, chapter_index)
    }

    /// Percentage of `total_chapters` completed in one module, 0..=100
    pub fn module_progress(&self, course_id: &str, module_index: u32, total_chapters: u32) -> u8 {
        let Some(module) = self.progress.module(course_id, module_index) else {
            return 0;
        };
        let done = module.values().filter(|r| r.completed).count() as u32;
        if done > total_chapters {
            warn!(
                "module {}/{} has {} completed chapters but only {} expected",
                course_id, module_index, done, total_chapters
            );
        }
        percentage(done as u64, u64::from(total_chapters))
    }

    /// Percentage over the `shape` grid. Modules without data count as not started.
    pub fn course_progress(&self, course_id: &str, shape: CourseShape) -> u8 {
        let Some(course) = self.progress.course(course_id) else {
            return 0;
        };
        let done: u64 = course
            .range(..shape.modules)
            .map(|(_, module)| {
                module
                    .range(..shape.chapters_per_module)
                    .filter(|(_, r)| r.completed)
                    .count() as u64
            })
            .sum();
        percentage(done, shape.total_chapters())
    }

    /// Minutes spent in one course, or across all of them
    pub fn total_study_time(&self, course_id: Option<&str>) -> u64 {
        self.progress
            .records(course_id)
            .map(|r| u64::from(r.time_spent))
            .sum()
    }

    pub fn completed_courses_count(&self) -> usize {
        self.progress
            .course_ids()
            .filter(|id| self.course_progress(id, self.shape) == 100)
            .count()
    }

    pub fn streak_days(&self) -> u32 {
        self.streak_days_at(now_utc())
    }

    /// Consecutive UTC days with a completion, ending on the day of the latest
    /// completion. Zero unless that completion is less than 24 hours before `now`.
    pub fn streak_days_at(&self, now: OffsetDateTime) -> u32 {
        let completions: Vec<OffsetDateTime> = self
            .progress
            .records(None)
            .filter_map(|r| r.completed_at)
            .collect();
        let Some(latest) = completions.iter().max().copied() else {
            return 0;
        };
        if now - latest > Duration::hours(24) {
            return 0;
        }
        let days: BTreeSet<Date> = completions
            .iter()
            .map(|t| t.to_offset(time::UtcOffset::UTC).date())
            .collect();
        let mut day = latest.to_offset(time::UtcOffset::UTC).date();
        let mut streak = 0;
        while days.contains(&day) {
            streak += 1;
            match day.previous_day() {
                Some(previous) => day = previous,
                None => break,
            }
        }
        streak
    }

    pub fn summary(&self, course_id: &str, shape: CourseShape) -> ProgressSummary {
        ProgressSummary {
            course_id: course_id.to_string(),
            course_progress: self.course_progress(course_id, shape),
            course_study_time: self.total_study_time(Some(course_id)),
            total_study_time: self.total_study_time(None),
            completed_courses: self.completed_courses_count(),
            streak_days: self.streak_days(),
        }
    }
}
