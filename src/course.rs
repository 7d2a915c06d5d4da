pub mod repository;

use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::error::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseLevel {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(CourseLevel::Beginner),
            "intermediate" => Ok(CourseLevel::Intermediate),
            "advanced" => Ok(CourseLevel::Advanced),
            other => anyhow::bail!("unknown course level: {}", other),
        }
    }
}

/// Models write durations both as "15 minutes" and as 15
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Smallest unit of course content, progress is tracked per lesson
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Markdown body, generated on demand when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    #[schemars(with = "Option<String>")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct CourseModule {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct CourseContent {
    #[serde(default)]
    pub modules: Vec<CourseModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct GlossaryItem {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct RoadmapStage {
    pub stage: String,
    #[serde(default)]
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct Resource {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct CourseResources {
    #[serde(default)]
    pub articles: Vec<Resource>,
    #[serde(default)]
    pub videos: Vec<Resource>,
}

/// A course as produced by the generator. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedCourse {
    pub title: String,
    pub level: CourseLevel,
    pub description: String,
    pub content: CourseContent,
    pub glossary: Vec<GlossaryItem>,
    pub roadmap: Vec<RoadmapStage>,
    pub resources: CourseResources,
}

impl GeneratedCourse {
    pub const REQUIRED_FIELDS: [&'static str; 6] = [
        "title",
        "description",
        "content",
        "glossary",
        "roadmap",
        "resources",
    ];

    /// Accept a generation response only when every section is present.
    pub fn from_response(value: serde_json::Value) -> crate::error::Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(Error::IncompleteCourse);
        };
        if let Some(error) = object.get("error").and_then(|e| e.as_str()) {
            return Err(Error::Remote(error.to_string()));
        }
        let complete = Self::REQUIRED_FIELDS
            .iter()
            .all(|field| object.get(*field).is_some_and(|v| !v.is_null()));
        if !complete {
            return Err(Error::IncompleteCourse);
        }
        serde_json::from_value(value)
            .map_err(|e| Error::Remote(format!("Malformed course data: {}", e)))
    }

    pub fn lesson_count(&self) -> usize {
        self.content.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

/// A generated course saved to a user's library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Course {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub course: GeneratedCourse,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
pub(crate) fn sample_response() -> serde_json::Value {
    serde_json::json!({
        "title": "Rust",
        "level": "intermediate",
        "description": "Ownership and beyond",
        "content": {"modules": [{
            "title": "Ownership",
            "description": "Moves and borrows",
            "lessons": [{"title": "Moves", "description": "", "duration": 20, "keyPoints": ["a"]}]
        }]},
        "glossary": [{"term": "Borrow", "definition": "A reference"}],
        "roadmap": [{"stage": "Foundation", "milestones": ["Read the book"]}],
        "resources": {"articles": [{"title": "Book", "url": "https://doc.rust-lang.org/book"}]}
    })
}
