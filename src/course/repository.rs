use sqlx::{FromRow, SqlitePool, types::Json};
use time::OffsetDateTime;
use tracing::info;

use super::{
    Course, CourseContent, CourseResources, GeneratedCourse, GlossaryItem, RoadmapStage,
};
use crate::utils::now_utc;

#[derive(FromRow)]
struct CourseRow {
    id: i64,
    user_id: i64,
    title: String,
    level: String,
    description: String,
    content: Json<CourseContent>,
    glossary: Json<Vec<GlossaryItem>>,
    roadmap: Json<Vec<RoadmapStage>>,
    resources: Json<CourseResources>,
    created_at: OffsetDateTime,
}

impl TryFrom<CourseRow> for Course {
    type Error = anyhow::Error;
    fn try_from(row: CourseRow) -> anyhow::Result<Self> {
        Ok(Course {
            id: row.id,
            user_id: row.user_id,
            course: GeneratedCourse {
                title: row.title,
                level: row.level.parse()?,
                description: row.description,
                content: row.content.0,
                glossary: row.glossary.0,
                roadmap: row.roadmap.0,
                resources: row.resources.0,
            },
            created_at: row.created_at,
        })
    }
}

const SELECT_COURSE: &str = "SELECT id, user_id, title, level, description, content, glossary, roadmap, resources, created_at FROM courses";

/// Durable library of generated courses, scoped by owner
#[derive(Debug, Clone)]
pub struct CourseRepository {
    database: SqlitePool,
}

impl CourseRepository {
    pub fn new(database: SqlitePool) -> Self {
        Self { database }
    }

    pub async fn insert(&self, user_id: i64, course: &GeneratedCourse) -> anyhow::Result<Course> {
        let created_at = now_utc();
        let id = sqlx::query(
            "INSERT INTO courses (user_id, title, level, description, content, glossary, roadmap, resources, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&course.title)
        .bind(course.level.as_str())
        .bind(&course.description)
        .bind(Json(&course.content))
        .bind(Json(&course.glossary))
        .bind(Json(&course.roadmap))
        .bind(Json(&course.resources))
        .bind(created_at)
        .execute(&self.database)
        .await?
        .last_insert_rowid();
        info!("Saved course {} '{}' for user {}", id, course.title, user_id);
        Ok(Course {
            id,
            user_id,
            course: course.clone(),
            created_at,
        })
    }

    /// Newest first
    pub async fn list_for_user(&self, user_id: i64) -> anyhow::Result<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "{SELECT_COURSE} WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.database)
        .await?;
        rows.into_iter().map(Course::try_from).collect()
    }

    pub async fn get(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "{SELECT_COURSE} WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.database)
        .await?;
        row.map(Course::try_from).transpose()
    }
}
