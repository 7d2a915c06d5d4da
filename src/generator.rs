use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::{
    ai_utils::LlmClient,
    config::GenerationConfig,
    course::{
        CourseContent, CourseLevel, CourseModule, CourseResources, GeneratedCourse, GlossaryItem,
        Lesson, Resource, RoadmapStage,
    },
    error::{Error, Result},
    search::VideoSearch,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateCourseRequest {
    #[serde(default)]
    pub title: String,
    pub level: Option<CourseLevel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContentRequest {
    #[serde(default)]
    pub topic: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    /// Markdown
    pub content: String,
}

/// Everything the model writes for a course. Title and level come from the request,
/// videos from the video search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CourseStructure {
    /// Course description, 100 to 150 words
    pub description: String,
    pub content: CourseContent,
    pub glossary: Vec<GlossaryItem>,
    pub roadmap: Vec<RoadmapStage>,
    /// Only `articles` is filled in
    pub resources: CourseResources,
}

const CURRICULUM_SYSTEM: &str = "You are an expert curriculum designer. You answer with JSON only.";

fn curriculum_prompt(title: &str, level: CourseLevel) -> String {
    format!(
        "Create a comprehensive learning curriculum for \"{title}\" at a {level} level.\n\
         Include the following:\n\
         1. A detailed course description (100-150 words)\n\
         2. Course content with modules and lessons (2-3 modules, each with 3-4 lessons); \
         every lesson has a title, a one sentence description, a duration and key points\n\
         3. A glossary of key terms (4-6 terms with definitions)\n\
         4. A learning roadmap with stages and milestones (3 stages, each with 3 milestones)\n\
         5. Resource articles (3-4 article recommendations with titles and URLs)\n\n\
         Format the response as JSON with these keys: description, content, glossary, roadmap, resources.\n\
         Keep the response concise and focused on creating a practical learning path."
    )
}

fn content_prompt(topic: &str, context: Option<&str>) -> String {
    let context = context
        .filter(|c| !c.trim().is_empty())
        .map(|c| format!("Context: {c}\n\n"))
        .unwrap_or_default();
    format!(
        "You are an expert educational content creator. Generate comprehensive, engaging, \
         and educational content for the following topic: \"{topic}\"\n\n\
         {context}\
         Create detailed content that includes:\n\
         1. **Introduction** - Clear overview of the topic\n\
         2. **Core Concepts** - Main ideas and principles\n\
         3. **Detailed Explanation** - In-depth coverage with examples\n\
         4. **Practical Applications** - Real-world use cases\n\
         5. **Key Takeaways** - Summary of important points\n\
         6. **Common Mistakes** - What to avoid\n\
         7. **Next Steps** - How to apply this knowledge\n\n\
         Format the content in markdown with clear headings, code examples where relevant, \
         bullet points, blockquotes for important notes and emphasis where it helps. \
         Aim for approximately 800-1200 words."
    )
}

fn lesson(title: String, description: &str) -> Lesson {
    Lesson {
        title,
        description: description.to_string(),
        ..Default::default()
    }
}

fn resource(title: String, url: &str) -> Resource {
    Resource {
        title,
        url: url.to_string(),
    }
}

/// Deterministic course served when the model output cannot be used
pub fn fallback_structure(title: &str, level: CourseLevel) -> CourseStructure {
    CourseStructure {
        description: format!("A comprehensive {level} level course on {title}."),
        content: CourseContent {
            modules: vec![
                CourseModule {
                    title: format!("Getting Started with {title}"),
                    description: "Learn the fundamentals and key concepts.".to_string(),
                    lessons: vec![
                        lesson(
                            format!("Introduction to {title}"),
                            "An overview of the subject and its importance.",
                        ),
                        lesson(
                            "Core Concepts".to_string(),
                            "Understanding the essential principles.",
                        ),
                        lesson(
                            "Setup Your Learning Environment".to_string(),
                            "Prepare the tools and resources you'll need.",
                        ),
                    ],
                },
                CourseModule {
                    title: "Building Your Knowledge".to_string(),
                    description: "Develop deeper understanding through hands-on practice."
                        .to_string(),
                    lessons: vec![
                        lesson(
                            "Practical Applications".to_string(),
                            "Applying concepts to real-world scenarios.",
                        ),
                        lesson(
                            "Problem Solving Techniques".to_string(),
                            "Develop your analytical thinking.",
                        ),
                        lesson(
                            "Advanced Implementation".to_string(),
                            "Take your skills to the next level.",
                        ),
                    ],
                },
            ],
        },
        glossary: [
            (
                format!("{title} Architecture"),
                "The foundational structure that defines how components work together.",
            ),
            (
                "Implementation Patterns".to_string(),
                "Standardized approaches to solving common problems in the field.",
            ),
            (
                "Best Practices".to_string(),
                "Recommended methods and techniques widely accepted by experts.",
            ),
            (
                "Optimization Strategies".to_string(),
                "Approaches to improve efficiency and performance.",
            ),
        ]
        .into_iter()
        .map(|(term, definition)| GlossaryItem {
            term,
            definition: definition.to_string(),
        })
        .collect(),
        roadmap: [
            (
                "Foundation",
                [
                    "Understand basic principles",
                    "Complete introductory exercises",
                    "Pass the knowledge assessment",
                ],
            ),
            (
                "Application",
                [
                    "Apply concepts to a small project",
                    "Receive feedback and iterate",
                    "Document your learning process",
                ],
            ),
            (
                "Mastery",
                [
                    "Complete an advanced project",
                    "Teach concepts to others",
                    "Contribute to the community",
                ],
            ),
        ]
        .into_iter()
        .map(|(stage, milestones)| RoadmapStage {
            stage: stage.to_string(),
            milestones: milestones.iter().map(|m| m.to_string()).collect(),
        })
        .collect(),
        resources: CourseResources {
            articles: vec![
                resource(
                    format!("Comprehensive Guide to {title}"),
                    "https://example.com/guide",
                ),
                resource(
                    format!("{title} for {level}s"),
                    "https://example.com/level-guide",
                ),
                resource(
                    format!("Latest Trends in {title}"),
                    "https://example.com/trends",
                ),
            ],
            videos: vec![],
        },
    }
}

/// Placeholder links used when the video search is unavailable
pub fn fallback_videos(title: &str) -> Vec<Resource> {
    vec![
        resource(
            format!("{title} Crash Course"),
            "https://example.com/crash-course",
        ),
        resource(
            format!("Deep Dive into {title}"),
            "https://example.com/deep-dive",
        ),
        resource(format!("Expert Tips for {title}"), "https://example.com/tips"),
    ]
}

/// Backend of the generation functions: model for the curriculum,
/// video search for related videos.
pub struct CourseGenerator<V> {
    llm: LlmClient,
    videos: V,
    config: GenerationConfig,
}

impl<V: VideoSearch> CourseGenerator<V> {
    pub fn new(llm: LlmClient, videos: V, config: GenerationConfig) -> Self {
        Self {
            llm,
            videos,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn generate_course(&self, request: GenerateCourseRequest) -> Result<GeneratedCourse> {
        let title = request.title.trim();
        let (false, Some(level)) = (title.is_empty(), request.level) else {
            return Err(Error::Validation("Title and level are required".to_string()));
        };
        info!("Generating course for: {}, Level: {}", title, level);

        let structure = match self.course_structure(title, level).await {
            Ok(structure) => structure,
            Err(e) if self.config.fallback_on_error => {
                error!("Course generation failed, serving fallback course: {}", e);
                fallback_structure(title, level)
            }
            Err(e) => return Err(Error::remote(e)),
        };
        let videos = self.related_videos(title, level).await;

        Ok(GeneratedCourse {
            title: title.to_string(),
            level,
            description: structure.description,
            content: structure.content,
            glossary: structure.glossary,
            roadmap: structure.roadmap,
            resources: CourseResources {
                articles: structure.resources.articles,
                videos,
            },
        })
    }

    async fn course_structure(&self, title: &str, level: CourseLevel) -> anyhow::Result<CourseStructure> {
        let structure: CourseStructure = self
            .llm
            .complete_structured(CURRICULUM_SYSTEM.to_string(), curriculum_prompt(title, level))
            .await?;
        if structure.content.modules.is_empty() {
            anyhow::bail!("model returned a course without modules");
        }
        info!(
            "Parsed course structure with {} modules",
            structure.content.modules.len()
        );
        Ok(structure)
    }

    async fn related_videos(&self, title: &str, level: CourseLevel) -> Vec<Resource> {
        let query = format!("{title} {level} tutorial");
        match self.videos.search(&query, self.config.related_videos).await {
            Ok(videos) => videos
                .into_iter()
                .map(|v| Resource {
                    title: v.title,
                    url: v.url,
                })
                .collect(),
            Err(e) => {
                error!("Video lookup failed, using placeholder links: {}", e);
                fallback_videos(title)
            }
        }
    }

    /// Markdown lesson body for a chapter opened without stored content
    #[instrument(skip(self, request), fields(topic = %request.topic))]
    pub async fn generate_content(&self, request: ContentRequest) -> Result<ContentResponse> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(Error::Validation("Topic is required".to_string()));
        }
        let content = self
            .llm
            .complete(content_prompt(topic, request.context.as_deref()))
            .await
            .map_err(|e| {
                error!("Content generation failed: {}", e);
                Error::remote(e)
            })?;
        Ok(ContentResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::ai_utils::tests::{chat_response, test_client};
    use crate::search::Video;

    struct StaticVideos(anyhow::Result<Vec<Video>>);

    impl VideoSearch for StaticVideos {
        async fn search(&self, query: &str, max_results: u32) -> anyhow::Result<Vec<Video>> {
            assert!(query.ends_with("tutorial"));
            assert_eq!(max_results, 3);
            match &self.0 {
                Ok(videos) => Ok(videos.clone()),
                Err(e) => anyhow::bail!("{}", e),
            }
        }
    }

    fn video(id: &str) -> Video {
        Video {
            id: id.to_string(),
            title: format!("video {id}"),
            description: String::new(),
            url: format!("https://www.youtube.com/watch?v={id}"),
            thumbnail: Default::default(),
            channel_title: String::new(),
            published_at: None,
            duration: None,
            view_count: None,
            like_count: None,
        }
    }

    fn structure_json() -> String {
        json!({
            "description": "Learn Rust",
            "content": {"modules": [{
                "title": "Basics",
                "description": "",
                "lessons": [{"title": "Hello", "description": "cargo new", "duration": "10 minutes", "keyPoints": []}]
            }]},
            "glossary": [{"term": "Crate", "definition": "A compilation unit"}],
            "roadmap": [{"stage": "Foundation", "milestones": ["Install rustup"]}],
            "resources": {"articles": [{"title": "The Book", "url": "https://doc.rust-lang.org/book"}]}
        })
        .to_string()
    }

    fn request(title: &str, level: Option<CourseLevel>) -> GenerateCourseRequest {
        GenerateCourseRequest {
            title: title.to_string(),
            level,
        }
    }

    #[tokio::test]
    async fn assembles_model_output_and_videos() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({"tool_choice": {"function": {"name": "CourseStructure"}}})))
            .with_header("content-type", "application/json")
            .with_body(chat_response(json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "CourseStructure", "arguments": structure_json()}
                }]
            })))
            .create_async()
            .await;
        let generator = CourseGenerator::new(
            test_client(server.url()),
            StaticVideos(Ok(vec![video("abc")])),
            GenerationConfig::default(),
        );
        let course = generator
            .generate_course(request(" Rust ", Some(CourseLevel::Beginner)))
            .await
            .unwrap();
        assert_eq!(course.title, "Rust");
        assert_eq!(course.description, "Learn Rust");
        assert_eq!(course.resources.articles.len(), 1);
        assert_eq!(course.resources.videos[0].url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(
            course.content.modules[0].lessons[0].duration.as_deref(),
            Some("10 minutes")
        );
    }

    #[tokio::test]
    async fn unusable_model_output_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_header("content-type", "application/json")
            .with_body(chat_response(json!({
                "role": "assistant",
                "content": "I cannot help with that."
            })))
            .create_async()
            .await;
        let generator = CourseGenerator::new(
            test_client(server.url()),
            StaticVideos(Err(anyhow::anyhow!("quota"))),
            GenerationConfig::default(),
        );
        let course = generator
            .generate_course(request("Go", Some(CourseLevel::Advanced)))
            .await
            .unwrap();
        assert_eq!(course.description, "A comprehensive advanced level course on Go.");
        assert_eq!(course.content.modules.len(), 2);
        assert_eq!(course.glossary.len(), 4);
        assert_eq!(course.roadmap.len(), 3);
        assert_eq!(course.resources.articles[1].title, "Go for advanceds");
        assert_eq!(course.resources.videos, fallback_videos("Go"));

        let strict = CourseGenerator::new(
            test_client(server.url()),
            StaticVideos(Ok(vec![])),
            GenerationConfig {
                fallback_on_error: false,
                ..Default::default()
            },
        );
        let err = strict
            .generate_course(request("Go", Some(CourseLevel::Advanced)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }

    #[tokio::test]
    async fn title_and_level_are_required() {
        let generator = CourseGenerator::new(
            test_client("http://127.0.0.1:9".to_string()),
            StaticVideos(Ok(vec![])),
            GenerationConfig::default(),
        );
        for request in [request("  ", Some(CourseLevel::Beginner)), request("Rust", None)] {
            let err = generator.generate_course(request).await.unwrap_err();
            assert_eq!(err.to_string(), "Title and level are required");
        }
        let err = generator
            .generate_content(ContentRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Topic is required");
    }

    #[tokio::test]
    async fn generates_markdown_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("Context: chapter 2 of Rust".to_string()))
            .with_header("content-type", "application/json")
            .with_body(chat_response(json!({"role": "assistant", "content": "# Lifetimes"})))
            .create_async()
            .await;
        let generator = CourseGenerator::new(
            test_client(server.url()),
            StaticVideos(Ok(vec![])),
            GenerationConfig::default(),
        );
        let response = generator
            .generate_content(ContentRequest {
                topic: "Lifetimes".to_string(),
                context: Some("chapter 2 of Rust".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(response.content, "# Lifetimes");
    }

    #[test]
    fn structure_schema_names_all_sections() {
        let tool = crate::ai_utils::extract_tool::<CourseStructure>(None);
        let schema = tool.function.parameters.unwrap();
        for key in ["description", "content", "glossary", "roadmap", "resources"] {
            assert!(schema["properties"][key].is_object(), "{key}");
        }
    }
}
