use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::progress::CourseShape;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub search: SearchConfig,
    pub generation: GenerationConfig,
    pub progress: CourseShape,
}

/// OpenAI compatible chat completion endpoint
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub news_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub google_base_url: String,
    pub news_base_url: String,
    pub youtube_base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cse_id: None,
            news_api_key: None,
            youtube_api_key: None,
            google_base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            news_base_url: "https://newsapi.org/v2".to_string(),
            youtube_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Serve a skeleton course when the model output is unusable
    pub fallback_on_error: bool,
    /// Number of videos attached to a generated course
    pub related_videos: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            fallback_on_error: true,
            related_videos: 3,
        }
    }
}

impl Config {
    /// Load from an optional toml file, then let the environment (and `.env`) override secrets.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<Config>(&content)?
            }
            None => Config::default(),
        };
        let _ = dotenvy::dotenv();
        config.apply_env(|key| dotenvy::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("OPENAI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Some(v) = var("OPENAI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Some(v) = var("AI_MODEL") {
            self.ai.model = v;
        }
        let search = &mut self.search;
        for (key, slot) in [
            ("GOOGLE_API_KEY", &mut search.google_api_key),
            ("GOOGLE_CSE_ID", &mut search.google_cse_id),
            ("NEWS_API_KEY", &mut search.news_api_key),
            ("YOUTUBE_API_KEY", &mut search.youtube_api_key),
        ] {
            if let Some(v) = var(key).filter(|v| !v.is_empty()) {
                *slot = Some(v);
            }
        }
    }
}
