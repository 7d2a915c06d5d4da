use std::sync::LazyLock;

use anyhow::bail;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionNamedToolChoice, ChatCompletionRequestMessage, ChatCompletionTool,
        ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        FunctionName, FunctionObject,
    },
};
use regex::Regex;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AiConfig;

static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[\s\S]*\}").expect("valid regex")
});

/// First `{` to last `}` of free text, models like to wrap json in prose or fences
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

pub fn extract_tool<T: JsonSchema>(strict: Option<bool>) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: T::schema_name(),
            description: None,
            parameters: Some(json!(schema_for!(T))),
            strict,
        },
    }
}

/// Chat completion client for any OpenAI compatible endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(config: &AiConfig) -> Self {
        let openai_config = OpenAIConfig::default()
            .with_api_base(config.base_url.clone())
            .with_api_key(config.api_key.clone());
        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Plain text answer to a single user prompt
    pub async fn complete(&self, prompt: String) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(vec![ChatCompletionRequestMessage::User(prompt.into())])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()?;
        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .ok_or(anyhow::anyhow!("No response from model"))?
            .message
            .content
            .clone()
            .ok_or(anyhow::anyhow!("Empty response from model"))?;
        Ok(content)
    }

    /// Ask for a `T` through a forced tool call. Models that answer in prose
    /// instead get their first json object parsed.
    pub async fn complete_structured<T: JsonSchema + DeserializeOwned>(
        &self,
        system: String,
        prompt: String,
    ) -> anyhow::Result<T> {
        let tool = extract_tool::<T>(None);
        let tool_choice = ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
            r#type: ChatCompletionToolType::Function,
            function: FunctionName {
                name: tool.function.name.clone(),
            },
        });
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(vec![
                ChatCompletionRequestMessage::System(system.into()),
                ChatCompletionRequestMessage::User(prompt.into()),
            ])
            .tools(vec![tool])
            .tool_choice(tool_choice)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()?;
        let response = self.client.chat().create(request).await?;
        let message = &response
            .choices
            .first()
            .ok_or(anyhow::anyhow!("No response from model"))?
            .message;
        if let Some(call) = message.tool_calls.as_ref().and_then(|calls| calls.first()) {
            debug!("structured answer via tool call {}", call.function.name);
            return Ok(serde_json::from_str(&call.function.arguments)?);
        }
        let Some(content) = message.content.as_deref() else {
            bail!("Empty response from model");
        };
        warn!("model ignored the tool call, extracting json from text");
        let Some(object) = extract_json_object(content) else {
            bail!("Failed to extract JSON from model response");
        };
        Ok(serde_json::from_str(object)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;

    use super::*;

    /// Body of a non-streaming chat completion
    pub(crate) fn chat_response(message: serde_json::Value) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000u32,
            "model": "test-model",
            "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
        })
        .to_string()
    }

    pub(crate) fn test_client(base_url: String) -> LlmClient {
        LlmClient::new(&AiConfig {
            api_key: "test".to_string(),
            base_url,
            ..Default::default()
        })
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct KeyPoints {
        points: Vec<String>,
    }

    #[test]
    fn extracts_json_wrapped_in_prose() {
        let text = "Sure! ```json\n{\"a\": {\"b\": 1}}\n``` Enjoy.";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn tool_is_named_after_schema() {
        let tool = extract_tool::<KeyPoints>(Some(true));
        assert_eq!(tool.function.name, "KeyPoints");
        let parameters = tool.function.parameters.unwrap();
        assert!(parameters["properties"]["points"].is_object());
    }

    #[tokio::test]
    async fn structured_answer_from_tool_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_header("content-type", "application/json")
            .with_body(chat_response(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "KeyPoints", "arguments": "{\"points\":[\"ownership\"]}"}
                }]
            })))
            .create_async()
            .await;
        let client = test_client(server.url());
        let answer: KeyPoints = client
            .complete_structured("system".into(), "prompt".into())
            .await
            .unwrap();
        assert_eq!(answer.points, vec!["ownership".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn structured_answer_from_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_header("content-type", "application/json")
            .with_body(chat_response(json!({
                "role": "assistant",
                "content": "Here it is:\n{\"points\": [\"borrowing\"]}"
            })))
            .create_async()
            .await;
        let client = test_client(server.url());
        let answer: KeyPoints = client
            .complete_structured("system".into(), "prompt".into())
            .await
            .unwrap();
        assert_eq!(answer.points, vec!["borrowing".to_string()]);
    }
}
