pub mod openai;

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;

pub use openai::OpenAICompatibleClient;

/// A provider response: the full JSON body plus the assistant text, when present.
#[derive(Debug, Clone)]
pub struct Completion {
    pub body: serde_json::Value,
    pub content: Option<String>,
}

impl Completion {
    pub fn from_body(body: serde_json::Value) -> Self {
        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|content| content.to_string());
        Self { body, content }
    }
}

#[async_trait]
pub trait LLMClient {
    async fn complete(
        &self,
        config: &LLMConfig,
        system: Option<&str>,
        user: &str,
    ) -> Result<Completion>;
}
