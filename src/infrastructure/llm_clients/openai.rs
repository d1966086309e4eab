use super::{Completion, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format
/// (Groq, OpenAI, OpenRouter, LM Studio, llama.cpp server).
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
}

impl OpenAICompatibleClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(config: &LLMConfig) -> String {
        format!("{}/chat/completions", config.base_url.trim_end_matches('/'))
    }

    fn map_send_error(err: reqwest::Error, timeout_secs: u64) -> AppError {
        if err.is_timeout() {
            AppError::Timeout(format!("no response within {}s", timeout_secs))
        } else {
            AppError::Transport(format!("Request failed: {}", err))
        }
    }
}

impl Default for OpenAICompatibleClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        config: &LLMConfig,
        system: Option<&str>,
        user: &str,
    ) -> Result<Completion> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let body = ChatRequest {
            model: &config.model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let url = Self::completions_url(config);
        debug!("POST {} (model={})", url, config.model);

        let mut request = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .json(&body);
        if let Some(api_key) = &config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Completion provider returned {}: {}", status, text);
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: format!("API error ({}): {}", status, text),
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                Self::map_send_error(e, config.timeout_secs)
            } else {
                AppError::ParseError(format!("Failed to parse JSON: {}", e))
            }
        })?;

        Ok(Completion::from_body(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LLMConfig {
        LLMConfig {
            provider: LLMProvider::Groq,
            base_url: format!("{}/openai/v1/", server.uri()),
            model: "llama3-70b-8192".to_string(),
            api_key: Some("test-key".to_string()),
            max_tokens: None,
            temperature: Some(0.5),
            timeout_secs: 2,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn test_sends_model_messages_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(bearer_token("test-key"))
            .and(body_partial_json(json!({
                "model": "llama3-70b-8192",
                "temperature": 0.5,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hi")))
            .expect(1)
            .mount(&server)
            .await;

        let completion = OpenAICompatibleClient::new()
            .complete(&config_for(&server), Some("be brief"), "hello")
            .await
            .unwrap();

        assert_eq!(completion.content.as_deref(), Some("hi"));
        assert_eq!(completion.body["id"], "chatcmpl-1");
    }

    #[tokio::test]
    async fn test_omits_system_message_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user", "content": "only user"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let completion = OpenAICompatibleClient::new()
            .complete(&config_for(&server), None, "only user")
            .await
            .unwrap();
        assert_eq!(completion.content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = OpenAICompatibleClient::new()
            .complete(&config_for(&server), None, "hello")
            .await
            .unwrap_err();

        match err {
            AppError::Upstream { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("late"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.timeout_secs = 1;
        let err = OpenAICompatibleClient::new()
            .complete(&config, None, "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout(_)), "got {}", err);
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = OpenAICompatibleClient::new()
            .complete(&config_for(&server), None, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)), "got {}", err);
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        let config = LLMConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LLMConfig::default()
        };
        let err = OpenAICompatibleClient::new()
            .complete(&config, None, "hello")
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Transport(_) | AppError::Timeout(_)),
            "got {}",
            err
        );
    }
}
