use crate::application::use_cases::prompt_template::render;
use crate::application::use_cases::test_case_normalizer::ResponseNormalizer;
use crate::domain::endpoint::{EndpointProfile, ResponseShape};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::test_case::TestCaseEnvelope;
use crate::infrastructure::llm_clients::{Completion, LLMClient};
use crate::infrastructure::response::clean_completion_text;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub const MAX_FIELD_CHARS: usize = 65_536;
const LOG_PREVIEW_CHARS: usize = 100;

// Keep the validator bound equal to MAX_FIELD_CHARS.
#[derive(Debug, Validate)]
struct PromptField {
    #[validate(length(min = 1, max = 65536))]
    value: String,
}

/// Body returned to the caller, one variant per `ResponseShape`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RelayResponse {
    Raw(Value),
    Text { result: String },
    TestCases(TestCaseEnvelope),
}

pub struct PromptRelayUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    normalizer: ResponseNormalizer,
}

impl PromptRelayUseCase {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self {
            llm_client,
            normalizer: ResponseNormalizer::new(),
        }
    }

    pub async fn execute(
        &self,
        config: &LLMConfig,
        profile: &EndpointProfile,
        request: &Map<String, Value>,
    ) -> Result<RelayResponse> {
        let fields = extract_fields(profile, request)?;

        if let Some(primary) = profile.primary_field() {
            let preview: String = fields[primary].chars().take(LOG_PREVIEW_CHARS).collect();
            info!(
                "[{}] Received {} (first {} chars): {}",
                profile.name, primary, LOG_PREVIEW_CHARS, preview
            );
        }

        let system_prompt = profile
            .system_prompt
            .as_deref()
            .map(|template| render(template, &fields));
        let user_prompt = render(&profile.prompt_template, &fields);

        let completion = self
            .llm_client
            .complete(config, system_prompt.as_deref(), &user_prompt)
            .await?;

        self.shape(profile, &fields, completion)
    }

    fn shape(
        &self,
        profile: &EndpointProfile,
        fields: &HashMap<&str, &str>,
        completion: Completion,
    ) -> Result<RelayResponse> {
        match profile.shape {
            ResponseShape::Relay => Ok(RelayResponse::Raw(completion.body)),
            ResponseShape::Text => {
                let content = require_content(profile, completion)?;
                Ok(RelayResponse::Text {
                    result: clean_completion_text(&content),
                })
            }
            ResponseShape::TestCases => {
                let content = require_content(profile, completion)?;
                let testcases = self.normalizer.normalize(&content);
                let requirement_chars = fields
                    .get("requirement")
                    .or_else(|| profile.primary_field().and_then(|name| fields.get(name)))
                    .map(|text| text.chars().count())
                    .unwrap_or(0);
                info!(
                    "[{}] Normalized {} test case(s) for a {}-char requirement",
                    profile.name,
                    testcases.len(),
                    requirement_chars
                );
                Ok(RelayResponse::TestCases(TestCaseEnvelope { testcases }))
            }
        }
    }
}

fn require_content(profile: &EndpointProfile, completion: Completion) -> Result<String> {
    completion.content.ok_or_else(|| {
        warn!("[{}] Provider response had no message content", profile.name);
        AppError::LLMError("Invalid response format: missing choices[0].message.content".to_string())
    })
}

fn extract_fields<'a>(
    profile: &'a EndpointProfile,
    request: &'a Map<String, Value>,
) -> Result<HashMap<&'a str, &'a str>> {
    let mut fields = HashMap::with_capacity(profile.fields.len());
    for name in &profile.fields {
        let value = match request.get(name) {
            Some(Value::String(value)) => value,
            Some(_) => {
                return Err(AppError::ValidationError(format!(
                    "field `{}` must be a string",
                    name
                )))
            }
            None => {
                return Err(AppError::ValidationError(format!(
                    "field `{}` is required",
                    name
                )))
            }
        };

        PromptField {
            value: value.clone(),
        }
        .validate()
        .map_err(|_| {
            AppError::ValidationError(format!(
                "field `{}` must be between 1 and {} characters",
                name, MAX_FIELD_CHARS
            ))
        })?;

        fields.insert(name.as_str(), value.as_str());
    }
    Ok(fields)
}
