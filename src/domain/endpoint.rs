use serde::{Deserialize, Serialize};

/// How a completion is turned into the HTTP response body.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Provider JSON passed through untouched.
    Relay,
    /// `{"result": "<assistant text>"}`
    Text,
    /// `{"testcases": [...]}`
    TestCases,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointProfile {
    pub name: String,
    pub path: String,
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub prompt_template: String,
    pub shape: ResponseShape,
}

impl EndpointProfile {
    /// First declared field; used for request logging.
    pub fn primary_field(&self) -> Option<&str> {
        self.fields.first().map(String::as_str)
    }

    pub fn builtin() -> Vec<EndpointProfile> {
        vec![
            EndpointProfile {
                name: "summarize".to_string(),
                path: "/summarize".to_string(),
                fields: vec!["meeting_text".to_string()],
                system_prompt: None,
                prompt_template: "Summarize and give action items:\n{meeting_text}".to_string(),
                shape: ResponseShape::Relay,
            },
            EndpointProfile {
                name: "analyze".to_string(),
                path: "/analyze".to_string(),
                fields: vec!["datasheet".to_string(), "log".to_string()],
                system_prompt: Some(
                    "You are an embedded systems engineer. Compare device logs against the datasheet and point out anomalies, likely causes, and next debugging steps.".to_string(),
                ),
                prompt_template: "Datasheet:\n{datasheet}\n\nLog:\n{log}".to_string(),
                shape: ResponseShape::Text,
            },
            EndpointProfile {
                name: "testcases".to_string(),
                path: "/generate-testcases".to_string(),
                fields: vec!["requirement".to_string()],
                system_prompt: Some(
                    "You are a QA engineer. Return only a JSON array of test cases. Each item: {{id, title, description, steps, expected_result, priority, status}}. priority is one of High, Medium, Low. status is one of Open, In Progress, Closed. Do not wrap the array in any other text.".to_string(),
                ),
                prompt_template: "Generate test cases for the following software requirement:\n{requirement}".to_string(),
                shape: ResponseShape::TestCases,
            },
            EndpointProfile {
                name: "action-items".to_string(),
                path: "/action-items".to_string(),
                fields: vec!["meeting_text".to_string()],
                system_prompt: None,
                prompt_template: "List the action items from this meeting as a bullet list with owners where mentioned:\n{meeting_text}".to_string(),
                shape: ResponseShape::Text,
            },
        ]
    }
}
