//! Coerces free-form model output into `TestCaseRecord`s.
//!
//! The completion is decoded once. A JSON array of objects is mapped element by
//! element with per-field defaults; anything else collapses into a single
//! parsing-error record that carries the raw text for manual inspection.

use crate::application::use_cases::llm_output::strip_code_fence;
use crate::domain::test_case::{Priority, TestCaseRecord, TestCaseStatus, NO_TITLE};
use crate::infrastructure::response::clean_completion_text;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Outcome of the single decode attempt.
#[derive(Debug)]
enum DecodedCompletion {
    Records(Vec<Map<String, Value>>),
    Undecodable,
}

pub struct ResponseNormalizer {
    id_generator: IdGenerator,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self {
            id_generator: Box::new(|| Uuid::new_v4().to_string()),
        }
    }

    pub fn with_id_generator(id_generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            id_generator: Box::new(id_generator),
        }
    }

    /// Never fails: unreadable output yields exactly one parsing-error record.
    pub fn normalize(&self, raw_output: &str) -> Vec<TestCaseRecord> {
        let mut ids = IdAllocator::new(&self.id_generator);

        match decode(raw_output) {
            DecodedCompletion::Records(items) => {
                debug!("Normalizing {} test case item(s)", items.len());
                items
                    .iter()
                    .map(|item| coerce_record(item, &mut ids))
                    .collect()
            }
            DecodedCompletion::Undecodable => {
                warn!(
                    "Completion is not a JSON array of objects; returning raw output ({} chars)",
                    raw_output.chars().count()
                );
                vec![TestCaseRecord::parsing_error(ids.fresh(), raw_output)]
            }
        }
    }
}

/// The raw text is tried as-is first. Only when it is not JSON at all are a
/// code fence, then reasoning blocks, stripped and decoding retried.
fn parse_json(raw_output: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw_output)
        .or_else(|_| serde_json::from_str::<Value>(&strip_code_fence(raw_output)))
        .or_else(|_| {
            serde_json::from_str::<Value>(&strip_code_fence(&clean_completion_text(raw_output)))
        })
        .ok()
}

fn decode(raw_output: &str) -> DecodedCompletion {
    let Some(Value::Array(items)) = parse_json(raw_output) else {
        return DecodedCompletion::Undecodable;
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => records.push(map),
            _ => return DecodedCompletion::Undecodable,
        }
    }
    DecodedCompletion::Records(records)
}

fn coerce_record(item: &Map<String, Value>, ids: &mut IdAllocator<'_>) -> TestCaseRecord {
    let id = ids.claim(id_value(item.get("id")));

    TestCaseRecord {
        id,
        title: text_field(item, "title").unwrap_or_else(|| NO_TITLE.to_string()),
        description: text_field(item, "description").unwrap_or_default(),
        steps: text_field(item, "steps").unwrap_or_default(),
        expected_result: text_field(item, "expected_result").unwrap_or_default(),
        priority: text_field(item, "priority")
            .and_then(|value| value.parse::<Priority>().ok())
            .unwrap_or_default(),
        status: text_field(item, "status")
            .and_then(|value| value.parse::<TestCaseStatus>().ok())
            .unwrap_or_default(),
    }
}

/// Reads a field as text; `None` when absent, null or empty.
fn text_field(item: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match item.get(key)? {
        Value::Null => return None,
        Value::String(value) => value.clone(),
        Value::Array(values) => values
            .iter()
            .map(|value| match value {
                Value::String(line) => line.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Provided ids only count when truthy: `0`, `false`, `""` and empty containers are ignored.
fn id_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(value) if value.is_empty() => None,
        Value::String(value) => Some(value.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::Number(number) => Some(number.to_string()),
        Value::Array(values) if values.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}

struct IdAllocator<'a> {
    generator: &'a IdGenerator,
    used: HashSet<String>,
}

impl<'a> IdAllocator<'a> {
    fn new(generator: &'a IdGenerator) -> Self {
        Self {
            generator,
            used: HashSet::new(),
        }
    }

    fn claim(&mut self, provided: Option<String>) -> String {
        match provided {
            Some(id) if self.used.insert(id.clone()) => id,
            Some(id) => {
                debug!("Duplicate test case id {:?}; assigning a fresh one", id);
                self.fresh()
            }
            None => self.fresh(),
        }
    }

    fn fresh(&mut self) -> String {
        let mut attempt = 0u32;
        loop {
            let base = (self.generator)();
            let candidate = if attempt == 0 {
                base
            } else {
                format!("{}-{}", base, attempt)
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            attempt += 1;
        }
    }
}
