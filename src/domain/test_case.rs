use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const NO_TITLE: &str = "No Title";
pub const PARSING_ERROR_TITLE: &str = "Parsing Error - raw output";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestCaseStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Closed,
}

impl FromStr for TestCaseStatus {
    type Err = ();

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "Open" => Ok(TestCaseStatus::Open),
            "In Progress" => Ok(TestCaseStatus::InProgress),
            "Closed" => Ok(TestCaseStatus::Closed),
            _ => Err(()),
        }
    }
}

/// A test case as returned to callers. Every field is always populated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TestCaseRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub steps: String,
    pub expected_result: String,
    pub priority: Priority,
    pub status: TestCaseStatus,
}

impl TestCaseRecord {
    /// Placeholder emitted when a completion cannot be read as a list of test cases.
    pub fn parsing_error(id: String, raw_output: &str) -> Self {
        Self {
            id,
            title: PARSING_ERROR_TITLE.to_string(),
            description: raw_output.to_string(),
            steps: String::new(),
            expected_result: String::new(),
            priority: Priority::default(),
            status: TestCaseStatus::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestCaseEnvelope {
    pub testcases: Vec<TestCaseRecord>,
}
