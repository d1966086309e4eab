pub mod endpoint;
pub mod error;
pub mod llm_config;
pub mod test_case;
