pub mod llm_output;
pub mod prompt_relay;
pub mod prompt_template;
pub mod test_case_normalizer;
