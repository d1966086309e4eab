pub mod use_cases;

pub use use_cases::prompt_relay::PromptRelayUseCase;
