use once_cell::sync::Lazy;
use regex::Regex;

/// Reasoning blocks some models (DeepSeek-R1, Qwen) emit before the answer.
static REASONING_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>|<think\s*/>|<reasoning>.*?</reasoning>")
        .expect("reasoning block pattern is valid")
});

static BLANK_LINE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

/// Strips model reasoning blocks and collapses runs of blank lines.
pub fn clean_completion_text(text: &str) -> String {
    let without_reasoning = REASONING_BLOCKS.replace_all(text, "");
    BLANK_LINE_RUNS
        .replace_all(without_reasoning.trim(), "\n\n")
        .into_owned()
}
