/// Removes surrounding whitespace and one enclosing Markdown code fence.
///
/// Models often answer "```json\n[...]\n```" even when told to return bare JSON.
/// Anything after the opening backticks up to the first newline is treated as
/// the language tag.
pub(crate) fn strip_code_fence(output: &str) -> String {
    let trimmed = output.trim();
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    let body = match fenced.split_once('\n') {
        Some((tag, rest)) if is_language_tag(tag) => rest,
        _ => fenced,
    };
    body.trim().trim_end_matches("```").trim().to_string()
}

fn is_language_tag(tag: &str) -> bool {
    tag.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
