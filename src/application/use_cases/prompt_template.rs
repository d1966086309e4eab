use std::collections::HashMap;

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Splits a template into literal text and `{name}` placeholders.
/// `{{` and `}}` are escaped braces; a brace that does not open a valid
/// placeholder stays literal.
fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut index = 0;
    let bytes = template.as_bytes();

    while index < bytes.len() {
        match bytes[index] {
            b'{' if bytes.get(index + 1) == Some(&b'{') => {
                tokens.push(Token::Text(&template[literal_start..index + 1]));
                index += 2;
                literal_start = index;
            }
            b'}' if bytes.get(index + 1) == Some(&b'}') => {
                tokens.push(Token::Text(&template[literal_start..index + 1]));
                index += 2;
                literal_start = index;
            }
            b'{' => {
                let rest = &template[index + 1..];
                let name_len = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                if name_len > 0 && rest.as_bytes().get(name_len) == Some(&b'}') {
                    tokens.push(Token::Text(&template[literal_start..index]));
                    tokens.push(Token::Placeholder(&rest[..name_len]));
                    index += name_len + 2;
                    literal_start = index;
                } else {
                    index += 1;
                }
            }
            _ => index += 1,
        }
    }
    tokens.push(Token::Text(&template[literal_start..]));
    tokens.retain(|token| !matches!(token, Token::Text("")));
    tokens
}

/// Names of every `{name}` placeholder, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in tokenize(template) {
        if let Token::Placeholder(name) = token {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Substitutes known placeholders; unknown ones are left as written.
pub fn render(template: &str, values: &HashMap<&str, &str>) -> String {
    let mut output = String::with_capacity(template.len());
    for token in tokenize(template) {
        match token {
            Token::Text(text) => output.push_str(text),
            Token::Placeholder(name) => match values.get(name) {
                Some(value) => output.push_str(value),
                None => {
                    output.push('{');
                    output.push_str(name);
                    output.push('}');
                }
            },
        }
    }
    output
}
