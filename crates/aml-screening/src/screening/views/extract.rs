use pulldown_cmark::{html, Options, Parser};
use serde_json::Value;

use crate::screening::gateway::unwrap_envelope;

const TOP_LEVEL_FIELDS: [&str; 3] = ["markdown", "content", "text"];
const OUTPUT_FIELDS: [&str; 2] = ["markdown", "content"];

/// Pull displayable markdown out of a stored gateway response.
///
/// Strings are used verbatim; objects yield their first non-empty
/// `markdown`/`content`/`text` field, then `output.markdown`/`output.content`;
/// anything else is pretty-printed.
pub fn extract_markdown(value: &Value) -> String {
    let value = unwrap_envelope(value.clone());
    if let Value::String(text) = &value {
        return text.clone();
    }

    if let Some(text) = first_text(&value, &TOP_LEVEL_FIELDS) {
        return text.to_string();
    }
    if let Some(text) = value
        .get("output")
        .and_then(|output| first_text(output, &OUTPUT_FIELDS))
    {
        return text.to_string();
    }

    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn first_text<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| value.get(*field).and_then(Value::as_str))
        .find(|text| !text.is_empty())
}

pub(crate) fn render_html(source: &str, options: Options) -> String {
    let parser = Parser::new_ext(source, options);
    let mut rendered = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut rendered, parser);
    rendered
}
