use serde_json::Value;

use super::escape;

/// Visible diagnostic for a block type nothing knows how to render.
pub fn render(type_name: &str, content: &Value) -> String {
    let label = if type_name.is_empty() {
        "<em>missing type</em>".to_string()
    } else {
        format!("<code>{}</code>", escape(type_name))
    };
    let raw = match content {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let body = if raw.is_empty() {
        String::new()
    } else {
        format!("<pre>{}</pre>", escape(&raw))
    };
    format!(
        r#"<div class="custom-block custom-block-unknown" role="note"><p class="custom-block-warning">Unsupported block type: {}</p>{}</div>"#,
        label, body
    )
}
