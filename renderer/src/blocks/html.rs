use crate::sanitize::Sanitizer;

/// An `html` block: sanitized, then injected as markup.
pub fn render(content: &str, sanitizer: &dyn Sanitizer) -> String {
    format!(
        r#"<div class="custom-block custom-block-html">{}</div>"#,
        sanitizer.sanitize(content)
    )
}
