//! Per-type block renderers and the markup they share.

pub mod html;
pub mod markdown;
pub mod unknown;
pub mod video;

use pulldown_cmark_escape::{escape_href, escape_html};

/// HTML-escape text for element content or a quoted attribute.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = escape_html(&mut out, text);
    out
}

/// Escape a URL for a quoted `src`/`poster` attribute.
pub(crate) fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let _ = escape_href(&mut out, url);
    out
}

/// Normalise an author-supplied CSS length. Bare numbers are pixels.
/// Anything that is not a plain number with a known unit, or `auto`, is rejected.
pub(crate) fn css_length(value: &str) -> Option<String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("auto") {
        return Some("auto".to_string());
    }
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    if number.parse::<f64>().is_err() {
        return None;
    }
    match unit {
        "" => Some(format!("{}px", number)),
        "px" | "%" | "em" | "rem" | "vh" | "vw" => Some(value.to_string()),
        _ => None,
    }
}

/// Visible panel for a block that could not be rendered.
pub fn error_panel(title: &str, message: &str) -> String {
    format!(
        r#"<div class="custom-block custom-block-error" role="alert"><strong>{}</strong><pre>{}</pre></div>"#,
        escape(title),
        escape(message)
    )
}

/// Generic placeholder for a block that is still streaming in.
pub fn loading_panel(type_name: &str) -> String {
    if type_name.is_empty() {
        return r#"<div class="custom-block custom-block-loading" aria-busy="true">Loading block…</div>"#
            .to_string();
    }
    let type_name = escape(type_name);
    format!(
        r#"<div class="custom-block custom-block-loading" data-block-type="{0}" aria-busy="true">Loading {0} block…</div>"#,
        type_name
    )
}
