use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::ScanResult;
use crate::decoder;
use crate::diagnostic::BlockDiagnostic;
use crate::registry::{BlockRegistry, PlaceholderId};

pub const OPEN_MARKER: &str = "!#block#!";
pub const CLOSE_MARKER: &str = "!#/block#!";

/// A closed block region found in raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatch<'a> {
    /// The whole region, markers included.
    pub full_text: &'a str,
    /// The brace-delimited JSON body.
    pub inner_json: &'a str,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Byte offset of `inner_json` in the raw text.
    pub json_offset: usize,
}

fn block_pattern() -> &'static Regex {
    static BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
    BLOCK_REGEX.get_or_init(|| {
        Regex::new(r"(?s)!#block#!\s*(\{.*?\})\s*!#/block#!").expect("block pattern is valid")
    })
}

fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r#"<div data-custom-block-id="(custom-block-\d+)">"#)
            .expect("placeholder pattern is valid")
    })
}

/// Find every fully closed block, left to right. Unterminated blocks are
/// not matched and stay in the text as-is.
pub fn find_blocks(source: &str) -> Vec<BlockMatch<'_>> {
    block_pattern()
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let json = caps.get(1)?;
            Some(BlockMatch {
                full_text: whole.as_str(),
                inner_json: json.as_str(),
                start_offset: whole.start(),
                end_offset: whole.end(),
                json_offset: json.start(),
            })
        })
        .collect()
}

/// The anchor element substituted for a block.
pub fn placeholder_markup(id: PlaceholderId) -> String {
    format!(r#"<div data-custom-block-id="{}"></div>"#, id)
}

/// Ids of every placeholder anchor in `text`, in order of appearance.
pub fn find_placeholders(text: &str) -> Vec<PlaceholderId> {
    placeholder_pattern()
        .captures_iter(text)
        .filter_map(|caps| PlaceholderId::parse(caps.get(1)?.as_str()))
        .collect()
}

/// Rename anchor markup the author wrote so it cannot pose as one of ours.
fn neutralize_anchors(text: &str) -> Cow<'_, str> {
    placeholder_pattern().replace_all(text, r#"<div data-custom-block-literal="$1">"#)
}

/// Every placeholder anchor in `text` with its byte range, in order.
/// The range covers the opening tag and, when present, the `</div>` right after it.
pub fn placeholder_spans(text: &str) -> Vec<(std::ops::Range<usize>, String)> {
    placeholder_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?.as_str().to_string();
            let end = if text[whole.end()..].starts_with("</div>") {
                whole.end() + "</div>".len()
            } else {
                whole.end()
            };
            Some((whole.start()..end, id))
        })
        .collect()
}

/// Scanner entry point.
pub struct Scanner<'a> {
    source: &'a str,
    file_id: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, file_id: usize) -> Self {
        Scanner { source, file_id }
    }

    /// Replace every closed block with a placeholder anchor and decode its
    /// payload into the registry. Malformed payloads still get an entry
    /// (carrying `parse_error`) so the renderer can choose how to show them.
    pub fn scan(&self) -> ScanResult {
        let source = self.source;
        let mut processed_text = String::with_capacity(source.len());
        let mut registry = BlockRegistry::new();
        let mut diagnostics = Vec::new();
        let mut last = 0;
        // Anchors are only emitted for text with markers; marker-free text
        // (including our own output) is left alone.
        let neutralize = source.contains(OPEN_MARKER);
        let copy = |out: &mut String, segment: &str| {
            if neutralize {
                out.push_str(&neutralize_anchors(segment));
            } else {
                out.push_str(segment);
            }
        };

        for (index, block) in find_blocks(source).into_iter().enumerate() {
            let id = PlaceholderId::new(index);
            copy(&mut processed_text, &source[last..block.start_offset]);
            processed_text.push_str(&placeholder_markup(id));
            last = block.end_offset;

            let descriptor = match decoder::try_decode(block.inner_json) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    tracing::warn!(block = %id, error = %err, "malformed block payload");
                    diagnostics.push(BlockDiagnostic::malformed_payload(&block, &err, self.file_id));
                    decoder::failed(block.inner_json, &err)
                }
            };
            registry.insert(id, descriptor);
        }
        copy(&mut processed_text, &source[last..]);

        tracing::debug!(
            blocks = registry.len(),
            malformed = diagnostics.len(),
            "scan pass complete"
        );

        ScanResult {
            processed_text,
            registry,
            diagnostics,
            source_id: self.file_id,
        }
    }
}
