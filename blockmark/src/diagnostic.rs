use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

use crate::decoder::DecodeError;
use crate::scanner::BlockMatch;

/// A problem found while scanning, tied to a byte span of the raw input.
#[derive(Debug, Clone)]
pub struct BlockDiagnostic {
    pub message: String,
    /// Where the problem is.
    pub span: Range<usize>,
    /// The enclosing block, when it differs from `span`.
    pub block_span: Option<Range<usize>>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl BlockDiagnostic {
    pub fn warning(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        BlockDiagnostic {
            message: message.into(),
            span,
            block_span: None,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
        }
    }

    /// A closed block whose JSON body failed to decode. The primary label
    /// points at the byte serde_json stopped on; the block itself is the
    /// secondary label.
    pub fn malformed_payload(block: &BlockMatch<'_>, err: &DecodeError, file_id: usize) -> Self {
        let json_span = block.json_offset..block.json_offset + block.inner_json.len();
        let span = match err {
            DecodeError::Json(json_err) if json_err.line() > 0 => {
                let at = block.json_offset
                    + line_column_offset(block.inner_json, json_err.line(), json_err.column());
                at..(at + 1).min(json_span.end).max(at)
            }
            _ => json_span,
        };

        BlockDiagnostic {
            message: "malformed block payload".to_string(),
            span,
            block_span: Some(block.start_offset..block.end_offset),
            file_id,
            severity: Severity::Warning,
            notes: vec![err.to_string()],
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let mut labels = vec![Label::primary(self.file_id, self.span.clone())];
        if let Some(block_span) = &self.block_span {
            labels.push(
                Label::secondary(self.file_id, block_span.clone()).with_message("in this block"),
            );
        }
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}

/// Byte offset of a 1-based (line, column) position, clamped to `text`.
fn line_column_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>();
    let mut offset = (line_start + column.saturating_sub(1)).min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
