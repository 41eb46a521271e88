use crate::decoder::decode_partial;
use crate::descriptor::BlockDescriptor;
use crate::registry::PlaceholderId;
use crate::scanner::{CLOSE_MARKER, OPEN_MARKER};

/// Shortest tail that is withheld as a possible half-streamed opening marker.
const MIN_MARKER_PREFIX: usize = 3;

/// A block whose opening marker has arrived but whose closing marker has not.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBlock {
    /// Byte offset of the opening marker. Everything from here on belongs to the block.
    pub offset: usize,
    pub id: PlaceholderId,
    pub descriptor: BlockDescriptor,
}

/// Find the in-flight block in already-scanned text.
///
/// Closed blocks have been replaced by placeholders, so an opening marker
/// left over is malformed (a closing marker still follows it), literal
/// text (something other than a JSON object follows it), or still
/// streaming. The first streaming one wins. `next_index` is the
/// placeholder index it will get once it closes.
pub fn detect_pending(text: &str, next_index: usize) -> Option<PendingBlock> {
    let mut from = 0;
    while let Some(found) = text[from..].find(OPEN_MARKER) {
        let offset = from + found;
        let body_start = offset + OPEN_MARKER.len();
        let body = &text[body_start..];
        if opens_payload(body) && !body.contains(CLOSE_MARKER) {
            return Some(PendingBlock {
                offset,
                id: PlaceholderId::new(next_index),
                descriptor: decode_partial(body),
            });
        }
        from = body_start;
    }
    None
}

/// Nothing yet, or the start of a JSON object.
fn opens_payload(body: &str) -> bool {
    let body = body.trim_start();
    body.is_empty() || body.starts_with('{')
}

/// Length of a trailing, unfinished `!#block#!` at the end of `text`.
pub fn trailing_marker_prefix(text: &str) -> usize {
    (MIN_MARKER_PREFIX..OPEN_MARKER.len())
        .rev()
        .find(|&len| text.ends_with(&OPEN_MARKER[..len]))
        .unwrap_or(0)
}
