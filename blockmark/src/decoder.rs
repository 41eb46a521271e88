use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{BlockDescriptor, BlockKind};
use crate::partial::complete_partial_json;

/// Why a closed block's payload could not be decoded.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid block JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("block payload must be a JSON object")]
    NotAnObject,
}

/// Strictly decode the JSON body of a closed block.
///
/// A payload without a string `type` still decodes; it becomes an
/// `Unknown` kind with an empty type name.
pub fn try_decode(json: &str) -> Result<BlockDescriptor, DecodeError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(mut map) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let type_name = match map.get("type") {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let content = map.remove("content").unwrap_or(Value::Null);

    Ok(BlockDescriptor::complete(BlockKind::from_parts(
        &type_name, content,
    )))
}

/// Decode the JSON body of a closed block. Never fails: a payload that
/// does not decode yields a descriptor carrying `parse_error`, with the
/// zero-value content of whatever type can still be read from the text.
pub fn decode(json: &str) -> BlockDescriptor {
    match try_decode(json) {
        Ok(descriptor) => descriptor,
        Err(err) => failed(json, &err),
    }
}

/// The descriptor recorded for a payload that failed with `err`.
pub fn failed(json: &str, err: &DecodeError) -> BlockDescriptor {
    let type_name = infer_type(json).unwrap_or_default();
    BlockDescriptor::failed(BlockKind::empty(&type_name), err.to_string())
}

/// Best-effort decode of a payload that is still streaming in.
pub fn decode_partial(fragment: &str) -> BlockDescriptor {
    let kind = match complete_partial_json(fragment) {
        Some(Value::Object(mut map)) => {
            let content = map.remove("content").unwrap_or(Value::Null);
            match map.get("type") {
                Some(Value::String(type_name)) => BlockKind::from_parts(type_name, content),
                _ => BlockKind::empty(""),
            }
        }
        _ => BlockKind::empty(""),
    };
    BlockDescriptor::loading(kind)
}

fn infer_type(json: &str) -> Option<String> {
    match complete_partial_json(json)? {
        Value::Object(map) => map.get("type")?.as_str().map(str::to_string),
        _ => None,
    }
}
