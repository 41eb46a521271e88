use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded custom block: its typed payload plus the flags the decoder
/// derives from how the block was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDescriptor {
    pub kind: BlockKind,
    /// The block is still streaming in (opening marker seen, no closing marker yet).
    pub is_loading: bool,
    /// Both markers were present and the payload decoded.
    pub is_complete: bool,
    /// Set only when the payload failed to decode.
    pub parse_error: Option<String>,
}

impl BlockDescriptor {
    /// A descriptor for a fully closed, successfully decoded block.
    pub fn complete(kind: BlockKind) -> Self {
        BlockDescriptor {
            kind,
            is_loading: false,
            is_complete: true,
            parse_error: None,
        }
    }

    /// A descriptor for a block whose payload is still arriving.
    pub fn loading(kind: BlockKind) -> Self {
        BlockDescriptor {
            kind,
            is_loading: true,
            is_complete: false,
            parse_error: None,
        }
    }

    /// A descriptor for a closed block whose payload could not be decoded.
    pub fn failed(kind: BlockKind, message: impl Into<String>) -> Self {
        BlockDescriptor {
            kind,
            is_loading: false,
            is_complete: false,
            parse_error: Some(message.into()),
        }
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

/// The closed set of block types. Anything the dispatcher does not know
/// about lands in `Unknown` with its original type string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum BlockKind {
    Video(VideoContent),
    Html(String),
    Markdown(String),
    Unknown { type_name: String, content: Value },
}

impl BlockKind {
    /// Build a kind from the wire `type` string and raw `content` value.
    /// Content of the wrong shape coerces to the type's zero value.
    pub fn from_parts(type_name: &str, content: Value) -> Self {
        match type_name {
            "video" => BlockKind::Video(VideoContent::from_value(content)),
            "html" => BlockKind::Html(string_content(content)),
            "markdown" => BlockKind::Markdown(string_content(content)),
            other => BlockKind::Unknown {
                type_name: other.to_string(),
                content,
            },
        }
    }

    /// The zero-value kind for a type name.
    pub fn empty(type_name: &str) -> Self {
        BlockKind::from_parts(type_name, Value::Null)
    }

    pub fn type_name(&self) -> &str {
        match self {
            BlockKind::Video(_) => "video",
            BlockKind::Html(_) => "html",
            BlockKind::Markdown(_) => "markdown",
            BlockKind::Unknown { type_name, .. } => type_name,
        }
    }
}

fn string_content(content: Value) -> String {
    match content {
        Value::String(s) => s,
        _ => String::new(),
    }
}

/// Payload of a `video` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoContent {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub additional: VideoOptions,
}

impl VideoContent {
    fn from_value(content: Value) -> Self {
        if content.is_null() {
            return VideoContent::default();
        }
        serde_json::from_value(content).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "video content has unexpected shape, using defaults");
            VideoContent::default()
        })
    }

    /// True when there is a non-empty source to play.
    pub fn has_source(&self) -> bool {
        self.src.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Player settings carried under `content.additional`. Every field is
/// optional on the wire; defaults are applied when the player is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    pub autoplay: Option<bool>,
    pub controls: Option<bool>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub poster: Option<String>,
    pub muted: Option<bool>,
    pub r#loop: Option<bool>,
    pub preload: Option<String>,
}

/// A width or height as written by the author: `640`, `"640px"`, `"100%"`, `"auto"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Number(f64),
    Text(String),
}

impl Dimension {
    /// Pixel value if the dimension is a bare number or a `px` string.
    pub fn pixels(&self) -> Option<f64> {
        match self {
            Dimension::Number(n) => Some(*n),
            Dimension::Text(s) => {
                let trimmed = s.trim();
                let digits = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
                digits.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
    }
}

/// `preload` hint for the media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preload {
    None,
    Metadata,
    Auto,
}

impl Preload {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Preload::None),
            "metadata" => Some(Preload::Metadata),
            "auto" => Some(Preload::Auto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preload::None => "none",
            Preload::Metadata => "metadata",
            Preload::Auto => "auto",
        }
    }
}
