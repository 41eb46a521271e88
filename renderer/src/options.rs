use std::path::Path;

use serde::Deserialize;

use crate::blocks::css_length;
use crate::error::ConfigError;

/// What to do with a closed block whose JSON body does not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Render an error panel with the decode message.
    #[default]
    Show,
    /// Remove the block from the output.
    Drop,
}

/// What to do with raw HTML written directly in the markdown (outside blocks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawHtmlPolicy {
    /// Pass it through the configured sanitizer.
    #[default]
    Sanitize,
    /// Show it as literal text.
    Escape,
    /// Emit it untouched. Only for trusted input.
    Allow,
}

/// Render pipeline settings, usually read from a TOML file.
///
/// ```toml
/// max_depth = 3
/// malformed_blocks = "drop"
/// raw_html = "escape"
/// loading_height = "240px"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// How many levels of nested markdown blocks may be rendered.
    pub max_depth: usize,
    pub malformed_blocks: MalformedPolicy,
    pub raw_html: RawHtmlPolicy,
    /// Skeleton height used while a video block with `auto` height loads.
    pub loading_height: String,
    /// Withhold a half-streamed `!#block#!` marker at the end of the text.
    pub hold_back_partial_marker: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            max_depth: 5,
            malformed_blocks: MalformedPolicy::Show,
            raw_html: RawHtmlPolicy::Sanitize,
            loading_height: "300px".to_string(),
            hold_back_partial_marker: true,
        }
    }
}

impl RenderOptions {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let options: RenderOptions = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if css_length(&self.loading_height).is_none() || self.loading_height.trim() == "auto" {
            return Err(ConfigError::Invalid(format!(
                "loading_height '{}' is not a fixed CSS length",
                self.loading_height
            )));
        }
        Ok(())
    }
}
