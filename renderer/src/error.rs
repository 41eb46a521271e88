use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or validating [`RenderOptions`](crate::options::RenderOptions).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
