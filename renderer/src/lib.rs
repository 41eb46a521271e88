pub mod blocks;
pub mod dispatch;
pub mod error;
pub mod languages;
pub mod options;
pub mod pipeline;
pub mod sanitize;
pub mod stream;

pub use dispatch::{BlockReport, BlockState};
pub use error::ConfigError;
pub use options::RenderOptions;
pub use pipeline::{RenderedOutput, Renderer, render};
pub use stream::StreamSession;
