use std::fmt;

use blockmark::BlockKind;
use blockmark::registry::BlockRegistry;

use crate::Renderer;
use crate::blocks::{self, error_panel, escape, loading_panel, video};
use crate::options::MalformedPolicy;

/// Where a rendered block ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Still streaming in (or a video with no source yet).
    Loading,
    Ready,
    /// Rendered through the unknown-type fallback.
    UnknownType,
    /// Shown as an error panel.
    Error,
    /// Malformed and removed from the output.
    Dropped,
    /// A markdown block past the nesting limit.
    NestingTooDeep,
}

impl BlockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockState::Loading => "loading",
            BlockState::Ready => "ready",
            BlockState::UnknownType => "unknown",
            BlockState::Error => "error",
            BlockState::Dropped => "dropped",
            BlockState::NestingTooDeep => "too-deep",
        }
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of dispatching one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReport {
    pub id: String,
    pub type_name: String,
    pub state: BlockState,
    /// Blocks rendered inside a markdown block.
    pub children: Vec<BlockReport>,
}

/// Everything a block renderer may need from the current pass.
pub struct DispatchContext<'a> {
    pub renderer: &'a Renderer,
    pub registry: &'a BlockRegistry,
    /// Markdown nesting level of the text being rendered; 0 at the top.
    pub depth: usize,
}

pub struct Dispatched {
    pub html: String,
    /// `None` when the id had no registry entry and was passed through.
    pub report: Option<BlockReport>,
}

/// Render the block behind a placeholder id.
///
/// Recomputed from the registry every time; nothing is remembered between
/// passes. Never fails: every problem turns into visible (or dropped) output.
pub fn dispatch(id: &str, ctx: &DispatchContext<'_>) -> Dispatched {
    let Some(descriptor) = ctx.registry.get(id) else {
        tracing::warn!(id, "placeholder without a registry entry, passing through");
        return Dispatched {
            html: format!(r#"<div data-custom-block-id="{}"></div>"#, escape(id)),
            report: None,
        };
    };

    let options = ctx.renderer.options();
    let report = |state: BlockState, children: Vec<BlockReport>| BlockReport {
        id: id.to_string(),
        type_name: descriptor.type_name().to_string(),
        state,
        children,
    };

    if let Some(message) = &descriptor.parse_error {
        return match options.malformed_blocks {
            MalformedPolicy::Drop => {
                tracing::debug!(id, "dropping malformed block");
                Dispatched {
                    html: String::new(),
                    report: Some(report(BlockState::Dropped, Vec::new())),
                }
            }
            MalformedPolicy::Show => Dispatched {
                html: error_panel("Could not parse block", message),
                report: Some(report(BlockState::Error, Vec::new())),
            },
        };
    }

    let (html, state, children) = match &descriptor.kind {
        BlockKind::Video(content) => {
            let state = video::video_state(
                content,
                descriptor.is_loading,
                descriptor.is_complete,
                descriptor.parse_error.as_deref(),
            );
            let block_state = match state {
                video::VideoState::Loading { .. } => BlockState::Loading,
                video::VideoState::Error(_) => BlockState::Error,
                video::VideoState::Ready(_) => BlockState::Ready,
            };
            (
                video::render(&state, &options.loading_height),
                block_state,
                Vec::new(),
            )
        }
        _ if descriptor.is_loading => (
            loading_panel(descriptor.type_name()),
            BlockState::Loading,
            Vec::new(),
        ),
        BlockKind::Html(content) => (
            blocks::html::render(content, ctx.renderer.sanitizer()),
            BlockState::Ready,
            Vec::new(),
        ),
        BlockKind::Markdown(content) => blocks::markdown::render(content, ctx),
        BlockKind::Unknown { type_name, content } => {
            tracing::warn!(id, type_name = %type_name, "unsupported block type");
            (
                blocks::unknown::render(type_name, content),
                BlockState::UnknownType,
                Vec::new(),
            )
        }
    };

    Dispatched {
        html,
        report: Some(report(state, children)),
    }
}
