use crate::dispatch::{BlockReport, BlockState, DispatchContext};

use super::error_panel;

/// A `markdown` block: the same pipeline, one level deeper.
///
/// Returns the markup, the block's state and the reports of any blocks
/// rendered inside it.
pub fn render(content: &str, ctx: &DispatchContext<'_>) -> (String, BlockState, Vec<BlockReport>) {
    let depth = ctx.depth + 1;
    let max_depth = ctx.renderer.options().max_depth;
    if depth > max_depth {
        tracing::warn!(depth, max_depth, "markdown block nesting too deep");
        let html = error_panel(
            "Nesting too deep",
            &format!("markdown blocks may nest at most {} levels", max_depth),
        );
        return (html, BlockState::NestingTooDeep, Vec::new());
    }

    let output = ctx.renderer.render_nested(content, depth);
    let html = format!(
        r#"<div class="custom-block custom-block-markdown">{}</div>"#,
        output.html
    );
    (html, BlockState::Ready, output.blocks)
}
