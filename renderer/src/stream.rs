use blockmark::pending::trailing_marker_prefix;

use crate::pipeline::{RenderedOutput, Renderer};

/// Accumulates streamed text and re-renders the whole buffer on every chunk.
///
/// There is no incremental parsing: each render is a pure function of the
/// accumulated text, so a block split across chunks is never lost or
/// duplicated. The last output is kept together with the text it was
/// rendered from, so empty chunks and repeated snapshots do not re-render.
pub struct StreamSession<'r> {
    renderer: &'r Renderer,
    buffer: String,
    last: Option<(String, RenderedOutput)>,
}

impl<'r> StreamSession<'r> {
    pub fn new(renderer: &'r Renderer) -> Self {
        StreamSession {
            renderer,
            buffer: String::new(),
            last: None,
        }
    }

    /// Append a chunk and render the accumulated text.
    pub fn push(&mut self, chunk: &str) -> &RenderedOutput {
        self.buffer.push_str(chunk);
        self.render_current()
    }

    /// Replace the whole buffer (e.g. when the transport resends the message).
    pub fn replace(&mut self, content: impl Into<String>) -> &RenderedOutput {
        self.buffer = content.into();
        self.render_current()
    }

    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// Final render of everything received. The stream is over, so a
    /// trailing partial marker is kept as text.
    pub fn finish(self) -> RenderedOutput {
        match self.last {
            Some((rendered, output))
                if rendered == self.buffer && trailing_marker_prefix(&self.buffer) == 0 =>
            {
                output
            }
            _ => self.renderer.render_final(&self.buffer),
        }
    }

    fn render_current(&mut self) -> &RenderedOutput {
        let entry = match self.last.take() {
            Some((rendered, output)) if rendered == self.buffer => {
                tracing::trace!("stream buffer unchanged, reusing render");
                (rendered, output)
            }
            _ => (self.buffer.clone(), self.renderer.render(&self.buffer)),
        };
        &self.last.insert(entry).1
    }
}
