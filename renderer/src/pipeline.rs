use blockmark::diagnostic::BlockDiagnostic;
use blockmark::registry::BlockRegistry;
use blockmark::pending::{detect_pending, trailing_marker_prefix};
use blockmark::scanner::{placeholder_markup, placeholder_spans};
use blockmark::{ScanResult, Scanner};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};

use crate::blocks::escape;
use crate::dispatch::{BlockReport, DispatchContext, dispatch};
use crate::languages::LanguageRegistry;
use crate::options::{RawHtmlPolicy, RenderOptions};
use crate::sanitize::{AmmoniaSanitizer, Sanitizer};

/// Result of rendering one text snapshot.
#[derive(Debug, Clone, Default)]
pub struct RenderedOutput {
    pub html: String,
    /// One report per placeholder reached by the markdown renderer, in order.
    pub blocks: Vec<BlockReport>,
    /// Malformed payloads in the top-level text.
    pub diagnostics: Vec<BlockDiagnostic>,
}

impl RenderedOutput {
    pub fn block(&self, id: &str) -> Option<&BlockReport> {
        self.blocks.iter().find(|report| report.id == id)
    }
}

/// The host pipeline: scan, detect the in-flight block, render the markdown,
/// and dispatch every placeholder the markdown renderer hands back.
pub struct Renderer {
    options: RenderOptions,
    sanitizer: Box<dyn Sanitizer>,
    languages: LanguageRegistry,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new(RenderOptions::default())
    }
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer {
            options,
            sanitizer: Box::new(AmmoniaSanitizer::default()),
            languages: LanguageRegistry::with_defaults(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    pub fn with_languages(mut self, languages: LanguageRegistry) -> Self {
        self.languages = languages;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn sanitizer(&self) -> &dyn Sanitizer {
        self.sanitizer.as_ref()
    }

    /// Render the full current text. Safe to call on any prefix of a stream.
    pub fn render(&self, content: &str) -> RenderedOutput {
        self.render_at(content, 0, 0, self.options.hold_back_partial_marker)
    }

    /// Render text that will not grow any further. Nothing is withheld at
    /// the end, even when it looks like the start of a marker.
    pub fn render_final(&self, content: &str) -> RenderedOutput {
        self.render_source(content, 0)
    }

    /// Like [`render_final`](Self::render_final), tagging diagnostics with a
    /// codespan file id.
    pub fn render_source(&self, content: &str, file_id: usize) -> RenderedOutput {
        self.render_at(content, 0, file_id, false)
    }

    /// Nested content comes from a closed block, so it is always final.
    pub(crate) fn render_nested(&self, content: &str, depth: usize) -> RenderedOutput {
        let output = self.render_at(content, depth, 0, false);
        for diagnostic in &output.diagnostics {
            tracing::debug!(depth, message = %diagnostic.message, "nested block diagnostic");
        }
        RenderedOutput {
            diagnostics: Vec::new(),
            ..output
        }
    }

    fn render_at(
        &self,
        content: &str,
        depth: usize,
        file_id: usize,
        hold_back: bool,
    ) -> RenderedOutput {
        let ScanResult {
            mut processed_text,
            mut registry,
            diagnostics,
            ..
        } = Scanner::new(content, file_id).scan();
        self.attach_pending(&mut processed_text, &mut registry, hold_back);

        let ctx = DispatchContext {
            renderer: self,
            registry: &registry,
            depth,
        };
        let mut blocks = Vec::new();
        let events = self.rewrite_events(&processed_text, &ctx, &mut blocks);

        let mut out = String::with_capacity(processed_text.len() + processed_text.len() / 2);
        html::push_html(&mut out, events.into_iter());

        RenderedOutput {
            html: out,
            blocks,
            diagnostics,
        }
    }

    /// Swap the unterminated tail for a loading placeholder, or withhold a
    /// half-written opening marker.
    fn attach_pending(&self, text: &mut String, registry: &mut BlockRegistry, hold_back: bool) {
        if let Some(pending) = detect_pending(text, registry.next_index()) {
            tracing::debug!(
                block = %pending.id,
                type_name = pending.descriptor.type_name(),
                "block still streaming"
            );
            text.truncate(pending.offset);
            text.push_str(&placeholder_markup(pending.id));
            registry.insert(pending.id, pending.descriptor);
        } else if hold_back {
            let held = trailing_marker_prefix(text);
            text.truncate(text.len() - held);
        }
    }

    fn rewrite_events<'t>(
        &self,
        text: &'t str,
        ctx: &DispatchContext<'_>,
        reports: &mut Vec<BlockReport>,
    ) -> Vec<Event<'t>> {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let sanitize_runs = self.options.raw_html == RawHtmlPolicy::Sanitize;
        let mut events = Vec::new();
        // Lines of the current HTML block; placeholders may span the whole block.
        let mut html_block: Option<String> = None;
        // An inline placeholder's `</div>` arrives as its own event.
        let mut swallow_close = false;
        let mut run = InlineRun::default();

        for event in Parser::new_ext(text, options) {
            match event {
                Event::Start(Tag::HtmlBlock) => {
                    self.flush_run(&mut run, &mut events);
                    html_block = Some(String::new());
                    events.push(Event::Start(Tag::HtmlBlock));
                }
                Event::Html(raw) => match html_block.as_mut() {
                    Some(buffer) => buffer.push_str(&raw),
                    None => {
                        self.flush_run(&mut run, &mut events);
                        events.push(Event::Html(self.rewrite_html(&raw, ctx, reports).into()));
                    }
                },
                Event::End(TagEnd::HtmlBlock) => {
                    if let Some(buffer) = html_block.take() {
                        events.push(Event::Html(self.rewrite_html(&buffer, ctx, reports).into()));
                    }
                    events.push(Event::End(TagEnd::HtmlBlock));
                }
                Event::InlineHtml(raw) => {
                    if std::mem::take(&mut swallow_close) && raw.trim() == "</div>" {
                        continue;
                    }
                    let spans = placeholder_spans(&raw);
                    if spans.is_empty() && sanitize_runs {
                        run.events.push(Event::InlineHtml(raw));
                        run.has_html = true;
                        continue;
                    }
                    swallow_close = spans
                        .last()
                        .is_some_and(|(range, _)| !raw[range.clone()].ends_with("</div>"));
                    self.flush_run(&mut run, &mut events);
                    events.push(Event::InlineHtml(self.rewrite_html(&raw, ctx, reports).into()));
                }
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    self.flush_run(&mut run, &mut events);
                    let language = self.languages.resolve(&info).unwrap_or_default().to_string();
                    events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                        language.into(),
                    ))));
                }
                other if is_inline(&other) => {
                    swallow_close = false;
                    run.events.push(other);
                }
                other => {
                    swallow_close = false;
                    self.flush_run(&mut run, &mut events);
                    events.push(other);
                }
            }
        }
        self.flush_run(&mut run, &mut events);

        events
    }

    /// Emit a held inline run. A run with raw HTML is rendered and sanitized
    /// as one fragment so tags and the text they wrap stay together.
    fn flush_run<'t>(&self, run: &mut InlineRun<'t>, events: &mut Vec<Event<'t>>) {
        let held = std::mem::take(&mut run.events);
        if !std::mem::take(&mut run.has_html) {
            events.extend(held);
            return;
        }
        let mut raw = String::new();
        html::push_html(&mut raw, held.into_iter());
        events.push(Event::InlineHtml(self.sanitizer.sanitize(&raw).into()));
    }

    /// Replace placeholder anchors in a run of raw HTML with their rendered
    /// blocks; everything around them goes through the raw HTML policy.
    fn rewrite_html(
        &self,
        raw: &str,
        ctx: &DispatchContext<'_>,
        reports: &mut Vec<BlockReport>,
    ) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut last = 0;
        for (range, id) in placeholder_spans(raw) {
            out.push_str(&self.raw_html(&raw[last..range.start]));
            let dispatched = dispatch(&id, ctx);
            out.push_str(&dispatched.html);
            reports.extend(dispatched.report);
            last = range.end;
        }
        out.push_str(&self.raw_html(&raw[last..]));
        out
    }

    fn raw_html(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return html.to_string();
        }
        match self.options.raw_html {
            RawHtmlPolicy::Allow => html.to_string(),
            RawHtmlPolicy::Escape => escape(html),
            RawHtmlPolicy::Sanitize => self.sanitizer.sanitize(html),
        }
    }
}

/// Inline events held back until the enclosing block ends.
#[derive(Default)]
struct InlineRun<'t> {
    events: Vec<Event<'t>>,
    has_html: bool,
}

fn is_inline(event: &Event<'_>) -> bool {
    match event {
        Event::Text(_) | Event::Code(_) | Event::SoftBreak | Event::HardBreak => true,
        Event::Start(tag) => matches!(
            tag,
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
        ),
        Event::End(tag) => matches!(
            tag,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
        ),
        _ => false,
    }
}

/// Render with default options, the ammonia sanitizer and the default languages.
pub fn render(content: &str) -> RenderedOutput {
    Renderer::default().render(content)
}
