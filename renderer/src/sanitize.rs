/// Cleans untrusted HTML before it is injected into the output.
///
/// Implementations must strip script execution vectors and should be
/// idempotent: sanitizing already-clean markup returns it unchanged.
pub trait Sanitizer {
    fn sanitize(&self, html: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String,
{
    fn sanitize(&self, html: &str) -> String {
        self(html)
    }
}

/// The default sanitizer, backed by ammonia's allowlist.
pub struct AmmoniaSanitizer {
    builder: ammonia::Builder<'static>,
}

impl AmmoniaSanitizer {
    pub fn new(builder: ammonia::Builder<'static>) -> Self {
        AmmoniaSanitizer { builder }
    }
}

impl Default for AmmoniaSanitizer {
    fn default() -> Self {
        AmmoniaSanitizer::new(ammonia::Builder::default())
    }
}

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

/// Returns HTML unchanged.
///
/// Anything passed through this reaches the output unsanitized. Use it
/// only when the host sanitizes downstream or the content is trusted.
pub struct PassthroughSanitizer;

impl Sanitizer for PassthroughSanitizer {
    fn sanitize(&self, html: &str) -> String {
        tracing::trace!(len = html.len(), "passing HTML through unsanitized");
        html.to_string()
    }
}
