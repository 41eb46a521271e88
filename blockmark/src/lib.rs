pub mod decoder;
pub mod descriptor;
pub mod diagnostic;
pub mod partial;
pub mod pending;
pub mod registry;
pub mod scanner;

use crate::diagnostic::BlockDiagnostic;
use crate::registry::BlockRegistry;

pub use descriptor::{BlockDescriptor, BlockKind};
pub use registry::PlaceholderId;
pub use scanner::Scanner;

/// Output of one scan pass over the full text buffer.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Input with each closed block replaced by its placeholder anchor.
    pub processed_text: String,
    /// One descriptor per placeholder, in source order.
    pub registry: BlockRegistry,
    /// Malformed payloads found during the pass.
    pub diagnostics: Vec<BlockDiagnostic>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

/// Scan `raw` as an anonymous source.
pub fn scan(raw: &str) -> ScanResult {
    Scanner::new(raw, 0).scan()
}
