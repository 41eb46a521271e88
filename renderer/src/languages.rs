use std::collections::HashMap;

/// Languages known to the code block highlighter, with their aliases.
///
/// Built explicitly by the host and handed to the [`Renderer`](crate::Renderer);
/// there is no global registration.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    aliases: HashMap<String, String>,
}

const DEFAULT_LANGUAGES: &[(&str, &[&str])] = &[
    ("bash", &["sh", "shell", "zsh"]),
    ("c", &["h"]),
    ("cpp", &["c++", "cc", "hpp"]),
    ("css", &[]),
    ("go", &["golang"]),
    ("html", &["xml", "svg"]),
    ("java", &[]),
    ("javascript", &["js", "jsx", "mjs"]),
    ("json", &["jsonc"]),
    ("markdown", &["md"]),
    ("python", &["py"]),
    ("rust", &["rs"]),
    ("sql", &[]),
    ("typescript", &["ts", "tsx"]),
    ("yaml", &["yml"]),
];

impl LanguageRegistry {
    /// An empty registry: every fenced block renders as plain code.
    pub fn new() -> Self {
        LanguageRegistry::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = LanguageRegistry::new();
        for (name, aliases) in DEFAULT_LANGUAGES {
            registry.register(name, aliases);
        }
        registry
    }

    pub fn register(&mut self, name: &str, aliases: &[&str]) {
        let canonical = name.to_ascii_lowercase();
        for alias in aliases {
            self.aliases
                .insert(alias.to_ascii_lowercase(), canonical.clone());
        }
        self.aliases.insert(canonical.clone(), canonical);
    }

    /// Canonical language for a fence info string (`"ts title=x"` -> `"typescript"`).
    pub fn resolve(&self, info: &str) -> Option<&str> {
        let tag = info.split_whitespace().next()?;
        let tag = tag.split(',').next().unwrap_or(tag);
        self.aliases
            .get(&tag.to_ascii_lowercase())
            .map(String::as_str)
    }
}
