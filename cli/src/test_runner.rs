use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use blockmark::diagnostic::BlockDiagnostic;
use renderer::{BlockReport, BlockState, RenderOptions, RenderedOutput, Renderer, StreamSession};

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message or its notes.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedBlock {
    pub id: String,

    /// `loading`, `ready`, `unknown`, `error`, `dropped` or `too-deep`.
    pub state: String,

    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Render options for this test; defaults when absent.
    #[serde(default)]
    pub options: Option<RenderOptions>,

    /// Feed the source one character at a time and require that no block
    /// falls back from ready. Expectations apply to the final render.
    #[serde(default)]
    pub stream: bool,

    /// Substrings the HTML must contain.
    #[serde(default)]
    pub expect_contains: Vec<String>,

    /// Substrings the HTML must not contain.
    #[serde(default)]
    pub expect_excludes: Vec<String>,

    /// Top-level block reports, in order. If present (even empty), the count is checked too.
    #[serde(default)]
    pub expect_blocks: Option<Vec<ExpectedBlock>>,

    /// Expected scanner warnings. If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

/// Parse a `.test.md` file into its TOML config and markdown source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;
    if let Some(options) = &config.options {
        options.validate().map_err(|e| e.to_string())?;
    }

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let renderer = Renderer::new(config.options.clone().unwrap_or_default());
    let output = if config.stream {
        match render_streamed(&renderer, source) {
            Ok(output) => output,
            Err(reason) => return fail(description, reason),
        }
    } else {
        renderer.render_final(source)
    };

    let reason = check_html(&output.html, &config)
        .or_else(|| {
            config
                .expect_blocks
                .as_ref()
                .and_then(|expected| check_blocks(&output.blocks, expected))
        })
        .or_else(|| {
            config
                .expect_warnings
                .as_ref()
                .and_then(|expected| check_warnings(source, &output.diagnostics, expected))
        });

    match reason {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Render every character prefix of `source`. Fails if a block that was
/// ready in one snapshot is anything else in a later one.
fn render_streamed(renderer: &Renderer, source: &str) -> Result<RenderedOutput, String> {
    let mut session = StreamSession::new(renderer);
    let mut ready: Vec<String> = Vec::new();

    for (offset, ch) in source.char_indices() {
        let mut buf = [0u8; 4];
        let output = session.push(ch.encode_utf8(&mut buf));
        for id in &ready {
            let state = output.block(id).map(|report| report.state);
            if state != Some(BlockState::Ready) {
                return Err(format!(
                    "{} regressed from ready to {} at byte {}",
                    id,
                    state.map_or("missing", |s| s.as_str()),
                    offset + ch.len_utf8()
                ));
            }
        }
        for report in &output.blocks {
            if report.state == BlockState::Ready && !ready.contains(&report.id) {
                ready.push(report.id.clone());
            }
        }
    }

    Ok(session.finish())
}

fn check_html(html: &str, config: &TestConfig) -> Option<String> {
    for needle in &config.expect_contains {
        if !html.contains(needle.as_str()) {
            return Some(format!(
                "expected output containing \"{}\"\n  actual: {}",
                needle,
                html.trim()
            ));
        }
    }
    for needle in &config.expect_excludes {
        if html.contains(needle.as_str()) {
            return Some(format!(
                "expected output without \"{}\"\n  actual: {}",
                needle,
                html.trim()
            ));
        }
    }
    None
}

fn check_blocks(actual: &[BlockReport], expected: &[ExpectedBlock]) -> Option<String> {
    let describe = |reports: &[BlockReport]| {
        reports
            .iter()
            .map(|r| format!("  - {} {} {}", r.id, r.type_name, r.state))
            .collect::<Vec<_>>()
            .join("\n")
    };

    if actual.len() != expected.len() {
        return Some(format!(
            "expected {} block(s), got {}\n  actual blocks:\n{}",
            expected.len(),
            actual.len(),
            if actual.is_empty() {
                "    (none)".to_string()
            } else {
                describe(actual)
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        if actual.id != expected.id {
            return Some(format!(
                "block[{}]: expected id {}, got {}",
                i, expected.id, actual.id
            ));
        }
        if actual.state.as_str() != expected.state {
            return Some(format!(
                "block[{}] {}: expected state {}, got {}",
                i, actual.id, expected.state, actual.state
            ));
        }
        if let Some(type_name) = &expected.type_name {
            if &actual.type_name != type_name {
                return Some(format!(
                    "block[{}] {}: expected type {}, got {}",
                    i, actual.id, type_name, actual.type_name
                ));
            }
        }
    }

    None
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(
    source: &str,
    diagnostics: &[BlockDiagnostic],
    expected: &[ExpectedWarning],
) -> Option<String> {
    let actual_warnings: Vec<&BlockDiagnostic> =
        diagnostics.iter().filter(|d| d.is_warning()).collect();
    let text = |d: &BlockDiagnostic| {
        std::iter::once(d.message.as_str())
            .chain(d.notes.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(": ")
    };

    if actual_warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = actual_warnings
            .iter()
            .map(|w| format!("  - {}", text(w)))
            .collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual_warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual_warnings.iter().zip(expected).enumerate() {
        let msg = text(actual);
        if !msg.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "warning[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// `.test.md` files under `root`, grouped by subfolder ("" for files
/// directly in `root`). Sorted by category, then by path.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_test = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".test.md"));
        if is_test {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Keep the categories matching `requested` (a category or any of its
/// subfolders). Everything when `requested` is empty.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for req in requested.iter().map(|r| r.trim_matches('/')) {
        let prefix = format!("{}/", req);
        let matches: Vec<_> = all
            .iter()
            .filter(|(category, _)| category.as_str() == req || category.starts_with(&prefix))
            .collect();
        if matches.is_empty() {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
        for (category, files) in matches {
            selected.insert(category.as_str(), files.as_slice());
        }
    }
    selected
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { no_color };

    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let selected = if path.is_file() {
        select_categories(&all, &[])
    } else {
        select_categories(&all, categories)
    };
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if selected.len() > 1 || !category.is_empty() {
            eprintln!();
            eprintln!("{}", style.bold(category_label(category)));
        }

        for file in files.iter() {
            let result = run_single_test(file);
            let label = result.description.clone().unwrap_or_else(|| {
                file.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("?")
                    .to_string()
            });
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), label);
                    failures.push(result);
                }
            }
        }
    }

    print_summary(&style, passed, &failures)
}

fn print_summary(style: &Style, passed: usize, failures: &[TestResult]) -> i32 {
    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
