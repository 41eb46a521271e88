mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use blockmark::diagnostic::BlockDiagnostic;
use blockmark::pending::detect_pending;
use renderer::{BlockReport, BlockState, RenderOptions, Renderer, StreamSession};

const SUBCOMMANDS: &[&str] = &["render", "scan", "stream", "test", "help"];

#[derive(Parser)]
#[command(name = "blockmark", version, about = "Markdown renderer with streaming custom blocks")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a markdown file to HTML
    Render(RenderArgs),

    /// Show the processed text and block registry of a file
    Scan(ScanArgs),

    /// Replay a file chunk by chunk, as a stream would deliver it
    Stream(StreamArgs),

    /// Run .test.md conformance files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Markdown source file
    file: String,

    /// TOML file with render options
    #[arg(short, long)]
    config: Option<String>,

    /// Print one line per rendered block instead of the HTML
    #[arg(long)]
    blocks: bool,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Markdown source file
    file: String,

    /// Print the registry as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct StreamArgs {
    /// Markdown source file
    file: String,

    /// Characters delivered per chunk
    #[arg(long, default_value_t = 16)]
    chunk_size: usize,

    /// TOML file with render options
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    init_logging();

    // `blockmark file.md` works like `blockmark render file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|i| i + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Render(render_args) => do_render(render_args, color_choice),
        Command::Scan(scan_args) => do_scan(scan_args, color_choice),
        Command::Stream(stream_args) => do_stream(stream_args),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("BLOCKMARK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn read_source(file: &str) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    }
}

fn load_options(config: Option<&str>) -> RenderOptions {
    let Some(path) = config else {
        return RenderOptions::default();
    };
    match RenderOptions::from_path(path) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn do_render(args: RenderArgs, color_choice: ColorChoice) {
    let source = read_source(&args.file);
    let renderer = Renderer::new(load_options(args.config.as_deref()));

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let output = renderer.render_source(&source, file_id);

    let mut diagnostics = output.diagnostics.clone();
    // A finished document should not end inside a block.
    if let Some(pending) = detect_pending(&source, 0) {
        diagnostics.push(BlockDiagnostic::warning(
            "unterminated block",
            pending.offset..source.len(),
            file_id,
        ));
    }
    emit_diagnostics(color_choice, &files, &diagnostics);

    if args.blocks {
        print_reports(&output.blocks, 0);
    } else {
        print!("{}", output.html);
    }
}

fn print_reports(reports: &[BlockReport], indent: usize) {
    for report in reports {
        let type_name = if report.type_name.is_empty() {
            "(untyped)"
        } else {
            report.type_name.as_str()
        };
        println!(
            "{}{} {} {}",
            "  ".repeat(indent),
            report.id,
            type_name,
            report.state
        );
        print_reports(&report.children, indent + 1);
    }
}

fn do_scan(args: ScanArgs, color_choice: ColorChoice) {
    let source = read_source(&args.file);

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let result = blockmark::Scanner::new(&source, file_id).scan();
    emit_diagnostics(color_choice, &files, &result.diagnostics);

    if args.json {
        match serde_json::to_string_pretty(&result.registry) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: cannot serialize registry: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!("{}", result.processed_text);
    println!();
    for (id, descriptor) in result.registry.iter() {
        let status = match &descriptor.parse_error {
            Some(message) => format!("malformed: {}", message),
            None => "ok".to_string(),
        };
        println!("{} {} {}", id, descriptor.type_name(), status);
    }
}

fn do_stream(args: StreamArgs) {
    if args.chunk_size == 0 {
        eprintln!("error: --chunk-size must be at least 1");
        process::exit(1);
    }
    let source = read_source(&args.file);
    let renderer = Renderer::new(load_options(args.config.as_deref()));
    let mut session = StreamSession::new(&renderer);

    let chars: Vec<char> = source.chars().collect();
    let mut ready: Vec<String> = Vec::new();
    let mut regressions = 0usize;

    for (step, chunk) in chars.chunks(args.chunk_size).enumerate() {
        let chunk: String = chunk.iter().collect();
        let output = session.push(&chunk);

        for id in &ready {
            let state = output.block(id).map(|report| report.state);
            if state != Some(BlockState::Ready) {
                regressions += 1;
                eprintln!(
                    "error: step {}: {} regressed from ready to {}",
                    step,
                    id,
                    state.map_or("missing", |s| s.as_str())
                );
            }
        }

        let states: Vec<String> = output
            .blocks
            .iter()
            .map(|report| format!("{}={}", report.id, report.state))
            .collect();
        println!("step {:>4}: {}", step, states.join(" "));

        for report in &output.blocks {
            if report.state == BlockState::Ready && !ready.contains(&report.id) {
                ready.push(report.id.clone());
            }
        }
    }

    if regressions > 0 {
        process::exit(1);
    }
}

fn emit_diagnostics(
    color_choice: ColorChoice,
    files: &SimpleFiles<String, String>,
    diagnostics: &[BlockDiagnostic],
) {
    if diagnostics.is_empty() {
        return;
    }
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for diagnostic in diagnostics {
        let _ = term::emit_to_write_style(
            &mut writer.lock(),
            &config,
            files,
            &diagnostic.to_diagnostic(),
        );
    }
}
