// CLI binary: exiting on unrecoverable errors is fine here.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable, clippy::indexing_slicing)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use compilify::settings::{self, CompilerSettings};
use compilify::{paths, post, synth, Compilation, CompilationProvider, Post, ScriptCompiler};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "compilify-cli", about = "Compile scripts with console output redirected", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Log pipeline stages (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a post and report its diagnostics
    Compile {
        /// Post JSON file (`-` for stdin)
        #[arg(long, conflicts_with_all = ["content", "title", "classes"])]
        post: Option<PathBuf>,
        /// Script body; read from stdin when neither this nor --post is given
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// File with supporting class definitions
        #[arg(long)]
        classes: Option<PathBuf>,
        /// Also print the text of every compiled tree
        #[arg(long)]
        trees: bool,
    },
    /// Print the program synthesized around a script body
    Synthesize {
        /// Script body; read from stdin when omitted
        content: Option<String>,
    },
    /// List the modules a compilation would reference
    References,
    /// Print the JSON schema of a post
    Schema,
    /// Compiler settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings
    Show,
    /// Print the settings file location
    Path,
    /// Write the default settings file
    Reset,
}

// ── Input ────────────────────────────────────────────────────────

fn read_stdin() -> String {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .expect("failed to read stdin");
    buf
}

fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read '{}': {e}", path.display());
        process::exit(2);
    })
}

fn load_post(file: Option<&Path>, content: Option<String>, title: Option<String>, classes: Option<&Path>) -> Post {
    if let Some(file) = file {
        let text = if file.as_os_str() == "-" { read_stdin() } else { read_file(file) };
        return serde_json::from_str(&text).unwrap_or_else(|e| {
            eprintln!("Invalid post JSON: {e}");
            process::exit(2);
        });
    }
    let mut post = Post::new(content.unwrap_or_else(read_stdin));
    post.title = title;
    post.classes = classes.map(read_file);
    post
}

// ── Output formatting ────────────────────────────────────────────

fn print_value(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn compilation_json(compilation: &Compilation, with_trees: bool) -> Value {
    let diagnostics = compilation.diagnostics();
    let mut out = json!({
        "name": compilation.name(),
        "success": !diagnostics.iter().any(|d| d.is_error()),
        "diagnostics": diagnostics,
        "references": compilation.references().iter().map(|r| r.display()).collect::<Vec<_>>(),
    });
    if with_trees {
        out["trees"] = compilation
            .syntax_trees()
            .iter()
            .map(|t| json!({ "origin": t.origin(), "kind": t.kind(), "text": t.text() }))
            .collect();
    }
    out
}

fn print_compilation(compilation: &Compilation, with_trees: bool) {
    let diagnostics = compilation.diagnostics();
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    println!(
        "{}: {} tree(s), {} reference(s), {errors} error(s), {} warning(s)",
        compilation.name(),
        compilation.syntax_trees().len(),
        compilation.references().len(),
        diagnostics.len() - errors,
    );
    for diagnostic in &diagnostics {
        println!("  {diagnostic}");
    }
    if with_trees {
        for tree in compilation.syntax_trees() {
            let origin = if tree.origin().is_empty() { "<fragment>" } else { tree.origin() };
            println!("\n── {origin} ({:?}) ──\n{}", tree.kind(), tree.text());
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────

fn load_compiler_settings(config_dir: &Path) -> CompilerSettings {
    settings::load_settings(config_dir).unwrap_or_default()
}

fn run(cli: Cli) {
    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);

    match cli.command {
        Commands::Compile { post, content, title, classes, trees } => {
            let post = load_post(post.as_deref(), content, title, classes.as_deref());
            let compiler = ScriptCompiler::new().with_settings(load_compiler_settings(&config_dir));
            let compilation = compiler.compile(Some(&post)).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                process::exit(2);
            });
            if cli.json {
                print_value(&compilation_json(&compilation, trees));
            } else {
                print_compilation(&compilation, trees);
            }
            if compilation.has_errors() {
                process::exit(1);
            }
        }
        Commands::Synthesize { content } => {
            let text = synth::synthesize(&content.unwrap_or_else(read_stdin));
            if cli.json {
                print_value(&json!({ "text": text }));
            } else {
                print!("{text}");
            }
        }
        Commands::References => {
            let references = ScriptCompiler::new().references();
            if cli.json {
                let list: Vec<_> = references
                    .iter()
                    .map(|r| json!({ "module": r.module().name, "location": r.display() }))
                    .collect();
                print_value(&Value::Array(list));
            } else {
                for reference in &references {
                    println!("{reference}");
                }
            }
        }
        Commands::Schema => {
            print_value(&serde_json::to_value(post::post_schema()).unwrap_or(Value::Null));
        }
        Commands::Settings { action } => match action.unwrap_or(SettingsAction::Show) {
            SettingsAction::Show => {
                let settings = load_compiler_settings(&config_dir);
                print_value(&serde_json::to_value(&settings).unwrap_or(Value::Null));
            }
            SettingsAction::Path => {
                println!("{}", paths::settings_path(&config_dir).display());
            }
            SettingsAction::Reset => {
                if let Err(e) = settings::save_settings(&config_dir, &CompilerSettings::default()) {
                    eprintln!("Failed to save settings: {e}");
                    process::exit(2);
                }
                eprintln!("Wrote {}", paths::settings_path(&config_dir).display());
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    run(cli);
}
