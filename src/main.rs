//! lexforge CLI — reads a `.l` source file and writes a self-contained Rust
//! scanner.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lexforge::error::{LexForgeError, Result};
use lexforge::{emit, parser};

/// lexforge - a lex-compatible scanner generator targeting Rust.
#[derive(Parser, Debug)]
#[command(name = "lexforge")]
#[command(author = "Fax Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translate a .l lex source file into a Rust scanner", long_about = None)]
struct Cli {
    /// Path to the .l source file.
    input: PathBuf,

    /// Output path (default: the input path with `.rs` appended).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true, env = "LEXFORGE_VERBOSE")]
    verbose: bool,

    /// Disable colored diagnostics.
    #[arg(long, global = true, env = "LEXFORGE_NO_COLOR")]
    no_color: bool,

    /// Parse and translate but do not write output.
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.no_color) {
        eprintln!("lexforge: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lexforge: {e}");
            if let Some(line) = e.line() {
                eprintln!("  (at {}:{line})", cli.input.display());
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = fmt::layer()
        .with_ansi(!no_color)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| LexForgeError::Logging(e.to_string()))?;

    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let start = std::time::Instant::now();
    let file_name = cli.input.to_string_lossy().into_owned();

    debug!(file = %file_name, "reading lex source");
    let source = fs::read_to_string(&cli.input)?;

    let lex_file = parser::parse_source(&file_name, &source)?;
    debug!(
        rules = lex_file.rules.len(),
        start_conditions = lex_file.start_conditions.len(),
        "parsed lex source"
    );

    let generated = emit::emit(&file_name, &lex_file)?;

    if cli.check {
        info!(
            rules = lex_file.rules.len(),
            start_conditions = lex_file.start_conditions.len(),
            elapsed = ?start.elapsed(),
            "check passed, no output written"
        );
        return Ok(());
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    fs::write(&output_path, generated)?;

    info!(
        rules = lex_file.rules.len(),
        start_conditions = lex_file.start_conditions.len(),
        elapsed = ?start.elapsed(),
        output = %output_path.display(),
        "translated lex source"
    );

    Ok(())
}

fn default_output_path(input: &std::path::Path) -> PathBuf {
    let mut s = input.as_os_str().to_os_string();
    s.push(".rs");
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_positional_input() {
        let cli = Cli::parse_from(["lexforge", "scanner.l"]);
        assert_eq!(cli.input, PathBuf::from("scanner.l"));
        assert!(!cli.check);
    }

    #[test]
    fn cli_parses_output_flag() {
        let cli = Cli::parse_from(["lexforge", "scanner.l", "-o", "out.rs"]);
        assert_eq!(cli.output, Some(PathBuf::from("out.rs")));
    }

    #[test]
    fn cli_parses_check_flag() {
        let cli = Cli::parse_from(["lexforge", "scanner.l", "--check"]);
        assert!(cli.check);
    }

    #[test]
    fn default_output_path_appends_rs() {
        let out = default_output_path(std::path::Path::new("foo.l"));
        assert_eq!(out, PathBuf::from("foo.l.rs"));
    }
}
