//! CLI tool to decode, check and reformat fixed-width record files.
//!
//! Usage:
//!   flatrec decode --layout "name:12;age:Integer(3)" people.dat
//!   flatrec check --layout-file people.layout people.dat
//!   flatrec reformat --layout-file people.layout people.dat -o clean.dat
//!
//! Input defaults to stdin. Blank lines are skipped.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use clap::{Args, Parser, Subcommand};
use flatrec::{FieldSpec, RecordSpec, decode, encode};
use tracing::info;

/// Decode fixed-width text records against a layout.
#[derive(Parser)]
#[command(name = "flatrec", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print each decoded record
    Decode(Options),
    /// Report fields that failed to convert; exit status 2 if any did
    Check(Options),
    /// Decode then re-encode each record in canonical form
    Reformat(Options),
}

#[derive(Args)]
struct Options {
    /// Layout in compact form, e.g. "name:12;age:Integer(3);scores[4]:2"
    #[arg(long, required_unless_present = "layout_file", conflicts_with = "layout_file")]
    layout: Option<String>,

    /// File holding the layout, one field per line or separated by ';'
    #[arg(long)]
    layout_file: Option<String>,

    /// Input data file (default: stdin)
    input: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Log layout compilation and per-field failures on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let (mode, opts) = match cli.command {
        Command::Decode(opts) => (Mode::Decode, opts),
        Command::Check(opts) => (Mode::Check, opts),
        Command::Reformat(opts) => (Mode::Reformat, opts),
    };

    let filter = if opts.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let layout_text = match (&opts.layout, &opts.layout_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => match fs::read_to_string(path) {
            Ok(content) => layout_from_file(&content),
            Err(e) => {
                eprintln!("Error reading layout file '{path}': {e}");
                process::exit(1);
            }
        },
        (None, None) => {
            eprintln!("Error: one of --layout or --layout-file is required");
            process::exit(1);
        }
    };

    let spec: FieldSpec = match layout_text.parse::<RecordSpec>() {
        Ok(spec) => spec.into(),
        Err(e) => {
            eprintln!("Layout error: {e}");
            process::exit(1);
        }
    };

    let input_text = match &opts.input {
        Some(path) if path != "-" => fs::read_to_string(path),
        _ => io::read_to_string(io::stdin()),
    };
    let input_text = match input_text {
        Ok(content) => content,
        Err(e) => {
            eprintln!(
                "Error reading input '{}': {e}",
                opts.input.as_deref().unwrap_or("(stdin)")
            );
            process::exit(1);
        }
    };

    let outcome = match run(mode, &spec, &input_text) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Encode error: {e}");
            process::exit(1);
        }
    };

    if let Some(out_path) = &opts.output {
        if let Some(parent) = Path::new(out_path.as_str()).parent()
            && !parent.as_os_str().is_empty()
            && fs::create_dir_all(parent).is_err()
        {
            eprintln!("Error creating output directory for '{out_path}'");
            process::exit(1);
        }
        if let Err(e) = fs::write(out_path, &outcome.output) {
            eprintln!("Error writing output file '{out_path}': {e}");
            process::exit(1);
        }
    } else if let Err(e) = io::stdout().write_all(outcome.output.as_bytes()) {
        eprintln!("Error writing output: {e}");
        process::exit(1);
    }

    info!(
        records = outcome.records,
        failed = outcome.failed,
        "processed input"
    );
    if mode == Mode::Check && outcome.failed > 0 {
        process::exit(2);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Decode,
    Check,
    Reformat,
}

struct Outcome {
    output: String,
    records: usize,
    failed: usize,
}

/// Process every non-blank line. Fails only when a record cannot be
/// re-encoded.
fn run(mode: Mode, spec: &FieldSpec, input: &str) -> Result<Outcome, String> {
    let mut outcome = Outcome {
        output: String::new(),
        records: 0,
        failed: 0,
    };
    for (line_num, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        outcome.records += 1;
        let value = decode(line, spec);
        if value.has_unconverted() {
            outcome.failed += 1;
        }
        match mode {
            Mode::Decode => {
                outcome.output.push_str(&value.to_string());
                outcome.output.push('\n');
            }
            Mode::Check => {
                for report in value.unconverted_report().lines() {
                    outcome
                        .output
                        .push_str(&format!("Line {}: {report}\n", line_num + 1));
                }
            }
            Mode::Reformat => {
                let text = encode(&value, spec).map_err(|e| format!("Line {}: {e}", line_num + 1))?;
                outcome.output.push_str(&text);
                outcome.output.push('\n');
            }
        }
    }
    Ok(outcome)
}

/// Join a layout file into one declaration. Lines starting with `#` are
/// comments.
fn layout_from_file(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join(";")
}
