//! CLI argument parsing and command handling.
//!
//! Running `nvg` without a subcommand is hook mode (see `main.rs`). The
//! subcommands here exist for humans: trying a command line against the
//! guard, inspecting how it tokenizes, and managing configuration.

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::config::Config;
use crate::evaluator::{Verdict, classify_command};
use crate::hook::{EXIT_ALLOW, EXIT_BLOCK};
use crate::tokenize::{QuoteKind, tokenize};

/// Claude Code hook that refuses `git commit`/`git push` with `--no-verify`.
///
/// nvg reads a `PreToolUse` request on stdin and exits 2 with a reason on
/// stderr when a Bash command would skip git's verification hooks.
#[derive(Parser, Debug)]
#[command(name = "nvg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run (omit to run in hook mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a command line and show the decision (exit 0 allow, 2 block)
    #[command(name = "test")]
    Test {
        /// The shell command to check
        command: String,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Show how a command line splits into tokens
    #[command(name = "tokens")]
    Tokens {
        /// The shell command to tokenize
        command: String,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Print a sample configuration, or write it to a file
    #[command(name = "init")]
    Init {
        /// Write to this path instead of stdout
        #[arg(long, short)]
        output: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    #[command(name = "config")]
    ShowConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Run a subcommand and return the process exit status.
///
/// # Errors
///
/// Returns an error for I/O failures, for refusing to overwrite a file in
/// `init`, and for serialization failures.
pub fn run_command(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    match cli.command {
        Some(Command::Test { command, format }) => test_command(&command, format),
        Some(Command::Tokens { command, format }) => {
            print!("{}", render_tokens(&command, format)?);
            Ok(EXIT_ALLOW)
        }
        Some(Command::Init { output, force }) => {
            init_config(output.as_deref(), force)?;
            Ok(EXIT_ALLOW)
        }
        Some(Command::ShowConfig) => {
            show_config(&Config::load())?;
            Ok(EXIT_ALLOW)
        }
        None => Ok(EXIT_ALLOW),
    }
}

#[derive(Serialize)]
struct TestReport<'a> {
    command: &'a str,
    #[serde(flatten)]
    verdict: &'a Verdict,
}

fn test_command(command: &str, format: OutputFormat) -> Result<i32, Box<dyn std::error::Error>> {
    let verdict = classify_command(command);
    match format {
        OutputFormat::Pretty => print!("{}", render_verdict(command, &verdict)),
        OutputFormat::Json => {
            let report = TestReport {
                command,
                verdict: &verdict,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(if verdict.is_blocked() {
        EXIT_BLOCK
    } else {
        EXIT_ALLOW
    })
}

fn render_verdict(command: &str, verdict: &Verdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Command: {command}");
    if verdict.is_blocked() {
        let _ = writeln!(out, "Result:  {}", "BLOCKED".red().bold());
    } else {
        let _ = writeln!(out, "Result:  {}", "ALLOWED".green().bold());
    }
    if let Some(detection) = verdict.detection.as_ref() {
        let _ = writeln!(out, "Verb:    {}", detection.verb);
        let _ = writeln!(
            out,
            "Flag:    {} ({}, token {})",
            detection.flag, detection.form, detection.flag_index
        );
    }
    if let Some(reason) = verdict.reason() {
        let _ = writeln!(out, "Reason:  {reason}");
    }
    out
}

#[derive(Serialize)]
struct TokenView<'a> {
    index: usize,
    text: &'a str,
    quote: &'static str,
}

fn render_tokens(command: &str, format: OutputFormat) -> Result<String, serde_json::Error> {
    let tokens = tokenize(command);
    match format {
        OutputFormat::Json => {
            let views: Vec<TokenView<'_>> = tokens
                .iter()
                .enumerate()
                .map(|(index, t)| TokenView {
                    index,
                    text: &t.text,
                    quote: t.quote.label(),
                })
                .collect();
            let mut json = serde_json::to_string_pretty(&views)?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Pretty => {
            let mut out = String::new();
            if tokens.is_empty() {
                out.push_str("(no tokens)\n");
            }
            for (i, token) in tokens.iter().enumerate() {
                let kind = match token.quote {
                    QuoteKind::None => token.quote.label().normal(),
                    QuoteKind::Single | QuoteKind::Double => token.quote.label().yellow(),
                };
                let _ = writeln!(out, "{i:>3}  {kind:<6}  {:?}", token.text);
            }
            Ok(out)
        }
    }
}

fn init_config(output: Option<&str>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let sample = Config::generate_sample_config();

    match output {
        Some(path) => {
            let path = Path::new(path);
            if path.exists() && !force {
                return Err(
                    format!("File exists: {}. Use --force to overwrite.", path.display()).into(),
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            std::fs::write(path, sample)?;
            println!("Configuration written to: {}", path.display());
        }
        None => {
            print!("{sample}");
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("# Config sources (lowest → highest priority):");
    let system_cfg = Path::new("/etc/nvg/config.toml");
    if system_cfg.exists() {
        println!("#   system: {}", system_cfg.display());
    }
    if let Some(user_cfg) = Config::user_config_path().filter(|p| p.exists()) {
        println!("#   user: {}", user_cfg.display());
    }
    if let Some(project_cfg) = std::env::current_dir()
        .ok()
        .and_then(|cwd| Config::find_project_config(&cwd))
    {
        println!("#   project: {}", project_cfg.display());
    }
    if let Some(explicit) = std::env::var_os("NVG_CONFIG") {
        println!("#   NVG_CONFIG: {}", Path::new(&explicit).display());
    }
    if Config::is_bypassed() {
        println!("# NVG_BYPASS is set: hook mode allows everything");
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
