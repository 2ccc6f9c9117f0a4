#![forbid(unsafe_code)]
//! nvg: a Claude Code `PreToolUse` hook that blocks `git commit`/`git push`
//! invocations which skip verification hooks.
//!
//! Exit behavior in hook mode:
//!   - Exit 0, no output = allow
//!   - Exit 2, reason on stderr = block
//!
//! Every failure path (unreadable input, bad JSON, oversize input, internal
//! panic) exits 0.

use clap::Parser;
use colored::Colorize;
use no_verify_guard::cli::{self, Cli};
use no_verify_guard::config::Config;
use no_verify_guard::evaluator::classify;
use no_verify_guard::hook::{self, EXIT_ALLOW, EXIT_BLOCK, HookReadError};
use no_verify_guard::logging::{DecisionLogger, init_tracing};
use std::panic;
use std::time::Instant;
use tracing::{debug, warn};

// Build metadata from vergen (set by build.rs)
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_TIMESTAMP: Option<&str> = option_env!("VERGEN_BUILD_TIMESTAMP");
const RUSTC_SEMVER: Option<&str> = option_env!("VERGEN_RUSTC_SEMVER");
const CARGO_TARGET: Option<&str> = option_env!("VERGEN_CARGO_TARGET_TRIPLE");

const BANNER_WIDTH: usize = 41;

/// Print version information.
fn print_version() {
    let title = format!("nvg v{PKG_VERSION}");
    eprintln!();
    eprintln!("  {}", format!("╭{}╮", "─".repeat(BANNER_WIDTH)).bright_black());
    eprintln!(
        "  {}  {}{}{}",
        "│".bright_black(),
        title.cyan().bold(),
        " ".repeat(BANNER_WIDTH.saturating_sub(title.len() + 2)),
        "│".bright_black()
    );
    if let Some(ts) = BUILD_TIMESTAMP {
        banner_row("Built:", ts.split('T').next().unwrap_or(ts));
    }
    if let Some(rustc) = RUSTC_SEMVER {
        banner_row("Rustc:", rustc);
    }
    if let Some(target) = CARGO_TARGET {
        banner_row("Target:", target);
    }
    eprintln!("  {}", format!("╰{}╯", "─".repeat(BANNER_WIDTH)).bright_black());
    eprintln!();
}

fn banner_row(label: &str, value: &str) {
    let used = label.len() + value.chars().count() + 3;
    eprintln!(
        "  {}  {} {}{}{}",
        "│".bright_black(),
        label.bright_black(),
        value.white(),
        " ".repeat(BANNER_WIDTH.saturating_sub(used)),
        "│".bright_black()
    );
}

fn main() {
    // Check for --version flag (useful when run directly, not as hook)
    if std::env::args().skip(1).any(|a| a == "--version" || a == "-V") {
        print_version();
        return;
    }

    // Parse failures (unknown flags) exit here rather than falling into hook
    // mode and blocking on stdin.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    if cli.command.is_some() {
        let code = cli::run_command(cli).unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            1
        });
        std::process::exit(code);
    }

    // Panics surface through tracing only; hook mode stays quiet on allow.
    panic::set_hook(Box::new(|info| {
        warn!(%info, "internal error; allowing command");
    }));

    let code = panic::catch_unwind(run_hook).unwrap_or(EXIT_ALLOW);
    std::process::exit(code);
}

/// Hook mode: read one request from stdin and return the exit status.
fn run_hook() -> i32 {
    // Check if bypass is requested (escape hatch)
    if Config::is_bypassed() {
        return EXIT_ALLOW;
    }

    let config = Config::load();
    init_tracing(config.general.verbose);
    hook::configure_colors(config.general.color);

    let max_input_bytes = config.general.max_hook_input_bytes();
    let request = match hook::read_hook_input(max_input_bytes) {
        Ok(input) => input.into_request(),
        Err(HookReadError::InputTooLarge(len)) => {
            eprintln!(
                "[nvg] Warning: stdin input ({len} bytes) exceeds limit ({max_input_bytes} bytes); allowing command (fail-open)"
            );
            return EXIT_ALLOW;
        }
        Err(e) => {
            debug!(error = %e, "allowing unreadable hook input");
            return EXIT_ALLOW;
        }
    };

    let Some(command) = request.command.as_deref().filter(|c| !c.is_empty()) else {
        debug!(tool = %request.tool_name, "no shell command to check");
        return EXIT_ALLOW;
    };

    let max_command_bytes = config.general.max_command_bytes();
    if command.len() > max_command_bytes {
        eprintln!(
            "[nvg] Warning: command ({} bytes) exceeds limit ({max_command_bytes} bytes); allowing command (fail-open)",
            command.len()
        );
        return EXIT_ALLOW;
    }

    let started = Instant::now();
    let verdict = classify(&request);
    let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    if verdict.is_fail_open() {
        warn!(reason = verdict.reason().unwrap_or_default(), "classifier failed open");
    }

    if let Some(logger) = DecisionLogger::new(&config.logging) {
        logger.log(&verdict, command, Some(elapsed_us));
    }

    if !verdict.is_blocked() {
        return EXIT_ALLOW;
    }

    hook::output_block(command, &verdict);

    if let Some(log_file) = config.general.log_file.as_deref() {
        if let Err(e) = hook::log_blocked_command(log_file, command, &verdict) {
            debug!(error = %e, log_file, "failed to write block log");
        }
    }

    EXIT_BLOCK
}
