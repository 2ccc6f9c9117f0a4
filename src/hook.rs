//! Claude Code hook protocol handling.
//!
//! The host pipes a JSON request to stdin before every tool invocation and
//! reads the verdict from the exit status:
//!
//! - exit [`EXIT_ALLOW`] (0): the tool call proceeds; nothing is printed.
//! - exit [`EXIT_BLOCK`] (2): the tool call is refused; the reason is on stderr.
//!
//! Anything that goes wrong while reading or parsing the request resolves to
//! [`EXIT_ALLOW`].

use colored::Colorize;
use serde::Deserialize;
use std::fmt;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

use crate::config::ColorMode;
use crate::evaluator::{GOVERNED_TOOL, InvocationRequest, Verdict};

/// Exit status for an allowed tool call.
pub const EXIT_ALLOW: i32 = 0;

/// Exit status for a blocked tool call.
pub const EXIT_BLOCK: i32 = 2;

/// Input structure from Claude Code's `PreToolUse` hook.
///
/// Only the fields the guard reads are declared; `session_id`,
/// `transcript_path` and friends are ignored.
#[derive(Debug, Deserialize)]
pub struct HookInput {
    /// The name of the tool being invoked (e.g., "Bash", "Read", "Write").
    pub tool_name: Option<String>,

    /// Tool-specific input parameters.
    pub tool_input: Option<ToolInput>,
}

/// Tool-specific input containing the command to execute.
#[derive(Debug, Deserialize)]
pub struct ToolInput {
    /// The command string (for Bash tools). Kept as a raw value so that a
    /// non-string command is an allow rather than a parse error.
    pub command: Option<serde_json::Value>,
}

impl HookInput {
    /// Convert into an [`InvocationRequest`].
    ///
    /// The command is only carried for the shell tool, and only when it is a
    /// JSON string.
    #[must_use]
    pub fn into_request(self) -> InvocationRequest {
        let tool_name = self.tool_name.unwrap_or_default();
        let command = if tool_name == GOVERNED_TOOL {
            self.tool_input
                .and_then(|input| input.command)
                .and_then(|value| match value {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
        } else {
            None
        };
        InvocationRequest { tool_name, command }
    }
}

/// Error type for reading and parsing hook input.
#[derive(Debug)]
pub enum HookReadError {
    /// Failed to read from stdin.
    Io(io::Error),
    /// Input exceeded the configured size limit.
    InputTooLarge(usize),
    /// Failed to parse JSON input.
    Json(serde_json::Error),
}

impl fmt::Display for HookReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read hook input: {e}"),
            Self::InputTooLarge(len) => write!(f, "hook input too large ({len} bytes)"),
            Self::Json(e) => write!(f, "hook input is not valid JSON: {e}"),
        }
    }
}

impl std::error::Error for HookReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::InputTooLarge(_) => None,
        }
    }
}

/// Read and parse hook input from stdin.
///
/// # Errors
///
/// Returns [`HookReadError::Io`] if stdin cannot be read, [`HookReadError::Json`]
/// if the input is not valid hook JSON, or [`HookReadError::InputTooLarge`] if
/// the input exceeds `max_bytes`.
pub fn read_hook_input(max_bytes: usize) -> Result<HookInput, HookReadError> {
    let stdin = io::stdin();
    let handle = stdin.lock();
    read_hook_input_from(handle, max_bytes)
}

/// Read and parse hook input from any reader (stdin in production).
///
/// # Errors
///
/// Same as [`read_hook_input`].
pub fn read_hook_input_from(reader: impl Read, max_bytes: usize) -> Result<HookInput, HookReadError> {
    let mut input = String::with_capacity(256);
    // Read up to limit + 1 to detect overflow
    reader
        .take(max_bytes as u64 + 1)
        .read_to_string(&mut input)
        .map_err(HookReadError::Io)?;

    if input.len() > max_bytes {
        return Err(HookReadError::InputTooLarge(input.len()));
    }

    parse_hook_input(&input)
}

/// Parse a hook request from a JSON string.
///
/// # Errors
///
/// Returns [`HookReadError::Json`] if `input` is not a JSON object of the
/// expected shape.
pub fn parse_hook_input(input: &str) -> Result<HookInput, HookReadError> {
    serde_json::from_str(input).map_err(HookReadError::Json)
}

/// Configure colored output from the configured mode and TTY detection.
pub fn configure_colors(mode: ColorMode) {
    match mode {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {
            if !io::stderr().is_terminal() {
                colored::control::set_override(false);
            }
        }
    }
}

/// Plain-text block message (used when stderr is not a terminal, and in logs).
#[must_use]
pub fn format_block_message(command: &str, reason: &str) -> String {
    format!(
        "BLOCKED by nvg\n\n\
         Reason: {reason}\n\n\
         Command: {command}\n\n\
         Verification hooks exist to catch problems before they land. If skipping \
         them is truly needed, ask the user to run the command manually."
    )
}

/// Report a blocked command on stderr.
///
/// Draws a boxed, colored report when stderr is a terminal and the plain
/// [`format_block_message`] text otherwise, so the host always receives a
/// readable reason.
#[cold]
#[inline(never)]
pub fn output_block(command: &str, verdict: &Verdict) {
    let reason = verdict.reason().unwrap_or("verification bypass detected");
    let stderr = io::stderr();
    let mut handle = stderr.lock();

    if io::stderr().is_terminal() {
        print_block_box(&mut handle, command, verdict, reason);
    } else {
        let _ = writeln!(handle, "{}", format_block_message(command, reason));
    }
}

// Box width (content area, excluding border characters)
const BOX_WIDTH: usize = 70;

fn print_block_box(handle: &mut dyn Write, command: &str, verdict: &Verdict, reason: &str) {
    let _ = writeln!(handle);
    box_border(handle, "╭", "╮");
    let title = "  BLOCKED  no-verify guard (nvg)";
    let _ = writeln!(
        handle,
        "{}{}{}{}",
        "│".red(),
        title.white().bold(),
        " ".repeat(BOX_WIDTH.saturating_sub(title.len())),
        "│".red()
    );
    box_border(handle, "├", "┤");

    if let Some(detection) = verdict.detection.as_ref() {
        box_row(handle, "Rule:", &detection.to_string());
    }

    let reason_width = BOX_WIDTH - "  Reason: ".len() - 1;
    for (i, line) in wrap_text(reason, reason_width).iter().enumerate() {
        let label = if i == 0 { "Reason:" } else { "       " };
        box_row(handle, label, line);
    }

    box_row(handle, "Command:", &truncate_for_display(command, 50));
    box_border(handle, "╰", "╯");
    let _ = writeln!(handle);
}

fn box_border(handle: &mut dyn Write, left: &str, right: &str) {
    let _ = writeln!(
        handle,
        "{}{}{}",
        left.red(),
        "─".repeat(BOX_WIDTH).red(),
        right.red()
    );
}

fn box_row(handle: &mut dyn Write, label: &str, text: &str) {
    let line = format!("  {label} {text}");
    let padding = BOX_WIDTH.saturating_sub(line.chars().count());
    let _ = writeln!(
        handle,
        "{}  {} {}{}{}",
        "│".red(),
        label.yellow().bold(),
        text.white(),
        " ".repeat(padding),
        "│".red()
    );
}

/// Truncate a string for display, appending "..." if truncated.
fn truncate_for_display(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Wrap text to fit within a given width.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Append a blocked command to a plain-text log file.
///
/// # Errors
///
/// Returns any I/O errors encountered while creating directories or appending
/// to the log file.
pub fn log_blocked_command(log_file: &str, command: &str, verdict: &Verdict) -> io::Result<()> {
    use std::fs::OpenOptions;
    use std::time::{SystemTime, UNIX_EPOCH};

    let path = expand_home(log_file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let rule = verdict
        .detection
        .as_ref()
        .map_or_else(|| "unknown".to_string(), ToString::to_string);
    let reason = verdict.reason().unwrap_or_default();

    writeln!(file, "[{secs}] [{rule}] {reason}")?;
    writeln!(file, "  Command: {command}")?;
    writeln!(file)?;
    Ok(())
}

/// Expand a leading `~/` against the home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map_or_else(|| PathBuf::from(path), |home| home.join(rest)),
        None => PathBuf::from(path),
    }
}
