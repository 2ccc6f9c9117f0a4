//! Decision logging and diagnostic tracing.
//!
//! Two independent outputs:
//!
//! - [`DecisionLogger`]: an append-only file with one line per decision, in
//!   text or JSON, with optional redaction of the command.
//! - [`init_tracing`]: a stderr `tracing` subscriber for diagnostics, only
//!   installed when asked for.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

use tracing_subscriber::Layer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::evaluator::Verdict;
use crate::hook::expand_home;

/// Environment variable holding a tracing filter directive (e.g. `debug`).
pub const LOG_ENV: &str = "NVG_LOG";

// ============================================================================
// Configuration Types
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether structured logging is enabled.
    pub enabled: bool,
    /// Path to log file. Supports ~ expansion.
    pub file: Option<String>,
    /// Output format: "text" or "json".
    pub format: LogFormat,
    /// Redaction settings.
    pub redaction: RedactionConfig,
    /// Events to log.
    pub events: LogEventFilter,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Redaction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub mode: RedactionMode,
    /// Quoted arguments longer than this are cut in `arguments` mode.
    pub max_argument_len: usize,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: RedactionMode::Arguments,
            max_argument_len: 50,
        }
    }
}

/// Redaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedactionMode {
    None,
    #[default]
    Arguments,
    Full,
}

/// Filter for which events to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEventFilter {
    pub block: bool,
    pub allow: bool,
}

impl Default for LogEventFilter {
    fn default() -> Self {
        Self {
            block: true,
            allow: false,
        }
    }
}

// ============================================================================
// Log Entry
// ============================================================================

/// One logged decision.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub decision: &'static str,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_us: Option<u64>,
}

impl LogEntry {
    #[must_use]
    pub fn from_verdict(
        verdict: &Verdict,
        command: &str,
        redaction: &RedactionConfig,
        elapsed_us: Option<u64>,
    ) -> Self {
        Self {
            timestamp: current_iso8601(),
            decision: verdict.outcome.label(),
            command: redact_command(command, redaction),
            rule: verdict.detection.as_ref().map(ToString::to_string),
            reason: verdict.reason.clone(),
            elapsed_us,
        }
    }

    /// Format as text log line.
    #[must_use]
    pub fn format_text(&self) -> String {
        let mut parts = Vec::with_capacity(5);
        parts.push(format!("[{}]", self.timestamp));
        parts.push(self.decision.to_uppercase());
        if let Some(ref rule) = self.rule {
            parts.push(format!("[{rule}]"));
        }
        parts.push(format!("\"{}\"", self.command));
        if let Some(ref reason) = self.reason {
            parts.push(format!("-- {reason}"));
        }
        if let Some(us) = self.elapsed_us {
            parts.push(format!("({us}us)"));
        }
        parts.join(" ")
    }

    /// Format as JSON line.
    #[must_use]
    pub fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Appends decisions to the configured log file.
pub struct DecisionLogger {
    config: LoggingConfig,
    writer: Mutex<BufWriter<File>>,
}

impl DecisionLogger {
    /// Create a logger, or `None` when logging is disabled, no file is
    /// configured, or the file cannot be opened.
    #[must_use]
    pub fn new(config: &LoggingConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let path = expand_home(config.file.as_deref()?);
        let file = open_log_file(&path)
            .map_err(|e| {
                tracing::debug!(error = %e, path = %path.display(), "decision log unavailable");
            })
            .ok()?;
        Some(Self {
            config: config.clone(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Log a decision if the event filter admits it. I/O errors are ignored.
    pub fn log(&self, verdict: &Verdict, command: &str, elapsed_us: Option<u64>) {
        if !self.should_log(verdict) {
            return;
        }
        let entry = LogEntry::from_verdict(verdict, command, &self.config.redaction, elapsed_us);
        let line = match self.config.format {
            LogFormat::Text => entry.format_text(),
            LogFormat::Json => entry.format_json(),
        };
        if let Ok(mut w) = self.writer.lock() {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    const fn should_log(&self, verdict: &Verdict) -> bool {
        if verdict.is_blocked() {
            self.config.events.block
        } else {
            self.config.events.allow
        }
    }
}

// ============================================================================
// Tracing
// ============================================================================

/// Install a stderr tracing subscriber.
///
/// The filter comes from [`LOG_ENV`] when set; otherwise `verbose` selects
/// debug output for this crate. With neither, nothing is installed and
/// `false` is returned.
pub fn init_tracing(verbose: bool) -> bool {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
        _ if verbose => EnvFilter::new("no_verify_guard=debug,nvg=debug"),
        _ => return false,
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry().with(layer).try_init().is_ok()
}

// ============================================================================
// Helpers
// ============================================================================

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn redact_command(command: &str, config: &RedactionConfig) -> String {
    if !config.enabled {
        return command.to_string();
    }
    match config.mode {
        RedactionMode::None => command.to_string(),
        RedactionMode::Full => "[REDACTED]".to_string(),
        RedactionMode::Arguments => redact_quoted_arguments(command, config.max_argument_len),
    }
}

/// Cut every quoted segment longer than `max_len` characters, keeping the
/// quotes and everything outside them. Quote boundaries follow the tokenizer:
/// single quotes are literal, `\"` does not close a double-quoted segment, and
/// a backslash outside quotes escapes the next character.
fn redact_quoted_arguments(command: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(command.len());
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '\'' | '"' => {
                out.push(c);
                let mut segment = String::new();
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == c {
                        closed = true;
                        break;
                    }
                    segment.push(inner);
                    if c == '"' && inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            segment.push(escaped);
                        }
                    }
                }
                if segment.chars().count() > max_len {
                    out.extend(segment.chars().take(max_len));
                    out.push_str("...");
                } else {
                    out.push_str(&segment);
                }
                if closed {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn current_iso8601() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    time_to_iso8601(secs)
}

/// Civil-from-days conversion of a Unix timestamp to `YYYY-MM-DDTHH:MM:SSZ`.
fn time_to_iso8601(secs: u64) -> String {
    const SECS_PER_DAY: u64 = 86_400;
    const DAYS_PER_ERA: u64 = 146_097;

    let days = secs / SECS_PER_DAY + 719_468;
    let rem = secs % SECS_PER_DAY;
    let (hh, mm, ss) = (rem / 3600, rem % 3600 / 60, rem % 60);

    let era = days / DAYS_PER_ERA;
    let doe = days % DAYS_PER_ERA;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / (DAYS_PER_ERA - 1)) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);

    format!("{year:04}-{month:02}-{day:02}T{hh:02}:{mm:02}:{ss:02}Z")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::classify_command;

    fn redaction(mode: RedactionMode, max_argument_len: usize) -> RedactionConfig {
        RedactionConfig {
            enabled: true,
            mode,
            max_argument_len,
        }
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert!(!config.enabled);
        assert!(config.file.is_none());
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.events.block);
        assert!(!config.events.allow);
    }

    #[test]
    fn redaction_disabled_keeps_command() {
        let config = RedactionConfig {
            enabled: false,
            ..redaction(RedactionMode::Full, 50)
        };
        assert_eq!(redact_command("git push -n", &config), "git push -n");
    }

    #[test]
    fn redact_full_and_none_modes() {
        assert_eq!(
            redact_command("git push -n", &redaction(RedactionMode::Full, 50)),
            "[REDACTED]"
        );
        assert_eq!(
            redact_command("git push -n", &redaction(RedactionMode::None, 50)),
            "git push -n"
        );
    }

    #[test]
    fn redact_arguments_truncates_long_quoted_segments() {
        let result = redact_command(
            r#"git commit -m "this message is far too long to keep" --no-verify"#,
            &redaction(RedactionMode::Arguments, 10),
        );
        assert_eq!(result, r#"git commit -m "this messa..." --no-verify"#);
    }

    #[test]
    fn redact_arguments_keeps_short_segments_and_bare_words() {
        let command = "git commit -m 'short' --no-verify && echo done";
        assert_eq!(
            redact_command(command, &redaction(RedactionMode::Arguments, 50)),
            command
        );
    }

    #[test]
    fn redact_arguments_respects_escaped_double_quote() {
        let result = redact_quoted_arguments(r#"echo "ab\"cdefgh" x"#, 4);
        assert_eq!(result, r#"echo "ab\"..." x"#);
    }

    #[test]
    fn redact_arguments_handles_unterminated_quote() {
        assert_eq!(redact_quoted_arguments("echo 'abcdef", 3), "echo 'abc...");
    }

    #[test]
    fn time_to_iso8601_epoch() {
        assert_eq!(time_to_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn time_to_iso8601_known_dates() {
        assert_eq!(time_to_iso8601(1_705_321_845), "2024-01-15T12:30:45Z");
        // Leap day
        assert_eq!(time_to_iso8601(951_782_400), "2000-02-29T00:00:00Z");
        assert_eq!(time_to_iso8601(1_735_689_599), "2024-12-31T23:59:59Z");
    }

    #[test]
    fn entry_text_for_block() {
        let verdict = classify_command("git commit -n -m x");
        let entry = LogEntry::from_verdict(&verdict, "git commit -n -m x", &RedactionConfig::default(), Some(12));
        let line = entry.format_text();
        assert!(line.contains("BLOCK [git commit -n]"));
        assert!(line.contains("\"git commit -n -m x\""));
        assert!(line.ends_with("(12us)"));
    }

    #[test]
    fn entry_json_for_allow_omits_empty_fields() {
        let verdict = classify_command("git status");
        let entry = LogEntry::from_verdict(&verdict, "git status", &RedactionConfig::default(), None);
        let value: serde_json::Value = serde_json::from_str(&entry.format_json()).unwrap();
        assert_eq!(value["decision"], "allow");
        assert_eq!(value["command"], "git status");
        assert!(value.get("rule").is_none());
        assert!(value.get("reason").is_none());
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn logger_requires_enabled_and_file() {
        assert!(DecisionLogger::new(&LoggingConfig::default()).is_none());
        let config = LoggingConfig {
            enabled: true,
            ..LoggingConfig::default()
        };
        assert!(DecisionLogger::new(&config).is_none());
    }

    #[test]
    fn logger_applies_event_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("decisions.jsonl");
        let config = LoggingConfig {
            enabled: true,
            file: Some(path.to_string_lossy().into_owned()),
            format: LogFormat::Json,
            ..LoggingConfig::default()
        };
        let logger = DecisionLogger::new(&config).unwrap();

        logger.log(&classify_command("git status"), "git status", None);
        logger.log(&classify_command("git push --no-verify"), "git push --no-verify", None);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["decision"], "block");
        assert_eq!(value["rule"], "git push --no-verify");
    }
}
