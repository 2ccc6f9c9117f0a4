//! Verdict builder: the single entry point that turns an invocation request
//! into an allow/block decision.
//!
//! # Pipeline
//!
//! 1. **Tool gate** - anything other than the `Bash` tool is allowed at once.
//! 2. **Quick reject** - a command with no `git` substring and no quoting or
//!    escaping characters cannot name the program, so it is allowed without
//!    tokenizing.
//! 3. **Tokenize** - see [`crate::tokenize`].
//! 4. **Governed verb** - see [`crate::matcher`]; no match means allow.
//! 5. **Flag scan** - see [`crate::flags`], from the verb onward.
//!
//! # Fail open
//!
//! [`classify`] is the boundary. It runs the pipeline under
//! [`std::panic::catch_unwind`] and converts any fault into an allow verdict
//! carrying a diagnostic reason. Code added to the pipeline inherits this
//! without further work; it must not add its own recovery.
//!
//! # Example
//!
//! ```
//! use no_verify_guard::evaluator::{classify, InvocationRequest, Outcome};
//!
//! let verdict = classify(&InvocationRequest::shell("git commit --no-verify -m 'test'"));
//! assert_eq!(verdict.outcome, Outcome::Block);
//!
//! let verdict = classify(&InvocationRequest::shell("git commit -m 'Added --no-verify to docs'"));
//! assert_eq!(verdict.outcome, Outcome::Allow);
//! ```

use std::any::Any;
use std::fmt;
use std::panic;

use memchr::{memchr3, memmem};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::flags::{FlagForm, LONG_FLAG, find_forbidden_flag};
use crate::matcher::{GovernedCommandMatch, GovernedVerb, PROGRAM_NAME, find_governed_verb};
use crate::tokenize::{Token, tokenize};

/// The host tool whose payload is a shell command line.
pub const GOVERNED_TOOL: &str = "Bash";

/// One check request from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Name of the tool about to run (e.g. `Bash`, `Write`).
    pub tool_name: String,
    /// The command line; only present for the shell-execution tool.
    pub command: Option<String>,
}

impl InvocationRequest {
    /// A `Bash` request carrying `command`.
    #[must_use]
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            tool_name: GOVERNED_TOOL.to_string(),
            command: Some(command.into()),
        }
    }

    /// A request for some other tool, with no command payload.
    #[must_use]
    pub fn tool(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            command: None,
        }
    }

    /// True when this request targets the shell-execution tool.
    #[inline]
    #[must_use]
    pub fn is_shell(&self) -> bool {
        self.tool_name == GOVERNED_TOOL
    }
}

/// Allow or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Allow,
    Block,
}

impl Outcome {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Block => "block",
        }
    }
}

/// What was found when a command is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub verb: GovernedVerb,
    pub form: FlagForm,
    /// The offending token as written (e.g. `-n`, `--no-verify=true`).
    pub flag: String,
    /// Index of the offending token in the token sequence.
    pub flag_index: usize,
}

impl Detection {
    /// Human-readable explanation naming the verb and the flag.
    #[must_use]
    pub fn reason(&self) -> String {
        if self.verb == GovernedVerb::Push && self.form == FlagForm::ShortAlias {
            return format!(
                "{PROGRAM_NAME} push {} is rejected as the short form of {LONG_FLAG}, \
                 which would skip the pre-push hook. For a dry run spell out \
                 --dry-run; otherwise run the command without it.",
                self.flag
            );
        }
        let flag = if self.flag == LONG_FLAG {
            LONG_FLAG.to_string()
        } else {
            format!("{} ({LONG_FLAG})", self.flag)
        };
        format!(
            "{PROGRAM_NAME} {} {flag} skips the {}. Run the command without it and \
             fix whatever the hooks report.",
            self.verb,
            self.verb.skipped_hooks()
        )
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PROGRAM_NAME} {} {}", self.verb, self.flag)
    }
}

/// The decision for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub outcome: Outcome,
    /// Set for blocks, and for fail-open allows as a diagnostic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Set for blocks only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<Detection>,
}

impl Verdict {
    /// A silent allow.
    #[inline]
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            outcome: Outcome::Allow,
            reason: None,
            detection: None,
        }
    }

    /// A block carrying the detection and its reason.
    #[must_use]
    pub fn block(detection: Detection) -> Self {
        Self {
            outcome: Outcome::Block,
            reason: Some(detection.reason()),
            detection: Some(detection),
        }
    }

    /// An allow produced by an internal fault.
    #[must_use]
    pub fn fail_open(diagnostic: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Allow,
            reason: Some(diagnostic.into()),
            detection: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self.outcome, Outcome::Block)
    }

    #[inline]
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self.outcome, Outcome::Allow)
    }

    /// True for an allow that came from the fail-open path.
    #[must_use]
    pub const fn is_fail_open(&self) -> bool {
        self.is_allowed() && self.reason.is_some()
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Classify a request. Never panics; internal faults become an allow.
#[instrument(level = "debug", skip(request), fields(tool = %request.tool_name))]
#[must_use]
pub fn classify(request: &InvocationRequest) -> Verdict {
    fail_open_boundary(|| evaluate_request(request))
}

/// Classify a raw command line as if it came from the shell tool.
#[must_use]
pub fn classify_command(command: &str) -> Verdict {
    classify(&InvocationRequest::shell(command))
}

/// Run `evaluate`, turning a panic into [`Verdict::fail_open`].
fn fail_open_boundary(evaluate: impl FnOnce() -> Verdict + panic::UnwindSafe) -> Verdict {
    panic::catch_unwind(evaluate).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(%message, "classifier fault; failing open");
        Verdict::fail_open(format!("internal error, allowing command: {message}"))
    })
}

fn evaluate_request(request: &InvocationRequest) -> Verdict {
    if !request.is_shell() {
        trace!("not a shell tool invocation");
        return Verdict::allow();
    }
    let Some(command) = request.command.as_deref() else {
        trace!("shell invocation without a command");
        return Verdict::allow();
    };
    evaluate_command(command)
}

fn evaluate_command(command: &str) -> Verdict {
    if quick_reject(command) {
        trace!("quick reject: program name absent");
        return Verdict::allow();
    }

    let tokens = tokenize(command);
    let Some(governed) = find_governed_verb(&tokens) else {
        debug!(tokens = tokens.len(), "no governed git verb");
        return Verdict::allow();
    };

    match find_forbidden_flag(&tokens, governed.verb_index) {
        Some(found) => {
            let owner = owning_verb(&tokens, governed, found.index);
            debug!(
                verb = %owner.verb,
                flag = %found.text,
                index = found.index,
                "forbidden flag after governed verb"
            );
            Verdict::block(Detection {
                verb: owner.verb,
                form: found.form,
                flag: found.text,
                flag_index: found.index,
            })
        }
        None => {
            debug!(verb = %governed.verb, "governed verb without forbidden flag");
            Verdict::allow()
        }
    }
}

/// The last governed verb before `flag_index`, starting from `first`.
///
/// The flag scan runs to the end of the tokens, so in a chain such as
/// `git commit -m x && git push --no-verify` the flag belongs to `push`.
fn owning_verb(
    tokens: &[Token],
    first: GovernedCommandMatch,
    flag_index: usize,
) -> GovernedCommandMatch {
    let mut owner = first;
    loop {
        let start = owner.verb_index + 1;
        let Some(next) = tokens.get(start..flag_index).and_then(find_governed_verb) else {
            return owner;
        };
        owner = GovernedCommandMatch {
            verb_index: start + next.verb_index,
            verb: next.verb,
        };
    }
}

/// True when the command cannot possibly name `git`.
///
/// Quotes and backslashes can splice the program name together
/// (`g'i't`, `g\it`), so their presence disables the shortcut.
#[inline]
fn quick_reject(command: &str) -> bool {
    let bytes = command.as_bytes();
    memmem::find(bytes, PROGRAM_NAME.as_bytes()).is_none()
        && memchr3(b'\\', b'\'', b'"', bytes).is_none()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
