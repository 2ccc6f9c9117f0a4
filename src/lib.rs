#![forbid(unsafe_code)]
//! no-verify guard (nvg) library.
//!
//! Decides whether a shell command line handed to an AI coding agent's Bash
//! tool would skip git's client-side verification hooks, i.e. whether it runs
//! `git commit` or `git push` with `--no-verify` (or `-n`).
//!
//! # Architecture
//!
//! ```text
//!   hook JSON ──► hook::HookInput ──► evaluator::InvocationRequest
//!                                              │
//!                                              ▼
//!                         ┌──────── evaluator::classify ────────┐
//!                         │  tokenize ─► matcher ─► flags       │
//!                         │  (fail-open boundary: catch_unwind) │
//!                         └─────────────────────────────────────┘
//!                                              │
//!                                              ▼
//!                               Verdict ──► exit 0 / exit 2
//! ```
//!
//! # Usage
//!
//! ```
//! use no_verify_guard::classify_command;
//!
//! assert!(classify_command("git push --no-verify").is_blocked());
//! assert!(classify_command("git commit -m 'mention --no-verify'").is_allowed());
//! assert!(classify_command("npm install --no-verify").is_allowed());
//! ```

pub mod cli;
pub mod config;
pub mod evaluator;
pub mod flags;
pub mod hook;
pub mod logging;
pub mod matcher;
pub mod tokenize;

pub use config::Config;
pub use evaluator::{
    Detection, InvocationRequest, Outcome, Verdict, classify, classify_command,
};
pub use flags::{FlagForm, find_forbidden_flag, has_forbidden_flag};
pub use matcher::{GovernedCommandMatch, GovernedVerb, find_governed_verb};
pub use tokenize::{QuoteKind, Token, tokenize};
