//! Forbidden-flag detection.
//!
//! A token is the forbidden flag only when it is bare (never quoted) and its
//! whole text is one of:
//!
//! - `--no-verify`
//! - `--no-verify=<anything>`
//! - `-n`
//!
//! Substring hits such as `--no-verify-signatures` or a commit message that
//! mentions the flag do not count.

use std::fmt;

use serde::Serialize;

use crate::tokenize::Token;

/// Long form of the verification-bypass flag.
pub const LONG_FLAG: &str = "--no-verify";

/// Short alias of [`LONG_FLAG`].
pub const SHORT_ALIAS: &str = "-n";

/// Which surface form of the flag matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagForm {
    /// `--no-verify`
    Long,
    /// `--no-verify=<value>`
    LongWithValue,
    /// `-n`
    ShortAlias,
}

impl FlagForm {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::LongWithValue => "long-with-value",
            Self::ShortAlias => "short-alias",
        }
    }
}

impl fmt::Display for FlagForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A forbidden flag found in a token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenFlag {
    /// Index of the offending token.
    pub index: usize,
    pub form: FlagForm,
    /// The token text exactly as it will reach `git`.
    pub text: String,
}

/// Classify a single token against the accepted flag forms.
#[inline]
#[must_use]
pub fn match_flag_token(token: &Token) -> Option<FlagForm> {
    if token.was_quoted() {
        return None;
    }

    let text = token.as_str();
    if text == LONG_FLAG {
        return Some(FlagForm::Long);
    }
    if text == SHORT_ALIAS {
        return Some(FlagForm::ShortAlias);
    }
    match text.split_once('=') {
        Some((name, _)) if name == LONG_FLAG => Some(FlagForm::LongWithValue),
        _ => None,
    }
}

/// Find the first forbidden flag at or after `from_index`.
///
/// Scans to the end of the sequence. An out-of-range `from_index` finds
/// nothing.
#[must_use]
pub fn find_forbidden_flag(tokens: &[Token], from_index: usize) -> Option<ForbiddenFlag> {
    tokens
        .get(from_index..)?
        .iter()
        .enumerate()
        .find_map(|(offset, token)| {
            match_flag_token(token).map(|form| ForbiddenFlag {
                index: from_index + offset,
                form,
                text: token.text.clone(),
            })
        })
}

/// True when a forbidden flag appears at or after `from_index`.
#[must_use]
pub fn has_forbidden_flag(tokens: &[Token], from_index: usize) -> bool {
    tokens
        .get(from_index..)
        .is_some_and(|window| window.iter().any(|t| match_flag_token(t).is_some()))
}
