//! Quote-aware tokenization of raw command lines.
//!
//! This is deliberately not a shell parser. Nothing is expanded: variables,
//! globs, and command substitutions stay literal. The only question the
//! tokenizer answers is which words were bare and which were quoted, because a
//! quoted `--no-verify` is message text while a bare one is a flag.
//!
//! # Rules
//!
//! - ASCII whitespace outside quotes separates tokens.
//! - `'...'` is literal; the quotes are stripped and the token is marked
//!   [`QuoteKind::Single`].
//! - `"..."` is literal for splitting purposes; the quotes are stripped and the
//!   token is marked [`QuoteKind::Double`]. Only `\"` and `\\` are unescaped.
//! - Outside quotes a backslash escapes the next character and is removed.
//! - Outside quotes the operator characters `;`, `&`, `|`, `(`, `)`, `<`, `>`,
//!   the backtick, and `$(` end the current token and are dropped. A command
//!   hidden inside a substitution therefore still yields bare flag tokens.
//! - Unterminated quotes run to the end of input. Tokenization never fails.
//!
//! # Examples
//!
//! ```
//! use no_verify_guard::tokenize::{tokenize, QuoteKind};
//!
//! let tokens = tokenize("git commit -m 'Added --no-verify to docs'");
//! assert_eq!(tokens.len(), 4);
//! assert_eq!(tokens[3].text, "Added --no-verify to docs");
//! assert_eq!(tokens[3].quote, QuoteKind::Single);
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// How a token's text was quoted in the original command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuoteKind {
    /// No quoted segment at all.
    #[default]
    None,
    /// At least one `'...'` segment (the first quoted segment was single).
    Single,
    /// At least one `"..."` segment (the first quoted segment was double).
    Double,
}

impl QuoteKind {
    /// Short label used by the `tokens` subcommand and trace output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "bare",
            Self::Single => "single",
            Self::Double => "double",
        }
    }
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single shell-like word with quotes and escapes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text after quote stripping and escape removal.
    pub text: String,
    /// Whether (and how) any part of the token was quoted.
    pub quote: QuoteKind,
}

impl Token {
    /// A token with no quoted segment.
    #[must_use]
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quote: QuoteKind::None,
        }
    }

    #[must_use]
    pub fn quoted(text: impl Into<String>, quote: QuoteKind) -> Self {
        Self {
            text: text.into(),
            quote,
        }
    }

    /// True when any segment of the token was inside quotes.
    #[inline]
    #[must_use]
    pub const fn was_quoted(&self) -> bool {
        !matches!(self.quote, QuoteKind::None)
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Split a command line into tokens.
///
/// Total over all inputs: an empty or whitespace-only command yields an empty
/// vector, and malformed quoting degrades to best-effort splitting.
#[must_use]
pub fn tokenize(command: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = WordBuilder::default();
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                word.mark_quoted(QuoteKind::Single);
                consume_single_quoted(&mut chars, &mut word);
            }
            '"' => {
                word.mark_quoted(QuoteKind::Double);
                consume_double_quoted(&mut chars, &mut word);
            }
            '\\' => match chars.next() {
                // Line continuation joins the two physical lines.
                Some('\n') => {}
                Some(escaped) => word.push(escaped),
                None => word.push('\\'),
            },
            '$' if chars.peek() == Some(&'(') => {
                chars.next();
                word.finish_into(&mut tokens);
            }
            c if is_word_boundary(c) => word.finish_into(&mut tokens),
            _ => word.push(c),
        }
    }

    word.finish_into(&mut tokens);
    tokens
}

#[inline]
const fn is_word_boundary(c: char) -> bool {
    c.is_ascii_whitespace() || matches!(c, ';' | '&' | '|' | '(' | ')' | '<' | '>' | '`')
}

fn consume_single_quoted(chars: &mut Peekable<Chars<'_>>, word: &mut WordBuilder) {
    for c in chars.by_ref() {
        if c == '\'' {
            return;
        }
        word.push(c);
    }
}

fn consume_double_quoted(chars: &mut Peekable<Chars<'_>>, word: &mut WordBuilder) {
    while let Some(c) = chars.next() {
        match c {
            '"' => return,
            '\\' if matches!(chars.peek(), Some('"' | '\\')) => {
                if let Some(escaped) = chars.next() {
                    word.push(escaped);
                }
            }
            _ => word.push(c),
        }
    }
}

/// Accumulates one token. `started` distinguishes `''` (an empty token) from
/// no token at all.
#[derive(Debug, Default)]
struct WordBuilder {
    text: String,
    quote: QuoteKind,
    started: bool,
}

impl WordBuilder {
    #[inline]
    fn push(&mut self, c: char) {
        self.text.push(c);
        self.started = true;
    }

    #[inline]
    fn mark_quoted(&mut self, kind: QuoteKind) {
        if self.quote == QuoteKind::None {
            self.quote = kind;
        }
        self.started = true;
    }

    fn finish_into(&mut self, tokens: &mut Vec<Token>) {
        if self.started {
            tokens.push(Token {
                text: std::mem::take(&mut self.text),
                quote: self.quote,
            });
        }
        self.quote = QuoteKind::None;
        self.started = false;
    }
}
