//! Governed subcommand detection.
//!
//! Finds a `git` invocation whose subcommand verb mutates the repository and
//! runs client-side hooks that `--no-verify` would skip (`commit`, `push`).
//! Everything else (`status`, `log`, `diff`, ...) is not governed.

use std::fmt;

use serde::Serialize;

use crate::tokenize::Token;

/// The governed program.
pub const PROGRAM_NAME: &str = "git";

/// Global options placed between `git` and its verb that consume the next
/// token as their value (`git -c user.name=x commit`, `git -C repo push`).
const VALUE_TAKING_GLOBAL_OPTIONS: &[&str] = &[
    "-c",
    "-C",
    "--git-dir",
    "--work-tree",
    "--namespace",
    "--config-env",
];

/// A mutating `git` verb whose verification hooks must not be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernedVerb {
    Commit,
    Push,
}

impl GovernedVerb {
    /// Every governed verb, in match order.
    pub const ALL: [Self; 2] = [Self::Commit, Self::Push];

    /// Case-sensitive lookup of a verb token.
    #[must_use]
    pub fn from_token(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.as_str() == word)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Push => "push",
        }
    }

    /// The hooks a `--no-verify` on this verb skips.
    #[must_use]
    pub const fn skipped_hooks(self) -> &'static str {
        match self {
            Self::Commit => "pre-commit and commit-msg hooks",
            Self::Push => "pre-push hook",
        }
    }
}

impl fmt::Display for GovernedVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a governed verb inside a token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernedCommandMatch {
    /// Index of the verb token.
    pub verb_index: usize,
    pub verb: GovernedVerb,
}

/// Find the first `git <governed verb>` in `tokens`.
///
/// Leading global options after the program name are skipped; the
/// value-taking ones (`-c key=value`, `-C path`, ...) are skipped together
/// with their value. The first remaining token is the candidate verb. When an
/// occurrence of `git` does not lead to a governed verb, scanning resumes
/// after it, so `git status && git commit -n` still finds `commit`.
#[must_use]
pub fn find_governed_verb(tokens: &[Token]) -> Option<GovernedCommandMatch> {
    let mut search_from = 0;

    while let Some(offset) = tokens
        .get(search_from..)?
        .iter()
        .position(is_program_token)
    {
        let program_index = search_from + offset;
        if let Some(found) = resolve_verb(tokens, program_index) {
            return Some(found);
        }
        search_from = program_index + 1;
    }

    None
}

/// Resolve the verb following the program token at `program_index`.
fn resolve_verb(tokens: &[Token], program_index: usize) -> Option<GovernedCommandMatch> {
    let mut i = program_index + 1;

    while let Some(token) = tokens.get(i) {
        let text = token.as_str();
        if text.starts_with('-') {
            i += if VALUE_TAKING_GLOBAL_OPTIONS.contains(&text) {
                2
            } else {
                1
            };
            continue;
        }

        return GovernedVerb::from_token(text).map(|verb| GovernedCommandMatch {
            verb_index: i,
            verb,
        });
    }

    None
}

/// True for `git`, a path-qualified `git` (`/usr/bin/git`), or `git.exe`.
///
/// The basename is compared case-sensitively, like the verb.
fn is_program_token(token: &Token) -> bool {
    let basename = token.as_str().rsplit('/').next().unwrap_or_default();
    basename
        .strip_suffix(".exe")
        .unwrap_or(basename)
        .eq(PROGRAM_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::tokenize;

    fn verb_of(command: &str) -> Option<(usize, GovernedVerb)> {
        find_governed_verb(&tokenize(command)).map(|m| (m.verb_index, m.verb))
    }

    #[test]
    fn finds_commit_and_push() {
        assert_eq!(verb_of("git commit -m x"), Some((1, GovernedVerb::Commit)));
        assert_eq!(verb_of("git push origin main"), Some((1, GovernedVerb::Push)));
    }

    #[test]
    fn ignores_non_mutating_verbs() {
        for command in ["git status", "git log --oneline", "git diff HEAD~1", "git fetch"] {
            assert_eq!(verb_of(command), None, "{command}");
        }
    }

    #[test]
    fn verb_comparison_is_case_sensitive() {
        assert_eq!(verb_of("git Commit -n"), None);
        assert_eq!(verb_of("git PUSH"), None);
    }

    #[test]
    fn skips_inline_config_pair() {
        assert_eq!(
            verb_of("git -c user.name='x' commit --no-verify -m 'm'"),
            Some((3, GovernedVerb::Commit))
        );
    }

    #[test]
    fn inline_config_value_named_like_a_verb_is_not_the_verb() {
        // `commit` here is the value of -c, the real verb is status.
        assert_eq!(verb_of("git -c commit status"), None);
    }

    #[test]
    fn skips_flag_only_global_options() {
        assert_eq!(
            verb_of("git --no-pager -C repo --git-dir .git push -n"),
            Some((6, GovernedVerb::Push))
        );
    }

    #[test]
    fn no_program_or_no_verb_is_no_match() {
        assert_eq!(verb_of("npm install --no-verify"), None);
        assert_eq!(verb_of("git"), None);
        assert_eq!(verb_of("git -c a=b"), None);
        assert_eq!(verb_of(""), None);
    }

    #[test]
    fn program_may_follow_other_words() {
        assert_eq!(verb_of("sudo git commit"), Some((2, GovernedVerb::Commit)));
        assert_eq!(verb_of("cd repo && git push"), Some((3, GovernedVerb::Push)));
    }

    #[test]
    fn keeps_scanning_after_ungoverned_occurrence() {
        assert_eq!(
            verb_of("git status && git commit -n"),
            Some((3, GovernedVerb::Commit))
        );
    }

    #[test]
    fn recognizes_path_qualified_and_exe_program() {
        assert_eq!(verb_of("/usr/bin/git commit"), Some((1, GovernedVerb::Commit)));
        assert_eq!(verb_of("C:/Git/bin/git.exe push"), Some((1, GovernedVerb::Push)));
        assert_eq!(verb_of(r"\git commit"), Some((1, GovernedVerb::Commit)));
    }

    #[test]
    fn program_name_is_case_sensitive() {
        assert_eq!(verb_of("GIT commit -n"), None);
        assert_eq!(verb_of("Git push"), None);
        assert_eq!(verb_of("GIT.EXE push"), None);
        assert_eq!(verb_of("git.EXE push"), None);
    }

    #[test]
    fn similar_program_names_are_not_git() {
        assert_eq!(verb_of("gitk commit"), None);
        assert_eq!(verb_of("legit commit"), None);
        assert_eq!(verb_of("git-lfs push"), None);
    }

    #[test]
    fn quoted_message_mentioning_git_is_not_a_program() {
        assert_eq!(verb_of("echo 'git commit'"), None);
    }

    #[test]
    fn governed_verb_names() {
        assert_eq!(GovernedVerb::from_token("commit"), Some(GovernedVerb::Commit));
        assert_eq!(GovernedVerb::from_token("push"), Some(GovernedVerb::Push));
        assert_eq!(GovernedVerb::from_token("merge"), None);
        assert_eq!(GovernedVerb::Push.to_string(), "push");
    }
}
