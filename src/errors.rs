//! Error taxonomy for the matching engine.
//!
//! Three kinds of failure flow through the engine, with distinct types:
//!
//! - plain match failure is ordinary control flow (`Ok(false)`) and never
//!   appears here;
//! - [`ParseError`] records recoverable problems (failed semantic
//!   actions, diagnostics emitted by a recovery strategy) on the shared
//!   per-run error list;
//! - [`VyakaError`] is fatal: a grammar defect or engine fault that
//!   aborts the parse and propagates to the root via `?`.
//!
//! Semantic actions signal failure with [`ActionError`]; the driver folds
//! it into a logged [`ParseError`] and treats the match as failed.

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::{InputBuffer, InputLocation};

// ============================================================================
// RECOVERABLE PARSE ERRORS
// ============================================================================

/// A recoverable parse error, recorded on the shared error list in
/// discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    /// Cursor position at the failure.
    pub location: InputLocation,
    /// Rule path from the root to the failing frame, `/`-separated.
    pub path: String,
    pub message: String,
}

impl ParseError {
    pub fn new(location: InputLocation, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Renders the error with the offending source line and a caret
    /// marker underneath the failure column.
    pub fn render(&self, buffer: &InputBuffer) -> String {
        let line = buffer.line_text(self.location.line);
        let caret_col = self.location.column.saturating_sub(1).min(line.chars().count());
        let caret: String = " ".repeat(caret_col) + "^";
        format!(
            "{} ({}) in rule {}:\n{}\n{}",
            self.message, self.location, self.path, line, caret
        )
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) in rule {}", self.message, self.location, self.path)
    }
}

// ============================================================================
// FATAL ENGINE FAULTS
// ============================================================================

/// A fatal engine fault. Raised once at the failure site with its
/// diagnostic context attached, then propagated unchanged to the root.
#[derive(Debug, Error, Diagnostic)]
pub enum VyakaError {
    /// The grammar itself is broken (an empty match inside a repetition
    /// or predicate, an unresolved forward reference). Not an input
    /// problem: the parse cannot meaningfully continue.
    #[error("grammar defect in rule '{path}': {message}")]
    #[diagnostic(code(vyaka::grammar_defect))]
    GrammarDefect {
        message: String,
        path: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("while matching here")]
        span: SourceSpan,
    },

    /// The frame spine exceeded the configured depth limit.
    #[error("recursion limit of {limit} exceeded in rule '{path}'")]
    #[diagnostic(
        code(vyaka::recursion_limit),
        help("the engine does not support left recursion; check the grammar for rules that recurse without consuming input")
    )]
    RecursionLimit { limit: usize, path: String },

    /// A rule name was referenced during grammar construction but never
    /// defined.
    #[error("undefined rule '{name}'")]
    #[diagnostic(
        code(vyaka::undefined_rule),
        help("every name handed out by rule_ref must be defined before the grammar is finished")
    )]
    UndefinedRule { name: String },

    /// An invariant of the engine itself was violated.
    #[error("internal error: {message}")]
    #[diagnostic(code(vyaka::internal))]
    Internal { message: String },
}

impl VyakaError {
    pub(crate) fn grammar_defect(
        message: impl Into<String>,
        path: impl Into<String>,
        buffer: &InputBuffer,
        location: &InputLocation,
    ) -> Self {
        let start = location.index.min(buffer.len());
        let end = (location.index + 1).min(buffer.len()).max(start);
        VyakaError::GrammarDefect {
            message: message.into(),
            path: path.into(),
            src: NamedSource::new("input", buffer.text().as_ref().clone()),
            span: (start..end).into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        VyakaError::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// SEMANTIC ACTION FAILURES
// ============================================================================

/// Failure signalled by a user-written semantic action. The driver logs
/// it as a [`ParseError`] at the action's position and treats the match
/// as failed; the parse continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "action failed: {}", self.message)
    }
}

impl std::error::Error for ActionError {}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

// ============================================================================
// INTERNAL DRIVER RESULT KIND
// ============================================================================

/// Internal failure kind on the matcher/driver boundary. `Action` is
/// folded into a logged parse error by the driver; `Fatal` bubbles to
/// the root.
#[derive(Debug)]
pub(crate) enum MatchFault {
    Action(ActionError),
    Fatal(VyakaError),
}

impl From<ActionError> for MatchFault {
    fn from(e: ActionError) -> Self {
        MatchFault::Action(e)
    }
}

impl From<VyakaError> for MatchFault {
    fn from(e: VyakaError) -> Self {
        MatchFault::Fatal(e)
    }
}

/// Result of a single matcher application, before the driver folds it
/// into the plain boolean of the external contract.
pub(crate) type MatchResult = Result<bool, MatchFault>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_renders_with_caret() {
        let buffer = InputBuffer::new("ax");
        let loc = InputLocation::start().advance(&buffer);
        let err = ParseError::new(loc, "S/\"b\"", "invalid input 'x', expected 'b'");
        let rendered = err.render(&buffer);
        assert!(rendered.contains("line 1, column 2"));
        assert!(rendered.ends_with("ax\n ^"));
    }

    #[test]
    fn grammar_defect_carries_source_span() {
        let buffer = InputBuffer::new("aa");
        let loc = InputLocation::start();
        let err = VyakaError::grammar_defect("must not match empty", "root", &buffer, &loc);
        match err {
            VyakaError::GrammarDefect { span, .. } => assert_eq!(span.offset(), 0),
            other => panic!("unexpected error: {other}"),
        }
    }
}
