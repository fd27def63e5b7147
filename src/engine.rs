//! The parse-run facade: configure a runner, run a rule against an
//! input, collect the result.
//!
//! One [`ParseRunner`] may run many inputs and many rules; every run
//! owns its own frame spine and error list, so a shared grammar graph
//! can be parsed from several runners concurrently.

use std::sync::Arc;

use crate::context::{self, ParseState};
use crate::errors::{ParseError, VyakaError};
use crate::input::{InputBuffer, InputLocation};
use crate::matcher::MatcherRef;
use crate::recovery::{RecoveryStrategy, ReportingRecovery};
use crate::tree::ParseNode;

/// Default bound on rule nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

static REPORTING: ReportingRecovery = ReportingRecovery;

// ============================================================================
// RUNNER
// ============================================================================

/// Configures and executes parse runs.
pub struct ParseRunner<'h, V> {
    handler: &'h dyn RecoveryStrategy<V>,
    max_depth: usize,
}

impl<V> ParseRunner<'static, V> {
    /// A runner with the default reporting recovery strategy.
    pub fn new() -> Self {
        Self {
            handler: &REPORTING,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl<V> Default for ParseRunner<'static, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h, V> ParseRunner<'h, V> {
    /// A runner using `handler` at enforced failure points.
    pub fn with_recovery(handler: &'h dyn RecoveryStrategy<V>) -> Self {
        Self {
            handler,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Overrides the rule nesting depth bound.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl<'h, V: Clone> ParseRunner<'h, V> {
    /// Runs `rule` against `input` from the start of the buffer.
    ///
    /// `Err` carries a fatal engine fault (grammar defect, recursion
    /// limit); ordinary mismatches and recovered errors land in the
    /// returned [`ParsingResult`].
    pub fn run(&self, rule: &MatcherRef<V>, input: &str) -> Result<ParsingResult<V>, VyakaError> {
        let buffer = InputBuffer::new(input);
        let mut state = ParseState::new(buffer.clone(), self.max_depth);
        let matched = context::run_root(&mut state, self.handler, rule)?;
        Ok(ParsingResult {
            matched,
            root: state.root_node(),
            end_location: state.end_location(),
            errors: std::mem::take(&mut state.errors),
            buffer,
        })
    }
}

/// Runs `rule` against `input` with the default runner.
///
/// # Examples
///
/// ```rust
/// use vyaka::builder::literal;
/// use vyaka::MatcherRef;
///
/// let rule: MatcherRef<()> = literal("ab").label("A").into();
/// let result = vyaka::parse(&rule, "ab").unwrap();
/// assert!(result.matched);
/// assert_eq!(result.root.unwrap().label(), "A");
/// ```
pub fn parse<V: Clone + 'static>(rule: &MatcherRef<V>, input: &str) -> Result<ParsingResult<V>, VyakaError> {
    ParseRunner::new().run(rule, input)
}

// ============================================================================
// RESULT
// ============================================================================

/// The outcome of one parse run.
#[derive(Debug)]
pub struct ParsingResult<V> {
    /// Whether the root rule matched.
    pub matched: bool,
    /// The root parse-tree node, if one was produced.
    pub root: Option<Arc<ParseNode<V>>>,
    /// Recoverable errors in discovery order.
    pub errors: Vec<ParseError>,
    /// The cursor position the root rule reached.
    pub end_location: InputLocation,
    buffer: InputBuffer,
}

impl<V> ParsingResult<V> {
    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The matched text of a node of this run's tree.
    pub fn text_of(&self, node: &ParseNode<V>) -> String {
        node.text(&self.buffer)
    }

    /// Renders all recorded parse errors with source excerpts.
    pub fn render_errors(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.render(&self.buffer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
