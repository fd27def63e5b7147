//! The matcher context: per-invocation companion frames and the driver.
//!
//! A parse run owns a spine of frames, one per recursion level, reused
//! across invocations so frame allocation is bounded by the maximum
//! rule nesting depth rather than the number of rule invocations. A
//! [`MatcherContext`] is a view onto one level of that spine; matchers
//! receive it in their match call and use it to read input, bind sub
//! contexts for their operands, and build parse-tree nodes.
//!
//! The driver ([`MatcherContext::run_matcher`]) is the only place that
//! commits cursor progress to the parent frame, which is what makes a
//! failed matcher equivalent to "the parent's cursor never moved" and
//! gives ordered choice its no-rollback semantics.

use std::sync::Arc;

use crate::chars::CharacterSet;
use crate::errors::{MatchFault, ParseError, VyakaError};
use crate::input::{InputBuffer, InputLocation, EMPTY, EOI};
use crate::matcher::{Matcher, MatcherRef};
use crate::recovery::RecoveryStrategy;
use crate::tree::ParseNode;

// ============================================================================
// PER-RUN STATE AND FRAME SPINE
// ============================================================================

/// State shared by every frame of one parse run: the input, the
/// append-only error list, the last-committed-node cell, and the frame
/// spine itself.
pub(crate) struct ParseState<V> {
    pub(crate) buffer: InputBuffer,
    pub(crate) errors: Vec<ParseError>,
    pub(crate) last_node: Option<Arc<ParseNode<V>>>,
    pub(crate) frames: Vec<Frame<V>>,
    pub(crate) max_depth: usize,
}

impl<V> ParseState<V> {
    pub(crate) fn new(buffer: InputBuffer, max_depth: usize) -> Self {
        Self {
            buffer,
            errors: Vec::new(),
            last_node: None,
            frames: Vec::new(),
            max_depth,
        }
    }

    pub(crate) fn root_node(&self) -> Option<Arc<ParseNode<V>>> {
        self.frames.first().and_then(|f| f.node.clone())
    }

    pub(crate) fn end_location(&self) -> InputLocation {
        self.frames
            .first()
            .map(|f| f.current_location.clone())
            .unwrap_or_else(InputLocation::start)
    }
}

/// One reusable level of the context spine. A frame with a matcher is
/// active; a frame whose matcher has been taken is retired and ready to
/// be rebound by its parent for the next child.
pub(crate) struct Frame<V> {
    pub(crate) matcher: Option<MatcherRef<V>>,
    pub(crate) start_location: InputLocation,
    pub(crate) current_location: InputLocation,
    pub(crate) node: Option<Arc<ParseNode<V>>>,
    pub(crate) sub_nodes: Option<Vec<Arc<ParseNode<V>>>>,
    pub(crate) node_value: Option<V>,
    pub(crate) int_tag: i64,
    pub(crate) below_leaf_level: bool,
    pub(crate) enforced: bool,
}

impl<V> Frame<V> {
    fn unbound() -> Self {
        Self {
            matcher: None,
            start_location: InputLocation::start(),
            current_location: InputLocation::start(),
            node: None,
            sub_nodes: None,
            node_value: None,
            int_tag: 0,
            below_leaf_level: false,
            enforced: false,
        }
    }

    fn bound(matcher: MatcherRef<V>) -> Self {
        Self {
            matcher: Some(matcher),
            ..Self::unbound()
        }
    }
}

/// Runs `root` against the state's buffer from the start location.
pub(crate) fn run_root<V: Clone>(
    state: &mut ParseState<V>,
    handler: &dyn RecoveryStrategy<V>,
    root: &MatcherRef<V>,
) -> Result<bool, VyakaError> {
    let root = Matcher::unwrap_proxy(root);
    state.frames.clear();
    state.frames.push(Frame::bound(root));
    let mut ctx = MatcherContext {
        state,
        handler,
        level: 0,
    };
    ctx.run_matcher()
}

// ============================================================================
// MATCHER PATH
// ============================================================================

/// The chain of matcher labels from the root to a frame, for
/// diagnostics and parse-error records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherPath {
    labels: Vec<String>,
}

impl MatcherPath {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl std::fmt::Display for MatcherPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.labels.join("/"))
    }
}

// ============================================================================
// MATCHER CONTEXT
// ============================================================================

/// A view onto one level of the live context spine, handed to matchers
/// and semantic actions.
pub struct MatcherContext<'s, V> {
    state: &'s mut ParseState<V>,
    handler: &'s dyn RecoveryStrategy<V>,
    level: usize,
}

impl<'s, V> MatcherContext<'s, V> {
    fn frame(&self) -> &Frame<V> {
        &self.state.frames[self.level]
    }

    fn frame_mut(&mut self) -> &mut Frame<V> {
        &mut self.state.frames[self.level]
    }

    // ------------------------------------------------------------------
    // read access
    // ------------------------------------------------------------------

    pub fn buffer(&self) -> &InputBuffer {
        &self.state.buffer
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// The matcher bound to this frame; `None` once the frame retired.
    pub fn matcher(&self) -> Option<MatcherRef<V>> {
        self.frame().matcher.clone()
    }

    pub fn start_location(&self) -> InputLocation {
        self.frame().start_location.clone()
    }

    pub fn current_location(&self) -> InputLocation {
        self.frame().current_location.clone()
    }

    /// The character under the cursor.
    pub fn current_char(&self) -> char {
        self.frame().current_location.current_char(&self.state.buffer)
    }

    pub fn parse_errors(&self) -> &[ParseError] {
        &self.state.errors
    }

    pub fn is_enforced(&self) -> bool {
        self.frame().enforced
    }

    pub fn is_below_leaf_level(&self) -> bool {
        self.frame().below_leaf_level
    }

    /// True if this frame or any ancestor is a syntactic predicate.
    pub fn in_predicate(&self) -> bool {
        self.state.frames[..=self.level]
            .iter()
            .any(|f| f.matcher.as_ref().is_some_and(|m| m.is_test()))
    }

    pub fn node_value(&self) -> Option<&V> {
        self.frame().node_value.as_ref()
    }

    pub fn int_tag(&self) -> i64 {
        self.frame().int_tag
    }

    /// This frame's own parse-tree node, once created.
    pub fn node(&self) -> Option<Arc<ParseNode<V>>> {
        self.frame().node.clone()
    }

    /// Snapshot of the children accumulated so far, in match order.
    pub fn sub_nodes(&self) -> Vec<Arc<ParseNode<V>>> {
        self.frame().sub_nodes.clone().unwrap_or_default()
    }

    /// The most recently committed node of the whole run.
    pub fn last_node(&self) -> Option<Arc<ParseNode<V>>> {
        self.state.last_node.clone()
    }

    /// The matched text of a node.
    pub fn node_text(&self, node: &ParseNode<V>) -> String {
        node.text(&self.state.buffer)
    }

    /// The label chain from the root down to this frame.
    pub fn path(&self) -> MatcherPath {
        let labels = self.state.frames[..=self.level]
            .iter()
            .filter_map(|f| f.matcher.as_ref().map(|m| m.display_label()))
            .collect();
        MatcherPath { labels }
    }

    // ------------------------------------------------------------------
    // write access
    // ------------------------------------------------------------------

    pub fn set_current_location(&mut self, location: InputLocation) {
        self.frame_mut().current_location = location;
    }

    /// Advances the cursor one character.
    pub fn advance_input_location(&mut self) {
        let next = self.frame().current_location.advance(&self.state.buffer);
        self.frame_mut().current_location = next;
    }

    /// Queues a synthetic character in front of the cursor.
    pub fn insert_virtual_char(&mut self, c: char) {
        let next = self.frame().current_location.insert_virtual_char(c);
        self.frame_mut().current_location = next;
    }

    /// Queues synthetic text in front of the cursor.
    pub fn insert_virtual_text(&mut self, text: &str) {
        let next = self.frame().current_location.insert_virtual_text(text);
        self.frame_mut().current_location = next;
    }

    pub fn set_node_value(&mut self, value: V) {
        self.frame_mut().node_value = Some(value);
    }

    pub fn set_int_tag(&mut self, tag: i64) {
        self.frame_mut().int_tag = tag;
    }

    pub fn set_enforcement(&mut self) {
        self.frame_mut().enforced = true;
    }

    pub fn clear_enforcement(&mut self) {
        self.frame_mut().enforced = false;
    }

    pub fn add_parse_error(&mut self, error: ParseError) {
        self.state.errors.push(error);
    }

    /// Appends a node to this frame's children.
    pub fn add_child_node(&mut self, node: Arc<ParseNode<V>>) {
        self.frame_mut()
            .sub_nodes
            .get_or_insert_with(Vec::new)
            .push(node);
    }

    /// Appends nodes to this frame's children, preserving order.
    pub fn add_child_nodes(&mut self, nodes: impl IntoIterator<Item = Arc<ParseNode<V>>>) {
        self.frame_mut()
            .sub_nodes
            .get_or_insert_with(Vec::new)
            .extend(nodes);
    }

    // ------------------------------------------------------------------
    // navigation
    // ------------------------------------------------------------------

    /// A view onto the enclosing frame, if any.
    pub fn parent(&mut self) -> Option<MatcherContext<'_, V>> {
        if self.level == 0 {
            return None;
        }
        Some(MatcherContext {
            state: &mut *self.state,
            handler: self.handler,
            level: self.level - 1,
        })
    }

    /// Binds this frame's reusable sub frame to `matcher` and returns a
    /// view onto it. Proxies are unwrapped here; the sub frame inherits
    /// the cursor, leaf suppression, and enforcement of this frame.
    pub fn sub_context(&mut self, matcher: &MatcherRef<V>) -> MatcherContext<'_, V> {
        let bound = Matcher::unwrap_proxy(matcher);
        let sub_level = self.level + 1;
        if self.state.frames.len() <= sub_level {
            self.state.frames.push(Frame::unbound());
        }
        let frame = self.frame();
        let location = frame.current_location.clone();
        let below_leaf =
            frame.below_leaf_level || frame.matcher.as_ref().is_some_and(|m| m.is_leaf());
        let enforced = frame.enforced;

        let sub = &mut self.state.frames[sub_level];
        sub.matcher = Some(bound);
        sub.start_location = location.clone();
        sub.current_location = location;
        sub.node = None;
        sub.sub_nodes = None;
        sub.node_value = None;
        sub.below_leaf_level = below_leaf;
        sub.enforced = enforced;

        MatcherContext {
            state: &mut *self.state,
            handler: self.handler,
            level: sub_level,
        }
    }

    // ------------------------------------------------------------------
    // follower walk
    // ------------------------------------------------------------------

    /// The set of characters that may legally appear at the current
    /// stack state: the union of the follower sets of every live
    /// repetition/optional ancestor frame, walking from the enclosing
    /// frame to the root and stopping early once the union can no
    /// longer match empty. The failing frame itself is excluded: its
    /// own follower set would re-admit the very characters it just
    /// failed on. [`EOI`] is always a member of the final set.
    pub fn current_follower_chars(&self) -> CharacterSet {
        let mut chars = CharacterSet::none();
        for frame in self.state.frames[..self.level].iter().rev() {
            let followers = frame.matcher.as_ref().and_then(|m| m.follower_chars());
            if let Some(followers) = followers {
                chars = chars.union(&followers);
                if !chars.contains(EMPTY) {
                    return chars;
                }
            }
        }
        chars.remove(EMPTY).add(EOI)
    }

    // ------------------------------------------------------------------
    // defect helpers
    // ------------------------------------------------------------------

    pub(crate) fn empty_match_defect(&self, construct: &str) -> VyakaError {
        VyakaError::grammar_defect(
            format!("the inner rule of a {construct} must not allow empty matches"),
            self.path().to_string(),
            &self.state.buffer,
            &self.frame().current_location,
        )
    }

    pub(crate) fn unresolved_reference_defect(&self) -> VyakaError {
        VyakaError::grammar_defect(
            "forward rule reference was never defined",
            self.path().to_string(),
            &self.state.buffer,
            &self.frame().current_location,
        )
    }
}

impl<'s, V: Clone> MatcherContext<'s, V> {
    /// The frame's tree value: its own value if set, else the value of
    /// the right-most child that carries one.
    pub fn tree_value(&self) -> Option<V> {
        let frame = self.frame();
        frame.node_value.clone().or_else(|| {
            frame
                .sub_nodes
                .iter()
                .flatten()
                .rev()
                .find_map(|n| n.value().cloned())
        })
    }

    /// Runs this frame's matcher and settles the outcome: commits the
    /// cursor to the parent on success, folds a failed semantic action
    /// into a recorded parse error, routes enforced failures through the
    /// recovery strategy, and retires the frame for reuse.
    pub fn run_matcher(&mut self) -> Result<bool, VyakaError> {
        if self.level >= self.state.max_depth {
            return Err(VyakaError::RecursionLimit {
                limit: self.state.max_depth,
                path: self.path().to_string(),
            });
        }
        let matcher = match self.frame().matcher.clone() {
            Some(m) => m,
            None => return Err(VyakaError::internal("run_matcher called on a retired frame")),
        };

        let mut matched = false;
        match matcher.apply(self) {
            Ok(result) => {
                matched = result;
                if !matched && self.frame().enforced {
                    let handler = self.handler;
                    matched = handler.handle_parse_error(self)?;
                }
            }
            Err(MatchFault::Action(action)) => {
                // action failure is a recoverable match failure
                let error = ParseError::new(
                    self.current_location(),
                    self.path().to_string(),
                    action.message,
                );
                self.state.errors.push(error);
            }
            Err(MatchFault::Fatal(fault)) => return Err(fault),
        }

        if matched && self.level > 0 {
            let location = self.frame().current_location.clone();
            self.state.frames[self.level - 1].current_location = location;
        }
        // retire this frame; the parent rebinds it for its next child
        self.frame_mut().matcher = None;
        Ok(matched)
    }

    /// Builds this frame's parse-tree node and attaches it to the
    /// parent, honouring the suppression rules: nothing below leaf
    /// level or for predicate frames, child adoption for node-suppressed
    /// matchers.
    pub fn create_node(&mut self) {
        let matcher = match self.frame().matcher.as_ref() {
            Some(m) => Arc::clone(m),
            None => return,
        };
        if self.frame().below_leaf_level || matcher.is_test() {
            return;
        }
        if matcher.is_without_node() {
            if self.level > 0 {
                if let Some(nodes) = self.frame_mut().sub_nodes.take() {
                    self.state.frames[self.level - 1]
                        .sub_nodes
                        .get_or_insert_with(Vec::new)
                        .extend(nodes);
                }
            }
            return;
        }
        let value = self.tree_value();
        let frame = self.frame_mut();
        let children = frame.sub_nodes.take().unwrap_or_default();
        let node = Arc::new(ParseNode::new(
            matcher.display_label(),
            children,
            frame.start_location.clone(),
            frame.current_location.clone(),
            value,
        ));
        frame.node = Some(Arc::clone(&node));
        if self.level > 0 {
            self.state.frames[self.level - 1]
                .sub_nodes
                .get_or_insert_with(Vec::new)
                .push(Arc::clone(&node));
        }
        self.state.last_node = Some(node);
    }
}

impl<'s, V> std::fmt::Display for MatcherContext<'s, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}
