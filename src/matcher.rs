//! Matcher variants: the operator nodes of the grammar graph.
//!
//! A grammar is a directed, potentially cyclic graph of [`Matcher`]
//! nodes shared via `Arc`. Each variant implements a match contract
//! against the current [`MatcherContext`]: it may advance the context's
//! cursor, run sub matchers in sub contexts, and build parse-tree nodes.
//! Failure is ordinary control flow; the parent's cursor only moves when
//! the driver commits a successful child.
//!
//! Forward references during grammar construction go through the `Proxy`
//! variant, which is armed once and transparently unwrapped when a sub
//! context is bound.

use std::sync::{Arc, OnceLock};

use crate::chars::CharacterSet;
use crate::context::MatcherContext;
use crate::errors::{ActionError, MatchFault, MatchResult};
use crate::input::{EMPTY, EOI};

/// Shared handle to a matcher node.
pub type MatcherRef<V> = Arc<Matcher<V>>;

/// A user-written semantic action, shared so the grammar graph stays
/// reusable across parses.
pub type ActionFn<V> =
    Arc<dyn Fn(&mut MatcherContext<'_, V>) -> Result<bool, ActionError> + Send + Sync>;

/// A node in the grammar graph.
pub struct Matcher<V> {
    pub(crate) kind: MatcherKind<V>,
    label: Option<String>,
    without_node: bool,
    leaf: bool,
}

/// The matcher variants. The grammar front end composes these through
/// [`crate::builder`].
pub enum MatcherKind<V> {
    /// A single character; `Char(EOI)` matches the end of the input.
    Char(char),
    /// An inclusive character range.
    CharRange(char, char),
    /// Any character of an explicit set.
    AnyOf(CharacterSet),
    /// A literal string, matched character by character.
    Literal(String),
    /// Any single character except `EOI`.
    Any,
    /// Matches without consuming input.
    Empty,
    /// All children in order. Children after the cut index run under
    /// enforcement.
    Sequence {
        children: Vec<MatcherRef<V>>,
        cut: Option<usize>,
    },
    /// Ordered choice: the first succeeding child wins.
    FirstOf(Vec<MatcherRef<V>>),
    ZeroOrMore(MatcherRef<V>),
    OneOrMore(MatcherRef<V>),
    Optional(MatcherRef<V>),
    /// Positive syntactic predicate: non-consuming lookahead.
    Test(MatcherRef<V>),
    /// Negative syntactic predicate.
    TestNot(MatcherRef<V>),
    /// A semantic action run against the current context.
    Action(ActionFn<V>),
    /// Lazy indirection for forward rule references; armed once and
    /// unwrapped at sub-context bind time.
    Proxy(OnceLock<MatcherRef<V>>),
}

impl<V> Matcher<V> {
    pub(crate) fn new(kind: MatcherKind<V>) -> Self {
        Self {
            kind,
            label: None,
            without_node: false,
            leaf: false,
        }
    }

    // ------------------------------------------------------------------
    // modifiers (builder style, consuming)
    // ------------------------------------------------------------------

    /// Sets the display label, usually the rule name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Marks this matcher as a leaf rule: descendants run below leaf
    /// level and produce no parse-tree nodes.
    pub fn leaf(mut self) -> Self {
        self.leaf = true;
        self
    }

    /// Suppresses this matcher's own parse-tree node; on success its
    /// children are adopted by the parent.
    pub fn suppress_node(mut self) -> Self {
        self.without_node = true;
        self
    }

    /// Places a cut after child `index`: subsequent children of this
    /// sequence run under enforcement, routing their failures through
    /// the recovery strategy. No effect on other variants.
    pub fn cut_after(mut self, index: usize) -> Self {
        if let MatcherKind::Sequence { cut, .. } = &mut self.kind {
            *cut = Some(index);
        }
        self
    }

    // ------------------------------------------------------------------
    // introspection
    // ------------------------------------------------------------------

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn is_without_node(&self) -> bool {
        self.without_node
    }

    /// True for the syntactic predicate variants.
    pub fn is_test(&self) -> bool {
        matches!(self.kind, MatcherKind::Test(_) | MatcherKind::TestNot(_))
    }

    /// The display label: the explicit one if set, else a string
    /// synthesised from the operator.
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match &self.kind {
            MatcherKind::Char(EOI) => "EOI".to_string(),
            MatcherKind::Char(c) => format!("'{}'", c),
            MatcherKind::CharRange(lo, hi) => format!("{}..{}", lo, hi),
            MatcherKind::AnyOf(_) => "anyOf".to_string(),
            MatcherKind::Literal(s) => format!("{:?}", s),
            MatcherKind::Any => "ANY".to_string(),
            MatcherKind::Empty => "EMPTY".to_string(),
            MatcherKind::Sequence { .. } => "sequence".to_string(),
            MatcherKind::FirstOf(_) => "firstOf".to_string(),
            MatcherKind::ZeroOrMore(_) => "zeroOrMore".to_string(),
            MatcherKind::OneOrMore(_) => "oneOrMore".to_string(),
            MatcherKind::Optional(_) => "optional".to_string(),
            MatcherKind::Test(sub) => format!("&({})", sub.display_label()),
            MatcherKind::TestNot(sub) => format!("!({})", sub.display_label()),
            MatcherKind::Action(_) => "action".to_string(),
            MatcherKind::Proxy(slot) => match slot.get() {
                Some(target) => target.display_label(),
                None => "proxy".to_string(),
            },
        }
    }

    /// A human description of the input this matcher expects, used by
    /// recovery diagnostics.
    pub fn expected(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match &self.kind {
            MatcherKind::Char(EOI) => "end of input".to_string(),
            MatcherKind::Char(c) => format!("'{}'", c),
            MatcherKind::CharRange(lo, hi) => format!("{}..{}", lo, hi),
            MatcherKind::AnyOf(set) => format!("one of {}", set),
            MatcherKind::Literal(s) => format!("{:?}", s),
            MatcherKind::Any => "any character".to_string(),
            MatcherKind::Sequence { children, .. } => match children.first() {
                Some(first) => first.expected(),
                None => self.display_label(),
            },
            MatcherKind::FirstOf(children) => children
                .iter()
                .map(|c| c.expected())
                .collect::<Vec<_>>()
                .join(" or "),
            MatcherKind::ZeroOrMore(sub)
            | MatcherKind::OneOrMore(sub)
            | MatcherKind::Optional(sub)
            | MatcherKind::Test(sub) => sub.expected(),
            MatcherKind::TestNot(sub) => format!("not {}", sub.expected()),
            MatcherKind::Proxy(slot) => match slot.get() {
                Some(target) => target.expected(),
                None => "proxy".to_string(),
            },
            MatcherKind::Empty | MatcherKind::Action(_) => self.display_label(),
        }
    }

    /// Resolves proxy indirections; any other matcher is returned as-is.
    /// An unarmed proxy is returned unchanged and reported as a grammar
    /// defect if it is ever asked to match.
    pub(crate) fn unwrap_proxy(matcher: &MatcherRef<V>) -> MatcherRef<V> {
        let mut current = Arc::clone(matcher);
        loop {
            let next = match &current.kind {
                MatcherKind::Proxy(slot) => match slot.get() {
                    Some(target) => Arc::clone(target),
                    None => return current,
                },
                _ => return current,
            };
            current = next;
        }
    }

    // ------------------------------------------------------------------
    // starter and follower sets
    // ------------------------------------------------------------------

    /// The characters that may begin a successful match. Contains the
    /// [`EMPTY`] marker iff the matcher may succeed without consuming
    /// input; operands of repetitions and predicates must not.
    pub fn starter_chars(&self) -> CharacterSet {
        match &self.kind {
            MatcherKind::Char(c) => CharacterSet::of(*c),
            MatcherKind::CharRange(lo, hi) => CharacterSet::range(*lo, *hi),
            MatcherKind::AnyOf(set) => set.clone(),
            MatcherKind::Literal(s) => match s.chars().next() {
                Some(first) => CharacterSet::of(first),
                None => CharacterSet::of(EMPTY),
            },
            MatcherKind::Any => CharacterSet::all_except_empty().remove(EOI),
            MatcherKind::Empty | MatcherKind::Action(_) => CharacterSet::of(EMPTY),
            MatcherKind::Sequence { children, .. } => {
                let mut acc = CharacterSet::none();
                let mut all_optional = true;
                for child in children {
                    let starters = child.starter_chars();
                    acc = acc.union(&starters.remove(EMPTY));
                    if !starters.contains(EMPTY) {
                        all_optional = false;
                        break;
                    }
                }
                if all_optional {
                    acc.add(EMPTY)
                } else {
                    acc
                }
            }
            MatcherKind::FirstOf(children) => children
                .iter()
                .fold(CharacterSet::none(), |acc, c| acc.union(&c.starter_chars())),
            MatcherKind::ZeroOrMore(sub) | MatcherKind::Optional(sub) => {
                sub.starter_chars().add(EMPTY)
            }
            MatcherKind::OneOrMore(sub) | MatcherKind::Test(sub) => sub.starter_chars(),
            MatcherKind::TestNot(sub) => {
                CharacterSet::all_except_empty().subtract(&sub.starter_chars())
            }
            MatcherKind::Proxy(slot) => match slot.get() {
                Some(target) => target.starter_chars(),
                None => CharacterSet::none(),
            },
        }
    }

    /// For the repetition/optional variants, the characters that may
    /// legally follow at this level; `None` for every other variant.
    /// Feeds the follower walk used for resynchronisation.
    pub fn follower_chars(&self) -> Option<CharacterSet> {
        match &self.kind {
            MatcherKind::ZeroOrMore(sub)
            | MatcherKind::OneOrMore(sub)
            | MatcherKind::Optional(sub) => Some(sub.starter_chars().add(EMPTY)),
            _ => None,
        }
    }
}

// ============================================================================
// MATCH DISPATCH
// ============================================================================

impl<V: Clone> Matcher<V> {
    /// Applies this matcher inside `ctx`. Cursor commits to the parent
    /// happen in the driver, never here.
    pub(crate) fn apply(&self, ctx: &mut MatcherContext<'_, V>) -> MatchResult {
        match &self.kind {
            MatcherKind::Char(c) => self.match_terminal(ctx, |got| got == *c),
            MatcherKind::CharRange(lo, hi) => {
                self.match_terminal(ctx, |got| *lo <= got && got <= *hi)
            }
            MatcherKind::AnyOf(set) => self.match_terminal(ctx, |got| set.contains(got)),
            MatcherKind::Any => self.match_terminal(ctx, |got| got != EOI),

            MatcherKind::Literal(text) => {
                for c in text.chars() {
                    if ctx.current_char() != c {
                        return Ok(false);
                    }
                    ctx.advance_input_location();
                }
                ctx.create_node();
                Ok(true)
            }

            MatcherKind::Empty => {
                ctx.create_node();
                Ok(true)
            }

            MatcherKind::Sequence { children, cut } => {
                for (i, child) in children.iter().enumerate() {
                    let mut sub = ctx.sub_context(child);
                    if cut.is_some_and(|index| i > index) {
                        sub.set_enforcement();
                    }
                    if !sub.run_matcher()? {
                        return Ok(false);
                    }
                }
                ctx.create_node();
                Ok(true)
            }

            MatcherKind::FirstOf(children) => {
                for child in children {
                    let mut sub = ctx.sub_context(child);
                    // a failed alternative stays a plain failure; only
                    // the choice as a whole observes enforcement
                    sub.clear_enforcement();
                    if sub.run_matcher()? {
                        ctx.create_node();
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            MatcherKind::ZeroOrMore(sub) => {
                ctx.clear_enforcement();
                self.repeat(ctx, sub)?;
                ctx.create_node();
                Ok(true)
            }

            MatcherKind::OneOrMore(sub) => {
                if !ctx.sub_context(sub).run_matcher()? {
                    return Ok(false);
                }
                ctx.clear_enforcement();
                self.repeat(ctx, sub)?;
                ctx.create_node();
                Ok(true)
            }

            MatcherKind::Optional(sub) => {
                ctx.clear_enforcement();
                ctx.sub_context(sub).run_matcher()?;
                ctx.create_node();
                Ok(true)
            }

            MatcherKind::Test(sub) | MatcherKind::TestNot(sub) => {
                let inverted = matches!(self.kind, MatcherKind::TestNot(_));
                ctx.clear_enforcement();
                let before = ctx.current_location();
                let at_eoi = ctx.current_char() == EOI;
                let matched = ctx.sub_context(sub).run_matcher()?;
                if matched && ctx.current_location() == before && !at_eoi {
                    return Err(ctx.empty_match_defect("syntactic predicate").into());
                }
                // predicates never advance the cursor
                ctx.set_current_location(before);
                Ok(if inverted { !matched } else { matched })
            }

            MatcherKind::Action(run) => Ok(run(ctx)?),

            MatcherKind::Proxy(slot) => match slot.get() {
                Some(target) => target.apply(ctx),
                None => Err(MatchFault::Fatal(ctx.unresolved_reference_defect())),
            },
        }
    }

    fn match_terminal(
        &self,
        ctx: &mut MatcherContext<'_, V>,
        accepts: impl Fn(char) -> bool,
    ) -> MatchResult {
        if !accepts(ctx.current_char()) {
            return Ok(false);
        }
        ctx.advance_input_location();
        ctx.create_node();
        Ok(true)
    }

    /// Shared repetition tail: runs `sub` until it fails, verifying that
    /// every successful iteration consumed input.
    fn repeat(&self, ctx: &mut MatcherContext<'_, V>, sub: &MatcherRef<V>) -> Result<(), MatchFault> {
        let mut last = ctx.current_location();
        while ctx.sub_context(sub).run_matcher()? {
            let current = ctx.current_location();
            if current == last {
                return Err(ctx.empty_match_defect("repetition").into());
            }
            last = current;
        }
        Ok(())
    }
}

impl<V> std::fmt::Display for Matcher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_label())
    }
}

impl<V> std::fmt::Debug for Matcher<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("label", &self.display_label())
            .field("leaf", &self.leaf)
            .field("without_node", &self.without_node)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ch, first_of, literal, optional, sequence, test_not, zero_or_more};

    #[test]
    fn synthesised_labels() {
        assert_eq!(ch::<()>('a').display_label(), "'a'");
        assert_eq!(literal::<()>("ab").display_label(), "\"ab\"");
        let t: Matcher<()> = test_not(ch('x'));
        assert_eq!(t.display_label(), "!('x')");
        assert_eq!(t.expected(), "not 'x'");
        assert_eq!(ch::<()>('a').label("Letter").display_label(), "Letter");
    }

    #[test]
    fn sequence_starters_stop_at_first_required_child() {
        let seq = sequence::<()>(vec![
            optional(ch('a')).into(),
            ch('b').into(),
            ch('c').into(),
        ]);
        let starters = seq.starter_chars();
        assert!(starters.contains('a'));
        assert!(starters.contains('b'));
        assert!(!starters.contains('c'));
        assert!(!starters.contains(EMPTY));
    }

    #[test]
    fn all_optional_sequence_keeps_empty_marker() {
        let seq = sequence::<()>(vec![optional(ch('a')).into(), optional(ch('b')).into()]);
        assert!(seq.starter_chars().contains(EMPTY));
    }

    #[test]
    fn choice_and_repetition_starters() {
        let alt = first_of::<()>(vec![ch('x').into(), ch('y').into()]);
        let starters = alt.starter_chars();
        assert!(starters.contains('x') && starters.contains('y'));

        let star: Matcher<()> = zero_or_more(ch('d'));
        assert!(star.starter_chars().contains(EMPTY));
        let followers = star.follower_chars().unwrap();
        assert!(followers.contains('d') && followers.contains(EMPTY));
    }

    #[test]
    fn test_not_starters_are_complemented() {
        let not_x: Matcher<()> = test_not(ch('x'));
        let starters = not_x.starter_chars();
        assert!(starters.contains('y'));
        assert!(!starters.contains('x'));
        assert!(!starters.contains(EMPTY));
    }
}
