//! Grammar construction: matcher constructors and the rule registry.
//!
//! Matchers compose bottom-up through the free functions here; the
//! modifiers on [`Matcher`] (label, leaf, node suppression, cut) are
//! applied builder-style before a matcher is shared. Mutually recursive
//! rules go through a [`GrammarBuilder`]: `rule_ref` hands out a proxy
//! for a name that may not be defined yet, `define` arms every proxy
//! handed out for that name, and `finish` checks that no reference was
//! left dangling.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::chars::CharacterSet;
use crate::context::MatcherContext;
use crate::errors::{ActionError, VyakaError};
use crate::input::EOI;
use crate::matcher::{Matcher, MatcherKind, MatcherRef};

// ============================================================================
// MATCHER CONSTRUCTORS
// ============================================================================

/// Matches the single character `c`.
pub fn ch<V>(c: char) -> Matcher<V> {
    Matcher::new(MatcherKind::Char(c))
}

/// Matches the end of the input.
pub fn eoi<V>() -> Matcher<V> {
    Matcher::new(MatcherKind::Char(EOI))
}

/// Matches any character in the inclusive range `lo..=hi`.
pub fn char_range<V>(lo: char, hi: char) -> Matcher<V> {
    Matcher::new(MatcherKind::CharRange(lo, hi))
}

/// Matches any character of `chars`.
pub fn any_of<V>(chars: &str) -> Matcher<V> {
    Matcher::new(MatcherKind::AnyOf(CharacterSet::from_chars(chars.chars())))
}

/// Matches `text` character by character.
pub fn literal<V>(text: &str) -> Matcher<V> {
    Matcher::new(MatcherKind::Literal(text.to_string()))
}

/// Matches any single character except `EOI`.
pub fn any<V>() -> Matcher<V> {
    Matcher::new(MatcherKind::Any)
}

/// Matches without consuming input.
pub fn empty<V>() -> Matcher<V> {
    Matcher::new(MatcherKind::Empty)
}

/// Matches all children in order.
pub fn sequence<V>(children: Vec<MatcherRef<V>>) -> Matcher<V> {
    Matcher::new(MatcherKind::Sequence {
        children,
        cut: None,
    })
}

/// A sequence with a cut after its first child: once the first child
/// has matched, failures of the remaining children are routed through
/// the recovery strategy.
pub fn enforced_sequence<V>(children: Vec<MatcherRef<V>>) -> Matcher<V> {
    sequence(children).cut_after(0)
}

/// Ordered choice over `children`; the first success wins.
pub fn first_of<V>(children: Vec<MatcherRef<V>>) -> Matcher<V> {
    Matcher::new(MatcherKind::FirstOf(children))
}

pub fn zero_or_more<V>(sub: impl Into<MatcherRef<V>>) -> Matcher<V> {
    Matcher::new(MatcherKind::ZeroOrMore(sub.into()))
}

pub fn one_or_more<V>(sub: impl Into<MatcherRef<V>>) -> Matcher<V> {
    Matcher::new(MatcherKind::OneOrMore(sub.into()))
}

pub fn optional<V>(sub: impl Into<MatcherRef<V>>) -> Matcher<V> {
    Matcher::new(MatcherKind::Optional(sub.into()))
}

/// Positive lookahead: succeeds iff `sub` matches here, never consumes.
pub fn test<V>(sub: impl Into<MatcherRef<V>>) -> Matcher<V> {
    Matcher::new(MatcherKind::Test(sub.into()))
}

/// Negative lookahead: succeeds iff `sub` does not match here.
pub fn test_not<V>(sub: impl Into<MatcherRef<V>>) -> Matcher<V> {
    Matcher::new(MatcherKind::TestNot(sub.into()))
}

/// A semantic action. The closure runs against the current context and
/// reports failure either softly (`Ok(false)`) or as a recorded parse
/// error (`Err(ActionError)`).
pub fn action<V, F>(run: F) -> Matcher<V>
where
    F: Fn(&mut MatcherContext<'_, V>) -> Result<bool, ActionError> + Send + Sync + 'static,
{
    Matcher::new(MatcherKind::Action(Arc::new(run)))
}

// ============================================================================
// RULE REGISTRY
// ============================================================================

/// Builds a named-rule grammar, resolving forward references through
/// proxy matchers that are armed when the referenced rule is defined.
pub struct GrammarBuilder<V> {
    rules: HashMap<String, MatcherRef<V>>,
    proxies: HashMap<String, MatcherRef<V>>,
}

impl<V> GrammarBuilder<V> {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            proxies: HashMap::new(),
        }
    }

    /// A reference to the rule `name`, usable before the rule is
    /// defined. All references to one name share a single proxy.
    pub fn rule_ref(&mut self, name: &str) -> MatcherRef<V> {
        if let Some(defined) = self.rules.get(name) {
            return Arc::clone(defined);
        }
        Arc::clone(
            self.proxies
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Matcher::new(MatcherKind::Proxy(OnceLock::new())))),
        )
    }

    /// Defines the rule `name`, labelling the matcher with it and arming
    /// any proxy handed out for the name. Each name must be defined once.
    pub fn define(&mut self, name: &str, matcher: Matcher<V>) -> MatcherRef<V> {
        let defined: MatcherRef<V> = Arc::new(matcher.label(name));
        if let Some(proxy) = self.proxies.get(name) {
            if let MatcherKind::Proxy(slot) = &proxy.kind {
                let _ = slot.set(Arc::clone(&defined));
            }
        }
        let previous = self.rules.insert(name.to_string(), Arc::clone(&defined));
        debug_assert!(previous.is_none(), "rule '{name}' defined twice");
        defined
    }

    /// Finishes the grammar with `root` as its start rule. Fails if any
    /// referenced rule was never defined.
    pub fn finish(self, root: &str) -> Result<Grammar<V>, VyakaError> {
        for name in self.proxies.keys() {
            if !self.rules.contains_key(name) {
                return Err(VyakaError::UndefinedRule { name: name.clone() });
            }
        }
        let root = self
            .rules
            .get(root)
            .cloned()
            .ok_or_else(|| VyakaError::UndefinedRule {
                name: root.to_string(),
            })?;
        Ok(Grammar {
            root,
            rules: self.rules,
        })
    }
}

impl<V> Default for GrammarBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished grammar: the start rule plus the rule map for lookups.
pub struct Grammar<V> {
    root: MatcherRef<V>,
    rules: HashMap<String, MatcherRef<V>>,
}

impl<V> std::fmt::Debug for Grammar<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar").finish_non_exhaustive()
    }
}

impl<V> Grammar<V> {
    pub fn root(&self) -> &MatcherRef<V> {
        &self.root
    }

    pub fn rule(&self, name: &str) -> Option<&MatcherRef<V>> {
        self.rules.get(name)
    }
}
