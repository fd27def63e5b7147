#![allow(dead_code)]

//! Shared helpers for the integration test suite: run a rule and unwrap
//! the result, plus small parse-tree inspection shorthands.

use vyaka::{MatcherRef, ParseNode, ParsingResult};

/// Runs `rule` against `input`, panicking on a fatal engine fault.
pub fn parse_ok(rule: &MatcherRef<()>, input: &str) -> ParsingResult<()> {
    vyaka::parse(rule, input).expect("parse run raised a fatal fault")
}

/// The labels of a node's direct children, in match order.
pub fn child_labels(node: &ParseNode<()>) -> Vec<String> {
    node.children()
        .iter()
        .map(|c| c.label().to_string())
        .collect()
}
