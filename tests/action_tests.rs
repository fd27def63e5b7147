//! Semantic actions: value plumbing, the scratch tag, action failure
//! semantics, and what actions can observe through the context.

mod common;

use std::sync::{Arc, Mutex};

use vyaka::builder::{action, ch, char_range, literal, sequence, test};
use vyaka::{ActionError, MatcherRef};

/// A digit rule that parses its matched text into the node value.
fn digit_rule() -> MatcherRef<i32> {
    sequence(vec![
        char_range('0', '9').into(),
        action(|ctx| {
            let node = ctx.last_node().expect("the terminal just committed");
            let text = ctx.node_text(&node);
            let value: i32 = text.parse().map_err(|_| ActionError::from("not a digit"))?;
            if let Some(mut parent) = ctx.parent() {
                parent.set_node_value(value);
            }
            Ok(true)
        })
        .into(),
    ])
    .label("Digit")
    .into()
}

#[test]
fn actions_set_node_values_and_the_fold_is_right_biased() {
    let pair: MatcherRef<i32> = sequence(vec![digit_rule(), digit_rule()])
        .label("Pair")
        .into();
    let result = vyaka::parse(&pair, "42").unwrap();
    assert!(result.matched);
    let root = result.root.unwrap();
    assert_eq!(root.children()[0].value(), Some(&4));
    assert_eq!(root.children()[1].value(), Some(&2));
    // the pair's own value is the right-most child value
    assert_eq!(root.value(), Some(&2));
}

#[test]
fn explicit_node_value_wins_over_the_child_fold() {
    let tagged: MatcherRef<i32> = sequence(vec![
        digit_rule(),
        action(|ctx| {
            if let Some(mut parent) = ctx.parent() {
                parent.set_node_value(99);
            }
            Ok(true)
        })
        .into(),
    ])
    .label("Tagged")
    .into();
    let result = vyaka::parse(&tagged, "7").unwrap();
    assert_eq!(result.root.unwrap().value(), Some(&99));
}

#[test]
fn soft_action_failure_is_a_plain_mismatch() {
    let gate: MatcherRef<()> = sequence(vec![ch('a').into(), action(|_| Ok(false)).into()]).into();
    let result = vyaka::parse(&gate, "ab").unwrap();
    assert!(!result.matched);
    assert!(!result.has_errors());
}

#[test]
fn action_errors_are_logged_and_fail_the_match() {
    let failing: MatcherRef<()> = sequence(vec![
        ch('a').into(),
        action(|_| Err(ActionError::from("boom"))).into(),
    ])
    .label("S")
    .into();
    let result = vyaka::parse(&failing, "ab").unwrap();
    assert!(!result.matched);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "boom");
    assert_eq!(result.errors[0].location.index, 1);
    assert_eq!(result.errors[0].path, "S/action");
}

#[test]
fn int_tag_persists_on_the_parent_frame_across_children() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let rule: MatcherRef<()> = sequence(vec![
        action(|ctx| {
            if let Some(mut parent) = ctx.parent() {
                parent.set_int_tag(7);
            }
            Ok(true)
        })
        .into(),
        ch('x').into(),
        action(move |ctx| {
            let tag = ctx.parent().map(|p| p.int_tag()).unwrap_or(-1);
            sink.lock().unwrap().push(tag);
            Ok(true)
        })
        .into(),
    ])
    .into();
    assert!(vyaka::parse(&rule, "x").unwrap().matched);
    assert_eq!(*seen.lock().unwrap(), vec![7]);
}

#[test]
fn actions_observe_the_last_committed_node() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let rule: MatcherRef<()> = sequence(vec![
        ch('a').into(),
        ch('b').into(),
        action(move |ctx| {
            sink.lock()
                .unwrap()
                .push(ctx.last_node().map(|n| n.label().to_string()));
            Ok(true)
        })
        .into(),
        ch('c').into(),
    ])
    .into();
    assert!(vyaka::parse(&rule, "abc").unwrap().matched);
    assert_eq!(*seen.lock().unwrap(), vec![Some("'b'".to_string())]);
}

#[test]
fn actions_know_whether_they_run_inside_a_predicate() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let inside = {
        let sink = Arc::clone(&seen);
        action(move |ctx| {
            sink.lock().unwrap().push(ctx.in_predicate());
            Ok(true)
        })
    };
    let outside = {
        let sink = Arc::clone(&seen);
        action(move |ctx| {
            sink.lock().unwrap().push(ctx.in_predicate());
            Ok(true)
        })
    };
    let rule: MatcherRef<()> = sequence(vec![
        test(sequence(vec![inside.into(), ch('a').into()])).into(),
        outside.into(),
        ch('a').into(),
    ])
    .into();
    assert!(vyaka::parse(&rule, "a").unwrap().matched);
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

#[test]
fn actions_can_inject_virtual_input() {
    let rule: MatcherRef<()> = sequence(vec![
        ch('a').into(),
        action(|ctx| {
            ctx.insert_virtual_text("bc");
            Ok(true)
        })
        .into(),
        literal("bcd").into(),
    ])
    .into();
    let result = vyaka::parse(&rule, "ad").unwrap();
    assert!(result.matched);
    // only 'a' and 'd' came from the buffer
    assert_eq!(result.end_location.index, 2);
}
