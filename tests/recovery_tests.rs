//! Enforced matching and error recovery: the cut hint, recovery
//! strategies, follower-set resynchronisation, and where enforcement
//! does not propagate.

mod common;

use common::parse_ok;
use vyaka::builder::{ch, char_range, enforced_sequence, first_of, literal, one_or_more, sequence, test, test_not, zero_or_more};
use vyaka::{
    MatcherContext, MatcherRef, ParseError, ParseRunner, RecoveryStrategy, ResyncRecovery,
    VyakaError,
};

/// Test-only strategy: record the failure, skip one character, report
/// recovered.
struct SkipOne;

impl RecoveryStrategy<()> for SkipOne {
    fn handle_parse_error(&self, ctx: &mut MatcherContext<'_, ()>) -> Result<bool, VyakaError> {
        let error = ParseError::new(
            ctx.current_location(),
            ctx.path().to_string(),
            "skipped one character",
        );
        ctx.add_parse_error(error);
        ctx.advance_input_location();
        Ok(true)
    }
}

/// Test-only strategy: record the failure, then pretend the expected
/// character was present by injecting and consuming it virtually.
struct InsertExpected(char);

impl RecoveryStrategy<()> for InsertExpected {
    fn handle_parse_error(&self, ctx: &mut MatcherContext<'_, ()>) -> Result<bool, VyakaError> {
        let error = ParseError::new(
            ctx.current_location(),
            ctx.path().to_string(),
            format!("inserted missing '{}'", self.0),
        );
        ctx.add_parse_error(error);
        ctx.insert_virtual_char(self.0);
        ctx.advance_input_location();
        Ok(true)
    }
}

#[test]
fn default_recovery_reports_and_fails() {
    let rule: MatcherRef<()> = enforced_sequence(vec![literal("a").into(), literal("b").into()])
        .label("S")
        .into();
    let result = parse_ok(&rule, "ax");
    assert!(!result.matched);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("invalid input 'x'"));
    assert!(result.errors[0].message.contains("expected \"b\""));
    assert_eq!(result.errors[0].location.index, 1);
}

#[test]
fn failures_before_the_cut_are_not_enforced() {
    let rule: MatcherRef<()> = enforced_sequence(vec![literal("a").into(), literal("b").into()])
        .into();
    let result = parse_ok(&rule, "x");
    assert!(!result.matched);
    assert!(!result.has_errors());
}

#[test]
fn skip_recovery_resumes_the_sequence() {
    let rule: MatcherRef<()> = enforced_sequence(vec![literal("a").into(), literal("b").into()])
        .label("S")
        .into();
    let result = ParseRunner::with_recovery(&SkipOne).run(&rule, "ax").unwrap();
    assert!(result.matched);
    assert_eq!(result.end_location.index, 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].location.index, 1);
    assert_eq!(result.errors[0].path, "S/\"b\"");
}

#[test]
fn insertion_recovery_supplies_the_missing_input() {
    let rule: MatcherRef<()> = enforced_sequence(vec![ch('a').into(), ch('b').into(), ch('c').into()])
        .label("S")
        .into();
    let handler = InsertExpected('b');
    let result = ParseRunner::with_recovery(&handler).run(&rule, "ac").unwrap();
    assert!(result.matched);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("inserted missing 'b'"));
    // only 'a' and 'c' came from the buffer
    assert_eq!(result.end_location.index, 2);
}

#[test]
fn resync_recovery_skips_to_a_follower_and_continues() {
    // List = Item (',' Item)* with a cut after each comma
    let item: MatcherRef<()> = one_or_more(char_range('a', 'z')).label("Item").into();
    let list: MatcherRef<()> = sequence(vec![
        item.clone(),
        zero_or_more(sequence(vec![ch(',').into(), item]).cut_after(0)).into(),
    ])
    .label("List")
    .into();

    let result = ParseRunner::with_recovery(&ResyncRecovery)
        .run(&list, "ab,1x,cd")
        .unwrap();
    assert!(result.matched);
    // the bad character was skipped and the rest of the list consumed
    assert_eq!(result.end_location.index, 8);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].location.index, 3);
    assert!(result.errors[0].message.contains("invalid input '1'"));
}

#[test]
fn resync_recovery_stops_at_end_of_input() {
    let rule: MatcherRef<()> = enforced_sequence(vec![ch('a').into(), ch('b').into()])
        .label("S")
        .into();
    let result = ParseRunner::with_recovery(&ResyncRecovery).run(&rule, "a???").unwrap();
    // no follower frames: the skip runs to EOI and reports recovered
    assert!(result.matched);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.end_location.index, 4);
}

#[test]
fn repetition_clears_enforcement_for_its_operand() {
    let rule: MatcherRef<()> = enforced_sequence(vec![
        ch('x').into(),
        zero_or_more(ch('a')).into(),
    ])
    .into();
    // the star's operand fails at 'b' without triggering recovery
    let result = parse_ok(&rule, "xb");
    assert!(result.matched);
    assert_eq!(result.end_location.index, 1);
    assert!(!result.has_errors());
}

#[test]
fn choice_alternatives_are_not_individually_recovered() {
    let rule: MatcherRef<()> = enforced_sequence(vec![
        ch('a').into(),
        first_of(vec![ch('b').into(), ch('c').into()]).into(),
    ])
    .label("S")
    .into();
    // 'b' fails as a plain mismatch and 'c' gets its chance
    let result = ParseRunner::with_recovery(&ResyncRecovery).run(&rule, "ac").unwrap();
    assert!(result.matched);
    assert_eq!(result.end_location.index, 2);
    assert!(!result.has_errors());
}

#[test]
fn an_exhausted_choice_is_still_enforced() {
    let rule: MatcherRef<()> = enforced_sequence(vec![
        ch('a').into(),
        first_of(vec![ch('b').into(), ch('c').into()]).into(),
    ])
    .label("S")
    .into();
    let result = ParseRunner::with_recovery(&ResyncRecovery).run(&rule, "ax").unwrap();
    // both alternatives failed: recovery fires once, at the choice frame
    assert!(result.matched);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("expected 'b' or 'c'"));
    assert_eq!(result.end_location.index, 2);
}

#[test]
fn predicates_neither_observe_nor_propagate_enforcement() {
    let negative: MatcherRef<()> = enforced_sequence(vec![
        ch('a').into(),
        test_not(ch('z')).into(),
        ch('b').into(),
    ])
    .into();
    let result = parse_ok(&negative, "ab");
    assert!(result.matched);
    assert!(!result.has_errors());

    let positive: MatcherRef<()> = enforced_sequence(vec![ch('a').into(), test(ch('z')).into()])
        .into();
    // the failing lookahead is not routed through recovery
    let result = parse_ok(&positive, "ab");
    assert!(!result.matched);
    assert!(!result.has_errors());
}

#[test]
fn recovered_errors_render_with_source_excerpts() {
    let rule: MatcherRef<()> = enforced_sequence(vec![literal("a").into(), literal("b").into()])
        .label("S")
        .into();
    let result = ParseRunner::with_recovery(&SkipOne).run(&rule, "ax").unwrap();
    let rendered = result.render_errors();
    assert!(rendered.contains("skipped one character"));
    assert!(rendered.contains("line 1, column 2"));
    assert!(rendered.ends_with("ax\n ^"));
}
