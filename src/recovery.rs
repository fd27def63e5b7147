//! Recovery strategies for enforced match failures.
//!
//! When a matcher running under enforcement fails, the driver hands the
//! failed frame to the run's [`RecoveryStrategy`]. The strategy may
//! record diagnostics, consume input, inject virtual input, or move the
//! cursor to a resynchronisation point; returning `Ok(true)` reports
//! the failure as recovered and lets the parse continue.

use crate::context::MatcherContext;
use crate::errors::{ParseError, VyakaError};
use crate::input::EOI;

/// Strategy invoked by the driver when a matcher fails under
/// enforcement. The context is the failed frame, cursor still at the
/// failure position.
pub trait RecoveryStrategy<V> {
    fn handle_parse_error(&self, ctx: &mut MatcherContext<'_, V>) -> Result<bool, VyakaError>;
}

fn describe_char(c: char) -> String {
    match c {
        EOI => "end of input".to_string(),
        c => format!("'{}'", c),
    }
}

fn invalid_input_error<V>(ctx: &MatcherContext<'_, V>) -> ParseError {
    let expected = ctx
        .matcher()
        .map(|m| m.expected())
        .unwrap_or_else(|| "input".to_string());
    ParseError::new(
        ctx.current_location(),
        ctx.path().to_string(),
        format!(
            "invalid input {}, expected {}",
            describe_char(ctx.current_char()),
            expected
        ),
    )
}

/// The default strategy: record what was expected and report the
/// failure as unrecovered.
pub struct ReportingRecovery;

impl<V> RecoveryStrategy<V> for ReportingRecovery {
    fn handle_parse_error(&self, ctx: &mut MatcherContext<'_, V>) -> Result<bool, VyakaError> {
        let error = invalid_input_error(ctx);
        ctx.add_parse_error(error);
        Ok(false)
    }
}

/// Resynchronising strategy: record the error, then skip input until
/// the current character is legal at the current stack state (the
/// follower set always contains [`EOI`], so the skip terminates), and
/// report the failure as recovered.
pub struct ResyncRecovery;

impl<V> RecoveryStrategy<V> for ResyncRecovery {
    fn handle_parse_error(&self, ctx: &mut MatcherContext<'_, V>) -> Result<bool, VyakaError> {
        let error = invalid_input_error(ctx);
        ctx.add_parse_error(error);
        let followers = ctx.current_follower_chars();
        // the walk adds EOI only when it runs to the root; stop there
        // explicitly so a short-circuited follower set cannot spin
        while !followers.contains(ctx.current_char()) && ctx.current_char() != EOI {
            ctx.advance_input_location();
        }
        Ok(true)
    }
}
