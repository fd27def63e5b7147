//! vyaka: a recursive-descent PEG matching engine.
//!
//! A grammar is a graph of [`Matcher`] nodes built through
//! [`builder`]; the engine drives it against an input buffer, builds a
//! parse tree, and supports semantic actions, syntactic predicates
//! (non-consuming lookahead), and enforced error recovery through
//! pluggable [`recovery`] strategies.
//!
//! ```rust
//! use vyaka::builder::{char_range, one_or_more};
//! use vyaka::MatcherRef;
//!
//! let digits: MatcherRef<()> = one_or_more(char_range('0', '9')).label("Digits").into();
//! let result = vyaka::parse(&digits, "42x").unwrap();
//! assert!(result.matched);
//! assert_eq!(result.end_location.index, 2);
//! ```

pub use crate::errors::{ActionError, ParseError, VyakaError};

pub mod builder;
pub mod chars;
pub mod context;
pub mod engine;
pub mod errors;
pub mod input;
pub mod matcher;
pub mod recovery;
pub mod tree;

pub use crate::builder::{Grammar, GrammarBuilder};
pub use crate::context::{MatcherContext, MatcherPath};
pub use crate::engine::{parse, ParseRunner, ParsingResult, DEFAULT_MAX_DEPTH};
pub use crate::input::{InputBuffer, InputLocation, EMPTY, EOI};
pub use crate::matcher::{Matcher, MatcherKind, MatcherRef};
pub use crate::recovery::{RecoveryStrategy, ReportingRecovery, ResyncRecovery};
pub use crate::tree::ParseNode;
