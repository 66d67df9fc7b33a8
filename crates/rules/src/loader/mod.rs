//! Rule book loading.
//!
//! A rule file is either a rule book (`rule_sets` keyed by name, optional
//! `default`) or a single bare expression, told apart by a first pass over
//! the YAML before the typed second pass.

mod core;
mod error;


pub use self::core::{RuleBook, DEFAULT_RULE_SET};
pub use self::error::{Result, RuleError};
