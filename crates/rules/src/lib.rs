//! Boolean rule expressions deciding which local files join an export.
//!
//! This crate provides:
//! - YAML rule definitions with serde deserialization
//! - Compilation into an AND/OR/RULE tree with per-node negation
//! - Short-circuit evaluation over a lazy file-facts accessor
//! - Rule books holding named rule sets, selected at call time

pub mod evaluator;
pub mod expression;
pub mod facts;
pub mod loader;
pub mod schema;

pub use expression::{Predicate, RuleExpression, RuleNode};
pub use facts::{FileFacts, LocalFile};
pub use loader::{Result, RuleBook, RuleError};
pub use schema::{RuleBookDocument, RuleSpec};
