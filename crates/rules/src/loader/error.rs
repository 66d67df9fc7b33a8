//! Error types for rule compilation, evaluation and loading.

use std::path::PathBuf;

/// Errors raised while building or evaluating rule expressions.
///
/// Everything except [`RuleError::FileAccess`] is a configuration error and
/// aborts the run; `FileAccess` concerns a single file and is recoverable.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error while reading a rule file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An expression node with a `type` other than and/or/rule.
    #[error("invalid expression type \"{0}\"")]
    UnknownKind(String),

    /// An `and`/`or` node without operands.
    #[error("empty operand list in '{0}' expression")]
    EmptyOperands(&'static str),

    /// A `full_name_regex` that does not compile.
    #[error("invalid full_name_regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A rule set name not present in the rule book.
    #[error("unknown rule set '{0}'")]
    UnknownRuleSet(String),

    /// Structural problem in a rule definition.
    #[error("validation error: {0}")]
    Validation(String),

    /// A file could not be read while evaluating a predicate against it.
    #[error("cannot read {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RuleError {
    /// Whether the error concerns only the file being evaluated.
    pub fn is_per_file(&self) -> bool {
        matches!(self, RuleError::FileAccess { .. })
    }
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
