//! YAML schema for rule expressions and rule books.
//!
//! These types mirror the configuration file one-to-one and carry no
//! validation; [`RuleSpec::compile`](crate::RuleSpec::compile) turns them into
//! an evaluable [`RuleExpression`](crate::RuleExpression).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One node of a rule expression as written in configuration.
///
/// ```yaml
/// type: or
/// operands:
///   - type: rule
///     full_name_regex: '\\obj\\'
///   - type: rule
///     is_xml_doc_file: true
///     negate: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// `and`, `or` or `rule` (case-insensitive).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, alias = "not")]
    pub negate: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<RuleSpec>,
    /// Case-insensitive regex matched against the file's full path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_xml_doc_file: Option<bool>,
}

impl RuleSpec {
    /// Whether any leaf predicate field is set.
    pub fn has_predicate(&self) -> bool {
        self.full_name_regex.is_some()
            || self.is_read_only == Some(true)
            || self.is_xml_doc_file == Some(true)
    }
}

/// A file of named rule sets.
///
/// ```yaml
/// default: sources
/// rule_sets:
///   sources:
///     type: rule
///     full_name_regex: '\.cs$'
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RuleBookDocument {
    /// Rule set used when the caller does not name one.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub rule_sets: BTreeMap<String, RuleSpec>,
}

/// Node kinds accepted in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    And,
    Or,
    Rule,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::And => write!(f, "and"),
            NodeKind::Or => write!(f, "or"),
            NodeKind::Rule => write!(f, "rule"),
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(NodeKind::And),
            "or" => Ok(NodeKind::Or),
            "rule" => Ok(NodeKind::Rule),
            _ => Err(format!("invalid expression type \"{}\"", s)),
        }
    }
}
