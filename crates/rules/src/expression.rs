//! Compiled rule expression tree.
//!
//! A [`RuleExpression`] is immutable once built and can be evaluated against
//! any number of files. Each node carries its own negation flag, so a negated
//! `And` behaves as NAND over its operands.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::loader::{Result, RuleError};
use crate::schema::{NodeKind, RuleSpec};

/// A node of the expression tree plus its negation flag.
#[derive(Debug, Clone)]
pub struct RuleExpression {
    pub negate: bool,
    pub node: RuleNode,
}

#[derive(Debug, Clone)]
pub enum RuleNode {
    And(Vec<RuleExpression>),
    Or(Vec<RuleExpression>),
    Rule(Predicate),
}

/// The single active check of a `Rule` node.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// No check configured: matches every file, even when negated.
    Always,
    /// Case-insensitive regex against the file's full path.
    FullNameRegex(Regex),
    ReadOnly,
    /// `*.xml` whose second line is exactly `<doc>` (compiler doc output).
    XmlDocFile,
}

impl RuleExpression {
    pub fn and(operands: Vec<RuleExpression>) -> Self {
        Self {
            negate: false,
            node: RuleNode::And(operands),
        }
    }

    pub fn or(operands: Vec<RuleExpression>) -> Self {
        Self {
            negate: false,
            node: RuleNode::Or(operands),
        }
    }

    pub fn rule(predicate: Predicate) -> Self {
        Self {
            negate: false,
            node: RuleNode::Rule(predicate),
        }
    }

    /// Flip this node's negation flag.
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl Predicate {
    /// Build a full-path predicate from a pattern, compiled case-insensitively.
    pub fn full_name(pattern: &str) -> Result<Self> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Predicate::FullNameRegex)
            .map_err(|source| RuleError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })
    }
}

// ── Compilation ─────────────────────────────────────────────────────

impl RuleSpec {
    /// Validate and compile this node into an evaluable expression.
    ///
    /// Rejects unknown node types, `and`/`or` nodes without operands, leaf
    /// fields on composite nodes, operands on `rule` nodes, and regexes that
    /// do not compile.
    pub fn compile(&self) -> Result<RuleExpression> {
        let kind: NodeKind = self
            .kind
            .parse()
            .map_err(|_| RuleError::UnknownKind(self.kind.clone()))?;

        let node = match kind {
            NodeKind::And | NodeKind::Or => {
                if self.has_predicate() {
                    return Err(RuleError::Validation(format!(
                        "'{}' expression cannot carry rule predicates",
                        kind
                    )));
                }
                let operands = self
                    .operands
                    .iter()
                    .map(RuleSpec::compile)
                    .collect::<Result<Vec<_>>>()?;
                match kind {
                    NodeKind::And if operands.is_empty() => {
                        return Err(RuleError::EmptyOperands("and"))
                    }
                    NodeKind::Or if operands.is_empty() => {
                        return Err(RuleError::EmptyOperands("or"))
                    }
                    NodeKind::And => RuleNode::And(operands),
                    _ => RuleNode::Or(operands),
                }
            }
            NodeKind::Rule => {
                if !self.operands.is_empty() {
                    return Err(RuleError::Validation(
                        "'rule' expression cannot have operands".to_string(),
                    ));
                }
                RuleNode::Rule(self.predicate()?)
            }
        };

        Ok(RuleExpression {
            negate: self.negate,
            node,
        })
    }

    /// Pick the active predicate: regex, then read-only, then XML doc file.
    fn predicate(&self) -> Result<Predicate> {
        if let Some(pattern) = &self.full_name_regex {
            Predicate::full_name(pattern)
        } else if self.is_read_only == Some(true) {
            Ok(Predicate::ReadOnly)
        } else if self.is_xml_doc_file == Some(true) {
            Ok(Predicate::XmlDocFile)
        } else {
            Ok(Predicate::Always)
        }
    }
}

// ── Display ─────────────────────────────────────────────────────────

impl fmt::Display for RuleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negate {
            write!(f, "not ")?;
        }
        match &self.node {
            RuleNode::And(ops) => write_list(f, "and", ops),
            RuleNode::Or(ops) => write_list(f, "or", ops),
            RuleNode::Rule(p) => write!(f, "rule({})", p),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, op: &str, operands: &[RuleExpression]) -> fmt::Result {
    let parts: Vec<String> = operands.iter().map(ToString::to_string).collect();
    write!(f, "{}({})", op, parts.join(", "))
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => write!(f, "*"),
            Predicate::FullNameRegex(re) => write!(f, "full_name =~ /{}/i", re.as_str()),
            Predicate::ReadOnly => write!(f, "read_only"),
            Predicate::XmlDocFile => write!(f, "xml_doc_file"),
        }
    }
}
