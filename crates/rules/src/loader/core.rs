//! Core [`RuleBook`] struct: named, compiled rule sets loaded from YAML.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::expression::RuleExpression;
use crate::schema::{RuleBookDocument, RuleSpec};

use super::error::{Result, RuleError};

/// Name given to a bare expression loaded from a file without `rule_sets`.
pub const DEFAULT_RULE_SET: &str = "default";

/// Compiled rule sets keyed by name.
///
/// Every set is compiled when the book is loaded, so a broken set is reported
/// before any file is swept, even if it is not the one selected.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    default: Option<String>,
    rule_sets: BTreeMap<String, RuleExpression>,
}

impl RuleBook {
    /// Read and compile a rule file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let book = Self::from_yaml(&contents)?;
        info!(
            path = %path.display(),
            rule_sets = book.rule_sets.len(),
            "loaded rule book"
        );
        Ok(book)
    }

    /// Parse a rule book, or a single bare expression, from YAML.
    ///
    /// First pass: look for a top-level `type` key to tell a bare expression
    /// from a book. Second pass: deserialize into the matching type.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let is_bare_expression = value
            .as_mapping()
            .map(|m| m.contains_key("type"))
            .unwrap_or(false);

        if is_bare_expression {
            let spec: RuleSpec = serde_yaml::from_value(value)?;
            let mut rule_sets = BTreeMap::new();
            rule_sets.insert(DEFAULT_RULE_SET.to_string(), spec);
            return Self::compile(RuleBookDocument {
                default: Some(DEFAULT_RULE_SET.to_string()),
                rule_sets,
            });
        }

        let document: RuleBookDocument = serde_yaml::from_value(value)?;
        Self::compile(document)
    }

    /// Compile every rule set of a parsed document.
    pub fn compile(document: RuleBookDocument) -> Result<Self> {
        if let Some(default) = &document.default {
            if !document.rule_sets.contains_key(default) {
                return Err(RuleError::UnknownRuleSet(default.clone()));
            }
        }

        let mut rule_sets = BTreeMap::new();
        for (name, spec) in &document.rule_sets {
            let expr = spec.compile().map_err(|e| match e {
                RuleError::Validation(msg) => {
                    RuleError::Validation(format!("rule set '{}': {}", name, msg))
                }
                other => other,
            })?;
            debug!(rule_set = %name, expression = %expr, "compiled rule set");
            rule_sets.insert(name.clone(), expr);
        }

        Ok(Self {
            default: document.default,
            rule_sets,
        })
    }

    /// Resolve the rule set to apply: the named one, else the book's default.
    ///
    /// `Ok(None)` means no rule applies and every file is admitted.
    pub fn select(&self, name: Option<&str>) -> Result<Option<&RuleExpression>> {
        match name.or(self.default.as_deref()) {
            Some(name) => self
                .rule_sets
                .get(name)
                .map(Some)
                .ok_or_else(|| RuleError::UnknownRuleSet(name.to_string())),
            None => Ok(None),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rule_sets.keys().map(String::as_str)
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.is_empty()
    }
}
