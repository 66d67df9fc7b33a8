//! Rule expression evaluation.
//!
//! Evaluation is a pure recursive function of (expression, file). `And`
//! stops at the first false operand and `Or` at the first true one, so
//! operands after the deciding one never touch the file.

use crate::expression::{Predicate, RuleExpression, RuleNode};
use crate::facts::FileFacts;
use crate::loader::{Result, RuleError};

/// Second line of a compiler-generated XML documentation file.
const XML_DOC_MARKER: &str = "<doc>";

impl RuleExpression {
    /// Evaluate this expression against one file.
    ///
    /// Fails with [`RuleError::EmptyOperands`] for an operand-less `And`/`Or`
    /// and with [`RuleError::FileAccess`] when a predicate cannot read the file.
    pub fn evaluate(&self, file: &dyn FileFacts) -> Result<bool> {
        let result = match &self.node {
            RuleNode::And(operands) => {
                if operands.is_empty() {
                    return Err(RuleError::EmptyOperands("and"));
                }
                let mut result = true;
                for operand in operands {
                    if !operand.evaluate(file)? {
                        result = false;
                        break;
                    }
                }
                result
            }
            RuleNode::Or(operands) => {
                if operands.is_empty() {
                    return Err(RuleError::EmptyOperands("or"));
                }
                let mut result = false;
                for operand in operands {
                    if operand.evaluate(file)? {
                        result = true;
                        break;
                    }
                }
                result
            }
            // An empty rule matches everything; negation does not apply.
            RuleNode::Rule(Predicate::Always) => return Ok(true),
            RuleNode::Rule(predicate) => predicate.matches(file)?,
        };

        Ok(result != self.negate)
    }
}

impl Predicate {
    /// Evaluate the predicate alone, without the owning node's negation.
    pub fn matches(&self, file: &dyn FileFacts) -> Result<bool> {
        match self {
            Predicate::Always => Ok(true),
            Predicate::FullNameRegex(re) => {
                Ok(re.is_match(&file.full_path().to_string_lossy()))
            }
            Predicate::ReadOnly => Ok(file.is_read_only()),
            Predicate::XmlDocFile => is_xml_doc_file(file),
        }
    }
}

fn is_xml_doc_file(file: &dyn FileFacts) -> Result<bool> {
    let path = file.full_path();
    let is_xml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xml"))
        .unwrap_or(false);
    if !is_xml {
        return Ok(false);
    }

    let lines = file
        .leading_lines(2)
        .map_err(|source| RuleError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(lines.get(1).map(|l| l == XML_DOC_MARKER).unwrap_or(false))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::*;

    /// In-memory file that counts content reads.
    struct FakeFile {
        path: PathBuf,
        read_only: bool,
        lines: Option<Vec<&'static str>>,
        reads: Cell<usize>,
    }

    impl FakeFile {
        fn new(path: &str) -> Self {
            Self {
                path: PathBuf::from(path),
                read_only: false,
                lines: Some(Vec::new()),
                reads: Cell::new(0),
            }
        }

        fn with_lines(mut self, lines: Vec<&'static str>) -> Self {
            self.lines = Some(lines);
            self
        }

        fn unreadable(mut self) -> Self {
            self.lines = None;
            self
        }

        fn read_only(mut self) -> Self {
            self.read_only = true;
            self
        }
    }

    impl FileFacts for FakeFile {
        fn full_path(&self) -> &Path {
            &self.path
        }

        fn is_read_only(&self) -> bool {
            self.read_only
        }

        fn leading_lines(&self, count: usize) -> io::Result<Vec<String>> {
            self.reads.set(self.reads.get() + 1);
            match &self.lines {
                Some(lines) => Ok(lines.iter().take(count).map(|l| l.to_string()).collect()),
                None => Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked")),
            }
        }
    }

    fn regex(pattern: &str) -> RuleExpression {
        RuleExpression::rule(Predicate::full_name(pattern).unwrap())
    }

    fn xml_doc() -> RuleExpression {
        RuleExpression::rule(Predicate::XmlDocFile)
    }

    #[test]
    fn regex_is_case_insensitive() {
        let file = FakeFile::new("/ws/Proj/Bin/Debug/App.DLL");
        assert!(regex(r"\\bin\\|/bin/").evaluate(&file).unwrap());
        assert!(regex(r"\.dll$").evaluate(&file).unwrap());
        assert!(!regex(r"\.pdb$").evaluate(&file).unwrap());
    }

    #[test]
    fn read_only_predicate() {
        let rule = RuleExpression::rule(Predicate::ReadOnly);
        assert!(rule.evaluate(&FakeFile::new("/a").read_only()).unwrap());
        assert!(!rule.evaluate(&FakeFile::new("/a")).unwrap());
    }

    #[test]
    fn xml_doc_file_requires_marker_on_second_line() {
        let doc = FakeFile::new("/ws/bin/App.XML").with_lines(vec!["<?xml version=\"1.0\"?>", "<doc>"]);
        assert!(xml_doc().evaluate(&doc).unwrap());

        let config = FakeFile::new("/ws/App.xml").with_lines(vec!["<?xml version=\"1.0\"?>", "<configuration>"]);
        assert!(!xml_doc().evaluate(&config).unwrap());

        let short = FakeFile::new("/ws/App.xml").with_lines(vec!["<doc>"]);
        assert!(!xml_doc().evaluate(&short).unwrap());

        let padded = FakeFile::new("/ws/App.xml").with_lines(vec!["", " <doc>"]);
        assert!(!xml_doc().evaluate(&padded).unwrap());
    }

    #[test]
    fn xml_doc_file_skips_reading_other_extensions() {
        let file = FakeFile::new("/ws/App.cs").with_lines(vec!["", "<doc>"]);
        assert!(!xml_doc().evaluate(&file).unwrap());
        assert_eq!(file.reads.get(), 0);
    }

    #[test]
    fn unreadable_xml_is_a_per_file_error() {
        let file = FakeFile::new("/ws/locked.xml").unreadable();
        let err = xml_doc().evaluate(&file).unwrap_err();
        assert!(err.is_per_file());
        assert!(err.to_string().contains("locked.xml"));
    }

    #[test]
    fn empty_rule_matches_everything_even_negated() {
        let file = FakeFile::new("/anything");
        assert!(RuleExpression::rule(Predicate::Always).evaluate(&file).unwrap());
        assert!(RuleExpression::rule(Predicate::Always)
            .negated()
            .evaluate(&file)
            .unwrap());
    }

    #[test]
    fn empty_operand_lists_fail() {
        let file = FakeFile::new("/a");
        let err = RuleExpression::and(vec![]).evaluate(&file).unwrap_err();
        assert!(matches!(err, RuleError::EmptyOperands("and")));
        assert!(!err.is_per_file());
        let err = RuleExpression::or(vec![]).negated().evaluate(&file).unwrap_err();
        assert!(matches!(err, RuleError::EmptyOperands("or")));
    }

    #[test]
    fn and_short_circuits_on_false() {
        let file = FakeFile::new("/ws/doc.xml").with_lines(vec!["", "<doc>"]);
        let expr = RuleExpression::and(vec![regex("nomatch"), xml_doc()]);
        assert!(!expr.evaluate(&file).unwrap());
        assert_eq!(file.reads.get(), 0);
    }

    #[test]
    fn or_short_circuits_on_true() {
        let file = FakeFile::new("/ws/doc.xml").with_lines(vec!["", "<doc>"]);
        let expr = RuleExpression::or(vec![regex("doc"), xml_doc()]);
        assert!(expr.evaluate(&file).unwrap());
        assert_eq!(file.reads.get(), 0);
    }

    #[test]
    fn deciding_operand_is_evaluated() {
        let file = FakeFile::new("/ws/doc.xml").with_lines(vec!["", "<doc>"]);
        let expr = RuleExpression::and(vec![regex("doc"), xml_doc()]);
        assert!(expr.evaluate(&file).unwrap());
        assert_eq!(file.reads.get(), 1);
    }

    #[test]
    fn short_circuit_also_skips_errors() {
        let locked = FakeFile::new("/ws/locked.xml").unreadable();
        let expr = RuleExpression::or(vec![regex("locked"), xml_doc()]);
        assert!(expr.evaluate(&locked).unwrap());
    }

    #[test]
    fn negated_and_is_nand() {
        let file = FakeFile::new("/ws/a.cs").read_only();
        let both = RuleExpression::and(vec![
            regex(r"\.cs$"),
            RuleExpression::rule(Predicate::ReadOnly),
        ]);
        assert!(both.evaluate(&file).unwrap());
        assert!(!both.clone().negated().evaluate(&file).unwrap());

        let writable = FakeFile::new("/ws/a.cs");
        assert!(both.negated().evaluate(&writable).unwrap());
    }

    #[test]
    fn negation_applies_per_node() {
        // or(not rule(.cs), rule(read_only)) on a writable .cs file
        let expr = RuleExpression::or(vec![
            regex(r"\.cs$").negated(),
            RuleExpression::rule(Predicate::ReadOnly),
        ]);
        assert!(!expr.evaluate(&FakeFile::new("/ws/a.cs")).unwrap());
        assert!(expr.evaluate(&FakeFile::new("/ws/a.txt")).unwrap());
    }
}
