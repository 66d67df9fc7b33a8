//! Local File Sweep: walk working-folder roots and stage files the rule admits.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use shelvepack_core::layout::local_files_path;
use shelvepack_rules::{FileFacts, LocalFile, RuleExpression};

use crate::archive::{ArchiveEntryRequest, ArchiveSink, EntryContent};
use crate::error::Result;

/// Counters reported after a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub added: usize,
    pub rejected: usize,
    /// Files that could not be stat'ed or opened.
    pub skipped_files: usize,
    /// Walk errors, typically directories that could not be listed.
    pub skipped_dirs: usize,
}

pub struct LocalFileSweep<'a> {
    rule: Option<&'a RuleExpression>,
    exclude: HashSet<PathBuf>,
}

impl<'a> LocalFileSweep<'a> {
    /// `rule == None` admits every file.
    pub fn new(rule: Option<&'a RuleExpression>) -> Self {
        Self {
            rule,
            exclude: HashSet::new(),
        }
    }

    /// Never stage `path` (the output archive, the scratch file).
    pub fn exclude(mut self, path: &Path) -> Self {
        self.exclude.insert(canonical(path));
        self
    }

    /// Sweep every root in order into `sink`.
    ///
    /// Per-item problems are logged and counted; only fatal rule errors and
    /// sink failures abort.
    pub fn sweep(&self, roots: &[PathBuf], sink: &mut dyn ArchiveSink) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        for (name, root) in root_names(roots) {
            info!(root = %root.display(), name = %name, "sweeping local files");
            self.sweep_root(&name, &canonical(&root), sink, &mut summary)?;
        }
        info!(
            added = summary.added,
            rejected = summary.rejected,
            skipped_files = summary.skipped_files,
            skipped_dirs = summary.skipped_dirs,
            "local file sweep complete"
        );
        Ok(summary)
    }

    fn sweep_root(
        &self,
        name: &str,
        root: &Path,
        sink: &mut dyn ArchiveSink,
        summary: &mut SweepSummary,
    ) -> Result<()> {
        let walker = WalkDir::new(root).sort_by_file_name().into_iter();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "cannot list, skipping");
                    summary.skipped_dirs += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || self.exclude.contains(entry.path()) {
                continue;
            }

            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat, skipping");
                    summary.skipped_files += 1;
                    continue;
                }
            };

            let facts = LocalFile::new(path.to_path_buf(), metadata.clone());
            if !self.admits(&facts)? {
                debug!(path = %path.display(), "rejected by rule");
                summary.rejected += 1;
                continue;
            }

            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot open, skipping");
                    summary.skipped_files += 1;
                    continue;
                }
            };

            let relative = path.strip_prefix(root).unwrap_or(path);
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            sink.append(ArchiveEntryRequest {
                path: local_files_path(name, &relative.to_string_lossy()),
                modified,
                content: EntryContent::File(file),
            })?;
            summary.added += 1;
        }
        Ok(())
    }

    /// Per-file evaluation errors admit the file; any other rule error is fatal.
    fn admits(&self, file: &dyn FileFacts) -> Result<bool> {
        let Some(rule) = self.rule else {
            return Ok(true);
        };
        match rule.evaluate(file) {
            Ok(admitted) => Ok(admitted),
            Err(e) if e.is_per_file() => {
                warn!(path = %file.full_path().display(), error = %e, "rule evaluation failed, including file");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Pair each root with a namespace name unique within the run: its final
/// component, suffixed `-2`, `-3`, ... on collision.
fn root_names(roots: &[PathBuf]) -> Vec<(String, PathBuf)> {
    let mut used: BTreeMap<String, usize> = BTreeMap::new();
    roots
        .iter()
        .map(|root| {
            let base = canonical(root)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "root".to_string());
            let count = used.entry(base.clone()).or_insert(0);
            *count += 1;
            let name = if *count == 1 {
                base
            } else {
                format!("{}-{}", base, count)
            };
            (name, root.clone())
        })
        .collect()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::archive::MemorySink;
    use crate::error::ExportError;
    use shelvepack_rules::{Predicate, RuleError};
    use tempfile::TempDir;

    /// File whose content can never be read.
    struct LockedFile(PathBuf);

    impl FileFacts for LockedFile {
        fn full_path(&self) -> &Path {
            &self.0
        }

        fn is_read_only(&self) -> bool {
            false
        }

        fn leading_lines(&self, _count: usize) -> io::Result<Vec<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        }
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let ws = dir.path().join("ws");
        fs::create_dir_all(ws.join("bin")).unwrap();
        fs::create_dir_all(ws.join("src")).unwrap();
        fs::write(ws.join("bin/app.dll"), "dll").unwrap();
        fs::write(ws.join("bin/app.xml"), "<?xml?>\n<doc>\n").unwrap();
        fs::write(ws.join("src/main.cs"), "code").unwrap();
        dir
    }

    #[test]
    fn no_rule_admits_everything() {
        let dir = tree();
        let mut sink = MemorySink::new();
        let summary = LocalFileSweep::new(None)
            .sweep(&[dir.path().join("ws")], &mut sink)
            .unwrap();

        assert_eq!(summary.added, 3);
        assert_eq!(
            sink.paths(),
            vec![
                "localfiles/ws/bin/app.dll",
                "localfiles/ws/bin/app.xml",
                "localfiles/ws/src/main.cs"
            ]
        );
        assert_eq!(sink.get("localfiles/ws/src/main.cs").unwrap().text(), "code");
    }

    #[test]
    fn rule_filters_files() {
        let dir = tree();
        let rule = RuleExpression::rule(Predicate::full_name(r"\\bin\\|/bin/").unwrap());
        let mut sink = MemorySink::new();
        let summary = LocalFileSweep::new(Some(&rule))
            .sweep(&[dir.path().join("ws")], &mut sink)
            .unwrap();

        assert_eq!(summary.added, 2);
        assert_eq!(summary.rejected, 1);
        assert!(sink.get("localfiles/ws/src/main.cs").is_none());
    }

    #[test]
    fn timestamps_come_from_last_write() {
        let dir = tree();
        let path = dir.path().join("ws/src/main.cs");
        let expected: DateTime<Utc> = fs::metadata(&path).unwrap().modified().unwrap().into();

        let mut sink = MemorySink::new();
        LocalFileSweep::new(None)
            .sweep(&[dir.path().join("ws")], &mut sink)
            .unwrap();
        assert_eq!(sink.get("localfiles/ws/src/main.cs").unwrap().modified, expected);
    }

    #[test]
    fn roots_with_same_name_stay_disjoint() {
        let dir = TempDir::new().unwrap();
        for parent in ["a", "b"] {
            let root = dir.path().join(parent).join("proj");
            fs::create_dir_all(&root).unwrap();
            fs::write(root.join("readme.txt"), parent).unwrap();
        }
        let roots = vec![dir.path().join("a/proj"), dir.path().join("b/proj")];

        let mut sink = MemorySink::new();
        LocalFileSweep::new(None).sweep(&roots, &mut sink).unwrap();

        assert_eq!(sink.get("localfiles/proj/readme.txt").unwrap().text(), "a");
        assert_eq!(sink.get("localfiles/proj-2/readme.txt").unwrap().text(), "b");
    }

    #[test]
    fn excluded_paths_are_not_swept() {
        let dir = tree();
        let ws = dir.path().join("ws");
        let mut sink = MemorySink::new();
        LocalFileSweep::new(None)
            .exclude(&ws.join("bin/app.dll"))
            .sweep(&[ws], &mut sink)
            .unwrap();
        assert!(sink.get("localfiles/ws/bin/app.dll").is_none());
        assert_eq!(sink.entries.len(), 2);
    }

    #[test]
    fn missing_root_is_logged_not_fatal() {
        let dir = tree();
        let roots = vec![dir.path().join("absent"), dir.path().join("ws")];
        let mut sink = MemorySink::new();
        let summary = LocalFileSweep::new(None).sweep(&roots, &mut sink).unwrap();
        assert_eq!(summary.skipped_dirs, 1);
        assert_eq!(summary.added, 3);
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_directory_does_not_abort_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tree();
        let locked = dir.path().join("ws/locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret.txt"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can list anything; nothing to observe then.
        let listable = fs::read_dir(&locked).is_ok();

        let mut sink = MemorySink::new();
        let summary = LocalFileSweep::new(None)
            .sweep(&[dir.path().join("ws")], &mut sink)
            .unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(sink.get("localfiles/ws/src/main.cs").is_some());
        if !listable {
            assert_eq!(summary.skipped_dirs, 1);
            assert_eq!(summary.added, 3);
        }
    }

    #[test]
    fn per_file_rule_error_admits_the_file() {
        let rule = RuleExpression::rule(Predicate::XmlDocFile);
        let locked = LockedFile(PathBuf::from("/ws/locked.xml"));
        let sweep = LocalFileSweep::new(Some(&rule));
        assert!(sweep.admits(&locked).unwrap());

        let negated = rule.negated();
        assert!(LocalFileSweep::new(Some(&negated)).admits(&locked).unwrap());
    }

    #[test]
    fn fatal_rule_error_aborts_the_sweep() {
        let dir = tree();
        let rule = RuleExpression::and(vec![]);
        let mut sink = MemorySink::new();
        let err = LocalFileSweep::new(Some(&rule))
            .sweep(&[dir.path().join("ws")], &mut sink)
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Rule(RuleError::EmptyOperands("and"))
        ));
        assert!(sink.entries.is_empty());
    }

    #[test]
    fn non_utf8_xml_is_judged_by_content() {
        let dir = TempDir::new().unwrap();
        let ws = dir.path().join("ws");
        fs::create_dir_all(&ws).unwrap();
        fs::write(
            ws.join("settings.xml"),
            b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?>\n<config name=\"caf\xe9\"/>\n",
        )
        .unwrap();
        fs::write(ws.join("plain.xml"), "<?xml version=\"1.0\"?>\n<doc>\n").unwrap();

        let rule = RuleExpression::rule(Predicate::XmlDocFile);
        let mut sink = MemorySink::new();
        let summary = LocalFileSweep::new(Some(&rule))
            .sweep(&[ws], &mut sink)
            .unwrap();

        assert_eq!(sink.paths(), vec!["localfiles/ws/plain.xml"]);
        assert_eq!(summary.rejected, 1);
    }

    #[cfg(unix)]
    #[test]
    fn unopenable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tree();
        let locked = dir.path().join("ws/bin/locked.xml");
        fs::write(&locked, "<?xml?>\n<doc>\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can open anything; nothing to observe then.
        let openable = File::open(&locked).is_ok();

        let rule = RuleExpression::rule(Predicate::XmlDocFile);
        let mut sink = MemorySink::new();
        let summary = LocalFileSweep::new(Some(&rule))
            .sweep(&[dir.path().join("ws")], &mut sink)
            .unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert!(sink.get("localfiles/ws/bin/app.xml").is_some());
        if !openable {
            // The rule could not read it, so it was admitted, then failed to open.
            assert_eq!(summary.rejected, 2);
            assert_eq!(summary.skipped_files, 1);
            assert!(sink.get("localfiles/ws/bin/locked.xml").is_none());
        }
    }
}
