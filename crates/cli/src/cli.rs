use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Export shelved or pending changes into one `.tar.zst` archive.
///
/// Each changed file is stored with its base version next to it, plus a
/// manifest (`Files.txt`) and provenance record (`Info.txt`).
#[derive(Parser, Debug)]
#[command(name = "shelvepack", version, about = "Export shelvesets and pending changes to an archive")]
pub struct CliArgs {
    /// Overwrite an existing output file without asking
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Change store directory (default: current directory)
    #[arg(long, env = "SHELVEPACK_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Path to config file (default: ~/.config/shelvepack/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export a shelveset
    Shelveset {
        /// `<name>` or `<name>;<owner>`; owner defaults to the current user
        spec: String,
        /// Output file, or a directory ending in a separator
        output: Option<String>,
    },
    /// Export the workspace's pending changes
    Pending {
        /// Output file, or a directory ending in a separator
        output: Option<String>,
    },
    /// Export pending changes plus working-folder files admitted by a rule set
    Local {
        /// Output file, or a directory ending in a separator
        output: Option<String>,
        /// Working-folder root to sweep (repeatable)
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
        /// Rule book YAML file
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Rule set to apply from the rule book
        #[arg(long)]
        rule_set: Option<String>,
    },
}

/// Split `<name>[;<owner>]`, falling back to `default_owner` when no owner is
/// given or it is empty.
pub fn parse_shelveset_spec(spec: &str, default_owner: &str) -> (String, String) {
    match spec.split_once(';') {
        Some((name, owner)) if !owner.trim().is_empty() => {
            (name.to_string(), owner.trim().to_string())
        }
        Some((name, _)) => (name.to_string(), default_owner.to_string()),
        None => (spec.to_string(), default_owner.to_string()),
    }
}

/// The current user name from `USER` or `USERNAME`.
pub fn current_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shelveset_spec_with_owner() {
        assert_eq!(
            parse_shelveset_spec("fix-login;DOMAIN\\dev", "me"),
            ("fix-login".to_string(), "DOMAIN\\dev".to_string())
        );
    }

    #[test]
    fn shelveset_spec_defaults_owner() {
        assert_eq!(
            parse_shelveset_spec("fix-login", "me"),
            ("fix-login".to_string(), "me".to_string())
        );
        assert_eq!(
            parse_shelveset_spec("fix-login;", "me"),
            ("fix-login".to_string(), "me".to_string())
        );
    }

    #[test]
    fn parses_local_command() {
        let args = CliArgs::try_parse_from([
            "shelvepack", "-y", "local", "out/", "--root", "a", "--root", "b", "--rule-set", "all",
        ])
        .unwrap();
        assert!(args.yes);
        match args.command {
            Command::Local {
                output,
                roots,
                rules,
                rule_set,
            } => {
                assert_eq!(output.as_deref(), Some("out/"));
                assert_eq!(roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
                assert!(rules.is_none());
                assert_eq!(rule_set.as_deref(), Some("all"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn shelveset_requires_a_name() {
        assert!(CliArgs::try_parse_from(["shelvepack", "shelveset"]).is_err());
    }

    #[test]
    fn command_is_required() {
        assert!(CliArgs::try_parse_from(["shelvepack"]).is_err());
    }
}
