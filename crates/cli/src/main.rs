mod cli;
mod config;
mod prompt;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};

use shelvepack_core::{config::load_dotenv, ExportConfig, ExportSource, PendingChange};
use shelvepack_export::{
    check_output_path, resolve_output_path, run_export, timestamped_file_name, ExportRequest,
    OutputStatus, StoreBackend, SweepPlan,
};
use shelvepack_rules::RuleBook;

use crate::cli::{current_user, parse_shelveset_spec, CliArgs, Command};
use crate::config::CliConfig;
use crate::prompt::confirm_overwrite;

/// Exit code for fatal errors, declined overwrites, and empty exports.
const EXIT_FAILURE: u8 = 1;
/// Exit code for invalid command lines.
const EXIT_USAGE: u8 = 3;

/// Local-files sweep settings resolved from flags and config.
struct LocalSweep {
    roots: Vec<PathBuf>,
    book: Option<RuleBook>,
    rule_set: Option<String>,
}

/// One resolved export job.
struct Job {
    source: ExportSource,
    changes: Vec<PendingChange>,
    output: Option<String>,
    fallback_name: String,
    sweep: Option<LocalSweep>,
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            e.print().ok();
            return ExitCode::from(code);
        }
    };

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let config = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    let export_config = ExportConfig::from_env().context("invalid export settings")?;
    export_config.log_summary();

    let store_dir = config.resolve_store_dir(args.store.clone());
    let mut backend = StoreBackend::open(&store_dir)
        .with_context(|| format!("failed to open change store {}", store_dir.display()))?;

    let job = plan(args.command, &config, &mut backend)?;

    if job.changes.is_empty() {
        println!("No pending changes. No file written.");
        return Ok(ExitCode::from(EXIT_FAILURE));
    }

    let output = resolve_output_path(job.output.as_deref(), || job.fallback_name.clone());
    if check_output_path(&output)? == OutputStatus::Exists && !args.yes && config.confirm_overwrite {
        let stdin = io::stdin();
        if !confirm_overwrite(&output, &mut stdin.lock(), &mut io::stdout())? {
            info!(path = %output.display(), "overwrite declined");
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    }

    let sweep = match &job.sweep {
        Some(local) => {
            let rule = match &local.book {
                Some(book) => book.select(local.rule_set.as_deref())?,
                None => None,
            };
            Some(SweepPlan {
                roots: local.roots.clone(),
                rule,
                exclude: Vec::new(),
            })
        }
        None => None,
    };

    let request = ExportRequest {
        source: job.source,
        changes: &job.changes,
        sweep,
    };
    let summary = run_export(&request, &backend, &export_config, &output)?;

    println!(
        "Exported {} change(s), {} swept file(s) to {}",
        summary.changes,
        summary.sweep.added,
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}

/// Turn the subcommand into a job against the store.
fn plan(command: Command, config: &CliConfig, backend: &mut StoreBackend) -> Result<Job> {
    let now = Local::now().naive_local();
    match command {
        Command::Shelveset { spec, output } => {
            let (name, owner) = parse_shelveset_spec(&spec, &current_user());
            let shelveset = backend.find_shelveset(&name, &owner)?.clone();
            backend.activate_shelveset(&shelveset.info.name);
            Ok(Job {
                fallback_name: shelveset.info.name.clone(),
                source: ExportSource::Shelveset(shelveset.info),
                changes: shelveset.changes,
                output,
                sweep: None,
            })
        }
        Command::Pending { output } => {
            let workspace = backend.workspace().clone();
            Ok(Job {
                fallback_name: timestamped_file_name(&workspace, now),
                source: ExportSource::Pending(workspace),
                changes: backend.pending_changes(),
                output,
                sweep: None,
            })
        }
        Command::Local {
            output,
            roots,
            rules,
            rule_set,
        } => {
            let workspace = backend.workspace().clone();
            let roots = config.resolve_roots(roots, backend.working_folders());
            if roots.is_empty() {
                warn!("no working-folder roots configured, nothing will be swept");
            }
            let (rules_file, rule_set) = config.resolve_rules(rules, rule_set);
            let book = match &rules_file {
                Some(path) => Some(
                    RuleBook::load(path)
                        .with_context(|| format!("failed to load rules {}", path.display()))?,
                ),
                None => {
                    if rule_set.is_some() {
                        warn!("rule set given without a rule file, including every file");
                    }
                    None
                }
            };
            Ok(Job {
                fallback_name: timestamped_file_name(&workspace, now),
                source: ExportSource::LocalFiles(workspace),
                changes: backend.pending_changes(),
                output,
                sweep: Some(LocalSweep {
                    roots,
                    book,
                    rule_set,
                }),
            })
        }
    }
}
