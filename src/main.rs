//! git-revive - Track deleted git branches and restore them
//!
//! Run with `git-revive --help` for usage.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, bail};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use git_revive::{
    APP_NAME, VERSION,
    config::{Config, JsonFileStore},
    error::LedgerError,
    git::{GitBackend, GitCli, ReflogCandidate},
    ledger::{DeletionLedger, RetentionHorizon, repo_key, short_hash, sorted_for_display},
    portability::{ImportStrategy, export_all, import_all, read_export, write_export},
    restore::{RestoreOutcome, RestoreService},
    ui::{InteractionSurface, TerminalSurface},
};

type Service = RestoreService<GitCli, JsonFileStore, TerminalSurface>;

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Track deleted git branches, find them in the reflog, and restore them safely")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository to operate on (default: discovered from the current directory)
    #[arg(short, long, global = true)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Ledger(LedgerCommand),

    /// Show configuration
    Config {
        /// Initialize config file with defaults
        #[arg(long)]
        init: bool,
    },
}

/// Commands that work on the deletion history
#[derive(Subcommand)]
enum LedgerCommand {
    /// Delete a local branch and remember it
    Delete {
        branch: String,

        /// Delete even if the branch is not merged
        #[arg(short, long)]
        force: bool,
    },

    /// List tracked deletions, newest first
    List {
        /// Show every repository, not just this one
        #[arg(short, long)]
        all: bool,
    },

    /// Restore a tracked branch after previewing it
    Restore {
        branch: String,

        /// Commit (or prefix) of the deletion to restore; default is the latest
        #[arg(long)]
        commit: Option<String>,
    },

    /// List branch deletions found in the reflog
    Scan,

    /// Restore a branch found in the reflog
    RestoreFromLog {
        /// Branch to restore; pick interactively when omitted
        branch: Option<String>,
    },

    /// Stop tracking a deletion without restoring it
    Remove {
        branch: String,

        /// Commit (or prefix) of the deletion; default is the oldest
        #[arg(long)]
        commit: Option<String>,
    },

    /// Forget tracked deletions
    Clear {
        /// Clear every repository, not just this one
        #[arg(short, long)]
        all: bool,
    },

    /// Drop tracked deletions older than the retention horizon
    Prune {
        /// Horizon in days (1-365); default from configuration
        #[arg(long)]
        days: Option<u32>,
    },

    /// Write the whole deletion history to a file
    Export { file: PathBuf },

    /// Read a deletion history written by `export`
    Import {
        file: PathBuf,

        /// merge or replace; asked interactively when omitted
        #[arg(short, long)]
        strategy: Option<ImportStrategy>,
    },
}

fn setup_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else {
        // Warnings only by default so command output stays readable
        EnvFilter::new("warn").add_directive("gix=warn".parse()?)
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(file).with_target(false))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .with(filter)
                .init();
        }
    }

    Ok(())
}

/// Working-copy root for `--repo`, or the one containing the current directory
fn resolve_repo(repo: Option<&Path>) -> Result<PathBuf> {
    let start = match repo {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let start = std::fs::canonicalize(&start)?;
    let backend = GitBackend::discover(&start)?;
    debug!("Using repository {:?}", backend.path());
    Ok(backend.path().to_path_buf())
}

async fn open_service(config: &Config) -> Result<Service> {
    let store = JsonFileStore::new(config.state_file_path()?);
    let ledger = DeletionLedger::open(store, config.retention(), config.sync_history).await;
    let runner = GitCli::with_timeouts(config.command_timeout(), config.reflog_timeout());
    let surface = TerminalSurface::new(config.diff_tool.clone());
    Ok(RestoreService::new(runner, surface, ledger))
}

fn show_config(config: &Config, config_path: Option<&Path>, init: bool) -> Result<()> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::config_file_path()?,
    };

    if init {
        config.save_to(&config_path)?;
        println!("Configuration initialized at {:?}", config_path);
    } else {
        println!("Configuration:");
        println!("{}", toml::to_string_pretty(config)?);
        println!("\nConfig file: {:?}", config_path);
        println!("Data dir: {:?}", Config::data_dir()?);
        println!("State file: {:?}", config.state_file_path()?);
    }
    Ok(())
}

fn print_outcome(outcome: &RestoreOutcome) {
    match outcome {
        RestoreOutcome::Restored {
            branch_name,
            commit_hash,
        } => println!("Restored {} at {}", branch_name, short_hash(commit_hash)),
        RestoreOutcome::Cancelled => println!("Cancelled"),
    }
}

/// Pick a reflog candidate by name, or ask the user
async fn pick_candidate(
    service: &Service,
    candidates: Vec<ReflogCandidate>,
    branch: Option<&str>,
) -> Result<Option<ReflogCandidate>> {
    if let Some(branch) = branch {
        // Reflog is newest first, so the first match is the latest deletion
        return match candidates.into_iter().find(|c| c.branch_name == branch) {
            Some(candidate) => Ok(Some(candidate)),
            None => bail!("No deletion of '{}' found in the reflog", branch),
        };
    }

    let labels: Vec<String> = candidates.iter().map(ReflogCandidate::label).collect();
    let choice = service
        .surface()
        .choose("Deleted branches found in the reflog", &labels)
        .await?;
    Ok(choice.and_then(|i| candidates.into_iter().nth(i)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load configuration
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config, using defaults: {}", e);
        Config::default()
    });

    setup_logging(cli.debug || config.debug, config.log_file.as_deref())?;
    info!("Starting {} v{}", APP_NAME, VERSION);

    let command = match cli.command {
        Commands::Config { init } => {
            return show_config(&config, cli.config.as_deref(), init);
        }
        Commands::Ledger(command) => command,
    };

    let mut service = open_service(&config).await?;
    run_ledger_command(&mut service, command, cli.repo.as_deref(), &config).await?;

    if !service.ledger().is_persistent() {
        eprintln!("Warning: deletion history could not be saved; changes last for this session only");
    }

    Ok(())
}

async fn run_ledger_command(
    service: &mut Service,
    command: LedgerCommand,
    repo: Option<&Path>,
    config: &Config,
) -> Result<()> {
    match command {
        LedgerCommand::Delete { branch, force } => {
            let repo = resolve_repo(repo)?;
            let record = service.delete_branch(&repo, &branch, force).await?;
            println!(
                "Deleted {} (was {}). Restore with: {} restore {}",
                record.branch_name,
                record.short_hash(),
                APP_NAME,
                record.branch_name
            );
        }

        LedgerCommand::List { all } => {
            let repos = if all {
                service.ledger().repositories()
            } else {
                vec![repo_key(&resolve_repo(repo)?)]
            };

            let mut shown = 0;
            for repo in repos {
                let records = sorted_for_display(&service.ledger().list(&repo));
                if records.is_empty() {
                    continue;
                }
                if all {
                    println!("{}", repo);
                }
                for record in &records {
                    println!("  {}", record);
                }
                shown += records.len();
            }

            if shown == 0 {
                println!("No tracked deletions.");
            }
        }

        LedgerCommand::Restore { branch, commit } => {
            let repo = resolve_repo(repo)?;
            let key = repo_key(&repo);
            let record = service
                .ledger()
                .find(&key, &branch, commit.as_deref())
                .ok_or_else(|| match &commit {
                    Some(commit) => LedgerError::NotFound {
                        repo: key.clone(),
                        branch: branch.clone(),
                        commit: commit.clone(),
                    },
                    None => LedgerError::BranchNotTracked {
                        repo: key.clone(),
                        branch: branch.clone(),
                    },
                })?;

            let outcome = service
                .restore_from_history(&repo, &record.branch_name, &record.commit_hash)
                .await?;
            print_outcome(&outcome);
        }

        LedgerCommand::Scan => {
            let repo = resolve_repo(repo)?;
            let candidates = service.scan_reflog(&repo).await?;
            if candidates.is_empty() {
                println!("No deleted branches found in the reflog.");
            }
            for candidate in &candidates {
                println!("  {}", candidate.label());
            }
        }

        LedgerCommand::RestoreFromLog { branch } => {
            let repo = resolve_repo(repo)?;
            let candidates = service.scan_reflog(&repo).await?;
            if candidates.is_empty() {
                println!("No deleted branches found in the reflog.");
                return Ok(());
            }

            match pick_candidate(&service, candidates, branch.as_deref()).await? {
                Some(candidate) => {
                    let outcome = service.restore_from_reflog(&repo, &candidate).await?;
                    print_outcome(&outcome);
                }
                None => println!("Cancelled"),
            }
        }

        LedgerCommand::Remove { branch, commit } => {
            let repo = resolve_repo(repo)?;
            let key = repo_key(&repo);
            let ledger = service.ledger_mut();

            let removed = match commit {
                Some(prefix) => match ledger.find(&key, &branch, Some(prefix.as_str())) {
                    Some(record) => ledger
                        .remove(&key, &record.branch_name, &record.commit_hash)
                        .await
                        .then_some(record),
                    None => None,
                },
                None => ledger.remove_by_name(&key, &branch).await,
            };

            match removed {
                Some(record) => println!("Stopped tracking {}", record),
                None => println!("No tracked deletion of '{}'", branch),
            }
        }

        LedgerCommand::Clear { all } => {
            let (prompt, repo) = if all {
                ("Forget every tracked deletion in every repository?".to_string(), None)
            } else {
                let key = repo_key(&resolve_repo(repo)?);
                (format!("Forget every tracked deletion for {}?", key), Some(key))
            };

            if !service.surface().confirm(&prompt).await? {
                println!("Cancelled");
                return Ok(());
            }

            let removed = match repo {
                Some(key) => service.ledger_mut().clear(&key).await,
                None => service.ledger_mut().clear_all().await,
            };
            println!("Forgot {} tracked deletion(s)", removed);
        }

        LedgerCommand::Prune { days } => {
            let horizon = match days {
                Some(days) => RetentionHorizon::new(days)?,
                None => config.retention(),
            };
            let pruned = service.ledger_mut().prune_now(horizon).await;
            println!(
                "Pruned {} deletion(s) older than {} days",
                pruned,
                horizon.days()
            );
        }

        LedgerCommand::Export { file } => {
            let document = export_all(&service.ledger().snapshot());
            write_export(&file, &document).await?;
            println!(
                "Exported {} deletion(s) to {}",
                document.record_count(),
                file.display()
            );
        }

        LedgerCommand::Import { file, strategy } => {
            // Validate before asking anything so a bad file never costs a prompt
            let document = read_export(&file).await?;

            let strategy = match strategy {
                Some(strategy) => strategy,
                None => {
                    let options: Vec<String> = ImportStrategy::ALL
                        .iter()
                        .map(|s| s.describe().to_string())
                        .collect();
                    let title = format!(
                        "Import {} deletion(s) from {}",
                        document.record_count(),
                        file.display()
                    );
                    match service.surface().choose(&title, &options).await? {
                        Some(i) => ImportStrategy::ALL[i],
                        None => {
                            println!("Cancelled");
                            return Ok(());
                        }
                    }
                }
            };

            let outcome = import_all(&document, strategy, &service.ledger().snapshot());
            let pruned = service.ledger_mut().replace_all(outcome.ledger).await;
            println!("Imported {} deletion(s) ({})", outcome.added, strategy);
            if pruned > 0 {
                println!(
                    "Dropped {} imported deletion(s) older than {} days",
                    pruned,
                    service.ledger().horizon().days()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_not_a_ledger_command() {
        let cli = Cli::try_parse_from(["git-revive", "config", "--init"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { init: true }));
    }

    #[test]
    fn test_ledger_commands_parse_at_top_level() {
        let cli = Cli::try_parse_from(["git-revive", "list", "--all"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ledger(LedgerCommand::List { all: true })
        ));

        let cli = Cli::try_parse_from(["git-revive", "import", "h.json", "-s", "merge"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ledger(LedgerCommand::Import {
                strategy: Some(ImportStrategy::Merge),
                ..
            })
        ));
    }
}
