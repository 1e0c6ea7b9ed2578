mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfsync_core::{
    load_config, matching, metrics, validate_config, CatalogId, CatalogService, Config,
    JsonBackupStore, LibraryStore, ListStatus, MalClient, MatchStatus, ReconcileConfig,
    ReconcileError, ReconciliationSession, SanitizedConfig, TrackingUpdate,
};

use console::{print_items, ConsoleListener};

#[derive(Parser)]
#[command(name = "shelfsync")]
#[command(about = "Match a manga library backup against MyAnimeList and sync tracking links")]
#[command(version)]
struct Cli {
    /// Config file (default: $SHELFSYNC_CONFIG or shelfsync.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match untracked library entries and optionally commit the matches
    Reconcile {
        /// Library backup (default: library.backup_path from the config)
        backup: Option<PathBuf>,

        /// Add the selected matches to the list and save the backup
        #[arg(long)]
        commit: bool,

        /// Manually match a title to a catalog ID. Repeatable.
        #[arg(long, value_name = "TITLE=ID")]
        assign: Vec<String>,

        /// Leave fuzzy matches unselected
        #[arg(long)]
        deselect_fuzzy: bool,

        /// Print Prometheus metrics when done
        #[arg(long)]
        metrics: bool,
    },

    /// Search the catalog for a title
    Search {
        title: String,

        /// Number of results
        #[arg(long, short = 'n', default_value_t = 5)]
        limit: u32,
    },

    /// Show a catalog entry
    Details { id: CatalogId },

    /// Update the list status of a tracked entry
    Update {
        id: CatalogId,

        /// reading, completed, on_hold, dropped or plan_to_read
        #[arg(long)]
        status: Option<ListStatus>,

        /// Chapters read
        #[arg(long)]
        chapters: Option<u32>,

        /// Score from 0 to 10
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
        score: Option<u8>,

        /// Also update the link in this backup
        #[arg(long)]
        backup: Option<PathBuf>,
    },

    /// Print the effective configuration with credentials redacted
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| {
        std::env::var("SHELFSYNC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("shelfsync.toml"))
    });
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    if let Commands::Config = cli.command {
        let sanitized = SanitizedConfig::from(&config);
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    validate_config(&config).context("Configuration validation failed")?;
    let catalog: Arc<dyn CatalogService> = Arc::new(
        MalClient::new(config.catalog.clone()).context("Failed to create catalog client")?,
    );

    match cli.command {
        Commands::Reconcile {
            backup,
            commit,
            assign,
            deselect_fuzzy,
            metrics,
        } => {
            let backup = backup
                .or_else(|| config.library.backup_path.clone())
                .context("No backup given and library.backup_path is not set")?;
            reconcile(&config, catalog, &backup, commit, &assign, deselect_fuzzy).await?;
            if metrics {
                print!("{}", metrics::encode_metrics());
            }
        }
        Commands::Search { title, limit } => search(catalog.as_ref(), &title, limit).await?,
        Commands::Details { id } => {
            let details = catalog
                .get_details(id)
                .await
                .with_context(|| format!("Failed to fetch manga {}", id))?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Commands::Update {
            id,
            status,
            chapters,
            score,
            backup,
        } => {
            let update = TrackingUpdate {
                status,
                chapters_read: chapters,
                score,
            };
            update_tracking(&config, catalog.as_ref(), id, &update, backup.as_deref()).await?;
        }
        Commands::Config => {}
    }

    Ok(())
}

async fn reconcile(
    config: &Config,
    catalog: Arc<dyn CatalogService>,
    backup: &Path,
    commit: bool,
    assignments: &[String],
    deselect_fuzzy: bool,
) -> Result<()> {
    let assignments = parse_assignments(assignments)?;

    let library = Arc::new(
        JsonBackupStore::open(backup)
            .with_context(|| format!("Failed to load backup {:?}", backup))?,
    );
    let mut session = ReconciliationSession::open(
        ReconcileConfig::from_config(config),
        Arc::clone(&catalog),
        library,
        Arc::new(ConsoleListener),
    )?;
    info!("Session {}: {} untracked entries", session.id(), session.items().len());

    if session.items().is_empty() {
        println!("Every library entry is already tracked.");
        return Ok(());
    }

    let handle = session.handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current batch");
            handle.close();
        }
    });

    let summary = session.start_matching().await?;
    if summary.cancelled {
        print_items(session.items());
        bail!("Matching interrupted after {}/{} items", summary.processed, summary.total);
    }

    for (title, catalog_id) in assignments {
        let id = session
            .find_item(&title)
            .with_context(|| format!("No untracked entry titled '{}'", title))?;
        session
            .select_catalog_id(id, catalog_id)
            .await
            .with_context(|| format!("Failed to assign '{}' to {}", title, catalog_id))?;
    }

    if deselect_fuzzy {
        let fuzzy: Vec<_> = session
            .items()
            .iter()
            .filter(|i| i.status == MatchStatus::FuzzyMatched)
            .map(|i| i.id)
            .collect();
        for id in fuzzy {
            session.toggle_selection(id, false)?;
        }
    }

    print_items(session.items());
    let selected = session.items().iter().filter(|i| i.is_committable()).count();

    if !commit {
        println!("\n{} matches selected. Run again with --commit to track them.", selected);
        return Ok(());
    }

    match session.track_selected().await {
        Ok(Some(outcome)) => {
            print_items(session.items());
            println!(
                "\nTracked {} of {} selected entries.",
                outcome.tracked,
                outcome.tracked + outcome.failed
            );
            Ok(())
        }
        Ok(None) => {
            println!("\nNothing selected to track.");
            Ok(())
        }
        Err(ReconcileError::PersistenceFailed(e)) => {
            print_items(session.items());
            Err(e).with_context(|| {
                format!(
                    "Entries were added to the list but {:?} could not be saved",
                    backup
                )
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_assignments(raw: &[String]) -> Result<Vec<(String, CatalogId)>> {
    raw.iter()
        .map(|arg| {
            let (title, id) = arg
                .rsplit_once('=')
                .with_context(|| format!("Expected TITLE=ID, got '{}'", arg))?;
            let id = id
                .trim()
                .parse::<CatalogId>()
                .with_context(|| format!("Invalid catalog ID in '{}'", arg))?;
            Ok((title.trim().to_string(), id))
        })
        .collect()
}

async fn search(catalog: &dyn CatalogService, title: &str, limit: u32) -> Result<()> {
    let candidates = catalog
        .search(title, limit)
        .await
        .with_context(|| format!("Search for '{}' failed", title))?;

    if candidates.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for candidate in &candidates {
        let scored = matching::score_candidate(title, candidate);
        println!(
            "{:>8}  {:>3}  {:<8} {}",
            candidate.id,
            scored.score,
            matching::classify(scored.score).as_str(),
            candidate.title
        );
        if scored.matched_title != candidate.title {
            println!("{:>24} via \"{}\"", "", scored.matched_title);
        }
    }
    Ok(())
}

async fn update_tracking(
    config: &Config,
    catalog: &dyn CatalogService,
    id: CatalogId,
    update: &TrackingUpdate,
    backup: Option<&Path>,
) -> Result<()> {
    if update == &TrackingUpdate::default() {
        bail!("Nothing to update: pass --status, --chapters or --score");
    }

    catalog
        .update_tracking_status(id, update)
        .await
        .with_context(|| format!("Failed to update manga {}", id))?;
    println!("Updated manga {} on the list.", id);

    if let Some(backup) = backup {
        let library = JsonBackupStore::open(backup)
            .with_context(|| format!("Failed to load backup {:?}", backup))?;
        let changed = library
            .update_tracking(config.library.target_source_id, id, update)
            .with_context(|| format!("Manga {} is not tracked in {:?}", id, backup))?;
        library.persist().context("Failed to save backup")?;
        println!("Updated {} tracking record(s) in {:?}.", changed, backup);
    }
    Ok(())
}
