//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use collegecms_core::{
    CancelToken, EditTarget, JsonFileFeed, MigrationReport, ProgressReporter, RecordOutcome,
    SourceFeed, apply_section_edit, migrate_feed, migrate_one, migrate_staged,
};
use collegecms_shared::{
    AppConfig, CourseId, InstitutionId, MigrationConfig, Section, init_config, load_config,
};
use collegecms_storage::{CanonicalStore, StagedStatus, Storage};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// collegecms — scraped college data in, canonical CMS records out.
#[derive(Parser)]
#[command(
    name = "collegecms",
    version,
    about = "Normalize scraped college records and merge them into the canonical content model.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides `[storage] database_path`).
    #[arg(long, global = true, env = "COLLEGECMS_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Load a JSON array or JSON Lines file into the staging collection.
    Stage {
        /// File of scraped documents.
        file: PathBuf,

        /// Source URL recorded on every staged document.
        #[arg(long)]
        source_url: Option<String>,
    },

    /// Migrate scraped documents into the canonical collection.
    Migrate {
        /// Read documents from this file instead of the staging collection.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Records in flight at once (overrides `[migration] workers`).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Also re-migrate staged documents already marked migrated.
        #[arg(long)]
        all: bool,
    },

    /// Migrate one staged document by its staging id.
    MigrateOne {
        /// Staging id.
        id: String,
    },

    /// Print a canonical institution as JSON.
    Show {
        /// Surrogate id.
        id: InstitutionId,
    },

    /// List canonical institutions.
    List,

    /// Replace one content section with a manually edited one.
    EditSection {
        /// Institution surrogate id.
        id: InstitutionId,

        /// Section name (e.g. `placement`, `faq`).
        section: String,

        /// JSON file holding `{ "title": ..., "blocks": [...] }`.
        file: PathBuf,

        /// Edit this course's content instead of the institution's.
        #[arg(long)]
        course: Option<i64>,
    },

    /// Inspect or patch the staging collection.
    Staged {
        #[command(subcommand)]
        action: StagedAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Staging subcommands.
#[derive(Subcommand)]
pub(crate) enum StagedAction {
    /// List staged documents.
    List {
        /// Only documents with this status (draft, migrated, failed).
        #[arg(long)]
        status: Option<String>,
    },
    /// Set one field of a staged document.
    Set {
        /// Staging id.
        id: String,
        /// Dotted field path, e.g. `courses.0.fees`.
        path: String,
        /// New value as JSON; anything that is not valid JSON is stored as a string.
        value: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "collegecms=info",
        1 => "collegecms=debug",
        _ => "collegecms=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Stage { file, source_url } => {
            cmd_stage(db, &file, source_url.as_deref()).await
        }
        Command::Migrate { file, workers, all } => {
            cmd_migrate(db, file.as_deref(), workers, all).await
        }
        Command::MigrateOne { id } => cmd_migrate_one(db, &id).await,
        Command::Show { id } => cmd_show(db, id).await,
        Command::List => cmd_list(db).await,
        Command::EditSection {
            id,
            section,
            file,
            course,
        } => cmd_edit_section(db, id, &section, &file, course).await,
        Command::Staged { action } => match action {
            StagedAction::List { status } => cmd_staged_list(db, status.as_deref()).await,
            StagedAction::Set { id, path, value } => {
                cmd_staged_set(db, &id, &path, &value).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Resolve the database path: `--db` wins over the config file.
fn database_path(db: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => Ok(config.database_path()?),
    }
}

async fn open_storage(db: Option<PathBuf>) -> Result<(AppConfig, Storage)> {
    let config = load_config()?;
    let path = database_path(db, &config)?;
    info!(path = %path.display(), "opening database");
    let storage = Storage::open(&path).await?;
    Ok((config, storage))
}

async fn open_storage_readonly(db: Option<PathBuf>) -> Result<Storage> {
    let config = load_config()?;
    let path = database_path(db, &config)?;
    Ok(Storage::open_readonly(&path).await?)
}

/// Parse a CLI-supplied value as JSON, falling back to a plain string.
fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_stage(db: Option<PathBuf>, file: &Path, source_url: Option<&str>) -> Result<()> {
    let (_config, storage) = open_storage(db).await?;
    let feed = JsonFileFeed::new(file);
    let records = feed.records().await?;

    info!(file = %file.display(), count = records.len(), "staging documents");
    for record in &records {
        storage
            .stage_record(record.record.as_value(), source_url)
            .await?;
    }

    println!("Staged {} document(s) from {}", records.len(), file.display());
    Ok(())
}

async fn cmd_migrate(
    db: Option<PathBuf>,
    file: Option<&Path>,
    workers: Option<usize>,
    all: bool,
) -> Result<()> {
    let (config, storage) = open_storage(db).await?;
    let mut migration = MigrationConfig::from(&config);
    if let Some(workers) = workers {
        migration.workers = workers.max(1);
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight records");
                cancel.cancel();
            }
        });
    }

    let reporter = Arc::new(CliProgress::new());
    let storage = Arc::new(storage);
    let report = match file {
        Some(path) => {
            let feed = JsonFileFeed::new(path);
            let store: Arc<dyn CanonicalStore> = storage.clone();
            migrate_feed(&feed, store, &migration, &cancel, reporter).await?
        }
        None => migrate_staged(storage, all, &migration, &cancel, reporter).await?,
    };

    print_report(&report);
    if !report.failed.is_empty() {
        return Err(eyre!("{} record(s) failed to migrate", report.failed.len()));
    }
    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!();
    println!("  Migration finished");
    println!("  Total:     {}", report.total);
    println!("  Created:   {}", report.created);
    println!("  Updated:   {}", report.updated);
    println!("  Unchanged: {}", report.unchanged);
    println!("  Failed:    {}", report.failed.len());
    if report.skipped > 0 {
        println!("  Skipped:   {} (cancelled)", report.skipped);
    }
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    for failed in &report.failed {
        println!("    ✗ {} {}: {}", failed.source_key, failed.identity, failed.error);
    }
    println!();
}

async fn cmd_migrate_one(db: Option<PathBuf>, id: &str) -> Result<()> {
    let (config, storage) = open_storage(db).await?;
    let outcome = migrate_one(&storage, id, &MigrationConfig::from(&config)).await?;
    match outcome {
        RecordOutcome::Upserted { id, key, change } => {
            println!("{} {key} as id {id}", change.as_str());
            Ok(())
        }
        RecordOutcome::Failed { identity, error } => {
            Err(eyre!("migration of {identity} failed: {error}"))
        }
    }
}

async fn cmd_show(db: Option<PathBuf>, id: InstitutionId) -> Result<()> {
    let storage = open_storage_readonly(db).await?;
    let institution = storage
        .find_by_id(id)
        .await?
        .ok_or_else(|| eyre!("no institution with id {id}"))?;
    println!("{}", serde_json::to_string_pretty(&institution)?);
    Ok(())
}

async fn cmd_list(db: Option<PathBuf>) -> Result<()> {
    let storage = open_storage_readonly(db).await?;
    let rows = storage.list_institutions().await?;
    if rows.is_empty() {
        println!("No institutions yet.");
        return Ok(());
    }
    for row in rows {
        println!("{:>20}  {}  ({})", row.id, row.name, row.location);
    }
    Ok(())
}

async fn cmd_edit_section(
    db: Option<PathBuf>,
    id: InstitutionId,
    section_name: &str,
    file: &Path,
    course: Option<i64>,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let section: Section = serde_json::from_str(&text)
        .map_err(|e| eyre!("'{}' is not a valid section: {e}", file.display()))?;

    let target = match course {
        Some(course_id) => EditTarget::Course(CourseId(course_id)),
        None => EditTarget::Institution,
    };

    let (_config, storage) = open_storage(db).await?;
    apply_section_edit(&storage, id, target, section_name, section).await?;
    println!("Saved section '{section_name}' of institution {id}");
    Ok(())
}

async fn cmd_staged_list(db: Option<PathBuf>, status: Option<&str>) -> Result<()> {
    let status = status.map(str::parse::<StagedStatus>).transpose()?;
    let storage = open_storage_readonly(db).await?;
    let staged = storage.list_staged(status).await?;
    if staged.is_empty() {
        println!("Staging collection is empty.");
        return Ok(());
    }
    for record in staged {
        let doc = record.document.as_value();
        let name = doc
            .get("full_name")
            .or_else(|| doc.get("college_name"))
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        println!("{}  {:<8}  {name}", record.id, record.status);
    }
    Ok(())
}

async fn cmd_staged_set(db: Option<PathBuf>, id: &str, path: &str, raw: &str) -> Result<()> {
    let (_config, storage) = open_storage(db).await?;
    storage
        .update_staged_field(id, path, parse_cli_value(raw))
        .await?;
    println!("Updated {path} on {id}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("Migrating");
    }

    fn record_done(&self, source_key: &str, outcome: &RecordOutcome) {
        self.bar.inc(1);
        match outcome {
            RecordOutcome::Upserted { key, change, .. } => {
                self.bar.set_message(format!("{} {key}", change.as_str()));
            }
            RecordOutcome::Failed { identity, .. } => {
                self.bar.set_message(format!("failed {source_key} {identity}"));
            }
        }
    }

    fn done(&self, _report: &MigrationReport) {
        self.bar.finish_and_clear();
    }
}
