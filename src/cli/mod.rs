//! Command-line interface for the janitor.
//!
//! Provides commands for scanning the library, inspecting usage and
//! signatures, deleting single items, bulk purges and importing snapshots.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{self, ResolvedConfig};
use crate::core::{
    parse_item_id, ActionResponse, BulkAction, BulkReport, BulkStatus, ItemFilter, Janitor, Statistics,
    UsageClassifier,
};
use crate::domain::{LibraryItem, UsageExt};
use crate::store::{ContentStore, MemoryStore, Snapshot, SqliteStore};

/// janitor - Find and safely delete unused layout library items
#[derive(Parser, Debug)]
#[command(name = "janitor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Operate on a JSON snapshot instead of the SQLite database
    #[arg(long, global = true, env = "JANITOR_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List library items with their usage
    Scan {
        /// Which items to show
        #[arg(short, long, value_enum, default_value = "all")]
        filter: FilterArg,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show library statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Show where one item is used
    Usage {
        /// Library item ID
        id: String,
    },

    /// Show the signatures extracted from an item's content
    Signatures {
        /// Library item ID
        id: String,
    },

    /// Delete one library item
    Delete {
        /// Library item ID
        id: String,

        /// Delete even if copies of the item exist
        #[arg(short, long)]
        force: bool,

        /// Print the JSON action response
        #[arg(long)]
        json: bool,
    },

    /// Delete every item matching a category
    Purge {
        #[arg(value_enum)]
        action: PurgeArg,

        /// Only list what would be deleted
        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        json: bool,
    },

    /// Load a JSON snapshot into the SQLite database
    Import {
        /// Snapshot file
        file: PathBuf,
    },

    /// Show resolved configuration
    Config,
}

/// Item filter for CLI (maps to ItemFilter)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FilterArg {
    All,
    Used,
    Global,
    Safe,
    Unused,
    Copies,
}

impl From<FilterArg> for ItemFilter {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::All => ItemFilter::All,
            FilterArg::Used => ItemFilter::Used,
            FilterArg::Global => ItemFilter::Global,
            FilterArg::Safe => ItemFilter::Safe,
            FilterArg::Unused => ItemFilter::Unused,
            FilterArg::Copies => ItemFilter::Copies,
        }
    }
}

/// Bulk action for CLI (maps to BulkAction)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PurgeArg {
    /// Items nothing uses
    Unused,

    /// Items used only through copies
    Copies,

    /// Unused and copy-only items
    Safe,
}

impl From<PurgeArg> for BulkAction {
    fn from(a: PurgeArg) -> Self {
        match a {
            PurgeArg::Unused => BulkAction::Unused,
            PurgeArg::Copies => BulkAction::Copies,
            PurgeArg::Safe => BulkAction::Safe,
        }
    }
}

/// The store a command runs against
enum Backend {
    Snapshot {
        path: PathBuf,
        site_url: Option<String>,
        store: MemoryStore,
    },
    Sqlite(SqliteStore),
}

impl Backend {
    async fn open(snapshot: Option<&Path>, cfg: &ResolvedConfig) -> Result<Self> {
        match snapshot {
            Some(path) => {
                let snapshot = Snapshot::load(path).await?;
                let site_url = snapshot.site_url.clone().or_else(|| cfg.site_url.clone());
                let links = cfg.links();
                let store = if snapshot.site_url.is_some() {
                    MemoryStore::from_snapshot(snapshot)
                } else {
                    MemoryStore::from_snapshot(snapshot).with_links(links)
                };

                Ok(Backend::Snapshot {
                    path: path.to_path_buf(),
                    site_url,
                    store,
                })
            }
            None => {
                let store = SqliteStore::open(&cfg.database)
                    .with_context(|| {
                        format!("Failed to open database: {}", cfg.database.display())
                    })?
                    .with_links(cfg.links());
                Ok(Backend::Sqlite(store))
            }
        }
    }

    fn store(&self) -> &dyn ContentStore {
        match self {
            Backend::Snapshot { store, .. } => store,
            Backend::Sqlite(store) => store,
        }
    }

    /// Write snapshot changes back to disk (SQLite writes through)
    async fn persist(&self) -> Result<()> {
        if let Backend::Snapshot {
            path,
            site_url,
            store,
        } = self
        {
            store.to_snapshot(site_url.clone())?.save(path).await?;
        }
        Ok(())
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;
        let snapshot = self.snapshot.as_deref();

        match self.command {
            Commands::Scan { filter, json } => scan(snapshot, cfg, filter.into(), json).await,
            Commands::Stats { json } => show_stats(snapshot, cfg, json).await,
            Commands::Usage { id } => show_usage(snapshot, cfg, &id).await,
            Commands::Signatures { id } => show_signatures(snapshot, cfg, &id).await,
            Commands::Delete { id, force, json } => {
                delete(snapshot, cfg, &id, force, json).await
            }
            Commands::Purge {
                action,
                dry_run,
                json,
            } => purge(snapshot, cfg, action.into(), dry_run, json).await,
            Commands::Import { file } => import(snapshot, cfg, &file).await,
            Commands::Config => show_config(cfg),
        }
    }
}

fn truncate(title: &str, max: usize) -> String {
    if title.chars().count() > max {
        let cut: String = title.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    }
}

fn usage_label(item: &LibraryItem) -> String {
    let usage = item.usage.as_slice();
    if usage.is_empty() {
        "unused".to_string()
    } else if usage.has_global_usage() {
        format!("{} global, {} copies", usage.global_count(), usage.copy_count())
    } else {
        format!("{} copies", usage.copy_count())
    }
}

fn print_items(items: &[LibraryItem]) {
    println!("{:<8} {:<9} {:<50} {:<20}", "ID", "KIND", "TITLE", "USAGE");
    println!("{}", "-".repeat(90));

    for item in items {
        println!(
            "{:<8} {:<9} {:<50} {:<20}",
            item.id,
            item.kind.to_string(),
            truncate(&item.title, 50),
            usage_label(item)
        );
    }
}

/// List library items with their usage
async fn scan(
    snapshot: Option<&Path>,
    cfg: &ResolvedConfig,
    filter: ItemFilter,
    json: bool,
) -> Result<()> {
    let backend = Backend::open(snapshot, cfg).await?;
    let classifier = cfg.classifier();
    let janitor = Janitor::new(backend.store(), &classifier);

    let items = filter.apply(janitor.scan()?);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No library items match filter: {}", filter);
        return Ok(());
    }

    print_items(&items);
    println!("\nTotal: {} items ({})", items.len(), filter);

    Ok(())
}

fn print_stats(stats: &Statistics) {
    println!("Library items:    {}", stats.total);
    println!("  Used:           {}", stats.used);
    println!("  Unused:         {}", stats.unused);
    println!("  Copies only:    {}", stats.copies_only);
    println!("  Global refs:    {}", stats.with_global);
    println!("  Safe to delete: {}", stats.safe_to_delete);
    println!();
    println!("Occurrences:");
    println!("  Global references: {}", stats.global_refs);
    println!("  Copies:            {}", stats.copies);

    if !stats.by_kind.is_empty() {
        println!();
        println!("By kind:");
        for (kind, count) in &stats.by_kind {
            println!("  {:<9} {}", kind.to_string(), count);
        }
    }
}

/// Show library statistics
async fn show_stats(snapshot: Option<&Path>, cfg: &ResolvedConfig, json: bool) -> Result<()> {
    let backend = Backend::open(snapshot, cfg).await?;
    let classifier = cfg.classifier();
    let stats = Janitor::new(backend.store(), &classifier).statistics()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }

    Ok(())
}

/// Show where one item is used
async fn show_usage(snapshot: Option<&Path>, cfg: &ResolvedConfig, raw_id: &str) -> Result<()> {
    let id = parse_item_id(raw_id)?;
    let backend = Backend::open(snapshot, cfg).await?;
    let classifier = cfg.classifier();

    let item = Janitor::new(backend.store(), &classifier)
        .item(id)?
        .ok_or_else(|| anyhow::anyhow!("Record {} is not a library item", id))?;

    println!("{} (ID {}, {})", item.title, item.id, item.kind);
    if item.is_global {
        println!("Marked as a global item");
    }

    if item.usage.is_empty() {
        println!("\nNot used anywhere. Safe to delete.");
        return Ok(());
    }

    println!();
    println!("{:<8} {:<8} {:<10} {:<40}", "ID", "USAGE", "STATUS", "TITLE");
    println!("{}", "-".repeat(70));
    for usage in &item.usage {
        println!(
            "{:<8} {:<8} {:<10} {:<40}",
            usage.id,
            usage.usage_type.to_string(),
            usage.status.to_string(),
            truncate(&usage.title, 40)
        );
        println!("         edit: {}", usage.edit_link);
        println!("         view: {}", usage.view_link);
    }

    Ok(())
}

/// Show the signatures extracted from an item's content
async fn show_signatures(
    snapshot: Option<&Path>,
    cfg: &ResolvedConfig,
    raw_id: &str,
) -> Result<()> {
    let id = parse_item_id(raw_id)?;
    let backend = Backend::open(snapshot, cfg).await?;

    let record = backend
        .store()
        .get_record(id)?
        .filter(|r| r.is_library_item())
        .ok_or_else(|| anyhow::anyhow!("Record {} is not a library item", id))?;

    let classifier: UsageClassifier = cfg.classifier();
    let signatures = classifier.extractor().extract(&record.body);

    if signatures.is_empty() {
        println!("No signatures in \"{}\"; copies of it cannot be detected", record.title);
        return Ok(());
    }

    println!("Signatures of \"{}\":", record.title);
    for signature in signatures.iter() {
        println!("  {}", signature);
    }

    Ok(())
}

/// Delete one library item
async fn delete(
    snapshot: Option<&Path>,
    cfg: &ResolvedConfig,
    raw_id: &str,
    force: bool,
    json: bool,
) -> Result<()> {
    let backend = Backend::open(snapshot, cfg).await?;
    let classifier = cfg.classifier();
    let janitor = Janitor::new(backend.store(), &classifier).with_options(cfg.delete_options());

    let result = parse_item_id(raw_id).and_then(|id| janitor.delete_item(id, force));
    if result.is_ok() {
        backend.persist().await?;
    }

    let response = ActionResponse::from(&result);
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.success {
        println!("{}", response.message);
    }

    delete_outcome(&response)
}

/// Exit status of a delete: failures exit non-zero in every output mode
fn delete_outcome(response: &ActionResponse) -> Result<()> {
    if !response.success {
        anyhow::bail!("{}", response.message);
    }
    Ok(())
}

/// Delete every item matching a category
async fn purge(
    snapshot: Option<&Path>,
    cfg: &ResolvedConfig,
    action: BulkAction,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let backend = Backend::open(snapshot, cfg).await?;
    let classifier = cfg.classifier();
    let janitor = Janitor::new(backend.store(), &classifier).with_options(cfg.delete_options());

    if dry_run {
        let planned = janitor.plan_bulk(action)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&planned)?);
        } else if planned.is_empty() {
            println!("No {} items to delete", action);
        } else {
            println!("Would delete {} item(s):\n", planned.len());
            print_items(&planned);
        }
        return Ok(());
    }

    let report = janitor.run_bulk(action);
    if report.deleted_count > 0 {
        backend.persist().await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.message());
        for error in &report.errors {
            eprintln!("  {}", error);
        }
    }

    purge_outcome(&report)
}

/// Exit status of a bulk run: only `Failed` exits non-zero
fn purge_outcome(report: &BulkReport) -> Result<()> {
    if report.status == BulkStatus::Failed {
        anyhow::bail!("Bulk {} failed", report.action);
    }
    Ok(())
}

/// Load a JSON snapshot into the SQLite database
async fn import(snapshot: Option<&Path>, cfg: &ResolvedConfig, file: &Path) -> Result<()> {
    if snapshot.is_some() {
        anyhow::bail!("import writes to the SQLite database; drop --snapshot");
    }

    let loaded = Snapshot::load(file).await?;
    let mut store = SqliteStore::open(&cfg.database)
        .with_context(|| format!("Failed to open database: {}", cfg.database.display()))?;

    let count = store.import(&loaded.records)?;
    println!(
        "Imported {} record(s) into {} ({} total)",
        count,
        cfg.database.display(),
        store.count()?
    );

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("Janitor Configuration");
    println!("{}", "=".repeat(40));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Store:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!(
        "  Site URL: {}",
        cfg.site_url.as_deref().unwrap_or("(default)")
    );
    println!();
    println!("Scan scope:");
    println!("  Content types: {}", cfg.scope.content_types().join(", "));
    let statuses: Vec<String> = cfg.scope.statuses().iter().map(|s| s.to_string()).collect();
    println!("  Statuses:      {}", statuses.join(", "));
    println!();
    println!("Signatures:");
    println!("  module_id:    {}", cfg.limits.module_ids);
    println!("  module_class: {}", cfg.limits.module_classes);
    println!("  admin_label:  {}", cfg.limits.admin_labels);
    println!("  *_id:         {}", cfg.limits.generic_ids);
    println!("  Min label length: {}", cfg.limits.min_label_length);
    println!();
    println!("Copy thresholds:");
    println!("  Min matches: {}", cfg.thresholds.min_matches);
    println!("  Min ratio:   {}", cfg.thresholds.min_ratio);
    println!();
    println!("Delete: {}", if cfg.permanent { "permanent" } else { "move to trash" });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long library title", 10), "a very ...");
        assert_eq!(truncate("éééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "janitor",
            "--snapshot",
            "site.json",
            "purge",
            "safe",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.snapshot, Some(PathBuf::from("site.json")));
        assert!(matches!(
            cli.command,
            Commands::Purge {
                action: PurgeArg::Safe,
                dry_run: true,
                json: false
            }
        ));

        let cli = Cli::try_parse_from(["janitor", "delete", "12", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { force: true, .. }));
    }

    #[test]
    fn test_failed_delete_exits_with_error() {
        use crate::core::DeleteError;
        use crate::domain::RecordId;

        let id = RecordId::new(10).unwrap();
        let blocked = ActionResponse::failed(&DeleteError::BlockedByGlobalReference {
            id,
            title: "Footer".to_string(),
            references: 1,
        });
        let err = delete_outcome(&blocked).unwrap_err();
        assert!(err.to_string().contains("Footer"));

        let invalid = ActionResponse::failed(&parse_item_id("abc").unwrap_err());
        assert!(delete_outcome(&invalid).is_err());
    }

    #[test]
    fn test_only_failed_purge_exits_with_error() {
        let report = |status: BulkStatus, deleted_count: usize, failed_count: usize| BulkReport {
            action: BulkAction::Safe,
            status,
            deleted_count,
            failed_count,
            deleted_ids: Vec::new(),
            errors: Vec::new(),
        };

        assert!(purge_outcome(&report(BulkStatus::NothingToDelete, 0, 0)).is_ok());
        assert!(purge_outcome(&report(BulkStatus::Success, 2, 0)).is_ok());
        assert!(purge_outcome(&report(BulkStatus::Partial, 1, 1)).is_ok());

        let err = purge_outcome(&report(BulkStatus::Failed, 0, 2)).unwrap_err();
        assert_eq!(err.to_string(), "Bulk safe failed");
    }
}
