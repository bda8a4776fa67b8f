//! Configuration for the janitor.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (JANITOR_HOME, JANITOR_DATABASE)
//! 2. Config file (.janitor/config.yaml)
//! 3. Defaults (~/.janitor)
//!
//! Config file discovery:
//! - Searches current directory and parents for .janitor/config.yaml
//! - The database path is relative to the project root (the parent of .janitor/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{CopyThresholds, SearchScope, SignatureLimits, UsageClassifier};
use crate::domain::{RecordStatus, SiteLinks};
use crate::store::DeleteOptions;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".janitor";
const DEFAULT_DATABASE: &str = "content.db";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub signatures: SignatureLimits,
    #[serde(default)]
    pub thresholds: CopyThresholds,
    #[serde(default)]
    pub delete: Option<DeleteConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// SQLite database (relative to the project root)
    pub database: Option<String>,
    /// Base URL for edit/view links
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanConfig {
    /// Replaces the baseline content types (page, post)
    pub content_types: Option<Vec<String>>,
    /// Added to the content types
    #[serde(default)]
    pub extra_content_types: Vec<String>,
    /// Replaces the default statuses (everything but trash)
    pub statuses: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteConfig {
    pub permanent: Option<bool>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to janitor home
    pub home: PathBuf,
    /// SQLite content database
    pub database: PathBuf,
    /// Base URL for edit/view links
    pub site_url: Option<String>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Which records are searched for usage
    pub scope: SearchScope,
    pub limits: SignatureLimits,
    pub thresholds: CopyThresholds,
    /// Remove deleted items instead of trashing them
    pub permanent: bool,
}

impl ResolvedConfig {
    /// Build a classifier from these settings
    pub fn classifier(&self) -> UsageClassifier {
        UsageClassifier::new(self.limits.clone(), self.scope.clone(), self.thresholds)
    }

    pub fn delete_options(&self) -> DeleteOptions {
        DeleteOptions {
            permanent: self.permanent,
            ..Default::default()
        }
    }

    pub fn links(&self) -> SiteLinks {
        self.site_url
            .as_deref()
            .map(SiteLinks::new)
            .unwrap_or_default()
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn parse_statuses(raw: &[String]) -> Result<Vec<RecordStatus>> {
    raw.iter()
        .map(|s| s.parse::<RecordStatus>())
        .collect::<Result<Vec<_>>>()
        .context("Invalid scan.statuses")
}

fn build_scope(scan: &ScanConfig) -> Result<SearchScope> {
    let statuses = match &scan.statuses {
        Some(raw) => parse_statuses(raw)?,
        None => RecordStatus::LIVE.to_vec(),
    };

    let scope = match &scan.content_types {
        Some(types) => SearchScope::new(types, statuses),
        None => SearchScope::new(crate::core::classifier::BASELINE_CONTENT_TYPES, statuses),
    };

    Ok(scope.with_extra_types(&scan.extra_content_types))
}

/// Resolve configuration from an optional config file plus the environment
fn resolve(config_file: Option<PathBuf>) -> Result<ResolvedConfig> {
    // Default home directory
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let home = std::env::var("JANITOR_HOME")
        .map(PathBuf::from)
        .unwrap_or(default_home);

    let Some(config_path) = config_file else {
        let database = std::env::var("JANITOR_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(DEFAULT_DATABASE));

        return Ok(ResolvedConfig {
            home,
            database,
            site_url: None,
            config_file: None,
            scope: SearchScope::default(),
            limits: SignatureLimits::default(),
            thresholds: CopyThresholds::default(),
            permanent: true,
        });
    };

    let config = load_config_file(&config_path)?;

    // Project root is the parent of .janitor/
    let base_dir = config_path
        .parent()
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."));

    let database = if let Ok(env_db) = std::env::var("JANITOR_DATABASE") {
        PathBuf::from(env_db)
    } else if let Some(ref db_path) = config.store.database {
        resolve_path(base_dir, db_path)
    } else {
        home.join(DEFAULT_DATABASE)
    };

    let scope = build_scope(&config.scan)
        .with_context(|| format!("In config file: {}", config_path.display()))?;

    let permanent = config
        .delete
        .as_ref()
        .and_then(|d| d.permanent)
        .unwrap_or(true);

    Ok(ResolvedConfig {
        home,
        database,
        site_url: config.store.site_url,
        config_file: Some(config_path),
        scope,
        limits: config.signatures,
        thresholds: config.thresholds,
        permanent,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    resolve(find_config_file())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Load configuration from a specific config file
pub fn config_from_file(path: &Path) -> Result<ResolvedConfig> {
    resolve(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, yaml: &str) -> PathBuf {
        let dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None).unwrap();

        assert!(config.config_file.is_none());
        assert!(config.permanent);
        assert_eq!(config.scope, SearchScope::default());
        assert_eq!(config.thresholds, CopyThresholds::default());
        if std::env::var("JANITOR_DATABASE").is_err() {
            assert_eq!(config.database, config.home.join(DEFAULT_DATABASE));
        }
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
store:
  database: data/site.db
  site_url: https://example.com/
scan:
  extra_content_types: [project, post]
  statuses: [publish, draft]
signatures:
  admin_labels: 1
  min_label_length: 5
thresholds:
  min_matches: 3
delete:
  permanent: false
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        assert_eq!(file.version, "1.0");
        assert_eq!(file.signatures.admin_labels, 1);
        assert_eq!(file.signatures.module_ids, 3);
        assert_eq!(file.thresholds.min_ratio, 0.5);

        let config = config_from_file(&config_path).unwrap();
        assert_eq!(config.scope.content_types(), ["page", "post", "project"]);
        assert_eq!(
            config.scope.statuses(),
            [RecordStatus::Publish, RecordStatus::Draft]
        );
        assert_eq!(config.thresholds.min_matches, 3);
        assert!(!config.permanent);
        assert!(!config.delete_options().permanent);
        assert_eq!(config.links().view_link(crate::domain::RecordId::new(3).unwrap()), "https://example.com/?p=3");
        if std::env::var("JANITOR_DATABASE").is_err() {
            assert_eq!(config.database, temp.path().join("data/site.db"));
        }
    }

    #[test]
    fn test_invalid_status_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
scan:
  statuses: [publish, archived]
"#,
        );

        let err = config_from_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("archived"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "data/content.db"),
            PathBuf::from("/home/user/project/data/content.db")
        );
        assert_eq!(
            resolve_path(&base, "/var/lib/content.db"),
            PathBuf::from("/var/lib/content.db")
        );
    }
}
