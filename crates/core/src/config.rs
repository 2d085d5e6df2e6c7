use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub catalog: CatalogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `METACAT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("METACAT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            storage: StorageConfig::from_env_profiled(p),
            session: SessionConfig::from_env_profiled(p),
            catalog: CatalogConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  storage:  data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  session:  cluster={}, database={}",
            self.session.default_cluster,
            self.session.default_database
        );
        tracing::info!(
            "  catalog:  cascade_drops={}, plan_cache_capacity={}",
            self.catalog.cascade_drops,
            self.catalog.plan_cache_capacity
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `catalog.json`.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "METACAT_DATA_DIR", "data")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

// ── Session ───────────────────────────────────────────────────

/// Starting values of a session's current cluster/database pointers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub default_cluster: String,
    pub default_database: String,
}

impl SessionConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            default_cluster: profiled_env_or(p, "METACAT_DEFAULT_CLUSTER", "default"),
            default_database: profiled_env_or(p, "METACAT_DEFAULT_DATABASE", "default"),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_cluster: "default".to_string(),
            default_database: "default".to_string(),
        }
    }
}

// ── Catalog behaviour ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// When true, dropping a database removes its tables and dropping a
    /// cluster removes its databases and tables. Off by default: entries
    /// are left in place and cleaned up explicitly.
    pub cascade_drops: bool,
    /// Maximum number of cached plans kept by the plan cache.
    pub plan_cache_capacity: usize,
}

impl CatalogConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            cascade_drops: profiled_env_bool(p, "METACAT_CASCADE_DROPS", false),
            plan_cache_capacity: profiled_env_usize(p, "METACAT_PLAN_CACHE_CAPACITY", 1024),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cascade_drops: false,
            plan_cache_capacity: 1024,
        }
    }
}
