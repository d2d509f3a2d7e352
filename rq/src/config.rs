//! Configuration types and loading
//!
//! [`Config`] is the YAML file form with raw strings. [`Config::policy`]
//! validates it into a typed [`SyncPolicy`]; bad mode or verb names fail
//! there, never at call time.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Mode, Verb};
use crate::error::ConfigError;
use crate::registry::StalenessPolicy;

/// File-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-verb mode overrides, e.g. `GET: abort`. Unlisted verbs keep their defaults.
    pub modes: BTreeMap<String, String>,

    /// Pending entries older than this are treated as lost (<= 0 disables)
    #[serde(rename = "stale-after-ms", default = "default_stale_after_ms")]
    pub stale_after_ms: i64,

    /// Report policy rejections to the caller's error path instead of swallowing them
    #[serde(rename = "surface-rejections")]
    pub surface_rejections: bool,

    /// Log level for the `rq` binary
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

fn default_stale_after_ms() -> i64 {
    -1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modes: BTreeMap::new(),
            stale_after_ms: default_stale_after_ms(),
            surface_rejections: false,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must load. Otherwise the first readable file among
    /// [`Config::search_paths`] wins; unreadable ones are skipped with a
    /// warning, and no file at all means defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::read(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths().into_iter().filter(|p| p.exists()) {
            match Self::read(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %candidate.display(), error = %e, "Skipping unreadable config"),
            }
        }

        debug!("Config::load: no config file found, using defaults");
        Ok(Self::default())
    }

    /// Implicit config locations, most specific first:
    /// `./.reqsync.yml`, then `<config dir>/reqsync/reqsync.yml`
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".reqsync.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("reqsync").join("reqsync.yml"));
        }
        paths
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        debug!(path = %path.display(), "Config::read: loaded");
        Ok(config)
    }

    /// Validate and convert into a typed policy
    pub fn policy(&self) -> Result<SyncPolicy, ConfigError> {
        let mut policy = SyncPolicy::default()
            .with_stale_after_ms(self.stale_after_ms)
            .surface_rejections(self.surface_rejections);

        for (verb, mode) in &self.modes {
            policy = policy.with_mode_str(verb, mode)?;
        }
        Ok(policy)
    }
}

/// Default coordination mode per verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTable {
    modes: HashMap<Verb, Mode>,
}

impl ModeTable {
    /// Empty table: every verb falls back to [`Mode::Force`]
    pub fn empty() -> Self {
        Self { modes: HashMap::new() }
    }

    pub fn set(&mut self, verb: Verb, mode: Mode) {
        self.modes.insert(verb, mode);
    }

    pub fn get(&self, verb: Verb) -> Option<Mode> {
        self.modes.get(&verb).copied()
    }

    /// Mode for `verb`, falling back to Force for unmapped verbs
    pub fn resolve(&self, verb: Verb) -> Mode {
        self.get(verb).unwrap_or_else(|| {
            warn!(%verb, "No mode configured for verb, falling back to force");
            Mode::Force
        })
    }

    /// Entries in verb declaration order
    pub fn entries(&self) -> Vec<(Verb, Mode)> {
        Verb::ALL
            .iter()
            .filter_map(|verb| self.get(*verb).map(|mode| (*verb, mode)))
            .collect()
    }
}

impl Default for ModeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.set(Verb::Get, Mode::Abort);
        table.set(Verb::Head, Mode::Force);
        table.set(Verb::Post, Mode::Prevent);
        table.set(Verb::Put, Mode::Prevent);
        table.set(Verb::Patch, Mode::Prevent);
        table.set(Verb::Delete, Mode::Prevent);
        table.set(Verb::Options, Mode::Force);
        table
    }
}

/// Validated, process-wide coordination settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncPolicy {
    pub modes: ModeTable,
    pub staleness: StalenessPolicy,
    pub surface_rejections: bool,
}

impl SyncPolicy {
    pub fn with_mode(mut self, verb: Verb, mode: Mode) -> Self {
        self.modes.set(verb, mode);
        self
    }

    /// Set a verb's mode from names, e.g. `("post", "abort")`
    pub fn with_mode_str(self, verb: &str, mode: &str) -> Result<Self, ConfigError> {
        let verb: Verb = verb.parse()?;
        let mode: Mode = mode.parse()?;
        Ok(self.with_mode(verb, mode))
    }

    pub fn with_stale_after_ms(mut self, stale_after_ms: i64) -> Self {
        self.staleness = StalenessPolicy::new(stale_after_ms);
        self
    }

    pub fn surface_rejections(mut self, surface: bool) -> Self {
        self.surface_rejections = surface;
        self
    }

    pub fn mode_for(&self, verb: Verb) -> Mode {
        self.modes.resolve(verb)
    }
}
