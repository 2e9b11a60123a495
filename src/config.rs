//! Centralized configuration for a dump run.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - DumpConfig::from_env() reads SD_* variables; CLI flags override via the fluent setters.
//!
//! Tunables:
//! - discovery (SD_DISCOVERY = auto|scan|index): how the set of modules is determined.
//! - on_tree_error (SD_SKIP_BROKEN = 1|true|on|yes): skip a module whose tree cannot be
//!   loaded instead of aborting the whole run.
//! - verify_nodes (SD_VERIFY_NODES = 0|false|off|no disables): re-hash every tree node on load.

use std::fmt;
use std::str::FromStr;

use crate::util::env_flag;

/// Стратегия обнаружения модулей.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryMode {
    /// index, если latest-маркер декодируется; иначе scan.
    #[default]
    Auto,
    /// Полный скан raw-ключей по пространству имён модулей.
    Scan,
    /// Имена модулей из CommitInfo целевой версии.
    Index,
}

impl FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DiscoveryMode::Auto),
            "scan" => Ok(DiscoveryMode::Scan),
            "index" => Ok(DiscoveryMode::Index),
            other => Err(format!(
                "unknown discovery mode {:?} (expected auto|scan|index)",
                other
            )),
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryMode::Auto => write!(f, "auto"),
            DiscoveryMode::Scan => write!(f, "scan"),
            DiscoveryMode::Index => write!(f, "index"),
        }
    }
}

/// Что делать, если дерево модуля не открывается на его коммите.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeErrorPolicy {
    /// Прервать весь прогон (по умолчанию).
    #[default]
    Abort,
    /// Пропустить модуль с диагностикой и продолжить.
    Skip,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpConfig {
    /// Env: SD_DISCOVERY (default auto)
    pub discovery: DiscoveryMode,

    /// Env: SD_SKIP_BROKEN (default false => Abort)
    pub on_tree_error: TreeErrorPolicy,

    /// Env: SD_VERIFY_NODES (default true)
    pub verify_nodes: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryMode::Auto,
            on_tree_error: TreeErrorPolicy::Abort,
            verify_nodes: true,
        }
    }
}

impl DumpConfig {
    /// Load configuration from environment variables. Invalid values keep defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SD_DISCOVERY") {
            match v.parse::<DiscoveryMode>() {
                Ok(mode) => cfg.discovery = mode,
                Err(e) => log::warn!("SD_DISCOVERY ignored: {}", e),
            }
        }

        if let Some(on) = env_flag("SD_SKIP_BROKEN") {
            cfg.on_tree_error = if on {
                TreeErrorPolicy::Skip
            } else {
                TreeErrorPolicy::Abort
            };
        }

        if let Some(on) = env_flag("SD_VERIFY_NODES") {
            cfg.verify_nodes = on;
        }

        cfg
    }

    pub fn with_discovery(mut self, mode: DiscoveryMode) -> Self {
        self.discovery = mode;
        self
    }

    pub fn with_tree_error_policy(mut self, policy: TreeErrorPolicy) -> Self {
        self.on_tree_error = policy;
        self
    }

    pub fn with_verify_nodes(mut self, on: bool) -> Self {
        self.verify_nodes = on;
        self
    }

    pub fn build(self) -> Self {
        self
    }
}

impl fmt::Display for DumpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DumpConfig {{ discovery: {}, on_tree_error: {}, verify_nodes: {} }}",
            self.discovery,
            match self.on_tree_error {
                TreeErrorPolicy::Abort => "abort",
                TreeErrorPolicy::Skip => "skip",
            },
            self.verify_nodes,
        )
    }
}
