// Planner Configuration
//
// *La Configuration* (The Configuration) - Project settings for LePlan

use anyhow::{Context, Result};
use ledecouverte::DiscoveryConfig;
use leplanification::{ImpactAnalysisConfig, TaskGraphBuilder};
use lesuperviseur::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration directory inside a project
pub const CONFIG_DIR: &str = ".leplan";

/// Default configuration file, relative to the project root
pub const DEFAULT_CONFIG_FILE: &str = ".leplan/config.toml";

/// Overrides `supervisor.max_attempts`
pub const ENV_MAX_ATTEMPTS: &str = "LEPLAN_MAX_ATTEMPTS";
/// Overrides `supervisor.attempt_timeout_ms`
pub const ENV_TIMEOUT_MS: &str = "LEPLAN_TIMEOUT_MS";
/// Overrides `planning.default_token_budget`
pub const ENV_TOKEN_BUDGET: &str = "LEPLAN_TOKEN_BUDGET";
/// Overrides `logging.level`
pub const ENV_LOG: &str = "LEPLAN_LOG";

/// Planner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Retry and timeout settings
    pub supervisor: SupervisorConfig,

    /// Discovery settings
    pub discovery: DiscoverySettings,

    /// Task graph settings
    pub planning: PlanningConfig,

    /// Log settings
    pub logging: LoggingConfig,
}

impl PlannerConfig {
    /// Load configuration from a project directory
    ///
    /// Looks for `.leplan/config.toml` in the project directory.
    /// If not found, returns default configuration.
    pub fn load<P: AsRef<Path>>(project_path: P) -> Result<Self> {
        let config_path = Self::path_for(project_path);

        if !config_path.exists() {
            return Ok(PlannerConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: PlannerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        Ok(config)
    }

    /// Save configuration to a project directory
    ///
    /// Creates `.leplan` if it doesn't exist and returns the written path.
    pub fn save<P: AsRef<Path>>(&self, project_path: P) -> Result<PathBuf> {
        let config_dir = project_path.as_ref().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;

        let config_path = Self::path_for(&project_path);
        let toml_string = self.to_toml()?;

        fs::write(&config_path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(config_path)
    }

    /// Configuration file location for a project
    pub fn path_for<P: AsRef<Path>>(project_path: P) -> PathBuf {
        project_path.as_ref().join(DEFAULT_CONFIG_FILE)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Check value ranges
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let checks = [
            (self.supervisor.max_attempts == 0, "supervisor.max_attempts must be at least 1"),
            (self.supervisor.init_attempts == 0, "supervisor.init_attempts must be at least 1"),
            (
                self.supervisor.attempt_timeout_ms == 0,
                "supervisor.attempt_timeout_ms must be positive",
            ),
            (self.discovery.max_files == 0, "discovery.max_files must be at least 1"),
            (self.discovery.concurrency == 0, "discovery.concurrency must be at least 1"),
            (
                self.planning.default_token_budget == 0,
                "planning.default_token_budget must be positive",
            ),
            (self.planning.tokens_per_file == 0, "planning.tokens_per_file must be positive"),
            (
                self.planning.tokens_per_file > self.planning.default_token_budget,
                "planning.tokens_per_file must not exceed planning.default_token_budget",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::Invalid((*message).to_string())),
            None => Ok(()),
        }
    }

    /// Apply `LEPLAN_*` environment overrides
    pub fn apply_env(&mut self) -> std::result::Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_ATTEMPTS) {
            self.supervisor.max_attempts = parse_number(ENV_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.supervisor.attempt_timeout_ms = parse_number(ENV_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_TOKEN_BUDGET) {
            self.planning.default_token_budget = parse_number(ENV_TOKEN_BUDGET, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG) {
            if !value.trim().is_empty() {
                self.logging.level = value.trim().to_string();
            }
        }
        Ok(())
    }

    /// Policy for whole-phase calls
    pub fn phase_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.supervisor.max_attempts, self.supervisor.attempt_timeout_ms)
            .with_base_delay(self.supervisor.base_delay_ms)
    }

    /// Policy for per-file calls
    pub fn file_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.supervisor.max_attempts.min(2),
            self.supervisor.attempt_timeout_ms,
        )
        .with_base_delay(self.supervisor.base_delay_ms)
    }

    /// Policy for provider initialization
    pub fn init_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.supervisor.init_attempts, self.supervisor.attempt_timeout_ms)
            .with_base_delay(self.supervisor.base_delay_ms)
    }

    /// Discovery coordinator tunables
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            max_files: self.discovery.max_files,
            include_related: self.discovery.include_related,
            expansion_depth: self.discovery.expansion_depth,
            structural_depth: self.discovery.structural_depth,
            concurrency: self.discovery.concurrency,
            phase_policy: self.phase_policy(),
            file_policy: self.file_policy(),
            init_policy: self.init_policy(),
        }
    }

    /// Impact analyzer tunables
    pub fn impact_config(&self) -> ImpactAnalysisConfig {
        ImpactAnalysisConfig {
            max_depth: self.discovery.expansion_depth.max(1),
            concurrency: self.discovery.concurrency,
            file_policy: self.file_policy(),
        }
    }

    /// Task graph builder settings
    pub fn task_builder(&self) -> TaskGraphBuilder {
        TaskGraphBuilder::new(
            self.planning.tokens_per_file,
            self.planning.split_oversized_layers,
        )
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Parse(format!("{key}: expected a number, got {value:?}")))
}

/// Retry and timeout settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Attempts per supervised call
    pub max_attempts: usize,

    /// Per-attempt timeout in milliseconds
    pub attempt_timeout_ms: u64,

    /// Linear backoff step in milliseconds
    pub base_delay_ms: u64,

    /// Attempts to bring up a required provider
    pub init_attempts: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 30_000,
            base_delay_ms: 1_000,
            init_attempts: 3,
        }
    }
}

/// Discovery settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Upper bound on primary semantic hits
    pub max_files: usize,

    /// Ask the discovery provider for related files
    pub include_related: bool,

    /// Relationship expansion depth
    pub expansion_depth: usize,

    /// Structural analysis depth
    pub structural_depth: usize,

    /// Per-file worker pool width
    pub concurrency: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_files: 50,
            include_related: true,
            expansion_depth: 3,
            structural_depth: 2,
            concurrency: 8,
        }
    }
}

/// Task graph settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlanningConfig {
    /// Budget used when a request carries none
    pub default_token_budget: usize,

    /// Estimated tokens per target file
    pub tokens_per_file: usize,

    /// Split layers that exceed the budget into several tasks
    pub split_oversized_layers: bool,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            default_token_budget: ledecouverte::DEFAULT_TOKEN_BUDGET,
            tokens_per_file: leplanification::DEFAULT_TOKENS_PER_FILE,
            split_oversized_layers: true,
        }
    }
}

/// Log settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to parse an override or setting
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configuration contains invalid values
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
