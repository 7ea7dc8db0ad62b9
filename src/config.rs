//! Configuration loading for the coaching engine.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.coach/config.toml`)
//! 3. User config (`~/.coach/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with the stock session
//! shape when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoachError, FailOpen, Result};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Policy sampling and resolution limits.
    pub policy: PolicyConfig,
    /// Shape of a coaching session.
    pub session: SessionConfig,
    /// Where participant histories and journals live.
    pub storage: StorageConfig,
}

/// Policy sampling and resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Resamples from the same state before canonicalizing.
    pub max_retries: u32,
    /// Hard cap on resolution loop iterations for one selection.
    pub resolution_ceiling: u32,
    /// Seed for the policy RNG. Unset means seeded from the OS.
    pub seed: Option<u64>,
    /// JSON policy tables. Unset means a uniform policy.
    pub tables: Option<PathBuf>,
}

/// Minimum valid resolution ceiling.
pub const MIN_RESOLUTION_CEILING: u32 = 1;

impl PolicyConfig {
    /// Check if a resolution ceiling is valid (must be >= 1).
    pub fn is_valid_resolution_ceiling(value: u32) -> bool {
        value >= MIN_RESOLUTION_CEILING
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            resolution_ceiling: 1000,
            seed: None,
            tables: None,
        }
    }
}

/// Session shape configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Sets played before exercise feedback is owed.
    pub sets_per_exercise: u32,
    /// Repetitions needed to end the first set of a session.
    pub first_set_repetitions: u32,
    /// Repetitions needed to end every later set.
    pub later_set_repetitions: u32,
    /// Session length in exercises.
    pub duration: u32,
    /// Target score reported with actions when the guide gives none.
    pub default_target: f64,
}

/// Minimum valid sets per exercise.
pub const MIN_SETS_PER_EXERCISE: u32 = 1;

impl SessionConfig {
    /// Check if sets_per_exercise is valid (must be >= 1).
    pub fn is_valid_sets_per_exercise(value: u32) -> bool {
        value >= MIN_SETS_PER_EXERCISE
    }

    /// Check if a target score is valid (in [0.0, 1.0]).
    pub fn is_valid_target(value: f64) -> bool {
        (0.0..=1.0).contains(&value)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sets_per_exercise: 2,
            first_set_repetitions: 10,
            later_set_repetitions: 5,
            duration: 2,
            default_target: 0.8,
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of participant history files.
    /// Defaults to `<coach_home>/history`.
    pub history_dir: Option<PathBuf>,
    /// Decision journal file. Unset disables the journal.
    pub journal: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.coach/config.toml`.
    fn load_user_config() -> Option<Config> {
        let path = coach_home()?.join("config.toml");
        Self::load_optional(&path)
    }

    /// Load project config from `.coach/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = cwd.join(".coach").join("config.toml");
        Self::load_optional(&path)
    }

    /// A missing file is silent; a broken one is reported and skipped.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .map(Some)
            .fail_open_with(&format!("loading {}", path.display()), None)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| CoachError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| CoachError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // COACH_MAX_RETRIES
        if let Ok(val) = env::var("COACH_MAX_RETRIES") {
            match val.parse::<u32>() {
                Ok(n) => self.policy.max_retries = n,
                Err(_) => tracing::warn!(
                    "invalid COACH_MAX_RETRIES value '{}', expected a non-negative integer; keeping {}",
                    val,
                    self.policy.max_retries
                ),
            }
        }

        // COACH_RESOLUTION_CEILING
        if let Ok(val) = env::var("COACH_RESOLUTION_CEILING") {
            match val.parse::<u32>() {
                Ok(n) if PolicyConfig::is_valid_resolution_ceiling(n) => {
                    self.policy.resolution_ceiling = n
                }
                _ => tracing::warn!(
                    "invalid COACH_RESOLUTION_CEILING value '{}', must be >= {}; keeping {}",
                    val,
                    MIN_RESOLUTION_CEILING,
                    self.policy.resolution_ceiling
                ),
            }
        }

        // COACH_SEED
        if let Ok(val) = env::var("COACH_SEED") {
            match val.parse::<u64>() {
                Ok(n) => self.policy.seed = Some(n),
                Err(_) => tracing::warn!("invalid COACH_SEED value '{}', ignoring", val),
            }
        }

        // COACH_SETS_PER_EXERCISE
        if let Ok(val) = env::var("COACH_SETS_PER_EXERCISE") {
            match val.parse::<u32>() {
                Ok(n) if SessionConfig::is_valid_sets_per_exercise(n) => {
                    self.session.sets_per_exercise = n
                }
                _ => tracing::warn!(
                    "invalid COACH_SETS_PER_EXERCISE value '{}', must be >= {}; keeping {}",
                    val,
                    MIN_SETS_PER_EXERCISE,
                    self.session.sets_per_exercise
                ),
            }
        }

        // COACH_SESSION_DURATION
        if let Ok(val) = env::var("COACH_SESSION_DURATION") {
            match val.parse::<u32>() {
                Ok(n) => self.session.duration = n,
                Err(_) => tracing::warn!(
                    "invalid COACH_SESSION_DURATION value '{}', expected a non-negative integer; keeping {}",
                    val,
                    self.session.duration
                ),
            }
        }

        // COACH_HISTORY_DIR
        if let Ok(val) = env::var("COACH_HISTORY_DIR") {
            if val.is_empty() {
                tracing::warn!("COACH_HISTORY_DIR is empty, ignoring");
            } else {
                self.storage.history_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Non-default values in `other` win. As with any default-comparing
    /// merge, a layer cannot set a value back to its default once a lower
    /// layer has changed it.
    fn merge(mut self, other: Config) -> Self {
        let default_policy = PolicyConfig::default();
        if other.policy.max_retries != default_policy.max_retries {
            self.policy.max_retries = other.policy.max_retries;
        }
        if other.policy.resolution_ceiling != default_policy.resolution_ceiling {
            self.policy.resolution_ceiling = other.policy.resolution_ceiling;
        }
        if other.policy.seed.is_some() {
            self.policy.seed = other.policy.seed;
        }
        if other.policy.tables.is_some() {
            self.policy.tables = other.policy.tables;
        }

        let default_session = SessionConfig::default();
        if other.session.sets_per_exercise != default_session.sets_per_exercise {
            self.session.sets_per_exercise = other.session.sets_per_exercise;
        }
        if other.session.first_set_repetitions != default_session.first_set_repetitions {
            self.session.first_set_repetitions = other.session.first_set_repetitions;
        }
        if other.session.later_set_repetitions != default_session.later_set_repetitions {
            self.session.later_set_repetitions = other.session.later_set_repetitions;
        }
        if other.session.duration != default_session.duration {
            self.session.duration = other.session.duration;
        }
        if other.session.default_target != default_session.default_target {
            self.session.default_target = other.session.default_target;
        }

        if other.storage.history_dir.is_some() {
            self.storage.history_dir = other.storage.history_dir;
        }
        if other.storage.journal.is_some() {
            self.storage.journal = other.storage.journal;
        }

        self
    }

    /// Check values that deserialization alone cannot rule out.
    pub fn validate(&self) -> Result<()> {
        if !PolicyConfig::is_valid_resolution_ceiling(self.policy.resolution_ceiling) {
            return Err(CoachError::config(format!(
                "policy.resolution_ceiling must be >= {}",
                MIN_RESOLUTION_CEILING
            )));
        }
        if !SessionConfig::is_valid_sets_per_exercise(self.session.sets_per_exercise) {
            return Err(CoachError::config(format!(
                "session.sets_per_exercise must be >= {}",
                MIN_SETS_PER_EXERCISE
            )));
        }
        if !SessionConfig::is_valid_target(self.session.default_target) {
            return Err(CoachError::config(
                "session.default_target must be in [0.0, 1.0]",
            ));
        }
        Ok(())
    }

    /// Directory of participant history files.
    pub fn history_dir(&self) -> Option<PathBuf> {
        self.storage
            .history_dir
            .clone()
            .or_else(|| coach_home().map(|h| h.join("history")))
    }
}

/// Get the coach home directory.
///
/// Checks `COACH_HOME` first, then falls back to `~/.coach`. An empty
/// `COACH_HOME` is ignored.
pub fn coach_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("COACH_HOME") {
        if home.is_empty() {
            tracing::warn!("COACH_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("COACH_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".coach"));
    }

    let fallback = env::temp_dir().join("coach");
    tracing::warn!("HOME not set, using fallback location: {}", fallback.display());
    Some(fallback)
}
