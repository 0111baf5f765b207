//! TOML Configuration File Support
//!
//! Engine tuning is loaded from `~/.config/pinchy/pinchy.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! profile = "prod"
//! seed = 42
//!
//! [behavior]
//! idle_min_ms = 3000
//! idle_max_ms = 8000
//! interaction_cooldown_ms = 5000
//!
//! [attention]
//! prod_min_ms = 30000
//! prod_max_ms = 120000
//! min_distance_px = 600
//!
//! [sleep]
//! doze_after_ms = 60000
//!
//! [tutorial]
//! auto_start = true
//! resume_policy = "restart"
//!
//! [overlay]
//! easing = "ease-out-cubic"
//! rest_margin = 24
//! ```
//!
//! # Environment Variables
//!
//! - `PINCHY_PROFILE`: `dev` or `prod`
//! - `PINCHY_RESUME_POLICY`: `restart` or `last-step`
//! - `PINCHY_AUTO_START_TUTORIAL`: `1`/`true` or `0`/`false`
//! - `PINCHY_SEED`: RNG seed for reproducible behavior

use std::path::PathBuf;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::EasingFunction;
use crate::geometry::Size;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the effective configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Build profile; selects attention-seeker cadence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Fast cadence for development
    Dev,
    /// Normal cadence
    #[default]
    Prod,
}

impl Profile {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "development" => Some(Self::Dev),
            "prod" | "production" => Some(Self::Prod),
            _ => None,
        }
    }
}

/// Where "resume" picks up an interrupted tutorial
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResumePolicy {
    /// Start again at step 1 (avoids presenting stale partial state)
    #[default]
    #[serde(rename = "restart")]
    RestartFromBeginning,
    /// Continue at the last persisted step
    #[serde(rename = "last-step")]
    FromLastStep,
}

impl ResumePolicy {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "restart" | "beginning" => Some(Self::RestartFromBeginning),
            "last-step" | "last_step" | "continue" => Some(Self::FromLastStep),
            _ => None,
        }
    }
}

/// Inclusive range for randomized loop intervals
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalRange {
    /// Shortest interval
    pub min_ms: u64,
    /// Longest interval
    pub max_ms: u64,
}

impl IntervalRange {
    /// Create a range
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw a uniform interval from the range
    pub fn sample(&self, rng: &mut impl Rng) -> u64 {
        if self.max_ms <= self.min_ms {
            return self.min_ms;
        }
        rng.gen_range(self.min_ms..=self.max_ms)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min_ms == 0 || self.min_ms > self.max_ms {
            return Err(ConfigError::ValidationError(format!(
                "{name}: interval must satisfy 0 < min ({}) <= max ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Idle fidget loop
#[derive(Clone, Debug, PartialEq)]
pub struct BehaviorConfig {
    /// Delay between idle loop fires
    pub idle_interval: IntervalRange,
    /// Quiet period after any interaction
    pub interaction_cooldown_ms: u64,
    /// How long non-movement fidgets keep the busy flag
    pub non_movement_grace_ms: u64,
    /// Horizontal wander reach (±)
    pub wander_dx: i32,
    /// Vertical wander reach (±)
    pub wander_dy: i32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            idle_interval: IntervalRange::new(3000, 8000),
            interaction_cooldown_ms: 5000,
            non_movement_grace_ms: 2000,
            wander_dx: 400,
            wander_dy: 200,
        }
    }
}

/// Attention-seeker loop
#[derive(Clone, Debug, PartialEq)]
pub struct AttentionConfig {
    /// Cadence under [`Profile::Dev`]
    pub dev_interval: IntervalRange,
    /// Cadence under [`Profile::Prod`]
    pub prod_interval: IntervalRange,
    /// Only come over when the cursor is farther than this
    pub min_distance_px: f64,
    /// Land this far right/below the cursor
    pub cursor_offset: i32,
    /// Duration of the approach move
    pub move_duration_ms: u64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            dev_interval: IntervalRange::new(5_000, 15_000),
            prod_interval: IntervalRange::new(30_000, 120_000),
            min_distance_px: 600.0,
            cursor_offset: 80,
            move_duration_ms: 1500,
        }
    }
}

impl AttentionConfig {
    /// Interval range for a profile
    #[must_use]
    pub fn interval(&self, profile: Profile) -> IntervalRange {
        match profile {
            Profile::Dev => self.dev_interval,
            Profile::Prod => self.prod_interval,
        }
    }
}

/// Sleep/wake timings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SleepConfig {
    /// Inactivity poll cadence
    pub poll_interval_ms: u64,
    /// Inactivity before dozing off
    pub doze_after_ms: u64,
    /// Dozing time before falling asleep
    pub fall_asleep_ms: u64,
    /// Length of the startle before settling awake
    pub startle_ms: u64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            doze_after_ms: 60_000,
            fall_asleep_ms: 5_000,
            startle_ms: 1_000,
        }
    }
}

/// Step-4 cursor follow protocol
#[derive(Clone, Debug, PartialEq)]
pub struct FollowConfig {
    /// Cursor-distance poll cadence
    pub poll_interval_ms: u64,
    /// Distance that starts the follow loop
    pub trigger_distance_px: f64,
    /// Distance that makes a check move the agent
    pub follow_distance_px: f64,
    /// Distance that ends the loop
    pub close_distance_px: f64,
    /// Delay before the first follow check
    pub first_check_ms: u64,
    /// Delay between follow checks
    pub check_interval_ms: u64,
    /// Follow moves before giving up
    pub max_cycles: u8,
    /// Duration of each follow move
    pub move_duration_ms: u64,
    /// Land this far right/below the cursor
    pub cursor_offset: i32,
    /// Pause at center before advancing
    pub settle_ms: u64,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            trigger_distance_px: 200.0,
            follow_distance_px: 300.0,
            close_distance_px: 150.0,
            first_check_ms: 1000,
            check_interval_ms: 4000,
            max_cycles: 2,
            move_duration_ms: 1500,
            cursor_offset: 80,
            settle_ms: 300,
        }
    }
}

/// Tutorial behavior
#[derive(Clone, Debug, PartialEq)]
pub struct TutorialConfig {
    /// Start automatically on first boot
    pub auto_start: bool,
    /// Where "resume" continues
    pub resume_policy: ResumePolicy,
    /// Move to center when starting
    pub center_move_ms: u64,
    /// Move back to center after following
    pub return_move_ms: u64,
    /// Move to the resting spot when finished
    pub rest_move_ms: u64,
    /// Step-4 follow protocol
    pub follow: FollowConfig,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            resume_policy: ResumePolicy::RestartFromBeginning,
            center_move_ms: 800,
            return_move_ms: 1000,
            rest_move_ms: 1200,
            follow: FollowConfig::default(),
        }
    }
}

/// Overlay geometry
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    /// Window size outside the tutorial
    pub compact: Size,
    /// Window size while hosting the prompt bubble
    pub expanded: Size,
    /// Sprite box inside the window (distance anchor is its center)
    pub agent_size: Size,
    /// Resting spot inset from the bottom-right corner
    pub rest_margin: i32,
    /// Easing for position moves
    pub easing: EasingFunction,
}

/// Largest accepted resting-spot inset, in pixels
pub const MAX_REST_MARGIN: i32 = 1000;

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            compact: Size::new(160, 160),
            expanded: Size::new(420, 360),
            agent_size: Size::new(120, 120),
            rest_margin: 24,
            easing: EasingFunction::EaseOutCubic,
        }
    }
}

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConductorConfig {
    /// Build profile
    pub profile: Profile,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Idle fidgets
    pub behavior: BehaviorConfig,
    /// Attention seeking
    pub attention: AttentionConfig,
    /// Sleep/wake
    pub sleep: SleepConfig,
    /// Tutorial
    pub tutorial: TutorialConfig,
    /// Overlay geometry
    pub overlay: OverlayConfig,
    /// Where the values came from
    pub source: ConfigSource,
    /// Config file that was loaded, if any
    pub config_file_path: Option<PathBuf>,
}

impl ConductorConfig {
    /// Check cross-field invariants
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.behavior.idle_interval.validate("behavior.idle")?;
        self.attention.dev_interval.validate("attention.dev")?;
        self.attention.prod_interval.validate("attention.prod")?;
        if self.sleep.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "sleep.poll_interval_ms must be positive".into(),
            ));
        }
        let follow = &self.tutorial.follow;
        if follow.poll_interval_ms == 0 || follow.check_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tutorial follow intervals must be positive".into(),
            ));
        }
        if !(0..=MAX_REST_MARGIN).contains(&self.overlay.rest_margin) {
            return Err(ConfigError::ValidationError(format!(
                "overlay.rest_margin ({}) must be between 0 and {MAX_REST_MARGIN}",
                self.overlay.rest_margin
            )));
        }
        if follow.close_distance_px >= follow.follow_distance_px {
            return Err(ConfigError::ValidationError(format!(
                "tutorial follow: close distance ({}) must be below follow distance ({})",
                follow.close_distance_px, follow.follow_distance_px
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[behavior]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorToml {
    /// Shortest idle loop interval
    pub idle_min_ms: Option<u64>,
    /// Longest idle loop interval
    pub idle_max_ms: Option<u64>,
    /// Quiet period after interaction
    pub interaction_cooldown_ms: Option<u64>,
}

/// `[attention]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionToml {
    /// Dev profile shortest interval
    pub dev_min_ms: Option<u64>,
    /// Dev profile longest interval
    pub dev_max_ms: Option<u64>,
    /// Prod profile shortest interval
    pub prod_min_ms: Option<u64>,
    /// Prod profile longest interval
    pub prod_max_ms: Option<u64>,
    /// Minimum cursor distance to act
    pub min_distance_px: Option<f64>,
}

/// `[sleep]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepToml {
    /// Poll cadence
    pub poll_interval_ms: Option<u64>,
    /// Inactivity before dozing
    pub doze_after_ms: Option<u64>,
    /// Dozing before sleeping
    pub fall_asleep_ms: Option<u64>,
    /// Startle length
    pub startle_ms: Option<u64>,
}

/// `[tutorial]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorialToml {
    /// Start on first boot
    pub auto_start: Option<bool>,
    /// Resume behavior
    pub resume_policy: Option<ResumePolicy>,
}

/// `[overlay]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayToml {
    /// Easing for moves
    pub easing: Option<EasingFunction>,
    /// Resting spot inset
    pub rest_margin: Option<i32>,
}

/// Root of the TOML configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorToml {
    /// Build profile
    pub profile: Option<Profile>,
    /// RNG seed
    pub seed: Option<u64>,
    /// `[behavior]`
    pub behavior: BehaviorToml,
    /// `[attention]`
    pub attention: AttentionToml,
    /// `[sleep]`
    pub sleep: SleepToml,
    /// `[tutorial]`
    pub tutorial: TutorialToml,
    /// `[overlay]`
    pub overlay: OverlayToml,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/pinchy/pinchy.toml` or
/// `~/.config/pinchy/pinchy.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pinchy").join("pinchy.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting configuration is invalid. A missing file is not an error.
pub fn load_config() -> Result<ConductorConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then apply the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the resulting configuration is invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ConductorConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration from a path and an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ConductorConfig, ConfigError> {
    let mut config = ConductorConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ConductorToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ConductorConfig, toml: &ConductorToml) {
    if let Some(profile) = toml.profile {
        config.profile = profile;
    }
    if toml.seed.is_some() {
        config.seed = toml.seed;
    }

    // Behavior settings
    if let Some(min) = toml.behavior.idle_min_ms {
        config.behavior.idle_interval.min_ms = min;
    }
    if let Some(max) = toml.behavior.idle_max_ms {
        config.behavior.idle_interval.max_ms = max;
    }
    if let Some(cooldown) = toml.behavior.interaction_cooldown_ms {
        config.behavior.interaction_cooldown_ms = cooldown;
    }

    // Attention settings
    if let Some(min) = toml.attention.dev_min_ms {
        config.attention.dev_interval.min_ms = min;
    }
    if let Some(max) = toml.attention.dev_max_ms {
        config.attention.dev_interval.max_ms = max;
    }
    if let Some(min) = toml.attention.prod_min_ms {
        config.attention.prod_interval.min_ms = min;
    }
    if let Some(max) = toml.attention.prod_max_ms {
        config.attention.prod_interval.max_ms = max;
    }
    if let Some(distance) = toml.attention.min_distance_px {
        config.attention.min_distance_px = distance;
    }

    // Sleep settings
    if let Some(poll) = toml.sleep.poll_interval_ms {
        config.sleep.poll_interval_ms = poll;
    }
    if let Some(doze) = toml.sleep.doze_after_ms {
        config.sleep.doze_after_ms = doze;
    }
    if let Some(asleep) = toml.sleep.fall_asleep_ms {
        config.sleep.fall_asleep_ms = asleep;
    }
    if let Some(startle) = toml.sleep.startle_ms {
        config.sleep.startle_ms = startle;
    }

    // Tutorial settings
    if let Some(auto_start) = toml.tutorial.auto_start {
        config.tutorial.auto_start = auto_start;
    }
    if let Some(policy) = toml.tutorial.resume_policy {
        config.tutorial.resume_policy = policy;
    }

    // Overlay settings
    if let Some(easing) = toml.overlay.easing {
        config.overlay.easing = easing;
    }
    if let Some(margin) = toml.overlay.rest_margin {
        config.overlay.rest_margin = margin;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ConductorConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(profile) = env("PINCHY_PROFILE") {
        match Profile::parse(&profile) {
            Some(p) => {
                config.profile = p;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %profile, "Ignoring unknown PINCHY_PROFILE"),
        }
    }
    if let Some(policy) = env("PINCHY_RESUME_POLICY") {
        match ResumePolicy::parse(&policy) {
            Some(p) => {
                config.tutorial.resume_policy = p;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %policy, "Ignoring unknown PINCHY_RESUME_POLICY"),
        }
    }
    if let Some(auto_start) = env("PINCHY_AUTO_START_TUTORIAL") {
        config.tutorial.auto_start = auto_start != "0" && auto_start.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Some(seed) = env("PINCHY_SEED") {
        if let Ok(seed) = seed.parse::<u64>() {
            config.seed = Some(seed);
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Profile override
    pub profile: Option<Profile>,
    /// Seed override
    pub seed: Option<u64>,
    /// Resume policy override
    pub resume_policy: Option<ResumePolicy>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set profile override
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Set seed override
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set resume policy override
    #[must_use]
    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = Some(policy);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ConductorConfig) {
        if self.profile.is_some() || self.seed.is_some() || self.resume_policy.is_some() {
            config.source = ConfigSource::Cli;
        }
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(policy) = self.resume_policy {
            config.tutorial.resume_policy = policy;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ConductorConfig::default();

        assert_eq!(config.profile, Profile::Prod);
        assert_eq!(config.behavior.idle_interval, IntervalRange::new(3000, 8000));
        assert_eq!(config.behavior.interaction_cooldown_ms, 5000);
        assert_eq!(config.attention.interval(Profile::Dev), IntervalRange::new(5000, 15000));
        assert_eq!(config.sleep.doze_after_ms, 60_000);
        assert_eq!(config.tutorial.resume_policy, ResumePolicy::RestartFromBeginning);
        assert_eq!(config.source, ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("pinchy/pinchy.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r#"
profile = "dev"
seed = 7

[behavior]
idle_min_ms = 1000
idle_max_ms = 2000

[sleep]
doze_after_ms = 30000

[tutorial]
auto_start = false
resume_policy = "last-step"

[overlay]
easing = "linear"
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.profile, Profile::Dev);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.behavior.idle_interval, IntervalRange::new(1000, 2000));
        assert_eq!(config.sleep.doze_after_ms, 30_000);
        assert!(!config.tutorial.auto_start);
        assert_eq!(config.tutorial.resume_policy, ResumePolicy::FromLastStep);
        assert_eq!(config.overlay.easing, EasingFunction::Linear);
        assert_eq!(config.source, ConfigSource::File);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_with_env(Some(PathBuf::from("/nonexistent/pinchy.toml")), no_env).unwrap();
        assert_eq!(config.source, ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let file = write_toml("profile = [");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_inverted_interval_fails_validation() {
        let file = write_toml("[behavior]\nidle_min_ms = 9000\nidle_max_ms = 100\n");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("behavior.idle")));
    }

    #[test]
    fn test_rest_margin_out_of_range_fails_validation() {
        for margin in ["-2147483648", "-1", "1001"] {
            let file = write_toml(&format!("[overlay]\nrest_margin = {margin}\n"));
            let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
            assert!(
                matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("rest_margin")),
                "margin {margin}: {err:?}"
            );
        }

        let file = write_toml("[overlay]\nrest_margin = 0\n");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.overlay.rest_margin, 0);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_toml("profile = \"prod\"\n[tutorial]\nauto_start = true\n");
        let env: HashMap<&str, &str> = HashMap::from([
            ("PINCHY_PROFILE", "dev"),
            ("PINCHY_AUTO_START_TUTORIAL", "0"),
            ("PINCHY_SEED", "99"),
            ("PINCHY_RESUME_POLICY", "bogus"),
        ]);

        let config = load_config_with_env(Some(file.path().to_path_buf()), |k| {
            env.get(k).map(|v| (*v).to_string())
        })
        .unwrap();

        assert_eq!(config.profile, Profile::Dev);
        assert!(!config.tutorial.auto_start);
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.tutorial.resume_policy, ResumePolicy::RestartFromBeginning);
        assert_eq!(config.source, ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = ConductorConfig::default();
        ConfigOverrides::new()
            .with_profile(Profile::Dev)
            .with_seed(3)
            .with_resume_policy(ResumePolicy::FromLastStep)
            .apply(&mut config);

        assert_eq!(config.profile, Profile::Dev);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.tutorial.resume_policy, ResumePolicy::FromLastStep);
        assert_eq!(config.source, ConfigSource::Cli);
    }

    #[test]
    fn test_interval_sampling_stays_in_range() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let range = IntervalRange::new(3000, 8000);
        for _ in 0..200 {
            let v = range.sample(&mut rng);
            assert!((3000..=8000).contains(&v));
        }
        assert_eq!(IntervalRange::new(500, 500).sample(&mut rng), 500);
    }
}
