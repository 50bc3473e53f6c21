//! TOML Configuration File Support
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/magic-man/config.toml`
//! (typically `~/.config/magic-man/config.toml`).
//!
//! # Configuration Priority
//!
//! Values are layered with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! agent_id = "agent_01jwjae7vne90bgqjkz1tttv7w"
//!
//! [channel]
//! kind = "websocket"
//! endpoint = "wss://api.elevenlabs.io/v1/convai/conversation"
//! connect_timeout_ms = 10000
//!
//! [microphone]
//! policy = "device"
//!
//! [dismissal]
//! keywords = ["goodbye", "bye", "done"]
//! display_secs = 4
//! check_delay_ms = 1000
//!
//! [animation]
//! poof_frame_ms = 150
//! idle_frame_ms = 800
//! talking_frame_ms = 150
//! exit_transition = "immediate"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animator::ExitTransition;

/// Agent the page talks to unless configured otherwise
pub const DEFAULT_AGENT_ID: &str = "agent_01jwjae7vne90bgqjkz1tttv7w";

/// Hosted conversational-agent WebSocket endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://api.elevenlabs.io/v1/convai/conversation";

/// Words in an agent line that suggest it is about to hang up
pub const DEFAULT_DISMISSIVE_KEYWORDS: &[&str] = &[
    "goodbye", "bye", "done", "can't", "won't", "boring", "waste",
];

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
// Sections
// =============================================================================

/// Which voice channel implementation to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Hosted agent over WebSocket
    #[default]
    Websocket,
    /// Built-in demo script, no network
    Scripted,
}

impl FromStr for ChannelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "websocket" | "ws" => Ok(Self::Websocket),
            "scripted" | "demo" => Ok(Self::Scripted),
            other => Err(ConfigError::ValidationError(format!(
                "unknown channel kind '{other}'"
            ))),
        }
    }
}

/// How microphone permission is decided
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicrophonePolicy {
    /// Probe the capture device
    #[default]
    Device,
    /// Always grant
    Allow,
    /// Always refuse
    Deny,
}

impl FromStr for MicrophonePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "device" => Ok(Self::Device),
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(ConfigError::ValidationError(format!(
                "unknown microphone policy '{other}'"
            ))),
        }
    }
}

/// Voice channel settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel implementation
    pub kind: ChannelKind,
    /// WebSocket endpoint (agent id is appended as a query parameter)
    pub endpoint: String,
    /// Upper bound on opening the channel
    pub connect_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: ChannelKind::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_ms: 10_000,
        }
    }
}

impl ChannelConfig {
    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Microphone settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrophoneConfig {
    /// Permission policy
    pub policy: MicrophonePolicy,
}

/// Hang-up heuristic settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DismissalConfig {
    /// Case-insensitive substrings that mark an agent line as dismissive
    pub keywords: Vec<String>,
    /// How long the banner stays up
    pub display_secs: u64,
    /// Delay before a dismissive line is checked against the session state
    pub check_delay_ms: u64,
}

impl Default for DismissalConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_DISMISSIVE_KEYWORDS
                .iter()
                .map(|k| (*k).to_string())
                .collect(),
            display_secs: 4,
            check_delay_ms: 1000,
        }
    }
}

impl DismissalConfig {
    /// Banner lifetime
    pub fn display_duration(&self) -> Duration {
        Duration::from_secs(self.display_secs)
    }

    /// Delay for the keyword check
    pub fn check_delay(&self) -> Duration {
        Duration::from_millis(self.check_delay_ms)
    }
}

/// Character animation timing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Duration of each poof frame
    pub poof_frame_ms: u64,
    /// Duration of each idle (mouth closed) frame
    pub idle_frame_ms: u64,
    /// Duration of each talking (mouth open) frame
    pub talking_frame_ms: u64,
    /// What happens when the character leaves
    pub exit_transition: ExitTransition,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            poof_frame_ms: 150,
            idle_frame_ms: 800,
            talking_frame_ms: 150,
            exit_transition: ExitTransition::default(),
        }
    }
}

impl AnimationConfig {
    /// Poof frame duration
    pub fn poof_frame(&self) -> Duration {
        Duration::from_millis(self.poof_frame_ms)
    }

    /// Idle frame duration
    pub fn idle_frame(&self) -> Duration {
        Duration::from_millis(self.idle_frame_ms)
    }

    /// Talking frame duration
    pub fn talking_frame(&self) -> Duration {
        Duration::from_millis(self.talking_frame_ms)
    }
}

// =============================================================================
// Root Configuration
// =============================================================================

/// Complete Magic Man configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicConfig {
    /// Hosted agent identifier
    pub agent_id: String,
    /// Maximum transcript lines kept for display
    pub transcript_limit: usize,
    /// Voice channel settings
    pub channel: ChannelConfig,
    /// Microphone settings
    pub microphone: MicrophoneConfig,
    /// Hang-up heuristic settings
    pub dismissal: DismissalConfig,
    /// Character animation timing
    pub animation: AnimationConfig,
}

impl Default for MagicConfig {
    fn default() -> Self {
        Self {
            agent_id: DEFAULT_AGENT_ID.to_string(),
            transcript_limit: 50,
            channel: ChannelConfig::default(),
            microphone: MicrophoneConfig::default(),
            dismissal: DismissalConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Agent id override
    pub agent_id: Option<String>,
    /// Endpoint override
    pub endpoint: Option<String>,
    /// Channel kind override
    pub channel: Option<ChannelKind>,
    /// Microphone policy override
    pub microphone: Option<MicrophonePolicy>,
    /// Exit transition override
    pub exit_transition: Option<ExitTransition>,
}

/// Default config file path (`$XDG_CONFIG_HOME/magic-man/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("magic-man").join("config.toml"))
}

impl MagicConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load configuration with full layering.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// when present, otherwise defaults apply.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::load_from_path(&default)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;

        tracing::debug!(
            agent_id = %config.agent_id,
            channel = ?config.channel.kind,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Apply environment variables through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(agent_id) = lookup("MAGIC_MAN_AGENT_ID") {
            self.agent_id = agent_id;
        }
        if let Some(endpoint) = lookup("MAGIC_MAN_ENDPOINT") {
            self.channel.endpoint = endpoint;
        }
        if let Some(kind) = lookup("MAGIC_MAN_CHANNEL") {
            self.channel.kind = kind.parse()?;
        }
        if let Some(policy) = lookup("MAGIC_MAN_MICROPHONE") {
            self.microphone.policy = policy.parse()?;
        }
        Ok(())
    }

    /// Apply CLI overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(agent_id) = &overrides.agent_id {
            self.agent_id = agent_id.clone();
        }
        if let Some(endpoint) = &overrides.endpoint {
            self.channel.endpoint = endpoint.clone();
        }
        if let Some(kind) = overrides.channel {
            self.channel.kind = kind;
        }
        if let Some(policy) = overrides.microphone {
            self.microphone.policy = policy;
        }
        if let Some(exit) = overrides.exit_transition {
            self.animation.exit_transition = exit;
        }
    }

    /// Check that values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "agent_id must not be empty".into(),
            ));
        }
        if !self
            .agent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::ValidationError(format!(
                "agent_id '{}' contains characters outside [A-Za-z0-9_-]",
                self.agent_id
            )));
        }
        if self.channel.kind == ChannelKind::Websocket
            && !(self.channel.endpoint.starts_with("ws://")
                || self.channel.endpoint.starts_with("wss://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "endpoint '{}' must start with ws:// or wss://",
                self.channel.endpoint
            )));
        }
        if self.channel.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_ms must be greater than zero".into(),
            ));
        }
        let anim = &self.animation;
        if anim.poof_frame_ms == 0 || anim.idle_frame_ms == 0 || anim.talking_frame_ms == 0 {
            return Err(ConfigError::ValidationError(
                "animation frame durations must be greater than zero".into(),
            ));
        }
        if self.dismissal.display_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dismissal display_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
