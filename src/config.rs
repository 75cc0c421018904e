//! Host-supplied configuration
//!
//! - Server endpoint (opaque to the core, handed to the client library)
//! - Session arguments (session name)
//! - Editable properties (display name, audio bitrate)
//! - Client init options derived from the properties

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MeetingError;

/// Lowest Opus average bitrate the host may request
pub const MIN_BITRATE: u32 = 6_000;
/// Highest Opus average bitrate the host may request
pub const MAX_BITRATE: u32 = 510_000;
/// Bitrate used when the host does not set one
pub const DEFAULT_BITRATE: u32 = 48_000;

const DEFAULT_SESSION_PREFIX: &str = "meeting";
const DEFAULT_DISPLAY_PREFIX: &str = "Meeting User";

/// Hosts of the conferencing deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostsOptions {
    pub domain: String,
    pub focus: String,
    pub muc: String,
}

/// Signaling endpoint of the conferencing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOptions {
    pub hosts: HostsOptions,
    /// BOSH (HTTP binding) URL used for the signaling link
    pub bosh: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            hosts: HostsOptions {
                domain: "meet.jit.si".to_string(),
                focus: "focus.meet.jit.si".to_string(),
                muc: "conference.meet.jit.si".to_string(),
            },
            bosh: "https://meet.jit.si/http-bind".to_string(),
        }
    }
}

impl ServerOptions {
    /// Load server options from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read server options: {}", path.display()))?;
        let options: ServerOptions = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse server options: {}", path.display()))?;
        options.validate()?;

        info!("Loaded server options for domain '{}'", options.hosts.domain);
        Ok(options)
    }

    /// Reject options the client library could never connect with
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.hosts.domain.trim().is_empty() {
            return Err(MeetingError::Config("empty server domain".to_string()));
        }
        if !self.bosh.starts_with("https://") && !self.bosh.starts_with("http://") {
            return Err(MeetingError::Config(format!(
                "signaling URL must be http(s): '{}'",
                self.bosh
            )));
        }
        Ok(())
    }
}

/// Creation arguments: which session to join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingArgs {
    pub session_name: String,
}

impl Default for MeetingArgs {
    fn default() -> Self {
        Self {
            session_name: default_session_name(),
        }
    }
}

/// Editable properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingProps {
    #[serde(rename = "username")]
    pub display_name: String,
    pub opus_max_average_bitrate: u32,
}

impl Default for MeetingProps {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            opus_max_average_bitrate: DEFAULT_BITRATE,
        }
    }
}

/// Partial property change delivered by the host
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropsUpdate {
    #[serde(default, rename = "username")]
    pub display_name: Option<String>,
    /// Raw host value; coerced with [`coerce_bitrate`]
    #[serde(default)]
    pub opus_max_average_bitrate: Option<Value>,
}

/// Everything the coordinator reads from the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingConfig {
    pub server: ServerOptions,
    pub args: MeetingArgs,
    pub props: MeetingProps,
}

/// Opus settings handed to the client library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuality {
    pub stereo: bool,
    pub opus_max_average_bitrate: u32,
    pub enable_opus_dtx: bool,
}

/// Client library initialization options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOptions {
    pub disable_audio_levels: bool,
    pub audio_quality: AudioQuality,
}

impl InitOptions {
    pub fn from_props(props: &MeetingProps) -> Self {
        Self {
            disable_audio_levels: true,
            audio_quality: AudioQuality {
                stereo: false,
                opus_max_average_bitrate: props.opus_max_average_bitrate,
                enable_opus_dtx: false,
            },
        }
    }
}

/// Session name derived from today's date, e.g. `meeting202403-15`
pub fn default_session_name() -> String {
    format!(
        "{}{}",
        DEFAULT_SESSION_PREFIX,
        chrono::Utc::now().format("%Y%m-%d")
    )
}

/// Display name with a random three digit suffix
pub fn default_display_name() -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 1000;
    format!("{} {:03}", DEFAULT_DISPLAY_PREFIX, suffix)
}

/// Coerce a host value into an Opus bitrate
///
/// Numbers and numeric strings are truncated toward zero, anything else counts
/// as 0. The result is clamped into [`MIN_BITRATE`]..=[`MAX_BITRATE`].
pub fn coerce_bitrate(value: &Value) -> u32 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    let truncated = if raw.is_finite() { raw.trunc() } else { 0.0 };
    let clamped = truncated.clamp(MIN_BITRATE as f64, MAX_BITRATE as f64);
    if clamped != truncated {
        warn!(
            "Bitrate {} outside {}..={}, using {}",
            value, MIN_BITRATE, MAX_BITRATE, clamped
        );
    }

    clamped as u32
}
