//! Simulator Configuration
//!
//! YAML configuration for the simulator. Every section and key is optional;
//! anything missing takes its default value.

use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Scenario sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConf {
    /// Number of simulated UEs
    pub ues: u32,
    /// Number of simulated gNodeBs
    pub gnbs: u32,
    /// PDU sessions established per UE
    pub sessions: u32,
    /// Pause between scenario steps
    pub step_delay_ms: u64,
}

impl Default for SimulationConf {
    fn default() -> Self {
        SimulationConf {
            ues: 3,
            gnbs: 2,
            sessions: 1,
            step_delay_ms: 0,
        }
    }
}

/// Packet capture output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConf {
    pub enabled: bool,
    pub path: String,
}

impl Default for CaptureConf {
    fn default() -> Self {
        CaptureConf {
            enabled: false,
            path: "nfsim.pcap".to_string(),
        }
    }
}

/// Default values applied by the NFs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConf {
    /// UPF QoS rate for newly attached sessions
    pub qos_rate_kbps: u32,
    /// PCF maximum bitrate for policies created on session establishment
    pub policy_bitrate_kbps: u32,
    /// PCF priority level for policies created on session establishment
    pub policy_priority: u32,
    /// Data network name used by the demo
    pub dnn: String,
}

impl Default for DefaultsConf {
    fn default() -> Self {
        DefaultsConf {
            qos_rate_kbps: 1000,
            policy_bitrate_kbps: 5000,
            policy_priority: 9,
            dnn: "internet".to_string(),
        }
    }
}

/// Top-level simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub logger: LogConfig,
    pub simulation: SimulationConf,
    pub capture: CaptureConf,
    pub defaults: DefaultsConf,
}

impl SimConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        // An empty document deserializes as null; treat it as all defaults
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.simulation.ues > crate::types::MAX_UES {
            return Err(ConfigError::ValidationError(format!(
                "simulation.ues {} exceeds {}",
                self.simulation.ues,
                crate::types::MAX_UES
            )));
        }
        if self.simulation.gnbs == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.gnbs must be at least 1".to_string(),
            ));
        }
        if self.simulation.gnbs > crate::types::MAX_GNBS {
            return Err(ConfigError::ValidationError(format!(
                "simulation.gnbs {} exceeds {}",
                self.simulation.gnbs,
                crate::types::MAX_GNBS
            )));
        }
        if self.capture.enabled && self.capture.path.is_empty() {
            return Err(ConfigError::ValidationError(
                "capture.path is empty".to_string(),
            ));
        }
        if self.defaults.dnn.is_empty() {
            return Err(ConfigError::ValidationError(
                "defaults.dnn is empty".to_string(),
            ));
        }
        Ok(())
    }
}
