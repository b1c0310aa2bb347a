use std::path::Path;
use std::str::FromStr;

use color_eyre::eyre::{Result, WrapErr};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Routing protocol installed on the generated experiment nodes
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// BMX6 mesh routing daemon
    Bmx6,
    /// OLSRd mesh routing daemon
    Olsrd,
    /// No experiment script is generated
    None,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bmx6" | "bmx" => Ok(Protocol::Bmx6),
            "olsrd" | "olsr" => Ok(Protocol::Olsrd),
            "none" => Ok(Protocol::None),
            other => Err(format!(
                "Unknown protocol '{}', expected bmx6, olsrd or none",
                other
            )),
        }
    }
}

/// Where the pre-walk core-node listing file is written. Historical runs of
/// the tool placed it either next to the map or with the other outputs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoreListLocation {
    /// Inside the configured output directory
    Output,
    /// In the directory containing the map file
    Map,
}

/// Top-level configuration for a topology generation run
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub sampling: SamplingConfig,
    pub output: OutputConfig,
}

/// Shared general configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    /// Base directory for generated topology directories
    pub output_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Parameters of the core-node sampling walk
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingConfig {
    /// CIDR block whose addresses mark an interface as core
    pub core_subnet: String,
    /// Exact number of core nodes the sampled topology must contain
    pub max_nodes: usize,
    /// Consecutive-revisit threshold that aborts a cycling walk
    pub repeat_limit: u32,
    /// Seed for the walk RNG; omitted means a fresh seed per run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Output emission options
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// When true, nothing is written unless the sampled size matches the
    /// target exactly; when false, node/link lists are written for
    /// undersized runs too
    pub emit_only_on_exact_match: bool,
    pub core_list_location: CoreListLocation,
    /// Write a Graphviz rendering of the sampled topology
    pub graph: bool,
    pub protocol: Protocol,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: "topologies".to_string(),
            log_level: Some("info".to_string()),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            core_subnet: "172.0.0.0/8".to_string(),
            max_nodes: 10,
            repeat_limit: 10,
            seed: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            emit_only_on_exact_match: true,
            core_list_location: CoreListLocation::Output,
            graph: true,
            protocol: Protocol::None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            sampling: SamplingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sampling.max_nodes == 0 {
            return Err(ValidationError::InvalidSampling(
                "max_nodes must be at least 1".to_string(),
            ));
        }
        if self.sampling.repeat_limit == 0 {
            return Err(ValidationError::InvalidSampling(
                "repeat_limit must be at least 1".to_string(),
            ));
        }
        if self.sampling.core_subnet.parse::<Ipv4Net>().is_err() {
            return Err(ValidationError::InvalidSampling(format!(
                "core_subnet '{}' is not a valid IPv4 CIDR block",
                self.sampling.core_subnet
            )));
        }
        if self.general.output_dir.is_empty() {
            return Err(ValidationError::InvalidGeneral(
                "output_dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The parsed core subnet. Call after `validate()`.
    pub fn core_subnet(&self) -> Result<Ipv4Net, ValidationError> {
        self.sampling.core_subnet.parse::<Ipv4Net>().map_err(|_| {
            ValidationError::InvalidSampling(format!(
                "core_subnet '{}' is not a valid IPv4 CIDR block",
                self.sampling.core_subnet
            ))
        })
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid sampling configuration: {0}")]
    InvalidSampling(String),
    #[error("Invalid output configuration: {0}")]
    InvalidOutput(String),
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read configuration file '{}'", path.display()))?;
    let config: Config = serde_yaml::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse configuration file '{}'", path.display()))?;
    config
        .validate()
        .wrap_err_with(|| format!("Invalid configuration in '{}'", path.display()))?;
    Ok(config)
}
