use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use meanest_core::{CenterPlan, ExperimentConfig, ProtocolParams};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timing: TimingConfig,
    pub protocol: ProtocolSection,
    pub data_dir: Option<PathBuf>,
    pub server_url: Option<String>,
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub isi_sec: f64,
    pub stimulus_sec: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            isi_sec: ExperimentConfig::DEFAULT_ISI_SEC,
            stimulus_sec: ExperimentConfig::DEFAULT_STIMULUS_SEC,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProtocolSection {
    pub practice: ProtocolOverrides,
    pub experiment: ProtocolOverrides,
}

/// Fields left out keep the built-in protocol value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProtocolOverrides {
    pub delta_deg: Option<f64>,
    pub sigma_deg: Option<f64>,
    pub trials_per_category: Option<usize>,
    /// Truncates a fixed center list, or sets how many random centers are drawn.
    pub block_count: Option<usize>,
}

impl ProtocolOverrides {
    pub fn apply(&self, mut params: ProtocolParams) -> ProtocolParams {
        if let Some(v) = self.delta_deg {
            params.delta_deg = v;
        }
        if let Some(v) = self.sigma_deg {
            params.sigma_deg = v;
        }
        if let Some(v) = self.trials_per_category {
            params.trials_per_category = v;
        }
        if let Some(n) = self.block_count {
            match &mut params.centers {
                CenterPlan::Fixed(centers) => centers.truncate(n),
                CenterPlan::Random { count } => *count = n,
            }
        }
        params
    }
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse TOML config")
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn protocol_for(&self, config: &ExperimentConfig) -> ProtocolParams {
        let overrides = if config.practice {
            &self.protocol.practice
        } else {
            &self.protocol.experiment
        };
        overrides.apply(ProtocolParams::for_config(config))
    }
}
