use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::block::BlockSpec;
use crate::error::{ExperimentError, Result};

/// Display mode the session was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Fullscreen,
    SmallWindow,
    Experiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSettings {
    pub fullscreen: bool,
    pub size: Option<(u32, u32)>,
}

impl Mode {
    pub fn window(self) -> WindowSettings {
        match self {
            Mode::Fullscreen | Mode::Experiment => WindowSettings {
                fullscreen: true,
                size: None,
            },
            Mode::SmallWindow => WindowSettings {
                fullscreen: false,
                size: Some((1000, 600)),
            },
        }
    }

    /// Keys reserved for a per-trial judgment. Nothing reads them during
    /// presentation yet.
    pub fn response_keys(self) -> [&'static str; 2] {
        match self {
            Mode::Fullscreen => ["9", "13"],
            Mode::SmallWindow | Mode::Experiment => ["5", "6"],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Fullscreen => "fullscreen",
            Mode::SmallWindow => "small-window",
            Mode::Experiment => "experiment",
        })
    }
}

impl FromStr for Mode {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "fullscreen" => Ok(Mode::Fullscreen),
            "2" | "small-window" | "small" => Ok(Mode::SmallWindow),
            "3" | "experiment" => Ok(Mode::Experiment),
            other => Err(ExperimentError::invalid(format!("unknown mode '{other}'"))),
        }
    }
}

/// Session parameters fixed before the first block.
///
/// Field names on the wire follow the result files the lab already
/// collects (`subjID`, `session`, `isitime`, `prestime`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(rename = "subjID")]
    pub participant_id: String,
    #[serde(rename = "session")]
    pub session_number: u32,
    pub mode: Mode,
    pub practice: bool,
    #[serde(rename = "isitime")]
    pub inter_stimulus_interval_sec: f64,
    #[serde(rename = "prestime")]
    pub stimulus_duration_sec: f64,
}

impl ExperimentConfig {
    pub const DEFAULT_ISI_SEC: f64 = 0.6;
    pub const DEFAULT_STIMULUS_SEC: f64 = 0.3;

    pub fn new(
        participant_id: impl Into<String>,
        session_number: u32,
        mode: Mode,
        practice: bool,
    ) -> Result<Self> {
        let config = Self {
            participant_id: participant_id.into().trim().to_string(),
            session_number,
            mode,
            practice,
            inter_stimulus_interval_sec: Self::DEFAULT_ISI_SEC,
            stimulus_duration_sec: Self::DEFAULT_STIMULUS_SEC,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_timing(mut self, isi_sec: f64, stimulus_sec: f64) -> Result<Self> {
        self.inter_stimulus_interval_sec = isi_sec;
        self.stimulus_duration_sec = stimulus_sec;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.participant_id.trim().is_empty() {
            return Err(ExperimentError::MissingParticipant);
        }
        if self.session_number == 0 {
            return Err(ExperimentError::invalid("session numbers start at 1"));
        }
        for (name, v) in [
            ("inter-stimulus interval", self.inter_stimulus_interval_sec),
            ("stimulus duration", self.stimulus_duration_sec),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ExperimentError::invalid(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }
        Ok(())
    }

    pub fn stimulus_duration(&self) -> Duration {
        Duration::from_secs_f64(self.stimulus_duration_sec)
    }

    pub fn inter_stimulus_interval(&self) -> Duration {
        Duration::from_secs_f64(self.inter_stimulus_interval_sec)
    }

    /// `prct` for practice sessions, `expt` otherwise.
    pub fn file_tag(&self) -> &'static str {
        if self.practice { "prct" } else { "expt" }
    }

    /// `categ_{expt|prct}_{subjID}_sess{N}.json`, with the participant ID
    /// reduced to characters that cannot leave the data directory.
    pub fn result_file_name(&self) -> String {
        format!(
            "categ_{}_{}_sess{}.json",
            self.file_tag(),
            file_safe(&self.participant_id),
            self.session_number
        )
    }
}

/// Replaces everything outside `[A-Za-z0-9_-]` with `_`.
fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Where the block centers come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CenterPlan {
    Fixed(Vec<f64>),
    /// `count` centers drawn uniformly from [-180, 180).
    Random { count: usize },
}

/// Stimulus statistics shared by every block of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolParams {
    pub delta_deg: f64,
    pub sigma_deg: f64,
    pub trials_per_category: usize,
    pub centers: CenterPlan,
}

impl ProtocolParams {
    pub fn practice() -> Self {
        Self {
            delta_deg: 30.0,
            sigma_deg: 5.0,
            trials_per_category: 2,
            centers: CenterPlan::Fixed(vec![0.0, 45.0, 90.0, 135.0, 180.0, 225.0]),
        }
    }

    pub fn experiment() -> Self {
        Self {
            delta_deg: 20.0,
            sigma_deg: 16.0,
            trials_per_category: 12,
            centers: CenterPlan::Random { count: 36 },
        }
    }

    pub fn for_config(config: &ExperimentConfig) -> Self {
        if config.practice {
            Self::practice()
        } else {
            Self::experiment()
        }
    }

    pub fn block_count(&self) -> usize {
        match &self.centers {
            CenterPlan::Fixed(c) => c.len(),
            CenterPlan::Random { count } => *count,
        }
    }

    /// Lays out the ordered block list for one session.
    pub fn block_specs<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<BlockSpec>> {
        if !(self.sigma_deg.is_finite() && self.sigma_deg >= 0.0) {
            return Err(ExperimentError::invalid(format!(
                "sigma must be a non-negative number, got {}",
                self.sigma_deg
            )));
        }
        let centers: Vec<f64> = match &self.centers {
            CenterPlan::Fixed(c) => c.clone(),
            CenterPlan::Random { count } => (0..*count)
                .map(|_| rng.random::<f64>() * 360.0 - 180.0)
                .collect(),
        };
        let specs: Vec<BlockSpec> = centers
            .into_iter()
            .map(|c| BlockSpec::new(c, self.delta_deg, self.trials_per_category))
            .collect();
        for spec in &specs {
            spec.validate()?;
        }
        Ok(specs)
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::experiment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::session_rng;

    #[test]
    fn blank_participant_is_missing() {
        let err = ExperimentConfig::new("   ", 1, Mode::Experiment, false).unwrap_err();
        assert!(matches!(err, ExperimentError::MissingParticipant));
    }

    #[test]
    fn zero_session_rejected() {
        assert!(ExperimentConfig::new("p01", 0, Mode::Experiment, false).is_err());
    }

    #[test]
    fn non_positive_durations_rejected() {
        let cfg = ExperimentConfig::new("p01", 1, Mode::Experiment, false).unwrap();
        assert!(cfg.clone().with_timing(0.0, 0.3).is_err());
        assert!(cfg.clone().with_timing(0.6, -0.1).is_err());
        assert!(cfg.with_timing(f64::NAN, 0.3).is_err());
    }

    #[test]
    fn file_name_follows_practice_flag() {
        let cfg = ExperimentConfig::new("p01", 3, Mode::SmallWindow, true).unwrap();
        assert_eq!(cfg.result_file_name(), "categ_prct_p01_sess3.json");
        let cfg = ExperimentConfig::new("p01", 4, Mode::Fullscreen, false).unwrap();
        assert_eq!(cfg.result_file_name(), "categ_expt_p01_sess4.json");
    }

    #[test]
    fn file_name_never_contains_path_separators() {
        let cfg = ExperimentConfig::new("lab/S01", 1, Mode::Experiment, false).unwrap();
        assert_eq!(cfg.result_file_name(), "categ_expt_lab_S01_sess1.json");
        let cfg = ExperimentConfig::new("../x", 2, Mode::Experiment, false).unwrap();
        assert_eq!(cfg.result_file_name(), "categ_expt____x_sess2.json");
        let cfg = ExperimentConfig::new(r"C:\tmp w", 1, Mode::Experiment, true).unwrap();
        assert_eq!(cfg.result_file_name(), "categ_prct_C__tmp_w_sess1.json");
        // the raw ID is what ends up in the record
        assert_eq!(cfg.participant_id, r"C:\tmp w");
    }

    #[test]
    fn meta_uses_lab_field_names() {
        let cfg = ExperimentConfig::new("w42", 2, Mode::Experiment, false).unwrap();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["subjID"], "w42");
        assert_eq!(json["session"], 2);
        assert_eq!(json["mode"], "experiment");
        assert_eq!(json["isitime"], 0.6);
        assert_eq!(json["prestime"], 0.3);
    }

    #[test]
    fn modes_parse_from_numbers_and_names() {
        assert_eq!("1".parse::<Mode>().unwrap(), Mode::Fullscreen);
        assert_eq!("small-window".parse::<Mode>().unwrap(), Mode::SmallWindow);
        assert_eq!(" Experiment ".parse::<Mode>().unwrap(), Mode::Experiment);
        assert!("4".parse::<Mode>().is_err());
        assert_eq!(Mode::SmallWindow.window().size, Some((1000, 600)));
        assert_eq!(Mode::Fullscreen.response_keys(), ["9", "13"]);
    }

    #[test]
    fn practice_blocks_use_fixed_centers() {
        let mut rng = session_rng(Some(3));
        let specs = ProtocolParams::practice().block_specs(&mut rng).unwrap();
        let centers: Vec<f64> = specs.iter().map(|s| s.center_angle_deg).collect();
        assert_eq!(centers, vec![0.0, 45.0, 90.0, 135.0, 180.0, 225.0]);
        assert!(specs.iter().all(|s| s.delta_deg == 30.0 && s.trials_per_category == 2));
    }

    #[test]
    fn experiment_centers_are_random_in_range() {
        let mut rng = session_rng(Some(11));
        let params = ProtocolParams::experiment();
        let specs = params.block_specs(&mut rng).unwrap();
        assert_eq!(specs.len(), 36);
        assert_eq!(params.block_count(), 36);
        assert!(specs
            .iter()
            .all(|s| (-180.0..180.0).contains(&s.center_angle_deg)));
    }

    #[test]
    fn zero_trial_protocol_fails_fast() {
        let mut rng = session_rng(Some(0));
        let params = ProtocolParams {
            trials_per_category: 0,
            ..ProtocolParams::practice()
        };
        assert!(params.block_specs(&mut rng).is_err());
    }
}
