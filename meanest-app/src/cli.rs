use std::path::PathBuf;

use clap::Parser;
use meanest_core::{ExperimentError, Mode};

#[derive(Parser, Debug)]
#[command(author, version, about = "Category mean-estimation task", long_about = None)]
pub struct Args {
    /// Participant identifier
    #[arg(short, long, env = "MEANEST_PARTICIPANT")]
    pub participant: Option<String>,

    /// Crowd-worker id; runs the main experiment without practice
    #[arg(long, env = "MEANEST_WORKER_ID")]
    pub worker_id: Option<String>,

    /// Display mode: 1 fullscreen, 2 small window, 3 experiment
    #[arg(short, long, default_value = "1")]
    pub mode: Mode,

    /// Run the short practice protocol
    #[arg(long)]
    pub practice: bool,

    /// Session number; looked up when omitted
    #[arg(long)]
    pub session: Option<u32>,

    /// TOML settings file
    #[arg(short, long, env = "MEANEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for result files and the local session counter
    #[arg(long, env = "MEANEST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the collection server
    #[arg(long, env = "MEANEST_SERVER_URL")]
    pub server_url: Option<String>,

    /// Seed for a reproducible session
    #[arg(long)]
    pub seed: Option<u64>,

    /// TrueType font used for on-screen text
    #[arg(long, env = "MEANEST_FONT")]
    pub font: Option<PathBuf>,
}

/// Who is running and how, after the worker-id shortcut is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub mode: Mode,
    pub practice: bool,
}

impl Args {
    pub fn participant(&self) -> Result<Participant, ExperimentError> {
        if let Some(worker) = self.worker_id.as_deref().map(str::trim) {
            if !worker.is_empty() {
                return Ok(Participant {
                    id: worker.to_string(),
                    mode: Mode::Experiment,
                    practice: false,
                });
            }
        }
        let id = self
            .participant
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ExperimentError::MissingParticipant)?;
        Ok(Participant {
            id: id.to_string(),
            mode: self.mode,
            practice: self.practice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("meanest").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn participant_with_mode_and_practice() {
        let p = parse(&["-p", "s01", "--mode", "2", "--practice"])
            .participant()
            .unwrap();
        assert_eq!(
            p,
            Participant {
                id: "s01".into(),
                mode: Mode::SmallWindow,
                practice: true
            }
        );
    }

    #[test]
    fn worker_id_forces_experiment_without_practice() {
        let p = parse(&["--worker-id", "A1B2", "-p", "ignored", "--practice", "-m", "2"])
            .participant()
            .unwrap();
        assert_eq!(p.id, "A1B2");
        assert_eq!(p.mode, Mode::Experiment);
        assert!(!p.practice);
    }

    #[test]
    fn missing_participant_is_rejected() {
        let err = parse(&["-p", "  "]).participant().unwrap_err();
        assert!(matches!(err, ExperimentError::MissingParticipant));
    }

    #[test]
    fn unknown_mode_fails_to_parse() {
        assert!(Args::try_parse_from(["meanest", "-m", "7"]).is_err());
    }
}
