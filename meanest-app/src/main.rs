mod app;
mod cli;
mod input;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use meanest_core::{ExperimentConfig, session_rng};
use meanest_experiment::BlockPlan;
use meanest_render::load_font;
use meanest_store::{RemoteStore, SessionArchive, resolve_session_number};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{App, SessionSetup};
use crate::cli::Args;
use crate::settings::Settings;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    let participant = args.participant()?;

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| settings.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from("data"));
    let remote = args
        .server_url
        .as_deref()
        .or(settings.server_url.as_deref())
        .map(RemoteStore::new)
        .transpose()
        .context("configuring the collection server")?;
    let archive = SessionArchive::new(&data_dir, remote);

    let session_number = match args.session {
        Some(n) => n,
        None => resolve_session_number(archive.remote(), archive.counter(), &participant.id)
            .context("choosing a session number")?,
    };

    let config = ExperimentConfig::new(
        participant.id,
        session_number,
        participant.mode,
        participant.practice,
    )?
    .with_timing(settings.timing.isi_sec, settings.timing.stimulus_sec)?;

    let mut rng = session_rng(args.seed);
    let params = settings.protocol_for(&config);
    let plan = BlockPlan::from_protocol(&params, &mut rng)?;
    plan.validate()?;
    info!(
        participant = %config.participant_id,
        session = config.session_number,
        practice = config.practice,
        blocks = plan.blocks.len(),
        trials_per_category = params.trials_per_category,
        data_dir = %data_dir.display(),
        "configuration resolved"
    );

    let font = match args.font.as_ref().or(settings.font.as_ref()) {
        Some(path) => match load_font(path) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("could not load font ({e:#}), text will be missing");
                None
            }
        },
        None => None,
    };

    App::new(SessionSetup {
        config,
        plan,
        rng,
        archive,
        font,
    })
    .run()
}
