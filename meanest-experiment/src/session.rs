use std::time::Duration;

use chrono::Utc;
use meanest_core::input::Listening;
use meanest_core::rng::shuffle;
use meanest_core::{
    BlockRecord, BlockSpec, Category, ExperimentConfig, ExperimentError, InputEvent, InputKind,
    InputSource, MeanEstimates, ProtocolParams, Result, ResultSink, SessionRecord, Surface,
};
use meanest_timing::Timer;
use rand::Rng;
use tracing::{debug, error, info};

use crate::presentation::{PresentationTiming, present_block};
use crate::probe::{Probe, ProbeOutcome};
use crate::scene;
use crate::sequence::build_block_trials;

/// Pause between the last probe of one block and the first trial of the next.
pub const INTER_BLOCK_PAUSE: Duration = Duration::from_millis(200);

/// How long the abort notice stays up before the next probe replaces it.
pub const ABORT_NOTICE_HOLD: Duration = Duration::from_secs(1);

const START_INPUTS: [InputKind; 1] = [InputKind::Key];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingStart,
    RunningBlock(usize),
    Finalizing,
    Done,
}

/// The ordered blocks of a session and the noise shared by all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockPlan {
    pub blocks: Vec<BlockSpec>,
    pub sigma_deg: f64,
}

impl BlockPlan {
    pub fn new(blocks: Vec<BlockSpec>, sigma_deg: f64) -> Self {
        Self { blocks, sigma_deg }
    }

    pub fn from_protocol<R: Rng + ?Sized>(params: &ProtocolParams, rng: &mut R) -> Result<Self> {
        Ok(Self::new(params.block_specs(rng)?, params.sigma_deg))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sigma_deg.is_finite() && self.sigma_deg >= 0.0) {
            return Err(ExperimentError::invalid(format!(
                "sigma must be a non-negative number, got {}",
                self.sigma_deg
            )));
        }
        self.blocks.iter().try_for_each(BlockSpec::validate)
    }
}

/// Drives one participant session from the start prompt to the hand-off of
/// the finished record.
pub struct Session<S, I, T, R, K>
where
    S: Surface,
    I: InputSource,
    T: Timer,
    R: Rng,
    K: ResultSink,
{
    state: SessionState,
    plan: BlockPlan,
    timing: PresentationTiming,
    wait_for_start: bool,
    record: Option<SessionRecord>,
    finished: Option<SessionRecord>,
    pub surface: S,
    pub input: I,
    pub timer: T,
    pub rng: R,
    pub sink: K,
}

impl<S, I, T, R, K> Session<S, I, T, R, K>
where
    S: Surface,
    I: InputSource,
    T: Timer,
    R: Rng,
    K: ResultSink,
{
    /// Validates everything up front; nothing is drawn if this fails.
    pub fn new(
        config: ExperimentConfig,
        plan: BlockPlan,
        surface: S,
        input: I,
        timer: T,
        rng: R,
        sink: K,
    ) -> Result<Self> {
        config.validate()?;
        plan.validate()?;
        info!(
            participant = %config.participant_id,
            session = config.session_number,
            mode = %config.mode,
            practice = config.practice,
            blocks = plan.blocks.len(),
            "session prepared"
        );
        Ok(Self {
            state: SessionState::AwaitingStart,
            timing: PresentationTiming::from_config(&config),
            plan,
            wait_for_start: true,
            record: Some(SessionRecord::start(config, Utc::now())),
            finished: None,
            surface,
            input,
            timer,
            rng,
            sink,
        })
    }

    /// Begin with the first block instead of waiting for a key press.
    pub fn without_start_prompt(mut self) -> Self {
        self.wait_for_start = false;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn plan(&self) -> &BlockPlan {
        &self.plan
    }

    /// The record while the session is in progress.
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    /// The record after finalization.
    pub fn finished(&self) -> Option<&SessionRecord> {
        self.finished.as_ref()
    }

    /// Runs every remaining step and returns the finalized record.
    ///
    /// On failure a notice is drawn, the error is returned and the session
    /// stays where it stopped; it is never finalized.
    pub fn run(&mut self) -> Result<SessionRecord> {
        loop {
            match self.step() {
                Ok(SessionState::Done) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, state = ?self.state, "session halted");
                    let notice = scene::draw_message(&mut self.surface, scene::FAILURE_NOTICE);
                    if let Err(draw_err) = notice {
                        error!(error = %draw_err, "could not show failure notice");
                    }
                    return Err(e);
                }
            }
        }
        self.finished.clone().ok_or(ExperimentError::AlreadyFinalized)
    }

    /// Performs one transition and returns the new state.
    pub fn step(&mut self) -> Result<SessionState> {
        let next = match self.state {
            SessionState::AwaitingStart => {
                if self.wait_for_start {
                    self.await_start()?;
                }
                self.first_state()
            }
            SessionState::RunningBlock(index) => {
                self.run_block(index)?;
                if index + 1 < self.plan.blocks.len() {
                    self.timer.sleep(INTER_BLOCK_PAUSE);
                    SessionState::RunningBlock(index + 1)
                } else {
                    SessionState::Finalizing
                }
            }
            SessionState::Finalizing => {
                self.finalize()?;
                SessionState::Done
            }
            SessionState::Done => SessionState::Done,
        };
        self.state = next;
        Ok(next)
    }

    fn first_state(&self) -> SessionState {
        if self.plan.blocks.is_empty() {
            SessionState::Finalizing
        } else {
            SessionState::RunningBlock(0)
        }
    }

    fn await_start(&mut self) -> Result<()> {
        scene::draw_message(&mut self.surface, scene::START_PROMPT)?;
        let mut listening = Listening::attach(&mut self.input, &START_INPUTS);
        loop {
            match listening.next_event() {
                Some(InputEvent::Key(key)) => {
                    debug!(?key, "start key received");
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    return Err(ExperimentError::InputClosed {
                        waiting_for: "start key",
                    });
                }
            }
        }
    }

    fn run_block(&mut self, index: usize) -> Result<()> {
        let spec = self
            .plan
            .blocks
            .get(index)
            .cloned()
            .ok_or_else(|| ExperimentError::invalid(format!("no block {index}")))?;
        info!(
            block = index + 1,
            of = self.plan.blocks.len(),
            center = spec.center_angle_deg,
            delta = spec.delta_deg,
            "block started"
        );

        let trials = build_block_trials(&spec, self.plan.sigma_deg, &mut self.rng)?;
        let responses = present_block(&trials, &self.timing, &mut self.surface, &self.timer)?;
        let mean_estimates = self.collect_estimates()?;

        let block = BlockRecord {
            block_info: spec,
            stimuli: trials.trials().collect(),
            responses,
            mean_estimates,
        };
        self.record
            .as_mut()
            .ok_or(ExperimentError::AlreadyFinalized)?
            .push_block(block)?;
        info!(block = index + 1, "block recorded");
        Ok(())
    }

    /// One probe per category, in a fresh random order each block.
    fn collect_estimates(&mut self) -> Result<MeanEstimates> {
        let mut order = Category::ALL;
        shuffle(&mut order, &mut self.rng);
        let mut slots = [f64::NAN; 2];
        for category in order {
            let outcome = Probe::new(category).run(&mut self.input, &mut self.surface)?;
            if outcome == ProbeOutcome::Aborted {
                self.timer.sleep(ABORT_NOTICE_HOLD);
            }
            slots[category.index()] = outcome.estimate();
        }
        Ok(MeanEstimates::new(slots[0], slots[1]))
    }

    fn finalize(&mut self) -> Result<()> {
        let mut record = self.record.take().ok_or(ExperimentError::AlreadyFinalized)?;
        record.finalize(Utc::now())?;
        info!(
            blocks = record.blocks.len(),
            seconds = record.meta.total_time_sec,
            "session finalized"
        );
        if let Err(e) = self.sink.deliver(&record) {
            error!(error = %e, "could not store session results");
        }
        self.finished = Some(record);
        if let Err(e) = scene::draw_message(&mut self.surface, scene::COMPLETE_MESSAGE) {
            error!(error = %e, "could not show completion message");
        }
        Ok(())
    }
}
