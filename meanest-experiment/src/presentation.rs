use std::time::Duration;

use meanest_core::{ExperimentConfig, Responses, Result, Surface, Trial};
use meanest_timing::Timer;

use crate::scene;
use crate::sequence::BlockTrials;

/// Pause between the fixation mark and stimulus onset.
pub const FIXATION_SETTLE: Duration = Duration::from_millis(50);

/// The three screens every trial passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Fixation,
    Stimulus,
    InterStimulus,
}

impl TrialPhase {
    pub const SEQUENCE: [TrialPhase; 3] = [
        TrialPhase::Fixation,
        TrialPhase::Stimulus,
        TrialPhase::InterStimulus,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationTiming {
    pub settle: Duration,
    pub stimulus: Duration,
    pub inter_stimulus: Duration,
}

impl PresentationTiming {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            settle: FIXATION_SETTLE,
            stimulus: config.stimulus_duration(),
            inter_stimulus: config.inter_stimulus_interval(),
        }
    }

    pub fn hold(&self, phase: TrialPhase) -> Duration {
        match phase {
            TrialPhase::Fixation => self.settle,
            TrialPhase::Stimulus => self.stimulus,
            TrialPhase::InterStimulus => self.inter_stimulus,
        }
    }

    pub fn per_trial(&self) -> Duration {
        self.settle + self.stimulus + self.inter_stimulus
    }
}

fn show<S: Surface + ?Sized>(surface: &mut S, phase: TrialPhase, trial: &Trial) -> Result<()> {
    match phase {
        TrialPhase::Fixation | TrialPhase::InterStimulus => scene::draw_fixation(surface),
        TrialPhase::Stimulus => scene::draw_stimulus(surface, trial),
    }
}

/// Shows every trial of the block in order and returns the response slots.
///
/// Nothing is read from the participant here; each slot gets the
/// placeholder described on [`Responses`].
pub fn present_block<S, T>(
    trials: &BlockTrials,
    timing: &PresentationTiming,
    surface: &mut S,
    timer: &T,
) -> Result<Responses>
where
    S: Surface + ?Sized,
    T: Timer,
{
    let mut responses = Responses::with_capacity(trials.len());
    for (i, trial) in trials.trials().enumerate() {
        let start = timer.now();
        for phase in TrialPhase::SEQUENCE {
            show(surface, phase, &trial)?;
            timer.sleep(timing.hold(phase));
        }
        responses.record_placeholder(&trial);
        tracing::debug!(
            trial = i,
            category = trial.category.index(),
            angle = trial.angle_deg,
            took_ms = timer.elapsed(start).as_secs_f64() * 1e3,
            "trial presented"
        );
    }
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::build_block_trials;
    use meanest_core::{BlockSpec, Category, DrawCommand, RecordingSurface, rng::session_rng};
    use meanest_timing::VirtualTimer;

    fn timing() -> PresentationTiming {
        PresentationTiming {
            settle: FIXATION_SETTLE,
            stimulus: Duration::from_millis(300),
            inter_stimulus: Duration::from_millis(600),
        }
    }

    #[test]
    fn sleeps_follow_the_trial_phases() {
        let mut rng = session_rng(Some(4));
        let trials = build_block_trials(&BlockSpec::new(45.0, 30.0, 2), 5.0, &mut rng).unwrap();
        let timer = VirtualTimer::new();
        let mut surface = RecordingSurface::default();
        present_block(&trials, &timing(), &mut surface, &timer).unwrap();

        let expected: Vec<Duration> = (0..4)
            .flat_map(|_| {
                [
                    Duration::from_millis(50),
                    Duration::from_millis(300),
                    Duration::from_millis(600),
                ]
            })
            .collect();
        assert_eq!(timer.sleeps(), expected);
        assert_eq!(surface.frames().len(), 12);
    }

    #[test]
    fn stimuli_appear_in_delivered_order() {
        let mut rng = session_rng(Some(21));
        let trials = build_block_trials(&BlockSpec::new(0.0, 20.0, 3), 16.0, &mut rng).unwrap();
        let timer = VirtualTimer::new();
        let mut surface = RecordingSurface::default();
        let responses = present_block(&trials, &timing(), &mut surface, &timer).unwrap();

        let shown: Vec<Category> = surface
            .frames()
            .iter()
            .skip(1)
            .step_by(3)
            .map(|frame| match frame[1] {
                DrawCommand::Circle { color, .. } if color == meanest_core::Rgba::BLUE => {
                    Category::Blue
                }
                _ => Category::Red,
            })
            .collect();
        assert_eq!(shown, trials.categories);
        let echoed: Vec<Category> = responses.category.iter().flatten().copied().collect();
        assert_eq!(echoed, trials.categories);
        assert!(responses.rt.iter().all(Option::is_none));
    }

    #[test]
    fn per_trial_is_sum_of_holds() {
        assert_eq!(timing().per_trial(), Duration::from_millis(950));
    }
}
