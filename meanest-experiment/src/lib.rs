pub mod presentation;
pub mod probe;
pub mod scene;
pub mod sequence;
pub mod session;

pub use presentation::{PresentationTiming, TrialPhase, present_block};
pub use probe::{Probe, ProbeOutcome, ProbeStep};
pub use sequence::{BlockTrials, build_block_trials};
pub use session::{BlockPlan, Session, SessionState};
