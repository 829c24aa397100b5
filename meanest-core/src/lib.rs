pub mod block;
pub mod config;
pub mod error;
pub mod input;
pub mod record;
pub mod rng;
pub mod surface;

pub use block::{BlockRecord, BlockSpec, Category, MeanEstimates, Responses, Trial};
pub use config::{CenterPlan, ExperimentConfig, Mode, ProtocolParams};
pub use error::{ExperimentError, Result};
pub use input::{InputEvent, InputKind, InputSource, Key, ScriptedInput};
pub use record::{ResultSink, SessionMeta, SessionRecord};
pub use rng::{gaussian_sample, normalize_angle_degrees, session_rng, shuffle};
pub use surface::{DrawCommand, RecordingSurface, Rgba, Surface};
