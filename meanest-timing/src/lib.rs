pub mod timer;
pub mod virtual_clock;

pub use timer::{CalibrationStats, HighPrecisionTimer, Timer};
pub use virtual_clock::VirtualTimer;
