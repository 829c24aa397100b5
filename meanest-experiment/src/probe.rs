//! Interactive mean-location estimate for one category.
//!
//! The participant rotates a line through the display center with the wheel,
//! horizontal pointer motion or the arrow keys, then confirms with Enter or a
//! click. Escape abandons the estimate.

use std::f64::consts::PI;

use meanest_core::input::Listening;
use meanest_core::rng::normalize_angle_degrees;
use meanest_core::{
    Category, ExperimentError, InputEvent, InputKind, InputSource, Key, Result, Surface,
};

use crate::scene;

/// Radians per unit of wheel delta.
pub const WHEEL_GAIN: f64 = 0.0025;
/// Radians per pixel of horizontal pointer motion.
pub const POINTER_GAIN: f64 = 0.005;
/// Four degrees per arrow key press.
pub const KEY_STEP_RAD: f64 = 2.0 * PI / 180.0 * 2.0;

const PROBE_INPUTS: [InputKind; 4] = InputKind::ALL;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    /// Confirmed direction in degrees, within [0, 360).
    Confirmed(f64),
    Aborted,
}

impl ProbeOutcome {
    /// The value stored in the block record; NaN when aborted.
    pub fn estimate(self) -> f64 {
        match self {
            ProbeOutcome::Confirmed(deg) => deg,
            ProbeOutcome::Aborted => f64::NAN,
        }
    }
}

/// What a single input did to the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    Rotated,
    Ignored,
    Confirm,
    Abort,
}

#[derive(Debug, Clone)]
pub struct Probe {
    category: Category,
    angle_rad: f64,
    last_pointer_x: Option<f64>,
}

impl Probe {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            angle_rad: 0.0,
            last_pointer_x: None,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn angle_rad(&self) -> f64 {
        self.angle_rad
    }

    /// Current direction in degrees, normalized.
    pub fn angle_degrees(&self) -> f64 {
        normalize_angle_degrees(self.angle_rad * 180.0 / PI)
    }

    pub fn apply(&mut self, event: &InputEvent) -> ProbeStep {
        match event {
            InputEvent::Wheel { delta_y } => {
                self.angle_rad += delta_y * WHEEL_GAIN;
                ProbeStep::Rotated
            }
            InputEvent::PointerMove { x } => {
                if let Some(prev) = self.last_pointer_x {
                    self.angle_rad += (x - prev) * POINTER_GAIN;
                }
                self.last_pointer_x = Some(*x);
                ProbeStep::Rotated
            }
            InputEvent::Key(Key::ArrowLeft) => {
                self.angle_rad -= KEY_STEP_RAD;
                ProbeStep::Rotated
            }
            InputEvent::Key(Key::ArrowRight) => {
                self.angle_rad += KEY_STEP_RAD;
                ProbeStep::Rotated
            }
            InputEvent::Key(Key::Enter) | InputEvent::Click => ProbeStep::Confirm,
            InputEvent::Key(Key::Escape) => ProbeStep::Abort,
            InputEvent::Key(Key::Other(_)) => ProbeStep::Ignored,
        }
    }

    /// Runs the interaction until it is confirmed or aborted.
    ///
    /// Listeners are registered for the lifetime of the call only; they are
    /// removed before the outcome is returned, and on every error path.
    pub fn run<I, S>(mut self, input: &mut I, surface: &mut S) -> Result<ProbeOutcome>
    where
        I: InputSource + ?Sized,
        S: Surface + ?Sized,
    {
        let mut listening = Listening::attach(input, &PROBE_INPUTS);
        scene::draw_probe(surface, self.angle_rad, self.category)?;

        loop {
            let Some(event) = listening.next_event() else {
                return Err(ExperimentError::InputClosed {
                    waiting_for: "probe confirmation",
                });
            };
            match self.apply(&event) {
                ProbeStep::Rotated => {
                    scene::draw_probe(surface, self.angle_rad, self.category)?;
                }
                ProbeStep::Ignored => {}
                ProbeStep::Confirm => {
                    drop(listening);
                    let estimate = self.angle_degrees();
                    tracing::info!(
                        category = self.category.index(),
                        estimate,
                        "probe confirmed"
                    );
                    return Ok(ProbeOutcome::Confirmed(estimate));
                }
                ProbeStep::Abort => {
                    drop(listening);
                    tracing::warn!(category = self.category.index(), "probe aborted");
                    scene::draw_message(surface, scene::ABORT_NOTICE)?;
                    return Ok(ProbeOutcome::Aborted);
                }
            }
        }
    }
}
