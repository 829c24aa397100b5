//! What each screen of the task looks like, expressed against [`Surface`].

use meanest_core::{Category, Result, Rgba, Surface, Trial};

pub const FIXATION_RADIUS: f32 = 5.0;
pub const STIMULUS_ECCENTRICITY: f32 = 140.0;
pub const STIMULUS_RADIUS: f32 = 12.5;
pub const PROBE_HALF_LENGTH: f32 = 120.0;
pub const PROBE_WIDTH: f32 = 4.0;
pub const LABEL_ORIGIN: (f32, f32) = (24.0, 40.0);
pub const LABEL_SIZE: f32 = 20.0;
pub const MESSAGE_SIZE: f32 = 28.0;

pub const START_PROMPT: &str = "Press any key to begin";
pub const ABORT_NOTICE: &str = "Experiment aborted.";
pub const COMPLETE_MESSAGE: &str = "Experiment complete — Thank you!";
pub const FAILURE_NOTICE: &str = "Error in experiment, see log.";

pub fn category_color(category: Category) -> Rgba {
    match category {
        Category::Blue => Rgba::BLUE,
        Category::Red => Rgba::RED,
    }
}

/// Screen position of a stimulus at `angle_deg`, counter-clockwise from the
/// positive x axis.
pub fn stimulus_position(center: (f32, f32), angle_deg: f64) -> (f32, f32) {
    let rad = angle_deg.to_radians();
    (
        center.0 + STIMULUS_ECCENTRICITY * rad.cos() as f32,
        center.1 - STIMULUS_ECCENTRICITY * rad.sin() as f32,
    )
}

pub fn probe_instruction(category: Category) -> String {
    format!(
        "{} — rotate with mouse wheel, move mouse, or ←/→. Click or Enter to confirm.",
        category.label()
    )
}

fn fixation_dot<S: Surface + ?Sized>(surface: &mut S) {
    let center = surface.center();
    surface.fill_circle(center, FIXATION_RADIUS, Rgba::WHITE);
}

pub fn draw_fixation<S: Surface + ?Sized>(surface: &mut S) -> Result<()> {
    surface.clear();
    fixation_dot(surface);
    surface.present()
}

pub fn draw_stimulus<S: Surface + ?Sized>(surface: &mut S, trial: &Trial) -> Result<()> {
    surface.clear();
    let pos = stimulus_position(surface.center(), trial.angle_deg);
    surface.fill_circle(pos, STIMULUS_RADIUS, category_color(trial.category));
    fixation_dot(surface);
    surface.present()
}

pub fn draw_probe<S: Surface + ?Sized>(
    surface: &mut S,
    angle_rad: f64,
    category: Category,
) -> Result<()> {
    surface.clear();
    let center = surface.center();
    surface.stroke_line(
        center,
        PROBE_HALF_LENGTH,
        angle_rad as f32,
        PROBE_WIDTH,
        Rgba::YELLOW,
    );
    surface.text(
        &probe_instruction(category),
        LABEL_ORIGIN,
        LABEL_SIZE,
        Rgba::WHITE,
    );
    surface.present()
}

/// Full-screen message, roughly centered.
pub fn draw_message<S: Surface + ?Sized>(surface: &mut S, message: &str) -> Result<()> {
    surface.clear();
    let (cx, cy) = surface.center();
    surface.text(message, (cx - 180.0, cy), MESSAGE_SIZE, Rgba::WHITE);
    surface.present()
}
