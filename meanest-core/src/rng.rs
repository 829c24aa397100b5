//! Random sampling helpers shared by the sequence builder and the orchestrator.
//!
//! Every helper takes the random source explicitly so a whole session can be
//! replayed from a single seed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// One standard-normal deviate via the Box-Muller transform.
///
/// Both uniform draws are repeated while they are exactly zero so the
/// logarithm stays finite.
pub fn gaussian_sample<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u = 0.0f64;
    while u == 0.0 {
        u = rng.random::<f64>();
    }
    let mut v = 0.0f64;
    while v == 0.0 {
        v = rng.random::<f64>();
    }
    (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
}

/// In-place Fisher-Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    if items.len() > 1 {
        items.shuffle(rng);
    }
}

/// Maps any angle in degrees onto [0, 360).
pub fn normalize_angle_degrees(x: f64) -> f64 {
    // fmod is exact, so the outer remainder can never round up to 360
    ((x % 360.0) + 360.0) % 360.0
}

/// Seeded when reproducibility is asked for, OS entropy otherwise.
pub fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            tracing::debug!(seed, "using seeded session rng");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    }
}
