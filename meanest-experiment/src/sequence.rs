use meanest_core::rng::{gaussian_sample, shuffle};
use meanest_core::{BlockSpec, Category, ExperimentError, Result, Trial};
use rand::Rng;

/// A block's trials in presentation order.
///
/// `order[i]` is the index into the unshuffled list (all category-0 samples
/// followed by all category-1 samples) of the trial shown at position `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTrials {
    pub order: Vec<usize>,
    pub categories: Vec<Category>,
    pub angles: Vec<f64>,
}

impl BlockTrials {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn trials(&self) -> impl Iterator<Item = Trial> + '_ {
        self.categories
            .iter()
            .zip(&self.angles)
            .map(|(&category, &angle_deg)| Trial {
                category,
                angle_deg,
            })
    }
}

/// Draws and shuffles the trials of one block.
///
/// Angles are left unnormalized; the stimulus is drawn with sin/cos so the
/// raw value is what gets recorded.
pub fn build_block_trials<R: Rng + ?Sized>(
    spec: &BlockSpec,
    sigma_deg: f64,
    rng: &mut R,
) -> Result<BlockTrials> {
    spec.validate()?;
    if !(sigma_deg.is_finite() && sigma_deg >= 0.0) {
        return Err(ExperimentError::invalid(format!(
            "sigma must be a non-negative number, got {sigma_deg}"
        )));
    }

    let n = spec.trials_per_category;
    let mut categories = Vec::with_capacity(2 * n);
    let mut angles = Vec::with_capacity(2 * n);
    for category in Category::ALL {
        let center = spec.category_center(category);
        for _ in 0..n {
            categories.push(category);
            angles.push(gaussian_sample(rng) * sigma_deg + center);
        }
    }

    let mut order: Vec<usize> = (0..2 * n).collect();
    shuffle(&mut order, rng);

    let trials = BlockTrials {
        categories: order.iter().map(|&i| categories[i]).collect(),
        angles: order.iter().map(|&i| angles[i]).collect(),
        order,
    };
    tracing::debug!(
        center = spec.center_angle_deg,
        delta = spec.delta_deg,
        trials = trials.len(),
        "built block trials"
    );
    Ok(trials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meanest_core::rng::session_rng;

    #[test]
    fn zero_trials_is_a_configuration_error() {
        let mut rng = session_rng(Some(1));
        let err = build_block_trials(&BlockSpec::new(90.0, 30.0, 0), 5.0, &mut rng).unwrap_err();
        assert!(matches!(err, ExperimentError::InvalidConfiguration(_)));
    }

    #[test]
    fn negative_sigma_rejected() {
        let mut rng = session_rng(Some(1));
        assert!(build_block_trials(&BlockSpec::new(90.0, 30.0, 2), -1.0, &mut rng).is_err());
    }

    #[test]
    fn zero_sigma_puts_trials_on_the_centers() {
        let mut rng = session_rng(Some(5));
        let trials = build_block_trials(&BlockSpec::new(90.0, 30.0, 3), 0.0, &mut rng).unwrap();
        for t in trials.trials() {
            let expected = match t.category {
                Category::Blue => 75.0,
                Category::Red => 105.0,
            };
            assert_eq!(t.angle_deg, expected);
        }
    }

    #[test]
    fn order_maps_back_to_generation_layout() {
        let mut rng = session_rng(Some(8));
        let n = 5;
        let trials = build_block_trials(&BlockSpec::new(0.0, 20.0, n), 16.0, &mut rng).unwrap();
        for (pos, &src) in trials.order.iter().enumerate() {
            let expected = if src < n { Category::Blue } else { Category::Red };
            assert_eq!(trials.categories[pos], expected);
        }
    }

    #[test]
    fn angles_are_not_wrapped() {
        let mut rng = session_rng(Some(13));
        let trials = build_block_trials(&BlockSpec::new(-175.0, 20.0, 6), 0.0, &mut rng).unwrap();
        assert!(trials.angles.iter().any(|a| *a < 0.0));
    }
}
