use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ExperimentError, Result};

/// The two stimulus classes. Serialized as their index (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Blue,
    Red,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Blue, Category::Red];

    pub fn index(self) -> usize {
        match self {
            Category::Blue => 0,
            Category::Red => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Category::Blue),
            1 => Some(Category::Red),
            _ => None,
        }
    }

    /// Signed offset of this category's generating center, in units of delta/2.
    pub fn center_sign(self) -> f64 {
        match self {
            Category::Blue => -1.0,
            Category::Red => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Blue => "Category 0 (Blue)",
            Category::Red => "Category 1 (Red)",
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index() as u8)
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Category::from_index(raw as usize)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown category {raw}")))
    }
}

/// One condition: where the two categories sit and how many trials each gets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSpec {
    pub center_angle_deg: f64,
    pub delta_deg: f64,
    pub trials_per_category: usize,
}

impl BlockSpec {
    pub fn new(center_angle_deg: f64, delta_deg: f64, trials_per_category: usize) -> Self {
        Self {
            center_angle_deg,
            delta_deg,
            trials_per_category,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials_per_category == 0 {
            return Err(ExperimentError::invalid(
                "trials per category must be positive",
            ));
        }
        if !self.center_angle_deg.is_finite() {
            return Err(ExperimentError::invalid("block center must be finite"));
        }
        if !(self.delta_deg.is_finite() && self.delta_deg >= 0.0) {
            return Err(ExperimentError::invalid(format!(
                "block delta must be a non-negative number, got {}",
                self.delta_deg
            )));
        }
        Ok(())
    }

    /// Generating center for `category` in this block.
    pub fn category_center(&self, category: Category) -> f64 {
        self.center_angle_deg + category.center_sign() * self.delta_deg / 2.0
    }

    pub fn total_trials(&self) -> usize {
        self.trials_per_category * 2
    }
}

/// A single presented stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub category: Category,
    pub angle_deg: f64,
}

/// Per-trial response slots filled by the presentation loop.
///
/// No judgment is collected during presentation yet: `category` echoes the
/// stimulus category and `rt` stays empty. A per-trial response task would
/// fill these instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Responses {
    pub category: Vec<Option<Category>>,
    #[serde(rename = "RT")]
    pub rt: Vec<Option<f64>>,
}

impl Responses {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            category: Vec::with_capacity(n),
            rt: Vec::with_capacity(n),
        }
    }

    pub fn record_placeholder(&mut self, trial: &Trial) {
        self.category.push(Some(trial.category));
        self.rt.push(None);
    }

    pub fn len(&self) -> usize {
        self.category.len()
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_empty()
    }
}

/// Mean-location estimates indexed by category. NaN marks an aborted probe.
#[derive(Debug, Clone, Copy)]
pub struct MeanEstimates([f64; 2]);

impl MeanEstimates {
    pub fn new(blue: f64, red: f64) -> Self {
        MeanEstimates([blue, red])
    }

    pub fn get(&self, category: Category) -> f64 {
        self.0[category.index()]
    }

    pub fn is_aborted(&self, category: Category) -> bool {
        self.get(category).is_nan()
    }

    pub fn as_array(&self) -> [f64; 2] {
        self.0
    }
}

impl PartialEq for MeanEstimates {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

impl Serialize for MeanEstimates {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let slots: [Option<f64>; 2] = self.0.map(|v| if v.is_nan() { None } else { Some(v) });
        slots.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MeanEstimates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let slots = <[Option<f64>; 2]>::deserialize(deserializer)?;
        Ok(MeanEstimates(slots.map(|v| v.unwrap_or(f64::NAN))))
    }
}

/// Everything recorded for one finished block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub block_info: BlockSpec,
    pub stimuli: Vec<Trial>,
    pub responses: Responses,
    pub mean_estimates: MeanEstimates,
}
