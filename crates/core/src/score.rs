//! Qualification score with an explicit scale
//!
//! Callers produce scores on different ranges (0-1, 0-10, 0-100). Every
//! comparison in this crate happens on the normalized 0.0-1.0 value so that a
//! threshold written as `7` on the ten-point scale means the same thing as `70`
//! on the hundred-point scale.

use serde::{Deserialize, Serialize};

/// Range a raw score value is expressed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// 0.0 - 1.0
    Unit,
    /// 0 - 10
    #[default]
    Ten,
    /// 0 - 100
    Hundred,
}

impl ScoreScale {
    pub fn max(&self) -> f64 {
        match self {
            ScoreScale::Unit => 1.0,
            ScoreScale::Ten => 10.0,
            ScoreScale::Hundred => 100.0,
        }
    }

    /// Map a raw value on this scale to 0.0-1.0, clamped
    pub fn normalize(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        (value / self.max()).clamp(0.0, 1.0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreScale::Unit => "unit",
            ScoreScale::Ten => "ten",
            ScoreScale::Hundred => "hundred",
        }
    }

    /// Parse a stored scale name, `None` when unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unit" => Some(ScoreScale::Unit),
            "ten" => Some(ScoreScale::Ten),
            "hundred" => Some(ScoreScale::Hundred),
            _ => None,
        }
    }
}

/// Wire forms accepted for a score: a bare number (ten-point) or `{value, scale}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreRepr {
    Bare(f64),
    Scaled {
        value: f64,
        #[serde(default)]
        scale: ScoreScale,
    },
}

impl From<ScoreRepr> for QualificationScore {
    fn from(repr: ScoreRepr) -> Self {
        match repr {
            ScoreRepr::Bare(value) => Self::ten(value),
            ScoreRepr::Scaled { value, scale } => Self::new(value, scale),
        }
    }
}

/// A raw score together with the scale it was produced on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScoreRepr")]
pub struct QualificationScore {
    pub value: f64,
    pub scale: ScoreScale,
}

impl QualificationScore {
    pub fn new(value: f64, scale: ScoreScale) -> Self {
        Self { value, scale }
    }

    /// Score on the ten-point scale
    pub fn ten(value: f64) -> Self {
        Self::new(value, ScoreScale::Ten)
    }

    /// Score on the hundred-point scale
    pub fn hundred(value: f64) -> Self {
        Self::new(value, ScoreScale::Hundred)
    }

    pub fn normalized(&self) -> f64 {
        self.scale.normalize(self.value)
    }

    /// Same score re-expressed on the unit scale
    pub fn to_unit(&self) -> Self {
        Self::new(self.normalized(), ScoreScale::Unit)
    }

    pub fn meets(&self, threshold: &QualificationScore) -> bool {
        self.normalized() >= threshold.normalized()
    }
}

impl std::fmt::Display for QualificationScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scale {
            ScoreScale::Unit => write!(f, "{:.2}", self.value),
            ScoreScale::Ten => write!(f, "{}/10", self.value),
            ScoreScale::Hundred => write!(f, "{}/100", self.value),
        }
    }
}
