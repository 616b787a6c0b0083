// Composite behavioral scores and warning flags
//
// Weights and cutoffs are calibration parameters, overridable through
// configuration.

use serde::{Deserialize, Serialize};

/// Weights of the suspicion score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspicionWeights {
    pub look_away: f64,
    pub suspicious_movement: f64,
    pub expression_change: f64,
}

impl Default for SuspicionWeights {
    fn default() -> Self {
        Self {
            look_away: 0.4,
            suspicious_movement: 0.3,
            expression_change: 0.3,
        }
    }
}

/// Percentage-of-frames cutoffs for warning flags
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningThresholds {
    pub look_away_pct: f64,
    pub suspicious_movement_pct: f64,
    pub expression_change_pct: f64,
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            look_away_pct: 30.0,
            suspicious_movement_pct: 20.0,
            expression_change_pct: 25.0,
        }
    }
}

/// Behavior rates as fractions of analysed frames (0-1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRates {
    pub look_away: f64,
    pub suspicious_movement: f64,
    pub expression_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningFlag {
    FrequentLookAway,
    FrequentMovement,
    FrequentExpressionChange,
}

impl WarningFlag {
    pub fn message(&self) -> &'static str {
        match self {
            WarningFlag::FrequentLookAway => "Candidate frequently looked away from the screen",
            WarningFlag::FrequentMovement => "Frequent suspicious head movement detected",
            WarningFlag::FrequentExpressionChange => "Unusually frequent expression changes",
        }
    }
}

impl std::fmt::Display for WarningFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Rate as a fraction, 0 when there are no frames
pub fn rate(count: u64, total_frames: u64) -> f64 {
    if total_frames == 0 {
        0.0
    } else {
        count as f64 / total_frames as f64
    }
}

fn sanitize(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted suspicion score in [0, 100]
pub fn suspicion_score(rates: &BehaviorRates, weights: &SuspicionWeights) -> u8 {
    let weighted = weights.look_away.max(0.0) * sanitize(rates.look_away)
        + weights.suspicious_movement.max(0.0) * sanitize(rates.suspicious_movement)
        + weights.expression_change.max(0.0) * sanitize(rates.expression_change);
    let score = (weighted * 100.0).round();
    if score.is_finite() {
        score.clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

/// Independent informational flags for rates above their cutoffs
pub fn warning_flags(rates: &BehaviorRates, thresholds: &WarningThresholds) -> Vec<WarningFlag> {
    let mut flags = Vec::new();
    if rates.look_away * 100.0 > thresholds.look_away_pct {
        flags.push(WarningFlag::FrequentLookAway);
    }
    if rates.suspicious_movement * 100.0 > thresholds.suspicious_movement_pct {
        flags.push(WarningFlag::FrequentMovement);
    }
    if rates.expression_change * 100.0 > thresholds.expression_change_pct {
        flags.push(WarningFlag::FrequentExpressionChange);
    }
    flags
}
