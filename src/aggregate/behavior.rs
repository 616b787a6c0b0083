use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::analysis::face::{self, Expressions, FaceDetection, FaceFrameMetrics, Point};
use crate::analysis::score::{self, BehaviorRates, SuspicionWeights, WarningFlag, WarningThresholds};

/// Number of expression snapshots retained for delta comparison
pub const EXPRESSION_HISTORY_LIMIT: usize = 30;

/// Detection thresholds and scoring weights for behavioral analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Eye-centroid offset (normalized) beyond which the candidate looks away
    pub look_away_threshold: f64,
    /// Nose-tip displacement (px) between frames counted as suspicious
    pub movement_threshold_px: f64,
    /// Expression probability delta counted as a change
    pub expression_change_threshold: f64,
    /// Attention below this counts as suspicious activity
    pub low_attention_threshold: f64,
    pub weights: SuspicionWeights,
    pub warnings: WarningThresholds,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            look_away_threshold: 0.2,
            movement_threshold_px: 20.0,
            expression_change_threshold: 0.3,
            low_attention_threshold: 0.6,
            weights: SuspicionWeights::default(),
            warnings: WarningThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorTotals {
    pub total_frames: u64,
    pub look_away: u64,
    pub suspicious_movements: u64,
    pub expression_changes: u64,
    pub unusual_expressions: u64,
    pub low_attention: u64,
    pub no_face_frames: u64,
    pub failed_frames: u64,
}

impl BehaviorTotals {
    /// Low attention, suspicious movement and unusual expressions combined
    pub fn suspicious_activity(&self) -> u64 {
        self.low_attention + self.suspicious_movements + self.unusual_expressions
    }
}

/// Session-level behavioral summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSummary {
    pub totals: BehaviorTotals,
    pub rates: BehaviorRates,
    pub suspicion_score: u8,
    pub flags: Vec<WarningFlag>,
    pub average_attention: f64,
    /// No-face ticks as a percentage of all ticks with a video frame
    pub out_of_frame_pct: f64,
}

/// Rolling behavioral state for one session
///
/// Holds the previous nose position and a bounded window of expression
/// snapshots for the delta calculators, plus running totals.
#[derive(Debug, Clone)]
pub struct BehaviorAggregator {
    config: BehaviorConfig,
    totals: BehaviorTotals,
    last_nose: Option<Point>,
    expression_history: VecDeque<Expressions>,
    attention_sum: f64,
}

impl BehaviorAggregator {
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            totals: BehaviorTotals::default(),
            last_nose: None,
            expression_history: VecDeque::with_capacity(EXPRESSION_HISTORY_LIMIT),
            attention_sum: 0.0,
        }
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Score a detection against the previous frame and remember it
    pub fn score_frame(&mut self, detection: &FaceDetection) -> FaceFrameMetrics {
        let looking_away = face::eye_centroid_offset(detection)
            .map(|offset| face::is_looking_away(offset, self.config.look_away_threshold))
            .unwrap_or(false);

        let suspicious_movement = match detection.landmarks.nose_tip() {
            Some(nose) => {
                let distance = face::movement_distance(self.last_nose, nose);
                self.last_nose = Some(nose);
                face::is_suspicious_movement(distance, self.config.movement_threshold_px)
            }
            None => false,
        };

        let expression_change = self
            .expression_history
            .back()
            .map(|previous| {
                face::expression_changed(
                    previous,
                    &detection.expressions,
                    self.config.expression_change_threshold,
                )
            })
            .unwrap_or(false);
        self.push_expressions(detection.expressions);

        FaceFrameMetrics {
            looking_away,
            suspicious_movement,
            expression_change,
            unusual_expression: face::is_unusual_expression(&detection.expressions),
            attention: face::calculate_attention(&detection.landmarks),
            confidence: face::detection_confidence(detection),
            head_pose: face::estimate_head_pose(&detection.landmarks),
        }
    }

    fn push_expressions(&mut self, expressions: Expressions) {
        if self.expression_history.len() == EXPRESSION_HISTORY_LIMIT {
            self.expression_history.pop_front();
        }
        self.expression_history.push_back(expressions);
    }

    pub fn record(&mut self, metrics: &FaceFrameMetrics) {
        let totals = &mut self.totals;
        totals.total_frames += 1;
        totals.look_away += metrics.looking_away as u64;
        totals.suspicious_movements += metrics.suspicious_movement as u64;
        totals.expression_changes += metrics.expression_change as u64;
        totals.unusual_expressions += metrics.unusual_expression as u64;
        totals.low_attention += (metrics.attention < self.config.low_attention_threshold) as u64;
        if metrics.attention.is_finite() {
            self.attention_sum += metrics.attention;
        }
    }

    pub fn record_no_face(&mut self) {
        self.totals.no_face_frames += 1;
    }

    pub fn record_failure(&mut self) {
        self.totals.failed_frames += 1;
    }

    pub fn totals(&self) -> &BehaviorTotals {
        &self.totals
    }

    pub fn expression_history_len(&self) -> usize {
        self.expression_history.len()
    }

    pub fn rates(&self) -> BehaviorRates {
        let total = self.totals.total_frames;
        BehaviorRates {
            look_away: score::rate(self.totals.look_away, total),
            suspicious_movement: score::rate(self.totals.suspicious_movements, total),
            expression_change: score::rate(self.totals.expression_changes, total),
        }
    }

    pub fn summary(&self) -> BehaviorSummary {
        let rates = self.rates();
        let total = self.totals.total_frames;
        let observed = total + self.totals.no_face_frames;

        BehaviorSummary {
            totals: self.totals,
            rates,
            suspicion_score: score::suspicion_score(&rates, &self.config.weights),
            flags: score::warning_flags(&rates, &self.config.warnings),
            average_attention: if total == 0 {
                0.0
            } else {
                self.attention_sum / total as f64
            },
            out_of_frame_pct: score::rate(self.totals.no_face_frames, observed) * 100.0,
        }
    }

    pub fn reset(&mut self) {
        self.totals = BehaviorTotals::default();
        self.last_nose = None;
        self.expression_history.clear();
        self.attention_sum = 0.0;
    }
}

impl Default for BehaviorAggregator {
    fn default() -> Self {
        Self::new(BehaviorConfig::default())
    }
}
