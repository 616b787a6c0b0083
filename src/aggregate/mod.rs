//! Signal aggregators
//!
//! Rolling per-session state fed by the metric calculators. Mutated only by
//! the session manager; read for live feedback and for the final report.

mod behavior;
mod voice;

pub use behavior::{
    BehaviorAggregator, BehaviorConfig, BehaviorSummary, BehaviorTotals, EXPRESSION_HISTORY_LIMIT,
};
pub use voice::{VoiceAggregator, VoiceSummary};

use serde::{Deserialize, Serialize};

/// Combined behavioral and voice summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub behavioral: BehaviorSummary,
    pub voice: VoiceSummary,
}

/// All aggregators owned by one session
#[derive(Debug, Clone, Default)]
pub struct SessionAggregates {
    pub behavior: BehaviorAggregator,
    pub voice: VoiceAggregator,
}

impl SessionAggregates {
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            behavior: BehaviorAggregator::new(config),
            voice: VoiceAggregator::new(),
        }
    }

    pub fn summary(&self, elapsed_secs: f64) -> AggregateSummary {
        AggregateSummary {
            behavioral: self.behavior.summary(),
            voice: self.voice.summary(elapsed_secs),
        }
    }

    pub fn reset(&mut self) {
        self.behavior.reset();
        self.voice.reset();
    }
}
