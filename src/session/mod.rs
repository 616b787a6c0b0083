//! Interview session management
//!
//! `SessionManager` owns the lifecycle state machine
//! (`idle -> initializing -> ready -> recording -> completed`, plus `error`),
//! drives the capability adapters, runs the periodic analysis tick and the
//! duration timer, and assembles the final report.

mod config;
mod manager;
mod report;
mod stats;

pub use config::SessionConfig;
pub use manager::{SessionCapabilities, SessionManager};
pub use report::{AlertLevel, CapabilityStats, FinalReport, LiveFeedback, SessionEvent, VoiceFeedback};
pub use stats::{SessionStats, SessionStatus, StopReason, TranscriptSegment};
