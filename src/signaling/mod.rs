//! Interview signaling channel
//!
//! Participants of one interview share the NATS subject
//! `interview.<id>.signal`; payloads are `{"type", "data"}` JSON envelopes.

pub mod backoff;
mod bridge;
pub mod client;
pub mod messages;

pub use backoff::Backoff;
pub use bridge::{forward_session_events, session_signal};
pub use client::{SignalEvent, SignalingClient, SignalingSettings};
pub use messages::{signal_subject, DecodeError, SignalEnvelope, SignalKind, SignalMessage};
