use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Message types carried on an interview's signaling subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Chat,
    TranscriptUpdated,
    AnalysisUpdated,
    ParticipantJoined,
    ParticipantLeft,
    InterviewControl,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Chat => "chat",
            SignalKind::TranscriptUpdated => "transcript_updated",
            SignalKind::AnalysisUpdated => "analysis_updated",
            SignalKind::ParticipantJoined => "participant_joined",
            SignalKind::ParticipantLeft => "participant_left",
            SignalKind::InterviewControl => "interview_control",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(SignalKind::Chat),
            "transcript_updated" => Ok(SignalKind::TranscriptUpdated),
            "analysis_updated" => Ok(SignalKind::AnalysisUpdated),
            "participant_joined" => Ok(SignalKind::ParticipantJoined),
            "participant_left" => Ok(SignalKind::ParticipantLeft),
            "interview_control" => Ok(SignalKind::InterviewControl),
            other => Err(other.to_string()),
        }
    }
}

/// Wire envelope: `{"type": "...", "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// A decoded message of a known type
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMessage {
    pub kind: SignalKind,
    pub data: Value,
}

/// Why an incoming payload was not delivered
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    Malformed(String),
    UnknownType(String),
}

impl SignalMessage {
    pub fn new(kind: SignalKind, data: Value) -> Self {
        Self { kind, data }
    }

    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let envelope: SignalEnvelope =
            serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let kind = envelope.kind.parse().map_err(DecodeError::UnknownType)?;
        Ok(Self {
            kind,
            data: envelope.data,
        })
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&SignalEnvelope {
            kind: self.kind.as_str().to_string(),
            data: self.data.clone(),
        })
    }
}

/// Subject an interview's participants share
pub fn signal_subject(interview_id: &str) -> String {
    format!("interview.{}.signal", interview_id)
}
