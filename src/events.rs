//! UI interaction events
//!
//! The UI layer reports what the participant did as a stream of events. Each
//! event may carry the instant it happened so a captured stream can be
//! replayed with the original timings.

use crate::error::ComputeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something the participant did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QuizEvent {
    /// Next question shown
    Display,
    /// Window lost focus
    FocusLost,
    /// Click on the question surface
    Interaction,
    /// Answer option chosen
    Select { option: String },
    /// Confidence slider moved
    Confidence { level: u8 },
    /// "Mark for review" toggled
    Review { flag: bool },
    /// Hint revealed
    HintOpened,
    /// Participant moved on
    Advance,
}

/// An event with an optional capture timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub event: QuizEvent,
}

impl TimedEvent {
    pub fn at(timestamp: DateTime<Utc>, event: QuizEvent) -> Self {
        Self {
            timestamp: Some(timestamp),
            event,
        }
    }
}

/// Parse newline-delimited JSON events, skipping blank lines
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TimedEvent>, ComputeError> {
    let mut events = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<TimedEvent>(trimmed) {
            Ok(event) => events.push(event),
            Err(e) => {
                return Err(ComputeError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(events)
}

/// Parse a JSON array of events
pub fn parse_array(json: &str) -> Result<Vec<TimedEvent>, ComputeError> {
    serde_json::from_str(json)
        .map_err(|e| ComputeError::ParseError(format!("Failed to parse event array: {}", e)))
}
