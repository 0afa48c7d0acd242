//! Pipeline orchestration
//!
//! One-shot entry points over the session machinery: replay a captured event
//! stream into records and features, or aggregate an already-captured log.

use crate::aggregate::aggregate;
use crate::clock::ManualClock;
use crate::config::QuizConfig;
use crate::error::ComputeError;
use crate::events::{self, TimedEvent};
use crate::session::{QuizSession, SessionOutcome};
use crate::types::{PerQuestionRecord, Question};
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Drive a session from a timestamped event stream
///
/// The clock starts at the first timestamp in the stream and jumps to each
/// event's timestamp before it is applied; events without a timestamp happen
/// at the previous event's instant. The stream must take the session all the
/// way to completion. `config.session_length` must equal the number of
/// questions.
///
/// # Example
/// ```ignore
/// let outcome = replay_session(questions, &events, &config)?;
/// println!("{}", outcome.features.score_percentage);
/// ```
pub fn replay_session(
    questions: Vec<Question>,
    events: &[TimedEvent],
    config: &QuizConfig,
) -> Result<SessionOutcome, ComputeError> {
    let start = events
        .iter()
        .find_map(|e| e.timestamp)
        .unwrap_or_else(DateTime::<Utc>::default);
    let clock = Arc::new(ManualClock::new(start));
    let mut session = QuizSession::with_config(questions, config.clone(), clock.clone())?;

    let mut last = start;
    for (index, timed) in events.iter().enumerate() {
        if let Some(timestamp) = timed.timestamp {
            if timestamp < last {
                return Err(ComputeError::ParseError(format!(
                    "Event {} at {} is earlier than the previous event",
                    index + 1,
                    timestamp.to_rfc3339()
                )));
            }
            clock.set(timestamp);
            last = timestamp;
        }
        debug!("replaying event {}: {:?}", index + 1, timed.event);
        session.handle(&timed.event)?;
    }

    session.into_outcome()
}

/// Replay from JSON inputs and return the outcome as JSON (stateless, one-shot)
///
/// # Arguments
/// * `questions_json` - JSON array of the session's questions, in display order
/// * `events_ndjson` - Newline-delimited JSON event stream
pub fn replay_to_json(questions_json: &str, events_ndjson: &str) -> Result<String, ComputeError> {
    let questions: Vec<Question> = serde_json::from_str(questions_json)
        .map_err(|e| ComputeError::ParseError(format!("Failed to parse questions: {}", e)))?;
    let events = events::parse_ndjson(events_ndjson)?;
    let config = QuizConfig {
        session_length: questions.len(),
        ..QuizConfig::default()
    };
    let outcome = replay_session(questions, &events, &config)?;
    serde_json::to_string_pretty(&outcome).map_err(ComputeError::JsonError)
}

/// Aggregate a captured log given as JSON and return the features as JSON
///
/// # Arguments
/// * `records_json` - JSON array of per-question records
/// * `hinted` - Question ids whose hint was opened
/// * `n` - Session length
pub fn records_to_features(
    records_json: &str,
    hinted: &BTreeSet<u32>,
    n: usize,
) -> Result<String, ComputeError> {
    let records: Vec<PerQuestionRecord> = serde_json::from_str(records_json)
        .map_err(|e| ComputeError::ParseError(format!("Failed to parse records: {}", e)))?;
    let features = aggregate(&records, hinted, n)?;
    serde_json::to_string_pretty(&features).map_err(ComputeError::JsonError)
}
