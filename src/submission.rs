//! Submission persistence
//!
//! A finished session is stored as one [`Submission`] document. Stores are
//! idempotent on the submission key, so a retried write never produces a
//! duplicate row.

use crate::error::ComputeError;
use crate::session::SessionOutcome;
use crate::types::Submission;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

impl Submission {
    /// Build the stored document for a finished session
    pub fn from_outcome(
        outcome: &SessionOutcome,
        student_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            submission_key: outcome.session_id,
            student_name: student_name.into(),
            timestamp,
            features: outcome.features.clone(),
            records: outcome.records.clone(),
        }
    }
}

/// A collection of session submissions
pub trait SubmissionStore {
    /// Store `submission`; returns `false` if its key was already present
    fn put(&mut self, submission: &Submission) -> Result<bool, ComputeError>;

    /// All stored submissions in insertion order
    fn list(&self) -> Result<Vec<Submission>, ComputeError>;
}

/// In-process store
#[derive(Debug, Clone, Default)]
pub struct MemorySubmissionStore {
    submissions: Vec<Submission>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn put(&mut self, submission: &Submission) -> Result<bool, ComputeError> {
        if self
            .submissions
            .iter()
            .any(|s| s.submission_key == submission.submission_key)
        {
            return Ok(false);
        }
        self.submissions.push(submission.clone());
        Ok(true)
    }

    fn list(&self) -> Result<Vec<Submission>, ComputeError> {
        Ok(self.submissions.clone())
    }
}

/// Append-only newline-delimited JSON file, one submission per line
#[derive(Debug, Clone)]
pub struct NdjsonSubmissionStore {
    path: PathBuf,
}

impl NdjsonSubmissionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SubmissionStore for NdjsonSubmissionStore {
    fn put(&mut self, submission: &Submission) -> Result<bool, ComputeError> {
        if self
            .list()?
            .iter()
            .any(|s| s.submission_key == submission.submission_key)
        {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(persistence_error)?;
            }
        }
        let mut line = serde_json::to_string(submission)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(persistence_error)?;
        file.write_all(line.as_bytes()).map_err(persistence_error)?;
        Ok(true)
    }

    fn list(&self) -> Result<Vec<Submission>, ComputeError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence_error(e)),
        };

        let mut submissions = Vec::new();
        for (line_num, line) in data.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let submission = serde_json::from_str(trimmed).map_err(|e| {
                ComputeError::ParseError(format!(
                    "Failed to parse submission on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            submissions.push(submission);
        }
        Ok(submissions)
    }
}

fn persistence_error(e: std::io::Error) -> ComputeError {
    ComputeError::Persistence(e.to_string())
}

/// Write `submission`, retrying up to `attempts` times
///
/// Safe to retry because stores ignore a key they already hold. Returns the
/// last error once every attempt has failed.
pub fn submit_with_retry<S: SubmissionStore + ?Sized>(
    store: &mut S,
    submission: &Submission,
    attempts: u32,
) -> Result<(), ComputeError> {
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match store.put(submission) {
            Ok(true) => {
                info!("stored submission {}", submission.submission_key);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "submission {} already stored",
                    submission.submission_key
                );
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "attempt {}/{} to store submission {} failed: {}",
                    attempt, attempts, submission.submission_key, e
                );
                last_error = Some(e);
            }
        }
    }

    Err(ComputeError::Persistence(format!(
        "gave up after {} attempts: {}",
        attempts,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::recorder::tests::make_question;
    use crate::recorder::QuestionRecorder;
    use crate::types::{AggregateFeatures, PerQuestionRecord};
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::collections::BTreeSet;
    use tempfile::tempdir;
    use uuid::Uuid;

    pub(crate) fn make_features() -> AggregateFeatures {
        AggregateFeatures {
            score_percentage: 80.0,
            avg_time_per_question: 6.25,
            avg_confidence: 3.4,
            tab_switches_rate: 0.2,
            answer_changes_rate: 0.5,
            review_percentage: 10.0,
            avg_first_action_latency: 1.75,
            clicks_per_question: 3.5,
            performance_trend: -0.2,
            hard_question_accuracy: 66.7,
            hint_usage_percentage: 30.0,
        }
    }

    fn make_records() -> Vec<PerQuestionRecord> {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap(),
        ));
        [(101, 1), (102, 3)]
            .into_iter()
            .map(|(id, difficulty)| {
                let mut recorder =
                    QuestionRecorder::display(make_question(id, difficulty), clock.clone());
                clock.advance_millis(2500);
                recorder.interaction();
                recorder.select("A");
                recorder.finalize()
            })
            .collect()
    }

    pub(crate) fn make_submission(name: &str) -> Submission {
        Submission {
            submission_key: Uuid::new_v4(),
            student_name: name.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap(),
            features: make_features(),
            records: make_records(),
        }
    }

    struct FlakyStore {
        failures_left: u32,
        inner: MemorySubmissionStore,
    }

    impl SubmissionStore for FlakyStore {
        fn put(&mut self, submission: &Submission) -> Result<bool, ComputeError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(ComputeError::Persistence("connection reset".to_string()));
            }
            self.inner.put(submission)
        }

        fn list(&self) -> Result<Vec<Submission>, ComputeError> {
            self.inner.list()
        }
    }

    #[test]
    fn test_from_outcome_uses_session_id_as_key() {
        let outcome = SessionOutcome {
            session_id: Uuid::new_v4(),
            records: make_records(),
            hinted_question_ids: BTreeSet::new(),
            features: make_features(),
        };
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap();
        let submission = Submission::from_outcome(&outcome, "Grace", timestamp);

        assert_eq!(submission.submission_key, outcome.session_id);
        assert_eq!(submission.student_name, "Grace");
        assert_eq!(submission.features, outcome.features);
        assert_eq!(submission.records, outcome.records);
        assert_eq!(submission.records.len(), 2);
    }

    #[test]
    fn test_memory_store_is_idempotent() {
        let mut store = MemorySubmissionStore::new();
        let submission = make_submission("Ada");

        assert!(store.put(&submission).unwrap());
        assert!(!store.put(&submission).unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_ndjson_store_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = NdjsonSubmissionStore::new(dir.path().join("nested/submissions.ndjson"));
        assert!(store.list().unwrap().is_empty());

        let a = make_submission("Ada");
        let b = make_submission("Grace");
        assert!(store.put(&a).unwrap());
        assert!(store.put(&b).unwrap());
        assert!(!store.put(&a).unwrap());

        let reopened = NdjsonSubmissionStore::new(store.path());
        let listed = reopened.list().unwrap();
        assert_eq!(listed[0].records[1].question_id, 102);
        assert_eq!(listed[0].records[1].response_time, 2.5);
        assert_eq!(listed, vec![a, b]);
    }

    #[test]
    fn test_ndjson_store_reads_lines_without_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("submissions.ndjson");
        let mut value = serde_json::to_value(make_submission("Ada")).unwrap();
        value.as_object_mut().unwrap().remove("records");
        fs::write(&path, format!("{}\n", value)).unwrap();

        let listed = NdjsonSubmissionStore::new(&path).list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].records.is_empty());
    }

    #[test]
    fn test_ndjson_store_reports_corrupt_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("submissions.ndjson");
        fs::write(&path, "{ broken\n").unwrap();

        let store = NdjsonSubmissionStore::new(&path);
        let err = store.list().unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_retry_recovers_from_transient_failures() {
        let mut store = FlakyStore {
            failures_left: 2,
            inner: MemorySubmissionStore::new(),
        };
        let submission = make_submission("Ada");

        submit_with_retry(&mut store, &submission, 3).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_retry_gives_up() {
        let mut store = FlakyStore {
            failures_left: 5,
            inner: MemorySubmissionStore::new(),
        };
        let submission = make_submission("Ada");

        let result = submit_with_retry(&mut store, &submission, 3);
        assert!(matches!(result, Err(ComputeError::Persistence(_))));
        assert!(store.list().unwrap().is_empty());
    }
}
