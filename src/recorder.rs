//! Per-question telemetry recorder
//!
//! A [`QuestionRecorder`] is created when a question is displayed, absorbs the
//! participant's interaction events, and is consumed by [`QuestionRecorder::finalize`]
//! when they advance. Every counter starts at zero on display, so nothing from a
//! previous question can leak in.

use crate::clock::{elapsed_secs, Clock};
use crate::types::{PerQuestionRecord, Question, DEFAULT_CONFIDENCE};
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

/// Telemetry state for the question currently on screen
pub struct QuestionRecorder {
    question: Question,
    clock: Arc<dyn Clock>,
    displayed_at: DateTime<Utc>,
    first_interaction_secs: Option<f64>,
    focus_losses: u32,
    answer_changes: u32,
    clicks: u32,
    selection: Option<String>,
    review_flag: bool,
    confidence: u8,
}

impl QuestionRecorder {
    /// Start recording `question`; the response-time clock starts now
    pub fn display(question: Question, clock: Arc<dyn Clock>) -> Self {
        Self::display_with_confidence(question, clock, DEFAULT_CONFIDENCE)
    }

    /// Like [`QuestionRecorder::display`] with a configured starting confidence
    pub fn display_with_confidence(
        question: Question,
        clock: Arc<dyn Clock>,
        confidence: u8,
    ) -> Self {
        let displayed_at = clock.now();
        debug!("displaying question {}", question.id);
        Self {
            question,
            clock,
            displayed_at,
            first_interaction_secs: None,
            focus_losses: 0,
            answer_changes: 0,
            clicks: 0,
            selection: None,
            review_flag: false,
            confidence,
        }
    }

    /// The question being recorded
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Current selection, if any
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Window lost focus
    pub fn focus_lost(&mut self) {
        self.focus_losses += 1;
    }

    /// A click anywhere on the question surface
    pub fn interaction(&mut self) {
        self.clicks += 1;
        if self.first_interaction_secs.is_none() {
            self.first_interaction_secs = Some(self.elapsed());
        }
    }

    /// Participant picked `option`
    ///
    /// Only a move away from a different prior selection counts as a change.
    pub fn select(&mut self, option: impl Into<String>) {
        let option = option.into();
        if let Some(previous) = &self.selection {
            if *previous != option {
                self.answer_changes += 1;
            }
        }
        self.selection = Some(option);
    }

    /// Overwrite the self-reported confidence. Range checking is the caller's job.
    pub fn set_confidence(&mut self, level: u8) {
        self.confidence = level;
    }

    pub fn set_review_flag(&mut self, flag: bool) {
        self.review_flag = flag;
    }

    /// Freeze the record for this question
    pub fn finalize(self) -> PerQuestionRecord {
        let response_time = self.elapsed();
        let is_correct = self
            .selection
            .as_deref()
            .is_some_and(|s| s == self.question.correct_answer);

        let record = PerQuestionRecord {
            question_id: self.question.id,
            topic: self.question.topic,
            difficulty: self.question.difficulty,
            selected_answer: self.selection,
            is_correct,
            response_time,
            tab_switches: self.focus_losses,
            answer_changes: self.answer_changes,
            total_clicks: self.clicks,
            first_click_latency: self.first_interaction_secs.unwrap_or(response_time),
            review_flag: self.review_flag,
            confidence_score: self.confidence,
        };
        debug!(
            "finalized question {} (correct: {}, {:.3}s)",
            record.question_id, record.is_correct, record.response_time
        );
        record
    }

    fn elapsed(&self) -> f64 {
        elapsed_secs(self.displayed_at, self.clock.now())
    }
}
