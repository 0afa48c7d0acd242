//! Session orchestration
//!
//! A [`QuizSession`] walks an ordered question list, keeping exactly one
//! [`QuestionRecorder`] alive while a question is on screen. Records are
//! appended to the [`SessionLog`] at advance time, and once the log reaches
//! the session length the features are computed a single time and sealed.
//!
//! Hint usage is the only state that outlives a question, so it lives in a
//! session-scoped [`HintLedger`] rather than in the recorder.

use crate::aggregate::aggregate;
use crate::clock::Clock;
use crate::config::QuizConfig;
use crate::error::ComputeError;
use crate::events::QuizEvent;
use crate::recorder::QuestionRecorder;
use crate::types::{AggregateFeatures, PerQuestionRecord, Question};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Question ids whose hint was opened at least once this session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintLedger {
    opened: BTreeSet<u32>,
}

impl HintLedger {
    /// Record a hint opening; returns `false` if this question was already counted
    pub fn record(&mut self, question_id: u32) -> bool {
        self.opened.insert(question_id)
    }

    pub fn contains(&self, question_id: u32) -> bool {
        self.opened.contains(&question_id)
    }

    pub fn len(&self) -> usize {
        self.opened.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opened.is_empty()
    }

    pub fn ids(&self) -> &BTreeSet<u32> {
        &self.opened
    }
}

/// Append-only sequence of per-question records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    records: Vec<PerQuestionRecord>,
}

impl SessionLog {
    fn push(&mut self, record: PerQuestionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[PerQuestionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// What happened when the participant advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// More questions remain
    Next { remaining: usize },
    /// That was the last question; features are now available
    Completed,
}

/// Everything a finished session produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub records: Vec<PerQuestionRecord>,
    pub hinted_question_ids: BTreeSet<u32>,
    pub features: AggregateFeatures,
}

/// One participant's run through an ordered question list
pub struct QuizSession {
    session_id: Uuid,
    questions: Vec<Question>,
    config: QuizConfig,
    clock: Arc<dyn Clock>,
    current: Option<QuestionRecorder>,
    log: SessionLog,
    hints: HintLedger,
    features: Option<AggregateFeatures>,
}

impl QuizSession {
    /// Start a session over `questions` with default settings
    ///
    /// The session length is the number of questions supplied.
    pub fn new(questions: Vec<Question>, clock: Arc<dyn Clock>) -> Result<Self, ComputeError> {
        let config = QuizConfig {
            session_length: questions.len(),
            ..QuizConfig::default()
        };
        Self::with_config(questions, config, clock)
    }

    /// Start a session with explicit settings
    ///
    /// `questions` must hold exactly `config.session_length` entries.
    pub fn with_config(
        questions: Vec<Question>,
        config: QuizConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ComputeError> {
        if questions.is_empty() {
            return Err(ComputeError::EmptySession);
        }
        config.validate()?;
        if questions.len() != config.session_length {
            return Err(ComputeError::InvalidConfig(format!(
                "session_length is {} but {} questions were supplied",
                config.session_length,
                questions.len()
            )));
        }

        let session_id = Uuid::new_v4();
        info!(
            "starting session {} with {} questions",
            session_id,
            questions.len()
        );

        Ok(Self {
            session_id,
            questions,
            config,
            clock,
            current: None,
            log: SessionLog::default(),
            hints: HintLedger::default(),
            features: None,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Number of questions in the session
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn hints(&self) -> &HintLedger {
        &self.hints
    }

    /// The question currently on screen
    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref().map(|r| r.question())
    }

    pub fn is_complete(&self) -> bool {
        self.features.is_some()
    }

    /// Sealed session features, available once every question has been answered or skipped
    pub fn features(&self) -> Option<&AggregateFeatures> {
        self.features.as_ref()
    }

    /// Show the next question and start its recorder
    pub fn display_next(&mut self) -> Result<&Question, ComputeError> {
        if self.is_complete() {
            return Err(ComputeError::SessionComplete);
        }
        if let Some(current) = &self.current {
            return Err(ComputeError::QuestionAlreadyDisplayed(current.question().id));
        }

        let question = self.questions[self.log.len()].clone();
        let recorder = QuestionRecorder::display_with_confidence(
            question,
            self.clock.clone(),
            self.config.default_confidence,
        );
        Ok(self.current.insert(recorder).question())
    }

    /// Window lost focus
    ///
    /// Focus loss can fire at any time, including between questions; events
    /// with no question on screen are dropped. Once the session is complete
    /// it is rejected like every other event.
    pub fn focus_lost(&mut self) -> Result<(), ComputeError> {
        if self.is_complete() {
            return Err(ComputeError::SessionComplete);
        }
        match self.current.as_mut() {
            Some(recorder) => recorder.focus_lost(),
            None => debug!("focus lost with no question displayed; dropped"),
        }
        Ok(())
    }

    pub fn interaction(&mut self) -> Result<(), ComputeError> {
        self.active()?.interaction();
        Ok(())
    }

    pub fn select(&mut self, option: impl Into<String>) -> Result<(), ComputeError> {
        self.active()?.select(option);
        Ok(())
    }

    pub fn set_confidence(&mut self, level: u8) -> Result<(), ComputeError> {
        self.active()?.set_confidence(level);
        Ok(())
    }

    pub fn set_review_flag(&mut self, flag: bool) -> Result<(), ComputeError> {
        self.active()?.set_review_flag(flag);
        Ok(())
    }

    /// The participant opened the hint for the current question
    pub fn hint_opened(&mut self) -> Result<(), ComputeError> {
        let question_id = self.active()?.question().id;
        if !self.hints.record(question_id) {
            debug!("hint for question {} already counted", question_id);
        }
        Ok(())
    }

    /// Freeze the current question's record and move on
    ///
    /// When skipping is disabled and nothing is selected, the advance is
    /// refused and the question stays on screen.
    pub fn advance(&mut self) -> Result<Advance, ComputeError> {
        let allow_skip = self.config.allow_skip;
        let recorder = self.active()?;
        if !allow_skip && recorder.selection().is_none() {
            return Err(ComputeError::SelectionRequired(recorder.question().id));
        }

        let record = match self.current.take() {
            Some(recorder) => recorder.finalize(),
            None => return Err(ComputeError::NoActiveQuestion),
        };
        self.log.push(record);

        let total = self.questions.len();
        if self.log.len() < total {
            return Ok(Advance::Next {
                remaining: total - self.log.len(),
            });
        }

        let features = aggregate(self.log.records(), self.hints.ids(), total)?;
        info!(
            "session {} complete: score {}%",
            self.session_id, features.score_percentage
        );
        self.features = Some(features);
        Ok(Advance::Completed)
    }

    /// Dispatch a UI event to the matching handler
    pub fn handle(&mut self, event: &QuizEvent) -> Result<Option<Advance>, ComputeError> {
        match event {
            QuizEvent::Display => self.display_next().map(|_| None),
            QuizEvent::FocusLost => self.focus_lost().map(|_| None),
            QuizEvent::Interaction => self.interaction().map(|_| None),
            QuizEvent::Select { option } => self.select(option.as_str()).map(|_| None),
            QuizEvent::Confidence { level } => self.set_confidence(*level).map(|_| None),
            QuizEvent::Review { flag } => self.set_review_flag(*flag).map(|_| None),
            QuizEvent::HintOpened => self.hint_opened().map(|_| None),
            QuizEvent::Advance => self.advance().map(Some),
        }
    }

    /// Consume a completed session
    pub fn into_outcome(self) -> Result<SessionOutcome, ComputeError> {
        let features = match self.features {
            Some(features) => features,
            None => {
                if self.current.is_some() {
                    warn!(
                        "session {} abandoned with question {} on screen",
                        self.session_id,
                        self.log.len() + 1
                    );
                }
                return Err(ComputeError::IncompleteLog {
                    expected: self.questions.len(),
                    actual: self.log.len(),
                });
            }
        };

        Ok(SessionOutcome {
            session_id: self.session_id,
            records: self.log.records,
            hinted_question_ids: self.hints.opened,
            features,
        })
    }

    fn active(&mut self) -> Result<&mut QuestionRecorder, ComputeError> {
        if self.is_complete() {
            return Err(ComputeError::SessionComplete);
        }
        self.current.as_mut().ok_or(ComputeError::NoActiveQuestion)
    }
}
