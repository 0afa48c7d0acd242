//! Quiz data types
//!
//! Questions flow in from the bank, one [`PerQuestionRecord`] is frozen per
//! question at advance time, and a single [`AggregateFeatures`] summarizes the
//! whole session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of questions in a session
pub const DEFAULT_SESSION_LENGTH: usize = 10;

/// Confidence recorded when the participant never touches the slider
pub const DEFAULT_CONFIDENCE: u8 = 3;

/// A multiple-choice question from the static bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable question identifier
    pub id: u32,
    /// Prompt text
    #[serde(rename = "question")]
    pub prompt: String,
    /// Answer options in display order
    pub options: Vec<String>,
    /// The option string that is correct
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    /// Difficulty tier (1 = easy, 2 = medium, 3 = hard)
    pub difficulty: u8,
    /// Topic label
    pub topic: String,
    /// Optional hint text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Behavioral record for one question, frozen when the participant advances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerQuestionRecord {
    pub question_id: u32,
    pub topic: String,
    pub difficulty: u8,
    /// Chosen option, `None` when the question was skipped
    pub selected_answer: Option<String>,
    pub is_correct: bool,
    /// Seconds from display to advance
    pub response_time: f64,
    /// Focus-loss events during this question's display window
    pub tab_switches: u32,
    /// Selection changes away from a prior, different selection
    pub answer_changes: u32,
    /// Interaction events on the question surface
    pub total_clicks: u32,
    /// Seconds from display to first interaction (or `response_time` if none)
    pub first_click_latency: f64,
    /// Whether "mark for review" was on at advance time
    pub review_flag: bool,
    /// Self-reported confidence, 1-5
    pub confidence_score: u8,
}

/// Session-level summary statistics
///
/// Field order matches the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFeatures {
    pub score_percentage: f64,
    pub avg_time_per_question: f64,
    pub avg_confidence: f64,
    pub tab_switches_rate: f64,
    pub answer_changes_rate: f64,
    pub review_percentage: f64,
    pub avg_first_action_latency: f64,
    pub clicks_per_question: f64,
    pub performance_trend: f64,
    pub hard_question_accuracy: f64,
    pub hint_usage_percentage: f64,
}

impl AggregateFeatures {
    /// Feature column names in export order
    pub const COLUMNS: [&'static str; 11] = [
        "score_percentage",
        "avg_time_per_question",
        "avg_confidence",
        "tab_switches_rate",
        "answer_changes_rate",
        "review_percentage",
        "avg_first_action_latency",
        "clicks_per_question",
        "performance_trend",
        "hard_question_accuracy",
        "hint_usage_percentage",
    ];

    /// Feature values in the same order as [`AggregateFeatures::COLUMNS`]
    pub fn values(&self) -> [f64; 11] {
        [
            self.score_percentage,
            self.avg_time_per_question,
            self.avg_confidence,
            self.tab_switches_rate,
            self.answer_changes_rate,
            self.review_percentage,
            self.avg_first_action_latency,
            self.clicks_per_question,
            self.performance_trend,
            self.hard_question_accuracy,
            self.hint_usage_percentage,
        ]
    }
}

/// A stored session submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Idempotency key, one per session
    pub submission_key: Uuid,
    /// Participant display name
    pub student_name: String,
    /// Time the submission was accepted by the store
    pub timestamp: DateTime<Utc>,
    /// Flattened feature fields
    #[serde(flatten)]
    pub features: AggregateFeatures,
    /// Per-question log the features were computed from
    #[serde(default)]
    pub records: Vec<PerQuestionRecord>,
}
