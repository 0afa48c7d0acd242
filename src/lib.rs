//! Scaffold Flux - Quiz telemetry capture and session feature extraction
//!
//! Flux records behavioral telemetry while a participant works through a
//! multiple-choice session and turns it into a fixed set of summary features:
//! question display → per-question recording → session log → aggregation →
//! submission/export.
//!
//! ## Modules
//!
//! - **Recorder**: per-question counters and timings, reset on every display
//! - **Session**: ordered question flow, session-scoped hint tracking, sealed features
//! - **Aggregate**: the deterministic feature formulas
//! - **Submission / Export**: idempotent persistence and researcher CSV export

pub mod aggregate;
pub mod bank;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod pipeline;
pub mod recorder;
pub mod session;
pub mod submission;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregate::aggregate;
pub use bank::QuestionBank;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::QuizConfig;
pub use error::ComputeError;
pub use events::{QuizEvent, TimedEvent};
pub use pipeline::{records_to_features, replay_session, replay_to_json};
pub use recorder::QuestionRecorder;
pub use session::{Advance, HintLedger, QuizSession, SessionLog, SessionOutcome};
pub use submission::{submit_with_retry, SubmissionStore};
pub use types::{AggregateFeatures, PerQuestionRecord, Question, Submission};

/// Library version
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");
