//! Question bank
//!
//! The built-in bank is 40 "Mathematics of Computing" questions embedded at
//! compile time. Sessions draw a uniform random sample without replacement.

use crate::error::ComputeError;
use crate::types::Question;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

const BUILTIN_BANK_JSON: &str = include_str!("../data/questions.json");

/// Highest difficulty tier
pub const MAX_DIFFICULTY: u8 = 3;

/// A validated set of questions to sample sessions from
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// The embedded question bank
    pub fn builtin() -> Result<Self, ComputeError> {
        Self::from_json(BUILTIN_BANK_JSON)
    }

    /// Parse and validate a JSON array of questions
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let questions: Vec<Question> = serde_json::from_str(json)
            .map_err(|e| ComputeError::ParseError(format!("Failed to parse question bank: {}", e)))?;
        Self::new(questions)
    }

    pub fn new(questions: Vec<Question>) -> Result<Self, ComputeError> {
        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(ComputeError::ParseError(format!(
                    "Duplicate question id {}",
                    question.id
                )));
            }
            if !question.options.contains(&question.correct_answer) {
                return Err(ComputeError::ParseError(format!(
                    "Question {} has a correct answer that is not among its options",
                    question.id
                )));
            }
            if !(1..=MAX_DIFFICULTY).contains(&question.difficulty) {
                return Err(ComputeError::ParseError(format!(
                    "Question {} has difficulty {} outside 1-{}",
                    question.id, question.difficulty, MAX_DIFFICULTY
                )));
            }
        }
        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Draw `count` distinct questions uniformly at random
    pub fn sample<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Question>, ComputeError> {
        if count == 0 || count > self.questions.len() {
            return Err(ComputeError::InvalidConfig(format!(
                "cannot sample {} questions from a bank of {}",
                count,
                self.questions.len()
            )));
        }
        Ok(self
            .questions
            .choose_multiple(rng, count)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_builtin_bank_loads() {
        let bank = QuestionBank::builtin().unwrap();
        assert_eq!(bank.len(), 40);

        let first = bank.get(101).unwrap();
        assert_eq!(first.topic, "Sets");
        assert_eq!(first.correct_answer, "{2}");
        assert!(bank.questions().iter().all(|q| q.hint.is_some()));
    }

    #[test]
    fn test_sample_is_without_replacement() {
        let bank = QuestionBank::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let sample = bank.sample(10, &mut rng).unwrap();
        assert_eq!(sample.len(), 10);
        let ids: HashSet<u32> = sample.iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let bank = QuestionBank::builtin().unwrap();
        let a = bank.sample(10, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = bank.sample(10, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_whole_bank() {
        let bank = QuestionBank::builtin().unwrap();
        let sample = bank.sample(40, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(sample.len(), 40);
    }

    #[test]
    fn test_sample_rejects_bad_counts() {
        let bank = QuestionBank::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(bank.sample(0, &mut rng).is_err());
        assert!(bank.sample(41, &mut rng).is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = r#"[
            {"id": 1, "question": "a", "options": ["x"], "correctAnswer": "x", "difficulty": 1, "topic": "t"},
            {"id": 1, "question": "b", "options": ["y"], "correctAnswer": "y", "difficulty": 1, "topic": "t"}
        ]"#;
        assert!(QuestionBank::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_unknown_correct_answer() {
        let json = r#"[
            {"id": 1, "question": "a", "options": ["x"], "correctAnswer": "z", "difficulty": 1, "topic": "t"}
        ]"#;
        assert!(QuestionBank::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_difficulty() {
        let json = r#"[
            {"id": 1, "question": "a", "options": ["x"], "correctAnswer": "x", "difficulty": 4, "topic": "t"}
        ]"#;
        assert!(QuestionBank::from_json(json).is_err());
    }
}
