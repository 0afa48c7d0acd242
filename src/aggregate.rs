//! Session feature aggregation
//!
//! Turns a complete session log into the fixed set of summary features. Each
//! field is rounded independently with [`to_fixed`], which reproduces the
//! decimal strings a browser's `Number.prototype.toFixed` would produce.

use crate::error::ComputeError;
use crate::types::{AggregateFeatures, PerQuestionRecord};
use std::collections::BTreeSet;

/// Difficulty tiers above this count as hard
const EASY_DIFFICULTY: u8 = 1;

/// Aggregate a complete session log
///
/// `n` is the session length; the log must contain exactly `n` records. The
/// result is a pure function of the inputs.
///
/// # Errors
/// [`ComputeError::EmptySession`] when `n == 0`, [`ComputeError::IncompleteLog`]
/// when the log length differs from `n`. No partial record is ever produced.
pub fn aggregate(
    log: &[PerQuestionRecord],
    hinted: &BTreeSet<u32>,
    n: usize,
) -> Result<AggregateFeatures, ComputeError> {
    if n == 0 {
        return Err(ComputeError::EmptySession);
    }
    if log.len() != n {
        return Err(ComputeError::IncompleteLog {
            expected: n,
            actual: log.len(),
        });
    }

    let count = n as f64;
    let correct = count_correct(log) as f64;
    let total_time: f64 = log.iter().map(|r| r.response_time).sum();
    let total_confidence: f64 = log.iter().map(|r| r.confidence_score as f64).sum();
    let total_tab_switches: f64 = log.iter().map(|r| r.tab_switches as f64).sum();
    let total_answer_changes: f64 = log.iter().map(|r| r.answer_changes as f64).sum();
    let reviewed = log.iter().filter(|r| r.review_flag).count() as f64;
    let total_latency: f64 = log.iter().map(|r| r.first_click_latency).sum();
    let total_clicks: f64 = log.iter().map(|r| r.total_clicks as f64).sum();
    let hinted_count = log
        .iter()
        .map(|r| r.question_id)
        .collect::<BTreeSet<_>>()
        .intersection(hinted)
        .count() as f64;

    Ok(AggregateFeatures {
        score_percentage: to_fixed(100.0 * correct / count, 1),
        avg_time_per_question: to_fixed(total_time / count, 2),
        avg_confidence: to_fixed(total_confidence / count, 2),
        tab_switches_rate: to_fixed(total_tab_switches / count, 2),
        answer_changes_rate: to_fixed(total_answer_changes / count, 2),
        review_percentage: to_fixed(100.0 * reviewed / count, 1),
        avg_first_action_latency: to_fixed(total_latency / count, 2),
        clicks_per_question: to_fixed(total_clicks / count, 1),
        performance_trend: to_fixed(performance_trend(log), 2),
        hard_question_accuracy: to_fixed(hard_question_accuracy(log), 1),
        hint_usage_percentage: to_fixed(100.0 * hinted_count / count, 1),
    })
}

fn count_correct(records: &[PerQuestionRecord]) -> usize {
    records.iter().filter(|r| r.is_correct).count()
}

/// Fraction correct; an empty slice has accuracy 0
fn accuracy(records: &[PerQuestionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    count_correct(records) as f64 / records.len() as f64
}

/// Second-half accuracy minus first-half accuracy
///
/// The split point is `floor(n / 2)`, so for odd `n` the second half is the
/// larger one.
fn performance_trend(log: &[PerQuestionRecord]) -> f64 {
    let (first, second) = log.split_at(log.len() / 2);
    accuracy(second) - accuracy(first)
}

/// Percentage correct among questions above the easy tier, 0 when there are none
fn hard_question_accuracy(log: &[PerQuestionRecord]) -> f64 {
    let (attempted, correct) = log
        .iter()
        .filter(|r| r.difficulty > EASY_DIFFICULTY)
        .fold((0usize, 0usize), |(attempted, correct), r| {
            (attempted + 1, correct + r.is_correct as usize)
        });
    if attempted == 0 {
        return 0.0;
    }
    100.0 * correct as f64 / attempted as f64
}

/// Fractional digits in the exact decimal expansion of the smallest subnormal
const EXACT_FRACTION_DIGITS: usize = 1074;

/// Round to `places` decimals the way `Number.prototype.toFixed` does
///
/// Rounding is half away from zero on the exact binary value, so `1.005`
/// (stored as 1.00499999...) rounds to `1.00` while `0.125` rounds to `0.13`.
pub fn to_fixed(value: f64, places: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // A finite f64 has at most 1074 fractional decimal digits, so formatting
    // at that precision prints the exact expansion without rounding it.
    let expanded = format!("{:.*}", (places + 1).max(EXACT_FRACTION_DIGITS), value.abs());
    let (int_part, frac_part) = match expanded.split_once('.') {
        Some(parts) => parts,
        None => return value,
    };
    let kept = &frac_part[..places];
    let round_up = frac_part.as_bytes()[places] >= b'5';

    let mut scaled: u128 = match format!("{int_part}{kept}").parse() {
        Ok(n) => n,
        Err(_) => return value,
    };
    if round_up {
        scaled += 1;
    }

    let digits = format!("{:0>width$}", scaled, width = places + 1);
    let split = digits.len() - places;
    let text = if places == 0 {
        digits
    } else {
        format!("{}.{}", &digits[..split], &digits[split..])
    };
    let rounded: f64 = text.parse().unwrap_or(value);

    if value.is_sign_negative() && rounded != 0.0 {
        -rounded
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_record(question_id: u32, difficulty: u8, is_correct: bool) -> PerQuestionRecord {
        PerQuestionRecord {
            question_id,
            topic: "Logic".to_string(),
            difficulty,
            selected_answer: Some(if is_correct { "right" } else { "wrong" }.to_string()),
            is_correct,
            response_time: 2.0,
            tab_switches: 0,
            answer_changes: 0,
            total_clicks: 0,
            first_click_latency: 2.0,
            review_flag: false,
            confidence_score: 3,
        }
    }

    fn make_log(correctness: &[bool]) -> Vec<PerQuestionRecord> {
        correctness
            .iter()
            .enumerate()
            .map(|(i, &c)| make_record(101 + i as u32, 1 + (i % 3) as u8, c))
            .collect()
    }

    #[test]
    fn test_all_correct_scores_100() {
        for n in 1..=12 {
            let log = make_log(&vec![true; n]);
            let features = aggregate(&log, &BTreeSet::new(), n).unwrap();
            assert_eq!(features.score_percentage, 100.0);
        }
    }

    #[test]
    fn test_empty_session_is_rejected() {
        let result = aggregate(&[], &BTreeSet::new(), 0);
        assert!(matches!(result, Err(ComputeError::EmptySession)));
    }

    #[test]
    fn test_incomplete_log_is_rejected() {
        let log = make_log(&[true, false, true]);
        let result = aggregate(&log, &BTreeSet::new(), 10);
        assert!(matches!(
            result,
            Err(ComputeError::IncompleteLog {
                expected: 10,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_hard_accuracy_without_hard_questions_is_zero() {
        let log: Vec<_> = (0..10).map(|i| make_record(101 + i, 1, true)).collect();
        let features = aggregate(&log, &BTreeSet::new(), 10).unwrap();
        assert_eq!(features.hard_question_accuracy, 0.0);
    }

    #[test]
    fn test_hard_accuracy_counts_medium_and_hard() {
        let log = vec![
            make_record(101, 1, false),
            make_record(102, 2, true),
            make_record(103, 3, false),
            make_record(104, 2, true),
        ];
        let features = aggregate(&log, &BTreeSet::new(), 4).unwrap();
        // 2 of 3 above the easy tier
        assert_eq!(features.hard_question_accuracy, 66.7);
    }

    #[test]
    fn test_performance_trend_improvement() {
        // First five: 2/5 = 0.4, second five: 4/5 = 0.8
        let log = make_log(&[
            true, true, false, false, false, true, true, true, true, false,
        ]);
        let features = aggregate(&log, &BTreeSet::new(), 10).unwrap();
        assert_eq!(features.performance_trend, 0.40);
    }

    #[test]
    fn test_performance_trend_decline_is_negative() {
        let log = make_log(&[true, true, false, false]);
        let features = aggregate(&log, &BTreeSet::new(), 4).unwrap();
        assert_eq!(features.performance_trend, -1.0);
    }

    #[test]
    fn test_performance_trend_odd_split_favors_second_half() {
        // n = 9: first half 4 records (all wrong), second half 5 (3 right)
        let log = make_log(&[
            false, false, false, false, true, true, true, false, false,
        ]);
        let features = aggregate(&log, &BTreeSet::new(), 9).unwrap();
        assert_eq!(features.performance_trend, 0.60);
    }

    #[test]
    fn test_single_question_trend_uses_empty_first_half() {
        let log = make_log(&[true]);
        let features = aggregate(&log, &BTreeSet::new(), 1).unwrap();
        assert_eq!(features.performance_trend, 1.0);
    }

    #[test]
    fn test_hint_usage_counts_distinct_ids() {
        let log = make_log(&[true; 10]);
        let hinted: BTreeSet<u32> = [101, 105].into_iter().collect();
        let features = aggregate(&log, &hinted, 10).unwrap();
        assert_eq!(features.hint_usage_percentage, 20.0);
    }

    #[test]
    fn test_hint_usage_ignores_ids_outside_the_log() {
        let log = make_log(&[true; 10]);
        let hinted: BTreeSet<u32> = [101, 999].into_iter().collect();
        let features = aggregate(&log, &hinted, 10).unwrap();
        assert_eq!(features.hint_usage_percentage, 10.0);
    }

    #[test]
    fn test_rates_and_means() {
        let mut log = make_log(&[true, false, true]);
        log[0].response_time = 1.0;
        log[1].response_time = 2.5;
        log[2].response_time = 4.0;
        log[0].tab_switches = 1;
        log[2].tab_switches = 1;
        log[1].answer_changes = 2;
        log[0].total_clicks = 4;
        log[1].total_clicks = 3;
        log[2].total_clicks = 3;
        log[0].first_click_latency = 0.5;
        log[1].first_click_latency = 1.0;
        log[2].first_click_latency = 1.0;
        log[1].review_flag = true;
        log[0].confidence_score = 5;
        log[1].confidence_score = 2;
        log[2].confidence_score = 4;

        let features = aggregate(&log, &BTreeSet::new(), 3).unwrap();
        assert_eq!(
            features,
            AggregateFeatures {
                score_percentage: 66.7,
                avg_time_per_question: 2.5,
                avg_confidence: 3.67,
                tab_switches_rate: 0.67,
                answer_changes_rate: 0.67,
                review_percentage: 33.3,
                avg_first_action_latency: 0.83,
                clicks_per_question: 3.3,
                performance_trend: -0.5,
                hard_question_accuracy: 50.0,
                hint_usage_percentage: 0.0,
            }
        );
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let log = make_log(&[true, false, true, true, false, false, true, false, true, true]);
        let hinted: BTreeSet<u32> = [102, 107].into_iter().collect();
        let a = aggregate(&log, &hinted, 10).unwrap();
        let b = aggregate(&log, &hinted, 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_fixed_matches_browser_rounding() {
        assert_eq!(to_fixed(1.005, 2), 1.0);
        assert_eq!(to_fixed(0.125, 2), 0.13);
        assert_eq!(to_fixed(2.5, 0), 3.0);
        assert_eq!(to_fixed(66.666_666, 1), 66.7);
        assert_eq!(to_fixed(-0.125, 2), -0.13);
        assert_eq!(to_fixed(0.4, 2), 0.4);
        assert_eq!(to_fixed(99.95, 1), 100.0);
        assert_eq!(to_fixed(0.0, 2), 0.0);
    }

    #[test]
    fn test_to_fixed_uses_exact_binary_value() {
        assert_eq!(to_fixed(2.675, 2), 2.67);
        assert_eq!(to_fixed(123456.785, 2), 123456.79);

        let below = f64::from_bits(0.125f64.to_bits() - 1);
        let above = f64::from_bits(0.125f64.to_bits() + 1);
        assert_eq!(to_fixed(below, 2), 0.12);
        assert_eq!(to_fixed(above, 2), 0.13);

        let tiny = f64::from_bits(1);
        assert_eq!(to_fixed(tiny, 2), 0.0);
        assert_eq!(to_fixed(-tiny, 2), 0.0);
    }

    #[test]
    fn test_to_fixed_negative_rounding_to_zero_is_zero() {
        let rounded = to_fixed(-0.001, 2);
        assert_eq!(rounded, 0.0);
        assert!(rounded.is_sign_positive());
    }
}
