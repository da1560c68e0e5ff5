//! Pure aggregation over recorded study activity.
//!
//! Nothing here holds state; callers pass in whatever records their store
//! returned.

use chrono::{DateTime, TimeZone};
use std::collections::HashMap;

use crate::model::{FlashReviewRecord, ItemId, QuizAttemptRecord, XpEvent};
use crate::time::to_utc;

/// Fraction of `max_points` a free-response answer needs to count as correct.
pub const PASS_RATIO: f64 = 0.7;

/// Weight of the quiz average in [`blended_progress`].
pub const QUIZ_WEIGHT: f64 = 0.6;

/// Weight of the flashcard known ratio in [`blended_progress`].
pub const FLASH_WEIGHT: f64 = 0.4;

/// Returns true when `score` reaches the pass threshold of a positive `max_points`.
#[must_use]
pub fn passes(score: u32, max_points: u32) -> bool {
    max_points > 0 && f64::from(score) >= PASS_RATIO * f64::from(max_points)
}

/// Mean quiz ratio, counting only the latest attempt per item.
///
/// Ties on `attempted_at` keep the attempt that appears last in `attempts`.
#[must_use]
pub fn quiz_average(attempts: &[QuizAttemptRecord]) -> f64 {
    let mut latest: HashMap<ItemId, &QuizAttemptRecord> = HashMap::new();
    for attempt in attempts {
        latest
            .entry(attempt.item_id)
            .and_modify(|seen| {
                if attempt.attempted_at >= seen.attempted_at {
                    *seen = attempt;
                }
            })
            .or_insert(attempt);
    }

    if latest.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = latest.len() as f64;
    latest.values().map(|a| a.ratio()).sum::<f64>() / count
}

/// Share of flashcard reviews judged known.
#[must_use]
pub fn flash_known_ratio(reviews: &[FlashReviewRecord]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let known = reviews.iter().filter(|r| r.known).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = known as f64 / reviews.len() as f64;
    ratio
}

#[must_use]
pub fn blended_progress(quiz_avg: f64, flash_known: f64) -> f64 {
    QUIZ_WEIGHT * quiz_avg + FLASH_WEIGHT * flash_known
}

/// Total XP earned in the half-open window `[start, end)`.
///
/// Bounds may come from any zone; they are compared as UTC instants.
#[must_use]
pub fn xp_for_window<S: TimeZone, E: TimeZone>(
    events: &[XpEvent],
    start: &DateTime<S>,
    end: &DateTime<E>,
) -> u64 {
    let start = to_utc(start);
    let end = to_utc(end);
    events
        .iter()
        .filter(|e| start <= e.occurred_at && e.occurred_at < end)
        .map(|e| u64::from(e.xp))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuizHistory;
    use crate::time::fixed_now;
    use chrono::{Duration, FixedOffset};

    fn attempt(item: u64, correct: u32, total: u32, minutes: i64) -> QuizAttemptRecord {
        QuizAttemptRecord {
            item_id: ItemId::new(item),
            correct,
            total,
            attempted_at: fixed_now() + Duration::minutes(minutes),
            history: QuizHistory::new(),
        }
    }

    fn review(known: bool) -> FlashReviewRecord {
        FlashReviewRecord {
            item_id: ItemId::new(1),
            card_index: 0,
            known,
            reviewed_at: fixed_now(),
        }
    }

    fn xp(amount: u32, minutes: i64) -> XpEvent {
        XpEvent::new(None, amount, &(fixed_now() + Duration::minutes(minutes)), "test")
    }

    #[test]
    fn quiz_average_uses_latest_attempt_per_item() {
        let attempts = vec![attempt(1, 3, 5, 0), attempt(1, 4, 5, 10)];
        assert!((quiz_average(&attempts) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn quiz_average_ignores_input_order() {
        let attempts = vec![attempt(1, 4, 5, 10), attempt(1, 3, 5, 0)];
        assert!((quiz_average(&attempts) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn quiz_average_means_across_items_and_zero_totals() {
        let attempts = vec![attempt(1, 1, 1, 0), attempt(2, 0, 0, 0)];
        assert!((quiz_average(&attempts) - 0.5).abs() < 1e-9);
        assert_eq!(quiz_average(&[]), 0.0);
    }

    #[test]
    fn flash_ratio_counts_known() {
        let reviews = vec![review(true), review(false), review(true), review(true)];
        assert!((flash_known_ratio(&reviews) - 0.75).abs() < 1e-9);
        assert_eq!(flash_known_ratio(&[]), 0.0);
    }

    #[test]
    fn blended_weights_are_fixed() {
        assert!((blended_progress(1.0, 0.0) - 0.6).abs() < 1e-9);
        assert!((blended_progress(0.0, 1.0) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn pass_threshold_is_seventy_percent() {
        assert!(passes(7, 10));
        assert!(!passes(6, 10));
        assert!(!passes(0, 0));
    }

    #[test]
    fn xp_window_is_half_open() {
        let events = vec![xp(5, 0), xp(7, 30), xp(11, 60)];
        let start = fixed_now();
        let end = fixed_now() + Duration::minutes(60);
        assert_eq!(xp_for_window(&events, &start, &end), 12);
    }

    #[test]
    fn xp_window_bounds_normalize_to_utc() {
        let events = vec![xp(3, 0)];
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let start = fixed_now().with_timezone(&tokyo);
        let end = (fixed_now() + Duration::minutes(1)).with_timezone(&tokyo);
        assert_eq!(xp_for_window(&events, &start, &end), 3);
    }
}
