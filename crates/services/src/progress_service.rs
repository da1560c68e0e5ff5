use std::sync::Arc;

use chrono::Duration;
use storage::repository::ProgressQueries;
use study_core::progress::{blended_progress, flash_known_ratio, quiz_average, xp_for_window};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Length of the XP window reported by [`ProgressService::report`].
const XP_WINDOW_DAYS: i64 = 7;

/// Overall study progress, as ratios in `0.0..=1.0` plus recent XP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub quiz_average: f64,
    pub flash_known_ratio: f64,
    pub blended: f64,
    pub weekly_xp: u64,
}

/// Read-only facade over recorded progress.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    queries: Arc<dyn ProgressQueries>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, queries: Arc<dyn ProgressQueries>) -> Self {
        Self { clock, queries }
    }

    /// Aggregate everything recorded so far.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn report(&self) -> Result<ProgressReport, ProgressServiceError> {
        let attempts = self.queries.quiz_attempts().await?;
        let reviews = self.queries.flash_reviews().await?;
        let xp = self.queries.xp_events().await?;

        let quiz_average = quiz_average(&attempts);
        let flash_known_ratio = flash_known_ratio(&reviews);
        let (start, end) = self
            .clock
            .trailing_window(Duration::days(XP_WINDOW_DAYS));

        Ok(ProgressReport {
            quiz_average,
            flash_known_ratio,
            blended: blended_progress(quiz_average, flash_known_ratio),
            weekly_xp: xp_for_window(&xp, &start, &end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{InMemoryRepository, ProgressRecorder};
    use study_core::model::{FlashReviewRecord, ItemId, QuizAttemptRecord, QuizHistory, XpEvent};
    use study_core::time::{fixed_clock, fixed_now};

    #[tokio::test]
    async fn report_combines_recorded_progress() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        for (correct, minutes) in [(3, 0), (4, 5)] {
            repo.record_quiz_attempt(&QuizAttemptRecord {
                item_id: ItemId::new(1),
                correct,
                total: 5,
                attempted_at: now - Duration::minutes(10 - minutes),
                history: QuizHistory::new(),
            })
            .await
            .unwrap();
        }
        for known in [true, false] {
            repo.record_flash_review(&FlashReviewRecord {
                item_id: ItemId::new(2),
                card_index: 0,
                known,
                reviewed_at: now,
            })
            .await
            .unwrap();
        }
        for (xp, days) in [(10, 1), (20, 6), (40, 8)] {
            let at = now - Duration::days(days);
            repo.record_xp(&XpEvent::new(None, xp, &at, "test"))
                .await
                .unwrap();
        }

        let service = ProgressService::new(fixed_clock(), Arc::new(repo));
        let report = service.report().await.unwrap();

        assert!((report.quiz_average - 0.8).abs() < 1e-9);
        assert!((report.flash_known_ratio - 0.5).abs() < 1e-9);
        assert!((report.blended - (0.6 * 0.8 + 0.4 * 0.5)).abs() < 1e-9);
        assert_eq!(report.weekly_xp, 30);
    }

    #[tokio::test]
    async fn empty_store_reports_zero() {
        let service = ProgressService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let report = service.report().await.unwrap();
        assert_eq!(report.blended, 0.0);
        assert_eq!(report.weekly_xp, 0);
    }
}
