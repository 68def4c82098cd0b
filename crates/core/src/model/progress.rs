use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{DeckId, LearnerId};
use crate::model::report::ProgressReport;

/// Accumulated progress of one learner on one deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckProgress {
    pub learner_id: LearnerId,
    pub deck_id: DeckId,
    /// Cards covered by the most recent session.
    pub learned_cards: u32,
    pub total_score: u32,
    pub stars: u32,
    pub last_studied: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub streak_days: u32,
}

impl DeckProgress {
    #[must_use]
    pub fn new(learner_id: LearnerId, deck_id: DeckId) -> Self {
        Self {
            learner_id,
            deck_id,
            learned_cards: 0,
            total_score: 0,
            stars: 0,
            last_studied: None,
            completion_date: None,
            streak_days: 0,
        }
    }

    /// Folds a session report into the record.
    ///
    /// Stars and score accumulate, `learned_cards` is replaced. The deck is
    /// marked complete the first time a report covers `deck_size` cards.
    /// Studying on consecutive calendar days extends the streak; a gap
    /// restarts it at 1.
    pub fn apply(&mut self, report: &ProgressReport, deck_size: u32, now: DateTime<Utc>) {
        self.learned_cards = report.learned_cards;
        self.total_score = self.total_score.saturating_add(report.score.unwrap_or(0));
        self.stars = self.stars.saturating_add(report.stars);

        if report.learned_cards >= deck_size && self.completion_date.is_none() {
            self.completion_date = Some(now);
        }

        self.streak_days = match self.last_studied {
            None => 1,
            Some(previous) => match (now.date_naive() - previous.date_naive()).num_days() {
                0 => self.streak_days.max(1),
                1 => self.streak_days.saturating_add(1),
                _ => 1,
            },
        };
        self.last_studied = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn report(learned: u32, score: Option<u32>, stars: u32) -> ProgressReport {
        ProgressReport {
            learner_id: Some(LearnerId::new(1)),
            deck_id: DeckId::new(2),
            learned_cards: learned,
            score,
            stars,
        }
    }

    #[test]
    fn first_report_starts_streak_and_accumulates() {
        let mut progress = DeckProgress::new(LearnerId::new(1), DeckId::new(2));
        progress.apply(&report(2, Some(20), 20), 5, fixed_now());

        assert_eq!(progress.learned_cards, 2);
        assert_eq!(progress.total_score, 20);
        assert_eq!(progress.stars, 20);
        assert_eq!(progress.streak_days, 1);
        assert_eq!(progress.completion_date, None);
        assert_eq!(progress.last_studied, Some(fixed_now()));
    }

    #[test]
    fn completion_date_is_set_once() {
        let mut progress = DeckProgress::new(LearnerId::new(1), DeckId::new(2));
        let first = fixed_now();
        progress.apply(&report(3, None, 30), 3, first);
        progress.apply(&report(3, None, 30), 3, first + Duration::hours(1));

        assert_eq!(progress.completion_date, Some(first));
        assert_eq!(progress.stars, 60);
        assert_eq!(progress.total_score, 0);
    }

    #[test]
    fn streak_follows_calendar_days() {
        let mut progress = DeckProgress::new(LearnerId::new(1), DeckId::new(2));
        let day0 = fixed_now();
        progress.apply(&report(1, None, 10), 3, day0);
        progress.apply(&report(1, None, 10), 3, day0 + Duration::minutes(5));
        assert_eq!(progress.streak_days, 1);

        progress.apply(&report(1, None, 10), 3, day0 + Duration::days(1));
        assert_eq!(progress.streak_days, 2);

        progress.apply(&report(1, None, 10), 3, day0 + Duration::days(4));
        assert_eq!(progress.streak_days, 1);
    }
}
