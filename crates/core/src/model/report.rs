use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::ids::{DeckId, LearnerId};

/// Completion summary sent once per finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    #[serde(alias = "child_id")]
    pub learner_id: Option<LearnerId>,
    pub deck_id: DeckId,
    pub learned_cards: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub stars: u32,
}

/// Navigation target shown after a session: the rewards screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardsLink {
    pub learner_id: Option<LearnerId>,
    pub deck_id: DeckId,
    pub stars: u32,
}

impl RewardsLink {
    #[must_use]
    pub fn for_report(report: &ProgressReport) -> Self {
        Self {
            learner_id: report.learner_id,
            deck_id: report.deck_id,
            stars: report.stars,
        }
    }

    /// Full URL below the given site root.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base` is not an absolute URL.
    pub fn to_url(&self, base: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base)?.join("/flashcards/rewards")?;
        url.query_pairs_mut()
            .append_pair(
                "child_id",
                &self
                    .learner_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            )
            .append_pair("deck_id", &self.deck_id.to_string())
            .append_pair("stars", &self.stars.to_string());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(learner: Option<u64>, score: Option<u32>) -> ProgressReport {
        ProgressReport {
            learner_id: learner.map(LearnerId::new),
            deck_id: DeckId::new(3),
            learned_cards: 3,
            score,
            stars: 30,
        }
    }

    #[test]
    fn score_is_omitted_when_absent() {
        let json = serde_json::to_value(report(Some(7), None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "learner_id": 7,
                "deck_id": 3,
                "learned_cards": 3,
                "stars": 30
            })
        );
    }

    #[test]
    fn anonymous_report_carries_null_learner() {
        let json = serde_json::to_value(report(None, Some(20))).unwrap();
        assert_eq!(json["learner_id"], serde_json::Value::Null);
        assert_eq!(json["score"], 20);
    }

    #[test]
    fn reads_legacy_child_id_field() {
        let parsed: ProgressReport = serde_json::from_str(
            r#"{"child_id": 4, "deck_id": 3, "learned_cards": 1, "stars": 10}"#,
        )
        .unwrap();
        assert_eq!(parsed.learner_id, Some(LearnerId::new(4)));
        assert_eq!(parsed.score, None);
    }

    #[test]
    fn rewards_link_keeps_empty_child_id() {
        let url = RewardsLink::for_report(&report(None, None))
            .to_url("http://localhost:5000/anything")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/flashcards/rewards?child_id=&deck_id=3&stars=30"
        );
    }

    #[test]
    fn rewards_link_with_learner() {
        let url = RewardsLink::for_report(&report(Some(12), None))
            .to_url("https://example.org")
            .unwrap();
        assert_eq!(url.query(), Some("child_id=12&deck_id=3&stars=30"));
    }

    #[test]
    fn rewards_link_built_by_hand_matches_report() {
        let link = RewardsLink {
            learner_id: Some(LearnerId::new(5)),
            deck_id: DeckId::new(3),
            stars: 30,
        };
        assert_eq!(link, RewardsLink::for_report(&report(Some(5), None)));
        assert_eq!(link.stars, 30);
        assert_eq!(
            link.to_url("http://localhost:5000").unwrap().query(),
            Some("child_id=5&deck_id=3&stars=30")
        );
    }
}
