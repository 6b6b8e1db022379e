//! Learning-disorder screening from quiz performance.
//!
//! Each screened area is flagged when the player answered at least two of its
//! challenges and got under 60% of the available points. Under 40% is rated high.
use serde::{Deserialize, Serialize};

use crate::challenges::{ChallengeType, MAX_SCORE};

const FLAG_BELOW: f64 = 60.0;
const HIGH_BELOW: f64 = 40.0;
const MIN_CHALLENGES: u32 = 2;

/// Points earned and challenges attempted per screened area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisorderTally {
    pub dyscalculia_score: u32,
    pub dysphasia_score: u32,
    pub dysgraphia_score: u32,
    pub total_dyscalculia_challenges: u32,
    pub total_dysphasia_challenges: u32,
    pub total_dysgraphia_challenges: u32,
}

impl DisorderTally {
    /// Counts an attempt; `points` is zero for a wrong answer. Talent-only
    /// challenge types are not screened.
    pub fn record(&mut self, kind: ChallengeType, points: u32) {
        let (score, total) = match kind {
            ChallengeType::Dyscalculia => (
                &mut self.dyscalculia_score,
                &mut self.total_dyscalculia_challenges,
            ),
            ChallengeType::Dysphasia => (
                &mut self.dysphasia_score,
                &mut self.total_dysphasia_challenges,
            ),
            ChallengeType::Dysgraphia => (
                &mut self.dysgraphia_score,
                &mut self.total_dysgraphia_challenges,
            ),
            _ => return,
        };

        *score += points;
        *total += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disorder {
    pub name: String,
    pub description: String,
    pub percentage: u32,
    pub severity: Severity,
    pub icon: String,
}

fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }

    score as f64 / (total * MAX_SCORE) as f64 * 100.0
}

pub fn assess(tally: &DisorderTally) -> Vec<Disorder> {
    let areas = [
        (
            "Dyscalculia",
            "Difficulty with numbers and mathematical concepts",
            "🔢",
            tally.dyscalculia_score,
            tally.total_dyscalculia_challenges,
        ),
        (
            "Dysphasia",
            "Language processing and communication difficulties",
            "🗣️",
            tally.dysphasia_score,
            tally.total_dysphasia_challenges,
        ),
        (
            "Dysgraphia",
            "Writing and spelling difficulties",
            "✏️",
            tally.dysgraphia_score,
            tally.total_dysgraphia_challenges,
        ),
    ];

    areas
        .into_iter()
        .filter_map(|(name, description, icon, score, total)| {
            let pct = percentage(score, total);

            if pct >= FLAG_BELOW || total < MIN_CHALLENGES {
                return None;
            }

            Some(Disorder {
                name: name.to_string(),
                description: description.to_string(),
                percentage: pct.round() as u32,
                severity: if pct < HIGH_BELOW {
                    Severity::High
                } else {
                    Severity::Moderate
                },
                icon: icon.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(correct: u32, attempted: u32) -> DisorderTally {
        let mut tally = DisorderTally::default();
        for index in 0..attempted {
            let points = if index < correct { MAX_SCORE } else { 0 };
            tally.record(ChallengeType::Dyscalculia, points);
        }
        tally
    }

    #[test]
    fn test_clean_run_flags_nothing() {
        assert!(assess(&tally(5, 5)).is_empty());
        assert!(assess(&DisorderTally::default()).is_empty());
    }

    #[test]
    fn test_single_attempt_is_not_enough() {
        assert!(assess(&tally(0, 1)).is_empty());
    }

    #[test]
    fn test_moderate_band() {
        // 1 of 2 correct: 50%
        let disorders = assess(&tally(1, 2));

        assert_eq!(disorders.len(), 1);
        assert_eq!(disorders[0].name, "Dyscalculia");
        assert_eq!(disorders[0].percentage, 50);
        assert_eq!(disorders[0].severity, Severity::Moderate);
    }

    #[test]
    fn test_high_band() {
        // 1 of 3 correct: 33.3%
        let disorders = assess(&tally(1, 3));

        assert_eq!(disorders[0].percentage, 33);
        assert_eq!(disorders[0].severity, Severity::High);
    }

    #[test]
    fn test_exactly_sixty_percent_is_not_flagged() {
        assert!(assess(&tally(3, 5)).is_empty());
    }

    #[test]
    fn test_talent_types_are_not_screened() {
        let mut tally = DisorderTally::default();
        tally.record(ChallengeType::Creativity, 0);
        tally.record(ChallengeType::Logic, 0);

        assert_eq!(tally, DisorderTally::default());
    }

    #[test]
    fn test_areas_are_reported_in_order() {
        let mut tally = DisorderTally::default();
        for _ in 0..2 {
            tally.record(ChallengeType::Dysgraphia, 0);
            tally.record(ChallengeType::Dysphasia, 0);
        }

        let names: Vec<_> = assess(&tally).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Dysphasia", "Dysgraphia"]);
    }
}
