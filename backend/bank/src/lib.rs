//! Challenge bank and quiz engine for the screening game.
//!
//! The bank ships inside the binary as JSON, one list per [`AgeGroup`]. Rounds draw
//! a shuffled copy of a list and play it through [`game::GameState`].
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod assessment;
pub mod challenges;
pub mod game;

pub use challenges::{AgeGroup, Challenge, ChallengeType, MAX_SCORE};

const BANK_JSON: &str = include_str!("../challenges.json");

#[derive(Debug, Error)]
pub enum BankError {
    #[error("Malformed challenge bank: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Challenge {id} has no usable answer key")]
    InvalidAnswerKey { id: u32 },

    #[error("No challenges for {0}")]
    Empty(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub grade12: Vec<Challenge>,
    pub grade34: Vec<Challenge>,
    pub grade56: Vec<Challenge>,
}

impl Bank {
    pub fn challenges(&self, age_group: AgeGroup) -> &[Challenge] {
        match age_group {
            AgeGroup::Grade12 => &self.grade12,
            AgeGroup::Grade34 => &self.grade34,
            AgeGroup::Grade56 => &self.grade56,
        }
    }

    /// A fresh round: every challenge of the age group in random order.
    pub fn shuffled<R: Rng + ?Sized>(&self, age_group: AgeGroup, rng: &mut R) -> Vec<Challenge> {
        let mut round = self.challenges(age_group).to_vec();
        round.shuffle(rng);
        round
    }

    pub fn find(&self, age_group: AgeGroup, id: u32) -> Option<&Challenge> {
        self.challenges(age_group)
            .iter()
            .find(|challenge| challenge.id == id)
    }

    fn validate(self) -> Result<Self, BankError> {
        for age_group in [AgeGroup::Grade12, AgeGroup::Grade34, AgeGroup::Grade56] {
            let challenges = self.challenges(age_group);

            if challenges.is_empty() {
                return Err(BankError::Empty(age_group.label()));
            }

            for challenge in challenges {
                let valid = match (challenge.is_open_ended(), challenge.correct_answer) {
                    (true, None) => true,
                    (false, Some(answer)) => answer < challenge.option_count(),
                    _ => false,
                };

                if !valid {
                    return Err(BankError::InvalidAnswerKey { id: challenge.id });
                }
            }
        }

        Ok(self)
    }
}

/// Parses and checks the embedded bank.
pub fn get_bank() -> Result<Bank, BankError> {
    parse_bank(BANK_JSON)
}

pub fn parse_bank(json: &str) -> Result<Bank, BankError> {
    serde_json::from_str::<Bank>(json)?.validate()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_embedded_bank_is_valid() {
        let bank = get_bank().unwrap();

        for age_group in [AgeGroup::Grade12, AgeGroup::Grade34, AgeGroup::Grade56] {
            assert_eq!(bank.challenges(age_group).len(), 20);
        }
    }

    #[test]
    fn test_embedded_challenges_are_scored_out_of_max() {
        let bank = get_bank().unwrap();

        assert!(
            bank.grade34
                .iter()
                .all(|challenge| challenge.max_score == MAX_SCORE)
        );
    }

    #[test]
    fn test_shuffled_is_a_permutation() {
        let bank = get_bank().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let mut round: Vec<u32> = bank
            .shuffled(AgeGroup::Grade56, &mut rng)
            .iter()
            .map(|challenge| challenge.id)
            .collect();
        let mut original: Vec<u32> = bank.grade56.iter().map(|challenge| challenge.id).collect();

        round.sort_unstable();
        original.sort_unstable();
        assert_eq!(round, original);
    }

    #[test]
    fn test_find() {
        let bank = get_bank().unwrap();
        let first = &bank.grade12[0];

        assert_eq!(bank.find(AgeGroup::Grade12, first.id), Some(first));
        assert_eq!(bank.find(AgeGroup::Grade12, u32::MAX), None);
    }

    #[test]
    fn test_rejects_out_of_range_answer() {
        let json = r#"{
            "grade12": [{
                "id": 1, "title": "t", "description": "d", "type": "dyscalculia",
                "content": "c", "options": ["a", "b"], "correctAnswer": 2,
                "maxScore": 15, "typeLabel": "l"
            }],
            "grade34": [], "grade56": []
        }"#;

        assert!(matches!(
            parse_bank(json),
            Err(BankError::InvalidAnswerKey { id: 1 })
        ));
    }

    #[test]
    fn test_rejects_empty_group() {
        let json = r#"{"grade12": [], "grade34": [], "grade56": []}"#;

        assert!(matches!(parse_bank(json), Err(BankError::Empty("Grade 1-2"))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(parse_bank("{"), Err(BankError::Malformed(_))));
    }
}
