//! # Game State
//!
//! The quiz is driven by one immutable [`GameState`]. Every user interaction is an
//! [`Action`], and [`GameState::reduce`] consumes the current state and returns the
//! next one. Nothing else mutates a game.
//!
//! Shuffling is the only source of randomness and stays outside the reducer: actions
//! that start a round carry the already-shuffled challenges.
//!
//! ## Phases
//! - `welcome`: choosing an age group and entering a name
//! - `passages`: grade 5-6 reads the stories first
//! - `playing`: waiting for an answer to the current challenge
//! - `answered`: feedback shown, waiting for `Next`
//! - `finished`: every challenge answered, a [`GameResult`] is available
//!
//! Actions that do not apply to the current phase return the state unchanged.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    assessment::{Disorder, DisorderTally, assess},
    challenges::{AgeGroup, Challenge, ChallengeType, MAX_SCORE},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    pub large_font: bool,
    pub high_contrast: bool,
    pub dyslexia_font: bool,
    pub reading_guide: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessibilityFlag {
    LargeFont,
    HighContrast,
    DyslexiaFont,
    ReadingGuide,
}

impl Accessibility {
    pub fn toggled(self, flag: AccessibilityFlag) -> Self {
        match flag {
            AccessibilityFlag::LargeFont => Self {
                large_font: !self.large_font,
                ..self
            },
            AccessibilityFlag::HighContrast => Self {
                high_contrast: !self.high_contrast,
                ..self
            },
            AccessibilityFlag::DyslexiaFont => Self {
                dyslexia_font: !self.dyslexia_font,
                ..self
            },
            AccessibilityFlag::ReadingGuide => Self {
                reading_guide: !self.reading_guide,
                ..self
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentScores {
    pub creativity: u32,
    pub logic: u32,
    pub memory: u32,
    pub observation: u32,
    pub problem_solving: u32,
    pub dyscalculia: u32,
    pub dysphasia: u32,
    pub dysgraphia: u32,
}

impl TalentScores {
    pub fn add(&mut self, kind: ChallengeType, points: u32) {
        let slot = match kind {
            ChallengeType::Creativity => &mut self.creativity,
            ChallengeType::Logic => &mut self.logic,
            ChallengeType::Memory => &mut self.memory,
            ChallengeType::Observation => &mut self.observation,
            ChallengeType::ProblemSolving => &mut self.problem_solving,
            ChallengeType::Dyscalculia => &mut self.dyscalculia,
            ChallengeType::Dysphasia => &mut self.dysphasia,
            ChallengeType::Dysgraphia => &mut self.dysgraphia,
        };

        *slot += points;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Welcome,
    Passages,
    Playing,
    Answered,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Feedback {
    NameRequired,
    Correct,
    #[serde(rename_all = "camelCase")]
    Incorrect { correct_answer: Option<usize> },
    CreativeAccepted { points: u32 },
    EmptyAnswer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectAgeGroup {
        age_group: AgeGroup,
        challenges: Vec<Challenge>,
    },
    Start {
        player_name: String,
        challenges: Vec<Challenge>,
    },
    BeginQuiz,
    Answer(usize),
    SubmitCreative(String),
    Next,
    Restart,
    PlayAgain {
        challenges: Vec<Challenge>,
    },
    Toggle(AccessibilityFlag),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub player_name: String,
    pub age_group: AgeGroup,
    pub challenges: Vec<Challenge>,
    pub current: usize,
    pub score: u32,
    pub talent_scores: TalentScores,
    pub tally: DisorderTally,
    pub accessibility: Accessibility,
    pub phase: Phase,
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub player_name: String,
    pub age_group: AgeGroup,
    pub score: u32,
    pub total_possible: u32,
    pub percentage: u32,
    pub talent_scores: TalentScores,
    pub disorders: Vec<Disorder>,
    pub challenges_completed: usize,
    pub accessibility: Accessibility,
    pub date: DateTime<Utc>,
}

impl GameState {
    pub fn new(age_group: AgeGroup, accessibility: Accessibility) -> Self {
        Self {
            player_name: String::new(),
            age_group,
            challenges: Vec::new(),
            current: 0,
            score: 0,
            talent_scores: TalentScores::default(),
            tally: DisorderTally::default(),
            accessibility,
            phase: Phase::Welcome,
            feedback: None,
        }
    }

    pub fn current_challenge(&self) -> Option<&Challenge> {
        match self.phase {
            Phase::Playing | Phase::Answered => self.challenges.get(self.current),
            _ => None,
        }
    }

    /// Progress bar fill for the current challenge, 0-100.
    pub fn progress_percent(&self) -> f64 {
        if self.challenges.is_empty() {
            return 0.0;
        }

        ((self.current + 1).min(self.challenges.len()) as f64 / self.challenges.len() as f64)
            * 100.0
    }

    pub fn reduce(self, action: Action) -> Self {
        let next = match action {
            Action::SelectAgeGroup {
                age_group,
                challenges,
            } if self.phase == Phase::Welcome => Self {
                age_group,
                challenges,
                feedback: None,
                ..self
            },
            Action::Start {
                player_name,
                challenges,
            } if matches!(self.phase, Phase::Welcome | Phase::Finished) => {
                self.start(player_name, challenges)
            }
            Action::BeginQuiz if self.phase == Phase::Passages => Self {
                phase: Phase::Playing,
                ..self
            },
            Action::Answer(choice) if self.phase == Phase::Playing => self.answer(choice),
            Action::SubmitCreative(text) if self.phase == Phase::Playing => {
                self.submit_creative(&text)
            }
            Action::Next if self.phase == Phase::Answered => Self {
                current: self.current + 1,
                phase: Phase::Playing,
                feedback: None,
                ..self
            },
            Action::Restart if matches!(self.phase, Phase::Playing | Phase::Answered) => Self {
                phase: Phase::Playing,
                ..self.reset_progress()
            },
            Action::PlayAgain { challenges } if self.phase == Phase::Finished => Self {
                challenges,
                phase: Phase::Playing,
                ..self.reset_progress()
            },
            Action::Toggle(flag) => Self {
                accessibility: self.accessibility.toggled(flag),
                ..self
            },
            _ => self,
        };

        next.settle()
    }

    /// Available once every challenge has been answered.
    pub fn result(&self, date: DateTime<Utc>) -> Option<GameResult> {
        if self.phase != Phase::Finished {
            return None;
        }

        let total_possible = self.challenges.len() as u32 * MAX_SCORE;
        let percentage = match total_possible {
            0 => 0,
            total => (self.score as f64 / total as f64 * 100.0).round() as u32,
        };

        Some(GameResult {
            player_name: self.player_name.clone(),
            age_group: self.age_group,
            score: self.score,
            total_possible,
            percentage,
            talent_scores: self.talent_scores,
            disorders: assess(&self.tally),
            challenges_completed: self.challenges.len(),
            accessibility: self.accessibility,
            date,
        })
    }

    fn start(self, player_name: String, challenges: Vec<Challenge>) -> Self {
        let player_name = player_name.trim().to_string();

        if player_name.is_empty() {
            return Self {
                feedback: Some(Feedback::NameRequired),
                ..self
            };
        }

        let phase = if self.age_group.has_passages() {
            Phase::Passages
        } else {
            Phase::Playing
        };

        Self {
            player_name,
            challenges,
            phase,
            ..self.reset_progress()
        }
    }

    fn answer(self, choice: usize) -> Self {
        let Some(challenge) = self.challenges.get(self.current) else {
            return self;
        };

        if challenge.is_open_ended() || choice >= challenge.option_count() {
            return self;
        }

        let kind = challenge.kind;
        let correct_answer = challenge.correct_answer;
        let is_correct = correct_answer == Some(choice);
        let points = if is_correct { challenge.max_score } else { 0 };

        let mut tally = self.tally;
        tally.record(kind, points);

        let mut talent_scores = self.talent_scores;
        talent_scores.add(kind, points);

        let feedback = if is_correct {
            Feedback::Correct
        } else {
            Feedback::Incorrect { correct_answer }
        };

        Self {
            score: self.score + points,
            talent_scores,
            tally,
            phase: Phase::Answered,
            feedback: Some(feedback),
            ..self
        }
    }

    /// Open-ended answers earn participation points: five, plus one per ten
    /// characters, capped at the challenge maximum.
    fn submit_creative(self, text: &str) -> Self {
        let Some(challenge) = self.challenges.get(self.current) else {
            return self;
        };

        if !challenge.is_open_ended() {
            return self;
        }

        if text.trim().is_empty() {
            return Self {
                feedback: Some(Feedback::EmptyAnswer),
                ..self
            };
        }

        let kind = challenge.kind;
        let points = challenge
            .max_score
            .min(text.chars().count() as u32 / 10 + 5);

        let mut talent_scores = self.talent_scores;
        talent_scores.add(kind, points);

        Self {
            score: self.score + points,
            talent_scores,
            phase: Phase::Answered,
            feedback: Some(Feedback::CreativeAccepted { points }),
            ..self
        }
    }

    fn reset_progress(self) -> Self {
        Self {
            current: 0,
            score: 0,
            talent_scores: TalentScores::default(),
            tally: DisorderTally::default(),
            feedback: None,
            ..self
        }
    }

    /// A round with no challenges left is over.
    fn settle(self) -> Self {
        if self.phase == Phase::Playing && self.current >= self.challenges.len() {
            return Self {
                phase: Phase::Finished,
                ..self
            };
        }

        self
    }
}
