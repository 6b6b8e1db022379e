use serde::{Deserialize, Serialize};

/// Points awarded for a correct multiple-choice answer; also the per-challenge
/// denominator of the disorder percentages.
pub const MAX_SCORE: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    #[default]
    Grade12,
    Grade34,
    Grade56,
}

impl AgeGroup {
    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Grade12 => "Grade 1-2",
            AgeGroup::Grade34 => "Grade 3-4",
            AgeGroup::Grade56 => "Grade 5-6",
        }
    }

    /// Grade 5-6 reads the story passages before the quiz starts.
    pub fn has_passages(&self) -> bool {
        matches!(self, AgeGroup::Grade56)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChallengeType {
    Creativity,
    Logic,
    Memory,
    Observation,
    ProblemSolving,
    Dyscalculia,
    Dysphasia,
    Dysgraphia,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: u32,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ChallengeType,
    pub content: String,
    /// `None` for open-ended challenges answered in free text.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<usize>,
    pub max_score: u32,
    pub type_label: String,
}

impl Challenge {
    pub fn is_open_ended(&self) -> bool {
        self.options.is_none()
    }

    pub fn option_count(&self) -> usize {
        self.options.as_ref().map_or(0, Vec::len)
    }

    /// Copy safe to hand to a player: the answer key is removed.
    pub fn without_answer(&self) -> Self {
        Self {
            correct_answer: None,
            ..self.clone()
        }
    }
}
