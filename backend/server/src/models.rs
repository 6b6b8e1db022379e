//! Records kept in the store.
//!
//! Accounts are persisted as [`Account`]: the password hash next to a flattened
//! [`User`]. Handlers only ever serialize the inner [`User`], so the hash never
//! reaches a response.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DyslexiaType {
    Dyslexia,
    Dyscalculia,
    Dysgraphia,
    Dysphasia,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accommodation {
    TextToSpeech,
    ExtraTime,
    VisualAids,
    AudioSupport,
    LargeText,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProfile {
    #[serde(default)]
    pub dyslexia_type: DyslexiaType,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub accommodations: Vec<Accommodation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_sessions: u32,
    pub completed_exercises: u32,
    pub average_score: f64,
    pub last_active: DateTime<Utc>,
}

impl ProgressSummary {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_sessions: 0,
            completed_exercises: 0,
            average_score: 0.0,
            last_active: now,
        }
    }

    /// Folds one finished exercise into the running average.
    pub fn record(&mut self, score: f64, now: DateTime<Utc>) {
        let previous = self.completed_exercises as f64;

        self.total_sessions += 1;
        self.completed_exercises += 1;
        self.average_score = (self.average_score * previous + score) / (previous + 1.0);
        self.last_active = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    Screening,
    FullAssessment,
    ProgressCheck,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Screening => "screening",
            TestType::FullAssessment => "full-assessment",
            TestType::ProgressCheck => "progress-check",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTest {
    pub test_type: TestType,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub status: TestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_id: Option<String>,
    /// Older teacher accounts log students in with this instead of a consultant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub learning_profile: LearningProfile,
    pub progress: ProgressSummary,
    #[serde(default)]
    pub assigned_tests: Vec<AssignedTest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    pub is_active: bool,
    #[serde(default)]
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(first_name: String, last_name: String, email: String, role: Role) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email,
            role,
            student_id: None,
            grade: None,
            parent_name: None,
            parent_phone: None,
            parent_address: None,
            consultant_id: None,
            employee_id: None,
            department: None,
            learning_profile: LearningProfile::default(),
            progress: ProgressSummary::new(now),
            assigned_tests: Vec::new(),
            created_by: None,
            is_active: true,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Teacher | Role::Admin)
    }

    /// Case-insensitive substring match over names, email and student id.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();

        [
            Some(&self.first_name),
            Some(&self.last_name),
            Some(&self.email),
            self.student_id.as_ref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub password_hash: String,
    #[serde(flatten)]
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Quiz,
    Drawing,
    Practice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exercise_type: ExerciseType,
    pub score: f64,
    pub time_spent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(
        user_id: Uuid,
        exercise_type: ExerciseType,
        score: f64,
        time_spent: u32,
        accuracy: Option<f64>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            exercise_type,
            score,
            time_spent,
            accuracy,
            details,
            created_at: Utc::now(),
        }
    }
}
