//! Teacher dashboard figures over the active students.
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{DyslexiaType, ExerciseType, ProgressRecord, Severity, User};

const ACTIVE_WITHIN_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub total_sessions: usize,
    pub average_score: f64,
    pub highest_score: f64,
    pub latest_score: f64,
    pub latest_date: Option<DateTime<Utc>>,
    pub exercise_types: Vec<ExerciseType>,
    pub total_time_spent: u64,
    pub average_accuracy: f64,
}

impl StudentProgress {
    /// `records` in append order; the last one is the latest score.
    pub fn from_records(records: &[ProgressRecord]) -> Self {
        let Some(latest) = records.last() else {
            return Self::default();
        };

        let count = records.len() as f64;
        let accuracies: Vec<f64> = records.iter().filter_map(|record| record.accuracy).collect();

        let mut exercise_types = Vec::new();
        for record in records {
            if !exercise_types.contains(&record.exercise_type) {
                exercise_types.push(record.exercise_type);
            }
        }

        Self {
            total_sessions: records.len(),
            average_score: records.iter().map(|record| record.score).sum::<f64>() / count,
            highest_score: records
                .iter()
                .map(|record| record.score)
                .fold(f64::MIN, f64::max),
            latest_score: latest.score,
            latest_date: records.iter().map(|record| record.created_at).max(),
            exercise_types,
            total_time_spent: records.iter().map(|record| record.time_spent as u64).sum(),
            average_accuracy: match accuracies.len() {
                0 => 0.0,
                n => accuracies.iter().sum::<f64>() / n as f64,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentWithProgress {
    pub student: User,
    pub progress: StudentProgress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DyslexiaChances {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_students: usize,
    pub active_students: usize,
    pub dyslexia_breakdown: BTreeMap<DyslexiaType, usize>,
    pub severity_breakdown: BTreeMap<Severity, usize>,
    pub students_needing_support: usize,
    pub students_with_progress: Vec<StudentWithProgress>,
    pub dyslexia_chances: DyslexiaChances,
    pub overall_average_score: f64,
}

/// Bands may overlap: a flagged student with a low score and accuracy in 60..75
/// is counted as both high and medium.
fn dyslexia_chances(students: &[StudentWithProgress]) -> DyslexiaChances {
    let mut chances = DyslexiaChances::default();

    for entry in students {
        let flagged = entry.student.learning_profile.dyslexia_type != DyslexiaType::None;
        let accuracy = entry.progress.average_accuracy;
        let score = entry.progress.average_score;

        if flagged && (accuracy < 60.0 || score < 50.0) {
            chances.high += 1;
        }
        if flagged && (60.0..75.0).contains(&accuracy) {
            chances.medium += 1;
        }
        if !flagged || accuracy >= 75.0 {
            chances.low += 1;
        }
    }

    chances
}

/// `students` should already be the active ones; they are reported newest first.
pub fn build_analytics(
    mut students: Vec<User>,
    progress: &HashMap<Uuid, Vec<ProgressRecord>>,
    now: DateTime<Utc>,
) -> Analytics {
    students.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let active_since = now - Duration::days(ACTIVE_WITHIN_DAYS);
    let active_students = students
        .iter()
        .filter(|student| student.progress.last_active >= active_since)
        .count();

    let mut dyslexia_breakdown = BTreeMap::new();
    let mut severity_breakdown = BTreeMap::new();

    for student in &students {
        let profile = &student.learning_profile;
        *dyslexia_breakdown.entry(profile.dyslexia_type).or_insert(0) += 1;

        if profile.dyslexia_type != DyslexiaType::None {
            *severity_breakdown.entry(profile.severity).or_insert(0) += 1;
        }
    }

    let total_students = students.len();
    let students_needing_support =
        total_students - dyslexia_breakdown.get(&DyslexiaType::None).copied().unwrap_or(0);

    let students_with_progress: Vec<StudentWithProgress> = students
        .into_iter()
        .map(|student| {
            let records = progress.get(&student.id).map(Vec::as_slice).unwrap_or_default();

            StudentWithProgress {
                progress: StudentProgress::from_records(records),
                student,
            }
        })
        .collect();

    let averages: Vec<f64> = students_with_progress
        .iter()
        .filter(|entry| entry.progress.total_sessions > 0)
        .map(|entry| entry.progress.average_score)
        .collect();

    let overall_average_score = match averages.len() {
        0 => 0.0,
        n => averages.iter().sum::<f64>() / n as f64,
    };

    Analytics {
        total_students,
        active_students,
        dyslexia_breakdown,
        severity_breakdown,
        students_needing_support,
        dyslexia_chances: dyslexia_chances(&students_with_progress),
        students_with_progress,
        overall_average_score,
    }
}
