use std::{fs, path::Path};

use canvas::Accuracy;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub file: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
    Graded {
        score: u8,
        feedback: &'static str,
        coverage: f64,
        iou: f64,
    },
    Skipped {
        reason: String,
    },
}

impl Outcome {
    pub fn graded(accuracy: &Accuracy) -> Self {
        Outcome::Graded {
            score: accuracy.score,
            feedback: accuracy.feedback().label(),
            coverage: accuracy.coverage,
            iou: accuracy.iou,
        }
    }
}

impl Entry {
    /// One line of terminal output.
    pub fn line(&self) -> String {
        match &self.outcome {
            Outcome::Graded {
                score,
                feedback,
                coverage,
                iou,
            } => format!(
                "{}: {score} ({feedback}) coverage {:.1}% iou {:.3}",
                self.file,
                coverage * 100.0,
                iou
            ),
            Outcome::Skipped { reason } => format!("{}: skipped, {reason}", self.file),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub prompt: String,
    pub graded: usize,
    pub skipped: usize,
    pub average_score: Option<f64>,
    pub entries: Vec<Entry>,
}

impl Report {
    pub fn new(prompt: &str, entries: Vec<Entry>, generated_at: DateTime<Utc>) -> Self {
        let scores: Vec<u8> = entries
            .iter()
            .filter_map(|entry| match entry.outcome {
                Outcome::Graded { score, .. } => Some(score),
                Outcome::Skipped { .. } => None,
            })
            .collect();

        let average_score = (!scores.is_empty())
            .then(|| scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64);

        Report {
            generated_at,
            prompt: prompt.to_string(),
            graded: scores.len(),
            skipped: entries.len() - scores.len(),
            average_score,
            entries,
        }
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(file: &str, score: u8) -> Entry {
        Entry {
            file: file.to_string(),
            outcome: Outcome::Graded {
                score,
                feedback: canvas::Feedback::from_score(score).label(),
                coverage: 0.5,
                iou: 0.25,
            },
        }
    }

    fn skipped(file: &str) -> Entry {
        Entry {
            file: file.to_string(),
            outcome: Outcome::Skipped {
                reason: "missing".to_string(),
            },
        }
    }

    #[test]
    fn test_report_totals() {
        let report = Report::new(
            "cat",
            vec![graded("a.png", 90), skipped("b.png"), graded("c.png", 60)],
            Utc::now(),
        );

        assert_eq!(report.graded, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.average_score, Some(75.0));
    }

    #[test]
    fn test_empty_report_has_no_average() {
        let report = Report::new("cat", vec![skipped("b.png")], Utc::now());
        assert_eq!(report.average_score, None);
    }

    #[test]
    fn test_entry_json_shape() {
        let json = serde_json::to_value(graded("a.png", 95)).unwrap();
        assert_eq!(json["file"], "a.png");
        assert_eq!(json["status"], "graded");
        assert_eq!(json["feedback"], "Excellent");

        let json = serde_json::to_value(skipped("b.png")).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "missing");
    }

    #[test]
    fn test_lines() {
        assert_eq!(
            graded("a.png", 72).line(),
            "a.png: 72 (Good) coverage 50.0% iou 0.250"
        );
        assert_eq!(skipped("b.png").line(), "b.png: skipped, missing");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        Report::new("cat", vec![graded("a.png", 90)], Utc::now())
            .write(&path)
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["prompt"], "cat");
        assert_eq!(json["entries"][0]["score"], 90);
        assert!(json["generatedAt"].as_str().is_some());
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("report.json");

        assert!(Report::new("cat", vec![], Utc::now()).write(&path).is_err());
    }
}
