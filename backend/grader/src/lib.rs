//! # Grader
//!
//! Offline batch scoring of canvas drawings.
//!
//! Each file is decoded, brought to the logical canvas size and compared against
//! the prompt exactly as the server does for a live submission. Files that cannot
//! be read or decoded are kept in the report as skipped entries.
use std::path::{Path, PathBuf};

use canvas::{Accuracy, grade_drawing};
use indicatif::{ProgressBar, ProgressStyle};

pub mod report;

use report::{Entry, Outcome};

pub fn load_and_grade(prompt: &str, path: &Path) -> anyhow::Result<Accuracy> {
    let drawing = image::open(path)?;
    Ok(grade_drawing(prompt, drawing)?)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);

    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }

    pb
}

pub fn grade_drawings(prompt: &str, paths: &[PathBuf]) -> Vec<Entry> {
    let pb = progress_bar(paths.len());
    let mut entries = Vec::with_capacity(paths.len());

    for path in paths {
        let file = path.display().to_string();
        pb.set_message(format!("Grading {file}"));

        let outcome = match load_and_grade(prompt, path) {
            Ok(accuracy) => Outcome::graded(&accuracy),
            Err(e) => Outcome::Skipped {
                reason: e.to_string(),
            },
        };

        let entry = Entry { file, outcome };
        pb.println(entry.line());
        entries.push(entry);

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    entries
}
