use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use grader::{grade_drawings, report::Report};

/// Scores canvas drawings against a prompt.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Word or phrase the drawings should reproduce
    prompt: String,

    #[arg(required = true)]
    drawings: Vec<PathBuf>,

    /// Write a JSON report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Prompt: {}", args.prompt);
    println!("Drawings: {}\n", args.drawings.len());

    let entries = grade_drawings(&args.prompt, &args.drawings);
    let report = Report::new(&args.prompt, entries, Utc::now());

    println!("\nGraded: {}", report.graded);
    println!("Skipped: {}", report.skipped);
    if let Some(average) = report.average_score {
        println!("Average: {average:.1}");
    }

    if let Some(path) = &args.report {
        report.write(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
