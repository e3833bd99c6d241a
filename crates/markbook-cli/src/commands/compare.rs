//! The `markbook compare` command.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use markbook_core::analysis::analyze_performance;
use markbook_core::legacy;
use markbook_core::report::compare_student;

use crate::config::{check_format, load_config_from};

pub fn execute(
    input: PathBuf,
    student: String,
    threshold: Option<f64>,
    format: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let format = format.unwrap_or_else(|| config.default_format.clone());
    check_format(&format)?;
    let outcome = legacy::import_file(&input)?;
    let cohort = super::cohort(&outcome, None);

    // Accept either an id or a full name.
    let found = outcome
        .students
        .iter()
        .find(|s| s.id == student)
        .or_else(|| {
            outcome
                .students
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(&student))
        })
        .ok_or_else(|| anyhow!("student '{student}' not found in {}", input.display()))?;
    let result = cohort
        .iter()
        .find(|r| r.student_id == found.id)
        .ok_or_else(|| anyhow!("no result recorded for student '{}'", found.id))?;

    let analysis = analyze_performance(&outcome.exam, &cohort);
    let threshold = threshold.unwrap_or(config.comparison_threshold);
    let comparison = compare_student(&analysis, &cohort, result, threshold);

    match format.as_str() {
        "markdown" | "md" => println!("{}", comparison.to_markdown()),
        "json" => println!("{}", super::to_json(&comparison, config.pretty_json)?),
        _ => {
            use comfy_table::{Cell, Table};

            println!(
                "{} ({}): {} / {} ({:.1}%), band {}",
                found.name,
                found.id,
                comparison.score_total,
                analysis.total_marks,
                comparison.pct,
                comparison.band
            );
            println!(
                "Cohort mean {:.1} ({:.1}%), percentile rank {:.1}",
                comparison.cohort_mean, comparison.cohort_mean_pct, comparison.percentile_rank
            );

            let mut table = Table::new();
            table.set_header(vec!["Question", "Student", "Cohort", "Delta"]);
            for q in &comparison.questions {
                table.add_row(vec![
                    Cell::new(&q.label),
                    Cell::new(q.student_pct.map_or("-".to_string(), |p| format!("{p:.1}%"))),
                    Cell::new(format!("{:.1}%", q.cohort_pct)),
                    Cell::new(q.delta.map_or("-".to_string(), |d| format!("{d:+.1}"))),
                ]);
            }
            println!("\n{table}");

            for (title, rows) in [
                ("Strengths", &comparison.strengths),
                ("Weaknesses", &comparison.weaknesses),
            ] {
                if !rows.is_empty() {
                    let labels: Vec<&str> = rows.iter().map(|q| q.label.as_str()).collect();
                    println!("{title}: {}", labels.join(", "));
                }
            }
        }
    }

    Ok(())
}
