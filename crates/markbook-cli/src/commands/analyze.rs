//! The `markbook analyze` command.

use std::path::PathBuf;

use anyhow::Result;

use markbook_core::analysis::analyze_performance;
use markbook_core::legacy;
use markbook_core::report::AnalysisReport;

use crate::config::{check_format, load_config_from};

pub fn execute(
    input: PathBuf,
    format: Option<String>,
    class: Option<String>,
    output: Option<PathBuf>,
    save: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let format = format.unwrap_or_else(|| config.default_format.clone());
    check_format(&format)?;
    let outcome = legacy::import_file(&input)?;

    let class = class.or_else(|| config.class_filter.clone());
    let results = super::cohort(&outcome, class.as_deref());
    if results.is_empty() {
        tracing::warn!("no results to analyse in {}", input.display());
    }
    let analysis = analyze_performance(&outcome.exam, &results);
    let report = AnalysisReport::new(&outcome.exam, class, analysis);

    match format.as_str() {
        "markdown" | "md" => println!("{}", report.to_markdown()),
        "json" => println!("{}", super::to_json(&report, config.pretty_json)?),
        _ => print_summary(&report),
    }

    let path = match output {
        Some(path) => Some(path),
        None if save => {
            let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
            Some(config.output_dir.join(format!("analysis-{timestamp}.json")))
        }
        None => None,
    };
    if let Some(path) = path {
        report.save_json(&path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    use comfy_table::{Cell, Table};

    let a = &report.analysis;
    let s = &a.stats;
    println!(
        "{}: {} results, mean {:.1} / {}, median {:.1}, std dev {:.2}",
        report.exam.name, s.count, s.mean, a.total_marks, s.median, s.std_dev
    );
    if let Some(class) = &report.class_filter {
        println!("Class: {class}");
    }

    let mut table = Table::new();
    table.set_header(vec!["Question", "Type", "Max", "Average", "%", "Responses"]);
    for q in &a.by_question {
        table.add_row(vec![
            Cell::new(&q.label),
            Cell::new(q.question_type),
            Cell::new(q.max_marks),
            Cell::new(format!("{:.2}", q.average)),
            Cell::new(format!("{:.1}%", q.pct)),
            Cell::new(q.responses),
        ]);
    }
    println!("\n{table}");

    if !a.problem_questions.is_empty() {
        let labels: Vec<String> = a
            .problem_questions
            .iter()
            .map(|q| format!("{} ({:.1}%)", q.label, q.pct))
            .collect();
        println!("\nProblem questions: {}", labels.join(", "));
    }

    let mut bands = Table::new();
    bands.set_header(vec!["Band", "Students"]);
    for b in &a.bands {
        bands.add_row(vec![Cell::new(&b.label), Cell::new(b.count)]);
    }
    println!("\n{bands}");
}
