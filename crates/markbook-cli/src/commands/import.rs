//! The `markbook import` command.

use std::path::PathBuf;

use anyhow::Result;

use markbook_core::legacy;
use markbook_core::tree;

pub fn execute(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let outcome = legacy::import_file(&input)?;
    let exam = &outcome.exam;

    println!("Imported {} ({}) as {}", exam.name, exam.id, outcome.mode);
    println!(
        "  {} questions, {} marks, {} students, {} results",
        tree::flatten_leaves(&exam.questions).len(),
        exam.total_marks,
        outcome.students.len(),
        outcome.results.len()
    );

    for w in &outcome.warnings {
        println!("  WARNING {w}");
    }
    if !outcome.warnings.is_empty() {
        println!("\n{} field(s) fell back to defaults.", outcome.warnings.len());
    }

    if let Some(path) = output {
        outcome.export().save_json(&path)?;
        println!("Exported to: {}", path.display());
    }

    Ok(())
}
