//! The `markbook validate` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use markbook_core::legacy;
use markbook_core::tree;
use markbook_core::validate::validate_exam;

pub fn execute(input: PathBuf) -> Result<()> {
    let files = if input.is_dir() {
        json_files(&input)?
    } else {
        vec![input]
    };

    let mut total_warnings = 0;

    for path in &files {
        let outcome = legacy::import_file(path)?;
        let exam = &outcome.exam;
        println!(
            "Exam: {} ({} questions, {} marks)",
            exam.name,
            tree::flatten_leaves(&exam.questions).len(),
            exam.total_marks
        );

        for w in &outcome.warnings {
            println!("  [{}] WARNING: {}", w.path, w.message);
        }

        let warnings = validate_exam(exam);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += outcome.warnings.len() + warnings.len();
    }

    if total_warnings == 0 {
        println!("All exams valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        anyhow::bail!("no .json files found in {}", dir.display());
    }
    Ok(files)
}
