//! Subcommand implementations.

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;

use markbook_core::legacy::ImportOutcome;
use markbook_core::model::ExamResult;

pub mod analyze;
pub mod compare;
pub mod import;
pub mod init;
pub mod validate;

/// Results for the imported exam, optionally restricted to one class.
pub(crate) fn cohort(outcome: &ImportOutcome, class: Option<&str>) -> Vec<ExamResult> {
    let classes: HashMap<&str, &str> = outcome
        .students
        .iter()
        .map(|s| (s.id.as_str(), s.class_name.as_str()))
        .collect();

    outcome
        .results
        .iter()
        .filter(|r| r.exam_id == outcome.exam.id)
        .filter(|r| match class {
            Some(class) => classes
                .get(r.student_id.as_str())
                .is_some_and(|c| c.eq_ignore_ascii_case(class)),
            None => true,
        })
        .cloned()
        .collect()
}

pub(crate) fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
