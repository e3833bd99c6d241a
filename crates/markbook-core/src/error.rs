//! Error types for score entry and document import.
//!
//! Tree operations on a missing id are not errors (they return the tree
//! unchanged), and the analysis engine never fails. The two enums here are
//! the only failure shapes a caller has to handle; degraded imports are
//! reported as [`crate::legacy::ImportWarning`]s on a successful outcome.

use thiserror::Error;

/// A cell write that was rejected. The store is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// The id does not name a leaf question of the exam.
    #[error("question {0} is not a scorable leaf of this exam")]
    UnknownQuestion(String),

    /// An MCQ response outside the A-D alphabet.
    #[error("invalid choice '{response}' for question {question_id} (expected A-D)")]
    InvalidChoice {
        question_id: String,
        response: String,
    },

    /// A numeric cell that could not be parsed.
    #[error("'{input}' is not a number (question {question_id})")]
    NotANumber { question_id: String, input: String },

    /// A numeric cell outside `[0, maxMarks]`.
    #[error("score {value} out of range 0..={max} for question {question_id}")]
    OutOfRange {
        question_id: String,
        value: f64,
        max: f64,
    },
}

impl ScoreError {
    /// The question the rejected cell belonged to.
    pub fn question_id(&self) -> &str {
        match self {
            ScoreError::UnknownQuestion(id) => id,
            ScoreError::InvalidChoice { question_id, .. }
            | ScoreError::NotANumber { question_id, .. }
            | ScoreError::OutOfRange { question_id, .. } => question_id,
        }
    }
}

/// A document that cannot be imported at all.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The input is not valid JSON.
    #[error("failed to parse import document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The input is JSON but not an object.
    #[error("import document must be a JSON object, found {0}")]
    NotADocument(&'static str),

    /// The object carries none of the fields an exam export has.
    #[error("document has no exam, questions, students or results")]
    Unrecognized,

    /// `dataType` names something other than an exam export.
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),
}
