//! Structural checks on an exam. Findings are warnings; nothing is rejected.

use std::collections::HashSet;

use crate::model::{Exam, Question};
use crate::scoring::MCQ_CHOICES;
use crate::tree;

/// A validation warning.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The offending question, if the warning is about one.
    pub question_id: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn question(q: &Question, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(q.id.clone()),
            message: message.into(),
        }
    }
}

/// Validate an exam for common authoring mistakes.
pub fn validate_exam(exam: &Exam) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if exam.name.trim().is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "exam has no name".into(),
        });
    }
    if exam.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "exam has no questions".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    visit(&exam.questions, &mut |q| {
        if !seen_ids.insert(q.id.clone()) {
            warnings.push(ValidationWarning::question(q, format!("duplicate question ID: {}", q.id)));
        }
        if q.number.trim().is_empty() {
            warnings.push(ValidationWarning::question(q, "question has no number"));
        }
    });

    for leaf in tree::flatten_with_labels(&exam.questions) {
        let q = leaf.question;
        let label = &leaf.label;
        if q.max_marks <= 0.0 {
            warnings.push(ValidationWarning::question(q, format!("{label} is worth no marks")));
        }
        if q.is_mcq() {
            match q.correct_answer.as_deref().map(str::trim) {
                None | Some("") => warnings.push(ValidationWarning::question(
                    q,
                    format!("{label} is multiple choice but has no correct answer"),
                )),
                Some(answer) if !MCQ_CHOICES.contains(&answer) => {
                    warnings.push(ValidationWarning::question(
                        q,
                        format!("{label} has correct answer '{answer}', expected one of A-D"),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    let rollup = tree::total_marks(&exam.questions);
    if (exam.total_marks - rollup).abs() > f64::EPSILON {
        warnings.push(ValidationWarning {
            question_id: None,
            message: format!(
                "recorded total {} differs from question marks {rollup}",
                exam.total_marks
            ),
        });
    }

    warnings
}

fn visit<'a>(nodes: &'a [Question], f: &mut impl FnMut(&'a Question)) {
    for q in nodes {
        f(q);
        visit(&q.sub_questions, f);
    }
}
