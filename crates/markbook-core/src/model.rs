//! Core data model types for markbook.
//!
//! These are the canonical entities every other module produces or consumes:
//! question trees, exams, students, and per-student results. Field names
//! serialize in camelCase, which is the on-disk export shape.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tree;

/// How a leaf question is answered and scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Multiple choice, scored against `correct_answer`.
    Mcq,
    /// Short answer with a numeric mark.
    #[default]
    Short,
    /// Extended response with a numeric mark.
    Extended,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Mcq => write!(f, "mcq"),
            QuestionType::Short => write!(f, "short"),
            QuestionType::Extended => write!(f, "extended"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mcq" => Ok(QuestionType::Mcq),
            "short" => Ok(QuestionType::Short),
            "extended" => Ok(QuestionType::Extended),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A node in an exam's question tree.
///
/// A node is a leaf iff `sub_questions` is empty. Only leaves carry an
/// authoritative `max_marks`; on a branch the field mirrors the rollup of its
/// leaves and is rewritten whenever the tree is rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier within the exam.
    pub id: String,
    /// Label shown to students ("1", "a", "iii").
    #[serde(default)]
    pub number: String,
    /// Marks available. Authoritative on leaves only.
    #[serde(default)]
    pub max_marks: f64,
    /// How the leaf is answered.
    #[serde(default, rename = "type")]
    pub question_type: QuestionType,
    /// Correct option letter, MCQ only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Free-text marking notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Ordered children.
    #[serde(default)]
    pub sub_questions: Vec<Question>,
    /// Syllabus modules this question assesses.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Content areas this question assesses.
    #[serde(default)]
    pub content_areas: Vec<String>,
    /// Syllabus outcomes this question assesses.
    #[serde(default)]
    pub outcomes: Vec<String>,
    /// Cognitive verbs ("explain", "calculate") used in the question.
    #[serde(default)]
    pub cognitive_verbs: Vec<String>,
}

impl Question {
    pub fn is_leaf(&self) -> bool {
        self.sub_questions.is_empty()
    }

    pub fn is_mcq(&self) -> bool {
        self.question_type == QuestionType::Mcq
    }
}

/// An exam and the question tree it exclusively owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Sitting date as entered (usually ISO `YYYY-MM-DD`).
    #[serde(default)]
    pub date: String,
    /// Year group or cohort label.
    #[serde(default)]
    pub cohort: String,
    #[serde(default)]
    pub syllabus_id: String,
    /// Sum of leaf marks, kept in sync by [`Exam::recompute_total`].
    #[serde(default)]
    pub total_marks: f64,
    /// Ordered root questions.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Exam {
    /// Create an exam with a fresh id and a derived total.
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Self {
        let mut exam = Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            date: String::new(),
            cohort: String::new(),
            syllabus_id: String::new(),
            total_marks: 0.0,
            questions: Vec::new(),
        };
        exam.set_questions(questions);
        exam
    }

    /// Replace the question tree, re-deriving branch marks and the total.
    pub fn set_questions(&mut self, questions: Vec<Question>) {
        self.questions = tree::normalize(questions);
        self.recompute_total();
    }

    /// Overwrite `total_marks` with the rollup of the current tree.
    pub fn recompute_total(&mut self) {
        self.total_marks = tree::total_marks(&self.questions);
    }

    /// Find a leaf by id.
    pub fn leaf(&self, id: &str) -> Option<&Question> {
        tree::find_by_id(&self.questions, id).filter(|q| q.is_leaf())
    }
}

/// A student as known to the import/export layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Class the student belongs to; empty when unknown.
    #[serde(default)]
    pub class_name: String,
}

impl Student {
    /// Stand-in record for a student id referenced by a result but not
    /// present in the imported student list.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Unknown student ({id})"),
            class_name: String::new(),
        }
    }
}

/// One student's scores on one exam.
///
/// Absent keys in `question_scores` mean "not yet answered", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    /// Sum of `question_scores`, re-derived on every mutation.
    #[serde(default)]
    pub score_total: f64,
    /// Leaf id to awarded marks.
    #[serde(default)]
    pub question_scores: BTreeMap<String, f64>,
    /// Leaf id to raw response (MCQ letters).
    #[serde(default)]
    pub question_responses: BTreeMap<String, String>,
}

impl ExamResult {
    /// An empty result with a fresh id.
    pub fn new(exam_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            exam_id: exam_id.into(),
            student_id: student_id.into(),
            score_total: 0.0,
            question_scores: BTreeMap::new(),
            question_responses: BTreeMap::new(),
        }
    }

    pub fn recompute_total(&mut self) {
        self.score_total = self.question_scores.values().sum();
    }

    pub fn score(&self, question_id: &str) -> Option<f64> {
        self.question_scores.get(question_id).copied()
    }

    pub fn response(&self, question_id: &str) -> Option<&str> {
        self.question_responses.get(question_id).map(String::as_str)
    }
}
