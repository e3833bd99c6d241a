//! Field extraction rules for historical export documents.
//!
//! Older exports stored the same logical field under different keys
//! (`maxMarks`, `max_marks`, `marks`), with singular or plural names, and as
//! bare values or arrays. Each [`FieldRule`] lists the keys to try in
//! priority order; the first key whose value converts to the wanted shape
//! wins.

use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Ordered fallback keys for one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Canonical field name, used in warnings.
    pub field: &'static str,
    /// Keys to try, highest priority first.
    pub keys: &'static [&'static str],
}

impl FieldRule {
    pub const fn new(field: &'static str, keys: &'static [&'static str]) -> Self {
        Self { field, keys }
    }

    /// Values present under any of the keys, in priority order. Nulls are
    /// treated as absent.
    fn candidates<'a>(&self, obj: &'a Object) -> impl Iterator<Item = &'a Value> + 'a {
        let keys: &'static [&'static str] = self.keys;
        keys.iter()
            .filter_map(move |k| obj.get(*k))
            .filter(|v| !v.is_null())
    }

    /// Whether any key carries a non-null value.
    pub fn is_present(&self, obj: &Object) -> bool {
        self.candidates(obj).next().is_some()
    }

    /// Non-empty trimmed text. Numbers are rendered as text.
    pub fn text(&self, obj: &Object) -> Option<String> {
        self.candidates(obj).find_map(as_text)
    }

    /// Like [`FieldRule::text`], but a present blank string yields
    /// `Some("")` instead of `None`.
    pub fn text_or_blank(&self, obj: &Object) -> Option<String> {
        self.text(obj).or_else(|| {
            self.candidates(obj)
                .find_map(|v| v.as_str().map(|s| s.trim().to_string()))
        })
    }

    /// A finite number, from a JSON number or a numeric string.
    pub fn number(&self, obj: &Object) -> Option<f64> {
        self.candidates(obj).find_map(as_number)
    }

    pub fn array<'a>(&self, obj: &'a Object) -> Option<&'a Vec<Value>> {
        self.candidates(obj).find_map(Value::as_array)
    }

    pub fn object<'a>(&self, obj: &'a Object) -> Option<&'a Object> {
        self.candidates(obj).find_map(Value::as_object)
    }

    /// A tag list: a bare string becomes one tag, an array passes through,
    /// anything else is empty.
    pub fn tags(&self, obj: &Object) -> Vec<String> {
        for value in self.candidates(obj) {
            match value {
                Value::String(_) | Value::Number(_) => {
                    return as_text(value).into_iter().collect();
                }
                Value::Array(items) => return items.iter().filter_map(as_text).collect(),
                _ => continue,
            }
        }
        Vec::new()
    }
}

/// Text form of a scalar; `None` for blanks and non-scalars.
pub fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64()?.to_string(),
        },
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Finite number from a JSON number or numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// Document level.
pub const MODE: FieldRule = FieldRule::new("mode", &["mode"]);
pub const DATA_TYPE: FieldRule = FieldRule::new("dataType", &["dataType", "data_type"]);
pub const VERSION: FieldRule = FieldRule::new("version", &["version", "schemaVersion"]);
pub const EXAM: FieldRule = FieldRule::new("exam", &["exam", "examData", "template"]);
pub const QUESTIONS: FieldRule = FieldRule::new("questions", &["questions", "questionList", "items"]);
pub const STUDENTS: FieldRule = FieldRule::new("students", &["students", "studentList"]);
pub const RESULTS: FieldRule = FieldRule::new("results", &["results", "examResults"]);

// Exam.
pub const EXAM_ID: FieldRule = FieldRule::new("id", &["id", "examId", "exam_id"]);
pub const EXAM_NAME: FieldRule = FieldRule::new("name", &["name", "title", "examName", "exam_name"]);
pub const EXAM_DATE: FieldRule = FieldRule::new("date", &["date", "examDate", "exam_date"]);
pub const COHORT: FieldRule =
    FieldRule::new("cohort", &["cohort", "yearGroup", "year_group", "year", "grade"]);
pub const SYLLABUS: FieldRule =
    FieldRule::new("syllabusId", &["syllabusId", "syllabus_id", "syllabus", "course"]);
pub const TOTAL_MARKS: FieldRule =
    FieldRule::new("totalMarks", &["totalMarks", "total_marks", "total", "outOf"]);

// Question.
pub const QUESTION_ID: FieldRule =
    FieldRule::new("id", &["id", "questionId", "question_id", "qid"]);
pub const NUMBER: FieldRule = FieldRule::new(
    "number",
    &["number", "label", "num", "questionNumber", "question_number"],
);
pub const MAX_MARKS: FieldRule = FieldRule::new(
    "maxMarks",
    &["maxMarks", "max_marks", "marks", "max", "outOf", "out_of", "points"],
);
pub const QUESTION_TYPE: FieldRule =
    FieldRule::new("type", &["type", "questionType", "question_type", "kind", "format"]);
pub const CORRECT_ANSWER: FieldRule = FieldRule::new(
    "correctAnswer",
    &["correctAnswer", "correct_answer", "answer", "correct", "key"],
);
pub const NOTES: FieldRule = FieldRule::new("notes", &["notes", "note", "comments", "markingNotes"]);
pub const SUB_QUESTIONS: FieldRule = FieldRule::new(
    "subQuestions",
    &["subQuestions", "sub_questions", "subquestions", "parts", "children"],
);
pub const MODULES: FieldRule = FieldRule::new("modules", &["modules", "module"]);
pub const CONTENT_AREAS: FieldRule = FieldRule::new(
    "contentAreas",
    &["contentAreas", "content_areas", "contentArea", "content_area", "topics", "topic"],
);
pub const OUTCOMES: FieldRule =
    FieldRule::new("outcomes", &["outcomes", "outcome", "syllabusOutcomes"]);
pub const COGNITIVE_VERBS: FieldRule = FieldRule::new(
    "cognitiveVerbs",
    &["cognitiveVerbs", "cognitive_verbs", "cognitiveVerb", "verbs", "verb"],
);

// Student.
pub const STUDENT_ID: FieldRule = FieldRule::new("id", &["id", "studentId", "student_id"]);
pub const STUDENT_NAME: FieldRule =
    FieldRule::new("name", &["name", "fullName", "full_name", "displayName"]);
pub const FIRST_NAME: FieldRule = FieldRule::new("firstName", &["firstName", "first_name"]);
pub const LAST_NAME: FieldRule =
    FieldRule::new("lastName", &["lastName", "last_name", "surname"]);
pub const CLASS_NAME: FieldRule =
    FieldRule::new("className", &["className", "class_name", "class", "classId", "group"]);
pub const EMBEDDED_RESPONSES: FieldRule = FieldRule::new(
    "responses",
    &["responses", "answers", "marks", "scores", "questionScores"],
);

// Result.
pub const RESULT_ID: FieldRule = FieldRule::new("id", &["id", "resultId", "result_id"]);
pub const RESULT_EXAM: FieldRule = FieldRule::new("examId", &["examId", "exam_id"]);
pub const RESULT_STUDENT: FieldRule =
    FieldRule::new("studentId", &["studentId", "student_id", "student"]);
pub const QUESTION_SCORES: FieldRule = FieldRule::new(
    "questionScores",
    &["questionScores", "question_scores", "scores", "marks"],
);
pub const QUESTION_RESPONSES: FieldRule = FieldRule::new(
    "questionResponses",
    &["questionResponses", "question_responses", "responses", "answers"],
);

// A single embedded response cell.
pub const CELL_SCORE: FieldRule = FieldRule::new("score", &["score", "mark", "marks", "points"]);
pub const CELL_RESPONSE: FieldRule =
    FieldRule::new("response", &["response", "value", "answer", "choice"]);
