//! Import of previously exported exam documents.
//!
//! Exports from every historical version are normalized into one [`Exam`],
//! its [`Student`]s and their [`ExamResult`]s. Unusable JSON fails hard;
//! anything that parses as an object degrades field by field, recording an
//! [`ImportWarning`] for each substituted default. Ids are preserved as
//! found: resolving a clash with existing data is the caller's job (see
//! [`ImportOutcome::resolve_collision`]).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ImportError;
use crate::model::{Exam, ExamResult, Question, QuestionType, Student};
use crate::rules::{self, Object};
use crate::scoring::{self, CellWrite, ResultStore};
use crate::tree;

/// Schema version written by [`ExportDocument`].
pub const EXPORT_VERSION: u64 = 2;

/// `dataType` written by [`ExportDocument`].
pub const EXPORT_DATA_TYPE: &str = "exam";

/// What the document was exported for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// An exam structure without results.
    #[default]
    Template,
    /// An exam with student results.
    Analysis,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Template => write!(f, "template"),
            ImportMode::Analysis => write!(f, "analysis"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "template" => Ok(ImportMode::Template),
            "analysis" => Ok(ImportMode::Analysis),
            other => Err(format!("unknown import mode: {other}")),
        }
    }
}

/// A field that was missing or unusable and replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// Location in the source document, e.g. `questions[0].subQuestions[1]`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The canonical entities recovered from one document.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub mode: ImportMode,
    pub exam: Exam,
    pub students: Vec<Student>,
    pub results: Vec<ExamResult>,
    pub warnings: Vec<ImportWarning>,
}

impl ImportOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Give the exam a fresh id and an " (imported)" name suffix when its id
    /// is already taken, re-pointing the imported results at the new id.
    /// Returns whether anything was renamed.
    pub fn resolve_collision(&mut self, existing_exam_ids: &HashSet<String>) -> bool {
        if !existing_exam_ids.contains(&self.exam.id) {
            return false;
        }
        let old_id = std::mem::replace(&mut self.exam.id, Uuid::new_v4().to_string());
        self.exam.name = format!("{} (imported)", self.exam.name);
        for result in self.results.iter_mut().filter(|r| r.exam_id == old_id) {
            result.exam_id = self.exam.id.clone();
        }
        tracing::info!("exam id {old_id} already exists, imported as {}", self.exam.id);
        true
    }

    /// The canonical export of this outcome.
    pub fn export(&self) -> ExportDocument<'_> {
        ExportDocument::new(&self.exam, &self.students, &self.results, self.mode)
    }
}

/// Read and import a document from disk.
pub fn import_file(path: &Path) -> anyhow::Result<ImportOutcome> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read import document: {}", path.display()))?;
    import_str(&content).with_context(|| format!("failed to import {}", path.display()))
}

/// Import a document from JSON text.
pub fn import_str(input: &str) -> Result<ImportOutcome, ImportError> {
    let doc: Value = serde_json::from_str(input)?;
    import_value(&doc)
}

/// Import an already parsed document.
pub fn import_value(doc: &Value) -> Result<ImportOutcome, ImportError> {
    let root = match doc {
        Value::Object(o) => o,
        other => return Err(ImportError::NotADocument(json_kind(other))),
    };

    if let Some(data_type) = rules::DATA_TYPE.text(root) {
        if !is_exam_data_type(&data_type) {
            return Err(ImportError::UnsupportedDataType(data_type));
        }
    }
    let recognized = [rules::EXAM, rules::QUESTIONS, rules::STUDENTS, rules::RESULTS]
        .iter()
        .any(|rule| rule.is_present(root));
    if !recognized {
        return Err(ImportError::Unrecognized);
    }

    let mut importer = Importer::default();
    if let Some(version) = rules::VERSION.number(root) {
        if version > EXPORT_VERSION as f64 {
            importer.warn(
                "version",
                format!("document version {version} is newer than {EXPORT_VERSION}, importing best-effort"),
            );
        }
    }

    let mode = importer.detect_mode(root);
    let exam = importer.migrate_exam(root);
    let roster = importer.migrate_students(root);

    let (results, students) = match rules::RESULTS.array(root).filter(|r| !r.is_empty()) {
        Some(entries) => {
            let mut students: Vec<Student> = roster.into_iter().map(|(s, _)| s).collect();
            let results = importer.migrate_results(entries, &exam, &mut students);
            (results, students)
        }
        None => {
            let results = importer.migrate_embedded(&roster, &exam);
            (results, roster.into_iter().map(|(s, _)| s).collect())
        }
    };
    let results = ResultStore::from_results(results).into_results();

    tracing::debug!(
        "imported exam {} as {mode}: {} questions, {} students, {} results, {} warnings",
        exam.id,
        tree::flatten_leaves(&exam.questions).len(),
        students.len(),
        results.len(),
        importer.warnings.len()
    );

    Ok(ImportOutcome {
        mode,
        exam,
        students,
        results,
        warnings: importer.warnings,
    })
}

/// Map a free-text legacy question type onto [`QuestionType`].
pub fn infer_question_type(raw: &str) -> QuestionType {
    let raw = raw.to_lowercase();
    if raw.contains("mcq") || raw.contains("multiple") {
        QuestionType::Mcq
    } else if raw.contains("extended") || raw.contains("long") {
        QuestionType::Extended
    } else {
        QuestionType::Short
    }
}

fn is_exam_data_type(data_type: &str) -> bool {
    let data_type = data_type.to_lowercase();
    ["exam", "result", "analysis", "template", "markbook"]
        .iter()
        .any(|t| data_type.contains(t))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Strip punctuation and case so `1(a)`, `1a` and `1.A` compare equal.
fn compact_label(label: &str) -> String {
    label
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Resolves a legacy response key to a leaf: by id, then composite label,
/// then compact composite label, then the leaf's own number when unique.
struct LeafMatcher<'a> {
    by_id: HashMap<&'a str, &'a Question>,
    by_label: HashMap<String, &'a Question>,
    by_compact: HashMap<String, &'a Question>,
    by_number: HashMap<String, Option<&'a Question>>,
}

impl<'a> LeafMatcher<'a> {
    fn new(questions: &'a [Question]) -> Self {
        let mut matcher = Self {
            by_id: HashMap::new(),
            by_label: HashMap::new(),
            by_compact: HashMap::new(),
            by_number: HashMap::new(),
        };
        for leaf in tree::flatten_with_labels(questions) {
            let q = leaf.question;
            matcher.by_id.entry(q.id.as_str()).or_insert(q);
            let compact = compact_label(&leaf.label);
            if !compact.is_empty() {
                matcher.by_compact.entry(compact).or_insert(q);
            }
            let number = q.number.trim();
            if !number.is_empty() {
                matcher
                    .by_number
                    .entry(number.to_string())
                    .and_modify(|slot| *slot = None)
                    .or_insert(Some(q));
            }
            matcher.by_label.entry(leaf.label).or_insert(q);
        }
        matcher
    }

    fn find(&self, key: &str) -> Option<&'a Question> {
        let key = key.trim();
        self.by_id
            .get(key)
            .or_else(|| self.by_label.get(key))
            .or_else(|| self.by_compact.get(&compact_label(key)))
            .copied()
            .or_else(|| self.by_number.get(key).copied().flatten())
    }
}

#[derive(Default)]
struct Importer {
    warnings: Vec<ImportWarning>,
}

impl Importer {
    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let warning = ImportWarning {
            path: path.into(),
            message: message.into(),
        };
        tracing::warn!("import: {warning}");
        self.warnings.push(warning);
    }

    fn detect_mode(&mut self, root: &Object) -> ImportMode {
        if let Some(raw) = rules::MODE.text(root) {
            match raw.parse::<ImportMode>() {
                Ok(mode) => return mode,
                Err(e) => self.warn("mode", format!("{e}, detecting from content")),
            }
        }
        if rules::RESULTS.array(root).is_some_and(|r| !r.is_empty()) {
            return ImportMode::Analysis;
        }
        let embedded = rules::STUDENTS
            .array(root)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .any(|s| rules::EMBEDDED_RESPONSES.is_present(s));
        if embedded {
            ImportMode::Analysis
        } else {
            ImportMode::Template
        }
    }

    fn migrate_exam(&mut self, root: &Object) -> Exam {
        let source = match rules::EXAM.object(root) {
            Some(exam) => exam,
            None => {
                if rules::EXAM.is_present(root) {
                    self.warn("exam", "not an object, reading exam fields from the top level");
                }
                root
            }
        };

        let mut seen = HashSet::new();
        let questions = match rules::QUESTIONS
            .array(source)
            .or_else(|| rules::QUESTIONS.array(root))
        {
            Some(values) => self.migrate_questions(values, "questions", &mut seen),
            None => {
                self.warn("questions", "no question list, importing an empty exam");
                Vec::new()
            }
        };
        let questions = tree::normalize(questions);
        let rollup = tree::total_marks(&questions);

        // An explicit historical total is kept even when it disagrees.
        let total_marks = match rules::TOTAL_MARKS.number(source) {
            Some(total) if total >= 0.0 => {
                if (total - rollup).abs() > f64::EPSILON {
                    tracing::debug!("keeping recorded total {total} over rollup {rollup}");
                }
                total
            }
            Some(total) => {
                self.warn("totalMarks", format!("negative total {total}, using {rollup}"));
                rollup
            }
            None => rollup,
        };

        Exam {
            id: rules::EXAM_ID.text(source).unwrap_or_else(new_id),
            name: rules::EXAM_NAME
                .text_or_blank(source)
                .unwrap_or_else(|| "Imported exam".to_string()),
            date: rules::EXAM_DATE.text(source).unwrap_or_default(),
            cohort: rules::COHORT.text(source).unwrap_or_default(),
            syllabus_id: rules::SYLLABUS.text(source).unwrap_or_default(),
            total_marks,
            questions,
        }
    }

    fn migrate_questions(
        &mut self,
        values: &[Value],
        path: &str,
        seen: &mut HashSet<String>,
    ) -> Vec<Question> {
        let mut out = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let path = format!("{path}[{i}]");
            match value.as_object() {
                Some(obj) => out.push(self.migrate_question(obj, &path, seen)),
                None => self.warn(path, "question is not an object, skipped"),
            }
        }
        out
    }

    fn migrate_question(&mut self, obj: &Object, path: &str, seen: &mut HashSet<String>) -> Question {
        let mut q = tree::create_leaf(rules::NUMBER.text(obj).unwrap_or_default());

        match rules::QUESTION_ID.text(obj) {
            Some(id) if seen.insert(id.clone()) => q.id = id,
            Some(id) => {
                self.warn(path, format!("duplicate question id {id}, assigned {}", q.id));
                seen.insert(q.id.clone());
            }
            None => {
                seen.insert(q.id.clone());
            }
        }

        q.question_type = rules::QUESTION_TYPE
            .text(obj)
            .map(|t| infer_question_type(&t))
            .unwrap_or_default();
        q.notes = rules::NOTES.text_or_blank(obj);
        q.modules = rules::MODULES.tags(obj);
        q.content_areas = rules::CONTENT_AREAS.tags(obj);
        q.outcomes = rules::OUTCOMES.tags(obj);
        q.cognitive_verbs = rules::COGNITIVE_VERBS.tags(obj);

        if let Some(children) = rules::SUB_QUESTIONS.array(obj) {
            q.sub_questions = self.migrate_questions(children, &format!("{path}.subQuestions"), seen);
        }

        if q.is_leaf() {
            let default_marks = q.max_marks;
            match rules::MAX_MARKS.number(obj) {
                Some(marks) if marks >= 0.0 => q.max_marks = marks,
                Some(marks) => {
                    self.warn(path, format!("negative maxMarks {marks}, using {default_marks}"));
                }
                None => self.warn(path, format!("no maxMarks, using {default_marks}")),
            }
        }

        if q.is_mcq() {
            q.correct_answer = rules::CORRECT_ANSWER
                .text(obj)
                .map(|a| a.to_ascii_uppercase());
            match q.correct_answer.as_deref() {
                Some(answer) if !scoring::MCQ_CHOICES.contains(&answer) => {
                    self.warn(path, format!("correct answer '{answer}' is not one of A-D"));
                }
                None if q.is_leaf() => {
                    self.warn(path, "multiple choice without a correct answer");
                }
                _ => {}
            }
        }
        q
    }

    fn migrate_students<'a>(&mut self, root: &'a Object) -> Vec<(Student, Option<&'a Object>)> {
        let Some(entries) = rules::STUDENTS.array(root) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(entries.len());
        for (i, value) in entries.iter().enumerate() {
            let path = format!("students[{i}]");
            let Some(obj) = value.as_object() else {
                self.warn(path, "student is not an object, skipped");
                continue;
            };
            let id = rules::STUDENT_ID.text(obj).unwrap_or_else(new_id);
            if !seen.insert(id.clone()) {
                self.warn(path, format!("duplicate student id {id}, skipped"));
                continue;
            }
            let name = rules::STUDENT_NAME.text(obj).or_else(|| {
                let parts: Vec<String> = [rules::FIRST_NAME.text(obj), rules::LAST_NAME.text(obj)]
                    .into_iter()
                    .flatten()
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            });
            let student = Student {
                id,
                name: name.unwrap_or_default(),
                class_name: rules::CLASS_NAME.text(obj).unwrap_or_default(),
            };
            out.push((student, rules::EMBEDDED_RESPONSES.object(obj)));
        }
        out
    }

    /// Near-canonical `results` entries, passed through.
    fn migrate_results(
        &mut self,
        entries: &[Value],
        exam: &Exam,
        students: &mut Vec<Student>,
    ) -> Vec<ExamResult> {
        let leaf_ids: HashSet<&str> = tree::flatten_leaves(&exam.questions)
            .into_iter()
            .map(|q| q.id.as_str())
            .collect();
        let mut known: HashSet<String> = students.iter().map(|s| s.id.clone()).collect();
        let mut keys: HashSet<(String, String)> = HashSet::new();
        let mut out = Vec::with_capacity(entries.len());

        for (i, value) in entries.iter().enumerate() {
            let path = format!("results[{i}]");
            let Some(obj) = value.as_object() else {
                self.warn(path, "result is not an object, skipped");
                continue;
            };
            let Some(student_id) = rules::RESULT_STUDENT.text(obj) else {
                self.warn(path, "result has no studentId, skipped");
                continue;
            };

            let exam_id = rules::RESULT_EXAM.text(obj).unwrap_or_else(|| exam.id.clone());
            let mut result = ExamResult::new(exam_id, student_id.clone());
            if let Some(id) = rules::RESULT_ID.text(obj) {
                result.id = id;
            }

            if let Some(scores) = rules::QUESTION_SCORES.object(obj) {
                for (key, value) in scores {
                    match rules::as_number(value) {
                        Some(score) => {
                            result.question_scores.insert(key.clone(), score);
                        }
                        None if value.is_null() => {}
                        None => self.warn(
                            format!("{path}.questionScores.{key}"),
                            "score is not a number, skipped",
                        ),
                    }
                }
            }
            if let Some(responses) = rules::QUESTION_RESPONSES.object(obj) {
                for (key, value) in responses {
                    if let Some(text) = rules::as_text(value) {
                        result.question_responses.insert(key.clone(), text);
                    }
                }
            }

            if result.exam_id == exam.id {
                let unknown = result
                    .question_scores
                    .keys()
                    .filter(|k| !leaf_ids.contains(k.as_str()))
                    .count();
                if unknown > 0 {
                    self.warn(
                        path.as_str(),
                        format!("{unknown} score(s) reference questions not in the exam"),
                    );
                }
            }
            result.recompute_total();

            if !keys.insert((student_id.clone(), result.exam_id.clone())) {
                self.warn(
                    path.as_str(),
                    format!("duplicate result for student {student_id}, kept the later one"),
                );
            }
            if known.insert(student_id.clone()) {
                tracing::debug!("synthesizing placeholder for unknown student {student_id}");
                students.push(Student::placeholder(&student_id));
            }
            out.push(result);
        }
        out
    }

    /// Per-student response maps embedded in the student list.
    fn migrate_embedded(
        &mut self,
        roster: &[(Student, Option<&Object>)],
        exam: &Exam,
    ) -> Vec<ExamResult> {
        let matcher = LeafMatcher::new(&exam.questions);
        let mut out = Vec::new();

        for (student, responses) in roster {
            let Some(responses) = responses else {
                continue;
            };
            let mut result = ExamResult::new(&exam.id, &student.id);
            for (key, value) in *responses {
                let path = format!("students.{}.responses.{key}", student.id);
                let Some(leaf) = matcher.find(key) else {
                    self.warn(path, "no matching question, skipped");
                    continue;
                };
                let Some((score, response)) = self.migrate_cell(leaf, value, &path) else {
                    continue;
                };
                if let Some(score) = score {
                    result.question_scores.insert(leaf.id.clone(), score);
                }
                if let Some(response) = response {
                    result.question_responses.insert(leaf.id.clone(), response);
                }
            }
            if result.question_scores.is_empty() && result.question_responses.is_empty() {
                continue;
            }
            result.recompute_total();
            out.push(result);
        }
        out
    }

    /// Normalize one embedded value to a (score, response) pair.
    ///
    /// Bare numbers and object scores are recorded marks and are kept even
    /// when out of range. Strings are raw cell input and go through the same
    /// validation as a typed cell.
    fn migrate_cell(
        &mut self,
        leaf: &Question,
        value: &Value,
        path: &str,
    ) -> Option<(Option<f64>, Option<String>)> {
        match value {
            Value::Null => None,
            Value::Number(_) => {
                let score = rules::as_number(value)?;
                self.check_range(leaf, score, path);
                Some((Some(score), None))
            }
            Value::String(raw) => match scoring::evaluate_cell(leaf, raw) {
                Ok(CellWrite::Set { score, response }) => Some((Some(score), response)),
                Ok(CellWrite::Clear) => None,
                Err(e) => {
                    self.warn(path, format!("{e}, skipped"));
                    None
                }
            },
            Value::Object(obj) => {
                let response = rules::CELL_RESPONSE.text(obj);
                match rules::CELL_SCORE.number(obj) {
                    Some(score) => {
                        self.check_range(leaf, score, path);
                        let response = response
                            .filter(|_| leaf.is_mcq())
                            .map(|r| r.to_ascii_uppercase());
                        Some((Some(score), response))
                    }
                    None => match response {
                        Some(raw) => self.migrate_cell(leaf, &Value::String(raw), path),
                        None => {
                            self.warn(path, "entry has neither a score nor a response, skipped");
                            None
                        }
                    },
                }
            }
            Value::Bool(_) | Value::Array(_) => {
                self.warn(path, format!("unsupported value {value}, skipped"));
                None
            }
        }
    }

    fn check_range(&mut self, leaf: &Question, score: f64, path: &str) {
        if score < 0.0 || score > leaf.max_marks {
            self.warn(
                path,
                format!("score {score} outside 0..={}, kept as recorded", leaf.max_marks),
            );
        }
    }
}

/// The canonical (version 2) export document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub data_type: &'static str,
    pub version: u64,
    pub mode: ImportMode,
    pub exported_at: DateTime<Utc>,
    pub exam: &'a Exam,
    pub students: &'a [Student],
    pub results: &'a [ExamResult],
}

impl<'a> ExportDocument<'a> {
    pub fn new(
        exam: &'a Exam,
        students: &'a [Student],
        results: &'a [ExamResult],
        mode: ImportMode,
    ) -> Self {
        Self {
            data_type: EXPORT_DATA_TYPE,
            version: EXPORT_VERSION,
            mode,
            exported_at: Utc::now(),
            exam,
            students,
            results,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document as pretty JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json_pretty().context("failed to serialize export")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write export to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn import(doc: Value) -> ImportOutcome {
        import_value(&doc).unwrap()
    }

    #[test]
    fn embedded_response_matched_by_label() {
        let outcome = import(json!({
            "students": [{"id": "s1", "responses": {"1a": {"score": 2}}}],
            "exam": {"questions": [{"number": "1", "subQuestions": [{"number": "a", "maxMarks": 2}]}]}
        }));
        assert_eq!(outcome.mode, ImportMode::Analysis);
        assert_eq!(outcome.results.len(), 1);
        let leaf_id = &outcome.exam.questions[0].sub_questions[0].id;
        let result = &outcome.results[0];
        assert_eq!(result.student_id, "s1");
        assert_eq!(result.score(leaf_id), Some(2.0));
        assert_eq!(result.score_total, 2.0);
        assert_eq!(outcome.exam.total_marks, 2.0);
    }

    #[test]
    fn mode_detection_order() {
        let q = json!([{"number": "1", "maxMarks": 1}]);

        let explicit = import(json!({"mode": "Template", "questions": q,
            "results": [{"studentId": "s1", "questionScores": {}}]}));
        assert_eq!(explicit.mode, ImportMode::Template);

        let by_results = import(json!({"questions": q, "results": [{"studentId": "s1"}]}));
        assert_eq!(by_results.mode, ImportMode::Analysis);

        let by_students = import(json!({"questions": q, "students": [{"id": "s1", "marks": {"1": 1}}]}));
        assert_eq!(by_students.mode, ImportMode::Analysis);

        let plain = import(json!({"questions": q, "students": [{"id": "s1"}], "results": []}));
        assert_eq!(plain.mode, ImportMode::Template);
    }

    #[test]
    fn unknown_mode_falls_through_with_warning() {
        let outcome = import(json!({"mode": "grading", "questions": [],
            "results": [{"studentId": "s1"}]}));
        assert_eq!(outcome.mode, ImportMode::Analysis);
        assert!(outcome.warnings.iter().any(|w| w.path == "mode"));
    }

    #[test]
    fn question_type_inference() {
        assert_eq!(infer_question_type("Multiple Choice"), QuestionType::Mcq);
        assert_eq!(infer_question_type("MCQ"), QuestionType::Mcq);
        assert_eq!(infer_question_type("long response"), QuestionType::Extended);
        assert_eq!(infer_question_type("Extended"), QuestionType::Extended);
        assert_eq!(infer_question_type("written"), QuestionType::Short);
    }

    #[test]
    fn question_fields_and_tags_normalized() {
        let outcome = import(json!({"questions": [{
            "qid": "q7", "label": 7, "marks": "3", "questionType": "multiple-choice",
            "answer": "c", "module": "Forces", "topics": ["Newton", "Friction"],
            "verb": "explain", "note": "calculator allowed"
        }]}));
        let q = &outcome.exam.questions[0];
        assert_eq!(q.id, "q7");
        assert_eq!(q.number, "7");
        assert_eq!(q.max_marks, 3.0);
        assert_eq!(q.question_type, QuestionType::Mcq);
        assert_eq!(q.correct_answer.as_deref(), Some("C"));
        assert_eq!(q.modules, vec!["Forces"]);
        assert_eq!(q.content_areas, vec!["Newton", "Friction"]);
        assert_eq!(q.cognitive_verbs, vec!["explain"]);
        assert!(q.outcomes.is_empty());
        assert_eq!(q.notes.as_deref(), Some("calculator allowed"));
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    }

    #[test]
    fn explicit_total_preferred_over_rollup() {
        let questions = json!([{"number": "1", "maxMarks": 4}, {"number": "2", "maxMarks": 6}]);
        let explicit = import(json!({"exam": {"totalMarks": 12, "questions": questions}}));
        assert_eq!(explicit.exam.total_marks, 12.0);

        let derived = import(json!({"exam": {"questions": questions}}));
        assert_eq!(derived.exam.total_marks, 10.0);
    }

    #[test]
    fn branch_marks_are_rolled_up() {
        let outcome = import(json!({"questions": [{"number": "1", "maxMarks": 99,
            "parts": [{"number": "a", "maxMarks": 2}, {"number": "b", "maxMarks": 3}]}]}));
        assert_eq!(outcome.exam.questions[0].max_marks, 5.0);
        assert_eq!(outcome.exam.total_marks, 5.0);
    }

    #[test]
    fn missing_leaf_marks_degrade_to_default() {
        let outcome = import(json!({"questions": [{"number": "1"}, "garbage"]}));
        assert_eq!(outcome.exam.questions.len(), 1);
        assert_eq!(outcome.exam.questions[0].max_marks, 1.0);
        assert_eq!(outcome.warnings.len(), 2);
        assert!(outcome.is_degraded());
    }

    #[test]
    fn results_passthrough_synthesizes_students() {
        let outcome = import(json!({
            "exam": {"id": "e1", "questions": [{"id": "q1", "number": "1", "maxMarks": 5}]},
            "students": [{"id": "s1", "firstName": "Ada", "lastName": "Lovelace", "class": "10A"}],
            "results": [
                {"id": "r1", "studentId": "s1", "questionScores": {"q1": 4}, "scoreTotal": 99},
                {"id": "r2", "studentId": "ghost", "questionScores": {"q1": "2.5"},
                 "questionResponses": {"q1": "see script"}}
            ]
        }));
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].score_total, 4.0);
        assert_eq!(outcome.results[0].exam_id, "e1");
        assert_eq!(outcome.results[1].score("q1"), Some(2.5));
        assert_eq!(outcome.students.len(), 2);
        assert_eq!(outcome.students[0].name, "Ada Lovelace");
        assert_eq!(outcome.students[0].class_name, "10A");
        assert_eq!(outcome.students[1].id, "ghost");
    }

    #[test]
    fn embedded_values_in_every_shape() {
        let outcome = import(json!({
            "exam": {"questions": [
                {"id": "m1", "number": "1", "type": "MCQ", "correctAnswer": "B", "maxMarks": 1},
                {"id": "s2", "number": "2", "maxMarks": 4},
                {"number": "3", "parts": [{"number": "a", "maxMarks": 2}, {"number": "b", "maxMarks": 2}]}
            ]},
            "students": [{"id": "s1", "answers": {
                "m1": "b",
                "2": {"mark": 3},
                "3(a)": 1.5,
                "b": {"value": "2"},
                "9": 1
            }}]
        }));
        let r = &outcome.results[0];
        assert_eq!(r.score("m1"), Some(1.0));
        assert_eq!(r.response("m1"), Some("B"));
        assert_eq!(r.score("s2"), Some(3.0));
        let q3 = &outcome.exam.questions[2];
        assert_eq!(r.score(&q3.sub_questions[0].id), Some(1.5));
        // "b" is unique among leaf numbers.
        assert_eq!(r.score(&q3.sub_questions[1].id), Some(2.0));
        assert_eq!(r.score_total, 7.5);
        assert!(outcome.warnings.iter().any(|w| w.path.ends_with(".9")));
    }

    #[test]
    fn mcq_response_without_score_is_scored() {
        let outcome = import(json!({
            "questions": [{"id": "m", "number": "1", "type": "multiple", "answer": "A", "maxMarks": 2}],
            "students": [{"id": "s1", "responses": {"m": {"response": "A"}}},
                         {"id": "s2", "responses": {"1": {"response": "D"}}}]
        }));
        assert_eq!(outcome.results[0].score("m"), Some(2.0));
        assert_eq!(outcome.results[1].score("m"), Some(0.0));
        assert_eq!(outcome.results[1].response("m"), Some("D"));
    }

    #[test]
    fn ambiguous_own_number_is_not_matched() {
        let outcome = import(json!({
            "questions": [
                {"number": "1", "parts": [{"number": "a", "maxMarks": 1}]},
                {"number": "2", "parts": [{"number": "a", "maxMarks": 1}]}
            ],
            "students": [{"id": "s1", "responses": {"a": 1, "2a": 1}}]
        }));
        let r = &outcome.results[0];
        assert_eq!(r.question_scores.len(), 1);
        assert_eq!(r.score(&outcome.exam.questions[1].sub_questions[0].id), Some(1.0));
    }

    #[test]
    fn hard_failures() {
        assert!(matches!(import_str("{not json"), Err(ImportError::Parse(_))));
        assert!(matches!(import_str("[1, 2]"), Err(ImportError::NotADocument(_))));
        assert!(matches!(import_str(r#"{"name": "x"}"#), Err(ImportError::Unrecognized)));
        assert!(matches!(
            import_str(r#"{"dataType": "timetable", "questions": []}"#),
            Err(ImportError::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn canonical_export_round_trips() {
        let original = import(json!({
            "exam": {"id": "e1", "name": "Term 1", "date": "2024-03-01", "cohort": "Year 11",
                "syllabusId": "phys", "questions": [
                {"id": "q1", "number": "1", "modules": ["M1"], "subQuestions": [
                    {"id": "q1a", "number": "a", "maxMarks": 2, "cognitiveVerbs": ["explain"]},
                    {"id": "q1b", "number": "b", "maxMarks": 1, "type": "mcq", "correctAnswer": "D"}
                ]}
            ]},
            "students": [{"id": "s1", "name": "Sam", "className": "11B"}],
            "results": [{"id": "r1", "examId": "e1", "studentId": "s1",
                "questionScores": {"q1a": 1, "q1b": 1}, "questionResponses": {"q1b": "D"}}]
        }));

        let json = original.export().to_json_pretty().unwrap();
        let again = import_str(&json).unwrap();

        assert_eq!(again.mode, ImportMode::Analysis);
        assert_eq!(again.exam, original.exam);
        assert_eq!(again.students, original.students);
        assert_eq!(again.results, original.results);
        assert!(again.warnings.is_empty(), "{:?}", again.warnings);
    }

    #[test]
    fn canonical_export_round_trips_blank_name_and_notes() {
        let original = import(json!({
            "exam": {"id": "e2", "name": "", "questions": [
                {"id": "q1", "number": "1", "maxMarks": 2, "notes": ""},
                {"id": "q2", "number": "2", "maxMarks": 1}
            ]},
            "results": [{"studentId": "s1", "examId": "e2", "questionScores": {"q1": 2}}]
        }));
        assert_eq!(original.exam.name, "");
        assert_eq!(original.exam.questions[0].notes.as_deref(), Some(""));
        assert_eq!(original.exam.questions[1].notes, None);

        let json = original.export().to_json_pretty().unwrap();
        let again = import_str(&json).unwrap();
        assert_eq!(again.exam, original.exam);
        assert_eq!(again.results, original.results);
    }

    #[test]
    fn duplicate_results_keep_later_with_warning() {
        let outcome = import(json!({
            "exam": {"id": "e1", "name": "Mock", "questions": [
                {"id": "q1", "number": "1", "maxMarks": 5}
            ]},
            "results": [
                {"studentId": "s1", "examId": "e1", "questionScores": {"q1": 4}},
                {"studentId": "s2", "examId": "e1", "questionScores": {"q1": 3}},
                {"studentId": "s1", "examId": "e1", "questionScores": {"q1": 1}}
            ]
        }));

        assert_eq!(outcome.results.len(), 2);
        let s1 = outcome.results.iter().find(|r| r.student_id == "s1").unwrap();
        assert_eq!(s1.score_total, 1.0);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].path, "results[2]");
        assert!(outcome.warnings[0].message.contains("duplicate result for student s1"));
    }

    #[test]
    fn missing_exam_name_gets_default() {
        let outcome = import(json!({"exam": {"questions": [{"number": "1", "maxMarks": 1}]}}));
        assert_eq!(outcome.exam.name, "Imported exam");
    }

    #[test]
    fn collision_is_resolved_by_caller_helper() {
        let mut outcome = import(json!({
            "exam": {"id": "e1", "name": "Mock", "questions": [{"id": "q", "number": "1", "maxMarks": 1}]},
            "results": [{"studentId": "s1", "examId": "e1", "questionScores": {"q": 1}}]
        }));
        assert!(!outcome.resolve_collision(&HashSet::new()));

        let existing: HashSet<String> = ["e1".to_string()].into();
        assert!(outcome.resolve_collision(&existing));
        assert_ne!(outcome.exam.id, "e1");
        assert_eq!(outcome.exam.name, "Mock (imported)");
        assert_eq!(outcome.results[0].exam_id, outcome.exam.id);
    }

    #[test]
    fn duplicate_question_ids_get_fresh_ids() {
        let outcome = import(json!({"questions": [
            {"id": "dup", "number": "1", "maxMarks": 1},
            {"id": "dup", "number": "2", "maxMarks": 1}
        ]}));
        assert_eq!(outcome.exam.questions[0].id, "dup");
        assert_ne!(outcome.exam.questions[1].id, "dup");
        assert_eq!(outcome.warnings.len(), 1);
    }
}
