//! Per-student score entry.
//!
//! A [`ResultStore`] holds at most one [`ExamResult`] per (student, exam).
//! Every edit arrives as a [`ScoreDelta`] of leaf id to raw cell input and is
//! merged into the existing record, so two entry surfaces editing different
//! questions of the same result never overwrite each other. A delta is
//! validated in full before anything is written.

use std::collections::{HashMap, HashSet};

use crate::error::ScoreError;
use crate::model::{Exam, ExamResult, Question};
use crate::tree;

/// Options accepted for a multiple-choice leaf.
pub const MCQ_CHOICES: [&str; 4] = ["A", "B", "C", "D"];

/// A validated change to one leaf's entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CellWrite {
    /// Record a score, and for MCQ leaves the chosen letter.
    Set { score: f64, response: Option<String> },
    /// Mark the leaf unanswered: both score and response are removed.
    Clear,
}

/// Interpret raw cell input for `leaf`.
///
/// MCQ leaves take a letter from [`MCQ_CHOICES`] (case-insensitive) and
/// score full marks when it matches the correct answer. Other leaves take a
/// number in `[0, max_marks]`. Blank input clears the leaf.
pub fn evaluate_cell(leaf: &Question, raw: &str) -> Result<CellWrite, ScoreError> {
    let input = raw.trim();
    if input.is_empty() {
        return Ok(CellWrite::Clear);
    }

    if leaf.is_mcq() {
        let choice = input.to_ascii_uppercase();
        if !MCQ_CHOICES.contains(&choice.as_str()) {
            return Err(ScoreError::InvalidChoice {
                question_id: leaf.id.clone(),
                response: input.to_string(),
            });
        }
        let correct = leaf
            .correct_answer
            .as_deref()
            .is_some_and(|answer| answer.trim().eq_ignore_ascii_case(&choice));
        let score = if correct { leaf.max_marks } else { 0.0 };
        return Ok(CellWrite::Set {
            score,
            response: Some(choice),
        });
    }

    let value: f64 = input
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| ScoreError::NotANumber {
            question_id: leaf.id.clone(),
            input: input.to_string(),
        })?;
    if value < 0.0 || value > leaf.max_marks {
        return Err(ScoreError::OutOfRange {
            question_id: leaf.id.clone(),
            value,
            max: leaf.max_marks,
        });
    }
    Ok(CellWrite::Set {
        score: value,
        response: None,
    })
}

/// A partial edit: leaf id to raw input. Later cells for the same leaf win.
#[derive(Debug, Clone, Default)]
pub struct ScoreDelta {
    cells: Vec<(String, String)>,
}

impl ScoreDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// A delta touching a single leaf.
    pub fn cell(question_id: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::new().set(question_id, raw)
    }

    pub fn set(mut self, question_id: impl Into<String>, raw: impl Into<String>) -> Self {
        self.cells.push((question_id.into(), raw.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

type ResultKey = (String, String);

/// All results, keyed by (student id, exam id), in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Vec<ExamResult>,
    index: HashMap<ResultKey, usize>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load existing results. A later record for the same (student, exam)
    /// replaces an earlier one; every total is re-derived.
    pub fn from_results(results: impl IntoIterator<Item = ExamResult>) -> Self {
        let mut store = Self::new();
        for mut result in results {
            result.recompute_total();
            let key = (result.student_id.clone(), result.exam_id.clone());
            match store.index.get(&key) {
                Some(&i) => {
                    tracing::debug!(
                        "duplicate result for student {} on exam {}, keeping the later one",
                        key.0,
                        key.1
                    );
                    store.results[i] = result;
                }
                None => {
                    store.index.insert(key, store.results.len());
                    store.results.push(result);
                }
            }
        }
        store
    }

    /// Merge `delta` into the result for (`student_id`, `exam`).
    ///
    /// The result is created on the first write that records a score.
    /// Returns `Ok(None)` when no result exists and the delta only clears
    /// cells. Any rejected cell rejects the whole delta.
    pub fn apply(
        &mut self,
        exam: &Exam,
        student_id: &str,
        delta: &ScoreDelta,
    ) -> Result<Option<&ExamResult>, ScoreError> {
        let writes = delta
            .cells
            .iter()
            .map(|(id, raw)| {
                let leaf = exam
                    .leaf(id)
                    .ok_or_else(|| ScoreError::UnknownQuestion(id.clone()))?;
                Ok((id.as_str(), evaluate_cell(leaf, raw)?))
            })
            .collect::<Result<Vec<_>, ScoreError>>()
            .inspect_err(|e| {
                tracing::warn!("rejected score entry for student {student_id}: {e}");
            })?;

        let key = (student_id.to_string(), exam.id.clone());
        let idx = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                if writes.iter().all(|(_, w)| *w == CellWrite::Clear) {
                    return Ok(None);
                }
                self.results.push(ExamResult::new(&exam.id, student_id));
                self.index.insert(key, self.results.len() - 1);
                self.results.len() - 1
            }
        };

        let result = &mut self.results[idx];
        for (id, write) in writes {
            match write {
                CellWrite::Set { score, response } => {
                    result.question_scores.insert(id.to_string(), score);
                    match response {
                        Some(r) => {
                            result.question_responses.insert(id.to_string(), r);
                        }
                        None => {
                            result.question_responses.remove(id);
                        }
                    }
                }
                CellWrite::Clear => {
                    result.question_scores.remove(id);
                    result.question_responses.remove(id);
                }
            }
        }
        result.recompute_total();
        Ok(Some(&self.results[idx]))
    }

    /// Single-cell shorthand for [`ResultStore::apply`].
    pub fn set_cell(
        &mut self,
        exam: &Exam,
        student_id: &str,
        question_id: &str,
        raw: &str,
    ) -> Result<Option<&ExamResult>, ScoreError> {
        self.apply(exam, student_id, &ScoreDelta::cell(question_id, raw))
    }

    pub fn get(&self, student_id: &str, exam_id: &str) -> Option<&ExamResult> {
        self.index
            .get(&(student_id.to_string(), exam_id.to_string()))
            .map(|&i| &self.results[i])
    }

    /// Every result recorded for `exam_id`, in insertion order.
    pub fn results_for_exam(&self, exam_id: &str) -> Vec<&ExamResult> {
        self.results.iter().filter(|r| r.exam_id == exam_id).collect()
    }

    /// Drop every result for `exam_id`. Returns how many were removed.
    pub fn remove_exam(&mut self, exam_id: &str) -> usize {
        let before = self.results.len();
        self.results.retain(|r| r.exam_id != exam_id);
        self.reindex();
        before - self.results.len()
    }

    /// Remove entries for leaves that no longer exist in `exam`.
    /// Returns the number of score entries dropped.
    pub fn prune_orphans(&mut self, exam: &Exam) -> usize {
        let leaves: HashSet<&str> = tree::flatten_leaves(&exam.questions)
            .into_iter()
            .map(|q| q.id.as_str())
            .collect();
        let mut dropped = 0;
        for result in self.results.iter_mut().filter(|r| r.exam_id == exam.id) {
            let before = result.question_scores.len();
            result
                .question_scores
                .retain(|id, _| leaves.contains(id.as_str()));
            result
                .question_responses
                .retain(|id, _| leaves.contains(id.as_str()));
            dropped += before - result.question_scores.len();
            result.recompute_total();
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExamResult> {
        self.results.iter()
    }

    pub fn into_results(self) -> Vec<ExamResult> {
        self.results
    }

    fn reindex(&mut self) {
        self.index = self
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| ((r.student_id.clone(), r.exam_id.clone()), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionType;

    fn leaf(id: &str, number: &str, marks: f64) -> Question {
        let mut q = tree::create_leaf(number);
        q.id = id.into();
        q.max_marks = marks;
        q
    }

    fn mcq(id: &str, number: &str, correct: &str) -> Question {
        let mut q = leaf(id, number, 1.0);
        q.question_type = QuestionType::Mcq;
        q.correct_answer = Some(correct.into());
        q
    }

    fn exam() -> Exam {
        let mut parent = tree::create_leaf("1");
        parent.sub_questions = vec![leaf("1a", "a", 2.0), leaf("1b", "b", 3.0)];
        let mut exam = Exam::new("Unit test", vec![parent, mcq("2", "2", "B")]);
        exam.id = "exam-1".into();
        exam
    }

    #[test]
    fn mcq_correct_wrong_and_cleared() {
        let exam = exam();
        let mut store = ResultStore::new();

        let r = store.set_cell(&exam, "s1", "2", "b").unwrap().unwrap();
        assert_eq!(r.score("2"), Some(1.0));
        assert_eq!(r.response("2"), Some("B"));

        let r = store.set_cell(&exam, "s1", "2", "C").unwrap().unwrap();
        assert_eq!(r.score("2"), Some(0.0));
        assert_eq!(r.response("2"), Some("C"));

        let r = store.set_cell(&exam, "s1", "2", "").unwrap().unwrap();
        assert!(!r.question_scores.contains_key("2"));
        assert!(!r.question_responses.contains_key("2"));
        assert_eq!(r.score_total, 0.0);
    }

    #[test]
    fn invalid_choice_is_rejected() {
        let exam = exam();
        let mut store = ResultStore::new();
        let err = store.set_cell(&exam, "s1", "2", "E").unwrap_err();
        assert!(matches!(err, ScoreError::InvalidChoice { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn numeric_range_is_enforced() {
        let exam = exam();
        let mut store = ResultStore::new();
        store.set_cell(&exam, "s1", "1a", "2").unwrap();

        for bad in ["2.5", "-1", "abc", "NaN"] {
            let err = store.set_cell(&exam, "s1", "1a", bad).unwrap_err();
            assert_eq!(err.question_id(), "1a");
        }
        let err = store.set_cell(&exam, "s1", "1b", "3.5").unwrap_err();
        assert!(matches!(err, ScoreError::OutOfRange { max, .. } if max == 3.0));

        let r = store.get("s1", "exam-1").unwrap();
        assert_eq!(r.score("1a"), Some(2.0));
        assert_eq!(r.score("1b"), None);
    }

    #[test]
    fn rejected_delta_writes_nothing() {
        let exam = exam();
        let mut store = ResultStore::new();
        store.set_cell(&exam, "s1", "1a", "1").unwrap();

        let delta = ScoreDelta::new().set("1a", "2").set("1b", "9");
        assert!(store.apply(&exam, "s1", &delta).is_err());
        assert_eq!(store.get("s1", "exam-1").unwrap().score("1a"), Some(1.0));
    }

    #[test]
    fn branch_ids_are_not_scorable() {
        let exam = exam();
        let branch_id = exam.questions[0].id.clone();
        let mut store = ResultStore::new();
        let err = store.set_cell(&exam, "s1", &branch_id, "1").unwrap_err();
        assert_eq!(err, ScoreError::UnknownQuestion(branch_id));
    }

    #[test]
    fn deltas_from_two_surfaces_merge() {
        let exam = exam();
        let mut store = ResultStore::new();
        // Grid writes 1a while the single-student view writes 1b.
        store.apply(&exam, "s1", &ScoreDelta::cell("1a", "2")).unwrap();
        store.apply(&exam, "s1", &ScoreDelta::cell("1b", "1")).unwrap();

        assert_eq!(store.len(), 1);
        let r = store.get("s1", "exam-1").unwrap();
        assert_eq!(r.score("1a"), Some(2.0));
        assert_eq!(r.score("1b"), Some(1.0));
        assert_eq!(r.score_total, 3.0);
    }

    #[test]
    fn total_tracks_every_edit() {
        let exam = exam();
        let mut store = ResultStore::new();
        let edits = [("1a", "2"), ("1b", "3"), ("2", "B"), ("1a", ""), ("1b", "0.5"), ("2", "A")];
        for (id, raw) in edits {
            store.set_cell(&exam, "s1", id, raw).unwrap();
            let r = store.get("s1", "exam-1").unwrap();
            assert_eq!(r.score_total, r.question_scores.values().sum::<f64>());
        }
        assert_eq!(store.get("s1", "exam-1").unwrap().score_total, 0.5);
    }

    #[test]
    fn clearing_without_a_record_creates_nothing() {
        let exam = exam();
        let mut store = ResultStore::new();
        assert!(store.set_cell(&exam, "s1", "1a", " ").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn from_results_dedupes_and_rederives() {
        let mut first = ExamResult::new("exam-1", "s1");
        first.question_scores.insert("1a".into(), 1.0);
        let mut second = ExamResult::new("exam-1", "s1");
        second.question_scores.insert("1a".into(), 2.0);
        second.score_total = 50.0;

        let store = ResultStore::from_results(vec![first, second]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1", "exam-1").unwrap().score_total, 2.0);
    }

    #[test]
    fn prune_after_structural_edit() {
        let mut exam = exam();
        let mut store = ResultStore::new();
        store
            .apply(&exam, "s1", &ScoreDelta::new().set("1a", "2").set("1b", "3"))
            .unwrap();

        let questions = tree::delete_by_id(&exam.questions, "1b");
        exam.set_questions(questions);
        assert_eq!(store.prune_orphans(&exam), 1);
        assert_eq!(store.get("s1", "exam-1").unwrap().score_total, 2.0);
    }

    #[test]
    fn bulk_removal_by_exam() {
        let exam = exam();
        let mut store = ResultStore::new();
        store.set_cell(&exam, "s1", "1a", "1").unwrap();
        store.set_cell(&exam, "s2", "1a", "2").unwrap();
        assert_eq!(store.results_for_exam("exam-1").len(), 2);
        assert_eq!(store.remove_exam("exam-1"), 2);
        assert!(store.get("s2", "exam-1").is_none());
    }
}
