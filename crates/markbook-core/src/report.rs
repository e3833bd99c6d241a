//! Analysis reports with JSON persistence and per-student comparison.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{band_label, percent, ExamAnalysis, QuestionStat, TagStat};
use crate::model::{Exam, ExamResult};
use crate::tree;

/// A saved analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub exam: ExamSummary,
    /// Class the results were restricted to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_filter: Option<String>,
    pub analysis: ExamAnalysis,
}

/// Identifying fields of the analysed exam (without its question tree).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

impl AnalysisReport {
    pub fn new(exam: &Exam, class_filter: Option<String>, analysis: ExamAnalysis) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            exam: ExamSummary {
                id: exam.id.clone(),
                name: exam.name.clone(),
                question_count: tree::flatten_leaves(&exam.questions).len(),
            },
            class_filter,
            analysis,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AnalysisReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = format!("# {}\n\n", self.exam.name);
        if let Some(class) = &self.class_filter {
            md.push_str(&format!("Class: {class}\n\n"));
        }
        md.push_str(&self.analysis.to_markdown());
        md
    }
}

impl ExamAnalysis {
    /// Render every view as markdown tables.
    pub fn to_markdown(&self) -> String {
        let s = &self.stats;
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} results, mean {:.1} / {}, median {:.1}, range {:.1}-{:.1}, std dev {:.2}\n\n",
            s.count, s.mean, self.total_marks, s.median, s.min, s.max, s.std_dev
        ));

        if !self.by_question.is_empty() {
            md.push_str("### Questions\n\n");
            md.push_str(&question_table(&self.by_question));
        }

        if !self.problem_questions.is_empty() {
            md.push_str("### Problem questions\n\n");
            for q in &self.problem_questions {
                md.push_str(&format!("- {} ({:.1}%)\n", q.label, q.pct));
            }
            md.push('\n');
        }

        for (title, tags) in [
            ("Cognitive verbs", &self.by_verb),
            ("Modules", &self.by_module),
            ("Content areas", &self.by_content_area),
            ("Outcomes", &self.by_outcome),
        ] {
            if !tags.is_empty() {
                md.push_str(&format!("### {title}\n\n"));
                md.push_str(&tag_table(tags));
            }
        }

        if !self.distractors.is_empty() {
            md.push_str("### Multiple choice responses\n\n");
            md.push_str("| Question | Correct | Responses |\n");
            md.push_str("|----------|---------|-----------|\n");
            for d in &self.distractors {
                let counts: Vec<String> = d.counts.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    d.label,
                    d.correct_answer.as_deref().unwrap_or("-"),
                    counts.join(", ")
                ));
            }
            md.push('\n');
        }

        md.push_str("### Bands\n\n");
        md.push_str("| Band | Students |\n");
        md.push_str("|------|----------|\n");
        for b in &self.bands {
            md.push_str(&format!("| {} | {} |\n", b.label, b.count));
        }

        md
    }
}

fn question_table(questions: &[QuestionStat]) -> String {
    let mut md = String::from("| Question | Type | Max | Average | % | Responses |\n");
    md.push_str("|----------|------|-----|---------|---|-----------|\n");
    for q in questions {
        md.push_str(&format!(
            "| {} | {} | {} | {:.2} | {:.1}% | {} |\n",
            q.label, q.question_type, q.max_marks, q.average, q.pct, q.responses
        ));
    }
    md.push('\n');
    md
}

fn tag_table(tags: &[TagStat]) -> String {
    let mut md = String::from("| Tag | Score | Max | % |\n");
    md.push_str("|-----|-------|-----|---|\n");
    for t in tags {
        md.push_str(&format!("| {} | {} | {} | {:.1}% |\n", t.tag, t.score, t.max, t.pct));
    }
    md.push('\n');
    md
}

/// One student's standing against the cohort an analysis was run on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentComparison {
    pub student_id: String,
    pub score_total: f64,
    pub pct: f64,
    pub cohort_mean: f64,
    pub cohort_mean_pct: f64,
    /// Share of cohort totals below this one, counting ties as half.
    pub percentile_rank: f64,
    pub band: String,
    pub questions: Vec<QuestionComparison>,
    /// Answered questions where the student beat the cohort by more than
    /// the threshold, largest gap first.
    pub strengths: Vec<QuestionComparison>,
    /// Answered questions where the student trailed by more than the
    /// threshold, largest gap first.
    pub weaknesses: Vec<QuestionComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionComparison {
    pub question_id: String,
    pub label: String,
    /// `None` when the student has no score on this question.
    pub student_pct: Option<f64>,
    pub cohort_pct: f64,
    pub delta: Option<f64>,
}

/// Compare `result` with the cohort `analysis` was computed from.
///
/// `threshold` is in percentage points.
pub fn compare_student(
    analysis: &ExamAnalysis,
    cohort: &[ExamResult],
    result: &ExamResult,
    threshold: f64,
) -> StudentComparison {
    let pct = percent(result.score_total, analysis.total_marks);

    let below = cohort.iter().filter(|r| r.score_total < result.score_total).count();
    let ties = cohort.iter().filter(|r| r.score_total == result.score_total).count();
    let percentile_rank = percent(below as f64 + ties as f64 / 2.0, cohort.len() as f64);

    let questions: Vec<QuestionComparison> = analysis
        .by_question
        .iter()
        .map(|q| {
            let student_pct = result.score(&q.question_id).map(|s| percent(s, q.max_marks));
            QuestionComparison {
                question_id: q.question_id.clone(),
                label: q.label.clone(),
                student_pct,
                cohort_pct: q.pct,
                delta: student_pct.map(|p| p - q.pct),
            }
        })
        .collect();

    let mut strengths: Vec<QuestionComparison> = questions
        .iter()
        .filter(|q| q.delta.is_some_and(|d| d > threshold))
        .cloned()
        .collect();
    strengths.sort_by(|a, b| b.delta.unwrap_or(0.0).total_cmp(&a.delta.unwrap_or(0.0)));

    let mut weaknesses: Vec<QuestionComparison> = questions
        .iter()
        .filter(|q| q.delta.is_some_and(|d| d < -threshold))
        .cloned()
        .collect();
    weaknesses.sort_by(|a, b| a.delta.unwrap_or(0.0).total_cmp(&b.delta.unwrap_or(0.0)));

    StudentComparison {
        student_id: result.student_id.clone(),
        score_total: result.score_total,
        pct,
        cohort_mean: analysis.stats.mean,
        cohort_mean_pct: percent(analysis.stats.mean, analysis.total_marks),
        percentile_rank,
        band: band_label(pct).to_string(),
        questions,
        strengths,
        weaknesses,
    }
}

impl StudentComparison {
    pub fn to_markdown(&self) -> String {
        let mut md = format!(
            "**Student {}:** {} marks ({:.1}%, band {}), cohort mean {:.1} ({:.1}%), percentile {:.0}\n\n",
            self.student_id,
            self.score_total,
            self.pct,
            self.band,
            self.cohort_mean,
            self.cohort_mean_pct,
            self.percentile_rank
        );

        for (title, rows) in [("Strengths", &self.strengths), ("Weaknesses", &self.weaknesses)] {
            if rows.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Question | Student | Cohort | Delta |\n");
            md.push_str("|----------|---------|--------|-------|\n");
            for q in rows {
                md.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {:+.1} |\n",
                    q.label,
                    q.student_pct.unwrap_or(0.0),
                    q.cohort_pct,
                    q.delta.unwrap_or(0.0)
                ));
            }
            md.push('\n');
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_performance;
    use crate::model::Question;

    fn leaf(id: &str, number: &str, marks: f64) -> Question {
        let mut q = tree::create_leaf(number);
        q.id = id.into();
        q.max_marks = marks;
        q
    }

    fn result(student: &str, scores: &[(&str, f64)]) -> ExamResult {
        let mut r = ExamResult::new("e1", student);
        for (id, s) in scores {
            r.question_scores.insert(id.to_string(), *s);
        }
        r.recompute_total();
        r
    }

    fn exam() -> Exam {
        let mut exam = Exam::new("Mock", vec![leaf("q1", "1", 10.0), leaf("q2", "2", 10.0)]);
        exam.id = "e1".into();
        exam
    }

    fn cohort() -> Vec<ExamResult> {
        vec![
            result("s1", &[("q1", 10.0), ("q2", 2.0)]),
            result("s2", &[("q1", 4.0), ("q2", 8.0)]),
            result("s3", &[("q1", 4.0), ("q2", 2.0)]),
            result("s4", &[("q1", 2.0)]),
        ]
    }

    #[test]
    fn percentile_counts_ties_as_half() {
        let exam = exam();
        let cohort = cohort();
        let analysis = analyze_performance(&exam, &cohort);

        // s1 and s2 both total 12; s3 (6) and s4 (2) are below.
        let cmp = compare_student(&analysis, &cohort, &cohort[0], 10.0);
        assert_eq!(cmp.score_total, 12.0);
        assert_eq!(cmp.pct, 60.0);
        assert_eq!(cmp.percentile_rank, 75.0);
        assert_eq!(cmp.band, "60-69%");
        assert_eq!(cmp.cohort_mean, 8.0);
        assert_eq!(cmp.cohort_mean_pct, 40.0);

        let lowest = compare_student(&analysis, &cohort, &cohort[3], 10.0);
        assert_eq!(lowest.percentile_rank, 12.5);
    }

    #[test]
    fn strengths_and_weaknesses_beyond_threshold() {
        let exam = exam();
        let cohort = cohort();
        let analysis = analyze_performance(&exam, &cohort);

        // q1 cohort 50%, q2 cohort 40%.
        let cmp = compare_student(&analysis, &cohort, &cohort[0], 10.0);
        assert_eq!(cmp.strengths.len(), 1);
        assert_eq!(cmp.strengths[0].question_id, "q1");
        assert_eq!(cmp.strengths[0].delta, Some(50.0));
        assert_eq!(cmp.weaknesses.len(), 1);
        assert_eq!(cmp.weaknesses[0].question_id, "q2");
        assert_eq!(cmp.weaknesses[0].delta, Some(-20.0));

        let md = cmp.to_markdown();
        assert!(md.contains("Strengths"));
        assert!(md.contains("Weaknesses"));
    }

    #[test]
    fn unanswered_questions_are_never_strengths_or_weaknesses() {
        let exam = exam();
        let cohort = cohort();
        let analysis = analyze_performance(&exam, &cohort);

        let cmp = compare_student(&analysis, &cohort, &cohort[3], 0.0);
        let q2 = cmp.questions.iter().find(|q| q.question_id == "q2").unwrap();
        assert_eq!(q2.student_pct, None);
        assert_eq!(q2.delta, None);
        assert!(cmp.weaknesses.iter().all(|q| q.question_id != "q2"));
    }

    #[test]
    fn empty_cohort_is_all_zero() {
        let exam = exam();
        let analysis = analyze_performance(&exam, &[]);
        let lone = result("s1", &[("q1", 5.0)]);
        let cmp = compare_student(&analysis, &[], &lone, 10.0);
        assert_eq!(cmp.percentile_rank, 0.0);
        assert_eq!(cmp.cohort_mean, 0.0);
        assert!(!cmp.pct.is_nan());
    }

    #[test]
    fn json_roundtrip() {
        let exam = exam();
        let analysis = analyze_performance(&exam, &cohort());
        let report = AnalysisReport::new(&exam, Some("10A".into()), analysis);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/analysis.json");

        report.save_json(&path).unwrap();
        let loaded = AnalysisReport::load_json(&path).unwrap();

        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.exam.question_count, 2);
        assert_eq!(loaded.class_filter.as_deref(), Some("10A"));
        assert_eq!(loaded.analysis.stats.count, 4);
        assert_eq!(loaded.analysis.by_question.len(), 2);
    }

    #[test]
    fn markdown_output() {
        let exam = exam();
        let analysis = analyze_performance(&exam, &cohort());
        let md = AnalysisReport::new(&exam, None, analysis).to_markdown();
        assert!(md.starts_with("# Mock"));
        assert!(md.contains("| 1 | short | 10 |"));
        assert!(md.contains("Problem questions"));
        assert!(md.contains("| <50% |"));
    }
}
