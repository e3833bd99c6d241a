//! Exam analysis: descriptive statistics over a set of results.
//!
//! [`analyze_performance`] walks the results once and fills every view in
//! [`ExamAnalysis`]. The caller decides which results belong to the cohort;
//! nothing here filters by class or student. Every percentage is in
//! `[0, 100]` and a zero denominator yields 0.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{Exam, ExamResult, QuestionType};
use crate::tree::{self, LabeledLeaf};

/// Number of weakest questions reported in `problem_questions`.
pub const PROBLEM_QUESTION_COUNT: usize = 3;

/// Lower bounds (percent of total marks) of the six score bands.
pub const BAND_LOWER_BOUNDS: [f64; 6] = [0.0, 50.0, 60.0, 70.0, 80.0, 90.0];

const BAND_LABELS: [&str; 6] = ["<50%", "50-59%", "60-69%", "70-79%", "80-89%", "90-100%"];

/// Summary statistics over result totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divisor N).
    pub std_dev: f64,
    pub count: usize,
}

/// Per-leaf performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStat {
    pub question_id: String,
    /// Composite label such as `1(a)`.
    pub label: String,
    pub question_type: QuestionType,
    pub max_marks: f64,
    /// Mean score over results that recorded one.
    pub average: f64,
    /// `average` as a percentage of `max_marks`.
    pub pct: f64,
    /// Results with a score for this leaf.
    pub responses: usize,
}

/// Aggregate over every leaf carrying one tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagStat {
    pub tag: String,
    /// Sum of recorded scores on tagged leaves.
    pub score: f64,
    /// Sum of `max_marks` for the same (result, leaf) pairs.
    pub max: f64,
    pub pct: f64,
    /// Leaves carrying the tag.
    pub questions: usize,
}

/// Response letter frequencies for one MCQ leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistractorStat {
    pub question_id: String,
    pub label: String,
    pub correct_answer: Option<String>,
    /// Letter to number of results that chose it.
    pub counts: BTreeMap<String, usize>,
    pub responses: usize,
}

/// How many results recorded one literal score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBucket {
    pub score: f64,
    pub count: usize,
}

/// Histogram of scores for one non-MCQ leaf, ascending by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDistribution {
    pub question_id: String,
    pub label: String,
    pub max_marks: f64,
    pub buckets: Vec<ScoreBucket>,
}

/// Results whose percentage of total marks falls in one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandCount {
    pub label: String,
    pub lower: f64,
    pub count: usize,
}

/// Everything computed for one exam and one cohort of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAnalysis {
    pub exam_id: String,
    pub total_marks: f64,
    pub stats: SummaryStats,
    pub by_question: Vec<QuestionStat>,
    pub by_verb: Vec<TagStat>,
    pub by_module: Vec<TagStat>,
    pub by_content_area: Vec<TagStat>,
    pub by_outcome: Vec<TagStat>,
    pub distractors: Vec<DistractorStat>,
    pub score_distributions: Vec<ScoreDistribution>,
    pub bands: Vec<BandCount>,
    pub problem_questions: Vec<QuestionStat>,
}

impl ExamAnalysis {
    pub fn question(&self, question_id: &str) -> Option<&QuestionStat> {
        self.by_question.iter().find(|q| q.question_id == question_id)
    }
}

/// `part / whole` as a percentage clamped to `[0, 100]`; 0 when `whole` is 0.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 && part.is_finite() {
        (part / whole * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Index into [`BAND_LOWER_BOUNDS`] for a percentage.
pub fn band_index(pct: f64) -> usize {
    BAND_LOWER_BOUNDS
        .iter()
        .rposition(|&lower| pct >= lower)
        .unwrap_or(0)
}

pub fn band_label(pct: f64) -> &'static str {
    BAND_LABELS[band_index(pct)]
}

/// Mean, median, extremes and population standard deviation.
pub fn summarize(values: &[f64]) -> SummaryStats {
    if values.is_empty() {
        return SummaryStats::default();
    }
    let n = values.len() as f64;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = sorted.iter().sum::<f64>() / n;
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    SummaryStats {
        mean,
        median,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        std_dev: variance.sqrt(),
        count: sorted.len(),
    }
}

/// Running totals for one tag.
#[derive(Default)]
struct TagAcc {
    score: f64,
    max: f64,
    questions: usize,
}

/// Buckets for one tag dimension, in first-seen order.
#[derive(Default)]
struct TagDimension {
    tags: Vec<(String, TagAcc)>,
    index: HashMap<String, usize>,
}

impl TagDimension {
    /// Register a leaf's tags and return the bucket indices it feeds.
    /// Membership is additive: a tag listed twice on one leaf feeds its
    /// bucket twice.
    fn register(&mut self, tags: &[String]) -> Vec<usize> {
        let mut slots: Vec<usize> = Vec::new();
        for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let slot = match self.index.get(tag) {
                Some(&i) => i,
                None => {
                    self.tags.push((tag.to_string(), TagAcc::default()));
                    self.index.insert(tag.to_string(), self.tags.len() - 1);
                    self.tags.len() - 1
                }
            };
            self.tags[slot].1.questions += 1;
            slots.push(slot);
        }
        slots
    }

    fn add(&mut self, slots: &[usize], score: f64, max: f64) {
        for &slot in slots {
            let acc = &mut self.tags[slot].1;
            acc.score += score;
            acc.max += max;
        }
    }

    fn finish(self) -> Vec<TagStat> {
        let mut stats: Vec<TagStat> = self
            .tags
            .into_iter()
            .map(|(tag, acc)| TagStat {
                tag,
                score: acc.score,
                max: acc.max,
                pct: percent(acc.score, acc.max),
                questions: acc.questions,
            })
            .collect();
        // Stable: equal percentages keep first-seen order.
        stats.sort_by(|a, b| b.pct.total_cmp(&a.pct));
        stats
    }
}

/// Running totals for one leaf.
struct LeafAcc<'a> {
    leaf: LabeledLeaf<'a>,
    sum: f64,
    responses: usize,
    choices: BTreeMap<String, usize>,
    chosen: usize,
    histogram: Vec<ScoreBucket>,
    tag_slots: [Vec<usize>; 4],
}

impl LeafAcc<'_> {
    fn record_score(&mut self, score: f64) {
        self.sum += score;
        self.responses += 1;
        match self.histogram.iter_mut().find(|b| b.score == score) {
            Some(bucket) => bucket.count += 1,
            None => self.histogram.push(ScoreBucket { score, count: 1 }),
        }
    }

    fn stat(&self) -> QuestionStat {
        let q = self.leaf.question;
        let average = if self.responses > 0 {
            self.sum / self.responses as f64
        } else {
            0.0
        };
        QuestionStat {
            question_id: q.id.clone(),
            label: self.leaf.label.clone(),
            question_type: q.question_type,
            max_marks: q.max_marks,
            average,
            pct: percent(average, q.max_marks),
            responses: self.responses,
        }
    }
}

const VERB: usize = 0;
const MODULE: usize = 1;
const CONTENT_AREA: usize = 2;
const OUTCOME: usize = 3;

/// Analyze `results` against the question tree of `exam`.
///
/// Results are used as given; pass only the cohort you want analyzed.
pub fn analyze_performance(exam: &Exam, results: &[ExamResult]) -> ExamAnalysis {
    let mut dimensions: [TagDimension; 4] = Default::default();

    let mut leaves: Vec<LeafAcc<'_>> = tree::flatten_with_labels(&exam.questions)
        .into_iter()
        .map(|leaf| {
            let q = leaf.question;
            let tag_slots = [
                dimensions[VERB].register(&q.cognitive_verbs),
                dimensions[MODULE].register(&q.modules),
                dimensions[CONTENT_AREA].register(&q.content_areas),
                dimensions[OUTCOME].register(&q.outcomes),
            ];
            LeafAcc {
                leaf,
                sum: 0.0,
                responses: 0,
                choices: BTreeMap::new(),
                chosen: 0,
                histogram: Vec::new(),
                tag_slots,
            }
        })
        .collect();

    let mut totals = Vec::with_capacity(results.len());
    let mut band_counts = [0usize; 6];

    for result in results {
        totals.push(result.score_total);
        band_counts[band_index(percent(result.score_total, exam.total_marks))] += 1;

        for acc in leaves.iter_mut() {
            let q = acc.leaf.question;
            if let Some(score) = result.score(&q.id) {
                acc.record_score(score);
                for (dim, slots) in dimensions.iter_mut().zip(acc.tag_slots.iter()) {
                    dim.add(slots, score, q.max_marks);
                }
            }
            if q.is_mcq() {
                let choice = result
                    .response(&q.id)
                    .map(|r| r.trim().to_ascii_uppercase())
                    .filter(|r| !r.is_empty());
                if let Some(choice) = choice {
                    *acc.choices.entry(choice).or_default() += 1;
                    acc.chosen += 1;
                }
            }
        }
    }

    let by_question: Vec<QuestionStat> = leaves.iter().map(LeafAcc::stat).collect();

    // Stable: equal percentages keep document order.
    let mut ranked: Vec<&QuestionStat> = by_question.iter().collect();
    ranked.sort_by(|a, b| a.pct.total_cmp(&b.pct));
    let problem_questions = ranked
        .into_iter()
        .take(PROBLEM_QUESTION_COUNT)
        .cloned()
        .collect();

    let mut distractors = Vec::new();
    let mut score_distributions = Vec::new();
    for acc in leaves {
        let q = acc.leaf.question;
        if q.is_mcq() {
            distractors.push(DistractorStat {
                question_id: q.id.clone(),
                label: acc.leaf.label,
                correct_answer: q.correct_answer.clone(),
                counts: acc.choices,
                responses: acc.chosen,
            });
        } else {
            let mut buckets = acc.histogram;
            buckets.sort_by(|a, b| a.score.total_cmp(&b.score));
            score_distributions.push(ScoreDistribution {
                question_id: q.id.clone(),
                label: acc.leaf.label,
                max_marks: q.max_marks,
                buckets,
            });
        }
    }

    let bands = BAND_LABELS
        .iter()
        .zip(BAND_LOWER_BOUNDS)
        .zip(band_counts)
        .map(|((label, lower), count)| BandCount {
            label: label.to_string(),
            lower,
            count,
        })
        .collect();

    let [verbs, modules, content_areas, outcomes] = dimensions;
    let analysis = ExamAnalysis {
        exam_id: exam.id.clone(),
        total_marks: exam.total_marks,
        stats: summarize(&totals),
        by_question,
        by_verb: verbs.finish(),
        by_module: modules.finish(),
        by_content_area: content_areas.finish(),
        by_outcome: outcomes.finish(),
        distractors,
        score_distributions,
        bands,
        problem_questions,
    };

    tracing::debug!(
        "analyzed exam {} over {} results ({} leaves)",
        exam.id,
        analysis.stats.count,
        analysis.by_question.len()
    );
    analysis
}
