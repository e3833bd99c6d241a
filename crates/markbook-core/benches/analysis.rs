use criterion::{black_box, criterion_group, criterion_main, Criterion};

use markbook_core::analysis::analyze_performance;
use markbook_core::model::{Exam, ExamResult, Question, QuestionType};
use markbook_core::tree;

/// Ten questions with three parts each; every fourth part is MCQ.
fn make_exam() -> Exam {
    let questions = (1..=10)
        .map(|n| {
            let mut q = tree::create_leaf(n.to_string());
            q.modules = vec![format!("M{}", n % 3)];
            q.sub_questions = ["a", "b", "c"]
                .iter()
                .enumerate()
                .map(|(i, part)| {
                    let mut leaf = tree::create_leaf(*part);
                    leaf.id = format!("{n}{part}");
                    leaf.max_marks = (i + 1) as f64;
                    leaf.cognitive_verbs = vec!["explain".into(), format!("verb{i}")];
                    if (n * 3 + i) % 4 == 0 {
                        leaf.question_type = QuestionType::Mcq;
                        leaf.max_marks = 1.0;
                        leaf.correct_answer = Some("B".into());
                    }
                    leaf
                })
                .collect();
            q
        })
        .collect::<Vec<Question>>();
    Exam::new("Bench", questions)
}

fn make_results(exam: &Exam, count: usize) -> Vec<ExamResult> {
    let leaves = tree::flatten_leaves(&exam.questions);
    (0..count)
        .map(|s| {
            let mut r = ExamResult::new(&exam.id, format!("s{s}"));
            for (i, leaf) in leaves.iter().enumerate() {
                if (s + i) % 7 == 0 {
                    continue;
                }
                let score = ((s + i) % (leaf.max_marks as usize + 1)) as f64;
                r.question_scores.insert(leaf.id.clone(), score);
                if leaf.is_mcq() {
                    let letter = ["A", "B", "C", "D"][(s + i) % 4];
                    r.question_responses.insert(leaf.id.clone(), letter.into());
                }
            }
            r.recompute_total();
            r
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_performance");
    let exam = make_exam();

    for count in [30, 300, 3000] {
        let results = make_results(&exam, count);
        group.bench_function(format!("results={count}"), |b| {
            b.iter(|| analyze_performance(black_box(&exam), black_box(&results)))
        });
    }

    group.finish();
}

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree");
    let exam = make_exam();

    group.bench_function("total_marks", |b| {
        b.iter(|| tree::total_marks(black_box(&exam.questions)))
    });

    group.bench_function("flatten_with_labels", |b| {
        b.iter(|| tree::flatten_with_labels(black_box(&exam.questions)).len())
    });

    group.bench_function("delete_by_id", |b| {
        b.iter(|| tree::delete_by_id(black_box(&exam.questions), black_box("5b")))
    });

    group.finish();
}

criterion_group!(benches, bench_analyze, bench_tree);
criterion_main!(benches);
