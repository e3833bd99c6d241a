//! Question tree operations.
//!
//! Trees are plain nested `Vec<Question>` owned by a single exam. Every
//! structural edit rebuilds the affected path and returns a new tree; there
//! are no parent back-pointers, so parent lookups walk down from the roots.
//! An edit aimed at an id that is not in the tree returns the tree unchanged.

use uuid::Uuid;

use crate::model::{Question, QuestionType};

const ROMAN: [&str; 12] = [
    "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii",
];

/// A fresh short-answer leaf worth one mark.
pub fn create_leaf(number: impl Into<String>) -> Question {
    Question {
        id: Uuid::new_v4().to_string(),
        number: number.into(),
        max_marks: 1.0,
        question_type: QuestionType::Short,
        correct_answer: None,
        notes: None,
        sub_questions: Vec::new(),
        modules: Vec::new(),
        content_areas: Vec::new(),
        outcomes: Vec::new(),
        cognitive_verbs: Vec::new(),
    }
}

/// Suggest the label that follows `previous` among siblings.
///
/// Numbers increment, lowercase roman numerals up to `xi` advance, single
/// letters advance alphabetically. Anything else yields an empty string and
/// the caller has to ask for a label.
pub fn next_sibling_label(previous: &str) -> String {
    let previous = previous.trim();

    if let Ok(n) = previous.parse::<u64>() {
        return n.checked_add(1).map(|v| v.to_string()).unwrap_or_default();
    }

    // Roman first: "i" under a lettered parent continues as "ii", not "j".
    if let Some(pos) = ROMAN.iter().position(|r| *r == previous) {
        return ROMAN.get(pos + 1).map(|r| r.to_string()).unwrap_or_default();
    }

    let mut chars = previous.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() && !matches!(c, 'z' | 'Z') => {
            char::from(c as u8 + 1).to_string()
        }
        _ => String::new(),
    }
}

/// Label for the first child of a node labelled `parent`.
pub fn first_child_label(parent: &str) -> String {
    let parent = parent.trim();
    if !parent.is_empty() && parent.chars().all(|c| c.is_ascii_digit()) {
        return "a".to_string();
    }
    let mut chars = parent.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => "i".to_string(),
        _ => String::new(),
    }
}

/// Label to offer for a new child of `parent_id`, or a new root when `None`.
pub fn next_child_label(tree: &[Question], parent_id: Option<&str>) -> String {
    match parent_id {
        None => tree
            .last()
            .map(|q| next_sibling_label(&q.number))
            .unwrap_or_else(|| "1".to_string()),
        Some(id) => match find_by_id(tree, id) {
            Some(parent) => match parent.sub_questions.last() {
                Some(last) => next_sibling_label(&last.number),
                None => first_child_label(&parent.number),
            },
            None => String::new(),
        },
    }
}

/// Marks available under a node: its own marks for a leaf, the sum of its
/// children otherwise. A branch's stored `max_marks` is never read.
pub fn rollup_marks(node: &Question) -> f64 {
    if node.is_leaf() {
        node.max_marks
    } else {
        node.sub_questions.iter().map(rollup_marks).sum()
    }
}

/// Sum of leaf marks across a forest of root questions.
pub fn total_marks(tree: &[Question]) -> f64 {
    tree.iter().map(rollup_marks).sum()
}

/// Rewrite every branch's `max_marks` to its rollup.
pub fn normalize(tree: Vec<Question>) -> Vec<Question> {
    tree.into_iter()
        .map(|mut q| {
            if !q.is_leaf() {
                q.sub_questions = normalize(std::mem::take(&mut q.sub_questions));
                q.max_marks = q.sub_questions.iter().map(|c| c.max_marks).sum();
            }
            q
        })
        .collect()
}

/// Leaves in document order (depth-first, left to right).
pub fn flatten_leaves(tree: &[Question]) -> Vec<&Question> {
    let mut out = Vec::new();
    collect_leaves(tree, &mut out);
    out
}

fn collect_leaves<'a>(nodes: &'a [Question], out: &mut Vec<&'a Question>) {
    for q in nodes {
        if q.is_leaf() {
            out.push(q);
        } else {
            collect_leaves(&q.sub_questions, out);
        }
    }
}

/// A leaf together with its composite display label.
#[derive(Debug, Clone)]
pub struct LabeledLeaf<'a> {
    pub question: &'a Question,
    /// Ancestor numbers joined as `1(a)(ii)`.
    pub label: String,
}

/// Leaves in document order, each labelled with its ancestor chain.
pub fn flatten_with_labels(tree: &[Question]) -> Vec<LabeledLeaf<'_>> {
    let mut out = Vec::new();
    collect_labeled(tree, "", &mut out);
    out
}

fn collect_labeled<'a>(nodes: &'a [Question], prefix: &str, out: &mut Vec<LabeledLeaf<'a>>) {
    for q in nodes {
        let number = q.number.trim();
        let label = match (prefix.is_empty(), number.is_empty()) {
            (_, true) => prefix.to_string(),
            (true, false) => number.to_string(),
            (false, false) => format!("{prefix}({number})"),
        };
        if q.is_leaf() {
            out.push(LabeledLeaf { question: q, label });
        } else {
            collect_labeled(&q.sub_questions, &label, out);
        }
    }
}

/// Depth-first search for a node by id.
pub fn find_by_id<'a>(tree: &'a [Question], id: &str) -> Option<&'a Question> {
    for q in tree {
        if q.id == id {
            return Some(q);
        }
        if let Some(found) = find_by_id(&q.sub_questions, id) {
            return Some(found);
        }
    }
    None
}

/// The direct parent of `id`, or `None` for roots and unknown ids.
pub fn find_parent<'a>(tree: &'a [Question], id: &str) -> Option<&'a Question> {
    for q in tree {
        if q.sub_questions.iter().any(|c| c.id == id) {
            return Some(q);
        }
        if let Some(found) = find_parent(&q.sub_questions, id) {
            return Some(found);
        }
    }
    None
}

/// Replace the node `id` (and its subtree) with `replacement`.
pub fn replace_by_id(tree: &[Question], id: &str, replacement: Question) -> Vec<Question> {
    if find_by_id(tree, id).is_none() {
        return tree.to_vec();
    }
    normalize(replace_in(tree, id, &replacement))
}

fn replace_in(nodes: &[Question], id: &str, replacement: &Question) -> Vec<Question> {
    nodes
        .iter()
        .map(|q| {
            if q.id == id {
                replacement.clone()
            } else {
                with_children(q, replace_in(&q.sub_questions, id, replacement))
            }
        })
        .collect()
}

/// Remove the node `id` together with all of its descendants.
///
/// A branch that loses its last child becomes a leaf worth its previous
/// rollup.
pub fn delete_by_id(tree: &[Question], id: &str) -> Vec<Question> {
    if find_by_id(tree, id).is_none() {
        return tree.to_vec();
    }
    normalize(delete_in(tree, id))
}

fn delete_in(nodes: &[Question], id: &str) -> Vec<Question> {
    nodes
        .iter()
        .filter(|q| q.id != id)
        .map(|q| with_children(q, delete_in(&q.sub_questions, id)))
        .collect()
}

/// Append `child` under `parent_id`, or as a new root when `None`.
pub fn insert_under_parent(
    tree: &[Question],
    parent_id: Option<&str>,
    child: Question,
) -> Vec<Question> {
    match parent_id {
        None => {
            let mut out = tree.to_vec();
            out.push(child);
            normalize(out)
        }
        Some(id) => {
            if find_by_id(tree, id).is_none() {
                return tree.to_vec();
            }
            normalize(insert_in(tree, id, &child))
        }
    }
}

fn insert_in(nodes: &[Question], parent_id: &str, child: &Question) -> Vec<Question> {
    nodes
        .iter()
        .map(|q| {
            let mut children = insert_in(&q.sub_questions, parent_id, child);
            if q.id == parent_id {
                children.push(child.clone());
            }
            with_children(q, children)
        })
        .collect()
}

fn with_children(q: &Question, sub_questions: Vec<Question>) -> Question {
    Question {
        id: q.id.clone(),
        number: q.number.clone(),
        max_marks: q.max_marks,
        question_type: q.question_type,
        correct_answer: q.correct_answer.clone(),
        notes: q.notes.clone(),
        sub_questions,
        modules: q.modules.clone(),
        content_areas: q.content_areas.clone(),
        outcomes: q.outcomes.clone(),
        cognitive_verbs: q.cognitive_verbs.clone(),
    }
}
