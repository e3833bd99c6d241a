//! markbook-core: question trees, score entry, exam analytics and legacy import.
//!
//! This crate holds the data model and every pure operation on it. It does
//! no I/O beyond the explicit JSON load/save helpers on reports and exports.

pub mod analysis;
pub mod error;
pub mod legacy;
pub mod model;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod tree;
pub mod validate;
