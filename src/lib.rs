// SPDX-License-Identifier: PMPL-1.0-or-later

//! Taintseed — declarative model queries for taint analysis.
//!
//! This crate is the model-query core of a taint-analysis pipeline: rules
//! select callables by constraints over their signatures and attach seed
//! taint annotations, which become joinable per-callable models.
//!
//! ENGINE PILLARS:
//! 1. **Constraints**: a recursive query grammar (name regexes, annotation
//!    tests, `any_of`) evaluated structurally against resolved signatures.
//! 2. **Productions**: targeted parameter addressing — by name, by
//!    position, or universally — emitting (target, taint) seed pairs.
//! 3. **Merge**: an associative, commutative, idempotent model join that
//!    makes chunked parallel execution invariant to chunk boundaries.

pub mod config;
pub mod constraints;
pub mod driver;
pub mod engine;
pub mod model;
pub mod productions;
pub mod report;
pub mod resolver;
pub mod schedule;
pub mod types;
