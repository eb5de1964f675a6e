// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rule engine: one callable against the full rule list
//!
//! Combines the kind gate, constraint evaluation and production
//! application into a single callable-to-annotations decision per rule,
//! then aggregates across rules and hands the result to the model
//! assembler. The match sink is purely observational and never affects
//! what ends up in the result map.

use crate::constraints::query_matches;
use crate::model::{FilterContext, Join, ModelBuilder, ResultMap};
use crate::productions::{apply_productions, AnnotationPair};
use crate::resolver::{DefinitionResolver, TypeParser};
use crate::types::{Callable, Definition, Rule};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Observer for rule matches. Implementations must be safe to share
/// across workers.
pub trait MatchSink: Sync {
    fn rule_matched(&self, rule: &Rule, callable: &Callable);
}

/// Discards all notices.
#[derive(Debug, Default)]
pub struct NullSink;

impl MatchSink for NullSink {
    fn rule_matched(&self, _rule: &Rule, _callable: &Callable) {}
}

/// One recorded match notice: which rule selected which callable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchNotice {
    pub rule: String,
    pub callable: String,
}

/// Collects match notices for the run report. Workers share one instance;
/// the mutex guards diagnostics only, never results.
#[derive(Debug, Default)]
pub struct RecordingSink {
    echo: bool,
    notices: Mutex<Vec<MatchNotice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print each notice as it is observed.
    pub fn verbose() -> Self {
        Self {
            echo: true,
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Drain the recorded notices.
    pub fn take(&self) -> Vec<MatchNotice> {
        let mut notices = self.notices.lock().expect("match notice lock");
        std::mem::take(&mut *notices)
    }
}

impl MatchSink for RecordingSink {
    fn rule_matched(&self, rule: &Rule, callable: &Callable) {
        if self.echo {
            println!("[match] {} -> {}", rule.display_name(), callable);
        }
        let mut notices = self.notices.lock().expect("match notice lock");
        notices.push(MatchNotice {
            rule: rule.display_name().to_string(),
            callable: callable.name.clone(),
        });
    }
}

/// Everything a worker needs, shared read-only across chunks.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    pub resolver: &'a dyn DefinitionResolver,
    pub parser: &'a dyn TypeParser,
    pub builder: &'a dyn ModelBuilder,
    pub filter: &'a FilterContext,
    pub sink: &'a dyn MatchSink,
}

/// Decide what one rule contributes for one callable.
///
/// The kind gate comes first: a function-model rule never evaluates its
/// constraints against a method, and vice versa. Only a fully-matching
/// query reaches the productions (and the sink).
pub fn evaluate_rule(
    rule: &Rule,
    callable: &Callable,
    definition: Option<&Definition>,
    parser: &dyn TypeParser,
    sink: &dyn MatchSink,
) -> Result<Vec<AnnotationPair>> {
    if !rule.kind.admits(callable.kind) {
        return Ok(Vec::new());
    }
    if !query_matches(&rule.query, callable, definition, parser)? {
        return Ok(Vec::new());
    }
    sink.rule_matched(rule, callable);
    Ok(apply_productions(&rule.productions, definition))
}

/// Run every rule against one callable and fold the outcome into the
/// partial map.
///
/// The definition is resolved once here and threaded through all rules —
/// a visible performance decision, not hidden memoization. Contributions
/// concatenate in rule order; an assembler returning no model leaves any
/// pre-existing entry for the callable untouched, and a built model joins
/// with the existing entry instead of replacing it.
pub fn apply_rules(
    rules: &[Rule],
    callable: &Callable,
    map: &mut ResultMap,
    context: &GenerationContext<'_>,
) -> Result<()> {
    let definition = context.resolver.resolve(callable);

    let mut pairs = Vec::new();
    for rule in rules {
        pairs.extend(evaluate_rule(
            rule,
            callable,
            definition,
            context.parser,
            context.sink,
        )?);
    }

    if pairs.is_empty() {
        return Ok(());
    }
    let Some(model) = context.builder.build(callable, &pairs, context.filter) else {
        return Ok(());
    };

    match map.remove(callable) {
        Some(existing) => {
            map.insert(callable.clone(), existing.join(model));
        }
        None => {
            map.insert(callable.clone(), model);
        }
    }
    Ok(())
}
