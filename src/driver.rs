// SPDX-License-Identifier: PMPL-1.0-or-later

//! Parallel merge driver: the single public entry point of the engine
//!
//! Partitions the callable universe, folds every chunk through the rule
//! engine into a partial result map, reduces the partials, and finally
//! merges into the caller-supplied initial map. The final map is
//! identical for any chunking because map entries only ever combine
//! through the model join.

use crate::engine::{apply_rules, GenerationContext};
use crate::model::{merge_joining, ResultMap};
use crate::schedule::{partition, target_chunk_count, Scheduler};
use crate::types::{Callable, Rule};
use anyhow::Result;

/// Run every rule against every eligible callable and merge the outcome
/// into `initial_map`.
///
/// An empty rule list returns `initial_map` unchanged. Callables that are
/// not functions or methods are dropped before scheduling. A worker
/// failure aborts the whole run.
pub fn run_all_rules<S: Scheduler>(
    rules: &[Rule],
    callables: &[Callable],
    initial_map: ResultMap,
    context: &GenerationContext<'_>,
    scheduler: &S,
) -> Result<ResultMap> {
    if rules.is_empty() {
        return Ok(initial_map);
    }

    let eligible: Vec<Callable> = callables
        .iter()
        .filter(|callable| callable.is_modelable())
        .cloned()
        .collect();

    let chunk_count = target_chunk_count(eligible.len(), scheduler.workers());
    let chunks = partition(eligible, chunk_count);

    let context = *context;
    let map_chunk = move |chunk: Vec<Callable>| -> Result<ResultMap> {
        let mut partial = ResultMap::new();
        for callable in &chunk {
            apply_rules(rules, callable, &mut partial, &context)?;
        }
        Ok(partial)
    };
    let reduce = |mut left: ResultMap, right: ResultMap| {
        merge_joining(&mut left, right);
        left
    };

    let reduced = scheduler.map_reduce(chunks, map_chunk, reduce)?;

    let mut result = initial_map;
    if let Some(partial) = reduced {
        merge_joining(&mut result, partial);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullSink;
    use crate::model::{FilterContext, SeedModelBuilder, TaintModel};
    use crate::resolver::{AnnotationParser, IndexResolver};
    use crate::schedule::SequentialScheduler;
    use crate::types::{
        AnnotationTarget, CallableKind, Constraint, Definition, Parameter, Production, RuleKind,
        TaintAnnotation,
    };

    fn everything_rule() -> Rule {
        Rule {
            kind: RuleKind::FunctionModel,
            name: Some("all-returns".into()),
            query: vec![Constraint::Name(".*".into())],
            productions: vec![Production::ReturnTaint(vec![TaintAnnotation::source(
                "UserControlled",
            )])],
        }
    }

    fn resolver_for(callables: &[Callable]) -> IndexResolver {
        let mut resolver = IndexResolver::default();
        for callable in callables {
            resolver.insert(
                callable.clone(),
                Definition {
                    parameters: vec![Parameter::positional(0, "value", Some("str"))],
                    return_annotation: Some("str".into()),
                },
            );
        }
        resolver
    }

    #[test]
    fn test_empty_rules_returns_initial_map_unchanged() {
        let resolver = IndexResolver::default();
        let parser = AnnotationParser::new();
        let builder = SeedModelBuilder::new();
        let filter = FilterContext::retain_all();
        let sink = NullSink;
        let context = GenerationContext {
            resolver: &resolver,
            parser: &parser,
            builder: &builder,
            filter: &filter,
            sink: &sink,
        };

        let seeded = Callable::function("app.seeded");
        let mut initial = ResultMap::new();
        initial.insert(
            seeded.clone(),
            TaintModel::from_pairs(vec![(
                AnnotationTarget::Return,
                TaintAnnotation::sink("Logging"),
            )]),
        );

        let result = run_all_rules(
            &[],
            &[Callable::function("app.other")],
            initial.clone(),
            &context,
            &SequentialScheduler::new(),
        )
        .unwrap();

        assert_eq!(result, initial);
    }

    #[test]
    fn test_non_modelable_callables_are_dropped() {
        let callables = vec![
            Callable::function("app.f"),
            Callable {
                kind: CallableKind::Class,
                name: "app.C".into(),
            },
            Callable {
                kind: CallableKind::Global,
                name: "app.CONFIG".into(),
            },
        ];
        let resolver = resolver_for(&callables);
        let parser = AnnotationParser::new();
        let builder = SeedModelBuilder::new();
        let filter = FilterContext::retain_all();
        let sink = NullSink;
        let context = GenerationContext {
            resolver: &resolver,
            parser: &parser,
            builder: &builder,
            filter: &filter,
            sink: &sink,
        };

        let result = run_all_rules(
            &[everything_rule()],
            &callables,
            ResultMap::new(),
            &context,
            &SequentialScheduler::new(),
        )
        .unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains_key(&Callable::function("app.f")));
    }

    #[test]
    fn test_initial_map_entries_join_with_new_models() {
        let callable = Callable::function("app.f");
        let callables = vec![callable.clone()];
        let resolver = resolver_for(&callables);
        let parser = AnnotationParser::new();
        let builder = SeedModelBuilder::new();
        let filter = FilterContext::retain_all();
        let sink = NullSink;
        let context = GenerationContext {
            resolver: &resolver,
            parser: &parser,
            builder: &builder,
            filter: &filter,
            sink: &sink,
        };

        let mut initial = ResultMap::new();
        initial.insert(
            callable.clone(),
            TaintModel::from_pairs(vec![(
                AnnotationTarget::Return,
                TaintAnnotation::sink("Logging"),
            )]),
        );

        let result = run_all_rules(
            &[everything_rule()],
            &callables,
            initial,
            &context,
            &SequentialScheduler::new(),
        )
        .unwrap();

        // Pre-existing sink and freshly produced source both survive.
        assert_eq!(result[&callable].annotation_count(), 2);
    }
}
