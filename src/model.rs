// SPDX-License-Identifier: PMPL-1.0-or-later

//! Taint models and the join algebra the parallel design leans on
//!
//! A model is the taint specification attached to one callable: a mapping
//! from annotation target to the set of annotations seeded there. `join`
//! is per-target set union, which makes it associative, commutative and
//! idempotent — the single property that lets partial result maps from
//! independent workers merge in any order and still agree.

use crate::productions::AnnotationPair;
use crate::types::{AnnotationTarget, Callable, TaintAnnotation, TaintKind};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Join semilattice: an associative, commutative, idempotent combine.
pub trait Join {
    fn join(self, other: Self) -> Self;
}

/// The taint specification for one callable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaintModel {
    taints: BTreeMap<AnnotationTarget, BTreeSet<TaintAnnotation>>,
}

impl TaintModel {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = AnnotationPair>,
    {
        let mut model = Self::default();
        for (target, taint) in pairs {
            model.taints.entry(target).or_default().insert(taint);
        }
        model
    }

    pub fn is_empty(&self) -> bool {
        self.taints.is_empty()
    }

    /// Total number of attached annotations across all targets.
    pub fn annotation_count(&self) -> usize {
        self.taints.values().map(BTreeSet::len).sum()
    }

    pub fn taints(&self) -> &BTreeMap<AnnotationTarget, BTreeSet<TaintAnnotation>> {
        &self.taints
    }
}

impl Join for TaintModel {
    fn join(mut self, other: Self) -> Self {
        for (target, annotations) in other.taints {
            self.taints.entry(target).or_default().extend(annotations);
        }
        self
    }
}

/// The final product of a run: one model per callable, keys unique. Two
/// models for the same callable never coexist — they are joined.
pub type ResultMap = HashMap<Callable, TaintModel>;

/// Merge two key-unique mappings, combining on key collision with `join`.
/// Skewed: the right map is drained into the left, keys present on only
/// one side are kept as-is.
pub fn merge_joining<K, V>(into: &mut HashMap<K, V>, from: HashMap<K, V>)
where
    K: Eq + Hash,
    V: Join,
{
    for (key, value) in from {
        match into.remove(&key) {
            Some(existing) => {
                into.insert(key, existing.join(value));
            }
            None => {
                into.insert(key, value);
            }
        }
    }
}

/// Precomputed allow-list of which taint sources and sinks a run retains.
/// Derived once from configuration before any chunk is scheduled, then
/// shared read-only across workers. `None` keeps everything; sanitizers
/// are never filtered.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    sources_to_keep: Option<HashSet<String>>,
    sinks_to_keep: Option<HashSet<String>>,
}

impl FilterContext {
    pub fn retain_all() -> Self {
        Self::default()
    }

    pub fn with_sources<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources_to_keep = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sinks<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sinks_to_keep = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn retains(&self, annotation: &TaintAnnotation) -> bool {
        let allow = match annotation.kind {
            TaintKind::Source => &self.sources_to_keep,
            TaintKind::Sink => &self.sinks_to_keep,
            TaintKind::Sanitizer => return true,
        };
        allow
            .as_ref()
            .map_or(true, |kept| kept.contains(&annotation.label))
    }
}

/// Turns the aggregated annotation pairs for one callable into a model.
/// An external collaborator from the engine's point of view: the engine
/// only calls `build` and handles `None` by leaving the callable untouched.
pub trait ModelBuilder: Sync {
    fn build(
        &self,
        callable: &Callable,
        pairs: &[AnnotationPair],
        filter: &FilterContext,
    ) -> Option<TaintModel>;
}

/// Standard assembler: keeps the pairs the filter context retains and
/// builds a model from them; nothing retained means no model.
#[derive(Debug, Default)]
pub struct SeedModelBuilder;

impl SeedModelBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl ModelBuilder for SeedModelBuilder {
    fn build(
        &self,
        _callable: &Callable,
        pairs: &[AnnotationPair],
        filter: &FilterContext,
    ) -> Option<TaintModel> {
        let kept: Vec<AnnotationPair> = pairs
            .iter()
            .filter(|(_, taint)| filter.retains(taint))
            .cloned()
            .collect();

        if kept.is_empty() {
            None
        } else {
            Some(TaintModel::from_pairs(kept))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(pairs: &[(AnnotationTarget, &str)]) -> TaintModel {
        TaintModel::from_pairs(
            pairs
                .iter()
                .map(|(target, label)| (target.clone(), TaintAnnotation::source(label))),
        )
    }

    fn ret() -> AnnotationTarget {
        AnnotationTarget::Return
    }

    fn param(name: &str) -> AnnotationTarget {
        AnnotationTarget::Parameter(crate::types::ParameterRoot::Keyword {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_join_is_idempotent() {
        let a = model(&[(ret(), "A"), (param("x"), "B")]);
        assert_eq!(a.clone().join(a.clone()), a);
    }

    #[test]
    fn test_join_is_commutative() {
        let a = model(&[(ret(), "A")]);
        let b = model(&[(param("x"), "B")]);
        assert_eq!(a.clone().join(b.clone()), b.join(a));
    }

    #[test]
    fn test_join_is_associative() {
        let a = model(&[(ret(), "A")]);
        let b = model(&[(ret(), "B")]);
        let c = model(&[(param("x"), "C")]);
        assert_eq!(
            a.clone().join(b.clone()).join(c.clone()),
            a.join(b.join(c))
        );
    }

    #[test]
    fn test_merge_joining_combines_collisions() {
        let callable = Callable::function("app.f");
        let other = Callable::function("app.g");

        let mut left: ResultMap = HashMap::new();
        left.insert(callable.clone(), model(&[(ret(), "A")]));

        let mut right: ResultMap = HashMap::new();
        right.insert(callable.clone(), model(&[(ret(), "B")]));
        right.insert(other.clone(), model(&[(param("x"), "C")]));

        merge_joining(&mut left, right);

        assert_eq!(left.len(), 2);
        assert_eq!(left[&callable], model(&[(ret(), "A"), (ret(), "B")]));
        assert_eq!(left[&other], model(&[(param("x"), "C")]));
    }

    #[test]
    fn test_filter_context_default_retains_all() {
        let filter = FilterContext::retain_all();
        assert!(filter.retains(&TaintAnnotation::source("Anything")));
        assert!(filter.retains(&TaintAnnotation::sink("Anywhere")));
    }

    #[test]
    fn test_filter_context_allow_lists() {
        let filter = FilterContext::retain_all()
            .with_sources(["UserControlled"])
            .with_sinks(["SqlInjection"]);

        assert!(filter.retains(&TaintAnnotation::source("UserControlled")));
        assert!(!filter.retains(&TaintAnnotation::source("Cookies")));
        assert!(filter.retains(&TaintAnnotation::sink("SqlInjection")));
        assert!(!filter.retains(&TaintAnnotation::sink("Logging")));
        // Sanitizers pass through regardless of the allow-lists.
        assert!(filter.retains(&TaintAnnotation::sanitizer("Escapes")));
    }

    #[test]
    fn test_builder_returns_none_when_everything_filtered() {
        let builder = SeedModelBuilder::new();
        let callable = Callable::function("app.f");
        let pairs = vec![(ret(), TaintAnnotation::source("Cookies"))];
        let filter = FilterContext::retain_all().with_sources(["UserControlled"]);

        assert!(builder.build(&callable, &pairs, &filter).is_none());
        assert!(builder
            .build(&callable, &pairs, &FilterContext::retain_all())
            .is_some());
        assert!(builder.build(&callable, &[], &FilterContext::retain_all()).is_none());
    }
}
