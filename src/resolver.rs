// SPDX-License-Identifier: PMPL-1.0-or-later

//! Boundary contracts with the surrounding analysis
//!
//! The engine never resolves names or parses source itself: signatures
//! arrive pre-resolved and type annotations pre-extracted. This module
//! defines those seams as traits, plus the in-memory implementations used
//! by the CLI and the test suite. Resolvers are shared read-only across
//! workers, so every trait here requires `Sync`.

use crate::types::{Callable, CallableKind, Definition, Parameter, ParsedType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Looks up the resolved definition of a callable. Returning `None` is a
/// resolution gap, not an error: constraints treat it as a non-match and
/// productions contribute nothing.
pub trait DefinitionResolver: Sync {
    fn resolve(&self, callable: &Callable) -> Option<&Definition>;
}

/// Parses a raw annotation string into its structured form before
/// annotation-constraint tests run.
pub trait TypeParser: Sync {
    fn parse(&self, raw: &str) -> ParsedType;
}

/// Minimal structured-type parser: recognises the explicit-annotation
/// wrapper (`Annotated[T, ...]`, qualified or not) and treats every other
/// shape as a plain named type.
#[derive(Debug, Default)]
pub struct AnnotationParser;

impl AnnotationParser {
    pub fn new() -> Self {
        Self
    }
}

impl TypeParser for AnnotationParser {
    fn parse(&self, raw: &str) -> ParsedType {
        let trimmed = raw.trim();
        let inner = trimmed
            .strip_prefix("typing.Annotated[")
            .or_else(|| trimmed.strip_prefix("Annotated["))
            .and_then(|rest| rest.strip_suffix(']'));

        match inner {
            Some(args) => {
                // The wrapped type is the first bracket-level argument.
                let base = split_top_level(args).next().unwrap_or(args).trim();
                ParsedType::Annotated(Box::new(ParsedType::Named(base.to_string())))
            }
            None => ParsedType::Named(trimmed.to_string()),
        }
    }
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(args: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut pieces = Vec::new();
    for (i, ch) in args.char_indices() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&args[start..]);
    pieces.into_iter()
}

/// One externally-resolved callable as it appears in an index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableRecord {
    pub kind: CallableKind,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
}

/// The callable universe handed to a run: produced upstream by the real
/// resolver, serialized to JSON, consumed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallableIndex {
    pub callables: Vec<CallableRecord>,
}

/// In-memory resolver over a loaded callable index.
#[derive(Debug, Default)]
pub struct IndexResolver {
    definitions: HashMap<Callable, Definition>,
    universe: Vec<Callable>,
}

impl IndexResolver {
    pub fn from_index(index: CallableIndex) -> Self {
        let mut resolver = Self::default();
        for record in index.callables {
            let callable = Callable {
                kind: record.kind,
                name: record.name,
            };
            let definition = Definition {
                parameters: record.parameters,
                return_annotation: record.return_annotation,
            };
            resolver.insert(callable, definition);
        }
        resolver
    }

    /// Read a JSON callable index from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read callable index: {}", path.display()))?;
        let index: CallableIndex = serde_json::from_str(&content)
            .with_context(|| format!("invalid callable index: {}", path.display()))?;
        Ok(Self::from_index(index))
    }

    pub fn insert(&mut self, callable: Callable, definition: Definition) {
        if !self.definitions.contains_key(&callable) {
            self.universe.push(callable.clone());
        }
        self.definitions.insert(callable, definition);
    }

    /// All known callables, in index order.
    pub fn universe(&self) -> &[Callable] {
        &self.universe
    }
}

impl DefinitionResolver for IndexResolver {
    fn resolve(&self, callable: &Callable) -> Option<&Definition> {
        self.definitions.get(callable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_annotation_is_named() {
        let parser = AnnotationParser::new();
        assert_eq!(parser.parse("str"), ParsedType::Named("str".into()));
        assert!(!parser.parse("Optional[int]").is_annotated());
    }

    #[test]
    fn test_annotated_wrapper_detected() {
        let parser = AnnotationParser::new();
        assert!(parser.parse("Annotated[str, UserControlled]").is_annotated());
        assert!(parser.parse("typing.Annotated[int, Range(0, 10)]").is_annotated());
    }

    #[test]
    fn test_annotated_keeps_first_argument() {
        let parser = AnnotationParser::new();
        let parsed = parser.parse("Annotated[Dict[str, int], Meta]");
        assert_eq!(
            parsed,
            ParsedType::Annotated(Box::new(ParsedType::Named("Dict[str, int]".into())))
        );
    }

    #[test]
    fn test_index_resolver_lookup() {
        let index = CallableIndex {
            callables: vec![CallableRecord {
                kind: CallableKind::Function,
                name: "app.login".into(),
                parameters: vec![Parameter::positional(0, "username", Some("str"))],
                return_annotation: Some("bool".into()),
            }],
        };
        let resolver = IndexResolver::from_index(index);
        assert_eq!(resolver.universe().len(), 1);

        let hit = resolver.resolve(&Callable::function("app.login"));
        assert_eq!(hit.unwrap().parameters.len(), 1);
        assert!(resolver.resolve(&Callable::function("app.logout")).is_none());
        // Same name, different kind: not the same callable.
        assert!(resolver.resolve(&Callable::method("app.login")).is_none());
    }
}
