// SPDX-License-Identifier: PMPL-1.0-or-later

//! Constraint evaluation: does one callable satisfy one constraint node?
//!
//! Evaluation is pure and total over the closed `Constraint` sum type.
//! Resolution gaps (no definition, no annotation) are non-matches; a
//! malformed name pattern is a fatal configuration error and propagates.

use crate::resolver::TypeParser;
use crate::types::{AnnotationConstraint, Callable, Constraint, Definition, ParsedType};
use anyhow::{Context, Result};
use regex::Regex;

/// Evaluate one constraint node against a callable. The definition is
/// resolved once by the caller and threaded in explicitly; passing `None`
/// means the resolver had no definition for this callable.
pub fn constraint_matches(
    constraint: &Constraint,
    callable: &Callable,
    definition: Option<&Definition>,
    parser: &dyn TypeParser,
) -> Result<bool> {
    match constraint {
        Constraint::Name(pattern) => {
            let regex = Regex::new(pattern)
                .with_context(|| format!("invalid name constraint pattern: {pattern:?}"))?;
            Ok(regex.is_match(callable.external_name()))
        }
        Constraint::Return(inner) => {
            let annotation = definition.and_then(|d| d.return_annotation.as_deref());
            Ok(match annotation {
                Some(raw) => annotation_matches(*inner, &parser.parse(raw)),
                None => false,
            })
        }
        Constraint::AnyParameter(inner) => {
            let parameters = definition.map(|d| d.parameters.as_slice()).unwrap_or(&[]);
            Ok(parameters
                .iter()
                .filter_map(|p| p.annotation.as_deref())
                .any(|raw| annotation_matches(*inner, &parser.parse(raw))))
        }
        Constraint::AnyOf(alternatives) => {
            for alternative in alternatives {
                if constraint_matches(alternative, callable, definition, parser)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Logical AND over a rule's query list, in list order. Constraints are
/// pure, so the short-circuit on first failure is unobservable.
pub fn query_matches(
    query: &[Constraint],
    callable: &Callable,
    definition: Option<&Definition>,
    parser: &dyn TypeParser,
) -> Result<bool> {
    for constraint in query {
        if !constraint_matches(constraint, callable, definition, parser)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn annotation_matches(constraint: AnnotationConstraint, parsed: &ParsedType) -> bool {
    match constraint {
        AnnotationConstraint::IsAnnotatedType => parsed.is_annotated(),
    }
}
