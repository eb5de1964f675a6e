// SPDX-License-Identifier: PMPL-1.0-or-later

//! Production application: turn a matched callable into (target, taint)
//! pairs.
//!
//! Productions are independent of each other; their contributions simply
//! concatenate in production order. Addressing a parameter that does not
//! exist contributes nothing — rules are written generically across
//! callables with heterogeneous signatures, so a missing target is not an
//! error. Duplicate pairs are legal and are collapsed later by model
//! joining.

use crate::types::{AnnotationTarget, Definition, Parameter, Production, TaintAnnotation};

/// Seed pair emitted by a production: where the taint attaches, and what.
pub type AnnotationPair = (AnnotationTarget, TaintAnnotation);

/// Apply a rule's productions to a callable's resolved definition.
/// An unresolvable definition yields an empty list.
pub fn apply_productions(
    productions: &[Production],
    definition: Option<&Definition>,
) -> Vec<AnnotationPair> {
    let Some(definition) = definition else {
        return Vec::new();
    };

    let parameters = &definition.parameters;
    let mut pairs = Vec::new();

    for production in productions {
        match production {
            Production::ReturnTaint(taints) => {
                pairs.extend(
                    taints
                        .iter()
                        .map(|taint| (AnnotationTarget::Return, taint.clone())),
                );
            }
            Production::ParameterTaint { name, taint } => {
                if let Some(parameter) = parameters.iter().find(|p| &p.name == name) {
                    extend_for_parameter(&mut pairs, parameter, taint);
                }
            }
            Production::PositionalParameterTaint { index, taint } => {
                if let Some(parameter) = parameters.iter().find(|p| is_positional_at(p, *index)) {
                    extend_for_parameter(&mut pairs, parameter, taint);
                }
            }
            Production::AllParametersTaint(taints) => {
                for parameter in parameters {
                    extend_for_parameter(&mut pairs, parameter, taints);
                }
            }
        }
    }

    pairs
}

fn extend_for_parameter(
    pairs: &mut Vec<AnnotationPair>,
    parameter: &Parameter,
    taints: &[TaintAnnotation],
) {
    pairs.extend(taints.iter().map(|taint| {
        (
            AnnotationTarget::Parameter(parameter.root.clone()),
            taint.clone(),
        )
    }));
}

fn is_positional_at(parameter: &Parameter, wanted: usize) -> bool {
    matches!(
        parameter.root,
        crate::types::ParameterRoot::Positional { index, .. } if index == wanted
    )
}
