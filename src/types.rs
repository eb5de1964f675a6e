// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions for taintseed
//!
//! The data model mirrors what the surrounding analysis hands us: callables
//! with normalized parameter addressing, user-authored model queries
//! (constraints plus productions), and the taint annotations the engine
//! routes into models. Everything here is immutable once loaded.

use serde::{Deserialize, Serialize};

/// Kinds of targets the resolver can surface. Only functions and methods
/// are eligible for model queries; classes and module globals exist in the
/// callable universe but are dropped before scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallableKind {
    Function,
    Method,
    Class,
    Global,
}

/// A function or method identified by the analyzed program's resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Callable {
    pub kind: CallableKind,
    /// Fully-qualified name, e.g. `app.views.login` or `app.Session.close`.
    pub name: String,
}

impl Callable {
    pub fn function(name: &str) -> Self {
        Self {
            kind: CallableKind::Function,
            name: name.to_string(),
        }
    }

    pub fn method(name: &str) -> Self {
        Self {
            kind: CallableKind::Method,
            name: name.to_string(),
        }
    }

    /// The fully-qualified external name tested by name constraints.
    pub fn external_name(&self) -> &str {
        &self.name
    }

    /// Whether this callable can ever receive a model.
    pub fn is_modelable(&self) -> bool {
        matches!(self.kind, CallableKind::Function | CallableKind::Method)
    }
}

impl std::fmt::Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Normalized address of a parameter within a signature.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRoot {
    /// Ordinary positional parameter at index N.
    Positional { index: usize, name: String },
    /// Keyword-only parameter addressed by name.
    Keyword { name: String },
    /// Starred variadic parameter (`*args`) at index N.
    Variadic { index: usize },
    /// Double-starred parameter (`**kwargs`).
    KeywordVariadic,
}

/// One parameter of a resolved definition. `name` is the normalized
/// (star-stripped) name used by named-parameter productions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub root: ParameterRoot,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl Parameter {
    pub fn positional(index: usize, name: &str, annotation: Option<&str>) -> Self {
        Self {
            root: ParameterRoot::Positional {
                index,
                name: name.to_string(),
            },
            name: name.to_string(),
            annotation: annotation.map(str::to_string),
        }
    }

    pub fn keyword(name: &str, annotation: Option<&str>) -> Self {
        Self {
            root: ParameterRoot::Keyword {
                name: name.to_string(),
            },
            name: name.to_string(),
            annotation: annotation.map(str::to_string),
        }
    }

    pub fn variadic(index: usize, name: &str) -> Self {
        Self {
            root: ParameterRoot::Variadic { index },
            name: name.to_string(),
            annotation: None,
        }
    }

    pub fn keyword_variadic(name: &str) -> Self {
        Self {
            root: ParameterRoot::KeywordVariadic,
            name: name.to_string(),
            annotation: None,
        }
    }
}

/// A resolved signature: parameters plus an optional raw return annotation.
/// Owned by the external resolver; the engine only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
}

/// Structured form of a raw type annotation, as produced by the type parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedType {
    /// The explicit-annotation wrapper type.
    Annotated(Box<ParsedType>),
    /// Any other named type shape.
    Named(String),
}

impl ParsedType {
    pub fn is_annotated(&self) -> bool {
        matches!(self, ParsedType::Annotated(_))
    }
}

/// What a taint annotation seeds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaintKind {
    Source,
    Sink,
    Sanitizer,
}

impl std::fmt::Display for TaintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaintKind::Source => write!(f, "Source"),
            TaintKind::Sink => write!(f, "Sink"),
            TaintKind::Sanitizer => write!(f, "Sanitizer"),
        }
    }
}

/// An opaque taint payload: routed into models, never interpreted here.
/// The label names a source/sink/sanitizer defined by the downstream
/// dataflow analysis (e.g. `UserControlled`, `SqlInjection`).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TaintAnnotation {
    pub kind: TaintKind,
    pub label: String,
}

impl TaintAnnotation {
    pub fn source(label: &str) -> Self {
        Self {
            kind: TaintKind::Source,
            label: label.to_string(),
        }
    }

    pub fn sink(label: &str) -> Self {
        Self {
            kind: TaintKind::Sink,
            label: label.to_string(),
        }
    }

    pub fn sanitizer(label: &str) -> Self {
        Self {
            kind: TaintKind::Sanitizer,
            label: label.to_string(),
        }
    }
}

impl std::fmt::Display for TaintAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.kind, self.label)
    }
}

/// Where in a model a taint annotation is attached.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationTarget {
    Return,
    Parameter(ParameterRoot),
}

/// Test applied to a parsed type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationConstraint {
    /// True iff the parsed type is wrapped in the explicit-annotation marker.
    IsAnnotatedType,
}

/// One node of a rule's constraint tree. The tree is finite and acyclic;
/// evaluation is a total structural match over this closed set of variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Regex tested against the callable's fully-qualified name.
    Name(String),
    /// Test on the parsed return annotation.
    Return(AnnotationConstraint),
    /// True if any annotated parameter's parsed type satisfies the test.
    AnyParameter(AnnotationConstraint),
    /// Logical OR over child constraints.
    AnyOf(Vec<Constraint>),
}

/// Which callable kinds a rule applies to. The gate is checked before any
/// constraint is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    FunctionModel,
    MethodModel,
}

impl RuleKind {
    pub fn admits(&self, kind: CallableKind) -> bool {
        matches!(
            (self, kind),
            (RuleKind::FunctionModel, CallableKind::Function)
                | (RuleKind::MethodModel, CallableKind::Method)
        )
    }
}

/// What taint to attach once a rule has matched a callable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Production {
    /// One (Return, taint) pair per annotation.
    ReturnTaint(Vec<TaintAnnotation>),
    /// Addresses the first parameter with a matching normalized name.
    ParameterTaint {
        name: String,
        taint: Vec<TaintAnnotation>,
    },
    /// Addresses the first parameter rooted at positional index N.
    PositionalParameterTaint {
        index: usize,
        taint: Vec<TaintAnnotation>,
    },
    /// Every parameter crossed with every annotation.
    AllParametersTaint(Vec<TaintAnnotation>),
}

/// A user-authored model query: kind gate, AND-combined constraint list,
/// and the productions applied on a match. Loaded once from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "where")]
    pub query: Vec<Constraint>,
    #[serde(rename = "model")]
    pub productions: Vec<Production>,
}

impl Rule {
    /// Display name for diagnostics: the configured name or a placeholder.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed rule>")
    }
}
