// SPDX-License-Identifier: PMPL-1.0-or-later

//! Model query rule files: loading and validation.
//!
//! Rules arrive as YAML or JSON, either one file or a directory tree of
//! them. Loading is strict: a pattern that does not compile or a file
//! that does not parse is a configuration error and fails the whole run
//! before any callable is scheduled.

use crate::types::{Constraint, Rule};
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// On-disk shape of a rule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub queries: Vec<Rule>,
}

/// Load rules from a file, or from every rule file under a directory
/// (deterministic path order).
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let rules = if path.is_dir() {
        let mut collected = Vec::new();
        let mut walker: Vec<_> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_rule_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        walker.sort();
        if walker.is_empty() {
            bail!("no rule files found under {}", path.display());
        }
        for file in walker {
            collected.extend(load_rule_file(&file)?);
        }
        collected
    } else {
        load_rule_file(path)?
    };

    validate_rules(&rules)?;
    Ok(rules)
}

fn is_rule_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

fn load_rule_file(path: &Path) -> Result<Vec<Rule>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading rule file {}", path.display()))?;

    let file: RuleFile = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing yaml rules {}", path.display()))?,
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("parsing json rules {}", path.display()))?,
        other => {
            return Err(anyhow!(
                "unsupported rule file extension {:?}: {}",
                other.unwrap_or(""),
                path.display()
            ))
        }
    };

    Ok(file.queries)
}

/// Reject configuration the evaluator would later die on: every name
/// pattern must compile, including those nested under `any_of`.
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
    for rule in rules {
        for constraint in &rule.query {
            validate_constraint(constraint)
                .with_context(|| format!("in rule {}", rule.display_name()))?;
        }
    }
    Ok(())
}

fn validate_constraint(constraint: &Constraint) -> Result<()> {
    match constraint {
        Constraint::Name(pattern) => {
            Regex::new(pattern)
                .with_context(|| format!("invalid name constraint pattern: {pattern:?}"))?;
            Ok(())
        }
        Constraint::Return(_) | Constraint::AnyParameter(_) => Ok(()),
        Constraint::AnyOf(alternatives) => {
            for alternative in alternatives {
                validate_constraint(alternative)?;
            }
            Ok(())
        }
    }
}
