// SPDX-License-Identifier: PMPL-1.0-or-later

//! Run report: what was generated, for which callables, by which rules.
//!
//! Purely observational — built after the result map is final, printed as
//! a terminal summary and optionally persisted as JSON.

use crate::engine::MatchNotice;
use crate::model::ResultMap;
use crate::types::{AnnotationTarget, CallableKind, Rule, TaintAnnotation};
use anyhow::Result;
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete report of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub created_at: String,
    pub rules_evaluated: usize,
    pub callables_considered: usize,
    pub models_generated: usize,
    pub total_annotations: usize,
    pub rule_matches: Vec<RuleMatchCount>,
    pub models: Vec<ModelSummary>,
}

/// How many callables one rule selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMatchCount {
    pub rule: String,
    pub matches: usize,
}

/// Serializable projection of one callable's model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub callable: String,
    pub kind: CallableKind,
    pub seeds: Vec<SeedRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRecord {
    pub target: AnnotationTarget,
    pub taints: Vec<TaintAnnotation>,
}

/// Assemble the report from a finished run.
pub fn build_report(
    rules: &[Rule],
    callables_considered: usize,
    result: &ResultMap,
    notices: &[MatchNotice],
) -> GenerationReport {
    // Per-rule counts in rule list order, zero-match rules included.
    let rule_matches = rules
        .iter()
        .map(|rule| {
            let name = rule.display_name();
            RuleMatchCount {
                rule: name.to_string(),
                matches: notices.iter().filter(|n| n.rule == name).count(),
            }
        })
        .collect();

    let mut models: Vec<ModelSummary> = result
        .iter()
        .map(|(callable, model)| ModelSummary {
            callable: callable.name.clone(),
            kind: callable.kind,
            seeds: model
                .taints()
                .iter()
                .map(|(target, taints)| SeedRecord {
                    target: target.clone(),
                    taints: taints.iter().cloned().collect(),
                })
                .collect(),
        })
        .collect();
    models.sort_by(|a, b| a.callable.cmp(&b.callable));

    let total_annotations = result.values().map(|m| m.annotation_count()).sum();

    GenerationReport {
        created_at: chrono::Utc::now().to_rfc3339(),
        rules_evaluated: rules.len(),
        callables_considered,
        models_generated: result.len(),
        total_annotations,
        rule_matches,
        models,
    }
}

/// Print a summary table to the terminal.
pub fn print_summary(report: &GenerationReport, quiet: bool) {
    if quiet {
        return;
    }

    println!("\n{}", "=== MODEL GENERATION SUMMARY ===".bold().cyan());
    println!(
        "Rules: {}  |  Callables considered: {}  |  Models: {}  |  Annotations: {}",
        report.rules_evaluated,
        report.callables_considered,
        report.models_generated,
        report.total_annotations
    );
    println!();

    if !report.rule_matches.is_empty() {
        println!("{}", "RULE MATCHES".bold().yellow());
        for entry in &report.rule_matches {
            let count = if entry.matches == 0 {
                entry.matches.to_string().normal()
            } else {
                entry.matches.to_string().green()
            };
            println!("  {:<40} {:>6}", entry.rule, count);
        }
        println!();
    }

    if report.models.is_empty() {
        println!("  No models generated.");
        return;
    }

    println!("{}", "MODELS".bold().yellow());
    println!("  {:<50} {:>10} {:>8}", "Callable", "Kind", "Seeds");
    println!("  {}", "-".repeat(70));
    for model in report.models.iter().take(20) {
        let seed_count: usize = model.seeds.iter().map(|s| s.taints.len()).sum();
        println!(
            "  {:<50} {:>10} {:>8}",
            model.callable,
            format!("{:?}", model.kind),
            seed_count
        );
    }
    if report.models.len() > 20 {
        println!("  ... and {} more callables", report.models.len() - 20);
    }
    println!();
}

/// Write the report as pretty JSON.
pub fn write_report(report: &GenerationReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
