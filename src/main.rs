// SPDX-License-Identifier: PMPL-1.0-or-later

//! taintseed: generate taint models from declarative model queries
//!
//! Feeds a rule file (or directory of rule files) and an externally
//! resolved callable index through the query engine, then prints or
//! persists the resulting models.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taintseed::config;
use taintseed::driver::run_all_rules;
use taintseed::engine::{GenerationContext, RecordingSink};
use taintseed::model::{FilterContext, ResultMap, SeedModelBuilder};
use taintseed::report;
use taintseed::resolver::{AnnotationParser, IndexResolver};
use taintseed::schedule::{RayonScheduler, SequentialScheduler};

#[derive(Parser)]
#[command(name = "taintseed")]
#[command(version = "0.3.0")]
#[command(about = "Generate taint models from declarative model queries")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all model queries against a callable index
    Generate {
        /// Rule file, or directory of rule files (YAML/JSON)
        #[arg(short, long, value_name = "RULES")]
        rules: PathBuf,

        /// Callable index JSON produced by the resolver
        #[arg(short, long, value_name = "INDEX")]
        index: PathBuf,

        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print each rule match as it is observed
        #[arg(short, long)]
        verbose: bool,

        /// Disable the parallel scheduler
        #[arg(long)]
        sequential: bool,

        /// Retain only these source labels
        #[arg(long, value_delimiter = ',')]
        keep_sources: Option<Vec<String>>,

        /// Retain only these sink labels
        #[arg(long, value_delimiter = ',')]
        keep_sinks: Option<Vec<String>>,
    },

    /// Load and validate rule files without running them
    Validate {
        /// Rule file, or directory of rule files (YAML/JSON)
        #[arg(value_name = "RULES")]
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            rules,
            index,
            output,
            verbose,
            sequential,
            keep_sources,
            keep_sinks,
        } => {
            let rules = config::load_rules(&rules)?;
            let resolver = IndexResolver::load(&index)?;
            println!(
                "Loaded {} rules against {} callables",
                rules.len(),
                resolver.universe().len()
            );

            let parser = AnnotationParser::new();
            let builder = SeedModelBuilder::new();

            // The allow-list is computed once, before any chunk runs.
            let mut filter = FilterContext::retain_all();
            if let Some(sources) = keep_sources {
                filter = filter.with_sources(sources);
            }
            if let Some(sinks) = keep_sinks {
                filter = filter.with_sinks(sinks);
            }

            let sink = if verbose {
                RecordingSink::verbose()
            } else {
                RecordingSink::new()
            };
            let context = GenerationContext {
                resolver: &resolver,
                parser: &parser,
                builder: &builder,
                filter: &filter,
                sink: &sink,
            };

            let result = if sequential {
                run_all_rules(
                    &rules,
                    resolver.universe(),
                    ResultMap::new(),
                    &context,
                    &SequentialScheduler::new(),
                )?
            } else {
                run_all_rules(
                    &rules,
                    resolver.universe(),
                    ResultMap::new(),
                    &context,
                    &RayonScheduler::new(),
                )?
            };

            let notices = sink.take();
            let generation =
                report::build_report(&rules, resolver.universe().len(), &result, &notices);
            report::print_summary(&generation, false);

            if let Some(output_path) = output {
                report::write_report(&generation, &output_path)?;
                println!("Report saved to: {}", output_path.display());
            }
        }

        Commands::Validate { rules } => {
            let loaded = config::load_rules(&rules)?;
            println!("{} rules OK", loaded.len());
            for rule in &loaded {
                println!(
                    "  {:<40} {:?} ({} constraints, {} productions)",
                    rule.display_name(),
                    rule.kind,
                    rule.query.len(),
                    rule.productions.len()
                );
            }
        }
    }

    Ok(())
}
