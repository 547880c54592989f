/* Shared command plumbing: document loading, up-front reference checks and
   per-type plan building with collected failures. */

use crate::graph::ReferenceGraph;
use crate::model::SchemaModel;
use crate::plan::{build_plans, PlanSet};
use anyhow::{Context, Result};
use layout_loader::SchemaOptions;
use std::path::PathBuf;

/* Load schema documents and build the in-memory model. Options from the
   primary document ride along for the emission layer. */
pub fn load_model(files: &[PathBuf]) -> Result<(SchemaModel, SchemaOptions)> {
  let loaded = layout_loader::load_files(files)?;
  let options = loaded.options.clone();
  Ok((SchemaModel::from_loaded(loaded), options))
}

/* Validate references up front, then build every plan. A malformed type is
   reported and skipped; the rest of the schema keeps compiling. */
pub fn analyze_and_plan(model: &SchemaModel, verbose: bool) -> Result<PlanSet> {
  let graph = ReferenceGraph::build(model);
  for error in graph.unknown_references(model) {
    eprintln!("Warning: {}", error);
  }
  graph
    .emission_order()
    .context("schema contains a reference cycle")?;

  let (plans, failures) = build_plans(model);
  for (type_name, error) in &failures {
    eprintln!("Warning: skipping '{}': {}", type_name, error);
  }

  if verbose {
    println!(
      "[~] Planned {} type(s) and {} enum(s), {} failure(s)",
      plans.types.len(),
      plans.enums.len(),
      failures.len()
    );
  }

  Ok(plans)
}
