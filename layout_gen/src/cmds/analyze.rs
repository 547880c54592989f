/* Analyze command - show resolved parameters and operation plans */

use super::common::{analyze_and_plan, load_model};
use crate::dispatch::build_dispatch_tables;
use anyhow::{bail, Result};
use std::path::PathBuf;

/* Execute the analyze command */
pub fn run(files: Vec<PathBuf>, print_plans: bool, type_name: Option<String>) -> Result<()> {
  let (model, _) = load_model(&files)?;

  println!("[~] Loaded {} definition(s)", model.len());
  for typedef in model.definitions() {
    let shape = if typedef.is_enum() {
      format!("enum, {} value(s)", typedef.values.len())
    } else {
      format!("{} field(s)", typedef.layout.len())
    };
    let marker = if model.is_marker(&typedef.name) { " [marker]" } else { "" };
    println!("    - {} ({}){}", typedef.name, shape, marker);
  }

  let plans = analyze_and_plan(&model, true)?;

  let tables = build_dispatch_tables(&model);
  for table in &tables {
    println!(
      "[~] Dispatch family '{}': {} concrete type(s)",
      table.header,
      table.entries.len()
    );
    for entry in &table.entries {
      println!(
        "    - ({}, {}) -> {}",
        entry.type_code, entry.version, entry.type_name
      );
    }
  }

  if let Some(type_name) = type_name {
    match plans.type_plan(&type_name) {
      Some(plan) => println!("{}", serde_json::to_string_pretty(plan)?),
      None => match plans.enum_plan(&type_name) {
        Some(plan) => println!("{}", serde_json::to_string_pretty(plan)?),
        None => bail!("no plan for type '{}'", type_name),
      },
    }
  } else if print_plans {
    println!("{}", serde_json::to_string_pretty(&plans)?);
  }

  Ok(())
}
