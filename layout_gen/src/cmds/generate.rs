/* Generate command - emit code from layout schema definitions */

use super::common::{analyze_and_plan, load_model};
use crate::codegen::ts::{TypeScriptCodeGenerator, TypeScriptCodeGeneratorOptions};
use crate::dispatch::build_dispatch_tables;
use anyhow::{Context, Result};
use std::path::PathBuf;

/* Execute the generate command */
pub fn run(files: Vec<PathBuf>, output_dir: PathBuf, verbose: bool) -> Result<()> {
  if verbose {
    println!("Layout Generator - Code Generation Tool");
    println!("=======================================\n");
    println!("[~] Configuration:");
    println!("  Output directory: {}", output_dir.display());
    println!("  Input files: {}", files.len());
    for file in &files {
      println!("    - {}", file.display());
    }
    println!();
  }

  let (model, options) = load_model(&files)?;
  let plans = analyze_and_plan(&model, verbose)?;
  let tables = build_dispatch_tables(&model);

  let license_header = match &options.license_header {
    Some(path) => Some(
      std::fs::read_to_string(path)
        .with_context(|| format!("failed to read license header {}", path.display()))?,
    ),
    None => None,
  };

  let generator = TypeScriptCodeGenerator::new(TypeScriptCodeGeneratorOptions {
    output_dir: output_dir.clone(),
    license_header,
  });
  let written = generator
    .emit_code(&plans, &tables)
    .context("failed to write generated code")?;

  if verbose {
    for path in &written {
      println!("    - {}", path.display());
    }
  }
  println!(
    "[✓] Generated {} file(s) in {}",
    written.len(),
    output_dir.display()
  );
  Ok(())
}
