use crate::codegen::ts_gen::{
  emit_class, emit_dispatch_helper, emit_enum, SERIALIZER_INTERFACE, UTILS_RUNTIME,
};
use crate::dispatch::DispatchTable;
use crate::plan::PlanSet;
use std::fs;
use std::io;
use std::path::PathBuf;

pub struct TypeScriptCodeGenerator {
  options: TypeScriptCodeGeneratorOptions,
}

pub struct TypeScriptCodeGeneratorOptions {
  pub output_dir: PathBuf,
  /* License boilerplate injected verbatim at the top of every file */
  pub license_header: Option<String>,
}

impl Default for TypeScriptCodeGeneratorOptions {
  fn default() -> Self {
    Self {
      output_dir: PathBuf::from("."),
      license_header: None,
    }
  }
}

impl TypeScriptCodeGenerator {
  pub fn new(options: TypeScriptCodeGeneratorOptions) -> Self {
    Self { options }
  }

  /* Render every plan to its own file, plus the dispatch helpers and the
     static runtime support files. Returns the written paths. */
  pub fn emit_code(&self, plans: &PlanSet, tables: &[DispatchTable]) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(&self.options.output_dir)?;
    let mut written = Vec::new();

    for plan in plans.enums.values() {
      self.write_file(&format!("{}.ts", plan.name), &emit_enum(plan), &mut written)?;
    }

    for plan in plans.types.values() {
      self.write_file(&format!("{}.ts", plan.type_name), &emit_class(plan), &mut written)?;
    }

    for table in tables {
      self.write_file(
        &format!("{}Helper.ts", table.header),
        &emit_dispatch_helper(table),
        &mut written,
      )?;
    }

    self.write_file("Serializer.ts", SERIALIZER_INTERFACE, &mut written)?;
    self.write_file("Utils.ts", UTILS_RUNTIME, &mut written)?;

    Ok(written)
  }

  fn write_file(&self, name: &str, content: &str, written: &mut Vec<PathBuf>) -> io::Result<()> {
    let path = self.options.output_dir.join(name);
    let mut output = String::new();
    if let Some(header) = &self.options.license_header {
      output.push_str(header.trim_end());
      output.push_str("\n\n");
    }
    output.push_str(content);
    fs::write(&path, output)?;
    written.push(path);
    Ok(())
  }
}
