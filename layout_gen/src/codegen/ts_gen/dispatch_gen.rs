use super::helpers::{indent, to_camel};
use crate::dispatch::DispatchTable;

/* Emit the per-family dispatch helper: decode the common header, match the
   declared (type-code, version) pairs, fall back to the header itself. */
pub fn emit_dispatch_helper(table: &DispatchTable) -> String {
  let mut lines: Vec<String> = Vec::new();

  let mut imports: Vec<&str> = table.entries.iter().map(|e| e.type_name.as_str()).collect();
  imports.push(table.header.as_str());
  imports.sort();
  imports.dedup();
  for import in imports {
    lines.push(format!("import {{ {} }} from './{}';", import, import));
  }
  lines.push(String::new());

  lines.push(format!("export class {}Helper {{", table.header));
  lines.push(indent(
    &format!(
      "public static deserialize(payload: Uint8Array): {} {{",
      table.header
    ),
    1,
  ));
  lines.push(indent(
    &format!("const header = {}.deserialize(payload);", table.header),
    2,
  ));

  let type_field = to_camel(&table.type_field);
  let version_field = to_camel(&table.version_field);
  for entry in &table.entries {
    lines.push(indent(
      &format!(
        "if (header.{} === {} && header.{} === {}) {{",
        type_field, entry.type_code, version_field, entry.version
      ),
      2,
    ));
    lines.push(indent(
      &format!("return {}.deserialize(payload);", entry.type_name),
      3,
    ));
    lines.push(indent("}", 2));
  }

  lines.push(indent("return header;", 2));
  lines.push(indent("}", 1));
  lines.push("}".to_string());

  let mut out = lines.join("\n");
  out.push('\n');
  out
}
