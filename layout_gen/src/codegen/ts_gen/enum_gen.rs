use super::helpers::indent;
use crate::plan::EnumPlan;

/* Emit one generated enum from its value-set plan. */
pub fn emit_enum(plan: &EnumPlan) -> String {
  let mut lines: Vec<String> = Vec::new();

  let comment = plan.comment.clone().unwrap_or_else(|| plan.name.clone());
  lines.push("/**".to_string());
  lines.push(format!(" * {}", comment));
  lines.push(" */".to_string());
  lines.push(format!("export enum {} {{", plan.name));

  for member in &plan.members {
    let comment = member.comment.clone().unwrap_or_else(|| member.name.clone());
    lines.push(indent("/**", 1));
    lines.push(indent(&format!(" * {}", comment), 1));
    lines.push(indent(" */", 1));
    lines.push(indent(&format!("{} = {},", member.name, member.value), 1));
  }

  lines.push("}".to_string());
  let mut out = lines.join("\n");
  out.push('\n');
  out
}
