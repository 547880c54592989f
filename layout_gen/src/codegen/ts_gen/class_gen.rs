use super::helpers::{
  apply_condition, condition_expr, indent, to_camel, ts_type, uint_reader, uint_writer, write_lines,
};
use crate::plan::{ConstructorStep, DecodeStep, EncodeStep, SizeTermKind, TypePlan};
use crate::resolve::{BytesLen, CountSource, DerivedLen, InlineRole, ResolvedParameter, TargetKind};

/* Emit one generated class: public fields, constructor, deserialize, size
   getter and serialize, rendered from the type's operation plans. */
pub fn emit_class(plan: &TypePlan) -> String {
  let mut lines: Vec<String> = Vec::new();

  write_lines(emit_imports(plan), &mut lines);
  lines.push(String::new());
  write_lines(emit_params_interface(plan), &mut lines);
  write_lines(emit_class_header(plan), &mut lines);
  write_lines(emit_public_fields(plan), &mut lines);
  write_lines(emit_constructor(plan), &mut lines);
  write_lines(emit_deserializer(plan), &mut lines);
  write_lines(emit_size_getter(plan), &mut lines);
  write_lines(emit_serializer(plan), &mut lines);
  lines.push("}".to_string());

  let mut out = lines.join("\n");
  out.push('\n');
  out
}

fn comment_block(text: &str, indent_count: usize) -> Vec<String> {
  vec![
    indent("/**", indent_count),
    indent(&format!(" * {}", text), indent_count),
    indent(" */", indent_count),
  ]
}

fn emit_imports(plan: &TypePlan) -> Vec<String> {
  let mut imports: Vec<String> = plan.references.iter().cloned().collect();
  imports.push("Serializer".to_string());
  imports.push("Utils".to_string());
  imports.sort();
  imports.dedup();
  imports
    .iter()
    .map(|name| format!("import {{ {} }} from './{}';", name, name))
    .collect()
}

fn emit_params_interface(plan: &TypePlan) -> Vec<String> {
  if plan.interface.len() <= 1 {
    return Vec::new();
  }
  let mut lines = vec![format!("export interface {}Params {{", plan.type_name)];
  for entry in &plan.interface {
    let comment = entry.comment.clone().unwrap_or_else(|| to_camel(&entry.name));
    write_lines(comment_block(&comment, 1), &mut lines);
    lines.push(indent(
      &format!(
        "{}{}: {};",
        to_camel(&entry.name),
        if entry.optional { "?" } else { "" },
        ts_type(&entry.target)
      ),
      1,
    ));
  }
  lines.push("}".to_string());
  lines.push(String::new());
  lines
}

fn emit_class_header(plan: &TypePlan) -> Vec<String> {
  let mut lines = Vec::new();
  let comment = plan.comment.clone().unwrap_or_else(|| plan.type_name.clone());
  write_lines(comment_block(&comment, 0), &mut lines);
  match &plan.base {
    Some(base) => lines.push(format!(
      "export class {} extends {} implements Serializer {{",
      plan.type_name, base
    )),
    None => lines.push(format!("export class {} implements Serializer {{", plan.type_name)),
  }
  lines
}

fn optional_mark(param: &ResolvedParameter) -> &'static str {
  if param.condition.is_some() {
    "!"
  } else {
    ""
  }
}

fn emit_public_fields(plan: &TypePlan) -> Vec<String> {
  let mut lines = Vec::new();
  for param in &plan.parameters {
    if !param.declarable || param.inline_role == Some(InlineRole::Base) {
      continue;
    }
    let comment = param.comment.clone().unwrap_or_else(|| to_camel(&param.name));
    write_lines(comment_block(&comment, 1), &mut lines);
    lines.push(indent(
      &format!(
        "public readonly {}{}: {};",
        to_camel(&param.name),
        if param.condition.is_some() { "?" } else { "" },
        ts_type(&param.target)
      ),
      1,
    ));
  }
  lines.push(String::new());
  lines
}

fn group_args(fields: &[String]) -> String {
  let names: Vec<String> = fields.iter().map(|f| to_camel(f)).collect();
  if names.len() == 1 {
    names[0].clone()
  } else {
    format!("{{ {} }}", names.join(", "))
  }
}

fn emit_constructor(plan: &TypePlan) -> Vec<String> {
  let mut lines = Vec::new();
  write_lines(comment_block("Constructor", 1), &mut lines);

  if plan.interface.len() == 1 {
    let entry = &plan.interface[0];
    lines.push(indent(
      &format!(
        "constructor({}: {}) {{",
        to_camel(&entry.name),
        ts_type(&entry.target)
      ),
      1,
    ));
  } else {
    let names: Vec<String> = plan.interface.iter().map(|f| to_camel(&f.name)).collect();
    lines.push(indent(
      &format!(
        "constructor({{ {} }}: {}Params) {{",
        names.join(", "),
        plan.type_name
      ),
      1,
    ));
  }

  for step in &plan.constructor {
    match step {
      ConstructorStep::DelegateBase { fields, .. } => {
        lines.push(indent(&format!("super({});", group_args(fields)), 2));
      }
      ConstructorStep::ConstructGroup {
        param,
        type_name,
        fields,
      } => {
        lines.push(indent(
          &format!(
            "this.{} = new {}({});",
            to_camel(param),
            type_name,
            group_args(fields)
          ),
          2,
        ));
      }
      ConstructorStep::AssignField { param } => {
        let name = to_camel(param);
        lines.push(indent(&format!("this.{} = {};", name, name), 2));
      }
    }
  }

  lines.push(indent("}", 1));
  lines.push(String::new());
  lines
}

/* Expression reading one fixed-shape value from `argument`, plus the cursor
   advance expression. Arrays are handled separately. */
fn read_expr(target: &TargetKind, argument: &str) -> (String, String) {
  match target {
    TargetKind::UInt { width } => (uint_reader(*width, argument), width.to_string()),
    TargetKind::BigInt => (format!("Utils.bufferToBigInt({})", argument), "8".to_string()),
    TargetKind::Bytes { len } => match len {
      BytesLen::Fixed(width) => (
        format!("Utils.getBytes({}, {})", argument, width),
        width.to_string(),
      ),
      BytesLen::FromField(source) => (
        format!("Utils.getBytes({}, {})", argument, to_camel(source)),
        to_camel(source),
      ),
      BytesLen::Remaining => (
        format!("Utils.getBytes({}, byteArray.length)", argument),
        "byteArray.length".to_string(),
      ),
    },
    TargetKind::EnumRef {
      type_name,
      width,
      flags,
    } => {
      if *flags {
        (
          format!("Utils.toFlags({}, {})", type_name, uint_reader(*width, argument)),
          width.to_string(),
        )
      } else {
        (uint_reader(*width, argument), width.to_string())
      }
    }
    TargetKind::StructRef { type_name } => {
      (format!("{}.deserialize({})", type_name, argument), String::new())
    }
    TargetKind::Array { .. } => unreachable!("array reads are emitted separately"),
  }
}

fn array_read_lines(name: &str, target: &TargetKind) -> Vec<String> {
  let (element, count, alignment) = match target {
    TargetKind::Array {
      element,
      count,
      alignment,
      ..
    } => (element.as_ref(), count, *alignment),
    _ => unreachable!("caller matched on arrays"),
  };

  let mut lines = Vec::new();
  match element {
    TargetKind::EnumRef { width, .. } => {
      let count_expr = match count {
        CountSource::Literal(n) => n.to_string(),
        CountSource::Field(source) => to_camel(source),
        CountSource::ByteLen(source) => format!("{} / {}", to_camel(source), width),
        CountSource::Fill => format!("byteArray.length / {}", width),
      };
      lines.push(format!(
        "const {} = Utils.deserializeEnums(Uint8Array.from(byteArray), {}, {});",
        name, count_expr, width
      ));
      lines.push(format!(
        "byteArray.splice(0, {}.reduce((sum) => sum + {}, 0));",
        name, width
      ));
    }
    TargetKind::StructRef { type_name } => match count {
      CountSource::Fill => {
        lines.push(format!(
          "const {} = Utils.deserializeRemaining({}.deserialize, Uint8Array.from(byteArray), byteArray.length, {});",
          name, type_name, alignment
        ));
        lines.push(format!(
          "byteArray.splice(0, {}.reduce((sum, c) => sum + Utils.getSizeWithPadding(c.size, {}), 0));",
          name, alignment
        ));
      }
      CountSource::ByteLen(source) => {
        lines.push(format!(
          "const {} = Utils.deserializeRemaining({}.deserialize, Utils.getBytes(Uint8Array.from(byteArray), {}), {}, {});",
          name,
          type_name,
          to_camel(source),
          to_camel(source),
          alignment
        ));
        lines.push(format!("byteArray.splice(0, {});", to_camel(source)));
      }
      CountSource::Literal(_) | CountSource::Field(_) => {
        let count_expr = match count {
          CountSource::Literal(n) => n.to_string(),
          CountSource::Field(source) => to_camel(source),
          _ => unreachable!(),
        };
        lines.push(format!(
          "const {} = Utils.deserialize({}.deserialize, Uint8Array.from(byteArray), {});",
          name, type_name, count_expr
        ));
        lines.push(format!(
          "byteArray.splice(0, {}.reduce((sum, c) => sum + c.size, 0));",
          name
        ));
      }
    },
    _ => {
      /* Primitive-element arrays collapse to raw buffers at resolution. */
      lines.push(format!(
        "const {} = Utils.getBytes(Uint8Array.from(byteArray), byteArray.length);",
        name
      ));
      lines.push(format!("byteArray.splice(0, {}.length);", name));
    }
  }
  lines
}

fn emit_deserializer(plan: &TypePlan) -> Vec<String> {
  let mut lines = Vec::new();
  write_lines(
    comment_block(
      &format!("Creates an instance of {} from binary payload", plan.type_name),
      1,
    ),
    &mut lines,
  );
  lines.push(indent(
    &format!(
      "public static deserialize(payload: Uint8Array): {} {{",
      plan.type_name
    ),
    1,
  ));
  lines.push(indent("const byteArray = Array.from(payload);", 2));

  let argument = "Uint8Array.from(byteArray)";
  for step in &plan.deserialize {
    match step {
      DecodeStep::Inline { param, type_name } => {
        let param = plan.parameter(param).expect("plan is self-consistent");
        let var = if param.inline_role == Some(InlineRole::Base) {
          "superObject".to_string()
        } else {
          to_camel(&param.name)
        };
        lines.push(indent(
          &format!("const {} = {}.deserialize({});", var, type_name, argument),
          2,
        ));
        lines.push(indent(&format!("byteArray.splice(0, {}.size);", var), 2));
      }

      DecodeStep::Field { param } => {
        let p = plan.parameter(param).expect("plan is self-consistent");
        let name = to_camel(&p.name);
        let mut body = Vec::new();
        if matches!(p.target, TargetKind::Array { .. }) {
          body.extend(array_read_lines(&name, &p.target));
        } else {
          let (expr, advance) = read_expr(&p.target, argument);
          let advance = if advance.is_empty() {
            format!("{}.size", name)
          } else {
            advance
          };
          body.push(format!("const {} = {};", name, expr));
          body.push(format!("byteArray.splice(0, {});", advance));
        }
        match &p.condition {
          Some(condition) => {
            /* Backward conditions evaluate against already-decoded locals. */
            lines.push(indent(
              &format!("let {}: {} | undefined;", name, ts_type(&p.target)),
              2,
            ));
            let body: Vec<String> = body
              .into_iter()
              .map(|line| line.replacen(&format!("const {} =", name), &format!("{} =", name), 1))
              .collect();
            apply_condition(Some(condition), "", body, 2, &mut lines);
          }
          None => {
            for line in body {
              lines.push(indent(&line, 2));
            }
          }
        }
      }

      DecodeStep::ConstSkip { width, .. } => {
        let reader = match width {
          8 => format!("Utils.bufferToBigInt({});", argument),
          1 | 2 | 4 => format!("{};", uint_reader(*width, argument)),
          _ => format!("Utils.getBytes({}, {});", argument, width),
        };
        lines.push(indent(&reader, 2));
        lines.push(indent(&format!("byteArray.splice(0, {});", width), 2));
      }

      DecodeStep::Placeholder { key, width } => {
        lines.push(indent(
          &format!(
            "const {}Bytes = Utils.getBytes({}, {});",
            to_camel(key),
            argument,
            width
          ),
          2,
        ));
        lines.push(indent(&format!("byteArray.splice(0, {});", width), 2));
      }

      DecodeStep::Deferred { param, key } => {
        let p = plan.parameter(param).expect("plan is self-consistent");
        let name = to_camel(&p.name);
        let placeholder = format!("{}Bytes", to_camel(key));
        lines.push(indent(
          &format!("let {}: {} | undefined;", name, ts_type(&p.target)),
          2,
        ));
        let (expr, _) = read_expr(&p.target, &placeholder);
        apply_condition(
          p.condition.as_ref(),
          "",
          vec![format!("{} = {};", name, expr)],
          2,
          &mut lines,
        );
      }
    }
  }

  write_lines(emit_return(plan), &mut lines);
  lines.push(indent("}", 1));
  lines.push(String::new());
  lines
}

fn emit_return(plan: &TypePlan) -> Vec<String> {
  if plan.interface.len() == 1 {
    return vec![indent(
      &format!(
        "return new {}({});",
        plan.type_name,
        to_camel(&plan.interface[0].name)
      ),
      2,
    )];
  }

  let mut args = Vec::new();
  for entry in &plan.interface {
    let name = to_camel(&entry.name);
    let value = match &entry.group {
      Some(group) => {
        let owner = plan.parameter(group).expect("plan is self-consistent");
        if owner.inline_role == Some(InlineRole::Base) {
          format!("superObject.{}", name)
        } else {
          format!("{}.{}", to_camel(group), name)
        }
      }
      None => name.clone(),
    };
    args.push(format!("{}: {}", name, value));
  }
  vec![indent(
    &format!("return new {}({{ {} }});", plan.type_name, args.join(", ")),
    2,
  )]
}

fn emit_size_getter(plan: &TypePlan) -> Vec<String> {
  let mut lines = Vec::new();
  write_lines(comment_block("Gets the size of the object", 1), &mut lines);
  lines.push(indent("public get size(): number {", 1));

  /* Fixed-shape single-field types report their literal width. */
  if plan.size.len() == 1 && plan.size[0].guard.is_none() {
    if let SizeTermKind::Literal(width) = plan.size[0].kind {
      lines.push(indent(&format!("return {};", width), 2));
      lines.push(indent("}", 1));
      lines.push(String::new());
      return lines;
    }
  }

  lines.push(indent("let size = 0;", 2));
  for term in &plan.size {
    let param = plan.parameter(&term.param).expect("plan is self-consistent");
    let accessor = format!("this.{}{}", to_camel(&term.param), optional_mark(param));
    let expr = match &term.kind {
      SizeTermKind::Literal(width) => width.to_string(),
      SizeTermKind::InlineSize { .. } => {
        if param.inline_role == Some(InlineRole::Base) {
          "super.size".to_string()
        } else {
          format!("{}.size", accessor)
        }
      }
      SizeTermKind::NestedSize => format!("{}.size", accessor),
      SizeTermKind::BytesLen => format!("{}.length", accessor),
      SizeTermKind::ArrayPadded { alignment } => format!(
        "{}.reduce((sum, c) => sum + Utils.getSizeWithPadding(c.size, {}), 0)",
        accessor, alignment
      ),
      SizeTermKind::ArrayFixed { element_width } => {
        format!("{}.reduce((sum) => sum + {}, 0)", accessor, element_width)
      }
      SizeTermKind::ArrayCount => format!("{}.length", accessor),
    };
    apply_condition(
      term.guard.as_ref(),
      "this.",
      vec![format!("size += {}; // {}", expr, to_camel(&term.param))],
      2,
      &mut lines,
    );
  }
  lines.push(indent("return size;", 2));
  lines.push(indent("}", 1));
  lines.push(String::new());
  lines
}

fn emit_serializer(plan: &TypePlan) -> Vec<String> {
  let mut lines = Vec::new();
  write_lines(comment_block("Serializes an object to bytes", 1), &mut lines);
  lines.push(indent("public serialize(): Uint8Array {", 1));
  lines.push(indent("let newArray = new Uint8Array();", 2));

  for step in &plan.serialize {
    match step {
      EncodeStep::Inline { param, .. } => {
        let p = plan.parameter(param).expect("plan is self-consistent");
        if p.inline_role == Some(InlineRole::Base) {
          lines.push(indent("const superBytes = super.serialize();", 2));
          lines.push(indent(
            "newArray = Utils.concatTypedArrays(newArray, superBytes);",
            2,
          ));
        } else {
          let name = to_camel(&p.name);
          lines.push(indent(
            &format!("const {}Bytes = this.{}.serialize();", name, name),
            2,
          ));
          lines.push(indent(
            &format!("newArray = Utils.concatTypedArrays(newArray, {}Bytes);", name),
            2,
          ));
        }
      }

      EncodeStep::Const { param, width, value } => {
        let p = plan.parameter(param).expect("plan is self-consistent");
        let expr = match width {
          8 => format!("Utils.bigIntToBuffer({}n)", value),
          _ => uint_writer(*width, &value.to_string()),
        };
        let name = to_camel(param);
        let body = vec![
          format!("const {}Bytes = {};", name, expr),
          format!("newArray = Utils.concatTypedArrays(newArray, {}Bytes);", name),
        ];
        apply_condition(p.condition.as_ref(), "this.", body, 2, &mut lines);
      }

      EncodeStep::DerivedLen { param, width, source } => {
        let p = plan.parameter(param).expect("plan is self-consistent");
        let length_expr = match source {
          DerivedLen::Count { field } => format!("this.{}.length", to_camel(field)),
          DerivedLen::ByteLen { field } => {
            let array = plan.parameter(field).expect("plan is self-consistent");
            let alignment = match &array.target {
              TargetKind::Array { alignment, .. } => *alignment,
              _ => 0,
            };
            format!(
              "this.{}.reduce((sum, c) => sum + Utils.getSizeWithPadding(c.size, {}), 0)",
              to_camel(field),
              alignment
            )
          }
          DerivedLen::TotalSize => "this.size".to_string(),
        };
        let expr = match width {
          8 => format!("Utils.bigIntToBuffer(BigInt({}))", length_expr),
          _ => uint_writer(*width, &length_expr),
        };
        let name = to_camel(param);
        let body = vec![
          format!("const {}Bytes = {};", name, expr),
          format!("newArray = Utils.concatTypedArrays(newArray, {}Bytes);", name),
        ];
        apply_condition(p.condition.as_ref(), "this.", body, 2, &mut lines);
      }

      EncodeStep::Field { param } => {
        let p = plan.parameter(param).expect("plan is self-consistent");
        let name = to_camel(&p.name);
        let accessor = format!("this.{}{}", name, optional_mark(p));
        let expr = match &p.target {
          TargetKind::UInt { width } => uint_writer(*width, &accessor),
          TargetKind::BigInt => format!("Utils.bigIntToBuffer({})", accessor),
          TargetKind::Bytes { .. } => accessor.clone(),
          TargetKind::EnumRef {
            type_name,
            width,
            flags,
          } => {
            if *flags {
              uint_writer(*width, &format!("Utils.fromFlags({}, {})", type_name, accessor))
            } else {
              uint_writer(*width, &accessor)
            }
          }
          TargetKind::StructRef { .. } => format!("{}.serialize()", accessor),
          TargetKind::Array { element, alignment, .. } => match element.as_ref() {
            TargetKind::EnumRef { width, .. } => {
              format!("Utils.writeListEnum({}, {})", accessor, width)
            }
            _ => format!("Utils.writeList({}, {})", accessor, alignment),
          },
        };
        let body = vec![
          format!("const {}Bytes = {};", name, expr),
          format!("newArray = Utils.concatTypedArrays(newArray, {}Bytes);", name),
        ];
        apply_condition(p.condition.as_ref(), "this.", body, 2, &mut lines);
      }
    }
  }

  lines.push(indent("return newArray;", 2));
  lines.push(indent("}", 1));
  lines
}
