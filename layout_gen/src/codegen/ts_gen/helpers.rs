use crate::resolve::{ResolvedCondition, TargetKind};
use layout_types::ConditionOp;

/* Convert snake_case / PascalCase names to camelCase */
pub fn to_camel(name: &str) -> String {
  let mut out = String::new();
  let mut upper_next = false;
  for (i, ch) in name.chars().enumerate() {
    if ch == '_' || ch == '-' || ch == ' ' {
      upper_next = true;
      continue;
    }
    if i == 0 {
      out.extend(ch.to_lowercase());
    } else if upper_next {
      out.extend(ch.to_uppercase());
      upper_next = false;
    } else {
      out.push(ch);
    }
  }
  out
}

/* Apply indentation to an input text line */
pub fn indent(line: &str, count: usize) -> String {
  format!("{}{}", " ".repeat(count * 4), line)
}

/* Insert a line / lines into a line list */
pub fn write_lines<I>(lines: I, out: &mut Vec<String>)
where
  I: IntoIterator,
  I::Item: Into<String>,
{
  for line in lines {
    out.push(line.into());
  }
}

/* TypeScript type of a resolved target */
pub fn ts_type(target: &TargetKind) -> String {
  match target {
    TargetKind::UInt { .. } => "number".to_string(),
    TargetKind::BigInt => "bigint".to_string(),
    TargetKind::Bytes { .. } => "Uint8Array".to_string(),
    TargetKind::EnumRef { type_name, flags, .. } => {
      if *flags {
        format!("{}[]", type_name)
      } else {
        type_name.clone()
      }
    }
    TargetKind::StructRef { type_name } => type_name.clone(),
    TargetKind::Array { element, .. } => format!("{}[]", ts_type(element)),
  }
}

/* Reader call for a fixed-width integer */
pub fn uint_reader(width: u64, argument: &str) -> String {
  match width {
    1 => format!("Utils.bufferToUint8({})", argument),
    2 => format!("Utils.bufferToUint16({})", argument),
    _ => format!("Utils.bufferToUint32({})", argument),
  }
}

/* Writer call for a fixed-width integer */
pub fn uint_writer(width: u64, value: &str) -> String {
  match width {
    1 => format!("Utils.uint8ToBuffer({})", value),
    2 => format!("Utils.uint16ToBuffer({})", value),
    _ => format!("Utils.uint32ToBuffer({})", value),
  }
}

/* Condition expression text; accessor is "this." for methods and "" for
   local variables inside deserialize */
pub fn condition_expr(condition: &ResolvedCondition, accessor: &str) -> String {
  let left = format!("{}{}", accessor, to_camel(&condition.field));
  let value = match (&condition.enum_type, &condition.value_label) {
    (Some(enum_type), Some(label)) => format!("{}.{}", enum_type, label),
    _ => condition.value.to_string(),
  };
  match condition.op {
    ConditionOp::Equals => format!("{} === {}", left, value),
    ConditionOp::NotEquals => format!("{} !== {}", left, value),
    ConditionOp::In => format!("{}.indexOf({}) > -1", left, value),
  }
}

/* Wrap body lines in a condition guard when one applies */
pub fn apply_condition(
  condition: Option<&ResolvedCondition>,
  accessor: &str,
  body: Vec<String>,
  indent_count: usize,
  out: &mut Vec<String>,
) {
  match condition {
    Some(condition) => {
      out.push(indent(
        &format!("if ({}) {{", condition_expr(condition, accessor)),
        indent_count,
      ));
      for line in body {
        out.push(indent(&line, indent_count + 1));
      }
      out.push(indent("}", indent_count));
    }
    None => {
      for line in body {
        out.push(indent(&line, indent_count));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn camel_conversion() {
    assert_eq!(to_camel("mosaics_count"), "mosaicsCount");
    assert_eq!(to_camel("Amount"), "amount");
    assert_eq!(to_camel("size"), "size");
    assert_eq!(to_camel("registration_type"), "registrationType");
  }

  #[test]
  fn ts_types_for_targets() {
    assert_eq!(ts_type(&TargetKind::UInt { width: 4 }), "number");
    assert_eq!(ts_type(&TargetKind::BigInt), "bigint");
    assert_eq!(
      ts_type(&TargetKind::Array {
        element: Box::new(TargetKind::StructRef {
          type_name: "Mosaic".to_string()
        }),
        count: crate::resolve::CountSource::Fill,
        alignment: 0,
        element_counted: false,
      }),
      "Mosaic[]"
    );
  }
}
