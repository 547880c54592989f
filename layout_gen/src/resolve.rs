use crate::model::SchemaModel;
use indexmap::IndexMap;
use layout_types::{ConditionOp, ConstValue, Disposition, FieldSpec, SizeSpec, TypeDefinition, TypeKind};
use serde_derive::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Name of the synthetic whole-entity size field.
pub const SIZE_SENTINEL: &str = "size";

/// How an array's element count or byte length is determined at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CountSource {
  /// Consume elements until the enclosing buffer is exhausted.
  Fill,
  /// A fixed number of elements.
  Literal(u64),
  /// Element count read from a sibling field.
  Field(String),
  /// Total encoded byte length read from a sibling field.
  ByteLen(String),
}

/// Runtime length of a raw byte buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BytesLen {
  Fixed(u64),
  FromField(String),
  Remaining,
}

/// Mapped representation of a resolved field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TargetKind {
  /// Fixed-width little-endian unsigned integer (1, 2 or 4 bytes).
  UInt { width: u64 },
  /// 64-bit value (8 bytes on the wire).
  BigInt,
  /// Raw byte buffer.
  Bytes { len: BytesLen },
  /// Reference to another generated struct.
  StructRef { type_name: String },
  /// Reference to an enum; `flags` marks bitmask enums whose values are
  /// member sets.
  EnumRef { type_name: String, width: u64, flags: bool },
  /// Ordered sequence of elements.
  Array {
    element: Box<TargetKind>,
    count: CountSource,
    /// Inter-element alignment (0 = packed, 8 for self-describing
    /// transaction-shaped elements).
    alignment: u64,
    /// Size accounting by element count instead of summed byte sizes.
    element_counted: bool,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteSize {
  Fixed(u64),
  Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InlineRole {
  Base,
  Composed,
}

/// How a suppressed size/count field is recomputed during serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DerivedLen {
  /// Element count (or byte length for raw buffers) of the referencing field.
  Count { field: String },
  /// Padded encoded byte length of the referencing sized array.
  ByteLen { field: String },
  /// Whole-object encoded size (the `size` sentinel).
  TotalSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCondition {
  /// Sibling field whose value gates this parameter.
  pub field: String,
  pub op: ConditionOp,
  /// Comparison value, resolved to its numeric form.
  pub value: u64,
  /// Enum member label for emission, when the comparison names one.
  pub value_label: Option<String>,
  /// Enum type of the condition field, when it has one.
  pub enum_type: Option<String>,
}

/// One resolved wire parameter. Order of parameters is always identical to
/// on-wire byte order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParameter {
  pub name: String,
  pub target: TargetKind,
  pub byte_size: ByteSize,
  pub disposition: Disposition,
  /// Present in the public constructor interface. Const, reserved and
  /// derived size/count fields still consume bytes but are never declarable.
  pub declarable: bool,
  pub inline_role: Option<InlineRole>,
  pub condition: Option<ResolvedCondition>,
  /// Literal re-emitted by const/reserved entries.
  pub const_value: Option<u64>,
  pub derived_len: Option<DerivedLen>,
  pub sort_key: Option<String>,
  pub comment: Option<String>,
}

/// One entry of the flattened public interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceField {
  pub name: String,
  pub target: TargetKind,
  /// Conditional fields are optional for callers.
  pub optional: bool,
  /// Inline parameter (base or composed sub-object) this field belongs to
  /// when reconstructing nested objects. None for the type's own fields.
  pub group: Option<String>,
  pub comment: Option<String>,
}

/// Resolution output for one type: the single source of truth consumed by
/// every downstream operation plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLayout {
  pub type_name: String,
  pub comment: Option<String>,
  pub parameters: Vec<ResolvedParameter>,
  /// Flattened, recursively-inlined view: callers never see composition.
  pub interface: Vec<InterfaceField>,
  /// Inheritance base designated by the first inline reference to a
  /// non-marker type.
  pub base: Option<String>,
  /// External generated types this layout refers to (the import list).
  pub references: BTreeSet<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
  #[error("type '{type_name}' references unknown type '{reference}'")]
  UnknownType { type_name: String, reference: String },

  #[error("field '{type_name}.{field}' condition references unknown sibling '{condition}'")]
  DanglingCondition {
    type_name: String,
    field: String,
    condition: String,
  },

  #[error("type '{type_name}' designates inheritance base '{base}' more than once")]
  AmbiguousBase { type_name: String, base: String },

  #[error("field '{type_name}.{field}' names unknown member '{member}' of enum '{enum_name}'")]
  UnknownEnumMember {
    type_name: String,
    field: String,
    enum_name: String,
    member: String,
  },

  #[error("field '{type_name}.{field}' is invalid: {reason}")]
  InvalidField {
    type_name: String,
    field: String,
    reason: String,
  },
}

impl ResolveError {
  fn invalid(type_name: &str, field: &str, reason: impl Into<String>) -> Self {
    ResolveError::InvalidField {
      type_name: type_name.to_string(),
      field: field.to_string(),
      reason: reason.into(),
    }
  }
}

/// Per-type resolution engine. Reference cycles are rejected up front by the
/// reference graph, so inline recursion always terminates here.
pub struct ParameterResolver<'a> {
  model: &'a SchemaModel,
}

impl<'a> ParameterResolver<'a> {
  pub fn new(model: &'a SchemaModel) -> Self {
    Self { model }
  }

  /// Resolve every generated (non-marker) struct and primitive alias.
  /// Failures are collected per type so one malformed definition does not
  /// block the rest.
  pub fn resolve_all(&self) -> (IndexMap<String, ResolvedLayout>, Vec<(String, ResolveError)>) {
    let mut resolved = IndexMap::new();
    let mut failures = Vec::new();
    for typedef in self.model.definitions() {
      if typedef.is_enum() || !self.model.should_generate(&typedef.name) {
        continue;
      }
      match self.resolve(typedef) {
        Ok(layout) => {
          resolved.insert(typedef.name.clone(), layout);
        }
        Err(err) => failures.push((typedef.name.clone(), err)),
      }
    }
    (resolved, failures)
  }

  /// Resolve one type definition into its flat, ordered parameter list.
  pub fn resolve(&self, typedef: &TypeDefinition) -> Result<ResolvedLayout, ResolveError> {
    match typedef.kind {
      TypeKind::Enum => Err(ResolveError::invalid(
        &typedef.name,
        "",
        "enum definitions have no layout to resolve",
      )),
      TypeKind::Primitive => self.resolve_alias(typedef),
      TypeKind::Struct => self.resolve_struct(typedef),
    }
  }

  /* A layout-less primitive alias resolves to a single parameter. */
  fn resolve_alias(&self, typedef: &TypeDefinition) -> Result<ResolvedLayout, ResolveError> {
    let len = typedef.size.map(SizeSpec::Fixed);
    let (target, byte_size) = self.byte_target(&typedef.name, &typedef.name, len.as_ref())?;
    let param = ResolvedParameter {
      name: typedef.name.clone(),
      target: target.clone(),
      byte_size,
      disposition: Disposition::Plain,
      declarable: true,
      inline_role: None,
      condition: None,
      const_value: None,
      derived_len: None,
      sort_key: None,
      comment: typedef.comments.clone(),
    };
    let interface = vec![InterfaceField {
      name: typedef.name.clone(),
      target,
      optional: false,
      group: None,
      comment: typedef.comments.clone(),
    }];
    Ok(ResolvedLayout {
      type_name: typedef.name.clone(),
      comment: typedef.comments.clone(),
      parameters: vec![param],
      interface,
      base: None,
      references: BTreeSet::new(),
    })
  }

  fn resolve_struct(&self, typedef: &TypeDefinition) -> Result<ResolvedLayout, ResolveError> {
    let mut parameters: Vec<ResolvedParameter> = Vec::new();
    let mut interface: Vec<InterfaceField> = Vec::new();
    let mut references: BTreeSet<String> = BTreeSet::new();
    let mut base: Option<String> = None;
    /* Conditions may reference later siblings, so they resolve in a second
       pass once every parameter of this layout is known. */
    let mut pending_conditions: Vec<(usize, FieldSpec)> = Vec::new();

    for field in &typedef.layout {
      match field.disposition {
        Disposition::Plain => {
          let param = self.plain_param(typedef, field)?;
          if let Some(reference) = self.reference_of(field) {
            references.insert(reference);
          }
          if param.declarable {
            interface.push(InterfaceField {
              name: param.name.clone(),
              target: param.target.clone(),
              optional: field.is_conditional(),
              group: None,
              comment: field.comments.clone(),
            });
          }
          if field.is_conditional() {
            pending_conditions.push((parameters.len(), field.clone()));
          }
          parameters.push(param);
        }

        Disposition::Const | Disposition::Reserved => {
          let param = self.const_param(typedef, field)?;
          if field.is_conditional() {
            pending_conditions.push((parameters.len(), field.clone()));
          }
          parameters.push(param);
        }

        Disposition::Inline => {
          if field.is_conditional() {
            return Err(ResolveError::invalid(
              &typedef.name,
              field.name.as_deref().unwrap_or("?"),
              "inline fields cannot be conditional",
            ));
          }
          let target_name = field.stripped_type();
          let target_def = self.model.lookup(target_name).ok_or_else(|| ResolveError::UnknownType {
            type_name: typedef.name.clone(),
            reference: target_name.to_string(),
          })?;
          let nested = self.resolve(target_def)?;

          if self.model.is_marker(target_name) {
            /* Structural flattening: the marker's parameters become this
               type's own, at this position. */
            references.extend(nested.references);
            interface.extend(nested.interface);
            parameters.extend(nested.parameters);
          } else {
            let role = if base.is_none() {
              base = Some(target_name.to_string());
              InlineRole::Base
            } else if base.as_deref() == Some(target_name) {
              return Err(ResolveError::AmbiguousBase {
                type_name: typedef.name.clone(),
                base: target_name.to_string(),
              });
            } else {
              InlineRole::Composed
            };

            let param_name = field
              .name
              .clone()
              .unwrap_or_else(|| target_name.to_string());
            references.insert(target_name.to_string());
            interface.extend(nested.interface.into_iter().map(|entry| InterfaceField {
              group: Some(param_name.clone()),
              ..entry
            }));
            parameters.push(ResolvedParameter {
              name: param_name,
              target: TargetKind::StructRef {
                type_name: target_name.to_string(),
              },
              byte_size: ByteSize::Runtime,
              disposition: Disposition::Inline,
              declarable: true,
              inline_role: Some(role),
              condition: None,
              const_value: None,
              derived_len: None,
              sort_key: None,
              comment: field.comments.clone(),
            });
          }
        }

        Disposition::Array | Disposition::ArrayFill | Disposition::ArraySized => {
          let param = self.array_param(typedef, field)?;
          if let Some(reference) = self.reference_of(field) {
            references.insert(reference);
          }
          if param.declarable {
            interface.push(InterfaceField {
              name: param.name.clone(),
              target: param.target.clone(),
              optional: field.is_conditional(),
              group: None,
              comment: field.comments.clone(),
            });
          }
          if field.is_conditional() {
            pending_conditions.push((parameters.len(), field.clone()));
          }
          parameters.push(param);
        }
      }
    }

    for (index, field) in pending_conditions {
      let condition = self.resolve_condition(typedef, &field, &parameters)?;
      parameters[index].condition = Some(condition);
    }

    Ok(ResolvedLayout {
      type_name: typedef.name.clone(),
      comment: typedef.comments.clone(),
      parameters,
      interface,
      base,
      references,
    })
  }

  /* Import candidate of a field: its array-stripped type, unless it is the
     byte tag or a const entry. */
  fn reference_of(&self, field: &FieldSpec) -> Option<String> {
    if field.is_byte() || field.disposition == Disposition::Const {
      return None;
    }
    Some(field.stripped_type().to_string())
  }

  /* Map a byte field's declared size onto its target representation. */
  fn byte_target(
    &self,
    type_name: &str,
    field_name: &str,
    size: Option<&SizeSpec>,
  ) -> Result<(TargetKind, ByteSize), ResolveError> {
    match size {
      None => Ok((
        TargetKind::Bytes {
          len: BytesLen::Remaining,
        },
        ByteSize::Runtime,
      )),
      Some(SizeSpec::Fixed(width)) => Ok(match *width {
        w @ (1 | 2 | 4) => (TargetKind::UInt { width: w }, ByteSize::Fixed(w)),
        8 => (TargetKind::BigInt, ByteSize::Fixed(8)),
        w => (
          TargetKind::Bytes {
            len: BytesLen::Fixed(w),
          },
          ByteSize::Fixed(w),
        ),
      }),
      Some(SizeSpec::FieldRef(field)) => {
        if field.is_empty() {
          return Err(ResolveError::invalid(type_name, field_name, "empty size reference"));
        }
        Ok((
          TargetKind::Bytes {
            len: BytesLen::FromField(field.clone()),
          },
          ByteSize::Runtime,
        ))
      }
    }
  }

  fn plain_param(
    &self,
    typedef: &TypeDefinition,
    field: &FieldSpec,
  ) -> Result<ResolvedParameter, ResolveError> {
    let name = field
      .name
      .clone()
      .ok_or_else(|| ResolveError::invalid(&typedef.name, "?", "plain field requires a name"))?;

    let (target, byte_size) = if field.is_byte() {
      self.byte_target(&typedef.name, &name, field.size.as_ref())?
    } else {
      let reference = field.stripped_type();
      let target_def = self.model.lookup(reference).ok_or_else(|| ResolveError::UnknownType {
        type_name: typedef.name.clone(),
        reference: reference.to_string(),
      })?;
      if target_def.is_enum() {
        let width = target_def.size.ok_or_else(|| {
          ResolveError::invalid(&typedef.name, &name, format!("enum '{}' has no declared size", reference))
        })?;
        (
          TargetKind::EnumRef {
            type_name: reference.to_string(),
            width,
            flags: self.model.is_flags(reference),
          },
          ByteSize::Fixed(width),
        )
      } else {
        (
          TargetKind::StructRef {
            type_name: reference.to_string(),
          },
          ByteSize::Runtime,
        )
      }
    };

    let declarable = should_declare(&name, &typedef.layout);
    let derived_len = if declarable { None } else { derived_len(&name, &typedef.layout) };

    Ok(ResolvedParameter {
      name,
      target,
      byte_size,
      disposition: Disposition::Plain,
      declarable,
      inline_role: None,
      condition: None,
      const_value: None,
      derived_len,
      sort_key: None,
      comment: field.comments.clone(),
    })
  }

  fn const_param(
    &self,
    typedef: &TypeDefinition,
    field: &FieldSpec,
  ) -> Result<ResolvedParameter, ResolveError> {
    let name = field.name.clone().ok_or_else(|| {
      ResolveError::invalid(&typedef.name, "?", "const/reserved field requires a name")
    })?;

    /* Width: explicit size, or the referenced enum's declared width. */
    let (target, width) = if field.is_byte() {
      let width = field
        .size
        .as_ref()
        .and_then(SizeSpec::fixed)
        .ok_or_else(|| ResolveError::invalid(&typedef.name, &name, "const byte field requires a literal size"))?;
      let target = match width {
        w @ (1 | 2 | 4) => TargetKind::UInt { width: w },
        8 => TargetKind::BigInt,
        w => TargetKind::Bytes {
          len: BytesLen::Fixed(w),
        },
      };
      (target, width)
    } else {
      let reference = field.stripped_type();
      let width = self.model.enum_size(reference).ok_or_else(|| ResolveError::UnknownType {
        type_name: typedef.name.clone(),
        reference: reference.to_string(),
      })?;
      (
        TargetKind::EnumRef {
          type_name: reference.to_string(),
          width,
          flags: self.model.is_flags(reference),
        },
        width,
      )
    };

    let value = field
      .value
      .as_ref()
      .ok_or_else(|| ResolveError::invalid(&typedef.name, &name, "const/reserved field requires a value"))?;
    let const_value = match value {
      ConstValue::Number(n) => *n,
      ConstValue::EnumMember(member) => {
        let enum_name = field.stripped_type();
        let enum_def = self
          .model
          .lookup(enum_name)
          .filter(|t| t.is_enum())
          .ok_or_else(|| ResolveError::invalid(&typedef.name, &name, "symbolic const value requires an enum type"))?;
        enum_def
          .enum_member(member)
          .ok_or_else(|| ResolveError::UnknownEnumMember {
            type_name: typedef.name.clone(),
            field: name.clone(),
            enum_name: enum_name.to_string(),
            member: member.clone(),
          })?
      }
    };

    Ok(ResolvedParameter {
      name,
      target,
      byte_size: ByteSize::Fixed(width),
      disposition: field.disposition,
      declarable: false,
      inline_role: None,
      condition: None,
      const_value: Some(const_value),
      derived_len: None,
      sort_key: None,
      comment: field.comments.clone(),
    })
  }

  fn array_param(
    &self,
    typedef: &TypeDefinition,
    field: &FieldSpec,
  ) -> Result<ResolvedParameter, ResolveError> {
    let name = field
      .name
      .clone()
      .ok_or_else(|| ResolveError::invalid(&typedef.name, "?", "array field requires a name"))?;
    let element_ref = field.stripped_type();

    /* Byte arrays collapse to raw buffers. */
    if field.is_byte() {
      let (target, byte_size) = match (field.disposition, field.size.as_ref()) {
        (Disposition::ArrayFill, _) => (
          TargetKind::Bytes {
            len: BytesLen::Remaining,
          },
          ByteSize::Runtime,
        ),
        (_, Some(SizeSpec::FieldRef(source))) => (
          TargetKind::Bytes {
            len: BytesLen::FromField(source.clone()),
          },
          ByteSize::Runtime,
        ),
        (_, Some(SizeSpec::Fixed(width))) => (
          TargetKind::Bytes {
            len: BytesLen::Fixed(*width),
          },
          ByteSize::Fixed(*width),
        ),
        (_, None) => {
          return Err(ResolveError::invalid(&typedef.name, &name, "byte array requires a size"));
        }
      };
      return Ok(ResolvedParameter {
        name,
        target,
        byte_size,
        disposition: field.disposition,
        declarable: true,
        inline_role: None,
        condition: None,
        const_value: None,
        derived_len: None,
        sort_key: None,
        comment: field.comments.clone(),
      });
    }

    let element_def = self.model.lookup(element_ref).ok_or_else(|| ResolveError::UnknownType {
      type_name: typedef.name.clone(),
      reference: element_ref.to_string(),
    })?;
    let element = if element_def.is_enum() {
      let width = element_def.size.ok_or_else(|| {
        ResolveError::invalid(&typedef.name, &name, format!("enum '{}' has no declared size", element_ref))
      })?;
      TargetKind::EnumRef {
        type_name: element_ref.to_string(),
        width,
        flags: self.model.is_flags(element_ref),
      }
    } else {
      TargetKind::StructRef {
        type_name: element_ref.to_string(),
      }
    };

    let count = match field.disposition {
      Disposition::ArrayFill => CountSource::Fill,
      Disposition::ArraySized => match field.size.as_ref() {
        Some(SizeSpec::FieldRef(source)) => CountSource::ByteLen(source.clone()),
        _ => {
          return Err(ResolveError::invalid(
            &typedef.name,
            &name,
            "sized array requires a size field reference",
          ));
        }
      },
      _ => match field.size.as_ref() {
        Some(SizeSpec::Fixed(count)) => CountSource::Literal(*count),
        Some(SizeSpec::FieldRef(source)) => CountSource::Field(source.clone()),
        None => {
          return Err(ResolveError::invalid(&typedef.name, &name, "array requires a size"));
        }
      },
    };

    Ok(ResolvedParameter {
      name,
      target: TargetKind::Array {
        element: Box::new(element),
        count,
        alignment: self.model.alignment_for_element(element_ref),
        element_counted: field.element_disposition.is_some(),
      },
      byte_size: ByteSize::Runtime,
      disposition: field.disposition,
      declarable: true,
      inline_role: None,
      condition: None,
      const_value: None,
      derived_len: None,
      sort_key: field.sort_key.clone(),
      comment: field.comments.clone(),
    })
  }

  fn resolve_condition(
    &self,
    typedef: &TypeDefinition,
    field: &FieldSpec,
    parameters: &[ResolvedParameter],
  ) -> Result<ResolvedCondition, ResolveError> {
    let field_name = field.name.clone().unwrap_or_default();
    let condition_field = field.condition.clone().expect("checked by caller");
    let op = field.condition_operation.ok_or_else(|| {
      ResolveError::invalid(&typedef.name, &field_name, "conditional field requires a condition operation")
    })?;

    let condition_param = parameters
      .iter()
      .find(|p| p.name == condition_field)
      .ok_or_else(|| ResolveError::DanglingCondition {
        type_name: typedef.name.clone(),
        field: field_name.clone(),
        condition: condition_field.clone(),
      })?;

    let enum_type = match &condition_param.target {
      TargetKind::EnumRef { type_name, .. } => Some(type_name.clone()),
      _ => None,
    };

    let value = field.condition_value.as_ref().ok_or_else(|| {
      ResolveError::invalid(&typedef.name, &field_name, "conditional field requires a condition value")
    })?;
    let (value, value_label) = match value {
      ConstValue::Number(n) => (*n, None),
      ConstValue::EnumMember(member) => {
        let enum_name = enum_type.as_deref().ok_or_else(|| {
          ResolveError::invalid(
            &typedef.name,
            &field_name,
            format!("condition field '{}' is not an enum", condition_field),
          )
        })?;
        let resolved = self
          .model
          .lookup(enum_name)
          .and_then(|def| def.enum_member(member))
          .ok_or_else(|| ResolveError::UnknownEnumMember {
            type_name: typedef.name.clone(),
            field: field_name.clone(),
            enum_name: enum_name.to_string(),
            member: member.clone(),
          })?;
        (resolved, Some(member.clone()))
      }
    };

    Ok(ResolvedCondition {
      field: condition_field,
      op,
      value,
      value_label,
      enum_type,
    })
  }
}

/* Constant, reserved and derived size/count fields never surface in the
   public interface. */
fn should_declare(name: &str, layout: &[FieldSpec]) -> bool {
  if name == SIZE_SENTINEL {
    return false;
  }
  if name.ends_with("_count") || name.ends_with("_size") {
    let referenced = layout
      .iter()
      .any(|field| matches!(&field.size, Some(SizeSpec::FieldRef(r)) if r == name));
    return !referenced;
  }
  true
}

fn derived_len(name: &str, layout: &[FieldSpec]) -> Option<DerivedLen> {
  let referencing = layout
    .iter()
    .find(|field| matches!(&field.size, Some(SizeSpec::FieldRef(r)) if r == name));
  match referencing {
    Some(field) => {
      let field_name = field.name.clone()?;
      if field.disposition == Disposition::ArraySized {
        Some(DerivedLen::ByteLen { field: field_name })
      } else {
        Some(DerivedLen::Count { field: field_name })
      }
    }
    None if name == SIZE_SENTINEL => Some(DerivedLen::TotalSize),
    None => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ModelOptions, SchemaModel};
  use layout_types::{EnumValue, TypeDefinition, TypeKind};

  fn field(name: &str, field_type: &str) -> FieldSpec {
    FieldSpec {
      name: Some(name.to_string()),
      field_type: field_type.to_string(),
      size: None,
      disposition: Disposition::Plain,
      condition: None,
      condition_operation: None,
      condition_value: None,
      element_disposition: None,
      sort_key: None,
      value: None,
      comments: None,
    }
  }

  fn sized_field(name: &str, field_type: &str, size: u64) -> FieldSpec {
    FieldSpec {
      size: Some(SizeSpec::Fixed(size)),
      ..field(name, field_type)
    }
  }

  fn struct_def(name: &str, layout: Vec<FieldSpec>) -> TypeDefinition {
    TypeDefinition {
      name: name.to_string(),
      kind: TypeKind::Struct,
      size: None,
      comments: None,
      layout,
      values: Vec::new(),
    }
  }

  fn enum_def(name: &str, size: u64, values: Vec<(&str, u64)>) -> TypeDefinition {
    TypeDefinition {
      name: name.to_string(),
      kind: TypeKind::Enum,
      size: Some(size),
      comments: None,
      layout: Vec::new(),
      values: values
        .into_iter()
        .map(|(n, v)| EnumValue {
          name: n.to_string(),
          value: v,
          comments: None,
        })
        .collect(),
    }
  }

  fn model(types: Vec<TypeDefinition>) -> SchemaModel {
    SchemaModel::new(types, ModelOptions::default())
  }

  fn resolve_one(model: &SchemaModel, name: &str) -> ResolvedLayout {
    let resolver = ParameterResolver::new(model);
    resolver.resolve(model.lookup(name).unwrap()).unwrap()
  }

  #[test]
  fn byte_widths_map_to_targets() {
    let model = model(vec![struct_def(
      "Widths",
      vec![
        sized_field("small", "byte", 1),
        sized_field("medium", "byte", 4),
        sized_field("large", "byte", 8),
        sized_field("hash", "byte", 32),
      ],
    )]);
    let layout = resolve_one(&model, "Widths");
    assert_eq!(layout.parameters[0].target, TargetKind::UInt { width: 1 });
    assert_eq!(layout.parameters[1].target, TargetKind::UInt { width: 4 });
    assert_eq!(layout.parameters[2].target, TargetKind::BigInt);
    assert_eq!(
      layout.parameters[3].target,
      TargetKind::Bytes {
        len: BytesLen::Fixed(32)
      }
    );
    assert!(layout.parameters.iter().all(|p| p.declarable));
    assert_eq!(layout.interface.len(), 4);
  }

  #[test]
  fn marker_inline_is_spliced_in_place() {
    let model = model(vec![
      struct_def("EntityBody", vec![sized_field("version", "byte", 4)]),
      TypeDefinition {
        layout: vec![
          FieldSpec {
            name: None,
            disposition: Disposition::Inline,
            ..field("", "EntityBody")
          },
          sized_field("payload_kind", "byte", 2),
        ],
        ..struct_def("Entity", Vec::new())
      },
    ]);
    let layout = resolve_one(&model, "Entity");
    assert_eq!(layout.parameters.len(), 2);
    assert_eq!(layout.parameters[0].name, "version");
    assert!(layout.parameters[0].inline_role.is_none());
    assert_eq!(layout.base, None);
    /* Marker fields flatten into the interface as the type's own. */
    assert_eq!(layout.interface.len(), 2);
    assert_eq!(layout.interface[0].group, None);
    assert!(!layout.references.contains("EntityBody"));
  }

  #[test]
  fn first_generated_inline_becomes_the_base() {
    let model = model(vec![
      struct_def("Header", vec![sized_field("version", "byte", 1)]),
      struct_def(
        "Concrete",
        vec![
          FieldSpec {
            name: Some("header".to_string()),
            disposition: Disposition::Inline,
            ..field("header", "Header")
          },
          sized_field("amount", "byte", 8),
        ],
      ),
    ]);
    let layout = resolve_one(&model, "Concrete");
    assert_eq!(layout.base.as_deref(), Some("Header"));
    assert_eq!(layout.parameters[0].inline_role, Some(InlineRole::Base));
    assert_eq!(layout.parameters[0].byte_size, ByteSize::Runtime);
    /* Base fields flatten into the interface under the base group. */
    assert_eq!(layout.interface[0].name, "version");
    assert_eq!(layout.interface[0].group.as_deref(), Some("header"));
    assert_eq!(layout.interface[1].group, None);
    assert!(layout.references.contains("Header"));
  }

  #[test]
  fn duplicate_base_is_rejected() {
    let inline = |name: &str| FieldSpec {
      name: Some(name.to_string()),
      disposition: Disposition::Inline,
      ..field(name, "Header")
    };
    let model = model(vec![
      struct_def("Header", vec![sized_field("version", "byte", 1)]),
      struct_def("Broken", vec![inline("first"), inline("second")]),
    ]);
    let resolver = ParameterResolver::new(&model);
    let err = resolver.resolve(model.lookup("Broken").unwrap()).unwrap_err();
    assert_eq!(
      err,
      ResolveError::AmbiguousBase {
        type_name: "Broken".to_string(),
        base: "Header".to_string(),
      }
    );
  }

  #[test]
  fn const_value_substitutes_enum_member() {
    let model = model(vec![
      enum_def("TransactionType", 2, vec![("TRANSFER", 16724)]),
      struct_def(
        "Transfer",
        vec![FieldSpec {
          disposition: Disposition::Const,
          value: Some(ConstValue::EnumMember("TRANSFER".to_string())),
          ..field("TRANSACTION_TYPE", "TransactionType")
        }],
      ),
    ]);
    let layout = resolve_one(&model, "Transfer");
    let param = &layout.parameters[0];
    assert!(!param.declarable);
    assert_eq!(param.const_value, Some(16724));
    assert_eq!(param.byte_size, ByteSize::Fixed(2));
    assert!(layout.interface.is_empty());
    /* Const entries do not contribute imports. */
    assert!(!layout.references.contains("TransactionType"));
  }

  #[test]
  fn count_fields_consumed_by_arrays_are_suppressed() {
    let model = model(vec![
      struct_def("Mosaic", vec![sized_field("amount", "byte", 8)]),
      struct_def(
        "Holder",
        vec![
          sized_field("mosaics_count", "byte", 1),
          FieldSpec {
            disposition: Disposition::Array,
            size: Some(SizeSpec::FieldRef("mosaics_count".to_string())),
            ..field("mosaics", "[Mosaic]")
          },
        ],
      ),
    ]);
    let layout = resolve_one(&model, "Holder");
    let count = &layout.parameters[0];
    assert!(!count.declarable);
    assert_eq!(
      count.derived_len,
      Some(DerivedLen::Count {
        field: "mosaics".to_string()
      })
    );
    let array = &layout.parameters[1];
    assert!(array.declarable);
    assert_eq!(
      array.target,
      TargetKind::Array {
        element: Box::new(TargetKind::StructRef {
          type_name: "Mosaic".to_string()
        }),
        count: CountSource::Field("mosaics_count".to_string()),
        alignment: 0,
        element_counted: false,
      }
    );
    assert_eq!(layout.interface.len(), 1);
  }

  #[test]
  fn size_sentinel_recomputes_total_size() {
    let model = model(vec![struct_def(
      "Entity",
      vec![sized_field("size", "byte", 4), sized_field("version", "byte", 1)],
    )]);
    let layout = resolve_one(&model, "Entity");
    let size = &layout.parameters[0];
    assert!(!size.declarable);
    assert_eq!(size.derived_len, Some(DerivedLen::TotalSize));
  }

  #[test]
  fn sized_array_records_byte_length_source() {
    let model = model(vec![
      struct_def("EmbeddedTransaction", vec![sized_field("size", "byte", 4)]),
      struct_def(
        "Aggregate",
        vec![
          sized_field("payload_size", "byte", 4),
          FieldSpec {
            disposition: Disposition::ArraySized,
            size: Some(SizeSpec::FieldRef("payload_size".to_string())),
            ..field("transactions", "[EmbeddedTransaction]")
          },
        ],
      ),
    ]);
    let layout = resolve_one(&model, "Aggregate");
    assert_eq!(
      layout.parameters[0].derived_len,
      Some(DerivedLen::ByteLen {
        field: "transactions".to_string()
      })
    );
    match &layout.parameters[1].target {
      TargetKind::Array { count, alignment, .. } => {
        assert_eq!(count, &CountSource::ByteLen("payload_size".to_string()));
        assert_eq!(*alignment, 8);
      }
      other => panic!("expected array target, got {:?}", other),
    }
  }

  #[test]
  fn condition_resolves_enum_member_and_marks_optional() {
    let model = model(vec![
      enum_def("Mode", 1, vec![("BASIC", 0), ("EXTENDED", 1)]),
      struct_def(
        "Message",
        vec![
          field("mode", "Mode"),
          FieldSpec {
            condition: Some("mode".to_string()),
            condition_operation: Some(ConditionOp::Equals),
            condition_value: Some(ConstValue::EnumMember("EXTENDED".to_string())),
            ..sized_field("extension", "byte", 4)
          },
        ],
      ),
    ]);
    let layout = resolve_one(&model, "Message");
    let condition = layout.parameters[1].condition.as_ref().unwrap();
    assert_eq!(condition.field, "mode");
    assert_eq!(condition.op, ConditionOp::Equals);
    assert_eq!(condition.value, 1);
    assert_eq!(condition.value_label.as_deref(), Some("EXTENDED"));
    assert!(layout.interface[1].optional);
  }

  #[test]
  fn dangling_condition_is_fatal() {
    let model = model(vec![struct_def(
      "Broken",
      vec![FieldSpec {
        condition: Some("missing".to_string()),
        condition_operation: Some(ConditionOp::Equals),
        condition_value: Some(ConstValue::Number(1)),
        ..sized_field("payload", "byte", 4)
      }],
    )]);
    let resolver = ParameterResolver::new(&model);
    let err = resolver.resolve(model.lookup("Broken").unwrap()).unwrap_err();
    assert!(matches!(err, ResolveError::DanglingCondition { condition, .. } if condition == "missing"));
  }

  #[test]
  fn unknown_reference_is_fatal_for_the_type() {
    let model = model(vec![struct_def("Broken", vec![field("what", "Missing")])]);
    let resolver = ParameterResolver::new(&model);
    let err = resolver.resolve(model.lookup("Broken").unwrap()).unwrap_err();
    assert!(matches!(err, ResolveError::UnknownType { reference, .. } if reference == "Missing"));
  }

  #[test]
  fn resolve_all_collects_failures_without_blocking_others() {
    let model = model(vec![
      struct_def("Good", vec![sized_field("value", "byte", 4)]),
      struct_def("Bad", vec![field("what", "Missing")]),
    ]);
    let resolver = ParameterResolver::new(&model);
    let (resolved, failures) = resolver.resolve_all();
    assert!(resolved.contains_key("Good"));
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "Bad");
  }

  #[test]
  fn primitive_alias_resolves_to_single_parameter() {
    let model = model(vec![TypeDefinition {
      name: "Amount".to_string(),
      kind: TypeKind::Primitive,
      size: Some(8),
      comments: None,
      layout: Vec::new(),
      values: Vec::new(),
    }]);
    let layout = resolve_one(&model, "Amount");
    assert_eq!(layout.parameters.len(), 1);
    assert_eq!(layout.parameters[0].target, TargetKind::BigInt);
    assert!(layout.parameters[0].declarable);
  }
}
