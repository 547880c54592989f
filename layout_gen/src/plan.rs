//! Operation plans derived from resolved parameters.
//!
//! For every generated type the plan builder produces the four coupled
//! operation plans (constructor, size, deserialize, serialize) plus the
//! public field interface. Plans are typed step lists: backends render them
//! to source text and the reflection executor runs them directly against
//! byte buffers. The serialize plan concatenates byte representations in
//! exactly the order the deserialize plan consumes them; that ordering
//! identity is the round-trip contract.

use crate::model::SchemaModel;
use crate::resolve::{
    ByteSize, DerivedLen, InlineRole, InterfaceField, ParameterResolver, ResolveError,
    ResolvedCondition, ResolvedLayout, ResolvedParameter, TargetKind,
};
use indexmap::IndexMap;
use layout_types::{ConditionOp, Disposition, TypeDefinition};
use serde_derive::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Constructor plan entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstructorStep {
    /// Assign one of the type's own fields.
    AssignField { param: String },
    /// Delegate the base's slice of the flattened interface to the base
    /// constructor.
    DelegateBase {
        type_name: String,
        fields: Vec<String>,
    },
    /// Gather a composed sub-object's flattened fields and invoke its own
    /// constructor.
    ConstructGroup {
        param: String,
        type_name: String,
        fields: Vec<String>,
    },
}

/// One term of the ordered size sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeTerm {
    pub param: String,
    /// Conditional terms count only while their guard holds.
    pub guard: Option<ResolvedCondition>,
    pub kind: SizeTermKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SizeTermKind {
    /// Compile-time byte width.
    Literal(u64),
    /// Runtime size of the inheritance base or a composed sub-object,
    /// evaluated against the flattened field set.
    InlineSize { type_name: String },
    /// A nested value's runtime size.
    NestedSize,
    /// Byte length of a runtime-sized raw buffer.
    BytesLen,
    /// Sum of element sizes, each padded to the alignment.
    ArrayPadded { alignment: u64 },
    /// Count times a fixed element width.
    ArrayFixed { element_width: u64 },
    /// Element-count accounting for self-describing elements.
    ArrayCount,
}

/// One step of the forward-only decode cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecodeStep {
    /// Decode an inline base or composed sub-object and merge its fields.
    Inline { param: String, type_name: String },
    /// Decode one parameter at the cursor (guard, width and target come
    /// from the parameter table).
    Field { param: String },
    /// Consume a const/reserved entry's fixed width.
    ConstSkip { param: String, width: u64 },
    /// Consume raw bytes at the correct cursor position for conditional
    /// fields whose controlling sibling decodes later.
    Placeholder { key: String, width: u64 },
    /// Interpret a previously consumed placeholder once the controlling
    /// sibling is known. Always at the end of the plan.
    Deferred { param: String, key: String },
}

/// One step of the encode concatenation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EncodeStep {
    /// Encode the inline base or a composed sub-object.
    Inline { param: String, type_name: String },
    /// Encode one parameter from the current field values.
    Field { param: String },
    /// Re-emit a const/reserved literal.
    Const {
        param: String,
        width: u64,
        value: u64,
    },
    /// Recompute a suppressed size/count field from runtime lengths; never
    /// read from a stored field.
    DerivedLen {
        param: String,
        width: u64,
        source: DerivedLen,
    },
}

/// The four operation plans plus the public interface for one type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypePlan {
    pub type_name: String,
    pub comment: Option<String>,
    pub base: Option<String>,
    pub parameters: Vec<ResolvedParameter>,
    pub interface: Vec<InterfaceField>,
    pub constructor: Vec<ConstructorStep>,
    pub size: Vec<SizeTerm>,
    pub deserialize: Vec<DecodeStep>,
    pub serialize: Vec<EncodeStep>,
    pub references: BTreeSet<String>,
}

impl TypePlan {
    pub fn parameter(&self, name: &str) -> Option<&ResolvedParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Value-set plan for an enum definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumPlan {
    pub name: String,
    pub comment: Option<String>,
    pub width: u64,
    pub flags: bool,
    pub members: Vec<EnumMemberPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMemberPlan {
    pub name: String,
    pub value: u64,
    pub comment: Option<String>,
}

impl EnumPlan {
    pub fn member(&self, name: &str) -> Option<u64> {
        self.members.iter().find(|m| m.name == name).map(|m| m.value)
    }
}

/// Every plan built for a compile run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSet {
    pub types: IndexMap<String, TypePlan>,
    pub enums: IndexMap<String, EnumPlan>,
}

impl PlanSet {
    pub fn type_plan(&self, name: &str) -> Option<&TypePlan> {
        self.types.get(name)
    }

    pub fn enum_plan(&self, name: &str) -> Option<&EnumPlan> {
        self.enums.get(name)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("type '{type_name}': conditional field '{field}' needs a fixed width for deferred decode")]
    DeferredNeedsFixedWidth { type_name: String, field: String },

    #[error("type '{type_name}': membership condition on '{field}' must reference an earlier sibling")]
    ForwardMembershipCondition { type_name: String, field: String },

    #[error("enum '{type_name}' has no declared size")]
    EnumWithoutSize { type_name: String },
}

/// Per-type failure while building plans.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

pub struct PlanBuilder<'a> {
    model: &'a SchemaModel,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(model: &'a SchemaModel) -> Self {
        Self { model }
    }

    pub fn build(&self, layout: &ResolvedLayout) -> Result<TypePlan, PlanError> {
        let constructor = build_constructor(layout);
        let size = build_size(layout);
        let deserialize = build_deserialize(layout)?;
        let serialize = build_serialize(layout);

        Ok(TypePlan {
            type_name: layout.type_name.clone(),
            comment: layout.comment.clone(),
            base: layout.base.clone(),
            parameters: layout.parameters.clone(),
            interface: layout.interface.clone(),
            constructor,
            size,
            deserialize,
            serialize,
            references: layout.references.clone(),
        })
    }

    pub fn build_enum(&self, typedef: &TypeDefinition) -> Result<EnumPlan, PlanError> {
        let width = typedef.size.ok_or_else(|| PlanError::EnumWithoutSize {
            type_name: typedef.name.clone(),
        })?;
        Ok(EnumPlan {
            name: typedef.name.clone(),
            comment: typedef.comments.clone(),
            width,
            flags: self.model.is_flags(&typedef.name),
            members: typedef
                .values
                .iter()
                .map(|v| EnumMemberPlan {
                    name: v.name.clone(),
                    value: v.value,
                    comment: v.comments.clone(),
                })
                .collect(),
        })
    }
}

/// Resolve and plan every type in the model. Failures are collected per type
/// so a malformed definition does not block the rest of the schema.
pub fn build_plans(model: &SchemaModel) -> (PlanSet, Vec<(String, BuildError)>) {
    let resolver = ParameterResolver::new(model);
    let builder = PlanBuilder::new(model);

    let (layouts, resolve_failures) = resolver.resolve_all();
    let mut failures: Vec<(String, BuildError)> = resolve_failures
        .into_iter()
        .map(|(name, err)| (name, BuildError::Resolve(err)))
        .collect();

    let mut types = IndexMap::new();
    for (name, layout) in &layouts {
        match builder.build(layout) {
            Ok(plan) => {
                types.insert(name.clone(), plan);
            }
            Err(err) => failures.push((name.clone(), BuildError::Plan(err))),
        }
    }

    let mut enums = IndexMap::new();
    for typedef in model.definitions().filter(|t| t.is_enum()) {
        match builder.build_enum(typedef) {
            Ok(plan) => {
                enums.insert(typedef.name.clone(), plan);
            }
            Err(err) => failures.push((typedef.name.clone(), BuildError::Plan(err))),
        }
    }

    (PlanSet { types, enums }, failures)
}

fn build_constructor(layout: &ResolvedLayout) -> Vec<ConstructorStep> {
    let mut steps = Vec::new();
    for param in &layout.parameters {
        if !param.declarable {
            continue;
        }
        match (param.inline_role, &param.target) {
            (Some(role), TargetKind::StructRef { type_name }) => {
                let fields: Vec<String> = layout
                    .interface
                    .iter()
                    .filter(|f| f.group.as_deref() == Some(&param.name))
                    .map(|f| f.name.clone())
                    .collect();
                steps.push(match role {
                    InlineRole::Base => ConstructorStep::DelegateBase {
                        type_name: type_name.clone(),
                        fields,
                    },
                    InlineRole::Composed => ConstructorStep::ConstructGroup {
                        param: param.name.clone(),
                        type_name: type_name.clone(),
                        fields,
                    },
                });
            }
            _ => steps.push(ConstructorStep::AssignField {
                param: param.name.clone(),
            }),
        }
    }
    steps
}

fn build_size(layout: &ResolvedLayout) -> Vec<SizeTerm> {
    layout
        .parameters
        .iter()
        .map(|param| {
            let kind = match &param.target {
                TargetKind::UInt { width } => SizeTermKind::Literal(*width),
                TargetKind::BigInt => SizeTermKind::Literal(8),
                TargetKind::EnumRef { width, .. } => SizeTermKind::Literal(*width),
                TargetKind::Bytes { .. } => match param.byte_size {
                    ByteSize::Fixed(width) => SizeTermKind::Literal(width),
                    ByteSize::Runtime => SizeTermKind::BytesLen,
                },
                TargetKind::StructRef { type_name } => match param.inline_role {
                    Some(_) => SizeTermKind::InlineSize {
                        type_name: type_name.clone(),
                    },
                    None => SizeTermKind::NestedSize,
                },
                TargetKind::Array {
                    element,
                    alignment,
                    element_counted,
                    ..
                } => {
                    if *element_counted {
                        SizeTermKind::ArrayCount
                    } else if let TargetKind::EnumRef { width, .. } = element.as_ref() {
                        SizeTermKind::ArrayFixed {
                            element_width: *width,
                        }
                    } else {
                        SizeTermKind::ArrayPadded {
                            alignment: *alignment,
                        }
                    }
                }
            };
            SizeTerm {
                param: param.name.clone(),
                guard: param.condition.clone(),
                kind,
            }
        })
        .collect()
}

fn build_deserialize(layout: &ResolvedLayout) -> Result<Vec<DecodeStep>, PlanError> {
    let position = |name: &str| layout.parameters.iter().position(|p| p.name == name);

    /* Statically choose between inline decode and placeholder-then-resolve
       for every conditional: a field whose controlling sibling appears later
       in byte order cannot evaluate its guard at its own cursor position. */
    let mut deferred: Vec<(usize, &ResolvedParameter)> = Vec::new();
    for (index, param) in layout.parameters.iter().enumerate() {
        if let Some(condition) = &param.condition {
            let controller = position(&condition.field).unwrap_or(usize::MAX);
            if controller > index {
                if condition.op == ConditionOp::In {
                    return Err(PlanError::ForwardMembershipCondition {
                        type_name: layout.type_name.clone(),
                        field: param.name.clone(),
                    });
                }
                deferred.push((index, param));
            }
        }
    }

    let mut steps = Vec::new();
    let mut placeholders: IndexMap<String, u64> = IndexMap::new();

    for (index, param) in layout.parameters.iter().enumerate() {
        if let Some((_, deferred_param)) = deferred.iter().find(|(i, _)| *i == index) {
            let key = deferred_param
                .condition
                .as_ref()
                .expect("deferred parameters are conditional")
                .field
                .clone();
            let width = match deferred_param.byte_size {
                ByteSize::Fixed(width) => width,
                ByteSize::Runtime => {
                    return Err(PlanError::DeferredNeedsFixedWidth {
                        type_name: layout.type_name.clone(),
                        field: deferred_param.name.clone(),
                    });
                }
            };
            /* Overlaid conditionals guarded by the same sibling share one
               placeholder read at the first occurrence. */
            if !placeholders.contains_key(&key) {
                placeholders.insert(key.clone(), width);
                steps.push(DecodeStep::Placeholder { key, width });
            }
            continue;
        }

        match (param.disposition, param.inline_role, &param.target) {
            (Disposition::Const | Disposition::Reserved, _, _) => {
                let width = match param.byte_size {
                    ByteSize::Fixed(width) => width,
                    ByteSize::Runtime => unreachable!("const entries always have fixed widths"),
                };
                steps.push(DecodeStep::ConstSkip {
                    param: param.name.clone(),
                    width,
                });
            }
            (_, Some(_), TargetKind::StructRef { type_name }) => {
                steps.push(DecodeStep::Inline {
                    param: param.name.clone(),
                    type_name: type_name.clone(),
                });
            }
            _ => steps.push(DecodeStep::Field {
                param: param.name.clone(),
            }),
        }
    }

    for (_, param) in &deferred {
        let condition = param.condition.as_ref().expect("deferred parameters are conditional");
        steps.push(DecodeStep::Deferred {
            param: param.name.clone(),
            key: condition.field.clone(),
        });
    }

    Ok(steps)
}

fn build_serialize(layout: &ResolvedLayout) -> Vec<EncodeStep> {
    layout
        .parameters
        .iter()
        .map(|param| {
            let fixed_width = match param.byte_size {
                ByteSize::Fixed(width) => Some(width),
                ByteSize::Runtime => None,
            };
            match (param.disposition, param.inline_role, &param.target) {
                (Disposition::Const | Disposition::Reserved, _, _) => EncodeStep::Const {
                    param: param.name.clone(),
                    width: fixed_width.expect("const entries always have fixed widths"),
                    value: param.const_value.unwrap_or(0),
                },
                (_, Some(_), TargetKind::StructRef { type_name }) => EncodeStep::Inline {
                    param: param.name.clone(),
                    type_name: type_name.clone(),
                },
                _ => match &param.derived_len {
                    Some(source) => EncodeStep::DerivedLen {
                        param: param.name.clone(),
                        width: fixed_width.expect("derived length fields have fixed widths"),
                        source: source.clone(),
                    },
                    None => EncodeStep::Field {
                        param: param.name.clone(),
                    },
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelOptions, SchemaModel};
    use layout_types::{
        ConditionOp, ConstValue, EnumValue, FieldSpec, SizeSpec, TypeDefinition, TypeKind,
    };

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

    fn plan_for(types: Vec<TypeDefinition>, name: &str) -> TypePlan {
        let model = SchemaModel::new(types, ModelOptions::default());
        let (plans, failures) = build_plans(&model);
        assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
        plans.type_plan(name).unwrap().clone()
    }

    #[test]
    fn size_plan_is_ordered_and_typed() {
        let plan = plan_for(
            vec![
                enum_def("NetworkType", 1, vec![("MAINNET", 104)]),
                struct_def(
                    "Entity",
                    vec![
                        sized_field("size", "byte", 4),
                        field("network", "NetworkType"),
                        sized_field("payload", "byte", 8),
                    ],
                ),
            ],
            "Entity",
        );
        let kinds: Vec<&SizeTermKind> = plan.size.iter().map(|t| &t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &SizeTermKind::Literal(4),
                &SizeTermKind::Literal(1),
                &SizeTermKind::Literal(8),
            ]
        );
    }

    #[test]
    fn const_entries_skip_on_decode_and_reemit_on_encode() {
        let plan = plan_for(
            vec![
                enum_def("TransactionType", 2, vec![("TRANSFER", 16724)]),
                struct_def(
                    "Transfer",
                    vec![
                        FieldSpec {
                            disposition: Disposition::Const,
                            value: Some(ConstValue::EnumMember("TRANSFER".to_string())),
                            ..field("TRANSACTION_TYPE", "TransactionType")
                        },
                        sized_field("amount", "byte", 8),
                    ],
                ),
            ],
            "Transfer",
        );
        assert_eq!(
            plan.deserialize[0],
            DecodeStep::ConstSkip {
                param: "TRANSACTION_TYPE".to_string(),
                width: 2
            }
        );
        assert_eq!(
            plan.serialize[0],
            EncodeStep::Const {
                param: "TRANSACTION_TYPE".to_string(),
                width: 2,
                value: 16724
            }
        );
        /* Const still counts toward the encoded size. */
        assert_eq!(plan.size[0].kind, SizeTermKind::Literal(2));
    }

    #[test]
    fn forward_condition_defers_with_shared_placeholder() {
        let registration = enum_def("RegistrationType", 1, vec![("ROOT", 0), ("CHILD", 1)]);
        let conditional = |name: &str, member: &str| FieldSpec {
            condition: Some("registration_type".to_string()),
            condition_operation: Some(ConditionOp::Equals),
            condition_value: Some(ConstValue::EnumMember(member.to_string())),
            ..sized_field(name, "byte", 8)
        };
        let plan = plan_for(
            vec![
                registration,
                struct_def(
                    "Registration",
                    vec![
                        conditional("duration", "ROOT"),
                        conditional("parent_id", "CHILD"),
                        field("registration_type", "RegistrationType"),
                    ],
                ),
            ],
            "Registration",
        );

        /* One placeholder consumes the overlaid bytes, both interpretations
           happen after the controlling sibling decodes. */
        assert_eq!(
            plan.deserialize,
            vec![
                DecodeStep::Placeholder {
                    key: "registration_type".to_string(),
                    width: 8
                },
                DecodeStep::Field {
                    param: "registration_type".to_string()
                },
                DecodeStep::Deferred {
                    param: "duration".to_string(),
                    key: "registration_type".to_string()
                },
                DecodeStep::Deferred {
                    param: "parent_id".to_string(),
                    key: "registration_type".to_string()
                },
            ]
        );
    }

    #[test]
    fn backward_condition_decodes_inline() {
        let plan = plan_for(
            vec![
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
            ],
            "Message",
        );
        assert_eq!(
            plan.deserialize,
            vec![
                DecodeStep::Field {
                    param: "mode".to_string()
                },
                DecodeStep::Field {
                    param: "extension".to_string()
                },
            ]
        );
    }

    #[test]
    fn suppressed_count_is_recomputed_during_encode() {
        let plan = plan_for(
            vec![
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
            ],
            "Holder",
        );
        assert_eq!(
            plan.serialize[0],
            EncodeStep::DerivedLen {
                param: "mosaics_count".to_string(),
                width: 1,
                source: DerivedLen::Count {
                    field: "mosaics".to_string()
                },
            }
        );
        assert_eq!(plan.size[1].kind, SizeTermKind::ArrayPadded { alignment: 0 });
    }

    #[test]
    fn base_delegation_in_constructor_and_size() {
        let plan = plan_for(
            vec![
                struct_def("Header", vec![sized_field("version", "byte", 1)]),
                struct_def(
                    "Concrete",
                    vec![
                        FieldSpec {
                            disposition: Disposition::Inline,
                            ..field("header", "Header")
                        },
                        sized_field("amount", "byte", 8),
                    ],
                ),
            ],
            "Concrete",
        );
        assert_eq!(plan.base.as_deref(), Some("Header"));
        assert_eq!(
            plan.constructor[0],
            ConstructorStep::DelegateBase {
                type_name: "Header".to_string(),
                fields: vec!["version".to_string()],
            }
        );
        assert_eq!(
            plan.size[0].kind,
            SizeTermKind::InlineSize {
                type_name: "Header".to_string()
            }
        );
        assert_eq!(
            plan.deserialize[0],
            DecodeStep::Inline {
                param: "header".to_string(),
                type_name: "Header".to_string()
            }
        );
    }

    #[test]
    fn enum_plans_carry_width_and_members() {
        let model = SchemaModel::new(
            vec![enum_def("NetworkType", 1, vec![("MAINNET", 104), ("TESTNET", 152)])],
            ModelOptions::default(),
        );
        let (plans, failures) = build_plans(&model);
        assert!(failures.is_empty());
        let plan = plans.enum_plan("NetworkType").unwrap();
        assert_eq!(plan.width, 1);
        assert_eq!(plan.member("TESTNET"), Some(152));
        assert!(!plan.flags);
    }
}
