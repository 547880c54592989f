use crate::errors::{ExecError, ExecResult};
use crate::value::{StructValue, Value};
use layout_codec as codec;
use layout_gen::dispatch::DispatchTable;
use layout_gen::plan::{DecodeStep, EncodeStep, PlanSet, SizeTermKind, TypePlan};
use layout_gen::resolve::{
    BytesLen, CountSource, DerivedLen, InlineRole, ResolvedCondition, ResolvedParameter, TargetKind,
};
use layout_types::ConditionOp;
use std::collections::BTreeMap;

/// Executes operation plans against byte buffers and dynamic values.
///
/// Decode walks the deserialize plan with a single forward-only cursor;
/// encode concatenates the serialize plan's byte parts in the identical
/// order. Both are pure functions over their inputs, safe to call from any
/// number of threads against the shared plan set.
pub struct Executor<'a> {
    plans: &'a PlanSet,
}

impl<'a> Executor<'a> {
    pub fn new(plans: &'a PlanSet) -> Self {
        Self { plans }
    }

    /// Decode a value of `type_name` from the front of `input`, returning
    /// the value and the number of bytes consumed.
    pub fn decode(&self, type_name: &str, input: &[u8]) -> ExecResult<(Value, usize)> {
        let plan = self.plan(type_name)?;
        self.decode_with_plan(plan, input)
    }

    /// Decode a value that must consume the entire input.
    pub fn decode_exact(&self, type_name: &str, input: &[u8]) -> ExecResult<Value> {
        let (value, consumed) = self.decode(type_name, input)?;
        if consumed != input.len() {
            return Err(ExecError::TrailingBytes {
                type_name: type_name.to_string(),
                remaining: input.len() - consumed,
            });
        }
        Ok(value)
    }

    /// Serialize a struct value into exactly `size_of(value)` bytes.
    pub fn encode(&self, value: &Value) -> ExecResult<Vec<u8>> {
        let root = value.as_struct().ok_or(ExecError::Mismatch {
            field: "(root)".to_string(),
            expected: "struct",
        })?;
        self.encode_struct(root)
    }

    /// Exact encoded byte length for the current field values.
    pub fn size_of(&self, value: &Value) -> ExecResult<u64> {
        let root = value.as_struct().ok_or(ExecError::Mismatch {
            field: "(root)".to_string(),
            expected: "struct",
        })?;
        let plan = self.plan(&root.type_name)?;
        self.size_with_plan(plan, root)
    }

    /// Decode the family header, read its type-code and version, and decode
    /// the matching concrete type. Unknown pairs decode as the header only.
    pub fn dispatch(&self, table: &DispatchTable, input: &[u8]) -> ExecResult<Value> {
        let (header, _) = self.decode(&table.header, input)?;
        let header_fields = header.as_struct().ok_or(ExecError::Mismatch {
            field: table.header.clone(),
            expected: "struct",
        })?;
        let type_code = self.header_scalar(header_fields, &table.header, &table.type_field)?;
        let version = self.header_scalar(header_fields, &table.header, &table.version_field)?;

        match table.lookup(type_code, version) {
            Some(entry) => Ok(self.decode(&entry.type_name, input)?.0),
            None => Ok(header),
        }
    }

    fn header_scalar(&self, header: &StructValue, type_name: &str, field: &str) -> ExecResult<u64> {
        header
            .get(field)
            .and_then(Value::as_scalar)
            .ok_or_else(|| ExecError::MissingField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            })
    }

    fn plan(&self, type_name: &str) -> ExecResult<&'a TypePlan> {
        self.plans
            .type_plan(type_name)
            .ok_or_else(|| ExecError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    fn param<'p>(&self, plan: &'p TypePlan, name: &str) -> ExecResult<&'p ResolvedParameter> {
        plan.parameter(name).ok_or_else(|| ExecError::MissingField {
            type_name: plan.type_name.clone(),
            field: name.to_string(),
        })
    }

    /* ---------------------------------------------------------------- */
    /* Decode                                                           */
    /* ---------------------------------------------------------------- */

    fn decode_with_plan(&self, plan: &TypePlan, input: &[u8]) -> ExecResult<(Value, usize)> {
        let mut cursor = input;
        let mut out = StructValue::new(&plan.type_name);
        let mut locals: BTreeMap<String, Value> = BTreeMap::new();
        let mut placeholders: BTreeMap<String, Vec<u8>> = BTreeMap::new();

        for step in &plan.deserialize {
            match step {
                DecodeStep::Inline { param, type_name } => {
                    let (value, used) = self.decode(type_name, cursor)?;
                    let nested = match value {
                        Value::Struct(nested) => nested,
                        _ => {
                            return Err(ExecError::Mismatch {
                                field: param.clone(),
                                expected: "struct",
                            });
                        }
                    };
                    for (name, field_value) in nested.fields() {
                        locals.insert(name.clone(), field_value.clone());
                        out.set(name.clone(), field_value.clone());
                    }
                    cursor = &cursor[used..];
                }

                DecodeStep::Field { param } => {
                    let p = self.param(plan, param)?;
                    if !self.decode_guard(plan, p, &locals)? {
                        continue;
                    }
                    let (value, used) = self.decode_target(plan, &p.target, cursor, &locals, &p.name)?;
                    cursor = &cursor[used..];
                    if p.declarable {
                        out.set(p.name.clone(), value.clone());
                    }
                    locals.insert(p.name.clone(), value);
                }

                DecodeStep::ConstSkip { param, width } => {
                    let p = self.param(plan, param)?;
                    if !self.decode_guard(plan, p, &locals)? {
                        continue;
                    }
                    let (_, rest) = codec::take(cursor, to_len(*width, "const width")?)?;
                    cursor = rest;
                }

                DecodeStep::Placeholder { key, width } => {
                    let (bytes, rest) = codec::take(cursor, to_len(*width, "placeholder width")?)?;
                    placeholders.insert(key.clone(), bytes.to_vec());
                    cursor = rest;
                }

                DecodeStep::Deferred { param, key } => {
                    let p = self.param(plan, param)?;
                    if !self.decode_guard(plan, p, &locals)? {
                        continue;
                    }
                    let bytes = placeholders.get(key).ok_or_else(|| ExecError::MissingPlaceholder {
                        field: p.name.clone(),
                    })?;
                    let (value, _) = self.decode_target(plan, &p.target, bytes, &locals, &p.name)?;
                    if p.declarable {
                        out.set(p.name.clone(), value.clone());
                    }
                    locals.insert(p.name.clone(), value);
                }
            }
        }

        Ok((Value::Struct(out), input.len() - cursor.len()))
    }

    fn decode_guard(
        &self,
        plan: &TypePlan,
        param: &ResolvedParameter,
        locals: &BTreeMap<String, Value>,
    ) -> ExecResult<bool> {
        match &param.condition {
            Some(condition) => check_guard(condition, locals.get(&condition.field), &plan.type_name),
            None => Ok(true),
        }
    }

    fn decode_target(
        &self,
        plan: &TypePlan,
        target: &TargetKind,
        input: &[u8],
        locals: &BTreeMap<String, Value>,
        field: &str,
    ) -> ExecResult<(Value, usize)> {
        match target {
            TargetKind::UInt { width } => {
                let width = to_len(*width, "integer width")?;
                Ok((Value::UInt(codec::read_uint(input, width)?), width))
            }

            TargetKind::BigInt => Ok((Value::UInt(codec::read_uint(input, 8)?), 8)),

            TargetKind::Bytes { len } => {
                let len = match len {
                    BytesLen::Fixed(width) => to_len(*width, "buffer length")?,
                    BytesLen::FromField(source) => {
                        to_len(self.local_scalar(plan, locals, source)?, "buffer length")?
                    }
                    BytesLen::Remaining => input.len(),
                };
                let (bytes, _) = codec::take(input, len)?;
                Ok((Value::Bytes(bytes.to_vec()), len))
            }

            TargetKind::EnumRef {
                type_name,
                width,
                flags,
            } => {
                let width = to_len(*width, "enum width")?;
                let raw = codec::read_uint(input, width)?;
                if *flags {
                    Ok((Value::Flags(self.flag_members(type_name, raw)?), width))
                } else {
                    Ok((Value::Enum(raw), width))
                }
            }

            TargetKind::StructRef { type_name } => self.decode(type_name, input),

            TargetKind::Array {
                element,
                count,
                alignment,
                ..
            } => {
                let mut elements = Vec::new();
                match count {
                    CountSource::Fill => {
                        let mut used = 0usize;
                        while used < input.len() {
                            let (value, advance) =
                                self.decode_element(plan, element, &input[used..], locals, field, *alignment)?;
                            elements.push(value);
                            used += advance;
                        }
                        Ok((Value::Array(elements), used))
                    }

                    CountSource::Literal(_) | CountSource::Field(_) => {
                        let count = match count {
                            CountSource::Literal(n) => *n,
                            CountSource::Field(source) => self.local_scalar(plan, locals, source)?,
                            _ => unreachable!(),
                        };
                        let mut used = 0usize;
                        for _ in 0..count {
                            let (value, advance) =
                                self.decode_element(plan, element, &input[used..], locals, field, *alignment)?;
                            elements.push(value);
                            used += advance;
                        }
                        Ok((Value::Array(elements), used))
                    }

                    CountSource::ByteLen(source) => {
                        let total = to_len(self.local_scalar(plan, locals, source)?, "array byte length")?;
                        let (window, _) = codec::take(input, total)?;
                        let mut used = 0usize;
                        while used < window.len() {
                            let (value, advance) =
                                self.decode_element(plan, element, &window[used..], locals, field, *alignment)?;
                            elements.push(value);
                            used += advance;
                        }
                        Ok((Value::Array(elements), total))
                    }
                }
            }
        }
    }

    /* One array element plus its inter-element padding. */
    fn decode_element(
        &self,
        plan: &TypePlan,
        element: &TargetKind,
        input: &[u8],
        locals: &BTreeMap<String, Value>,
        field: &str,
        alignment: u64,
    ) -> ExecResult<(Value, usize)> {
        let (value, used) = self.decode_target(plan, element, input, locals, field)?;
        if used == 0 {
            return Err(ExecError::Mismatch {
                field: field.to_string(),
                expected: "non-empty array element",
            });
        }
        let padded = to_len(codec::size_with_padding(used as u64, alignment), "padded element size")?;
        if padded > input.len() {
            return Err(ExecError::Codec(codec::CodecError::BufferTooSmall {
                required: padded,
                available: input.len(),
            }));
        }
        Ok((value, padded))
    }

    fn local_scalar(
        &self,
        plan: &TypePlan,
        locals: &BTreeMap<String, Value>,
        field: &str,
    ) -> ExecResult<u64> {
        locals
            .get(field)
            .and_then(Value::as_scalar)
            .ok_or_else(|| ExecError::MissingField {
                type_name: plan.type_name.clone(),
                field: field.to_string(),
            })
    }

    /* Decompose a bitmask into member values; reject uncovered bits. */
    fn flag_members(&self, enum_name: &str, raw: u64) -> ExecResult<Vec<u64>> {
        let plan = self
            .plans
            .enum_plan(enum_name)
            .ok_or_else(|| ExecError::UnknownType {
                type_name: enum_name.to_string(),
            })?;
        let mut members = Vec::new();
        let mut covered = 0u64;
        for member in &plan.members {
            if member.value != 0 && raw & member.value == member.value {
                members.push(member.value);
                covered |= member.value;
            }
        }
        if covered != raw {
            return Err(ExecError::UnknownFlagBits {
                enum_name: enum_name.to_string(),
                value: raw,
            });
        }
        Ok(members)
    }

    /* ---------------------------------------------------------------- */
    /* Encode                                                           */
    /* ---------------------------------------------------------------- */

    fn encode_struct(&self, value: &StructValue) -> ExecResult<Vec<u8>> {
        let plan = self.plan(&value.type_name)?;
        self.encode_with_plan(plan, value, plan)
    }

    /* `root` stays the outermost plan across inline base/composed recursion:
       the size sentinel reports the whole entity's size, not the base
       slice's. */
    fn encode_with_plan(
        &self,
        plan: &TypePlan,
        value: &StructValue,
        root: &TypePlan,
    ) -> ExecResult<Vec<u8>> {
        let mut parts: Vec<Vec<u8>> = Vec::new();

        for step in &plan.serialize {
            match step {
                EncodeStep::Inline { param, type_name } => {
                    let p = self.param(plan, param)?;
                    let nested_plan = self.plan(type_name)?;
                    /* A composed sub-object is its own size root; only the
                       inheritance chain shares the outer entity's. */
                    let nested_root = match p.inline_role {
                        Some(InlineRole::Base) => root,
                        _ => nested_plan,
                    };
                    parts.push(self.encode_with_plan(nested_plan, value, nested_root)?);
                }

                EncodeStep::Field { param } => {
                    let p = self.param(plan, param)?;
                    if !self.value_guard(plan, p, value)? {
                        continue;
                    }
                    let field_value = value.get(&p.name).ok_or_else(|| ExecError::MissingField {
                        type_name: plan.type_name.clone(),
                        field: p.name.clone(),
                    })?;
                    let mut out = Vec::new();
                    self.encode_target(&p.target, field_value, &p.name, &mut out)?;
                    parts.push(out);
                }

                EncodeStep::Const {
                    param,
                    width,
                    value: literal,
                } => {
                    let p = self.param(plan, param)?;
                    if !self.value_guard(plan, p, value)? {
                        continue;
                    }
                    let mut out = Vec::new();
                    codec::write_uint(&mut out, *literal, to_len(*width, "const width")?)?;
                    parts.push(out);
                }

                EncodeStep::DerivedLen {
                    param,
                    width,
                    source,
                } => {
                    let p = self.param(plan, param)?;
                    if !self.value_guard(plan, p, value)? {
                        continue;
                    }
                    let computed = self.derived_value(plan, value, source, root)?;
                    let mut out = Vec::new();
                    codec::write_uint(&mut out, computed, to_len(*width, "length width")?)?;
                    parts.push(out);
                }
            }
        }

        Ok(codec::concat(parts))
    }

    fn value_guard(
        &self,
        plan: &TypePlan,
        param: &ResolvedParameter,
        value: &StructValue,
    ) -> ExecResult<bool> {
        match &param.condition {
            Some(condition) => check_guard(condition, value.get(&condition.field), &plan.type_name),
            None => Ok(true),
        }
    }

    /* Recompute a suppressed size/count field from the current values. */
    fn derived_value(
        &self,
        plan: &TypePlan,
        value: &StructValue,
        source: &DerivedLen,
        root: &TypePlan,
    ) -> ExecResult<u64> {
        match source {
            DerivedLen::Count { field } => match value.get(field) {
                Some(Value::Array(elements)) => Ok(elements.len() as u64),
                Some(Value::Bytes(bytes)) => Ok(bytes.len() as u64),
                Some(_) => Err(ExecError::Mismatch {
                    field: field.clone(),
                    expected: "array or bytes",
                }),
                /* Referencing field absent under a false guard. */
                None => Ok(0),
            },

            DerivedLen::ByteLen { field } => match value.get(field) {
                Some(field_value) => {
                    let p = self.param(plan, field)?;
                    self.target_size(&p.target, field_value, field)
                }
                None => Ok(0),
            },

            DerivedLen::TotalSize => self.size_with_plan(root, value),
        }
    }

    fn encode_target(
        &self,
        target: &TargetKind,
        value: &Value,
        field: &str,
        out: &mut Vec<u8>,
    ) -> ExecResult<()> {
        match target {
            TargetKind::UInt { width } => {
                let scalar = value.as_scalar().ok_or_else(|| ExecError::Mismatch {
                    field: field.to_string(),
                    expected: "integer",
                })?;
                codec::write_uint(out, scalar, to_len(*width, "integer width")?)?;
            }

            TargetKind::BigInt => {
                let scalar = value.as_scalar().ok_or_else(|| ExecError::Mismatch {
                    field: field.to_string(),
                    expected: "integer",
                })?;
                codec::write_uint(out, scalar, 8)?;
            }

            TargetKind::Bytes { len } => {
                let bytes = value.as_bytes().ok_or_else(|| ExecError::Mismatch {
                    field: field.to_string(),
                    expected: "bytes",
                })?;
                if let BytesLen::Fixed(expected) = len {
                    if bytes.len() as u64 != *expected {
                        return Err(ExecError::ByteLengthMismatch {
                            field: field.to_string(),
                            expected: *expected,
                            actual: bytes.len(),
                        });
                    }
                }
                out.extend_from_slice(bytes);
            }

            TargetKind::EnumRef { width, flags, .. } => {
                let raw = if *flags {
                    value
                        .as_flags()
                        .ok_or_else(|| ExecError::Mismatch {
                            field: field.to_string(),
                            expected: "flag set",
                        })?
                        .iter()
                        .fold(0u64, |acc, member| acc | member)
                } else {
                    match value {
                        Value::Enum(raw) => *raw,
                        _ => {
                            return Err(ExecError::Mismatch {
                                field: field.to_string(),
                                expected: "enum member",
                            });
                        }
                    }
                };
                codec::write_uint(out, raw, to_len(*width, "enum width")?)?;
            }

            TargetKind::StructRef { .. } => {
                let nested = value.as_struct().ok_or_else(|| ExecError::Mismatch {
                    field: field.to_string(),
                    expected: "struct",
                })?;
                out.extend_from_slice(&self.encode_struct(nested)?);
            }

            TargetKind::Array {
                element, alignment, ..
            } => {
                let elements = value.as_array().ok_or_else(|| ExecError::Mismatch {
                    field: field.to_string(),
                    expected: "array",
                })?;
                for element_value in elements {
                    let mut encoded = Vec::new();
                    self.encode_target(element, element_value, field, &mut encoded)?;
                    let padding = codec::padding_size(encoded.len() as u64, *alignment);
                    out.extend_from_slice(&encoded);
                    codec::write_padding(out, padding)?;
                }
            }
        }
        Ok(())
    }

    /* ---------------------------------------------------------------- */
    /* Size                                                             */
    /* ---------------------------------------------------------------- */

    fn size_with_plan(&self, plan: &TypePlan, value: &StructValue) -> ExecResult<u64> {
        let mut total = 0u64;

        for term in &plan.size {
            if let Some(condition) = &term.guard {
                if !check_guard(condition, value.get(&condition.field), &plan.type_name)? {
                    continue;
                }
            }

            total += match &term.kind {
                SizeTermKind::Literal(width) => *width,

                SizeTermKind::InlineSize { type_name } => {
                    let inline_plan = self.plan(type_name)?;
                    self.size_with_plan(inline_plan, value)?
                }

                SizeTermKind::NestedSize => {
                    let nested = self.term_value(plan, value, &term.param)?;
                    self.size_of(nested)?
                }

                SizeTermKind::BytesLen => {
                    let bytes = self
                        .term_value(plan, value, &term.param)?
                        .as_bytes()
                        .ok_or_else(|| ExecError::Mismatch {
                            field: term.param.clone(),
                            expected: "bytes",
                        })?;
                    bytes.len() as u64
                }

                SizeTermKind::ArrayPadded { alignment } => {
                    let p = self.param(plan, &term.param)?;
                    let element = match &p.target {
                        TargetKind::Array { element, .. } => element.as_ref(),
                        _ => {
                            return Err(ExecError::Mismatch {
                                field: term.param.clone(),
                                expected: "array",
                            });
                        }
                    };
                    let elements = self
                        .term_value(plan, value, &term.param)?
                        .as_array()
                        .ok_or_else(|| ExecError::Mismatch {
                            field: term.param.clone(),
                            expected: "array",
                        })?;
                    let mut sum = 0u64;
                    for element_value in elements {
                        let size = self.target_size(element, element_value, &term.param)?;
                        sum += codec::size_with_padding(size, *alignment);
                    }
                    sum
                }

                SizeTermKind::ArrayFixed { element_width } => {
                    let elements = self
                        .term_value(plan, value, &term.param)?
                        .as_array()
                        .ok_or_else(|| ExecError::Mismatch {
                            field: term.param.clone(),
                            expected: "array",
                        })?;
                    elements.len() as u64 * element_width
                }

                SizeTermKind::ArrayCount => {
                    let elements = self
                        .term_value(plan, value, &term.param)?
                        .as_array()
                        .ok_or_else(|| ExecError::Mismatch {
                            field: term.param.clone(),
                            expected: "array",
                        })?;
                    elements.len() as u64
                }
            };
        }

        Ok(total)
    }

    fn term_value<'v>(
        &self,
        plan: &TypePlan,
        value: &'v StructValue,
        field: &str,
    ) -> ExecResult<&'v Value> {
        value.get(field).ok_or_else(|| ExecError::MissingField {
            type_name: plan.type_name.clone(),
            field: field.to_string(),
        })
    }

    /* Encoded byte length of a single value, padding included for arrays. */
    fn target_size(&self, target: &TargetKind, value: &Value, field: &str) -> ExecResult<u64> {
        match target {
            TargetKind::UInt { width } => Ok(*width),
            TargetKind::BigInt => Ok(8),
            TargetKind::EnumRef { width, .. } => Ok(*width),
            TargetKind::Bytes { .. } => {
                let bytes = value.as_bytes().ok_or_else(|| ExecError::Mismatch {
                    field: field.to_string(),
                    expected: "bytes",
                })?;
                Ok(bytes.len() as u64)
            }
            TargetKind::StructRef { .. } => self.size_of(value),
            TargetKind::Array {
                element, alignment, ..
            } => {
                let elements = value.as_array().ok_or_else(|| ExecError::Mismatch {
                    field: field.to_string(),
                    expected: "array",
                })?;
                let mut sum = 0u64;
                for element_value in elements {
                    let size = self.target_size(element, element_value, field)?;
                    sum += codec::size_with_padding(size, *alignment);
                }
                Ok(sum)
            }
        }
    }
}

/* Evaluate a condition against its controlling sibling's value. */
fn check_guard(
    condition: &ResolvedCondition,
    field_value: Option<&Value>,
    type_name: &str,
) -> ExecResult<bool> {
    let field_value = field_value.ok_or_else(|| ExecError::MissingField {
        type_name: type_name.to_string(),
        field: condition.field.clone(),
    })?;
    match condition.op {
        ConditionOp::Equals | ConditionOp::NotEquals => {
            let scalar = field_value.as_scalar().ok_or_else(|| ExecError::Mismatch {
                field: condition.field.clone(),
                expected: "scalar",
            })?;
            let holds = scalar == condition.value;
            Ok(if condition.op == ConditionOp::Equals {
                holds
            } else {
                !holds
            })
        }
        ConditionOp::In => {
            let members = field_value.as_flags().ok_or_else(|| ExecError::Mismatch {
                field: condition.field.clone(),
                expected: "flag set",
            })?;
            Ok(members.contains(&condition.value))
        }
    }
}

fn to_len(value: u64, context: &'static str) -> ExecResult<usize> {
    usize::try_from(value).map_err(|_| ExecError::LengthOverflow { context, value })
}
