use serde_derive::{Deserialize, Serialize};

/// Primitive tag used by fields that carry raw bytes or fixed-width integers.
pub const BYTE_TYPE: &str = "byte";

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    #[serde(rename = "byte")]
    Primitive,
    Struct,
    Enum,
}

/// Structural role of a layout entry.
///
/// A missing `disposition` key in a schema document means [`Disposition::Plain`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Disposition {
    #[default]
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "inline")]
    Inline,
    #[serde(rename = "const")]
    Const,
    #[serde(rename = "reserved")]
    Reserved,
    #[serde(rename = "array")]
    Array,
    #[serde(rename = "array fill")]
    ArrayFill,
    #[serde(rename = "array sized")]
    ArraySized,
}

impl Disposition {
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Disposition::Array | Disposition::ArrayFill | Disposition::ArraySized
        )
    }
}

/// Byte width of a field: either a literal count or the name of a sibling
/// field whose runtime value supplies the count/length.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum SizeSpec {
    Fixed(u64),
    FieldRef(String),
}

impl SizeSpec {
    pub fn fixed(&self) -> Option<u64> {
        match self {
            SizeSpec::Fixed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn field_ref(&self) -> Option<&str> {
        match self {
            SizeSpec::FieldRef(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConditionOp {
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "not equals")]
    NotEquals,
    #[serde(rename = "in")]
    In,
}

/// Literal value of a const/reserved entry or a condition comparison:
/// either a number or the name of an enum member.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum ConstValue {
    Number(u64),
    EnumMember(String),
}

/// One entry of a struct's wire layout.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct FieldSpec {
    /// Field name. Optional for const/reserved entries with synthetic names.
    #[serde(default)]
    pub name: Option<String>,

    /// Primitive tag (`byte`) or a type name, possibly array-marked (`[T]`).
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub size: Option<SizeSpec>,

    #[serde(default)]
    pub disposition: Disposition,

    /// Name of the sibling field this entry's presence depends on.
    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default)]
    pub condition_operation: Option<ConditionOp>,

    #[serde(default)]
    pub condition_value: Option<ConstValue>,

    /// Marks array elements as self-describing (each element reports its own
    /// size), which switches size accounting to element counts.
    #[serde(default)]
    pub element_disposition: Option<String>,

    /// Documents the expected ordering of array elements. Never re-sorted.
    #[serde(default)]
    pub sort_key: Option<String>,

    /// Literal for const/reserved entries.
    #[serde(default)]
    pub value: Option<ConstValue>,

    #[serde(default)]
    pub comments: Option<String>,
}

impl FieldSpec {
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    /// Element/base type with any array marker stripped.
    pub fn stripped_type(&self) -> &str {
        strip_array(&self.field_type)
    }

    pub fn is_byte(&self) -> bool {
        self.stripped_type() == BYTE_TYPE
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct EnumValue {
    pub name: String,
    pub value: u64,
    #[serde(default)]
    pub comments: Option<String>,
}

/// A single schema type definition. Identity is the unique `name`; other
/// definitions refer to it by name only, the schema model owns the data.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TypeDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: TypeKind,

    /// Declared byte width (required for enums and fixed primitives).
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub comments: Option<String>,

    /// Ordered wire layout (structs only).
    #[serde(default)]
    pub layout: Vec<FieldSpec>,

    /// Ordered value set (enums only).
    #[serde(default)]
    pub values: Vec<EnumValue>,
}

impl TypeDefinition {
    pub fn is_struct(&self) -> bool {
        self.kind == TypeKind::Struct
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    pub fn enum_member(&self, member: &str) -> Option<u64> {
        self.values.iter().find(|v| v.name == member).map(|v| v.value)
    }
}

/// Strip the array marker from a type reference (`[T]` -> `T`).
pub fn strip_array(type_ref: &str) -> &str {
    type_ref
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(type_ref)
}

/// True when a type reference carries the array marker.
pub fn is_array_ref(type_ref: &str) -> bool {
    type_ref.starts_with('[') && type_ref.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_array_marker() {
        assert_eq!(strip_array("[EmbeddedTransaction]"), "EmbeddedTransaction");
        assert_eq!(strip_array("Address"), "Address");
        assert!(is_array_ref("[Mosaic]"));
        assert!(!is_array_ref("Mosaic"));
    }

    #[test]
    fn size_spec_accessors() {
        assert_eq!(SizeSpec::Fixed(4).fixed(), Some(4));
        assert_eq!(SizeSpec::Fixed(4).field_ref(), None);
        let by_ref = SizeSpec::FieldRef("payload_size".to_string());
        assert_eq!(by_ref.field_ref(), Some("payload_size"));
        assert_eq!(by_ref.fixed(), None);
    }

    #[test]
    fn disposition_defaults_to_plain() {
        assert_eq!(Disposition::default(), Disposition::Plain);
        assert!(Disposition::ArrayFill.is_array());
        assert!(!Disposition::Inline.is_array());
    }
}
