/* Dynamic values - the flattened public-interface view of decoded objects */

use serde::Serialize;

/* Enum representing all possible decoded values */
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /* Fixed-width unsigned integers, including 64-bit values */
    UInt(u64),

    /* Raw byte buffers */
    Bytes(Vec<u8>),

    /* A single enum member, by numeric value */
    Enum(u64),

    /* A bitmask enum value: the set of member values present */
    Flags(Vec<u64>),

    /* Ordered array of element values */
    Array(Vec<Value>),

    /* Struct value - flattened field map in interface order */
    Struct(StructValue),
}

#[derive(Debug, Clone, Serialize)]
pub struct StructValue {
    pub type_name: String,
    fields: Vec<(String, Value)>,
}

/* Field order is an encoding detail; equality compares the field sets */
impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        if self.type_name != other.type_name || self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl StructValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /* Builder-style helper for assembling test fixtures */
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /* Set a field, replacing any existing value */
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

impl Value {
    /* Scalar view shared by integers and enum members */
    pub fn as_scalar(&self) -> Option<u64> {
        match self {
            Value::UInt(v) | Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&[u64]> {
        match self {
            Value::Flags(members) => Some(members),
            _ => None,
        }
    }
}
