//! Transaction dispatch tables.
//!
//! Built once over the whole schema model after resolution: for each of the
//! two dispatch families (top-level and embedded), a lookup from the
//! const-declared (type-code, version) pair to the concrete type responsible
//! for decoding it. A miss is not an error; callers fall back to the decoded
//! common header.

use crate::model::SchemaModel;
use layout_types::{ConstValue, Disposition, TypeDefinition};
use serde_derive::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchEntry {
    pub type_name: String,
    pub type_code: u64,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchTable {
    /// Common header type whose prefix every family member shares.
    pub header: String,
    /// Header field read back as the type-code.
    pub type_field: String,
    /// Header field read back as the version.
    pub version_field: String,
    pub entries: Vec<DispatchEntry>,
}

impl DispatchTable {
    pub fn lookup(&self, type_code: u64, version: u64) -> Option<&DispatchEntry> {
        self.entries
            .iter()
            .find(|entry| entry.type_code == type_code && entry.version == version)
    }
}

/// Build the top-level and embedded dispatch tables.
pub fn build_dispatch_tables(model: &SchemaModel) -> Vec<DispatchTable> {
    vec![build_family(model, false), build_family(model, true)]
}

fn build_family(model: &SchemaModel, embedded: bool) -> DispatchTable {
    let options = model.dispatch();
    let suffix = options.top_level_header.as_str();
    let embedded_prefix = options
        .embedded_header
        .strip_suffix(suffix)
        .unwrap_or(options.embedded_header.as_str());

    let header = if embedded {
        options.embedded_header.clone()
    } else {
        options.top_level_header.clone()
    };

    let mut entries = Vec::new();
    for typedef in model.definitions() {
        if !typedef.is_struct()
            || typedef.name == options.top_level_header
            || typedef.name == options.embedded_header
            || !typedef.name.ends_with(suffix)
        {
            continue;
        }
        if typedef.name.starts_with(embedded_prefix) != embedded {
            continue;
        }
        let type_code = const_field_value(model, typedef, &options.type_code_field);
        let version = const_field_value(model, typedef, &options.version_field);
        if let (Some(type_code), Some(version)) = (type_code, version) {
            entries.push(DispatchEntry {
                type_name: typedef.name.clone(),
                type_code,
                version,
            });
        }
    }

    DispatchTable {
        header,
        type_field: options.header_type_field.clone(),
        version_field: options.header_version_field.clone(),
        entries,
    }
}

/* Numeric value of a named const entry, with enum members substituted. */
fn const_field_value(model: &SchemaModel, typedef: &TypeDefinition, field_name: &str) -> Option<u64> {
    let field = typedef
        .layout
        .iter()
        .find(|f| f.disposition == Disposition::Const && f.name.as_deref() == Some(field_name))?;
    match field.value.as_ref()? {
        ConstValue::Number(n) => Some(*n),
        ConstValue::EnumMember(member) => model.lookup(field.stripped_type())?.enum_member(member),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelOptions, SchemaModel};
    use layout_types::{EnumValue, FieldSpec, SizeSpec, TypeKind};

    fn const_field(name: &str, field_type: &str, value: ConstValue) -> FieldSpec {
        FieldSpec {
            name: Some(name.to_string()),
            field_type: field_type.to_string(),
            size: None,
            disposition: Disposition::Const,
            condition: None,
            condition_operation: None,
            condition_value: None,
            element_disposition: None,
            sort_key: None,
            value: Some(value),
            comments: None,
        }
    }

    fn transaction(name: &str, type_member: &str, version: u64) -> TypeDefinition {
        TypeDefinition {
            name: name.to_string(),
            kind: TypeKind::Struct,
            size: None,
            comments: None,
            layout: vec![
                const_field(
                    "TRANSACTION_TYPE",
                    "TransactionType",
                    ConstValue::EnumMember(type_member.to_string()),
                ),
                const_field("TRANSACTION_VERSION", "byte", ConstValue::Number(version)),
                FieldSpec {
                    name: Some("body".to_string()),
                    field_type: "byte".to_string(),
                    size: Some(SizeSpec::Fixed(4)),
                    disposition: Default::default(),
                    condition: None,
                    condition_operation: None,
                    condition_value: None,
                    element_disposition: None,
                    sort_key: None,
                    value: None,
                    comments: None,
                },
            ],
            values: Vec::new(),
        }
    }

    fn test_model() -> SchemaModel {
        SchemaModel::new(
            vec![
                TypeDefinition {
                    name: "TransactionType".to_string(),
                    kind: TypeKind::Enum,
                    size: Some(2),
                    comments: None,
                    layout: Vec::new(),
                    values: vec![
                        EnumValue {
                            name: "TRANSFER".to_string(),
                            value: 16724,
                            comments: None,
                        },
                        EnumValue {
                            name: "HASH_LOCK".to_string(),
                            value: 16712,
                            comments: None,
                        },
                    ],
                },
                transaction("TransferTransaction", "TRANSFER", 1),
                transaction("HashLockTransaction", "HASH_LOCK", 1),
                transaction("EmbeddedTransferTransaction", "TRANSFER", 1),
            ],
            ModelOptions::default(),
        )
    }

    #[test]
    fn families_split_on_the_embedded_prefix() {
        let tables = build_dispatch_tables(&test_model());
        assert_eq!(tables.len(), 2);

        let top = &tables[0];
        assert_eq!(top.header, "Transaction");
        let top_names: Vec<&str> = top.entries.iter().map(|e| e.type_name.as_str()).collect();
        assert_eq!(top_names, vec!["TransferTransaction", "HashLockTransaction"]);

        let embedded = &tables[1];
        assert_eq!(embedded.header, "EmbeddedTransaction");
        assert_eq!(embedded.entries.len(), 1);
        assert_eq!(embedded.entries[0].type_name, "EmbeddedTransferTransaction");
    }

    #[test]
    fn entries_resolve_enum_type_codes() {
        let tables = build_dispatch_tables(&test_model());
        let entry = tables[0].lookup(16724, 1).unwrap();
        assert_eq!(entry.type_name, "TransferTransaction");
        assert_eq!(tables[0].lookup(16724, 2), None);
        assert_eq!(tables[0].lookup(9999, 1), None);
    }

    #[test]
    fn types_without_const_markers_are_skipped() {
        let mut model_types = vec![transaction("TransferTransaction", "TRANSFER", 1)];
        model_types.push(TypeDefinition {
            name: "OrphanTransaction".to_string(),
            kind: TypeKind::Struct,
            size: None,
            comments: None,
            layout: Vec::new(),
            values: Vec::new(),
        });
        model_types.push(TypeDefinition {
            name: "TransactionType".to_string(),
            kind: TypeKind::Enum,
            size: Some(2),
            comments: None,
            layout: Vec::new(),
            values: vec![EnumValue {
                name: "TRANSFER".to_string(),
                value: 16724,
                comments: None,
            }],
        });
        let model = SchemaModel::new(model_types, ModelOptions::default());
        let tables = build_dispatch_tables(&model);
        assert_eq!(tables[0].entries.len(), 1);
    }
}
