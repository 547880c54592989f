use layout_types::TypeDefinition;
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;

/* ============================================================================
   Schema Document Types
   ============================================================================ */

/* Configuration of the transaction dispatch families */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchOptions {
    /* Common header type of the top-level transaction family */
    #[serde(default = "DispatchOptions::default_top_level_header")]
    pub top_level_header: String,

    /* Common header type of the embedded transaction family */
    #[serde(default = "DispatchOptions::default_embedded_header")]
    pub embedded_header: String,

    /* Const entry naming a concrete type's type-code */
    #[serde(default = "DispatchOptions::default_type_code_field")]
    pub type_code_field: String,

    /* Const entry naming a concrete type's version */
    #[serde(default = "DispatchOptions::default_version_field")]
    pub version_field: String,

    /* Header field read back as the type-code during dispatch */
    #[serde(default = "DispatchOptions::default_header_type_field")]
    pub header_type_field: String,

    /* Header field read back as the version during dispatch */
    #[serde(default = "DispatchOptions::default_header_version_field")]
    pub header_version_field: String,
}

impl DispatchOptions {
    fn default_top_level_header() -> String {
        "Transaction".to_string()
    }

    fn default_embedded_header() -> String {
        "EmbeddedTransaction".to_string()
    }

    fn default_type_code_field() -> String {
        "TRANSACTION_TYPE".to_string()
    }

    fn default_version_field() -> String {
        "TRANSACTION_VERSION".to_string()
    }

    fn default_header_type_field() -> String {
        "type".to_string()
    }

    fn default_header_version_field() -> String {
        "version".to_string()
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            top_level_header: Self::default_top_level_header(),
            embedded_header: Self::default_embedded_header(),
            type_code_field: Self::default_type_code_field(),
            version_field: Self::default_version_field(),
            header_type_field: Self::default_header_type_field(),
            header_version_field: Self::default_header_version_field(),
        }
    }
}

/* Schema document options */
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaOptions {
    /* Structurally-empty wrapper structs excluded from their own code
       generation; inline references to them are spliced in place. When
       absent, the standard wrapper set of the target protocol applies. */
    #[serde(default)]
    pub marker_types: Option<Vec<String>>,

    /* Dispatch family configuration */
    #[serde(default)]
    pub dispatch: DispatchOptions,

    /* Optional license header injected at the top of every emitted file */
    #[serde(default)]
    pub license_header: Option<PathBuf>,
}

impl SchemaOptions {
    /* Standard wrapper set used when the document declares none */
    pub const DEFAULT_MARKERS: [&'static str; 4] = [
        "SizePrefixedEntity",
        "VerifiableEntity",
        "EntityBody",
        "EmbeddedTransactionHeader",
    ];

    /* Effective marker type list */
    pub fn marker_types(&self) -> Vec<String> {
        match &self.marker_types {
            Some(markers) => markers.clone(),
            None => Self::DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/* Metadata for a schema document */
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaMetadata {
    /* Schema identifier (e.g., "symbol.transactions") */
    pub name: String,

    /* Document description */
    #[serde(default)]
    pub description: Option<String>,

    /* Optional configuration options */
    #[serde(default)]
    pub options: SchemaOptions,
}

/* Complete schema document with metadata and type definitions */
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaFile {
    /* Document metadata */
    pub schema: SchemaMetadata,

    /* Type definitions */
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

impl SchemaFile {
    /* Get all type definitions */
    pub fn get_types(&self) -> &[TypeDefinition] {
        &self.types
    }

    /* Get the schema identifier */
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /* Get the options */
    pub fn options(&self) -> &SchemaOptions {
        &self.schema.options
    }
}
