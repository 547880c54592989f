use indexmap::IndexMap;
use layout_loader::{DispatchOptions, LoadedSchema, SchemaOptions};
use layout_types::{strip_array, TypeDefinition, BYTE_TYPE};
use std::collections::BTreeSet;

/// Alignment applied to self-describing embedded-transaction elements.
pub const EMBEDDED_ALIGNMENT: u64 = 8;

/// Options governing a compile run, derived from the schema document.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Marker types: structurally-empty wrappers excluded from their own
    /// code generation and spliced in place when inlined.
    pub markers: BTreeSet<String>,
    /// Dispatch family configuration.
    pub dispatch: DispatchOptions,
}

impl From<&SchemaOptions> for ModelOptions {
    fn from(options: &SchemaOptions) -> Self {
        Self {
            markers: options.marker_types().into_iter().collect(),
            dispatch: options.dispatch.clone(),
        }
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self::from(&SchemaOptions::default())
    }
}

/// Immutable, in-memory view of every type definition in a compile run.
///
/// All cross-type traversal goes through name-based lookup on this model;
/// unresolved names surface at resolution time as errors, never as silent
/// defaults.
#[derive(Debug)]
pub struct SchemaModel {
    types: IndexMap<String, TypeDefinition>,
    options: ModelOptions,
}

impl SchemaModel {
    pub fn new(types: Vec<TypeDefinition>, options: ModelOptions) -> Self {
        let types = types
            .into_iter()
            .map(|typedef| (typedef.name.clone(), typedef))
            .collect();
        Self { types, options }
    }

    pub fn from_loaded(loaded: LoadedSchema) -> Self {
        let options = ModelOptions::from(&loaded.options);
        Self::new(loaded.types, options)
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn dispatch(&self) -> &DispatchOptions {
        &self.options.dispatch
    }

    /// True when the (array-stripped) reference names an enum definition.
    pub fn is_enum(&self, type_ref: &str) -> bool {
        self.lookup(strip_array(type_ref))
            .map(|t| t.is_enum())
            .unwrap_or(false)
    }

    /// True when the (array-stripped) reference names a struct definition.
    pub fn is_struct(&self, type_ref: &str) -> bool {
        self.lookup(strip_array(type_ref))
            .map(|t| t.is_struct())
            .unwrap_or(false)
    }

    /// An enum's on-wire width equals its own declared size.
    pub fn enum_size(&self, name: &str) -> Option<u64> {
        self.lookup(strip_array(name))
            .filter(|t| t.is_enum())
            .and_then(|t| t.size)
    }

    /// Bitmask enums carry the `Flags` suffix; their field values are sets
    /// of members rather than a single member.
    pub fn is_flags(&self, name: &str) -> bool {
        let stripped = strip_array(name);
        self.is_enum(stripped) && stripped.ends_with("Flags")
    }

    pub fn is_marker(&self, name: &str) -> bool {
        self.options.markers.contains(strip_array(name))
    }

    /// Whether a definition gets code of its own.
    pub fn should_generate(&self, name: &str) -> bool {
        !self.is_marker(name)
    }

    /// Inter-element alignment for arrays of the given element type: 8 for
    /// the self-describing embedded-transaction element type, 0 otherwise.
    ///
    /// Centralized so that a future schema-declared alignment attribute
    /// only has to replace this one seam.
    pub fn alignment_for_element(&self, element_type: &str) -> u64 {
        if strip_array(element_type) == self.options.dispatch.embedded_header {
            EMBEDDED_ALIGNMENT
        } else {
            0
        }
    }

    /// True for the built-in raw byte tag (not a definition lookup).
    pub fn is_byte(&self, type_ref: &str) -> bool {
        strip_array(type_ref) == BYTE_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_types::{EnumValue, TypeKind};

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

    #[test]
    fn enum_lookup_and_size() {
        let model = SchemaModel::new(
            vec![enum_def("NetworkType", 1, vec![("MAINNET", 104)])],
            ModelOptions::default(),
        );
        assert!(model.is_enum("NetworkType"));
        assert!(model.is_enum("[NetworkType]"));
        assert_eq!(model.enum_size("NetworkType"), Some(1));
        assert_eq!(model.enum_size("Missing"), None);
        assert!(!model.is_struct("NetworkType"));
    }

    #[test]
    fn flags_detection_requires_enum_and_suffix() {
        let model = SchemaModel::new(
            vec![enum_def("MosaicFlags", 1, vec![("NONE", 0), ("SUPPLY_MUTABLE", 1)])],
            ModelOptions::default(),
        );
        assert!(model.is_flags("MosaicFlags"));
        assert!(!model.is_flags("OtherFlags"));
    }

    #[test]
    fn embedded_elements_align_to_eight() {
        let model = SchemaModel::new(Vec::new(), ModelOptions::default());
        assert_eq!(model.alignment_for_element("[EmbeddedTransaction]"), 8);
        assert_eq!(model.alignment_for_element("[Mosaic]"), 0);
        assert_eq!(model.alignment_for_element("byte"), 0);
    }

    #[test]
    fn default_markers_are_excluded_from_generation() {
        let model = SchemaModel::new(Vec::new(), ModelOptions::default());
        assert!(model.is_marker("EntityBody"));
        assert!(!model.should_generate("VerifiableEntity"));
        assert!(model.should_generate("TransferTransaction"));
    }
}
