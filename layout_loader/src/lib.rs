//! Layout Schema Document Loading
//!
//! This crate loads binary-layout schema documents from YAML files and
//! merges multiple documents into a single definition list for the
//! generator. The logical shape of a document (metadata plus an ordered
//! list of type definitions) is the contract the generator core depends on.

pub mod file;

use anyhow::{bail, Context, Result};
use layout_types::TypeDefinition;
use std::collections::HashSet;
use std::path::Path;

// Re-export commonly used types at the crate root
pub use file::{DispatchOptions, SchemaFile, SchemaMetadata, SchemaOptions};

/// Result of loading one or more schema documents.
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    /// All type definitions, in document order.
    pub types: Vec<TypeDefinition>,
    /// Options from the primary (first) document.
    pub options: SchemaOptions,
}

/// Load a single schema document.
pub fn load_file(path: &Path) -> Result<SchemaFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let file: SchemaFile = serde_yml::from_str(&text)
        .with_context(|| format!("failed to parse schema file {}", path.display()))?;
    Ok(file)
}

/// Load several documents and merge their type definitions.
///
/// The first file is the primary document; its options govern the compile
/// run. Duplicate type names across documents are rejected.
pub fn load_files(paths: &[impl AsRef<Path>]) -> Result<LoadedSchema> {
    if paths.is_empty() {
        bail!("no schema files given");
    }

    let mut types: Vec<TypeDefinition> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut options: Option<SchemaOptions> = None;

    for path in paths {
        let path = path.as_ref();
        let file = load_file(path)?;
        if options.is_none() {
            options = Some(file.schema.options.clone());
        }
        for typedef in file.types {
            if !seen.insert(typedef.name.clone()) {
                bail!(
                    "duplicate type definition '{}' while loading {}",
                    typedef.name,
                    path.display()
                );
            }
            types.push(typedef);
        }
    }

    Ok(LoadedSchema {
        types,
        options: options.unwrap_or_default(),
    })
}
