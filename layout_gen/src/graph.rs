use crate::model::SchemaModel;
use layout_types::TypeDefinition;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Tracks cross-type references for deterministic emission ordering and
/// up-front unknown-reference detection.
///
/// Reference sets double as the emitted import lists: everything a type's
/// code needs to import is a function of its resolved reference set, not a
/// side effect accumulated during field resolution.
#[derive(Debug)]
pub struct ReferenceGraph {
    nodes: BTreeMap<String, ReferenceNode>,
}

#[derive(Debug, Clone)]
pub struct ReferenceNode {
    pub name: String,
    /// Names of other schema types this definition refers to.
    pub refs: BTreeSet<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("type '{type_name}' references unknown type '{reference}'")]
    UnknownReference {
        type_name: String,
        reference: String,
    },

    #[error("circular type reference detected: {0:?}")]
    CircularReference(Vec<String>),
}

impl ReferenceGraph {
    pub fn build(model: &SchemaModel) -> Self {
        let mut nodes = BTreeMap::new();
        for typedef in model.definitions() {
            let mut refs = BTreeSet::new();
            collect_references(typedef, &mut refs);
            refs.remove(&typedef.name); // Ignore self references.
            nodes.insert(
                typedef.name.clone(),
                ReferenceNode {
                    name: typedef.name.clone(),
                    refs,
                },
            );
        }
        Self { nodes }
    }

    /// Every reference that does not name a definition in the model.
    pub fn unknown_references(&self, model: &SchemaModel) -> Vec<GraphError> {
        let mut errors = Vec::new();
        for node in self.nodes.values() {
            for reference in &node.refs {
                if model.lookup(reference).is_none() {
                    errors.push(GraphError::UnknownReference {
                        type_name: node.name.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }
        errors
    }

    /// Import list for a single type.
    pub fn references(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.nodes.get(name).map(|node| &node.refs)
    }

    /// Computes a deterministic topological ordering using Kahn's algorithm,
    /// references first.
    pub fn emission_order(&self) -> Result<Vec<String>, GraphError> {
        let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();
        let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (name, node) in &self.nodes {
            in_degree.entry(name.clone()).or_insert(0);
            for reference in &node.refs {
                if !self.nodes.contains_key(reference) {
                    continue; // Unknown refs are reported separately.
                }
                adjacency
                    .entry(reference.clone())
                    .or_default()
                    .push(name.clone());
                *in_degree.entry(name.clone()).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<String> = in_degree
            .iter()
            .filter_map(|(name, degree)| if *degree == 0 { Some(name.clone()) } else { None })
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(name) = queue.pop_front() {
            order.push(name.clone());

            if let Some(children) = adjacency.get(&name) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(child.clone());
                        }
                    }
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            let cycle: Vec<String> = in_degree
                .into_iter()
                .filter_map(|(name, degree)| if degree > 0 { Some(name) } else { None })
                .collect();
            Err(GraphError::CircularReference(cycle))
        }
    }
}

fn collect_references(typedef: &TypeDefinition, refs: &mut BTreeSet<String>) {
    for field in &typedef.layout {
        if !field.is_byte() {
            refs.insert(field.stripped_type().to_string());
        }
    }
}
