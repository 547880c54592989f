//! Binary-layout schema compiler core.
//!
//! Compiles declarative wire-format schemas into per-type operation plans
//! (constructor, size, deserialize, serialize) plus transaction dispatch
//! tables, and renders the plans to target-language source text.

pub mod cmds;
pub mod codegen;
pub mod dispatch;
pub mod graph;
pub mod model;
pub mod plan;
pub mod resolve;
