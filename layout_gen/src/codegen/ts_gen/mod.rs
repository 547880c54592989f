pub mod class_gen;
pub mod dispatch_gen;
pub mod enum_gen;
pub mod helpers;

pub use class_gen::emit_class;
pub use dispatch_gen::emit_dispatch_helper;
pub use enum_gen::emit_enum;

/// Runtime support file every generated class imports.
pub const UTILS_RUNTIME: &str = include_str!("runtime/Utils.ts");

/// Common interface implemented by every generated class.
pub const SERIALIZER_INTERFACE: &str = include_str!("runtime/Serializer.ts");
