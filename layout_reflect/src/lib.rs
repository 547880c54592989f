//! Plan execution against in-memory values.
//!
//! Executes the operation plans built by `layout_gen` directly: decoding
//! byte buffers into dynamic values, re-encoding values into bytes and
//! evaluating size plans. The executor is the reference semantics of the
//! generated codecs; the round-trip properties of the compiler are tested
//! through it without running emitted target-language code.

pub mod errors;
pub mod exec;
pub mod value;

pub use errors::{ExecError, ExecResult};
pub use exec::Executor;
pub use value::{StructValue, Value};
