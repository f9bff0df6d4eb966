//! The compilation gate for apiary cells.
//!
//! Source markup passes through a fail-fast pipeline of
//! [`SourceCheck`]s (quota, network policy, well-formedness) and, when
//! every check passes, a deterministic transform that produces the
//! [`CompiledUnit`] served to readers. Recoverable findings come back as
//! a [`CompilationStatus`](apiary_types::CompilationStatus) inside
//! [`CompilerResult`]; `Err` is reserved for faults inside the gate
//! itself.
//!
//! The gate never touches storage. Deciding what to do with a result,
//! including leaving previously published content untouched on failure,
//! belongs to the caller.

pub mod checks;
pub mod compiler;
pub mod error;
pub mod result;

pub use checks::{default_checks, CheckVerdict, MarkupCheck, NetworkAccessCheck, QuotaCheck, SourceCheck};
pub use compiler::{CellCompiler, SandboxCompiler};
pub use error::CompilerError;
pub use result::{CompiledUnit, CompilerResult};
