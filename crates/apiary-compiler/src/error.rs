use thiserror::Error;

/// Internal gate faults.
///
/// Problems with the submitted source are not errors; they come back as
/// statuses in [`CompilerResult`](crate::CompilerResult). This type only
/// covers the gate itself breaking.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("compiler backend failure: {0}")]
    Backend(String),
}
