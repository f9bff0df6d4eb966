use apiary_types::{Cell, CellCode};
use tracing::debug;

use crate::checks::{default_checks, CheckVerdict, SourceCheck};
use crate::error::CompilerError;
use crate::result::{CompiledUnit, CompilerResult};

/// Transforms cell source into its published form.
///
/// Compilation never touches storage. Implementations take the cell for its
/// privileges and address, produce a result, and leave persisting that result
/// to the caller.
pub trait CellCompiler: Send + Sync {
    fn compile(&self, cell: &Cell, source: &CellCode) -> Result<CompilerResult, CompilerError>;
}

/// The standard compiler: run every check, then render the markup with a
/// provenance preamble.
///
/// Checks run in order and the first failure wins, so a cell that is both
/// over quota and in violation of its network policy reports the quota.
pub struct SandboxCompiler {
    app_id: String,
    checks: Vec<Box<dyn SourceCheck>>,
}

impl SandboxCompiler {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            checks: default_checks(),
        }
    }

    /// Replaces the check pipeline. Useful for tightening or relaxing the
    /// gate without a new compiler type.
    pub fn with_checks(mut self, checks: Vec<Box<dyn SourceCheck>>) -> Self {
        self.checks = checks;
        self
    }

    fn source_hash(source: &CellCode) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"apiary-source-v1:");
        hasher.update(source.markup.as_bytes());
        hex::encode(&hasher.finalize().as_bytes()[..4])
    }

    fn render(&self, cell: &Cell, source: &CellCode) -> String {
        let hash = Self::source_hash(source);
        format!(
            "<!-- apiary:{} cell={} source={} -->\n{}",
            self.app_id, cell.mapping, hash, source.markup
        )
    }
}

impl CellCompiler for SandboxCompiler {
    fn compile(&self, cell: &Cell, source: &CellCode) -> Result<CompilerResult, CompilerError> {
        for check in &self.checks {
            if let CheckVerdict::Fail { status, reason } = check.evaluate(source, &cell.privileges)
            {
                debug!(
                    cell = %cell.mapping,
                    check = check.name(),
                    %status,
                    "source rejected"
                );
                return Ok(CompilerResult::failure(status, reason));
            }
        }

        let markup = self.render(cell, source);
        Ok(CompilerResult::success(CompiledUnit::new(markup)))
    }
}
