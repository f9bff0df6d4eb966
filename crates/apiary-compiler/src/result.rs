use apiary_types::CompilationStatus;

/// Compiled markup ready to serve, with its content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledUnit {
    pub markup: String,
    /// BLAKE3 hash of the compiled markup, domain-separated.
    pub content_hash: [u8; 32],
}

impl CompiledUnit {
    pub fn new(markup: String) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"apiary-compiled-v1:");
        hasher.update(markup.as_bytes());
        let content_hash = *hasher.finalize().as_bytes();
        Self {
            markup,
            content_hash,
        }
    }

    /// Short hex form of the content hash for logs and preambles.
    pub fn short_hash(&self) -> String {
        hex::encode(&self.content_hash[..4])
    }
}

/// What a compilation attempt produced.
///
/// A result is never partial: success always carries a unit, failure
/// never does. The constructors enforce this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerResult {
    pub status: CompilationStatus,
    pub unit: Option<CompiledUnit>,
    /// Human-readable finding from the check that failed.
    pub reason: Option<String>,
}

impl CompilerResult {
    pub fn success(unit: CompiledUnit) -> Self {
        Self {
            status: CompilationStatus::NoError,
            unit: Some(unit),
            reason: None,
        }
    }

    pub fn failure(status: CompilationStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            unit: None,
            reason: Some(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}
