//! Render pass error taxonomy.
//!
//! Fatal kinds are [`RenderError`] values and abort the pass. Non-fatal kinds
//! are [`RenderWarning`] values; they are logged and the pass continues with
//! degraded output.

use thiserror::Error;

use crate::device::ShaderStage;

/// Which step of the program build failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BuildStep {
    Compile(ShaderStage),
    Link,
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStep::Compile(stage) => write!(f, "{stage} compile"),
            BuildStep::Link => f.write_str("link"),
        }
    }
}

/// The backend refused to issue a draw call.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("draw rejected: {reason}")]
pub struct DrawRejected {
    pub reason: String,
}

impl DrawRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Fatal render pass errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    #[error("surface could not provide a GPU context: {reason}")]
    ContextUnavailable { reason: String },

    #[error("shader program build failed at {step}: {diagnostic}")]
    ShaderBuildFailed { step: BuildStep, diagnostic: String },

    #[error(
        "attribute `{name}` has {len} floats, not a positive multiple of {components} components"
    )]
    MalformedAttribute {
        name: String,
        components: u32,
        len: usize,
    },

    #[error("attribute `{name}` has {found} vertices, expected {expected}")]
    VertexCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("failed to allocate a buffer for attribute `{name}`")]
    BufferAllocation { name: String },

    #[error(transparent)]
    DrawRejected(#[from] DrawRejected),
}

/// Non-fatal resolution misses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderWarning {
    #[error("attribute `{name}` is not declared by the active program")]
    AttributeUnresolved { name: String },

    #[error("uniform `{name}` is not declared by the active program")]
    UniformUnresolved { name: String },
}

impl RenderWarning {
    /// Writes the warning to the log.
    pub fn report(&self) {
        log::warn!("{self}");
    }
}
