use std::fmt;

/// Shader stage tag carried by compile errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Engine error taxonomy.
///
/// The first four variants are fatal at construction and are never retried;
/// `Destroyed` is returned by any mutating call made after `destroy()`.
#[derive(Debug, Clone, PartialEq)]
pub enum NixieError {
    /// No float-like texture support at all on this adapter.
    UnsupportedPlatform,
    /// Float formats exist but none can be used as a render attachment.
    NoRenderableFormat,
    /// A shader stage failed validation.
    ShaderCompile { stage: ShaderStage, log: String },
    /// Pipeline creation (linking) failed.
    ProgramLink { log: String },
    /// The engine was destroyed; the operation was not performed.
    Destroyed,
}

impl fmt::Display for NixieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NixieError::UnsupportedPlatform => {
                write!(f, "no float texture support on this platform")
            }
            NixieError::NoRenderableFormat => {
                write!(f, "no advertised float format is render-target complete")
            }
            NixieError::ShaderCompile { stage, log } => {
                write!(f, "{stage} shader compile error: {log}")
            }
            NixieError::ProgramLink { log } => write!(f, "program link error: {log}"),
            NixieError::Destroyed => write!(f, "engine has been destroyed"),
        }
    }
}

impl std::error::Error for NixieError {}
