use std::fmt;

use crate::handles::ResourceKind;

/// Errors returned synchronously across the boundary.
///
/// Texture load failures are not here: they are reported to the guest via
/// `on_texture_failed` (see [`LoadError`](crate::texture::LoadError)).
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Unknown context id, or a resource handle outside its table.
    InvalidHandle { kind: ResourceKind, handle: i32 },
    /// Shader compilation failed; `log` is the host info log verbatim.
    CompileError { log: String },
    /// Program link failed; `log` is the host info log verbatim.
    LinkError { log: String },
    /// The surface id is unknown or the graphics API is unavailable.
    ContextCreation { surface: String, reason: String },
    /// The host refused to create an object (out of memory, lost context).
    ResourceCreation { kind: ResourceKind, reason: String },
    /// A pointer/length pair does not fit in guest memory.
    MemoryOutOfBounds { ptr: u32, len: usize },
    /// A guest string is not valid UTF-8 (or not NUL-terminated).
    InvalidString { ptr: u32 },
    /// The operation needs a capability this context lacks.
    Unsupported(&'static str),
    /// A texture unit at or past the context's combined unit count.
    InvalidTextureUnit { unit: u32, units: u32 },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::InvalidHandle { kind, handle } => {
                write!(f, "invalid {kind} handle {handle}")
            }
            BridgeError::CompileError { log } => write!(f, "shader compile error: {log}"),
            BridgeError::LinkError { log } => write!(f, "program link error: {log}"),
            BridgeError::ContextCreation { surface, reason } => {
                write!(f, "cannot create context for surface {surface:?}: {reason}")
            }
            BridgeError::ResourceCreation { kind, reason } => {
                write!(f, "cannot create {kind}: {reason}")
            }
            BridgeError::MemoryOutOfBounds { ptr, len } => {
                write!(f, "guest memory range {ptr:#x}+{len} is out of bounds")
            }
            BridgeError::InvalidString { ptr } => {
                write!(f, "guest string at {ptr:#x} is not valid UTF-8")
            }
            BridgeError::Unsupported(what) => write!(f, "{what} is not supported by this context"),
            BridgeError::InvalidTextureUnit { unit, units } => {
                write!(f, "texture unit {unit} is out of range (context has {units})")
            }
        }
    }
}

impl std::error::Error for BridgeError {}
