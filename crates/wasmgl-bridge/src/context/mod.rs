//! Graphics contexts and the registry that names them.

mod registry;
mod state;

pub use registry::ContextRegistry;
pub use state::{Context, TextureSlot};
