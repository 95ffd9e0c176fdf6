//! The host graphics API seam.
//!
//! Everything above this module talks to GL through [`GraphicsApi`]. Two
//! backends ship: [`GlowApi`] for a real `glow` context and [`RecordingApi`],
//! a headless backend that records calls.

mod api;
mod glow_backend;
mod recording;
mod surface;

pub use api::{gl, AttribLayout, Capabilities, GraphicsApi, TextureFilter};
pub use glow_backend::{GlowApi, GlowSurfaces};
pub use recording::{Call, RecordingApi, RecordingSurfaces};
pub use surface::SurfaceProvider;
