//! Host side of the wasmgl bridge.
//!
//! A sandboxed module can only pass integers, floats and pointers into its own
//! linear memory. This crate turns those into GL work on the host:
//! - handle tables that name host GL objects with small integers
//! - a batched command interpreter (one boundary call per frame)
//! - an async, request-coalescing texture cache
//! - a non-blocking GPU timer ring

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod handles;
pub mod host;
pub mod logging;
pub mod submit;
pub mod texture;
pub mod time;

pub use bridge::{Abi, Bridge, FrameReport, GuestExports, GuestMemory, Notification, Telemetry};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use handles::{Handle, ResourceKind, NULL_HANDLE};
pub use host::{Capabilities, GraphicsApi, SurfaceProvider};
pub use submit::SubmitStats;
pub use texture::{CacheKey, RequestId, TextureSource};
pub use time::GpuTime;
