//! Time subsystem.
//!
//! - `FrameClock`: CPU-side frame delta, FPS and CPU frame time estimates
//! - `GpuTimer`: a ring of timer queries measuring GPU frame time without
//!   ever waiting on the GPU

mod frame_clock;
mod gpu_ring;

pub use frame_clock::{ema, FrameClock, FrameStats, FrameTime};
pub use gpu_ring::{GpuTime, GpuTimer};
