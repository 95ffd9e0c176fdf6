//! The host object a guest talks to.
//!
//! [`Bridge`] owns every context, the background image loader and the queue of
//! pending guest notifications. [`Abi`] is the flat, integer-and-pointer view
//! of it that a wasm import table binds to.

mod abi;
mod exports;
mod frame;
mod guest;
mod telemetry;
mod textures;

use std::collections::VecDeque;

use wasmgl_cmd::Command;

use crate::config::BridgeConfig;
use crate::context::{Context, ContextRegistry};
use crate::error::BridgeError;
use crate::handles::Handle;
use crate::host::SurfaceProvider;
use crate::submit::{self, BoundState, SubmitStats};
use crate::texture::{ImageLoader, LoadOutcome, ThreadedLoader};
use crate::time::FrameClock;

pub use abi::Abi;
pub use exports::{GuestExports, Notification};
pub use frame::FrameReport;
pub use guest::GuestMemory;
pub use telemetry::{Stat, StatValue, Telemetry};

/// Host state behind one guest module.
///
/// Everything here is touched only from the thread that owns the bridge.
/// Loader workers hand results back through [`ImageLoader::drain`].
pub struct Bridge<P: SurfaceProvider, L: ImageLoader = ThreadedLoader> {
    config: BridgeConfig,
    surfaces: P,
    contexts: ContextRegistry<P::Api>,
    loader: L,

    /// Notifications waiting for the next [`pump`](Self::pump).
    notifications: VecDeque<Notification>,
    /// Scratch for loader outcomes, reused across pumps.
    outcomes: Vec<LoadOutcome>,

    clock: FrameClock,
    telemetry: Telemetry,
    /// Submission counters since the current frame started.
    frame_submit: SubmitStats,
}

impl<P: SurfaceProvider> Bridge<P, ThreadedLoader> {
    /// Creates a bridge that loads textures on worker threads.
    pub fn new(config: BridgeConfig, surfaces: P) -> Self {
        let loader = ThreadedLoader::from_config(&config);
        Self::with_loader(config, surfaces, loader)
    }
}

impl<P: SurfaceProvider, L: ImageLoader> Bridge<P, L> {
    pub fn with_loader(config: BridgeConfig, surfaces: P, loader: L) -> Self {
        log::debug!(
            "bridge: asset root {:?}, timer ring depth {}",
            config.asset_root,
            config.timer_ring_depth
        );
        Self {
            config,
            surfaces,
            contexts: ContextRegistry::new(),
            loader,
            notifications: VecDeque::new(),
            outcomes: Vec::new(),
            clock: FrameClock::new(),
            telemetry: Telemetry::new(),
            frame_submit: SubmitStats::default(),
        }
    }

    /// Boundary view over the guest's linear memory.
    pub fn abi<'b, 'm>(&'b mut self, memory: &'m [u8]) -> Abi<'b, 'm, P, L> {
        Abi::new(self, GuestMemory::new(memory))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn surfaces_mut(&mut self) -> &mut P {
        &mut self.surfaces
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }

    pub fn contexts(&self) -> &ContextRegistry<P::Api> {
        &self.contexts
    }

    pub fn context(&self, id: Handle) -> Result<&Context<P::Api>, BridgeError> {
        self.contexts.get(id)
    }

    pub fn context_mut(&mut self, id: Handle) -> Result<&mut Context<P::Api>, BridgeError> {
        self.contexts.get_mut(id)
    }

    /// Notifications queued but not yet delivered.
    pub fn queued_notifications(&self) -> usize {
        self.notifications.len()
    }

    // ── contexts & resources ──

    pub fn create_context(&mut self, surface_id: &str) -> Result<Handle, BridgeError> {
        let id = self.contexts.create(&mut self.surfaces, surface_id, &self.config)?;
        log::info!("bridge: context {id} created for surface {surface_id:?}");
        Ok(id)
    }

    pub fn create_shader(&mut self, ctx: Handle, stage: u32, source: &str) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.create_shader(stage, source)
    }

    pub fn create_program(&mut self, ctx: Handle, vs: Handle, fs: Handle) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.create_program(vs, fs)
    }

    pub fn create_program_instanced(&mut self, ctx: Handle, vs: Handle, fs: Handle) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.create_program_instanced(vs, fs)
    }

    pub fn get_uniform_location(&mut self, ctx: Handle, program: Handle, name: &str) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.get_uniform_location(program, name)
    }

    pub fn create_buffer(&mut self, ctx: Handle) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.create_buffer()
    }

    pub fn create_vertex_array(&mut self, ctx: Handle) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.create_vertex_array()
    }

    pub fn create_texture_checker(&mut self, ctx: Handle, size: i32) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.create_texture_checker(size)
    }

    pub fn create_texture_rgba(
        &mut self,
        ctx: Handle,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Handle, BridgeError> {
        self.contexts.get_mut(ctx)?.create_texture_rgba(width, height, pixels)
    }

    pub fn setup_attribs_basic(&self, ctx: Handle, vbo: Handle) -> Result<(), BridgeError> {
        self.contexts.get(ctx)?.setup_attribs_basic(vbo)
    }

    pub fn setup_attribs_instanced(&self, ctx: Handle, base_vbo: Handle, instance_vbo: Handle) -> Result<(), BridgeError> {
        self.contexts.get(ctx)?.setup_attribs_instanced(base_vbo, instance_vbo)
    }

    // ── commands ──

    /// Runs one command immediately. Nothing is elided: each call starts from
    /// unknown bindings.
    pub fn run(&self, ctx: Handle, memory: &GuestMemory<'_>, cmd: &Command) -> Result<(), BridgeError> {
        let context = self.contexts.get(ctx)?;
        submit::execute(context, &mut BoundState::new(), memory, cmd)?;
        Ok(())
    }

    /// Replays `count` records at `ptr`. Failures are logged, never returned;
    /// a bad context or record range yields empty stats.
    pub fn submit(&mut self, ctx: Handle, memory: &GuestMemory<'_>, ptr: u32, count: u32) -> SubmitStats {
        match self.try_submit(ctx, memory, ptr, count) {
            Ok(stats) => stats,
            Err(e) => {
                log::warn!("submit ctx {ctx}: {e}; {count} records dropped");
                SubmitStats::default()
            }
        }
    }

    pub fn try_submit(
        &mut self,
        ctx: Handle,
        memory: &GuestMemory<'_>,
        ptr: u32,
        count: u32,
    ) -> Result<SubmitStats, BridgeError> {
        let context = self.contexts.get(ctx)?;
        let stats = submit::submit(context, memory, ptr, count)?;
        if stats.skipped() > 0 {
            log::debug!("submit ctx {ctx}: {stats:?}");
        }
        self.frame_submit.accumulate(stats);
        Ok(stats)
    }
}
