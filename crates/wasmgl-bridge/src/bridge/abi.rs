use wasmgl_cmd::Command;

use crate::error::BridgeError;
use crate::handles::Handle;
use crate::host::SurfaceProvider;
use crate::logging::GUEST_TARGET;
use crate::submit::SubmitStats;
use crate::texture::{ImageLoader, RequestId, TextureSource};

use super::{Bridge, GuestMemory};

/// The bridge as a guest import table sees it: integers, floats and
/// pointer/length pairs into the guest's memory.
///
/// Borrowed for a single boundary call; the memory view must not outlive it,
/// since the guest may grow (and move) its memory between calls.
pub struct Abi<'b, 'm, P: SurfaceProvider, L: ImageLoader> {
    bridge: &'b mut Bridge<P, L>,
    memory: GuestMemory<'m>,
}

impl<'b, 'm, P: SurfaceProvider, L: ImageLoader> Abi<'b, 'm, P, L> {
    pub fn new(bridge: &'b mut Bridge<P, L>, memory: GuestMemory<'m>) -> Self {
        Self { bridge, memory }
    }

    pub fn memory(&self) -> GuestMemory<'m> {
        self.memory
    }

    // ── context & resources ──

    pub fn create_context(&mut self, surface_ptr: u32, surface_len: u32) -> Result<Handle, BridgeError> {
        let surface = self.memory.str(surface_ptr, surface_len)?;
        self.bridge.create_context(surface)
    }

    pub fn create_shader(&mut self, ctx: Handle, stage: u32, src_ptr: u32, src_len: u32) -> Result<Handle, BridgeError> {
        let source = self.memory.str(src_ptr, src_len)?;
        self.bridge.create_shader(ctx, stage, source)
    }

    pub fn create_program(&mut self, ctx: Handle, vs: Handle, fs: Handle) -> Result<Handle, BridgeError> {
        self.bridge.create_program(ctx, vs, fs)
    }

    pub fn create_program_instanced(&mut self, ctx: Handle, vs: Handle, fs: Handle) -> Result<Handle, BridgeError> {
        self.bridge.create_program_instanced(ctx, vs, fs)
    }

    pub fn create_buffer(&mut self, ctx: Handle) -> Result<Handle, BridgeError> {
        self.bridge.create_buffer(ctx)
    }

    pub fn create_vertex_array(&mut self, ctx: Handle) -> Result<Handle, BridgeError> {
        self.bridge.create_vertex_array(ctx)
    }

    pub fn get_uniform_location(
        &mut self,
        ctx: Handle,
        program: Handle,
        name_ptr: u32,
        name_len: u32,
    ) -> Result<Handle, BridgeError> {
        let name = self.memory.str(name_ptr, name_len)?;
        self.bridge.get_uniform_location(ctx, program, name)
    }

    pub fn create_texture_checker(&mut self, ctx: Handle, size: i32) -> Result<Handle, BridgeError> {
        self.bridge.create_texture_checker(ctx, size)
    }

    // ── immediate ops ──

    fn run(&self, ctx: Handle, cmd: Command) -> Result<(), BridgeError> {
        self.bridge.run(ctx, &self.memory, &cmd)
    }

    pub fn viewport(&self, ctx: Handle, x: i32, y: i32, width: i32, height: i32) -> Result<(), BridgeError> {
        self.run(ctx, Command::Viewport { x, y, width, height })
    }

    pub fn clear_color(&self, ctx: Handle, r: f32, g: f32, b: f32, a: f32) -> Result<(), BridgeError> {
        self.run(ctx, Command::ClearColor { r, g, b, a })
    }

    pub fn clear(&self, ctx: Handle, mask: u32) -> Result<(), BridgeError> {
        self.run(ctx, Command::Clear { mask })
    }

    pub fn use_program(&self, ctx: Handle, program: Handle) -> Result<(), BridgeError> {
        self.run(ctx, Command::UseProgram { program })
    }

    pub fn bind_buffer(&self, ctx: Handle, target: u32, buffer: Handle) -> Result<(), BridgeError> {
        self.run(ctx, Command::BindBuffer { target, buffer })
    }

    /// Uploads `float_count` floats from `ptr`, or allocates that many
    /// uninitialized when `ptr` is 0.
    pub fn buffer_data_f32(
        &self,
        ctx: Handle,
        target: u32,
        ptr: u32,
        float_count: u32,
        usage: u32,
    ) -> Result<(), BridgeError> {
        self.run(ctx, Command::BufferData { target, ptr, float_count, usage })
    }

    pub fn bind_vertex_array(&self, ctx: Handle, vao: Handle) -> Result<(), BridgeError> {
        self.run(ctx, Command::BindVertexArray { vao })
    }

    pub fn setup_attribs_basic(&self, ctx: Handle, vbo: Handle) -> Result<(), BridgeError> {
        self.bridge.setup_attribs_basic(ctx, vbo)
    }

    pub fn setup_attribs_instanced(&self, ctx: Handle, base_vbo: Handle, instance_vbo: Handle) -> Result<(), BridgeError> {
        self.bridge.setup_attribs_instanced(ctx, base_vbo, instance_vbo)
    }

    pub fn active_texture(&self, ctx: Handle, unit: u32) -> Result<(), BridgeError> {
        self.run(ctx, Command::ActiveTexture { unit })
    }

    pub fn bind_texture(&self, ctx: Handle, target: u32, texture: Handle) -> Result<(), BridgeError> {
        self.run(ctx, Command::BindTexture { target, texture })
    }

    pub fn draw_arrays(&self, ctx: Handle, mode: u32, first: i32, count: i32) -> Result<(), BridgeError> {
        self.run(ctx, Command::DrawArrays { mode, first, count })
    }

    pub fn draw_arrays_instanced(
        &self,
        ctx: Handle,
        mode: u32,
        first: i32,
        count: i32,
        instances: i32,
    ) -> Result<(), BridgeError> {
        self.run(ctx, Command::DrawArraysInstanced { mode, first, count, instances })
    }

    pub fn uniform1i(&self, ctx: Handle, location: Handle, value: i32) -> Result<(), BridgeError> {
        self.run(ctx, Command::Uniform1i { location, value })
    }

    pub fn uniform1f(&self, ctx: Handle, location: Handle, x: f32) -> Result<(), BridgeError> {
        self.run(ctx, Command::Uniform1f { location, x })
    }

    pub fn uniform2f(&self, ctx: Handle, location: Handle, x: f32, y: f32) -> Result<(), BridgeError> {
        self.run(ctx, Command::Uniform2f { location, x, y })
    }

    pub fn uniform4f(&self, ctx: Handle, location: Handle, x: f32, y: f32, z: f32, w: f32) -> Result<(), BridgeError> {
        self.run(ctx, Command::Uniform4f { location, x, y, z, w })
    }

    // ── batched ──

    pub fn submit(&mut self, ctx: Handle, records_ptr: u32, record_count: u32) -> SubmitStats {
        self.bridge.submit(ctx, &self.memory, records_ptr, record_count)
    }

    // ── texture loading ──

    fn url(&self, ptr: u32, len: u32) -> Result<TextureSource, BridgeError> {
        Ok(TextureSource::Url(self.memory.str(ptr, len)?.to_string()))
    }

    fn data_url(&self, ptr: u32, len: u32) -> Result<TextureSource, BridgeError> {
        Ok(TextureSource::DataUrl(self.memory.str(ptr, len)?.to_string()))
    }

    fn base64(&self, mime_ptr: u32, mime_len: u32, data_ptr: u32, data_len: u32) -> Result<TextureSource, BridgeError> {
        let mime = if mime_len == 0 {
            String::new()
        } else {
            self.memory.str(mime_ptr, mime_len)?.to_string()
        };
        let data = self.memory.str(data_ptr, data_len)?.to_string();
        Ok(TextureSource::Base64 { mime, data })
    }

    pub fn tex_load_url(&mut self, ctx: Handle, ptr: u32, len: u32, request: RequestId) -> Result<(), BridgeError> {
        let source = self.url(ptr, len)?;
        self.bridge.request_load(ctx, &source, request)
    }

    pub fn tex_load_dataurl(&mut self, ctx: Handle, ptr: u32, len: u32, request: RequestId) -> Result<(), BridgeError> {
        let source = self.data_url(ptr, len)?;
        self.bridge.request_load(ctx, &source, request)
    }

    /// An empty mime means `image/png`.
    pub fn tex_load_base64(
        &mut self,
        ctx: Handle,
        mime_ptr: u32,
        mime_len: u32,
        data_ptr: u32,
        data_len: u32,
        request: RequestId,
    ) -> Result<(), BridgeError> {
        let source = self.base64(mime_ptr, mime_len, data_ptr, data_len)?;
        self.bridge.request_load(ctx, &source, request)
    }

    pub fn tex_load_url_sync(&mut self, ctx: Handle, ptr: u32, len: u32) -> Result<Handle, BridgeError> {
        let source = self.url(ptr, len)?;
        self.bridge.request_load_sync(ctx, &source)
    }

    pub fn tex_load_dataurl_sync(&mut self, ctx: Handle, ptr: u32, len: u32) -> Result<Handle, BridgeError> {
        let source = self.data_url(ptr, len)?;
        self.bridge.request_load_sync(ctx, &source)
    }

    pub fn tex_load_base64_sync(
        &mut self,
        ctx: Handle,
        mime_ptr: u32,
        mime_len: u32,
        data_ptr: u32,
        data_len: u32,
    ) -> Result<Handle, BridgeError> {
        let source = self.base64(mime_ptr, mime_len, data_ptr, data_len)?;
        self.bridge.request_load_sync(ctx, &source)
    }

    /// Packed `w << 16 | h`, `0` for an unknown context or texture.
    pub fn tex_get_wh(&self, ctx: Handle, texture: Handle) -> i32 {
        self.bridge.get_texture_dimensions(ctx, texture).unwrap_or(0)
    }

    // ── logging & telemetry ──

    pub fn console_log(&self, ptr: u32, len: u32) {
        match self.memory.str(ptr, len) {
            Ok(msg) => log::info!(target: GUEST_TARGET, "{msg}"),
            Err(e) => log::warn!("console_log: {e}"),
        }
    }

    pub fn console_log_int(&self, label_ptr: u32, label_len: u32, value: i32) {
        match self.memory.str(label_ptr, label_len) {
            Ok(label) => log::info!(target: GUEST_TARGET, "{label} {value}"),
            Err(e) => log::warn!("console_log_int: {e}"),
        }
    }

    /// `level` follows [`log::Level`]: 1 error through 5 trace. `file` is a
    /// NUL-terminated string.
    pub fn guest_log(&self, level: i32, file_ptr: u32, line: u32, msg_ptr: u32, msg_len: u32) {
        let level = guest_level(level);
        let file = self.memory.cstr(file_ptr).unwrap_or("?");
        match self.memory.str(msg_ptr, msg_len) {
            Ok(msg) => log::log!(target: GUEST_TARGET, level, "{file}:{line}: {msg}"),
            Err(e) => log::warn!("guest_log from {file}:{line}: {e}"),
        }
    }

    pub fn stat_f32(&mut self, name_ptr: u32, name_len: u32, value: f32, unit_ptr: u32, unit_len: u32) {
        match self.stat_labels(name_ptr, name_len, unit_ptr, unit_len) {
            Ok((name, unit)) => self.bridge.telemetry.set_f32(name, value, unit),
            Err(e) => log::warn!("stat_f32: {e}"),
        }
    }

    pub fn stat_i32(&mut self, name_ptr: u32, name_len: u32, value: i32, unit_ptr: u32, unit_len: u32) {
        match self.stat_labels(name_ptr, name_len, unit_ptr, unit_len) {
            Ok((name, unit)) => self.bridge.telemetry.set_i32(name, value, unit),
            Err(e) => log::warn!("stat_i32: {e}"),
        }
    }

    fn stat_labels(
        &self,
        name_ptr: u32,
        name_len: u32,
        unit_ptr: u32,
        unit_len: u32,
    ) -> Result<(&'m str, &'m str), BridgeError> {
        let name = self.memory.str(name_ptr, name_len)?;
        let unit = if unit_len == 0 { "" } else { self.memory.str(unit_ptr, unit_len)? };
        Ok((name, unit))
    }
}

fn guest_level(level: i32) -> log::Level {
    match level {
        i32::MIN..=1 => log::Level::Error,
        2 => log::Level::Warn,
        3 => log::Level::Info,
        4 => log::Level::Debug,
        _ => log::Level::Trace,
    }
}
