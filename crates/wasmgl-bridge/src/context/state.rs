use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::handles::{Handle, HandleTable, ResourceKind};
use crate::host::{gl, AttribLayout, Capabilities, GraphicsApi, TextureFilter};
use crate::texture::{DecodedImage, TextureCache};
use crate::time::{GpuTime, GpuTimer};

/// Checkerboard cell size in pixels.
const CHECKER_CELL_SHIFT: u32 = 3;
const CHECKER_ON: u8 = 240;
const CHECKER_OFF: u8 = 30;

/// Attribute locations bound before linking a basic program.
const BASIC_ATTRIBS: [&str; 2] = ["aPos", "aCol"];
/// Attribute locations bound before linking an instanced program.
const INSTANCED_ATTRIBS: [&str; 4] = ["aPos", "aCol", "aOffsetScale", "aICol"];

/// `[x, y, r, g, b]` floats.
const BASIC_STRIDE: i32 = 5 * 4;
/// Per instance `[offX, offY, scale, r, g, b]` floats.
const INSTANCE_STRIDE: i32 = 6 * 4;

/// A host texture with the dimensions it was created with.
#[derive(Debug, Copy, Clone)]
pub struct TextureSlot<T> {
    pub texture: T,
    pub width: u32,
    pub height: u32,
}

/// One graphics surface and every object created on it.
///
/// Handles issued by a context are only meaningful to that context. Tables
/// never shrink; objects live as long as the context.
pub struct Context<G: GraphicsApi> {
    /// Registry id of this context.
    id: Handle,

    /// Surface id the context was created for.
    surface: String,

    /// Host graphics API for the surface.
    api: G,

    /// Optional features, queried once at creation.
    caps: Capabilities,

    pub(crate) shaders: HandleTable<G::Shader>,
    pub(crate) programs: HandleTable<G::Program>,
    pub(crate) buffers: HandleTable<G::Buffer>,
    pub(crate) textures: HandleTable<TextureSlot<G::Texture>>,
    /// `None` for uniforms the host optimized out.
    pub(crate) uniforms: HandleTable<Option<G::UniformLocation>>,
    /// `None` when the context has no vertex-array objects.
    pub(crate) vertex_arrays: HandleTable<Option<G::VertexArray>>,

    pub(crate) cache: TextureCache,
    pub(crate) timer: GpuTimer<G::Query>,
}

impl<G: GraphicsApi> Context<G> {
    pub fn new(id: Handle, surface: impl Into<String>, api: G, config: &BridgeConfig) -> Self {
        let caps = api.capabilities();
        let timer = GpuTimer::new(&api, config.timer_ring_depth, config.gpu_smoothing);
        let surface = surface.into();

        log::info!(
            "context {id} on {surface:?}: instancing={} vertex_arrays={} timer_query={}",
            caps.instancing,
            caps.vertex_arrays,
            timer.is_supported()
        );

        Self {
            id,
            surface,
            api,
            caps,
            shaders: HandleTable::new(ResourceKind::Shader),
            programs: HandleTable::new(ResourceKind::Program),
            buffers: HandleTable::new(ResourceKind::Buffer),
            textures: HandleTable::new(ResourceKind::Texture),
            uniforms: HandleTable::new(ResourceKind::UniformLocation),
            vertex_arrays: HandleTable::new(ResourceKind::VertexArray),
            cache: TextureCache::new(),
            timer,
        }
    }

    pub fn id(&self) -> Handle {
        self.id
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    pub fn api(&self) -> &G {
        &self.api
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.cache
    }

    pub fn gpu_timer(&self) -> &GpuTimer<G::Query> {
        &self.timer
    }

    /// Number of textures created on this context.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // ── gpu timing ──

    pub fn gpu_begin(&mut self) -> bool {
        self.timer.begin(&self.api)
    }

    pub fn gpu_end(&mut self) {
        self.timer.end(&self.api);
    }

    pub fn gpu_poll(&mut self) -> GpuTime {
        self.timer.poll(&self.api)
    }

    // ── shaders & programs ──

    /// Compiles `source` as a `stage` shader.
    pub fn create_shader(&mut self, stage: u32, source: &str) -> Result<Handle, BridgeError> {
        let api = &self.api;
        let shader = api.create_shader(stage).map_err(|reason| BridgeError::ResourceCreation {
            kind: ResourceKind::Shader,
            reason,
        })?;
        api.shader_source(shader, source);
        api.compile_shader(shader);

        if !api.shader_compile_status(shader) {
            let log = non_empty(api.shader_info_log(shader), "shader compile failed");
            api.delete_shader(shader);
            return Err(BridgeError::CompileError { log });
        }

        Ok(self.shaders.insert(shader))
    }

    /// Links `vs` + `fs` with `aPos` at 0 and `aCol` at 1.
    pub fn create_program(&mut self, vs: Handle, fs: Handle) -> Result<Handle, BridgeError> {
        self.link(vs, fs, &BASIC_ATTRIBS)
    }

    /// Like [`create_program`](Self::create_program), plus `aOffsetScale` at 2
    /// and `aICol` at 3.
    pub fn create_program_instanced(&mut self, vs: Handle, fs: Handle) -> Result<Handle, BridgeError> {
        self.link(vs, fs, &INSTANCED_ATTRIBS)
    }

    fn link(&mut self, vs: Handle, fs: Handle, attribs: &[&str]) -> Result<Handle, BridgeError> {
        let vs = *self.shaders.get(vs)?;
        let fs = *self.shaders.get(fs)?;

        let api = &self.api;
        let program = api.create_program().map_err(|reason| BridgeError::ResourceCreation {
            kind: ResourceKind::Program,
            reason,
        })?;
        api.attach_shader(program, vs);
        api.attach_shader(program, fs);
        for (index, name) in attribs.iter().enumerate() {
            api.bind_attrib_location(program, index as u32, name);
        }
        api.link_program(program);

        if !api.program_link_status(program) {
            let log = non_empty(api.program_info_log(program), "program link failed");
            api.delete_program(program);
            return Err(BridgeError::LinkError { log });
        }

        Ok(self.programs.insert(program))
    }

    /// Looks up `name` in `program`. Always returns a new handle; a uniform the
    /// host does not know maps to a location whose setters do nothing.
    pub fn get_uniform_location(&mut self, program: Handle, name: &str) -> Result<Handle, BridgeError> {
        let program = *self.programs.get(program)?;
        let location = self.api.uniform_location(program, name);
        if location.is_none() {
            log::debug!("context {}: uniform {name:?} not found", self.id);
        }
        Ok(self.uniforms.insert(location))
    }

    // ── buffers & vertex state ──

    pub fn create_buffer(&mut self) -> Result<Handle, BridgeError> {
        let buffer = self.api.create_buffer().map_err(|reason| BridgeError::ResourceCreation {
            kind: ResourceKind::Buffer,
            reason,
        })?;
        Ok(self.buffers.insert(buffer))
    }

    /// Without vertex-array support the handle is still issued and binds as a
    /// no-op.
    pub fn create_vertex_array(&mut self) -> Result<Handle, BridgeError> {
        let vao = if self.caps.vertex_arrays {
            let vao = self.api.create_vertex_array().map_err(|reason| {
                BridgeError::ResourceCreation {
                    kind: ResourceKind::VertexArray,
                    reason,
                }
            })?;
            Some(vao)
        } else {
            None
        };
        Ok(self.vertex_arrays.insert(vao))
    }

    /// Configures one float attribute from the bound array buffer.
    ///
    /// Divisors are only set when the context supports instancing.
    pub fn vertex_attrib(&self, layout: AttribLayout) {
        self.api.vertex_attrib(&layout);
        if self.caps.instancing {
            self.api.vertex_attrib_divisor(layout.index, layout.divisor);
        } else if layout.divisor != 0 {
            log::warn!(
                "context {}: attribute {} wants divisor {} but instancing is unavailable",
                self.id,
                layout.index,
                layout.divisor
            );
        }
    }

    /// Binds `vbo` and sets up `[x, y, r, g, b]` at locations 0 and 1. Clears
    /// the divisors of locations 0 to 3.
    pub fn setup_attribs_basic(&self, vbo: Handle) -> Result<(), BridgeError> {
        let vbo = self.buffers.binding(vbo)?.copied();
        self.api.bind_buffer(gl::ARRAY_BUFFER, vbo);

        self.vertex_attrib(attrib(0, 2, BASIC_STRIDE, 0, 0));
        self.vertex_attrib(attrib(1, 3, BASIC_STRIDE, 2 * 4, 0));
        if self.caps.instancing {
            self.api.vertex_attrib_divisor(2, 0);
            self.api.vertex_attrib_divisor(3, 0);
        }
        Ok(())
    }

    /// Per-vertex `[x, y, _, _, _]` from `base_vbo` at locations 0 and 1, per
    /// instance `[offX, offY, scale, r, g, b]` from `instance_vbo` at 2 and 3.
    pub fn setup_attribs_instanced(&self, base_vbo: Handle, instance_vbo: Handle) -> Result<(), BridgeError> {
        let base = self.buffers.binding(base_vbo)?.copied();
        let instance = self.buffers.binding(instance_vbo)?.copied();

        self.api.bind_buffer(gl::ARRAY_BUFFER, base);
        self.vertex_attrib(attrib(0, 2, BASIC_STRIDE, 0, 0));
        self.vertex_attrib(attrib(1, 3, BASIC_STRIDE, 2 * 4, 0));

        self.api.bind_buffer(gl::ARRAY_BUFFER, instance);
        self.vertex_attrib(attrib(2, 3, INSTANCE_STRIDE, 0, 1));
        self.vertex_attrib(attrib(3, 3, INSTANCE_STRIDE, 3 * 4, 1));
        Ok(())
    }

    // ── textures ──

    /// Creates a `size`×`size` checkerboard with 8-pixel cells. `size` is
    /// clamped to `2..=256`; filtering is nearest.
    pub fn create_texture_checker(&mut self, size: i32) -> Result<Handle, BridgeError> {
        let s = size.clamp(2, 256) as u32;
        let mut pixels = Vec::with_capacity((s * s * 4) as usize);
        for y in 0..s {
            for x in 0..s {
                let on = ((x >> CHECKER_CELL_SHIFT) ^ (y >> CHECKER_CELL_SHIFT)) & 1 != 0;
                let v = if on { CHECKER_ON } else { CHECKER_OFF };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        self.upload_texture(s, s, &pixels, TextureFilter::Nearest)
    }

    /// Uploads caller-supplied RGBA8 pixels with linear filtering.
    pub fn create_texture_rgba(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<Handle, BridgeError> {
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected || width == 0 || height == 0 {
            return Err(BridgeError::ResourceCreation {
                kind: ResourceKind::Texture,
                reason: format!(
                    "{width}x{height} needs {expected} bytes of RGBA8, got {}",
                    pixels.len()
                ),
            });
        }
        self.upload_texture(width, height, pixels, TextureFilter::Linear)
    }

    /// Creates the host texture for a finished load.
    pub(crate) fn insert_loaded(&mut self, image: &DecodedImage) -> Result<Handle, BridgeError> {
        self.upload_texture(image.width, image.height, &image.pixels, TextureFilter::Linear)
    }

    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: TextureFilter,
    ) -> Result<Handle, BridgeError> {
        let api = &self.api;
        let texture = api.create_texture().map_err(|reason| BridgeError::ResourceCreation {
            kind: ResourceKind::Texture,
            reason,
        })?;
        api.bind_texture(gl::TEXTURE_2D, Some(texture));
        api.texture_filter(filter);
        api.texture_image_rgba8(width, height, pixels);

        Ok(self.textures.insert(TextureSlot { texture, width, height }))
    }

    /// `(width, height)` of a texture, or `None` for an unknown handle.
    pub fn texture_size(&self, texture: Handle) -> Option<(u32, u32)> {
        self.textures.get(texture).ok().map(|t| (t.width, t.height))
    }

    /// `(w & 0xffff) << 16 | (h & 0xffff)`, or `0` for an unknown handle.
    pub fn packed_texture_size(&self, texture: Handle) -> i32 {
        match self.texture_size(texture) {
            Some((w, h)) => (((w & 0xffff) << 16) | (h & 0xffff)) as i32,
            None => 0,
        }
    }
}

fn attrib(index: u32, size: i32, stride: i32, offset: i32, divisor: u32) -> AttribLayout {
    AttribLayout {
        index,
        size,
        stride,
        offset,
        divisor,
    }
}

fn non_empty(log: String, fallback: &str) -> String {
    if log.trim().is_empty() {
        fallback.to_string()
    } else {
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Call, RecordingApi};

    fn ctx() -> Context<RecordingApi> {
        ctx_with(Capabilities::all())
    }

    fn ctx_with(caps: Capabilities) -> Context<RecordingApi> {
        Context::new(1, "main", RecordingApi::new(caps), &BridgeConfig::default())
    }

    fn program(c: &mut Context<RecordingApi>) -> Handle {
        let vs = c.create_shader(gl::VERTEX_SHADER, "void main(){}").unwrap();
        let fs = c.create_shader(gl::FRAGMENT_SHADER, "void main(){}").unwrap();
        c.create_program(vs, fs).unwrap()
    }

    // ── handles ──

    #[test]
    fn nth_creation_returns_n() {
        let mut c = ctx();
        assert_eq!(c.create_buffer().unwrap(), 1);
        assert_eq!(c.create_buffer().unwrap(), 2);
        assert_eq!(c.create_vertex_array().unwrap(), 1);
        assert_eq!(c.create_texture_checker(16).unwrap(), 1);
        assert_eq!(c.create_texture_checker(16).unwrap(), 2);
        assert_eq!(c.create_buffer().unwrap(), 3);
    }

    #[test]
    fn handles_stay_valid() {
        let mut c = ctx();
        let first = c.create_buffer().unwrap();
        for _ in 0..50 {
            c.create_buffer().unwrap();
        }
        assert!(c.buffers.contains(first));
    }

    #[test]
    fn host_refusal_is_resource_creation() {
        let c = &mut ctx();
        c.api().refuse_creation(true);
        assert!(matches!(
            c.create_buffer(),
            Err(BridgeError::ResourceCreation { kind: ResourceKind::Buffer, .. })
        ));
        assert_eq!(c.buffers.len(), 0);
    }

    // ── shaders & programs ──

    #[test]
    fn compile_failure_carries_log() {
        let mut c = ctx();
        c.api().fail_next_compile("ERROR: 0:3: 'x' undeclared");
        let err = c.create_shader(gl::VERTEX_SHADER, "bad").unwrap_err();
        assert_eq!(err, BridgeError::CompileError { log: "ERROR: 0:3: 'x' undeclared".into() });
        assert_eq!(c.shaders.len(), 0);
    }

    #[test]
    fn empty_compile_log_gets_a_fallback() {
        let mut c = ctx();
        c.api().fail_next_compile("");
        let err = c.create_shader(gl::VERTEX_SHADER, "bad").unwrap_err();
        assert_eq!(err, BridgeError::CompileError { log: "shader compile failed".into() });
    }

    #[test]
    fn program_binds_fixed_attribs_before_linking() {
        let mut c = ctx();
        let vs = c.create_shader(gl::VERTEX_SHADER, "v").unwrap();
        let fs = c.create_shader(gl::FRAGMENT_SHADER, "f").unwrap();
        c.api().take_calls();

        assert_eq!(c.create_program_instanced(vs, fs).unwrap(), 1);

        let calls = c.api().take_calls();
        let names: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                Call::BindAttribLocation { index, name, .. } => Some((*index, name.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec![(0, "aPos"), (1, "aCol"), (2, "aOffsetScale"), (3, "aICol")]);

        let link = calls.iter().position(|call| matches!(call, Call::LinkProgram(_))).unwrap();
        let last_bind = calls
            .iter()
            .rposition(|call| matches!(call, Call::BindAttribLocation { .. }))
            .unwrap();
        assert!(last_bind < link);
    }

    #[test]
    fn link_failure_deletes_program() {
        let mut c = ctx();
        let vs = c.create_shader(gl::VERTEX_SHADER, "v").unwrap();
        let fs = c.create_shader(gl::FRAGMENT_SHADER, "f").unwrap();
        c.api().fail_next_link("");

        let err = c.create_program(vs, fs).unwrap_err();
        assert_eq!(err, BridgeError::LinkError { log: "program link failed".into() });
        assert_eq!(c.api().count(|call| matches!(call, Call::DeleteProgram(_))), 1);
        assert_eq!(c.programs.len(), 0);
    }

    #[test]
    fn program_with_unknown_shader_is_invalid_handle() {
        let mut c = ctx();
        assert_eq!(
            c.create_program(1, 2),
            Err(BridgeError::InvalidHandle { kind: ResourceKind::Shader, handle: 1 })
        );
    }

    #[test]
    fn missing_uniform_still_gets_a_handle() {
        let mut c = ctx();
        let p = program(&mut c);
        c.api().hide_uniform("uGone");
        assert_eq!(c.get_uniform_location(p, "uView").unwrap(), 1);
        assert_eq!(c.get_uniform_location(p, "uGone").unwrap(), 2);
        assert!(c.uniforms.get(2).unwrap().is_none());
    }

    // ── vertex state ──

    #[test]
    fn vertex_array_without_support_is_placeholder() {
        let mut c = ctx_with(Capabilities { vertex_arrays: false, ..Capabilities::all() });
        assert_eq!(c.create_vertex_array().unwrap(), 1);
        assert_eq!(c.api().count(|call| matches!(call, Call::CreateVertexArray(_))), 0);
    }

    #[test]
    fn instanced_attribs_use_divisor_one() {
        let mut c = ctx();
        let base = c.create_buffer().unwrap();
        let inst = c.create_buffer().unwrap();
        c.api().take_calls();

        c.setup_attribs_instanced(base, inst).unwrap();
        let calls = c.api().take_calls();
        assert!(calls.contains(&Call::VertexAttrib(attrib(2, 3, 24, 0, 1))));
        assert!(calls.contains(&Call::VertexAttrib(attrib(3, 3, 24, 12, 1))));
        assert!(calls.contains(&Call::VertexAttribDivisor { index: 2, divisor: 1 }));
        assert!(calls.contains(&Call::VertexAttribDivisor { index: 3, divisor: 1 }));
    }

    #[test]
    fn basic_attribs_reset_divisors() {
        let mut c = ctx();
        let vbo = c.create_buffer().unwrap();
        c.api().take_calls();

        c.setup_attribs_basic(vbo).unwrap();
        let calls = c.api().take_calls();
        assert!(calls.contains(&Call::VertexAttrib(attrib(0, 2, 20, 0, 0))));
        assert!(calls.contains(&Call::VertexAttrib(attrib(1, 3, 20, 8, 0))));
        for index in 0..4 {
            assert!(calls.contains(&Call::VertexAttribDivisor { index, divisor: 0 }));
        }
    }

    #[test]
    fn setup_with_bad_buffer_fails_before_any_call() {
        let c = ctx();
        assert!(c.setup_attribs_basic(7).is_err());
        assert!(c.api().calls().is_empty());
    }

    // ── textures ──

    #[test]
    fn checker_size_is_clamped() {
        let mut c = ctx();
        let small = c.create_texture_checker(0).unwrap();
        let large = c.create_texture_checker(4096).unwrap();
        assert_eq!(c.texture_size(small), Some((2, 2)));
        assert_eq!(c.texture_size(large), Some((256, 256)));
        assert!(c.api().calls().contains(&Call::TextureFilter(TextureFilter::Nearest)));
    }

    #[test]
    fn packed_size() {
        let mut c = ctx();
        let t = c.create_texture_rgba(3, 2, &[0; 24]).unwrap();
        assert_eq!(c.packed_texture_size(t), (3 << 16) | 2);
        assert_eq!(c.packed_texture_size(99), 0);
        assert_eq!(c.packed_texture_size(0), 0);
    }

    #[test]
    fn rgba_upload_checks_length() {
        let mut c = ctx();
        assert!(c.create_texture_rgba(2, 2, &[0; 15]).is_err());
        assert_eq!(c.texture_count(), 0);
    }
}
