use std::collections::HashMap;

use glow::{HasContext, PixelUnpackData};

use super::api::{AttribLayout, Capabilities, GraphicsApi, TextureFilter, MIN_TEXTURE_UNITS};
use super::surface::SurfaceProvider;

/// `GPU_DISJOINT_EXT` from `EXT_disjoint_timer_query`.
const GPU_DISJOINT: u32 = 0x8FBB;

/// [`GraphicsApi`] over a `glow` context (GL 3.3+, GLES 3 or WebGL2).
///
/// The caller must keep the underlying GL context current on the thread that
/// owns the bridge.
pub struct GlowApi {
    gl: glow::Context,
    caps: Capabilities,
    has_disjoint: bool,
}

impl GlowApi {
    pub fn new(gl: glow::Context) -> Self {
        let (caps, has_disjoint) = detect(&gl);
        log::debug!(
            "glow context: version={:?} caps={caps:?} disjoint_ext={has_disjoint}",
            gl.version()
        );
        Self {
            gl,
            caps,
            has_disjoint,
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

fn detect(gl: &glow::Context) -> (Capabilities, bool) {
    let version = gl.version();
    let exts = gl.supported_extensions();

    // WebGL2 reports itself as an embedded 2.0 version.
    let webgl2 = cfg!(target_arch = "wasm32") && version.is_embedded && version.major >= 2;
    let core3 = version.major >= 3 || webgl2;

    let has_disjoint = exts.contains("EXT_disjoint_timer_query_webgl2")
        || exts.contains("EXT_disjoint_timer_query")
        || exts.contains("GL_EXT_disjoint_timer_query");
    let desktop_timer = !version.is_embedded
        && ((version.major, version.minor) >= (3, 3) || exts.contains("GL_ARB_timer_query"));

    let units = unsafe { gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS) };

    let caps = Capabilities {
        instancing: core3,
        vertex_arrays: core3,
        timer_query: has_disjoint || desktop_timer,
        texture_units: u32::try_from(units).unwrap_or(0).max(MIN_TEXTURE_UNITS),
    };
    (caps, has_disjoint)
}

impl GraphicsApi for GlowApi {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;
    type VertexArray = glow::VertexArray;
    type Query = glow::Query;

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn create_shader(&self, stage: u32) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(stage) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program, index, name) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_1i(&self, location: Option<&Self::UniformLocation>, v: i32) {
        unsafe { self.gl.uniform_1_i32(location, v) }
    }

    fn uniform_1f(&self, location: Option<&Self::UniformLocation>, x: f32) {
        unsafe { self.gl.uniform_1_f32(location, x) }
    }

    fn uniform_2f(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32) {
        unsafe { self.gl.uniform_2_f32(location, x, y) }
    }

    fn uniform_4f(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32, z: f32, w: f32) {
        unsafe { self.gl.uniform_4_f32(location, x, y, z, w) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(target, buffer) }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        unsafe { self.gl.buffer_data_size(target, size, usage) }
    }

    fn buffer_sub_data(&self, target: u32, byte_offset: i32, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, byte_offset, data) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vao: Option<Self::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vao) }
    }

    fn vertex_attrib(&self, layout: &AttribLayout) {
        unsafe {
            self.gl.enable_vertex_attrib_array(layout.index);
            self.gl.vertex_attrib_pointer_f32(
                layout.index,
                layout.size,
                glow::FLOAT,
                false,
                layout.stride,
                layout.offset,
            );
        }
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(index, divisor) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&self, unit: u32) {
        let Some(texture) = glow::TEXTURE0.checked_add(unit) else {
            log::warn!("glow: texture unit {unit} out of range; ignored");
            return;
        };
        unsafe { self.gl.active_texture(texture) }
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(target, texture) }
    }

    fn texture_filter(&self, filter: TextureFilter) {
        let mode = match filter {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
        } as i32;
        unsafe {
            let t = glow::TEXTURE_2D;
            self.gl.tex_parameter_i32(t, glow::TEXTURE_MIN_FILTER, mode);
            self.gl.tex_parameter_i32(t, glow::TEXTURE_MAG_FILTER, mode);
            self.gl.tex_parameter_i32(t, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            self.gl.tex_parameter_i32(t, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        }
    }

    fn texture_image_rgba8(&self, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn create_query(&self) -> Result<Self::Query, String> {
        unsafe { self.gl.create_query() }
    }

    fn begin_time_elapsed(&self, query: Self::Query) {
        unsafe { self.gl.begin_query(glow::TIME_ELAPSED, query) }
    }

    fn end_time_elapsed(&self) {
        unsafe { self.gl.end_query(glow::TIME_ELAPSED) }
    }

    fn query_result_available(&self, query: Self::Query) -> bool {
        unsafe { self.gl.get_query_parameter_u32(query, glow::QUERY_RESULT_AVAILABLE) != 0 }
    }

    fn query_result_ns(&self, query: Self::Query) -> u64 {
        unsafe { u64::from(self.gl.get_query_parameter_u32(query, glow::QUERY_RESULT)) }
    }

    fn gpu_disjoint(&self) -> bool {
        // Desktop GL has no disjoint flag; querying it would raise an error.
        self.has_disjoint && unsafe { self.gl.get_parameter_i32(GPU_DISJOINT) != 0 }
    }
}

/// Surfaces backed by `glow` contexts the embedder created up front.
///
/// Each registered context can back exactly one bridge context.
#[derive(Default)]
pub struct GlowSurfaces {
    available: HashMap<String, glow::Context>,
}

impl GlowSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `gl` available under `surface_id`, replacing any unopened
    /// context registered under the same id.
    pub fn register(&mut self, surface_id: impl Into<String>, gl: glow::Context) {
        self.available.insert(surface_id.into(), gl);
    }
}

impl SurfaceProvider for GlowSurfaces {
    type Api = GlowApi;

    fn open(&mut self, surface_id: &str) -> Result<GlowApi, String> {
        let gl = self
            .available
            .remove(surface_id)
            .ok_or_else(|| format!("no GL context registered for surface {surface_id:?}"))?;
        Ok(GlowApi::new(gl))
    }
}
