use std::fmt::Debug;

/// GL enum values the bridge itself needs. Guest-supplied enums are passed
/// through untouched.
pub mod gl {
    pub const COLOR_BUFFER_BIT: u32 = 0x4000;
    pub const TRIANGLES: u32 = 0x0004;
    pub const FLOAT: u32 = 0x1406;

    pub const ARRAY_BUFFER: u32 = 0x8892;
    pub const ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
    pub const PIXEL_UNPACK_BUFFER: u32 = 0x88EC;
    pub const UNIFORM_BUFFER: u32 = 0x8A11;

    pub const STATIC_DRAW: u32 = 0x88E4;
    pub const DYNAMIC_DRAW: u32 = 0x88E8;

    pub const TEXTURE_2D: u32 = 0x0DE1;

    pub const VERTEX_SHADER: u32 = 0x8B31;
    pub const FRAGMENT_SHADER: u32 = 0x8B30;
}

/// `MAX_COMBINED_TEXTURE_IMAGE_UNITS` guaranteed by GLES 3 and WebGL2.
pub const MIN_TEXTURE_UNITS: u32 = 32;

/// Optional features detected when a context is created.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Capabilities {
    pub instancing: bool,
    pub vertex_arrays: bool,
    pub timer_query: bool,
    /// Combined texture image units; `ActiveTexture` beyond this is rejected.
    pub texture_units: u32,
}

impl Capabilities {
    pub const fn all() -> Self {
        Self {
            instancing: true,
            vertex_arrays: true,
            timer_query: true,
            texture_units: MIN_TEXTURE_UNITS,
        }
    }
}

/// Min/mag filter for a 2D texture. Wrapping is always clamp-to-edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// One float vertex attribute sourced from the currently bound array buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttribLayout {
    pub index: u32,
    /// Components per vertex (1..=4).
    pub size: i32,
    /// Bytes between consecutive elements.
    pub stride: i32,
    /// Byte offset of the first element.
    pub offset: i32,
    /// `0` per vertex, `1` per instance.
    pub divisor: u32,
}

/// Host graphics API, one instance per surface.
///
/// Mirrors the subset of GL/WebGL2 the bridge issues. Methods take `&self`
/// like `glow::HasContext`; implementations use interior mutability where
/// they keep state.
///
/// Binding methods take `Option` where `None` unbinds.
pub trait GraphicsApi {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Buffer: Copy + Debug;
    type Texture: Copy + Debug;
    type UniformLocation: Clone + Debug;
    type VertexArray: Copy + Debug;
    type Query: Copy + Debug;

    fn capabilities(&self) -> Capabilities;

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: u32);

    // ── shaders & programs ──

    fn create_shader(&self, stage: u32) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    fn uniform_location(&self, program: Self::Program, name: &str)
    -> Option<Self::UniformLocation>;
    fn uniform_1i(&self, location: Option<&Self::UniformLocation>, v: i32);
    fn uniform_1f(&self, location: Option<&Self::UniformLocation>, x: f32);
    fn uniform_2f(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32);
    fn uniform_4f(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32, z: f32, w: f32);

    // ── buffers & vertex state ──

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>);
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    /// Allocates `size` uninitialized bytes.
    fn buffer_data_size(&self, target: u32, size: i32, usage: u32);
    fn buffer_sub_data(&self, target: u32, byte_offset: i32, data: &[u8]);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vao: Option<Self::VertexArray>);
    /// Enables `layout.index` and points it at the bound array buffer.
    fn vertex_attrib(&self, layout: &AttribLayout);
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

    // ── textures ──

    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// Selects texture unit `unit` (an index, not `TEXTURE0 + unit`).
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>);
    /// Sets filtering and clamp-to-edge wrapping on the bound `TEXTURE_2D`.
    fn texture_filter(&self, filter: TextureFilter);
    /// Uploads tightly packed RGBA8 pixels to the bound `TEXTURE_2D`.
    fn texture_image_rgba8(&self, width: u32, height: u32, pixels: &[u8]);

    // ── draws ──

    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32);

    // ── timer queries ──

    fn create_query(&self) -> Result<Self::Query, String>;
    fn begin_time_elapsed(&self, query: Self::Query);
    fn end_time_elapsed(&self);
    fn query_result_available(&self, query: Self::Query) -> bool;
    /// Elapsed GPU time in nanoseconds. Only valid once available.
    fn query_result_ns(&self, query: Self::Query) -> u64;
    /// Reads and clears the host's disjoint flag.
    fn gpu_disjoint(&self) -> bool;
}
