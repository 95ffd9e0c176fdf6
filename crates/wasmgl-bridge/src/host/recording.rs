use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::api::{AttribLayout, Capabilities, GraphicsApi, TextureFilter};
use super::surface::SurfaceProvider;

/// One call made against a [`RecordingApi`]. Objects are plain ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Viewport(i32, i32, i32, i32),
    ClearColor(f32, f32, f32, f32),
    Clear(u32),

    CreateShader { id: u32, stage: u32 },
    ShaderSource { shader: u32, source: String },
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    BindAttribLocation { program: u32, index: u32, name: String },
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    UniformLocation { program: u32, name: String },
    Uniform1i(Option<u32>, i32),
    Uniform1f(Option<u32>, f32),
    Uniform2f(Option<u32>, f32, f32),
    Uniform4f(Option<u32>, f32, f32, f32, f32),

    CreateBuffer(u32),
    BindBuffer { target: u32, buffer: Option<u32> },
    BufferData { target: u32, data: Vec<u8>, usage: u32 },
    BufferDataSize { target: u32, size: i32, usage: u32 },
    BufferSubData { target: u32, byte_offset: i32, data: Vec<u8> },
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    VertexAttrib(AttribLayout),
    VertexAttribDivisor { index: u32, divisor: u32 },

    CreateTexture(u32),
    ActiveTexture(u32),
    BindTexture { target: u32, texture: Option<u32> },
    TextureFilter(TextureFilter),
    TextureImage { width: u32, height: u32, len: usize },

    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawArraysInstanced { mode: u32, first: i32, count: i32, instances: i32 },

    CreateQuery(u32),
    BeginQuery(u32),
    EndQuery,
}

impl Call {
    pub fn is_draw(&self) -> bool {
        matches!(self, Call::DrawArrays { .. } | Call::DrawArraysInstanced { .. })
    }
}

/// Headless [`GraphicsApi`] that records every call.
///
/// Object ids come from one counter starting at 1, so ids are unique across
/// kinds. Failures and query results are scripted through the `&self`
/// setters, which lets a test drive an API already owned by a context.
#[derive(Debug, Default)]
pub struct RecordingApi {
    caps: Capabilities,
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,

    compile_failure: RefCell<Option<String>>,
    link_failure: RefCell<Option<String>>,
    failing_shaders: RefCell<HashSet<u32>>,
    failing_programs: RefCell<HashSet<u32>>,
    refuse_creation: Cell<bool>,
    hidden_uniforms: RefCell<HashSet<String>>,

    active_query: Cell<Option<u32>>,
    ended_queries: RefCell<Vec<u32>>,
    query_results: RefCell<HashMap<u32, u64>>,
    disjoint: Cell<bool>,
}

impl RecordingApi {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            ..Self::default()
        }
    }

    /// Snapshot of the calls recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Returns and clears the recorded calls.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    /// The next compiled shader fails with `log` (may be empty).
    pub fn fail_next_compile(&self, log: impl Into<String>) {
        *self.compile_failure.borrow_mut() = Some(log.into());
    }

    /// The next linked program fails with `log` (may be empty).
    pub fn fail_next_link(&self, log: impl Into<String>) {
        *self.link_failure.borrow_mut() = Some(log.into());
    }

    /// Every `create_*` call fails until cleared.
    pub fn refuse_creation(&self, refuse: bool) {
        self.refuse_creation.set(refuse);
    }

    /// `uniform_location(_, name)` reports no such uniform.
    pub fn hide_uniform(&self, name: impl Into<String>) {
        self.hidden_uniforms.borrow_mut().insert(name.into());
    }

    /// Makes every ended, still unavailable query available with `ns`.
    pub fn complete_queries(&self, ns: u64) {
        let mut results = self.query_results.borrow_mut();
        for q in self.ended_queries.borrow_mut().drain(..) {
            results.entry(q).or_insert(ns);
        }
    }

    /// Makes one specific query available with `ns`.
    pub fn complete_query(&self, query: u32, ns: u64) {
        self.ended_queries.borrow_mut().retain(|&q| q != query);
        self.query_results.borrow_mut().insert(query, ns);
    }

    /// Raises the disjoint flag; the next `gpu_disjoint` reads and clears it.
    pub fn set_disjoint(&self) {
        self.disjoint.set(true);
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn alloc(&self) -> Result<u32, String> {
        if self.refuse_creation.get() {
            return Err("out of memory".to_string());
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        Ok(id)
    }
}

impl GraphicsApi for RecordingApi {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type Texture = u32;
    type UniformLocation = u32;
    type VertexArray = u32;
    type Query = u32;

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearColor(r, g, b, a));
    }

    fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }

    fn create_shader(&self, stage: u32) -> Result<u32, String> {
        let id = self.alloc()?;
        self.record(Call::CreateShader { id, stage });
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        self.record(Call::ShaderSource {
            shader,
            source: source.to_string(),
        });
    }

    fn compile_shader(&self, shader: u32) {
        if self.compile_failure.borrow().is_some() {
            self.failing_shaders.borrow_mut().insert(shader);
        }
        self.record(Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        !self.failing_shaders.borrow().contains(&shader)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        if self.failing_shaders.borrow_mut().remove(&shader) {
            return self.compile_failure.borrow_mut().take().unwrap_or_default();
        }
        String::new()
    }

    fn delete_shader(&self, shader: u32) {
        self.record(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        let id = self.alloc()?;
        self.record(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(Call::AttachShader { program, shader });
    }

    fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        self.record(Call::BindAttribLocation {
            program,
            index,
            name: name.to_string(),
        });
    }

    fn link_program(&self, program: u32) {
        if self.link_failure.borrow().is_some() {
            self.failing_programs.borrow_mut().insert(program);
        }
        self.record(Call::LinkProgram(program));
    }

    fn program_link_status(&self, program: u32) -> bool {
        !self.failing_programs.borrow().contains(&program)
    }

    fn program_info_log(&self, program: u32) -> String {
        if self.failing_programs.borrow_mut().remove(&program) {
            return self.link_failure.borrow_mut().take().unwrap_or_default();
        }
        String::new()
    }

    fn delete_program(&self, program: u32) {
        self.record(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        self.record(Call::UniformLocation {
            program,
            name: name.to_string(),
        });
        if self.hidden_uniforms.borrow().contains(name) {
            return None;
        }
        self.alloc().ok()
    }

    fn uniform_1i(&self, location: Option<&u32>, v: i32) {
        self.record(Call::Uniform1i(location.copied(), v));
    }

    fn uniform_1f(&self, location: Option<&u32>, x: f32) {
        self.record(Call::Uniform1f(location.copied(), x));
    }

    fn uniform_2f(&self, location: Option<&u32>, x: f32, y: f32) {
        self.record(Call::Uniform2f(location.copied(), x, y));
    }

    fn uniform_4f(&self, location: Option<&u32>, x: f32, y: f32, z: f32, w: f32) {
        self.record(Call::Uniform4f(location.copied(), x, y, z, w));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let id = self.alloc()?;
        self.record(Call::CreateBuffer(id));
        Ok(id)
    }

    fn bind_buffer(&self, target: u32, buffer: Option<u32>) {
        self.record(Call::BindBuffer { target, buffer });
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        self.record(Call::BufferData {
            target,
            data: data.to_vec(),
            usage,
        });
    }

    fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        self.record(Call::BufferDataSize { target, size, usage });
    }

    fn buffer_sub_data(&self, target: u32, byte_offset: i32, data: &[u8]) {
        self.record(Call::BufferSubData {
            target,
            byte_offset,
            data: data.to_vec(),
        });
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let id = self.alloc()?;
        self.record(Call::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&self, vao: Option<u32>) {
        self.record(Call::BindVertexArray(vao));
    }

    fn vertex_attrib(&self, layout: &AttribLayout) {
        self.record(Call::VertexAttrib(*layout));
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.record(Call::VertexAttribDivisor { index, divisor });
    }

    fn create_texture(&self) -> Result<u32, String> {
        let id = self.alloc()?;
        self.record(Call::CreateTexture(id));
        Ok(id)
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: u32, texture: Option<u32>) {
        self.record(Call::BindTexture { target, texture });
    }

    fn texture_filter(&self, filter: TextureFilter) {
        self.record(Call::TextureFilter(filter));
    }

    fn texture_image_rgba8(&self, width: u32, height: u32, pixels: &[u8]) {
        self.record(Call::TextureImage {
            width,
            height,
            len: pixels.len(),
        });
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.record(Call::DrawArrays { mode, first, count });
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32) {
        self.record(Call::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        });
    }

    fn create_query(&self) -> Result<u32, String> {
        let id = self.alloc()?;
        self.record(Call::CreateQuery(id));
        Ok(id)
    }

    fn begin_time_elapsed(&self, query: u32) {
        // Reissuing a query discards its previous result.
        self.query_results.borrow_mut().remove(&query);
        self.active_query.set(Some(query));
        self.record(Call::BeginQuery(query));
    }

    fn end_time_elapsed(&self) {
        if let Some(q) = self.active_query.take() {
            self.ended_queries.borrow_mut().push(q);
        }
        self.record(Call::EndQuery);
    }

    fn query_result_available(&self, query: u32) -> bool {
        self.query_results.borrow().contains_key(&query)
    }

    fn query_result_ns(&self, query: u32) -> u64 {
        self.query_results.borrow().get(&query).copied().unwrap_or(0)
    }

    fn gpu_disjoint(&self) -> bool {
        self.disjoint.replace(false)
    }
}

/// Surface provider handing out [`RecordingApi`]s for known surface ids.
#[derive(Debug, Default)]
pub struct RecordingSurfaces {
    surfaces: HashMap<String, Capabilities>,
}

impl RecordingSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a surface with every capability.
    pub fn with_surface(self, surface_id: impl Into<String>) -> Self {
        self.with_surface_caps(surface_id, Capabilities::all())
    }

    pub fn with_surface_caps(mut self, surface_id: impl Into<String>, caps: Capabilities) -> Self {
        self.surfaces.insert(surface_id.into(), caps);
        self
    }
}

impl SurfaceProvider for RecordingSurfaces {
    type Api = RecordingApi;

    fn open(&mut self, surface_id: &str) -> Result<RecordingApi, String> {
        match self.surfaces.get(surface_id) {
            Some(&caps) => Ok(RecordingApi::new(caps)),
            None => Err(format!("surface not found: {surface_id}")),
        }
    }
}
