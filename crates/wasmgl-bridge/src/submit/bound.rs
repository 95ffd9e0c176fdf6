use crate::handles::Handle;
use crate::host::gl;

/// Buffer targets tracked per submission. Others are never elided.
const BUFFER_TARGETS: usize = 4;
/// Texture units tracked per submission. Higher units are never elided.
pub const TRACKED_UNITS: usize = 16;

/// What the interpreter believes is bound right now.
///
/// Every field starts out unknown, so the first bind of each kind in a
/// submission always reaches the host. Fixed-size; building one never
/// allocates.
#[derive(Debug, Clone)]
pub struct BoundState {
    program: Option<Handle>,
    vertex_array: Option<Handle>,
    active_unit: Option<u32>,
    buffers: [Option<(u32, Handle)>; BUFFER_TARGETS],
    textures: [Option<(u32, Handle)>; TRACKED_UNITS],
}

impl BoundState {
    pub fn new() -> Self {
        Self {
            program: None,
            vertex_array: None,
            active_unit: None,
            buffers: [None; BUFFER_TARGETS],
            textures: [None; TRACKED_UNITS],
        }
    }

    pub fn program_is(&self, program: Handle) -> bool {
        self.program == Some(program)
    }

    pub fn set_program(&mut self, program: Handle) {
        self.program = Some(program);
    }

    pub fn vertex_array_is(&self, vao: Handle) -> bool {
        self.vertex_array == Some(vao)
    }

    /// The element buffer binding belongs to the vertex array, so it becomes
    /// unknown whenever the vertex array changes.
    pub fn set_vertex_array(&mut self, vao: Handle) {
        self.vertex_array = Some(vao);
        self.forget_buffer(gl::ELEMENT_ARRAY_BUFFER);
    }

    pub fn active_unit_is(&self, unit: u32) -> bool {
        self.active_unit == Some(unit)
    }

    pub fn set_active_unit(&mut self, unit: u32) {
        self.active_unit = Some(unit);
    }

    pub fn buffer_is(&self, target: u32, buffer: Handle) -> bool {
        self.buffers.contains(&Some((target, buffer)))
    }

    pub fn set_buffer(&mut self, target: u32, buffer: Handle) {
        if let Some(slot) = self.buffers.iter_mut().find(|s| matches!(s, Some((t, _)) if *t == target)) {
            *slot = Some((target, buffer));
        } else if let Some(slot) = self.buffers.iter_mut().find(|s| s.is_none()) {
            *slot = Some((target, buffer));
        }
    }

    fn forget_buffer(&mut self, target: u32) {
        for slot in &mut self.buffers {
            if matches!(slot, Some((t, _)) if *t == target) {
                *slot = None;
            }
        }
    }

    /// True if `texture` is known to be bound to `target` on the active unit.
    pub fn texture_is(&self, target: u32, texture: Handle) -> bool {
        self.unit_slot()
            .and_then(|i| self.textures[i])
            .is_some_and(|bound| bound == (target, texture))
    }

    /// Records a bind on the active unit. With an unknown active unit nothing
    /// is recorded.
    pub fn set_texture(&mut self, target: u32, texture: Handle) {
        if let Some(i) = self.unit_slot() {
            self.textures[i] = Some((target, texture));
        }
    }

    fn unit_slot(&self) -> Option<usize> {
        self.active_unit
            .map(|u| u as usize)
            .filter(|&u| u < TRACKED_UNITS)
    }
}

impl Default for BoundState {
    fn default() -> Self {
        Self::new()
    }
}
