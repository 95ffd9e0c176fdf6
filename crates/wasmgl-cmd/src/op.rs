//! Opcode values. Shared verbatim with guest modules; never renumber.

pub const NOP: i32 = 0;
pub const VIEWPORT: i32 = 1;
pub const CLEAR_COLOR: i32 = 2;
pub const CLEAR: i32 = 3;
pub const USE_PROGRAM: i32 = 4;
pub const BIND_BUFFER: i32 = 5;
pub const BUFFER_DATA_F32: i32 = 6;
pub const BUFFER_SUB_DATA_F32: i32 = 7;
pub const DRAW_ARRAYS: i32 = 8;
pub const ACTIVE_TEXTURE: i32 = 9;
pub const BIND_TEXTURE: i32 = 10;
pub const UNIFORM_1I: i32 = 11;
pub const UNIFORM_1F: i32 = 12;
pub const UNIFORM_2F: i32 = 13;
pub const UNIFORM_4F: i32 = 14;
pub const DRAW_ARRAYS_INSTANCED: i32 = 15;
pub const BIND_VERTEX_ARRAY: i32 = 16;
/// `uniform2f(view)` + `activeTexture(unit)` + `uniform1i(sampler, unit)`.
pub const SETUP_VIEW_SAMPLER_2D: i32 = 17;

/// Human-readable opcode name for logs. Unknown values map to `"unknown"`.
pub fn name(op: i32) -> &'static str {
    match op {
        NOP => "nop",
        VIEWPORT => "viewport",
        CLEAR_COLOR => "clear_color",
        CLEAR => "clear",
        USE_PROGRAM => "use_program",
        BIND_BUFFER => "bind_buffer",
        BUFFER_DATA_F32 => "buffer_data_f32",
        BUFFER_SUB_DATA_F32 => "buffer_sub_data_f32",
        DRAW_ARRAYS => "draw_arrays",
        ACTIVE_TEXTURE => "active_texture",
        BIND_TEXTURE => "bind_texture",
        UNIFORM_1I => "uniform1i",
        UNIFORM_1F => "uniform1f",
        UNIFORM_2F => "uniform2f",
        UNIFORM_4F => "uniform4f",
        DRAW_ARRAYS_INSTANCED => "draw_arrays_instanced",
        BIND_VERTEX_ARRAY => "bind_vertex_array",
        SETUP_VIEW_SAMPLER_2D => "setup_view_sampler_2d",
        _ => "unknown",
    }
}
