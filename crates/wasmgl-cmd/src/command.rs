use crate::error::DecodeError;
use crate::op;
use crate::record::{f32_bits, RawRecord};

/// Typed view of one command record.
///
/// Handles are the guest's small integers (`0` = unbind). Pointers are byte
/// offsets into guest linear memory. GL enums (`target`, `mode`, `usage`,
/// `mask`) are passed through untouched.
///
/// Extending the protocol:
/// - add an opcode constant in [`op`]
/// - add a variant here plus its arms in `decode` / `encode`
/// - handle it in the host interpreter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Nop,
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    ClearColor { r: f32, g: f32, b: f32, a: f32 },
    Clear { mask: u32 },
    UseProgram { program: i32 },
    BindBuffer { target: u32, buffer: i32 },
    /// `ptr == 0` allocates `float_count * 4` uninitialized bytes.
    BufferData { target: u32, ptr: u32, float_count: u32, usage: u32 },
    BufferSubData { target: u32, byte_offset: i32, ptr: u32, float_count: u32 },
    DrawArrays { mode: u32, first: i32, count: i32 },
    ActiveTexture { unit: u32 },
    BindTexture { target: u32, texture: i32 },
    Uniform1i { location: i32, value: i32 },
    Uniform1f { location: i32, x: f32 },
    Uniform2f { location: i32, x: f32, y: f32 },
    Uniform4f { location: i32, x: f32, y: f32, z: f32, w: f32 },
    DrawArraysInstanced { mode: u32, first: i32, count: i32, instances: i32 },
    BindVertexArray { vao: i32 },
    SetupViewSampler2D {
        view_location: i32,
        width: f32,
        height: f32,
        sampler_location: i32,
        unit: u32,
    },
}

impl Command {
    /// Decodes a raw record. Float operands are reinterpreted bit-for-bit.
    pub fn decode(raw: &RawRecord) -> Result<Self, DecodeError> {
        let a = &raw.args;
        let f = |i: usize| raw.arg_f32(i);

        let cmd = match raw.op {
            op::NOP => Command::Nop,
            op::VIEWPORT => Command::Viewport { x: a[0], y: a[1], width: a[2], height: a[3] },
            op::CLEAR_COLOR => Command::ClearColor { r: f(0), g: f(1), b: f(2), a: f(3) },
            op::CLEAR => Command::Clear { mask: a[0] as u32 },
            op::USE_PROGRAM => Command::UseProgram { program: a[0] },
            op::BIND_BUFFER => Command::BindBuffer { target: a[0] as u32, buffer: a[1] },
            op::BUFFER_DATA_F32 => Command::BufferData {
                target: a[0] as u32,
                ptr: a[1] as u32,
                float_count: a[2] as u32,
                usage: a[3] as u32,
            },
            op::BUFFER_SUB_DATA_F32 => Command::BufferSubData {
                target: a[0] as u32,
                byte_offset: a[1],
                ptr: a[2] as u32,
                float_count: a[3] as u32,
            },
            op::DRAW_ARRAYS => Command::DrawArrays { mode: a[0] as u32, first: a[1], count: a[2] },
            op::ACTIVE_TEXTURE => Command::ActiveTexture { unit: a[0] as u32 },
            op::BIND_TEXTURE => Command::BindTexture { target: a[0] as u32, texture: a[1] },
            op::UNIFORM_1I => Command::Uniform1i { location: a[0], value: a[1] },
            op::UNIFORM_1F => Command::Uniform1f { location: a[0], x: f(1) },
            op::UNIFORM_2F => Command::Uniform2f { location: a[0], x: f(1), y: f(2) },
            op::UNIFORM_4F => Command::Uniform4f {
                location: a[0],
                x: f(1),
                y: f(2),
                z: f(3),
                w: f(4),
            },
            op::DRAW_ARRAYS_INSTANCED => Command::DrawArraysInstanced {
                mode: a[0] as u32,
                first: a[1],
                count: a[2],
                instances: a[3],
            },
            op::BIND_VERTEX_ARRAY => Command::BindVertexArray { vao: a[0] },
            op::SETUP_VIEW_SAMPLER_2D => Command::SetupViewSampler2D {
                view_location: a[0],
                width: f(1),
                height: f(2),
                sampler_location: a[3],
                unit: a[4] as u32,
            },
            other => return Err(DecodeError::UnknownOpcode(other)),
        };

        Ok(cmd)
    }

    /// Encodes into the on-the-wire layout. Unused operands are zero.
    pub fn encode(&self) -> RawRecord {
        let b = f32_bits;
        let (op, args) = match *self {
            Command::Nop => (op::NOP, [0; 7]),
            Command::Viewport { x, y, width, height } => {
                (op::VIEWPORT, [x, y, width, height, 0, 0, 0])
            }
            Command::ClearColor { r, g, b: blue, a } => {
                (op::CLEAR_COLOR, [b(r), b(g), b(blue), b(a), 0, 0, 0])
            }
            Command::Clear { mask } => (op::CLEAR, [mask as i32, 0, 0, 0, 0, 0, 0]),
            Command::UseProgram { program } => (op::USE_PROGRAM, [program, 0, 0, 0, 0, 0, 0]),
            Command::BindBuffer { target, buffer } => {
                (op::BIND_BUFFER, [target as i32, buffer, 0, 0, 0, 0, 0])
            }
            Command::BufferData { target, ptr, float_count, usage } => (
                op::BUFFER_DATA_F32,
                [target as i32, ptr as i32, float_count as i32, usage as i32, 0, 0, 0],
            ),
            Command::BufferSubData { target, byte_offset, ptr, float_count } => (
                op::BUFFER_SUB_DATA_F32,
                [target as i32, byte_offset, ptr as i32, float_count as i32, 0, 0, 0],
            ),
            Command::DrawArrays { mode, first, count } => {
                (op::DRAW_ARRAYS, [mode as i32, first, count, 0, 0, 0, 0])
            }
            Command::ActiveTexture { unit } => (op::ACTIVE_TEXTURE, [unit as i32, 0, 0, 0, 0, 0, 0]),
            Command::BindTexture { target, texture } => {
                (op::BIND_TEXTURE, [target as i32, texture, 0, 0, 0, 0, 0])
            }
            Command::Uniform1i { location, value } => {
                (op::UNIFORM_1I, [location, value, 0, 0, 0, 0, 0])
            }
            Command::Uniform1f { location, x } => (op::UNIFORM_1F, [location, b(x), 0, 0, 0, 0, 0]),
            Command::Uniform2f { location, x, y } => {
                (op::UNIFORM_2F, [location, b(x), b(y), 0, 0, 0, 0])
            }
            Command::Uniform4f { location, x, y, z, w } => {
                (op::UNIFORM_4F, [location, b(x), b(y), b(z), b(w), 0, 0])
            }
            Command::DrawArraysInstanced { mode, first, count, instances } => (
                op::DRAW_ARRAYS_INSTANCED,
                [mode as i32, first, count, instances, 0, 0, 0],
            ),
            Command::BindVertexArray { vao } => (op::BIND_VERTEX_ARRAY, [vao, 0, 0, 0, 0, 0, 0]),
            Command::SetupViewSampler2D { view_location, width, height, sampler_location, unit } => (
                op::SETUP_VIEW_SAMPLER_2D,
                [view_location, b(width), b(height), sampler_location, unit as i32, 0, 0],
            ),
        };

        RawRecord::new(op, args)
    }

    /// Opcode this command encodes to.
    #[inline]
    pub fn opcode(&self) -> i32 {
        self.encode().op
    }

    /// Whether this command issues a draw call.
    #[inline]
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::DrawArrays { .. } | Command::DrawArraysInstanced { .. })
    }
}
