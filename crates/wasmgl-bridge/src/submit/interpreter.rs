use wasmgl_cmd::{op, Command, RawRecord, RECORD_SIZE};

use crate::bridge::GuestMemory;
use crate::context::Context;
use crate::error::BridgeError;
use crate::handles::Handle;
use crate::host::GraphicsApi;

use super::bound::BoundState;

/// Per-submission counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SubmitStats {
    /// Records that reached the host.
    pub executed: u32,
    /// Binds skipped because the same object was already bound.
    pub elided: u32,
    /// Records with an unknown opcode.
    pub unknown: u32,
    /// Records naming a bad handle or guest range, or needing a missing
    /// capability.
    pub invalid: u32,
}

impl SubmitStats {
    pub fn skipped(&self) -> u32 {
        self.unknown + self.invalid
    }

    pub fn accumulate(&mut self, other: SubmitStats) {
        self.executed += other.executed;
        self.elided += other.elided;
        self.unknown += other.unknown;
        self.invalid += other.invalid;
    }
}

/// What happened to one command.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Executed {
    Issued,
    Elided,
}

/// Decodes and runs `count` records starting at `ptr`, in order.
///
/// Fails only when the record range itself does not fit in guest memory.
/// Individual bad records are logged and skipped.
pub fn submit<G: GraphicsApi>(
    ctx: &Context<G>,
    mem: &GuestMemory<'_>,
    ptr: u32,
    count: u32,
) -> Result<SubmitStats, BridgeError> {
    let len = (count as usize)
        .checked_mul(RECORD_SIZE)
        .ok_or(BridgeError::MemoryOutOfBounds { ptr, len: usize::MAX })?;
    let bytes = mem.slice(ptr, len)?;

    let mut bound = BoundState::new();
    let mut stats = SubmitStats::default();

    for (index, chunk) in bytes.chunks_exact(RECORD_SIZE).enumerate() {
        let Some(raw) = RawRecord::read_unaligned(chunk) else {
            continue;
        };

        let cmd = match Command::decode(&raw) {
            Ok(cmd) => cmd,
            Err(e) => {
                log::warn!("submit ctx {}: record {index}: {e}; skipped", ctx.id());
                stats.unknown += 1;
                continue;
            }
        };

        match execute(ctx, &mut bound, mem, &cmd) {
            Ok(Executed::Issued) => stats.executed += 1,
            Ok(Executed::Elided) => stats.elided += 1,
            Err(e) => {
                log::warn!(
                    "submit ctx {}: record {index} ({}): {e}; skipped",
                    ctx.id(),
                    op::name(raw.op)
                );
                stats.invalid += 1;
            }
        }
    }

    Ok(stats)
}

/// Runs one command against `ctx`, eliding binds `bound` already has.
///
/// Handles and guest ranges are validated before any host call, so a failed
/// command leaves both the host and `bound` untouched.
pub fn execute<G: GraphicsApi>(
    ctx: &Context<G>,
    bound: &mut BoundState,
    mem: &GuestMemory<'_>,
    cmd: &Command,
) -> Result<Executed, BridgeError> {
    let api = ctx.api();

    match *cmd {
        Command::Nop => {}

        Command::Viewport { x, y, width, height } => api.viewport(x, y, width, height),
        Command::ClearColor { r, g, b, a } => api.clear_color(r, g, b, a),
        Command::Clear { mask } => api.clear(mask),

        Command::UseProgram { program } => {
            if bound.program_is(program) {
                return Ok(Executed::Elided);
            }
            let resolved = ctx.programs.binding(program)?.copied();
            api.use_program(resolved);
            bound.set_program(program);
        }

        Command::BindBuffer { target, buffer } => {
            if bound.buffer_is(target, buffer) {
                return Ok(Executed::Elided);
            }
            let resolved = ctx.buffers.binding(buffer)?.copied();
            api.bind_buffer(target, resolved);
            bound.set_buffer(target, buffer);
        }

        Command::BufferData { target, ptr, float_count, usage } => {
            if ptr == 0 {
                let size = float_count
                    .checked_mul(4)
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or(BridgeError::MemoryOutOfBounds { ptr, len: float_count as usize })?;
                api.buffer_data_size(target, size, usage);
            } else {
                let data = mem.f32_bytes(ptr, float_count)?;
                api.buffer_data(target, data, usage);
            }
        }

        Command::BufferSubData { target, byte_offset, ptr, float_count } => {
            let data = mem.f32_bytes(ptr, float_count)?;
            api.buffer_sub_data(target, byte_offset, data);
        }

        Command::DrawArrays { mode, first, count } => api.draw_arrays(mode, first, count),

        Command::DrawArraysInstanced { mode, first, count, instances } => {
            if !ctx.capabilities().instancing {
                return Err(BridgeError::Unsupported("instanced drawing"));
            }
            api.draw_arrays_instanced(mode, first, count, instances);
        }

        Command::ActiveTexture { unit } => {
            check_unit(ctx, unit)?;
            if !select_unit(api, bound, unit) {
                return Ok(Executed::Elided);
            }
        }

        Command::BindTexture { target, texture } => {
            if bound.texture_is(target, texture) {
                return Ok(Executed::Elided);
            }
            let resolved = ctx.textures.binding(texture)?.map(|slot| slot.texture);
            api.bind_texture(target, resolved);
            bound.set_texture(target, texture);
        }

        Command::Uniform1i { location, value } => {
            api.uniform_1i(uniform(ctx, location)?, value);
        }
        Command::Uniform1f { location, x } => {
            api.uniform_1f(uniform(ctx, location)?, x);
        }
        Command::Uniform2f { location, x, y } => {
            api.uniform_2f(uniform(ctx, location)?, x, y);
        }
        Command::Uniform4f { location, x, y, z, w } => {
            api.uniform_4f(uniform(ctx, location)?, x, y, z, w);
        }

        Command::BindVertexArray { vao } => {
            if bound.vertex_array_is(vao) {
                return Ok(Executed::Elided);
            }
            let resolved = ctx.vertex_arrays.binding(vao)?;
            if ctx.capabilities().vertex_arrays {
                api.bind_vertex_array(resolved.copied().flatten());
            }
            bound.set_vertex_array(vao);
        }

        Command::SetupViewSampler2D { view_location, width, height, sampler_location, unit } => {
            check_unit(ctx, unit)?;
            let view = uniform(ctx, view_location)?;
            let sampler = uniform(ctx, sampler_location)?;
            api.uniform_2f(view, width, height);
            select_unit(api, bound, unit);
            api.uniform_1i(sampler, unit as i32);
        }
    }

    Ok(Executed::Issued)
}

fn check_unit<G: GraphicsApi>(ctx: &Context<G>, unit: u32) -> Result<(), BridgeError> {
    let units = ctx.capabilities().texture_units;
    if unit >= units {
        return Err(BridgeError::InvalidTextureUnit { unit, units });
    }
    Ok(())
}

/// Activates `unit` unless it already is. Returns whether the host was called.
fn select_unit<G: GraphicsApi>(api: &G, bound: &mut BoundState, unit: u32) -> bool {
    if bound.active_unit_is(unit) {
        return false;
    }
    api.active_texture(unit);
    bound.set_active_unit(unit);
    true
}

/// Resolves a uniform handle. `0` and optimized-out uniforms map to `None`,
/// which the host ignores.
fn uniform<G: GraphicsApi>(
    ctx: &Context<G>,
    location: Handle,
) -> Result<Option<&G::UniformLocation>, BridgeError> {
    Ok(ctx.uniforms.binding(location)?.and_then(Option::as_ref))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::host::{gl, Call, Capabilities, RecordingApi};
    use wasmgl_cmd::CommandBuffer;

    /// Records start here; bytes below are free for vertex data.
    const RECORDS_AT: usize = 64;

    fn ctx_with(caps: Capabilities) -> Context<RecordingApi> {
        let mut ctx = Context::new(1, "main", RecordingApi::new(caps), &BridgeConfig::default());
        ctx.create_buffer().unwrap();
        ctx.create_buffer().unwrap();
        ctx.api().take_calls();
        ctx
    }

    fn ctx() -> Context<RecordingApi> {
        ctx_with(Capabilities::all())
    }

    fn memory(records: &[RawRecord], data: &[f32]) -> Vec<u8> {
        let mut mem = vec![0u8; RECORDS_AT];
        let data: &[u8] = bytemuck::cast_slice(data);
        mem[16..16 + data.len()].copy_from_slice(data);
        mem.extend_from_slice(bytemuck::cast_slice(records));
        mem
    }

    fn run(ctx: &Context<RecordingApi>, cmds: &[Command]) -> SubmitStats {
        let records: Vec<_> = cmds.iter().map(Command::encode).collect();
        run_raw(ctx, &records, &[])
    }

    fn run_raw(ctx: &Context<RecordingApi>, records: &[RawRecord], data: &[f32]) -> SubmitStats {
        let mem = memory(records, data);
        submit(ctx, &GuestMemory::new(&mem), RECORDS_AT as u32, records.len() as u32).unwrap()
    }

    fn bind_array(buffer: Handle) -> Command {
        Command::BindBuffer { target: gl::ARRAY_BUFFER, buffer }
    }

    // ── ordering & decoding ──

    #[test]
    fn records_execute_in_order() {
        let ctx = ctx();
        run(&ctx, &[
            Command::ClearColor { r: 0.5, g: 0.25, b: 0.0, a: 1.0 },
            Command::Clear { mask: gl::COLOR_BUFFER_BIT },
            Command::Viewport { x: 0, y: 0, width: 640, height: 480 },
        ]);
        assert_eq!(ctx.api().take_calls(), vec![
            Call::ClearColor(0.5, 0.25, 0.0, 1.0),
            Call::Clear(gl::COLOR_BUFFER_BIT),
            Call::Viewport(0, 0, 640, 480),
        ]);
    }

    #[test]
    fn draws_and_uploads_keep_record_order() {
        let ctx = ctx();
        let upload = Command::BufferData {
            target: gl::ARRAY_BUFFER,
            ptr: 16,
            float_count: 2,
            usage: gl::DYNAMIC_DRAW,
        };
        let draw = Command::DrawArrays { mode: gl::TRIANGLES, first: 0, count: 3 };
        let data = [1.0f32, 2.0];
        let bytes: Vec<u8> = bytemuck::cast_slice(&data).to_vec();

        let stats = run_raw(&ctx, &[draw.encode(), bind_array(1).encode(), upload.encode()], &data);
        assert_eq!(stats.elided, 0);
        assert_eq!(ctx.api().take_calls(), vec![
            Call::DrawArrays { mode: gl::TRIANGLES, first: 0, count: 3 },
            Call::BindBuffer { target: gl::ARRAY_BUFFER, buffer: Some(1) },
            Call::BufferData { target: gl::ARRAY_BUFFER, data: bytes.clone(), usage: gl::DYNAMIC_DRAW },
        ]);

        let stats = run_raw(&ctx, &[bind_array(1).encode(), upload.encode(), draw.encode()], &data);
        assert_eq!(stats.elided, 0);
        assert_eq!(ctx.api().take_calls(), vec![
            Call::BindBuffer { target: gl::ARRAY_BUFFER, buffer: Some(1) },
            Call::BufferData { target: gl::ARRAY_BUFFER, data: bytes, usage: gl::DYNAMIC_DRAW },
            Call::DrawArrays { mode: gl::TRIANGLES, first: 0, count: 3 },
        ]);
    }

    #[test]
    fn unknown_opcode_is_skipped() {
        let ctx = ctx();
        let records = [
            Command::Viewport { x: 0, y: 0, width: 8, height: 8 }.encode(),
            RawRecord::new(99, [1, 2, 3, 4, 5, 6, 7]),
            Command::Clear { mask: gl::COLOR_BUFFER_BIT }.encode(),
        ];
        let stats = run_raw(&ctx, &records, &[]);

        assert_eq!(stats, SubmitStats { executed: 2, unknown: 1, ..SubmitStats::default() });
        assert_eq!(ctx.api().take_calls(), vec![
            Call::Viewport(0, 0, 8, 8),
            Call::Clear(gl::COLOR_BUFFER_BIT),
        ]);
    }

    #[test]
    fn records_may_be_unaligned() {
        let ctx = ctx();
        let mut cmds = CommandBuffer::new();
        cmds.push(Command::Clear { mask: 1 });
        let mut mem = vec![0u8; 3];
        mem.extend_from_slice(cmds.as_bytes());

        let stats = submit(&ctx, &GuestMemory::new(&mem), 3, 1).unwrap();
        assert_eq!(stats.executed, 1);
        assert_eq!(ctx.api().take_calls(), vec![Call::Clear(1)]);
    }

    #[test]
    fn record_range_outside_memory_fails_the_call() {
        let ctx = ctx();
        let mem = vec![0u8; 40];
        let err = submit(&ctx, &GuestMemory::new(&mem), 16, 1).unwrap_err();
        assert_eq!(err, BridgeError::MemoryOutOfBounds { ptr: 16, len: 32 });
        assert!(ctx.api().calls().is_empty());
    }

    #[test]
    fn empty_submission_does_nothing() {
        let ctx = ctx();
        assert_eq!(run(&ctx, &[]), SubmitStats::default());
    }

    // ── elision ──

    #[test]
    fn distinct_buffer_binds_both_reach_the_host() {
        let ctx = ctx();
        let upload = Command::BufferData {
            target: gl::ARRAY_BUFFER,
            ptr: 16,
            float_count: 2,
            usage: gl::STATIC_DRAW,
        };
        let records = [bind_array(1).encode(), upload.encode(), bind_array(2).encode()];
        run_raw(&ctx, &records, &[1.0, 2.0]);

        assert_eq!(ctx.api().count(|c| matches!(c, Call::BindBuffer { .. })), 2);
    }

    #[test]
    fn repeated_bind_is_elided() {
        let ctx = ctx();
        let stats = run(&ctx, &[bind_array(1), bind_array(1), bind_array(2), bind_array(2)]);
        assert_eq!(stats.executed, 2);
        assert_eq!(stats.elided, 2);
        assert_eq!(ctx.api().take_calls(), vec![
            Call::BindBuffer { target: gl::ARRAY_BUFFER, buffer: Some(1) },
            Call::BindBuffer { target: gl::ARRAY_BUFFER, buffer: Some(2) },
        ]);
    }

    #[test]
    fn binds_on_different_targets_are_independent() {
        let ctx = ctx();
        let element = Command::BindBuffer { target: gl::ELEMENT_ARRAY_BUFFER, buffer: 1 };
        run(&ctx, &[bind_array(1), element, bind_array(1)]);
        assert_eq!(ctx.api().count(|c| matches!(c, Call::BindBuffer { .. })), 2);
    }

    #[test]
    fn shadow_state_resets_between_submissions() {
        let ctx = ctx();
        run(&ctx, &[bind_array(1)]);
        run(&ctx, &[bind_array(1)]);
        assert_eq!(ctx.api().count(|c| matches!(c, Call::BindBuffer { .. })), 2);
    }

    #[test]
    fn null_handle_unbinds() {
        let ctx = ctx();
        run(&ctx, &[Command::UseProgram { program: 0 }, bind_array(0)]);
        assert_eq!(ctx.api().take_calls(), vec![
            Call::UseProgram(None),
            Call::BindBuffer { target: gl::ARRAY_BUFFER, buffer: None },
        ]);
    }

    #[test]
    fn vertex_array_change_forgets_element_buffer() {
        let mut ctx = ctx();
        ctx.create_vertex_array().unwrap();
        ctx.create_vertex_array().unwrap();
        ctx.api().take_calls();

        let element = Command::BindBuffer { target: gl::ELEMENT_ARRAY_BUFFER, buffer: 1 };
        run(&ctx, &[
            element,
            Command::BindVertexArray { vao: 1 },
            element,
            Command::BindVertexArray { vao: 1 },
            element,
        ]);
        assert_eq!(ctx.api().count(|c| matches!(c, Call::BindBuffer { .. })), 2);
        assert_eq!(ctx.api().count(|c| matches!(c, Call::BindVertexArray(_))), 1);
    }

    // ── invalid records ──

    #[test]
    fn bad_handle_is_skipped_without_touching_state() {
        let ctx = ctx();
        let stats = run(&ctx, &[bind_array(9), bind_array(1), Command::Clear { mask: 1 }]);
        assert_eq!(stats, SubmitStats { executed: 2, invalid: 1, ..SubmitStats::default() });
        assert_eq!(ctx.api().take_calls(), vec![
            Call::BindBuffer { target: gl::ARRAY_BUFFER, buffer: Some(1) },
            Call::Clear(1),
        ]);
    }

    #[test]
    fn upload_outside_memory_is_skipped() {
        let ctx = ctx();
        let upload = Command::BufferSubData {
            target: gl::ARRAY_BUFFER,
            byte_offset: 0,
            ptr: 1 << 20,
            float_count: 4,
        };
        let stats = run(&ctx, &[upload]);
        assert_eq!(stats.invalid, 1);
        assert!(ctx.api().calls().is_empty());
    }

    #[test]
    fn negative_texture_unit_is_skipped() {
        let ctx = ctx();
        let records = [
            RawRecord::new(op::ACTIVE_TEXTURE, [-1, 0, 0, 0, 0, 0, 0]),
            Command::Clear { mask: 1 }.encode(),
        ];
        let stats = run_raw(&ctx, &records, &[]);
        assert_eq!(stats, SubmitStats { executed: 1, invalid: 1, ..SubmitStats::default() });
        assert_eq!(ctx.api().take_calls(), vec![Call::Clear(1)]);
    }

    #[test]
    fn texture_unit_past_context_limit_is_skipped() {
        let ctx = ctx_with(Capabilities { texture_units: 16, ..Capabilities::all() });
        let stats = run(&ctx, &[Command::ActiveTexture { unit: 16 }, Command::ActiveTexture { unit: 15 }]);
        assert_eq!(stats.invalid, 1);
        assert_eq!(ctx.api().take_calls(), vec![Call::ActiveTexture(15)]);
    }

    #[test]
    fn view_sampler_with_bad_unit_makes_no_host_call() {
        let ctx = ctx();
        let record = RawRecord::new(op::SETUP_VIEW_SAMPLER_2D, [0, 0, 0, 0, -3, 0, 0]);
        let stats = run_raw(&ctx, &[record], &[]);
        assert_eq!(stats.invalid, 1);
        assert!(ctx.api().calls().is_empty());
    }

    #[test]
    fn instanced_draw_needs_instancing() {
        let ctx = ctx_with(Capabilities { instancing: false, ..Capabilities::all() });
        let draw = Command::DrawArraysInstanced { mode: gl::TRIANGLES, first: 0, count: 3, instances: 10 };
        let stats = run(&ctx, &[draw]);
        assert_eq!(stats.invalid, 1);
        assert!(ctx.api().calls().is_empty());
    }

    // ── uploads ──

    #[test]
    fn buffer_data_copies_floats() {
        let ctx = ctx();
        let upload = Command::BufferData {
            target: gl::ARRAY_BUFFER,
            ptr: 16,
            float_count: 3,
            usage: gl::DYNAMIC_DRAW,
        };
        run_raw(&ctx, &[upload.encode()], &[1.0, -2.0, 0.5]);

        let expected: Vec<u8> = bytemuck::cast_slice(&[1.0f32, -2.0, 0.5]).to_vec();
        assert_eq!(ctx.api().take_calls(), vec![Call::BufferData {
            target: gl::ARRAY_BUFFER,
            data: expected,
            usage: gl::DYNAMIC_DRAW,
        }]);
    }

    #[test]
    fn buffer_data_with_null_pointer_allocates() {
        let ctx = ctx();
        let alloc = Command::BufferData {
            target: gl::ARRAY_BUFFER,
            ptr: 0,
            float_count: 256,
            usage: gl::DYNAMIC_DRAW,
        };
        run(&ctx, &[alloc]);
        assert_eq!(ctx.api().take_calls(), vec![Call::BufferDataSize {
            target: gl::ARRAY_BUFFER,
            size: 1024,
            usage: gl::DYNAMIC_DRAW,
        }]);
    }

    // ── textures & uniforms ──

    #[test]
    fn view_sampler_composite() {
        let mut ctx = ctx();
        let vs = ctx.create_shader(gl::VERTEX_SHADER, "v").unwrap();
        let fs = ctx.create_shader(gl::FRAGMENT_SHADER, "f").unwrap();
        let p = ctx.create_program(vs, fs).unwrap();
        let view = ctx.get_uniform_location(p, "uView").unwrap();
        let sampler = ctx.get_uniform_location(p, "uTex").unwrap();
        let view_loc = ctx.uniforms.get(view).unwrap().unwrap();
        let sampler_loc = ctx.uniforms.get(sampler).unwrap().unwrap();
        ctx.api().take_calls();

        let cmd = Command::SetupViewSampler2D {
            view_location: view,
            width: 800.0,
            height: 600.0,
            sampler_location: sampler,
            unit: 2,
        };
        run(&ctx, &[cmd, cmd]);

        assert_eq!(ctx.api().take_calls(), vec![
            Call::Uniform2f(Some(view_loc), 800.0, 600.0),
            Call::ActiveTexture(2),
            Call::Uniform1i(Some(sampler_loc), 2),
            Call::Uniform2f(Some(view_loc), 800.0, 600.0),
            Call::Uniform1i(Some(sampler_loc), 2),
        ]);
    }

    #[test]
    fn texture_binds_are_elided_per_unit() {
        let mut ctx = ctx();
        ctx.create_texture_checker(8).unwrap();
        ctx.create_texture_checker(8).unwrap();
        ctx.api().take_calls();

        let bind = |texture| Command::BindTexture { target: gl::TEXTURE_2D, texture };
        let stats = run(&ctx, &[
            Command::ActiveTexture { unit: 0 },
            bind(1),
            bind(1),
            Command::ActiveTexture { unit: 1 },
            bind(2),
            Command::ActiveTexture { unit: 0 },
            bind(1),
        ]);

        assert_eq!(ctx.api().count(|c| matches!(c, Call::BindTexture { .. })), 2);
        assert_eq!(stats.elided, 2);
    }

    #[test]
    fn null_uniform_reaches_host_as_none() {
        let ctx = ctx();
        run(&ctx, &[Command::Uniform1f { location: 0, x: 1.5 }]);
        assert_eq!(ctx.api().take_calls(), vec![Call::Uniform1f(None, 1.5)]);
    }

    #[test]
    fn float_operands_keep_their_bits() {
        let ctx = ctx();
        let weird = f32::from_bits(0x7fc0_1234);
        let stats = run(&ctx, &[Command::ClearColor { r: weird, g: -0.0, b: f32::INFINITY, a: 1.0 }]);
        assert_eq!(stats.executed, 1);
        match &ctx.api().take_calls()[..] {
            [Call::ClearColor(r, g, b, _)] => {
                assert_eq!(r.to_bits(), 0x7fc0_1234);
                assert_eq!(g.to_bits(), (-0.0f32).to_bits());
                assert_eq!(*b, f32::INFINITY);
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }
}
