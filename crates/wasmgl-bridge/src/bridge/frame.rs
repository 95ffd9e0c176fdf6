use std::time::Instant;

use crate::error::BridgeError;
use crate::handles::Handle;
use crate::host::SurfaceProvider;
use crate::submit::SubmitStats;
use crate::texture::ImageLoader;
use crate::time::GpuTime;

use super::{Bridge, GuestExports};

/// What one frame did, for an external HUD.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub context: Handle,
    pub frame_index: u64,

    /// Clamped seconds since the previous frame.
    pub dt: f32,
    pub fps: f32,
    pub cpu_ms: f32,
    pub gpu: GpuTime,

    /// Whether this frame's GPU work is being timed.
    pub gpu_timed: bool,

    /// Notifications delivered at the start of the frame.
    pub notifications: usize,
    pub textures: usize,
    pub pending_loads: usize,
    pub submit: SubmitStats,
}

impl<P: SurfaceProvider, L: ImageLoader> Bridge<P, L> {
    /// Opens a GPU timing query on `ctx` unless the ring is full.
    pub fn gpu_begin(&mut self, ctx: Handle) -> Result<bool, BridgeError> {
        Ok(self.contexts.get_mut(ctx)?.gpu_begin())
    }

    pub fn gpu_end(&mut self, ctx: Handle) -> Result<(), BridgeError> {
        self.contexts.get_mut(ctx)?.gpu_end();
        Ok(())
    }

    pub fn gpu_poll(&mut self, ctx: Handle) -> Result<GpuTime, BridgeError> {
        Ok(self.contexts.get_mut(ctx)?.gpu_poll())
    }

    /// Runs one frame on `ctx`.
    ///
    /// Order: deliver texture notifications, poll the GPU ring, begin timing,
    /// run `body`, end timing, update the frame clock. CPU time covers only
    /// the timed part, so texture uploads and guest callbacks are excluded.
    pub fn frame<E, F>(&mut self, ctx: Handle, guest: &mut E, body: F) -> Result<FrameReport, BridgeError>
    where
        E: GuestExports + ?Sized,
        F: FnOnce(&mut Self, &mut E),
    {
        self.contexts.get(ctx)?;

        let time = self.clock.tick_at(Instant::now());
        self.frame_submit = SubmitStats::default();

        let notifications = self.pump(guest);
        let gpu = self.gpu_poll(ctx)?;

        let cpu_start = Instant::now();
        let gpu_timed = self.gpu_begin(ctx)?;

        body(self, guest);

        self.gpu_end(ctx)?;
        self.clock.record_cpu(cpu_start.elapsed());

        let stats = self.clock.stats();
        let context = self.contexts.get(ctx)?;
        let report = FrameReport {
            context: ctx,
            frame_index: time.frame_index,
            dt: time.dt,
            fps: stats.fps,
            cpu_ms: stats.cpu_ms,
            gpu,
            gpu_timed,
            notifications,
            textures: context.texture_count(),
            pending_loads: context.texture_cache().pending_count(),
            submit: self.frame_submit,
        };
        self.publish(&report);

        log::trace!(
            "frame {}: {:.1} fps, cpu {:.2} ms, gpu {:?}",
            report.frame_index,
            report.fps,
            report.cpu_ms,
            report.gpu
        );
        Ok(report)
    }

    fn publish(&mut self, report: &FrameReport) {
        let t = &mut self.telemetry;
        t.set_f32("Frame/fps", report.fps, "fps");
        t.set_f32("Frame/cpuMs", report.cpu_ms, "ms");
        if let Some(ms) = report.gpu.ms() {
            t.set_f32("Frame/gpuMs", ms, "ms");
        }
        t.set_i32("Render/textures", report.textures as i32, "");
        t.set_i32("Render/commands", report.submit.executed as i32, "");
        t.set_i32("Render/skipped", report.submit.skipped() as i32, "");
    }
}

#[cfg(test)]
mod tests {
    use wasmgl_cmd::{Command, CommandBuffer};

    use super::*;
    use crate::bridge::{GuestMemory, Notification, StatValue};
    use crate::config::BridgeConfig;
    use crate::host::{gl, Call, Capabilities, RecordingSurfaces};
    use crate::texture::{DecodedImage, ManualLoader, RequestId, TextureSource};

    type TestBridge = Bridge<RecordingSurfaces, ManualLoader>;

    fn bridge(caps: Capabilities) -> (TestBridge, Handle) {
        let surfaces = RecordingSurfaces::new().with_surface_caps("main", caps);
        let mut b = Bridge::with_loader(BridgeConfig::default(), surfaces, ManualLoader::new());
        let ctx = b.create_context("main").unwrap();
        (b, ctx)
    }

    // ── ordering ──

    #[test]
    fn notifications_arrive_before_the_frame_runs() {
        let (mut b, ctx) = bridge(Capabilities::all());
        let src = TextureSource::Url("a.png".into());
        b.request_load(ctx, &src, 3).unwrap();
        let image = DecodedImage::from_rgba8(1, 1, vec![0; 4]).unwrap();
        b.loader_mut().complete(&src.key(), image);

        let mut seen: Vec<Notification> = Vec::new();
        let report = b
            .frame(ctx, &mut seen, |_, guest| {
                assert_eq!(guest.len(), 1, "pump runs before the frame body");
            })
            .unwrap();
        assert_eq!(report.notifications, 1);
        assert_eq!(report.textures, 1);
    }

    #[test]
    fn frame_body_is_wrapped_in_a_timer_query() {
        let (mut b, ctx) = bridge(Capabilities::all());
        let mut cb = CommandBuffer::new();
        cb.push(Command::DrawArrays { mode: gl::TRIANGLES, first: 0, count: 3 });
        let bytes = cb.as_bytes().to_vec();

        let report = b
            .frame(ctx, &mut (), |b, _| {
                b.submit(ctx, &GuestMemory::new(&bytes), 0, 1);
            })
            .unwrap();
        assert!(report.gpu_timed);
        assert_eq!(report.gpu, GpuTime::Warming);
        assert_eq!(report.submit.executed, 1);

        let calls = b.context(ctx).unwrap().api().calls();
        let begin = calls.iter().position(|c| matches!(c, Call::BeginQuery(_))).unwrap();
        let draw = calls.iter().position(Call::is_draw).unwrap();
        let end = calls.iter().position(|c| matches!(c, Call::EndQuery)).unwrap();
        assert!(begin < draw && draw < end);
    }

    #[test]
    fn gpu_time_is_polled_at_frame_start() {
        let (mut b, ctx) = bridge(Capabilities::all());
        b.frame(ctx, &mut (), |_, _| {}).unwrap();
        b.context(ctx).unwrap().api().complete_queries(2_000_000);

        let report = b.frame(ctx, &mut (), |_, _| {}).unwrap();
        match report.gpu {
            GpuTime::Smoothed(ms) => assert!((ms - 0.4).abs() < 1e-4),
            other => panic!("expected a sample, got {other:?}"),
        }
    }

    #[test]
    fn submit_stats_reset_each_frame() {
        let (mut b, ctx) = bridge(Capabilities::all());
        let mut cb = CommandBuffer::new();
        cb.push(Command::Clear { mask: gl::COLOR_BUFFER_BIT });
        let bytes = cb.as_bytes().to_vec();

        let first = b
            .frame(ctx, &mut (), |b, _| {
                b.submit(ctx, &GuestMemory::new(&bytes), 0, 1);
                b.submit(ctx, &GuestMemory::new(&bytes), 0, 1);
            })
            .unwrap();
        let second = b.frame(ctx, &mut (), |_, _| {}).unwrap();
        assert_eq!(first.submit.executed, 2);
        assert_eq!(second.submit.executed, 0);
        assert_eq!(second.frame_index, first.frame_index + 1);
    }

    struct SlowGuest;

    impl GuestExports for SlowGuest {
        fn on_texture_loaded(&mut self, _request: RequestId, _texture: Handle, _width: i32, _height: i32) {
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    }

    #[test]
    fn cpu_time_excludes_texture_callbacks() {
        let (mut b, ctx) = bridge(Capabilities::all());
        let src = TextureSource::Url("a.png".into());
        b.request_load(ctx, &src, 1).unwrap();
        let image = DecodedImage::from_rgba8(1, 1, vec![0; 4]).unwrap();
        b.loader_mut().complete(&src.key(), image);

        let report = b.frame(ctx, &mut SlowGuest, |_, _| {}).unwrap();
        assert_eq!(report.notifications, 1);
        assert!(report.cpu_ms < 5.0, "cpu_ms {} counts the callback", report.cpu_ms);
    }

    // ── degraded ──

    #[test]
    fn no_timer_queries_reports_unsupported() {
        let caps = Capabilities { timer_query: false, ..Capabilities::all() };
        let (mut b, ctx) = bridge(caps);
        let report = b.frame(ctx, &mut (), |_, _| {}).unwrap();
        assert_eq!(report.gpu, GpuTime::Unsupported);
        assert!(!report.gpu_timed);
        assert!(b.telemetry().get("Frame/gpuMs").is_none());
    }

    #[test]
    fn unknown_context_skips_the_frame() {
        let (mut b, _) = bridge(Capabilities::all());
        let mut ran = false;
        assert!(b.frame(4, &mut (), |_, _| ran = true).is_err());
        assert!(!ran);
    }

    #[test]
    fn frame_publishes_telemetry() {
        let (mut b, ctx) = bridge(Capabilities::all());
        b.create_texture_checker(ctx, 4).unwrap();
        b.frame(ctx, &mut (), |_, _| {}).unwrap();

        let t = b.telemetry();
        assert_eq!(t.get("Render/textures").unwrap().value, StatValue::I32(1));
        assert_eq!(t.get("Frame/cpuMs").unwrap().unit, "ms");
    }
}
