use crate::error::BridgeError;
use crate::handles::{Handle, NULL_HANDLE};
use crate::host::SurfaceProvider;
use crate::texture::{
    Admission, ImageLoader, LoadError, LoadErrorKind, LoadJob, LoadOutcome, RequestId, TextureInfo, TextureSource,
};

use super::{Bridge, GuestExports, Notification};

impl<P: SurfaceProvider, L: ImageLoader> Bridge<P, L> {
    /// Asks for `source` on `ctx`. `request` is echoed back through
    /// [`GuestExports`] on a later [`pump`](Self::pump), even when the texture
    /// is already cached.
    pub fn request_load(&mut self, ctx: Handle, source: &TextureSource, request: RequestId) -> Result<(), BridgeError> {
        let key = source.key();
        let context = self.contexts.get_mut(ctx)?;

        match context.cache.request(&key, Some(request)) {
            Admission::Ready(info) => self.notifications.push_back(loaded(request, info)),
            Admission::Joined => log::debug!("texture {key}: request {request} joined pending load"),
            Admission::Started => {
                log::debug!("texture {key}: request {request} starts load");
                self.loader.start(LoadJob {
                    context: ctx,
                    key,
                    fetch: source.fetch(),
                });
            }
        }
        Ok(())
    }

    /// Returns the cached texture for `source`, or [`NULL_HANDLE`] while it
    /// is not loaded yet. Starts a background load if none is in flight.
    /// Never blocks.
    pub fn request_load_sync(&mut self, ctx: Handle, source: &TextureSource) -> Result<Handle, BridgeError> {
        let key = source.key();
        let context = self.contexts.get_mut(ctx)?;

        match context.cache.request(&key, None) {
            Admission::Ready(info) => Ok(info.texture),
            Admission::Joined => Ok(NULL_HANDLE),
            Admission::Started => {
                self.loader.start(LoadJob {
                    context: ctx,
                    key,
                    fetch: source.fetch(),
                });
                Ok(NULL_HANDLE)
            }
        }
    }

    /// `(w & 0xffff) << 16 | (h & 0xffff)` for `texture`, `0` when unknown.
    pub fn get_texture_dimensions(&self, ctx: Handle, texture: Handle) -> Result<i32, BridgeError> {
        Ok(self.contexts.get(ctx)?.packed_texture_size(texture))
    }

    /// Applies finished loads, then delivers every queued notification to
    /// `guest` in order. Returns how many were delivered.
    pub fn pump<E: GuestExports + ?Sized>(&mut self, guest: &mut E) -> usize {
        self.apply_outcomes();

        let delivered = self.notifications.len();
        while let Some(n) = self.notifications.pop_front() {
            n.deliver(guest);
        }
        delivered
    }

    fn apply_outcomes(&mut self) {
        let mut outcomes = std::mem::take(&mut self.outcomes);
        self.loader.drain(&mut outcomes);
        for outcome in outcomes.drain(..) {
            self.apply(outcome);
        }
        self.outcomes = outcomes;
    }

    fn apply(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { context, key, result } = outcome;
        let Ok(ctx) = self.contexts.get_mut(context) else {
            log::warn!("texture {key}: context {context} is gone; result dropped");
            return;
        };

        let created = result.and_then(|image| {
            ctx.insert_loaded(&image)
                .map(|texture| TextureInfo {
                    texture,
                    width: image.width,
                    height: image.height,
                })
                .map_err(|e| LoadError::new(LoadErrorKind::TextureCreation, e))
        });

        match created {
            Ok(info) => {
                let waiters = ctx.cache.resolve(&key, info);
                log::info!(
                    "texture {key}: {}x{} as {} ({} waiting)",
                    info.width,
                    info.height,
                    info.texture,
                    waiters.len()
                );
                self.notifications
                    .extend(waiters.into_iter().map(|request| loaded(request, info)));
            }
            Err(e) => {
                let waiters = ctx.cache.fail(&key);
                log::warn!("texture {key}: {e} ({} waiting)", waiters.len());
                let code = e.code();
                self.notifications
                    .extend(waiters.into_iter().map(|request| Notification::Failed { request, code }));
            }
        }
    }
}

fn loaded(request: RequestId, info: TextureInfo) -> Notification {
    Notification::Loaded {
        request,
        texture: info.texture,
        width: info.width as i32,
        height: info.height as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::host::RecordingSurfaces;
    use crate::texture::{DecodedImage, ManualLoader};

    type TestBridge = Bridge<RecordingSurfaces, ManualLoader>;

    fn bridge() -> (TestBridge, Handle) {
        let surfaces = RecordingSurfaces::new().with_surface("main");
        let mut b = Bridge::with_loader(BridgeConfig::default(), surfaces, ManualLoader::new());
        let ctx = b.create_context("main").unwrap();
        (b, ctx)
    }

    fn image(w: u32, h: u32) -> DecodedImage {
        DecodedImage::from_rgba8(w, h, vec![255; (w * h * 4) as usize]).unwrap()
    }

    fn url(s: &str) -> TextureSource {
        TextureSource::Url(s.into())
    }

    // ── coalescing ──

    #[test]
    fn concurrent_requests_share_one_load() {
        let (mut b, ctx) = bridge();
        // Bring the handle counter to 5.
        for _ in 0..4 {
            b.create_texture_checker(ctx, 8).unwrap();
        }

        b.request_load(ctx, &url("a.png"), 10).unwrap();
        b.request_load(ctx, &url("a.png"), 11).unwrap();
        assert_eq!(b.loader().started(), 1);

        b.loader_mut().complete(&url("a.png").key(), image(64, 64));
        let mut seen = Vec::new();
        assert_eq!(b.pump(&mut seen), 2);
        assert_eq!(seen, vec![
            Notification::Loaded { request: 10, texture: 5, width: 64, height: 64 },
            Notification::Loaded { request: 11, texture: 5, width: 64, height: 64 },
        ]);

        seen.clear();
        assert_eq!(b.pump(&mut seen), 0);
        assert!(seen.is_empty());
    }

    #[test]
    fn equivalent_urls_coalesce() {
        let (mut b, ctx) = bridge();
        b.request_load(ctx, &url("img\\a b.png"), 1).unwrap();
        b.request_load(ctx, &url("img/a%20b.png"), 2).unwrap();
        assert_eq!(b.loader().started(), 1);
    }

    // ── delivery ──

    #[test]
    fn ready_hit_is_delivered_on_next_pump() {
        let (mut b, ctx) = bridge();
        b.request_load(ctx, &url("a.png"), 1).unwrap();
        b.loader_mut().complete(&url("a.png").key(), image(4, 2));
        b.pump(&mut ());

        b.request_load(ctx, &url("a.png"), 2).unwrap();
        assert_eq!(b.queued_notifications(), 1);
        assert_eq!(b.loader().started(), 1);

        let mut seen = Vec::new();
        b.pump(&mut seen);
        assert_eq!(seen, vec![Notification::Loaded { request: 2, texture: 1, width: 4, height: 2 }]);
    }

    #[test]
    fn nothing_is_delivered_before_pump() {
        let (mut b, ctx) = bridge();
        b.request_load(ctx, &url("a.png"), 1).unwrap();
        b.loader_mut().complete(&url("a.png").key(), image(1, 1));
        assert_eq!(b.queued_notifications(), 0);
    }

    #[test]
    fn failure_notifies_each_waiter_and_clears_key() {
        let (mut b, ctx) = bridge();
        b.request_load(ctx, &url("missing.png"), 1).unwrap();
        b.request_load(ctx, &url("missing.png"), 2).unwrap();
        b.loader_mut().fail(&url("missing.png").key(), LoadErrorKind::Io);

        let mut seen = Vec::new();
        b.pump(&mut seen);
        assert_eq!(seen, vec![
            Notification::Failed { request: 1, code: -1 },
            Notification::Failed { request: 2, code: -1 },
        ]);

        let cache = b.context(ctx).unwrap().texture_cache();
        assert!(cache.entry(&url("missing.png").key()).is_none());

        b.request_load(ctx, &url("missing.png"), 3).unwrap();
        assert_eq!(b.loader().started(), 2);
    }

    #[test]
    fn host_refusal_fails_with_texture_creation_code() {
        let (mut b, ctx) = bridge();
        b.request_load(ctx, &url("a.png"), 7).unwrap();
        b.context(ctx).unwrap().api().refuse_creation(true);
        b.loader_mut().complete(&url("a.png").key(), image(2, 2));

        let mut seen = Vec::new();
        b.pump(&mut seen);
        assert_eq!(seen, vec![Notification::Failed { request: 7, code: -5 }]);
    }

    // ── sync ──

    #[test]
    fn sync_returns_zero_until_loaded() {
        let (mut b, ctx) = bridge();
        let src = TextureSource::Base64 { mime: String::new(), data: "AAAA".into() };

        assert_eq!(b.request_load_sync(ctx, &src).unwrap(), NULL_HANDLE);
        assert_eq!(b.request_load_sync(ctx, &src).unwrap(), NULL_HANDLE);
        assert_eq!(b.loader().started(), 1);

        b.loader_mut().complete(&src.key(), image(3, 3));
        let mut seen = Vec::new();
        b.pump(&mut seen);
        assert!(seen.is_empty());

        let tex = b.request_load_sync(ctx, &src).unwrap();
        assert_eq!(tex, 1);
        assert_eq!(b.get_texture_dimensions(ctx, tex).unwrap(), (3 << 16) | 3);
    }

    #[test]
    fn unknown_context_is_rejected() {
        let (mut b, _) = bridge();
        assert!(matches!(
            b.request_load(9, &url("a.png"), 1),
            Err(BridgeError::InvalidHandle { .. })
        ));
        assert!(b.get_texture_dimensions(9, 1).is_err());
        assert_eq!(b.loader().started(), 0);
    }
}
