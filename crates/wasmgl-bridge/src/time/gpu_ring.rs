use crate::host::GraphicsApi;

use super::frame_clock::ema;

/// Result of one [`GpuTimer::poll`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GpuTime {
    /// The context has no timer queries.
    Unsupported,
    /// The host reported a disjoint event; this poll's result is dropped.
    Disjoint,
    /// No sample has been read back yet.
    Warming,
    /// Smoothed GPU frame time in milliseconds.
    Smoothed(f32),
}

impl GpuTime {
    pub fn ms(self) -> Option<f32> {
        match self {
            GpuTime::Smoothed(ms) => Some(ms),
            _ => None,
        }
    }
}

/// Fixed ring of time-elapsed queries.
///
/// `begin`/`end` bracket a frame's GPU work and fill the slot under the write
/// cursor; `poll` reads back at most the oldest slot, and only if its result
/// is already available. The write cursor never catches the read cursor: when
/// the next slot is still unread, the frame goes untimed.
#[derive(Debug)]
pub struct GpuTimer<Q> {
    slots: Vec<Q>,
    write: usize,
    read: usize,
    active: bool,
    smoothing: f32,
    smoothed_ms: f32,
    samples: u64,
}

impl<Q: Copy> GpuTimer<Q> {
    /// Creates a ring of `depth` queries, or a disabled timer when the API has
    /// no timer queries or refuses to create them.
    pub fn new<G>(api: &G, depth: usize, smoothing: f32) -> Self
    where
        G: GraphicsApi<Query = Q>,
    {
        if !api.capabilities().timer_query || depth < 2 {
            return Self::disabled(smoothing);
        }

        let mut slots = Vec::with_capacity(depth);
        for _ in 0..depth {
            match api.create_query() {
                Ok(q) => slots.push(q),
                Err(e) => {
                    log::warn!("gpu timer: cannot create query ({e}); timing disabled");
                    return Self::disabled(smoothing);
                }
            }
        }

        Self {
            slots,
            ..Self::disabled(smoothing)
        }
    }

    fn disabled(smoothing: f32) -> Self {
        Self {
            slots: Vec::new(),
            write: 0,
            read: 0,
            active: false,
            smoothing,
            smoothed_ms: 0.0,
            samples: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// `(read, write)` cursor positions.
    pub fn cursors(&self) -> (usize, usize) {
        (self.read, self.write)
    }

    /// Slots ended but not yet read back.
    pub fn in_flight(&self) -> usize {
        match self.slots.len() {
            0 => 0,
            n => (self.write + n - self.read) % n,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Opens a query for this frame. Returns `false`, and makes the matching
    /// `end` a no-op, when unsupported, already active, or the ring is full.
    pub fn begin<G>(&mut self, api: &G) -> bool
    where
        G: GraphicsApi<Query = Q>,
    {
        if self.slots.is_empty() || self.active {
            return false;
        }
        let next = (self.write + 1) % self.slots.len();
        if next == self.read {
            return false;
        }
        api.begin_time_elapsed(self.slots[self.write]);
        self.active = true;
        true
    }

    /// Closes the query opened by the last successful `begin`.
    pub fn end<G>(&mut self, api: &G)
    where
        G: GraphicsApi<Query = Q>,
    {
        if !self.active {
            return;
        }
        api.end_time_elapsed();
        self.write = (self.write + 1) % self.slots.len();
        self.active = false;
    }

    /// Drains at most one finished query. Never blocks and never allocates.
    pub fn poll<G>(&mut self, api: &G) -> GpuTime
    where
        G: GraphicsApi<Query = Q>,
    {
        if self.slots.is_empty() {
            return GpuTime::Unsupported;
        }
        if api.gpu_disjoint() {
            return GpuTime::Disjoint;
        }

        if self.read != self.write {
            let q = self.slots[self.read];
            if api.query_result_available(q) {
                let ms = api.query_result_ns(q) as f64 / 1.0e6;
                self.smoothed_ms = ema(self.smoothed_ms, ms as f32, self.smoothing);
                self.samples += 1;
                self.read = (self.read + 1) % self.slots.len();
            }
        }

        self.current()
    }

    /// Latest estimate without touching the API.
    pub fn current(&self) -> GpuTime {
        if self.slots.is_empty() {
            GpuTime::Unsupported
        } else if self.samples == 0 {
            GpuTime::Warming
        } else {
            GpuTime::Smoothed(self.smoothed_ms)
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}
