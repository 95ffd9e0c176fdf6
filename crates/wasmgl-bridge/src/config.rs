use std::path::PathBuf;

/// Bridge configuration.
///
/// Keep this structure small. Add knobs only when a host has a concrete need.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Number of timer-query slots per context.
    ///
    /// One slot always stays free so the write cursor never catches the read
    /// cursor, so at most `timer_ring_depth - 1` frames are in flight.
    pub timer_ring_depth: usize,

    /// Weight of a new GPU sample in the exponential moving average.
    pub gpu_smoothing: f32,

    /// Directory that relative texture URLs resolve against.
    pub asset_root: PathBuf,

    /// Name given to texture loader worker threads.
    pub loader_thread_name: String,
}

impl BridgeConfig {
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timer_ring_depth: 6,
            gpu_smoothing: 0.2,
            asset_root: PathBuf::from("."),
            loader_thread_name: "wasmgl-tex-load".to_string(),
        }
    }
}
