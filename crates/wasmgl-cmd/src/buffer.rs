use crate::command::Command;
use crate::record::RawRecord;

/// Per-frame statistics gathered while recording.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameCounters {
    pub draw_calls: u32,
    pub vertices: u32,
    pub instances: u32,
    /// Records rejected because the buffer was full.
    pub dropped: u32,
}

/// Guest-side command recorder.
///
/// Performance characteristics:
/// - `push()` is O(1) and never reallocates past the initial capacity
/// - `reset()` keeps the allocation for the next frame
///
/// The buffer has a fixed record capacity. Pushes beyond it are dropped and
/// counted in [`FrameCounters::dropped`] instead of growing, so a runaway
/// frame cannot balloon guest memory.
#[derive(Debug)]
pub struct CommandBuffer {
    records: Vec<RawRecord>,
    capacity: usize,
    counters: FrameCounters,
}

impl CommandBuffer {
    pub const DEFAULT_CAPACITY: usize = 1024;

    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            counters: FrameCounters::default(),
        }
    }

    /// Clears recorded commands and counters. Keeps allocated capacity.
    #[inline]
    pub fn reset(&mut self) {
        self.records.clear();
        self.counters = FrameCounters::default();
    }

    /// Records a typed command. Returns `false` if the buffer is full.
    pub fn push(&mut self, cmd: Command) -> bool {
        if self.records.len() >= self.capacity {
            self.counters.dropped = self.counters.dropped.saturating_add(1);
            return false;
        }

        match cmd {
            Command::DrawArrays { count, .. } => {
                self.counters.draw_calls += 1;
                self.counters.vertices = self.counters.vertices.wrapping_add(count.max(0) as u32);
            }
            Command::DrawArraysInstanced { count, instances, .. } => {
                let count = count.max(0) as u32;
                let instances = instances.max(0) as u32;
                self.counters.draw_calls += 1;
                self.counters.vertices = self
                    .counters
                    .vertices
                    .wrapping_add(count.wrapping_mul(instances));
                self.counters.instances = self.counters.instances.wrapping_add(instances);
            }
            _ => {}
        }

        self.records.push(cmd.encode());
        true
    }

    /// Records a raw record as-is (e.g. an opcode from a newer protocol).
    pub fn push_raw(&mut self, raw: RawRecord) -> bool {
        match Command::decode(&raw) {
            Ok(cmd) => self.push(cmd),
            Err(_) if self.records.len() < self.capacity => {
                self.records.push(raw);
                true
            }
            Err(_) => {
                self.counters.dropped = self.counters.dropped.saturating_add(1);
                false
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Byte view handed to the host (`ptr`, `len() as record_count`).
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    #[inline]
    pub fn counters(&self) -> FrameCounters {
        self.counters
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}
