use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use anyhow::anyhow;

use crate::config::BridgeConfig;
use crate::handles::Handle;

use super::decode::{self, DecodedImage, LoadError, LoadErrorKind};
use super::key::{CacheKey, Fetch};

/// Caller-chosen id echoed back in load notifications.
pub type RequestId = i32;

/// One background load: read and decode `fetch` for `key` in `context`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    pub context: Handle,
    pub key: CacheKey,
    pub fetch: Fetch,
}

/// A finished load, waiting to be turned into a host texture.
#[derive(Debug)]
pub struct LoadOutcome {
    pub context: Handle,
    pub key: CacheKey,
    pub result: Result<DecodedImage, LoadError>,
}

/// Runs texture loads off the frame path.
///
/// `start` must not block. `drain` moves every outcome finished so far into
/// `out` and must not block either.
pub trait ImageLoader {
    fn start(&mut self, job: LoadJob);
    fn drain(&mut self, out: &mut Vec<LoadOutcome>);
}

/// Loads each job on its own named worker thread.
///
/// Workers only read and decode; results come back over a channel and are
/// applied on the bridge thread.
#[derive(Debug)]
pub struct ThreadedLoader {
    root: PathBuf,
    thread_name: String,
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    in_flight: usize,
}

impl ThreadedLoader {
    pub fn new(root: impl Into<PathBuf>, thread_name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            root: root.into(),
            thread_name: thread_name.into(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.asset_root.clone(), config.loader_thread_name.clone())
    }

    /// Jobs started but not yet drained.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl ImageLoader for ThreadedLoader {
    fn start(&mut self, job: LoadJob) {
        let tx = self.tx.clone();
        let root = self.root.clone();
        let LoadJob { context, key, fetch } = job;
        let worker_key = key.clone();

        let spawned = std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let result = decode::load(&fetch, &root);
                // The bridge may be gone; nothing left to notify.
                let _ = tx.send(LoadOutcome {
                    context,
                    key: worker_key,
                    result,
                });
            });

        if let Err(e) = spawned {
            log::warn!("texture loader: cannot spawn worker for {key}: {e}");
            let _ = self.tx.send(LoadOutcome {
                context,
                key,
                result: Err(LoadError::new(LoadErrorKind::Io, anyhow!(e))),
            });
        }
        self.in_flight += 1;
    }

    fn drain(&mut self, out: &mut Vec<LoadOutcome>) {
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    out.push(outcome);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }
}

/// Loader that only records jobs. The host completes them explicitly with
/// [`complete`](Self::complete) or [`fail`](Self::fail).
#[derive(Debug, Default)]
pub struct ManualLoader {
    jobs: VecDeque<LoadJob>,
    done: Vec<LoadOutcome>,
    started: usize,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs started and not yet completed, oldest first.
    pub fn jobs(&self) -> impl Iterator<Item = &LoadJob> {
        self.jobs.iter()
    }

    /// Total jobs ever started.
    pub fn started(&self) -> usize {
        self.started
    }

    /// Completes every pending job for `key` with `image`. Returns how many
    /// jobs were completed.
    pub fn complete(&mut self, key: &CacheKey, image: DecodedImage) -> usize {
        self.finish(key, |_| Ok(image.clone()))
    }

    /// Fails every pending job for `key` with an error of `kind`.
    pub fn fail(&mut self, key: &CacheKey, kind: LoadErrorKind) -> usize {
        self.finish(key, |job| Err(LoadError::new(kind, anyhow!("load of {} failed", job.key))))
    }

    /// Runs every pending job now, on this thread.
    pub fn run_all(&mut self, root: &std::path::Path) -> usize {
        let n = self.jobs.len();
        while let Some(job) = self.jobs.pop_front() {
            let result = decode::load(&job.fetch, root);
            self.done.push(LoadOutcome {
                context: job.context,
                key: job.key,
                result,
            });
        }
        n
    }

    fn finish(
        &mut self,
        key: &CacheKey,
        mut result: impl FnMut(&LoadJob) -> Result<DecodedImage, LoadError>,
    ) -> usize {
        let mut n = 0;
        let mut keep = VecDeque::with_capacity(self.jobs.len());
        while let Some(job) = self.jobs.pop_front() {
            if &job.key == key {
                let result = result(&job);
                self.done.push(LoadOutcome {
                    context: job.context,
                    key: job.key,
                    result,
                });
                n += 1;
            } else {
                keep.push_back(job);
            }
        }
        self.jobs = keep;
        n
    }
}

impl ImageLoader for ManualLoader {
    fn start(&mut self, job: LoadJob) {
        self.started += 1;
        self.jobs.push_back(job);
    }

    fn drain(&mut self, out: &mut Vec<LoadOutcome>) {
        out.append(&mut self.done);
    }
}
