//! Single-slot announcement queue.
//!
//! Policy: drop-oldest-if-busy. While the worker is playing an instruction,
//! at most one further instruction waits in the slot; submitting another
//! replaces the waiting one, which is counted as dropped. The instruction in
//! flight always plays to completion. Instructions that do play, play in the
//! order they were submitted.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{Announcer, SpokenInstruction};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted: u64,
    pub played: u64,
    pub dropped: u64,
    pub failed: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The slot was empty.
    Queued,
    /// The slot held an instruction that had not started; it was discarded.
    Replaced { dropped_sequence: u64 },
}

#[derive(Default)]
struct Slot {
    pending: Option<SpokenInstruction>,
    busy: bool,
    shutdown: bool,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    played: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            submitted: self.submitted.load(Ordering::SeqCst),
            played: self.played.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    work: Condvar,
    idle: Condvar,
    counters: Counters,
}

pub struct AnnouncementQueue {
    shared: Arc<Shared>,
    announcer_name: &'static str,
    worker: Option<JoinHandle<()>>,
}

impl AnnouncementQueue {
    /// Start the worker thread that owns `announcer`.
    pub fn spawn<A: Announcer + 'static>(mut announcer: A) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let announcer_name = announcer.name();
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name(format!("announce-{}", announcer_name))
            .spawn(move || run_worker(&worker_shared, &mut announcer))?;
        log::info!("announcement queue started (backend={})", announcer_name);
        Ok(Self {
            shared,
            announcer_name,
            worker: Some(worker),
        })
    }

    pub fn announcer_name(&self) -> &'static str {
        self.announcer_name
    }

    /// Hand an instruction to the worker. Never blocks on playback.
    pub fn submit(&self, instruction: SpokenInstruction) -> Result<SubmitOutcome> {
        let mut slot = self
            .shared
            .slot
            .lock()
            .map_err(|_| anyhow!("announcement queue lock poisoned"))?;
        if slot.shutdown {
            return Err(anyhow!("announcement queue is shut down"));
        }
        self.shared.counters.submitted.fetch_add(1, Ordering::SeqCst);
        let outcome = match slot.pending.replace(instruction) {
            Some(dropped) => {
                self.shared.counters.dropped.fetch_add(1, Ordering::SeqCst);
                log::warn!(
                    "announcement #{} ({}) dropped: superseded while announcer busy",
                    dropped.sequence,
                    dropped.state
                );
                SubmitOutcome::Replaced {
                    dropped_sequence: dropped.sequence,
                }
            }
            None => SubmitOutcome::Queued,
        };
        self.shared.work.notify_one();
        Ok(outcome)
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.counters.snapshot()
    }

    /// True when nothing is playing and nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.shared
            .slot
            .lock()
            .map(|slot| !slot.busy && slot.pending.is_none())
            .unwrap_or(true)
    }

    /// Block until the queue is idle or `timeout` elapses. Returns true if idle.
    pub fn wait_idle(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut slot = self
            .shared
            .slot
            .lock()
            .map_err(|_| anyhow!("announcement queue lock poisoned"))?;
        while slot.busy || slot.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            let (guard, _) = self
                .shared
                .idle
                .wait_timeout(slot, remaining)
                .map_err(|_| anyhow!("announcement queue lock poisoned"))?;
            slot = guard;
        }
        Ok(true)
    }

    /// Stop the worker. The instruction in flight finishes; a waiting one is
    /// discarded and counted as dropped.
    pub fn shutdown(mut self) -> Result<QueueStats> {
        self.stop()?;
        Ok(self.stats())
    }

    fn stop(&mut self) -> Result<()> {
        {
            let mut slot = self
                .shared
                .slot
                .lock()
                .map_err(|_| anyhow!("announcement queue lock poisoned"))?;
            slot.shutdown = true;
            if slot.pending.take().is_some() {
                self.shared.counters.dropped.fetch_add(1, Ordering::SeqCst);
            }
            self.shared.work.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| anyhow!("announcement worker panicked"))?;
        }
        Ok(())
    }
}

impl Drop for AnnouncementQueue {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("announcement queue shutdown failed: {}", err);
        }
    }
}

fn run_worker(shared: &Shared, announcer: &mut dyn Announcer) {
    loop {
        let instruction = {
            let Ok(mut slot) = shared.slot.lock() else {
                log::error!("announcement queue lock poisoned; worker exiting");
                return;
            };
            loop {
                if slot.shutdown {
                    slot.busy = false;
                    shared.idle.notify_all();
                    return;
                }
                if let Some(next) = slot.pending.take() {
                    slot.busy = true;
                    break next;
                }
                slot = match shared.work.wait(slot) {
                    Ok(guard) => guard,
                    Err(_) => {
                        log::error!("announcement queue lock poisoned; worker exiting");
                        return;
                    }
                };
            }
        };

        match announcer.announce(&instruction) {
            Ok(()) => {
                shared.counters.played.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                shared.counters.failed.fetch_add(1, Ordering::SeqCst);
                log::error!(
                    "announcer {} failed on #{} ({}): {}",
                    announcer.name(),
                    instruction.sequence,
                    instruction.state,
                    err
                );
            }
        }

        match shared.slot.lock() {
            Ok(mut slot) => {
                slot.busy = false;
                shared.idle.notify_all();
            }
            Err(_) => {
                log::error!("announcement queue lock poisoned; worker exiting");
                return;
            }
        }
    }
}
