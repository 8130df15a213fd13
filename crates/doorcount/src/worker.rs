use crate::*;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Anything that yields per-frame observation batches for one doorway.
///
/// `next_batch` is the only place a worker is expected to block (waiting on a camera, a decoder, a detector).
/// Returning `None` ends the stream.
pub trait ObservationSource: Send {
    fn next_batch(&mut self) -> Option<anyhow::Result<ObservationBatch>>;
}

impl ObservationSource for std::vec::IntoIter<ObservationBatch> {
    fn next_batch(&mut self) -> Option<anyhow::Result<ObservationBatch>> {
        self.next().map(Ok)
    }
}

/// Produces raw frames for one doorway. The frame type is opaque to the counting core.
pub trait FrameSource: Send {
    type Frame;

    /// Returns the next frame and its index, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Option<anyhow::Result<(u64, Self::Frame)>>;
}

/// Turns a frame into person observations.
///
/// Implementations may use motion blobs, pose landmarks or bounding boxes; only the positions matter.
pub trait Detector: Send {
    type Frame;

    fn detect(&mut self, frame: &Self::Frame, frame_index: u64) -> anyhow::Result<Vec<Observation>>;
}

/// Combines a frame source and a detector into an observation source.
pub struct DetectingSource<S, D> {
    source: S,
    detector: D,
}

impl<S, D> DetectingSource<S, D>
where
    S: FrameSource,
    D: Detector<Frame = S::Frame>,
{
    pub fn new(source: S, detector: D) -> DetectingSource<S, D> {
        DetectingSource { source, detector }
    }
}

impl<S, D> ObservationSource for DetectingSource<S, D>
where
    S: FrameSource,
    D: Detector<Frame = S::Frame>,
{
    fn next_batch(&mut self) -> Option<anyhow::Result<ObservationBatch>> {
        let (frame_index, frame) = match self.source.next_frame()? {
            Ok(next) => next,
            Err(err) => return Some(Err(err)),
        };

        Some(
            self.detector
                .detect(&frame, frame_index)
                .map(|observations| ObservationBatch::new(frame_index, observations)),
        )
    }
}

/// What a worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub door: String,
    pub batches: u64,
    pub source_errors: u64,
    pub events: u64,
    pub dropped_events: u64,
}

/// How a worker reacts to a failing source.
///
/// After each consecutive failure the worker sleeps for `error_backoff` times the number of failures so far, capped
/// at `max_backoff`. A source that fails `max_consecutive_errors` times in a row is treated as dead and the worker
/// exits; the door keeps its last totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPolicy {
    pub error_backoff: Duration,
    pub max_backoff: Duration,
    pub max_consecutive_errors: u32,
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        WorkerPolicy {
            error_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
            max_consecutive_errors: 300,
        }
    }
}

impl WorkerPolicy {
    fn backoff(&self, consecutive_errors: u32) -> Duration {
        self.error_backoff
            .saturating_mul(consecutive_errors)
            .min(self.max_backoff)
    }
}

/// A running door worker.
#[derive(Debug)]
pub struct WorkerHandle {
    door: String,
    handle: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    /// Return the door this worker feeds
    pub fn door(&self) -> &str {
        &self.door
    }

    /// Returns true once the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to exit.
    pub fn join(self) -> thread::Result<WorkerStats> {
        self.handle.join()
    }
}

/// Run `source` for `door` on a dedicated thread until the source ends or `stop` is raised.
///
/// Batches are fetched without holding the door lock; the lock is held only while a single batch is processed, so a
/// stopped worker never leaves the counters half updated. Crossing events are forwarded with `try_send` and dropped
/// when the channel is full or closed. Source failures are handled with the default [`WorkerPolicy`].
pub fn spawn_door_worker<S>(
    door: SharedDoor,
    source: S,
    events: Sender<CrossingEvent>,
    stop: Arc<AtomicBool>,
) -> Result<WorkerHandle>
where
    S: ObservationSource + 'static,
{
    spawn_door_worker_with_policy(door, source, events, stop, WorkerPolicy::default())
}

/// Same as [`spawn_door_worker`] with an explicit policy for failing sources.
pub fn spawn_door_worker_with_policy<S>(
    door: SharedDoor,
    mut source: S,
    events: Sender<CrossingEvent>,
    stop: Arc<AtomicBool>,
    policy: WorkerPolicy,
) -> Result<WorkerHandle>
where
    S: ObservationSource + 'static,
{
    let name = door.lock().name().to_string();
    let thread_name = name.clone();

    let handle = thread::Builder::new()
        .name(format!("door-{thread_name}"))
        .spawn(move || {
            let mut stats = WorkerStats {
                door: thread_name,
                ..Default::default()
            };
            let mut consecutive_errors = 0u32;

            while !stop.load(Ordering::Acquire) {
                let batch = match source.next_batch() {
                    Some(Ok(batch)) => batch,
                    Some(Err(err)) => {
                        stats.source_errors += 1;
                        consecutive_errors += 1;
                        if consecutive_errors >= policy.max_consecutive_errors {
                            error!(door = %stats.door, error = %err, consecutive_errors, "observation source is dead, stopping worker");
                            break;
                        }
                        if consecutive_errors == 1 {
                            warn!(door = %stats.door, error = %err, "observation source failed, skipping frame");
                        } else {
                            debug!(door = %stats.door, error = %err, consecutive_errors, "observation source still failing");
                        }
                        thread::sleep(policy.backoff(consecutive_errors));
                        continue;
                    }
                    None => break,
                };
                consecutive_errors = 0;

                let crossings = door.lock().process_frame(batch);
                stats.batches += 1;

                for event in crossings {
                    stats.events += 1;
                    match events.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(event)) => {
                            stats.dropped_events += 1;
                            warn!(door = %event.door, track_id = event.track_id, "event queue full, dropping event");
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            stats.dropped_events += 1;
                        }
                    }
                }
            }

            debug!(door = %stats.door, batches = stats.batches, "worker stopped");
            stats
        })?;

    Ok(WorkerHandle { door: name, handle })
}
