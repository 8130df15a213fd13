use crate::*;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Watches several doorways at once, one worker thread per door.
///
/// # Examples
///
/// ```
/// use doorcount::{DoorConfig, Observation, ObservationBatch, OccupancyMonitor, Orientation};
///
/// let mut monitor = OccupancyMonitor::new(
///     [("Door 1", DoorConfig::new(240.0, Orientation::Horizontal))],
///     64,
/// )
/// .unwrap();
///
/// let batches = [200.0, 250.0]
///     .into_iter()
///     .enumerate()
///     .map(|(frame, y)| ObservationBatch::new(frame as u64, vec![Observation::at(320.0, y, frame as u64)]))
///     .collect::<Vec<_>>();
/// monitor.spawn("Door 1", batches.into_iter()).unwrap();
///
/// monitor.join();
/// println!("{:?}", monitor.snapshot());
/// ```
pub struct OccupancyMonitor {
    aggregator: OccupancyAggregator,
    stop: Arc<AtomicBool>,
    sender: Sender<CrossingEvent>,
    receiver: Receiver<CrossingEvent>,
    workers: Vec<WorkerHandle>,
}

impl OccupancyMonitor {
    /// Returns a new OccupancyMonitor
    ///
    /// # Parameters
    ///
    /// * `doors`: Door names and their configuration. Every configuration is validated before anything runs.
    /// * `event_capacity`: Number of crossing events buffered for the presentation side before new ones are dropped.
    pub fn new<I, N>(doors: I, event_capacity: usize) -> Result<OccupancyMonitor>
    where
        I: IntoIterator<Item = (N, DoorConfig)>,
        N: Into<String>,
    {
        let mut aggregator = OccupancyAggregator::new();
        for (name, config) in doors {
            aggregator.register(DoorCounter::new(name, config)?)?;
        }
        let (sender, receiver) = bounded(event_capacity.max(1));

        Ok(OccupancyMonitor {
            aggregator,
            stop: Arc::new(AtomicBool::new(false)),
            sender,
            receiver,
            workers: vec![],
        })
    }

    /// Return the aggregator over all doors
    pub fn aggregator(&self) -> &OccupancyAggregator {
        &self.aggregator
    }

    /// Return the handle of door `name`
    pub fn door(&self, name: &str) -> Result<SharedDoor> {
        self.aggregator.door(name)
    }

    /// Return the receiving end of the crossing event queue
    pub fn events(&self) -> &Receiver<CrossingEvent> {
        &self.receiver
    }

    /// Read the current totals of every door
    pub fn snapshot(&self) -> OccupancySnapshot {
        self.aggregator.snapshot()
    }

    /// Reset the counters of every door
    pub fn reset_all(&self) {
        self.aggregator.reset_all();
        info!("all counters reset");
    }

    /// Start a worker feeding door `name` from `source`.
    pub fn spawn<S>(&mut self, name: &str, source: S) -> Result<()>
    where
        S: ObservationSource + 'static,
    {
        let door = self.aggregator.door(name)?;
        let worker = spawn_door_worker(door, source, self.sender.clone(), Arc::clone(&self.stop))?;
        info!(door = name, "worker started");
        self.workers.push(worker);
        Ok(())
    }

    /// Returns true while at least one worker is still running
    pub fn is_running(&self) -> bool {
        self.workers.iter().any(|worker| !worker.is_finished())
    }

    /// Wait for every worker to run out of input.
    pub fn join(&mut self) -> Vec<WorkerStats> {
        std::mem::take(&mut self.workers)
            .into_iter()
            .filter_map(|worker| {
                let door = worker.door().to_string();
                match worker.join() {
                    Ok(stats) => Some(stats),
                    Err(_) => {
                        warn!(door = %door, "worker panicked");
                        None
                    }
                }
            })
            .collect()
    }

    /// Ask every worker to stop after its current frame and wait for them.
    pub fn shutdown(&mut self) -> Vec<WorkerStats> {
        self.stop.store(true, Ordering::Release);
        let stats = self.join();
        info!(workers = stats.len(), "monitor stopped");
        stats
    }
}
