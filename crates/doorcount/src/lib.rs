pub mod assignment;
pub mod nn_matching;

mod aggregator;
mod config;
mod crossing;
mod door_counter;
mod error;
mod monitor;
mod observation;
mod point;
mod track;
mod tracker;
mod worker;

pub use aggregator::{OccupancyAggregator, OccupancySnapshot, SharedDoor};
pub use assignment::{DistanceMetricFn, Match};
pub use config::{DoorConfig, Orientation};
pub use crossing::{CrossingDetector, CrossingEvent, Direction};
pub use door_counter::{DoorCounter, DoorTotals};
pub use error::{Error, Result};
pub use monitor::OccupancyMonitor;
pub use observation::{Observation, ObservationBatch};
pub use point::Point;
pub use track::{Side, Track};
pub use tracker::Tracker;
pub use worker::{
    spawn_door_worker, spawn_door_worker_with_policy, DetectingSource, Detector, FrameSource,
    ObservationSource, WorkerHandle, WorkerPolicy, WorkerStats,
};
