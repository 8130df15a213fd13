use anyhow::{bail, Result};
use doorcount::{Observation, ObservationBatch, ObservationSource, Point};
use itertools::Itertools;
use serde::Deserialize;
use std::{
    fs::File,
    io::Read,
    path::Path,
    thread,
    time::{Duration, Instant},
};

/// A single CSV row: `frame,x,y[,valid]`.
#[derive(Debug, Deserialize)]
struct Row {
    frame: u64,
    x: f32,
    y: f32,
    #[serde(default = "default_valid")]
    valid: bool,
}

/// Largest run of missing frame numbers filled with empty batches. About an hour of video at 30 fps.
pub const MAX_FRAME_GAP: u64 = 108_000;

fn default_valid() -> bool {
    true
}

pub fn read_path<P: AsRef<Path>>(path: P, stride: u64) -> Result<Vec<ObservationBatch>> {
    read_batches(File::open(path)?, stride)
}

/// Read recorded observations and group them into one batch per frame.
///
/// Frames between the first and the last recorded frame that have no rows become empty batches. With a `stride`
/// above 1 only every `stride`-th frame (counted from the first) is kept. More than [`MAX_FRAME_GAP`] missing frames
/// between two recorded frames is rejected as a corrupt recording.
pub fn read_batches<R: Read>(reader: R, stride: u64) -> Result<Vec<ObservationBatch>> {
    if stride == 0 {
        bail!("stride must be at least 1");
    }

    let mut rows = csv::Reader::from_reader(reader)
        .deserialize::<Row>()
        .collect::<Result<Vec<_>, _>>()?;
    rows.sort_by_key(|row| row.frame);

    if let Some((before, after)) = rows
        .iter()
        .map(|row| row.frame)
        .dedup()
        .tuple_windows()
        .find(|(before, after)| after - before - 1 > MAX_FRAME_GAP)
    {
        bail!("frame {after} follows frame {before}, leaving more than {MAX_FRAME_GAP} missing frames");
    }

    let (first, last) = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => (first.frame, last.frame),
        _ => return Ok(vec![]),
    };

    let groups = rows.into_iter().group_by(|row| row.frame);
    let mut grouped = groups
        .into_iter()
        .map(|(frame, rows)| {
            let observations = rows
                .map(|row| Observation::new(None, Point::new(row.x, row.y), frame, row.valid))
                .collect::<Vec<_>>();
            (frame, observations)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .peekable();

    let batches = (first..=last)
        .filter_map(|frame| {
            let observations = grouped
                .next_if(|(next, _)| *next == frame)
                .map(|(_, observations)| observations)
                .unwrap_or_default();
            ((frame - first) % stride == 0).then(|| ObservationBatch::new(frame, observations))
        })
        .collect();

    Ok(batches)
}

/// Replays batches, optionally paced like a live camera.
pub struct ReplaySource {
    batches: std::vec::IntoIter<ObservationBatch>,
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl ReplaySource {
    /// `fps` of 0 replays as fast as the worker can take frames.
    pub fn new(batches: Vec<ObservationBatch>, fps: f32) -> ReplaySource {
        let interval = (fps > 0.0).then(|| Duration::from_secs_f32(1.0 / fps));
        ReplaySource {
            batches: batches.into_iter(),
            interval,
            next_due: None,
        }
    }
}

impl ObservationSource for ReplaySource {
    fn next_batch(&mut self) -> Option<Result<ObservationBatch>> {
        let batch = self.batches.next()?;

        if let Some(interval) = self.interval {
            let now = Instant::now();
            let due = self.next_due.unwrap_or(now);
            if due > now {
                thread::sleep(due - now);
            }
            self.next_due = Some(due.max(now) + interval);
        }

        Some(Ok(batch))
    }
}
