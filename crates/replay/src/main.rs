mod utils;
use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use doorcount::{ObservationBatch, OccupancyMonitor, OccupancySnapshot};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utils::*;

static EVENT_CAPACITY: usize = 1024;

/// Replay recorded doorway observations through the occupancy counter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The JSON settings file describing the doors
    #[arg(short, long)]
    settings: PathBuf,

    /// Process only every N-th recorded frame
    #[arg(long, default_value_t = 1)]
    stride: u64,

    /// Replay speed in frames per second (0 replays as fast as possible)
    #[arg(short, long, default_value_t = 0.0)]
    fps: f32,

    /// Interval between occupancy reports in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    report_ms: u64,

    /// Write the final occupancy snapshot to this file as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = settings::Settings::from_path(&args.settings)
        .with_context(|| format!("reading settings {}", args.settings.to_string_lossy()))?;

    let recordings = settings
        .doors
        .par_iter()
        .map(|door| -> Result<(String, Vec<ObservationBatch>)> {
            let batches = observation_file::read_path(&door.observations, args.stride)
                .with_context(|| format!("reading observations {}", door.observations.to_string_lossy()))?;
            Ok((door.name.clone(), batches))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .collect::<IndexMap<_, _>>();

    let mut monitor = OccupancyMonitor::new(
        settings
            .doors
            .iter()
            .map(|door| (door.name.clone(), door.config.clone())),
        EVENT_CAPACITY,
    )?;

    for (name, batches) in recordings {
        info!(door = %name, frames = batches.len(), "replaying");
        monitor.spawn(&name, observation_file::ReplaySource::new(batches, args.fps))?;
    }

    let report_interval = Duration::from_millis(args.report_ms.max(1));
    let mut next_report = Instant::now() + report_interval;

    while monitor.is_running() {
        match monitor
            .events()
            .recv_timeout(next_report.saturating_duration_since(Instant::now()))
        {
            Ok(event) => info!(
                door = %event.door,
                track_id = event.track_id,
                frame = event.frame_index,
                "{} counted",
                event.direction
            ),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if Instant::now() >= next_report {
            report(&monitor.snapshot());
            next_report += report_interval;
        }
    }

    let stats = monitor.shutdown();
    monitor.events().try_iter().for_each(|event| {
        info!(
            door = %event.door,
            track_id = event.track_id,
            frame = event.frame_index,
            "{} counted",
            event.direction
        )
    });

    for worker in &stats {
        if worker.source_errors > 0 || worker.dropped_events > 0 {
            warn!(
                door = %worker.door,
                source_errors = worker.source_errors,
                dropped_events = worker.dropped_events,
                "replay was incomplete"
            );
        }
    }

    let snapshot = monitor.snapshot();
    for (name, totals) in &snapshot.doors {
        info!(
            door = %name,
            entries = totals.entries,
            exits = totals.exits,
            net = totals.net(),
            tracks_destroyed = totals.tracks_destroyed,
            frames = totals.frames_processed,
            "final door statistics"
        );
    }
    report(&snapshot);

    if let Some(output) = &args.output {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(output)?;
        file.write_all(serde_json::to_string_pretty(&snapshot)?.as_bytes())?;
        info!(path = %output.to_string_lossy(), "snapshot written");
    }

    Ok(())
}

fn report(snapshot: &OccupancySnapshot) {
    info!(
        occupancy = snapshot.occupancy,
        entries = snapshot.total_entries,
        exits = snapshot.total_exits,
        "occupancy"
    );
}
