//! Headless subdivision runs
//!
//! Generates the fractal on a worker thread for a range of depths and prints
//! vertex and face counts, timing and bounds. With `--json` the buffers of
//! the last depth are written to stdout instead.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use tetrafractal_core::{expected_face_count, expected_vertex_count, Depth, Drawable, MAX_DEPTH};
use tetrafractal_worker::{spawn_subdivision, SubdivisionDispatcher, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "subdivision_stats", about = "Report subdivision sizes and timings")]
struct Args {
    /// Smallest depth to run
    #[arg(long, default_value_t = 0)]
    from: u32,

    /// Largest depth to run
    #[arg(long, default_value_t = 6)]
    to: u32,

    /// Print the buffers of the last depth as JSON
    #[arg(long)]
    json: bool,

    /// Also dispatch every depth back to back and report which run survives
    #[arg(long)]
    race: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.from > args.to {
        bail!("--from {} is greater than --to {}", args.from, args.to);
    }
    if args.to > MAX_DEPTH {
        bail!("--to {} exceeds the maximum depth {}", args.to, MAX_DEPTH);
    }

    let config = WorkerConfig::default();
    let mut last = None;

    if !args.json {
        println!(
            "{:>5} {:>10} {:>10} {:>12} {:>10}",
            "depth", "vertices", "faces", "time", "radius"
        );
    }

    for d in args.from..=args.to {
        let started = Instant::now();
        let handle = spawn_subdivision(d, &config)?;
        let buffers = pollster::block_on(handle.result())
            .with_context(|| format!("subdivision at depth {} failed", d))?;
        let elapsed = started.elapsed();

        let depth = Depth::new(d)?;
        if buffers.vertex_count != expected_vertex_count(depth)
            || buffers.face_count() != expected_face_count(depth)
        {
            bail!("depth {} produced unexpected sizes", d);
        }

        if !args.json {
            println!(
                "{:>5} {:>10} {:>10} {:>12.2?} {:>10.4}",
                d,
                buffers.vertex_count,
                buffers.face_count(),
                elapsed,
                buffers.bounding_radius()
            );
        }
        last = Some(buffers);
    }

    if args.race {
        race(args.from, args.to, &config)?;
    }

    if args.json {
        let buffers = last.context("no depth was run")?;
        println!("{}", serde_json::to_string(&buffers)?);
    }
    Ok(())
}

/// Dispatch every depth deepest first and show that only the last one lands
fn race(from: u32, to: u32, config: &WorkerConfig) -> Result<()> {
    let mut dispatcher = SubdivisionDispatcher::new(config.clone());
    for d in (from..=to).rev() {
        let generation = dispatcher.dispatch(d)?;
        info!("Dispatched run {} at depth {}", generation, d);
    }

    let completion = dispatcher
        .wait_timeout(Duration::from_secs(120))
        .context("latest run did not finish in time")?;
    let buffers = completion.outcome?;
    println!(
        "race: run {} at depth {} delivered {} faces after {:.2?}",
        completion.generation,
        completion.depth,
        buffers.face_count(),
        completion.elapsed
    );
    Ok(())
}
