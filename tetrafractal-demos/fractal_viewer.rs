//! Interactive Sierpinski tetrahedron viewer
//!
//! Controls:
//! - Left mouse drag: orbit
//! - Right mouse drag: pan
//! - Scroll wheel: zoom
//! - 0-6, [ and ]: choose depth; g or Enter: generate
//! - h: list all key bindings
//! - Escape: quit

use anyhow::Result;
use clap::Parser;
use log::info;
use tetrafractal_visualization::{
    ControlParams, InteractiveViewer, RenderConfig, ViewerConfig, PANEL_MAX_DEPTH,
};
use tetrafractal_worker::WorkerConfig;

#[derive(Parser, Debug)]
#[command(name = "fractal_viewer", about = "Explore a recursive tetrahedral fractal")]
struct Args {
    /// Subdivision depth generated at startup
    #[arg(
        short,
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(0..=PANEL_MAX_DEPTH as i64)
    )]
    depth: u32,

    /// Directional light intensity
    #[arg(long, default_value_t = 1.5)]
    light: f32,

    /// Start with the pulsating scale enabled
    #[arg(long)]
    pulsate: bool,

    /// Window width in pixels
    #[arg(long, default_value_t = 1200)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 800)]
    height: u32,

    /// Disable 4x multisampling
    #[arg(long)]
    no_msaa: bool,

    /// Worker thread stack size in MiB
    #[arg(long)]
    stack_mib: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = ControlParams {
        depth: args.depth,
        light_intensity: args.light,
        pulsate: args.pulsate,
        ..ControlParams::default()
    };

    let mut worker = WorkerConfig::default();
    if let Some(mib) = args.stack_mib {
        worker = worker.with_stack_size(mib * 1024 * 1024);
    }

    let config = ViewerConfig::default()
        .with_size(args.width, args.height)
        .with_params(params)
        .with_render_config(RenderConfig::default().with_multisampling(!args.no_msaa))
        .with_worker_config(worker);

    info!("Press h for key bindings");
    InteractiveViewer::new(config).run()?;
    Ok(())
}
