//! Head-tracked parallax display: tracks the viewer's head with a webcam and renders
//! a wireframe scene from that viewpoint.

use anyhow::{Context, Result};
use clap::Parser;
use head_parallax::{
    app::{App, VideoSource},
    cli::Args,
};
use log::info;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(args.log_filter()));

    info!("Head Tracker 3D");

    let config = args.effective_config();
    config.validate()?;

    if let Some(path) = &args.write_config {
        config
            .to_file(path)
            .with_context(|| format!("Writing configuration to {}", path.display()))?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let source = match &args.video {
        Some(path) => VideoSource::File(path.clone()),
        None => VideoSource::Camera(config.camera.index),
    };

    // Create and run application
    let mut app = App::new(config, source)?;
    app.run()?;

    Ok(())
}
