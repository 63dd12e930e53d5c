mod runtime;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use trigon_engine::device::{GpuInit, OffscreenSurface, RecordingSurface};
use trigon_engine::logging::{LoggingConfig, init_logging};
use trigon_engine::{FIXED_SIZE, try_render};

use runtime::{Runtime, StudioConfig};

/// Draws the trigon triangle in a window, into a PNG, or as a call trace.
#[derive(Debug, Parser)]
#[command(name = "trigon-studio", version)]
struct Cli {
    /// Render one pass offscreen and write it to this PNG file.
    #[arg(long, value_name = "PATH")]
    headless: Option<PathBuf>,

    /// Run one pass against the recording backend and log every GPU call.
    #[arg(long, conflicts_with = "headless")]
    dry_run: bool,

    /// Log filter in env_logger syntax.
    #[arg(long, value_name = "FILTER", env = "RUST_LOG")]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    if cli.dry_run {
        return dry_run();
    }
    if let Some(path) = &cli.headless {
        return headless(path);
    }

    Runtime::run(StudioConfig::default())
}

fn dry_run() -> Result<()> {
    let mut surface = RecordingSurface::new(FIXED_SIZE);
    try_render(&mut surface).context("recorded pass failed")?;

    for (i, call) in surface.passes().iter().flatten().enumerate() {
        log::info!("{i:>3}  {call:?}");
    }
    Ok(())
}

fn headless(path: &Path) -> Result<()> {
    let mut surface = OffscreenSurface::new(&GpuInit::default(), FIXED_SIZE)?;
    try_render(&mut surface).context("offscreen pass failed")?;

    let pixels = surface.read_pixels()?;
    let image = image::RgbaImage::from_raw(FIXED_SIZE.width, FIXED_SIZE.height, pixels)
        .context("readback size does not match the surface")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    log::info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_window() {
        let cli = Cli::try_parse_from(["trigon-studio"]).unwrap();
        assert!(cli.headless.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn headless_and_dry_run_conflict() {
        assert!(Cli::try_parse_from(["trigon-studio", "--dry-run", "--headless", "out.png"]).is_err());
    }

    #[test]
    fn dry_run_succeeds_without_gpu() {
        dry_run().unwrap();
    }
}
