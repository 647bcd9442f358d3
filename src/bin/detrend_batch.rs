// src/bin/detrend_batch.rs
use anyhow::{Context, Result};
use biome_sensor::config::BatchConfig;
use biome_sensor::drivers::{BatchPipeline, HttpSink, SensorError};
use log::{error, info};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = BatchConfig::from_env_and_args(&args)
        .context("usage: detrend_batch <input.csv> [output.csv] [plot_dir]")?;
    let sink = if config.send {
        Some(HttpSink::new(config.endpoint.as_str(), config.http_timeout)?)
    } else {
        info!("BIOME_SEND is off, rows will not be forwarded");
        None
    };
    let mut pipeline = BatchPipeline::new(sink);
    let report = match pipeline.run(&config) {
        Ok(report) => report,
        Err(SensorError::NoValidRows) => {
            error!("No valid data after preprocessing");
            return Ok(());
        }
        Err(SensorError::DataTooShort { len }) => {
            error!("Not enough data to detrend: {len} rows, need at least 2");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to process {}", config.input.display()))
        }
    };
    info!(
        "Done: kept {}/{} rows, correlation {:.4}, wrote {}",
        report.rows_kept,
        report.rows_read,
        report.drift.correlation,
        report.output.display()
    );
    for plot in &report.plots {
        info!("plot: {}", plot.display());
    }
    if let Some([a, b]) = report.dominant_hz {
        info!("dominant frequency: A0-A1 {a:?} Hz, A2-A3 {b:?} Hz");
    }
    if config.send {
        info!("Forwarded {} rows, {} failed", report.rows_sent, report.rows_failed);
    }
    Ok(())
}
