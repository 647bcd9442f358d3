// src/bin/adc_poller.rs
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use anyhow::{Context, Result};
use biome_sensor::config::PollerConfig;
use biome_sensor::drivers::HttpSink;
use biome_sensor::engine::{open_reader, spawn_thread, Poller};
use biome_sensor::recorder::DataRecorder;
use biome_sensor::types::{PollerCommand, PollerMessage};
use log::{error, info, warn};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = PollerConfig::from_env().context("invalid poller configuration")?;
    info!(
        "Starting ADC poller ({} mode, every {:?}) -> {}",
        config.mode, config.interval, config.endpoint
    );
    let reader = open_reader(&config)?;
    let recorder = DataRecorder::open(&config.log_file)
        .with_context(|| format!("cannot open log file {}", config.log_file.display()))?;
    let sink = HttpSink::new(config.endpoint.as_str(), config.http_timeout)?;
    let poller = Poller::new(reader, sink, recorder, &config)?;

    let (tx, rx) = mpsc::channel();
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let handle = spawn_thread(poller, tx, rx_cmd);

    // stdin control; EOF just leaves the poller running
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            let cmd = match line.trim().to_ascii_lowercase().as_str() {
                "stop" | "q" | "quit" => PollerCommand::Stop,
                "pause" | "p" => PollerCommand::Pause,
                "resume" | "r" => PollerCommand::Resume,
                "" => continue,
                other => {
                    warn!("unknown command '{other}' (stop, pause, resume)");
                    continue;
                }
            };
            let stop = cmd == PollerCommand::Stop;
            if tx_cmd.send(cmd).is_err() || stop {
                break;
            }
        }
    });

    for message in rx {
        match message {
            PollerMessage::Window(stats) => info!(
                "window {}: correlation {:.4}",
                stats.samples, stats.correlation
            ),
            PollerMessage::Paused(true) => info!("⏸ paused"),
            PollerMessage::Paused(false) => info!("▶ resumed"),
            PollerMessage::Error(e) => error!("Error reading ADC: {e}"),
            PollerMessage::Stopped { ticks } => {
                info!("Stopped by user after {ticks} ticks");
                break;
            }
            PollerMessage::Reading(_) => {}
        }
    }
    if handle.join().is_err() {
        error!("poller thread panicked");
    }
    Ok(())
}
