// src/engine.rs
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info, warn};
use crate::config::PollerConfig;
use crate::drivers::ads1115::{Ads1115, SimulatedBus, SimulatedSignal};
use crate::drivers::{
    DifferentialReader, ReadingWindow, SamplePayload, SampleSink, SensorError, WindowStats,
};
use crate::recorder::DataRecorder;
use crate::types::*;

/// Opens the configured ADC. Hardware mode needs a Linux I2C character device.
pub fn open_reader(config: &PollerConfig) -> Result<Box<dyn DifferentialReader + Send>> {
    match config.mode {
        ConnectionMode::Simulation => {
            info!("🧪 Simulated ADS1115, gain {}", config.gain);
            let seed = Utc::now().timestamp_millis() as u64;
            let bus = SimulatedBus::new(SimulatedSignal::default(), seed);
            Ok(Box::new(Ads1115::new(bus, config.gain)))
        }
        ConnectionMode::Hardware => open_hardware(config),
    }
}

#[cfg(target_os = "linux")]
fn open_hardware(config: &PollerConfig) -> Result<Box<dyn DifferentialReader + Send>> {
    use crate::drivers::ads1115::LinuxI2cBus;
    use anyhow::Context;
    let bus = LinuxI2cBus::open(&config.i2c_bus, config.address).with_context(|| {
        format!(
            "failed to open ADS1115 on {} at {:#04x}",
            config.i2c_bus, config.address
        )
    })?;
    let mut adc = Ads1115::new(bus, config.gain);
    // One throwaway conversion proves the chip answers before we start logging.
    adc.read_pair()
        .context("ADS1115 did not answer a test conversion (check wiring and address)")?;
    info!("✅ ADS1115 initialized, gain set to {}", adc.gain());
    Ok(Box::new(adc))
}

#[cfg(not(target_os = "linux"))]
fn open_hardware(config: &PollerConfig) -> Result<Box<dyn DifferentialReader + Send>> {
    anyhow::bail!(
        "hardware mode needs Linux i2c-dev ({}); set BIOME_ADC_MODE=simulation",
        config.i2c_bus
    )
}

/// Reads the ADC once per interval, logs each reading locally, forwards it
/// and keeps a rolling drift/correlation estimate.
pub struct Poller<R: DifferentialReader, S: SampleSink> {
    reader: R,
    sink: S,
    recorder: DataRecorder,
    window: ReadingWindow,
    interval: Duration,
    max_ticks: Option<u64>,
}

impl<R: DifferentialReader, S: SampleSink> Poller<R, S> {
    pub fn new(
        reader: R,
        sink: S,
        recorder: DataRecorder,
        config: &PollerConfig,
    ) -> Result<Self, SensorError> {
        Ok(Self {
            reader,
            sink,
            recorder,
            window: ReadingWindow::with_capacity(config.window)?,
            interval: config.interval,
            max_ticks: config.max_ticks,
        })
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// One reading: ADC -> log file -> endpoint -> rolling window.
    /// Only an ADC failure is an error; logging and sending are best-effort.
    pub fn tick(&mut self) -> Result<(Reading, Option<WindowStats>), SensorError> {
        let sample = self.reader.read_pair()?;
        let reading = Reading {
            timestamp: Utc::now(),
            raw: sample.raw,
            millivolts: sample.millivolts,
        };
        debug!("Raw: A0-A1={}, A2-A3={}", reading.raw[0], reading.raw[1]);
        info!(
            "Voltage: A0-A1={:.3} mV, A2-A3={:.3} mV",
            reading.millivolts[0], reading.millivolts[1]
        );
        if let Err(e) = self.recorder.write_reading(&reading) {
            error!("failed to append to {}: {e}", self.recorder.path().display());
        }
        let payload = SamplePayload::from_reading(&reading.timestamp, reading.millivolts);
        match self.sink.send(&payload) {
            Ok(()) => debug!(
                "Sent: {}",
                serde_json::to_string(&payload).unwrap_or_else(|_| payload.timestamp.clone())
            ),
            Err(e) => warn!("Failed to send data: {e}"),
        }
        self.window.push(reading.millivolts);
        let stats = self.window.analyze()?;
        if let Some(stats) = &stats {
            debug!(
                "window of {}: drift {:+.5}/{:+.5} mV per tick, correlation {:.4}",
                stats.samples,
                stats.first_slope_mv_per_sample,
                stats.second_slope_mv_per_sample,
                stats.correlation
            );
        }
        Ok((reading, stats))
    }

    /// Loops until `Stop`, a closed command channel, or `max_ticks`.
    /// Returns the number of ticks attempted.
    pub fn run(&mut self, rx_cmd: &Receiver<PollerCommand>, tx: &Sender<PollerMessage>) -> u64 {
        let mut ticks = 0u64;
        let mut paused = false;
        'poll: loop {
            loop {
                match rx_cmd.try_recv() {
                    Ok(cmd) => {
                        if apply_command(cmd, &mut paused, tx) {
                            break 'poll;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'poll,
                }
            }
            if self.limit_reached(ticks) {
                break;
            }
            let started = Instant::now();
            if !paused {
                ticks += 1;
                match self.tick() {
                    Ok((reading, stats)) => {
                        tx.send(PollerMessage::Reading(reading)).ok();
                        if let Some(stats) = stats {
                            tx.send(PollerMessage::Window(stats)).ok();
                        }
                    }
                    Err(e) => {
                        error!("ADC read failed: {e}");
                        tx.send(PollerMessage::Error(e.to_string())).ok();
                    }
                }
            }
            if self.limit_reached(ticks) {
                break;
            }
            // Sleep out the rest of the tick, still listening for commands.
            loop {
                let remaining = self.interval.saturating_sub(started.elapsed());
                match rx_cmd.recv_timeout(remaining) {
                    Ok(cmd) => {
                        if apply_command(cmd, &mut paused, tx) {
                            break 'poll;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => break 'poll,
                }
            }
        }
        tx.send(PollerMessage::Stopped { ticks }).ok();
        ticks
    }

    fn limit_reached(&self, ticks: u64) -> bool {
        let reached = self.max_ticks.is_some_and(|max| ticks >= max);
        if reached {
            info!("reached {ticks} ticks, stopping");
        }
        reached
    }
}

/// Returns true when the loop should stop.
fn apply_command(cmd: PollerCommand, paused: &mut bool, tx: &Sender<PollerMessage>) -> bool {
    match cmd {
        PollerCommand::Pause => {
            *paused = true;
            tx.send(PollerMessage::Paused(true)).ok();
            false
        }
        PollerCommand::Resume => {
            *paused = false;
            tx.send(PollerMessage::Paused(false)).ok();
            false
        }
        PollerCommand::Stop => true,
    }
}

pub fn spawn_thread<R, S>(
    mut poller: Poller<R, S>,
    tx: Sender<PollerMessage>,
    rx_cmd: Receiver<PollerCommand>,
) -> JoinHandle<u64>
where
    R: DifferentialReader + Send + 'static,
    S: SampleSink + Send + 'static,
{
    thread::spawn(move || {
        info!("⚙️ Poller running. Type 'stop' and Enter to finish.");
        poller.run(&rx_cmd, &tx)
    })
}
