use std::fs;
use std::path::{Path, PathBuf};
use log::{error, info, warn};
use crate::config::BatchConfig;
use crate::drivers::error::SensorError;
use crate::drivers::fft::SpectrumBuilder;
use crate::drivers::plot::{render_pair_png, render_spectrum_png, save_png, PlotStyle};
use crate::drivers::table::{read_series, write_series};
use crate::drivers::transform::{correct_pair, DriftReport};
use crate::drivers::transport::{SamplePayload, SampleSink};
use crate::drivers::ChannelPair;
pub const RAW_PLOT_FILE: &str = "raw_data.png";
pub const DETRENDED_PLOT_FILE: &str = "detrended_data.png";
pub const SPECTRUM_PLOT_FILE: &str = "detrended_spectrum.png";
/// Outcome of one batch run.
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub drift: DriftReport,
    pub dominant_hz: Option<[Option<f64>; 2]>,
    pub output: PathBuf,
    pub plots: Vec<PathBuf>,
    pub rows_sent: usize,
    pub rows_failed: usize,
}
/// Load -> plot raw -> detrend + correlate -> plot -> write CSV -> forward rows.
///
/// Plots are side artifacts: a rendering failure is logged and the run
/// carries on. Sending is skipped entirely when no sink is attached.
pub struct BatchPipeline<S: SampleSink> {
    sink: Option<S>,
    style: PlotStyle,
}
impl<S: SampleSink> BatchPipeline<S> {
    pub fn new(sink: Option<S>) -> Self {
        Self {
            sink,
            style: PlotStyle::default(),
        }
    }
    pub fn with_style(mut self, style: PlotStyle) -> Self {
        self.style = style;
        self
    }
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }
    pub fn run(&mut self, config: &BatchConfig) -> Result<BatchReport, SensorError> {
        info!("📂 Reading file: {}", config.input.display());
        let table = read_series(&config.input)?;
        if table.rows_dropped > 0 {
            warn!(
                "dropped {} of {} rows with missing or unparseable fields",
                table.rows_dropped, table.rows_read
            );
        }
        let pair = table.pair;
        if pair.is_empty() {
            return Err(SensorError::NoValidRows);
        }
        // Nothing is written for input that cannot be corrected.
        if pair.len() < 2 {
            return Err(SensorError::DataTooShort { len: pair.len() });
        }
        if !pair.is_time_ordered() {
            warn!("timestamps are not monotonic; the trend is fitted in file order");
        }
        fs::create_dir_all(&config.plot_dir)?;
        let mut plots = Vec::new();
        let raw_path = config.plot_dir.join(RAW_PLOT_FILE);
        let raw_title = "Raw Data Before Baseline Drift Correction";
        if self.plot_pair(&pair, raw_title, "Raw", &raw_path) {
            plots.push(raw_path);
        }
        info!("🔧 Applying baseline drift correction...");
        let (corrected, drift) = correct_pair(&pair)?;
        info!(
            "removed drift: {:+.6} mV/sample on A0-A1, {:+.6} mV/sample on A2-A3",
            drift.first_fit.slope, drift.second_fit.slope
        );
        info!("📊 Correlation between A0-A1 and A2-A3: {:.4}", drift.correlation);
        let detrended_path = config.plot_dir.join(DETRENDED_PLOT_FILE);
        let detrended_title = format!(
            "Data After Baseline Drift Correction (Correlation: {:.4})",
            drift.correlation
        );
        if self.plot_pair(&corrected, &detrended_title, "Detrended", &detrended_path) {
            plots.push(detrended_path);
        }
        write_series(&config.output, &corrected)?;
        info!("✅ Saved corrected data to: {}", config.output.display());
        let spectrum_path = config.plot_dir.join(SPECTRUM_PLOT_FILE);
        let dominant_hz = match self.spectrum(&corrected, &spectrum_path) {
            Ok(dominant) => {
                plots.push(spectrum_path);
                Some(dominant)
            }
            Err(e) => {
                warn!("skipping spectrum: {e}");
                None
            }
        };
        let (rows_sent, rows_failed) = self.forward(&corrected);
        Ok(BatchReport {
            rows_read: table.rows_read,
            rows_kept: corrected.len(),
            drift,
            dominant_hz,
            output: config.output.clone(),
            plots,
            rows_sent,
            rows_failed,
        })
    }
    fn plot_pair(&self, pair: &ChannelPair, title: &str, series_label: &str, path: &Path) -> bool {
        let saved = render_pair_png(pair, title, series_label, &self.style)
            .and_then(|png| save_png(path, &png));
        match saved {
            Ok(()) => {
                info!("✅ Saved plot: {}", path.display());
                true
            }
            Err(e) => {
                warn!("could not save plot {}: {e}", path.display());
                false
            }
        }
    }
    fn spectrum(&self, pair: &ChannelPair, path: &Path) -> Result<[Option<f64>; 2], SensorError> {
        let spectrum = SpectrumBuilder::for_pair(pair)?.compute(pair)?;
        let dominant = spectrum.dominant_hz();
        info!(
            "dominant frequency: A0-A1 {}, A2-A3 {}",
            describe_hz(dominant[0]),
            describe_hz(dominant[1])
        );
        save_png(path, &render_spectrum_png(&spectrum, &self.style)?)?;
        info!("✅ Saved plot: {}", path.display());
        Ok(dominant)
    }
    fn forward(&mut self, pair: &ChannelPair) -> (usize, usize) {
        let Some(sink) = self.sink.as_mut() else {
            info!("sending disabled; {} rows kept locally", pair.len());
            return (0, 0);
        };
        info!("📤 Sending {} rows...", pair.len());
        let mut sent = 0;
        let mut failed = 0;
        let rows = pair.timestamps.iter().zip(&pair.first).zip(&pair.second);
        for (index, ((timestamp, first), second)) in rows.enumerate() {
            let payload = SamplePayload::from_row(timestamp, [*first, *second]);
            match sink.send(&payload) {
                Ok(()) => {
                    sent += 1;
                    info!("Successfully sent row {}: {}", index + 1, payload.timestamp);
                }
                Err(e) => {
                    failed += 1;
                    error!("Failed to send row {}: {e}", index + 1);
                }
            }
        }
        (sent, failed)
    }
}
fn describe_hz(hz: Option<f64>) -> String {
    hz.map(|f| format!("{f:.5} Hz")).unwrap_or_else(|| "n/a".into())
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::transport::MemorySink;
    use approx::assert_abs_diff_eq;
    use std::time::Duration;
    fn config_for(dir: &Path, input: PathBuf) -> BatchConfig {
        BatchConfig {
            output: dir.join("out_detrended.csv"),
            plot_dir: dir.join("plots"),
            input,
            endpoint: "http://localhost:8080/submit".into(),
            http_timeout: Duration::from_secs(1),
            send: true,
        }
    }
    fn write_input(dir: &Path, rows: &[(u32, f64, f64)]) -> PathBuf {
        let path = dir.join("in.csv");
        let mut csv = String::from("Timestamp_AEST,A0-A1_mV,A2-A3_mV\n");
        for (sec, a, b) in rows {
            csv.push_str(&format!("2025-04-17 10:{:02}:{:02},{a},{b}\n", sec / 60, sec % 60));
        }
        std::fs::write(&path, csv).unwrap();
        path
    }
    #[test]
    fn corrects_writes_and_forwards_every_kept_row() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<(u32, f64, f64)> = (0..30)
            .map(|i| {
                let wiggle = (i as f64 * 0.8).sin();
                (i, wiggle + 0.2 * i as f64, 0.5 * wiggle - 0.1 * i as f64 + 4.0)
            })
            .collect();
        let input = write_input(dir.path(), &rows);
        let config = config_for(dir.path(), input);
        let mut pipeline = BatchPipeline::new(Some(MemorySink::default()));
        let report = pipeline.run(&config).unwrap();
        assert_eq!(report.rows_read, 30);
        assert_eq!(report.rows_kept, 30);
        assert_eq!(report.rows_sent, 30);
        assert_eq!(report.rows_failed, 0);
        assert_abs_diff_eq!(report.drift.correlation, 1.0, epsilon = 1e-9);
        let written = read_series(&config.output).unwrap().pair;
        assert_eq!(written.len(), 30);
        let sink = pipeline.sink().unwrap();
        assert_eq!(sink.sent.len(), 30);
        assert_eq!(sink.sent[0].timestamp, "2025-04-17T10:00:00");
        assert_abs_diff_eq!(sink.sent[3].voltages["A0-A1"], written.first[3], epsilon = 1e-12);
        let expected: Vec<PathBuf> = [RAW_PLOT_FILE, DETRENDED_PLOT_FILE, SPECTRUM_PLOT_FILE]
            .iter()
            .map(|name| config.plot_dir.join(name))
            .collect();
        assert_eq!(report.plots, expected);
        for plot in &report.plots {
            let bytes = std::fs::read(plot).unwrap();
            assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"), "{} is not a PNG", plot.display());
        }
        assert!(report.dominant_hz.is_some());
    }
    #[test]
    fn linear_input_yields_zero_series_and_nan_correlation() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<(u32, f64, f64)> = (0..5)
            .map(|i| (i, 1.0 + i as f64, 5.0 - i as f64))
            .collect();
        let config = config_for(dir.path(), write_input(dir.path(), &rows));
        let mut pipeline: BatchPipeline<MemorySink> = BatchPipeline::new(None);
        let report = pipeline.run(&config).unwrap();
        assert!(report.drift.correlation.is_nan());
        assert_eq!(report.rows_sent, 0);
        let written = read_series(&config.output).unwrap().pair;
        for v in written.first.iter().chain(&written.second) {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }
    #[test]
    fn single_row_is_too_short_to_correct() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), write_input(dir.path(), &[(0, 1.0, 2.0)]));
        let mut pipeline = BatchPipeline::new(Some(MemorySink::default()));
        let err = pipeline.run(&config).unwrap_err();
        assert!(matches!(err, SensorError::DataTooShort { len: 1 }));
        assert!(!config.output.exists());
        assert!(!config.plot_dir.exists());
        assert!(pipeline.sink().unwrap().sent.is_empty());
    }
    #[test]
    fn file_without_valid_rows_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(&input, "Timestamp_AEST,A0-A1_mV,A2-A3_mV\nx,y,z\n").unwrap();
        let config = config_for(dir.path(), input);
        let mut pipeline = BatchPipeline::new(Some(MemorySink::default()));
        assert!(matches!(pipeline.run(&config), Err(SensorError::NoValidRows)));
    }
}
