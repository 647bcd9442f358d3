use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use log::info;
use crate::drivers::SensorError;
use crate::types::Reading;

pub const LOG_HEADER: &str = "Timestamp,A0-A1_mV,A2-A3_mV";

/// Append-only CSV log of poller readings. Every line is flushed so a
/// killed process loses at most the reading in flight.
pub struct DataRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl DataRecorder {
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if is_empty {
            writeln!(writer, "{LOG_HEADER}")?;
            writer.flush()?;
        }
        info!("💾 Logging readings to {}", path.display());
        Ok(Self { writer, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_reading(&mut self, reading: &Reading) -> Result<(), SensorError> {
        // epoch seconds, same as the batch reader's fallback column expects
        let t = reading.timestamp.timestamp_micros() as f64 / 1e6;
        writeln!(
            self.writer,
            "{:.6},{:.3},{:.3}",
            t, reading.millivolts[0], reading.millivolts[1]
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(secs: i64, a: f64, b: f64) -> Reading {
        Reading {
            timestamp: Utc.timestamp_opt(secs, 250_000_000).unwrap(),
            raw: [0, 0],
            millivolts: [a, b],
        }
    }

    #[test]
    fn header_written_once_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mushroom_data.txt");
        {
            let mut rec = DataRecorder::open(&path).unwrap();
            rec.write_reading(&reading(1_713_312_000, 1.23456, -0.5)).unwrap();
        }
        {
            let mut rec = DataRecorder::open(&path).unwrap();
            rec.write_reading(&reading(1_713_312_001, 2.0, 0.0004)).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                LOG_HEADER,
                "1713312000.250000,1.235,-0.500",
                "1713312001.250000,2.000,0.000",
            ]
        );
    }

    #[test]
    fn log_reads_back_through_batch_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut rec = DataRecorder::open(&path).unwrap();
        for i in 0..3 {
            rec.write_reading(&reading(1_713_312_000 + i, i as f64, -(i as f64))).unwrap();
        }
        let table = crate::drivers::read_series(&path).unwrap();
        assert_eq!(table.pair.len(), 3);
        assert_eq!(table.pair.second, vec![0.0, -1.0, -2.0]);
        assert_eq!(table.pair.median_interval_seconds(), Some(1.0));
    }
}
