//! CSV in and out of a [`ChannelPair`].
//!
//! Reading drops any row whose timestamp or either channel value is missing,
//! unparseable or non-finite; the rest keep their file order.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, NaiveDateTime};
use crate::drivers::{ChannelPair, SensorError};
pub const TIMESTAMP_COLUMN: &str = "Timestamp_AEST";
/// Header the ADC poller writes to its log file.
pub const FALLBACK_TIMESTAMP_COLUMN: &str = "Timestamp";
pub const A0_A1_COLUMN: &str = "A0-A1_mV";
pub const A2_A3_COLUMN: &str = "A2-A3_mV";
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];
/// Result of loading a CSV: the cleaned pair plus row accounting.
#[derive(Clone, Debug)]
pub struct TableRead {
    pub pair: ChannelPair,
    pub rows_read: usize,
    pub rows_dropped: usize,
}
pub fn read_series(path: &Path) -> Result<TableRead, SensorError> {
    let file = File::open(path)?;
    parse_series(BufReader::new(file))
}
pub fn parse_series<R: BufRead>(reader: R) -> Result<TableRead, SensorError> {
    let mut lines = reader.lines();
    let Some(header) = lines.next().transpose()? else {
        return Err(SensorError::NoValidRows);
    };
    let columns = split_fields(header.trim_start_matches('\u{feff}'));
    let column = |name: &str| columns.iter().position(|c| *c == name);
    let timestamp_idx = column(TIMESTAMP_COLUMN)
        .or_else(|| column(FALLBACK_TIMESTAMP_COLUMN))
        .ok_or_else(|| SensorError::MissingColumn(TIMESTAMP_COLUMN.into()))?;
    let first_idx =
        column(A0_A1_COLUMN).ok_or_else(|| SensorError::MissingColumn(A0_A1_COLUMN.into()))?;
    let second_idx =
        column(A2_A3_COLUMN).ok_or_else(|| SensorError::MissingColumn(A2_A3_COLUMN.into()))?;
    let mut pair = ChannelPair::new();
    let mut rows_read = 0;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows_read += 1;
        let fields = split_fields(&line);
        let field = |idx: usize| fields.get(idx).copied().unwrap_or_default();
        let row = (
            parse_timestamp(field(timestamp_idx)),
            parse_millivolts(field(first_idx)),
            parse_millivolts(field(second_idx)),
        );
        if let (Some(timestamp), Some(first), Some(second)) = row {
            pair.push(timestamp, first, second);
        }
    }
    let rows_dropped = rows_read - pair.len();
    Ok(TableRead {
        pair,
        rows_read,
        rows_dropped,
    })
}
pub fn write_series(path: &Path, pair: &ChannelPair) -> Result<(), SensorError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_series_to(&mut writer, pair)?;
    writer.flush()?;
    Ok(())
}
pub fn write_series_to<W: Write>(writer: &mut W, pair: &ChannelPair) -> Result<(), SensorError> {
    pair.validate()?;
    writeln!(writer, "{TIMESTAMP_COLUMN},{A0_A1_COLUMN},{A2_A3_COLUMN}")?;
    for ((timestamp, first), second) in pair.timestamps.iter().zip(&pair.first).zip(&pair.second) {
        writeln!(writer, "{},{first},{second}", format_timestamp(timestamp))?;
    }
    Ok(())
}
/// `<dir>/<stem>_detrended.csv` next to the input file.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "readings".into());
    input.with_file_name(format!("{stem}_detrended.csv"))
}
/// Accepts the layouts spreadsheet exports and the poller log produce,
/// including Unix epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Some(parsed) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(parsed);
    }
    let epoch = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let secs = epoch.floor();
    let nanos = ((epoch - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos).map(|dt| dt.naive_utc())
}
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}
fn parse_millivolts(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(|f| f.trim().trim_matches('"')).collect()
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;
    #[test]
    fn drops_unparseable_rows_and_keeps_order() {
        let csv = "\
Timestamp_AEST,A0-A1_mV,A2-A3_mV,Note
2025-04-17 10:00:00,1.5,-0.25,ok
2025-04-17 10:00:01,abc,0.1,bad value
not a time,1.0,2.0,bad time
2025-04-17 10:00:02,,3.0,missing
2025-04-17 10:00:03,NaN,3.0,nan

2025-04-17 10:00:04,2.5,0.75,ok
";
        let read = parse_series(Cursor::new(csv)).unwrap();
        assert_eq!(read.rows_read, 6);
        assert_eq!(read.rows_dropped, 4);
        assert_eq!(read.pair.first, vec![1.5, 2.5]);
        assert_eq!(read.pair.second, vec![-0.25, 0.75]);
        assert_eq!(read.pair.elapsed_seconds(), vec![0.0, 4.0]);
    }
    #[test]
    fn falls_back_to_poller_timestamp_column() {
        let csv = "Timestamp,A0-A1_mV,A2-A3_mV\n1713312000.5,0.100,0.200\n1713312001.5,0.110,0.190\n";
        let read = parse_series(Cursor::new(csv)).unwrap();
        assert_eq!(read.pair.len(), 2);
        assert_eq!(read.pair.median_interval_seconds(), Some(1.0));
    }
    #[test]
    fn reports_missing_channel_column() {
        let csv = "Timestamp_AEST,A0-A1_mV\n2025-04-17 10:00:00,1.0\n";
        let err = parse_series(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, SensorError::MissingColumn(c) if c == A2_A3_COLUMN));
    }
    #[test]
    fn parses_common_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 17)
            .unwrap()
            .and_hms_opt(10, 30, 5)
            .unwrap();
        for raw in [
            "2025-04-17 10:30:05",
            "2025-04-17T10:30:05",
            "2025-04-17T10:30:05+10:00",
            "17/04/2025 10:30:05",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_timestamp("1744885805"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }
    #[test]
    fn written_csv_reads_back_unchanged() {
        let start = NaiveDate::from_ymd_opt(2025, 4, 21)
            .unwrap()
            .and_hms_milli_opt(8, 15, 0, 250)
            .unwrap();
        let mut pair = ChannelPair::new();
        for i in 0..5 {
            let t = start + chrono::Duration::milliseconds(1500 * i);
            pair.push(t, 0.1 * i as f64 - 0.3, -1.0 / (i + 1) as f64);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_series(&path, &pair).unwrap();
        let read = read_series(&path).unwrap();
        assert_eq!(read.rows_dropped, 0);
        assert_eq!(read.pair, pair);
    }
    #[test]
    fn default_output_sits_next_to_input() {
        let out = default_output_path(Path::new("/data/gain4_17april.csv"));
        assert_eq!(out, PathBuf::from("/data/gain4_17april_detrended.csv"));
    }
}
