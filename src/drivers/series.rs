use chrono::NaiveDateTime;
use crate::drivers::SensorError;
/// Differential pair wired across pins A0/A1.
pub const CHANNEL_A0_A1: &str = "A0-A1";
/// Differential pair wired across pins A2/A3.
pub const CHANNEL_A2_A3: &str = "A2-A3";
/// Two differential channels sampled on one shared timestamp index.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelPair {
    pub timestamps: Vec<NaiveDateTime>,
    pub first: Vec<f64>,  // A0-A1, millivolts
    pub second: Vec<f64>, // A2-A3, millivolts
}
impl ChannelPair {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            first: Vec::with_capacity(capacity),
            second: Vec::with_capacity(capacity),
        }
    }
    pub fn channel_labels() -> [&'static str; 2] {
        [CHANNEL_A0_A1, CHANNEL_A2_A3]
    }
    pub fn push(&mut self, timestamp: NaiveDateTime, first_mv: f64, second_mv: f64) {
        self.timestamps.push(timestamp);
        self.first.push(first_mv);
        self.second.push(second_mv);
    }
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
    pub fn validate(&self) -> Result<(), SensorError> {
        let len = self.timestamps.len();
        for channel in [&self.first, &self.second] {
            if channel.len() != len {
                return Err(SensorError::LengthMismatch {
                    first: len,
                    second: channel.len(),
                });
            }
        }
        Ok(())
    }
    /// Same timestamps, new channel values.
    pub fn with_values(&self, first: Vec<f64>, second: Vec<f64>) -> Result<Self, SensorError> {
        let pair = Self {
            timestamps: self.timestamps.clone(),
            first,
            second,
        };
        pair.validate()?;
        Ok(pair)
    }
    /// Seconds since the first timestamp, one entry per sample.
    pub fn elapsed_seconds(&self) -> Vec<f64> {
        let Some(start) = self.timestamps.first() else {
            return Vec::new();
        };
        self.timestamps
            .iter()
            .map(|t| (*t - *start).num_milliseconds() as f64 / 1000.0)
            .collect()
    }
    pub fn is_time_ordered(&self) -> bool {
        self.timestamps.windows(2).all(|w| w[0] <= w[1])
    }
    /// Median spacing between consecutive samples, in seconds.
    pub fn median_interval_seconds(&self) -> Option<f64> {
        let elapsed = self.elapsed_seconds();
        let mut deltas: Vec<f64> = elapsed.windows(2).map(|w| w[1] - w[0]).collect();
        if deltas.is_empty() {
            return None;
        }
        deltas.sort_by(|a, b| a.total_cmp(b));
        let median = deltas[deltas.len() / 2];
        (median > 0.0).then_some(median)
    }
}
impl Default for ChannelPair {
    fn default() -> Self {
        Self::new()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    fn at(seconds: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 17)
            .unwrap()
            .and_hms_opt(10, 0, seconds)
            .unwrap()
    }
    #[test]
    fn elapsed_and_interval_follow_timestamps() {
        let mut pair = ChannelPair::new();
        pair.push(at(0), 1.0, 2.0);
        pair.push(at(2), 1.0, 2.0);
        pair.push(at(4), 1.0, 2.0);
        pair.push(at(10), 1.0, 2.0);
        assert_eq!(pair.elapsed_seconds(), vec![0.0, 2.0, 4.0, 10.0]);
        assert_eq!(pair.median_interval_seconds(), Some(2.0));
        assert!(pair.is_time_ordered());
    }
    #[test]
    fn single_sample_has_no_interval() {
        let mut pair = ChannelPair::new();
        pair.push(at(0), 1.0, 2.0);
        assert_eq!(pair.median_interval_seconds(), None);
    }
    #[test]
    fn with_values_rejects_ragged_channels() {
        let mut pair = ChannelPair::new();
        pair.push(at(0), 1.0, 2.0);
        pair.push(at(1), 1.0, 2.0);
        let err = pair.with_values(vec![0.0, 0.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, SensorError::LengthMismatch { first: 2, second: 1 }));
    }
}
