//! Forwarding samples to the dashboard endpoint.
use std::collections::BTreeMap;
use std::time::Duration;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use crate::drivers::series::{CHANNEL_A0_A1, CHANNEL_A2_A3};
use crate::drivers::SensorError;
/// One JSON object per sample: `{"timestamp": .., "voltages": {"A0-A1": .., "A2-A3": ..}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplePayload {
    pub timestamp: String,
    pub voltages: BTreeMap<String, f64>,
}
impl SamplePayload {
    pub fn new(timestamp: String, millivolts: [f64; 2]) -> Self {
        let voltages = BTreeMap::from([
            (CHANNEL_A0_A1.to_string(), millivolts[0]),
            (CHANNEL_A2_A3.to_string(), millivolts[1]),
        ]);
        Self {
            timestamp,
            voltages,
        }
    }
    /// Row from a CSV batch; timestamps carry no zone.
    pub fn from_row(timestamp: &NaiveDateTime, millivolts: [f64; 2]) -> Self {
        Self::new(timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(), millivolts)
    }
    /// Live reading; always UTC.
    pub fn from_reading(timestamp: &DateTime<Utc>, millivolts: [f64; 2]) -> Self {
        Self::new(timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(), millivolts)
    }
}
/// Destination for samples once they leave the pipeline.
pub trait SampleSink {
    fn send(&mut self, payload: &SamplePayload) -> Result<(), SensorError>;
}
/// POSTs each payload as JSON. Any non-2xx status is an error.
pub struct HttpSink {
    client: Client,
    endpoint: String,
}
impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SensorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
impl SampleSink for HttpSink {
    fn send(&mut self, payload: &SamplePayload) -> Result<(), SensorError> {
        let response = self.client.post(&self.endpoint).json(payload).send()?;
        let status = response.status();
        if status.is_success() {
            debug!("{} accepted sample at {}", self.endpoint, payload.timestamp);
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(SensorError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
/// Collects payloads in memory; handy for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    pub sent: Vec<SamplePayload>,
}
impl SampleSink for MemorySink {
    fn send(&mut self, payload: &SamplePayload) -> Result<(), SensorError> {
        self.sent.push(payload.clone());
        Ok(())
    }
}
impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn send(&mut self, payload: &SamplePayload) -> Result<(), SensorError> {
        (**self).send(payload)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;
    #[test]
    fn payload_matches_dashboard_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 4, 17, 0, 30, 0).unwrap();
        let payload = SamplePayload::from_reading(&ts, [1.25, -0.5]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": "2025-04-17T00:30:00Z",
                "voltages": { "A0-A1": 1.25, "A2-A3": -0.5 }
            })
        );
    }
    #[test]
    fn batch_rows_use_naive_iso_timestamps() {
        let ts = NaiveDate::from_ymd_opt(2025, 4, 21)
            .unwrap()
            .and_hms_milli_opt(9, 5, 7, 500)
            .unwrap();
        let payload = SamplePayload::from_row(&ts, [0.0, 0.0]);
        assert_eq!(payload.timestamp, "2025-04-21T09:05:07");
    }
    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::default();
        for v in [1.0, 2.0, 3.0] {
            sink.send(&SamplePayload::new(v.to_string(), [v, -v])).unwrap();
        }
        let firsts: Vec<f64> = sink.sent.iter().map(|p| p.voltages[CHANNEL_A0_A1]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0]);
    }
    #[test]
    fn http_sink_reports_unreachable_endpoint() {
        // Port 9 (discard) on loopback is never an HTTP server in CI.
        let mut sink = HttpSink::new("http://127.0.0.1:9/submit", Duration::from_millis(500)).unwrap();
        let err = sink
            .send(&SamplePayload::new("t".into(), [0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, SensorError::Http(_)));
    }
}
