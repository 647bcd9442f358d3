use std::collections::VecDeque;
use crate::drivers::SensorError;
/// One conversion of both differential channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdcSample {
    pub raw: [i16; 2],         // signed counts, A0-A1 then A2-A3
    pub millivolts: [f64; 2],  // can be negative
}
/// Something that can produce a differential reading on demand.
pub trait DifferentialReader {
    fn read_pair(&mut self) -> Result<AdcSample, SensorError>;
}
/// In-memory reader useful for tests and deterministic playback.
pub struct ManualReader {
    queue: VecDeque<AdcSample>,
}
impl ManualReader {
    pub fn new(samples: impl IntoIterator<Item = AdcSample>) -> Self {
        Self {
            queue: samples.into_iter().collect(),
        }
    }
}
impl DifferentialReader for ManualReader {
    fn read_pair(&mut self) -> Result<AdcSample, SensorError> {
        self.queue
            .pop_front()
            .ok_or_else(|| SensorError::Bus("manual reader has no samples left".into()))
    }
}
impl<R: DifferentialReader + ?Sized> DifferentialReader for Box<R> {
    fn read_pair(&mut self) -> Result<AdcSample, SensorError> {
        (**self).read_pair()
    }
}
