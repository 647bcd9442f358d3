use std::collections::VecDeque;
use crate::drivers::transform::{correlation, detrend, linear_fit};
use crate::drivers::SensorError;
/// Drift and correlation over the readings currently in the window.
#[derive(Clone, Copy, Debug)]
pub struct WindowStats {
    pub samples: usize,
    pub first_slope_mv_per_sample: f64,
    pub second_slope_mv_per_sample: f64,
    pub correlation: f64,
}
/// Rolling buffer that keeps the most recent readings of both channels.
pub struct ReadingWindow {
    first: VecDeque<f64>,
    second: VecDeque<f64>,
    capacity: usize,
}
impl ReadingWindow {
    pub fn with_capacity(capacity: usize) -> Result<Self, SensorError> {
        if capacity < 2 {
            return Err(SensorError::DataTooShort { len: capacity });
        }
        Ok(Self {
            first: VecDeque::with_capacity(capacity),
            second: VecDeque::with_capacity(capacity),
            capacity,
        })
    }
    pub fn len(&self) -> usize {
        self.first.len()
    }
    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }
    pub fn push(&mut self, millivolts: [f64; 2]) {
        if self.first.len() == self.capacity {
            self.first.pop_front();
            self.second.pop_front();
        }
        self.first.push_back(millivolts[0]);
        self.second.push_back(millivolts[1]);
    }
    /// `None` until the window holds at least two readings.
    pub fn analyze(&self) -> Result<Option<WindowStats>, SensorError> {
        if self.len() < 2 {
            return Ok(None);
        }
        let first: Vec<f64> = self.first.iter().copied().collect();
        let second: Vec<f64> = self.second.iter().copied().collect();
        let first_fit = linear_fit(&first)?;
        let second_fit = linear_fit(&second)?;
        let correlation = correlation(&detrend(&first)?, &detrend(&second)?)?;
        Ok(Some(WindowStats {
            samples: first.len(),
            first_slope_mv_per_sample: first_fit.slope,
            second_slope_mv_per_sample: second_fit.slope,
            correlation,
        }))
    }
}
