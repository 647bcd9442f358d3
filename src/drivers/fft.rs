use rustfft::{num_complex::Complex64, FftPlanner};
use crate::drivers::{ChannelPair, SensorError};
/// Magnitude spectrum for each channel.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: [Vec<f64>; 2], // channel -> bins
}
impl FrequencySpectrum {
    /// Strongest non-DC bin per channel, `None` if there is only DC.
    pub fn dominant_hz(&self) -> [Option<f64>; 2] {
        self.magnitudes.clone().map(|mags| {
            mags.iter()
                .enumerate()
                .skip(1)
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(k, _)| self.frequencies_hz[k])
        })
    }
}
/// Helper that computes FFTs over a whole channel pair.
pub struct SpectrumBuilder {
    sample_rate_hz: f64,
}
impl SpectrumBuilder {
    pub fn with_sample_rate(sample_rate_hz: f64) -> Result<Self, SensorError> {
        if !(sample_rate_hz > 0.0 && sample_rate_hz.is_finite()) {
            return Err(SensorError::InvalidSampleRate);
        }
        Ok(Self { sample_rate_hz })
    }
    /// Sample rate taken from the median timestamp spacing.
    pub fn for_pair(pair: &ChannelPair) -> Result<Self, SensorError> {
        let interval = pair
            .median_interval_seconds()
            .ok_or(SensorError::InvalidSampleRate)?;
        Self::with_sample_rate(1.0 / interval)
    }
    pub fn compute(&self, pair: &ChannelPair) -> Result<FrequencySpectrum, SensorError> {
        pair.validate()?;
        let fft_size = pair.len();
        if fft_size < 2 {
            return Err(SensorError::DataTooShort { len: fft_size });
        }
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bins = fft_size / 2;
        let frequencies_hz: Vec<f64> = (0..bins)
            .map(|k| k as f64 * self.sample_rate_hz / fft_size as f64)
            .collect();
        let magnitudes = [&pair.first, &pair.second].map(|channel| {
            let mut buffer: Vec<Complex64> =
                channel.iter().map(|v| Complex64::new(*v, 0.0)).collect();
            fft.process(&mut buffer);
            buffer
                .iter()
                .take(bins)
                .map(|c| c.norm() / fft_size as f64)
                .collect::<Vec<f64>>()
        });
        Ok(FrequencySpectrum {
            sample_rate_hz: self.sample_rate_hz,
            frequencies_hz,
            magnitudes,
        })
    }
}
