// src/drivers/mod.rs
pub mod ads1115;
pub mod error;
pub mod fft;
pub mod pipeline;
pub mod plot;
pub mod series;
pub mod source;
pub mod table;
pub mod transform;
pub mod transport;
pub mod window;
pub use ads1115::{Ads1115, Gain, I2cBus, SimulatedBus, SimulatedSignal};
pub use error::SensorError;
pub use fft::{FrequencySpectrum, SpectrumBuilder};
pub use pipeline::{BatchPipeline, BatchReport};
pub use plot::{render_pair_png, render_spectrum_png, PlotStyle};
pub use series::{ChannelPair, CHANNEL_A0_A1, CHANNEL_A2_A3};
pub use source::{AdcSample, DifferentialReader, ManualReader};
pub use table::{read_series, write_series, TableRead};
pub use transform::{correct_pair, correlation, detrend, linear_fit, DriftReport, LinearFit};
pub use transport::{HttpSink, MemorySink, SamplePayload, SampleSink};
pub use window::{ReadingWindow, WindowStats};
