use thiserror::Error;
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("need at least 2 samples to fit a trend, got {len}")]
    DataTooShort { len: usize },
    #[error("series length mismatch: {first} vs {second}")]
    LengthMismatch { first: usize, second: usize },
    #[error("missing column: {0}")]
    MissingColumn(String),
    #[error("no valid rows after preprocessing")]
    NoValidRows,
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint rejected sample with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("i2c bus error: {0}")]
    Bus(String),
    #[error("ADC conversion did not complete after {polls} polls")]
    ConversionTimeout { polls: u32 },
    #[error("unsupported PGA gain: {0} (expected one of 2/3, 1, 2, 4, 8, 16)")]
    InvalidGain(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for SensorError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        SensorError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for SensorError {
    fn from(value: image::ImageError) -> Self {
        SensorError::Plot(value.to_string())
    }
}
