use std::io::Cursor;
use std::path::Path;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::SensorError;
use crate::drivers::fft::FrequencySpectrum;
use crate::drivers::ChannelPair;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub foreground: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        // 12x6 in at 100 dpi
        Self {
            width: 1200,
            height: 600,
            background: WHITE,
            foreground: BLACK,
            palette: vec![BLUE, RED],
        }
    }
}
/// Both channels against elapsed seconds. Legend entries read
/// `"<channel> (<series_label>)"`, e.g. `"A0-A1 (Raw)"`.
pub fn render_pair_png(
    pair: &ChannelPair,
    title: &str,
    series_label: &str,
    style: &PlotStyle,
) -> Result<Vec<u8>, SensorError> {
    pair.validate()?;
    if pair.is_empty() {
        return Err(SensorError::Plot("channel pair has no samples".into()));
    }
    let elapsed = pair.elapsed_seconds();
    let x_max = elapsed.last().copied().unwrap_or(0.0).max(1e-3);
    let (y_min, y_max) = padded_bounds(pair.first.iter().chain(&pair.second).copied());
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(title, ("sans-serif", 20).into_font().color(&style.foreground))
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(0f64..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .y_desc("mV")
            .light_line_style(&style.foreground.mix(0.1))
            .draw()?;
        for (idx, (label, channel)) in ChannelPair::channel_labels()
            .iter()
            .zip([&pair.first, &pair.second])
            .enumerate()
        {
            let color = style.palette[idx % style.palette.len()];
            let series = elapsed.iter().copied().zip(channel.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(format!("{label} ({series_label})"))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&style.foreground.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn render_spectrum_png(
    spectrum: &FrequencySpectrum,
    style: &PlotStyle,
) -> Result<Vec<u8>, SensorError> {
    if spectrum.frequencies_hz.is_empty() {
        return Err(SensorError::Plot("spectrum has no bins".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                "Detrended Spectrum",
                ("sans-serif", 20).into_font().color(&style.foreground),
            )
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(
                0f64..spectrum.frequencies_hz.last().copied().unwrap_or(0.0).max(1e-6),
                0f64..spectrum
                    .magnitudes
                    .iter()
                    .flat_map(|c| c.iter().copied())
                    .fold(0.0f64, |acc, v| acc.max(v))
                    .max(1e-6),
            )?;
        chart
            .configure_mesh()
            .x_desc("Frequency (Hz)")
            .y_desc("|X(f)| (mV)")
            .light_line_style(&style.foreground.mix(0.1))
            .draw()?;
        for (idx, (label, mags)) in ChannelPair::channel_labels()
            .iter()
            .zip(&spectrum.magnitudes)
            .enumerate()
        {
            let color = style.palette[idx % style.palette.len()];
            let series = spectrum
                .frequencies_hz
                .iter()
                .copied()
                .zip(mags.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(label.to_string())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&style.foreground.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn save_png(path: &Path, png: &[u8]) -> Result<(), SensorError> {
    std::fs::write(path, png)?;
    Ok(())
}
fn padded_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    let span = max - min;
    if span.abs() < 1e-9 {
        return (min - 1.0, max + 1.0);
    }
    (min - span * 0.05, max + span * 0.05)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, SensorError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| SensorError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fft::SpectrumBuilder;
    use chrono::NaiveDate;
    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    fn sample_pair(n: usize) -> ChannelPair {
        let start = NaiveDate::from_ymd_opt(2025, 4, 17)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut pair = ChannelPair::new();
        for i in 0..n {
            let t = start + chrono::Duration::seconds(i as i64);
            let wiggle = (i as f64 * 0.6).sin();
            pair.push(t, wiggle + 0.1 * i as f64, -0.5 * wiggle);
        }
        pair
    }
    #[test]
    fn pair_plot_decodes_at_configured_size() {
        let style = PlotStyle::default();
        let png = render_pair_png(&sample_pair(40), "Raw Data", "Raw", &style).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1200, 600));
    }
    #[test]
    fn spectrum_plot_decodes_at_configured_size() {
        let pair = sample_pair(64);
        let spectrum = SpectrumBuilder::for_pair(&pair).unwrap().compute(&pair).unwrap();
        let style = PlotStyle {
            width: 640,
            height: 320,
            ..PlotStyle::default()
        };
        let png = render_spectrum_png(&spectrum, &style).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 320));
    }
    #[test]
    fn empty_pair_is_rejected_before_drawing() {
        let err = render_pair_png(&ChannelPair::new(), "t", "Raw", &PlotStyle::default()).unwrap_err();
        assert!(matches!(err, SensorError::Plot(_)));
    }
    #[test]
    fn bounds_pad_flat_and_sloped_data() {
        assert_eq!(padded_bounds([3.0, 3.0].into_iter()), (2.0, 4.0));
        let (lo, hi) = padded_bounds([0.0, 10.0].into_iter());
        assert!(lo < 0.0 && hi > 10.0);
        assert_eq!(padded_bounds(std::iter::empty()), (-1.0, 1.0));
    }
}
