use crate::chart::*;
use crate::error::ScalerError;
use crate::utils::{check_output_path, suitable_xfmt};
use chrono::prelude::*;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::prelude::*;
use std::path::PathBuf;

/// Write the charts as png images.
/// The charts are rendered in memory as they come,
/// and the files are only written by finish.
#[derive(Debug, Clone)]
pub struct PngSink {
    time_series_path: PathBuf,
    histogram_path: Option<PathBuf>,
    rendered: Vec<(PathBuf, Vec<u8>)>,
}

impl PngSink {
    /// Sink for the time series only, as in the rolling app.
    pub fn new<P>(time_series_path: P) -> PngSink
    where
        P: Into<PathBuf>,
    {
        PngSink {
            time_series_path: time_series_path.into(),
            histogram_path: None,
            rendered: Vec::new(),
        }
    }

    pub fn with_histograms<P>(mut self, histogram_path: P) -> PngSink
    where
        P: Into<PathBuf>,
    {
        self.histogram_path = Some(histogram_path.into());
        self
    }
}

impl ChartSink for PngSink {
    fn time_series(&mut self, chart: &TimeSeriesChart) -> Result<(), ScalerError> {
        log::info!("> plot time series for {}", self.time_series_path.display());
        let png = render_time_series(chart)?;
        self.rendered.push((self.time_series_path.clone(), png));
        Ok(())
    }

    fn histograms(&mut self, chart: &HistogramChart) -> Result<(), ScalerError> {
        let path = self
            .histogram_path
            .clone()
            .ok_or_else(|| ScalerError::Plot(String::from("no output file for the histograms")))?;
        log::info!("> plot histograms for {}", path.display());
        let png = render_histograms(chart)?;
        self.rendered.push((path, png));
        Ok(())
    }

    /// Every target is checked before the first file is written.
    fn finish(&mut self) -> Result<(), ScalerError> {
        for (p, _) in self.rendered.iter() {
            check_output_path(p)?;
        }
        for (p, png) in self.rendered.drain(..) {
            log::info!("> save {}", p.display());
            std::fs::write(&p, png)?;
        }
        Ok(())
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> ScalerError {
    ScalerError::Plot(e.to_string())
}

fn rgb((r, g, b): Rgb) -> RGBColor {
    RGBColor(r, g, b)
}

fn encode_png(pixels: &[u8], (w, h): (u32, u32)) -> Result<Vec<u8>, ScalerError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(pixels, w, h, ExtendedColorType::Rgb8)
        .map_err(plot_err)?;
    Ok(png)
}

/// Draw with titles, ticks and legends when possible.
/// Without usable fonts only the data is drawn.
fn with_text_fallback<F>(size: (u32, u32), draw: F) -> Result<Vec<u8>, ScalerError>
where
    F: Fn(&mut [u8], bool) -> Result<(), ScalerError>,
{
    let mut pixels = vec![0u8; size.0 as usize * size.1 as usize * 3];
    if let Err(e) = draw(&mut pixels[..], true) {
        log::warn!("{}, drawing the chart without text", e);
        draw(&mut pixels[..], false)?;
    }
    encode_png(&pixels, size)
}

/// The two time series panels, stacked, as png bytes.
pub fn render_time_series(chart: &TimeSeriesChart) -> Result<Vec<u8>, ScalerError> {
    with_text_fallback(chart.size, |pixels, text| {
        draw_time_series(chart, pixels, text)
    })
}

/// One histogram panel per column, stacked, as png bytes.
pub fn render_histograms(chart: &HistogramChart) -> Result<Vec<u8>, ScalerError> {
    with_text_fallback(chart.size, |pixels, text| {
        draw_histograms(chart, pixels, text)
    })
}

fn draw_time_series(
    chart: &TimeSeriesChart,
    pixels: &mut [u8],
    text: bool,
) -> Result<(), ScalerError> {
    let (tmin, tmax) = chart
        .time_bounds()
        .ok_or_else(|| ScalerError::Plot(String::from("no points to plot")))?;
    let xmin = Utc.from_utc_datetime(&tmin);
    let mut xmax = Utc.from_utc_datetime(&tmax);
    // a single record still needs a non-empty axis
    if xmax <= xmin {
        xmax = xmin + chrono::Duration::minutes(1);
    }
    let xfmt = suitable_xfmt(xmax - xmin);
    let root = BitMapBackend::with_buffer(pixels, chart.size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let areas = root.split_evenly((2, 1));
    for (panel, area) in [&chart.channels, &chart.coincidence].iter().zip(areas.iter()) {
        let (ymin, ymax) = panel.y_range;
        let mut builder = ChartBuilder::on(area);
        if text {
            builder.caption(&panel.title, ("sans-serif", 22));
        }
        let mut ctx = builder
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xmin..xmax, ymin..ymax)
            .map_err(plot_err)?;
        if text {
            ctx.configure_mesh()
                .light_line_style(&TRANSPARENT)
                .bold_line_style(RGBColor(100, 100, 100).mix(0.3).stroke_width(1))
                .set_all_tick_mark_size(2)
                .label_style(("sans-serif", 14))
                .x_labels(12)
                .y_labels(10)
                .x_label_formatter(&|x| x.format(xfmt).to_string())
                .x_desc(format!("{} [{}]", chart.x_desc, xfmt.replace('%', "")))
                .y_desc(panel.y_desc.as_str())
                .draw()
                .map_err(plot_err)?;
        }
        for series in panel.series.iter() {
            let color = rgb(series.color);
            let points: Vec<(DateTime<Utc>, f64)> = series
                .points
                .iter()
                .map(|(t, v)| (Utc.from_utc_datetime(t), *v))
                .collect();
            ctx.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(1)))
                .map_err(plot_err)?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            ctx.draw_series(points.iter().map(|p| Cross::new(*p, 4, color)))
                .map_err(plot_err)?;
        }
        if text && !panel.series.is_empty() {
            ctx.configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(plot_err)?;
        }
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Only the bins within the panel x range are drawn.
fn draw_histograms(
    chart: &HistogramChart,
    pixels: &mut [u8],
    text: bool,
) -> Result<(), ScalerError> {
    let root = BitMapBackend::with_buffer(pixels, chart.size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let areas = root.split_evenly((chart.panels.len(), 1));
    for (panel, area) in chart.panels.iter().zip(areas.iter()) {
        let (xmin, xmax) = panel.x_range;
        let bars = panel.histogram.visible_bins(panel.x_range);
        let highest = bars.iter().map(|(_, _, n)| *n).max().unwrap_or(0).max(1);
        let ymax = highest as f64 * 1.05;
        let mut builder = ChartBuilder::on(area);
        if text {
            builder.caption(&panel.title, ("sans-serif", 18));
        }
        let mut ctx = builder
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(50)
            .build_cartesian_2d(xmin..xmax, 0f64..ymax)
            .map_err(plot_err)?;
        if text {
            ctx.configure_mesh()
                .light_line_style(&TRANSPARENT)
                .bold_line_style(RGBColor(100, 100, 100).mix(0.3).stroke_width(1))
                .label_style(("sans-serif", 12))
                .x_desc(panel.x_desc.as_str())
                .y_desc(panel.y_desc.as_str())
                .draw()
                .map_err(plot_err)?;
        }
        let style = rgb(panel.color).mix(HISTOGRAM_ALPHA).filled();
        ctx.draw_series(
            bars.iter()
                .filter(|(_, _, n)| *n > 0)
                .map(|(l, r, n)| Rectangle::new([(*l, 0.), (*r, *n as f64)], style)),
        )
        .map_err(plot_err)?;
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScalerCounts;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn fixture() -> ScalerCounts {
        ScalerCounts::from_file("./test/29082024_1023_output.txt").unwrap()
    }

    fn counts_from(dir: &tempfile::TempDir, content: &str) -> ScalerCounts {
        let p = dir.path().join("29082024_1023_output.txt");
        std::fs::write(&p, content).unwrap();
        ScalerCounts::from_file(&p).unwrap()
    }

    fn has_color(png: &[u8], color: Rgb) -> bool {
        let img = image::load_from_memory(png).unwrap().to_rgb8();
        img.pixels().any(|p| (p[0], p[1], p[2]) == color)
    }

    fn not_all_white(png: &[u8]) -> bool {
        let img = image::load_from_memory(png).unwrap().to_rgb8();
        img.pixels().any(|p| p.0 != [255, 255, 255])
    }

    #[test]
    fn sink_writes_both_files_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let ts_path = dir.path().join("ts.png");
        let hist_path = dir.path().join("hist.png");
        let sc = fixture();
        let mut sink = PngSink::new(&ts_path).with_histograms(&hist_path);
        sink.time_series(&sc.time_series_chart(&TimeSeriesSettings::plain()))
            .unwrap();
        sink.histograms(&sc.histogram_chart(&HistogramSettings::default()))
            .unwrap();
        assert!(!ts_path.exists());
        assert!(!hist_path.exists());

        sink.finish().unwrap();
        for p in [&ts_path, &hist_path] {
            let bytes = std::fs::read(p).unwrap();
            assert_eq!(bytes[..8], PNG_SIGNATURE);
        }
        let img = image::open(&ts_path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), crate::TIME_SERIES_SIZE);
        let img = image::open(&hist_path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), crate::HISTOGRAMS_SIZE);
    }

    #[test]
    fn coincidences_are_drawn_in_orange() {
        let chart = fixture().time_series_chart(&TimeSeriesSettings::plain());
        let png = render_time_series(&chart).unwrap();
        assert!(has_color(&png, COINCIDENCE_COLOR));
    }

    #[test]
    fn data_is_drawn_without_text() {
        let chart = fixture().time_series_chart(&TimeSeriesSettings::plain());
        let mut pixels = vec![0u8; (chart.size.0 * chart.size.1 * 3) as usize];
        draw_time_series(&chart, &mut pixels, false).unwrap();
        let orange = pixels
            .chunks(3)
            .filter(|p| (p[0], p[1], p[2]) == COINCIDENCE_COLOR)
            .count();
        assert!(orange > 0);
    }

    #[test]
    fn single_record() {
        let dir = tempfile::tempdir().unwrap();
        let sc = counts_from(&dir, "DS 0 3C 3C 2\n");
        let chart = sc.time_series_chart(&TimeSeriesSettings::plain());
        let png = render_time_series(&chart).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
        let png = render_histograms(&sc.histogram_chart(&HistogramSettings::default())).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
    }

    #[test]
    fn single_data_column() {
        let dir = tempfile::tempdir().unwrap();
        let sc = counts_from(&dir, "DS 0 3\nDS 0 6\nDS 0 4\n");
        let chart = sc.time_series_chart(&TimeSeriesSettings::plain());
        assert!(chart.channels.series.is_empty());
        let png = render_time_series(&chart).unwrap();
        assert!(has_color(&png, COINCIDENCE_COLOR));
        let hist = sc.histogram_chart(&HistogramSettings::default());
        assert_eq!(hist.panels.len(), 1);
        assert!(not_all_white(&render_histograms(&hist).unwrap()));
    }

    #[test]
    fn histogram_bars_outside_the_range_are_not_drawn() {
        let sc = fixture();
        let mut hist = sc.histogram_chart(&HistogramSettings::default());
        // the fixture channels are around 200 counts per second
        hist.panels.truncate(1);
        hist.panels[0].x_range = (0., 100.);
        assert!(hist.panels[0].histogram.visible_bins((0., 100.)).is_empty());
        let mut pixels = vec![0u8; (hist.size.0 * hist.size.1 * 3) as usize];
        draw_histograms(&hist, &mut pixels, false).unwrap();
        assert!(pixels.iter().all(|v| *v == 255));

        hist.panels[0].x_range = crate::CHANNEL_XLIM;
        draw_histograms(&hist, &mut pixels, false).unwrap();
        assert!(pixels.iter().any(|v| *v != 255));
    }

    #[test]
    fn missing_directory_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ts_path = dir.path().join("ts.png");
        let hist_path = dir.path().join("missing").join("hist.png");
        let sc = fixture();
        let mut sink = PngSink::new(&ts_path).with_histograms(&hist_path);
        sink.time_series(&sc.time_series_chart(&TimeSeriesSettings::plain()))
            .unwrap();
        sink.histograms(&sc.histogram_chart(&HistogramSettings::default()))
            .unwrap();
        let err = sink.finish().unwrap_err();
        assert!(matches!(err, ScalerError::OutputPath(_)));
        assert!(!ts_path.exists());
    }

    #[test]
    fn time_series_only_sink_rejects_histograms() {
        let sc = fixture();
        let mut sink = PngSink::new("ts.png");
        let err = sink
            .histograms(&sc.histogram_chart(&HistogramSettings::default()))
            .unwrap_err();
        assert!(matches!(err, ScalerError::Plot(_)));
    }
}
