use crate::chart::*;
use crate::error::ScalerError;
use crate::matrix::CountMatrix;
use crate::utils::*;
use chrono::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
pub mod browser;
pub mod chart;
mod cli;
pub mod error;
pub mod matrix;
pub mod png;
pub mod scaler_plot;
pub mod scaler_rolling;
pub mod utils;

// constants
pub const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
pub const RECORD_MARKER: &str = "DS";
pub const TIME_SERIES_PNG: &str = "output_time_series_with_coincidences.png";
pub const HISTOGRAMS_PNG: &str = "output_histograms.png";
pub const TIME_SERIES_SIZE: (u32, u32) = (1000, 800);
pub const HISTOGRAMS_SIZE: (u32, u32) = (800, 1200);
pub const PLAIN_CHANNELS_YLIM: (f64, f64) = (150., 400.);
pub const PLAIN_COINCIDENCE_YLIM: (f64, f64) = (0., 3.);
pub const ROLLING_CHANNELS_YLIM: (f64, f64) = (150., 350.);
pub const ROLLING_COINCIDENCE_YLIM: (f64, f64) = (0., 6.);
pub const CHANNEL_BINS: usize = 3820;
pub const CHANNEL_XLIM: (f64, f64) = (150., 275.);
pub const COINCIDENCE_BINS: usize = 5850;
pub const COINCIDENCE_XLIM: (f64, f64) = (0., 3.);

/// The main struct for the scaler counts:
/// one timestamp per record, one minute apart, and the counts per second.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerCounts {
    pub time: Vec<NaiveDateTime>,
    pub counts: CountMatrix,
}

impl ScalerCounts {
    /// Read the scaler log, with the start datetime taken from the file name.
    /// Everything is validated here, before any chart is drawn.
    pub fn from_file<P>(fin: P) -> Result<ScalerCounts, ScalerError>
    where
        P: AsRef<Path>,
    {
        let fin = fin.as_ref();
        if !fin.is_file() {
            return Err(ScalerError::FileNotFound(fin.to_path_buf()));
        }
        let start = datetime_from_filename(fin)?;
        log::debug!("start datetime from file name: {}", start);
        let counts = CountMatrix::from_file(fin)?;
        let time = minute_timestamps(start, counts.len())?;
        Ok(ScalerCounts { time, counts })
    }

    /// Replace the channel counts with their trailing moving average.
    pub fn smooth(&mut self, window: usize) -> Result<(), ScalerError> {
        self.counts = self.counts.smooth(window)?;
        Ok(())
    }

    fn series(&self, c: usize, color: Rgb) -> Series {
        Series {
            label: self.counts.labels[c].clone(),
            color,
            points: self
                .time
                .iter()
                .zip(self.counts.rows.iter())
                .map(|(t, r)| (*t, r[c]))
                .collect(),
        }
    }

    /// Channels on the top panel, coincidences on the bottom one.
    pub fn time_series_chart(&self, settings: &TimeSeriesSettings) -> TimeSeriesChart {
        let last = self.counts.coincidence_index();
        let channels = Panel {
            title: settings.channels_title.clone(),
            y_desc: String::from("Counts per Second"),
            y_range: settings.channels_ylim,
            series: (0..last).map(|c| self.series(c, channel_color(c))).collect(),
        };
        let coincidence = Panel {
            title: String::from("Coincidences per Second"),
            y_desc: String::from("Coincidences"),
            y_range: settings.coincidence_ylim,
            series: vec![self.series(last, COINCIDENCE_COLOR)],
        };
        TimeSeriesChart {
            x_desc: String::from("Time"),
            size: TIME_SERIES_SIZE,
            channels,
            coincidence,
        }
    }

    /// One histogram per column, the coincidence column with its own bins and range.
    pub fn histogram_chart(&self, settings: &HistogramSettings) -> HistogramChart {
        let last = self.counts.coincidence_index();
        let panels = (0..=last)
            .map(|c| {
                let (title, bins, x_range) = if c < last {
                    (
                        format!("Histogram of scaler count for ch{}", c),
                        settings.channel_bins,
                        settings.channel_xlim,
                    )
                } else {
                    (
                        String::from("Histogram for coincidence"),
                        settings.coincidence_bins,
                        settings.coincidence_xlim,
                    )
                };
                HistogramPanel {
                    title,
                    x_desc: String::from("Counts per Second"),
                    y_desc: String::from("Frequency"),
                    x_range,
                    color: HISTOGRAM_COLOR,
                    histogram: Histogram::from_values(&self.counts.column(c), bins),
                }
            })
            .collect();
        HistogramChart {
            size: HISTOGRAMS_SIZE,
            panels,
        }
    }

    /// Write the datetime and the counts per second as csv.
    /// Use ISO 8601 for datetime.
    pub fn write_csv<W: Write>(&self, w: W) -> Result<(), ScalerError> {
        let mut buf = BufWriter::new(w);
        writeln!(buf, "datetime,{}", self.counts.labels.join(","))?;
        for (t, r) in self.time.iter().zip(self.counts.rows.iter()) {
            let values: Vec<String> = r.iter().map(|v| v.to_string()).collect();
            writeln!(buf, "{},{}", t.format("%Y-%m-%dT%H:%M:%S"), values.join(","))?;
        }
        buf.flush()?;
        Ok(())
    }

    /// Write the csv to a file at the given path.
    pub fn to_csv<P>(&self, fout: P) -> Result<(), ScalerError>
    where
        P: AsRef<Path>,
    {
        self.write_csv(File::create(fout)?)
    }
}

impl fmt::Display for ScalerCounts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "datetime\t{}", self.counts.labels.join("\t"))?;
        for (t, r) in self.time.iter().zip(self.counts.rows.iter()) {
            let values: Vec<String> = r.iter().map(|v| format!("{:.3}", v)).collect();
            writeln!(f, "{}\t{}", t, values.join("\t"))?;
        }
        Ok(())
    }
}

/// Read, optionally smooth, and hand the charts to the sink.
/// The histograms are only produced when settings for them are given.
/// Nothing is written until every chart is accepted and every output path is checked.
pub fn run<P, S>(
    fin: P,
    window: Option<usize>,
    ts_settings: &TimeSeriesSettings,
    hist_settings: Option<&HistogramSettings>,
    csvout: Option<&Path>,
    sink: &mut S,
) -> Result<ScalerCounts, ScalerError>
where
    P: AsRef<Path>,
    S: ChartSink + ?Sized,
{
    log::info!("> read scaler records from {}", fin.as_ref().display());
    let mut sc = ScalerCounts::from_file(fin)?;
    if let Some(w) = window {
        log::info!("> apply trailing moving average, window of {} records", w);
        sc.smooth(w)?;
    }
    log::debug!("\n{}", sc);
    let csv = match csvout {
        Some(p) => {
            check_output_path(p)?;
            let mut bytes = Vec::new();
            sc.write_csv(&mut bytes)?;
            Some((p, bytes))
        }
        None => None,
    };
    let ts = sc.time_series_chart(ts_settings);
    let hist = hist_settings.map(|s| sc.histogram_chart(s));
    sink.time_series(&ts)?;
    if let Some(h) = hist {
        sink.histograms(&h)?;
    }
    sink.finish()?;
    if let Some((p, bytes)) = csv {
        log::info!("> save counts to {}", p.display());
        std::fs::write(p, bytes)?;
    }
    Ok(sc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Default)]
    struct KeepCharts {
        time_series: Vec<TimeSeriesChart>,
        histograms: Vec<HistogramChart>,
        finished: bool,
    }

    impl ChartSink for KeepCharts {
        fn time_series(&mut self, chart: &TimeSeriesChart) -> Result<(), ScalerError> {
            self.time_series.push(chart.clone());
            Ok(())
        }
        fn histograms(&mut self, chart: &HistogramChart) -> Result<(), ScalerError> {
            self.histograms.push(chart.clone());
            Ok(())
        }
        fn finish(&mut self) -> Result<(), ScalerError> {
            self.finished = true;
            Ok(())
        }
    }

    /// Accepts the time series, then fails on the histograms.
    #[derive(Default)]
    struct FailingHistograms {
        finished: bool,
    }

    impl ChartSink for FailingHistograms {
        fn time_series(&mut self, _: &TimeSeriesChart) -> Result<(), ScalerError> {
            Ok(())
        }
        fn histograms(&mut self, _: &HistogramChart) -> Result<(), ScalerError> {
            Err(ScalerError::Plot(String::from("histograms failed")))
        }
        fn finish(&mut self) -> Result<(), ScalerError> {
            self.finished = true;
            Ok(())
        }
    }

    fn rate(raw: u64) -> f64 {
        (raw * 16) as f64 / 60.
    }

    fn write_log(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn read_fixture() {
        let sc = ScalerCounts::from_file("./test/29082024_1023_output.txt").unwrap();
        assert_eq!(sc.time.len(), sc.counts.len());
        assert_eq!(sc.counts.len(), 12);
        assert_eq!(sc.counts.width(), 5);
        assert_eq!(sc.time[0].to_string(), "2024-08-29 10:23:00");
        assert_eq!(sc.time[11].to_string(), "2024-08-29 10:34:00");
        sc.time
            .windows(2)
            .for_each(|w| assert_eq!(w[1] - w[0], chrono::Duration::minutes(1)));
    }

    #[test]
    fn missing_file() {
        let err = ScalerCounts::from_file("./test/01012024_0000_missing.txt").unwrap_err();
        assert!(matches!(err, ScalerError::FileNotFound(_)));
    }

    #[test]
    fn filename_without_underscore_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_log(&dir, "290820241023.txt", "DS 0A 1B 2C\n");
        let mut sink = KeepCharts::default();
        let err = run(&p, None, &TimeSeriesSettings::plain(), None, None, &mut sink).unwrap_err();
        assert!(matches!(err, ScalerError::FilenameFormat { .. }));
        assert!(sink.time_series.is_empty());
    }

    #[test]
    fn no_records_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_log(&dir, "29082024_1023_output.txt", "XX 0A 1B 2C\n");
        let mut sink = KeepCharts::default();
        let hs = HistogramSettings::default();
        let err = run(&p, None, &TimeSeriesSettings::plain(), Some(&hs), None, &mut sink)
            .unwrap_err();
        assert!(matches!(err, ScalerError::NoRecordsFound(_)));
        assert!(sink.time_series.is_empty());
        assert!(sink.histograms.is_empty());
        assert!(!sink.finished);
    }

    #[test]
    fn plain_run_builds_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_log(
            &dir,
            "29082024_1023_output.txt",
            "DS 0A 1B 2C 3\nDS 0A 1C 2D 4\nDS 0A 1D 2E 5\n",
        );
        let mut sink = KeepCharts::default();
        let hs = HistogramSettings::default();
        run(&p, None, &TimeSeriesSettings::plain(), Some(&hs), None, &mut sink).unwrap();
        assert!(sink.finished);

        assert_eq!(sink.time_series.len(), 1);
        let ts = &sink.time_series[0];
        assert_eq!(ts.channels.y_range, (150., 400.));
        assert_eq!(ts.coincidence.y_range, (0., 3.));
        assert_eq!(ts.channels.series.len(), 2);
        assert_eq!(ts.channels.series[1].label, "Column 2");
        assert_eq!(ts.coincidence.series.len(), 1);
        let coinc = &ts.coincidence.series[0];
        assert_eq!(coinc.label, "Column 3");
        assert_eq!(coinc.color, COINCIDENCE_COLOR);
        assert_eq!(coinc.points[2].1, rate(5));
        assert_eq!(coinc.points[2].0.to_string(), "2024-08-29 10:25:00");

        assert_eq!(sink.histograms.len(), 1);
        let h = &sink.histograms[0];
        assert_eq!(h.panels.len(), 3);
        assert_eq!(h.panels[0].title, "Histogram of scaler count for ch0");
        assert_eq!(h.panels[0].histogram.counts.len(), 3820);
        assert_eq!(h.panels[0].x_range, (150., 275.));
        assert_eq!(h.panels[2].title, "Histogram for coincidence");
        assert_eq!(h.panels[2].histogram.counts.len(), 5850);
        assert_eq!(h.panels[2].x_range, (0., 3.));
        assert!(h.panels.iter().all(|p| p.histogram.total() == 3));
    }

    #[test]
    fn rolling_run_smooths_channels_only() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_log(
            &dir,
            "01092024_2359_night.txt",
            "DS 0 3C 3C 1\nDS 0 78 78 2\nDS 0 B4 B4 3\n",
        );
        let csv = dir.path().join("smooth.csv");
        let mut sink = KeepCharts::default();
        let sc = run(
            &p,
            Some(2),
            &TimeSeriesSettings::rolling(),
            None,
            Some(csv.as_path()),
            &mut sink,
        )
        .unwrap();
        assert_eq!(sc.counts.column(0), vec![16., 24., 40.]);
        assert_eq!(sc.counts.column(2), vec![rate(1), rate(2), rate(3)]);
        assert!(sink.histograms.is_empty());
        let ts = &sink.time_series[0];
        assert_eq!(ts.channels.y_range, (150., 350.));
        assert_eq!(ts.coincidence.y_range, (0., 6.));
        assert!(ts.channels.title.ends_with("with Rolling Window"));
        assert_eq!(ts.channels.series[0].points[1].0.to_string(), "2024-09-02 00:00:00");

        let written = std::fs::read_to_string(&csv).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("datetime,Column 1,Column 2,Column 3"));
        assert_eq!(
            lines.next(),
            Some(format!("2024-09-01T23:59:00,16,16,{}", rate(1)).as_str())
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn rolling_run_rejects_zero_window() {
        let mut sink = KeepCharts::default();
        let err = run(
            "./test/29082024_1023_output.txt",
            Some(0),
            &TimeSeriesSettings::rolling(),
            None,
            None,
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, ScalerError::InvalidWindowSize(_)));
        assert!(sink.time_series.is_empty());
    }

    #[test]
    fn single_data_column_is_coincidence() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_log(&dir, "29082024_1023.txt", "DS 0 3\nDS 0 6\n");
        let sc = ScalerCounts::from_file(&p).unwrap();
        let ts = sc.time_series_chart(&TimeSeriesSettings::plain());
        assert!(ts.channels.series.is_empty());
        assert_eq!(ts.coincidence.series[0].points.len(), 2);
        let h = sc.histogram_chart(&HistogramSettings::default());
        assert_eq!(h.panels.len(), 1);
        assert_eq!(h.panels[0].title, "Histogram for coincidence");
    }

    #[test]
    fn failing_chart_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("counts.csv");
        let mut sink = FailingHistograms::default();
        let hs = HistogramSettings::default();
        let err = run(
            "./test/29082024_1023_output.txt",
            None,
            &TimeSeriesSettings::plain(),
            Some(&hs),
            Some(csv.as_path()),
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, ScalerError::Plot(_)));
        assert!(!sink.finished);
        assert!(!csv.exists());
    }

    #[test]
    fn bad_csv_path_writes_no_chart() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("missing").join("counts.csv");
        let mut sink = KeepCharts::default();
        let err = run(
            "./test/29082024_1023_output.txt",
            None,
            &TimeSeriesSettings::plain(),
            None,
            Some(csv.as_path()),
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, ScalerError::OutputPath(_)));
        assert!(sink.time_series.is_empty());
        assert!(!sink.finished);
    }

    #[test]
    fn bad_histogram_path_leaves_no_png() {
        let dir = tempfile::tempdir().unwrap();
        let ts_path = dir.path().join("ts.png");
        let csv = dir.path().join("counts.csv");
        let mut sink =
            png::PngSink::new(&ts_path).with_histograms(dir.path().join("missing").join("h.png"));
        let hs = HistogramSettings::default();
        let err = run(
            "./test/29082024_1023_output.txt",
            None,
            &TimeSeriesSettings::plain(),
            Some(&hs),
            Some(csv.as_path()),
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, ScalerError::OutputPath(_)));
        assert!(!ts_path.exists());
        assert!(!csv.exists());
    }

    #[test]
    fn csv_file_has_header_and_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("counts.csv");
        let sc = ScalerCounts::from_file("./test/29082024_1023_output.txt").unwrap();
        sc.to_csv(&csv).unwrap();
        let written = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(written.lines().count(), 13);
        assert!(written.starts_with("datetime,Column 1,Column 2,Column 3,Column 4,Column 5\n"));
        assert!(written.lines().last().unwrap().starts_with("2024-08-29T10:34:00,"));
    }

    #[test]
    fn display_has_one_line_per_record() {
        let sc = ScalerCounts::from_file("./test/29082024_1023_output.txt").unwrap();
        let s = sc.to_string();
        assert_eq!(s.lines().count(), sc.counts.len() + 1);
        assert!(s.starts_with("datetime\tColumn 1"));
    }
}
