//! In-memory chart descriptions.
//! They are built from the counts and handed to a ChartSink,
//! which writes them to file or displays them.

use crate::error::ScalerError;
use chrono::NaiveDateTime;

pub type Rgb = (u8, u8, u8);

/// Channel series colors, orange is left to the coincidences.
pub const CHANNEL_COLORS: [Rgb; 9] = [
    (31, 119, 180),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];
pub const COINCIDENCE_COLOR: Rgb = (255, 165, 0);
pub const HISTOGRAM_COLOR: Rgb = (31, 119, 180);
pub const HISTOGRAM_ALPHA: f64 = 0.5;

pub fn channel_color(c: usize) -> Rgb {
    CHANNEL_COLORS[c % CHANNEL_COLORS.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: Rgb,
    pub points: Vec<(NaiveDateTime, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub y_desc: String,
    pub y_range: (f64, f64),
    pub series: Vec<Series>,
}

/// Two stacked panels sharing the time axis:
/// the channel rates on top, the coincidences below.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesChart {
    pub x_desc: String,
    pub size: (u32, u32),
    pub channels: Panel,
    pub coincidence: Panel,
}

impl TimeSeriesChart {
    /// First and last time over all the series, None if there are no points.
    pub fn time_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let times: Vec<NaiveDateTime> = [&self.channels, &self.coincidence]
            .iter()
            .flat_map(|p| p.series.iter())
            .flat_map(|s| s.points.iter().map(|(t, _)| *t))
            .collect();
        crate::utils::min_and_max(times.iter())
    }
}

/// Fixed-count histogram with equal-width bins spanning the data range.
/// A constant series gets the range value +/- 0.5.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn from_values(values: &[f64], bins: usize) -> Histogram {
        let bins = bins.max(1);
        let (mut lo, mut hi) = crate::utils::min_and_max(values.iter()).unwrap_or((0., 1.));
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let step = (hi - lo) / bins as f64;
        let mut edges: Vec<f64> = (0..bins).map(|i| lo + i as f64 * step).collect();
        edges.push(hi);
        let mut counts = vec![0usize; bins];
        let norm = bins as f64 / (hi - lo);
        for v in values {
            let mut i = (((v - lo) * norm) as usize).min(bins - 1);
            // correct the rounding against the actual edges, the last bin is right inclusive
            if i > 0 && *v < edges[i] {
                i -= 1;
            } else if i + 1 < bins && *v >= edges[i + 1] {
                i += 1;
            }
            counts[i] += 1;
        }
        Histogram { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Bins as (left, right, count).
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(self.counts.iter())
            .map(|(e, n)| (e[0], e[1], *n))
    }

    /// Bins overlapping the range, with their edges clipped to it.
    pub fn visible_bins(&self, range: (f64, f64)) -> Vec<(f64, f64, usize)> {
        self.bins()
            .filter(|(l, r, _)| *r > range.0 && *l < range.1)
            .map(|(l, r, n)| (l.max(range.0), r.min(range.1), n))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPanel {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub x_range: (f64, f64),
    pub color: Rgb,
    pub histogram: Histogram,
}

/// One stacked histogram panel per column.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramChart {
    pub size: (u32, u32),
    pub panels: Vec<HistogramPanel>,
}

/// Y ranges of the time series panels, they differ between the raw and smoothed plots.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesSettings {
    pub channels_title: String,
    pub channels_ylim: (f64, f64),
    pub coincidence_ylim: (f64, f64),
}

impl TimeSeriesSettings {
    pub fn plain() -> TimeSeriesSettings {
        TimeSeriesSettings {
            channels_title: String::from("Counts per Second (without coincidences)"),
            channels_ylim: crate::PLAIN_CHANNELS_YLIM,
            coincidence_ylim: crate::PLAIN_COINCIDENCE_YLIM,
        }
    }

    pub fn rolling() -> TimeSeriesSettings {
        TimeSeriesSettings {
            channels_title: String::from(
                "Counts per Second (without coincidences) with Rolling Window",
            ),
            channels_ylim: crate::ROLLING_CHANNELS_YLIM,
            coincidence_ylim: crate::ROLLING_COINCIDENCE_YLIM,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSettings {
    pub channel_bins: usize,
    pub channel_xlim: (f64, f64),
    pub coincidence_bins: usize,
    pub coincidence_xlim: (f64, f64),
}

impl Default for HistogramSettings {
    fn default() -> HistogramSettings {
        HistogramSettings {
            channel_bins: crate::CHANNEL_BINS,
            channel_xlim: crate::CHANNEL_XLIM,
            coincidence_bins: crate::COINCIDENCE_BINS,
            coincidence_xlim: crate::COINCIDENCE_XLIM,
        }
    }
}

/// Consumer of the chart descriptions: write them to file, display them, or keep them.
/// Sinks writing files keep the rendered charts until finish,
/// which is only called once every chart has been accepted.
pub trait ChartSink {
    fn time_series(&mut self, chart: &TimeSeriesChart) -> Result<(), ScalerError>;
    fn histograms(&mut self, chart: &HistogramChart) -> Result<(), ScalerError>;
    fn finish(&mut self) -> Result<(), ScalerError> {
        Ok(())
    }
}
