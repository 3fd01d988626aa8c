use crate::chart::*;
use crate::error::ScalerError;
use plotly::common::{Marker, MarkerSymbol, Mode, Title};
use plotly::layout::{Annotation, Axis, GridPattern, LayoutGrid};
use plotly::{Bar, Layout, Plot, Scatter};

/// Show the charts interactively, nothing is written next to the data.
#[derive(Debug, Clone, Default)]
pub struct BrowserSink;

fn css((r, g, b): Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn add_panel(plot: &mut Plot, panel: &Panel, x_axis: &str, y_axis: &str) {
    for series in panel.series.iter() {
        let x: Vec<String> = series
            .points
            .iter()
            .map(|(t, _)| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .collect();
        let y: Vec<f64> = series.points.iter().map(|(_, v)| *v).collect();
        let trace = Scatter::new(x, y)
            .name(&series.label)
            .mode(Mode::LinesMarkers)
            .marker(
                Marker::new()
                    .symbol(MarkerSymbol::Cross)
                    .color(css(series.color)),
            )
            .x_axis(x_axis)
            .y_axis(y_axis);
        plot.add_trace(trace);
    }
}

/// Title over a grid row, the row given by its y axis.
fn panel_title(panel: &Panel, y_axis: &str) -> Annotation {
    Annotation::new()
        .text(panel.title.as_str())
        .show_arrow(false)
        .x_ref("paper")
        .x(0.5)
        .y_ref(format!("{} domain", y_axis).as_str())
        .y(1.05)
}

/// Both time series panels in one figure, on the same time axis,
/// each with its own title and y range.
pub fn time_series_plot(chart: &TimeSeriesChart) -> Plot {
    let mut plot = Plot::new();
    add_panel(&mut plot, &chart.channels, "x", "y");
    add_panel(&mut plot, &chart.coincidence, "x", "y2");
    let (ch_min, ch_max) = chart.channels.y_range;
    let (co_min, co_max) = chart.coincidence.y_range;
    let layout = Layout::new()
        .width(chart.size.0 as usize)
        .height(chart.size.1 as usize)
        .grid(
            LayoutGrid::new()
                .rows(2)
                .columns(1)
                .pattern(GridPattern::Coupled),
        )
        .annotations(vec![
            panel_title(&chart.channels, "y"),
            panel_title(&chart.coincidence, "y2"),
        ])
        .x_axis(Axis::new().title(Title::new(&chart.x_desc)))
        .y_axis(
            Axis::new()
                .title(Title::new(&chart.channels.y_desc))
                .range(vec![ch_min, ch_max]),
        )
        .y_axis2(
            Axis::new()
                .title(Title::new(&chart.coincidence.y_desc))
                .range(vec![co_min, co_max]),
        );
    plot.set_layout(layout);
    plot
}

/// One figure per histogram panel.
pub fn histogram_plots(chart: &HistogramChart) -> Vec<Plot> {
    chart
        .panels
        .iter()
        .map(|panel| {
            let bars = panel.histogram.visible_bins(panel.x_range);
            let x: Vec<f64> = bars.iter().map(|(l, r, _)| (l + r) / 2.).collect();
            let y: Vec<usize> = bars.iter().map(|(_, _, n)| *n).collect();
            let mut plot = Plot::new();
            plot.add_trace(
                Bar::new(x, y)
                    .name(&panel.title)
                    .opacity(HISTOGRAM_ALPHA)
                    .marker(Marker::new().color(css(panel.color))),
            );
            let (xmin, xmax) = panel.x_range;
            let layout = Layout::new()
                .title(Title::new(&panel.title))
                .bar_gap(0.)
                .x_axis(
                    Axis::new()
                        .title(Title::new(&panel.x_desc))
                        .range(vec![xmin, xmax]),
                )
                .y_axis(Axis::new().title(Title::new(&panel.y_desc)));
            plot.set_layout(layout);
            plot
        })
        .collect()
}

impl ChartSink for BrowserSink {
    fn time_series(&mut self, chart: &TimeSeriesChart) -> Result<(), ScalerError> {
        log::info!("> show time series");
        time_series_plot(chart).show();
        Ok(())
    }

    fn histograms(&mut self, chart: &HistogramChart) -> Result<(), ScalerError> {
        log::info!("> show {} histograms", chart.panels.len());
        histogram_plots(chart).iter().for_each(|p| p.show());
        Ok(())
    }
}
