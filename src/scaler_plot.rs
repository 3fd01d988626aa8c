use super::VERSION;
use crate::chart::{HistogramSettings, TimeSeriesSettings};
use crate::cli::*;
use crate::error::ScalerError;
use clap::{value_parser, Arg, ArgAction, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Settings of the plain plot app: time series and histograms of the raw counts.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    pub file_path: PathBuf,
    pub time_series: TimeSeriesSettings,
    pub histograms: HistogramSettings,
    pub tsout: PathBuf,
    pub histout: PathBuf,
    pub show: bool,
    pub csvout: Option<PathBuf>,
    pub verbose: bool,
}

fn command() -> Command {
    let arg_channel_bins = Arg::new("channel_bins")
        .help("number of histogram bins for the channel counts")
        .long("channel_bins")
        .num_args(1)
        .value_parser(value_parser!(u64).range(1..))
        .default_value("3820");
    let arg_coincidence_bins = Arg::new("coincidence_bins")
        .help("number of histogram bins for the coincidences")
        .long("coincidence_bins")
        .num_args(1)
        .value_parser(value_parser!(u64).range(1..))
        .default_value("5850");
    let arg_tsout = Arg::new("tsout")
        .help("name of the output png file for the time series")
        .long("tsout")
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
        .default_value(crate::TIME_SERIES_PNG);
    let arg_histout = Arg::new("histout")
        .help("name of the output png file for the histograms")
        .long("histout")
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
        .default_value(crate::HISTOGRAMS_PNG);
    let arg_show = Arg::new("show")
        .help("show the charts interactively instead of saving them")
        .long("show")
        .action(ArgAction::SetTrue);
    Command::new("scaler_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot the scaler counts per second and their histograms")
        .arg(arg_file_path())
        .arg(arg_range("channels_ylim", "y range of the channel time series"))
        .arg(arg_range("coincidence_ylim", "y range of the coincidence time series"))
        .arg(arg_channel_bins)
        .arg(arg_coincidence_bins)
        .arg(arg_range("channel_xlim", "x range of the channel histograms"))
        .arg(arg_range("coincidence_xlim", "x range of the coincidence histogram"))
        .arg(arg_tsout)
        .arg(arg_histout)
        .arg(arg_show)
        .arg(arg_csvout())
        .arg(arg_verbose())
}

/// Takes the CLI arguments that control the plain plots.
pub fn parse_cli() -> Result<PlotArgs, ScalerError> {
    parse_cli_from(std::env::args_os())
}

/// It is safe to unwrap get_one when a default is given
/// because the default is used when no argument is passed.
pub fn parse_cli_from<I, T>(args: I) -> Result<PlotArgs, ScalerError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let m = try_matches(command(), args)?;
    let defaults = TimeSeriesSettings::plain();
    let time_series = TimeSeriesSettings {
        channels_ylim: get_range(&m, "channels_ylim", defaults.channels_ylim)?,
        coincidence_ylim: get_range(&m, "coincidence_ylim", defaults.coincidence_ylim)?,
        ..defaults
    };
    let histograms = HistogramSettings {
        channel_bins: *m.get_one::<u64>("channel_bins").unwrap() as usize,
        channel_xlim: get_range(&m, "channel_xlim", crate::CHANNEL_XLIM)?,
        coincidence_bins: *m.get_one::<u64>("coincidence_bins").unwrap() as usize,
        coincidence_xlim: get_range(&m, "coincidence_xlim", crate::COINCIDENCE_XLIM)?,
    };
    Ok(PlotArgs {
        file_path: m.get_one::<PathBuf>("file_path").unwrap().to_owned(),
        time_series,
        histograms,
        tsout: m.get_one::<PathBuf>("tsout").unwrap().to_owned(),
        histout: m.get_one::<PathBuf>("histout").unwrap().to_owned(),
        show: m.get_flag("show"),
        csvout: m.get_one::<PathBuf>("csvout").cloned(),
        verbose: m.get_flag("verbose"),
    })
}
