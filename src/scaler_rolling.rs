use super::VERSION;
use crate::chart::TimeSeriesSettings;
use crate::cli::*;
use crate::error::ScalerError;
use clap::{value_parser, Arg, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Settings of the rolling app: time series smoothed by a trailing moving average.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingArgs {
    pub file_path: PathBuf,
    pub window: usize,
    pub time_series: TimeSeriesSettings,
    pub pngout: Option<PathBuf>,
    pub csvout: Option<PathBuf>,
    pub verbose: bool,
}

fn command() -> Command {
    let arg_window = Arg::new("window_size")
        .help("number of records in the trailing moving average window")
        .index(2)
        .required(true)
        .allow_negative_numbers(true)
        .value_parser(value_parser!(i64));
    let arg_pngout = Arg::new("pngout")
        .help("save the time series to this png file instead of showing it")
        .long("pngout")
        .num_args(1)
        .value_parser(value_parser!(PathBuf));
    Command::new("scaler_rolling")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to smooth and show the scaler counts per second")
        .arg(arg_file_path())
        .arg(arg_window)
        .arg(arg_range("channels_ylim", "y range of the channel time series"))
        .arg(arg_range("coincidence_ylim", "y range of the coincidence time series"))
        .arg(arg_pngout)
        .arg(arg_csvout())
        .arg(arg_verbose())
}

/// Takes the CLI arguments that control the smoothing and the plot.
pub fn parse_cli() -> Result<RollingArgs, ScalerError> {
    parse_cli_from(std::env::args_os())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<RollingArgs, ScalerError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let m = try_matches(command(), args)?;
    let given = *m.get_one::<i64>("window_size").unwrap();
    let window = usize::try_from(given)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| ScalerError::InvalidWindowSize(given.to_string()))?;
    let defaults = TimeSeriesSettings::rolling();
    let time_series = TimeSeriesSettings {
        channels_ylim: get_range(&m, "channels_ylim", defaults.channels_ylim)?,
        coincidence_ylim: get_range(&m, "coincidence_ylim", defaults.coincidence_ylim)?,
        ..defaults
    };
    Ok(RollingArgs {
        file_path: m.get_one::<PathBuf>("file_path").unwrap().to_owned(),
        window,
        time_series,
        pngout: m.get_one::<PathBuf>("pngout").cloned(),
        csvout: m.get_one::<PathBuf>("csvout").cloned(),
        verbose: m.get_flag("verbose"),
    })
}
