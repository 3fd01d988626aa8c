use crate::error::ScalerError;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Parse the arguments without exiting on errors, only help and version exit (with 0).
pub(crate) fn try_matches<I, T>(cmd: Command, args: I) -> Result<ArgMatches, ScalerError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match cmd.try_get_matches_from(args) {
        Ok(m) => Ok(m),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let msg = e.to_string();
            Err(ScalerError::ArgumentCount(
                msg.trim_start_matches("error: ").trim_end().to_owned(),
            ))
        }
    }
}

pub(crate) fn arg_file_path() -> Arg {
    Arg::new("file_path")
        .help("scaler log, named as ddmmyyyy_HHMM<anything> after the acquisition start")
        .index(1)
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

pub(crate) fn arg_range(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .help(help)
        .long(id)
        .num_args(2)
        .value_names(["MIN", "MAX"])
        .allow_hyphen_values(true)
        .value_parser(value_parser!(f64))
}

pub(crate) fn arg_csvout() -> Arg {
    Arg::new("csvout")
        .help("also save the counts per second to this csv file")
        .long("csvout")
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
}

pub(crate) fn arg_verbose() -> Arg {
    Arg::new("verbose")
        .help("print verbose information")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
}

/// The MIN MAX pair of a range argument, or the default when it is not given.
pub(crate) fn get_range(
    m: &ArgMatches,
    id: &str,
    default: (f64, f64),
) -> Result<(f64, f64), ScalerError> {
    let values: Vec<f64> = match m.get_many::<f64>(id) {
        Some(v) => v.copied().collect(),
        None => return Ok(default),
    };
    match values[..] {
        [min, max] if min < max => Ok((min, max)),
        _ => Err(ScalerError::ArgumentCount(format!(
            "--{} requires MIN < MAX, got {:?}",
            id, values
        ))),
    }
}
