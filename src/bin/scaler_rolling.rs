use anyhow::Result;
use scaler_lpp::browser::BrowserSink;
use scaler_lpp::chart::ChartSink;
use scaler_lpp::png::PngSink;
use scaler_lpp::run;
use scaler_lpp::scaler_rolling::parse_cli;

fn main() -> Result<()> {
    let args = parse_cli()?;
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("{:?}", args);

    let mut sink: Box<dyn ChartSink> = match args.pngout {
        Some(p) => Box::new(PngSink::new(p)),
        None => Box::new(BrowserSink),
    };
    run(
        &args.file_path,
        Some(args.window),
        &args.time_series,
        None,
        args.csvout.as_deref(),
        &mut *sink,
    )?;
    Ok(())
}
