use anyhow::Result;
use scaler_lpp::browser::BrowserSink;
use scaler_lpp::chart::ChartSink;
use scaler_lpp::png::PngSink;
use scaler_lpp::run;
use scaler_lpp::scaler_plot::parse_cli;

fn main() -> Result<()> {
    let args = parse_cli()?;
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("{:?}", args);

    let mut sink: Box<dyn ChartSink> = if args.show {
        Box::new(BrowserSink)
    } else {
        Box::new(PngSink::new(args.tsout).with_histograms(args.histout))
    };
    let sc = run(
        &args.file_path,
        None,
        &args.time_series,
        Some(&args.histograms),
        args.csvout.as_deref(),
        &mut *sink,
    )?;
    log::info!(
        "plotted {} records from {} to {}",
        sc.time.len(),
        sc.time.first().map(|t| t.to_string()).unwrap_or_default(),
        sc.time.last().map(|t| t.to_string()).unwrap_or_default(),
    );
    Ok(())
}
