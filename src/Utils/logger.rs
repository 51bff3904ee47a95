use crate::numerical::optimization::fit_errors::FitError;
use chrono::Local;
use csv::WriterBuilder;
use simplelog::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// map user-facing level names to a filter; "off" and "none" disable logging
pub fn parse_log_level(level: Option<&str>) -> Result<LevelFilter, FitError> {
    match level {
        None => Ok(LevelFilter::Info),
        Some("debug") => Ok(LevelFilter::Debug),
        Some("info") => Ok(LevelFilter::Info),
        Some("warn") => Ok(LevelFilter::Warn),
        Some("error") => Ok(LevelFilter::Error),
        Some("off") | Some("none") => Ok(LevelFilter::Off),
        Some(other) => Err(FitError::Config(format!(
            "loglevel must be debug, info, warn, error or off, got '{}'",
            other
        ))),
    }
}

/// log file name with the current date and time
pub fn timestamped_log_name() -> PathBuf {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    PathBuf::from(format!("log_{}.txt", date_and_time))
}

/// Terminal logger, plus a file logger when `log_file` is given.
/// A logger may be installed only once per process; later calls are ignored.
pub fn init_logger(level: Option<&str>, log_file: Option<&Path>) -> Result<(), FitError> {
    let log_option = parse_log_level(level)?;
    if log_option == LevelFilter::Off {
        return Ok(());
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(
            log_option,
            Config::default(),
            File::create(path)?,
        ));
    }
    if CombinedLogger::init(loggers).is_err() {
        log::debug!("logger already initialized");
    }
    Ok(())
}

/// What goes into the exported fit report
pub struct FitReportRows<'a> {
    pub model_name: &'a str,
    pub formula: &'a str,
    pub param_names: &'a [String],
    pub params: &'a [f64],
    pub r_squared: f64,
    pub x_data: &'a [f64],
    pub y_data: &'a [f64],
    pub y_fit: &'a [f64],
}

/// Write the fit report: header lines, fitted parameters, R-squared, then an X,Y,Y_fit table
pub fn write_fit_report_csv<W: Write>(writer: W, report: &FitReportRows) -> Result<(), FitError> {
    let mut wtr = WriterBuilder::new().flexible(true).from_writer(writer);
    wtr.write_record(["Curve Fitting Results"])?;
    wtr.write_record([format!("Model: {}", report.model_name)])?;
    wtr.write_record([format!("Formula: {}", report.formula)])?;
    wtr.write_record([""])?;
    wtr.write_record(["Fitted Parameters:"])?;
    for (name, value) in report.param_names.iter().zip(report.params.iter()) {
        wtr.write_record([name.clone(), value.to_string()])?;
    }
    wtr.write_record([""])?;
    wtr.write_record(["R-squared".to_string(), report.r_squared.to_string()])?;
    wtr.write_record([""])?;
    wtr.write_record(["X", "Y", "Y_fit"])?;
    for ((x, y), y_fit) in report
        .x_data
        .iter()
        .zip(report.y_data.iter())
        .zip(report.y_fit.iter())
    {
        wtr.write_record([x.to_string(), y.to_string(), y_fit.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_fit_report_csv(path: &Path, report: &FitReportRows) -> Result<(), FitError> {
    let file = File::create(path)?;
    write_fit_report_csv(file, report)
}
