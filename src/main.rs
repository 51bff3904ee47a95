#![allow(non_snake_case)]
use SciMiniSuite::Utils::fit_config::TaskConfig;
use SciMiniSuite::Utils::logger::{init_logger, timestamped_log_name};
use SciMiniSuite::numerical::optimization::curve_fitting::FitSession;
use SciMiniSuite::numerical::optimization::fit_errors::FitError;
use SciMiniSuite::numerical::optimization::models::Model;
use log::error;
use std::error::Error;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

const USAGE: &str = "usage: sci_mini_suite <task.toml>\n       sci_mini_suite --models";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.first().map(|s| s.as_str()) {
        None | Some("-h") | Some("--help") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some("--models") => {
            list_models();
            Ok(())
        }
        Some(path) => run_task(Path::new(path)),
    };
    if let Err(e) = outcome {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn list_models() {
    let session = FitSession::new();
    let mut rows = vec![vec![
        "id".to_string(),
        "formula".to_string(),
        "default guess".to_string(),
    ]];
    for (id, model) in session.registry().iter() {
        rows.push(vec![
            id.to_string(),
            model.formula(),
            format!("{:?}", model.initial_params()),
        ]);
    }
    let mut table = Builder::from(rows).build();
    table.with(Style::modern_rounded());
    println!("{}", table);
}

fn run_task(path: &Path) -> Result<(), Box<dyn Error>> {
    let task = TaskConfig::from_file(path)?;
    let base_dir = path.parent();
    // "auto" asks for a timestamped log file
    let log_file: Option<PathBuf> = match task.fit.log_file.as_deref() {
        Some(p) if p == Path::new("auto") => Some(timestamped_log_name()),
        Some(p) => Some(resolve(base_dir, p)),
        None => None,
    };
    init_logger(task.fit.log_level.as_deref(), log_file.as_deref())?;

    let mut session = FitSession::new().with_config(task.fit.clone());
    session.select_model(&task.model)?;
    if let Some(guess) = task.initial_guess.clone() {
        session.set_initial_params(guess)?;
    }
    let text = task.data_text(base_dir)?;
    session.load_text(&text)?;
    session.fit()?;
    println!("{}", session.report_table()?);

    if let Some(csv_path) = &task.csv_output {
        session.save_csv(&resolve(base_dir, csv_path))?;
    }
    if let Some(plot_path) = &task.plot_output {
        session.save_plot(&resolve(base_dir, plot_path))?;
    }
    if task.compare_models {
        print_comparison(&session)?;
    }
    Ok(())
}

fn print_comparison(session: &FitSession) -> Result<(), FitError> {
    let comparisons = session.compare_models()?;
    let mut rows = vec![vec!["model".to_string(), "R-squared".to_string()]];
    for c in comparisons {
        rows.push(vec![c.model_id, format!("{:.4}", c.r_squared)]);
    }
    let mut table = Builder::from(rows).build();
    table.with(Style::modern_rounded());
    println!("{}", table);
    Ok(())
}

fn resolve(base_dir: Option<&Path>, path: &Path) -> PathBuf {
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
