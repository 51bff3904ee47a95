//! settings of the fitting routines and of the command line task, read from TOML
//!
//! ```toml
//! [optimizer]
//! max_iterations = 100
//! lambda = 0.01
//! gradient_tolerance = 1e-10   # optional, enables early exit
//! damping = "fixed"            # or "adaptive"
//!
//! [prediction]
//! divisions = 100
//!
//! [logging]
//! level = "info"
//! file = "fit.log"             # optional
//!
//! [task]
//! model = "michaelis_menten"
//! data = "0.5,8.5\n1,15.5\n2,25.1"   # or data_file = "data.csv"
//! initial_guess = [100.0, 10.0]
//! csv_output = "fit.csv"
//! plot_output = "fit.png"
//! compare_models = false
//! ```
//! Every key is optional, missing keys get the defaults of the fitting routines.
use crate::numerical::optimization::LM_fixed_damping::{DampingStrategy, LevenbergMarquardt};
use crate::numerical::optimization::fit_errors::FitError;
use crate::numerical::optimization::prediction::PredictionSampler;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub max_iterations: usize,
    pub lambda: f64,
    pub gradient_tolerance: Option<f64>,
    pub damping: DampingStrategy,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_iterations: LevenbergMarquardt::DEFAULT_PATIENCE,
            lambda: LevenbergMarquardt::DEFAULT_LAMBDA,
            gradient_tolerance: None,
            damping: DampingStrategy::Fixed,
        }
    }
}

impl OptimizerConfig {
    pub fn optimizer(&self) -> LevenbergMarquardt {
        let lm = LevenbergMarquardt::new()
            .with_patience(self.max_iterations)
            .with_lambda(self.lambda)
            .with_damping(self.damping);
        match self.gradient_tolerance {
            Some(gtol) => lm.with_gtol(gtol),
            None => lm,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    pub divisions: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            divisions: PredictionSampler::DEFAULT_DIVISIONS,
        }
    }
}

impl PredictionConfig {
    pub fn sampler(&self) -> PredictionSampler {
        PredictionSampler::with_divisions(self.divisions)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitConfig {
    pub optimizer: OptimizerConfig,
    pub prediction: PredictionConfig,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Inline(String),
    File(PathBuf),
}

/// what the command line driver should do
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    pub model: String,
    pub data: DataSource,
    pub initial_guess: Option<Vec<f64>>,
    pub csv_output: Option<PathBuf>,
    pub plot_output: Option<PathBuf>,
    pub compare_models: bool,
    pub fit: FitConfig,
}

////////////////////////////////////FIELD READERS//////////////////////////////////////////

fn config_error(section: &str, key: &str, expected: &str) -> FitError {
    FitError::Config(format!("[{}] {} must be {}", section, key, expected))
}

fn section<'a>(table: &'a Table, name: &str) -> Result<Option<&'a Table>, FitError> {
    match table.get(name) {
        None => Ok(None),
        Some(Value::Table(t)) => Ok(Some(t)),
        Some(_) => Err(FitError::Config(format!("[{}] must be a table", name))),
    }
}

fn get_float(t: &Table, section: &str, key: &str) -> Result<Option<f64>, FitError> {
    match t.get(key) {
        None => Ok(None),
        Some(Value::Float(f)) => Ok(Some(*f)),
        Some(Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(_) => Err(config_error(section, key, "a number")),
    }
}

fn get_positive_int(t: &Table, section: &str, key: &str) -> Result<Option<usize>, FitError> {
    match t.get(key) {
        None => Ok(None),
        Some(Value::Integer(i)) if *i > 0 => Ok(Some(*i as usize)),
        Some(_) => Err(config_error(section, key, "a positive integer")),
    }
}

fn get_str<'a>(t: &'a Table, section: &str, key: &str) -> Result<Option<&'a str>, FitError> {
    match t.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(config_error(section, key, "a string")),
    }
}

fn get_bool(t: &Table, section: &str, key: &str) -> Result<Option<bool>, FitError> {
    match t.get(key) {
        None => Ok(None),
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Err(config_error(section, key, "true or false")),
    }
}

fn get_float_array(t: &Table, section: &str, key: &str) -> Result<Option<Vec<f64>>, FitError> {
    match t.get(key) {
        None => Ok(None),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v {
                Value::Float(f) => Ok(*f),
                Value::Integer(i) => Ok(*i as f64),
                _ => Err(config_error(section, key, "an array of numbers")),
            })
            .collect::<Result<Vec<f64>, FitError>>()
            .map(Some),
        Some(_) => Err(config_error(section, key, "an array of numbers")),
    }
}

fn parse_table(text: &str) -> Result<Table, FitError> {
    text.parse::<Table>()
        .map_err(|e| FitError::Config(e.to_string()))
}

//////////////////////////////////////////PARSING///////////////////////////////////////////

impl FitConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, FitError> {
        let table = parse_table(text)?;
        Self::from_table(&table)
    }

    pub fn from_file(path: &Path) -> Result<Self, FitError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn from_table(table: &Table) -> Result<Self, FitError> {
        let mut config = FitConfig::default();
        if let Some(t) = section(table, "optimizer")? {
            let s = "optimizer";
            if let Some(n) = get_positive_int(t, s, "max_iterations")? {
                config.optimizer.max_iterations = n;
            }
            if let Some(lambda) = get_float(t, s, "lambda")? {
                if !(lambda >= 0.0) {
                    return Err(config_error(s, "lambda", "a non-negative number"));
                }
                config.optimizer.lambda = lambda;
            }
            if let Some(gtol) = get_float(t, s, "gradient_tolerance")? {
                if !(gtol >= 0.0) {
                    return Err(config_error(s, "gradient_tolerance", "a non-negative number"));
                }
                config.optimizer.gradient_tolerance = Some(gtol);
            }
            config.optimizer.damping = match get_str(t, s, "damping")? {
                None | Some("fixed") => DampingStrategy::Fixed,
                Some("adaptive") => DampingStrategy::adaptive(),
                Some(_) => return Err(config_error(s, "damping", "\"fixed\" or \"adaptive\"")),
            };
        }
        if let Some(t) = section(table, "prediction")? {
            if let Some(n) = get_positive_int(t, "prediction", "divisions")? {
                config.prediction.divisions = n;
            }
        }
        if let Some(t) = section(table, "logging")? {
            config.log_level = get_str(t, "logging", "level")?.map(|s| s.to_string());
            config.log_file = get_str(t, "logging", "file")?.map(PathBuf::from);
        }
        Ok(config)
    }
}

impl TaskConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, FitError> {
        let table = parse_table(text)?;
        let fit = FitConfig::from_table(&table)?;
        let t = section(&table, "task")?
            .ok_or_else(|| FitError::Config("[task] section is missing".to_string()))?;
        let s = "task";
        let model = get_str(t, s, "model")?
            .ok_or_else(|| config_error(s, "model", "given"))?
            .to_string();
        let data = match (get_str(t, s, "data")?, get_str(t, s, "data_file")?) {
            (Some(text), None) => DataSource::Inline(text.to_string()),
            (None, Some(path)) => DataSource::File(PathBuf::from(path)),
            _ => return Err(config_error(s, "data or data_file", "given (exactly one of them)")),
        };
        Ok(TaskConfig {
            model,
            data,
            initial_guess: get_float_array(t, s, "initial_guess")?,
            csv_output: get_str(t, s, "csv_output")?.map(PathBuf::from),
            plot_output: get_str(t, s, "plot_output")?.map(PathBuf::from),
            compare_models: get_bool(t, s, "compare_models")?.unwrap_or(false),
            fit,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, FitError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// data text, read from disk for [`DataSource::File`]; relative paths are
    /// resolved against `base_dir` when given
    pub fn data_text(&self, base_dir: Option<&Path>) -> Result<String, FitError> {
        match &self.data {
            DataSource::Inline(text) => Ok(text.clone()),
            DataSource::File(path) => {
                let path = match base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                Ok(std::fs::read_to_string(path)?)
            }
        }
    }
}
