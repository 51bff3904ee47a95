//! Fitting session: the dataset, the selected model, initial guesses and the last fit result
//! kept in one place.
//!
//! Typical use:
//! ```rust, ignore
//! let mut session = FitSession::new();
//! session.select_model("michaelis_menten")?;
//! session.load_text("0.5,8.5\n1,15.5\n2,25.1\n4,35.8\n8,42.2\n16,46.8")?;
//! let result = session.fit()?;
//! println!("{}", session.report_table()?);
//! ```
use crate::Utils::fit_config::FitConfig;
use crate::Utils::data_parser::parse_xy_text;
use crate::Utils::logger::{FitReportRows, save_fit_report_csv, write_fit_report_csv};
use crate::Utils::plots::plot_fit;
use crate::numerical::optimization::LM_fixed_damping::MinimizationReport;
use crate::numerical::optimization::fit_errors::{FitError, ModelError, check_lengths};
use crate::numerical::optimization::goodness_of_fit::{
    FitStatistics, fit_statistics, predicted_values,
};
use crate::numerical::optimization::models::{Linear, Model, ModelRegistry};
use crate::numerical::optimization::prediction::PredictionCurve;
use log::{info, warn};
use rayon::prelude::*;
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

/// fewer points than this and the session refuses to fit
pub const MIN_POINTS: usize = 3;

/// Outcome of a fit
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub model_id: String,
    pub best_params: Vec<f64>,
    pub r_squared: f64,
    pub statistics: FitStatistics,
    pub report: MinimizationReport,
}

/// one row of the model comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ModelComparison {
    pub model_id: String,
    pub params: Vec<f64>,
    pub r_squared: f64,
}

pub struct FitSession {
    registry: ModelRegistry,
    config: FitConfig,
    model_id: String,
    initial_params: Vec<f64>,
    x_data: Vec<f64>,
    y_data: Vec<f64>,
    last_result: Option<FitResult>,
}

impl Default for FitSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FitSession {
    /// session over the built-in models with the linear model selected
    pub fn new() -> Self {
        let model_id = Linear.id();
        FitSession {
            registry: ModelRegistry::new(),
            config: FitConfig::default(),
            initial_params: Linear.initial_params(),
            model_id,
            x_data: Vec::new(),
            y_data: Vec::new(),
            last_result: None,
        }
    }

    /// session over a custom registry; `model_id` is selected
    pub fn with_registry(registry: ModelRegistry, model_id: &str) -> Result<Self, FitError> {
        let mut session = FitSession {
            registry,
            ..Self::new()
        };
        session.select_model(model_id)?;
        Ok(session)
    }

    pub fn with_config(mut self, config: FitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// add a model to the registry, replacing one with the same id
    pub fn register_model<M: Model + 'static>(&mut self, model: M) {
        if model.id() == self.model_id {
            self.initial_params = model.initial_params();
            self.last_result = None;
        }
        self.registry.register(model);
    }

    fn model(&self) -> Result<&dyn Model, FitError> {
        self.registry
            .get(&self.model_id)
            .ok_or_else(|| FitError::UnknownModel(self.model_id.clone()))
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Select a model by id. The initial guesses are reset to the model defaults
    /// and the previous fit result is dropped.
    pub fn select_model(&mut self, model_id: &str) -> Result<(), FitError> {
        let model = self
            .registry
            .get(model_id)
            .ok_or_else(|| FitError::UnknownModel(model_id.to_string()))?;
        self.initial_params = model.initial_params();
        self.model_id = model_id.to_string();
        self.last_result = None;
        Ok(())
    }

    pub fn initial_params(&self) -> &[f64] {
        &self.initial_params
    }

    pub fn set_initial_params(&mut self, params: Vec<f64>) -> Result<(), FitError> {
        let expected = self.model()?.param_count();
        if params.len() != expected {
            return Err(ModelError::WrongParameterCount {
                model: self.model_id.clone(),
                expected,
                got: params.len(),
            }
            .into());
        }
        self.initial_params = params;
        Ok(())
    }

    pub fn x_data(&self) -> &[f64] {
        &self.x_data
    }

    pub fn y_data(&self) -> &[f64] {
        &self.y_data
    }

    pub fn set_data(&mut self, x_data: Vec<f64>, y_data: Vec<f64>) -> Result<(), FitError> {
        check_lengths(&x_data, &y_data)?;
        self.x_data = x_data;
        self.y_data = y_data;
        self.last_result = None;
        Ok(())
    }

    /// Parse pasted two-column text and make it the dataset. Returns the number of points read;
    /// text without a single valid line is an error and leaves the dataset untouched.
    pub fn load_text(&mut self, text: &str) -> Result<usize, FitError> {
        let (x_data, y_data) = parse_xy_text(text);
        if x_data.is_empty() {
            return Err(FitError::NoData);
        }
        let n = x_data.len();
        self.set_data(x_data, y_data)?;
        info!("loaded {} data points", n);
        Ok(n)
    }

    /// sample data of the selected model, or the linear sample if it has none
    pub fn load_sample_data(&mut self) -> Result<usize, FitError> {
        let text = self
            .model()?
            .sample_data()
            .or_else(|| Linear.sample_data())
            .ok_or(FitError::NoData)?;
        self.load_text(text)
    }

    fn check_enough_points(&self) -> Result<(), FitError> {
        if self.x_data.is_empty() {
            return Err(FitError::NoData);
        }
        if self.x_data.len() < MIN_POINTS {
            return Err(FitError::TooFewPoints {
                required: MIN_POINTS,
                got: self.x_data.len(),
            });
        }
        Ok(())
    }

    /// Fit the selected model to the dataset from the current initial guesses
    pub fn fit(&mut self) -> Result<&FitResult, FitError> {
        self.check_enough_points()?;
        let result = {
            let model = self.model()?;
            let optimizer = self.config.optimizer.optimizer();
            let (params, report) =
                optimizer.minimize(model, &self.x_data, &self.y_data, &self.initial_params)?;
            let best_params: Vec<f64> = params.iter().copied().collect();
            let statistics = fit_statistics(model, &self.x_data, &self.y_data, &best_params)?;
            info!(
                "model '{}' fitted: params {:?}, R^2 = {}",
                self.model_id, best_params, statistics.r_squared
            );
            FitResult {
                model_id: self.model_id.clone(),
                best_params,
                r_squared: statistics.r_squared,
                statistics,
                report,
            }
        };
        Ok(&*self.last_result.insert(result))
    }

    pub fn last_result(&self) -> Option<&FitResult> {
        self.last_result.as_ref()
    }

    fn result(&self) -> Result<&FitResult, FitError> {
        self.last_result.as_ref().ok_or(FitError::NoFitResult)
    }

    /// dense fitted curve over the data range
    pub fn prediction(&self) -> Result<PredictionCurve, FitError> {
        let result = self.result()?;
        let curve =
            self.config
                .prediction
                .sampler()
                .sample(self.model()?, &self.x_data, &result.best_params)?;
        Ok(curve)
    }

    /// fitted equation, e.g. "y = 3.000 * x + 2.000"
    pub fn equation(&self) -> Result<String, FitError> {
        let result = self.result()?;
        Ok(format!(
            "y = {}",
            self.model()?.format_equation(&result.best_params)?
        ))
    }

    /// pretty table of the fitted parameters and of the fit quality
    pub fn report_table(&self) -> Result<String, FitError> {
        let result = self.result()?;
        let model = self.model()?;
        let mut rows: Vec<Vec<String>> = vec![vec!["Parameter".to_string(), "Value".to_string()]];
        for (name, value) in model.param_names().into_iter().zip(result.best_params.iter()) {
            rows.push(vec![name, format!("{:.4}", value)]);
        }
        rows.push(vec![
            "R-squared".to_string(),
            format!("{:.4}", result.statistics.r_squared),
        ]);
        rows.push(vec!["R".to_string(), format!("{:.4}", result.statistics.r)]);
        rows.push(vec!["SSE".to_string(), format!("{:.4e}", result.statistics.sse)]);
        rows.push(vec![
            "iterations".to_string(),
            result.report.iterations.to_string(),
        ]);
        let mut table = Builder::from(rows).build();
        table.with(Style::modern_rounded());
        Ok(format!(
            "{}\n{}\n{}",
            model.name(),
            self.equation()?,
            table
        ))
    }

    /// Write the CSV report of the last fit
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<(), FitError> {
        let result = self.result()?;
        let model = self.model()?;
        let y_fit = predicted_values(model, &self.x_data, &result.best_params)?;
        let param_names = model.param_names();
        let model_name = model.name();
        let formula = model.formula();
        let rows = FitReportRows {
            model_name: &model_name,
            formula: &formula,
            param_names: &param_names,
            params: &result.best_params,
            r_squared: result.r_squared,
            x_data: &self.x_data,
            y_data: &self.y_data,
            y_fit: &y_fit,
        };
        write_fit_report_csv(writer, &rows)
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), FitError> {
        let file = std::fs::File::create(path)?;
        self.export_csv(file)?;
        info!("fit report saved to {}", path.display());
        Ok(())
    }

    /// PNG with the data points and the fitted curve
    pub fn save_plot(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let curve = self.prediction()?;
        let title = self.model()?.name();
        plot_fit(path, &self.x_data, &self.y_data, &curve, &title)?;
        info!("plot saved to {}", path.display());
        Ok(())
    }

    /// Fit every registered model, from its default guesses, to the current data.
    /// Models run in parallel; those that fail are left out. Sorted by descending R^2,
    /// NaN last.
    pub fn compare_models(&self) -> Result<Vec<ModelComparison>, FitError> {
        self.check_enough_points()?;
        let optimizer = self.config.optimizer.optimizer();
        let models: Vec<(&str, &dyn Model)> = self.registry.iter().collect();
        let mut comparisons: Vec<ModelComparison> = models
            .par_iter()
            .filter_map(|&(id, model)| {
                let fitted = optimizer
                    .minimize(model, &self.x_data, &self.y_data, &model.initial_params())
                    .and_then(|(params, _)| {
                        let params: Vec<f64> = params.iter().copied().collect();
                        let stats = fit_statistics(model, &self.x_data, &self.y_data, &params)?;
                        Ok((params, stats.r_squared))
                    });
                match fitted {
                    Ok((params, r_squared)) => Some(ModelComparison {
                        model_id: id.to_string(),
                        params,
                        r_squared,
                    }),
                    Err(e) => {
                        warn!("model '{}' skipped in comparison: {}", id, e);
                        None
                    }
                }
            })
            .collect();
        let rank = |r2: f64| if r2.is_nan() { f64::NEG_INFINITY } else { r2 };
        comparisons.sort_by(|a, b| rank(b.r_squared).total_cmp(&rank(a.r_squared)));
        Ok(comparisons)
    }
}

/// Same report as [`FitSession::export_csv`], for callers that hold the pieces themselves
pub fn save_report<M: Model + ?Sized>(
    path: &Path,
    model: &M,
    x_data: &[f64],
    y_data: &[f64],
    params: &[f64],
) -> Result<(), FitError> {
    let y_fit = predicted_values(model, x_data, params)?;
    let stats = fit_statistics(model, x_data, y_data, params)?;
    let (param_names, model_name, formula) = (model.param_names(), model.name(), model.formula());
    save_fit_report_csv(
        path,
        &FitReportRows {
            model_name: &model_name,
            formula: &formula,
            param_names: &param_names,
            params,
            r_squared: stats.r_squared,
            x_data,
            y_data,
            y_fit: &y_fit,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::optimization::models::ClosureModel;
    use approx::assert_relative_eq;

    const MM_DATA: &str = "0.5,8.5\n1,15.5\n2,25.1\n4,35.8\n8,42.2\n16,46.8";

    #[test]
    fn new_session_selects_linear() {
        let session = FitSession::new();
        assert_eq!(session.model_id(), "linear");
        assert_eq!(session.initial_params(), &[1.0, 0.0]);
        assert!(session.last_result().is_none());
        assert_eq!(session.registry().len(), 9);
    }

    #[test]
    fn selecting_a_model_resets_guesses() {
        let mut session = FitSession::new();
        session.select_model("michaelis_menten").unwrap();
        assert_eq!(session.initial_params(), &[100.0, 10.0]);
        session.set_initial_params(vec![60.0, 3.0]).unwrap();
        session.select_model("michaelis_menten").unwrap();
        assert_eq!(session.initial_params(), &[100.0, 10.0]);
        match session.select_model("cubic") {
            Err(FitError::UnknownModel(id)) => assert_eq!(id, "cubic"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.model_id(), "michaelis_menten");
    }

    #[test]
    fn wrong_number_of_guesses() {
        let mut session = FitSession::new();
        let result = session.set_initial_params(vec![1.0, 2.0, 3.0]);
        match result {
            Err(FitError::Model(ModelError::WrongParameterCount { expected, got, .. })) => {
                assert_eq!((expected, got), (2, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.initial_params(), &[1.0, 0.0]);
    }

    #[test]
    fn fit_needs_three_points() {
        let mut session = FitSession::new();
        assert!(matches!(session.fit(), Err(FitError::NoData)));
        session.load_text("1,2\n2,4").unwrap();
        assert!(matches!(
            session.fit(),
            Err(FitError::TooFewPoints {
                required: 3,
                got: 2
            })
        ));
        assert!(matches!(session.load_text("no numbers here"), Err(FitError::NoData)));
        assert_eq!(session.x_data(), &[1.0, 2.0]);
    }

    #[test]
    fn mismatched_data_is_rejected() {
        let mut session = FitSession::new();
        let result = session.set_data(vec![1.0, 2.0, 3.0], vec![1.0]);
        assert!(matches!(
            result,
            Err(FitError::LengthMismatch { x_len: 3, y_len: 1 })
        ));
    }

    #[test]
    fn linear_sample_fit() {
        let mut session = FitSession::new();
        assert_eq!(session.load_sample_data().unwrap(), 5);
        let result = session.fit().unwrap();
        assert_eq!(result.model_id, "linear");
        assert_relative_eq!(result.best_params[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(result.best_params[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(result.r_squared, 1.0, epsilon = 1e-9);
        assert_eq!(session.equation().unwrap(), "y = 2.000 * x + 1.000");
    }

    #[test]
    fn sample_data_falls_back_to_linear() {
        let mut session = FitSession::new();
        session.select_model("quadratic").unwrap();
        session.load_sample_data().unwrap();
        assert_eq!(session.x_data(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(session.y_data(), &[3.0, 5.0, 7.0, 9.0, 11.0]);
    }

    #[test]
    fn michaelis_menten_from_close_guess() {
        let mut session = FitSession::new();
        session.select_model("michaelis_menten").unwrap();
        session.load_text(MM_DATA).unwrap();
        session.set_initial_params(vec![50.0, 2.0]).unwrap();
        let result = session.fit().unwrap();
        assert!((result.best_params[0] - 50.0).abs() < 5.0);
        assert!((result.best_params[1] - 2.0).abs() < 1.0);
        assert!(result.r_squared > 0.95);
        assert_relative_eq!(
            result.statistics.r,
            result.r_squared.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn results_need_a_fit_first() {
        let mut session = FitSession::new();
        session.load_sample_data().unwrap();
        assert!(matches!(session.prediction(), Err(FitError::NoFitResult)));
        assert!(matches!(session.equation(), Err(FitError::NoFitResult)));
        assert!(matches!(session.report_table(), Err(FitError::NoFitResult)));
        assert!(matches!(
            session.export_csv(Vec::new()),
            Err(FitError::NoFitResult)
        ));
    }

    #[test]
    fn new_data_drops_the_result() {
        let mut session = FitSession::new();
        session.load_sample_data().unwrap();
        session.fit().unwrap();
        assert!(session.last_result().is_some());
        session.load_text("1,1\n2,2\n3,3").unwrap();
        assert!(session.last_result().is_none());
    }

    #[test]
    fn prediction_covers_the_data() {
        let mut session = FitSession::new();
        session.load_sample_data().unwrap();
        session.fit().unwrap();
        let curve = session.prediction().unwrap();
        assert!(curve.len() >= 100);
        assert_eq!(curve.x_pred[0], 1.0);
        assert!(*curve.x_pred.last().unwrap() <= 5.0);
        for (x, y) in curve.points() {
            assert_relative_eq!(y, 2.0 * x + 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn report_table_lists_parameters() {
        let mut session = FitSession::new();
        session.load_sample_data().unwrap();
        session.fit().unwrap();
        let table = session.report_table().unwrap();
        assert!(table.starts_with("Linear (y = mx + b)"));
        assert!(table.contains("y = 2.000 * x + 1.000"));
        assert!(table.contains("a (slope)"));
        assert!(table.contains("b (intercept)"));
        assert!(table.contains("R-squared"));
        assert!(table.contains("1.0000"));
    }

    #[test]
    fn csv_uses_fitted_parameters() {
        let mut session = FitSession::new();
        session.load_text("0,1\n1,3\n2,5").unwrap();
        session.fit().unwrap();
        let mut buffer = Vec::new();
        session.export_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Curve Fitting Results");
        assert_eq!(lines[1], "Model: Linear (y = mx + b)");
        assert!(lines[5].starts_with("a (slope),"));
        let slope: f64 = lines[5].split(',').nth(1).unwrap().parse().unwrap();
        assert_relative_eq!(slope, 2.0, epsilon = 1e-6);
        assert_eq!(lines[10], "X,Y,Y_fit");
        assert_eq!(lines.len(), 14);
        let last: Vec<f64> = lines[13].split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(&last[..2], &[2.0, 5.0]);
        assert_relative_eq!(last[2], 5.0, epsilon = 1e-6);
    }

    #[test]
    fn save_csv_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.csv");
        let mut session = FitSession::new();
        session.load_sample_data().unwrap();
        session.fit().unwrap();
        session.save_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Curve Fitting Results"));

        let other = dir.path().join("direct.csv");
        let params = session.last_result().unwrap().best_params.clone();
        save_report(&other, &Linear, session.x_data(), session.y_data(), &params).unwrap();
        assert_eq!(std::fs::read_to_string(&other).unwrap(), text);
    }

    #[test]
    fn compare_models_is_sorted() {
        let mut session = FitSession::new();
        session.load_text(MM_DATA).unwrap();
        let comparisons = session.compare_models().unwrap();
        assert_eq!(comparisons.len(), 9);
        let ranked: Vec<f64> = comparisons
            .iter()
            .map(|c| if c.r_squared.is_nan() { f64::NEG_INFINITY } else { c.r_squared })
            .collect();
        assert!(ranked.windows(2).all(|w| w[0] >= w[1]));
        assert!(comparisons.iter().any(|c| c.model_id == "michaelis_menten"));
        // the session itself is untouched
        assert_eq!(session.model_id(), "linear");
        assert!(session.last_result().is_none());
    }

    #[test]
    fn failing_models_are_skipped_in_comparison() {
        let mut registry = ModelRegistry::empty();
        registry.register(Linear);
        registry.register(ClosureModel::fallible("broken", &["a"], vec![1.0], |x, _| {
            Err(ModelError::Evaluation {
                model: "broken".to_string(),
                x,
                message: "always fails".to_string(),
            })
        }));
        let mut session = FitSession::with_registry(registry, "linear").unwrap();
        session.load_sample_data().unwrap();
        let comparisons = session.compare_models().unwrap();
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].model_id, "linear");
        assert_relative_eq!(comparisons[0].r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn custom_model_in_session() {
        let mut session = FitSession::new();
        session.register_model(ClosureModel::new(
            "cubic",
            &["a", "b"],
            vec![1.0, 0.0],
            |x: f64, p: &[f64]| p[0] * x.powi(3) + p[1],
        ));
        session.select_model("cubic").unwrap();
        session.load_text("0,1\n1,3\n2,17\n3,55").unwrap();
        let result = session.fit().unwrap();
        assert_relative_eq!(result.best_params[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(result.best_params[1], 1.0, epsilon = 1e-6);
        assert_eq!(
            session.equation().unwrap(),
            "y = cubic(x; a = 2.000, b = 1.000)"
        );
    }
}
