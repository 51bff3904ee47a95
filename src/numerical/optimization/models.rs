//! catalog of fitting models
//!
//! Every model is a pure evaluator `f(x, params) -> y` with a fixed number of
//! parameters. The fitting routines never look inside a model, they only call
//! [`Model::evaluate`]. Built-in models are unit structs collected into
//! [`BuiltinModel`], caller-defined models can be wrapped into [`ClosureModel`],
//! and anything implementing [`Model`] can be put into a [`ModelRegistry`].
use crate::numerical::optimization::fit_errors::ModelError;
use enum_dispatch::enum_dispatch;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};

#[enum_dispatch]
pub trait Model: Send + Sync {
    /// short identifier used for lookup, e.g. "michaelis_menten"
    fn id(&self) -> String;
    /// human readable name
    fn name(&self) -> String;
    /// formula as shown to the user
    fn formula(&self) -> String;
    fn param_names(&self) -> Vec<String>;
    fn param_count(&self) -> usize {
        self.param_names().len()
    }
    /// default initial guess
    fn initial_params(&self) -> Vec<f64>;
    /// evaluate the model at `x`
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError>;
    /// equation with numerical values of parameters substituted
    fn format_equation(&self, params: &[f64]) -> Result<String, ModelError>;
    /// sample data text shipped with the model, if any
    fn sample_data(&self) -> Option<&'static str> {
        None
    }
}

fn check_params(id: &str, expected: usize, params: &[f64]) -> Result<(), ModelError> {
    if params.len() != expected {
        return Err(ModelError::WrongParameterCount {
            model: id.to_string(),
            expected,
            got: params.len(),
        });
    }
    Ok(())
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

////////////////////////////////////////BUILT-IN MODELS////////////////////////////////////////

/// y = a*x + b
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Linear;

impl Model for Linear {
    fn id(&self) -> String {
        "linear".to_string()
    }
    fn name(&self) -> String {
        "Linear (y = mx + b)".to_string()
    }
    fn formula(&self) -> String {
        "y = ax + b".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["a (slope)", "b (intercept)"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![1.0, 0.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 2, params)?;
        Ok(params[0] * x + params[1])
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 2, p)?;
        Ok(format!("{:.3} * x + {:.3}", p[0], p[1]))
    }
    fn sample_data(&self) -> Option<&'static str> {
        Some("1,3\n2,5\n3,7\n4,9\n5,11")
    }
}

/// y = a*x^2 + b*x + c
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quadratic;

impl Model for Quadratic {
    fn id(&self) -> String {
        "quadratic".to_string()
    }
    fn name(&self) -> String {
        "Quadratic (y = ax² + bx + c)".to_string()
    }
    fn formula(&self) -> String {
        "y = ax² + bx + c".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["a", "b", "c"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![1.0, 1.0, 0.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 3, params)?;
        Ok(params[0] * x * x + params[1] * x + params[2])
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 3, p)?;
        Ok(format!("{:.3} * x² + {:.3} * x + {:.3}", p[0], p[1], p[2]))
    }
}

/// y = a*e^(b*x)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Exponential;

impl Model for Exponential {
    fn id(&self) -> String {
        "exponential".to_string()
    }
    fn name(&self) -> String {
        "Exponential Growth/Decay (y = a*e^(bx))".to_string()
    }
    fn formula(&self) -> String {
        "y = a*e^(bx)".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["a (amplitude)", "b (rate)"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![1.0, 0.1]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 2, params)?;
        Ok(params[0] * (params[1] * x).exp())
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 2, p)?;
        Ok(format!("{:.3} * e^({:.3} * x)", p[0], p[1]))
    }
    fn sample_data(&self) -> Option<&'static str> {
        Some("0,1\n1,2.7\n2,7.4\n3,20.1\n4,54.6")
    }
}

/// y = a*x^b
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Power;

impl Model for Power {
    fn id(&self) -> String {
        "power".to_string()
    }
    fn name(&self) -> String {
        "Power Law (y = a*x^b)".to_string()
    }
    fn formula(&self) -> String {
        "y = a*x^b".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["a (coefficient)", "b (exponent)"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![1.0, 1.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 2, params)?;
        Ok(params[0] * x.powf(params[1]))
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 2, p)?;
        Ok(format!("{:.3} * x^{:.3}", p[0], p[1]))
    }
}

/// y = Vmax*x/(Km + x)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MichaelisMenten;

impl Model for MichaelisMenten {
    fn id(&self) -> String {
        "michaelis_menten".to_string()
    }
    fn name(&self) -> String {
        "Michaelis-Menten (y = Vmax*x/(Km + x))".to_string()
    }
    fn formula(&self) -> String {
        "y = Vmax*x/(Km + x)".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["Vmax", "Km"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![100.0, 10.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 2, params)?;
        Ok((params[0] * x) / (params[1] + x))
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 2, p)?;
        Ok(format!("{:.3} * x / ({:.3} + x)", p[0], p[1]))
    }
    fn sample_data(&self) -> Option<&'static str> {
        Some("0.5,8.5\n1,15.5\n2,25.1\n4,35.8\n8,42.2\n16,46.8")
    }
}

/// y = Vmax*x^n/(K^n + x^n)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hill;

impl Model for Hill {
    fn id(&self) -> String {
        "hill".to_string()
    }
    fn name(&self) -> String {
        "Hill Equation (y = Vmax*x^n/(K^n + x^n))".to_string()
    }
    fn formula(&self) -> String {
        "y = Vmax*x^n/(K^n + x^n)".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["Vmax", "K", "n (Hill coefficient)"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![100.0, 10.0, 1.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 3, params)?;
        let xn = x.powf(params[2]);
        Ok((params[0] * xn) / (params[1].powf(params[2]) + xn))
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 3, p)?;
        Ok(format!(
            "{:.3} * x^{:.3} / ({:.3}^{:.3} + x^{:.3})",
            p[0], p[2], p[1], p[2], p[2]
        ))
    }
}

/// y = a/(1 + e^(-b*(x-c)))
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Logistic;

impl Model for Logistic {
    fn id(&self) -> String {
        "logistic".to_string()
    }
    fn name(&self) -> String {
        "Logistic/Sigmoid (y = a/(1 + e^(-b*(x-c))))".to_string()
    }
    fn formula(&self) -> String {
        "y = a/(1 + e^(-b*(x-c)))".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["a (max)", "b (steepness)", "c (midpoint)"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![1.0, 1.0, 0.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 3, params)?;
        Ok(params[0] / (1.0 + (-params[1] * (x - params[2])).exp()))
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 3, p)?;
        Ok(format!(
            "{:.3} / (1 + e^(-{:.3} * (x - {:.3})))",
            p[0], p[1], p[2]
        ))
    }
}

/// y = min + (max-min)/(1 + (x/EC50)^Hill)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DoseResponse;

impl Model for DoseResponse {
    fn id(&self) -> String {
        "dose_response".to_string()
    }
    fn name(&self) -> String {
        "Dose-Response (IC50/EC50) (y = min + (max-min)/(1 + (x/EC50)^Hill))".to_string()
    }
    fn formula(&self) -> String {
        "y = min + (max-min)/(1 + (x/EC50)^Hill)".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["min", "max", "EC50/IC50", "Hill slope"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![0.0, 100.0, 10.0, 1.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 4, params)?;
        Ok(params[0] + (params[1] - params[0]) / (1.0 + (x / params[2]).powf(params[3])))
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 4, p)?;
        Ok(format!(
            "{:.3} + ({:.3} - {:.3}) / (1 + (x / {:.3})^{:.3})",
            p[0], p[1], p[0], p[2], p[3]
        ))
    }
    fn sample_data(&self) -> Option<&'static str> {
        Some("0.01,95\n0.1,92\n1,80\n10,50\n100,20\n1000,5")
    }
}

/// y = a*e^(-(x-b)^2/(2*c^2))
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gaussian;

impl Model for Gaussian {
    fn id(&self) -> String {
        "gaussian".to_string()
    }
    fn name(&self) -> String {
        "Gaussian (y = a*e^(-(x-b)²/(2*c²)))".to_string()
    }
    fn formula(&self) -> String {
        "y = a*e^(-(x-b)²/(2*c²))".to_string()
    }
    fn param_names(&self) -> Vec<String> {
        names(&["a (amplitude)", "b (center)", "c (width)"])
    }
    fn initial_params(&self) -> Vec<f64> {
        vec![1.0, 0.0, 1.0]
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id(), 3, params)?;
        Ok(params[0] * (-(x - params[1]).powi(2) / (2.0 * params[2].powi(2))).exp())
    }
    fn format_equation(&self, p: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id(), 3, p)?;
        Ok(format!(
            "{:.3} * e^(-(x-{:.3})²/(2*{:.3}²))",
            p[0], p[1], p[2]
        ))
    }
    fn sample_data(&self) -> Option<&'static str> {
        Some("-3,0.1\n-2,0.5\n-1,0.9\n0,1\n1,0.9\n2,0.5\n3,0.1")
    }
}

/// all models shipped with the crate
#[enum_dispatch(Model)]
#[derive(Debug, Clone, Copy, PartialEq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BuiltinModel {
    Linear(Linear),
    Quadratic(Quadratic),
    Exponential(Exponential),
    Power(Power),
    MichaelisMenten(MichaelisMenten),
    Hill(Hill),
    Logistic(Logistic),
    DoseResponse(DoseResponse),
    Gaussian(Gaussian),
}

/////////////////////////////////////////CLOSURE MODEL/////////////////////////////////////////

type ModelFn = dyn Fn(f64, &[f64]) -> Result<f64, ModelError> + Send + Sync;

/// Simple model wrapper for closures
#[derive(Clone)]
pub struct ClosureModel {
    id: String,
    param_names: Vec<String>,
    initial_params: Vec<f64>,
    func: Arc<ModelFn>,
}

impl ClosureModel {
    /// wrap an infallible closure
    pub fn new<F>(id: &str, param_names: &[&str], initial_params: Vec<f64>, func: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::fallible(id, param_names, initial_params, move |x, p| Ok(func(x, p)))
    }

    /// wrap a closure that may refuse to evaluate
    pub fn fallible<F>(id: &str, param_names: &[&str], initial_params: Vec<f64>, func: F) -> Self
    where
        F: Fn(f64, &[f64]) -> Result<f64, ModelError> + Send + Sync + 'static,
    {
        assert_eq!(
            param_names.len(),
            initial_params.len(),
            "every parameter needs an initial guess"
        );
        ClosureModel {
            id: id.to_string(),
            param_names: names(param_names),
            initial_params,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for ClosureModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClosureModel")
            .field("id", &self.id)
            .field("param_names", &self.param_names)
            .finish()
    }
}

impl Model for ClosureModel {
    fn id(&self) -> String {
        self.id.clone()
    }
    fn name(&self) -> String {
        self.id.clone()
    }
    fn formula(&self) -> String {
        format!("y = {}(x; {})", self.id, self.param_names.join(", "))
    }
    fn param_names(&self) -> Vec<String> {
        self.param_names.clone()
    }
    fn initial_params(&self) -> Vec<f64> {
        self.initial_params.clone()
    }
    fn evaluate(&self, x: f64, params: &[f64]) -> Result<f64, ModelError> {
        check_params(&self.id, self.param_names.len(), params)?;
        (self.func)(x, params)
    }
    fn format_equation(&self, params: &[f64]) -> Result<String, ModelError> {
        check_params(&self.id, self.param_names.len(), params)?;
        let values: Vec<String> = self
            .param_names
            .iter()
            .zip(params.iter())
            .map(|(name, v)| format!("{} = {:.3}", name, v))
            .collect();
        Ok(format!("{}(x; {})", self.id, values.join(", ")))
    }
}

//////////////////////////////////////////REGISTRY/////////////////////////////////////////////

/// lookup table from model id to model instance
pub struct ModelRegistry {
    models: BTreeMap<String, Box<dyn Model>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// registry pre-populated with the built-in models
    pub fn new() -> Self {
        use strum::IntoEnumIterator;
        let mut registry = Self::empty();
        for model in BuiltinModel::iter() {
            registry.register(model);
        }
        registry
    }

    pub fn empty() -> Self {
        ModelRegistry {
            models: BTreeMap::new(),
        }
    }

    /// add a model; a model with the same id is replaced
    pub fn register<M: Model + 'static>(&mut self, model: M) {
        self.models.insert(model.id(), Box::new(model));
    }

    pub fn get(&self, id: &str) -> Option<&dyn Model> {
        self.models.get(id).map(|m| m.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Model)> {
        self.models.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn builtin_ids_match_strum_names() {
        for model in BuiltinModel::iter() {
            assert_eq!(model.id(), model.to_string());
            assert_eq!(BuiltinModel::from_str(&model.id()).unwrap(), model);
            assert_eq!(model.param_count(), model.initial_params().len());
        }
        assert_eq!(BuiltinModel::iter().count(), 9);
    }

    #[test]
    fn evaluate_builtins() {
        assert_relative_eq!(Linear.evaluate(2.0, &[3.0, 2.0]).unwrap(), 8.0);
        assert_relative_eq!(
            Quadratic.evaluate(2.0, &[1.0, 2.0, 3.0]).unwrap(),
            11.0
        );
        assert_relative_eq!(
            MichaelisMenten.evaluate(2.0, &[50.0, 2.0]).unwrap(),
            25.0
        );
        assert_relative_eq!(
            Hill.evaluate(10.0, &[100.0, 10.0, 2.0]).unwrap(),
            50.0
        );
        assert_relative_eq!(
            Logistic.evaluate(0.0, &[2.0, 1.0, 0.0]).unwrap(),
            1.0
        );
        assert_relative_eq!(
            DoseResponse.evaluate(10.0, &[0.0, 100.0, 10.0, 1.0]).unwrap(),
            50.0
        );
        assert_relative_eq!(
            Gaussian.evaluate(0.0, &[3.0, 0.0, 1.0]).unwrap(),
            3.0
        );
        assert_relative_eq!(Power.evaluate(4.0, &[2.0, 0.5]).unwrap(), 4.0);
        assert_relative_eq!(
            Exponential.evaluate(0.0, &[5.0, 0.3]).unwrap(),
            5.0
        );
    }

    #[test]
    fn wrong_parameter_count_is_reported() {
        let err = Linear.evaluate(1.0, &[1.0]).unwrap_err();
        assert_eq!(
            err,
            ModelError::WrongParameterCount {
                model: "linear".to_string(),
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn equation_text() {
        assert_eq!(
            Linear.format_equation(&[3.0, 2.0]).unwrap(),
            "3.000 * x + 2.000"
        );
        assert_eq!(
            MichaelisMenten.format_equation(&[49.5, 2.25]).unwrap(),
            "49.500 * x / (2.250 + x)"
        );
    }

    #[test]
    fn closure_model_and_registry() {
        let cubic = ClosureModel::new("cubic", &["k"], vec![1.0], |x, p| p[0] * x.powi(3));
        assert_relative_eq!(cubic.evaluate(2.0, &[0.5]).unwrap(), 4.0);
        let mut registry = ModelRegistry::new();
        assert_eq!(registry.len(), 9);
        registry.register(cubic);
        assert_eq!(registry.len(), 10);
        assert!(registry.contains("cubic"));
        assert_eq!(registry.get("cubic").unwrap().param_count(), 1);
        // same id replaces
        registry.register(ClosureModel::new("cubic", &["k", "c"], vec![1.0, 0.0], |x, p| {
            p[0] * x.powi(3) + p[1]
        }));
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.get("cubic").unwrap().param_count(), 2);
        assert!(registry.get("nope").is_none());
    }
}
