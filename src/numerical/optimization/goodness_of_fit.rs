use crate::numerical::optimization::fit_errors::{FitError, check_lengths};
use crate::numerical::optimization::models::Model;

/// model values at every data point
pub fn predicted_values<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    params: &[f64],
) -> Result<Vec<f64>, FitError> {
    let y_pred = x_data
        .iter()
        .map(|&x| model.evaluate(x, params))
        .collect::<Result<Vec<f64>, _>>()?;
    Ok(y_pred)
}

/// sum of squared errors between observed and predicted values
pub fn sum_squared_errors<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    y_data: &[f64],
    params: &[f64],
) -> Result<f64, FitError> {
    check_lengths(x_data, y_data)?;
    let y_pred = predicted_values(model, x_data, params)?;
    Ok(sse(y_data, &y_pred))
}

pub(crate) fn sse(y_data: &[f64], y_pred: &[f64]) -> f64 {
    y_data
        .iter()
        .zip(y_pred.iter())
        .map(|(y, y_pred)| (y_pred - y).powi(2))
        .sum::<f64>()
}

/// coefficient of determination 1 - SS_res/SS_tot.
/// If all y are equal SS_tot is zero and the result is NaN or inf, this is left as is.
pub fn r_squared<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    y_data: &[f64],
    params: &[f64],
) -> Result<f64, FitError> {
    check_lengths(x_data, y_data)?;
    let y_pred = predicted_values(model, x_data, params)?;
    Ok(r_squared_from_predictions(y_data, &y_pred))
}

pub fn r_squared_from_predictions(y_data: &[f64], y_pred: &[f64]) -> f64 {
    let y_mean = y_data.iter().sum::<f64>() / y_data.len() as f64;
    let ss_tot = y_data.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>();
    let ss_res = y_data
        .iter()
        .zip(y_pred.iter())
        .map(|(y, y_pred)| (y - y_pred).powi(2))
        .sum::<f64>();
    1.0 - ss_res / ss_tot
}

/// summary of fit quality
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitStatistics {
    pub sse: f64,
    pub r_squared: f64,
    /// sqrt(R^2); NaN when R^2 is negative
    pub r: f64,
}

pub fn fit_statistics<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    y_data: &[f64],
    params: &[f64],
) -> Result<FitStatistics, FitError> {
    check_lengths(x_data, y_data)?;
    let y_pred = predicted_values(model, x_data, params)?;
    let r_squared = r_squared_from_predictions(y_data, &y_pred);
    Ok(FitStatistics {
        sse: sse(y_data, &y_pred),
        r_squared,
        r: r_squared.sqrt(),
    })
}
