use crate::numerical::optimization::fit_errors::ModelError;
use crate::numerical::optimization::models::Model;

/// fitted curve sampled for plotting
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictionCurve {
    pub x_pred: Vec<f64>,
    pub y_pred: Vec<f64>,
}

impl PredictionCurve {
    pub fn len(&self) -> usize {
        self.x_pred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_pred.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.x_pred
            .iter()
            .copied()
            .zip(self.y_pred.iter().copied())
            .collect()
    }
}

/// Samples the model on [min(x), max(x)] with a constant step (max - min)/divisions.
/// The step is added repeatedly while x <= max, so rounding decides whether the last
/// point is exactly max: there are divisions or divisions + 1 points (rarely divisions + 2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionSampler {
    divisions: usize,
}

impl Default for PredictionSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionSampler {
    pub const DEFAULT_DIVISIONS: usize = 100;

    pub fn new() -> Self {
        PredictionSampler {
            divisions: Self::DEFAULT_DIVISIONS,
        }
    }

    pub fn with_divisions(divisions: usize) -> Self {
        assert!(divisions > 0, "number of divisions should be positive");
        PredictionSampler { divisions }
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn sample<M: Model + ?Sized>(
        &self,
        model: &M,
        x_data: &[f64],
        params: &[f64],
    ) -> Result<PredictionCurve, ModelError> {
        let min = x_data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = x_data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut curve = PredictionCurve::default();
        // empty data
        if !(min <= max) {
            return Ok(curve);
        }
        let step = (max - min) / self.divisions as f64;
        let mut x = min;
        while x <= max {
            curve.x_pred.push(x);
            curve.y_pred.push(model.evaluate(x, params)?);
            // one distinct x value, or a step lost in rounding
            if !(step > 0.0) || x + step == x {
                break;
            }
            x += step;
        }
        Ok(curve)
    }
}

/// dense fitted curve with the default 100 divisions
pub fn predict<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    params: &[f64],
) -> Result<PredictionCurve, ModelError> {
    PredictionSampler::new().sample(model, x_data, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::optimization::models::{Linear, MichaelisMenten};
    use approx::assert_relative_eq;

    #[test]
    fn covers_data_range() {
        let x_data = vec![0.5, 16.0, 2.0, 1.0, 8.0, 4.0];
        let params = vec![50.0, 2.0];
        let curve = predict(&MichaelisMenten, &x_data, &params).unwrap();
        assert_eq!(curve.len(), 101);
        assert_eq!(curve.x_pred[0], 0.5);
        assert!(*curve.x_pred.last().unwrap() <= 16.0);
        for (x, y) in curve.points() {
            assert_relative_eq!(y, 50.0 * x / (2.0 + x), epsilon = 1e-12);
        }
        assert!(curve.x_pred.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn accumulated_step_can_miss_the_last_point() {
        // 1 + 100 * 0.04 overshoots 5 in floating point
        let curve = predict(&Linear, &[1.0, 2.0, 3.0, 4.0, 5.0], &[3.0, 2.0]).unwrap();
        assert_eq!(curve.len(), 100);
        let curve = predict(&Linear, &[0.0, 10.0], &[3.0, 2.0]).unwrap();
        assert_eq!(curve.len(), 101);
    }

    #[test]
    fn sampling_is_deterministic() {
        let x_data = vec![-3.0, -1.0, 2.5, 7.0];
        let first = predict(&Linear, &x_data, &[1.5, -0.5]).unwrap();
        let second = predict(&Linear, &x_data, &[1.5, -0.5]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn single_distinct_x_gives_one_point() {
        let curve = predict(&Linear, &[2.0, 2.0, 2.0], &[3.0, 2.0]).unwrap();
        assert_eq!(curve.x_pred, vec![2.0]);
        assert_eq!(curve.y_pred, vec![8.0]);
    }

    #[test]
    fn step_lost_in_rounding_terminates() {
        let curve = predict(&Linear, &[1e20, 1e20 + 1e5], &[1.0, 0.0]).unwrap();
        assert!(!curve.is_empty());
        assert!(curve.len() <= 101);
    }

    #[test]
    fn empty_data_gives_empty_curve() {
        let curve = predict(&Linear, &[], &[1.0, 0.0]).unwrap();
        assert!(curve.is_empty());
    }

    #[test]
    fn custom_divisions() {
        let curve = PredictionSampler::with_divisions(4)
            .sample(&Linear, &[0.0, 1.0], &[1.0, 0.0])
            .unwrap();
        assert_eq!(curve.x_pred, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
