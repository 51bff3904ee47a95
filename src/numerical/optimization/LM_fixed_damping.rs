use crate::numerical::optimization::fit_errors::{FitError, check_lengths};
use crate::numerical::optimization::goodness_of_fit::{predicted_values, sse};
use crate::numerical::optimization::jacobian_fd::jacobian_with_base;
use crate::numerical::optimization::models::Model;
use crate::somelinalg::gauss_elimination::solve_gauss_pivot;
use log::{debug, info, warn};
use nalgebra::DVector;
use strum_macros::Display;

/// How the damping factor evolves between iterations
#[derive(Debug, Clone, Copy, PartialEq, Display)]
pub enum DampingStrategy {
    /// lambda never changes and every step is accepted
    Fixed,
    /// classic Levenberg-Marquardt schedule: a step that does not lower the SSE is
    /// rejected and lambda is multiplied by `increase`, an accepted step divides it by `decrease`
    Adaptive { increase: f64, decrease: f64 },
}

impl DampingStrategy {
    pub fn adaptive() -> Self {
        DampingStrategy::Adaptive {
            increase: 10.0,
            decrease: 10.0,
        }
    }
}

const MAX_LAMBDA: f64 = 1e16;

/// Reasons for terminating the fitting loop.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TerminationReason {
    /// the whole iteration budget was used
    LostPatience,
    /// norm of J^T r dropped below the gradient tolerance
    GradientSmall,
}

/// Information about the fitting loop.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationReport {
    pub termination: TerminationReason,
    /// number of iterations started
    pub iterations: usize,
    /// iteration at which the best parameters were seen, None if no finite SSE was ever seen
    pub best_iteration: Option<usize>,
    /// number of model evaluations
    pub number_of_evaluations: usize,
    /// SSE of the returned parameters
    pub objective_function: f64,
}

/// Levenberg-Marquardt fitting loop, fixed damping unless told otherwise.
///
/// Every iteration takes the damped Gauss-Newton step `(J^T J + lambda*diag(J^T J)) delta = J^T r`
/// and accepts it unconditionally. There is no adaptation of lambda and no step rejection,
/// so the parameters are allowed to wander; the loop remembers the parameter vector with the
/// lowest sum of squared errors and returns it at the end. By default the whole
/// iteration budget is spent. Early exit on a small gradient and the adaptive damping
/// schedule are opt-ins.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LevenbergMarquardt {
    patience: usize,
    lambda: f64,
    gtol: Option<f64>,
    damping: DampingStrategy,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new()
    }
}

impl LevenbergMarquardt {
    pub const DEFAULT_PATIENCE: usize = 100;
    pub const DEFAULT_LAMBDA: f64 = 0.01;

    pub fn new() -> Self {
        Self {
            patience: Self::DEFAULT_PATIENCE,
            lambda: Self::DEFAULT_LAMBDA,
            gtol: None,
            damping: DampingStrategy::Fixed,
        }
    }

    /// number of iterations
    pub fn with_patience(self, patience: usize) -> Self {
        assert!(patience > 0, "Max iterations should be a positive number.");
        Self { patience, ..self }
    }

    /// diagonal damping factor, H[j][j] *= 1 + lambda
    pub fn with_lambda(self, lambda: f64) -> Self {
        assert!(lambda >= 0.0, "Damping should be a non-negative number.");
        Self { lambda, ..self }
    }

    /// stop as soon as |J^T r| < gtol
    pub fn with_gtol(self, gtol: f64) -> Self {
        assert!(gtol >= 0.0, "Gradient tolerance should be a non-negative number.");
        Self {
            gtol: Some(gtol),
            ..self
        }
    }

    pub fn with_damping(self, damping: DampingStrategy) -> Self {
        if let DampingStrategy::Adaptive { increase, decrease } = damping {
            assert!(
                increase > 1.0 && decrease > 1.0,
                "Damping update factors should be greater than one."
            );
        }
        Self { damping, ..self }
    }

    pub fn damping(&self) -> DampingStrategy {
        self.damping
    }

    pub fn patience(&self) -> usize {
        self.patience
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn gtol(&self) -> Option<f64> {
        self.gtol
    }

    /// Fit `model` to the data starting from `initial_params`.
    /// Returns the best parameters seen and a report. Numerical trouble (singular
    /// normal equations, NaN parameters) never produces an error; a failing model does.
    pub fn minimize<M: Model + ?Sized>(
        &self,
        model: &M,
        x_data: &[f64],
        y_data: &[f64],
        initial_params: &[f64],
    ) -> Result<(DVector<f64>, MinimizationReport), FitError> {
        check_lengths(x_data, y_data)?;
        let n = x_data.len();
        let p = initial_params.len();
        info!(
            "fitting model '{}' with {} points and {} parameters, initial guess {:?}",
            model.id(),
            n,
            p,
            initial_params
        );

        let mut params = DVector::from_column_slice(initial_params);
        let mut best_params = params.clone();
        let mut best_error = f64::MAX;
        let mut best_iteration = None;
        let mut evaluations = 0;
        let mut termination = TerminationReason::LostPatience;
        let mut iterations = 0;
        let mut lambda = self.lambda;

        for iteration in 0..self.patience {
            iterations = iteration + 1;
            let y_pred = predicted_values(model, x_data, params.as_slice())?;
            evaluations += n;
            let sum_squared_error = sse(y_data, &y_pred);
            if sum_squared_error < best_error {
                best_error = sum_squared_error;
                best_params.copy_from(&params);
                best_iteration = Some(iteration);
            }

            let jacobian = jacobian_with_base(model, x_data, params.as_slice(), &y_pred)?;
            evaluations += n * p;
            let residuals =
                DVector::from_iterator(n, y_data.iter().zip(y_pred.iter()).map(|(y, f)| y - f));
            let gradient = jacobian.tr_mul(&residuals);
            let gradient_norm = gradient.norm();
            debug!(
                "iteration {}: SSE = {:e}, |g| = {:e}, params = {:?}",
                iteration,
                sum_squared_error,
                gradient_norm,
                params.as_slice()
            );
            if let Some(gtol) = self.gtol {
                if gradient_norm < gtol {
                    termination = TerminationReason::GradientSmall;
                    break;
                }
            }

            let mut hessian = jacobian.tr_mul(&jacobian);
            for j in 0..p {
                hessian[(j, j)] *= 1.0 + lambda;
            }
            let delta = solve_gauss_pivot(hessian, gradient);
            if delta.iter().any(|d| !d.is_finite()) {
                warn!(
                    "iteration {}: non-finite step {:?}",
                    iteration,
                    delta.as_slice()
                );
            }
            match self.damping {
                DampingStrategy::Fixed => params += delta,
                DampingStrategy::Adaptive { increase, decrease } => {
                    let trial = &params + delta;
                    let trial_sse = sse(y_data, &predicted_values(model, x_data, trial.as_slice())?);
                    evaluations += n;
                    // NaN compares false and is rejected
                    if trial_sse < sum_squared_error {
                        params = trial;
                        lambda /= decrease;
                    } else {
                        lambda = (lambda * increase).min(MAX_LAMBDA);
                    }
                }
            }
        }

        let objective_function = if best_iteration.is_some() {
            best_error
        } else {
            sse(y_data, &predicted_values(model, x_data, best_params.as_slice())?)
        };
        info!(
            "fit finished ({:?}) after {} iterations: best SSE = {:e} at iteration {:?}, params = {:?}",
            termination,
            iterations,
            objective_function,
            best_iteration,
            best_params.as_slice()
        );
        let report = MinimizationReport {
            termination,
            iterations,
            best_iteration,
            number_of_evaluations: evaluations,
            objective_function,
        };
        Ok((best_params, report))
    }
}

/// fit with default settings: 100 iterations, lambda = 0.01, no early exit
pub fn fit_curve<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    y_data: &[f64],
    initial_params: &[f64],
) -> Result<Vec<f64>, FitError> {
    let (params, _report) =
        LevenbergMarquardt::new().minimize(model, x_data, y_data, initial_params)?;
    Ok(params.data.into())
}
