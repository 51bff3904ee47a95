use crate::numerical::optimization::fit_errors::ModelError;
use crate::numerical::optimization::models::Model;
use nalgebra::DMatrix;

/// step of the forward difference
pub const FD_STEP: f64 = 1e-4;

/// Forward-difference Jacobian of the model with respect to its parameters.
/// J[(i, j)] = (f(x_i, params + h*e_j) - f(x_i, params)) / h
/// Output is n x P, n = number of data points, P = number of parameters.
pub fn numerical_jacobian<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    params: &[f64],
) -> Result<DMatrix<f64>, ModelError> {
    let base = x_data
        .iter()
        .map(|&x| model.evaluate(x, params))
        .collect::<Result<Vec<f64>, ModelError>>()?;
    jacobian_with_base(model, x_data, params, &base)
}

/// same as [`numerical_jacobian`] but reuses already computed f(x_i, params)
pub(crate) fn jacobian_with_base<M: Model + ?Sized>(
    model: &M,
    x_data: &[f64],
    params: &[f64],
    base: &[f64],
) -> Result<DMatrix<f64>, ModelError> {
    let n = x_data.len();
    let p = params.len();
    let mut jacobian = DMatrix::zeros(n, p);
    let mut perturbed = params.to_vec();
    for j in 0..p {
        perturbed[j] += FD_STEP;
        for i in 0..n {
            let f_plus = model.evaluate(x_data[i], &perturbed)?;
            jacobian[(i, j)] = (f_plus - base[i]) / FD_STEP;
        }
        perturbed[j] = params[j];
    }
    Ok(jacobian)
}
