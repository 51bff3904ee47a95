use log::warn;
use nalgebra::{DMatrix, DVector};

/// Solve the dense square system A*x = b by Gaussian elimination with partial pivoting.
/// A and b are consumed (they are overwritten during elimination), x is a fresh vector.
/// A zero pivot is not an error: the division produces NaN or inf in x and the caller
/// decides what to do with such a step.
pub fn solve_gauss_pivot(mut a: DMatrix<f64>, mut b: DVector<f64>) -> DVector<f64> {
    let n = b.len();
    assert_eq!(a.nrows(), a.ncols(), "matrix must be square");
    assert_eq!(a.nrows(), n, "matrix and right hand side must have the same size");

    for i in 0..n {
        // find pivot: first row with the largest absolute value in column i
        let mut max_index = i;
        let mut max_val = a[(i, i)].abs();
        for j in i + 1..n {
            let abs_value = a[(j, i)].abs();
            if abs_value > max_val {
                max_val = abs_value;
                max_index = j;
            }
        }
        if max_index != i {
            a.swap_rows(i, max_index);
            b.swap_rows(i, max_index);
        }
        if a[(i, i)] == 0.0 {
            warn!("zero pivot in column {}, system is singular", i);
        }
        // eliminate
        for j in i + 1..n {
            let factor = a[(j, i)] / a[(i, i)];
            b[j] -= factor * b[i];
            for k in i..n {
                a[(j, k)] -= factor * a[(i, k)];
            }
        }
    }

    // back-substitution
    let mut x = DVector::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for k in i + 1..n {
            sum += a[(i, k)] * x[k];
        }
        x[i] = (b[i] - sum) / a[(i, i)];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    #[test]
    fn test_small_system() {
        // 2x + y = 5, x + 3y = 10  => x = 1, y = 3
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![5.0, 10.0]);
        let x = solve_gauss_pivot(a, b);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pivoting_needed() {
        // zero on the diagonal of the first row, solvable only with a row swap
        let a = DMatrix::from_row_slice(3, 3, &[0.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 0.0]);
        let x_true = DVector::from_vec(vec![1.0, -2.0, 3.0]);
        let b = &a * &x_true;
        let x = solve_gauss_pivot(a, b);
        for i in 0..3 {
            assert_relative_eq!(x[i], x_true[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_random_well_conditioned() {
        let mut rng = rand::rng();
        for n in [1usize, 2, 3, 5, 8] {
            // diagonally dominant matrices are well conditioned
            let mut a = DMatrix::from_fn(n, n, |_, _| rng.random_range(-1.0..1.0));
            for i in 0..n {
                a[(i, i)] += n as f64 + 1.0;
            }
            let b = DVector::from_fn(n, |_, _| rng.random_range(-10.0..10.0));
            let x = solve_gauss_pivot(a.clone(), b.clone());
            let residual = (&a * &x - &b).norm();
            assert!(residual < 1e-6 * (1.0 + b.norm()), "residual = {}", residual);
        }
    }

    #[test]
    fn test_singular_system_is_not_an_error() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        let x = solve_gauss_pivot(a, b);
        assert!(x.iter().any(|v| !v.is_finite()));
    }

    #[test]
    fn test_empty_system() {
        let x = solve_gauss_pivot(DMatrix::zeros(0, 0), DVector::zeros(0));
        assert_eq!(x.len(), 0);
    }
}
