//! Automatic differentiation support using `num-dual`.
//!
//! Formulas written once against the [`Scalar`](crate::Scalar) trait can be
//! evaluated with [`Dual64`] to obtain exact partial derivatives. Nodes use
//! [`write_partials`] from their [`Node::compute_partials`](crate::Node::compute_partials)
//! implementation for every pair they declare as
//! [`DerivativeMethod::Analytic`](crate::DerivativeMethod::Analytic).
//!
//! # Example
//!
//! ```
//! use aerograph::autodiff::compute_jacobian;
//! use num_dual::Dual64;
//!
//! // Compute Jacobian of f(x,y) = [x^2, xy]
//! let f = |vars: &[Dual64]| vec![vars[0] * vars[0], vars[0] * vars[1]];
//! let jac = compute_jacobian(f, &[2.0, 3.0]);
//! assert_eq!(jac[(1, 0)], 3.0);
//! ```

use nalgebra::DMatrix;
use num_dual::Dual64;

use crate::{Inputs, Partials, Result};

/// Computes the Jacobian of `f` using forward-mode automatic differentiation.
///
/// One evaluation per variable; row `i`, column `j` holds d f_i / d x_j.
pub fn compute_jacobian<F>(f: F, x: &[f64]) -> DMatrix<f64>
where
    F: Fn(&[Dual64]) -> Vec<Dual64>,
{
    let n_vars = x.len();
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(n_vars);

    for j in 0..n_vars {
        // Seed variable j
        let mut x_dual: Vec<Dual64> = x.iter().map(|&v| Dual64::from(v)).collect();
        x_dual[j] = Dual64::from(x[j]).derivative();

        columns.push(f(&x_dual).iter().map(|r| r.eps).collect());
    }

    let n_eqs = columns.first().map_or(0, Vec::len);
    DMatrix::from_fn(n_eqs, n_vars, |i, j| columns[j][i])
}

/// Evaluates `f` on the scalar inputs `wrt` and writes d of_i / d wrt_j
/// into `partials` for every pair.
///
/// `f` receives the dual values of `wrt` in order and returns one value per
/// key in `of`.
pub fn write_partials<F>(f: F, inputs: &Inputs, of: &[&str], wrt: &[&str], partials: &mut Partials) -> Result<()>
where
    F: Fn(&[Dual64]) -> Vec<Dual64>,
{
    let x = wrt.iter().map(|key| inputs.scalar(key)).collect::<Result<Vec<f64>>>()?;
    let jacobian = compute_jacobian(f, &x);

    for (i, of_key) in of.iter().enumerate() {
        for (j, wrt_key) in wrt.iter().enumerate() {
            partials.set(of_key, wrt_key, jacobian[(i, j)]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_jacobian_simple() {
        // Test function: f(x, y) = [x^2, xy]
        let f = |vars: &[Dual64]| {
            let x = vars[0];
            let y = vars[1];
            vec![x * x, x * y]
        };

        let jac = compute_jacobian(f, &[2.0, 3.0]);

        // [[2x, 0], [y, x]] = [[4, 0], [3, 2]]
        assert_eq!(jac.shape(), (2, 2));
        assert!((jac[(0, 0)] - 4.0).abs() < 1e-10);
        assert!((jac[(0, 1)] - 0.0).abs() < 1e-10);
        assert!((jac[(1, 0)] - 3.0).abs() < 1e-10);
        assert!((jac[(1, 1)] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_write_partials_through_scalar_trait() {
        use crate::Scalar;

        fn span<T: Scalar>(aspect_ratio: T, area: T) -> T {
            (aspect_ratio * area).sqrt()
        }

        let inputs = Inputs::new().with("ar", 5.0).with("s", 10.0);
        let mut partials = Partials::new();
        write_partials(|v| vec![span(v[0], v[1])], &inputs, &["b"], &["ar", "s"], &mut partials).unwrap();

        let b = 50.0_f64.sqrt();
        assert!((partials.scalar("b", "ar").unwrap() - 10.0 / (2.0 * b)).abs() < 1e-12);
        assert!((partials.scalar("b", "s").unwrap() - 5.0 / (2.0 * b)).abs() < 1e-12);
    }

    #[test]
    fn test_write_partials_missing_input() {
        let mut partials = Partials::new();
        let result = write_partials(|v| v.to_vec(), &Inputs::new(), &["y"], &["x"], &mut partials);
        assert!(result.is_err());
        assert!(partials.is_empty());
    }
}
