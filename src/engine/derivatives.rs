//! Derivative provisioning.
//!
//! Nodes declare per (output, input) pair how a partial derivative is
//! obtained ([`DerivativeMethod`]). Finite differences are an engine-level
//! concern: [`finite_difference_jacobian`] is the only implementation and
//! every node and pipeline shares it. Analytic partials come from
//! [`Node::compute_partials`].

use nalgebra::DMatrix;

use crate::{Error, Inputs, Node, NodeInterface, Outputs, Partials, Result};

/// Finite-difference scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceForm {
    /// (f(x + h) - f(x)) / h
    Forward,
    /// (f(x + h) - f(x - h)) / 2h
    Central,
}

/// How a declared partial derivative is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivativeMethod {
    /// Approximated by the engine; `step` is relative to `max(1, |x|)`
    FiniteDifference { step: f64, form: DifferenceForm },
    /// Supplied by [`Node::compute_partials`]
    Analytic,
}

impl DerivativeMethod {
    /// Default relative step for finite differences.
    pub const DEFAULT_STEP: f64 = 1e-6;

    /// Forward differences with the default step.
    pub fn fd() -> Self {
        DerivativeMethod::FiniteDifference { step: Self::DEFAULT_STEP, form: DifferenceForm::Forward }
    }

    /// Central differences with the default step.
    pub fn central() -> Self {
        DerivativeMethod::FiniteDifference { step: Self::DEFAULT_STEP, form: DifferenceForm::Central }
    }
}

/// Approximates the Jacobian of `f` at `x`.
///
/// Row `i`, column `j` holds d f_i / d x_j.
///
/// # Examples
///
/// ```
/// use aerograph::engine::derivatives::finite_difference_jacobian;
/// use aerograph::DifferenceForm;
///
/// // f(x, y) = [x^2, xy]
/// let f = |v: &[f64]| Ok(vec![v[0] * v[0], v[0] * v[1]]);
/// let jac = finite_difference_jacobian(f, &[2.0, 3.0], 1e-6, DifferenceForm::Central).unwrap();
///
/// assert!((jac[(0, 0)] - 4.0).abs() < 1e-6);
/// assert!((jac[(1, 0)] - 3.0).abs() < 1e-6);
/// assert!((jac[(1, 1)] - 2.0).abs() < 1e-6);
/// ```
pub fn finite_difference_jacobian<F>(
    mut f: F,
    x: &[f64],
    step: f64,
    form: DifferenceForm,
) -> Result<DMatrix<f64>>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>>,
{
    let f0 = f(x)?;
    let n_vars = x.len();
    let n_eqs = f0.len();
    let mut jacobian = DMatrix::zeros(n_eqs, n_vars);
    let mut perturbed = x.to_vec();

    for j in 0..n_vars {
        let h = step * x[j].abs().max(1.0);
        match form {
            DifferenceForm::Forward => {
                perturbed[j] = x[j] + h;
                let f_plus = f(&perturbed)?;
                for i in 0..n_eqs {
                    jacobian[(i, j)] = (f_plus[i] - f0[i]) / h;
                }
            }
            DifferenceForm::Central => {
                perturbed[j] = x[j] + h;
                let f_plus = f(&perturbed)?;
                perturbed[j] = x[j] - h;
                let f_minus = f(&perturbed)?;
                for i in 0..n_eqs {
                    jacobian[(i, j)] = (f_plus[i] - f_minus[i]) / (2.0 * h);
                }
            }
        }
        perturbed[j] = x[j];
    }

    Ok(jacobian)
}

/// Computes every partial a node declares at the given inputs.
///
/// `inputs` must hold a value for every declared input.
pub fn node_partials(node: &dyn Node, interface: &NodeInterface, inputs: &Inputs) -> Result<Partials> {
    let pairs = interface.expanded_partials();
    let mut partials = Partials::new();

    let mut analytic = Partials::new();
    if pairs.iter().any(|(_, _, method)| *method == DerivativeMethod::Analytic) {
        node.compute_partials(inputs, &mut analytic)?;
    }

    for (of, wrt, method) in pairs {
        match method {
            DerivativeMethod::Analytic => {
                let block = analytic.get(&of, &wrt).ok_or_else(|| Error::MissingPartial {
                    of: of.clone(),
                    wrt: wrt.clone(),
                })?;
                partials.set_block(&of, &wrt, block.clone());
            }
            DerivativeMethod::FiniteDifference { step, form } => {
                let x0 = inputs.array(&wrt)?.to_vec();
                let mut perturbed = inputs.clone();
                let evaluate = |x: &[f64]| -> Result<Vec<f64>> {
                    perturbed.value_mut(&wrt)?.as_mut_slice().copy_from_slice(x);
                    let mut outputs = Outputs::from_declarations(interface.outputs());
                    node.compute(&perturbed, &mut outputs)?;
                    Ok(outputs.value(&of)?.as_slice().to_vec())
                };
                let block = finite_difference_jacobian(evaluate, &x0, step, form)?;
                partials.set_block(&of, &wrt, block);
            }
        }
    }

    Ok(partials)
}
