//! Lift-curve slopes of the wing and the vertical tail.

use std::f64::consts::PI;

use super::planform::half_chord_sweep_tangent;
use crate::{DerivativeMethod, DomainError, Inputs, Node, NodeInterface, Outputs, Partials, Result, Scalar};

/// Highest Mach number accepted by the subsonic lift-slope formula.
pub const MAX_SUBSONIC_MACH: f64 = 0.95;

/// Lift-curve slope of a finite wing per radian (DATCOM / Helmbold).
///
/// CL_alpha = 2 pi A / (2 + sqrt(4 + (A² beta² / kappa²)(1 + tan² Lambda_50 / beta²)))
///
/// with beta = sqrt(1 - M²) and kappa = cl_alpha / 2 pi. `aspect_ratio` is
/// that of the full (mirrored) surface.
///
/// # Examples
///
/// ```
/// use aerograph::models::lift_slope::helmbold_lift_slope;
///
/// // Unswept A = 9 wing, incompressible, thin airfoil
/// let slope = helmbold_lift_slope(9.0, 0.0, 0.0, 2.0 * std::f64::consts::PI);
/// assert!((slope - 5.0399).abs() < 1e-3);
/// ```
pub fn helmbold_lift_slope<S: Scalar>(aspect_ratio: S, mach: S, tan_sweep_50: S, airfoil_lift_slope: S) -> S {
    let two_pi = S::from(2.0 * PI);
    let beta_squared = S::from(1.0) - mach * mach;
    let kappa = airfoil_lift_slope / two_pi;
    let sweep_term = S::from(1.0) + tan_sweep_50 * tan_sweep_50 / beta_squared;
    let root = (S::from(4.0) + aspect_ratio * aspect_ratio * beta_squared / (kappa * kappa) * sweep_term).sqrt();
    two_pi * aspect_ratio / (S::from(2.0) + root)
}

fn check_mach(mach: f64) -> Result<f64> {
    Ok(DomainError::check_range("mission.cruise.mach", mach, 0.0, MAX_SUBSONIC_MACH)?)
}

const WING_INPUTS: [&str; 5] = [
    "geometry.wing.aspect_ratio",
    "mission.cruise.mach",
    "geometry.wing.taper_ratio",
    "geometry.wing.sweep_25",
    "aerodynamics.wing.airfoil.cl_alpha",
];

/// Wing lift-curve slope in cruise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeClAlphaWing;

impl ComputeClAlphaWing {
    fn slope<S: Scalar>(x: &[S]) -> S {
        let tan_sweep_50 = half_chord_sweep_tangent(x[0], x[2], x[3]);
        helmbold_lift_slope(x[0], x[1], tan_sweep_50, x[4])
    }
}

impl Node for ComputeClAlphaWing {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("geometry.wing.aspect_ratio", "");
        interface.add_input("mission.cruise.mach", "");
        interface.add_input("geometry.wing.taper_ratio", "");
        interface.add_input("geometry.wing.sweep_25", "rad");
        interface
            .add_input("aerodynamics.wing.airfoil.cl_alpha", "rad**-1")
            .with_default(2.0 * PI)
            .with_desc("Section lift-curve slope");
        interface.add_output("aerodynamics.wing.cruise.cl_alpha", "rad**-1");
        declare_slope_partials(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let x = WING_INPUTS.iter().map(|key| inputs.scalar(key)).collect::<Result<Vec<f64>>>()?;
        check_mach(x[1])?;
        outputs.set("aerodynamics.wing.cruise.cl_alpha", Self::slope(&x))
    }

    #[cfg(feature = "autodiff")]
    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        crate::autodiff::write_partials(
            |x| vec![Self::slope(x)],
            inputs,
            &["aerodynamics.wing.cruise.cl_alpha"],
            &WING_INPUTS,
            partials,
        )
    }
}

const VT_INPUTS: [&str; 6] = [
    "aerodynamics.vertical_tail.effective_aspect_ratio",
    "mission.cruise.mach",
    "geometry.vertical_tail.aspect_ratio",
    "geometry.vertical_tail.taper_ratio",
    "geometry.vertical_tail.sweep_25",
    "aerodynamics.vertical_tail.airfoil.cl_alpha",
];

/// Vertical tail lift-curve slope (side force per radian of sideslip at
/// the fin) in cruise.
///
/// The slope uses the effective aspect ratio; the half-chord sweep follows
/// from the geometric planform, mirrored about the fin root.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeClAlphaVt;

impl ComputeClAlphaVt {
    fn slope<S: Scalar>(x: &[S]) -> S {
        // Mirrored about the root, the fin is a surface of twice its aspect ratio
        let tan_sweep_50 = half_chord_sweep_tangent(S::from(2.0) * x[2], x[3], x[4]);
        helmbold_lift_slope(x[0], x[1], tan_sweep_50, x[5])
    }
}

impl Node for ComputeClAlphaVt {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("aerodynamics.vertical_tail.effective_aspect_ratio", "");
        interface.add_input("mission.cruise.mach", "");
        interface.add_input("geometry.vertical_tail.aspect_ratio", "");
        interface.add_input("geometry.vertical_tail.taper_ratio", "");
        interface.add_input("geometry.vertical_tail.sweep_25", "rad");
        interface
            .add_input("aerodynamics.vertical_tail.airfoil.cl_alpha", "rad**-1")
            .with_default(2.0 * PI);
        interface.add_output("aerodynamics.vertical_tail.cruise.cl_alpha", "rad**-1");
        declare_slope_partials(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let x = VT_INPUTS.iter().map(|key| inputs.scalar(key)).collect::<Result<Vec<f64>>>()?;
        check_mach(x[1])?;
        outputs.set("aerodynamics.vertical_tail.cruise.cl_alpha", Self::slope(&x))
    }

    #[cfg(feature = "autodiff")]
    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        crate::autodiff::write_partials(
            |x| vec![Self::slope(x)],
            inputs,
            &["aerodynamics.vertical_tail.cruise.cl_alpha"],
            &VT_INPUTS,
            partials,
        )
    }
}

fn declare_slope_partials(interface: &mut NodeInterface) {
    #[cfg(feature = "autodiff")]
    interface.declare_partials("*", "*", DerivativeMethod::Analytic);
    #[cfg(not(feature = "autodiff"))]
    interface.declare_partials("*", "*", DerivativeMethod::central());
}
