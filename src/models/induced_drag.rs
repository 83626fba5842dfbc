//! Induced drag.

use std::f64::consts::PI;

use crate::{DerivativeMethod, Inputs, Node, NodeInterface, Outputs, Partials, Result, Scalar};

/// Oswald efficiency of a straight wing (Raymer):
/// e = 1.78 (1 - 0.045 A^0.68) - 0.64.
pub fn oswald_efficiency<S: Scalar>(aspect_ratio: S) -> S {
    S::from(1.78) * (S::from(1.0) - S::from(0.045) * aspect_ratio.powf(0.68)) - S::from(0.64)
}

/// Oswald efficiency and the induced drag factor `k` in
/// CD_i = k CL², with k = 1 / (pi A e).
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeInducedDragCoefficient;

impl ComputeInducedDragCoefficient {
    fn evaluate<S: Scalar>(aspect_ratio: S) -> [S; 2] {
        let efficiency = oswald_efficiency(aspect_ratio);
        [efficiency, S::from(1.0) / (S::from(PI) * aspect_ratio * efficiency)]
    }
}

impl Node for ComputeInducedDragCoefficient {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("geometry.wing.aspect_ratio", "");
        interface.add_output("aerodynamics.wing.oswald_efficiency", "");
        interface.add_output("aerodynamics.aircraft.cruise.induced_drag_factor", "");
        interface.declare_partials("*", "*", DerivativeMethod::Analytic);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let [efficiency, factor] = Self::evaluate(inputs.scalar("geometry.wing.aspect_ratio")?);
        outputs.set("aerodynamics.wing.oswald_efficiency", efficiency)?;
        outputs.set("aerodynamics.aircraft.cruise.induced_drag_factor", factor)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        let aspect_ratio = inputs.scalar("geometry.wing.aspect_ratio")?;
        let [efficiency, factor] = Self::evaluate(aspect_ratio);

        // de/dA = -1.78 * 0.045 * 0.68 A^-0.32
        let d_efficiency = -1.78 * 0.045 * 0.68 * aspect_ratio.powf(-0.32);
        let d_factor = -factor * (1.0 / aspect_ratio + d_efficiency / efficiency);

        partials.set("aerodynamics.wing.oswald_efficiency", "geometry.wing.aspect_ratio", d_efficiency);
        partials.set(
            "aerodynamics.aircraft.cruise.induced_drag_factor",
            "geometry.wing.aspect_ratio",
            d_factor,
        );
        Ok(())
    }
}
