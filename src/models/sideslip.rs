//! Fuselage contributions to the sideslip derivatives.

use crate::{DerivativeMethod, DomainError, Inputs, Node, NodeInterface, Outputs, Partials, Result};

/// Wing-body interference factor K_i on the fuselage side force, as a
/// function of the wing vertical position ratio `z_w / (h_fus / 2)`.
///
/// Positive ratios are high wings, negative are low wings. The factor is
/// 1 for a mid wing and grows linearly toward either extreme:
/// 1 + 0.85 r above, 1 - 0.5 r below. Ratios outside [-1, 1] put the wing
/// off the fuselage and are rejected.
///
/// # Examples
///
/// ```
/// use aerograph::models::wing_body_interference_factor;
///
/// assert_eq!(wing_body_interference_factor(0.0).unwrap(), 1.0);
/// assert!((wing_body_interference_factor(1.0).unwrap() - 1.85).abs() < 1e-12);
/// assert!((wing_body_interference_factor(-1.0).unwrap() - 1.5).abs() < 1e-12);
/// assert!(wing_body_interference_factor(1.5).is_err());
/// ```
pub fn wing_body_interference_factor(ratio: f64) -> std::result::Result<f64, DomainError> {
    let ratio = DomainError::check_range("geometry.wing.vertical_position_ratio", ratio, -1.0, 1.0)?;
    Ok(if ratio >= 0.0 { 1.0 + 0.85 * ratio } else { 1.0 - 0.5 * ratio })
}

fn interference_slope(ratio: f64) -> f64 {
    if ratio >= 0.0 { 0.85 } else { -0.5 }
}

/// Side-force derivative of the fuselage:
/// CY_beta = -2 K_i S_0 / S_w, referenced to the wing area.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeCyBetaFuselage;

impl Node for ComputeCyBetaFuselage {
    fn setup(&self, interface: &mut NodeInterface) {
        interface
            .add_input("geometry.wing.vertical_position_ratio", "")
            .with_default(0.0)
            .with_desc("Wing height above the fuselage centreline over half the fuselage height");
        interface.add_input("geometry.fuselage.maximum_cross_section", "m**2");
        interface.add_input("geometry.wing.area", "m**2");
        interface.add_output("aerodynamics.fuselage.cy_beta", "rad**-1");
        interface.declare_partials("*", "*", DerivativeMethod::Analytic);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let ratio = inputs.scalar("geometry.wing.vertical_position_ratio")?;
        let cross_section = inputs.scalar("geometry.fuselage.maximum_cross_section")?;
        let wing_area = inputs.scalar("geometry.wing.area")?;

        let factor = wing_body_interference_factor(ratio)?;
        outputs.set("aerodynamics.fuselage.cy_beta", -2.0 * factor * cross_section / wing_area)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        let ratio = inputs.scalar("geometry.wing.vertical_position_ratio")?;
        let cross_section = inputs.scalar("geometry.fuselage.maximum_cross_section")?;
        let wing_area = inputs.scalar("geometry.wing.area")?;
        let factor = wing_body_interference_factor(ratio)?;

        let of = "aerodynamics.fuselage.cy_beta";
        partials.set(
            of,
            "geometry.wing.vertical_position_ratio",
            -2.0 * interference_slope(ratio) * cross_section / wing_area,
        );
        partials.set(of, "geometry.fuselage.maximum_cross_section", -2.0 * factor / wing_area);
        partials.set(of, "geometry.wing.area", 2.0 * factor * cross_section / (wing_area * wing_area));
        Ok(())
    }
}

/// Rolling-moment derivative of the fuselage. Neglected: always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeClBetaFuselage;

impl Node for ComputeClBetaFuselage {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_output("aerodynamics.fuselage.cl_beta", "rad**-1");
    }

    fn compute(&self, _inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        outputs.set("aerodynamics.fuselage.cl_beta", 0.0)
    }

    fn is_placeholder(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::derivatives::node_partials;
    use crate::{Error, evaluate_node, interface_of};

    fn inputs(ratio: f64) -> Inputs {
        Inputs::new()
            .with("geometry.wing.vertical_position_ratio", ratio)
            .with("geometry.fuselage.maximum_cross_section", 2.0)
            .with("geometry.wing.area", 20.0)
    }

    #[test]
    fn test_interference_factor_is_continuous_at_mid_wing() {
        let below = wing_body_interference_factor(-1e-9).unwrap();
        let above = wing_body_interference_factor(1e-9).unwrap();
        assert!((below - 1.0).abs() < 1e-8);
        assert!((above - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_high_wing_side_force() {
        let outputs = evaluate_node(&ComputeCyBetaFuselage, &inputs(0.5)).unwrap();
        // -2 * 1.425 * 2 / 20
        assert!((outputs.scalar("aerodynamics.fuselage.cy_beta").unwrap() + 0.285).abs() < 1e-12);
    }

    #[test]
    fn test_wing_off_fuselage_is_a_domain_error() {
        assert!(matches!(evaluate_node(&ComputeCyBetaFuselage, &inputs(-1.2)), Err(Error::Domain(_))));
    }

    #[test]
    fn test_cy_beta_partials() {
        let interface = interface_of(&ComputeCyBetaFuselage);
        let partials = node_partials(&ComputeCyBetaFuselage, &interface, &inputs(-0.4)).unwrap();
        let of = "aerodynamics.fuselage.cy_beta";

        assert!((partials.scalar(of, "geometry.wing.vertical_position_ratio").unwrap() - 0.1).abs() < 1e-12);
        assert!((partials.scalar(of, "geometry.fuselage.maximum_cross_section").unwrap() + 0.12).abs() < 1e-12);
        assert!((partials.scalar(of, "geometry.wing.area").unwrap() - 0.012).abs() < 1e-12);
    }

    #[test]
    fn test_cl_beta_placeholder() {
        assert!(ComputeClBetaFuselage.is_placeholder());
        let outputs = evaluate_node(&ComputeClBetaFuselage, &Inputs::new()).unwrap();
        assert_eq!(outputs.scalar("aerodynamics.fuselage.cl_beta").unwrap(), 0.0);
    }
}
