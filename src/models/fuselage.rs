//! Fuselage geometry.

use std::f64::consts::PI;

use crate::{DerivativeMethod, DomainError, Inputs, Node, NodeInterface, Outputs, Result, Scalar};

/// Wetted area of a fuselage (Torenbeek) from its length and equivalent
/// diameter `d = sqrt(width * height)`.
///
/// S_wet = pi d L (1 - 2/lambda)^(2/3) (1 + 1/lambda²), with lambda = L / d.
///
/// Generic over scalar type `S` to support both f64 and Dual64 for autodiff.
pub fn torenbeek_wet_area<S: Scalar>(length: S, diameter: S) -> S {
    let one = S::from(1.0);
    let fineness = length / diameter;
    S::from(PI) * diameter * length * (one - S::from(2.0) / fineness).powf(2.0 / 3.0)
        * (one + one / (fineness * fineness))
}

/// Maximum cross-section area, treating the section as an ellipse.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeFuselageCrossSection;

impl Node for ComputeFuselageCrossSection {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("geometry.fuselage.maximum_width", "m");
        interface.add_input("geometry.fuselage.maximum_height", "m");
        interface.add_output("geometry.fuselage.maximum_cross_section", "m**2");
        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let width = inputs.scalar("geometry.fuselage.maximum_width")?;
        let height = inputs.scalar("geometry.fuselage.maximum_height")?;
        outputs.set("geometry.fuselage.maximum_cross_section", PI / 4.0 * width * height)
    }
}

/// Wetted area and fineness ratio of the fuselage.
///
/// Fails with a [`DomainError`] when the fineness ratio is below 2, where
/// the slenderness correction has no real value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeFuselageWetArea;

impl Node for ComputeFuselageWetArea {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("geometry.fuselage.length", "m");
        interface.add_input("geometry.fuselage.maximum_width", "m");
        interface.add_input("geometry.fuselage.maximum_height", "m");

        interface.add_output("geometry.fuselage.fineness_ratio", "");
        interface.add_output("geometry.fuselage.wet_area", "m**2");

        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let length = inputs.scalar("geometry.fuselage.length")?;
        let width = inputs.scalar("geometry.fuselage.maximum_width")?;
        let height = inputs.scalar("geometry.fuselage.maximum_height")?;

        let diameter = (width * height).sqrt();
        let fineness =
            DomainError::check_range("geometry.fuselage.fineness_ratio", length / diameter, 2.0, f64::INFINITY)?;

        outputs.set("geometry.fuselage.fineness_ratio", fineness)?;
        outputs.set("geometry.fuselage.wet_area", torenbeek_wet_area(length, diameter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, evaluate_node};

    #[test]
    fn test_cross_section() {
        let inputs = Inputs::new()
            .with("geometry.fuselage.maximum_width", 2.0)
            .with("geometry.fuselage.maximum_height", 1.0);
        let outputs = evaluate_node(&ComputeFuselageCrossSection, &inputs).unwrap();
        let cross_section = outputs.scalar("geometry.fuselage.maximum_cross_section").unwrap();
        assert!((cross_section - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_torenbeek_wet_area() {
        // L = 10, d = 1: pi * 10 * 0.8^(2/3) * 1.01
        let expected = PI * 10.0 * 0.8_f64.powf(2.0 / 3.0) * 1.01;
        let inputs = Inputs::new()
            .with("geometry.fuselage.length", 10.0)
            .with("geometry.fuselage.maximum_width", 1.0)
            .with("geometry.fuselage.maximum_height", 1.0);
        let outputs = evaluate_node(&ComputeFuselageWetArea, &inputs).unwrap();

        assert!((outputs.scalar("geometry.fuselage.wet_area").unwrap() - expected).abs() < 1e-9);
        assert!((outputs.scalar("geometry.fuselage.wet_area").unwrap() - 27.35).abs() < 1e-2);
        assert_eq!(outputs.scalar("geometry.fuselage.fineness_ratio").unwrap(), 10.0);
    }

    #[test]
    fn test_stubby_fuselage_is_a_domain_error() {
        let inputs = Inputs::new()
            .with("geometry.fuselage.length", 3.0)
            .with("geometry.fuselage.maximum_width", 2.0)
            .with("geometry.fuselage.maximum_height", 2.0);
        assert!(matches!(evaluate_node(&ComputeFuselageWetArea, &inputs), Err(Error::Domain(_))));
    }
}
