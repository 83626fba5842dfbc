//! Compressibility drag.

use crate::{DerivativeMethod, Inputs, Node, NodeInterface, Outputs, Result};

/// Drag rise versus Mach number: (Mach, delta Cd).
const DRAG_RISE: [(f64, f64); 14] = [
    (0.0, 0.0),
    (0.5, 0.0),
    (0.6, 0.0005),
    (0.7, 0.0015),
    (0.75, 0.003),
    (0.8, 0.005),
    (0.85, 0.008),
    (0.9, 0.0125),
    (0.95, 0.019),
    (1.0, 0.025),
    (1.05, 0.028),
    (1.1, 0.0295),
    (1.2, 0.03),
    (1.5, 0.027),
];

/// Compressibility drag increment at `mach`, interpolated linearly in a
/// generic drag-rise curve.
///
/// Mach numbers outside the table take the value at the nearest end.
///
/// # Examples
///
/// ```
/// use aerograph::models::get_drag_compressibility;
///
/// assert_eq!(get_drag_compressibility(0.3), 0.0);
/// assert!((get_drag_compressibility(0.8) - 0.005).abs() < 1e-12);
/// assert!((get_drag_compressibility(1.0) - 0.025).abs() < 1e-12);
/// assert!((get_drag_compressibility(1.2) - 0.03).abs() < 1e-12);
/// ```
pub fn get_drag_compressibility(mach: f64) -> f64 {
    let (first_mach, first_cd) = DRAG_RISE[0];
    let (last_mach, last_cd) = DRAG_RISE[DRAG_RISE.len() - 1];
    if mach.is_nan() {
        return f64::NAN;
    }
    if mach <= first_mach {
        return first_cd;
    }
    if mach >= last_mach {
        return last_cd;
    }

    DRAG_RISE
        .windows(2)
        .find(|w| mach <= w[1].0)
        .map(|w| {
            let ((m0, cd0), (m1, cd1)) = (w[0], w[1]);
            cd0 + (cd1 - cd0) * (mach - m0) / (m1 - m0)
        })
        .unwrap_or(last_cd)
}

/// Compressibility drag coefficient in cruise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeCdCompressibility;

impl Node for ComputeCdCompressibility {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("mission.cruise.mach", "");
        interface.add_output("aerodynamics.cruise.cd_compressibility", "");
        interface.declare_partials("*", "*", DerivativeMethod::central());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let mach = inputs.scalar("mission.cruise.mach")?;
        outputs.set("aerodynamics.cruise.cd_compressibility", get_drag_compressibility(mach))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate_node;

    #[test]
    fn test_reference_points() {
        assert!(get_drag_compressibility(0.3).abs() < 1e-12);
        assert!((get_drag_compressibility(0.8) - 0.005).abs() < 1e-12);
        assert!((get_drag_compressibility(1.0) - 0.025).abs() < 1e-12);
        assert!((get_drag_compressibility(1.2) - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_interpolation_and_clamping() {
        assert!((get_drag_compressibility(0.825) - 0.0065).abs() < 1e-12);
        assert_eq!(get_drag_compressibility(-0.1), 0.0);
        assert_eq!(get_drag_compressibility(2.0), 0.027);
    }

    #[test]
    fn test_table_is_sorted() {
        assert!(DRAG_RISE.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_node() {
        let inputs = Inputs::new().with("mission.cruise.mach", 0.9);
        let outputs = evaluate_node(&ComputeCdCompressibility, &inputs).unwrap();
        assert!((outputs.scalar("aerodynamics.cruise.cd_compressibility").unwrap() - 0.0125).abs() < 1e-12);
    }
}
