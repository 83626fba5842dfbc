//! Trapezoidal planform geometry shared by the wing and the tails.
//!
//! Formulas are generic over [`Scalar`] so the same code yields values with
//! `f64` and exact partials with dual numbers.
//!
//! A *mirrored* surface (wing, horizontal tail) has its span measured tip to
//! tip and its spanwise quantities measured on one side (semi-span). The
//! vertical tail is not mirrored: its span is the distance from root to tip.

use crate::{DerivativeMethod, Inputs, NodeInterface, Outputs, Partials, Result, Scalar};

/// Span, root chord and tip chord of a trapezoid from its aspect ratio,
/// area and taper ratio.
///
/// For a mirrored surface the formulas apply as is; for a single surface
/// the area and span are those of the one panel.
///
/// # Examples
///
/// ```
/// use aerograph::models::planform::trapezoid_chords;
///
/// let [span, root, tip] = trapezoid_chords(5.0, 10.0, 0.5);
/// assert!((span - 7.071).abs() < 1e-3);
/// assert!((root - 1.886).abs() < 1e-3);
/// assert!((tip - 0.943).abs() < 1e-3);
/// ```
pub fn trapezoid_chords<S: Scalar>(aspect_ratio: S, area: S, taper_ratio: S) -> [S; 3] {
    let span = (aspect_ratio * area).sqrt();
    let root = area * S::from(2.0) / ((S::from(1.0) + taper_ratio) * span);
    let tip = root * taper_ratio;
    [span, root, tip]
}

/// Mean aerodynamic chord of a trapezoidal panel.
///
/// Returns the MAC length, its spanwise position from the root and the
/// longitudinal offset of its leading edge from the root leading edge.
/// `side_span` is the root-to-tip distance of one panel.
pub fn mean_aerodynamic_chord<S: Scalar>(root: S, tip: S, side_span: S, sweep_25: S) -> [S; 3] {
    let length = S::from(2.0 / 3.0) * (root * root + root * tip + tip * tip) / (root + tip);
    let position = side_span / S::from(3.0) * (root + S::from(2.0) * tip) / (root + tip);
    let x_local = position * leading_edge_sweep_tangent(root, tip, side_span, sweep_25);
    [length, position, x_local]
}

/// Tangent of the leading-edge sweep from the quarter-chord sweep.
pub fn leading_edge_sweep_tangent<S: Scalar>(root: S, tip: S, side_span: S, sweep_25: S) -> S {
    sweep_25.tan() + (root - tip) / (S::from(4.0) * side_span)
}

/// Tangent of the half-chord sweep of a mirrored planform from its
/// quarter-chord sweep.
///
/// `aspect_ratio` is that of the full (mirrored) surface.
pub fn half_chord_sweep_tangent<S: Scalar>(aspect_ratio: S, taper_ratio: S, sweep_25: S) -> S {
    let one = S::from(1.0);
    sweep_25.tan() - (one - taper_ratio) / (aspect_ratio * (one + taper_ratio))
}

/// Key layout and node bodies for one lifting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Surface {
    /// Key prefix, e.g. `geometry.wing`
    pub prefix: &'static str,
    pub mirrored: bool,
}

pub(crate) const WING: Surface = Surface { prefix: "geometry.wing", mirrored: true };
pub(crate) const HORIZONTAL_TAIL: Surface = Surface { prefix: "geometry.horizontal_tail", mirrored: true };
pub(crate) const VERTICAL_TAIL: Surface = Surface { prefix: "geometry.vertical_tail", mirrored: false };

impl Surface {
    pub fn key(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, name)
    }

    /// Spanwise axis of the MAC position: `z` for the fin, `y` otherwise.
    fn mac_position_key(&self) -> String {
        if self.mirrored { self.key("mac.y") } else { self.key("mac.z") }
    }

    fn chord_inputs(&self) -> [String; 3] {
        [self.key("aspect_ratio"), self.key("area"), self.key("taper_ratio")]
    }

    fn chord_outputs(&self) -> [String; 3] {
        [self.key("span"), self.key("root.chord"), self.key("tip.chord")]
    }

    fn mac_inputs(&self) -> [String; 4] {
        [self.key("root.chord"), self.key("tip.chord"), self.key("span"), self.key("sweep_25")]
    }

    fn mac_outputs(&self) -> [String; 3] {
        [self.key("mac.length"), self.mac_position_key(), self.key("mac.x_local")]
    }

    pub fn setup_chords(&self, interface: &mut NodeInterface) {
        let [aspect_ratio, area, taper_ratio] = self.chord_inputs();
        interface.add_input(&aspect_ratio, "").with_desc("Geometric aspect ratio");
        interface.add_input(&area, "m**2").with_desc("Reference area");
        interface.add_input(&taper_ratio, "").with_desc("Tip to root chord ratio");

        let [span, root, tip] = self.chord_outputs();
        interface.add_output(&span, "m");
        interface.add_output(&root, "m");
        interface.add_output(&tip, "m");

        declare_all_partials(interface);
    }

    pub fn compute_chords(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let [aspect_ratio, area, taper_ratio] = self.chord_inputs();
        let values = trapezoid_chords(
            inputs.scalar(&aspect_ratio)?,
            inputs.scalar(&area)?,
            inputs.scalar(&taper_ratio)?,
        );
        for (key, value) in self.chord_outputs().iter().zip(values) {
            outputs.set(key, value)?;
        }
        Ok(())
    }

    #[cfg(feature = "autodiff")]
    pub fn chord_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        let wrt = self.chord_inputs();
        let of = self.chord_outputs();
        crate::autodiff::write_partials(
            |x| trapezoid_chords(x[0], x[1], x[2]).to_vec(),
            inputs,
            &of.each_ref().map(String::as_str),
            &wrt.each_ref().map(String::as_str),
            partials,
        )
    }

    pub fn setup_mac(&self, interface: &mut NodeInterface) {
        let [root, tip, span, sweep] = self.mac_inputs();
        interface.add_input(&root, "m");
        interface.add_input(&tip, "m");
        interface.add_input(&span, "m");
        interface.add_input(&sweep, "rad").with_desc("Quarter-chord sweep angle");

        let [length, position, x_local] = self.mac_outputs();
        interface.add_output(&length, "m");
        interface.add_output(&position, "m").with_desc("Spanwise position from the root");
        interface.add_output(&x_local, "m").with_desc("Leading edge offset from the root leading edge");

        declare_all_partials(interface);
    }

    fn mac_values<S: Scalar>(&self, x: &[S]) -> [S; 3] {
        let side_span = if self.mirrored { x[2] / S::from(2.0) } else { x[2] };
        mean_aerodynamic_chord(x[0], x[1], side_span, x[3])
    }

    pub fn compute_mac(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let x = self.mac_inputs().iter().map(|key| inputs.scalar(key)).collect::<Result<Vec<f64>>>()?;
        for (key, value) in self.mac_outputs().iter().zip(self.mac_values(&x)) {
            outputs.set(key, value)?;
        }
        Ok(())
    }

    #[cfg(feature = "autodiff")]
    pub fn mac_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        let wrt = self.mac_inputs();
        let of = self.mac_outputs();
        crate::autodiff::write_partials(
            |x| self.mac_values(x).to_vec(),
            inputs,
            &of.each_ref().map(String::as_str),
            &wrt.each_ref().map(String::as_str),
            partials,
        )
    }
}

/// Analytic partials when dual numbers are available, forward differences
/// otherwise.
fn declare_all_partials(interface: &mut NodeInterface) {
    #[cfg(feature = "autodiff")]
    interface.declare_partials("*", "*", DerivativeMethod::Analytic);
    #[cfg(not(feature = "autodiff"))]
    interface.declare_partials("*", "*", DerivativeMethod::fd());
}

#[cfg(not(feature = "autodiff"))]
impl Surface {
    pub fn chord_partials(&self, _inputs: &Inputs, _partials: &mut Partials) -> Result<()> {
        Ok(())
    }

    pub fn mac_partials(&self, _inputs: &Inputs, _partials: &mut Partials) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_mac_equals_chord() {
        let [length, position, x_local] = mean_aerodynamic_chord(2.0, 2.0, 5.0, 0.0);
        assert!((length - 2.0).abs() < 1e-12);
        assert!((position - 2.5).abs() < 1e-12);
        assert!(x_local.abs() < 1e-12);
    }

    #[test]
    fn test_tapered_mac() {
        // rc = 2, tc = 1: MAC = 2/3 * 7 / 3 = 14/9, position = b/3 * 4/3
        let [length, position, _] = mean_aerodynamic_chord(2.0, 1.0, 6.0, 0.0);
        assert!((length - 14.0 / 9.0).abs() < 1e-12);
        assert!((position - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_leading_edge_sweep_of_unswept_quarter_chord() {
        // Quarter-chord line straight: the leading edge sweeps back by (rc - tc) / 4 over the span
        let tan_le = leading_edge_sweep_tangent(2.0, 1.0, 5.0, 0.0);
        assert!((tan_le - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_half_chord_sweep_consistent_with_chords() {
        // Mirrored wing: A = 8, S = 32 -> b = 16, rc = 2.667, tc = 1.333 (taper 0.5)
        let [span, root, tip] = trapezoid_chords(8.0, 32.0, 0.5);
        let from_chords = 0.0 - (root - tip) / (4.0 * span / 2.0);
        let from_ratio = half_chord_sweep_tangent(8.0, 0.5, 0.0);
        assert!((from_chords - from_ratio).abs() < 1e-12);
    }

    #[test]
    fn test_surface_keys() {
        assert_eq!(VERTICAL_TAIL.mac_outputs()[1], "geometry.vertical_tail.mac.z");
        assert_eq!(WING.mac_outputs()[1], "geometry.wing.mac.y");
        assert_eq!(HORIZONTAL_TAIL.chord_outputs()[1], "geometry.horizontal_tail.root.chord");
    }
}
