//! Vertical tail geometry.

use super::planform::VERTICAL_TAIL;
use crate::{DerivativeMethod, Inputs, Node, NodeInterface, Outputs, Partials, Result};

/// Span, root chord and tip chord of the vertical tail.
///
/// # Examples
///
/// ```
/// use aerograph::{Inputs, evaluate_node};
/// use aerograph::models::ComputeVtChords;
///
/// let inputs = Inputs::new()
///     .with("geometry.vertical_tail.aspect_ratio", 5.0)
///     .with("geometry.vertical_tail.area", 10.0)
///     .with("geometry.vertical_tail.taper_ratio", 0.5);
/// let outputs = evaluate_node(&ComputeVtChords, &inputs)?;
///
/// assert!((outputs.scalar("geometry.vertical_tail.root.chord")? - 1.886).abs() < 1e-3);
/// # Ok::<(), aerograph::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeVtChords;

impl Node for ComputeVtChords {
    fn setup(&self, interface: &mut NodeInterface) {
        VERTICAL_TAIL.setup_chords(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        VERTICAL_TAIL.compute_chords(inputs, outputs)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        VERTICAL_TAIL.chord_partials(inputs, partials)
    }
}

/// Mean aerodynamic chord of the vertical tail: length, height above the
/// root (`mac.z`) and leading-edge offset from the root leading edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeVtMac;

impl Node for ComputeVtMac {
    fn setup(&self, interface: &mut NodeInterface) {
        VERTICAL_TAIL.setup_mac(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        VERTICAL_TAIL.compute_mac(inputs, outputs)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        VERTICAL_TAIL.mac_partials(inputs, partials)
    }
}

/// Effective aspect ratio of the vertical tail.
///
/// Not yet modeled: returns the geometric aspect ratio unchanged. The
/// end-plate effect of the fuselage and horizontal tail is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeVtEffectiveAspectRatio;

impl Node for ComputeVtEffectiveAspectRatio {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("geometry.vertical_tail.aspect_ratio", "");
        interface.add_output("aerodynamics.vertical_tail.effective_aspect_ratio", "");
        interface.declare_partials("*", "*", DerivativeMethod::Analytic);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let aspect_ratio = inputs.scalar("geometry.vertical_tail.aspect_ratio")?;
        outputs.set("aerodynamics.vertical_tail.effective_aspect_ratio", aspect_ratio)
    }

    fn compute_partials(&self, _inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        partials.set(
            "aerodynamics.vertical_tail.effective_aspect_ratio",
            "geometry.vertical_tail.aspect_ratio",
            1.0,
        );
        Ok(())
    }

    fn is_placeholder(&self) -> bool {
        true
    }
}
