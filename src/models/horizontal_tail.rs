//! Horizontal tail geometry.

use super::planform::HORIZONTAL_TAIL;
use crate::{Inputs, Node, NodeInterface, Outputs, Partials, Result};

/// Span, root chord and tip chord of the horizontal tail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeHtChords;

impl Node for ComputeHtChords {
    fn setup(&self, interface: &mut NodeInterface) {
        HORIZONTAL_TAIL.setup_chords(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        HORIZONTAL_TAIL.compute_chords(inputs, outputs)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        HORIZONTAL_TAIL.chord_partials(inputs, partials)
    }
}

/// Mean aerodynamic chord of the horizontal tail, positioned on one side
/// (`mac.y` measured along the semi-span).
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeHtMac;

impl Node for ComputeHtMac {
    fn setup(&self, interface: &mut NodeInterface) {
        HORIZONTAL_TAIL.setup_mac(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        HORIZONTAL_TAIL.compute_mac(inputs, outputs)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        HORIZONTAL_TAIL.mac_partials(inputs, partials)
    }
}
