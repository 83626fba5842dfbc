//! Wing geometry.

use super::planform::WING;
use crate::{DerivativeMethod, DomainError, Inputs, Node, NodeInterface, Options, Outputs, Partials, Result};

/// Span, root chord and tip chord of the wing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeWingChords;

impl Node for ComputeWingChords {
    fn setup(&self, interface: &mut NodeInterface) {
        WING.setup_chords(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        WING.compute_chords(inputs, outputs)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        WING.chord_partials(inputs, partials)
    }
}

/// Mean aerodynamic chord of the wing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeWingMac;

impl Node for ComputeWingMac {
    fn setup(&self, interface: &mut NodeInterface) {
        WING.setup_mac(interface);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        WING.compute_mac(inputs, outputs)
    }

    fn compute_partials(&self, inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        WING.mac_partials(inputs, partials)
    }
}

/// Wetted area of the wing (Raymer).
///
/// The exposed area removes the part of the planform covered by the
/// fuselage, approximated by the root chord times the fuselage width:
///
/// S_exp = S - c_root * w_fus
/// S_wet = S_exp * (1.977 + 0.52 t/c)
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeWingWetArea;

impl Node for ComputeWingWetArea {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("geometry.wing.area", "m**2");
        interface.add_input("geometry.wing.root.chord", "m");
        interface.add_input("geometry.wing.thickness_ratio", "");
        interface.add_input("geometry.fuselage.maximum_width", "m");

        interface.add_output("geometry.wing.exposed_area", "m**2");
        interface.add_output("geometry.wing.wet_area", "m**2");

        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let area = inputs.scalar("geometry.wing.area")?;
        let root_chord = inputs.scalar("geometry.wing.root.chord")?;
        let thickness_ratio = inputs.scalar("geometry.wing.thickness_ratio")?;
        let fuselage_width = inputs.scalar("geometry.fuselage.maximum_width")?;

        let exposed = area - root_chord * fuselage_width;
        outputs.set("geometry.wing.exposed_area", exposed)?;
        outputs.set("geometry.wing.wet_area", exposed * (1.977 + 0.52 * thickness_ratio))
    }
}

/// Chord at evenly spaced stations from root to tip.
///
/// Option `stations` (integer, at least 2, default 10) fixes the length of
/// the `geometry.wing.chord_distribution` array.
#[derive(Debug, Clone, Copy)]
pub struct ComputeWingChordDistribution {
    stations: usize,
}

impl ComputeWingChordDistribution {
    pub const DEFAULT_STATIONS: i64 = 10;

    pub fn new(stations: usize) -> Result<Self> {
        DomainError::check_range("stations", stations as f64, 2.0, 1000.0)?;
        Ok(ComputeWingChordDistribution { stations })
    }

    pub fn from_options(options: &Options) -> Result<Self> {
        let stations = options.get_int("stations", Self::DEFAULT_STATIONS)?;
        Self::new(stations.max(0) as usize)
    }

    pub fn stations(&self) -> usize {
        self.stations
    }
}

impl Default for ComputeWingChordDistribution {
    fn default() -> Self {
        ComputeWingChordDistribution { stations: Self::DEFAULT_STATIONS as usize }
    }
}

impl Node for ComputeWingChordDistribution {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("geometry.wing.root.chord", "m");
        interface.add_input("geometry.wing.tip.chord", "m");
        interface
            .add_array_output("geometry.wing.chord_distribution", self.stations, "m")
            .with_desc("Chord from root (first) to tip (last)");
        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let root = inputs.scalar("geometry.wing.root.chord")?;
        let tip = inputs.scalar("geometry.wing.tip.chord")?;
        let last = (self.stations - 1) as f64;

        let chords = (0..self.stations)
            .map(|i| {
                let eta = i as f64 / last;
                root + (tip - root) * eta
            })
            .collect();
        outputs.set_array("geometry.wing.chord_distribution", chords)
    }
}
