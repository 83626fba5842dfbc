//! Profile (zero-lift) drag build-up.
//!
//! Each component contributes `cf * FF * S_wet / S_ref` where `cf` is the
//! turbulent flat-plate skin friction at the component's Reynolds number,
//! `FF` a form factor and `S_ref` the wing area. The total applies a
//! leakage and protuberance factor on the sum of the components.

use crate::{DerivativeMethod, DomainError, Inputs, Node, NodeInterface, Options, Outputs, Partials, Result, Scalar};

const UNIT_REYNOLDS: &str = "aerodynamics.cruise.unit_reynolds";
const MACH: &str = "mission.cruise.mach";
const WING_AREA: &str = "geometry.wing.area";

/// Lowest Mach number accepted by nodes using [`raymer_form_factor`].
pub const MIN_FORM_FACTOR_MACH: f64 = 0.01;

/// Turbulent flat-plate skin friction coefficient with compressibility
/// correction (Raymer).
///
/// cf = 0.455 / ((log10 Re)^2.58 (1 + 0.144 M²)^0.65)
///
/// Generic over scalar type `S` to support both f64 and Dual64 for autodiff.
pub fn skin_friction_coefficient<S: Scalar>(reynolds: S, mach: S) -> S {
    let compressibility = (S::from(1.0) + S::from(0.144) * mach * mach).powf(0.65);
    S::from(0.455) / (reynolds.log10().powf(2.58) * compressibility)
}

/// Form factor of a lifting surface (Raymer).
///
/// `thickness_location` is the chordwise position of maximum thickness and
/// `sweep` the sweep of that line, approximated here by the quarter-chord
/// sweep. The `M^0.18` term makes the factor vanish at M = 0: the fit only
/// holds in forward flight, so the nodes reject Mach numbers below
/// [`MIN_FORM_FACTOR_MACH`].
pub fn raymer_form_factor(thickness_ratio: f64, thickness_location: f64, mach: f64, sweep: f64) -> f64 {
    let thickness_term = 1.0 + 0.6 / thickness_location * thickness_ratio + 100.0 * thickness_ratio.powi(4);
    thickness_term * 1.34 * mach.powf(0.18) * sweep.cos().powf(0.28)
}

/// Form factor of a lifting surface from its thickness alone (Hoerner).
pub fn hoerner_form_factor(thickness_ratio: f64) -> f64 {
    1.0 + 2.0 * thickness_ratio + 60.0 * thickness_ratio.powi(4)
}

/// Form factor of a fuselage from its fineness ratio (Raymer).
pub fn fuselage_form_factor(fineness_ratio: f64) -> f64 {
    1.0 + 60.0 / fineness_ratio.powi(3) + fineness_ratio / 400.0
}

/// Wetted area of a thin lifting surface from its planform area.
pub fn lifting_surface_wet_area(area: f64, thickness_ratio: f64) -> f64 {
    area * (1.977 + 0.52 * thickness_ratio)
}

fn forward_flight_mach(inputs: &Inputs) -> Result<f64> {
    Ok(DomainError::check_range(MACH, inputs.scalar(MACH)?, MIN_FORM_FACTOR_MACH, f64::INFINITY)?)
}

fn add_flight_inputs(interface: &mut NodeInterface) {
    interface.add_input(UNIT_REYNOLDS, "m**-1").with_desc("Reynolds number per unit length");
    interface.add_input(MACH, "");
    interface.add_input(WING_AREA, "m**2");
}

/// Wing profile drag with the Raymer form factor.
///
/// Option `thickness_location` (float, default 0.3): chordwise position of
/// maximum thickness.
#[derive(Debug, Clone, Copy)]
pub struct ComputeCd0WingLegacy {
    thickness_location: f64,
}

impl ComputeCd0WingLegacy {
    pub const DEFAULT_THICKNESS_LOCATION: f64 = 0.3;

    pub fn new(thickness_location: f64) -> Result<Self> {
        let thickness_location = DomainError::check_range("thickness_location", thickness_location, 0.01, 0.99)?;
        Ok(ComputeCd0WingLegacy { thickness_location })
    }

    pub fn from_options(options: &Options) -> Result<Self> {
        Self::new(options.get_float("thickness_location", Self::DEFAULT_THICKNESS_LOCATION)?)
    }
}

impl Default for ComputeCd0WingLegacy {
    fn default() -> Self {
        ComputeCd0WingLegacy { thickness_location: Self::DEFAULT_THICKNESS_LOCATION }
    }
}

impl Node for ComputeCd0WingLegacy {
    fn setup(&self, interface: &mut NodeInterface) {
        add_flight_inputs(interface);
        interface.add_input("geometry.wing.mac.length", "m");
        interface.add_input("geometry.wing.thickness_ratio", "");
        interface.add_input("geometry.wing.sweep_25", "rad");
        interface.add_input("geometry.wing.wet_area", "m**2");
        interface.add_output("aerodynamics.wing.cruise.cd0", "");
        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let mach = forward_flight_mach(inputs)?;
        let reynolds = inputs.scalar(UNIT_REYNOLDS)? * inputs.scalar("geometry.wing.mac.length")?;
        let thickness_ratio = inputs.scalar("geometry.wing.thickness_ratio")?;
        let sweep = inputs.scalar("geometry.wing.sweep_25")?;

        let cf = skin_friction_coefficient(reynolds, mach);
        let ff = raymer_form_factor(thickness_ratio, self.thickness_location, mach, sweep);
        let cd0 = cf * ff * inputs.scalar("geometry.wing.wet_area")? / inputs.scalar(WING_AREA)?;
        outputs.set("aerodynamics.wing.cruise.cd0", cd0)
    }
}

/// Wing profile drag with the Hoerner thickness form factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeCd0WingHoerner;

impl Node for ComputeCd0WingHoerner {
    fn setup(&self, interface: &mut NodeInterface) {
        add_flight_inputs(interface);
        interface.add_input("geometry.wing.mac.length", "m");
        interface.add_input("geometry.wing.thickness_ratio", "");
        interface.add_input("geometry.wing.wet_area", "m**2");
        interface.add_output("aerodynamics.wing.cruise.cd0", "");
        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let mach = inputs.scalar(MACH)?;
        let reynolds = inputs.scalar(UNIT_REYNOLDS)? * inputs.scalar("geometry.wing.mac.length")?;
        let thickness_ratio = inputs.scalar("geometry.wing.thickness_ratio")?;

        let cf = skin_friction_coefficient(reynolds, mach);
        let ff = hoerner_form_factor(thickness_ratio);
        let cd0 = cf * ff * inputs.scalar("geometry.wing.wet_area")? / inputs.scalar(WING_AREA)?;
        outputs.set("aerodynamics.wing.cruise.cd0", cd0)
    }
}

/// Tail surface handled by [`ComputeCd0LiftingSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailSurface {
    HorizontalTail,
    VerticalTail,
}

impl TailSurface {
    fn name(&self) -> &'static str {
        match self {
            TailSurface::HorizontalTail => "horizontal_tail",
            TailSurface::VerticalTail => "vertical_tail",
        }
    }

    fn geometry(&self, field: &str) -> String {
        format!("geometry.{}.{}", self.name(), field)
    }

    fn cd0_key(&self) -> String {
        format!("aerodynamics.{}.cruise.cd0", self.name())
    }
}

/// Profile drag of a tail surface, Raymer form factor with maximum
/// thickness at 30 % chord.
#[derive(Debug, Clone, Copy)]
pub struct ComputeCd0LiftingSurface {
    pub surface: TailSurface,
}

impl ComputeCd0LiftingSurface {
    const THICKNESS_LOCATION: f64 = 0.3;

    pub fn new(surface: TailSurface) -> Self {
        ComputeCd0LiftingSurface { surface }
    }
}

impl Node for ComputeCd0LiftingSurface {
    fn setup(&self, interface: &mut NodeInterface) {
        add_flight_inputs(interface);
        interface.add_input(&self.surface.geometry("mac.length"), "m");
        interface.add_input(&self.surface.geometry("thickness_ratio"), "");
        interface.add_input(&self.surface.geometry("sweep_25"), "rad");
        interface.add_input(&self.surface.geometry("area"), "m**2");
        interface.add_output(&self.surface.cd0_key(), "");
        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let mach = forward_flight_mach(inputs)?;
        let reynolds = inputs.scalar(UNIT_REYNOLDS)? * inputs.scalar(&self.surface.geometry("mac.length"))?;
        let thickness_ratio = inputs.scalar(&self.surface.geometry("thickness_ratio"))?;
        let sweep = inputs.scalar(&self.surface.geometry("sweep_25"))?;
        let wet_area = lifting_surface_wet_area(inputs.scalar(&self.surface.geometry("area"))?, thickness_ratio);

        let cf = skin_friction_coefficient(reynolds, mach);
        let ff = raymer_form_factor(thickness_ratio, Self::THICKNESS_LOCATION, mach, sweep);
        outputs.set(&self.surface.cd0_key(), cf * ff * wet_area / inputs.scalar(WING_AREA)?)
    }
}

/// Fuselage profile drag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeCd0Fuselage;

impl Node for ComputeCd0Fuselage {
    fn setup(&self, interface: &mut NodeInterface) {
        add_flight_inputs(interface);
        interface.add_input("geometry.fuselage.length", "m");
        interface.add_input("geometry.fuselage.fineness_ratio", "");
        interface.add_input("geometry.fuselage.wet_area", "m**2");
        interface.add_output("aerodynamics.fuselage.cruise.cd0", "");
        interface.declare_partials("*", "*", DerivativeMethod::fd());
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let mach = inputs.scalar(MACH)?;
        let reynolds = inputs.scalar(UNIT_REYNOLDS)? * inputs.scalar("geometry.fuselage.length")?;

        let cf = skin_friction_coefficient(reynolds, mach);
        let ff = fuselage_form_factor(inputs.scalar("geometry.fuselage.fineness_ratio")?);
        let cd0 = cf * ff * inputs.scalar("geometry.fuselage.wet_area")? / inputs.scalar(WING_AREA)?;
        outputs.set("aerodynamics.fuselage.cruise.cd0", cd0)
    }
}

/// Profile drag of the remaining components (nacelles, landing gear,
/// antennas).
///
/// Not yet modeled: always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeCd0Other;

impl Node for ComputeCd0Other {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_output("aerodynamics.other.cruise.cd0", "");
    }

    fn compute(&self, _inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        outputs.set("aerodynamics.other.cruise.cd0", 0.0)
    }

    fn is_placeholder(&self) -> bool {
        true
    }
}

const COMPONENTS: [&str; 4] = [
    "aerodynamics.wing.cruise.cd0",
    "aerodynamics.horizontal_tail.cruise.cd0",
    "aerodynamics.vertical_tail.cruise.cd0",
    "aerodynamics.fuselage.cruise.cd0",
];

/// Aircraft profile drag: sum of the components times `1 + leakage_factor`,
/// plus the other contributions.
///
/// Option `leakage_factor` (float, default 0.05).
#[derive(Debug, Clone, Copy)]
pub struct ComputeCd0Total {
    leakage_factor: f64,
}

impl ComputeCd0Total {
    pub const DEFAULT_LEAKAGE_FACTOR: f64 = 0.05;

    pub fn new(leakage_factor: f64) -> Result<Self> {
        let leakage_factor = DomainError::check_range("leakage_factor", leakage_factor, 0.0, 1.0)?;
        Ok(ComputeCd0Total { leakage_factor })
    }

    pub fn from_options(options: &Options) -> Result<Self> {
        Self::new(options.get_float("leakage_factor", Self::DEFAULT_LEAKAGE_FACTOR)?)
    }
}

impl Default for ComputeCd0Total {
    fn default() -> Self {
        ComputeCd0Total { leakage_factor: Self::DEFAULT_LEAKAGE_FACTOR }
    }
}

impl Node for ComputeCd0Total {
    fn setup(&self, interface: &mut NodeInterface) {
        for key in COMPONENTS {
            interface.add_input(key, "");
        }
        interface.add_input("aerodynamics.other.cruise.cd0", "");
        interface.add_output("aerodynamics.aircraft.cruise.cd0", "");
        interface.declare_partials("*", "*", DerivativeMethod::Analytic);
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        let mut components = 0.0;
        for key in COMPONENTS {
            components += inputs.scalar(key)?;
        }
        let other = inputs.scalar("aerodynamics.other.cruise.cd0")?;
        outputs.set("aerodynamics.aircraft.cruise.cd0", components * (1.0 + self.leakage_factor) + other)
    }

    fn compute_partials(&self, _inputs: &Inputs, partials: &mut Partials) -> Result<()> {
        for key in COMPONENTS {
            partials.set("aerodynamics.aircraft.cruise.cd0", key, 1.0 + self.leakage_factor);
        }
        partials.set("aerodynamics.aircraft.cruise.cd0", "aerodynamics.other.cruise.cd0", 1.0);
        Ok(())
    }
}
