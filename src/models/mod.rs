//! Aircraft analysis nodes.
//!
//! Each node computes a narrow set of quantities from semi-empirical
//! formulas, organized by discipline:
//!
//! - **Planform**: trapezoid chords and mean aerodynamic chord, shared by
//!   the wing, horizontal tail and vertical tail
//! - **Fuselage**: cross-section and wetted area
//! - **Profile drag**: skin friction, form factors and the zero-lift drag
//!   build-up
//! - **Compressibility**: drag rise versus Mach number
//! - **Lift slope**: DATCOM/Helmbold lift-curve slopes
//! - **Induced drag**: Oswald efficiency
//! - **Sideslip**: fuselage side-force and rolling-moment derivatives
//! - **VLM**: stability derivatives read from an external solver
//!
//! Quantity keys are dotted paths such as `geometry.wing.span`; angles are
//! declared in radians and lengths in metres. Pipelines convert any other
//! unit at connections.
//!
//! ## Example
//!
//! ```
//! use aerograph::models::ComputeVtChords;
//! use aerograph::{Inputs, evaluate_node};
//!
//! let inputs = Inputs::new()
//!     .with("geometry.vertical_tail.aspect_ratio", 5.0)
//!     .with("geometry.vertical_tail.area", 10.0)
//!     .with("geometry.vertical_tail.taper_ratio", 0.5);
//! let outputs = evaluate_node(&ComputeVtChords, &inputs)?;
//!
//! assert!((outputs.scalar("geometry.vertical_tail.span")? - 7.071).abs() < 1e-3);
//! assert!((outputs.scalar("geometry.vertical_tail.root.chord")? - 1.886).abs() < 1e-3);
//! assert!((outputs.scalar("geometry.vertical_tail.tip.chord")? - 0.943).abs() < 1e-3);
//! # Ok::<(), aerograph::Error>(())
//! ```
//!
//! ## Automatic Differentiation Support
//!
//! Nodes whose formulas are written generically over [`Scalar`](crate::Scalar)
//! declare their partials as [`Analytic`](crate::DerivativeMethod::Analytic)
//! when the `autodiff` feature is enabled and evaluate them with `Dual64`.
//! Without the feature they fall back to central finite differences.

mod compressibility;
mod fuselage;
mod horizontal_tail;
mod induced_drag;
pub mod lift_slope;
pub mod planform;
mod profile_drag;
mod sideslip;
mod vertical_tail;
pub mod vlm;
mod wing;

pub use compressibility::{ComputeCdCompressibility, get_drag_compressibility};
pub use fuselage::{ComputeFuselageCrossSection, ComputeFuselageWetArea, torenbeek_wet_area};
pub use horizontal_tail::{ComputeHtChords, ComputeHtMac};
pub use induced_drag::{ComputeInducedDragCoefficient, oswald_efficiency};
pub use lift_slope::{ComputeClAlphaVt, ComputeClAlphaWing, helmbold_lift_slope};
pub use profile_drag::{
    ComputeCd0Fuselage, ComputeCd0LiftingSurface, ComputeCd0Other, ComputeCd0Total, ComputeCd0WingHoerner,
    ComputeCd0WingLegacy, MIN_FORM_FACTOR_MACH, TailSurface, fuselage_form_factor, hoerner_form_factor,
    lifting_surface_wet_area, raymer_form_factor, skin_friction_coefficient,
};
pub use sideslip::{ComputeClBetaFuselage, ComputeCyBetaFuselage, wing_body_interference_factor};
pub use vertical_tail::{ComputeVtChords, ComputeVtEffectiveAspectRatio, ComputeVtMac};
pub use vlm::{
    ComputeStabilityDerivativesVlm, ExternalToolError, STABILITY_DERIVATIVE_NAMES, StabilityDerivatives, VlmRunner,
    parse_stability_derivatives, read_stability_derivatives,
};
pub use wing::{ComputeWingChordDistribution, ComputeWingChords, ComputeWingMac, ComputeWingWetArea};
