//! Ready-made pipelines for a conventional aircraft.
//!
//! Submodel roles are filled from a [`SubmodelRegistry`];
//! [`register_default_submodels`] registers the implementations shipped with
//! this crate and selects the legacy wing profile-drag model.
//!
//! # Example
//!
//! ```
//! use aerograph::assemblies::{aircraft_pipeline, register_default_submodels};
//! use aerograph::{Options, Problem, SubmodelRegistry};
//!
//! let mut registry = SubmodelRegistry::new();
//! register_default_submodels(&mut registry)?;
//!
//! let problem = Problem::new(aircraft_pipeline(&registry, &Options::new())?)?;
//! assert!(problem.assembly().is_output("aerodynamics.aircraft.cruise.cd0"));
//! assert!(problem.unsupplied_inputs().contains(&"mission.cruise.mach"));
//! # Ok::<(), aerograph::Error>(())
//! ```

use tracing::debug;

use crate::models::{
    ComputeCd0Fuselage, ComputeCd0LiftingSurface, ComputeCd0Other, ComputeCd0Total, ComputeCd0WingHoerner,
    ComputeCd0WingLegacy, ComputeCdCompressibility, ComputeClAlphaVt, ComputeClAlphaWing, ComputeClBetaFuselage,
    ComputeCyBetaFuselage, ComputeFuselageCrossSection, ComputeFuselageWetArea, ComputeHtChords, ComputeHtMac,
    ComputeInducedDragCoefficient, ComputeStabilityDerivativesVlm, ComputeVtChords, ComputeVtEffectiveAspectRatio,
    ComputeVtMac, ComputeWingChordDistribution, ComputeWingChords, ComputeWingMac, ComputeWingWetArea, TailSurface,
};
use crate::{AssemblyError, Node, Options, Pipeline, Result, Selection, SubmodelRegistry};

pub const WING_CD0: &str = "aircraft.submodel.aerodynamics.wing.cd0";
pub const WING_CD0_LEGACY: &str = "aircraft.submodel.aerodynamics.wing.cd0.legacy";
pub const WING_CD0_HOERNER: &str = "aircraft.submodel.aerodynamics.wing.cd0.hoerner";

pub const FUSELAGE_CL_BETA: &str = "aircraft.submodel.aerodynamics.fuselage.cl_beta";
pub const FUSELAGE_CL_BETA_PLACEHOLDER: &str = "aircraft.submodel.aerodynamics.fuselage.cl_beta.placeholder";

pub const VT_EFFECTIVE_ASPECT_RATIO: &str = "aircraft.submodel.geometry.vertical_tail.effective_aspect_ratio";
pub const VT_EFFECTIVE_ASPECT_RATIO_IDENTITY: &str =
    "aircraft.submodel.geometry.vertical_tail.effective_aspect_ratio.identity";

pub const STABILITY_DERIVATIVES: &str = "aircraft.submodel.aerodynamics.stability.vlm";
pub const STABILITY_DERIVATIVES_VLM: &str = "aircraft.submodel.aerodynamics.stability.vlm.vlm";

fn cd0_wing_legacy(options: &Options) -> Result<Box<dyn Node>> {
    Ok(Box::new(ComputeCd0WingLegacy::from_options(options)?))
}

fn cd0_wing_hoerner(_options: &Options) -> Result<Box<dyn Node>> {
    Ok(Box::new(ComputeCd0WingHoerner))
}

fn cl_beta_placeholder(_options: &Options) -> Result<Box<dyn Node>> {
    Ok(Box::new(ComputeClBetaFuselage))
}

fn vt_effective_aspect_ratio_identity(_options: &Options) -> Result<Box<dyn Node>> {
    Ok(Box::new(ComputeVtEffectiveAspectRatio))
}

fn stability_vlm(options: &Options) -> Result<Box<dyn Node>> {
    Ok(Box::new(ComputeStabilityDerivativesVlm::from_options(options)?))
}

/// Registers every implementation shipped with the crate.
///
/// The wing profile-drag role has two implementations; the legacy one is
/// selected, replacing any earlier selection of that role.
pub fn register_default_submodels(registry: &mut SubmodelRegistry) -> Result<(), AssemblyError> {
    registry.register_with_defaults(
        WING_CD0,
        WING_CD0_LEGACY,
        cd0_wing_legacy,
        Options::new().with("thickness_location", ComputeCd0WingLegacy::DEFAULT_THICKNESS_LOCATION),
    );
    registry.register(WING_CD0, WING_CD0_HOERNER, cd0_wing_hoerner);
    registry.register(FUSELAGE_CL_BETA, FUSELAGE_CL_BETA_PLACEHOLDER, cl_beta_placeholder);
    registry.register(
        VT_EFFECTIVE_ASPECT_RATIO,
        VT_EFFECTIVE_ASPECT_RATIO_IDENTITY,
        vt_effective_aspect_ratio_identity,
    );
    registry.register(STABILITY_DERIVATIVES, STABILITY_DERIVATIVES_VLM, stability_vlm);

    registry.select(WING_CD0, Selection::Implementation(WING_CD0_LEGACY.to_string()))
}

/// Planform, wetted areas and cross-sections.
///
/// Options: `stations` for the wing chord distribution.
pub fn geometry_pipeline(registry: &SubmodelRegistry, options: &Options) -> Result<Pipeline> {
    let mut geometry = Pipeline::new("geometry");

    geometry.add_node("wing_chords", ComputeWingChords);
    geometry.add_node("wing_mac", ComputeWingMac);
    geometry.add_node("wing_wet_area", ComputeWingWetArea);
    geometry.add_node("wing_chord_distribution", ComputeWingChordDistribution::from_options(options)?);

    geometry.add_node("ht_chords", ComputeHtChords);
    geometry.add_node("ht_mac", ComputeHtMac);

    geometry.add_node("vt_chords", ComputeVtChords);
    geometry.add_node("vt_mac", ComputeVtMac);
    geometry.add_boxed_node("vt_effective_aspect_ratio", registry.resolve(VT_EFFECTIVE_ASPECT_RATIO, options)?);

    geometry.add_node("fuselage_cross_section", ComputeFuselageCrossSection);
    geometry.add_node("fuselage_wet_area", ComputeFuselageWetArea);

    debug!(children = geometry.child_count(), "Built geometry pipeline");
    Ok(geometry)
}

/// Drag build-up, lift slopes and sideslip derivatives in cruise.
///
/// Options: `leakage_factor` for the total profile drag, and
/// `use_external_solver` (bool, default false) to add the VLM stability
/// derivatives.
pub fn aerodynamics_pipeline(registry: &SubmodelRegistry, options: &Options) -> Result<Pipeline> {
    let mut aerodynamics = Pipeline::new("aerodynamics");

    aerodynamics.add_boxed_node("cd0_wing", registry.resolve(WING_CD0, options)?);
    aerodynamics.add_node("cd0_horizontal_tail", ComputeCd0LiftingSurface::new(TailSurface::HorizontalTail));
    aerodynamics.add_node("cd0_vertical_tail", ComputeCd0LiftingSurface::new(TailSurface::VerticalTail));
    aerodynamics.add_node("cd0_fuselage", ComputeCd0Fuselage);
    aerodynamics.add_node("cd0_other", ComputeCd0Other);
    aerodynamics.add_node("cd0_total", ComputeCd0Total::from_options(options)?);
    aerodynamics.add_node("cd_compressibility", ComputeCdCompressibility);

    aerodynamics.add_node("cl_alpha_wing", ComputeClAlphaWing);
    aerodynamics.add_node("cl_alpha_vt", ComputeClAlphaVt);
    aerodynamics.add_node("induced_drag", ComputeInducedDragCoefficient);

    aerodynamics.add_node("cy_beta_fuselage", ComputeCyBetaFuselage);
    aerodynamics.add_boxed_node("cl_beta_fuselage", registry.resolve(FUSELAGE_CL_BETA, options)?);

    if options.get_bool("use_external_solver", false)? {
        aerodynamics.add_boxed_node("stability", registry.resolve(STABILITY_DERIVATIVES, options)?);
    }

    debug!(children = aerodynamics.child_count(), "Built aerodynamics pipeline");
    Ok(aerodynamics)
}

/// Geometry followed by aerodynamics, sharing one namespace.
pub fn aircraft_pipeline(registry: &SubmodelRegistry, options: &Options) -> Result<Pipeline> {
    let mut aircraft = Pipeline::new("aircraft");
    aircraft.add_pipeline("geometry", geometry_pipeline(registry, options)?);
    aircraft.add_pipeline("aerodynamics", aerodynamics_pipeline(registry, options)?);
    Ok(aircraft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::models::STABILITY_DERIVATIVE_NAMES;
    use crate::{Error, Problem};
    use proptest::prelude::*;

    fn default_registry() -> SubmodelRegistry {
        let mut registry = SubmodelRegistry::new();
        register_default_submodels(&mut registry).unwrap();
        registry
    }

    /// A light twin in cruise.
    fn set_design(problem: &mut Problem) -> Result<()> {
        problem.set_val("geometry.wing.aspect_ratio", 9.0, "")?;
        problem.set_val("geometry.wing.area", 16.0, "m**2")?;
        problem.set_val("geometry.wing.taper_ratio", 0.6, "")?;
        problem.set_val("geometry.wing.sweep_25", 2.0, "deg")?;
        problem.set_val("geometry.wing.thickness_ratio", 0.15, "")?;

        problem.set_val("geometry.horizontal_tail.aspect_ratio", 4.5, "")?;
        problem.set_val("geometry.horizontal_tail.area", 3.5, "m**2")?;
        problem.set_val("geometry.horizontal_tail.taper_ratio", 0.7, "")?;
        problem.set_val("geometry.horizontal_tail.sweep_25", 5.0, "deg")?;
        problem.set_val("geometry.horizontal_tail.thickness_ratio", 0.1, "")?;

        problem.set_val("geometry.vertical_tail.aspect_ratio", 1.5, "")?;
        problem.set_val("geometry.vertical_tail.area", 2.5, "m**2")?;
        problem.set_val("geometry.vertical_tail.taper_ratio", 0.6, "")?;
        problem.set_val("geometry.vertical_tail.sweep_25", 30.0, "deg")?;
        problem.set_val("geometry.vertical_tail.thickness_ratio", 0.1, "")?;

        problem.set_val("geometry.fuselage.length", 9.0, "m")?;
        problem.set_val("geometry.fuselage.maximum_width", 1.25, "m")?;
        problem.set_val("geometry.fuselage.maximum_height", 1.4, "m")?;

        problem.set_val("mission.cruise.mach", 0.3, "")?;
        problem.set_val("aerodynamics.cruise.unit_reynolds", 5.0e6, "m**-1")?;
        Ok(())
    }

    #[test]
    fn test_default_registry_roles() {
        let registry = default_registry();
        assert_eq!(registry.roles().len(), 4);
        assert_eq!(registry.resolved_id(WING_CD0).unwrap(), Some(WING_CD0_LEGACY));
        assert_eq!(registry.implementations(WING_CD0), vec![WING_CD0_HOERNER, WING_CD0_LEGACY]);
    }

    #[test]
    fn test_default_registration_reselects_legacy_cd0() {
        let mut registry = SubmodelRegistry::new();
        registry.register(WING_CD0, WING_CD0_HOERNER, cd0_wing_hoerner);
        registry.select(WING_CD0, Selection::Implementation(WING_CD0_HOERNER.to_string())).unwrap();

        assert!(register_default_submodels(&mut registry).is_ok());
        assert_eq!(registry.resolved_id(WING_CD0).unwrap(), Some(WING_CD0_LEGACY));

        // Registering again is harmless
        assert!(register_default_submodels(&mut registry).is_ok());
        assert_eq!(registry.roles().len(), 4);
    }

    #[test]
    fn test_aircraft_run() {
        let registry = default_registry();
        let mut problem = Problem::new(aircraft_pipeline(&registry, &Options::new()).unwrap()).unwrap();
        set_design(&mut problem).unwrap();
        assert!(problem.unsupplied_inputs().is_empty(), "{:?}", problem.unsupplied_inputs());

        problem.run_model().unwrap();

        let components: f64 = [
            "aerodynamics.wing.cruise.cd0",
            "aerodynamics.horizontal_tail.cruise.cd0",
            "aerodynamics.vertical_tail.cruise.cd0",
            "aerodynamics.fuselage.cruise.cd0",
        ]
        .iter()
        .map(|k| problem.scalar(k, "").unwrap())
        .sum();
        let total = problem.scalar("aerodynamics.aircraft.cruise.cd0", "").unwrap();
        assert!(components > 0.0);
        assert!((total - components * (1.0 + ComputeCd0Total::DEFAULT_LEAKAGE_FACTOR)).abs() < 1e-12);
        assert!(total > 0.01 && total < 0.06, "cd0 = {}", total);

        let span = problem.scalar("geometry.wing.span", "m").unwrap();
        assert!((span - 12.0).abs() < 1e-12);

        let cl_alpha = problem.scalar("aerodynamics.wing.cruise.cl_alpha", "rad**-1").unwrap();
        let cl_alpha_deg = problem.scalar("aerodynamics.wing.cruise.cl_alpha", "deg**-1").unwrap();
        assert!(cl_alpha > 4.5 && cl_alpha < 6.0);
        assert!((cl_alpha_deg - cl_alpha * std::f64::consts::PI / 180.0).abs() < 1e-12);

        assert!(problem.scalar("aerodynamics.fuselage.cy_beta", "rad**-1").unwrap() < 0.0);
        assert_eq!(problem.scalar("aerodynamics.fuselage.cl_beta", "rad**-1").unwrap(), 0.0);
        assert_eq!(problem.scalar("aerodynamics.cruise.cd_compressibility", "").unwrap(), 0.0);
    }

    #[test]
    fn test_geometry_runs_before_aerodynamics() {
        let registry = default_registry();
        let problem = Problem::new(aircraft_pipeline(&registry, &Options::new()).unwrap()).unwrap();
        let order = problem.execution_order();

        let position = |path: &str| order.iter().position(|p| *p == path).unwrap();
        assert!(position("geometry.wing_wet_area") < position("aerodynamics.cd0_wing"));
        assert!(position("geometry.wing_mac") < position("aerodynamics.cd0_wing"));
        assert!(position("geometry.vt_effective_aspect_ratio") < position("aerodynamics.cl_alpha_vt"));
        assert!(position("aerodynamics.cd0_wing") < position("aerodynamics.cd0_total"));
    }

    #[test]
    fn test_hoerner_selected_from_config() {
        let mut registry = default_registry();
        let text = format!("[submodels]\n\"{}\" = \"{}\"\n", WING_CD0, WING_CD0_HOERNER);
        let config = RegistryConfig::from_toml_str(&text).unwrap();
        registry.apply_config(&config).unwrap();

        let pipeline = aerodynamics_pipeline(&registry, &Options::new()).unwrap();
        let problem = Problem::new(pipeline).unwrap();
        let node = problem.assembly().node("cd0_wing").unwrap();
        assert_eq!(node.node.name(), "ComputeCd0WingHoerner");
        // Hoerner ignores sweep
        assert!(node.interface.input("geometry.wing.sweep_25").is_none());
    }

    #[test]
    fn test_legacy_and_hoerner_differ() {
        let run = |implementation: &str| {
            let mut registry = default_registry();
            registry.select(WING_CD0, Selection::Implementation(implementation.to_string())).unwrap();
            let mut problem = Problem::new(aircraft_pipeline(&registry, &Options::new()).unwrap()).unwrap();
            set_design(&mut problem).unwrap();
            problem.run_model().unwrap();
            problem.scalar("aerodynamics.wing.cruise.cd0", "").unwrap()
        };
        let legacy = run(WING_CD0_LEGACY);
        let hoerner = run(WING_CD0_HOERNER);
        assert!(legacy > 0.0 && hoerner > 0.0);
        assert!((legacy - hoerner).abs() > 1e-6);
    }

    #[test]
    fn test_deactivated_cl_beta() {
        let mut registry = default_registry();
        registry.select(FUSELAGE_CL_BETA, Selection::Deactivated).unwrap();
        let problem = Problem::new(aerodynamics_pipeline(&registry, &Options::new()).unwrap()).unwrap();
        assert!(problem.assembly().quantity("aerodynamics.fuselage.cl_beta").is_none());
    }

    #[test]
    fn test_ambiguous_wing_cd0_without_selection() {
        let mut registry = SubmodelRegistry::new();
        registry.register(WING_CD0, WING_CD0_LEGACY, cd0_wing_legacy);
        registry.register(WING_CD0, WING_CD0_HOERNER, cd0_wing_hoerner);
        registry.register(FUSELAGE_CL_BETA, FUSELAGE_CL_BETA_PLACEHOLDER, cl_beta_placeholder);

        let result = aerodynamics_pipeline(&registry, &Options::new());
        assert!(matches!(result, Err(Error::Assembly(AssemblyError::AmbiguousRole { count: 2, .. }))));
    }

    #[test]
    fn test_wing_cd0_options_from_caller() {
        let registry = default_registry();
        let options = Options::new().with("thickness_location", 1.5);
        assert!(matches!(aerodynamics_pipeline(&registry, &options), Err(Error::Domain(_))));
    }

    #[test]
    fn test_external_solver_reads_results() {
        let dir = tempfile::tempdir().unwrap();
        let results: String = STABILITY_DERIVATIVE_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} = {}\n", name, i as f64 / 10.0))
            .collect();
        std::fs::write(dir.path().join("results.st"), results).unwrap();

        let mut registry = default_registry();
        registry
            .set_role_options(
                STABILITY_DERIVATIVES,
                Options::new().with("run_solver", false).with("working_directory", dir.path().to_str().unwrap()),
            )
            .unwrap();

        let options = Options::new().with("use_external_solver", true);
        let mut problem = Problem::new(aircraft_pipeline(&registry, &options).unwrap()).unwrap();
        set_design(&mut problem).unwrap();
        problem.run_model().unwrap();

        assert!((problem.scalar("aerodynamics.stability.Cma", "rad**-1").unwrap() - 0.3).abs() < 1e-12);
        assert!((problem.scalar("aerodynamics.stability.Cnr", "").unwrap() - 1.7).abs() < 1e-12);
    }

    #[test]
    fn test_total_derivative_of_span() {
        let registry = default_registry();
        let mut problem = Problem::new(aircraft_pipeline(&registry, &Options::new()).unwrap()).unwrap();
        set_design(&mut problem).unwrap();
        problem.run_model().unwrap();

        // b = sqrt(A S): db/dS = b / 2S
        let totals = problem.compute_totals(&["geometry.wing.span"], &["geometry.wing.area"]).unwrap();
        assert!((totals[(0, 0)] - 12.0 / 32.0).abs() < 1e-6);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_evaluation_is_deterministic(
            aspect_ratio in 6.0f64..12.0,
            area in 10.0f64..40.0,
            mach in 0.1f64..0.8,
        ) {
            let registry = default_registry();
            let mut problem = Problem::new(aircraft_pipeline(&registry, &Options::new()).unwrap()).unwrap();
            set_design(&mut problem).unwrap();
            problem.set_val("geometry.wing.aspect_ratio", aspect_ratio, "").unwrap();
            problem.set_val("geometry.wing.area", area, "m**2").unwrap();
            problem.set_val("mission.cruise.mach", mach, "").unwrap();

            problem.run_model().unwrap();
            let first: Vec<(String, Vec<u64>)> = problem
                .values()
                .map(|(k, v)| (k.to_string(), v.as_slice().iter().map(|x| x.to_bits()).collect()))
                .collect();

            problem.run_model().unwrap();
            let second: Vec<(String, Vec<u64>)> = problem
                .values()
                .map(|(k, v)| (k.to_string(), v.as_slice().iter().map(|x| x.to_bits()).collect()))
                .collect();

            prop_assert_eq!(first, second);
        }
    }
}
