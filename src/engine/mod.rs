//! Execution engine.
//!
//! A [`Problem`] owns the assembled form of a pipeline and its quantity
//! store. Values are kept in the canonical unit of each key (the unit of the
//! producing output, or of the first consumer for external inputs) and
//! converted at the boundary by [`Problem::set_val`] and [`Problem::get_val`].
//!
//! # Evaluation Passes
//!
//! [`Problem::run_model`] performs one pass:
//!
//! 1. Every computed quantity is reset to its default (NaN)
//! 2. Each node runs once, in dependency order, on inputs converted to its
//!    declared units
//! 3. Its outputs are written back to the store
//!
//! Externally supplied values persist across passes. A node error (for
//! example a [`DomainError`](crate::DomainError)) aborts the pass and is
//! returned unchanged.
//!
//! # Derivatives
//!
//! - [`Problem::compute_partials`]: partials declared by one node, using the
//!   methods it declared
//! - [`Problem::compute_totals`]: total derivatives of any computed
//!   quantities with respect to external inputs, by central differences over
//!   whole passes
//!
//! # Example
//!
//! ```
//! use aerograph::{Pipeline, Problem};
//! use aerograph::models::{ComputeVtChords, ComputeVtMac};
//!
//! let mut pipeline = Pipeline::new("vertical_tail");
//! pipeline.add_node("chords", ComputeVtChords);
//! pipeline.add_node("mac", ComputeVtMac);
//!
//! let mut problem = Problem::new(pipeline)?;
//! problem.set_val("geometry.vertical_tail.aspect_ratio", 5.0, "")?;
//! problem.set_val("geometry.vertical_tail.area", 10.0, "m**2")?;
//! problem.set_val("geometry.vertical_tail.taper_ratio", 0.5, "")?;
//! problem.set_val("geometry.vertical_tail.sweep_25", 30.0, "deg")?;
//! problem.run_model()?;
//!
//! let mac = problem.scalar("geometry.vertical_tail.mac.length", "m")?;
//! assert!(mac > 0.943 && mac < 1.886);
//!
//! let totals = problem.compute_totals(
//!     &["geometry.vertical_tail.span"],
//!     &["geometry.vertical_tail.area"],
//! )?;
//! // d(sqrt(A S))/dS = sqrt(A / S) / 2
//! assert!((totals[(0, 0)] - 0.5_f64.sqrt() / 2.0).abs() < 1e-6);
//! # Ok::<(), aerograph::Error>(())
//! ```

pub mod derivatives;

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use tracing::{debug, warn};

use crate::pipeline::{Assembly, PlacedNode, Pipeline};
use crate::units::conversion_factor;
use crate::{Error, Inputs, Outputs, Partials, Result, Value};

use derivatives::{DerivativeMethod, DifferenceForm, finite_difference_jacobian, node_partials};

/// An assembled pipeline together with its quantity store.
#[derive(Debug)]
pub struct Problem {
    assembly: Assembly,
    /// Current value of every key, in its canonical unit
    store: BTreeMap<String, Value>,
}

impl Problem {
    /// Assembles `pipeline` and fills the store with declared defaults.
    ///
    /// # Errors
    ///
    /// Any [`AssemblyError`](crate::AssemblyError) raised by
    /// [`Pipeline::assemble`].
    pub fn new(pipeline: Pipeline) -> Result<Self> {
        let assembly = pipeline.assemble()?;
        let store = assembly.quantities().map(|q| (q.key.clone(), q.default.clone())).collect();
        Ok(Problem { assembly, store })
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    /// Node paths in execution order.
    pub fn execution_order(&self) -> Vec<&str> {
        self.assembly.execution_order()
    }

    /// Sets a quantity from a value expressed in `unit`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownQuantity`] if no node declares `key`
    /// - [`Error::ShapeMismatch`] if the shape differs from the declaration
    /// - [`Error::Unit`] if `unit` cannot be converted to the key's unit
    pub fn set_val(&mut self, key: &str, value: impl Into<Value>, unit: &str) -> Result<()> {
        let value = value.into();
        let decl = self.assembly.quantity(key).ok_or_else(|| Error::UnknownQuantity(key.to_string()))?;
        if decl.shape() != value.shape() {
            return Err(Error::ShapeMismatch {
                key: key.to_string(),
                expected: decl.shape(),
                actual: value.shape(),
            });
        }
        let factor = conversion_factor(unit, &decl.unit)?;
        self.store.insert(key.to_string(), value.scaled(factor));
        Ok(())
    }

    /// Gets a quantity expressed in `unit`.
    pub fn get_val(&self, key: &str, unit: &str) -> Result<Value> {
        let decl = self.assembly.quantity(key).ok_or_else(|| Error::UnknownQuantity(key.to_string()))?;
        let value = self.store.get(key).ok_or_else(|| Error::UnknownQuantity(key.to_string()))?;
        let factor = conversion_factor(&decl.unit, unit)?;
        Ok(value.scaled(factor))
    }

    /// Gets a scalar quantity expressed in `unit`.
    pub fn scalar(&self, key: &str, unit: &str) -> Result<f64> {
        let value = self.get_val(key, unit)?;
        value.as_scalar().ok_or_else(|| Error::ShapeMismatch {
            key: key.to_string(),
            expected: crate::Shape::Scalar,
            actual: value.shape(),
        })
    }

    /// Every key with its current value, in canonical units.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.store.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// External inputs still holding the NaN sentinel.
    pub fn unsupplied_inputs(&self) -> Vec<&str> {
        self.assembly
            .external_inputs()
            .filter(|q| self.store.get(&q.key).is_none_or(Value::is_unset))
            .map(|q| q.key.as_str())
            .collect()
    }

    /// Resets every computed quantity to its default.
    pub fn reset(&mut self) {
        for quantity in self.assembly.quantities() {
            if self.assembly.is_output(&quantity.key) {
                self.store.insert(quantity.key.clone(), quantity.default.clone());
            }
        }
    }

    /// Runs one evaluation pass over every node in dependency order.
    ///
    /// Unsupplied inputs are logged and passed through as NaN; nodes do not
    /// validate them.
    pub fn run_model(&mut self) -> Result<()> {
        self.reset();
        for key in self.unsupplied_inputs() {
            warn!(quantity = %key, "Input not supplied, evaluating with NaN");
        }

        for placed in self.assembly.nodes() {
            let inputs = gather_inputs(placed, &self.store)?;
            let mut outputs = Outputs::from_declarations(placed.interface.outputs());
            placed.node.compute(&inputs, &mut outputs)?;

            for (decl, key) in placed.interface.outputs().iter().zip(&placed.output_keys) {
                self.store.insert(key.clone(), outputs.value(&decl.key)?.clone());
            }
            debug!(node = %placed.path, model = placed.node.name(), "Evaluated node");
        }

        Ok(())
    }

    /// Partials declared by the node at `path`, evaluated at the current
    /// store values.
    ///
    /// Keys in the result are the node's own (unpromoted) keys and values
    /// are in its declared units.
    pub fn compute_partials(&self, path: &str) -> Result<Partials> {
        let placed = self.assembly.node(path).ok_or_else(|| Error::UnknownNode(path.to_string()))?;
        let inputs = gather_inputs(placed, &self.store)?;
        node_partials(placed.node.as_ref(), &placed.interface, &inputs)
    }

    /// Total derivatives of `of` with respect to `wrt`.
    ///
    /// Rows follow the flattened entries of `of`, columns those of `wrt`;
    /// both are in canonical units. Each `wrt` key must be an external input.
    /// The store is restored and re-evaluated afterwards.
    pub fn compute_totals(&mut self, of: &[&str], wrt: &[&str]) -> Result<DMatrix<f64>> {
        for key in of.iter().chain(wrt) {
            if self.assembly.quantity(key).is_none() {
                return Err(Error::UnknownQuantity(key.to_string()));
            }
        }
        if let Some(key) = wrt.iter().find(|k| self.assembly.is_output(k)) {
            return Err(Error::NotAnInput(key.to_string()));
        }

        let saved: Vec<Value> = wrt.iter().map(|k| self.store[*k].clone()).collect();
        let x0: Vec<f64> = saved.iter().flat_map(|v| v.as_slice().iter().copied()).collect();

        let evaluate = |x: &[f64]| -> Result<Vec<f64>> {
            let mut offset = 0;
            for key in wrt {
                if let Some(slot) = self.store.get_mut(*key) {
                    let entries = slot.as_mut_slice();
                    entries.copy_from_slice(&x[offset..offset + entries.len()]);
                    offset += entries.len();
                }
            }
            self.run_model()?;
            let mut values = Vec::new();
            for key in of {
                values.extend_from_slice(self.store[*key].as_slice());
            }
            Ok(values)
        };

        let totals =
            finite_difference_jacobian(evaluate, &x0, DerivativeMethod::DEFAULT_STEP, DifferenceForm::Central);

        for (key, value) in wrt.iter().zip(saved) {
            self.store.insert(key.to_string(), value);
        }
        self.run_model()?;

        totals
    }
}

/// Collects a node's inputs from the store, converted to its declared units.
fn gather_inputs(placed: &PlacedNode, store: &BTreeMap<String, Value>) -> Result<Inputs> {
    let mut inputs = Inputs::new();
    for ((decl, key), scale) in
        placed.interface.inputs().iter().zip(&placed.input_keys).zip(&placed.input_scales)
    {
        let value = store.get(key).ok_or_else(|| Error::UnknownQuantity(key.clone()))?;
        inputs.insert(&decl.key, value.scaled(*scale));
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssemblyError, DomainError, Node, NodeInterface};

    /// y = gain * x
    #[derive(Debug)]
    struct Gain {
        input: &'static str,
        output: &'static str,
        unit: &'static str,
        gain: f64,
    }

    impl Node for Gain {
        fn setup(&self, interface: &mut NodeInterface) {
            interface.add_input(self.input, self.unit);
            interface.add_output(self.output, self.unit);
        }

        fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
            outputs.set(self.output, self.gain * inputs.scalar(self.input)?)
        }
    }

    /// y = x^2, defined for x in [0, 10]
    #[derive(Debug)]
    struct Square;

    impl Node for Square {
        fn setup(&self, interface: &mut NodeInterface) {
            interface.add_input("y", "");
            interface.add_output("z", "");
            interface.declare_partials("z", "y", DerivativeMethod::central());
        }

        fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
            let y = DomainError::check_range("y", inputs.scalar("y")?, 0.0, 10.0)?;
            outputs.set("z", y * y)
        }
    }

    fn chain() -> Problem {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("square", Square);
        pipeline.add_node("gain", Gain { input: "x", output: "y", unit: "", gain: 2.0 });
        Problem::new(pipeline).unwrap()
    }

    #[test]
    fn test_run_model_in_dependency_order() {
        let mut problem = chain();
        assert_eq!(problem.execution_order(), vec!["gain", "square"]);

        problem.set_val("x", 1.5, "").unwrap();
        problem.run_model().unwrap();
        assert_eq!(problem.scalar("y", "").unwrap(), 3.0);
        assert_eq!(problem.scalar("z", "").unwrap(), 9.0);
    }

    #[test]
    fn test_unsupplied_inputs_propagate_nan() {
        let mut problem = chain();
        assert_eq!(problem.unsupplied_inputs(), vec!["x"]);

        // NaN fails the range check of the downstream node
        assert!(matches!(problem.run_model(), Err(Error::Domain(_))));
        assert!(problem.scalar("y", "").unwrap().is_nan());
    }

    #[test]
    fn test_domain_error_aborts_pass_and_reset_clears_outputs() {
        let mut problem = chain();
        problem.set_val("x", 1.0, "").unwrap();
        problem.run_model().unwrap();
        assert_eq!(problem.scalar("z", "").unwrap(), 4.0);

        problem.set_val("x", 6.0, "").unwrap();
        let err = problem.run_model().unwrap_err();
        match err {
            Error::Domain(domain) => assert_eq!(domain.value, 12.0),
            other => panic!("expected a domain error, got {:?}", other),
        }
        // Stale results from the previous pass are not kept
        assert!(problem.scalar("z", "").unwrap().is_nan());
        // External inputs persist
        assert_eq!(problem.scalar("x", "").unwrap(), 6.0);
    }

    #[test]
    fn test_boundary_unit_conversion() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("double", Gain { input: "length", output: "twice", unit: "m", gain: 2.0 });
        let mut problem = Problem::new(pipeline).unwrap();

        problem.set_val("length", 10.0, "ft").unwrap();
        problem.run_model().unwrap();
        assert!((problem.scalar("twice", "m").unwrap() - 6.096).abs() < 1e-12);
        assert!((problem.scalar("twice", "ft").unwrap() - 20.0).abs() < 1e-12);

        assert!(matches!(problem.set_val("length", 1.0, "s"), Err(Error::Unit(_))));
        assert!(matches!(problem.set_val("width", 1.0, "m"), Err(Error::UnknownQuantity(_))));
        assert!(matches!(problem.set_val("length", vec![1.0, 2.0], "m"), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_connection_converts_units() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("metric", Gain { input: "a", output: "b", unit: "m", gain: 1.0 });
        pipeline.add_node("imperial", Gain { input: "b", output: "c", unit: "ft", gain: 1.0 });
        let mut problem = Problem::new(pipeline).unwrap();

        problem.set_val("a", 0.3048, "m").unwrap();
        problem.run_model().unwrap();
        // "c" is declared in feet by its producer
        assert!((problem.scalar("c", "ft").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compute_totals_chain_rule() {
        let mut problem = chain();
        problem.set_val("x", 1.5, "").unwrap();
        problem.run_model().unwrap();

        // z = (2x)^2, dz/dx = 8x
        let totals = problem.compute_totals(&["y", "z"], &["x"]).unwrap();
        assert_eq!(totals.shape(), (2, 1));
        assert!((totals[(0, 0)] - 2.0).abs() < 1e-6);
        assert!((totals[(1, 0)] - 12.0).abs() < 1e-5);

        // Store restored
        assert_eq!(problem.scalar("x", "").unwrap(), 1.5);
        assert_eq!(problem.scalar("z", "").unwrap(), 9.0);
    }

    #[test]
    fn test_compute_totals_rejects_computed_wrt() {
        let mut problem = chain();
        problem.set_val("x", 1.0, "").unwrap();
        assert!(matches!(problem.compute_totals(&["z"], &["y"]), Err(Error::NotAnInput(_))));
        assert!(matches!(problem.compute_totals(&["w"], &["x"]), Err(Error::UnknownQuantity(_))));
    }

    #[test]
    fn test_compute_partials_of_one_node() {
        let mut problem = chain();
        problem.set_val("x", 1.5, "").unwrap();
        problem.run_model().unwrap();

        let partials = problem.compute_partials("square").unwrap();
        assert!((partials.scalar("z", "y").unwrap() - 6.0).abs() < 1e-6);
        assert!(matches!(problem.compute_partials("missing"), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn test_assembly_errors_surface_from_new() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("a", Gain { input: "x", output: "y", unit: "", gain: 1.0 });
        pipeline.add_node("b", Gain { input: "x", output: "y", unit: "", gain: 2.0 });
        assert!(matches!(
            Problem::new(pipeline),
            Err(Error::Assembly(AssemblyError::DuplicateOutput { .. }))
        ));
    }
}
