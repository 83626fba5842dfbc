//! # aerograph: Typed Conceptual-Design Analysis for Aircraft
//!
//! A library of aircraft conceptual-design analysis nodes (geometric
//! dimensions, drag contributions, stability derivatives) built from
//! semi-empirical textbook formulas, and the small execution engine that
//! composes them into unit-checked computation pipelines.
//!
//! ## Layers
//!
//! - **Nodes** ([`Node`]): pure formula units that declare named, unit-tagged
//!   inputs and outputs and compute the outputs from the inputs.
//! - **Pipelines** ([`Pipeline`]): ordered collections of nodes and nested
//!   pipelines sharing one flat namespace of dotted quantity keys, with an
//!   explicit promotion map per child.
//! - **Submodel registry** ([`SubmodelRegistry`]): role-keyed factory that
//!   picks the concrete node implementing an abstract role.
//! - **Problem** ([`Problem`]): the assembled, dependency-ordered form of a
//!   pipeline with its quantity store, evaluation passes and derivatives.
//!
//! ## Example
//!
//! ```
//! use aerograph::{Pipeline, Problem};
//! use aerograph::models::ComputeVtChords;
//!
//! let mut pipeline = Pipeline::new("geometry");
//! pipeline.add_node("vt_chords", ComputeVtChords);
//!
//! let mut problem = Problem::new(pipeline)?;
//! problem.set_val("geometry.vertical_tail.aspect_ratio", 5.0, "")?;
//! problem.set_val("geometry.vertical_tail.area", 10.0, "m**2")?;
//! problem.set_val("geometry.vertical_tail.taper_ratio", 0.5, "")?;
//! problem.run_model()?;
//!
//! let span = problem.scalar("geometry.vertical_tail.span", "m")?;
//! assert!((span - 7.071).abs() < 1e-3);
//! # Ok::<(), aerograph::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - **`autodiff`** (default): analytic partials through forward-mode dual
//!   numbers using `num-dual`. Without it every node falls back to finite
//!   differences.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

pub mod assemblies;
pub mod config;
pub mod engine;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod units;

#[cfg(feature = "autodiff")]
pub mod autodiff;

pub use engine::Problem;
pub use engine::derivatives::{DerivativeMethod, DifferenceForm};
pub use pipeline::{Pipeline, Promotion, Promotions};
pub use registry::{Selection, SubmodelRegistry};

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error detected while assembling a pipeline
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),
    /// Input outside its documented physical range
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    /// Unit parsing or conversion failure
    #[error("Unit error: {0}")]
    Unit(#[from] units::UnitError),
    /// External solver invocation or results parsing failure
    #[error("External tool error: {0}")]
    ExternalTool(#[from] models::vlm::ExternalToolError),
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    /// A quantity key that no node declares
    #[error("Quantity '{0}' is not declared")]
    UnknownQuantity(String),
    /// A node path absent from the assembled pipeline
    #[error("Node '{0}' is not part of the pipeline")]
    UnknownNode(String),
    /// A computed quantity used where an independent input is required
    #[error("'{0}' is computed by the pipeline and cannot be perturbed")]
    NotAnInput(String),
    /// A value whose shape does not match its declaration
    #[error("Shape mismatch for '{key}': expected {expected}, got {actual}")]
    ShapeMismatch { key: String, expected: Shape, actual: Shape },
    /// An analytic partial the node declared but did not fill
    #[error("Partial d'{of}'/d'{wrt}' is declared analytic but was not provided")]
    MissingPartial { of: String, wrt: String },
}

/// Configuration errors. Always fatal at assembly time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssemblyError {
    #[error("Unknown submodel role '{0}'")]
    UnknownRole(String),
    #[error("Role '{role}' has no implementation '{implementation}'")]
    UnknownImplementation { role: String, implementation: String },
    #[error("Role '{role}' has {count} implementations and none is selected")]
    AmbiguousRole { role: String, count: usize },
    #[error("Output '{key}' is produced by both '{first}' and '{second}'")]
    DuplicateOutput { key: String, first: String, second: String },
    #[error("Pipeline '{pipeline}' already has a child named '{child}'")]
    DuplicateChild { pipeline: String, child: String },
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("'{key}' connects output unit '{output_unit}' to input unit '{input_unit}'")]
    IncompatibleUnits { key: String, output_unit: String, input_unit: String },
    #[error("'{key}' connects shape {output} to shape {input}")]
    IncompatibleShapes { key: String, output: Shape, input: Shape },
    #[error("Invalid unit '{unit}' declared for '{key}'")]
    InvalidUnit { key: String, unit: String },
    #[error("Option '{key}' expects a {expected} value")]
    OptionType { key: String, expected: &'static str },
    #[error("Option '{0}' is required")]
    MissingOption(String),
}

/// An input lying outside the interval where its formula is valid.
///
/// Raised by nodes during evaluation; aborts the current pass.
///
/// # Examples
///
/// ```
/// use aerograph::DomainError;
///
/// assert!(DomainError::check_range("ratio", 0.5, -1.0, 1.0).is_ok());
/// assert!(DomainError::check_range("ratio", 1.5, -1.0, 1.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{quantity} = {value} is outside the valid range [{min}, {max}]")]
pub struct DomainError {
    pub quantity: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl DomainError {
    /// Returns the value unchanged when it lies in `[min, max]`.
    pub fn check_range(quantity: &str, value: f64, min: f64, max: f64) -> Result<f64, DomainError> {
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(DomainError { quantity: quantity.to_string(), value, min, max })
        }
    }
}

/// Value Layer: Shapes and Values
/// Shape of a quantity: a scalar or a fixed-length array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Array(usize),
}

impl Shape {
    /// Number of scalar entries.
    pub fn len(&self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Array(n) => *n,
        }
    }

    /// Returns true for zero-length arrays.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "scalar"),
            Shape::Array(n) => write!(f, "[{}]", n),
        }
    }
}

/// Numeric value of a quantity.
///
/// NaN entries mean "unset": the sentinel for values that must be supplied
/// upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Value {
    /// Creates an unset value of the given shape.
    pub fn nan(shape: Shape) -> Self {
        Self::filled(shape, f64::NAN)
    }

    /// Creates a value of the given shape with every entry set to `fill`.
    pub fn filled(shape: Shape, fill: f64) -> Self {
        match shape {
            Shape::Scalar => Value::Scalar(fill),
            Shape::Array(n) => Value::Array(vec![fill; n]),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(_) => Shape::Scalar,
            Value::Array(v) => Shape::Array(v.len()),
        }
    }

    /// Gets the scalar, or `None` for arrays.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            Value::Array(_) => None,
        }
    }

    /// Views the value as a flat slice (a scalar is a one-element slice).
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Value::Scalar(x) => std::slice::from_ref(x),
            Value::Array(v) => v,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        match self {
            Value::Scalar(x) => std::slice::from_mut(x),
            Value::Array(v) => v,
        }
    }

    /// Returns a copy with every entry multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(x * factor),
            Value::Array(v) => Value::Array(v.iter().map(|x| x * factor).collect()),
        }
    }

    /// Returns true when any entry is NaN.
    pub fn is_unset(&self) -> bool {
        self.as_slice().iter().any(|x| x.is_nan())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Array(values)
    }
}

impl From<&[f64]> for Value {
    fn from(values: &[f64]) -> Self {
        Value::Array(values.to_vec())
    }
}

/// Declaration Layer: Quantities and Node Interfaces
/// Declaration of one input or output quantity of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityDecl {
    /// Dotted-path key, e.g. `geometry.wing.span`
    pub key: String,
    /// Unit string understood by [`units::Unit::parse`]
    pub unit: String,
    /// Default value; also fixes the shape
    pub default: Value,
    /// Optional human-readable description
    pub desc: String,
}

impl QuantityDecl {
    fn new(key: &str, unit: &str, shape: Shape) -> Self {
        QuantityDecl {
            key: key.to_string(),
            unit: unit.to_string(),
            default: Value::nan(shape),
            desc: String::new(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.default.shape()
    }

    /// Replaces the NaN sentinel with a concrete default (every entry).
    pub fn with_default(&mut self, value: f64) -> &mut Self {
        self.default = Value::filled(self.shape(), value);
        self
    }

    pub fn with_desc(&mut self, desc: &str) -> &mut Self {
        self.desc = desc.to_string();
        self
    }
}

/// Declared derivative of one output with respect to one input.
///
/// `of` and `wrt` may be `"*"`, meaning every output or every input.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialDecl {
    pub of: String,
    pub wrt: String,
    pub method: DerivativeMethod,
}

/// Everything a node declares during setup.
///
/// # Examples
///
/// ```
/// use aerograph::{NodeInterface, DerivativeMethod};
///
/// let mut interface = NodeInterface::new();
/// interface.add_input("geometry.wing.area", "m**2");
/// interface.add_input("geometry.wing.aspect_ratio", "").with_default(9.0);
/// interface.add_output("geometry.wing.span", "m");
/// interface.declare_partials("*", "*", DerivativeMethod::fd());
///
/// assert_eq!(interface.inputs().len(), 2);
/// assert_eq!(interface.expanded_partials().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeInterface {
    inputs: Vec<QuantityDecl>,
    outputs: Vec<QuantityDecl>,
    partials: Vec<PartialDecl>,
}

impl NodeInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a scalar input defaulting to NaN.
    pub fn add_input(&mut self, key: &str, unit: &str) -> &mut QuantityDecl {
        Self::push(&mut self.inputs, QuantityDecl::new(key, unit, Shape::Scalar))
    }

    /// Declares an array input of fixed length defaulting to NaN.
    pub fn add_array_input(&mut self, key: &str, len: usize, unit: &str) -> &mut QuantityDecl {
        Self::push(&mut self.inputs, QuantityDecl::new(key, unit, Shape::Array(len)))
    }

    /// Declares a scalar output.
    pub fn add_output(&mut self, key: &str, unit: &str) -> &mut QuantityDecl {
        Self::push(&mut self.outputs, QuantityDecl::new(key, unit, Shape::Scalar))
    }

    /// Declares an array output of fixed length.
    pub fn add_array_output(&mut self, key: &str, len: usize, unit: &str) -> &mut QuantityDecl {
        Self::push(&mut self.outputs, QuantityDecl::new(key, unit, Shape::Array(len)))
    }

    /// Declares how the derivative of `of` with respect to `wrt` is obtained.
    pub fn declare_partials(&mut self, of: &str, wrt: &str, method: DerivativeMethod) {
        self.partials.push(PartialDecl { of: of.to_string(), wrt: wrt.to_string(), method });
    }

    fn push(list: &mut Vec<QuantityDecl>, decl: QuantityDecl) -> &mut QuantityDecl {
        let index = list.len();
        list.push(decl);
        &mut list[index]
    }

    pub fn inputs(&self) -> &[QuantityDecl] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[QuantityDecl] {
        &self.outputs
    }

    pub fn partials(&self) -> &[PartialDecl] {
        &self.partials
    }

    pub fn input(&self, key: &str) -> Option<&QuantityDecl> {
        self.inputs.iter().find(|d| d.key == key)
    }

    pub fn output(&self, key: &str) -> Option<&QuantityDecl> {
        self.outputs.iter().find(|d| d.key == key)
    }

    /// Resolves `"*"` wildcards into concrete `(of, wrt, method)` triples.
    ///
    /// A later declaration for the same pair replaces an earlier one.
    pub fn expanded_partials(&self) -> Vec<(String, String, DerivativeMethod)> {
        let mut pairs: Vec<(String, String, DerivativeMethod)> = Vec::new();
        for decl in &self.partials {
            let ofs: Vec<&str> = if decl.of == "*" {
                self.outputs.iter().map(|d| d.key.as_str()).collect()
            } else {
                vec![decl.of.as_str()]
            };
            let wrts: Vec<&str> = if decl.wrt == "*" {
                self.inputs.iter().map(|d| d.key.as_str()).collect()
            } else {
                vec![decl.wrt.as_str()]
            };
            for of in &ofs {
                for wrt in &wrts {
                    match pairs.iter_mut().find(|(o, w, _)| o == of && w == wrt) {
                        Some(existing) => existing.2 = decl.method,
                        None => pairs.push((of.to_string(), wrt.to_string(), decl.method)),
                    }
                }
            }
        }
        pairs
    }
}

/// Evaluation Layer: Inputs, Outputs and Partials
/// Input values handed to [`Node::compute`], keyed by the node's own keys
/// and expressed in the node's declared units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: BTreeMap<String, Value>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds inputs from the declared defaults.
    pub fn from_declarations(decls: &[QuantityDecl]) -> Self {
        Inputs { values: decls.iter().map(|d| (d.key.clone(), d.default.clone())).collect() }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Builder form of [`Inputs::insert`].
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn value(&self, key: &str) -> Result<&Value> {
        self.values.get(key).ok_or_else(|| Error::UnknownQuantity(key.to_string()))
    }

    pub fn value_mut(&mut self, key: &str) -> Result<&mut Value> {
        self.values.get_mut(key).ok_or_else(|| Error::UnknownQuantity(key.to_string()))
    }

    /// Gets a scalar input.
    pub fn scalar(&self, key: &str) -> Result<f64> {
        let value = self.value(key)?;
        value.as_scalar().ok_or_else(|| Error::ShapeMismatch {
            key: key.to_string(),
            expected: Shape::Scalar,
            actual: value.shape(),
        })
    }

    /// Gets an array input (a scalar reads as a one-element array).
    pub fn array(&self, key: &str) -> Result<&[f64]> {
        Ok(self.value(key)?.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Output values written by [`Node::compute`].
///
/// Only declared outputs can be written; anything left untouched stays NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    values: BTreeMap<String, Value>,
}

impl Outputs {
    /// Builds NaN-filled outputs for the given declarations.
    pub fn from_declarations(decls: &[QuantityDecl]) -> Self {
        Outputs { values: decls.iter().map(|d| (d.key.clone(), Value::nan(d.shape()))).collect() }
    }

    /// Writes a scalar output.
    pub fn set(&mut self, key: &str, value: f64) -> Result<()> {
        self.set_value(key, Value::Scalar(value))
    }

    /// Writes an array output; the length must match the declaration.
    pub fn set_array(&mut self, key: &str, values: Vec<f64>) -> Result<()> {
        self.set_value(key, Value::Array(values))
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        let slot = self.values.get_mut(key).ok_or_else(|| Error::UnknownQuantity(key.to_string()))?;
        if slot.shape() != value.shape() {
            return Err(Error::ShapeMismatch {
                key: key.to_string(),
                expected: slot.shape(),
                actual: value.shape(),
            });
        }
        *slot = value;
        Ok(())
    }

    pub fn value(&self, key: &str) -> Result<&Value> {
        self.values.get(key).ok_or_else(|| Error::UnknownQuantity(key.to_string()))
    }

    pub fn scalar(&self, key: &str) -> Result<f64> {
        let value = self.value(key)?;
        value.as_scalar().ok_or_else(|| Error::ShapeMismatch {
            key: key.to_string(),
            expected: Shape::Scalar,
            actual: value.shape(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Partial derivatives of a node's outputs with respect to its inputs.
///
/// Every entry is a dense `len(of) x len(wrt)` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partials {
    values: BTreeMap<(String, String), DMatrix<f64>>,
}

impl Partials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar-by-scalar derivative.
    pub fn set(&mut self, of: &str, wrt: &str, value: f64) {
        self.set_block(of, wrt, DMatrix::from_element(1, 1, value));
    }

    pub fn set_block(&mut self, of: &str, wrt: &str, block: DMatrix<f64>) {
        self.values.insert((of.to_string(), wrt.to_string()), block);
    }

    pub fn get(&self, of: &str, wrt: &str) -> Option<&DMatrix<f64>> {
        self.values.get(&(of.to_string(), wrt.to_string()))
    }

    /// Gets a scalar-by-scalar derivative.
    pub fn scalar(&self, of: &str, wrt: &str) -> Option<f64> {
        self.get(of, wrt).filter(|m| m.len() == 1).map(|m| m[(0, 0)])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &DMatrix<f64>)> {
        self.values.iter()
    }
}

/// Trait for Formula Nodes
///
/// A node is a pure formula: it declares named, unit-tagged inputs and
/// outputs in [`Node::setup`] and maps inputs to outputs in
/// [`Node::compute`]. Construction-time options live in the implementing
/// struct; nothing else may persist between evaluations.
///
/// # Examples
///
/// ```
/// use aerograph::{Node, NodeInterface, Inputs, Outputs, Result, evaluate_node};
///
/// #[derive(Debug)]
/// struct WingLoading;
///
/// impl Node for WingLoading {
///     fn setup(&self, interface: &mut NodeInterface) {
///         interface.add_input("weight.mtow", "kg");
///         interface.add_input("geometry.wing.area", "m**2");
///         interface.add_output("performance.wing_loading", "kg/m**2");
///     }
///
///     fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
///         let mtow = inputs.scalar("weight.mtow")?;
///         let area = inputs.scalar("geometry.wing.area")?;
///         outputs.set("performance.wing_loading", mtow / area)
///     }
/// }
///
/// let inputs = Inputs::new().with("weight.mtow", 1000.0).with("geometry.wing.area", 10.0);
/// let outputs = evaluate_node(&WingLoading, &inputs)?;
/// assert_eq!(outputs.scalar("performance.wing_loading")?, 100.0);
/// # Ok::<(), aerograph::Error>(())
/// ```
pub trait Node: fmt::Debug {
    /// Short type name used in logs.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Declares inputs, outputs and partials.
    fn setup(&self, interface: &mut NodeInterface);

    /// Computes every declared output from the inputs.
    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()>;

    /// Supplies the partials declared with [`DerivativeMethod::Analytic`].
    fn compute_partials(&self, _inputs: &Inputs, _partials: &mut Partials) -> Result<()> {
        Ok(())
    }

    /// True for stand-ins returning a constant or an identity because the
    /// physical effect is not yet modeled.
    fn is_placeholder(&self) -> bool {
        false
    }
}

/// Runs `setup` on a node and returns its declarations.
pub fn interface_of(node: &dyn Node) -> NodeInterface {
    let mut interface = NodeInterface::new();
    node.setup(&mut interface);
    interface
}

/// Evaluates a single node outside any pipeline.
///
/// Inputs missing from `inputs` take their declared defaults.
pub fn evaluate_node(node: &dyn Node, inputs: &Inputs) -> Result<Outputs> {
    let interface = interface_of(node);
    let mut full = Inputs::from_declarations(interface.inputs());
    for (key, value) in inputs.iter() {
        full.insert(key, value.clone());
    }
    let mut outputs = Outputs::from_declarations(interface.outputs());
    node.compute(&full, &mut outputs)?;
    Ok(outputs)
}

/// Node with no inputs and no outputs.
///
/// Stands in for a deactivated submodel role.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyNode;

impl Node for EmptyNode {
    fn setup(&self, _interface: &mut NodeInterface) {}

    fn compute(&self, _inputs: &Inputs, _outputs: &mut Outputs) -> Result<()> {
        Ok(())
    }
}

/// Configuration Layer: Construction-Time Options
/// A typed option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

/// Named construction-time parameters of a node or pipeline.
///
/// # Examples
///
/// ```
/// use aerograph::Options;
///
/// let defaults = Options::new().with("stations", 10_i64).with("run_solver", true);
/// let options = Options::new().with("run_solver", false).merged_over(&defaults);
///
/// assert_eq!(options.get_int("stations", 0).unwrap(), 10);
/// assert!(!options.get_bool("run_solver", true).unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Returns these options layered on top of `base`.
    pub fn merged_over(&self, base: &Options) -> Options {
        let mut merged = base.clone();
        for (key, value) in &self.values {
            merged.values.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, AssemblyError> {
        match self.get(key) {
            None => Ok(default),
            Some(OptionValue::Bool(b)) => Ok(*b),
            Some(_) => Err(Self::type_error(key, "boolean")),
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, AssemblyError> {
        match self.get(key) {
            None => Ok(default),
            Some(OptionValue::Int(i)) => Ok(*i),
            Some(_) => Err(Self::type_error(key, "integer")),
        }
    }

    /// Gets a float; integer values are accepted.
    pub fn get_float(&self, key: &str, default: f64) -> Result<f64, AssemblyError> {
        match self.get(key) {
            None => Ok(default),
            Some(OptionValue::Float(x)) => Ok(*x),
            Some(OptionValue::Int(i)) => Ok(*i as f64),
            Some(_) => Err(Self::type_error(key, "float")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>, AssemblyError> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Str(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(Self::type_error(key, "string")),
        }
    }

    fn type_error(key: &str, expected: &'static str) -> AssemblyError {
        AssemblyError::OptionType { key: key.to_string(), expected }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.values.iter()
    }
}

/// Scalar Abstraction for Formulas
/// Numeric type a formula can be written against once and evaluated with
/// either plain `f64` or dual numbers (with the `autodiff` feature).
///
/// | Method | Description |
/// |--------|-------------|
/// | `sqrt(self)` | Square root |
/// | `powi(self, n)` | Integer power |
/// | `powf(self, n)` | Real power |
/// | `ln(self)` / `log10(self)` | Logarithms |
/// | `exp(self)` | Exponential |
/// | `sin`, `cos`, `tan` | Trigonometry (radians) |
pub trait Scalar:
    Copy
    + From<f64>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    fn sqrt(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn powf(self, n: f64) -> Self;
    fn ln(self) -> Self;
    fn log10(self) -> Self;
    fn exp(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tan(self) -> Self;
    /// The real (value) part.
    fn re(self) -> f64;
}

impl Scalar for f64 {
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }
    fn powf(self, n: f64) -> Self {
        f64::powf(self, n)
    }
    fn ln(self) -> Self {
        f64::ln(self)
    }
    fn log10(self) -> Self {
        f64::log10(self)
    }
    fn exp(self) -> Self {
        f64::exp(self)
    }
    fn sin(self) -> Self {
        f64::sin(self)
    }
    fn cos(self) -> Self {
        f64::cos(self)
    }
    fn tan(self) -> Self {
        f64::tan(self)
    }
    fn re(self) -> f64 {
        self
    }
}

#[cfg(feature = "autodiff")]
impl Scalar for num_dual::Dual64 {
    fn sqrt(self) -> Self {
        num_dual::DualNum::sqrt(&self)
    }
    fn powi(self, n: i32) -> Self {
        num_dual::DualNum::powi(&self, n)
    }
    fn powf(self, n: f64) -> Self {
        num_dual::DualNum::powf(&self, n)
    }
    fn ln(self) -> Self {
        num_dual::DualNum::ln(&self)
    }
    fn log10(self) -> Self {
        num_dual::DualNum::log10(&self)
    }
    fn exp(self) -> Self {
        num_dual::DualNum::exp(&self)
    }
    fn sin(self) -> Self {
        num_dual::DualNum::sin(&self)
    }
    fn cos(self) -> Self {
        num_dual::DualNum::cos(&self)
    }
    fn tan(self) -> Self {
        num_dual::DualNum::tan(&self)
    }
    fn re(self) -> f64 {
        self.re
    }
}
