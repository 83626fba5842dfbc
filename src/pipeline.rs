//! Pipelines: composition of nodes under a shared quantity namespace.
//!
//! A [`Pipeline`] is an ordered list of named children, each either a
//! [`Node`] or a nested pipeline. Every child carries a [`Promotions`] map
//! deciding under which key each of its quantities appears in the parent
//! namespace:
//!
//! - [`Promotion::Expose`]: the key is kept as is (the default);
//! - [`Promotion::Rename`]: the key is replaced;
//! - [`Promotion::KeepLocal`]: the key is scoped under the child name
//!   (`child.key`), hiding it from siblings.
//!
//! Assembly ([`Pipeline::assemble`]) flattens the tree, rejects two children
//! producing the same key, checks that every connection joins compatible
//! units and shapes, and orders the nodes so that producers run before
//! consumers.
//!
//! # Example
//!
//! ```
//! use aerograph::Pipeline;
//! use aerograph::models::{ComputeVtChords, ComputeVtMac};
//!
//! let mut vertical_tail = Pipeline::new("vertical_tail");
//! // Declared out of order on purpose: assembly sorts by dependency
//! vertical_tail.add_node("mac", ComputeVtMac);
//! vertical_tail.add_node("chords", ComputeVtChords);
//!
//! let assembly = vertical_tail.assemble().unwrap();
//! assert_eq!(assembly.execution_order(), vec!["chords", "mac"]);
//! ```

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use crate::units::{Unit, conversion_factor};
use crate::{AssemblyError, Node, NodeInterface, QuantityDecl, interface_of};

/// How one quantity of a child appears in its parent's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// Keep the key unchanged
    Expose,
    /// Replace the key
    Rename(String),
    /// Prefix the key with the child name
    KeepLocal,
}

/// Promotion map of one child.
///
/// # Examples
///
/// ```
/// use aerograph::Promotions;
///
/// let mut promotions = Promotions::expose_all();
/// promotions.rename("geometry.wing.area", "geometry.wing.reference_area");
/// promotions.keep_local("scratch.value");
///
/// assert_eq!(promotions.resolve("wing", "geometry.wing.span"), "geometry.wing.span");
/// assert_eq!(promotions.resolve("wing", "geometry.wing.area"), "geometry.wing.reference_area");
/// assert_eq!(promotions.resolve("wing", "scratch.value"), "wing.scratch.value");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Promotions {
    /// When true, keys without an override are kept local
    scoped: bool,
    overrides: BTreeMap<String, Promotion>,
}

impl Promotions {
    /// Every key is exposed unless overridden.
    pub fn expose_all() -> Self {
        Self::default()
    }

    /// Every key is kept local unless overridden.
    pub fn keep_all_local() -> Self {
        Promotions { scoped: true, overrides: BTreeMap::new() }
    }

    /// Switches the default for keys without an override to "keep local".
    pub fn scoped(&mut self) -> &mut Self {
        self.scoped = true;
        self
    }

    pub fn expose(&mut self, key: &str) -> &mut Self {
        self.overrides.insert(key.to_string(), Promotion::Expose);
        self
    }

    pub fn rename(&mut self, key: &str, to: &str) -> &mut Self {
        self.overrides.insert(key.to_string(), Promotion::Rename(to.to_string()));
        self
    }

    pub fn keep_local(&mut self, key: &str) -> &mut Self {
        self.overrides.insert(key.to_string(), Promotion::KeepLocal);
        self
    }

    /// Key under which `key` of child `child` appears in the parent.
    pub fn resolve(&self, child: &str, key: &str) -> String {
        let default = if self.scoped { Promotion::KeepLocal } else { Promotion::Expose };
        match self.overrides.get(key).unwrap_or(&default) {
            Promotion::Expose => key.to_string(),
            Promotion::Rename(to) => to.clone(),
            Promotion::KeepLocal => format!("{}.{}", child, key),
        }
    }
}

#[derive(Debug)]
enum Child {
    Node(Box<dyn Node>),
    Pipeline(Pipeline),
}

#[derive(Debug)]
struct ChildEntry {
    name: String,
    child: Child,
    promotions: Promotions,
}

/// An ordered collection of nodes and nested pipelines.
///
/// A pipeline computes nothing itself; it only delegates to its children and
/// merges their namespaces.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    children: Vec<ChildEntry>,
}

impl Pipeline {
    pub fn new(name: &str) -> Self {
        Pipeline { name: name.to_string(), children: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a node; returns its promotion map for adjustment.
    pub fn add_node(&mut self, name: &str, node: impl Node + 'static) -> &mut Promotions {
        self.add_boxed_node(name, Box::new(node))
    }

    /// Adds an already boxed node, e.g. one resolved from the registry.
    pub fn add_boxed_node(&mut self, name: &str, node: Box<dyn Node>) -> &mut Promotions {
        self.push(name, Child::Node(node))
    }

    /// Nests a pipeline; returns its promotion map for adjustment.
    pub fn add_pipeline(&mut self, name: &str, pipeline: Pipeline) -> &mut Promotions {
        self.push(name, Child::Pipeline(pipeline))
    }

    fn push(&mut self, name: &str, child: Child) -> &mut Promotions {
        let index = self.children.len();
        self.children.push(ChildEntry {
            name: name.to_string(),
            child,
            promotions: Promotions::expose_all(),
        });
        &mut self.children[index].promotions
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Names of direct children, in insertion order.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }

    /// Flattens, validates and orders the pipeline.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::DuplicateChild`] for two children with one name
    /// - [`AssemblyError::DuplicateOutput`] for two producers of one key
    /// - [`AssemblyError::InvalidUnit`], [`AssemblyError::IncompatibleUnits`]
    ///   and [`AssemblyError::IncompatibleShapes`] for bad connections
    /// - [`AssemblyError::Cycle`] when producers depend on each other
    pub fn assemble(self) -> Result<Assembly, AssemblyError> {
        let name = self.name.clone();
        let placed = self.flatten("")?;
        let assembly = Assembly::build(placed)?;
        info!(
            pipeline = %name,
            nodes = assembly.nodes.len(),
            quantities = assembly.quantities.len(),
            "Assembled pipeline"
        );
        Ok(assembly)
    }

    fn flatten(self, prefix: &str) -> Result<Vec<PlacedNode>, AssemblyError> {
        let mut seen = HashSet::new();
        let mut placed = Vec::new();

        for entry in self.children {
            if !seen.insert(entry.name.clone()) {
                return Err(AssemblyError::DuplicateChild { pipeline: self.name, child: entry.name });
            }
            let path =
                if prefix.is_empty() { entry.name.clone() } else { format!("{}.{}", prefix, entry.name) };

            match entry.child {
                Child::Node(node) => {
                    let interface = interface_of(node.as_ref());
                    let input_keys = interface
                        .inputs()
                        .iter()
                        .map(|d| entry.promotions.resolve(&entry.name, &d.key))
                        .collect();
                    let output_keys = interface
                        .outputs()
                        .iter()
                        .map(|d| entry.promotions.resolve(&entry.name, &d.key))
                        .collect();
                    placed.push(PlacedNode {
                        path,
                        node,
                        interface,
                        input_keys,
                        output_keys,
                        input_scales: Vec::new(),
                    });
                }
                Child::Pipeline(sub) => {
                    for mut node in sub.flatten(&path)? {
                        for key in node.input_keys.iter_mut().chain(node.output_keys.iter_mut()) {
                            *key = entry.promotions.resolve(&entry.name, key);
                        }
                        placed.push(node);
                    }
                }
            }
        }

        Ok(placed)
    }
}

/// A node placed in the flat namespace of an assembled pipeline.
#[derive(Debug)]
pub struct PlacedNode {
    /// Dotted path of child names, e.g. `aerodynamics.cd0_wing`
    pub path: String,
    pub node: Box<dyn Node>,
    pub interface: NodeInterface,
    /// Namespace key of each declared input, in declaration order
    pub input_keys: Vec<String>,
    /// Namespace key of each declared output, in declaration order
    pub output_keys: Vec<String>,
    /// Factor from the namespace unit to the declared unit of each input
    pub input_scales: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Flat, validated and dependency-ordered form of a pipeline.
#[derive(Debug)]
pub struct Assembly {
    /// Nodes in execution order
    nodes: Vec<PlacedNode>,
    /// Producing node index for every output key
    producers: BTreeMap<String, usize>,
    /// Declaration defining the unit, shape and default of every key
    quantities: BTreeMap<String, QuantityDecl>,
}

impl Assembly {
    fn build(mut nodes: Vec<PlacedNode>) -> Result<Self, AssemblyError> {
        // Producers, in declaration order
        let mut producers: BTreeMap<String, usize> = BTreeMap::new();
        for (index, node) in nodes.iter().enumerate() {
            for key in &node.output_keys {
                if let Some(&first) = producers.get(key) {
                    return Err(AssemblyError::DuplicateOutput {
                        key: key.clone(),
                        first: nodes[first].path.clone(),
                        second: node.path.clone(),
                    });
                }
                producers.insert(key.clone(), index);
            }
        }

        // Canonical declarations: the producer's output, else the first consumer's input
        let mut quantities: BTreeMap<String, QuantityDecl> = BTreeMap::new();
        for node in &nodes {
            for (decl, key) in node.interface.outputs().iter().zip(&node.output_keys) {
                Self::check_unit(key, &decl.unit)?;
                quantities.insert(key.clone(), QuantityDecl { key: key.clone(), ..decl.clone() });
            }
        }
        for node in &nodes {
            for (decl, key) in node.interface.inputs().iter().zip(&node.input_keys) {
                Self::check_unit(key, &decl.unit)?;
                quantities
                    .entry(key.clone())
                    .or_insert_with(|| QuantityDecl { key: key.clone(), ..decl.clone() });
            }
        }

        // Connection checks and unit scales
        for node in &mut nodes {
            let mut scales = Vec::with_capacity(node.input_keys.len());
            for (decl, key) in node.interface.inputs().iter().zip(&node.input_keys) {
                let canonical = &quantities[key];
                if canonical.shape() != decl.shape() {
                    return Err(AssemblyError::IncompatibleShapes {
                        key: key.clone(),
                        output: canonical.shape(),
                        input: decl.shape(),
                    });
                }
                let scale = conversion_factor(&canonical.unit, &decl.unit).map_err(|_| {
                    AssemblyError::IncompatibleUnits {
                        key: key.clone(),
                        output_unit: canonical.unit.clone(),
                        input_unit: decl.unit.clone(),
                    }
                })?;
                scales.push(scale);
            }
            node.input_scales = scales;
        }

        let order = Self::dependency_order(&nodes, &producers)?;

        let mut slots: Vec<Option<PlacedNode>> = nodes.into_iter().map(Some).collect();
        let nodes: Vec<PlacedNode> = order.iter().filter_map(|&i| slots[i].take()).collect();

        let mut producers = BTreeMap::new();
        for (index, node) in nodes.iter().enumerate() {
            debug!(position = index, node = %node.path, "Execution order");
            for key in &node.output_keys {
                producers.insert(key.clone(), index);
            }
        }

        Ok(Assembly { nodes, producers, quantities })
    }

    fn check_unit(key: &str, unit: &str) -> Result<(), AssemblyError> {
        Unit::parse(unit)
            .map(|_| ())
            .map_err(|_| AssemblyError::InvalidUnit { key: key.to_string(), unit: unit.to_string() })
    }

    /// Orders nodes so that every producer precedes its consumers using
    /// depth-first search; declaration order is kept wherever dependencies
    /// allow it.
    fn dependency_order(
        nodes: &[PlacedNode],
        producers: &BTreeMap<String, usize>,
    ) -> Result<Vec<usize>, AssemblyError> {
        // Build dependency lists (consumer -> producers)
        let dependencies: Vec<Vec<usize>> = nodes
            .iter()
            .map(|node| node.input_keys.iter().filter_map(|k| producers.get(k).copied()).collect())
            .collect();

        fn dfs(
            node: usize,
            dependencies: &[Vec<usize>],
            state: &mut [VisitState],
            path: &mut Vec<usize>,
            order: &mut Vec<usize>,
        ) -> Result<(), Vec<usize>> {
            state[node] = VisitState::InProgress;
            path.push(node);

            for &dependency in &dependencies[node] {
                match state[dependency] {
                    VisitState::Unvisited => dfs(dependency, dependencies, state, path, order)?,
                    VisitState::InProgress => {
                        // Found a cycle - extract it from path
                        let start = path.iter().position(|&id| id == dependency).unwrap_or(0);
                        let mut cycle = path[start..].to_vec();
                        cycle.push(dependency);
                        return Err(cycle);
                    }
                    VisitState::Done => {}
                }
            }

            path.pop();
            state[node] = VisitState::Done;
            order.push(node);
            Ok(())
        }

        let mut state = vec![VisitState::Unvisited; nodes.len()];
        let mut order = Vec::with_capacity(nodes.len());
        let mut path = Vec::new();

        for node in 0..nodes.len() {
            if state[node] == VisitState::Unvisited {
                dfs(node, &dependencies, &mut state, &mut path, &mut order).map_err(|cycle| {
                    // The path runs consumer -> producer; report it in flow direction
                    AssemblyError::Cycle(cycle.iter().rev().map(|&i| nodes[i].path.clone()).collect())
                })?;
            }
        }

        Ok(order)
    }

    /// Nodes in execution order.
    pub fn nodes(&self) -> &[PlacedNode] {
        &self.nodes
    }

    /// Paths of nodes in execution order.
    pub fn execution_order(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.path.as_str()).collect()
    }

    /// Finds a node by its path.
    pub fn node(&self, path: &str) -> Option<&PlacedNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    /// The node producing `key`, if any.
    pub fn producer(&self, key: &str) -> Option<&PlacedNode> {
        self.producers.get(key).map(|&i| &self.nodes[i])
    }

    /// Canonical declaration of a namespace key.
    pub fn quantity(&self, key: &str) -> Option<&QuantityDecl> {
        self.quantities.get(key)
    }

    pub fn quantities(&self) -> impl Iterator<Item = &QuantityDecl> {
        self.quantities.values()
    }

    /// Returns true when some node produces `key`.
    pub fn is_output(&self, key: &str) -> bool {
        self.producers.contains_key(key)
    }

    /// Keys consumed but produced by no node; they must be supplied
    /// externally.
    pub fn external_inputs(&self) -> impl Iterator<Item = &QuantityDecl> {
        self.quantities.values().filter(|q| !self.producers.contains_key(&q.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Inputs, Outputs, Result};

    /// Test node copying `from` into `to` with a configurable unit.
    #[derive(Debug)]
    struct Relay {
        from: &'static str,
        to: &'static str,
        unit: &'static str,
    }

    impl Node for Relay {
        fn setup(&self, interface: &mut NodeInterface) {
            interface.add_input(self.from, self.unit);
            interface.add_output(self.to, self.unit);
        }

        fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
            outputs.set(self.to, inputs.scalar(self.from)?)
        }
    }

    fn copy(from: &'static str, to: &'static str) -> Relay {
        Relay { from, to, unit: "m" }
    }

    #[test]
    fn test_duplicate_output_fails_assembly() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("first", copy("a", "b"));
        pipeline.add_node("second", copy("c", "b"));

        let err = pipeline.assemble().unwrap_err();
        assert_eq!(
            err,
            AssemblyError::DuplicateOutput {
                key: "b".to_string(),
                first: "first".to_string(),
                second: "second".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_output_across_nested_pipelines() {
        let mut left = Pipeline::new("left");
        left.add_node("n", copy("a", "out"));
        let mut right = Pipeline::new("right");
        right.add_node("n", copy("b", "out"));

        let mut root = Pipeline::new("root");
        root.add_pipeline("left", left);
        root.add_pipeline("right", right);

        assert!(matches!(root.assemble(), Err(AssemblyError::DuplicateOutput { .. })));
    }

    #[test]
    fn test_keep_local_avoids_collision() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("first", copy("a", "b"));
        pipeline.add_node("second", copy("a", "b")).keep_local("b");

        let assembly = pipeline.assemble().unwrap();
        assert!(assembly.is_output("b"));
        assert!(assembly.is_output("second.b"));
    }

    #[test]
    fn test_rename_connects_children() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("consumer", copy("y", "z"));
        pipeline.add_node("producer", copy("x", "out")).rename("out", "y");

        let assembly = pipeline.assemble().unwrap();
        assert_eq!(assembly.execution_order(), vec!["producer", "consumer"]);
        assert_eq!(assembly.producer("y").unwrap().path, "producer");
        let external: Vec<&str> = assembly.external_inputs().map(|q| q.key.as_str()).collect();
        assert_eq!(external, vec!["x"]);
    }

    #[test]
    fn test_duplicate_child_name() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("n", copy("a", "b"));
        pipeline.add_node("n", copy("c", "d"));
        assert!(matches!(pipeline.assemble(), Err(AssemblyError::DuplicateChild { .. })));
    }

    #[test]
    fn test_cycle_detection() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("a", copy("x", "y"));
        pipeline.add_node("b", copy("y", "x"));

        match pipeline.assemble() {
            Err(AssemblyError::Cycle(path)) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 3);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_incompatible_units() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("length", Relay { from: "a", to: "b", unit: "m" });
        pipeline.add_node("time", Relay { from: "b", to: "c", unit: "s" });

        assert!(matches!(pipeline.assemble(), Err(AssemblyError::IncompatibleUnits { .. })));
    }

    #[test]
    fn test_unit_scales_recorded() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("metric", Relay { from: "a", to: "b", unit: "m" });
        pipeline.add_node("imperial", Relay { from: "b", to: "c", unit: "ft" });

        let assembly = pipeline.assemble().unwrap();
        let imperial = assembly.node("imperial").unwrap();
        assert!((imperial.input_scales[0] - 1.0 / 0.3048).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_unit() {
        let mut pipeline = Pipeline::new("root");
        pipeline.add_node("n", Relay { from: "a", to: "b", unit: "parsec" });
        assert!(matches!(pipeline.assemble(), Err(AssemblyError::InvalidUnit { .. })));
    }

    #[test]
    fn test_nested_paths_and_scoping() {
        let mut inner = Pipeline::new("inner");
        inner.add_node("n", copy("a", "b"));

        let mut root = Pipeline::new("root");
        root.add_pipeline("sub", inner).scoped();

        let assembly = root.assemble().unwrap();
        assert_eq!(assembly.execution_order(), vec!["sub.n"]);
        assert!(assembly.is_output("sub.b"));
        assert!(assembly.quantity("sub.a").is_some());
    }
}
