//! Submodel registry: role-keyed node factories.
//!
//! A *role* is an abstract slot in a pipeline ("the wing profile-drag
//! model"), identified by a dotted key such as
//! `aircraft.submodel.aerodynamics.wing.cd0`. Each role has one or more
//! registered *implementations*, identified by their own key
//! (`aircraft.submodel.aerodynamics.wing.cd0.legacy`), each holding a
//! constructor and default options.
//!
//! The registry is a plain value handed to pipeline builders; two registries
//! never share selections.
//!
//! # Resolution Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Role not registered | [`AssemblyError::UnknownRole`] |
//! | Selected id not registered for the role | [`AssemblyError::UnknownImplementation`] |
//! | No selection, one implementation | That implementation |
//! | No selection, several implementations | [`AssemblyError::AmbiguousRole`] |
//! | [`Selection::Deactivated`] | [`EmptyNode`] |
//!
//! Options given to the constructor are layered: implementation defaults,
//! then options configured for the role, then the caller's options.
//!
//! # Example
//!
//! ```
//! use aerograph::{Options, Selection, SubmodelRegistry};
//! use aerograph::models::{ComputeCd0WingHoerner, ComputeCd0WingLegacy};
//!
//! fn legacy(options: &Options) -> aerograph::Result<Box<dyn aerograph::Node>> {
//!     Ok(Box::new(ComputeCd0WingLegacy::from_options(options)?))
//! }
//! fn hoerner(_: &Options) -> aerograph::Result<Box<dyn aerograph::Node>> {
//!     Ok(Box::new(ComputeCd0WingHoerner))
//! }
//!
//! let mut registry = SubmodelRegistry::new();
//! registry.register("wing.cd0", "wing.cd0.legacy", legacy);
//! registry.register("wing.cd0", "wing.cd0.hoerner", hoerner);
//!
//! // Two candidates and no selection
//! assert!(registry.resolve("wing.cd0", &Options::new()).is_err());
//!
//! registry.select("wing.cd0", Selection::Implementation("wing.cd0.hoerner".into()))?;
//! let node = registry.resolve("wing.cd0", &Options::new())?;
//! assert_eq!(node.name(), "ComputeCd0WingHoerner");
//! # Ok::<(), aerograph::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::config::RegistryConfig;
use crate::{AssemblyError, EmptyNode, Node, Options};

/// Constructor of a node from its options.
pub type NodeConstructor = fn(&Options) -> crate::Result<Box<dyn Node>>;

/// One registered implementation of a role.
#[derive(Clone)]
pub struct Implementation {
    pub id: String,
    pub constructor: NodeConstructor,
    pub default_options: Options,
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("id", &self.id)
            .field("default_options", &self.default_options)
            .finish_non_exhaustive()
    }
}

/// Active choice for a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Use the implementation with this id
    Implementation(String),
    /// Replace the role with a node without inputs or outputs
    Deactivated,
}

#[derive(Debug, Clone, Default)]
struct Role {
    implementations: BTreeMap<String, Implementation>,
    selection: Option<Selection>,
    options: Options,
}

/// Role-keyed factory of nodes.
#[derive(Debug, Clone, Default)]
pub struct SubmodelRegistry {
    roles: BTreeMap<String, Role>,
}

impl SubmodelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an implementation without default options.
    ///
    /// Registering an id twice replaces the earlier entry.
    pub fn register(&mut self, role: &str, id: &str, constructor: NodeConstructor) {
        self.register_with_defaults(role, id, constructor, Options::new());
    }

    /// Registers an implementation with default options.
    pub fn register_with_defaults(
        &mut self,
        role: &str,
        id: &str,
        constructor: NodeConstructor,
        default_options: Options,
    ) {
        let implementation = Implementation { id: id.to_string(), constructor, default_options };
        self.roles
            .entry(role.to_string())
            .or_default()
            .implementations
            .insert(id.to_string(), implementation);
    }

    /// Selects the active implementation of a role.
    ///
    /// # Errors
    ///
    /// [`AssemblyError::UnknownRole`] or [`AssemblyError::UnknownImplementation`].
    pub fn select(&mut self, role: &str, selection: Selection) -> Result<(), AssemblyError> {
        let entry = self.roles.get_mut(role).ok_or_else(|| AssemblyError::UnknownRole(role.to_string()))?;
        if let Selection::Implementation(id) = &selection {
            if !entry.implementations.contains_key(id) {
                return Err(AssemblyError::UnknownImplementation {
                    role: role.to_string(),
                    implementation: id.clone(),
                });
            }
        }
        entry.selection = Some(selection);
        Ok(())
    }

    /// Sets options applied to whichever implementation the role resolves to.
    pub fn set_role_options(&mut self, role: &str, options: Options) -> Result<(), AssemblyError> {
        let entry = self.roles.get_mut(role).ok_or_else(|| AssemblyError::UnknownRole(role.to_string()))?;
        entry.options = options;
        Ok(())
    }

    /// Explicit selection of a role, if any.
    pub fn selection(&self, role: &str) -> Option<&Selection> {
        self.roles.get(role).and_then(|r| r.selection.as_ref())
    }

    /// Implementation ids registered for a role, sorted.
    pub fn implementations(&self, role: &str) -> Vec<&str> {
        self.roles
            .get(role)
            .map(|r| r.implementations.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Registered role keys, sorted.
    pub fn roles(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    /// Id of the implementation a role resolves to; `None` when deactivated.
    pub fn resolved_id(&self, role: &str) -> Result<Option<&str>, AssemblyError> {
        let entry = self.roles.get(role).ok_or_else(|| AssemblyError::UnknownRole(role.to_string()))?;
        match &entry.selection {
            Some(Selection::Deactivated) => Ok(None),
            Some(Selection::Implementation(id)) => Ok(Some(id.as_str())),
            None => {
                let mut ids = entry.implementations.keys();
                match (ids.next(), entry.implementations.len()) {
                    (Some(id), 1) => Ok(Some(id.as_str())),
                    (_, count) => Err(AssemblyError::AmbiguousRole { role: role.to_string(), count }),
                }
            }
        }
    }

    /// Constructs the node currently filling `role`.
    ///
    /// `options` take precedence over role options and implementation
    /// defaults.
    pub fn resolve(&self, role: &str, options: &Options) -> crate::Result<Box<dyn Node>> {
        let Some(id) = self.resolved_id(role)? else {
            debug!(role = %role, "Submodel deactivated");
            return Ok(Box::new(EmptyNode));
        };

        let entry = &self.roles[role];
        let implementation = entry.implementations.get(id).ok_or_else(|| {
            AssemblyError::UnknownImplementation { role: role.to_string(), implementation: id.to_string() }
        })?;

        let merged = options.merged_over(&entry.options.merged_over(&implementation.default_options));
        debug!(role = %role, implementation = %id, options = merged.len(), "Resolved submodel");
        (implementation.constructor)(&merged)
    }

    /// Applies selections and role options from configuration.
    ///
    /// An empty implementation id deactivates the role.
    pub fn apply_config(&mut self, config: &RegistryConfig) -> Result<(), AssemblyError> {
        for role in config.submodels.keys() {
            if let Some(selection) = config.selection(role) {
                self.select(role, selection)?;
            }
        }
        for (role, options) in &config.options {
            self.set_role_options(role, options.clone())?;
        }
        Ok(())
    }
}
