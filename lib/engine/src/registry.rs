//! Node and workflow-preset registry.
//!
//! The registry is populated once during process startup, shared as an
//! `Arc`, and never mutated afterwards, so unlimited concurrent pipeline
//! runs can read it without locking. Preset registration deliberately does
//! not validate node existence: nodes and presets may be registered in any
//! order, and validation happens at resolution time instead.

use crate::error::RegistryError;
use crate::node::NodeUnit;
use std::sync::Arc;

/// A named, ordered list of node names with a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPreset {
    /// The node names to execute, in order.
    pub steps: Vec<String>,
    /// What this preset is for.
    pub description: String,
}

/// Registry of unit-of-work handles and workflow presets.
///
/// Enumeration preserves insertion order; re-registering an existing name
/// replaces the entry in place.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: Vec<(String, Arc<dyn NodeUnit>)>,
    workflows: Vec<(String, WorkflowPreset)>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node, replacing any existing entry with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyNodeName`] when the name is empty.
    pub fn register_node(
        &mut self,
        name: impl Into<String>,
        unit: Arc<dyn NodeUnit>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyNodeName);
        }
        match self.nodes.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = unit,
            None => self.nodes.push((name.clone(), unit)),
        }
        tracing::debug!(node = %name, "registered node");
        Ok(())
    }

    /// Registers a workflow preset, replacing any existing entry.
    ///
    /// Node existence is not checked here; see [`NodeRegistry::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyWorkflowName`] when the name is empty.
    pub fn register_workflow(
        &mut self,
        name: impl Into<String>,
        steps: Vec<String>,
        description: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyWorkflowName);
        }
        let preset = WorkflowPreset {
            steps,
            description: description.into(),
        };
        match self.workflows.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = preset,
            None => self.workflows.push((name, preset)),
        }
        Ok(())
    }

    /// Returns the unit of work registered under `name`, if any.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<Arc<dyn NodeUnit>> {
        self.nodes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, unit)| Arc::clone(unit))
    }

    /// True if a node is registered under `name`.
    #[must_use]
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|(n, _)| n == name)
    }

    /// Returns the preset registered under `name`, if any.
    #[must_use]
    pub fn workflow(&self, name: &str) -> Option<&WorkflowPreset> {
        self.workflows
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, preset)| preset)
    }

    /// Returns the steps of the preset registered under `name`, if any.
    #[must_use]
    pub fn workflow_steps(&self, name: &str) -> Option<&[String]> {
        self.workflow(name).map(|preset| preset.steps.as_slice())
    }

    /// Registered node names, in insertion order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(name, _)| name.as_str())
    }

    /// Registered presets, in insertion order.
    pub fn workflows(&self) -> impl Iterator<Item = (&str, &WorkflowPreset)> {
        self.workflows
            .iter()
            .map(|(name, preset)| (name.as_str(), preset))
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of registered presets.
    #[must_use]
    pub fn workflow_count(&self) -> usize {
        self.workflows.len()
    }

    /// True iff every name resolves to a registered node.
    #[must_use]
    pub fn validate(&self, steps: &[String]) -> bool {
        steps.iter().all(|step| self.has_node(step))
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.node_names().collect::<Vec<_>>())
            .field(
                "workflows",
                &self.workflows().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}
