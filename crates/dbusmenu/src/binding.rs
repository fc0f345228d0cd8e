//! Reverse index from action names to the nodes displaying their state.

use std::collections::HashMap;

use driveicon_model::Variant;

use crate::node::NodeId;

/// Which nodes depend on which action.
///
/// Built together with its tree and replaced together with it, so every id it
/// holds belongs to that tree.
#[derive(Debug, Clone, Default)]
pub struct BindingIndex {
    enabled: HashMap<String, Vec<NodeId>>,
    state: HashMap<String, Vec<(NodeId, Option<Variant>)>>,
}

impl BindingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind_enabled(&mut self, action: &str, node: NodeId) {
        self.enabled.entry(action.to_string()).or_default().push(node);
    }

    /// Registers a toggle node. It shows `on` exactly when the action's state
    /// equals `expected`.
    pub(crate) fn bind_state(&mut self, action: &str, node: NodeId, expected: Option<Variant>) {
        self.state
            .entry(action.to_string())
            .or_default()
            .push((node, expected));
    }

    pub fn enabled_nodes(&self, action: &str) -> &[NodeId] {
        self.enabled.get(action).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn state_nodes(&self, action: &str) -> &[(NodeId, Option<Variant>)] {
        self.state.get(action).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every node id referenced by either mapping.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.enabled
            .values()
            .flatten()
            .copied()
            .chain(self.state.values().flatten().map(|(id, _)| *id))
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty() && self.state.is_empty()
    }
}
