//! Arena holding one generation of the protocol menu tree.

use std::collections::HashMap;

use crate::node::{NodeId, NodeProperties, PropertyMap, ProtocolNode, ToggleState};

/// One node of a `GetLayout` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: NodeId,
    pub properties: PropertyMap,
    pub children: Vec<LayoutNode>,
}

/// Protocol nodes keyed by id. The root (id 0) is always present and carries
/// no properties of its own.
#[derive(Debug, Clone)]
pub struct ProtocolTree {
    nodes: HashMap<NodeId, ProtocolNode>,
}

impl Default for ProtocolTree {
    fn default() -> Self {
        let root = ProtocolNode {
            id: NodeId::ROOT,
            properties: NodeProperties::default(),
            children: Vec::new(),
            binding: None,
        };
        Self {
            nodes: HashMap::from([(NodeId::ROOT, root)]),
        }
    }
}

impl ProtocolTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&ProtocolNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(NodeId::ROOT).is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// All non-root ids in depth-first display order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        let mut stack: Vec<NodeId> = self.children(NodeId::ROOT).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    pub(crate) fn insert(&mut self, node: ProtocolNode) {
        self.nodes.insert(node.id, node);
    }

    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = children;
        }
    }

    /// Returns whether the value changed.
    pub(crate) fn set_enabled(&mut self, id: NodeId, enabled: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.properties.enabled != enabled => {
                node.properties.enabled = enabled;
                true
            }
            _ => false,
        }
    }

    /// Returns whether the value changed.
    pub(crate) fn set_toggle_state(&mut self, id: NodeId, state: ToggleState) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.properties.toggle_state != state => {
                node.properties.toggle_state = state;
                true
            }
            _ => false,
        }
    }

    /// Layout below `parent`.
    ///
    /// `depth` follows the dbusmenu convention: `-1` recurses fully, `0`
    /// returns the node alone. `filter` restricts the exported properties
    /// (empty means all).
    pub fn layout(&self, parent: NodeId, depth: i32, filter: &[String]) -> Option<LayoutNode> {
        let node = self.nodes.get(&parent)?;
        let children = if depth == 0 {
            Vec::new()
        } else {
            let next = if depth < 0 { depth } else { depth - 1 };
            node.children
                .iter()
                .filter_map(|child| self.layout(*child, next, filter))
                .collect()
        };
        Some(LayoutNode {
            id: parent,
            properties: node.properties.exported(filter),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i32, label: &str) -> ProtocolNode {
        ProtocolNode {
            id: NodeId(id),
            properties: NodeProperties {
                label: Some(label.into()),
                ..NodeProperties::default()
            },
            children: Vec::new(),
            binding: None,
        }
    }

    /// root -> [1 -> [3], 2]
    fn sample() -> ProtocolTree {
        let mut tree = ProtocolTree::new();
        tree.insert(node(1, "Drive"));
        tree.insert(node(2, "Quit"));
        tree.insert(node(3, "Eject"));
        tree.set_children(NodeId(1), vec![NodeId(3)]);
        tree.set_children(NodeId::ROOT, vec![NodeId(1), NodeId(2)]);
        tree
    }

    #[test]
    fn new_tree_has_only_root() {
        let tree = ProtocolTree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert!(tree.walk().is_empty());
        assert!(tree.get(NodeId::ROOT).unwrap().properties.exported(&[]).is_empty());
    }

    #[test]
    fn walk_is_depth_first() {
        assert_eq!(sample().walk(), [NodeId(1), NodeId(3), NodeId(2)]);
    }

    #[test]
    fn layout_depth_limits() {
        let tree = sample();

        let full = tree.layout(NodeId::ROOT, -1, &[]).unwrap();
        assert_eq!(full.children.len(), 2);
        assert_eq!(full.children[0].children.len(), 1);

        let shallow = tree.layout(NodeId::ROOT, 1, &[]).unwrap();
        assert_eq!(shallow.children.len(), 2);
        assert!(shallow.children[0].children.is_empty());

        let alone = tree.layout(NodeId(1), 0, &[]).unwrap();
        assert!(alone.children.is_empty());
        assert_eq!(alone.properties.len(), 1);

        assert!(tree.layout(NodeId(99), -1, &[]).is_none());
    }

    #[test]
    fn setters_report_changes() {
        let mut tree = sample();
        assert!(!tree.set_enabled(NodeId(2), true));
        assert!(tree.set_enabled(NodeId(2), false));
        assert!(!tree.set_enabled(NodeId(2), false));
        assert!(tree.set_toggle_state(NodeId(3), ToggleState::On));
        assert!(!tree.set_enabled(NodeId(42), false));
    }
}
