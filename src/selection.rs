//! Selection helpers for the permission editor
//!
//! A factory or department node is "fully selected" when every catalog leaf
//! under it is granted in the edit map. Nodes with no leaves never are.
//! Partial selection is just "not fully selected"; rendering an
//! indeterminate checkbox is up to the caller.

use crate::catalog::CapabilityCatalog;
use crate::keys::{encode, normalize};
use crate::metadata::TreePermissionMap;

/// A non-leaf node of the permission tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectionNode {
    Factory(String),
    Department { factory: String, department: String },
}

impl SelectionNode {
    pub fn factory(factory: &str) -> Self {
        SelectionNode::Factory(normalize(factory))
    }

    pub fn department(factory: &str, department: &str) -> Self {
        SelectionNode::Department { factory: normalize(factory), department: normalize(department) }
    }
}

/// Aggregates leaf grants over catalog nodes
#[derive(Debug, Clone, Copy)]
pub struct SelectionAggregator<'a> {
    catalog: &'a CapabilityCatalog,
}

impl<'a> SelectionAggregator<'a> {
    pub fn new(catalog: &'a CapabilityCatalog) -> Self {
        SelectionAggregator { catalog }
    }

    /// Encoded keys of every catalog leaf under a node, in catalog order.
    /// Unknown nodes have no leaves.
    pub fn leaf_keys(&self, node: &SelectionNode) -> Vec<String> {
        match node {
            SelectionNode::Factory(factory) => self
                .catalog
                .factory(factory)
                .map(|f| {
                    f.departments
                        .iter()
                        .flat_map(|d| d.services.iter().map(move |s| encode(&f.id, &d.id, &s.id)))
                        .collect()
                })
                .unwrap_or_default(),
            SelectionNode::Department { factory, department } => self
                .catalog
                .department(factory, department)
                .map(|d| d.services.iter().map(|s| encode(factory, &d.id, &s.id)).collect())
                .unwrap_or_default(),
        }
    }

    /// `(granted, total)` leaf counts under a node
    pub fn counts(&self, node: &SelectionNode, tree: &TreePermissionMap) -> (usize, usize) {
        let keys = self.leaf_keys(node);
        let granted = keys.iter().filter(|k| tree.is_granted(k)).count();
        (granted, keys.len())
    }

    pub fn is_fully_selected(&self, node: &SelectionNode, tree: &TreePermissionMap) -> bool {
        let (granted, total) = self.counts(node, tree);
        total > 0 && granted == total
    }

    /// Set every leaf under a node to `value` in one batch
    pub fn set_node_granted(&self, node: &SelectionNode, value: bool, tree: &mut TreePermissionMap) {
        let keys = self.leaf_keys(node);
        if keys.is_empty() {
            tracing::debug!(?node, "toggled node has no catalog leaves");
            return;
        }
        tracing::trace!(?node, value, leaves = keys.len(), "fan-out toggle");
        tree.set_all(keys, value);
    }
}

// ============================================================================
// Tests
// ============================================================================
