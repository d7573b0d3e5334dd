//! The unlinked-node registry.
//!
//! Every node handle that leaves the tree (explicit unlink, or a fragment
//! being removed) is appended here so that teardown can release it exactly
//! once. The registry only grows during normal operation.

use std::collections::HashSet;

use crate::error::TreeError;
use crate::tree::NodeId;

const INITIAL_CAPACITY: usize = 8;

/// Ordered set of detached node handles awaiting release.
#[derive(Debug, Clone)]
pub struct UnlinkedNodes {
    handles: Vec<NodeId>,
    members: HashSet<NodeId>,
}

impl UnlinkedNodes {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: Vec::with_capacity(INITIAL_CAPACITY),
            members: HashSet::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Appends a handle. No validation is performed; registering the same
    /// handle twice is harmless because teardown skips stale handles.
    pub fn append(&mut self, id: NodeId) {
        tracing::trace!(node = ?id, slot = self.handles.len(), "registered unlinked node");
        self.handles.push(id);
        self.members.insert(id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterates the handles in registration order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.handles.iter().copied()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains(&id)
    }

    /// Empties the registry, handing each handle to `free` in registration
    /// order. Returns each handle with the outcome of freeing it.
    pub fn drain_and_free<F>(&mut self, mut free: F) -> Vec<(NodeId, Result<usize, TreeError>)>
    where
        F: FnMut(NodeId) -> Result<usize, TreeError>,
    {
        self.members.clear();
        self.handles
            .drain(..)
            .map(|id| (id, free(id)))
            .collect()
    }
}

impl Default for UnlinkedNodes {
    fn default() -> Self {
        Self::new()
    }
}
