use std::fmt;

/// A strongly-typed index of a node within a graph arena.
///
/// Ids are dense and stable for the lifetime of the graph that issued them, so
/// per-node data lives in plain vectors indexed by [`NodeId::index`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_node_id_roundtrip() {
        let id = NodeId::new(7);
        assert_eq!(id.index(), 7);
        assert_eq!(NodeId::from(7), id);
    }

    #[test]
    fn test_node_id_formatting() {
        assert_eq!(format!("{:?}", NodeId::new(3)), "NodeId(3)");
        assert_eq!(NodeId::new(3).to_string(), "B3");
    }

    #[test]
    fn test_node_id_ordering_and_hash() {
        assert!(NodeId::new(1) < NodeId::new(2));
        let set: HashSet<NodeId> = [NodeId::new(1), NodeId::new(1), NodeId::new(2)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
