// Dual-coordinate content addressing.
//
// An `Index` names one offset inside one tree node's span, in both
// coordinate systems at once: musical time (`quarter`) and element position
// (`pos`). The two must always describe the same underlying content offset;
// every resize keeps them in lockstep, which is what lets constraints state
// windows in positions while cross-grid alignment happens in time.
//
// The `node` field is the frame: the tree node whose start is this index's
// origin. Comparison and arithmetic are only meaningful between indices
// sharing a frame (checked in debug builds). Operations that need tree
// context — reframing onto an ancestor or descendant, rebuilding from an
// element offset — live on `RefinementTree`.

use crate::trees::NodeId;
use std::cmp::Ordering;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy)]
pub struct Index {
    /// Frame node: offsets are measured from its start.
    pub node: NodeId,
    /// Offset in quarter notes.
    pub quarter: f64,
    /// Offset in content elements.
    pub pos: usize,
}

impl Index {
    /// The zero offset in a node's frame.
    pub fn zero(node: NodeId) -> Self {
        Index { node, quarter: 0.0, pos: 0 }
    }

    pub fn new(node: NodeId, quarter: f64, pos: usize) -> Self {
        Index { node, quarter, pos }
    }
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        debug_assert_eq!(self.node, other.node, "comparing indices of different nodes");
        self.pos == other.pos
    }
}

impl PartialOrd for Index {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        debug_assert_eq!(self.node, other.node, "comparing indices of different nodes");
        self.pos.partial_cmp(&other.pos)
    }
}

impl Add for Index {
    type Output = Index;

    fn add(self, rhs: Index) -> Index {
        debug_assert_eq!(self.node, rhs.node, "adding indices of different nodes");
        Index {
            node: self.node,
            quarter: self.quarter + rhs.quarter,
            pos: self.pos + rhs.pos,
        }
    }
}

impl Sub for Index {
    type Output = Index;

    fn sub(self, rhs: Index) -> Index {
        debug_assert_eq!(self.node, rhs.node, "subtracting indices of different nodes");
        Index {
            node: self.node,
            quarter: self.quarter - rhs.quarter,
            pos: self.pos - rhs.pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::NodeId;

    #[test]
    fn test_ordering_and_arithmetic() {
        let n = NodeId::test(0);
        let a = Index::new(n, 1.0, 2);
        let b = Index::new(n, 3.0, 5);
        assert!(a < b);
        let d = b - a;
        assert_eq!(d.pos, 3);
        assert_eq!(d.quarter, 2.0);
        let c = a + d;
        assert_eq!(c.pos, 5);
        assert_eq!(c.quarter, 3.0);
    }
}
