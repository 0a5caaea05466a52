// The structure tree and the per-viewpoint refinement tree.
//
// A `StructureNode` tree is the piece's sectional plan: nested named spans
// in quarter-note time, built once and never mutated. Each viewpoint copies
// it into a `RefinementTree`: an arena of `RefinementNode`s addressing that
// viewpoint's flat content array in two synchronized coordinate systems
// (musical time and element position).
//
// The refinement tree is resizable: producers that ornament a span can
// change its element count, and `set_to` propagates the length delta to
// every later sibling at every ancestor level, so node bounds always match
// the flat array. `get_subrange` materializes new nodes ("grows" the tree)
// so that rules can claim or regenerate exactly the sub-range they touch.
//
// Node bounds are parent-relative `Index` pairs; the frame of a node's
// `start`/`end` is its parent (the root is its own frame). Copy links and
// parent/child links are arena handles, so a repeated section is a plain
// `NodeId` comparison away from its source.

use crate::index::Index;
use crate::music::{ContentKind, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Handle into a refinement tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn test(i: usize) -> Self {
        NodeId(i)
    }
}

/// Immutable template node: `(start, end)` in quarter time, a name, ordered
/// children with parent-relative bounds.
#[derive(Debug, Clone)]
pub struct StructureNode {
    pub start: f64,
    pub end: f64,
    pub name: String,
    pub children: Vec<StructureNode>,
}

impl StructureNode {
    pub fn new(start: f64, end: f64, name: &str) -> Self {
        StructureNode { start, end, name: name.to_string(), children: vec![] }
    }

    pub fn with_children(start: f64, end: f64, name: &str, children: Vec<StructureNode>) -> Self {
        StructureNode { start, end, name: name.to_string(), children }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One node of a viewpoint's refinement tree.
#[derive(Debug, Clone)]
pub struct RefinementNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Bounds in the parent's frame (the root is framed on itself).
    pub start: Index,
    pub end: Index,
    /// Degree of commitment: 0 fully regenerable, 1 permanent; values in
    /// between bias which spans regeneration prefers to disturb.
    pub fixedness: f64,
    /// Source node whose content this node must mirror (repeated sections).
    /// Always a backward reference: the source precedes this node pre-order.
    pub copy_of: Option<NodeId>,
    /// False once this node or an ancestor is decided by a copy edge;
    /// such nodes delegate to children instead of running producers.
    pub generatable: bool,
    /// True for nodes copied from the structure template, false for nodes
    /// grown by subrange materialization.
    pub structural: bool,
    pub depth: usize,
}

impl RefinementNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A viewpoint's refinement tree plus its flat content array.
pub struct RefinementTree {
    pub kind: ContentKind,
    nodes: Vec<RefinementNode>,
    pub root: NodeId,
    out: Vec<Value>,
    /// Per-element quarter lengths for non-temporal kinds, mirrored from the
    /// lead grid. Always the same length as `out`. Unused for temporal kinds.
    grid: Vec<f64>,
    names: BTreeMap<String, NodeId>,
    grown: usize,
}

impl RefinementTree {
    /// Deep-copy a structure template into a fresh refinement tree with no
    /// content. Element positions start at zero everywhere; quarter bounds
    /// come from the template.
    pub fn from_structure(kind: ContentKind, template: &StructureNode) -> Self {
        let mut tree = RefinementTree {
            kind,
            nodes: vec![],
            root: NodeId(0),
            out: vec![],
            grid: vec![],
            names: BTreeMap::new(),
            grown: 0,
        };
        let root = tree.copy_template(template, None, 0);
        tree.root = root;
        tree
    }

    fn copy_template(&mut self, t: &StructureNode, parent: Option<NodeId>, depth: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RefinementNode {
            name: t.name.clone(),
            parent,
            children: vec![],
            start: Index::new(id, t.start, 0),
            end: Index::new(id, t.end, 0),
            fixedness: 0.0,
            copy_of: None,
            generatable: true,
            structural: true,
            depth,
        });
        self.names.insert(t.name.clone(), id);
        let children: Vec<NodeId> = t
            .children
            .iter()
            .map(|c| self.copy_template(c, Some(id), depth + 1))
            .collect();
        self.nodes[id.0].children = children;
        id
    }

    pub fn node(&self, id: NodeId) -> &RefinementNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut RefinementNode {
        &mut self.nodes[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// All nodes in pre-order.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = vec![];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &c in self.node(id).children.iter().rev() {
                stack.push(c);
            }
        }
        order
    }

    /// Leaves in pre-order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.pre_order().into_iter().filter(|&id| self.node(id).is_leaf()).collect()
    }

    pub fn elt_count(&self, id: NodeId) -> usize {
        let n = self.node(id);
        n.end.pos - n.start.pos
    }

    pub fn duration(&self, id: NodeId) -> f64 {
        let n = self.node(id);
        n.end.quarter - n.start.quarter
    }

    /// Absolute element position of a node's start in the flat array.
    pub fn abs_pos(&self, id: NodeId) -> usize {
        let mut pos = 0;
        let mut cur = Some(id);
        while let Some(c) = cur {
            let n = self.node(c);
            if n.parent.is_some() {
                pos += n.start.pos;
            }
            cur = n.parent;
        }
        pos
    }

    /// Absolute quarter position of a node's start.
    pub fn abs_quarter(&self, id: NodeId) -> f64 {
        let mut q = 0.0;
        let mut cur = Some(id);
        while let Some(c) = cur {
            let n = self.node(c);
            if n.parent.is_some() {
                q += n.start.quarter;
            }
            cur = n.parent;
        }
        q
    }

    pub fn out(&self) -> &[Value] {
        &self.out
    }

    /// The flat content slice covered by a node.
    pub fn content(&self, id: NodeId) -> &[Value] {
        let a = self.abs_pos(id);
        &self.out[a..a + self.elt_count(id)]
    }

    /// Quarter length of one element: its own length for temporal kinds,
    /// the mirrored lead grid length otherwise.
    pub fn elem_quarter(&self, i: usize) -> f64 {
        if self.kind.is_temporal() {
            self.out.get(i).and_then(|v| v.quarter_length()).unwrap_or(0.0)
        } else {
            self.grid.get(i).copied().unwrap_or(0.0)
        }
    }

    /// Mirror per-element quarter lengths from the lead for a node's span.
    pub fn set_grid(&mut self, id: NodeId, quarters: &[f64]) {
        let a = self.abs_pos(id);
        for (i, &q) in quarters.iter().enumerate() {
            if a + i < self.grid.len() {
                self.grid[a + i] = q;
            }
        }
    }

    /// Rebuild an `Index` from an element offset within a node by summing
    /// element durations up to the offset.
    pub fn index_at(&self, id: NodeId, offset: usize) -> Index {
        let a = self.abs_pos(id);
        let quarter: f64 = (a..a + offset).map(|i| self.elem_quarter(i)).sum();
        Index::new(id, quarter, offset)
    }

    /// Position of an index relative to a named ancestor of its frame.
    pub fn relative_p(&self, ix: Index, ancestor: &str) -> Result<usize, crate::error::GenError> {
        let target =
            self.by_name(ancestor).ok_or_else(|| crate::error::GenError::UnknownNode(ancestor.to_string()))?;
        let mut pos = ix.pos;
        let mut cur = ix.node;
        while cur != target {
            let n = self.node(cur);
            pos += n.start.pos;
            cur = n
                .parent
                .ok_or_else(|| crate::error::GenError::UnknownNode(ancestor.to_string()))?;
        }
        Ok(pos)
    }

    /// Quarter time of an index relative to a named ancestor of its frame.
    pub fn relative_q(&self, ix: Index, ancestor: &str) -> Result<f64, crate::error::GenError> {
        let target =
            self.by_name(ancestor).ok_or_else(|| crate::error::GenError::UnknownNode(ancestor.to_string()))?;
        let mut q = ix.quarter;
        let mut cur = ix.node;
        while cur != target {
            let n = self.node(cur);
            q += n.start.quarter;
            cur = n
                .parent
                .ok_or_else(|| crate::error::GenError::UnknownNode(ancestor.to_string()))?;
        }
        Ok(q)
    }

    /// Reproject an index onto a descendant of its frame node.
    pub fn child_index(&self, ix: Index, child: NodeId) -> Result<Index, crate::error::GenError> {
        let mut dp = 0usize;
        let mut dq = 0.0;
        let mut cur = child;
        while cur != ix.node {
            let n = self.node(cur);
            dp += n.start.pos;
            dq += n.start.quarter;
            cur = n
                .parent
                .ok_or_else(|| crate::error::GenError::UnknownNode(self.node(child).name.clone()))?;
        }
        Ok(Index::new(child, ix.quarter - dq, ix.pos - dp))
    }

    /// Ancestor (or self) of a node at the given structural depth.
    pub fn ancestor_at_depth(&self, id: NodeId, depth: usize) -> Option<NodeId> {
        let mut cur = id;
        loop {
            let n = self.node(cur);
            if n.depth == depth {
                return Some(cur);
            }
            cur = n.parent?;
        }
    }

    /// True if the index falls at `offset` elements from the end of its
    /// enclosing node at structural `depth` (negative offsets count back
    /// from the end). Window guards use this to target section cadences.
    pub fn maps_to(&self, ix: Index, offset: isize, depth: usize) -> bool {
        let Some(anc) = self.ancestor_at_depth(ix.node, depth) else {
            return false;
        };
        let mut pos = ix.pos as isize;
        let mut cur = ix.node;
        while cur != anc {
            let n = self.node(cur);
            pos += n.start.pos as isize;
            match n.parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
        pos == self.elt_count(anc) as isize + offset
    }

    /// First structural ancestor-or-self of a node.
    pub fn structural_node_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        loop {
            let n = self.node(cur);
            if n.structural {
                return cur;
            }
            match n.parent {
                Some(p) => cur = p,
                None => return cur,
            }
        }
    }

    /// Mark a node and all its ancestors non-generatable.
    pub fn unset_generatable(&mut self, id: NodeId) {
        let mut cur = Some(id);
        while let Some(c) = cur {
            self.node_mut(c).generatable = false;
            cur = self.node(c).parent;
        }
    }

    fn recompute_fixedness_upward(&mut self, id: NodeId) {
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            let max = self
                .node(p)
                .children
                .iter()
                .map(|&c| self.node(c).fixedness)
                .fold(0.0f64, f64::max);
            self.node_mut(p).fixedness = max;
            cur = self.node(p).parent;
        }
    }

    /// Write content into a node's span, shifting every later sibling at
    /// every ancestor level so all bounds keep matching the flat array, and
    /// bubbling fixedness (max of children) upward.
    pub fn set_to(&mut self, id: NodeId, content: Vec<Value>, fixedness: f64) {
        let a = self.abs_pos(id);
        let old_len = self.elt_count(id);
        let new_len = content.len();
        let temporal = self.kind.is_temporal();
        let old_dur = self.duration(id);
        let new_dur: f64 = if temporal {
            content.iter().map(|v| v.quarter_length().unwrap_or(0.0)).sum()
        } else {
            old_dur
        };

        self.out.splice(a..a + old_len, content);
        if !temporal {
            // Keep the duration grid aligned; same-length writes keep the
            // mirrored values, resizes get zero slots until the lead syncs.
            if new_len != old_len {
                self.grid.splice(a..a + old_len, std::iter::repeat_n(0.0, new_len));
            }
        }

        let dp = new_len as isize - old_len as isize;
        if dp != 0 {
            // A resize invalidates any finer decomposition of this span.
            let mut stale = std::mem::take(&mut self.node_mut(id).children);
            while let Some(c) = stale.pop() {
                let name = self.node(c).name.clone();
                self.names.remove(&name);
                stale.extend(self.node(c).children.iter().copied());
            }
            self.increase_size(id, dp);
        }
        if temporal {
            let dq = new_dur - old_dur;
            if dq != 0.0 {
                self.increase_duration(id, dq);
            }
        }

        self.node_mut(id).fixedness = fixedness;
        self.recompute_fixedness_upward(id);
    }

    /// Shift this node's end and every later sibling at every ancestor
    /// level by `delta` elements.
    pub fn increase_size(&mut self, id: NodeId, delta: isize) {
        let mut cur = id;
        loop {
            {
                let n = self.node_mut(cur);
                n.end.pos = (n.end.pos as isize + delta) as usize;
            }
            let Some(parent) = self.node(cur).parent else {
                break;
            };
            let siblings = self.node(parent).children.clone();
            let my_rank = siblings.iter().position(|&s| s == cur).expect("child not in parent");
            for &s in &siblings[my_rank + 1..] {
                let n = self.node_mut(s);
                n.start.pos = (n.start.pos as isize + delta) as usize;
                n.end.pos = (n.end.pos as isize + delta) as usize;
            }
            cur = parent;
        }
    }

    /// Same as `increase_size`, in quarter time.
    pub fn increase_duration(&mut self, id: NodeId, delta: f64) {
        let mut cur = id;
        loop {
            {
                let n = self.node_mut(cur);
                n.end.quarter += delta;
            }
            let Some(parent) = self.node(cur).parent else {
                break;
            };
            let siblings = self.node(parent).children.clone();
            let my_rank = siblings.iter().position(|&s| s == cur).expect("child not in parent");
            for &s in &siblings[my_rank + 1..] {
                let n = self.node_mut(s);
                n.start.quarter += delta;
                n.end.quarter += delta;
            }
            cur = parent;
        }
    }

    /// Return the minimal set of sibling nodes exactly covering the
    /// node-relative element range `[start, end)`, growing or splitting
    /// nodes as needed. Ranges inside one existing child recurse into it;
    /// uncovered stretches materialize new children; a partial overlap at
    /// either edge splits the overlapping child at the boundary.
    pub fn get_subrange(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Vec<NodeId>, crate::error::GenError> {
        debug_assert!(start < end);
        debug_assert!(end <= self.elt_count(parent));
        if start == 0 && end == self.elt_count(parent) {
            return Ok(vec![parent]);
        }
        let mut result = vec![];
        let mut cur = start;
        while cur < end {
            let hit = self
                .node(parent)
                .children
                .iter()
                .copied()
                .find(|&c| {
                    let n = self.node(c);
                    n.start.pos <= cur && cur < n.end.pos
                });
            match hit {
                Some(c) => {
                    let (ks, ke) = {
                        let n = self.node(c);
                        (n.start.pos, n.end.pos)
                    };
                    let take_end = end.min(ke);
                    if cur == ks && take_end == ke {
                        result.push(c);
                    } else {
                        result.extend(self.get_subrange(c, cur - ks, take_end - ks)?);
                    }
                    cur = take_end;
                }
                None => {
                    // Uncovered stretch up to the next child (or the range end).
                    let next_child_start = self
                        .node(parent)
                        .children
                        .iter()
                        .map(|&c| self.node(c).start.pos)
                        .filter(|&s| s > cur)
                        .min()
                        .unwrap_or(end);
                    let piece_end = end.min(next_child_start);
                    result.push(self.grow_child(parent, cur, piece_end));
                    cur = piece_end;
                }
            }
        }
        Ok(result)
    }

    /// Materialize a new child of `parent` covering the node-relative
    /// element range `[start, end)`. Inherits the parent's fixedness (the
    /// slice already holds whatever the parent holds).
    fn grow_child(&mut self, parent: NodeId, start: usize, end: usize) -> NodeId {
        let qs = self.index_at(parent, start).quarter;
        let qe = self.index_at(parent, end).quarter;
        self.grown += 1;
        let name = format!("{}:{}", self.node(parent).name, self.grown);
        let id = NodeId(self.nodes.len());
        let depth = self.node(parent).depth + 1;
        let fixedness = self.node(parent).fixedness;
        let generatable = self.node(parent).generatable;
        self.nodes.push(RefinementNode {
            name: name.clone(),
            parent: Some(parent),
            children: vec![],
            start: Index::new(id, qs, start),
            end: Index::new(id, qe, end),
            fixedness,
            copy_of: None,
            generatable,
            structural: false,
            depth,
        });
        self.names.insert(name, id);
        let rank = self
            .node(parent)
            .children
            .iter()
            .position(|&c| self.node(c).start.pos >= end)
            .unwrap_or(self.node(parent).children.len());
        self.node_mut(parent).children.insert(rank, id);
        id
    }

    /// Render the tree with bounds and leaf content, for diagnostics.
    pub fn dump(&self) -> String {
        let mut s = String::new();
        self.dump_node(self.root, 0, &mut s);
        s
    }

    fn dump_node(&self, id: NodeId, indent: usize, s: &mut String) {
        let n = self.node(id);
        let pad = "  ".repeat(indent);
        let _ = write!(s, "{pad}{} [{:.1}..{:.1}) ({}..{})", n.name, n.start.quarter, n.end.quarter, n.start.pos, n.end.pos);
        if n.is_leaf() {
            let items: Vec<String> = self.content(id).iter().map(|v| v.to_string()).collect();
            let _ = write!(s, " [{}]", items.join(" "));
        }
        if let Some(src) = n.copy_of {
            let _ = write!(s, " (same as {})", self.node(src).name);
        }
        s.push('\n');
        for &c in &n.children {
            self.dump_node(c, indent + 1, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::Duration;

    fn two_leaf_template() -> StructureNode {
        StructureNode::with_children(
            0.0,
            4.0,
            "ALL",
            vec![StructureNode::new(0.0, 2.0, "a"), StructureNode::new(2.0, 4.0, "b")],
        )
    }

    fn dur(q: f64) -> Value {
        Value::Duration(Duration::new(q))
    }

    #[test]
    fn test_from_structure_copies_bounds() {
        let tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        let b = tree.by_name("b").unwrap();
        assert_eq!(tree.duration(a), 2.0);
        assert_eq!(tree.node(b).start.quarter, 2.0);
        assert_eq!(tree.elt_count(tree.root), 0);
        assert_eq!(tree.node(a).depth, 1);
    }

    #[test]
    fn test_set_to_resize_invariant() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        let b = tree.by_name("b").unwrap();

        tree.set_to(a, vec![dur(1.0), dur(1.0)], 0.5);
        assert_eq!(tree.elt_count(a), 2);
        assert_eq!(tree.node(b).start.pos, 2);
        assert_eq!(tree.elt_count(tree.root), 2);

        tree.set_to(b, vec![dur(0.5), dur(0.5), dur(1.0)], 0.5);
        assert_eq!(tree.elt_count(tree.root), 5);
        assert_eq!(tree.abs_pos(b), 2);
        assert_eq!(tree.content(b).len(), 3);

        // Shrinking a propagates to b and the root.
        tree.set_to(a, vec![dur(2.0)], 0.5);
        assert_eq!(tree.node(b).start.pos, 1);
        assert_eq!(tree.elt_count(tree.root), 4);
        assert_eq!(tree.duration(tree.root), 4.0);
    }

    #[test]
    fn test_fixedness_bubbles_max() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        tree.set_to(a, vec![dur(2.0)], 0.8);
        assert_eq!(tree.node(tree.root).fixedness, 0.8);
    }

    #[test]
    fn test_index_round_trip() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        let b = tree.by_name("b").unwrap();
        tree.set_to(a, vec![dur(0.5), dur(1.5)], 0.5);
        tree.set_to(b, vec![dur(1.0), dur(1.0)], 0.5);

        for k in 0..=tree.elt_count(b) {
            let ix = tree.index_at(b, k);
            assert_eq!(tree.relative_p(ix, "b").unwrap(), k);
        }
        let ix = tree.index_at(b, 1);
        assert_eq!(ix.quarter, 1.0);
        assert_eq!(tree.relative_p(ix, "ALL").unwrap(), 3);
        assert_eq!(tree.relative_q(ix, "ALL").unwrap(), 3.0);
    }

    #[test]
    fn test_child_index_reprojection() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        let b = tree.by_name("b").unwrap();
        tree.set_to(a, vec![dur(1.0), dur(1.0)], 0.5);
        tree.set_to(b, vec![dur(1.0), dur(1.0)], 0.5);

        // An index framed on the root, reprojected onto leaf 'b'.
        let ix = tree.index_at(tree.root, 3);
        let local = tree.child_index(ix, b).unwrap();
        assert_eq!(local.pos, 1);
        assert_eq!(local.quarter, 1.0);
        assert_eq!(local.node, b);
    }

    #[test]
    fn test_maps_to_section_end() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        let b = tree.by_name("b").unwrap();
        tree.set_to(a, vec![dur(1.0), dur(1.0)], 0.5);
        tree.set_to(b, vec![dur(1.0), dur(1.0)], 0.5);

        // Two elements before the end of the whole piece = start of 'b'.
        let ix = tree.index_at(b, 0);
        assert!(tree.maps_to(ix, -2, 0));
        assert!(!tree.maps_to(ix, -4, 0));
        let ix1 = tree.index_at(b, 1);
        assert!(!tree.maps_to(ix1, -2, 0));
        // Relative to its own leaf, position 0 is two before the end.
        assert!(tree.maps_to(ix, -2, 1));
    }

    #[test]
    fn test_get_subrange_grows_and_splits() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        tree.set_to(a, vec![dur(0.5); 4], 0.0);

        // Claim the middle of the leaf: one grown child.
        let claimed = tree.get_subrange(a, 1, 3).unwrap();
        assert_eq!(claimed.len(), 1);
        let c = claimed[0];
        assert!(!tree.node(c).structural);
        assert_eq!(tree.elt_count(c), 2);
        assert_eq!(tree.abs_pos(c), 1);

        // The stretches either side of the claim materialize as siblings.
        let before = tree.get_subrange(a, 0, 1).unwrap();
        let after = tree.get_subrange(a, 3, 4).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 1);
        assert_eq!(tree.abs_pos(before[0]), 0);
        assert_eq!(tree.abs_pos(after[0]), 3);
        assert_eq!(tree.node(a).children.len(), 3);
        // The full range is the node itself, not its pieces.
        assert_eq!(tree.get_subrange(a, 0, 4).unwrap(), vec![a]);
    }

    #[test]
    fn test_subrange_inside_existing_child_recurses() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        tree.set_to(a, vec![dur(0.5); 4], 0.0);

        let child = tree.get_subrange(a, 0, 2).unwrap()[0];
        // A range strictly inside the grown child splits it further.
        let inner = tree.get_subrange(a, 1, 2).unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(tree.node(inner[0]).parent, Some(child));
        assert_eq!(tree.abs_pos(inner[0]), 1);
        assert_eq!(tree.elt_count(inner[0]), 1);
    }

    #[test]
    fn test_resize_with_grown_children_drops_decomposition() {
        let mut tree = RefinementTree::from_structure(ContentKind::Duration, &two_leaf_template());
        let a = tree.by_name("a").unwrap();
        tree.set_to(a, vec![dur(0.5); 4], 0.0);
        tree.get_subrange(a, 1, 3).unwrap();
        assert!(!tree.node(a).is_leaf());

        tree.set_to(a, vec![dur(1.0), dur(1.0)], 0.5);
        assert!(tree.node(a).is_leaf());
        assert_eq!(tree.elt_count(a), 2);
    }
}
