// Viewpoints: named, independently generated content streams.
//
// A viewpoint owns one flat content array and the refinement tree that
// addresses it. Lead viewpoints define the authoritative musical-time grid
// for their tree; follow viewpoints derive their element positions from a
// designated lead's per-node element counts and cannot generate before it.
//
// Structure instantiation honors two reserved name markers:
// - a leading `-` marks a rest section: the subtree is non-generatable and,
//   for temporal kinds, pre-filled with an undefined value spanning the
//   section's beat duration;
// - a trailing `'` marks a repeat: the node copies the content of the
//   already-instantiated node of the same name without the marker, and its
//   ancestors delegate to children instead of producing.
//
// `initialize_to` accepts externally supplied content (a loaded score):
// leads partition a flat value sequence into leaves by accumulating
// quarter lengths until each leaf's declared duration is exactly consumed
// (a mismatch is a hard failure); follows partition by element counts.

use crate::error::GenError;
use crate::music::{ContentKind, Value};
use crate::trees::{NodeId, RefinementTree, StructureNode};

pub type VpId = usize;

/// Lead viewpoints carry the time grid; follow viewpoints borrow it.
#[derive(Debug, Clone)]
pub enum Role {
    Lead { follows: Vec<VpId> },
    Follow { lead: VpId },
}

pub struct ViewPoint {
    pub name: String,
    pub kind: ContentKind,
    pub role: Role,
    pub tree: RefinementTree,
    /// Every leaf interval must end up with generated content; unclaimed
    /// intervals are filled by the default (per-node) producer.
    pub gapless: bool,
    /// Whether repeat markers resolve to copy edges.
    pub use_copy: bool,
    pub generated: bool,
}

impl ViewPoint {
    pub(crate) fn new(
        name: &str,
        kind: ContentKind,
        role: Role,
        template: &StructureNode,
        use_copy: bool,
        gapless: bool,
    ) -> Self {
        let mut tree = RefinementTree::from_structure(kind, template);
        Self::mark_rests(&mut tree, kind);
        if use_copy {
            Self::mark_repeats(&mut tree);
        }
        ViewPoint {
            name: name.to_string(),
            kind,
            role,
            tree,
            gapless,
            use_copy,
            generated: false,
        }
    }

    fn mark_rests(tree: &mut RefinementTree, kind: ContentKind) {
        for id in tree.pre_order() {
            if !tree.node(id).name.starts_with('-') {
                continue;
            }
            // The whole subtree is out of bounds for producers.
            let mut stack = vec![id];
            while let Some(n) = stack.pop() {
                tree.node_mut(n).generatable = false;
                stack.extend(tree.node(n).children.iter().copied());
            }
            if kind.is_temporal() && tree.node(id).is_leaf() {
                let span = tree.duration(id);
                let pad = match kind {
                    ContentKind::Duration => {
                        Value::Duration(crate::music::Duration::undefined_spanning(span))
                    }
                    _ => Value::Note(crate::music::Note::new(
                        crate::music::Duration::undefined_spanning(span),
                        crate::music::Pitch::undefined(),
                    )),
                };
                tree.set_to(id, vec![pad], 1.0);
            }
        }
    }

    fn mark_repeats(tree: &mut RefinementTree) {
        for id in tree.pre_order() {
            let name = tree.node(id).name.clone();
            let Some(base) = name.strip_suffix('\'') else {
                continue;
            };
            // Copy edges only point backward: the source must already be
            // instantiated (lower pre-order index).
            if let Some(src) = tree.by_name(base) {
                if src < id {
                    tree.node_mut(id).copy_of = Some(src);
                    tree.unset_generatable(id);
                }
            }
        }
    }

    /// True once a node's span holds fully defined content.
    pub fn decided(&self, id: NodeId) -> bool {
        self.tree.elt_count(id) > 0 && self.tree.content(id).iter().all(|v| !v.is_undefined())
    }

    /// Partition externally supplied content into leaves by duration (lead
    /// semantics). Returns the per-leaf fills without committing them.
    pub(crate) fn partition_by_duration(
        &self,
        values: &[Value],
    ) -> Result<Vec<(NodeId, Vec<Value>)>, GenError> {
        let mut fills = vec![];
        let mut rest = values;
        for leaf in self.tree.leaves() {
            let node = self.tree.node(leaf);
            if !node.generatable && node.copy_of.is_none() {
                continue; // rest section, nothing to consume
            }
            let target = self.tree.duration(leaf);
            let mut acc = 0.0;
            let mut taken = 0;
            while acc < target {
                let Some(v) = rest.get(taken) else {
                    return Err(GenError::ContentMismatch {
                        node: node.name.clone(),
                        detail: format!("ran out of content at {acc} of {target} quarters"),
                    });
                };
                acc += v.quarter_length().ok_or_else(|| GenError::ContentMismatch {
                    node: node.name.clone(),
                    detail: "non-temporal value in a duration-partitioned stream".to_string(),
                })?;
                taken += 1;
            }
            if acc != target {
                return Err(GenError::ContentMismatch {
                    node: node.name.clone(),
                    detail: format!("content sums to {acc} quarters, leaf spans {target}"),
                });
            }
            fills.push((leaf, rest[..taken].to_vec()));
            rest = &rest[taken..];
        }
        Ok(fills)
    }

    /// Partition externally supplied content for a lead that carries no
    /// durations of its own (e.g. a syllable stream): leaves take shares
    /// proportional to their declared quarter spans, remainder to the last.
    pub(crate) fn partition_proportional(
        &self,
        values: &[Value],
    ) -> Result<Vec<(NodeId, Vec<Value>)>, GenError> {
        let leaves: Vec<NodeId> = self
            .tree
            .leaves()
            .into_iter()
            .filter(|&l| {
                let n = self.tree.node(l);
                n.generatable || n.copy_of.is_some()
            })
            .collect();
        let total: f64 = leaves.iter().map(|&l| self.tree.duration(l)).sum();
        if total <= 0.0 {
            return Err(GenError::ContentMismatch {
                node: self.tree.node(self.tree.root).name.clone(),
                detail: "structure spans no musical time".to_string(),
            });
        }
        let mut fills = vec![];
        let mut used = 0;
        for (i, &leaf) in leaves.iter().enumerate() {
            let count = if i + 1 == leaves.len() {
                values.len() - used
            } else {
                ((values.len() as f64) * self.tree.duration(leaf) / total).round() as usize
            };
            if used + count > values.len() {
                return Err(GenError::ContentMismatch {
                    node: self.tree.node(leaf).name.clone(),
                    detail: "content shorter than the structure".to_string(),
                });
            }
            fills.push((leaf, values[used..used + count].to_vec()));
            used += count;
        }
        Ok(fills)
    }

    /// Partition externally supplied content into leaves by element count
    /// (follow semantics, driven by the lead's committed counts).
    pub(crate) fn partition_by_count(
        &self,
        values: &[Value],
        counts: &[(NodeId, usize)],
    ) -> Result<Vec<(NodeId, Vec<Value>)>, GenError> {
        let mut fills = vec![];
        let mut rest = values;
        for &(leaf, count) in counts {
            if rest.len() < count {
                return Err(GenError::ContentMismatch {
                    node: self.tree.node(leaf).name.clone(),
                    detail: format!("needs {count} elements, {} left", rest.len()),
                });
            }
            fills.push((leaf, rest[..count].to_vec()));
            rest = &rest[count..];
        }
        if !rest.is_empty() {
            return Err(GenError::ContentMismatch {
                node: "<end>".to_string(),
                detail: format!("{} elements left over", rest.len()),
            });
        }
        Ok(fills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::Duration;

    fn template() -> StructureNode {
        StructureNode::with_children(
            0.0,
            8.0,
            "ALL",
            vec![
                StructureNode::new(0.0, 3.0, "a"),
                StructureNode::new(3.0, 4.0, "-1"),
                StructureNode::new(4.0, 7.0, "a'"),
                StructureNode::new(7.0, 8.0, "z"),
            ],
        )
    }

    #[test]
    fn test_rest_marking_and_prefill() {
        let vp = ViewPoint::new(
            "rhy",
            ContentKind::Duration,
            Role::Lead { follows: vec![] },
            &template(),
            true,
            true,
        );
        let rest = vp.tree.by_name("-1").unwrap();
        assert!(!vp.tree.node(rest).generatable);
        assert_eq!(vp.tree.elt_count(rest), 1);
        assert_eq!(vp.tree.content(rest)[0].quarter_length(), Some(1.0));
        assert!(vp.tree.content(rest)[0].is_undefined());
        assert_eq!(vp.tree.node(rest).fixedness, 1.0);
    }

    #[test]
    fn test_repeat_marking_resolves_backward() {
        let vp = ViewPoint::new(
            "rhy",
            ContentKind::Duration,
            Role::Lead { follows: vec![] },
            &template(),
            true,
            true,
        );
        let rep = vp.tree.by_name("a'").unwrap();
        let src = vp.tree.by_name("a").unwrap();
        assert_eq!(vp.tree.node(rep).copy_of, Some(src));
        assert!(!vp.tree.node(rep).generatable);
        // The repeat's ancestors delegate instead of producing.
        assert!(!vp.tree.node(vp.tree.root).generatable);
        // Unmarked siblings are untouched.
        let z = vp.tree.by_name("z").unwrap();
        assert!(vp.tree.node(z).generatable);
        assert_eq!(vp.tree.node(z).copy_of, None);
    }

    #[test]
    fn test_no_copy_without_use_copy() {
        let vp = ViewPoint::new(
            "rhy",
            ContentKind::Duration,
            Role::Lead { follows: vec![] },
            &template(),
            false,
            true,
        );
        let rep = vp.tree.by_name("a'").unwrap();
        assert_eq!(vp.tree.node(rep).copy_of, None);
        assert!(vp.tree.node(rep).generatable);
    }

    #[test]
    fn test_partition_by_duration() {
        let vp = ViewPoint::new(
            "rhy",
            ContentKind::Duration,
            Role::Lead { follows: vec![] },
            &template(),
            true,
            true,
        );
        let q = |n: f64| Value::Duration(Duration::new(n));
        // a: 3 quarters, a': 3 quarters, z: 1 quarter (rest skipped).
        let values = vec![q(1.0), q(2.0), q(1.5), q(1.5), q(1.0)];
        let fills = vp.partition_by_duration(&values).unwrap();
        assert_eq!(fills.len(), 3);
        assert_eq!(fills[0].1.len(), 2);
        assert_eq!(fills[1].1.len(), 2);
        assert_eq!(fills[2].1.len(), 1);

        // Mis-divided content is a hard failure.
        let bad = vec![q(2.0), q(2.0), q(2.0), q(2.0)];
        assert!(matches!(
            vp.partition_by_duration(&bad),
            Err(GenError::ContentMismatch { .. })
        ));
    }
}
