// The generation algorithm: per-node candidate lifecycle.
//
// A node generates in five steps:
// 1. Produce: gather candidates from every qualifying producer — an
//    enumerator's full output plus `batch` draws per randomized producer.
// 2. Constrain: for each candidate, evaluate every applicable constraint
//    over every sliding window overlapping the node (windows may extend
//    into already-committed neighboring content) and count failures.
// 3. On total failure (no zero-failure candidate), commit the least-bad
//    candidate anyway — generation never deadlocks — then surgically
//    regenerate the minimal sub-ranges the failing windows identify. If a
//    sub-range resolves to the very node that just failed, the cycle is
//    unrecoverable and reported as such.
// 4. Score: rank the zero-failure candidates by the weighted window
//    average of every applicable scorer.
// 5. Commit: the best candidate, at the producer's configured fixedness.
//    The sort is stable, so equal scores keep producer/batch order, which
//    is deterministic under a fixed seed.
//
// Dispatch around the lifecycle: a node first honors copy edges, then
// delegation (non-generatable nodes recurse into children), then window
// claims (window-dispatched producers carve sub-nodes out of the span),
// then per-node producers, then its children; a gapless viewpoint's leaf
// with no producer at all is a configuration error.

use crate::error::GenError;
use crate::model::{BoundProducer, Model};
use crate::music::Value;
use crate::rules::{DispatchMode, NodeCtx, ProducerCall, Sampling, WindowCtx};
use crate::trees::NodeId;
use crate::viewpoint::VpId;

pub(crate) fn generate_node(model: &mut Model, vp: VpId, node: NodeId) -> Result<(), GenError> {
    let (copy_of, generatable, fixedness, children) = {
        let n = model.viewpoints[vp].tree.node(node);
        (n.copy_of, n.generatable, n.fixedness, n.children.clone())
    };

    // A repeated section copies its source instead of producing; the copy
    // is itself a "free" generation committed at full fixedness.
    if let Some(src) = copy_of {
        if !model.viewpoints[vp].decided(node) {
            copy_commit(model, vp, node, src);
        }
        return Ok(());
    }

    // Nodes decided through a copy edge above or below delegate downward.
    if !generatable {
        for c in children {
            generate_node(model, vp, c)?;
        }
        return Ok(());
    }

    if fixedness > 0.0 && model.viewpoints[vp].decided(node) {
        return Ok(());
    }

    // At a leaf, window-dispatched producers claim their sub-ranges first;
    // the per-node pool then fills whatever they left.
    if children.is_empty() {
        let count = model.viewpoints[vp].tree.elt_count(node);
        let claims = collect_claims(model, vp, node, count);
        if !claims.is_empty() {
            for &(s, e, pidx) in &claims {
                let pieces = model.viewpoints[vp].tree.get_subrange(node, s, e)?;
                for piece in pieces {
                    run_generator(model, vp, piece, &[pidx])?;
                }
            }
            let pool = qualifying_per_node(model, vp, node);
            for (gs, ge) in gaps(count, &claims) {
                let pieces = model.viewpoints[vp].tree.get_subrange(node, gs, ge)?;
                for piece in pieces {
                    if pool.is_empty() {
                        if model.viewpoints[vp].gapless {
                            return Err(GenError::NoProducer {
                                viewpoint: model.viewpoints[vp].name.clone(),
                                node: model.viewpoints[vp].tree.node(piece).name.clone(),
                            });
                        }
                    } else {
                        run_generator(model, vp, piece, &pool)?;
                    }
                }
            }
            return Ok(());
        }
    }

    let pool = qualifying_per_node(model, vp, node);
    if !pool.is_empty() {
        return run_generator(model, vp, node, &pool);
    }

    if !children.is_empty() {
        for c in children {
            generate_node(model, vp, c)?;
        }
        return Ok(());
    }

    if model.viewpoints[vp].gapless {
        return Err(GenError::NoProducer {
            viewpoint: model.viewpoints[vp].name.clone(),
            node: model.viewpoints[vp].tree.node(node).name.clone(),
        });
    }
    Ok(())
}

/// Per-node producers whose guard admits this node, in registration order.
fn qualifying_per_node(model: &Model, vp: VpId, node: NodeId) -> Vec<usize> {
    let tree = &model.viewpoints[vp].tree;
    model.producers[vp]
        .iter()
        .enumerate()
        .filter(|(_, bp)| {
            bp.producer.spec().dispatch == DispatchMode::PerNode
                && bp.producer.guard(&NodeCtx { tree, node })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Non-overlapping window claims `(start, end, producer)` across the node,
/// in registration order; the first registered producer wins overlaps.
fn collect_claims(model: &Model, vp: VpId, node: NodeId, count: usize) -> Vec<(usize, usize, usize)> {
    let tree = &model.viewpoints[vp].tree;
    let mut claims: Vec<(usize, usize, usize)> = vec![];
    for (pidx, bp) in model.producers[vp].iter().enumerate() {
        let spec = bp.producer.spec();
        if spec.dispatch != DispatchMode::PerWindow || spec.out_count.is_unbounded() {
            continue;
        }
        let size = spec.out_count.max;
        if count < size {
            continue;
        }
        for w in 0..=count - size {
            if claims.iter().any(|&(s, e, _)| w < e && w + size > s) {
                continue;
            }
            let start = tree.index_at(node, w);
            if bp.producer.applies_to(&WindowCtx { tree, start }) {
                claims.push((w, w + size, pidx));
            }
        }
    }
    claims.sort_by_key(|&(s, _, _)| s);
    claims
}

/// The uncovered stretches of `[0, count)` between sorted claims.
fn gaps(count: usize, claims: &[(usize, usize, usize)]) -> Vec<(usize, usize)> {
    let mut out = vec![];
    let mut cur = 0;
    for &(s, e, _) in claims {
        if cur < s {
            out.push((cur, s));
        }
        cur = cur.max(e);
    }
    if cur < count {
        out.push((cur, count));
    }
    out
}

/// Mirror a repeated section's source content into its copy, leaf by leaf
/// when the subtrees are congruent, wholesale otherwise.
fn copy_commit(model: &mut Model, vp: VpId, node: NodeId, src: NodeId) {
    let pairs = {
        let tree = &model.viewpoints[vp].tree;
        pair_leaves(tree, src, node)
    };
    match pairs {
        Some(pairs) => {
            for (s, d) in pairs {
                let content = model.viewpoints[vp].tree.content(s).to_vec();
                model.commit_node(vp, d, content, 1.0);
            }
        }
        None => {
            let content = model.viewpoints[vp].tree.content(src).to_vec();
            model.commit_node(vp, node, content, 1.0);
        }
    }
}

fn pair_leaves(
    tree: &crate::trees::RefinementTree,
    src: NodeId,
    dst: NodeId,
) -> Option<Vec<(NodeId, NodeId)>> {
    let sc = tree.node(src).children.clone();
    let dc = tree.node(dst).children.clone();
    if sc.len() != dc.len() {
        return None;
    }
    if sc.is_empty() {
        return Some(vec![(src, dst)]);
    }
    let mut out = vec![];
    for (s, d) in sc.into_iter().zip(dc) {
        out.extend(pair_leaves(tree, s, d)?);
    }
    Some(out)
}

/// One evaluated candidate: constraint failures and where they fell.
struct Eval {
    failures: usize,
    /// Node-relative failing sub-ranges, for localized regeneration.
    fail_ranges: Vec<(usize, usize)>,
}

/// Run the produce → constrain → score → commit lifecycle for one node
/// with a pool of qualifying producers.
fn run_generator(model: &mut Model, vp: VpId, node: NodeId, pool: &[usize]) -> Result<(), GenError> {
    // --- Produce -----------------------------------------------------------
    let mut candidates: Vec<(Vec<Value>, usize)> = vec![];
    for &pidx in pool {
        let bound = model.producers[vp][pidx].clone();
        let call = build_call(model, vp, node, &bound);
        let draws = match bound.producer.spec().sampling {
            Sampling::Enumerate => bound.producer.produce(&call, &mut model.rand)?,
            Sampling::Randomized { batch } => {
                let mut all = vec![];
                for _ in 0..batch {
                    all.extend(bound.producer.produce(&call, &mut model.rand)?);
                }
                all
            }
        };
        for draw in draws {
            if admissible(model, vp, node, &bound, &draw) {
                candidates.push((draw, pidx));
            }
        }
    }
    if candidates.is_empty() {
        let names: Vec<&str> =
            pool.iter().map(|&i| model.producers[vp][i].producer.spec().name.as_str()).collect();
        return Err(GenError::Exhausted {
            rule: names.join("+"),
            node: model.viewpoints[vp].tree.node(node).name.clone(),
        });
    }

    // --- Constrain ---------------------------------------------------------
    let applicable: Vec<usize> = model
        .constraints
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.vps.first() == Some(&vp)
                && c.vps[1..].iter().all(|&o| model.viewpoints[o].generated)
        })
        .map(|(i, _)| i)
        .collect();

    let mut evals = Vec::with_capacity(candidates.len());
    for (content, _) in &candidates {
        evals.push(evaluate_constraints(model, vp, node, content, &applicable)?);
    }

    let best_zero = evals.iter().position(|e| e.failures == 0);
    if best_zero.is_none() {
        // --- Greedy degradation + localized regeneration -------------------
        let mut best = 0;
        for (i, e) in evals.iter().enumerate() {
            if e.failures < evals[best].failures {
                best = i;
            }
        }
        let (content, pidx) = candidates.swap_remove(best);
        let eval = evals.swap_remove(best);
        let fixedness = model.producers[vp][pidx].producer.spec().fixedness;
        let len = content.len();
        model.commit_node(vp, node, content, fixedness);

        for (rs, re) in merge_ranges(eval.fail_ranges, len) {
            let targets = model.viewpoints[vp].tree.get_subrange(node, rs, re)?;
            if targets.len() == 1 && targets[0] == node {
                return Err(GenError::NeedsBacktracking {
                    node: model.viewpoints[vp].tree.node(node).name.clone(),
                });
            }
            for t in targets {
                model.viewpoints[vp].tree.node_mut(t).fixedness = 0.0;
                generate_node(model, vp, t)?;
            }
        }
        return Ok(());
    }

    // --- Score -------------------------------------------------------------
    let zero: Vec<usize> =
        evals.iter().enumerate().filter(|(_, e)| e.failures == 0).map(|(i, _)| i).collect();
    let mut best = zero[0];
    if zero.len() > 1 && !model.scorers.is_empty() {
        let mut best_score = f64::NEG_INFINITY;
        for &i in &zero {
            let score = score_candidate(model, vp, node, &candidates[i].0);
            // Strict comparison keeps the first-produced candidate on ties.
            if score > best_score {
                best_score = score;
                best = i;
            }
        }
    }

    // --- Commit ------------------------------------------------------------
    let (content, pidx) = candidates.swap_remove(best);
    let fixedness = model.producers[vp][pidx].producer.spec().fixedness;
    model.commit_node(vp, node, content, fixedness);
    Ok(())
}

/// Candidate admissibility against the producer's declared output counts
/// and the node's span: element counts must match a known grid, durations
/// must fill a temporal span exactly.
fn admissible(
    model: &Model,
    vp: VpId,
    node: NodeId,
    bound: &BoundProducer,
    draw: &[Value],
) -> bool {
    let spec = bound.producer.spec();
    if !spec.out_count.contains(draw.len()) {
        return false;
    }
    let tree = &model.viewpoints[vp].tree;
    if tree.kind.is_temporal() {
        let target = tree.duration(node);
        let total: f64 = draw.iter().map(|v| v.quarter_length().unwrap_or(0.0)).sum();
        (total * 4.0).round() == (target * 4.0).round()
    } else {
        let count = tree.elt_count(node);
        count == 0 || draw.len() == count
    }
}

/// Assemble a producer's call arguments for a node: declared input windows
/// (aligned by structural name, positionally otherwise), neighbor context,
/// and the requested targets.
fn build_call(model: &Model, vp: VpId, node: NodeId, bound: &BoundProducer) -> ProducerCall {
    let tree = &model.viewpoints[vp].tree;
    let needs = bound.producer.spec().needs;
    let name = tree.node(node).name.clone();
    let a = tree.abs_pos(node);
    let count = tree.elt_count(node);

    let mut args = vec![];
    for &input in &bound.inputs {
        let itree = &model.viewpoints[input].tree;
        let window: Vec<Value> = match itree.by_name(&name) {
            Some(onode) => itree.content(onode).to_vec(),
            None => {
                let s = model.translate_pos(vp, a, input);
                let e = model.translate_pos(vp, a + count, input);
                match (s, e) {
                    (Some(s), Some(e)) if e <= itree.out().len() => itree.out()[s..e].to_vec(),
                    _ => vec![],
                }
            }
        };
        args.push(window);
    }

    let out = tree.out();
    let before = if needs.context && a > 0 {
        out.get(a - 1).filter(|v| !v.is_undefined()).cloned()
    } else {
        None
    };
    let after = if needs.context {
        out.get(a + count).filter(|v| !v.is_undefined()).cloned()
    } else {
        None
    };

    ProducerCall {
        args,
        start: needs.start.then(|| tree.index_at(node, 0)),
        before,
        after,
        len: needs.len.then_some(count),
        duration: needs.duration.then(|| tree.duration(node)),
        node_args: if needs.node_args {
            bound.producer.node_args(&NodeCtx { tree, node })
        } else {
            vec![]
        },
    }
}

/// Evaluate every applicable constraint over every window overlapping the
/// node, with the candidate virtually committed.
fn evaluate_constraints(
    model: &Model,
    vp: VpId,
    node: NodeId,
    candidate: &[Value],
    applicable: &[usize],
) -> Result<Eval, GenError> {
    let tree = &model.viewpoints[vp].tree;
    let a = tree.abs_pos(node);
    let old_len = tree.elt_count(node);
    let mut virt = tree.out().to_vec();
    virt.splice(a..a + old_len, candidate.iter().cloned());
    let b = a + candidate.len();

    let mut failures = 0;
    let mut fail_ranges = vec![];
    for &ci in applicable {
        let c = &model.constraints[ci];
        let spec = c.rule.spec();
        let w = spec.window_size().unwrap_or(candidate.len().max(1));
        if w == 0 || virt.len() < w {
            continue;
        }
        let s_min = if spec.allow_outside { a.saturating_sub(w - 1) } else { a };
        let s_max_excl = if spec.allow_outside {
            b.min(virt.len() - w + 1)
        } else {
            (b + 1).saturating_sub(w).min(virt.len() - w + 1)
        };
        for s in s_min..s_max_excl {
            let Some(windows) = align_windows(model, vp, s, w, &virt, &c.vps, spec) else {
                continue;
            };
            let refs: Vec<&[Value]> = windows.iter().map(|w| w.as_slice()).collect();
            if !c.rule.valid(&refs)? {
                failures += 1;
                let lo = s.max(a) - a;
                let hi = (s + w).min(b) - a;
                if lo < hi {
                    fail_ranges.push((lo, hi));
                }
            }
        }
    }
    Ok(Eval { failures, fail_ranges })
}

/// Weighted scorer total for a zero-failure candidate: for each applicable
/// scorer, the plain average over its evaluable windows times its weight.
fn score_candidate(model: &Model, vp: VpId, node: NodeId, candidate: &[Value]) -> f64 {
    let tree = &model.viewpoints[vp].tree;
    let a = tree.abs_pos(node);
    let old_len = tree.elt_count(node);
    let mut virt = tree.out().to_vec();
    virt.splice(a..a + old_len, candidate.iter().cloned());
    let b = a + candidate.len();

    let mut total = 0.0;
    for sc in &model.scorers {
        if sc.vps.first() != Some(&vp) || !sc.vps[1..].iter().all(|&o| model.viewpoints[o].generated)
        {
            continue;
        }
        let spec = sc.rule.spec();
        let w = spec.window_size().unwrap_or(candidate.len().max(1));
        if w == 0 || virt.len() < w {
            continue;
        }
        let s_min = if spec.allow_outside { a.saturating_sub(w - 1) } else { a };
        let s_max_excl = if spec.allow_outside {
            b.min(virt.len() - w + 1)
        } else {
            (b + 1).saturating_sub(w).min(virt.len() - w + 1)
        };
        let mut sum = 0.0;
        let mut n = 0;
        for s in s_min..s_max_excl {
            let Some(windows) = align_windows(model, vp, s, w, &virt, &sc.vps, spec) else {
                continue;
            };
            let refs: Vec<&[Value]> = windows.iter().map(|w| w.as_slice()).collect();
            sum += sc.rule.score(&refs);
            n += 1;
        }
        if n > 0 {
            total += sc.weight * sum / n as f64;
        }
    }
    total
}

/// Collect one aligned window per declared argument viewpoint, primary from
/// the virtual (candidate-committed) array, the rest from committed
/// content. `None` when any window cannot be aligned or lies out of range.
fn align_windows(
    model: &Model,
    vp: VpId,
    s: usize,
    w: usize,
    virt: &[Value],
    vps: &[VpId],
    spec: &crate::rules::EvaluatorSpec,
) -> Option<Vec<Vec<Value>>> {
    let mut windows = vec![virt[s..s + w].to_vec()];
    for (k, &ovp) in vps.iter().enumerate().skip(1) {
        let count = spec.args.get(k)?.count;
        let osize = if count.is_unbounded() { w } else { count.max };
        let opos = model.translate_pos(vp, s, ovp)?;
        let oout = model.viewpoints[ovp].tree.out();
        if opos + osize > oout.len() {
            return None;
        }
        windows.push(oout[opos..opos + osize].to_vec());
    }
    Some(windows)
}

/// Merge overlapping or adjacent node-relative ranges, clipped to `len`.
fn merge_ranges(mut ranges: Vec<(usize, usize)>, len: usize) -> Vec<(usize, usize)> {
    ranges.retain(|&(s, e)| s < e && s < len);
    for r in &mut ranges {
        r.1 = r.1.min(len);
    }
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = vec![];
    for (s, e) in ranges {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaps() {
        assert_eq!(gaps(6, &[(2, 4, 0)]), vec![(0, 2), (4, 6)]);
        assert_eq!(gaps(4, &[(0, 4, 0)]), vec![]);
        assert_eq!(gaps(4, &[]), vec![(0, 4)]);
    }

    #[test]
    fn test_merge_ranges() {
        assert_eq!(merge_ranges(vec![(0, 2), (1, 3), (5, 6)], 10), vec![(0, 3), (5, 6)]);
        assert_eq!(merge_ranges(vec![(2, 4), (4, 5)], 10), vec![(2, 5)]);
        assert_eq!(merge_ranges(vec![(8, 12)], 10), vec![(8, 10)]);
        assert!(merge_ranges(vec![(12, 14)], 10).is_empty());
    }
}
