// The pluggable rule framework: producers, constraints, scorers.
//
// Every rule carries a typed capability descriptor — which content kinds it
// consumes (`ArgSpec`), how many elements per window (`Interval`), what it
// emits, how it is dispatched — checked once when the rule is registered on
// a model. Rule bodies then work on plain `Value` windows with no further
// introspection.
//
// Producers propose full candidate fills for a span. The two flavors share
// one trait: an enumerator returns all admissible candidates from a single
// `produce` call, a randomized producer returns one stochastic draw and is
// called `batch` times to build a pool.
//
// Constraints are hard pass/fail window rules; scorers are soft weighted
// preferences. Both are evaluated over sliding windows by the generator
// (see generator.rs); windows may reach outside the span being generated
// into already-committed neighboring content.

use crate::error::GenError;
use crate::index::Index;
use crate::music::{ContentKind, Value};
use crate::rand::Rand;
use crate::trees::{NodeId, RefinementTree};
use serde::{Deserialize, Serialize};

/// An inclusive element-count interval. `at_least(1)` means "the whole
/// span, however long"; `exactly(n)` means n-element windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub min: usize,
    pub max: usize,
}

impl Interval {
    pub fn exactly(n: usize) -> Self {
        Interval { min: n, max: n }
    }

    pub fn at_least(n: usize) -> Self {
        Interval { min: n, max: usize::MAX }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Interval { min, max }
    }

    pub fn contains(&self, n: usize) -> bool {
        self.min <= n && n <= self.max
    }

    /// True if the interval is open-ended (window = whole span).
    pub fn is_unbounded(&self) -> bool {
        self.max == usize::MAX
    }
}

/// One declared input: a content kind plus the per-window element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub kind: ContentKind,
    pub count: Interval,
}

impl ArgSpec {
    pub fn new(kind: ContentKind, count: Interval) -> Self {
        ArgSpec { kind, count }
    }
}

/// How a producer is bound to the tree: once per qualifying node, or once
/// per qualifying sliding window across a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    PerNode,
    PerWindow,
}

/// Candidate sourcing: deterministic enumeration of all admissible fills,
/// or repeated stochastic draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    Enumerate,
    Randomized { batch: usize },
}

/// Default randomized batch size.
pub const BATCH_SIZE: usize = 100;

/// Optional extra call arguments a producer can request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Needs {
    /// The window's start index.
    pub start: bool,
    /// The committed content immediately before/after the span (needed by
    /// Markov producers continuing from known prior state).
    pub context: bool,
    /// The target element count.
    pub len: bool,
    /// The target quarter duration.
    pub duration: bool,
    /// Node-specific side data fetched via `node_args`.
    pub node_args: bool,
}

/// A producer's full capability descriptor.
#[derive(Debug, Clone)]
pub struct ProducerSpec {
    pub name: String,
    /// Input windows consumed from other viewpoints, in registration order.
    pub args: Vec<ArgSpec>,
    pub out_kind: ContentKind,
    /// The element-count interval of fills this producer can emit.
    pub out_count: Interval,
    pub dispatch: DispatchMode,
    pub sampling: Sampling,
    /// Fixedness committed content receives.
    pub fixedness: f64,
    pub needs: Needs,
}

/// Read-only view of a node, handed to per-node guards.
pub struct NodeCtx<'a> {
    pub tree: &'a RefinementTree,
    pub node: NodeId,
}

impl NodeCtx<'_> {
    pub fn name(&self) -> &str {
        &self.tree.node(self.node).name
    }

    pub fn depth(&self) -> usize {
        self.tree.node(self.node).depth
    }

    pub fn is_leaf(&self) -> bool {
        self.tree.node(self.node).is_leaf()
    }

    pub fn elt_count(&self) -> usize {
        self.tree.elt_count(self.node)
    }

    pub fn duration(&self) -> f64 {
        self.tree.duration(self.node)
    }
}

/// Read-only view of a window start, handed to per-window guards.
pub struct WindowCtx<'a> {
    pub tree: &'a RefinementTree,
    pub start: Index,
}

impl WindowCtx<'_> {
    /// True if the window starts `offset` elements from the end of its
    /// enclosing node at structural `depth` (negative = from the end).
    pub fn maps_to(&self, offset: isize, depth: usize) -> bool {
        self.tree.maps_to(self.start, offset, depth)
    }
}

/// Assembled arguments for one `produce` call.
#[derive(Debug, Clone, Default)]
pub struct ProducerCall {
    /// One window per declared `ArgSpec`, aligned to the target span.
    pub args: Vec<Vec<Value>>,
    pub start: Option<Index>,
    /// Last committed element before the span, if any and defined.
    pub before: Option<Value>,
    /// First committed element after the span, if any and defined.
    pub after: Option<Value>,
    pub len: Option<usize>,
    pub duration: Option<f64>,
    pub node_args: Vec<Value>,
}

impl ProducerCall {
    /// The declared input window at argument position `i`.
    pub fn arg(&self, i: usize, rule: &str) -> Result<&[Value], GenError> {
        self.args.get(i).map(|v| v.as_slice()).ok_or_else(|| GenError::RuleArgs {
            rule: rule.to_string(),
            detail: format!("missing argument window {i}"),
        })
    }
}

/// A rule that proposes candidate fills for a span.
pub trait Producer {
    fn spec(&self) -> &ProducerSpec;

    /// Per-node qualification (dispatch `PerNode`).
    fn guard(&self, _node: &NodeCtx) -> bool {
        true
    }

    /// Per-window qualification (dispatch `PerWindow`).
    fn applies_to(&self, _window: &WindowCtx) -> bool {
        true
    }

    /// Node-specific side data, fetched when `needs.node_args` is set.
    fn node_args(&self, _node: &NodeCtx) -> Vec<Value> {
        vec![]
    }

    /// Propose candidates. Enumerators return every admissible fill in one
    /// call; randomized producers return a single draw.
    fn produce(&self, call: &ProducerCall, rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError>;
}

/// Capability descriptor shared by constraints and scorers: the input
/// windows and whether evaluation windows may extend outside the span under
/// generation into already-committed content.
#[derive(Debug, Clone)]
pub struct EvaluatorSpec {
    pub name: String,
    pub args: Vec<ArgSpec>,
    pub allow_outside: bool,
}

impl EvaluatorSpec {
    /// Sliding-window size: the primary (first) argument's maximum count;
    /// unbounded intervals evaluate one window covering the whole span.
    pub fn window_size(&self) -> Option<usize> {
        let count = self.args.first().map(|a| a.count)?;
        if count.is_unbounded() { None } else { Some(count.max) }
    }
}

/// A hard pass/fail rule over aligned windows of one or more viewpoints.
pub trait Constraint {
    fn spec(&self) -> &EvaluatorSpec;

    /// One aligned window per declared argument. May fail on data-authoring
    /// errors (e.g. an unknown chord symbol), which abort generation.
    fn valid(&self, windows: &[&[Value]]) -> Result<bool, GenError>;
}

/// A soft preference rule over aligned windows of one or more viewpoints.
pub trait Scorer {
    fn spec(&self) -> &EvaluatorSpec;

    fn score(&self, windows: &[&[Value]]) -> f64;
}

/// Registration-time capability check: each declared argument kind must
/// match the bound viewpoint's content kind.
pub fn check_arg_kinds(
    rule: &str,
    args: &[ArgSpec],
    kinds: &[ContentKind],
) -> Result<(), GenError> {
    if args.len() != kinds.len() {
        return Err(GenError::RuleArgs {
            rule: rule.to_string(),
            detail: format!("declares {} argument(s), bound to {}", args.len(), kinds.len()),
        });
    }
    for (i, (spec, kind)) in args.iter().zip(kinds).enumerate() {
        if spec.kind != *kind {
            return Err(GenError::RuleArgs {
                rule: rule.to_string(),
                detail: format!("argument {i} expects {}, viewpoint carries {kind}", spec.kind),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval() {
        let w = Interval::exactly(2);
        assert!(w.contains(2));
        assert!(!w.contains(1));
        assert!(!w.is_unbounded());
        assert!(Interval::at_least(1).is_unbounded());
        assert!(Interval::between(1, 3).contains(3));
    }

    #[test]
    fn test_check_arg_kinds() {
        let args = [
            ArgSpec::new(ContentKind::Pitch, Interval::exactly(1)),
            ArgSpec::new(ContentKind::Chord, Interval::exactly(1)),
        ];
        assert!(check_arg_kinds("r", &args, &[ContentKind::Pitch, ContentKind::Chord]).is_ok());
        let err = check_arg_kinds("r", &args, &[ContentKind::Pitch, ContentKind::Duration]);
        assert!(matches!(err, Err(GenError::RuleArgs { .. })));
        let err = check_arg_kinds("r", &args, &[ContentKind::Pitch]);
        assert!(matches!(err, Err(GenError::RuleArgs { .. })));
    }

    #[test]
    fn test_window_size() {
        let spec = EvaluatorSpec {
            name: "s".into(),
            args: vec![ArgSpec::new(ContentKind::Pitch, Interval::exactly(2))],
            allow_outside: true,
        };
        assert_eq!(spec.window_size(), Some(2));
        let open = EvaluatorSpec {
            name: "s".into(),
            args: vec![ArgSpec::new(ContentKind::Pitch, Interval::at_least(1))],
            allow_outside: true,
        };
        assert_eq!(open.window_size(), None);
    }
}
