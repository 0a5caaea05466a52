// End-to-end engine scenarios: the generation lifecycle driven through a
// whole model, with scripted producers where candidate order must be exact.

use cantus_engine::error::GenError;
use cantus_engine::model::Model;
use cantus_engine::music::{ContentKind, Duration, Pitch, Value};
use cantus_engine::producers::{NodeGuard, PitchChain, PitchMarkovProducer, SpanSequenceProducer, SpanTable};
use cantus_engine::rand::Rand;
use cantus_engine::rules::{
    ArgSpec, Constraint, DispatchMode, EvaluatorSpec, Interval, Needs, Producer, ProducerCall,
    ProducerSpec, Sampling,
};
use cantus_engine::trees::StructureNode;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// A producer that replays scripted draws in order, one per call.
struct Scripted {
    spec: ProducerSpec,
    queue: RefCell<VecDeque<Vec<Value>>>,
}

impl Scripted {
    fn new(kind: ContentKind, batch: usize, draws: Vec<Vec<Value>>) -> Rc<Self> {
        Rc::new(Scripted {
            spec: ProducerSpec {
                name: "scripted".to_string(),
                args: vec![],
                out_kind: kind,
                out_count: Interval::at_least(1),
                dispatch: DispatchMode::PerNode,
                sampling: Sampling::Randomized { batch },
                fixedness: 0.5,
                needs: Needs::default(),
            },
            queue: RefCell::new(draws.into()),
        })
    }
}

impl Producer for Scripted {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn produce(&self, _call: &ProducerCall, _rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        Ok(vec![self.queue.borrow_mut().pop_front().unwrap_or_default()])
    }
}

struct Ascending {
    spec: EvaluatorSpec,
}

impl Ascending {
    fn new() -> Rc<Self> {
        Rc::new(Ascending {
            spec: EvaluatorSpec {
                name: "ascending".to_string(),
                args: vec![ArgSpec::new(ContentKind::Pitch, Interval::exactly(2))],
                allow_outside: false,
            },
        })
    }
}

impl Constraint for Ascending {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn valid(&self, windows: &[&[Value]]) -> Result<bool, GenError> {
        let w = windows[0];
        let (a, b) = (w[0].as_pitch().unwrap(), w[1].as_pitch().unwrap());
        Ok(a.midi() < b.midi())
    }
}

/// Fails on any window whose pitch is a C.
struct NoC {
    spec: EvaluatorSpec,
}

impl NoC {
    fn new() -> Rc<Self> {
        Rc::new(NoC {
            spec: EvaluatorSpec {
                name: "no-c".to_string(),
                args: vec![ArgSpec::new(ContentKind::Pitch, Interval::exactly(1))],
                allow_outside: false,
            },
        })
    }
}

impl Constraint for NoC {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn valid(&self, windows: &[&[Value]]) -> Result<bool, GenError> {
        Ok(windows[0][0].as_pitch().map(|p| p.pc() != 'c').unwrap_or(true))
    }
}

fn p(name: &str) -> Value {
    Value::Pitch(Pitch::parse(name).unwrap())
}

fn q(n: f64) -> Value {
    Value::Duration(Duration::new(n))
}

fn one_leaf() -> StructureNode {
    StructureNode::new(0.0, 4.0, "ALL")
}

#[test]
fn discards_failing_candidate_and_commits_survivor() {
    // Two 2-quarter grid slots; the first draw descends (fails the
    // ascending constraint), the second ascends and must be the commit.
    let mut model = Model::new("P1", "major", "4/4", Some(42));
    model.set_structure(one_leaf());
    model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
    model.add_follow("mel", ContentKind::Pitch, "rhy", false, true).unwrap();
    model.initialize_to("rhy", &[q(2.0), q(2.0)], 1.0).unwrap();

    let scripted =
        Scripted::new(ContentKind::Pitch, 2, vec![vec![p("G4"), p("C4")], vec![p("C4"), p("G4")]]);
    model.add_producer("mel", scripted, &[]).unwrap();
    model.add_constraint(Ascending::new(), &["mel"]).unwrap();

    model.generate().unwrap();
    assert_eq!(model.content("mel").unwrap(), &[p("C4"), p("G4")]);
}

#[test]
fn constraint_soundness_holds_on_clean_commit() {
    // When the generator commits without the failure branch, every window
    // of every registered constraint passes on the final content.
    let mut model = Model::new("P1", "major", "4/4", Some(42));
    model.set_structure(one_leaf());
    model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
    model.add_follow("mel", ContentKind::Pitch, "rhy", false, true).unwrap();
    model.initialize_to("rhy", &[q(1.0), q(1.0), q(1.0), q(1.0)], 1.0).unwrap();

    let scripted = Scripted::new(
        ContentKind::Pitch,
        3,
        vec![
            vec![p("E4"), p("D4"), p("C4"), p("F4")],
            vec![p("C4"), p("D4"), p("E4"), p("G4")],
            vec![p("D4"), p("C4"), p("E4"), p("F4")],
        ],
    );
    model.add_producer("mel", scripted, &[]).unwrap();
    model.add_constraint(Ascending::new(), &["mel"]).unwrap();

    model.generate().unwrap();
    let out = model.content("mel").unwrap();
    for w in out.windows(2) {
        assert!(w[0].as_pitch().unwrap().midi() < w[1].as_pitch().unwrap().midi());
    }
}

#[test]
fn copy_node_mirrors_source_at_full_fixedness() {
    let structure = StructureNode::with_children(
        0.0,
        8.0,
        "ALL",
        vec![StructureNode::new(0.0, 4.0, "a"), StructureNode::new(4.0, 8.0, "a'")],
    );
    let mut model = Model::new("P1", "major", "4/4", Some(7));
    model.set_structure(structure);
    model.add_lead("rhy", ContentKind::Duration, true, true).unwrap();

    // One scripted draw for leaf `a`; the repeat must never consume one.
    let scripted = Scripted::new(ContentKind::Duration, 1, vec![vec![q(1.0), q(1.0), q(1.0), q(1.0)]]);
    model.add_producer("rhy", scripted, &[]).unwrap();

    model.generate().unwrap();

    let rhy = model.vp_id("rhy").unwrap();
    let tree = &model.viewpoint(rhy).tree;
    let a = tree.by_name("a").unwrap();
    let rep = tree.by_name("a'").unwrap();
    assert_eq!(tree.content(rep), tree.content(a));
    assert_eq!(tree.elt_count(rep), 4);
    assert_eq!(tree.node(rep).fixedness, 1.0);
    assert_eq!(tree.elt_count(tree.root), 8);
}

#[test]
fn regeneration_cycle_is_a_typed_error() {
    let mut model = Model::new("P1", "major", "4/4", Some(3));
    model.set_structure(one_leaf());
    model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
    model.add_follow("mel", ContentKind::Pitch, "rhy", false, true).unwrap();
    model.initialize_to("rhy", &[q(2.0), q(2.0)], 1.0).unwrap();

    // Every candidate fails the whole-span window, so the least-bad commit
    // identifies the full node as the faulty range: an unrecoverable cycle.
    let scripted = Scripted::new(ContentKind::Pitch, 1, vec![vec![p("G4"), p("C4")]]);
    model.add_producer("mel", scripted, &[]).unwrap();
    model.add_constraint(Ascending::new(), &["mel"]).unwrap();

    let err = model.generate();
    assert!(matches!(err, Err(GenError::NeedsBacktracking { .. })), "got {err:?}");
}

#[test]
fn total_failure_regenerates_only_the_faulty_subrange() {
    let mut model = Model::new("P1", "major", "4/4", Some(3));
    model.set_structure(one_leaf());
    model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
    model.add_follow("mel", ContentKind::Pitch, "rhy", false, true).unwrap();
    model.initialize_to("rhy", &[q(2.0), q(2.0)], 1.0).unwrap();

    // The only draw fails at element 0 (a C) but passes at element 1: the
    // generator commits it anyway, then regenerates just the first slot,
    // where the next scripted draw succeeds.
    let scripted =
        Scripted::new(ContentKind::Pitch, 1, vec![vec![p("C4"), p("D4")], vec![p("E4")]]);
    model.add_producer("mel", scripted, &[]).unwrap();
    model.add_constraint(NoC::new(), &["mel"]).unwrap();

    model.generate().unwrap();
    assert_eq!(model.content("mel").unwrap(), &[p("E4"), p("D4")]);
}

#[test]
fn follow_alignment_and_gapless_coverage() {
    let structure = StructureNode::with_children(
        0.0,
        8.0,
        "ALL",
        vec![
            StructureNode::with_children(
                0.0,
                4.0,
                "A",
                vec![StructureNode::new(0.0, 2.0, "a"), StructureNode::new(2.0, 4.0, "b")],
            ),
            StructureNode::with_children(
                4.0,
                8.0,
                "B",
                vec![StructureNode::new(0.0, 2.0, "c"), StructureNode::new(2.0, 4.0, "d")],
            ),
        ],
    );
    let mut model = Model::new("P1", "major", "4/4", Some(99));
    model.set_structure(structure);
    model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
    model.add_follow("mel", ContentKind::Pitch, "rhy", false, true).unwrap();

    let table = SpanTable {
        items: vec![("4".into(), 0.7), ("8 8".into(), 0.3)],
        items_last: vec![("4".into(), 1.0)],
    };
    let rhy_producer =
        Rc::new(SpanSequenceProducer::new("rhy", NodeGuard::Leaf, 0.5, &table).unwrap());
    model.add_producer("rhy", rhy_producer, &[]).unwrap();

    let mut transitions = BTreeMap::new();
    transitions.insert("C4".to_string(), vec![("D4".to_string(), 0.5), ("E4".to_string(), 0.5)]);
    transitions.insert("D4".to_string(), vec![("C4".to_string(), 0.5), ("E4".to_string(), 0.5)]);
    transitions.insert("E4".to_string(), vec![("D4".to_string(), 0.5), ("C4".to_string(), 0.5)]);
    let chain = PitchChain {
        initial: vec!["C4".to_string(), "E4".to_string()],
        transitions,
        finals: vec!["C4".to_string(), "D4".to_string(), "E4".to_string()],
        ambitus: ("C4".to_string(), "G4".to_string()),
        ambitus_initial: ("C4".to_string(), "E4".to_string()),
    };
    let mel_producer = Rc::new(PitchMarkovProducer::new("mel", NodeGuard::Leaf, 0.5, chain).unwrap());
    model.add_producer("mel", mel_producer, &[]).unwrap();

    model.generate().unwrap();

    let rhy = model.vp_id("rhy").unwrap();
    let mel = model.vp_id("mel").unwrap();
    let rhy_tree = &model.viewpoint(rhy).tree;
    let mel_tree = &model.viewpoint(mel).tree;

    // Follow alignment: element counts agree on every shared node.
    let mut total = 0;
    for name in ["a", "b", "c", "d", "A", "B", "ALL"] {
        let rn = rhy_tree.by_name(name).unwrap();
        let mn = mel_tree.by_name(name).unwrap();
        assert_eq!(rhy_tree.elt_count(rn), mel_tree.elt_count(mn), "node {name}");
    }
    // Coverage: leaf spans tile the root exactly, and everything is defined.
    for name in ["a", "b", "c", "d"] {
        let rn = rhy_tree.by_name(name).unwrap();
        let span: f64 = rhy_tree.content(rn).iter().map(|v| v.quarter_length().unwrap()).sum();
        assert_eq!(span, 2.0, "leaf {name} fills its span");
        total += rhy_tree.elt_count(rn);
    }
    assert_eq!(total, rhy_tree.elt_count(rhy_tree.root));
    assert!(mel_tree.out().iter().all(|v| !v.is_undefined()));
    assert_eq!(mel_tree.out().len(), rhy_tree.out().len());
}

#[test]
fn registration_rejects_mismatched_arg_kinds() {
    let mut model = Model::new("P1", "major", "4/4", Some(1));
    model.set_structure(one_leaf());
    model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();

    // A pitch constraint bound to a duration viewpoint is a config bug.
    let err = model.add_constraint(Ascending::new(), &["rhy"]);
    assert!(matches!(err, Err(GenError::RuleArgs { .. })));

    // A producer emitting the wrong kind is rejected too.
    let scripted = Scripted::new(ContentKind::Pitch, 1, vec![]);
    let err = model.add_producer("rhy", scripted, &[]);
    assert!(matches!(err, Err(GenError::RuleArgs { .. })));
}
