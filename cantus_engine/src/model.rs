// The model: viewpoint registry, rule registration, orchestration.
//
// A model owns the structure template, the viewpoints (in registration
// order, which is generation order), the rules bound to them, and the run's
// RNG. Registration is where capability descriptors are checked: a rule
// whose declared argument kinds do not match the bound viewpoints fails
// immediately with a configuration error, never at generation time.
//
// Generation drives each viewpoint's root node in registration order; a
// follow viewpoint refuses to run before its lead. All mutation of content
// and node bounds flows through `commit_node`, which also keeps dependent
// follow viewpoints' element counts in sync with their lead (undefined
// placeholders plus a mirrored duration grid), so cross-grid alignment is
// always possible.

use crate::error::GenError;
use crate::generator;
use crate::music::{ContentKind, Value};
use crate::rand::Rand;
use crate::rules::{check_arg_kinds, Constraint, Producer, Scorer};
use crate::trees::{NodeId, StructureNode};
use crate::viewpoint::{Role, ViewPoint, VpId};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

/// A producer bound to the viewpoints whose windows it consumes.
#[derive(Clone)]
pub struct BoundProducer {
    pub producer: Rc<dyn Producer>,
    pub inputs: Vec<VpId>,
}

/// A constraint bound to its input viewpoints; the first is the one whose
/// generation it gates.
#[derive(Clone)]
pub struct BoundConstraint {
    pub rule: Rc<dyn Constraint>,
    pub vps: Vec<VpId>,
}

/// A scorer bound to its input viewpoints, with its preference weight.
#[derive(Clone)]
pub struct BoundScorer {
    pub rule: Rc<dyn Scorer>,
    pub vps: Vec<VpId>,
    pub weight: f64,
}

pub struct Model {
    /// Transposition of the piece relative to C, as an interval name.
    pub key: String,
    /// `"major"` or `"minor"`.
    pub mode: String,
    /// Time signature, e.g. `"4/4"` or `"6/8"`.
    pub meter: String,
    structure: Option<StructureNode>,
    pub(crate) viewpoints: Vec<ViewPoint>,
    names: BTreeMap<String, VpId>,
    pub(crate) producers: Vec<Vec<BoundProducer>>,
    pub(crate) constraints: Vec<BoundConstraint>,
    pub(crate) scorers: Vec<BoundScorer>,
    pub(crate) rand: Rand,
}

impl Model {
    pub fn new(key: &str, mode: &str, meter: &str, seed: Option<u64>) -> Self {
        Model {
            key: key.to_string(),
            mode: mode.to_string(),
            meter: meter.to_string(),
            structure: None,
            viewpoints: vec![],
            names: BTreeMap::new(),
            producers: vec![],
            constraints: vec![],
            scorers: vec![],
            rand: match seed {
                Some(s) => Rand::seeded(s),
                None => Rand::from_entropy(),
            },
        }
    }

    /// True for compound meters (the eighth-note pulse groups in threes).
    pub fn ternary(&self) -> bool {
        self.meter.ends_with('8')
    }

    pub fn quarters_per_bar(&self) -> f64 {
        let mut parts = self.meter.splitn(2, '/');
        let num: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(4.0);
        let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(4.0);
        num * 4.0 / den
    }

    /// Install the piece's structure template. Must precede viewpoints.
    pub fn set_structure(&mut self, structure: StructureNode) {
        self.structure = Some(structure);
    }

    fn template(&self) -> Result<&StructureNode, GenError> {
        self.structure
            .as_ref()
            .ok_or_else(|| GenError::Config("structure must be set before viewpoints".to_string()))
    }

    fn register(&mut self, vp: ViewPoint) -> Result<VpId, GenError> {
        if self.names.contains_key(&vp.name) {
            return Err(GenError::Config(format!("duplicate viewpoint `{}`", vp.name)));
        }
        let id = self.viewpoints.len();
        self.names.insert(vp.name.clone(), id);
        self.viewpoints.push(vp);
        self.producers.push(vec![]);
        Ok(id)
    }

    /// Add a lead viewpoint: defines its own musical-time grid.
    pub fn add_lead(
        &mut self,
        name: &str,
        kind: ContentKind,
        use_copy: bool,
        gapless: bool,
    ) -> Result<VpId, GenError> {
        let template = self.template()?.clone();
        let vp = ViewPoint::new(name, kind, Role::Lead { follows: vec![] }, &template, use_copy, gapless);
        self.register(vp)
    }

    /// Add a follow viewpoint: derives element positions from `lead`'s
    /// per-node element counts and cannot generate before it.
    pub fn add_follow(
        &mut self,
        name: &str,
        kind: ContentKind,
        lead: &str,
        use_copy: bool,
        gapless: bool,
    ) -> Result<VpId, GenError> {
        let lead_id = self.vp_id(lead)?;
        if !matches!(self.viewpoints[lead_id].role, Role::Lead { .. }) {
            return Err(GenError::Config(format!("viewpoint `{lead}` is not a lead")));
        }
        let template = self.template()?.clone();
        let vp = ViewPoint::new(name, kind, Role::Follow { lead: lead_id }, &template, use_copy, gapless);
        let id = self.register(vp)?;
        if let Role::Lead { follows } = &mut self.viewpoints[lead_id].role {
            follows.push(id);
        }
        // Mirror whatever the lead already holds (rest-section padding,
        // pre-loaded content) as placeholder counts.
        let seeded: Vec<(String, usize, Vec<f64>)> = {
            let lead_tree = &self.viewpoints[lead_id].tree;
            lead_tree
                .leaves()
                .into_iter()
                .filter(|&l| lead_tree.elt_count(l) > 0)
                .map(|l| {
                    let a = lead_tree.abs_pos(l);
                    let count = lead_tree.elt_count(l);
                    let durs = (a..a + count).map(|i| lead_tree.elem_quarter(i)).collect();
                    (lead_tree.node(l).name.clone(), count, durs)
                })
                .collect()
        };
        for (name, count, durs) in seeded {
            let ftree = &mut self.viewpoints[id].tree;
            if let Some(fnode) = ftree.by_name(&name) {
                if ftree.elt_count(fnode) != count {
                    let kind = ftree.kind;
                    ftree.set_to(fnode, vec![Value::undefined(kind); count], 0.0);
                }
                ftree.set_grid(fnode, &durs);
            }
        }
        Ok(id)
    }

    pub fn vp_id(&self, name: &str) -> Result<VpId, GenError> {
        self.names.get(name).copied().ok_or_else(|| GenError::UnknownViewpoint(name.to_string()))
    }

    pub fn viewpoint(&self, id: VpId) -> &ViewPoint {
        &self.viewpoints[id]
    }

    /// The lead whose grid a viewpoint sits on (itself, for leads).
    pub(crate) fn lead_of(&self, id: VpId) -> VpId {
        match self.viewpoints[id].role {
            Role::Lead { .. } => id,
            Role::Follow { lead } => lead,
        }
    }

    /// Register a producer on a viewpoint, with the viewpoints whose
    /// windows it consumes. Kinds are checked here, once.
    pub fn add_producer(
        &mut self,
        vp: &str,
        producer: Rc<dyn Producer>,
        inputs: &[&str],
    ) -> Result<(), GenError> {
        let id = self.vp_id(vp)?;
        let spec = producer.spec();
        if spec.out_kind != self.viewpoints[id].kind {
            return Err(GenError::RuleArgs {
                rule: spec.name.clone(),
                detail: format!(
                    "emits {}, viewpoint `{vp}` carries {}",
                    spec.out_kind, self.viewpoints[id].kind
                ),
            });
        }
        let input_ids: Vec<VpId> =
            inputs.iter().map(|n| self.vp_id(n)).collect::<Result<_, _>>()?;
        let kinds: Vec<ContentKind> =
            input_ids.iter().map(|&i| self.viewpoints[i].kind).collect();
        check_arg_kinds(&spec.name, &spec.args, &kinds)?;
        self.producers[id].push(BoundProducer { producer, inputs: input_ids });
        Ok(())
    }

    /// Register a hard constraint over one or more viewpoints; the first
    /// named viewpoint is the one whose generation it gates.
    pub fn add_constraint(&mut self, rule: Rc<dyn Constraint>, vps: &[&str]) -> Result<(), GenError> {
        let ids: Vec<VpId> = vps.iter().map(|n| self.vp_id(n)).collect::<Result<_, _>>()?;
        let kinds: Vec<ContentKind> = ids.iter().map(|&i| self.viewpoints[i].kind).collect();
        check_arg_kinds(&rule.spec().name, &rule.spec().args, &kinds)?;
        self.constraints.push(BoundConstraint { rule, vps: ids });
        Ok(())
    }

    /// Register a soft scorer over one or more viewpoints with a weight.
    pub fn add_scorer(
        &mut self,
        rule: Rc<dyn Scorer>,
        vps: &[&str],
        weight: f64,
    ) -> Result<(), GenError> {
        let ids: Vec<VpId> = vps.iter().map(|n| self.vp_id(n)).collect::<Result<_, _>>()?;
        let kinds: Vec<ContentKind> = ids.iter().map(|&i| self.viewpoints[i].kind).collect();
        check_arg_kinds(&rule.spec().name, &rule.spec().args, &kinds)?;
        self.scorers.push(BoundScorer { rule, vps: ids, weight });
        Ok(())
    }

    /// Install externally supplied content (a loaded score) into a
    /// viewpoint. Leads partition by duration, follows by element count.
    pub fn initialize_to(
        &mut self,
        vp: &str,
        values: &[Value],
        fixedness: f64,
    ) -> Result<(), GenError> {
        let id = self.vp_id(vp)?;
        match self.viewpoints[id].role {
            Role::Lead { .. } => {
                let fills = if self.viewpoints[id].kind.is_temporal() {
                    self.viewpoints[id].partition_by_duration(values)?
                } else {
                    self.viewpoints[id].partition_proportional(values)?
                };
                for (leaf, content) in fills {
                    let src = self.viewpoints[id].tree.node(leaf).copy_of;
                    let content = match src {
                        Some(src) if self.viewpoints[id].use_copy => {
                            self.viewpoints[id].tree.content(src).to_vec()
                        }
                        _ => content,
                    };
                    self.commit_node(id, leaf, content, fixedness);
                }
            }
            Role::Follow { lead } => {
                if !self.viewpoints[lead].generated {
                    return Err(GenError::NotGenerated(self.viewpoints[lead].name.clone()));
                }
                let counts: Vec<(NodeId, usize)> = {
                    let vp_ref = &self.viewpoints[id];
                    let lead_tree = &self.viewpoints[lead].tree;
                    vp_ref
                        .tree
                        .leaves()
                        .into_iter()
                        .map(|leaf| {
                            let name = vp_ref.tree.node(leaf).name.clone();
                            let count = lead_tree.by_name(&name).map(|n| lead_tree.elt_count(n)).unwrap_or(0);
                            (leaf, count)
                        })
                        .collect()
                };
                let fills = self.viewpoints[id].partition_by_count(values, &counts)?;
                for (leaf, content) in fills {
                    self.commit_node(id, leaf, content, fixedness);
                }
            }
        }
        self.viewpoints[id].generated = true;
        Ok(())
    }

    /// Generate every viewpoint in registration order. Already-generated
    /// (externally initialized) viewpoints are left untouched.
    pub fn generate(&mut self) -> Result<(), GenError> {
        for id in 0..self.viewpoints.len() {
            if self.viewpoints[id].generated {
                continue;
            }
            if let Role::Follow { lead } = self.viewpoints[id].role {
                if !self.viewpoints[lead].generated {
                    return Err(GenError::NotGenerated(self.viewpoints[lead].name.clone()));
                }
            }
            let root = self.viewpoints[id].tree.root;
            generator::generate_node(self, id, root)?;
            self.viewpoints[id].generated = true;
        }
        Ok(())
    }

    /// Commit content to a node: the single mutation path. Writes the
    /// content, propagates resizes, and — for leads — refreshes dependent
    /// follows' placeholder counts and mirrored duration grid for the
    /// containing structural node.
    pub(crate) fn commit_node(
        &mut self,
        vp: VpId,
        node: NodeId,
        content: Vec<Value>,
        fixedness: f64,
    ) {
        self.viewpoints[vp].tree.set_to(node, content, fixedness);

        let follows = match &self.viewpoints[vp].role {
            Role::Lead { follows } => follows.clone(),
            Role::Follow { .. } => return,
        };
        if follows.is_empty() {
            return;
        }
        let (name, count, durs) = {
            let tree = &self.viewpoints[vp].tree;
            let holder = tree.structural_node_of(node);
            let a = tree.abs_pos(holder);
            let count = tree.elt_count(holder);
            let durs: Vec<f64> = (a..a + count).map(|i| tree.elem_quarter(i)).collect();
            (tree.node(holder).name.clone(), count, durs)
        };
        for f in follows {
            let ftree = &mut self.viewpoints[f].tree;
            let Some(fnode) = ftree.by_name(&name) else {
                continue;
            };
            if ftree.elt_count(fnode) != count {
                let kind = ftree.kind;
                let placeholders = vec![Value::undefined(kind); count];
                ftree.set_to(fnode, placeholders, 0.0);
            }
            ftree.set_grid(fnode, &durs);
        }
    }

    /// Translate an absolute element position from one viewpoint's grid to
    /// another's. Same-grid viewpoints map positions directly; across grids
    /// the position converts through cumulative musical time. Returns
    /// `None` when the time does not land on an element boundary (or when
    /// either side carries no timing information).
    pub(crate) fn translate_pos(&self, src: VpId, pos: usize, dst: VpId) -> Option<usize> {
        if src == dst || self.lead_of(src) == self.lead_of(dst) {
            return Some(pos);
        }
        let src_tree = &self.viewpoints[src].tree;
        let dst_tree = &self.viewpoints[self.lead_of(dst)].tree;
        // A grid with no timing information (e.g. a bare syllable stream)
        // aligns element-for-element.
        let dst_timed = (0..dst_tree.out().len()).any(|i| dst_tree.elem_quarter(i) > 0.0);
        if !dst_timed {
            return Some(pos);
        }
        let q: f64 = (0..pos).map(|i| src_tree.elem_quarter(i)).sum();
        if q == 0.0 && pos > 0 {
            return Some(pos);
        }
        let mut acc = 0.0;
        let mut i = 0;
        while acc < q && i < dst_tree.out().len() {
            acc += dst_tree.elem_quarter(i);
            i += 1;
        }
        if acc == q { Some(i) } else { None }
    }

    /// Cross-viewpoint coordinate translation for an index of `src`'s tree:
    /// the element position on `dst`'s grid at the same musical time.
    pub fn get_pos(
        &self,
        src: &str,
        ix: crate::index::Index,
        dst: &str,
    ) -> Result<usize, GenError> {
        let s = self.vp_id(src)?;
        let d = self.vp_id(dst)?;
        let abs = self.viewpoints[s].tree.abs_pos(ix.node) + ix.pos;
        self.translate_pos(s, abs, d).ok_or_else(|| GenError::ContentMismatch {
            node: self.viewpoints[s].tree.node(ix.node).name.clone(),
            detail: format!("position {abs} does not align with `{dst}`"),
        })
    }

    pub fn content(&self, vp: &str) -> Result<&[Value], GenError> {
        let id = self.vp_id(vp)?;
        Ok(self.viewpoints[id].tree.out())
    }

    /// Lyric alignment for an ornamented note stream: one token per note,
    /// the grid syllable where the note starts on a grid boundary, `-` for
    /// melismatic continuations. Produced by comparing cumulative durations
    /// between the lead grid and the note stream.
    pub fn export_text(
        &self,
        lead: &str,
        notes: &str,
        lyrics: &str,
    ) -> Result<Vec<String>, GenError> {
        let lead_id = self.vp_id(lead)?;
        let notes_id = self.vp_id(notes)?;
        let lyr_id = self.vp_id(lyrics)?;
        let lead_tree = &self.viewpoints[lead_id].tree;
        let lyr = self.viewpoints[lyr_id].tree.out();

        // Grid boundaries: the start time of each lead element.
        let mut boundaries = vec![];
        let mut acc = 0.0;
        for i in 0..lead_tree.out().len() {
            boundaries.push(acc);
            acc += lead_tree.elem_quarter(i);
        }

        let mut tokens = vec![];
        let mut t = 0.0;
        let mut next = 0;
        for v in self.viewpoints[notes_id].tree.out() {
            let ql = v.quarter_length().unwrap_or(0.0);
            let on_grid = next < boundaries.len() && t == boundaries[next];
            if on_grid {
                let token = lyr
                    .get(next)
                    .and_then(|s| s.as_syllable())
                    .filter(|s| !s.is_undefined())
                    .map(|s| s.clean())
                    .unwrap_or_else(|| "-".to_string());
                tokens.push(token);
                next += 1;
            } else {
                tokens.push("-".to_string());
            }
            t += ql;
            // Catch up past any grid boundary the note has sung through.
            while next < boundaries.len() && boundaries[next] < t {
                next += 1;
            }
        }
        Ok(tokens)
    }

    /// Render every viewpoint's tree, for diagnostics.
    pub fn dump(&self) -> String {
        let mut s = String::new();
        for vp in &self.viewpoints {
            let _ = writeln!(s, "== {} ({})", vp.name, vp.kind);
            s.push_str(&vp.tree.dump());
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::Duration;

    fn template() -> StructureNode {
        StructureNode::with_children(
            0.0,
            4.0,
            "ALL",
            vec![StructureNode::new(0.0, 2.0, "a"), StructureNode::new(2.0, 4.0, "b")],
        )
    }

    fn q(n: f64) -> Value {
        Value::Duration(Duration::new(n))
    }

    #[test]
    fn test_follow_placeholders_track_lead() {
        let mut model = Model::new("P1", "major", "4/4", Some(1));
        model.set_structure(template());
        model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
        model.add_follow("mel", ContentKind::Pitch, "rhy", false, true).unwrap();

        model.initialize_to("rhy", &[q(1.0), q(1.0), q(0.5), q(0.5), q(1.0)], 1.0).unwrap();

        let mel = model.vp_id("mel").unwrap();
        let mel_tree = &model.viewpoints[mel].tree;
        let a = mel_tree.by_name("a").unwrap();
        let b = mel_tree.by_name("b").unwrap();
        assert_eq!(mel_tree.elt_count(a), 2);
        assert_eq!(mel_tree.elt_count(b), 3);
        assert!(mel_tree.content(a).iter().all(|v| v.is_undefined()));
        // The mirrored grid carries the lead's durations.
        assert_eq!(mel_tree.elem_quarter(2), 0.5);
        assert_eq!(mel_tree.elem_quarter(4), 1.0);
    }

    #[test]
    fn test_follow_refuses_before_lead() {
        let mut model = Model::new("P1", "major", "4/4", Some(1));
        model.set_structure(template());
        model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
        model.add_follow("mel", ContentKind::Pitch, "rhy", false, true).unwrap();

        let p = Value::Pitch(crate::music::Pitch::parse("C4").unwrap());
        let err = model.initialize_to("mel", &[p], 1.0);
        assert!(matches!(err, Err(GenError::NotGenerated(_))));
    }

    #[test]
    fn test_quarters_per_bar() {
        let model = Model::new("P1", "major", "6/8", Some(1));
        assert!(model.ternary());
        assert_eq!(model.quarters_per_bar(), 3.0);
        let model = Model::new("P1", "major", "4/4", Some(1));
        assert_eq!(model.quarters_per_bar(), 4.0);
    }

    #[test]
    fn test_translate_pos_across_grids() {
        let mut model = Model::new("P1", "minor", "4/4", Some(1));
        model.set_structure(template());
        model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
        model.add_lead("fill", ContentKind::Note, false, true).unwrap();
        model.initialize_to("rhy", &[q(1.0), q(1.0), q(1.0), q(1.0)], 1.0).unwrap();

        let note = |d: f64| {
            Value::Note(crate::music::Note::new(
                Duration::new(d),
                crate::music::Pitch::parse("C4").unwrap(),
            ))
        };
        // Eight eighth notes against four quarters.
        model
            .initialize_to(
                "fill",
                &[note(0.5), note(0.5), note(0.5), note(0.5), note(0.5), note(0.5), note(0.5), note(0.5)],
                1.0,
            )
            .unwrap();

        let fill = model.vp_id("fill").unwrap();
        let rhy = model.vp_id("rhy").unwrap();
        // Note 2 starts at quarter 1.0 = rhythm element 1.
        assert_eq!(model.translate_pos(fill, 2, rhy), Some(1));
        // Note 1 starts mid-element: no alignment.
        assert_eq!(model.translate_pos(fill, 1, rhy), None);
        assert_eq!(model.translate_pos(rhy, 3, fill), Some(6));
    }

    #[test]
    fn test_export_text_marks_continuations() {
        let mut model = Model::new("P1", "minor", "4/4", Some(1));
        model.set_structure(template());
        model.add_lead("lyr", ContentKind::Syllable, false, false).unwrap();
        model.add_lead("rhy", ContentKind::Duration, false, true).unwrap();
        model.add_lead("fill", ContentKind::Note, false, true).unwrap();

        let syl = |s: &str| Value::Syllable(crate::music::Syllable::new(s));
        model
            .initialize_to("lyr", &[syl("A"), syl("-men"), syl("a"), syl("-gain")], 1.0)
            .unwrap();
        model.initialize_to("rhy", &[q(1.0), q(1.0), q(1.0), q(1.0)], 1.0).unwrap();

        let note = |d: f64| {
            Value::Note(crate::music::Note::new(
                Duration::new(d),
                crate::music::Pitch::parse("C4").unwrap(),
            ))
        };
        // First grid slot is split in two (melisma), the rest are plain.
        model
            .initialize_to("fill", &[note(0.5), note(0.5), note(1.0), note(1.0), note(1.0)], 1.0)
            .unwrap();

        let tokens = model.export_text("rhy", "fill", "lyr").unwrap();
        assert_eq!(tokens, vec!["A", "-", "-men", "a", "-gain"]);
    }
}
