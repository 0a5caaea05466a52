// Generic producers that rulesets parameterize with their own tables.
//
// Each producer owns an immutable configuration object built at
// construction (and serde-deserializable, so trained tables can be loaded
// from JSON). Four families cover the common cases:
// - `ChoiceProducer`: one weighted pick among whole candidate sequences;
// - `SpanSequenceProducer`: weighted rhythm spans filling a quarter-note
//   target exactly, with a separate closing table for the final slot;
// - `HiddenMarkovProducer`: state chain with per-state emission tables;
// - `PitchMarkovProducer`: first-order pitch chain constrained to an
//   ambitus and a legal final-state set, continuing from prior context.
//
// Rule-specific producers (cadence enumerators, flourishers) implement the
// `Producer` trait directly in their ruleset crate.

use crate::error::GenError;
use crate::music::{ContentKind, Duration, Pitch, Value};
use crate::rand::Rand;
use crate::rules::{
    DispatchMode, Interval, Needs, NodeCtx, Producer, ProducerCall, ProducerSpec, Sampling,
    BATCH_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many times a stochastic fill is retried before giving up on a hard
/// requirement (exact span fill, legal final state).
const ATTEMPTS: usize = 50;

/// Node qualification for the generic producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGuard {
    Any,
    Leaf,
    Depth(usize),
}

impl NodeGuard {
    pub fn admits(&self, node: &NodeCtx) -> bool {
        match self {
            NodeGuard::Any => true,
            NodeGuard::Leaf => node.is_leaf(),
            NodeGuard::Depth(d) => node.depth() == *d,
        }
    }
}

/// Emit a table symbol as a value of the producer's output kind.
fn emit_value(kind: ContentKind, symbol: &str) -> Result<Value, GenError> {
    Ok(match kind {
        ContentKind::Chord => Value::Chord(crate::music::Chord::new(symbol)),
        ContentKind::Syllable => Value::Syllable(crate::music::Syllable::new(symbol)),
        ContentKind::Pitch => Value::Pitch(Pitch::parse(symbol)?),
        ContentKind::Duration => Value::Duration(Duration::parse(symbol)?),
        ContentKind::Note => {
            return Err(GenError::BadValue { kind, text: symbol.to_string() });
        }
    })
}

/// One weighted pick among whole candidate sequences.
pub struct ChoiceProducer {
    spec: ProducerSpec,
    guard: NodeGuard,
    choices: Vec<(Vec<Value>, f64)>,
}

impl ChoiceProducer {
    pub fn new(
        name: &str,
        out_kind: ContentKind,
        guard: NodeGuard,
        fixedness: f64,
        choices: Vec<(Vec<Value>, f64)>,
    ) -> Self {
        ChoiceProducer {
            spec: ProducerSpec {
                name: name.to_string(),
                args: vec![],
                out_kind,
                out_count: Interval::at_least(1),
                dispatch: DispatchMode::PerNode,
                sampling: Sampling::Randomized { batch: BATCH_SIZE },
                fixedness,
                needs: Needs::default(),
            },
            guard,
            choices,
        }
    }
}

impl Producer for ChoiceProducer {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn guard(&self, node: &NodeCtx) -> bool {
        self.guard.admits(node)
    }

    fn produce(&self, _call: &ProducerCall, rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        let choice = rand.weighted(&self.choices).ok_or_else(|| GenError::Exhausted {
            rule: self.spec.name.clone(),
            node: String::new(),
        })?;
        Ok(vec![choice.clone()])
    }
}

/// Weighted rhythm-span table: regular slots plus closing slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanTable {
    pub items: Vec<(String, f64)>,
    pub items_last: Vec<(String, f64)>,
}

/// Fills a node's quarter duration exactly with weighted spans, closing
/// with an `items_last` entry when one fits.
pub struct SpanSequenceProducer {
    spec: ProducerSpec,
    guard: NodeGuard,
    items: Vec<(Duration, f64)>,
    items_last: Vec<(Duration, f64)>,
}

impl SpanSequenceProducer {
    pub fn new(
        name: &str,
        guard: NodeGuard,
        fixedness: f64,
        table: &SpanTable,
    ) -> Result<Self, GenError> {
        let parse =
            |entries: &[(String, f64)]| -> Result<Vec<(Duration, f64)>, GenError> {
                entries.iter().map(|(code, w)| Ok((Duration::parse(code)?, *w))).collect()
            };
        Ok(SpanSequenceProducer {
            spec: ProducerSpec {
                name: name.to_string(),
                args: vec![],
                out_kind: ContentKind::Duration,
                out_count: Interval::at_least(1),
                dispatch: DispatchMode::PerNode,
                sampling: Sampling::Randomized { batch: BATCH_SIZE },
                fixedness,
                needs: Needs { duration: true, ..Needs::default() },
            },
            guard,
            items: parse(&table.items)?,
            items_last: parse(&table.items_last)?,
        })
    }
}

impl Producer for SpanSequenceProducer {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn guard(&self, node: &NodeCtx) -> bool {
        self.guard.admits(node)
    }

    fn produce(&self, call: &ProducerCall, rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        let target = call.duration.ok_or_else(|| GenError::RuleArgs {
            rule: self.spec.name.clone(),
            detail: "needs a target duration".to_string(),
        })?;
        let target_units = (target * crate::music::UNITS_PER_QUARTER as f64).round() as u32;

        for _ in 0..ATTEMPTS {
            let mut seq: Vec<Value> = vec![];
            let mut remaining = target_units;
            let filled = loop {
                if remaining == 0 {
                    break true;
                }
                // Close with a final-slot span when one fits exactly.
                let closers: Vec<(Duration, f64)> = self
                    .items_last
                    .iter()
                    .filter(|(d, _)| d.units() == remaining)
                    .cloned()
                    .collect();
                if !seq.is_empty() {
                    if let Some(d) = rand.weighted(&closers) {
                        let d = d.clone();
                        remaining -= d.units();
                        seq.push(Value::Duration(d));
                        continue;
                    }
                }
                let fitting: Vec<(Duration, f64)> = self
                    .items
                    .iter()
                    .filter(|(d, _)| d.units() <= remaining)
                    .cloned()
                    .collect();
                match rand.weighted(&fitting) {
                    Some(d) => {
                        let d = d.clone();
                        remaining -= d.units();
                        seq.push(Value::Duration(d));
                    }
                    None => break false,
                }
            };
            if filled {
                return Ok(vec![seq]);
            }
        }
        Err(GenError::Exhausted { rule: self.spec.name.clone(), node: String::new() })
    }
}

/// Hidden-Markov configuration: weighted initial states, transition rows,
/// per-state emission tables (an absent row emits the state itself), and an
/// optional legal final-state set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovChain {
    pub initial: Vec<(String, f64)>,
    pub transitions: BTreeMap<String, Vec<(String, f64)>>,
    #[serde(default)]
    pub emissions: BTreeMap<String, Vec<(String, f64)>>,
    #[serde(default)]
    pub finals: Option<Vec<String>>,
}

/// Emits a fixed-length symbol sequence from a hidden-Markov chain.
pub struct HiddenMarkovProducer {
    spec: ProducerSpec,
    guard: NodeGuard,
    chain: MarkovChain,
}

impl HiddenMarkovProducer {
    pub fn new(
        name: &str,
        out_kind: ContentKind,
        guard: NodeGuard,
        fixedness: f64,
        chain: MarkovChain,
    ) -> Self {
        HiddenMarkovProducer {
            spec: ProducerSpec {
                name: name.to_string(),
                args: vec![],
                out_kind,
                out_count: Interval::at_least(1),
                dispatch: DispatchMode::PerNode,
                sampling: Sampling::Randomized { batch: BATCH_SIZE },
                fixedness,
                needs: Needs { len: true, ..Needs::default() },
            },
            guard,
            chain,
        }
    }

    fn step(&self, state: &str, rand: &mut Rand) -> Result<String, GenError> {
        let row = self.chain.transitions.get(state).ok_or_else(|| GenError::UnknownTransition {
            table: self.spec.name.clone(),
            state: state.to_string(),
        })?;
        Ok(rand
            .weighted(row)
            .ok_or_else(|| GenError::UnknownTransition {
                table: self.spec.name.clone(),
                state: state.to_string(),
            })?
            .clone())
    }

    fn emit(&self, state: &str, rand: &mut Rand) -> Result<Value, GenError> {
        let symbol = match self.chain.emissions.get(state) {
            Some(row) => rand
                .weighted(row)
                .ok_or_else(|| GenError::UnknownTransition {
                    table: self.spec.name.clone(),
                    state: state.to_string(),
                })?
                .clone(),
            None => state.to_string(),
        };
        emit_value(self.spec.out_kind, &symbol)
    }
}

impl Producer for HiddenMarkovProducer {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn guard(&self, node: &NodeCtx) -> bool {
        self.guard.admits(node)
    }

    fn produce(&self, call: &ProducerCall, rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        let len = call.len.ok_or_else(|| GenError::RuleArgs {
            rule: self.spec.name.clone(),
            detail: "needs a target element count".to_string(),
        })?;
        if len == 0 {
            return Ok(vec![vec![]]);
        }
        let mut fallback: Option<Vec<Value>> = None;
        for _ in 0..ATTEMPTS {
            let mut state = rand
                .weighted(&self.chain.initial)
                .ok_or_else(|| GenError::UnknownTransition {
                    table: self.spec.name.clone(),
                    state: "<initial>".to_string(),
                })?
                .clone();
            let mut emits = Vec::with_capacity(len);
            for i in 0..len {
                emits.push(self.emit(&state, rand)?);
                if i + 1 < len {
                    state = self.step(&state, rand)?;
                }
            }
            let legal = self.chain.finals.as_ref().is_none_or(|f| f.iter().any(|s| *s == state));
            if legal {
                return Ok(vec![emits]);
            }
            fallback.get_or_insert(emits);
        }
        // No legal ending found; the pool still gets the draw, constraints
        // and scorers will judge it.
        match fallback {
            Some(draw) => Ok(vec![draw]),
            None => Err(GenError::Exhausted { rule: self.spec.name.clone(), node: String::new() }),
        }
    }
}

/// Pitch-chain configuration: transition rows over spelled pitch names,
/// initial states, a legal final-state set, and two ambitus clamps (one for
/// the opening pitch, one for the whole line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchChain {
    pub initial: Vec<String>,
    pub transitions: BTreeMap<String, Vec<(String, f64)>>,
    pub finals: Vec<String>,
    pub ambitus: (String, String),
    pub ambitus_initial: (String, String),
}

/// Samples a pitch line from a first-order chain, constrained to the
/// configured ambitus and final-state set, continuing from the committed
/// pitch before the span when there is one.
pub struct PitchMarkovProducer {
    spec: ProducerSpec,
    guard: NodeGuard,
    chain: PitchChain,
    lo: i16,
    hi: i16,
    lo_initial: i16,
    hi_initial: i16,
}

impl PitchMarkovProducer {
    pub fn new(
        name: &str,
        guard: NodeGuard,
        fixedness: f64,
        chain: PitchChain,
    ) -> Result<Self, GenError> {
        let lo = Pitch::parse(&chain.ambitus.0)?.midi();
        let hi = Pitch::parse(&chain.ambitus.1)?.midi();
        let lo_initial = Pitch::parse(&chain.ambitus_initial.0)?.midi();
        let hi_initial = Pitch::parse(&chain.ambitus_initial.1)?.midi();
        Ok(PitchMarkovProducer {
            spec: ProducerSpec {
                name: name.to_string(),
                args: vec![],
                out_kind: ContentKind::Pitch,
                out_count: Interval::at_least(1),
                dispatch: DispatchMode::PerNode,
                sampling: Sampling::Randomized { batch: BATCH_SIZE },
                fixedness,
                needs: Needs { len: true, context: true, ..Needs::default() },
            },
            guard,
            chain,
            lo,
            hi,
            lo_initial,
            hi_initial,
        })
    }

    fn in_ambitus(&self, name: &str) -> bool {
        Pitch::parse(name).map(|p| (self.lo..=self.hi).contains(&p.midi())).unwrap_or(false)
    }

    /// Next state from a row, preferring transitions inside the ambitus.
    fn step(&self, state: &str, rand: &mut Rand) -> Result<String, GenError> {
        let row = self.chain.transitions.get(state).ok_or_else(|| GenError::UnknownTransition {
            table: self.spec.name.clone(),
            state: state.to_string(),
        })?;
        let clamped: Vec<(String, f64)> =
            row.iter().filter(|(s, _)| self.in_ambitus(s)).cloned().collect();
        let table = if clamped.is_empty() { row } else { &clamped };
        Ok(rand
            .weighted(table)
            .ok_or_else(|| GenError::UnknownTransition {
                table: self.spec.name.clone(),
                state: state.to_string(),
            })?
            .clone())
    }

    fn opening(&self, call: &ProducerCall, rand: &mut Rand) -> Result<String, GenError> {
        if let Some(Value::Pitch(prev)) = &call.before {
            if !prev.is_undefined() {
                let name = prev.name();
                if self.chain.transitions.contains_key(&name) {
                    return self.step(&name, rand);
                }
            }
        }
        let openers: Vec<&String> = self
            .chain
            .initial
            .iter()
            .filter(|s| {
                Pitch::parse(s)
                    .map(|p| (self.lo_initial..=self.hi_initial).contains(&p.midi()))
                    .unwrap_or(false)
            })
            .collect();
        let pool: Vec<&String> =
            if openers.is_empty() { self.chain.initial.iter().collect() } else { openers };
        Ok(pool[rand.below(pool.len())].clone())
    }
}

impl Producer for PitchMarkovProducer {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn guard(&self, node: &NodeCtx) -> bool {
        self.guard.admits(node)
    }

    fn produce(&self, call: &ProducerCall, rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        let len = call.len.ok_or_else(|| GenError::RuleArgs {
            rule: self.spec.name.clone(),
            detail: "needs a target element count".to_string(),
        })?;
        if len == 0 {
            return Ok(vec![vec![]]);
        }
        let mut fallback: Option<Vec<Value>> = None;
        for _ in 0..ATTEMPTS {
            let mut state = self.opening(call, rand)?;
            let mut line = Vec::with_capacity(len);
            for i in 0..len {
                line.push(Value::Pitch(Pitch::parse(&state)?));
                if i + 1 < len {
                    state = self.step(&state, rand)?;
                }
            }
            if self.chain.finals.iter().any(|s| *s == state) {
                return Ok(vec![line]);
            }
            fallback.get_or_insert(line);
        }
        match fallback {
            Some(line) => Ok(vec![line]),
            None => Err(GenError::Exhausted { rule: self.spec.name.clone(), node: String::new() }),
        }
    }
}
