// The flourishing producer: ornaments a rhythm+pitch grid into a note
// stream with passing, neighbor, and jump figures.
//
// Dispatched once per section. Consumes the section's rhythm and tenor
// pitch windows element-wise and emits one Note per grid slot, except where
// a figure fires: there the slot is subdivided (the replacement span always
// sums to the slot's length, so the section's total duration is preserved).
// Only plain quarter slots (dotted quarters in ternary meter) are eligible,
// and the final two slots of a section are always left plain.
//
// Figure thresholds are relative frequencies from the corpus; the ternary
// variants keep the dotted-beat subdivision.

use crate::LEVEL_SECTION;
use cantus_engine::error::GenError;
use cantus_engine::music::{gamut, ContentKind, Duration, Note, Pitch, Value};
use cantus_engine::rand::Rand;
use cantus_engine::rules::{
    ArgSpec, DispatchMode, Interval, Needs, NodeCtx, Producer, ProducerCall, ProducerSpec, Sampling,
};

/// Figure probabilities per eligible slot.
#[derive(Debug, Clone)]
pub struct Figures {
    pub third_passing: f64,
    pub third_16: f64,
    pub same_neighbor_16: f64,
    pub same_neighbor: f64,
    pub second_jump: f64,
    pub second_8_16_16: f64,
    pub fourth_8_16_16: f64,
    pub fifth_jump: f64,
    pub fifth_16: f64,
}

impl Default for Figures {
    fn default() -> Self {
        Figures {
            third_passing: 0.4,
            third_16: 0.1,
            same_neighbor_16: 0.0,
            same_neighbor: 0.1,
            second_jump: 0.2,
            second_8_16_16: 0.1,
            fourth_8_16_16: 0.1,
            fifth_jump: 0.1,
            fifth_16: 0.1,
        }
    }
}

pub struct Flourisher {
    spec: ProducerSpec,
    figures: Figures,
    ternary: bool,
}

impl Flourisher {
    pub fn new(ternary: bool, figures: Figures) -> Self {
        Flourisher {
            spec: ProducerSpec {
                name: "flourisher".to_string(),
                args: vec![
                    ArgSpec::new(ContentKind::Duration, Interval::at_least(1)),
                    ArgSpec::new(ContentKind::Pitch, Interval::at_least(1)),
                ],
                out_kind: ContentKind::Note,
                out_count: Interval::at_least(1),
                dispatch: DispatchMode::PerNode,
                sampling: Sampling::Randomized { batch: 10 },
                fixedness: 0.8,
                needs: Needs::default(),
            },
            figures,
            ternary,
        }
    }

    /// A slot is eligible when it is one plain beat: a quarter, or a
    /// dotted quarter in ternary meter.
    fn eligible(&self, d: &Duration) -> bool {
        d.is_single() && !d.is_undefined() && d.units() == if self.ternary { 6 } else { 4 }
    }

    fn span(&self, binary: &str, ternary: &str) -> Duration {
        let code = if self.ternary { ternary } else { binary };
        Duration::parse(code).unwrap_or_else(|_| Duration::new(1.0))
    }

    /// Ornament one slot, looking ahead to the next grid pitch. Returns the
    /// replacement notes, or the plain note when no figure fires.
    fn flourish(&self, p1: &Pitch, d1: &Duration, p2: &Pitch, rand: &mut Rand) -> Vec<Note> {
        let plain = vec![Note::new(d1.clone(), *p1)];
        if !self.eligible(d1) || p1.is_undefined() || p2.is_undefined() {
            return plain;
        }

        let (span, mut fills): (Duration, Vec<Pitch>) = if gamut::is_fifth_up(p1, p2) {
            if rand.chance(self.figures.fifth_16) {
                (
                    self.span("16 16 16 16", "8 8 16 16"),
                    vec![
                        gamut::toward(p1, p2, 1, rand),
                        gamut::toward(p1, p2, 2, rand),
                        gamut::toward(p1, p2, 3, rand),
                    ],
                )
            } else if rand.chance(self.figures.fifth_jump) {
                (self.span("8 8", "4 8"), vec![gamut::toward(p1, p2, 2, rand)])
            } else {
                return plain;
            }
        } else if gamut::is_fourth(p1, p2) {
            if rand.chance(self.figures.fourth_8_16_16) {
                (
                    self.span("8 16 16", "8 8 8"),
                    vec![gamut::toward(p1, p2, 1, rand), gamut::toward(p1, p2, 2, rand)],
                )
            } else {
                return plain;
            }
        } else if gamut::is_third(p1, p2) {
            if rand.chance(self.figures.third_16) {
                (
                    self.span("16 16 16 16", "8 8 16 16"),
                    vec![gamut::toward(p1, p2, 1, rand), *p2, gamut::toward(p1, p2, 3, rand)],
                )
            } else if rand.chance(self.figures.third_passing) {
                (self.span("8 8", "4 8"), vec![gamut::passing(p1, p2)])
            } else {
                return plain;
            }
        } else if p1 == p2 {
            if rand.chance(self.figures.same_neighbor_16) {
                let dir = if rand.chance(0.5) { 1 } else { -1 };
                let mid = if rand.chance(0.5) { Pitch::from_gamut(p1.gamut() + dir * 2) } else { *p1 };
                (
                    self.span("16 16 16 16", "8 8 16 16"),
                    vec![Pitch::from_gamut(p1.gamut() + dir), mid, Pitch::from_gamut(p1.gamut() + dir)],
                )
            } else if rand.chance(self.figures.same_neighbor) {
                (self.span("8 8", "4 8"), vec![gamut::neighbor(p1, rand)])
            } else {
                return plain;
            }
        } else if gamut::is_second(p1, p2) {
            if rand.chance(self.figures.second_jump) {
                (self.span("8 8", "4 8"), vec![gamut::toward(p1, p2, 2, rand)])
            } else if rand.chance(self.figures.second_8_16_16) {
                (self.span("8 16 16", "8 8 8"), vec![*p2, gamut::toward(p1, p2, 2, rand)])
            } else {
                return plain;
            }
        } else {
            return plain;
        };

        // One note per subdivision: the grid pitch first, then the fills.
        let mut pitches = vec![*p1];
        pitches.append(&mut fills);
        let parts = span.parts().to_vec();
        if parts.len() != pitches.len() {
            return plain;
        }
        parts
            .into_iter()
            .zip(pitches)
            .map(|(units, p)| Note::new(Duration::new(units as f64 / 4.0), p))
            .collect()
    }
}

impl Producer for Flourisher {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn guard(&self, node: &NodeCtx) -> bool {
        node.depth() == LEVEL_SECTION
    }

    fn produce(&self, call: &ProducerCall, rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        let rhy = call.arg(0, &self.spec.name)?;
        let mel = call.arg(1, &self.spec.name)?;
        if rhy.len() != mel.len() {
            return Err(GenError::RuleArgs {
                rule: self.spec.name.clone(),
                detail: format!("rhythm ({}) and pitch ({}) windows differ", rhy.len(), mel.len()),
            });
        }

        let mut out: Vec<Value> = vec![];
        for i in 0..rhy.len() {
            let d = rhy[i].as_duration().ok_or_else(|| GenError::RuleArgs {
                rule: self.spec.name.clone(),
                detail: "argument 0 is not a duration window".to_string(),
            })?;
            let p = mel[i].as_pitch().ok_or_else(|| GenError::RuleArgs {
                rule: self.spec.name.clone(),
                detail: "argument 1 is not a pitch window".to_string(),
            })?;

            // Melisma slots and the last two grid slots stay plain.
            let notes = if i + 2 < rhy.len() && d.is_single() {
                match mel[i + 1].as_pitch() {
                    Some(p2) => self.flourish(p, d, p2, rand),
                    None => vec![Note::new(d.clone(), *p)],
                }
            } else if d.is_single() {
                vec![Note::new(d.clone(), *p)]
            } else {
                // A melisma span becomes one note per subdivision.
                d.parts()
                    .iter()
                    .map(|&units| Note::new(Duration::new(units as f64 / 4.0), *p))
                    .collect()
            };
            out.extend(notes.into_iter().map(Value::Note));
        }
        Ok(vec![out])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations(codes: &[&str]) -> Vec<Value> {
        codes.iter().map(|c| Value::Duration(Duration::parse(c).unwrap())).collect()
    }

    fn pitches(names: &[&str]) -> Vec<Value> {
        names.iter().map(|n| Value::Pitch(Pitch::parse(n).unwrap())).collect()
    }

    fn total(values: &[Value]) -> f64 {
        values.iter().map(|v| v.quarter_length().unwrap()).sum()
    }

    #[test]
    fn test_flourish_preserves_total_duration() {
        let always = Figures {
            third_passing: 1.0,
            third_16: 1.0,
            same_neighbor_16: 1.0,
            same_neighbor: 1.0,
            second_jump: 1.0,
            second_8_16_16: 1.0,
            fourth_8_16_16: 1.0,
            fifth_jump: 1.0,
            fifth_16: 1.0,
        };
        let f = Flourisher::new(false, always);
        let mut rand = Rand::seeded(12);
        let call = ProducerCall {
            args: vec![
                durations(&["4", "4", "4", "4", "2"]),
                pitches(&["C4", "E4", "F4", "G4", "C5"]),
            ],
            ..Default::default()
        };
        for _ in 0..10 {
            let out = f.produce(&call, &mut rand).unwrap();
            assert_eq!(total(&out[0]), 6.0);
            assert!(out[0].len() >= 5);
        }
    }

    #[test]
    fn test_no_figures_yields_plain_notes() {
        let none = Figures {
            third_passing: 0.0,
            third_16: 0.0,
            same_neighbor_16: 0.0,
            same_neighbor: 0.0,
            second_jump: 0.0,
            second_8_16_16: 0.0,
            fourth_8_16_16: 0.0,
            fifth_jump: 0.0,
            fifth_16: 0.0,
        };
        let f = Flourisher::new(false, none);
        let mut rand = Rand::seeded(12);
        let call = ProducerCall {
            args: vec![durations(&["4", "4", "2"]), pitches(&["C4", "D4", "C4"])],
            ..Default::default()
        };
        let out = f.produce(&call, &mut rand).unwrap();
        assert_eq!(out[0].len(), 3);
        assert_eq!(total(&out[0]), 4.0);
    }

    #[test]
    fn test_melisma_slot_splits_per_subdivision() {
        let f = Flourisher::new(false, Figures::default());
        let mut rand = Rand::seeded(1);
        let call = ProducerCall {
            args: vec![durations(&["8 8", "4", "2"]), pitches(&["C4", "D4", "C4"])],
            ..Default::default()
        };
        let out = f.produce(&call, &mut rand).unwrap();
        // The "8 8" slot becomes two eighth notes on the same pitch.
        let first = out[0][0].as_note().unwrap();
        let second = out[0][1].as_note().unwrap();
        assert_eq!(first.quarter_length(), 0.5);
        assert_eq!(second.quarter_length(), 0.5);
        assert_eq!(first.pitch, second.pitch);
        assert_eq!(total(&out[0]), 4.0);
    }

    #[test]
    fn test_mismatched_windows_are_an_error() {
        let f = Flourisher::new(false, Figures::default());
        let mut rand = Rand::seeded(1);
        let call = ProducerCall {
            args: vec![durations(&["4", "4"]), pitches(&["C4"])],
            ..Default::default()
        };
        assert!(matches!(
            f.produce(&call, &mut rand),
            Err(GenError::RuleArgs { .. })
        ));
    }
}
