// Section-final cadence formulas, after (Kelley 2009).
//
// Window-dispatched enumerators: each proposes its full formula set for the
// two-element window that ends a section, and nothing anywhere else. The
// committed formula is fixed permanently — cadences are the anchors the
// surrounding material is regenerated around, never the reverse.

use crate::{Voice, LEVEL_SECTION};
use cantus_engine::error::GenError;
use cantus_engine::music::{Chord, ContentKind, Pitch, Value};
use cantus_engine::rand::Rand;
use cantus_engine::rules::{
    DispatchMode, Interval, Needs, Producer, ProducerCall, ProducerSpec, Sampling, WindowCtx,
};

fn pitch_formulas(mode: &str, voice: Voice) -> Vec<Vec<&'static str>> {
    match (mode, voice.position()) {
        ("major", 0) => vec![vec!["G3", "C3"], vec!["G3", "C4"]],
        ("major", 1) => vec![vec!["D4", "C4"]],
        ("major", 2) => vec![vec!["G4", "G4"]],
        ("major", 3) => vec![vec!["D5", "E5"], vec!["D5", "C5"]],
        (_, 0) => vec![vec!["E3", "A3"], vec!["E3", "A2"], vec!["G3", "A3"]],
        (_, 1) => vec![vec!["B3", "A3"], vec!["D4", "E4"]],
        (_, 2) => vec![vec!["E4", "E4"], vec!["G4", "E4"]],
        _ => vec![vec!["G5", "E5"], vec!["D5", "E5"]],
    }
}

fn chord_formulas(mode: &str) -> Vec<Vec<&'static str>> {
    if mode == "major" {
        vec![vec!["V", "I"]]
    } else {
        vec![vec!["v", "i"], vec!["VII", "i"]]
    }
}

/// Per-voice cadential pitch pairs for the final window of each section.
pub struct CadencePitches {
    spec: ProducerSpec,
    formulas: Vec<Vec<Value>>,
}

impl CadencePitches {
    pub fn new(mode: &str, voice: Voice) -> Result<Self, GenError> {
        let formulas = pitch_formulas(mode, voice)
            .into_iter()
            .map(|f| {
                f.into_iter()
                    .map(|name| Ok(Value::Pitch(Pitch::parse(name)?)))
                    .collect::<Result<Vec<_>, GenError>>()
            })
            .collect::<Result<Vec<_>, GenError>>()?;
        Ok(CadencePitches {
            spec: ProducerSpec {
                name: format!("cadence-pitches-{}", voice.label()),
                args: vec![],
                out_kind: ContentKind::Pitch,
                out_count: Interval::exactly(2),
                dispatch: DispatchMode::PerWindow,
                sampling: Sampling::Enumerate,
                fixedness: 1.0,
                needs: Needs::default(),
            },
            formulas,
        })
    }
}

impl Producer for CadencePitches {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn applies_to(&self, window: &WindowCtx) -> bool {
        window.maps_to(-2, LEVEL_SECTION)
    }

    fn produce(&self, _call: &ProducerCall, _rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        Ok(self.formulas.clone())
    }
}

/// Cadential chord pairs for the final window of each section.
pub struct CadenceChords {
    spec: ProducerSpec,
    formulas: Vec<Vec<Value>>,
}

impl CadenceChords {
    pub fn new(mode: &str) -> Self {
        let formulas = chord_formulas(mode)
            .into_iter()
            .map(|f| f.into_iter().map(|s| Value::Chord(Chord::new(s))).collect())
            .collect();
        CadenceChords {
            spec: ProducerSpec {
                name: "cadence-chords".to_string(),
                args: vec![],
                out_kind: ContentKind::Chord,
                out_count: Interval::exactly(2),
                dispatch: DispatchMode::PerWindow,
                sampling: Sampling::Enumerate,
                fixedness: 1.0,
                needs: Needs::default(),
            },
            formulas,
        }
    }
}

impl Producer for CadenceChords {
    fn spec(&self) -> &ProducerSpec {
        &self.spec
    }

    fn applies_to(&self, window: &WindowCtx) -> bool {
        window.maps_to(-2, LEVEL_SECTION)
    }

    fn produce(&self, _call: &ProducerCall, _rand: &mut Rand) -> Result<Vec<Vec<Value>>, GenError> {
        Ok(self.formulas.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formulas_are_pairs() {
        for mode in ["major", "minor"] {
            for voice in Voice::ALL {
                let p = CadencePitches::new(mode, voice).unwrap();
                let mut rand = Rand::seeded(0);
                for f in p.produce(&ProducerCall::default(), &mut rand).unwrap() {
                    assert_eq!(f.len(), 2);
                }
            }
            let c = CadenceChords::new(mode);
            let mut rand = Rand::seeded(0);
            for f in c.produce(&ProducerCall::default(), &mut rand).unwrap() {
                assert_eq!(f.len(), 2);
            }
        }
    }

    #[test]
    fn test_minor_cadences_land_on_tonic() {
        let c = CadenceChords::new("minor");
        let mut rand = Rand::seeded(0);
        for f in c.produce(&ProducerCall::default(), &mut rand).unwrap() {
            assert_eq!(f[1].as_chord().unwrap().symbol(), "i");
        }
    }
}
