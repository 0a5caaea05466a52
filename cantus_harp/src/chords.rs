// Chord-function hidden Markov tables, after (Kelley 2016).
//
// States are tonal functions (T/S/D, plus an anchoring `i` state in major
// that opens and closes progressions); emissions are Roman-numeral chord
// symbols. Starred symbols are extended sonorities the scorers reward in
// moderation.

use cantus_engine::music::ContentKind;
use cantus_engine::producers::{HiddenMarkovProducer, MarkovChain, NodeGuard};
use std::collections::BTreeMap;

fn table(rows: &[(&str, &[(&str, f64)])]) -> BTreeMap<String, Vec<(String, f64)>> {
    rows.iter()
        .map(|(state, row)| {
            (state.to_string(), row.iter().map(|(s, w)| (s.to_string(), *w)).collect())
        })
        .collect()
}

pub fn major_chain() -> MarkovChain {
    MarkovChain {
        initial: vec![("i".to_string(), 1.0)],
        transitions: table(&[
            ("i", &[("i", 0.62), ("T", 0.10), ("S", 0.09), ("D", 0.18)]),
            ("T", &[("i", 0.62), ("T", 0.10), ("S", 0.09), ("D", 0.18)]),
            ("S", &[("i", 0.43), ("T", 0.10), ("S", 0.18), ("D", 0.28)]),
            ("D", &[("i", 0.57), ("T", 0.10), ("S", 0.09), ("D", 0.25)]),
        ]),
        emissions: table(&[
            ("i", &[("I", 1.00)]),
            ("T", &[("vi", 0.22), ("I", 0.78)]),
            ("S", &[("ii", 0.54), ("IV", 0.46)]),
            ("D", &[("iii", 0.21), ("V", 0.72), ("vii", 0.07)]),
        ]),
        finals: Some(vec!["i".to_string()]),
    }
}

pub fn minor_chain() -> MarkovChain {
    MarkovChain {
        initial: vec![("T".to_string(), 1.0)],
        transitions: table(&[
            ("T", &[("T", 0.53), ("S", 0.08), ("D", 0.39)]),
            ("S", &[("T", 0.31), ("S", 0.14), ("D", 0.55)]),
            ("D", &[("T", 0.49), ("S", 0.08), ("D", 0.43)]),
        ]),
        emissions: table(&[
            ("T", &[("i", 1.00)]),
            ("S", &[("iim", 0.19), ("iv", 0.53), ("VI", 0.28)]),
            ("D", &[("III", 0.35), ("v", 0.32), ("VII", 0.33)]),
        ]),
        finals: Some(vec!["T".to_string()]),
    }
}

/// The chord-function producer. Leaf-guarded so it also fills the gaps
/// left beside cadence claims and any regenerated sub-node.
pub fn chords_producer(mode: &str) -> HiddenMarkovProducer {
    let chain = if mode == "major" { major_chain() } else { minor_chain() };
    HiddenMarkovProducer::new(
        "chord-functions",
        ContentKind::Chord,
        NodeGuard::Leaf,
        0.5,
        chain,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantus_engine::rand::Rand;
    use cantus_engine::rules::{Producer, ProducerCall};

    #[test]
    fn test_minor_emits_known_symbols() {
        let p = chords_producer("minor");
        let mut rand = Rand::seeded(4);
        let call = ProducerCall { len: Some(6), ..Default::default() };
        let out = p.produce(&call, &mut rand).unwrap();
        let known = ["i", "iim", "iv", "VI", "III", "v", "VII"];
        for v in &out[0] {
            let symbol = v.as_chord().unwrap().symbol().to_string();
            assert!(known.contains(&symbol.as_str()), "unexpected symbol {symbol}");
        }
    }

    #[test]
    fn test_major_opens_on_tonic() {
        let p = chords_producer("major");
        let mut rand = Rand::seeded(4);
        let call = ProducerCall { len: Some(4), ..Default::default() };
        let out = p.produce(&call, &mut rand).unwrap();
        assert_eq!(out[0][0].as_chord().unwrap().symbol(), "I");
    }
}
