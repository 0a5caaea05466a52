// Rhythm span tables, binary and ternary meter.
//
// Each entry is one grid slot: a single length or a short melisma span.
// The closing tables favor long finals so phrases settle. Weights are
// corpus-flavored relative frequencies, not probabilities.

use cantus_engine::error::GenError;
use cantus_engine::producers::{NodeGuard, SpanSequenceProducer, SpanTable};

pub fn binary_table() -> SpanTable {
    SpanTable {
        items: vec![
            ("2".into(), 0.03),
            ("4".into(), 0.7),
            ("8 8".into(), 0.20),
            ("8. 16".into(), 0.05),
            ("4. 8".into(), 0.05),
        ],
        items_last: vec![("2".into(), 0.8), ("4".into(), 0.5)],
    }
}

pub fn ternary_table() -> SpanTable {
    SpanTable {
        items: vec![
            ("2.".into(), 0.03),
            ("4.".into(), 0.30),
            ("4 8".into(), 0.20),
            ("8 8 8".into(), 0.10),
            ("4 16 16".into(), 0.05),
            ("8 8 16 16".into(), 0.05),
            ("8 16 16 8".into(), 0.02),
            ("8. 16 8".into(), 0.10),
        ],
        items_last: vec![("2.".into(), 0.8), ("4.".into(), 0.5)],
    }
}

/// The rhythm producer: fills each leaf's span exactly. Guarding on leaves
/// (not a fixed depth) keeps the producer applicable to sub-nodes grown by
/// claims or regeneration.
pub fn rhythm_producer(ternary: bool) -> Result<SpanSequenceProducer, GenError> {
    let table = if ternary { ternary_table() } else { binary_table() };
    SpanSequenceProducer::new("rhythm", NodeGuard::Leaf, 0.5, &table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantus_engine::music::Duration;

    #[test]
    fn test_tables_parse() {
        for table in [binary_table(), ternary_table()] {
            for (code, _) in table.items.iter().chain(&table.items_last) {
                assert!(Duration::parse(code).is_ok(), "bad span {code}");
            }
        }
    }

    #[test]
    fn test_ternary_spans_are_dotted_multiples() {
        for (code, _) in ternary_table().items {
            let d = Duration::parse(&code).unwrap();
            assert_eq!(d.units() % 6, 0, "span {code} does not fill dotted beats");
        }
    }
}
