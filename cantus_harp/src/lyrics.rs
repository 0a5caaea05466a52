// Embedded hymn stanzas and the lyric producer.
//
// Verse lines are stored hyphenated; syllabification splits each word at
// its hyphens, keeping a leading `-` on continuation syllables. Words from
// the stress list get a `!` marker so the rhythm-stress scorer can keep
// them off weak beats. Each motif leaf of the structure receives one verse
// line.

use cantus_engine::music::{ContentKind, Syllable, Value};
use cantus_engine::producers::{ChoiceProducer, NodeGuard};

pub const STRESS_WORDS: [&str; 4] = ["Lord", "God", "Christ", "Son"];

/// First-stanza verse lines, hyphenated. Public-domain hymnody.
const VERSES: [&str; 8] = [
    "A-maz-ing grace, how sweet the sound,",
    "that saved a wretch like me!",
    "Oh God, our help in a-ges past,",
    "our hope for years to come;",
    "Come, thou fount of ev-ery bless-ing,",
    "tune my heart to sing thy grace.",
    "Glo-rious things of thee are spo-ken,",
    "Lord, whose word can-not be bro-ken.",
];

/// Split one verse line into marked syllables.
pub fn syllabify(line: &str) -> Vec<Syllable> {
    let mut out = vec![];
    for word in line.split_whitespace() {
        let stressed = STRESS_WORDS.iter().any(|w| word.contains(w));
        for (i, piece) in word.split('-').filter(|p| !p.is_empty()).enumerate() {
            let mut text = String::new();
            if i > 0 {
                text.push('-');
            } else if stressed {
                text.push('!');
            }
            text.push_str(piece);
            out.push(Syllable::new(&text));
        }
    }
    out
}

/// The lyric producer: one verse line per motif leaf.
pub fn lyrics_producer() -> ChoiceProducer {
    let choices = VERSES
        .iter()
        .map(|line| {
            let values: Vec<Value> =
                syllabify(line).into_iter().map(Value::Syllable).collect();
            (values, 1.0)
        })
        .collect();
    ChoiceProducer::new("verse-lines", ContentKind::Syllable, NodeGuard::Leaf, 1.0, choices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syllabify_continuations() {
        let syls = syllabify("A-maz-ing grace,");
        let texts: Vec<&str> = syls.iter().map(|s| s.text()).collect();
        assert_eq!(texts, vec!["A", "-maz", "-ing", "grace,"]);
        assert!(syls[1].is_continuation());
    }

    #[test]
    fn test_stress_marking() {
        let syls = syllabify("Oh God, our help");
        assert_eq!(syls[1].text(), "!God,");
        assert_eq!(syls[0].text(), "Oh");
    }

    #[test]
    fn test_all_verses_syllabify() {
        for line in VERSES {
            assert!(!syllabify(line).is_empty());
        }
    }
}
