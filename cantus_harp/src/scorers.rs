// Melodic and harmonic constraints and scorers.
//
// Hard rules (constraints): chord-tone membership for the tenor, and no
// doubled parallel motion between voice pairs. Soft rules (scorers):
// chord-tone fit for the outer voices, chord variety, melodic shape,
// voice spacing and crossing preferences, bar-position rhythm sanity, and
// rhythm/lyric stress alignment. Undefined values (rest padding) pass
// constraints and score zero.

use cantus_engine::error::GenError;
use cantus_engine::music::{ContentKind, Value};
use cantus_engine::rules::{ArgSpec, Constraint, EvaluatorSpec, Interval, Scorer};

/// Chord tones per symbol, as pitch-class letters. Starred symbols are
/// extended sonorities.
fn chord_tones(symbol: &str) -> Option<&'static str> {
    Some(match symbol {
        "I" => "ceg",
        "ii" => "dfa",
        "iii" => "egb",
        "IV" => "fac",
        "V" => "gd",
        "vi" => "ace",
        "vii" => "bdf",
        "i" => "ae",
        "iim" => "bdf",
        "III" => "ceg",
        "iv" => "dfa",
        "v" => "egb",
        "VI" => "fac",
        "VII" => "gd",
        "i3" => "ace",
        "v3" => "egb",
        "i8" => "a",
        "*i9" => "aaeb",
        "*III7" => "cegb",
        "*iv9" => "daeb",
        "v8" => "e",
        _ => return None,
    })
}

/// Hard rule: a grid pitch must be a tone of the sounding chord.
pub struct ChordTone {
    spec: EvaluatorSpec,
}

impl ChordTone {
    pub fn new() -> Self {
        ChordTone {
            spec: EvaluatorSpec {
                name: "chord-tone".to_string(),
                args: vec![
                    ArgSpec::new(ContentKind::Pitch, Interval::exactly(1)),
                    ArgSpec::new(ContentKind::Chord, Interval::exactly(1)),
                ],
                allow_outside: false,
            },
        }
    }
}

impl Default for ChordTone {
    fn default() -> Self {
        Self::new()
    }
}

impl Constraint for ChordTone {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn valid(&self, windows: &[&[Value]]) -> Result<bool, GenError> {
        let (Some(pitch), Some(chord)) =
            (windows[0].first().and_then(|v| v.as_pitch()), windows[1].first().and_then(|v| v.as_chord()))
        else {
            return Ok(true);
        };
        if pitch.is_undefined() || chord.is_undefined() {
            return Ok(true);
        }
        let tones = chord_tones(chord.symbol()).ok_or_else(|| GenError::UnknownTransition {
            table: "chord-tones".to_string(),
            state: chord.symbol().to_string(),
        })?;
        Ok(tones.contains(pitch.pc()))
    }
}

/// Soft variant of the chord-tone rule, for the harmonizing voices.
pub struct ChordFit {
    spec: EvaluatorSpec,
}

impl ChordFit {
    pub fn new() -> Self {
        ChordFit {
            spec: EvaluatorSpec {
                name: "chord-fit".to_string(),
                args: vec![
                    ArgSpec::new(ContentKind::Pitch, Interval::exactly(1)),
                    ArgSpec::new(ContentKind::Chord, Interval::exactly(1)),
                ],
                allow_outside: false,
            },
        }
    }
}

impl Default for ChordFit {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for ChordFit {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn score(&self, windows: &[&[Value]]) -> f64 {
        let (Some(pitch), Some(chord)) =
            (windows[0].first().and_then(|v| v.as_pitch()), windows[1].first().and_then(|v| v.as_chord()))
        else {
            return 0.0;
        };
        if pitch.is_undefined() || chord.is_undefined() {
            return 0.0;
        }
        match chord_tones(chord.symbol()) {
            Some(tones) if tones.contains(pitch.pc()) => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }
}

/// Prefer harmonically varied spans with a taste of extended sonorities.
pub struct ChordVariety {
    spec: EvaluatorSpec,
}

impl ChordVariety {
    pub fn new() -> Self {
        ChordVariety {
            spec: EvaluatorSpec {
                name: "chord-variety".to_string(),
                args: vec![ArgSpec::new(ContentKind::Chord, Interval::at_least(1))],
                allow_outside: false,
            },
        }
    }
}

impl Default for ChordVariety {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for ChordVariety {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn score(&self, windows: &[&[Value]]) -> f64 {
        let defined: Vec<&str> = windows[0]
            .iter()
            .filter_map(|v| v.as_chord())
            .filter(|c| !c.is_undefined())
            .map(|c| c.symbol())
            .collect();
        if defined.is_empty() {
            return 0.0;
        }
        let mut distinct: Vec<&str> = defined.clone();
        distinct.sort_unstable();
        distinct.dedup();
        let stars = defined.iter().filter(|s| s.contains('*')).count();
        let mut score = distinct.len() as f64 / defined.len() as f64;
        if (1..=3).contains(&stars) {
            score += 0.5;
        }
        score
    }
}

/// Melodic shape preferences: ambitus bounds, leap recovery by step, and a
/// penalty for note repetition.
pub struct MelodyShape {
    spec: EvaluatorSpec,
    ambitus_low: i16,
    ambitus_high: i16,
    ambitus_good: i16,
}

impl MelodyShape {
    pub fn new(ambitus_low: i16, ambitus_high: i16, ambitus_good: i16) -> Self {
        MelodyShape {
            spec: EvaluatorSpec {
                name: "melody-shape".to_string(),
                args: vec![ArgSpec::new(ContentKind::Pitch, Interval::at_least(1))],
                allow_outside: false,
            },
            ambitus_low,
            ambitus_high,
            ambitus_good,
        }
    }

    /// The wide profile used for tenor and bass lines.
    pub fn broad() -> Self {
        Self::new(5, 14, 7)
    }

    /// The narrower profile used for the inner and top voices.
    pub fn narrow() -> Self {
        Self::new(5, 12, 5)
    }
}

impl Scorer for MelodyShape {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn score(&self, windows: &[&[Value]]) -> f64 {
        let line: Vec<i16> = windows[0]
            .iter()
            .filter_map(|v| v.as_pitch())
            .filter(|p| !p.is_undefined())
            .map(|p| p.midi())
            .collect();
        if line.len() < 2 {
            return 0.0;
        }
        let mut score = 0.0;

        let ambitus = line.iter().max().unwrap() - line.iter().min().unwrap();
        if ambitus < self.ambitus_low || ambitus > self.ambitus_high {
            score -= 1.0;
        } else if ambitus > self.ambitus_good {
            score += 0.5;
        }

        for w in line.windows(3) {
            let (a, b, c) = (w[0], w[1], w[2]);
            // A large leap recovered by a step in the opposite direction.
            if b - a > 7 && (c - b == -1 || c - b == -2) {
                score += 0.2;
            }
            if b - a < -7 && (c - b == 1 || c - b == 2) {
                score += 0.2;
            }
            if a == b && b == c {
                score -= 0.2;
            }
        }
        score
    }
}

/// Motion kind for the pairwise voice-order preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    /// The second voice should stay above the first.
    SecondAbove,
    /// The second voice should stay below the first.
    SecondBelow,
}

/// Prefer a fixed vertical ordering between two voices.
pub struct VoiceOrder {
    spec: EvaluatorSpec,
    side: OrderSide,
}

impl VoiceOrder {
    pub fn new(side: OrderSide) -> Self {
        VoiceOrder {
            spec: EvaluatorSpec {
                name: "voice-order".to_string(),
                args: vec![
                    ArgSpec::new(ContentKind::Pitch, Interval::exactly(1)),
                    ArgSpec::new(ContentKind::Pitch, Interval::exactly(1)),
                ],
                allow_outside: false,
            },
            side,
        }
    }
}

impl Scorer for VoiceOrder {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn score(&self, windows: &[&[Value]]) -> f64 {
        let (Some(a), Some(b)) =
            (windows[0].first().and_then(|v| v.as_pitch()), windows[1].first().and_then(|v| v.as_pitch()))
        else {
            return 0.0;
        };
        if a.is_undefined() || b.is_undefined() {
            return 0.0;
        }
        let interval = a.interval_to(b);
        let ordered = match self.side {
            OrderSide::SecondAbove => interval >= 0,
            OrderSide::SecondBelow => interval <= 0,
        };
        if ordered { 0.2 } else { 0.0 }
    }
}

/// Hard rule: no doubled voices moving in parallel. When two voices sound
/// a unison or octave, they must not then move by the same interval.
pub struct NoParallelDoubling {
    spec: EvaluatorSpec,
}

impl NoParallelDoubling {
    pub fn new() -> Self {
        NoParallelDoubling {
            spec: EvaluatorSpec {
                name: "no-parallel-doubling".to_string(),
                args: vec![
                    ArgSpec::new(ContentKind::Pitch, Interval::exactly(2)),
                    ArgSpec::new(ContentKind::Pitch, Interval::exactly(2)),
                ],
                allow_outside: true,
            },
        }
    }
}

impl Default for NoParallelDoubling {
    fn default() -> Self {
        Self::new()
    }
}

impl Constraint for NoParallelDoubling {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn valid(&self, windows: &[&[Value]]) -> Result<bool, GenError> {
        let line_a: Vec<_> = windows[0].iter().filter_map(|v| v.as_pitch()).collect();
        let line_b: Vec<_> = windows[1].iter().filter_map(|v| v.as_pitch()).collect();
        if line_a.len() < 2 || line_b.len() < 2 {
            return Ok(true);
        }
        if line_a.iter().chain(&line_b).any(|p| p.is_undefined()) {
            return Ok(true);
        }
        if line_a[0].interval_to(line_b[0]).rem_euclid(12) != 0 {
            return Ok(true);
        }
        let step_a = line_a[0].interval_to(line_a[1]);
        let step_b = line_b[0].interval_to(line_b[1]);
        Ok(step_a != step_b || step_a == 0)
    }
}

/// Crossing-count preference between two voices over a span: one or two
/// well-separated crossings are rewarded, more are not.
pub struct VoiceCrossing {
    spec: EvaluatorSpec,
}

impl VoiceCrossing {
    pub fn new() -> Self {
        VoiceCrossing {
            spec: EvaluatorSpec {
                name: "voice-crossing".to_string(),
                args: vec![
                    ArgSpec::new(ContentKind::Pitch, Interval::at_least(1)),
                    ArgSpec::new(ContentKind::Pitch, Interval::at_least(1)),
                ],
                allow_outside: false,
            },
        }
    }

    fn cross_score(crossings: usize) -> f64 {
        match crossings {
            0 => 0.0,
            1 => 0.5,
            2 | 3 => 1.0,
            _ => 0.0,
        }
    }

    fn long_cross_score(long_crossings: usize) -> f64 {
        match long_crossings {
            1..=3 => 1.0,
            _ => 0.0,
        }
    }
}

impl Default for VoiceCrossing {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for VoiceCrossing {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn score(&self, windows: &[&[Value]]) -> f64 {
        let pairs: Vec<(i16, i16)> = windows[0]
            .iter()
            .zip(windows[1].iter())
            .filter_map(|(a, b)| Some((a.as_pitch()?, b.as_pitch()?)))
            .filter(|(a, b)| !a.is_undefined() && !b.is_undefined())
            .map(|(a, b)| (a.midi(), b.midi()))
            .collect();

        let mut crossings = 0;
        let mut long_crossings = 0;
        let mut last_sign = 0i16;
        let mut last_cross = 0usize;
        for (i, (a, b)) in pairs.iter().enumerate() {
            let sign = (b - a).signum();
            if sign != 0 {
                if last_sign != 0 && sign != last_sign {
                    crossings += 1;
                    if i >= last_cross + 3 {
                        long_crossings += 1;
                    }
                    last_cross = i;
                }
                last_sign = sign;
            }
        }
        Self::cross_score(crossings) + Self::long_cross_score(long_crossings)
    }
}

/// Bar-position sanity for a rhythm span: penalize slots that straddle the
/// barline or stretch the second beat, reward short pickups into beat four.
pub struct RhythmMetrics {
    spec: EvaluatorSpec,
    bar: f64,
}

impl RhythmMetrics {
    pub fn new(bar: f64) -> Self {
        RhythmMetrics {
            spec: EvaluatorSpec {
                name: "rhythm-metrics".to_string(),
                args: vec![ArgSpec::new(ContentKind::Duration, Interval::at_least(1))],
                allow_outside: false,
            },
            bar,
        }
    }
}

impl Scorer for RhythmMetrics {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn score(&self, windows: &[&[Value]]) -> f64 {
        let mut score = 0.0;
        let mut pos = 0.0;
        for v in windows[0] {
            let Some(d) = v.as_duration().filter(|d| !d.is_undefined()) else {
                continue;
            };
            let len = d.quarter_length();
            if pos + len > self.bar {
                score -= 0.5;
            }
            if len > 1.0 && pos == 1.0 {
                score -= 0.2;
            }
            if len == 1.0 && d.code() != "4" && pos == self.bar - 1.0 {
                score += 0.2;
            }
            pos = (pos + len) % self.bar;
        }
        if pos == 0.0 || pos == 2.0 {
            score -= 0.5;
        }
        score
    }
}

/// Stress tables: how well a rhythm slot carries a syllable of a given
/// stress class. Keys are rhythm span codes.
const S2: [(&str, f64); 17] = [
    ("1", 2.0),
    ("2", 2.0),
    ("2.", 2.0),
    ("4.", 2.0),
    ("8.", 1.0),
    ("4", 1.0),
    ("8", 0.0),
    ("16", 0.0),
    ("4. 8", 2.0),
    ("8 8", 0.0),
    ("8. 16", 2.0),
    ("8 8 8", 0.0),
    ("8. 16 8", 0.0),
    ("4 8", 0.0),
    ("4 16 16", 0.0),
    ("8 8 16 16", 0.0),
    ("8 16 16 8", 0.0),
];

const S1: [(&str, f64); 17] = [
    ("1", 2.0),
    ("2", 2.0),
    ("2.", 0.0),
    ("4.", 2.0),
    ("8.", 1.0),
    ("4", 1.0),
    ("8", 0.0),
    ("16", 0.0),
    ("4. 8", 1.0),
    ("8 8", 0.0),
    ("8. 16", 1.0),
    ("8 8 8", 0.0),
    ("8. 16 8", 2.0),
    ("4 8", 2.0),
    ("4 16 16", 2.0),
    ("8 8 16 16", 1.0),
    ("8 16 16 8", 2.0),
];

const S0: [(&str, f64); 17] = [
    ("1", 0.0),
    ("2", 0.0),
    ("2.", 0.0),
    ("4.", 1.0),
    ("8.", 0.0),
    ("4", 1.0),
    ("8", 1.0),
    ("16", 1.0),
    ("4. 8", 0.0),
    ("8 8", 1.0),
    ("8. 16", 0.0),
    ("8 8 8", 1.0),
    ("8. 16 8", 0.0),
    ("4 8", 1.0),
    ("4 16 16", 0.0),
    ("8 8 16 16", 1.0),
    ("8 16 16 8", 1.0),
];

/// Stress-aware rhythm/lyric alignment: stressed syllables want long or
/// dotted slots, unstressed syllables want light ones.
pub struct RhythmLyrics {
    spec: EvaluatorSpec,
}

impl RhythmLyrics {
    pub fn new() -> Self {
        RhythmLyrics {
            spec: EvaluatorSpec {
                name: "rhythm-lyrics".to_string(),
                args: vec![
                    ArgSpec::new(ContentKind::Duration, Interval::exactly(1)),
                    ArgSpec::new(ContentKind::Syllable, Interval::exactly(1)),
                ],
                allow_outside: false,
            },
        }
    }

    fn stress_table(syllable: &str) -> &'static [(&'static str, f64); 17] {
        if syllable.contains('!') {
            &S2
        } else if syllable.contains('>')
            || syllable.contains('/')
            || syllable.contains('.')
            || syllable.contains(';')
            || syllable.contains(',')
        {
            &S1
        } else {
            &S0
        }
    }
}

impl Default for RhythmLyrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for RhythmLyrics {
    fn spec(&self) -> &EvaluatorSpec {
        &self.spec
    }

    fn score(&self, windows: &[&[Value]]) -> f64 {
        let (Some(d), Some(s)) = (
            windows[0].first().and_then(|v| v.as_duration()),
            windows[1].first().and_then(|v| v.as_syllable()),
        ) else {
            return 0.0;
        };
        if d.is_undefined() || s.is_undefined() {
            return 0.0;
        }
        let table = Self::stress_table(s.text());
        let code = d.code();
        table.iter().find(|(k, _)| *k == code).map(|(_, v)| *v).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantus_engine::music::{Chord, Duration, Pitch, Syllable};

    fn p(name: &str) -> Value {
        Value::Pitch(Pitch::parse(name).unwrap())
    }

    fn c(symbol: &str) -> Value {
        Value::Chord(Chord::new(symbol))
    }

    #[test]
    fn test_chord_tone_membership() {
        let rule = ChordTone::new();
        assert!(rule.valid(&[&[p("C4")], &[c("I")]]).unwrap());
        assert!(!rule.valid(&[&[p("D4")], &[c("I")]]).unwrap());
        // Accidentals do not change the letter test.
        assert!(rule.valid(&[&[p("G#4")], &[c("I")]]).unwrap());
    }

    #[test]
    fn test_chord_tone_unknown_symbol_raises() {
        let rule = ChordTone::new();
        let err = rule.valid(&[&[p("C4")], &[c("N6")]]);
        assert!(matches!(err, Err(GenError::UnknownTransition { .. })));
    }

    #[test]
    fn test_chord_tone_passes_undefined() {
        let rule = ChordTone::new();
        let u = Value::Chord(Chord::undefined());
        assert!(rule.valid(&[&[p("D4")], &[u]]).unwrap());
    }

    #[test]
    fn test_chord_variety() {
        let rule = ChordVariety::new();
        let varied = [c("i"), c("iv"), c("v"), c("*III7")];
        let dull = [c("i"), c("i"), c("i"), c("i")];
        assert!(rule.score(&[&varied]) > rule.score(&[&dull]));
    }

    #[test]
    fn test_parallel_doubling_detected() {
        let rule = NoParallelDoubling::new();
        // Octave doubling moving in parallel thirds up: invalid.
        let a = [p("C4"), p("E4")];
        let b = [p("C5"), p("E5")];
        assert!(!rule.valid(&[&a, &b]).unwrap());
        // Not doubled: fine.
        let b2 = [p("E5"), p("G5")];
        assert!(rule.valid(&[&a, &b2]).unwrap());
        // Doubled but oblique: fine.
        let b3 = [p("C5"), p("C5")];
        assert!(rule.valid(&[&a, &b3]).unwrap());
    }

    #[test]
    fn test_melody_shape_prefers_leap_recovery() {
        let rule = MelodyShape::broad();
        let recovered = [p("C4"), p("C5"), p("B4"), p("A4")];
        let stuck = [p("C4"), p("C4"), p("C4"), p("C4")];
        assert!(rule.score(&[&recovered]) > rule.score(&[&stuck]));
    }

    #[test]
    fn test_rhythm_lyrics_stress() {
        let rule = RhythmLyrics::new();
        let long = Value::Duration(Duration::parse("2").unwrap());
        let short = Value::Duration(Duration::parse("8 8").unwrap());
        let stressed = Value::Syllable(Syllable::new("!God"));
        let weak = Value::Syllable(Syllable::new("the"));
        assert_eq!(rule.score(&[&[long.clone()], &[stressed.clone()]]), 2.0);
        assert_eq!(rule.score(&[&[short.clone()], &[stressed]]), 0.0);
        assert_eq!(rule.score(&[&[short], &[weak]]), 1.0);
    }

    #[test]
    fn test_voice_order() {
        let rule = VoiceOrder::new(OrderSide::SecondAbove);
        assert_eq!(rule.score(&[&[p("C3")], &[p("C4")]]), 0.2);
        assert_eq!(rule.score(&[&[p("C4")], &[p("C3")]]), 0.0);
    }
}
