// Content value types: the atoms that viewpoints generate.
//
// Every viewpoint owns a flat array of one content kind — durations for a
// rhythm grid, pitches for a melody grid, chord symbols, lyric syllables, or
// full notes for an ornamented stream. All kinds share two conventions:
// - a reserved "undefined" value, used to pad intervals that generation has
//   not reached yet (and rest sections that it never will);
// - for temporal kinds (Duration, Note), a `quarter_length()` accessor, the
//   basis of the musical-time coordinate system.
//
// A `Value` is the tagged union over the five kinds; rules receive and emit
// `Value` windows, and registration checks kinds up front so a rule never
// sees a window of the wrong kind at run time.
//
// The diatonic gamut helpers at the bottom support non-chord-tone
// construction (passing and neighbor notes) for flourishing producers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sixteenth-note units per quarter note. All durations are stored in
/// sixteenth units, so every supported value is exact (no float drift).
pub const UNITS_PER_QUARTER: u32 = 4;

/// The five content kinds a viewpoint can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Duration,
    Pitch,
    Chord,
    Syllable,
    Note,
}

impl ContentKind {
    /// Temporal kinds carry their own musical length; the others sit on a
    /// grid whose lengths come from a lead viewpoint.
    pub fn is_temporal(self) -> bool {
        matches!(self, ContentKind::Duration | ContentKind::Note)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentKind::Duration => "duration",
            ContentKind::Pitch => "pitch",
            ContentKind::Chord => "chord",
            ContentKind::Syllable => "syllable",
            ContentKind::Note => "note",
        };
        f.write_str(s)
    }
}

/// A rhythm-grid duration: one or more note lengths filling a grid slot.
///
/// A slot is usually a single length (`4`, `8.`) but may be a span of
/// several (`8 8`, `8. 16 16 16`) when one grid position carries a melisma
/// figure. Parts are in sixteenth units. The undefined value keeps its span
/// length so rest sections still occupy musical time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Duration {
    parts: Vec<u32>,
    undefined: bool,
}

impl Duration {
    /// A single duration of the given quarter length. Must be a multiple of
    /// a sixteenth note.
    pub fn new(quarters: f64) -> Self {
        let units = (quarters * UNITS_PER_QUARTER as f64).round() as u32;
        Duration { parts: vec![units], undefined: false }
    }

    /// The undefined sentinel, zero-length.
    pub fn undefined() -> Self {
        Duration { parts: vec![], undefined: true }
    }

    /// An undefined value that still spans musical time — used to pad rest
    /// sections with their beat duration.
    pub fn undefined_spanning(quarters: f64) -> Self {
        let units = (quarters * UNITS_PER_QUARTER as f64).round() as u32;
        Duration { parts: vec![units], undefined: true }
    }

    /// Parse a rhythm code: whitespace-separated note lengths, American
    /// shorthand with dots (`"4"`, `"8."`, `"8 8"`, `"8. 16 16 16"`).
    pub fn parse(code: &str) -> Result<Self, crate::error::GenError> {
        let mut parts = Vec::new();
        for piece in code.split_whitespace() {
            parts.push(part_units(piece)?);
        }
        if parts.is_empty() {
            return Err(crate::error::GenError::BadValue {
                kind: ContentKind::Duration,
                text: code.to_string(),
            });
        }
        Ok(Duration { parts, undefined: false })
    }

    pub fn is_undefined(&self) -> bool {
        self.undefined
    }

    /// Total length in sixteenth units.
    pub fn units(&self) -> u32 {
        self.parts.iter().sum()
    }

    /// Total length in quarter notes.
    pub fn quarter_length(&self) -> f64 {
        self.units() as f64 / UNITS_PER_QUARTER as f64
    }

    /// The individual note lengths of this slot, in sixteenth units.
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    /// True if the slot is one plain note length.
    pub fn is_single(&self) -> bool {
        self.parts.len() == 1
    }

    /// Render back to the rhythm code this was parsed from.
    pub fn code(&self) -> String {
        self.parts
            .iter()
            .map(|&u| part_code(u))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.undefined {
            write!(f, "~{}", self.quarter_length())
        } else {
            f.write_str(&self.code())
        }
    }
}

fn part_units(code: &str) -> Result<u32, crate::error::GenError> {
    let units = match code {
        "1." => 24,
        "1" => 16,
        "2." => 12,
        "2" => 8,
        "4." => 6,
        "4" => 4,
        "8." => 3,
        "8" => 2,
        "16" => 1,
        _ => {
            return Err(crate::error::GenError::BadValue {
                kind: ContentKind::Duration,
                text: code.to_string(),
            });
        }
    };
    Ok(units)
}

fn part_code(units: u32) -> String {
    match units {
        24 => "1.".into(),
        16 => "1".into(),
        12 => "2.".into(),
        8 => "2".into(),
        6 => "4.".into(),
        4 => "4".into(),
        3 => "8.".into(),
        2 => "8".into(),
        1 => "16".into(),
        _ => format!("u{units}"),
    }
}

/// A notated pitch: diatonic step, chromatic alteration, octave.
///
/// Spelled like `"C4"`, `"F#5"`, `"B-4"` (`-` is flat), matching the pitch
/// names probability tables are written in. Middle C is C4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    step: u8,
    alter: i8,
    octave: i8,
    undefined: bool,
}

const STEP_LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];
const STEP_SEMITONES: [i16; 7] = [0, 2, 4, 5, 7, 9, 11];

impl Pitch {
    pub fn undefined() -> Self {
        Pitch { step: 0, alter: 0, octave: 0, undefined: true }
    }

    /// Parse a spelled pitch name (`"C4"`, `"F#5"`, `"B-4"`).
    pub fn parse(name: &str) -> Result<Self, crate::error::GenError> {
        let bad = || crate::error::GenError::BadValue {
            kind: ContentKind::Pitch,
            text: name.to_string(),
        };
        let mut chars = name.chars();
        let letter = chars.next().ok_or_else(bad)?.to_ascii_uppercase();
        let step = STEP_LETTERS.iter().position(|&c| c == letter).ok_or_else(bad)? as u8;
        let rest: String = chars.collect();
        let (alter, octave_str) = match rest.chars().next() {
            Some('#') => (1i8, &rest[1..]),
            Some('-') if rest.len() > 1 => (-1i8, &rest[1..]),
            _ => (0i8, rest.as_str()),
        };
        let octave: i8 = octave_str.parse().map_err(|_| bad())?;
        Ok(Pitch { step, alter, octave, undefined: false })
    }

    pub fn is_undefined(&self) -> bool {
        self.undefined
    }

    /// MIDI note number (C4 = 60).
    pub fn midi(&self) -> i16 {
        (self.octave as i16 + 1) * 12 + STEP_SEMITONES[self.step as usize] + self.alter as i16
    }

    /// Pitch-class letter, lowercase, ignoring alteration. Chord-tone tables
    /// are written in plain letters, so membership tests use this.
    pub fn pc(&self) -> char {
        STEP_LETTERS[self.step as usize].to_ascii_lowercase()
    }

    /// Diatonic gamut index: 7 steps per octave, ignoring alteration.
    /// Two pitches a third apart differ by 2 regardless of quality.
    pub fn gamut(&self) -> i32 {
        self.octave as i32 * 7 + self.step as i32
    }

    /// The natural pitch at a diatonic gamut index.
    pub fn from_gamut(gamut: i32) -> Self {
        let octave = gamut.div_euclid(7) as i8;
        let step = gamut.rem_euclid(7) as u8;
        Pitch { step, alter: 0, octave, undefined: false }
    }

    /// Chromatic interval to another pitch, in semitones (positive = up).
    pub fn interval_to(&self, other: &Pitch) -> i16 {
        other.midi() - self.midi()
    }

    pub fn name(&self) -> String {
        let alter = match self.alter {
            1 => "#",
            -1 => "-",
            _ => "",
        };
        format!("{}{}{}", STEP_LETTERS[self.step as usize], alter, self.octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.undefined {
            f.write_str("~")
        } else {
            f.write_str(&self.name())
        }
    }
}

/// A chord-function symbol (`I`, `ii`, `V`, `iv`, `*III7`, ...). Purely
/// symbolic at the engine level; rulesets give symbols meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chord {
    symbol: String,
}

impl Chord {
    pub fn new(symbol: &str) -> Self {
        Chord { symbol: symbol.to_string() }
    }

    pub fn undefined() -> Self {
        Chord { symbol: String::new() }
    }

    pub fn is_undefined(&self) -> bool {
        self.symbol.is_empty()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() { f.write_str("~") } else { f.write_str(&self.symbol) }
    }
}

/// One lyric syllable, with reserved marker characters kept inline:
/// `!` stressed word, `>` secondary stress, leading `-` continuation of the
/// previous word, `/` `.` `;` `,` phrase and clause punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Syllable {
    text: String,
}

impl Syllable {
    pub fn new(text: &str) -> Self {
        Syllable { text: text.to_string() }
    }

    pub fn undefined() -> Self {
        Syllable { text: String::new() }
    }

    pub fn is_undefined(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True if this syllable continues the previous word (leading `-`).
    pub fn is_continuation(&self) -> bool {
        self.text.starts_with('-')
    }

    /// The syllable with all marker characters stripped, for display.
    pub fn clean(&self) -> String {
        self.text
            .chars()
            .filter(|c| !matches!(c, '!' | '>' | '/' | '.' | ';' | ','))
            .collect()
    }
}

impl fmt::Display for Syllable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() { f.write_str("~") } else { f.write_str(&self.text) }
    }
}

/// A sounding note: duration plus pitch, the element of ornamented streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub duration: Duration,
    pub pitch: Pitch,
}

impl Note {
    pub fn new(duration: Duration, pitch: Pitch) -> Self {
        Note { duration, pitch }
    }

    pub fn undefined() -> Self {
        Note { duration: Duration::undefined(), pitch: Pitch::undefined() }
    }

    pub fn is_undefined(&self) -> bool {
        self.duration.is_undefined() || self.pitch.is_undefined()
    }

    pub fn quarter_length(&self) -> f64 {
        self.duration.quarter_length()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pitch, self.duration)
    }
}

/// The tagged union over all content kinds. Viewpoint arrays, producer
/// candidates, and rule windows are all `Value` sequences; the kind is
/// checked once at registration, not per element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Duration(Duration),
    Pitch(Pitch),
    Chord(Chord),
    Syllable(Syllable),
    Note(Note),
}

impl Value {
    pub fn kind(&self) -> ContentKind {
        match self {
            Value::Duration(_) => ContentKind::Duration,
            Value::Pitch(_) => ContentKind::Pitch,
            Value::Chord(_) => ContentKind::Chord,
            Value::Syllable(_) => ContentKind::Syllable,
            Value::Note(_) => ContentKind::Note,
        }
    }

    /// The undefined sentinel of a kind.
    pub fn undefined(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Duration => Value::Duration(Duration::undefined()),
            ContentKind::Pitch => Value::Pitch(Pitch::undefined()),
            ContentKind::Chord => Value::Chord(Chord::undefined()),
            ContentKind::Syllable => Value::Syllable(Syllable::undefined()),
            ContentKind::Note => Value::Note(Note::undefined()),
        }
    }

    pub fn is_undefined(&self) -> bool {
        match self {
            Value::Duration(d) => d.is_undefined(),
            Value::Pitch(p) => p.is_undefined(),
            Value::Chord(c) => c.is_undefined(),
            Value::Syllable(s) => s.is_undefined(),
            Value::Note(n) => n.is_undefined(),
        }
    }

    /// Musical length for temporal kinds, `None` for grid-bound kinds.
    pub fn quarter_length(&self) -> Option<f64> {
        match self {
            Value::Duration(d) => Some(d.quarter_length()),
            Value::Note(n) => Some(n.quarter_length()),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<&Duration> {
        match self {
            Value::Duration(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_pitch(&self) -> Option<&Pitch> {
        match self {
            Value::Pitch(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_chord(&self) -> Option<&Chord> {
        match self {
            Value::Chord(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_syllable(&self) -> Option<&Syllable> {
        match self {
            Value::Syllable(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Value::Note(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Duration(d) => d.fmt(f),
            Value::Pitch(p) => p.fmt(f),
            Value::Chord(c) => c.fmt(f),
            Value::Syllable(s) => s.fmt(f),
            Value::Note(n) => n.fmt(f),
        }
    }
}

/// Diatonic gamut helpers for non-chord-tone construction.
///
/// These work on gamut indices (7 per octave, alteration ignored), so a
/// "third" is any pitch two letter steps away. Flourishing producers use
/// them to build passing and neighbor notes between grid pitches.
pub mod gamut {
    use super::Pitch;
    use crate::rand::Rand;

    pub fn is_second(a: &Pitch, b: &Pitch) -> bool {
        (b.gamut() - a.gamut()).abs() == 1
    }

    pub fn is_third(a: &Pitch, b: &Pitch) -> bool {
        (b.gamut() - a.gamut()).abs() == 2
    }

    pub fn is_fourth(a: &Pitch, b: &Pitch) -> bool {
        (b.gamut() - a.gamut()).abs() == 3
    }

    pub fn is_fifth_up(a: &Pitch, b: &Pitch) -> bool {
        b.gamut() - a.gamut() == 4
    }

    /// The natural pitch halfway between a third.
    pub fn passing(a: &Pitch, b: &Pitch) -> Pitch {
        Pitch::from_gamut((a.gamut() + b.gamut()) / 2)
    }

    /// A step up or down from `a`, at random.
    pub fn neighbor(a: &Pitch, rand: &mut Rand) -> Pitch {
        let dir = if rand.chance(0.5) { 1 } else { -1 };
        Pitch::from_gamut(a.gamut() + dir)
    }

    /// Melodic direction from `a` to `b` (+1/-1); ties broken at random.
    pub fn direction(a: &Pitch, b: &Pitch, rand: &mut Rand) -> i32 {
        match b.gamut().cmp(&a.gamut()) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => {
                if rand.chance(0.5) {
                    1
                } else {
                    -1
                }
            }
        }
    }

    /// Project `a` by `steps` gamut steps toward `b`.
    pub fn toward(a: &Pitch, b: &Pitch, steps: i32, rand: &mut Rand) -> Pitch {
        Pitch::from_gamut(a.gamut() + direction(a, b, rand) * steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_parse_and_length() {
        assert_eq!(Duration::parse("4").unwrap().quarter_length(), 1.0);
        assert_eq!(Duration::parse("8.").unwrap().quarter_length(), 0.75);
        assert_eq!(Duration::parse("2.").unwrap().quarter_length(), 3.0);
        let span = Duration::parse("8 8 16 16").unwrap();
        assert_eq!(span.quarter_length(), 1.5);
        assert_eq!(span.parts(), &[2, 2, 1, 1]);
        assert!(!span.is_single());
        assert_eq!(span.code(), "8 8 16 16");
    }

    #[test]
    fn test_duration_undefined_spans_time() {
        let rest = Duration::undefined_spanning(6.0);
        assert!(rest.is_undefined());
        assert_eq!(rest.quarter_length(), 6.0);
    }

    #[test]
    fn test_pitch_parse() {
        let c4 = Pitch::parse("C4").unwrap();
        assert_eq!(c4.midi(), 60);
        assert_eq!(c4.pc(), 'c');

        let fs5 = Pitch::parse("F#5").unwrap();
        assert_eq!(fs5.midi(), 78);
        assert_eq!(fs5.name(), "F#5");

        let bb4 = Pitch::parse("B-4").unwrap();
        assert_eq!(bb4.midi(), 70);
        assert_eq!(bb4.pc(), 'b');

        assert!(Pitch::parse("H2").is_err());
    }

    #[test]
    fn test_gamut_intervals() {
        let c4 = Pitch::parse("C4").unwrap();
        let e4 = Pitch::parse("E4").unwrap();
        let g4 = Pitch::parse("G4").unwrap();
        assert!(gamut::is_third(&c4, &e4));
        assert!(gamut::is_fifth_up(&c4, &g4));
        assert_eq!(gamut::passing(&c4, &e4).name(), "D4");
    }

    #[test]
    fn test_value_kind_and_sentinel() {
        let v = Value::undefined(ContentKind::Chord);
        assert!(v.is_undefined());
        assert_eq!(v.kind(), ContentKind::Chord);
        assert_eq!(v.quarter_length(), None);

        let d = Value::Duration(Duration::parse("4.").unwrap());
        assert_eq!(d.quarter_length(), Some(1.5));
    }

    #[test]
    fn test_syllable_markers() {
        let s = Syllable::new("!Lord,");
        assert!(!s.is_continuation());
        assert_eq!(s.clean(), "Lord");
        assert!(Syllable::new("-ing").is_continuation());
    }
}
