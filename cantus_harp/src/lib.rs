// Cantus Harp
//
// A homophonic four-voice ruleset in the manner of the Sacred Harp corpus,
// built on the cantus_engine multi-viewpoint generator. Chord functions
// come from corpus-derived hidden Markov tables (Kelley 2016), each voice's
// melody from a per-voice pitch Markov chain with ambitus clamping, section
// cadences from enumerated two-chord/two-pitch formulas (Kelley 2009), and
// the tenor line is finally ornamented with passing and neighbor tones.
//
// Layout:
// - chords.rs: chord-function hidden Markov tables, major and minor
// - melody.rs: per-voice pitch Markov tables (S/A/T/B × major/minor)
// - rhythm.rs: binary and ternary rhythm span tables
// - cadence.rs: section-final cadence enumerators
// - flourish.rs: the ornamentation producer for the fill-in stream
// - lyrics.rs: embedded hymn stanzas with stress marking
// - scorers.rs: the melodic/harmonic constraints and scorers
// - model.rs: structure tree + viewpoint/rule registration
// - main.rs: the `generate` binary

pub mod cadence;
pub mod chords;
pub mod flourish;
pub mod lyrics;
pub mod melody;
pub mod model;
pub mod rhythm;
pub mod scorers;

/// Structural depths of the piece tree.
pub const LEVEL_PIECE: usize = 0;
pub const LEVEL_SECTION: usize = 1;
pub const LEVEL_PHRASE: usize = 2;
pub const LEVEL_MOTIF: usize = 3;

/// The four voices, bottom up, with their cadence-table positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Bass,
    Tenor,
    Alto,
    Soprano,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Bass, Voice::Tenor, Voice::Alto, Voice::Soprano];

    /// Position in the cadence formula tables (bass lowest).
    pub fn position(self) -> usize {
        match self {
            Voice::Bass => 0,
            Voice::Tenor => 1,
            Voice::Alto => 2,
            Voice::Soprano => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Voice::Bass => "B",
            Voice::Tenor => "T",
            Voice::Alto => "A",
            Voice::Soprano => "S",
        }
    }
}
