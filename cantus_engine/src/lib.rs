// Cantus Engine
//
// A hierarchical multi-viewpoint generation engine for multi-voice musical
// content. A piece's sectional structure is known in advance; every stream
// of the piece — rhythm, pitch grids, chords, lyrics, ornamented notes — is
// a "viewpoint" generated independently under shared structure, with
// pluggable producers proposing content, hard constraints filtering it, and
// weighted scorers ranking what survives. Conflicts resolve through
// localized regeneration of the smallest failing sub-range.
//
// Architecture:
// - music.rs: content value types (Duration/Pitch/Chord/Syllable/Note),
//   the tagged Value union, undefined sentinels, diatonic gamut helpers
// - error.rs: the typed error surface (configuration, data authoring,
//   and the explicit needs-backtracking limitation)
// - rand.rs: seeded RNG + weighted choice, the single randomness source
// - index.rs: dual-coordinate addressing (musical time + element position)
// - trees.rs: structure template, refinement-node arena, resizable flat
//   content array, subrange materialization
// - rules.rs: producer/constraint/scorer traits with typed capability
//   descriptors checked at registration
// - producers.rs: generic choice / span-sequence / hidden-Markov /
//   pitch-Markov producers parameterized by immutable table configs
// - generator.rs: the produce → constrain → degrade/regenerate → score →
//   commit lifecycle
// - viewpoint.rs: Lead/Follow streams, structure instantiation, external
//   content loading
// - model.rs: registry and orchestration; generation order is
//   registration order
//
// Generation is single-threaded and deterministic given a seed. The engine
// is a greedy, locally-repairing heuristic, not an exact solver: a run
// either completes or stops with a typed diagnostic.

pub mod error;
pub mod generator;
pub mod index;
pub mod model;
pub mod music;
pub mod producers;
pub mod rand;
pub mod rules;
pub mod trees;
pub mod viewpoint;

pub use error::GenError;
pub use index::Index;
pub use model::Model;
pub use music::{Chord, ContentKind, Duration, Note, Pitch, Syllable, Value};
pub use rules::{ArgSpec, Constraint, DispatchMode, Interval, Producer, Scorer};
pub use trees::{NodeId, RefinementTree, StructureNode};
pub use viewpoint::{Role, ViewPoint, VpId};
