// Engine error type.
//
// Configuration mistakes (mismatched rule capability descriptors, unknown
// viewpoint names) and data-authoring mistakes (missing transition rows,
// unparseable values) are surfaced as distinct variants so callers can stop
// with a precise diagnostic. There is no silent partial output: generation
// either completes or returns one of these.

use crate::music::ContentKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    /// A rule was registered or called with arguments that do not match its
    /// declared capability descriptor. Configuration bug, not recoverable.
    #[error("rule `{rule}`: {detail}")]
    RuleArgs { rule: String, detail: String },

    /// Model wiring error (structure missing, duplicate names, bad order).
    #[error("model configuration: {0}")]
    Config(String),

    /// A value could not be parsed as its content kind.
    #[error("bad {kind} value `{text}`")]
    BadValue { kind: ContentKind, text: String },

    /// A Markov state has no outgoing row in its transition table.
    /// Data-authoring error in the probability tables.
    #[error("no transition from state `{state}` in table `{table}`")]
    UnknownTransition { table: String, state: String },

    #[error("unknown viewpoint `{0}`")]
    UnknownViewpoint(String),

    #[error("unknown node `{0}`")]
    UnknownNode(String),

    /// A follow viewpoint was driven before its lead had generated.
    #[error("viewpoint `{0}` has not been generated yet")]
    NotGenerated(String),

    /// Externally supplied content does not divide exactly into the
    /// structure tree. Unrecoverable: the score and the structure disagree.
    #[error("content does not divide into node `{node}`: {detail}")]
    ContentMismatch { node: String, detail: String },

    /// A producer could not supply any admissible candidate for a span.
    #[error("producer `{rule}` produced no usable candidate for node `{node}`")]
    Exhausted { rule: String, node: String },

    /// No producer applies to a node of a gapless viewpoint.
    #[error("no producer applies to node `{node}` of viewpoint `{viewpoint}`")]
    NoProducer { viewpoint: String, node: String },

    /// Localized regeneration resolved back onto the node that just failed.
    /// Resolving this would need backtracking, which is deliberately not
    /// implemented; the cycle is reported instead of papered over.
    #[error("regeneration of `{node}` converged onto itself; backtracking is not implemented")]
    NeedsBacktracking { node: String },
}
