//! Finite-state engine behind the soundshift rule compiler.
//!
//! The crate knows nothing about the rule grammar. A caller builds an
//! [`nfa::Nfa`] (states, labelled edges, transform annotations), hands it to
//! [`determinize::determinize`], and runs words through the resulting
//! [`determinize::Dfa`] with [`Dfa::apply`](determinize::Dfa::apply).
//!
//! # Architecture
//!
//! - [`state`] -- State arena and the deduplicating merged-state factory
//! - [`trie`] -- Character tries over multi-character segment sets
//! - [`transform`] -- Compiled output annotations and per-run applied records
//! - [`nfa`] -- Nondeterministic transition table with epsilon edges
//! - [`determinize`] -- Subset construction with transform retargeting
//! - [`transducer`] -- Leftmost-longest rewriting of words

pub mod determinize;
pub mod nfa;
pub mod state;
pub mod transducer;
pub mod transform;
pub mod trie;

pub use determinize::{Dfa, determinize};
pub use nfa::Nfa;
pub use state::StateId;
pub use transducer::ApplyOptions;
pub use transform::{AppliedTransform, TransformKind, TransformRule};
pub use trie::SegmentTrie;

/// Error type for automaton construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FstError {
    #[error("determinization exceeded the limit of {limit} states")]
    StateLimit { limit: usize },
    #[error("cannot merge an empty state set")]
    EmptyMerge,
}

/// Default upper bound on the number of deterministic states built for one
/// rule. Subset construction is exponential in the worst case; this keeps a
/// pathological rule from exhausting memory.
pub const MAX_STATE_COUNT: usize = 100_000;
