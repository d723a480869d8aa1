// Rule compiler: rule AST -> annotated NFA.
//
// `first` computes the first-symbol sets used to guard disjunctions;
// `builder` walks the rule and emits states, edges and transforms.

pub mod builder;
pub mod first;

pub use builder::{NfaBuilder, build_nfa};
pub use first::{FirstSet, first_of_node, first_of_seq};
