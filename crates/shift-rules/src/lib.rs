//! Sound-change rule language for soundshift.
//!
//! Compiles a rule file into one finite-state transducer per rule and
//! applies the rules, in order, to words.
//!
//! ```text
//! V { a e i o u }
//! [voice] { p => b, t => d }
//! [-voice] => [+voice] / V _ V     ; apa -> aba
//! ```
//!
//! # Architecture
//!
//! - [`lexer`] -- Tokenizer and the token cursor the parser reads from
//! - [`parser`] -- Recursive-descent parser producing statements
//! - [`inventory`] -- Declared categories and feature-sets as member sets
//! - [`compiler`] -- Rule AST to annotated NFA
//! - [`machine`] -- One compiled rule (NFA + DFA)
//! - [`ruleset`] -- A compiled rule file, applied word by word with traces
//! - [`error`] -- Error types and per-statement diagnostics

pub mod compiler;
pub mod error;
pub mod inventory;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod ruleset;

pub use error::{Diagnostic, ReferenceKind, RuleError};
pub use inventory::Inventory;
pub use machine::{CompileOptions, RuleMachine};
pub use parser::{Parser, parse};
pub use ruleset::{RuleSet, RuleTrace, WordTrace};
pub use shift_fst::{AppliedTransform, ApplyOptions};
