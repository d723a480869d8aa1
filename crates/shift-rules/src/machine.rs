// One compiled rule: the DFA it determinizes to, which keeps the NFA it was
// built from.

use std::fmt;

use shift_core::ast::Rule;
use shift_fst::{AppliedTransform, ApplyOptions, Dfa, MAX_STATE_COUNT, Nfa, determinize};

use crate::compiler::build_nfa;
use crate::error::RuleError;
use crate::inventory::Inventory;

/// Options for compiling rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Upper bound on deterministic states per rule.
    pub max_states: usize,
    /// Drop optional groups at the end of an environment before building.
    /// They never change whether a match exists.
    pub strip_trailing_optionals: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_states: MAX_STATE_COUNT,
            strip_trailing_optionals: true,
        }
    }
}

/// A compiled rule.
///
/// Owns its automata outright; nothing is shared between machines, and
/// [`apply`](Self::apply) takes `&self`, so one machine can serve many
/// threads.
#[derive(Debug, Clone)]
pub struct RuleMachine {
    rule: Rule,
    dfa: Dfa,
}

impl RuleMachine {
    pub fn compile(
        rule: &Rule,
        inventory: &Inventory,
        options: &CompileOptions,
    ) -> Result<Self, RuleError> {
        let nfa = build_nfa(rule, inventory, options.strip_trailing_optionals)?;
        let dfa = determinize(&nfa, options.max_states)?;
        Ok(Self {
            rule: rule.clone(),
            dfa,
        })
    }

    /// Rewrite one word. Returns the result and the transforms applied, in
    /// order.
    pub fn apply(&self, word: &str, options: &ApplyOptions) -> (String, Vec<AppliedTransform>) {
        self.dfa.apply(word, options)
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn nfa(&self) -> &Nfa {
        self.dfa.nfa()
    }

    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }

    pub fn nfa_state_count(&self) -> usize {
        self.nfa().state_count()
    }

    pub fn dfa_state_count(&self) -> usize {
        self.dfa.state_count()
    }

    /// Transform conflicts resolved while merging states.
    pub fn conflicts(&self) -> usize {
        self.dfa.conflicts()
    }
}

impl fmt::Display for RuleMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.rule.fmt(f)
    }
}
