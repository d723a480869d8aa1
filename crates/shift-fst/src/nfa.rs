// Nondeterministic transition table with epsilon edges and transform
// annotations.

use hashbrown::HashMap;

use shift_core::symbol::Symbol;

use crate::state::{State, StateFactory, StateId};
use crate::transform::{TransformId, TransformKind, TransformRule};

/// Entry state of every automaton.
pub const START: StateId = 0;

/// Dead state: target of disjunction reject edges. Never final, no edges.
pub const ERROR: StateId = 1;

/// A nondeterministic automaton under construction.
///
/// Several edges may leave a state on the same symbol. Edge annotations are
/// keyed by (origin, symbol); a default annotation is keyed by its state and
/// fires when the state is left on a symbol that does not continue the same
/// target unit.
#[derive(Debug, Clone)]
pub struct Nfa {
    states: StateFactory,
    edges: Vec<Vec<(Symbol, StateId)>>,
    transforms: Vec<TransformRule>,
    edge_transforms: HashMap<(StateId, Symbol), TransformId>,
    defaults: HashMap<StateId, TransformId>,
}

impl Default for Nfa {
    fn default() -> Self {
        Self::new()
    }
}

impl Nfa {
    /// Create an automaton holding only the START and ERROR states.
    pub fn new() -> Self {
        let mut nfa = Self {
            states: StateFactory::new(),
            edges: Vec::new(),
            transforms: Vec::new(),
            edge_transforms: HashMap::new(),
            defaults: HashMap::new(),
        };
        nfa.add_state(false);
        nfa.add_state(false);
        nfa
    }

    pub fn add_state(&mut self, in_target: bool) -> StateId {
        let id = self.states.create(in_target);
        self.edges.push(Vec::new());
        id
    }

    pub fn add_edge(&mut self, from: StateId, symbol: Symbol, to: StateId) {
        let out = &mut self.edges[from as usize];
        if !out.contains(&(symbol, to)) {
            out.push((symbol, to));
        }
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.add_edge(from, Symbol::Lambda, to);
    }

    /// Add an edge to the ERROR state.
    pub fn add_reject(&mut self, from: StateId, symbol: Symbol) {
        self.add_edge(from, symbol, ERROR);
    }

    pub fn add_transform(&mut self, rule: TransformRule) -> TransformId {
        self.transforms.push(rule);
        self.transforms.len() - 1
    }

    /// Annotate the edges leaving `from` on `symbol`.
    ///
    /// An ordinary annotation replaces a null one; otherwise the first
    /// annotation stays.
    pub fn attach(&mut self, from: StateId, symbol: Symbol, transform: TransformId) {
        let replace = match self.edge_transforms.get(&(from, symbol)) {
            None => true,
            Some(&existing) => {
                self.transforms[existing].kind == TransformKind::Null
                    && self.transforms[transform].kind == TransformKind::Ordinary
            }
        };
        if replace {
            self.edge_transforms.insert((from, symbol), transform);
        }
    }

    pub fn attach_default(&mut self, state: StateId, transform: TransformId) {
        self.defaults.entry(state).or_insert(transform);
    }

    pub fn set_final(&mut self, id: StateId) {
        self.states.set_final(id, true);
    }

    pub fn is_final(&self, id: StateId) -> bool {
        self.states.is_final(id)
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id)
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Outgoing edges of a state, in insertion order.
    pub fn edges(&self, id: StateId) -> &[(Symbol, StateId)] {
        self.edges.get(id as usize).map_or(&[][..], Vec::as_slice)
    }

    pub fn has_epsilon(&self, id: StateId) -> bool {
        self.edges(id).iter().any(|(s, _)| *s == Symbol::Lambda)
    }

    pub fn has_symbol_edge(&self, id: StateId) -> bool {
        self.edges(id).iter().any(|(s, _)| *s != Symbol::Lambda)
    }

    /// States with a reject edge on `symbol`.
    pub fn rejections(&self, symbol: Symbol) -> Vec<StateId> {
        (0..self.edges.len() as StateId)
            .filter(|&id| self.edges(id).contains(&(symbol, ERROR)))
            .collect()
    }

    pub fn transforms(&self) -> &[TransformRule] {
        &self.transforms
    }

    pub fn transform(&self, id: TransformId) -> Option<&TransformRule> {
        self.transforms.get(id)
    }

    pub fn edge_transform(&self, from: StateId, symbol: Symbol) -> Option<TransformId> {
        self.edge_transforms.get(&(from, symbol)).copied()
    }

    pub fn default_transform(&self, state: StateId) -> Option<TransformId> {
        self.defaults.get(&state).copied()
    }
}
