// Subset construction: NFA -> deterministic transition table.
//
// Every deterministic state is a set of NFA states closed under epsilon
// moves. Sets of one state keep that state's id; larger sets get a merged id
// from the `MergedStateFactory`. When a state is first reached its
// constituents' transform annotations are retargeted onto it.
//
// The retargeted annotations describe the merged state as a whole and are
// where clashes get counted. They cannot tell a target path from a context
// path that shares a symbol, so the runtime settles output on the NFA path
// that accepted (see `transducer.rs`); the source NFA travels with the table
// for that reason.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hashbrown::{HashMap, HashSet};

use shift_core::symbol::Symbol;

use crate::FstError;
use crate::nfa::{Nfa, START};
use crate::state::{MergedStateFactory, StateId};
use crate::transform::{TransformId, TransformKind, TransformRule};

/// A deterministic transducer: at most one target per (state, symbol).
#[derive(Debug, Clone)]
pub struct Dfa {
    nfa: Nfa,
    start: StateId,
    /// Reachable states in discovery order.
    states: Vec<StateId>,
    seen: HashSet<StateId>,
    finals: HashSet<StateId>,
    table: HashMap<(StateId, Symbol), StateId>,
    transforms: Vec<TransformRule>,
    edge_transforms: HashMap<(StateId, Symbol), TransformId>,
    defaults: HashMap<StateId, TransformId>,
    merged: MergedStateFactory,
    conflicts: usize,
}

/// Epsilon closure of `seeds`.
///
/// Follows LAMBDA edges transitively and keeps the states that matter to the
/// deterministic table: final states and states with at least one non-LAMBDA
/// edge. Pure epsilon junctions and the ERROR state drop out. The result is
/// sorted.
pub fn travel<I>(nfa: &Nfa, seeds: I) -> Vec<StateId>
where
    I: IntoIterator<Item = StateId>,
{
    let mut stack: Vec<StateId> = seeds.into_iter().collect();
    let mut visited = HashSet::new();
    let mut kept = BTreeSet::new();
    while let Some(state) = stack.pop() {
        if !visited.insert(state) {
            continue;
        }
        if nfa.is_final(state) || nfa.has_symbol_edge(state) {
            kept.insert(state);
        }
        for &(symbol, to) in nfa.edges(state) {
            if symbol == Symbol::Lambda {
                stack.push(to);
            }
        }
    }
    kept.into_iter().collect()
}

/// Determinize `nfa`, building at most `max_states` states.
pub fn determinize(nfa: &Nfa, max_states: usize) -> Result<Dfa, FstError> {
    let mut dfa = Dfa {
        nfa: nfa.clone(),
        start: START,
        states: Vec::new(),
        seen: HashSet::new(),
        finals: HashSet::new(),
        table: HashMap::new(),
        transforms: nfa.transforms().to_vec(),
        edge_transforms: HashMap::new(),
        defaults: HashMap::new(),
        merged: MergedStateFactory::new(nfa.state_count() as StateId),
        conflicts: 0,
    };

    let initial = travel(nfa, [START]);
    if initial.is_empty() {
        // Nothing can ever match: a lone START with no edges.
        dfa.states.push(START);
        return Ok(dfa);
    }

    let mut queue = VecDeque::new();
    dfa.start = dfa.merged.merge(&initial)?.id();
    dfa.discover(nfa, dfa.start, max_states, &mut queue)?;

    while let Some(id) = queue.pop_front() {
        let mut moves: BTreeMap<Symbol, BTreeSet<StateId>> = BTreeMap::new();
        for member in dfa.merged.members(id) {
            for &(symbol, to) in nfa.edges(member) {
                if symbol != Symbol::Lambda {
                    moves.entry(symbol).or_default().insert(to);
                }
            }
        }
        for (symbol, targets) in moves {
            let closure = travel(nfa, targets);
            if closure.is_empty() {
                continue;
            }
            let target = dfa.merged.merge(&closure)?.id();
            dfa.table.insert((id, symbol), target);
            dfa.discover(nfa, target, max_states, &mut queue)?;
        }
    }
    Ok(dfa)
}

/// Outcome of offering a second annotation for an occupied slot.
enum Preference {
    Keep,
    Replace,
    Conflict,
}

/// Ordinary beats null; between two different ordinary annotations the one
/// already present (from the lower-numbered constituent) stays.
fn prefer(transforms: &[TransformRule], existing: TransformId, offered: TransformId) -> Preference {
    if existing == offered {
        return Preference::Keep;
    }
    let (old, new) = (&transforms[existing], &transforms[offered]);
    match (old.kind, new.kind) {
        (TransformKind::Null, TransformKind::Ordinary) => Preference::Replace,
        (TransformKind::Ordinary, TransformKind::Ordinary) if old.replacement != new.replacement => {
            Preference::Conflict
        }
        _ => Preference::Keep,
    }
}

impl Dfa {
    fn discover(
        &mut self,
        nfa: &Nfa,
        id: StateId,
        max_states: usize,
        queue: &mut VecDeque<StateId>,
    ) -> Result<(), FstError> {
        if self.seen.contains(&id) {
            return Ok(());
        }
        if self.states.len() >= max_states {
            return Err(FstError::StateLimit { limit: max_states });
        }
        self.seen.insert(id);
        self.states.push(id);
        let members = self.merged.members(id);
        if members.iter().any(|&m| nfa.is_final(m)) {
            self.finals.insert(id);
        }
        self.retarget(nfa, id, &members);
        queue.push_back(id);
        Ok(())
    }

    /// Copy the constituents' annotations onto `id`.
    fn retarget(&mut self, nfa: &Nfa, id: StateId, members: &[StateId]) {
        for &member in members {
            for &(symbol, _) in nfa.edges(member) {
                if let Some(offered) = nfa.edge_transform(member, symbol) {
                    let existing = self.edge_transforms.get(&(id, symbol)).copied();
                    if let Some(chosen) = self.choose(existing, offered) {
                        self.edge_transforms.insert((id, symbol), chosen);
                    }
                }
            }
            if let Some(offered) = nfa.default_transform(member) {
                let existing = self.defaults.get(&id).copied();
                if let Some(chosen) = self.choose(existing, offered) {
                    self.defaults.insert(id, chosen);
                }
            }
        }
    }

    fn choose(&mut self, existing: Option<TransformId>, offered: TransformId) -> Option<TransformId> {
        let Some(existing) = existing else {
            return Some(offered);
        };
        match prefer(&self.transforms, existing, offered) {
            Preference::Keep => None,
            Preference::Replace => Some(offered),
            Preference::Conflict => {
                self.conflicts += 1;
                None
            }
        }
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    /// The automaton this table was built from.
    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// The unique successor of `state` on `symbol`.
    pub fn next(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.table.get(&(state, symbol)).copied()
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.contains(&state)
    }

    pub fn transform(&self, id: TransformId) -> Option<&TransformRule> {
        self.transforms.get(id)
    }

    pub fn edge_transform(&self, state: StateId, symbol: Symbol) -> Option<TransformId> {
        self.edge_transforms.get(&(state, symbol)).copied()
    }

    pub fn default_transform(&self, state: StateId) -> Option<TransformId> {
        self.defaults.get(&state).copied()
    }

    /// Reachable states in discovery order; the start state comes first.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// All transitions as (origin, symbol, target), sorted.
    pub fn transitions(&self) -> Vec<(StateId, Symbol, StateId)> {
        let mut all: Vec<_> = self
            .table
            .iter()
            .map(|(&(from, symbol), &to)| (from, symbol, to))
            .collect();
        all.sort_unstable();
        all
    }

    /// NFA states a deterministic state stands for.
    pub fn members(&self, state: StateId) -> Vec<StateId> {
        self.merged.members(state)
    }

    pub fn merged_states(&self) -> &MergedStateFactory {
        &self.merged
    }

    /// Number of annotation clashes resolved while merging.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::ERROR;

    fn ch(c: char) -> Symbol {
        Symbol::Char(c)
    }

    /// a b | a c, sharing the first character through two paths.
    fn ambiguous() -> Nfa {
        let mut nfa = Nfa::new();
        let (x1, x2, end) = (nfa.add_state(false), nfa.add_state(false), nfa.add_state(false));
        nfa.add_edge(START, ch('a'), x1);
        nfa.add_edge(START, ch('a'), x2);
        nfa.add_edge(x1, ch('b'), end);
        nfa.add_edge(x2, ch('c'), end);
        nfa.set_final(end);
        nfa
    }

    #[test]
    fn shared_prefix_merges() {
        let nfa = ambiguous();
        let dfa = determinize(&nfa, 100).unwrap();
        let after_a = dfa.next(dfa.start(), ch('a')).unwrap();
        assert_eq!(dfa.members(after_a), vec![2, 3]);
        let b = dfa.next(after_a, ch('b')).unwrap();
        let c = dfa.next(after_a, ch('c')).unwrap();
        assert_eq!(b, c);
        assert!(dfa.is_final(b));
        assert!(!dfa.is_final(after_a));
    }

    #[test]
    fn at_most_one_target_per_symbol() {
        let dfa = determinize(&ambiguous(), 100).unwrap();
        let transitions = dfa.transitions();
        for pair in transitions.windows(2) {
            assert!((pair[0].0, pair[0].1) != (pair[1].0, pair[1].1));
        }
    }

    #[test]
    fn travel_skips_pure_epsilon_states() {
        let mut nfa = Nfa::new();
        let (junction, a, b) = (nfa.add_state(false), nfa.add_state(false), nfa.add_state(false));
        nfa.add_epsilon(START, junction);
        nfa.add_epsilon(junction, a);
        nfa.add_epsilon(junction, ERROR);
        nfa.add_edge(a, ch('x'), b);
        nfa.set_final(b);
        nfa.add_epsilon(a, b);
        assert_eq!(travel(&nfa, [START]), vec![a, b]);
    }

    #[test]
    fn closure_leaves_no_lambda_edges() {
        let mut nfa = Nfa::new();
        let (opt, bypass, end) = (nfa.add_state(false), nfa.add_state(false), nfa.add_state(false));
        nfa.add_epsilon(START, opt);
        nfa.add_epsilon(START, bypass);
        nfa.add_edge(opt, ch('b'), bypass);
        nfa.add_edge(bypass, ch('c'), end);
        nfa.set_final(end);
        let dfa = determinize(&nfa, 100).unwrap();
        assert!(dfa.transitions().iter().all(|(_, s, _)| *s != Symbol::Lambda));
        // "c" and "bc" both reach the final state.
        let direct = dfa.next(dfa.start(), ch('c')).unwrap();
        let b = dfa.next(dfa.start(), ch('b')).unwrap();
        let via_b = dfa.next(b, ch('c')).unwrap();
        assert!(dfa.is_final(direct));
        assert!(dfa.is_final(via_b));
    }

    #[test]
    fn reject_edges_do_not_survive() {
        let mut nfa = ambiguous();
        nfa.add_reject(START, Symbol::End);
        let dfa = determinize(&nfa, 100).unwrap();
        assert_eq!(dfa.next(dfa.start(), Symbol::End), None);
    }

    #[test]
    fn transforms_retarget_onto_merged_state() {
        let mut nfa = Nfa::new();
        let (x1, x2, end) = (nfa.add_state(true), nfa.add_state(true), nfa.add_state(false));
        nfa.add_edge(START, ch('a'), x1);
        nfa.add_edge(START, ch('a'), x2);
        nfa.add_edge(x1, ch('b'), end);
        nfa.add_edge(x2, ch('c'), end);
        let b = nfa.add_transform(TransformRule::ordinary("B", "b", "B", 0));
        let c = nfa.add_transform(TransformRule::ordinary("C", "c", "C", 0));
        let d = nfa.add_transform(TransformRule::ordinary("D", "x", "D", 1));
        nfa.attach(x1, ch('b'), b);
        nfa.attach(x2, ch('c'), c);
        nfa.attach_default(x2, d);
        nfa.set_final(end);

        let dfa = determinize(&nfa, 100).unwrap();
        let merged = dfa.next(dfa.start(), ch('a')).unwrap();
        assert_eq!(dfa.edge_transform(merged, ch('b')), Some(b));
        assert_eq!(dfa.edge_transform(merged, ch('c')), Some(c));
        assert_eq!(dfa.default_transform(merged), Some(d));
        assert_eq!(dfa.conflicts(), 0);
    }

    #[test]
    fn conflicting_transforms_are_counted() {
        let mut nfa = ambiguous();
        // both constituents annotate 'b'
        nfa.add_edge(3, ch('b'), 4);
        let first = nfa.add_transform(TransformRule::ordinary("1", "b", "1", 0));
        let second = nfa.add_transform(TransformRule::ordinary("2", "b", "2", 1));
        nfa.attach(2, ch('b'), first);
        nfa.attach(3, ch('b'), second);
        let dfa = determinize(&nfa, 100).unwrap();
        let merged = dfa.next(dfa.start(), ch('a')).unwrap();
        assert_eq!(dfa.edge_transform(merged, ch('b')), Some(first));
        assert_eq!(dfa.conflicts(), 1);
    }

    #[test]
    fn null_loses_to_ordinary() {
        let mut nfa = ambiguous();
        nfa.add_edge(3, ch('b'), 4);
        let null = nfa.add_transform(TransformRule::null("b", "", 0));
        let ordinary = nfa.add_transform(TransformRule::ordinary("B", "b", "B", 0));
        nfa.attach(2, ch('b'), null);
        nfa.attach(3, ch('b'), ordinary);
        let dfa = determinize(&nfa, 100).unwrap();
        let merged = dfa.next(dfa.start(), ch('a')).unwrap();
        assert_eq!(dfa.edge_transform(merged, ch('b')), Some(ordinary));
        assert_eq!(dfa.conflicts(), 0);
    }

    #[test]
    fn state_limit() {
        let err = determinize(&ambiguous(), 2).unwrap_err();
        assert_eq!(err, FstError::StateLimit { limit: 2 });
    }

    #[test]
    fn empty_automaton_has_lone_start() {
        let nfa = Nfa::new();
        let dfa = determinize(&nfa, 10).unwrap();
        assert_eq!(dfa.state_count(), 1);
        assert!(dfa.transitions().is_empty());
    }

    #[test]
    fn output_is_deterministic() {
        let first = determinize(&ambiguous(), 100).unwrap();
        let second = determinize(&ambiguous(), 100).unwrap();
        assert_eq!(first.transitions(), second.transitions());
        assert_eq!(first.states(), second.states());
    }
}
