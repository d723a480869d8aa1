// Automaton states: the per-rule state arena and the merged-state factory
// used by subset construction.

use hashbrown::HashMap;

use crate::FstError;

/// Identifier of an NFA state or a deterministic (possibly merged) state.
///
/// NFA states and merged states share one numbering space: merged states
/// continue the counter after the last NFA state.
pub type StateId = u32;

// ---------------------------------------------------------------------------
// State / StateFactory
// ---------------------------------------------------------------------------

/// One NFA vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub id: StateId,
    /// Set on the state(s) where a complete match ends.
    pub is_final: bool,
    /// Created while building the rule target (the placeholder's subtree).
    pub in_target: bool,
}

/// Allocates states with unique, consecutive identifiers.
#[derive(Debug, Clone, Default)]
pub struct StateFactory {
    states: Vec<State>,
}

impl StateFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new non-final state.
    pub fn create(&mut self, in_target: bool) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(State {
            id,
            is_final: false,
            in_target,
        });
        id
    }

    pub fn get(&self, id: StateId) -> Option<&State> {
        self.states.get(id as usize)
    }

    pub fn set_final(&mut self, id: StateId, is_final: bool) {
        if let Some(state) = self.states.get_mut(id as usize) {
            state.is_final = is_final;
        }
    }

    pub fn is_final(&self, id: StateId) -> bool {
        self.get(id).is_some_and(|s| s.is_final)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }
}

// ---------------------------------------------------------------------------
// MergedState / MergedStateFactory
// ---------------------------------------------------------------------------

/// A canonical union of NFA states: one vertex of the deterministic table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedState {
    pub id: StateId,
    /// Constituent states, sorted and deduplicated.
    pub members: Vec<StateId>,
}

/// Result of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// The set had a single member; that state stands for itself.
    Single(StateId),
    /// A merged state for this set already existed.
    Existing(StateId),
    /// A merged state was created by this request.
    Created(StateId),
}

impl Merge {
    pub fn id(self) -> StateId {
        match self {
            Merge::Single(id) | Merge::Existing(id) | Merge::Created(id) => id,
        }
    }
}

/// Deduplicating factory of merged states.
///
/// Two requests with set-equal member lists return the same identifier, so
/// merging is idempotent.
#[derive(Debug, Clone)]
pub struct MergedStateFactory {
    next_id: StateId,
    by_members: HashMap<Vec<StateId>, StateId>,
    merged: HashMap<StateId, MergedState>,
}

impl MergedStateFactory {
    /// Create a factory whose first merged state gets `first_id`.
    pub fn new(first_id: StateId) -> Self {
        Self {
            next_id: first_id,
            by_members: HashMap::new(),
            merged: HashMap::new(),
        }
    }

    /// Get the canonical state for a set of states.
    pub fn merge(&mut self, states: &[StateId]) -> Result<Merge, FstError> {
        let mut members = states.to_vec();
        members.sort_unstable();
        members.dedup();
        match members.as_slice() {
            [] => return Err(FstError::EmptyMerge),
            [single] => return Ok(Merge::Single(*single)),
            _ => {}
        }
        if let Some(&id) = self.by_members.get(&members) {
            return Ok(Merge::Existing(id));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.by_members.insert(members.clone(), id);
        self.merged.insert(id, MergedState { id, members });
        Ok(Merge::Created(id))
    }

    /// The merged state with this identifier, if it was created here.
    pub fn get(&self, id: StateId) -> Option<&MergedState> {
        self.merged.get(&id)
    }

    /// Constituents of a state: its merged members, or the state itself.
    pub fn members(&self, id: StateId) -> Vec<StateId> {
        match self.merged.get(&id) {
            Some(merged) => merged.members.clone(),
            None => vec![id],
        }
    }

    /// Number of merged states created.
    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_ids_are_consecutive() {
        let mut states = StateFactory::new();
        assert_eq!(states.create(false), 0);
        assert_eq!(states.create(true), 1);
        assert_eq!(states.len(), 2);
        assert!(states.get(1).unwrap().in_target);
        assert!(!states.is_final(1));
        states.set_final(1, true);
        assert!(states.is_final(1));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut factory = MergedStateFactory::new(10);
        let first = factory.merge(&[3, 1, 2]).unwrap();
        let second = factory.merge(&[2, 3, 1]).unwrap();
        assert_eq!(first, Merge::Created(10));
        assert_eq!(second, Merge::Existing(10));
        assert_eq!(factory.get(10).unwrap().members, vec![1, 2, 3]);
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn merge_ignores_duplicates() {
        let mut factory = MergedStateFactory::new(5);
        let a = factory.merge(&[1, 1, 2]).unwrap();
        let b = factory.merge(&[2, 1]).unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn singleton_stands_for_itself() {
        let mut factory = MergedStateFactory::new(5);
        assert_eq!(factory.merge(&[4, 4]).unwrap(), Merge::Single(4));
        assert!(factory.is_empty());
        assert_eq!(factory.members(4), vec![4]);
    }

    #[test]
    fn empty_merge_is_an_error() {
        let mut factory = MergedStateFactory::new(0);
        assert_eq!(factory.merge(&[]), Err(FstError::EmptyMerge));
    }

    #[test]
    fn distinct_sets_get_distinct_ids() {
        let mut factory = MergedStateFactory::new(100);
        let a = factory.merge(&[1, 2]).unwrap().id();
        let b = factory.merge(&[1, 3]).unwrap().id();
        assert_ne!(a, b);
        assert_eq!(factory.members(b), vec![1, 3]);
    }
}
