// First-symbol sets of rule segments.
//
// Used to guard disjunctions: a symbol that can follow a disjunction but
// cannot start any of its branches gets a reject edge.

use std::collections::BTreeSet;

use shift_core::ast::{BoundaryKind, Node};
use shift_core::symbol::Symbol;

use crate::error::RuleError;
use crate::inventory::Inventory;

/// Symbols that can start a segment sequence, and whether it can match
/// nothing at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirstSet {
    pub symbols: BTreeSet<Symbol>,
    pub nullable: bool,
}

impl FirstSet {
    /// The set after the end of a rule: nothing specific, and nullable.
    pub fn end() -> Self {
        Self {
            symbols: BTreeSet::new(),
            nullable: true,
        }
    }

    fn of(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
            nullable: false,
        }
    }

    /// `self` followed by `follow`.
    pub fn then(mut self, follow: &FirstSet) -> Self {
        if self.nullable {
            self.symbols.extend(follow.symbols.iter().copied());
            self.nullable = follow.nullable;
        }
        self
    }
}

/// First set of one node. `target` is what a placeholder stands for.
pub fn first_of_node(
    node: &Node,
    inventory: &Inventory,
    target: &[Node],
) -> Result<FirstSet, RuleError> {
    let first = match node {
        Node::Utterance(text) => FirstSet::of(text.chars().next().map(Symbol::Char)),
        Node::Category(_) | Node::Feature { .. } | Node::Compound(_) => {
            FirstSet::of(inventory.trie(node)?.first_chars().into_iter().map(Symbol::Char))
        }
        Node::Optional(children) => {
            let mut first = first_of_seq(children, inventory, target)?;
            first.nullable = true;
            first
        }
        Node::Disjunction(branches) => {
            let mut first = FirstSet::default();
            for branch in branches {
                let branch = first_of_seq(branch, inventory, target)?;
                first.symbols.extend(branch.symbols);
                first.nullable |= branch.nullable;
            }
            first
        }
        Node::Boundary(BoundaryKind::Start) => FirstSet::of([Symbol::Start]),
        Node::Boundary(BoundaryKind::End) => FirstSet::of([Symbol::End]),
        Node::Placeholder => first_of_seq(target, inventory, target)?,
    };
    Ok(first)
}

/// First set of a sequence: the union over its nodes up to the first one
/// that cannot match empty.
pub fn first_of_seq(
    nodes: &[Node],
    inventory: &Inventory,
    target: &[Node],
) -> Result<FirstSet, RuleError> {
    let mut first = FirstSet::default();
    for node in nodes {
        let next = first_of_node(node, inventory, target)?;
        first.symbols.extend(next.symbols);
        if !next.nullable {
            return Ok(first);
        }
    }
    first.nullable = true;
    Ok(first)
}
