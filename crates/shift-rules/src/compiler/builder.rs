// Rule AST -> NFA with transform annotations.

use std::collections::BTreeSet;

use shift_core::ast::{BoundaryKind, Node, Rule};
use shift_core::symbol::Symbol;
use shift_fst::nfa::START;
use shift_fst::{Nfa, SegmentTrie, StateId, TransformRule};
use shift_fst::transform::TransformId;

use crate::compiler::first::{FirstSet, first_of_seq};
use crate::error::RuleError;
use crate::inventory::Inventory;

/// Output side of one target unit: its aligned result node plus literal
/// text carried over from surplus result utterances.
#[derive(Debug, Clone, Default)]
struct Emit<'a> {
    result: Option<&'a Node>,
    overflow: String,
}

impl<'a> Emit<'a> {
    fn results(&self) -> &'a [Node] {
        self.result.map(std::slice::from_ref).unwrap_or(&[])
    }

    fn display(&self) -> String {
        let mut text = self.result.map(|r| r.to_string()).unwrap_or_default();
        text.push_str(&self.overflow);
        text
    }
}

/// Transforms shared by every edge of one set unit.
struct SetUnit<'a> {
    emit: Emit<'a>,
    unit: u32,
    null: TransformId,
    source: String,
    target: String,
}

/// Walks one rule and emits its NFA.
///
/// Every `build_*` method takes the state the construct starts from and
/// returns the state it ends in.
pub struct NfaBuilder<'a> {
    rule: &'a Rule,
    inventory: &'a Inventory,
    nfa: Nfa,
    in_target: bool,
    next_unit: u32,
}

impl<'a> NfaBuilder<'a> {
    pub fn new(rule: &'a Rule, inventory: &'a Inventory) -> Self {
        Self {
            rule,
            inventory,
            nfa: Nfa::new(),
            in_target: false,
            next_unit: 0,
        }
    }

    /// Build the whole rule, starting at the NFA start state.
    pub fn build(mut self, strip_trailing_optionals: bool) -> Result<Nfa, RuleError> {
        let rule = self.rule;
        let mut environment: &[Node] = &rule.environment;
        if strip_trailing_optionals {
            while let [rest @ .., Node::Optional(_)] = environment {
                environment = rest;
            }
        }
        let end = self.build_env_seq(environment, START, &FirstSet::end())?;
        self.nfa.set_final(end);
        Ok(self.nfa)
    }

    fn new_unit(&mut self) -> u32 {
        let unit = self.next_unit;
        self.next_unit += 1;
        unit
    }

    fn add_state(&mut self) -> StateId {
        self.nfa.add_state(self.in_target)
    }

    /// What can follow `rest` once the enclosing construct is done.
    fn follow_of(&self, rest: &[Node], outer: &FirstSet) -> Result<FirstSet, RuleError> {
        Ok(first_of_seq(rest, self.inventory, &self.rule.target)?.then(outer))
    }

    // -----------------------------------------------------------------------
    // Sequences
    // -----------------------------------------------------------------------

    /// A sequence outside the target: no transforms.
    fn build_env_seq(
        &mut self,
        nodes: &'a [Node],
        mut current: StateId,
        follow: &FirstSet,
    ) -> Result<StateId, RuleError> {
        for (i, node) in nodes.iter().enumerate() {
            let after = self.follow_of(&nodes[i + 1..], follow)?;
            current = self.build_node(node, None, current, &after)?;
        }
        Ok(current)
    }

    /// A target sequence aligned node by node against `results`.
    fn build_target_seq(
        &mut self,
        nodes: &'a [Node],
        results: &'a [Node],
        overflow: &str,
        mut current: StateId,
        follow: &FirstSet,
    ) -> Result<StateId, RuleError> {
        let emits = self.align(nodes, results, overflow)?;
        for (i, (node, emit)) in nodes.iter().zip(&emits).enumerate() {
            let after = self.follow_of(&nodes[i + 1..], follow)?;
            current = self.build_node(node, Some(emit), current, &after)?;
        }
        Ok(current)
    }

    /// Pair each target node with its result node. Surplus result
    /// utterances become overflow on the last unit.
    fn align(
        &self,
        nodes: &'a [Node],
        results: &'a [Node],
        overflow: &str,
    ) -> Result<Vec<Emit<'a>>, RuleError> {
        let mut emits: Vec<Emit<'a>> = (0..nodes.len())
            .map(|i| Emit {
                result: results.get(i),
                overflow: String::new(),
            })
            .collect();
        let Some(last) = emits.last_mut() else {
            return Ok(emits);
        };
        for surplus in results.iter().skip(nodes.len()) {
            match surplus {
                Node::Utterance(text) => last.overflow.push_str(text),
                _ => {
                    return Err(RuleError::UnalignedResult {
                        rule: self.rule.to_string(),
                    });
                }
            }
        }
        last.overflow.push_str(overflow);
        Ok(emits)
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    fn build_node(
        &mut self,
        node: &'a Node,
        emit: Option<&Emit<'a>>,
        current: StateId,
        follow: &FirstSet,
    ) -> Result<StateId, RuleError> {
        match node {
            Node::Utterance(text) => self.build_utterance(node, text, emit, current),
            Node::Category(_) | Node::Feature { .. } | Node::Compound(_) => {
                self.build_set(node, emit, current)
            }
            Node::Optional(children) => self.build_optional(children, emit, current, follow),
            Node::Disjunction(branches) => {
                self.build_disjunction(branches, emit, current, follow)
            }
            Node::Boundary(kind) => {
                let symbol = match kind {
                    BoundaryKind::Start => Symbol::Start,
                    BoundaryKind::End => Symbol::End,
                };
                let next = self.add_state();
                self.nfa.add_edge(current, symbol, next);
                Ok(next)
            }
            Node::Placeholder => {
                let rule = self.rule;
                self.in_target = true;
                let end = self.build_target_seq(&rule.target, &rule.result, "", current, follow);
                self.in_target = false;
                end
            }
        }
    }

    /// Output text for a matched member under `emit`.
    fn replacement(&self, member: &str, emit: &Emit<'a>) -> Result<String, RuleError> {
        let mut text = match emit.result {
            None => String::new(),
            Some(Node::Utterance(text)) => text.clone(),
            Some(Node::Feature { present, name }) => {
                let feature = self.inventory.feature_set(name)?;
                feature.transform(*present, member).unwrap_or(member).to_string()
            }
            Some(_) => member.to_string(),
        };
        text.push_str(&emit.overflow);
        Ok(text)
    }

    fn build_utterance(
        &mut self,
        node: &Node,
        text: &str,
        emit: Option<&Emit<'a>>,
        current: StateId,
    ) -> Result<StateId, RuleError> {
        // (transform on earlier edges, transform on the last edge)
        let annotations = match emit {
            None => None,
            Some(emit) => {
                let unit = self.new_unit();
                let source = node.to_string();
                let target = emit.display();
                let replacement = self.replacement(text, emit)?;
                let null = self
                    .nfa
                    .add_transform(TransformRule::null(source.clone(), target.clone(), unit));
                let last = if replacement.is_empty() {
                    null
                } else {
                    self.nfa.add_transform(TransformRule::ordinary(
                        replacement,
                        source,
                        target,
                        unit,
                    ))
                };
                Some((null, last))
            }
        };

        let count = text.chars().count();
        let mut state = current;
        for (i, c) in text.chars().enumerate() {
            let next = self.add_state();
            let symbol = Symbol::Char(c);
            self.nfa.add_edge(state, symbol, next);
            if let Some((null, last)) = annotations {
                let transform = if i + 1 == count { last } else { null };
                self.nfa.attach(state, symbol, transform);
            }
            state = next;
        }
        Ok(state)
    }

    /// Inline the set's trie between `current` and a fresh exit state.
    fn build_set(
        &mut self,
        node: &'a Node,
        emit: Option<&Emit<'a>>,
        current: StateId,
    ) -> Result<StateId, RuleError> {
        let trie = self.inventory.trie(node)?;
        let exit = self.add_state();
        let unit = match emit {
            None => None,
            Some(emit) => {
                let unit = self.new_unit();
                let source = node.to_string();
                let target = emit.display();
                let null = self
                    .nfa
                    .add_transform(TransformRule::null(source.clone(), target.clone(), unit));
                Some(SetUnit {
                    emit: emit.clone(),
                    unit,
                    null,
                    source,
                    target,
                })
            }
        };
        self.inline_trie(&trie, SegmentTrie::ROOT, current, exit, unit.as_ref())?;
        Ok(exit)
    }

    fn member_transform(&mut self, unit: &SetUnit<'a>, member: &str) -> Result<TransformId, RuleError> {
        let replacement = self.replacement(member, &unit.emit)?;
        if replacement.is_empty() {
            return Ok(unit.null);
        }
        Ok(self.nfa.add_transform(TransformRule::ordinary(
            replacement,
            unit.source.clone(),
            unit.target.clone(),
            unit.unit,
        )))
    }

    fn inline_trie(
        &mut self,
        trie: &SegmentTrie,
        index: usize,
        state: StateId,
        exit: StateId,
        unit: Option<&SetUnit<'a>>,
    ) -> Result<(), RuleError> {
        for &child in &trie.node(index).children {
            let node = trie.node(child);
            let Some(c) = node.ch else { continue };
            let symbol = Symbol::Char(c);

            if node.is_leaf() {
                self.nfa.add_edge(state, symbol, exit);
                if let (Some(unit), Some(member)) = (unit, node.member.as_deref()) {
                    let transform = self.member_transform(unit, member)?;
                    self.nfa.attach(state, symbol, transform);
                }
                continue;
            }

            let next = self.add_state();
            self.nfa.add_edge(state, symbol, next);
            if let Some(unit) = unit {
                self.nfa.attach(state, symbol, unit.null);
            }
            self.inline_trie(trie, child, next, exit, unit)?;

            // A member that is a prefix of a longer one may stop here.
            if let Some(member) = node.member.as_deref() {
                self.nfa.add_epsilon(next, exit);
                if let Some(unit) = unit {
                    let transform = self.member_transform(unit, member)?;
                    self.nfa.attach_default(next, transform);
                }
            }
        }
        Ok(())
    }

    fn build_optional(
        &mut self,
        children: &'a [Node],
        emit: Option<&Emit<'a>>,
        current: StateId,
        follow: &FirstSet,
    ) -> Result<StateId, RuleError> {
        let bypass = self.add_state();
        let inner = self.add_state();
        self.nfa.add_epsilon(current, inner);
        self.nfa.add_epsilon(current, bypass);
        let end = self.build_group_seq(children, emit, inner, follow)?;
        self.nfa.add_epsilon(end, bypass);
        Ok(bypass)
    }

    /// Fork into each branch and join after them.
    ///
    /// When no branch can match empty, every symbol that may follow the
    /// disjunction but starts no branch gets a reject edge from `current` to
    /// ERROR. ERROR is never final and `travel` drops it, so the edges leave
    /// the deterministic table unchanged: such a symbol already has no
    /// successor there. They mark guarded symbols in the NFA, and the
    /// runtime's path search stops at a guarded state when the next input
    /// symbol is one of them.
    fn build_disjunction(
        &mut self,
        branches: &'a [Vec<Node>],
        emit: Option<&Emit<'a>>,
        current: StateId,
        follow: &FirstSet,
    ) -> Result<StateId, RuleError> {
        let join = self.add_state();
        let mut firsts = BTreeSet::new();
        let mut nullable = false;

        for branch in branches {
            if branch.is_empty() {
                nullable = true;
                self.nfa.add_epsilon(current, join);
                continue;
            }
            let first = first_of_seq(branch, self.inventory, &self.rule.target)?;
            firsts.extend(first.symbols);
            nullable |= first.nullable;

            let start = self.add_state();
            self.nfa.add_epsilon(current, start);
            let end = self.build_group_seq(branch, emit, start, follow)?;
            self.nfa.add_epsilon(end, join);
        }

        if !nullable {
            for &symbol in &follow.symbols {
                if !firsts.contains(&symbol) {
                    self.nfa.add_reject(current, symbol);
                }
            }
        }
        Ok(join)
    }

    /// Contents of an optional or a branch. Inside the target the group's
    /// result node aligns with its first inner unit.
    fn build_group_seq(
        &mut self,
        nodes: &'a [Node],
        emit: Option<&Emit<'a>>,
        start: StateId,
        follow: &FirstSet,
    ) -> Result<StateId, RuleError> {
        match emit {
            None => self.build_env_seq(nodes, start, follow),
            Some(emit) => self.build_target_seq(nodes, emit.results(), &emit.overflow, start, follow),
        }
    }
}

/// Build the NFA for one rule.
pub fn build_nfa(
    rule: &Rule,
    inventory: &Inventory,
    strip_trailing_optionals: bool,
) -> Result<Nfa, RuleError> {
    NfaBuilder::new(rule, inventory).build(strip_trailing_optionals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shift_core::ast::{CategoryDecl, FeatureSetDecl};
    use shift_fst::TransformKind;
    use shift_fst::nfa::ERROR;

    fn rule(target: Vec<Node>, result: Vec<Node>, environment: Vec<Node>) -> Rule {
        Rule::new(target, result, environment)
    }

    fn inventory() -> Inventory {
        let mut inv = Inventory::new();
        let mut cat = CategoryDecl::new("T");
        cat.members.extend(["t".to_string(), "ts".to_string()]);
        inv.declare_category(&cat).unwrap();
        let mut voice = FeatureSetDecl::new("voice");
        voice.add_pair("p", "b").unwrap();
        inv.declare_feature_set(&voice);
        inv
    }

    #[test]
    fn literal_rule_shape() {
        let r = rule(
            vec![Node::utterance("a")],
            vec![Node::utterance("e")],
            vec![Node::Placeholder, Node::Boundary(BoundaryKind::End)],
        );
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        // START, ERROR, after 'a', after '#'
        assert_eq!(nfa.state_count(), 4);
        let (symbol, after) = nfa.edges(START)[0];
        assert_eq!(symbol, Symbol::Char('a'));
        assert!(nfa.state(after).unwrap().in_target);
        let id = nfa.edge_transform(START, symbol).unwrap();
        let transform = nfa.transform(id).unwrap();
        assert_eq!(transform.replacement, "e");
        assert_eq!(transform.source, "a");
        assert_eq!(transform.target, "e");
        let end = nfa.edges(after)[0].1;
        assert!(nfa.is_final(end));
        assert!(!nfa.state(end).unwrap().in_target);
    }

    #[test]
    fn multi_char_literal_emits_on_last_edge() {
        let r = rule(
            vec![Node::utterance("ab")],
            vec![Node::utterance("x")],
            vec![Node::Placeholder],
        );
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        let first = nfa.edge_transform(START, Symbol::Char('a')).unwrap();
        assert!(nfa.transform(first).unwrap().is_null());
        let mid = nfa.edges(START)[0].1;
        let last = nfa.edge_transform(mid, Symbol::Char('b')).unwrap();
        assert_eq!(nfa.transform(last).unwrap().replacement, "x");
        assert_eq!(nfa.transform(first).unwrap().unit, nfa.transform(last).unwrap().unit);
    }

    #[test]
    fn deletion_is_null() {
        let r = rule(vec![Node::utterance("h")], vec![], vec![Node::Placeholder]);
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        let id = nfa.edge_transform(START, Symbol::Char('h')).unwrap();
        assert_eq!(nfa.transform(id).unwrap().kind, TransformKind::Null);
    }

    #[test]
    fn surplus_utterances_overflow_onto_last_unit() {
        let r = rule(
            vec![Node::utterance("a")],
            vec![Node::utterance("e"), Node::utterance("j")],
            vec![Node::Placeholder],
        );
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        let id = nfa.edge_transform(START, Symbol::Char('a')).unwrap();
        let transform = nfa.transform(id).unwrap();
        assert_eq!(transform.replacement, "ej");
        assert_eq!(transform.target, "ej");
    }

    #[test]
    fn surplus_feature_is_unaligned() {
        let r = rule(
            vec![Node::utterance("a")],
            vec![Node::utterance("e"), Node::feature(true, "voice")],
            vec![Node::Placeholder],
        );
        let err = build_nfa(&r, &inventory(), true).unwrap_err();
        assert!(matches!(err, RuleError::UnalignedResult { .. }));
    }

    #[test]
    fn prefix_member_gets_default_transform() {
        let r = rule(
            vec![Node::Category("T".into())],
            vec![Node::utterance("x")],
            vec![Node::Placeholder],
        );
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        let after_t = nfa.edges(START)[0].1;
        let default = nfa.default_transform(after_t).unwrap();
        assert_eq!(nfa.transform(default).unwrap().replacement, "x");
        assert!(nfa.has_epsilon(after_t));
        let s = nfa.edge_transform(after_t, Symbol::Char('s')).unwrap();
        assert_eq!(nfa.transform(s).unwrap().replacement, "x");
        assert!(nfa.transform(nfa.edge_transform(START, Symbol::Char('t')).unwrap()).unwrap().is_null());
    }

    #[test]
    fn feature_result_maps_members() {
        let r = rule(
            vec![Node::feature(false, "voice")],
            vec![Node::feature(true, "voice")],
            vec![Node::Placeholder],
        );
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        let id = nfa.edge_transform(START, Symbol::Char('p')).unwrap();
        let transform = nfa.transform(id).unwrap();
        assert_eq!(transform.replacement, "b");
        assert_eq!(transform.source, "[-voice]");
        assert_eq!(transform.target, "[+voice]");
    }

    #[test]
    fn undefined_set_fails() {
        let r = rule(
            vec![Node::Category("Q".into())],
            vec![],
            vec![Node::Placeholder],
        );
        assert!(matches!(
            build_nfa(&r, &inventory(), true),
            Err(RuleError::UndefinedReference { .. })
        ));
    }

    #[test]
    fn disjunction_rejects_follow_symbols() {
        let r = rule(
            vec![Node::Disjunction(vec![
                vec![Node::utterance("p")],
                vec![Node::utterance("t")],
            ])],
            vec![Node::utterance("f")],
            vec![Node::Placeholder, Node::Boundary(BoundaryKind::End)],
        );
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        assert!(nfa.rejections(Symbol::End).contains(&START));
        assert!(nfa.rejections(Symbol::Char('p')).is_empty());
        assert!(nfa.edges(START).contains(&(Symbol::End, ERROR)));
    }

    #[test]
    fn trailing_optionals_stripped() {
        let env = vec![
            Node::Placeholder,
            Node::Optional(vec![Node::utterance("x")]),
        ];
        let r = rule(vec![Node::utterance("a")], vec![Node::utterance("e")], env);
        let stripped = build_nfa(&r, &inventory(), true).unwrap();
        let kept = build_nfa(&r, &inventory(), false).unwrap();
        assert!(stripped.state_count() < kept.state_count());
    }

    #[test]
    fn environment_has_no_transforms() {
        let r = rule(
            vec![Node::utterance("a")],
            vec![Node::utterance("e")],
            vec![Node::utterance("k"), Node::Placeholder],
        );
        let nfa = build_nfa(&r, &inventory(), true).unwrap();
        assert!(nfa.edge_transform(START, Symbol::Char('k')).is_none());
        assert_eq!(nfa.transforms().len(), 2);
    }
}
