// Declared categories and feature-sets, resolved into member sets.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use shift_core::ast::{CategoryDecl, FeatureSetDecl, Node, SetRef};
use shift_fst::SegmentTrie;

use crate::error::{ReferenceKind, RuleError};

/// Everything a rule may reference by name.
///
/// Category includes are resolved when the category is declared, against
/// the declarations seen so far, so a resolved category is a flat set of
/// segments. A later declaration with the same name replaces the earlier
/// one for subsequent statements.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    categories: HashMap<String, BTreeSet<String>>,
    features: HashMap<String, FeatureSetDecl>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve and record a category declaration.
    pub fn declare_category(&mut self, decl: &CategoryDecl) -> Result<(), RuleError> {
        let mut members = decl.members.clone();
        for include in &decl.includes {
            if let SetRef::Category(name) = include {
                if *name == decl.name && !self.categories.contains_key(name) {
                    return Err(RuleError::CyclicCategory { name: name.clone() });
                }
            }
            members.extend(self.members(include)?);
        }
        self.categories.insert(decl.name.clone(), members);
        Ok(())
    }

    pub fn declare_feature_set(&mut self, decl: &FeatureSetDecl) {
        self.features.insert(decl.name.clone(), decl.clone());
    }

    pub fn category(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.categories.get(name)
    }

    pub fn feature_set(&self, name: &str) -> Result<&FeatureSetDecl, RuleError> {
        self.features
            .get(name)
            .ok_or_else(|| RuleError::UndefinedReference {
                kind: ReferenceKind::FeatureSet,
                name: name.to_string(),
            })
    }

    /// Members of a single set reference.
    ///
    /// A bare name is looked up as a category first and then as a
    /// feature-set, which stands for all of its members.
    pub fn members(&self, set: &SetRef) -> Result<BTreeSet<String>, RuleError> {
        match set {
            SetRef::Category(name) => {
                if let Some(members) = self.categories.get(name) {
                    return Ok(members.clone());
                }
                match self.features.get(name) {
                    Some(feature) => Ok(feature.members.clone()),
                    None => Err(RuleError::UndefinedReference {
                        kind: ReferenceKind::Category,
                        name: name.clone(),
                    }),
                }
            }
            SetRef::Feature { present, name } => {
                Ok(self.feature_set(name)?.members_for(*present))
            }
        }
    }

    /// Members matched by a set node. Compound sets intersect their parts.
    pub fn members_of(&self, node: &Node) -> Result<BTreeSet<String>, RuleError> {
        match node {
            Node::Category(name) => self.members(&SetRef::Category(name.clone())),
            Node::Feature { present, name } => self.members(&SetRef::Feature {
                present: *present,
                name: name.clone(),
            }),
            Node::Compound(parts) => {
                let mut sets = parts.iter().map(|part| self.members(part));
                let mut acc = match sets.next() {
                    Some(first) => first?,
                    None => return Ok(BTreeSet::new()),
                };
                for set in sets {
                    let set = set?;
                    acc.retain(|m| set.contains(m));
                }
                Ok(acc)
            }
            _ => Ok(BTreeSet::new()),
        }
    }

    /// Character trie over the members of a set node.
    pub fn trie(&self, node: &Node) -> Result<SegmentTrie, RuleError> {
        Ok(SegmentTrie::from_members(self.members_of(node)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice() -> FeatureSetDecl {
        let mut fs = FeatureSetDecl::new("voice");
        fs.add_pair("p", "b").unwrap();
        fs.add_pair("t", "d").unwrap();
        fs.add_member("m");
        fs
    }

    fn category(name: &str, members: &[&str], includes: Vec<SetRef>) -> CategoryDecl {
        let mut decl = CategoryDecl::new(name);
        decl.members.extend(members.iter().map(|m| m.to_string()));
        decl.includes = includes;
        decl
    }

    fn names(set: BTreeSet<String>) -> Vec<String> {
        set.into_iter().collect()
    }

    #[test]
    fn includes_resolve_transitively() {
        let mut inv = Inventory::new();
        inv.declare_feature_set(&voice());
        inv.declare_category(&category("F", &["i", "e"], vec![])).unwrap();
        inv.declare_category(&category("V", &["a"], vec![SetRef::Category("F".into())]))
            .unwrap();
        inv.declare_category(&category(
            "S",
            &[],
            vec![
                SetRef::Category("V".into()),
                SetRef::Feature {
                    present: false,
                    name: "voice".into(),
                },
            ],
        ))
        .unwrap();
        assert_eq!(names(inv.category("S").unwrap().clone()), vec!["a", "e", "i", "p", "t"]);
    }

    #[test]
    fn self_include_is_cyclic() {
        let mut inv = Inventory::new();
        let err = inv
            .declare_category(&category("V", &["a"], vec![SetRef::Category("V".into())]))
            .unwrap_err();
        assert_eq!(err, RuleError::CyclicCategory { name: "V".into() });
    }

    #[test]
    fn undefined_include() {
        let mut inv = Inventory::new();
        let err = inv
            .declare_category(&category("V", &["a"], vec![SetRef::Category("X".into())]))
            .unwrap_err();
        assert!(matches!(
            err,
            RuleError::UndefinedReference {
                kind: ReferenceKind::Category,
                ..
            }
        ));
    }

    #[test]
    fn feature_polarity_members() {
        let mut inv = Inventory::new();
        inv.declare_feature_set(&voice());
        let plus = inv.members_of(&Node::feature(true, "voice")).unwrap();
        let minus = inv.members_of(&Node::feature(false, "voice")).unwrap();
        assert_eq!(names(plus), vec!["b", "d", "m"]);
        assert_eq!(names(minus), vec!["p", "t"]);
        let all = inv.members_of(&Node::Category("voice".into())).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn compound_intersects() {
        let mut inv = Inventory::new();
        inv.declare_feature_set(&voice());
        inv.declare_category(&category("Stop", &["p", "b", "k"], vec![])).unwrap();
        let node = Node::Compound(vec![
            SetRef::Feature {
                present: true,
                name: "voice".into(),
            },
            SetRef::Category("Stop".into()),
        ]);
        assert_eq!(names(inv.members_of(&node).unwrap()), vec!["b"]);
    }

    #[test]
    fn undefined_feature() {
        let inv = Inventory::new();
        let err = inv.members_of(&Node::feature(true, "nasal")).unwrap_err();
        assert_eq!(err.to_string(), "Undefined feature-set 'nasal'.");
    }

    #[test]
    fn trie_from_category() {
        let mut inv = Inventory::new();
        inv.declare_category(&category("T", &["t", "ts"], vec![])).unwrap();
        let trie = inv.trie(&Node::Category("T".into())).unwrap();
        assert!(trie.contains("t"));
        assert!(trie.contains("ts"));
    }
}
