// Character trie over a set of (possibly multi-character) segments.
//
// Nodes live in an arena; parent links are indices.

use std::collections::BTreeSet;

/// Index of a node in a [`SegmentTrie`].
pub type NodeIndex = usize;

/// One trie node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieNode {
    /// Character on the edge from the parent. `None` for the root.
    pub ch: Option<char>,
    pub parent: Option<NodeIndex>,
    /// Children ordered by character.
    pub children: Vec<NodeIndex>,
    /// The member spelled by the path to this node, when it is final.
    pub member: Option<String>,
}

impl TrieNode {
    pub fn is_final(&self) -> bool {
        self.member.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A trie over the members of a category or feature-set.
///
/// A member that is a prefix of another (`t` and `ts`) marks its node final
/// and keeps the children for the longer member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTrie {
    nodes: Vec<TrieNode>,
}

impl SegmentTrie {
    pub const ROOT: NodeIndex = 0;

    /// Build a trie from member strings. Empty strings are ignored.
    pub fn from_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted: BTreeSet<String> = members
            .into_iter()
            .map(|m| m.as_ref().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        let mut trie = Self {
            nodes: vec![TrieNode {
                ch: None,
                parent: None,
                children: Vec::new(),
                member: None,
            }],
        };
        for member in sorted {
            let mut node = Self::ROOT;
            for c in member.chars() {
                node = trie.child_or_insert(node, c);
            }
            trie.nodes[node].member = Some(member);
        }
        trie
    }

    fn child_or_insert(&mut self, parent: NodeIndex, c: char) -> NodeIndex {
        if let Some(existing) = self.child(parent, c) {
            return existing;
        }
        let index = self.nodes.len();
        self.nodes.push(TrieNode {
            ch: Some(c),
            parent: Some(parent),
            children: Vec::new(),
            member: None,
        });
        let nodes = &self.nodes;
        let children = &self.nodes[parent].children;
        let at = children.partition_point(|&i| nodes[i].ch < Some(c));
        self.nodes[parent].children.insert(at, index);
        index
    }

    /// The child of `node` reached by `c`.
    pub fn child(&self, node: NodeIndex, c: char) -> Option<NodeIndex> {
        self.nodes[node]
            .children
            .iter()
            .copied()
            .find(|&i| self.nodes[i].ch == Some(c))
    }

    pub fn node(&self, index: NodeIndex) -> &TrieNode {
        &self.nodes[index]
    }

    pub fn root(&self) -> &TrieNode {
        &self.nodes[Self::ROOT]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the trie has no members.
    pub fn is_empty(&self) -> bool {
        self.root().is_leaf()
    }

    /// Characters that can start a member.
    pub fn first_chars(&self) -> BTreeSet<char> {
        self.root()
            .children
            .iter()
            .filter_map(|&i| self.nodes[i].ch)
            .collect()
    }

    pub fn contains(&self, segment: &str) -> bool {
        let mut node = Self::ROOT;
        for c in segment.chars() {
            match self.child(node, c) {
                Some(next) => node = next,
                None => return false,
            }
        }
        node != Self::ROOT && self.nodes[node].is_final()
    }

    /// All members in sorted order.
    pub fn members(&self) -> Vec<&str> {
        let mut members: Vec<&str> = self
            .nodes
            .iter()
            .filter_map(|n| n.member.as_deref())
            .collect();
        members.sort_unstable();
        members
    }

    /// Spell the path from the root to `index` by walking parent links.
    pub fn path(&self, index: NodeIndex) -> String {
        let mut chars = Vec::new();
        let mut node = Some(index);
        while let Some(i) = node {
            if let Some(c) = self.nodes[i].ch {
                chars.push(c);
            }
            node = self.nodes[i].parent;
        }
        chars.iter().rev().collect()
    }
}
