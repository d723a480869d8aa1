// Rule-file syntax tree: segment nodes, declarations and rules.
//
// Every node renders back to rule syntax through `Display`; verbose traces
// print rules and transformation sources that way.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::token::Position;

// ---------------------------------------------------------------------------
// Segment nodes
// ---------------------------------------------------------------------------

/// Which word edge a `#` boundary matches.
///
/// Resolved by the parser: a boundary with nothing before it in the
/// environment matches the start of the word, any other one the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Start,
    End,
}

/// One member of a compound set: a named set or a signed feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetRef {
    /// A category (or, failing that, a feature-set's full member list).
    Category(String),
    /// `+name` or `-name`.
    Feature { present: bool, name: String },
}

impl SetRef {
    pub fn name(&self) -> &str {
        match self {
            SetRef::Category(name) => name,
            SetRef::Feature { name, .. } => name,
        }
    }
}

impl fmt::Display for SetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetRef::Category(name) => f.write_str(name),
            SetRef::Feature { present, name } => {
                write!(f, "{}{}", if *present { '+' } else { '-' }, name)
            }
        }
    }
}

/// A segment-level syntax node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// A literal segment string.
    Utterance(String),
    /// A bare category reference.
    Category(String),
    /// A signed feature reference, `[+name]` / `[-name]`.
    Feature { present: bool, name: String },
    /// The intersection of two or more set references, `[+voice -nasal C]`.
    Compound(Vec<SetRef>),
    /// `( ... )`: matched zero or one time.
    Optional(Vec<Node>),
    /// `(A|B|C)`: exactly one branch matches. Branches may be empty.
    Disjunction(Vec<Vec<Node>>),
    /// `#`
    Boundary(BoundaryKind),
    /// `_`: stands in for the rule's target/result pair.
    Placeholder,
}

impl Node {
    pub fn utterance(text: impl Into<String>) -> Self {
        Node::Utterance(text.into())
    }

    pub fn feature(present: bool, name: impl Into<String>) -> Self {
        Node::Feature {
            present,
            name: name.into(),
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, Node::Boundary(_))
    }

    /// True for nodes that name a set of segments.
    pub fn is_set(&self) -> bool {
        matches!(self, Node::Category(_) | Node::Feature { .. } | Node::Compound(_))
    }
}

impl From<SetRef> for Node {
    fn from(set: SetRef) -> Self {
        match set {
            SetRef::Category(name) => Node::Category(name),
            SetRef::Feature { present, name } => Node::Feature { present, name },
        }
    }
}

/// Render a node sequence without separators.
pub fn display_seq(nodes: &[Node]) -> String {
    nodes.iter().map(ToString::to_string).collect()
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Utterance(text) => f.write_str(text),
            Node::Category(name) => f.write_str(name),
            Node::Feature { present, name } => {
                write!(f, "[{}{}]", if *present { '+' } else { '-' }, name)
            }
            Node::Compound(children) => {
                let inner: Vec<String> = children.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", inner.join(" "))
            }
            Node::Optional(children) => write!(f, "({})", display_seq(children)),
            Node::Disjunction(branches) => {
                let inner: Vec<String> = branches.iter().map(|b| display_seq(b)).collect();
                write!(f, "({})", inner.join("|"))
            }
            Node::Boundary(_) => f.write_str("#"),
            Node::Placeholder => f.write_str("_"),
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A named phoneme class: `V { a e i o u }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDecl {
    pub name: String,
    /// Literal member segments.
    pub members: BTreeSet<String>,
    /// Other categories or feature-sets whose members are included.
    pub includes: Vec<SetRef>,
}

impl CategoryDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
            includes: Vec::new(),
        }
    }
}

impl fmt::Display for CategoryDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        for member in &self.members {
            write!(f, " {member}")?;
        }
        for include in &self.includes {
            write!(f, " [{include}]")?;
        }
        f.write_str(" }")
    }
}

/// Why a transform pair could not be added to a feature-set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureConflict {
    /// The base form already has a marked counterpart.
    #[error("'{base}' is already transformed to '{existing}'.")]
    BaseMapped { base: String, existing: String },
    /// The marked form already has a base counterpart.
    #[error("'{marked}' is already the transform of '{existing}'.")]
    MarkedMapped { marked: String, existing: String },
}

/// A named binary feature: `[voice] { p => b, t => d, m }`.
///
/// `additions` maps a base form to its marked form and `removals` is its
/// exact inverse. Bare members (no `=>`) carry the feature and have no
/// counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSetDecl {
    pub name: String,
    pub members: BTreeSet<String>,
    pub additions: BTreeMap<String, String>,
    pub removals: BTreeMap<String, String>,
}

impl FeatureSetDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
            additions: BTreeMap::new(),
            removals: BTreeMap::new(),
        }
    }

    /// Add a bare member.
    pub fn add_member(&mut self, segment: impl Into<String>) {
        self.members.insert(segment.into());
    }

    /// Add a `base => marked` pair, keeping additions and removals inverse.
    pub fn add_pair(
        &mut self,
        base: impl Into<String>,
        marked: impl Into<String>,
    ) -> Result<(), FeatureConflict> {
        let base = base.into();
        let marked = marked.into();
        if let Some(existing) = self.additions.get(&base) {
            if *existing != marked {
                return Err(FeatureConflict::BaseMapped {
                    base,
                    existing: existing.clone(),
                });
            }
        }
        if let Some(existing) = self.removals.get(&marked) {
            if *existing != base {
                return Err(FeatureConflict::MarkedMapped {
                    marked,
                    existing: existing.clone(),
                });
            }
        }
        self.members.insert(base.clone());
        self.members.insert(marked.clone());
        self.additions.insert(base.clone(), marked.clone());
        self.removals.insert(marked, base);
        Ok(())
    }

    /// Segments lacking the feature: the base forms.
    pub fn minus_members(&self) -> BTreeSet<String> {
        self.additions.keys().cloned().collect()
    }

    /// Segments carrying the feature: every member that is not a base form.
    pub fn plus_members(&self) -> BTreeSet<String> {
        self.members
            .iter()
            .filter(|m| !self.additions.contains_key(*m))
            .cloned()
            .collect()
    }

    /// Members of `[+name]` (`present`) or `[-name]`.
    pub fn members_for(&self, present: bool) -> BTreeSet<String> {
        if present {
            self.plus_members()
        } else {
            self.minus_members()
        }
    }

    /// Map a segment through the feature: `[+name]` adds it, `[-name]`
    /// removes it. Returns `None` when the segment has no counterpart.
    pub fn transform(&self, present: bool, segment: &str) -> Option<&str> {
        let map = if present { &self.additions } else { &self.removals };
        map.get(segment).map(String::as_str)
    }
}

impl fmt::Display for FeatureSetDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {{", self.name)?;
        let mut first = true;
        for member in &self.members {
            if self.removals.contains_key(member) {
                continue;
            }
            f.write_str(if first { " " } else { ", " })?;
            first = false;
            match self.additions.get(member) {
                Some(marked) => write!(f, "{member} => {marked}")?,
                None => f.write_str(member)?,
            }
        }
        f.write_str(" }")
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A sound-change rule: `target / result / environment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub target: Vec<Node>,
    pub result: Vec<Node>,
    pub environment: Vec<Node>,
    /// Position of the rule's first token.
    pub position: Position,
}

impl Rule {
    pub fn new(target: Vec<Node>, result: Vec<Node>, environment: Vec<Node>) -> Self {
        Self {
            target,
            result,
            environment,
            position: Position::default(),
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            display_seq(&self.target),
            display_seq(&self.result),
            display_seq(&self.environment)
        )
    }
}

/// A top-level statement of a rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Category(CategoryDecl),
    FeatureSet(FeatureSetDecl),
    Rule(Rule),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Category(decl) => decl.fmt(f),
            Statement::FeatureSet(decl) => decl.fmt(f),
            Statement::Rule(rule) => rule.fmt(f),
        }
    }
}
