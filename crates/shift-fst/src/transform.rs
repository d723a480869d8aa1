// Output annotations on automaton edges.
//
// A `TransformRule` is fixed at compile time. Each run of the transducer
// produces fresh `AppliedTransform` records, so a compiled machine can be
// shared between runs.

use std::fmt;

/// Index of a [`TransformRule`] in its owning automaton.
pub type TransformId = usize;

/// What an annotated edge does with the input it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    /// Emits the replacement text.
    Ordinary,
    /// Emits nothing. The consumed input is carried forward to the next
    /// ordinary transform of the same unit, or dropped when the unit is
    /// deleted.
    Null,
}

/// A compiled output annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRule {
    pub kind: TransformKind,
    /// Text emitted when the annotated edge is taken.
    pub replacement: String,
    /// Rule-syntax rendering of the matched target node.
    pub source: String,
    /// Rule-syntax rendering of the result node, empty for a deletion.
    pub target: String,
    /// Target unit this annotation belongs to. Annotations of one unit
    /// cooperate: a default transform does not fire when the edge taken
    /// continues the same unit.
    pub unit: u32,
}

impl TransformRule {
    pub fn ordinary(
        replacement: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        unit: u32,
    ) -> Self {
        Self {
            kind: TransformKind::Ordinary,
            replacement: replacement.into(),
            source: source.into(),
            target: target.into(),
            unit,
        }
    }

    pub fn null(source: impl Into<String>, target: impl Into<String>, unit: u32) -> Self {
        Self {
            kind: TransformKind::Null,
            replacement: String::new(),
            source: source.into(),
            target: target.into(),
            unit,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind == TransformKind::Null
    }

    /// Record one application of this rule.
    pub fn applied(&self, from_literal: impl Into<String>) -> AppliedTransform {
        AppliedTransform {
            from_literal: from_literal.into(),
            replacement: self.replacement.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }
}

/// One transformation committed while rewriting a word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AppliedTransform {
    /// The input text this transformation consumed.
    pub from_literal: String,
    /// The text it produced.
    pub replacement: String,
    pub source: String,
    pub target: String,
}

impl fmt::Display for AppliedTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) \u{2192} {} ({})",
            self.from_literal, self.source, self.replacement, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_copies_rule_text() {
        let rule = TransformRule::ordinary("b", "[-voice]", "[+voice]", 0);
        let applied = rule.applied("p");
        assert_eq!(applied.from_literal, "p");
        assert_eq!(applied.replacement, "b");
        assert_eq!(applied.to_string(), "p ([-voice]) \u{2192} b ([+voice])");
    }

    #[test]
    fn null_rule_has_no_replacement() {
        let rule = TransformRule::null("ab", "", 3);
        assert!(rule.is_null());
        assert!(rule.replacement.is_empty());
        assert_eq!(rule.applied("ab").to_string(), "ab (ab) \u{2192}  ()");
    }

    #[test]
    fn applying_does_not_touch_the_rule() {
        let rule = TransformRule::ordinary("e", "a", "e", 0);
        let first = rule.applied("a");
        let second = rule.applied("A");
        assert_ne!(first, second);
        assert_eq!(rule, TransformRule::ordinary("e", "a", "e", 0));
    }
}
