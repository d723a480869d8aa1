// Errors raised while compiling a rule file.

use std::fmt;

use shift_core::token::Position;
use shift_fst::FstError;

/// What kind of declaration a reference expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Category,
    FeatureSet,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Category => "category",
            ReferenceKind::FeatureSet => "feature-set",
        })
    }
}

/// Error type for rule-file compilation.
///
/// `Lex`, `Parse` and `Syntax` are raised by the parser and cost only the
/// offending statement. The others are raised while building a rule's
/// automaton and cost only that rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// An unrecognized character sequence.
    #[error("Unexpected character '{character}' at {position}.")]
    Lex { character: String, position: Position },

    /// The token stream did not match the grammar.
    #[error(
        "At line {line}, column {column} in '{production}': Expected {expected}, got '{found}'.",
        line = .position.line,
        column = .position.column
    )]
    Parse {
        production: &'static str,
        expected: String,
        found: String,
        position: Position,
    },

    /// A grammatical but invalid construct.
    #[error(
        "Line {line}, column {column} in '{production}': {message}",
        line = .position.line,
        column = .position.column
    )]
    Syntax {
        production: &'static str,
        message: String,
        position: Position,
    },

    /// A rule or category references an undeclared set.
    #[error("Undefined {kind} '{name}'.")]
    UndefinedReference { kind: ReferenceKind, name: String },

    /// A category includes itself.
    #[error("Category '{name}' includes itself.")]
    CyclicCategory { name: String },

    /// A result set reference has no target unit to act on.
    #[error("Result of '{rule}' has a feature reference with no target segment to apply to.")]
    UnalignedResult { rule: String },

    #[error(transparent)]
    Fst(#[from] FstError),
}

impl RuleError {
    pub fn syntax(production: &'static str, message: impl Into<String>, position: Position) -> Self {
        RuleError::Syntax {
            production,
            message: message.into(),
            position,
        }
    }

    /// Source position, for the errors that carry one.
    pub fn position(&self) -> Option<Position> {
        match self {
            RuleError::Lex { position, .. }
            | RuleError::Parse { position, .. }
            | RuleError::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// A compilation error tied to the statement it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line of the statement.
    pub line: usize,
    pub error: RuleError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error.position() {
            Some(_) => write!(f, "{}", self.error),
            None => write!(f, "Line {}: {}", self.line, self.error),
        }
    }
}
