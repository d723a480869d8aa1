// Input alphabet of the rule transducers: Unicode code points plus three
// sentinels.

use std::fmt;

/// Display character for the LAMBDA (epsilon) sentinel.
pub const LAMBDA_CHAR: char = '\u{2400}';

/// Display character for the START boundary sentinel.
pub const START_CHAR: char = '\u{2402}';

/// Display character for the END boundary sentinel.
pub const END_CHAR: char = '\u{2403}';

/// One input symbol.
///
/// The derived ordering puts the sentinels before all code points, which
/// keeps transition listings stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    /// Epsilon: traversed without consuming input.
    Lambda,
    /// Start-of-word boundary.
    Start,
    /// End-of-word boundary.
    End,
    /// A literal code point.
    Char(char),
}

impl Symbol {
    /// The literal character, if this is not a sentinel.
    pub fn as_char(self) -> Option<char> {
        match self {
            Symbol::Char(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_sentinel(self) -> bool {
        !matches!(self, Symbol::Char(_))
    }

    /// Coat a word with START/END sentinels.
    pub fn coat(word: &str) -> Vec<Symbol> {
        let mut symbols = Vec::with_capacity(word.len() + 2);
        symbols.push(Symbol::Start);
        symbols.extend(word.chars().map(Symbol::Char));
        symbols.push(Symbol::End);
        symbols
    }
}

impl From<char> for Symbol {
    fn from(c: char) -> Self {
        Symbol::Char(c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Symbol::Lambda => LAMBDA_CHAR,
            Symbol::Start => START_CHAR,
            Symbol::End => END_CHAR,
            Symbol::Char(c) => *c,
        };
        write!(f, "{c}")
    }
}
