// Character classification for rule files and words.

// ---------------------------------------------------------------------------
// Diacritics and modifiers
// ---------------------------------------------------------------------------

/// First code point of the reserved diacritic/modifier range
/// (spacing modifier letters through combining diacritical marks).
pub const MODIFIER_FIRST: char = '\u{02B0}';

/// Last code point of the reserved diacritic/modifier range.
pub const MODIFIER_LAST: char = '\u{0341}';

/// Check whether a character is a diacritic or modifier letter.
///
/// A modifier directly after a completed match belongs to the matched
/// segment (`tʰ` is not `t` followed by something else), so the transducer
/// never ends a match right before one.
pub fn is_modifier(c: char) -> bool {
    (MODIFIER_FIRST..=MODIFIER_LAST).contains(&c)
}

// ---------------------------------------------------------------------------
// Rule-file character classes
// ---------------------------------------------------------------------------

/// Character class of a single rule-file character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    /// Space, tab or carriage return. Newlines are classified separately.
    Whitespace,
    /// `\n`
    Newline,
    /// A punctuation character with syntactic meaning in the rule grammar.
    Syntax,
    /// `;` starts a comment that runs to the end of the line.
    Comment,
    /// `$` starts an identifier.
    Sigil,
    /// A character that may appear inside a segment or name.
    Segment,
    /// Anything else: ASCII punctuation with no meaning, control characters.
    Unknown,
}

/// Classify a rule-file character.
pub fn classify(c: char) -> CharClass {
    match c {
        '\n' => CharClass::Newline,
        ' ' | '\t' | '\r' | '\u{00A0}' | '\u{FEFF}' => CharClass::Whitespace,
        '[' | ']' | '{' | '}' | '(' | ')' | '/' | '_' | '#' | '=' | '+' | '-' | '|' | ',' => {
            CharClass::Syntax
        }
        ';' => CharClass::Comment,
        '$' => CharClass::Sigil,
        c if c.is_whitespace() => CharClass::Whitespace,
        c if c.is_control() => CharClass::Unknown,
        c if c.is_ascii_punctuation() => CharClass::Unknown,
        _ => CharClass::Segment,
    }
}

/// Check whether a character can be part of a segment or a name.
///
/// Letters of any script, IPA symbols, digits and modifiers all qualify; the
/// grammar's punctuation does not.
pub fn is_segment_char(c: char) -> bool {
    classify(c) == CharClass::Segment
}

/// Check whether a character may continue a `$` identifier
/// (ASCII alphanumerics and inner hyphens).
pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}
