// Rule-file tokens: kinds, source positions, and display names used in
// parse error messages.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A 1-based (line, column) location in a rule file.
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

// ---------------------------------------------------------------------------
// TokenKind
// ---------------------------------------------------------------------------

/// Token kinds produced by the rule-file lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `[`
    LBrack,
    /// `]`
    RBrack,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `/`
    Slash,
    /// `_`
    Placeholder,
    /// `#`
    Boundary,
    /// `=>`
    Arrow,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `|`
    Pipe,
    /// `,`
    Comma,
    /// A run of segment characters: a literal utterance or a bare name.
    Word,
    /// A `$`-prefixed identifier. The token text holds the bare name.
    Ident,
    /// End of a line. Statements are line-terminated.
    Newline,
    /// A character the lexer does not recognize.
    Error,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Human-readable description used in "expected ..." messages.
    ///
    /// Punctuation kinds render as their quoted literal (`'['`), the rest by
    /// name.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::LBrack => "'['",
            TokenKind::RBrack => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Slash => "'/'",
            TokenKind::Placeholder => "'_'",
            TokenKind::Boundary => "'#'",
            TokenKind::Arrow => "'=>'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Pipe => "'|'",
            TokenKind::Comma => "','",
            TokenKind::Word => "an utterance",
            TokenKind::Ident => "an identifier",
            TokenKind::Newline => "end of line",
            TokenKind::Error => "an unrecognized character",
            TokenKind::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A lexical unit with its literal text and source position.
///
/// Tokens are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// An end-of-input token at the given position.
    pub fn eof(position: Position) -> Self {
        Self {
            kind: TokenKind::Eof,
            text: String::new(),
            position,
        }
    }

    /// The text shown for this token in "got '...'" messages.
    pub fn shown(&self) -> &str {
        match self.kind {
            TokenKind::Eof => "EOF",
            TokenKind::Newline => "\\n",
            _ => &self.text,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
