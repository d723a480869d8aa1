// Rule-file lexer and the token cursor the parser reads from.
//
// The whole file is tokenized up front. Unrecognized characters become
// `Error` tokens; the parser reports them and skips the statement.

use std::iter::Peekable;
use std::str::Chars;

use shift_core::character::{CharClass, classify, is_ident_char};
use shift_core::token::{Position, Token, TokenKind};

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// Character scanner producing [`Token`]s.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    /// Open `{` count: newlines inside braces do not end a statement.
    brace_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            brace_depth: 0,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Produce the next token, `Eof` once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        loop {
            let position = self.position();
            let Some(&c) = self.chars.peek() else {
                return Token::eof(position);
            };
            match classify(c) {
                CharClass::Whitespace => {
                    self.bump();
                }
                CharClass::Newline => {
                    self.bump();
                    if self.brace_depth == 0 {
                        return Token::new(TokenKind::Newline, "\n", position);
                    }
                }
                CharClass::Comment => {
                    while self.chars.peek().is_some_and(|&c| c != '\n') {
                        self.bump();
                    }
                }
                CharClass::Sigil => return self.identifier(position),
                CharClass::Segment => return self.word(position),
                CharClass::Syntax => return self.punctuation(c, position),
                CharClass::Unknown => {
                    self.bump();
                    return Token::new(TokenKind::Error, c.to_string(), position);
                }
            }
        }
    }

    fn punctuation(&mut self, c: char, position: Position) -> Token {
        self.bump();
        let kind = match c {
            '[' => TokenKind::LBrack,
            ']' => TokenKind::RBrack,
            '{' => {
                self.brace_depth += 1;
                TokenKind::LBrace
            }
            '}' => {
                self.brace_depth = self.brace_depth.saturating_sub(1);
                TokenKind::RBrace
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '/' => TokenKind::Slash,
            '_' => TokenKind::Placeholder,
            '#' => TokenKind::Boundary,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '|' => TokenKind::Pipe,
            ',' => TokenKind::Comma,
            '=' => {
                if self.chars.peek() == Some(&'>') {
                    self.bump();
                    return Token::new(TokenKind::Arrow, "=>", position);
                }
                TokenKind::Error
            }
            _ => TokenKind::Error,
        };
        Token::new(kind, c.to_string(), position)
    }

    /// `$name` or `$name.`: ASCII alphanumerics with inner hyphens.
    fn identifier(&mut self, position: Position) -> Token {
        self.bump();
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_char(c) {
                break;
            }
            if c == '-' && !self.hyphen_continues() {
                break;
            }
            name.push(c);
            self.bump();
        }
        if name.is_empty() {
            return Token::new(TokenKind::Error, "$", position);
        }
        if self.chars.peek() == Some(&'.') {
            self.bump();
        }
        Token::new(TokenKind::Ident, name, position)
    }

    /// A hyphen belongs to an identifier only when an alphanumeric follows.
    fn hyphen_continues(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().is_some_and(|c| c.is_ascii_alphanumeric())
    }

    fn word(&mut self, position: Position) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if classify(c) != CharClass::Segment {
                break;
            }
            text.push(c);
            self.bump();
        }
        Token::new(TokenKind::Word, text, position)
    }
}

/// Tokenize a whole rule file. The result always ends with one `Eof` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.is(TokenKind::Eof);
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

// ---------------------------------------------------------------------------
// TokenCursor
// ---------------------------------------------------------------------------

/// Random-access cursor over a token buffer with `next`/`peek`/`back`.
///
/// Reading past the end keeps returning the final `Eof` token.
#[derive(Debug, Clone)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenCursor {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(|t| t.is(TokenKind::Eof)) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::eof(position));
        }
        Self { tokens, pos: 0 }
    }

    pub fn from_source(source: &str) -> Self {
        Self::new(tokenize(source))
    }

    fn last_index(&self) -> usize {
        self.tokens.len() - 1
    }

    /// Consume and return the current token.
    pub fn next(&mut self) -> Token {
        let index = self.pos.min(self.last_index());
        if self.pos <= self.last_index() {
            self.pos += 1;
        }
        self.tokens[index].clone()
    }

    /// The current token, not consumed.
    pub fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    /// The token `n` places after the current one.
    pub fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.pos + n).min(self.last_index());
        &self.tokens[index]
    }

    /// Step back one token.
    pub fn back(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// The most recently consumed token.
    pub fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).map(|i| &self.tokens[i.min(self.last_index())])
    }

    pub fn at_end(&self) -> bool {
        self.peek().is(TokenKind::Eof)
    }
}
