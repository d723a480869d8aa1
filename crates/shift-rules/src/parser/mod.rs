// Recursive-descent parser for rule files.
//
// A rule file is a sequence of line-terminated statements:
//
//   V { a e i o u }                       category
//   [voice] { p => b, t => d, m }         feature-set
//   [-voice] => [+voice] / V _ V          rule
//
// A statement that fails to parse is reported and skipped; parsing resumes
// at the next line.

use hashbrown::HashSet;

use shift_core::ast::{BoundaryKind, CategoryDecl, FeatureSetDecl, Node, Rule, SetRef, Statement};
use shift_core::token::{Position, Token, TokenKind};

use crate::error::RuleError;
use crate::lexer::TokenCursor;

/// Which part of a rule a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Target,
    Result,
    Environment,
}

impl Context {
    fn production(self) -> &'static str {
        match self {
            Context::Target => "RuleTarget",
            Context::Result => "RuleResult",
            Context::Environment => "RuleEnvironment",
        }
    }
}

const BOUNDARY_AT_ENDS: &str = "Boundary token may only appear at each end of the environment segment.";

/// Statement parser over a tokenized rule file.
///
/// Yields one `Result` per statement; see [`Parser::parse_next`].
pub struct Parser {
    cursor: TokenCursor,
    /// Categories declared so far. A bare word naming one is a reference.
    categories: HashSet<String>,
    /// Line the most recent statement started on.
    line: usize,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self::from_cursor(TokenCursor::from_source(source))
    }

    pub fn from_cursor(cursor: TokenCursor) -> Self {
        Self {
            cursor,
            categories: HashSet::new(),
            line: 1,
        }
    }

    /// Line the statement returned by the last [`parse_next`](Self::parse_next)
    /// started on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Parse the next statement. `None` once the input is exhausted.
    ///
    /// After an error the rest of the offending statement is skipped, so the
    /// following call starts on the next line.
    pub fn parse_next(&mut self) -> Option<Result<Statement, RuleError>> {
        while self.cursor.peek().is(TokenKind::Newline) {
            self.cursor.next();
        }
        if self.cursor.at_end() {
            return None;
        }
        self.line = self.cursor.peek().position.line;
        let result = self.statement();
        if result.is_err() {
            self.recover();
        }
        Some(result)
    }

    fn statement(&mut self) -> Result<Statement, RuleError> {
        let first = self.cursor.peek();
        let named = matches!(first.kind, TokenKind::Word | TokenKind::Ident);
        if named && self.cursor.peek_nth(1).is(TokenKind::LBrace) {
            return self.category().map(Statement::Category);
        }
        if first.is(TokenKind::LBrack) && self.at_feature_set_decl() {
            return self.feature_set().map(Statement::FeatureSet);
        }
        self.rule().map(Statement::Rule)
    }

    fn at_feature_set_decl(&self) -> bool {
        matches!(
            self.cursor.peek_nth(1).kind,
            TokenKind::Word | TokenKind::Ident
        ) && self.cursor.peek_nth(2).is(TokenKind::RBrack)
            && self.cursor.peek_nth(3).is(TokenKind::LBrace)
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn category(&mut self) -> Result<CategoryDecl, RuleError> {
        let name = self.cursor.next();
        self.expect(TokenKind::LBrace, "Category", "'{'")?;
        let mut decl = CategoryDecl::new(name.text.clone());
        loop {
            let tok = self.cursor.next();
            match tok.kind {
                TokenKind::Word if self.categories.contains(&tok.text) => {
                    decl.includes.push(SetRef::Category(tok.text));
                }
                TokenKind::Word => {
                    decl.members.insert(tok.text);
                }
                TokenKind::Ident => decl.includes.push(SetRef::Category(tok.text)),
                TokenKind::LBrack => match self.set_identifier()? {
                    Node::Category(name) => decl.includes.push(SetRef::Category(name)),
                    Node::Feature { present, name } => {
                        decl.includes.push(SetRef::Feature { present, name });
                    }
                    _ => {
                        return Err(RuleError::syntax(
                            "Category",
                            "Category member may not be a compound set identifier.",
                            tok.position,
                        ));
                    }
                },
                TokenKind::Comma => {}
                TokenKind::RBrace => break,
                _ => {
                    return Err(self.unexpected(
                        "Category",
                        "an utterance, an identifier, '[' or '}'",
                        &tok,
                    ));
                }
            }
        }
        self.end_of_statement("Category")?;
        self.categories.insert(name.text);
        Ok(decl)
    }

    fn feature_set(&mut self) -> Result<FeatureSetDecl, RuleError> {
        self.cursor.next();
        let name = self.cursor.next();
        self.cursor.next();
        self.expect(TokenKind::LBrace, "FeatureSet", "'{'")?;
        let mut decl = FeatureSetDecl::new(name.text);
        loop {
            let tok = self.cursor.next();
            match tok.kind {
                TokenKind::Word if self.cursor.peek().is(TokenKind::Arrow) => {
                    self.cursor.next();
                    let marked = self.expect(TokenKind::Word, "Member", "an utterance")?;
                    decl.add_pair(tok.text, marked.text).map_err(|conflict| {
                        RuleError::syntax("Member", conflict.to_string(), tok.position)
                    })?;
                }
                TokenKind::Word => decl.add_member(tok.text),
                TokenKind::Comma => {}
                TokenKind::RBrace => break,
                _ => return Err(self.unexpected("Member", "an utterance, '=>' or '}'", &tok)),
            }
        }
        self.end_of_statement("FeatureSet")?;
        Ok(decl)
    }

    // -----------------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------------

    fn rule(&mut self) -> Result<Rule, RuleError> {
        let start = self.cursor.peek().position;
        let target = self.target()?;

        let result_position = self.cursor.peek().position;
        let result = self.result()?;

        let env_position = self.cursor.peek().position;
        let (mut environment, positions) = self.environment()?;

        if result.iter().any(|n| matches!(n, Node::Compound(_))) {
            return Err(RuleError::syntax(
                "Rule",
                "Result may not contain a compound set identifier.",
                result_position,
            ));
        }
        if result.iter().any(|n| matches!(n, Node::Category(_))) {
            return Err(RuleError::syntax(
                "Rule",
                "Result may not contain a category identifier.",
                result_position,
            ));
        }
        if target.is_empty() {
            return Err(RuleError::syntax(
                "Rule",
                "Target segment may not be empty.",
                start,
            ));
        }
        let placeholders = environment
            .iter()
            .filter(|n| matches!(n, Node::Placeholder))
            .count();
        if placeholders != 1 {
            return Err(RuleError::syntax(
                "RuleEnvironment",
                "Environment must contain exactly one placeholder.",
                env_position,
            ));
        }
        let last = environment.len().saturating_sub(1);
        for (i, node) in environment.iter().enumerate() {
            if node.is_boundary() && i != 0 && i != last {
                return Err(RuleError::syntax("Rule", BOUNDARY_AT_ENDS, positions[i]));
            }
        }
        resolve_boundaries(&mut environment, true);

        Ok(Rule::new(target, result, environment).at(start))
    }

    /// Target segments up to and including the `/` or `=>` separator.
    fn target(&mut self) -> Result<Vec<Node>, RuleError> {
        let mut nodes = Vec::new();
        loop {
            let tok = self.cursor.peek().clone();
            if matches!(tok.kind, TokenKind::Slash | TokenKind::Arrow) {
                self.cursor.next();
                return Ok(nodes);
            }
            match self.segment(Context::Target)? {
                Some(node) => nodes.push(node),
                None => {
                    self.cursor.next();
                    return Err(self.unexpected(
                        "RuleTarget",
                        "an utterance, an identifier, '[', '(', '/' or '=>'",
                        &tok,
                    ));
                }
            }
        }
    }

    /// Result segments up to and including the `/` separator.
    fn result(&mut self) -> Result<Vec<Node>, RuleError> {
        let mut nodes = Vec::new();
        loop {
            let tok = self.cursor.peek().clone();
            if tok.is(TokenKind::Slash) {
                self.cursor.next();
                return Ok(nodes);
            }
            match self.segment(Context::Result)? {
                Some(node) => nodes.push(node),
                None => {
                    self.cursor.next();
                    return Err(self.unexpected("RuleResult", "an utterance, '[' or '/'", &tok));
                }
            }
        }
    }

    /// Environment segments to the end of the line, with their positions.
    fn environment(&mut self) -> Result<(Vec<Node>, Vec<Position>), RuleError> {
        let mut nodes = Vec::new();
        let mut positions = Vec::new();
        loop {
            let tok = self.cursor.peek().clone();
            match tok.kind {
                TokenKind::Newline => {
                    self.cursor.next();
                    break;
                }
                TokenKind::Eof => break,
                _ => match self.segment(Context::Environment)? {
                    Some(node) => {
                        nodes.push(node);
                        positions.push(tok.position);
                    }
                    None => {
                        self.cursor.next();
                        return Err(self.unexpected(
                            "RuleEnvironment",
                            "an utterance, an identifier, '_', '#', '[' or '('",
                            &tok,
                        ));
                    }
                },
            }
        }
        Ok((nodes, positions))
    }

    /// Parse one segment if the current token starts one in `context`.
    /// Leaves the cursor untouched and returns `None` otherwise.
    fn segment(&mut self, context: Context) -> Result<Option<Node>, RuleError> {
        let tok = self.cursor.peek().clone();
        let node = match tok.kind {
            TokenKind::Word => {
                self.cursor.next();
                if self.categories.contains(&tok.text) {
                    Node::Category(tok.text)
                } else {
                    Node::Utterance(tok.text)
                }
            }
            TokenKind::Ident => {
                self.cursor.next();
                Node::Category(tok.text)
            }
            TokenKind::LBrack => {
                self.cursor.next();
                self.set_identifier()?
            }
            TokenKind::LParen if context != Context::Result => {
                self.cursor.next();
                self.group(context, tok.position)?
            }
            TokenKind::Placeholder if context == Context::Environment => {
                self.cursor.next();
                Node::Placeholder
            }
            TokenKind::Boundary if context == Context::Environment => {
                self.cursor.next();
                Node::Boundary(BoundaryKind::End)
            }
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    /// `( ... )` or `( ... | ... )`, after the opening parenthesis.
    fn group(&mut self, context: Context, open: Position) -> Result<Node, RuleError> {
        let mut branches: Vec<Vec<Node>> = vec![Vec::new()];
        let mut boundary: Option<Position> = None;
        loop {
            let tok = self.cursor.peek().clone();
            match tok.kind {
                TokenKind::Pipe => {
                    self.cursor.next();
                    branches.push(Vec::new());
                }
                TokenKind::RParen => {
                    self.cursor.next();
                    break;
                }
                _ => match self.segment(context)? {
                    Some(Node::Placeholder) => {
                        return Err(RuleError::syntax(
                            "RuleEnvironment",
                            "Placeholder cannot be optional.",
                            tok.position,
                        ));
                    }
                    Some(node) => {
                        if node.is_boundary() && boundary.is_none() {
                            boundary = Some(tok.position);
                        }
                        if let Some(branch) = branches.last_mut() {
                            branch.push(node);
                        }
                    }
                    None => {
                        self.cursor.next();
                        return Err(self.unexpected(
                            context.production(),
                            "an utterance, an identifier, '[', '(', '|' or ')'",
                            &tok,
                        ));
                    }
                },
            }
        }

        if branches.len() == 1 {
            if let Some(position) = boundary {
                return Err(RuleError::syntax(
                    "RuleEnvironment",
                    "Boundary cannot be optional.",
                    position,
                ));
            }
            return Ok(Node::Optional(branches.remove(0)));
        }
        for branch in &branches {
            let last = branch.len().saturating_sub(1);
            let misplaced = branch
                .iter()
                .enumerate()
                .any(|(i, n)| n.is_boundary() && i != 0 && i != last);
            if misplaced {
                return Err(RuleError::syntax("RuleEnvironment", BOUNDARY_AT_ENDS, open));
            }
        }
        Ok(Node::Disjunction(branches))
    }

    /// `[name]`, `[+name]`, `[-name]` or a compound, after the `[`.
    fn set_identifier(&mut self) -> Result<Node, RuleError> {
        let mut refs = Vec::new();
        loop {
            let tok = self.cursor.next();
            match tok.kind {
                TokenKind::Word | TokenKind::Ident => refs.push(SetRef::Category(tok.text)),
                TokenKind::Plus | TokenKind::Minus => {
                    let name = self.cursor.next();
                    if !matches!(name.kind, TokenKind::Word | TokenKind::Ident) {
                        return Err(self.unexpected("SetIdentifier", "an identifier", &name));
                    }
                    refs.push(SetRef::Feature {
                        present: tok.is(TokenKind::Plus),
                        name: name.text,
                    });
                }
                TokenKind::RBrack => {
                    return match refs.len() {
                        0 => Err(RuleError::syntax(
                            "SetIdentifier",
                            "Compound set identifier cannot be empty.",
                            tok.position,
                        )),
                        1 => Ok(Node::from(refs.remove(0))),
                        _ => Ok(Node::Compound(refs)),
                    };
                }
                _ => {
                    return Err(self.unexpected(
                        "SetIdentifier",
                        "an identifier, '+', '-' or ']'",
                        &tok,
                    ));
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn expect(
        &mut self,
        kind: TokenKind,
        production: &'static str,
        expected: &str,
    ) -> Result<Token, RuleError> {
        let tok = self.cursor.next();
        if tok.is(kind) {
            Ok(tok)
        } else {
            Err(self.unexpected(production, expected, &tok))
        }
    }

    fn end_of_statement(&mut self, production: &'static str) -> Result<(), RuleError> {
        let tok = self.cursor.next();
        match tok.kind {
            TokenKind::Newline => Ok(()),
            TokenKind::Eof => {
                self.cursor.back();
                Ok(())
            }
            _ => Err(self.unexpected(production, "end of line", &tok)),
        }
    }

    fn unexpected(&self, production: &'static str, expected: &str, tok: &Token) -> RuleError {
        if tok.is(TokenKind::Error) {
            return RuleError::Lex {
                character: tok.text.clone(),
                position: tok.position,
            };
        }
        RuleError::Parse {
            production,
            expected: expected.to_string(),
            found: tok.shown().to_string(),
            position: tok.position,
        }
    }

    /// Skip the rest of a failed statement.
    fn recover(&mut self) {
        if self.cursor.previous().is_some_and(|t| t.is(TokenKind::Newline)) {
            return;
        }
        loop {
            let tok = self.cursor.next();
            if tok.is(TokenKind::Newline) {
                return;
            }
            if tok.is(TokenKind::Eof) {
                self.cursor.back();
                return;
            }
        }
    }
}

impl Iterator for Parser {
    type Item = Result<Statement, RuleError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parse_next()
    }
}

/// A boundary matches the word start when nothing can precede it in the
/// environment, the word end otherwise.
fn resolve_boundaries(nodes: &mut [Node], at_start: bool) {
    for (i, node) in nodes.iter_mut().enumerate() {
        let first = at_start && i == 0;
        match node {
            Node::Boundary(kind) => {
                *kind = if first {
                    BoundaryKind::Start
                } else {
                    BoundaryKind::End
                };
            }
            Node::Optional(children) => resolve_boundaries(children, first),
            Node::Disjunction(branches) => {
                for branch in branches {
                    resolve_boundaries(branch, first);
                }
            }
            _ => {}
        }
    }
}

/// Parse a whole source, collecting every statement result.
pub fn parse(source: &str) -> Vec<Result<Statement, RuleError>> {
    Parser::new(source).collect()
}
