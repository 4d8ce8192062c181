//! Yul+ to Yul transpiler.
//!
//! The rewrite works on the token stream and copies the source text between
//! tokens verbatim, so comments and layout survive. Supported Yul+ forms:
//!
//!   sig"function f(...)"   -> 4-byte selector literal
//!   topic"event E(...)"    -> 32-byte topic literal
//!   const NAME := literal  -> removed, uses of NAME inlined
//!   enum Name (A, B)       -> removed, uses of Name.A inlined as ordinals
//!   require / mslice / safeAdd / ... -> definitions injected where called

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::abi::{Signature, Topic};
use crate::builtins::{HELPERS, find_helper};
use crate::error::DialectSyntaxError;
use crate::lexer::{Token, TokenKind, lex};

/// Result of transpiling one Yul+ source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transpiled {
    pub yul: String,
    /// Distinct `sig"..."` literals in order of first appearance.
    pub signatures: Vec<Signature>,
    /// Distinct `topic"..."` literals in order of first appearance.
    pub topics: Vec<Topic>,
}

pub fn transpile(source: &str) -> Result<Transpiled, DialectSyntaxError> {
    let tokens = lex(source)?;
    let partners = match_brackets(source, &tokens)?;
    let mut rewriter = Rewriter {
        source,
        tokens: &tokens,
        partners: &partners,
        consts: HashMap::new(),
        enums: HashMap::new(),
        removed: Vec::new(),
        signatures: Vec::new(),
        topics: Vec::new(),
    };
    rewriter.collect_declarations()?;
    let injections = rewriter.plan_injections();
    let yul = rewriter.emit(&injections)?;
    Ok(Transpiled {
        yul,
        signatures: rewriter.signatures,
        topics: rewriter.topics,
    })
}

/// For every opening bracket token, the index of its closing partner.
fn match_brackets(source: &str, tokens: &[Token]) -> Result<Vec<Option<usize>>, DialectSyntaxError> {
    let mut partners = vec![None; tokens.len()];
    let mut open: Vec<usize> = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen | TokenKind::LBrace => open.push(index),
            TokenKind::RParen | TokenKind::RBrace => {
                let expected = if token.kind == TokenKind::RParen {
                    TokenKind::LParen
                } else {
                    TokenKind::LBrace
                };
                match open.pop() {
                    Some(start) if tokens[start].kind == expected => partners[start] = Some(index),
                    _ => {
                        return Err(DialectSyntaxError::at(
                            source,
                            token.start,
                            format!("unexpected '{}'", token.text(source)),
                        ));
                    }
                }
            }
            _ => {}
        }
    }
    match open.pop() {
        Some(start) => Err(DialectSyntaxError::at(
            source,
            tokens[start].start,
            format!("unclosed '{}'", tokens[start].text(source)),
        )),
        None => Ok(partners),
    }
}

struct Rewriter<'a> {
    source: &'a str,
    tokens: &'a [Token],
    partners: &'a [Option<usize>],
    /// const name -> literal text
    consts: HashMap<String, String>,
    /// enum name -> member -> ordinal
    enums: HashMap<String, HashMap<String, usize>>,
    /// Token index ranges (inclusive) of declarations that do not survive.
    removed: Vec<(usize, usize)>,
    signatures: Vec<Signature>,
    topics: Vec<Topic>,
}

impl<'a> Rewriter<'a> {
    fn collect_declarations(&mut self) -> Result<(), DialectSyntaxError> {
        let mut index = 0;
        while index < self.tokens.len() {
            match self.tokens[index].kind {
                TokenKind::Const => index = self.collect_const(index)?,
                TokenKind::Enum => index = self.collect_enum(index)?,
                _ => index += 1,
            }
        }
        Ok(())
    }

    fn collect_const(&mut self, start: usize) -> Result<usize, DialectSyntaxError> {
        let name = self.expect(start + 1, TokenKind::Ident, "expected constant name after 'const'")?;
        self.expect(start + 2, TokenKind::Assign, "expected ':=' after constant name")?;
        let value = self
            .tokens
            .get(start + 3)
            .filter(|token| self.is_literal(token))
            .ok_or_else(|| self.error_after(start + 2, "expected literal value for constant"))?;

        // Side-table entries are recorded when `emit` reaches the declaration.
        let literal = match value.kind {
            TokenKind::Sig => Signature::parse(value.text(self.source))
                .map_err(|message| self.error(value, message))?
                .literal(),
            TokenKind::Topic => Topic::parse(value.text(self.source))
                .map_err(|message| self.error(value, message))?
                .literal(),
            _ => value.text(self.source).to_string(),
        };
        let name_text = name.text(self.source);
        if self.is_declared(name_text) {
            return Err(self.error(name, format!("'{name_text}' is already declared")));
        }
        self.consts.insert(name_text.to_string(), literal);
        self.removed.push((start, start + 3));
        Ok(start + 4)
    }

    fn collect_enum(&mut self, start: usize) -> Result<usize, DialectSyntaxError> {
        let name = self.expect(start + 1, TokenKind::Ident, "expected enum name after 'enum'")?;
        let open = start + 2;
        self.expect(open, TokenKind::LParen, "expected '(' after enum name")?;
        let close = self.partners[open].unwrap_or(open);

        let mut members = HashMap::new();
        let mut expect_member = true;
        for index in open + 1..close {
            let token = &self.tokens[index];
            match (expect_member, token.kind) {
                (true, TokenKind::Ident) => {
                    let member = token.text(self.source).to_string();
                    if members.contains_key(&member) {
                        return Err(self.error(token, format!("duplicate enum member '{member}'")));
                    }
                    let ordinal = members.len();
                    members.insert(member, ordinal);
                    expect_member = false;
                }
                (false, TokenKind::Comma) => expect_member = true,
                _ => {
                    return Err(self.error(
                        token,
                        format!("unexpected '{}' in enum", token.text(self.source)),
                    ));
                }
            }
        }
        if members.is_empty() {
            return Err(self.error(name, "enum must declare at least one member"));
        }
        if expect_member {
            return Err(self.error(&self.tokens[close], "trailing ',' in enum"));
        }

        let name_text = name.text(self.source);
        if self.is_declared(name_text) {
            return Err(self.error(name, format!("'{name_text}' is already declared")));
        }
        self.enums.insert(name_text.to_string(), members);
        self.removed.push((start, close));
        Ok(close + 1)
    }

    /// For each block that receives helpers: its `{` token index and the
    /// helpers it needs, in table order.
    fn plan_injections(&self) -> HashMap<usize, Vec<&'static str>> {
        let has_objects = self.tokens.iter().any(|t| t.kind == TokenKind::Object);
        let blocks: Vec<usize> = if has_objects {
            self.tokens
                .windows(2)
                .enumerate()
                .filter(|(_, pair)| pair[0].kind == TokenKind::Code && pair[1].kind == TokenKind::LBrace)
                .map(|(index, _)| index + 1)
                .collect()
        } else {
            self.tokens
                .iter()
                .position(|t| t.kind == TokenKind::LBrace)
                .into_iter()
                .collect()
        };

        let mut plan = HashMap::new();
        for open in blocks {
            let Some(close) = self.partners[open] else {
                continue;
            };
            // Yul functions are scoped to their block, so a definition in one
            // `code` block says nothing about another.
            let defined: HashSet<&str> = (open + 1..close)
                .filter(|&index| self.tokens[index].kind == TokenKind::Function)
                .filter_map(|index| self.token_if(index + 1, TokenKind::Ident))
                .map(|name| name.text(self.source))
                .collect();
            let called: BTreeSet<&str> = (open + 1..close)
                .filter(|&index| {
                    self.tokens[index].kind == TokenKind::Ident
                        && self.token_if(index + 1, TokenKind::LParen).is_some()
                        && (index == 0 || self.tokens[index - 1].kind != TokenKind::Function)
                })
                .map(|index| self.tokens[index].text(self.source))
                .filter(|name| find_helper(name).is_some() && !defined.contains(name))
                .collect();
            let helpers: Vec<&'static str> = HELPERS
                .iter()
                .filter(|helper| called.contains(helper.name))
                .map(|helper| helper.definition)
                .collect();
            if !helpers.is_empty() {
                plan.insert(open, helpers);
            }
        }
        plan
    }

    fn emit(&mut self, injections: &HashMap<usize, Vec<&'static str>>) -> Result<String, DialectSyntaxError> {
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        let mut index = 0;
        while index < self.tokens.len() {
            let token = self.tokens[index];
            out.push_str(&self.source[cursor..token.start]);

            if let Some(&(_, end)) = self.removed.iter().find(|(start, _)| *start == index) {
                let tokens = self.tokens;
                for hidden in &tokens[index..=end] {
                    match hidden.kind {
                        TokenKind::Sig => {
                            self.record_signature(hidden)?;
                        }
                        TokenKind::Topic => {
                            self.record_topic(hidden)?;
                        }
                        _ => {}
                    }
                }
                cursor = self.tokens[end].end;
                index = end + 1;
                continue;
            }

            match token.kind {
                TokenKind::Sig => {
                    let literal = self.record_signature(&token)?;
                    out.push_str(&literal);
                }
                TokenKind::Topic => {
                    let literal = self.record_topic(&token)?;
                    out.push_str(&literal);
                }
                TokenKind::Ident => out.push_str(&self.resolve_ident(&token)?),
                _ => out.push_str(token.text(self.source)),
            }
            cursor = token.end;

            if let Some(helpers) = injections.get(&index) {
                let indent = self.indent_after(index);
                for definition in helpers {
                    out.push('\n');
                    out.push_str(&indent);
                    out.push_str(definition);
                }
            }
            index += 1;
        }
        out.push_str(&self.source[cursor..]);
        Ok(out)
    }

    fn resolve_ident(&self, token: &Token) -> Result<String, DialectSyntaxError> {
        let text = token.text(self.source);
        if let Some(literal) = self.consts.get(text) {
            return Ok(literal.clone());
        }
        if let Some((enum_name, member)) = text.split_once('.') {
            if let Some(members) = self.enums.get(enum_name) {
                return members
                    .get(member)
                    .map(|ordinal| ordinal.to_string())
                    .ok_or_else(|| {
                        self.error(token, format!("enum '{enum_name}' has no member '{member}'"))
                    });
            }
        }
        Ok(text.to_string())
    }

    fn record_signature(&mut self, token: &Token) -> Result<String, DialectSyntaxError> {
        let raw = token.text(self.source);
        let signature = Signature::parse(raw).map_err(|message| self.error(token, message))?;
        let literal = signature.literal();
        if !self.signatures.iter().any(|known| known.raw == signature.raw) {
            self.signatures.push(signature);
        }
        Ok(literal)
    }

    fn record_topic(&mut self, token: &Token) -> Result<String, DialectSyntaxError> {
        let raw = token.text(self.source);
        let topic = Topic::parse(raw).map_err(|message| self.error(token, message))?;
        let literal = topic.literal();
        if !self.topics.iter().any(|known| known.raw == topic.raw) {
            self.topics.push(topic);
        }
        Ok(literal)
    }

    /// Whitespace that starts the line following token `index`, so injected
    /// definitions line up with the block's own statements.
    fn indent_after(&self, index: usize) -> String {
        let from = self.tokens[index].end;
        let to = self
            .tokens
            .get(index + 1)
            .map_or(self.source.len(), |next| next.start);
        let gap = &self.source[from..to];
        match gap.rfind('\n') {
            Some(newline) => gap[newline + 1..]
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect(),
            None => "    ".to_string(),
        }
    }

    fn is_literal(&self, token: &Token) -> bool {
        match token.kind {
            TokenKind::Number | TokenKind::StringLiteral | TokenKind::Sig | TokenKind::Topic => true,
            TokenKind::Ident => matches!(token.text(self.source), "true" | "false"),
            _ => false,
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.consts.contains_key(name) || self.enums.contains_key(name)
    }

    fn token_if(&self, index: usize, kind: TokenKind) -> Option<&'a Token> {
        self.tokens.get(index).filter(|token| token.kind == kind)
    }

    fn expect(&self, index: usize, kind: TokenKind, message: &str) -> Result<&'a Token, DialectSyntaxError> {
        self.token_if(index, kind)
            .ok_or_else(|| self.error_after(index - 1, message))
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> DialectSyntaxError {
        DialectSyntaxError::at(self.source, token.start, message)
    }

    /// Error pointing at the token following `index`, or at end of input.
    fn error_after(&self, index: usize, message: &str) -> DialectSyntaxError {
        let offset = self
            .tokens
            .get(index + 1)
            .map_or(self.source.len(), |token| token.start);
        DialectSyntaxError::at(self.source, offset, message)
    }
}
