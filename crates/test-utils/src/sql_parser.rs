// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Fixture SQL parser
//!
//! Turns a small SQL subset into [`MockSyntaxNode`] trees with exact byte
//! offsets and the default grammar rule names, so tests can write plain SQL
//! instead of building trees by hand.
//!
//! Like an editor parser it never gives up on a statement:
//! - missing expressions and tables are simply left out
//! - junk in a SET list becomes an `unexpected` node
//! - anything else left over becomes an `ERROR` node
//!
//! Supported: SELECT (DISTINCT, joins, derived tables, WHERE, GROUP BY,
//! HAVING, ORDER BY, LIMIT, UNION/INTERSECT/EXCEPT), INSERT, UPDATE, DELETE,
//! and bare clauses such as `WHERE a = 1` as fragments.

use crate::error::{FixtureError, FixtureResult};
use sqlscope_syntax::{ERROR_KIND, MockSyntaxNode};

const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CROSS", "DELETE", "DESC", "DISTINCT", "EXCEPT",
    "EXISTS", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTERSECT",
    "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER",
    "OUTER", "RIGHT", "SELECT", "SET", "TRUE", "UNION", "UPDATE", "USING", "VALUES", "WHERE",
];

/// Keywords that open a clause and so end the one before it
const CLAUSE_KEYWORDS: &[&str] = &[
    "CROSS", "EXCEPT", "FROM", "FULL", "GROUP", "HAVING", "INNER", "INTERSECT", "JOIN", "LEFT",
    "LIMIT", "OFFSET", "ON", "ORDER", "RIGHT", "SELECT", "SET", "UNION", "USING", "VALUES",
    "WHERE",
];

const JOIN_MODIFIERS: &[&str] = &["INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS"];

const TWO_CHAR_PUNCT: &[&str] = &["<=", ">=", "<>", "!=", "||"];
const ONE_CHAR_PUNCT: &str = ",().=<>+-*/%;";

/// One statement cut out of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    /// Tree with offsets local to `text`
    pub tree: MockSyntaxNode,
    /// Document offset of the statement's first token
    pub offset: usize,
    /// Statement text, `;` included when present
    pub text: String,
}

/// Parse one statement
///
/// Offsets in the tree are byte offsets into `source`.
pub fn parse_statement(source: &str) -> FixtureResult<MockSyntaxNode> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(FixtureError::EmptyInput);
    }
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let tree = parser.statement();
    match parser.peek() {
        Some(token) => Err(FixtureError::TrailingInput {
            offset: token.start,
        }),
        None => Ok(tree),
    }
}

/// Split a script on top-level `;` and parse every statement
pub fn parse_script(source: &str) -> FixtureResult<Vec<ParsedStatement>> {
    let tokens = tokenize(source)?;
    let mut statements = Vec::new();
    let mut depth = 0usize;
    let mut first: Option<usize> = None;
    for (i, token) in tokens.iter().enumerate() {
        first.get_or_insert(i);
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        } else if token.is_punct(";") && depth == 0 {
            if let Some(start) = first.take() {
                statements.push(script_item(source, tokens[start].start, token.end())?);
            }
        }
    }
    if let (Some(start), Some(last)) = (first, tokens.last()) {
        statements.push(script_item(source, tokens[start].start, last.end())?);
    }
    Ok(statements)
}

fn script_item(source: &str, start: usize, end: usize) -> FixtureResult<ParsedStatement> {
    let text = &source[start..end];
    Ok(ParsedStatement {
        tree: parse_statement(text)?,
        offset: start,
        text: text.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Quoted,
    Number,
    Str,
    Punct,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
    start: usize,
}

impl Token {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    fn is_reserved(&self) -> bool {
        RESERVED.iter().any(|k| self.is_keyword(k))
    }

    fn is_clause_keyword(&self) -> bool {
        CLAUSE_KEYWORDS.iter().any(|k| self.is_keyword(k))
    }

    /// Identifier usable as a table, column or alias name
    fn is_name(&self) -> bool {
        match self.kind {
            TokenKind::Quoted => true,
            TokenKind::Word => !self.is_reserved(),
            _ => false,
        }
    }
}

fn tokenize(source: &str) -> FixtureResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        if source[start..].starts_with("--") {
            while chars.next_if(|&(_, c)| c != '\n').is_some() {}
            continue;
        }
        let (kind, end) = if ch.is_ascii_alphabetic() || ch == '_' {
            (
                TokenKind::Word,
                scan_while(source, start, |c| c.is_ascii_alphanumeric() || c == '_'),
            )
        } else if ch.is_ascii_digit() {
            (TokenKind::Number, scan_while(source, start, |c| c.is_ascii_digit() || c == '.'))
        } else if ch == '\'' {
            (TokenKind::Str, scan_quoted(source, start, ch, "string literal")?)
        } else if ch == '"' || ch == '`' {
            (TokenKind::Quoted, scan_quoted(source, start, ch, "quoted identifier")?)
        } else if TWO_CHAR_PUNCT.iter().any(|p| source[start..].starts_with(p)) {
            (TokenKind::Punct, start + 2)
        } else if ONE_CHAR_PUNCT.contains(ch) {
            (TokenKind::Punct, start + 1)
        } else {
            return Err(FixtureError::UnexpectedCharacter { ch, offset: start });
        };
        tokens.push(Token {
            kind,
            text: source[start..end].to_string(),
            start,
        });
        while chars.next_if(|&(i, _)| i < end).is_some() {}
    }
    Ok(tokens)
}

fn scan_while(source: &str, start: usize, accept: impl Fn(char) -> bool) -> usize {
    source[start..]
        .char_indices()
        .find(|&(_, c)| !accept(c))
        .map_or(source.len(), |(i, _)| start + i)
}

/// End of a quoted token; a doubled quote character is an escape
fn scan_quoted(source: &str, start: usize, quote: char, what: &'static str) -> FixtureResult<usize> {
    let body = start + quote.len_utf8();
    let mut rest = source[body..].char_indices().peekable();
    while let Some((i, c)) = rest.next() {
        if c != quote {
            continue;
        }
        if rest.next_if(|&(_, next)| next == quote).is_none() {
            return Ok(body + i + quote.len_utf8());
        }
    }
    Err(FixtureError::Unterminated {
        what,
        offset: start,
    })
}

fn node(kind: &str, children: Vec<MockSyntaxNode>) -> MockSyntaxNode {
    MockSyntaxNode::new(kind).with_children(children).fit_to_children()
}

fn leaf(kind: &str, token: &Token) -> MockSyntaxNode {
    MockSyntaxNode::leaf(kind, token.text.clone(), token.start)
}

fn binary(left: MockSyntaxNode, operators: Vec<MockSyntaxNode>, right: Option<MockSyntaxNode>) -> MockSyntaxNode {
    let mut children = vec![left];
    children.extend(operators);
    children.extend(right);
    node("binary_expression", children)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn at_punct(&self, punct: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(punct))
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> Option<MockSyntaxNode> {
        if !self.at_keyword(keyword) {
            return None;
        }
        self.bump().map(|t| MockSyntaxNode::keyword(t.text, t.start))
    }

    fn eat_punct(&mut self, punct: &str) -> Option<MockSyntaxNode> {
        if !self.at_punct(punct) {
            return None;
        }
        self.bump().map(|t| MockSyntaxNode::punct(t.text, t.start))
    }

    fn eat_any_punct(&mut self, puncts: &[&str]) -> Option<MockSyntaxNode> {
        puncts.iter().find_map(|p| self.eat_punct(p))
    }

    /// Upper-cased text of the current word token
    fn current_keyword(&self) -> Option<String> {
        self.peek()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text.to_ascii_uppercase())
    }

    /// Leaf of `kind` covering the tokens consumed since `from`
    fn slice_leaf(&self, kind: &str, from: usize) -> Option<MockSyntaxNode> {
        if self.pos == from {
            return None;
        }
        let start = self.tokens[from].start;
        let end = self.tokens[self.pos - 1].end();
        Some(MockSyntaxNode::leaf(kind, &self.source[start..end], start))
    }

    /// Consume tokens until `stop` matches outside parentheses, or until a
    /// `;` or unbalanced `)`
    fn skip_until(&mut self, kind: &str, stop: impl Fn(&Token) -> bool) -> Option<MockSyntaxNode> {
        let from = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && (token.is_punct(";") || token.is_punct(")") || stop(token)) {
                break;
            }
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth -= 1;
            }
            self.pos += 1;
        }
        self.slice_leaf(kind, from)
    }

    fn rest_of_statement(&mut self) -> Option<MockSyntaxNode> {
        let from = self.pos;
        while self.peek().is_some_and(|t| !t.is_punct(";")) {
            self.pos += 1;
        }
        self.slice_leaf(ERROR_KIND, from)
    }

    fn statement(&mut self) -> MockSyntaxNode {
        let root = match self.current_keyword().as_deref() {
            Some("SELECT") => self.select(),
            Some("INSERT") => self.insert(),
            Some("UPDATE") => self.update(),
            Some("DELETE") => self.delete(),
            _ => self.orphan_clause().unwrap_or_else(MockSyntaxNode::error),
        };
        let mut trailing = Vec::new();
        trailing.extend(self.rest_of_statement());
        trailing.extend(self.eat_punct(";"));
        if trailing.is_empty() {
            return root;
        }
        root.with_children(trailing).fit_to_children()
    }

    /// A clause typed on its own, outside any statement
    fn orphan_clause(&mut self) -> Option<MockSyntaxNode> {
        let clause = match self.current_keyword()?.as_str() {
            "WHERE" => self.single_expression_clause("where_clause"),
            "HAVING" => self.single_expression_clause("having_clause"),
            "FROM" => self.from_clause("from_clause"),
            "SET" => self.set_clause(),
            "GROUP" => self.group_by_clause(),
            "ORDER" => self.order_by_clause(),
            "LIMIT" => self.limit_clause(),
            _ => return None,
        };
        Some(clause)
    }

    fn select(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("SELECT"));
        children.extend(self.eat_keyword("DISTINCT").or_else(|| self.eat_keyword("ALL")));
        children.extend(self.select_list());
        if self.at_keyword("FROM") {
            children.push(self.from_clause("from_clause"));
        }
        if self.at_keyword("WHERE") {
            children.push(self.single_expression_clause("where_clause"));
        }
        if self.at_keyword("GROUP") {
            children.push(self.group_by_clause());
        }
        if self.at_keyword("HAVING") {
            children.push(self.single_expression_clause("having_clause"));
        }
        if self.at_keyword("ORDER") {
            children.push(self.order_by_clause());
        }
        if self.at_keyword("LIMIT") {
            children.push(self.limit_clause());
        }
        if ["UNION", "INTERSECT", "EXCEPT"].iter().any(|k| self.at_keyword(k)) {
            children.push(self.set_operation());
        }
        node("select_statement", children)
    }

    fn select_list(&mut self) -> Option<MockSyntaxNode> {
        let mut children = Vec::new();
        loop {
            if let Some(expr) = self.expression() {
                let mut item = vec![expr];
                item.extend(self.alias());
                children.push(node("select_item", item));
            }
            match self.eat_punct(",") {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        (!children.is_empty()).then(|| node("select_list", children))
    }

    fn alias(&mut self) -> Option<MockSyntaxNode> {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("AS"));
        if self.peek().is_some_and(Token::is_name) {
            if let Some(name) = self.bump() {
                children.push(leaf("identifier", &name));
            }
        }
        (!children.is_empty()).then(|| node("alias", children))
    }

    fn set_operation(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.bump().map(|t| MockSyntaxNode::keyword(t.text, t.start)));
        children.extend(self.eat_keyword("ALL").or_else(|| self.eat_keyword("DISTINCT")));
        if self.at_keyword("SELECT") {
            children.push(self.select());
        }
        node("set_operation", children)
    }

    /// `FROM` or `USING` followed by a comma separated table list
    fn from_clause(&mut self, kind: &str) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.bump().map(|t| MockSyntaxNode::keyword(t.text, t.start)));
        loop {
            children.extend(self.table_item());
            match self.eat_punct(",") {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        node(kind, children)
    }

    fn at_join(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.is_keyword("JOIN") || JOIN_MODIFIERS.iter().any(|k| t.is_keyword(k)))
    }

    /// A table followed by any number of joins
    fn table_item(&mut self) -> Option<MockSyntaxNode> {
        let mut left = self.table_factor()?;
        while self.at_join() {
            let mut children = vec![left];
            while let Some(modifier) = JOIN_MODIFIERS.iter().find_map(|k| self.eat_keyword(k)) {
                children.push(modifier);
            }
            children.extend(self.eat_keyword("JOIN"));
            children.extend(self.table_factor());
            if self.at_keyword("ON") {
                let mut condition = Vec::new();
                condition.extend(self.eat_keyword("ON"));
                condition.extend(self.expression());
                children.push(node("join_condition", condition));
            } else if self.at_keyword("USING") {
                let mut condition = Vec::new();
                condition.extend(self.eat_keyword("USING"));
                condition.extend(self.eat_punct("("));
                while let Some(name) = self.peek().filter(|t| t.is_name()).cloned() {
                    self.pos += 1;
                    condition.push(leaf("identifier", &name));
                    match self.eat_punct(",") {
                        Some(comma) => condition.push(comma),
                        None => break,
                    }
                }
                condition.extend(self.eat_punct(")"));
                children.push(node("join_condition", condition));
            }
            left = node("joined_table", children);
        }
        Some(left)
    }

    fn table_factor(&mut self) -> Option<MockSyntaxNode> {
        if self.at_punct("(") && self.peek_nth(1).is_some_and(|t| t.is_keyword("SELECT")) {
            let mut children = vec![self.subquery()];
            children.extend(self.alias());
            return Some(node("derived_table", children));
        }
        if !self.peek().is_some_and(Token::is_name) {
            return None;
        }
        let mut parts = Vec::new();
        parts.extend(self.bump().map(|t| leaf("identifier", &t)));
        while self.at_punct(".") && self.peek_nth(1).is_some_and(Token::is_name) {
            parts.extend(self.eat_punct("."));
            parts.extend(self.bump().map(|t| leaf("identifier", &t)));
        }
        let mut children = vec![node("object_name", parts)];
        children.extend(self.alias());
        Some(node("table_reference", children))
    }

    fn subquery(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_punct("("));
        let mut select = self.select();
        if let Some(junk) = self.skip_until(ERROR_KIND, |_| false) {
            select = select.with_child(junk).fit_to_children();
        }
        children.push(select);
        children.extend(self.eat_punct(")"));
        node("subquery", children)
    }

    fn single_expression_clause(&mut self, kind: &str) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.bump().map(|t| MockSyntaxNode::keyword(t.text, t.start)));
        children.extend(self.expression());
        node(kind, children)
    }

    fn group_by_clause(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("GROUP"));
        children.extend(self.eat_keyword("BY"));
        self.expression_sequence(&mut children);
        node("group_by_clause", children)
    }

    fn order_by_clause(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("ORDER"));
        children.extend(self.eat_keyword("BY"));
        while let Some(expr) = self.expression() {
            let mut item = vec![expr];
            item.extend(self.eat_keyword("ASC").or_else(|| self.eat_keyword("DESC")));
            children.push(node("order_by_item", item));
            match self.eat_punct(",") {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        node("order_by_clause", children)
    }

    fn limit_clause(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("LIMIT"));
        children.extend(self.expression());
        if let Some(separator) = self.eat_punct(",").or_else(|| self.eat_keyword("OFFSET")) {
            children.push(separator);
            children.extend(self.expression());
        }
        node("limit_clause", children)
    }

    /// WHERE, ORDER BY and LIMIT of UPDATE and DELETE
    fn filter_clauses(&mut self, children: &mut Vec<MockSyntaxNode>) {
        if self.at_keyword("WHERE") {
            children.push(self.single_expression_clause("where_clause"));
        }
        if self.at_keyword("ORDER") {
            children.push(self.order_by_clause());
        }
        if self.at_keyword("LIMIT") {
            children.push(self.limit_clause());
        }
    }

    fn insert(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("INSERT"));
        children.extend(self.eat_keyword("INTO"));
        children.extend(self.table_factor());
        if self.at_punct("(") && !self.peek_nth(1).is_some_and(|t| t.is_keyword("SELECT")) {
            children.push(self.column_list());
        }
        if self.at_keyword("VALUES") {
            children.push(self.values_clause());
        } else if self.at_keyword("SELECT") {
            children.push(self.select());
        }
        node("insert_statement", children)
    }

    fn column_list(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_punct("("));
        while let Some(name) = self.peek().filter(|t| t.is_name()).cloned() {
            self.pos += 1;
            children.push(node("column_reference", vec![leaf("identifier", &name)]));
            match self.eat_punct(",") {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        children.extend(self.eat_punct(")"));
        node("column_list", children)
    }

    fn values_clause(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("VALUES"));
        while self.at_punct("(") {
            let mut row = Vec::new();
            row.extend(self.eat_punct("("));
            self.expression_sequence(&mut row);
            row.extend(self.eat_punct(")"));
            children.push(node("row_value", row));
            match self.eat_punct(",") {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        node("values_clause", children)
    }

    fn update(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("UPDATE"));
        children.extend(self.table_factor());
        if self.at_keyword("SET") {
            children.push(self.set_clause());
        }
        if self.at_keyword("FROM") {
            children.push(self.from_clause("from_clause"));
        }
        self.filter_clauses(&mut children);
        node("update_statement", children)
    }

    fn set_clause(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("SET"));
        while let Some(next) = self.peek() {
            if next.is_name() || next.is_punct("(") {
                children.push(self.assignment());
            } else {
                children.extend(self.skip_until("unexpected", Token::is_clause_keyword));
                break;
            }
            match self.eat_punct(",") {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        node("set_clause", children)
    }

    fn assignment(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        if self.at_punct("(") {
            children.push(self.column_list());
        } else {
            children.extend(self.name_or_call());
        }
        if let Some(equals) = self.eat_punct("=") {
            children.push(equals);
            children.extend(self.expression());
        }
        node("assignment", children)
    }

    fn delete(&mut self) -> MockSyntaxNode {
        let mut children = Vec::new();
        children.extend(self.eat_keyword("DELETE"));
        children.extend(self.eat_keyword("FROM"));
        children.extend(self.table_factor());
        if self.at_keyword("USING") {
            children.push(self.from_clause("using_clause"));
        }
        self.filter_clauses(&mut children);
        node("delete_statement", children)
    }

    /// Comma separated expressions; returns how many were parsed
    fn expression_sequence(&mut self, children: &mut Vec<MockSyntaxNode>) -> (usize, usize) {
        let (mut expressions, mut commas) = (0, 0);
        while let Some(expr) = self.expression() {
            children.push(expr);
            expressions += 1;
            match self.eat_punct(",") {
                Some(comma) => {
                    children.push(comma);
                    commas += 1;
                }
                None => break,
            }
        }
        (expressions, commas)
    }

    fn expression(&mut self) -> Option<MockSyntaxNode> {
        let mut left = self.conjunction()?;
        while let Some(op) = self.eat_keyword("OR") {
            let right = self.conjunction();
            left = binary(left, vec![op], right);
        }
        Some(left)
    }

    fn conjunction(&mut self) -> Option<MockSyntaxNode> {
        let mut left = self.negation()?;
        while let Some(op) = self.eat_keyword("AND") {
            let right = self.negation();
            left = binary(left, vec![op], right);
        }
        Some(left)
    }

    fn negation(&mut self) -> Option<MockSyntaxNode> {
        match self.eat_keyword("NOT") {
            Some(not) => {
                let mut children = vec![not];
                children.extend(self.negation());
                Some(node("unary_expression", children))
            }
            None => self.comparison(),
        }
    }

    fn comparison(&mut self) -> Option<MockSyntaxNode> {
        let left = self.additive()?;
        if let Some(op) = self.eat_any_punct(&["=", "<>", "!=", "<=", ">=", "<", ">"]) {
            let right = self.additive();
            return Some(binary(left, vec![op], right));
        }
        if let Some(is) = self.eat_keyword("IS") {
            let mut operators = vec![is];
            operators.extend(self.eat_keyword("NOT"));
            let right = self.primary();
            return Some(binary(left, operators, right));
        }

        let negated = self.at_keyword("NOT")
            && self
                .peek_nth(1)
                .is_some_and(|t| ["IN", "LIKE", "BETWEEN"].iter().any(|k| t.is_keyword(k)));
        let mut operators = Vec::new();
        if negated {
            operators.extend(self.eat_keyword("NOT"));
        }
        if let Some(op) = self.eat_keyword("IN") {
            operators.push(op);
            let right = self.primary();
            return Some(binary(left, operators, right));
        }
        if let Some(op) = self.eat_keyword("LIKE") {
            operators.push(op);
            let right = self.additive();
            return Some(binary(left, operators, right));
        }
        if let Some(op) = self.eat_keyword("BETWEEN") {
            let mut children = vec![left];
            children.extend(operators);
            children.push(op);
            children.extend(self.additive());
            children.extend(self.eat_keyword("AND"));
            children.extend(self.additive());
            return Some(node("binary_expression", children));
        }
        Some(left)
    }

    fn additive(&mut self) -> Option<MockSyntaxNode> {
        let mut left = self.multiplicative()?;
        while let Some(op) = self.eat_any_punct(&["+", "-", "||"]) {
            let right = self.multiplicative();
            left = binary(left, vec![op], right);
        }
        Some(left)
    }

    fn multiplicative(&mut self) -> Option<MockSyntaxNode> {
        let mut left = self.unary()?;
        while let Some(op) = self.eat_any_punct(&["*", "/", "%"]) {
            let right = self.unary();
            left = binary(left, vec![op], right);
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<MockSyntaxNode> {
        match self.eat_any_punct(&["-", "+"]) {
            Some(sign) => {
                let mut children = vec![sign];
                children.extend(self.unary());
                Some(node("unary_expression", children))
            }
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Option<MockSyntaxNode> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::Number | TokenKind::Str => {
                self.pos += 1;
                Some(leaf("literal", &token))
            }
            TokenKind::Word if ["NULL", "TRUE", "FALSE"].iter().any(|k| token.is_keyword(k)) => {
                self.pos += 1;
                Some(leaf("literal", &token))
            }
            TokenKind::Word if token.is_keyword("EXISTS") => {
                let mut children = Vec::new();
                children.extend(self.eat_keyword("EXISTS"));
                if self.at_punct("(") {
                    children.push(self.parenthesized());
                }
                Some(node("unary_expression", children))
            }
            TokenKind::Word | TokenKind::Quoted if token.is_name() => self.name_or_call(),
            TokenKind::Punct if token.text == "(" => Some(self.parenthesized()),
            TokenKind::Punct if token.text == "*" => {
                self.pos += 1;
                Some(node("star", vec![MockSyntaxNode::punct("*", token.start)]))
            }
            _ => None,
        }
    }

    /// Column reference, `t.*`, or function call
    fn name_or_call(&mut self) -> Option<MockSyntaxNode> {
        let first = self.bump()?;
        let mut children = vec![leaf("identifier", &first)];

        if first.kind == TokenKind::Word && self.at_punct("(") {
            children.extend(self.eat_punct("("));
            children.extend(self.eat_keyword("DISTINCT"));
            self.expression_sequence(&mut children);
            children.extend(self.eat_punct(")"));
            return Some(node("function_call", children));
        }

        while let Some(dot) = self.eat_punct(".") {
            children.push(dot);
            let Some(next) = self.peek().cloned() else {
                break;
            };
            if next.is_name() {
                self.pos += 1;
                children.push(leaf("identifier", &next));
            } else if next.is_punct("*") {
                self.pos += 1;
                children.push(MockSyntaxNode::punct("*", next.start));
                return Some(node("star", children));
            } else {
                break;
            }
        }
        Some(node("column_reference", children))
    }

    /// `( SELECT … )`, `( e )` or `( e, e … )`
    fn parenthesized(&mut self) -> MockSyntaxNode {
        if self.peek_nth(1).is_some_and(|t| t.is_keyword("SELECT")) {
            return self.subquery();
        }
        let mut children = Vec::new();
        children.extend(self.eat_punct("("));
        let (expressions, commas) = self.expression_sequence(&mut children);
        children.extend(self.eat_punct(")"));
        let kind = if expressions == 1 && commas == 0 {
            "parenthesized_expression"
        } else {
            "expression_list"
        };
        node(kind, children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_syntax::SyntaxNode;

    fn column(name: &str, start: usize) -> MockSyntaxNode {
        MockSyntaxNode::new("column_reference")
            .with_child(MockSyntaxNode::leaf("identifier", name, start))
            .fit_to_children()
    }

    #[test]
    fn test_update_tree_offsets() {
        let tree = parse_statement("UPDATE t SET a=1, b=2 WHERE c=3").unwrap();
        let expected = MockSyntaxNode::new("update_statement")
            .with_child(MockSyntaxNode::keyword("UPDATE", 0))
            .with_child(
                MockSyntaxNode::new("table_reference")
                    .with_child(
                        MockSyntaxNode::new("object_name")
                            .with_child(MockSyntaxNode::leaf("identifier", "t", 7))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("set_clause")
                    .with_child(MockSyntaxNode::keyword("SET", 9))
                    .with_child(
                        MockSyntaxNode::new("assignment")
                            .with_child(column("a", 13))
                            .with_child(MockSyntaxNode::punct("=", 14))
                            .with_child(MockSyntaxNode::leaf("literal", "1", 15))
                            .fit_to_children(),
                    )
                    .with_child(MockSyntaxNode::punct(",", 16))
                    .with_child(
                        MockSyntaxNode::new("assignment")
                            .with_child(column("b", 18))
                            .with_child(MockSyntaxNode::punct("=", 19))
                            .with_child(MockSyntaxNode::leaf("literal", "2", 20))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .with_child(
                MockSyntaxNode::new("where_clause")
                    .with_child(MockSyntaxNode::keyword("WHERE", 22))
                    .with_child(
                        MockSyntaxNode::new("binary_expression")
                            .with_child(column("c", 28))
                            .with_child(MockSyntaxNode::punct("=", 29))
                            .with_child(MockSyntaxNode::leaf("literal", "3", 30))
                            .fit_to_children(),
                    )
                    .fit_to_children(),
            )
            .fit_to_children();
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_junk_in_set_list() {
        let tree = parse_statement("UPDATE t SET ,=1").unwrap();
        let set = tree.find_descendant("set_clause").unwrap();
        let junk = set.find_descendant("unexpected").unwrap();
        assert_eq!(junk.text.as_deref(), Some(",=1"));
        assert_eq!(junk.interval.start, 13);
    }

    #[test]
    fn test_select_shape() {
        let sql = "SELECT u.id, count(*) AS n FROM users u JOIN orders o ON o.user_id = u.id \
                   WHERE u.id IN (SELECT user_id FROM orders) GROUP BY u.id ORDER BY n DESC LIMIT 5";
        let tree = parse_statement(sql).unwrap();
        let node = &tree;
        assert_eq!(node.kind(), "select_statement");
        for clause in [
            "select_list",
            "from_clause",
            "where_clause",
            "group_by_clause",
            "order_by_clause",
            "limit_clause",
        ] {
            assert!(node.find_first_child_of_name(clause).is_some(), "missing {clause}");
        }
        let join = tree.find_descendant("joined_table").unwrap();
        assert!(join.find_descendant("join_condition").is_some());
        assert!(tree.find_descendant("subquery").is_some());
        let alias = tree.find_descendant("alias").unwrap();
        assert_eq!((&*alias).text_content(), "AS n");
    }

    #[test]
    fn test_lenient_clauses() {
        // cursor positions leave holes in the text
        let tree = parse_statement("SELECT  FROM users WHERE ").unwrap();
        let node = &tree;
        assert!(node.find_first_child_of_name("select_list").is_none());
        let filter = node.find_first_child_of_name("where_clause").unwrap();
        assert_eq!(filter.children().len(), 1);

        let fragment = parse_statement("WHERE a = 1").unwrap();
        assert_eq!(fragment.kind, "where_clause");

        let error = parse_statement("SELECT a FROM t )").unwrap();
        assert!(error.find_descendant(ERROR_KIND).is_some());
    }

    #[test]
    fn test_parse_script_offsets() {
        let script = "SELECT 1;\n  UPDATE t SET a = 2;\nDELETE FROM t";
        let statements = parse_script(script).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[1].offset, 12);
        assert_eq!(statements[1].text, "UPDATE t SET a = 2;");
        assert_eq!(statements[1].tree.kind, "update_statement");
        assert_eq!(statements[2].text, "DELETE FROM t");
        assert_eq!(statements[2].tree.interval.start, 0);
    }

    #[test]
    fn test_lexer_errors() {
        assert!(matches!(
            parse_statement("SELECT #"),
            Err(FixtureError::UnexpectedCharacter { ch: '#', offset: 7 })
        ));
        assert!(matches!(
            parse_statement("SELECT 'abc"),
            Err(FixtureError::Unterminated { offset: 7, .. })
        ));
        assert!(matches!(parse_statement("  "), Err(FixtureError::EmptyInput)));
        assert!(matches!(
            parse_statement("SELECT 1; SELECT 2"),
            Err(FixtureError::TrailingInput { offset: 10 })
        ));
    }
}
