//! Recursive-descent parser with precedence climbing (spec §4.2).
//!
//! Grounded on `ouros::parser::Parser` for the token-cursor/expect-with-
//! bracket-context shape, with this language's own grammar: `do…end`/
//! `then…end` block delimiters, named call arguments, and template-literal
//! string bodies.

use std::sync::Arc;

use crate::ast::{
    Arg, AssignOp, AssignTarget, BinOp, Expr, ExprKind, ForClause, FunctionDef, IfBranch, Literal, ParamDef,
    Position, Program, Stmt, TemplatePart, UnOp,
};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Keyword, Token, TokenKind};

pub fn parse(source: &str, file: impl Into<Arc<str>>) -> Result<Program, ParseError> {
    let file = file.into();
    let tokens = Lexer::new(source).tokenize();
    Parser { tokens, pos: 0, file }.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: Arc<str>,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn position(&self) -> Position {
        self.peek().position
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check_kind(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError { message: message.into(), file: self.file.clone(), position: self.position(), opener: None }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.check_kind(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {what}, found {:?}", self.peek_kind())))
        }
    }

    fn expect_close(&mut self, kind: TokenKind, what: &str, opener: Position) -> PResult<Token> {
        if self.check_kind(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError {
                message: format!("expected {what}, found {:?}", self.peek_kind()),
                file: self.file.clone(),
                position: self.position(),
                opener: Some(opener),
            })
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, what: &str) -> PResult<Position> {
        let position = self.position();
        if self.eat_keyword(kw) {
            Ok(position)
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> PResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    // ---- program / statements ----------------------------------------

    fn parse_program(&mut self) -> PResult<Program> {
        let mut statements = Vec::new();
        while !self.check_kind(&TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    /// Parses statements until one of `terminators` is the next token
    /// (without consuming it).
    fn parse_block(&mut self, terminators: &[Keyword]) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            if self.check_kind(&TokenKind::Eof) {
                break;
            }
            if terminators.iter().any(|k| self.check_keyword(*k)) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let position = self.position();
        if self.check_keyword(Keyword::If) {
            return self.parse_if();
        }
        if self.check_keyword(Keyword::While) {
            return self.parse_while();
        }
        if self.check_keyword(Keyword::For) {
            return self.parse_for();
        }
        if self.check_keyword(Keyword::Function) {
            return self.parse_function_decl();
        }
        if self.check_keyword(Keyword::Try) {
            return self.parse_try();
        }
        if self.check_keyword(Keyword::Return) {
            self.advance();
            let value = if self.starts_expression() { Some(self.parse_expression()?) } else { None };
            return Ok(Stmt::Return { value, position });
        }
        if self.eat_keyword(Keyword::Break) {
            return Ok(Stmt::Break { position });
        }
        if self.eat_keyword(Keyword::Continue) {
            return Ok(Stmt::Continue { position });
        }
        if self.eat_keyword(Keyword::Var) {
            let name = self.expect_identifier("variable name")?;
            self.expect(TokenKind::Eq, "'=' in declaration")?;
            let value = self.parse_expression()?;
            return Ok(Stmt::Assign {
                target: AssignTarget::Declaration(name),
                op: AssignOp::Assign,
                value,
                position,
            });
        }
        self.parse_expr_or_assign_statement(position)
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.peek_kind(),
            TokenKind::Eof
                | TokenKind::Keyword(Keyword::End)
                | TokenKind::Keyword(Keyword::Else)
                | TokenKind::Keyword(Keyword::Elseif)
                | TokenKind::Keyword(Keyword::Catch)
        )
    }

    fn parse_expr_or_assign_statement(&mut self, position: Position) -> PResult<Stmt> {
        let expr = self.parse_expression()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::AddAssign),
            TokenKind::MinusEq => Some(AssignOp::SubAssign),
            TokenKind::StarEq => Some(AssignOp::MulAssign),
            TokenKind::SlashEq => Some(AssignOp::DivAssign),
            TokenKind::PercentEq => Some(AssignOp::ModAssign),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let target = expr_to_target(expr, &self.file)?;
            let value = self.parse_expression()?;
            return Ok(Stmt::Assign { target, op, value, position });
        }
        if matches!(self.peek_kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let increment = matches!(self.peek_kind(), TokenKind::PlusPlus);
            self.advance();
            let target = expr_to_target(expr, &self.file)?;
            return Ok(Stmt::PostIncDec { target, increment, position });
        }
        Ok(Stmt::Expr { expr, position })
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let position = self.expect_keyword(Keyword::If, "'if'")?;
        let mut branches = Vec::new();
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Then, "'then'")?;
        let body = self.parse_block(&[Keyword::Elseif, Keyword::Else, Keyword::End])?;
        branches.push(IfBranch { condition, body });
        while self.check_keyword(Keyword::Elseif) {
            self.advance();
            let condition = self.parse_expression()?;
            self.expect_keyword(Keyword::Then, "'then'")?;
            let body = self.parse_block(&[Keyword::Elseif, Keyword::Else, Keyword::End])?;
            branches.push(IfBranch { condition, body });
        }
        let else_body = if self.eat_keyword(Keyword::Else) { Some(self.parse_block(&[Keyword::End])?) } else { None };
        self.expect_keyword(Keyword::End, "'end' to close 'if'")?;
        Ok(Stmt::If { branches, else_body, position })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let position = self.expect_keyword(Keyword::While, "'while'")?;
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Do, "'do'")?;
        let body = self.parse_block(&[Keyword::End])?;
        self.expect_keyword(Keyword::End, "'end' to close 'while'")?;
        Ok(Stmt::While { condition, body, position })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let position = self.expect_keyword(Keyword::For, "'for'")?;
        let var = self.expect_identifier("loop variable")?;
        let clause = if self.check_keyword(Keyword::In) {
            self.advance();
            let collection = self.parse_expression()?;
            ForClause::Iterator { var, collection }
        } else {
            self.expect(TokenKind::Eq, "'=' or 'in' in for clause")?;
            let start = self.parse_expression()?;
            self.expect(TokenKind::Comma, "',' in numeric for clause")?;
            let end = self.parse_expression()?;
            let step = if self.check_kind(&TokenKind::Comma) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            ForClause::Numeric { var, start, end, step }
        };
        self.expect_keyword(Keyword::Do, "'do'")?;
        let body = self.parse_block(&[Keyword::End])?;
        self.expect_keyword(Keyword::End, "'end' to close 'for'")?;
        Ok(Stmt::For { clause, body, position })
    }

    fn parse_function_decl(&mut self) -> PResult<Stmt> {
        let position = self.expect_keyword(Keyword::Function, "'function'")?;
        let name = self.expect_identifier("function name")?;
        let def = self.parse_function_rest(Some(name))?;
        Ok(Stmt::FunctionDecl { def, position })
    }

    /// Parses `(params) body end` after the leading `function [name]` has
    /// already been consumed.
    fn parse_function_rest(&mut self, name: Option<String>) -> PResult<FunctionDef> {
        let opener = self.position();
        self.expect(TokenKind::LParen, "'(' to start parameter list")?;
        let mut params = Vec::new();
        if !self.check_kind(&TokenKind::RParen) {
            loop {
                let pname = self.expect_identifier("parameter name")?;
                let default = if self.check_kind(&TokenKind::Eq) {
                    self.advance();
                    Some(Arc::new(self.parse_expression()?))
                } else {
                    None
                };
                params.push(ParamDef { name: pname, default });
                if self.check_kind(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_close(TokenKind::RParen, "')' to close parameter list", opener)?;
        let body = self.parse_block(&[Keyword::End])?;
        self.expect_keyword(Keyword::End, "'end' to close function")?;
        Ok(FunctionDef { name, params, body: Arc::new(body) })
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        let position = self.expect_keyword(Keyword::Try, "'try'")?;
        let body = self.parse_block(&[Keyword::Catch])?;
        self.expect_keyword(Keyword::Catch, "'catch' to close 'try'")?;
        let opener = self.position();
        self.expect(TokenKind::LParen, "'(' around catch variable")?;
        let catch_var = self.expect_identifier("catch variable name")?;
        self.expect_close(TokenKind::RParen, "')' to close catch variable", opener)?;
        let catch_body = self.parse_block(&[Keyword::End])?;
        self.expect_keyword(Keyword::End, "'end' to close 'try'")?;
        Ok(Stmt::Try { body, catch_var, catch_body, position })
    }

    // ---- expressions: precedence climbing ----------------------------

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let condition = self.parse_or()?;
        if self.check_kind(&TokenKind::Question) {
            let position = self.position();
            self.advance();
            let if_true = self.parse_expression()?;
            self.expect(TokenKind::Colon, "':' in ternary expression")?;
            let if_false = self.parse_expression()?;
            return Ok(Expr::new(
                ExprKind::Ternary { condition: Box::new(condition), if_true: Box::new(if_true), if_false: Box::new(if_false) },
                position,
            ));
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.check_keyword(Keyword::Or) {
            let position = self.position();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::new(ExprKind::Binary { op: BinOp::Or, left: Box::new(left), right: Box::new(right) }, position);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.check_keyword(Keyword::And) {
            let position = self.position();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::new(ExprKind::Binary { op: BinOp::And, left: Box::new(left), right: Box::new(right) }, position);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, position);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, position);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, position);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, position);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let position = self.position();
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Keyword(Keyword::Not) => Some(UnOp::Not),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, position));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    let opener = self.position();
                    self.advance();
                    let args = self.parse_args(opener)?;
                    expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args }, opener);
                }
                TokenKind::LBracket => {
                    let opener = self.position();
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect_close(TokenKind::RBracket, "']' to close index expression", opener)?;
                    expr = Expr::new(ExprKind::Index { target: Box::new(expr), index: Box::new(index) }, opener);
                }
                TokenKind::Dot => {
                    let position = self.position();
                    self.advance();
                    let name = self.expect_identifier("property name")?;
                    expr = Expr::new(ExprKind::Property { target: Box::new(expr), name }, position);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self, opener: Position) -> PResult<Vec<Arg>> {
        let mut args = Vec::new();
        if !self.check_kind(&TokenKind::RParen) {
            loop {
                args.push(self.parse_arg()?);
                if self.check_kind(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_close(TokenKind::RParen, "')' to close call arguments", opener)?;
        Ok(args)
    }

    fn parse_arg(&mut self) -> PResult<Arg> {
        // `name = expr` or `"name" = expr` is a named argument; anything
        // else is positional (spec §4.2).
        if let TokenKind::Identifier(name) = self.peek_kind().clone() {
            if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Eq)) {
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                return Ok(Arg::Named(name, value));
            }
        }
        if let TokenKind::String(name) = self.peek_kind().clone() {
            if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Eq)) {
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                return Ok(Arg::Named(unescape(&name), value));
            }
        }
        Ok(Arg::Positional(self.parse_expression()?))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Number(n)), position))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(true)), position))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(false)), position))
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Nil), position))
            }
            TokenKind::Keyword(Keyword::Raw) => {
                self.advance();
                self.parse_raw_prefixed_string()
            }
            TokenKind::RawString(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::String(s)), position))
            }
            TokenKind::String(s) => {
                self.advance();
                self.finish_string_literal(s, position)
            }
            TokenKind::TripleString(s) => {
                self.advance();
                self.finish_string_literal(s, position)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(name), position))
            }
            TokenKind::Keyword(Keyword::Function) => {
                self.advance();
                let def = self.parse_function_rest(None)?;
                Ok(Expr::new(ExprKind::FunctionExpr(def), position))
            }
            TokenKind::LParen => {
                let opener = self.position();
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_close(TokenKind::RParen, "')' to close grouped expression", opener)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                let opener = self.position();
                self.advance();
                let mut items = Vec::new();
                if !self.check_kind(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expression()?);
                        if self.check_kind(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect_close(TokenKind::RBracket, "']' to close array literal", opener)?;
                Ok(Expr::new(ExprKind::Array(items), opener))
            }
            TokenKind::LBrace => {
                let opener = self.position();
                self.advance();
                let mut fields = Vec::new();
                if !self.check_kind(&TokenKind::RBrace) {
                    loop {
                        let key = self.parse_object_key()?;
                        self.expect(TokenKind::Eq, "'=' after object key")?;
                        let value = self.parse_expression()?;
                        fields.push((key, value));
                        if self.check_kind(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect_close(TokenKind::RBrace, "'}' to close object literal", opener)?;
                Ok(Expr::new(ExprKind::Object(fields), opener))
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_object_key(&mut self) -> PResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(unescape(&s))
            }
            other => Err(self.error(format!("expected object key, found {other:?}"))),
        }
    }

    /// `raw "…"` bypasses template handling even if the body contains
    /// `{{` (spec §4.2).
    fn parse_raw_prefixed_string(&mut self) -> PResult<Expr> {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::String(s) | TokenKind::TripleString(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::String(unescape(&s))), position))
            }
            other => Err(self.error(format!("expected string after 'raw', found {other:?}"))),
        }
    }

    /// A plain or triple-quoted string becomes a template literal if its
    /// body contains `{{`; otherwise a plain string literal (spec §4.2).
    fn finish_string_literal(&mut self, raw: String, position: Position) -> PResult<Expr> {
        if raw.contains("{{") {
            let parts = parse_template_parts(&raw, &self.file, position)?;
            Ok(Expr::new(ExprKind::Template(parts), position))
        } else {
            Ok(Expr::new(ExprKind::Literal(Literal::String(unescape(&raw))), position))
        }
    }
}

fn expr_to_target(expr: Expr, file: &Arc<str>) -> PResult<AssignTarget> {
    match expr.kind {
        ExprKind::Identifier(name) => Ok(AssignTarget::Identifier(name)),
        ExprKind::Index { target, index } => Ok(AssignTarget::Index { target, index }),
        ExprKind::Property { target, name } => Ok(AssignTarget::Property { target, name }),
        _ => Err(ParseError {
            message: "invalid assignment target".to_string(),
            file: file.clone(),
            position: expr.position,
            opener: None,
        }),
    }
}

/// Processes `\n \t \r \\ \"` escapes stored raw in string tokens (spec
/// §4.1). Unrecognized escapes keep the backslash.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits a template-literal body on `{{ … }}` boundaries, parsing each
/// embedded expression with a fresh lexer/parser over just that slice
/// (spec §4.2).
pub(crate) fn parse_template_parts(raw: &str, file: &Arc<str>, base_position: Position) -> PResult<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next();
            if !text.is_empty() {
                parts.push(TemplatePart::Text(unescape(&text)));
                text.clear();
            }
            let mut expr_src = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == '}' && chars.peek() == Some(&'}') {
                    chars.next();
                    closed = true;
                    break;
                }
                expr_src.push(c);
            }
            if !closed {
                return Err(ParseError {
                    message: "unterminated template expression".to_string(),
                    file: file.clone(),
                    position: base_position,
                    opener: None,
                });
            }
            let tokens = Lexer::new(&expr_src).tokenize();
            let mut sub = Parser { tokens, pos: 0, file: file.clone() };
            let expr = sub.parse_expression()?;
            parts.push(TemplatePart::Expr(expr));
        } else {
            text.push(c);
        }
    }
    if !text.is_empty() {
        parts.push(TemplatePart::Text(unescape(&text)));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src, "test").expect("parse should succeed")
    }

    #[test]
    fn parses_closure_counter_example() {
        let program = parse_ok(
            "function mk() var c = 0\n  return function() c = c + 1; return c end\nend\nf = mk()",
        );
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn parses_named_and_positional_args() {
        let program = parse_ok(r#"f(1, name = "x")"#);
        match &program.statements[0] {
            Stmt::Expr { expr: Expr { kind: ExprKind::Call { args, .. }, .. }, .. } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0], Arg::Positional(_)));
                assert!(matches!(args[1], Arg::Named(_, _)));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn bracket_mismatch_reports_opener() {
        let err = parse("f(1, 2", "test").unwrap_err();
        assert!(err.opener.is_some());
    }

    #[test]
    fn template_literal_splits_text_and_expr() {
        let program = parse_ok(r#"print("hi {{ name }}!")"#);
        match &program.statements[0] {
            Stmt::Expr { expr: Expr { kind: ExprKind::Call { args, .. }, .. }, .. } => {
                match &args[0] {
                    Arg::Positional(Expr { kind: ExprKind::Template(parts), .. }) => {
                        assert_eq!(parts.len(), 3);
                    }
                    other => panic!("expected template literal, got {other:?}"),
                }
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn ternary_and_logical_precedence() {
        let program = parse_ok("x = a or b and c ? 1 : 2");
        assert_eq!(program.statements.len(), 1);
    }
}
