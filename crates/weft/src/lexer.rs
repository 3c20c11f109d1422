//! Lexer (spec §4.1).
//!
//! Grounded on `ouros::lexer::Lexer` for the char-class scanning and
//! line/column bookkeeping style, extended with this language's nested
//! block comments, triple-quote dedent strings, and tilde raw strings,
//! none of which the teacher's own lexer needs.

use crate::error::Position;
use crate::token::{Keyword, Token, TokenKind};

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    _source: &'a str,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { chars: source.chars().collect(), pos: 0, line: 1, column: 1, _source: source }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Skips whitespace, statement-separator semicolons, `//` line
    /// comments, and arbitrarily nested `/* … */` block comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ';' => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    let mut depth = 1;
                    while depth > 0 {
                        match self.peek() {
                            None => break,
                            Some('/') if self.peek_at(1) == Some('*') => {
                                self.advance();
                                self.advance();
                                depth += 1;
                            }
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                depth -= 1;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let save = self.pos;
            let save_line = self.line;
            let save_col = self.column;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                self.pos = save;
                self.line = save_line;
                self.column = save_col;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        TokenKind::Number(text.parse().unwrap_or(f64::NAN))
    }

    /// A leading `.` that begins a number, e.g. `.5` (spec §4.1).
    fn lex_leading_dot_number(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance(); // consume '.'
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        TokenKind::Number(format!("0{text}").parse().unwrap_or(f64::NAN))
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match Keyword::from_str(&text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier(text),
        }
    }

    /// `"""…"""`: strips a single leading newline, finds the minimum
    /// indentation of all non-blank lines, and removes it from every line
    /// (blank lines untouched). Escapes remain raw for the parser.
    fn lex_triple_string(&mut self) -> TokenKind {
        self.advance();
        self.advance();
        self.advance();
        let mut body = String::new();
        loop {
            if self.peek() == Some('"') && self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
                self.advance();
                self.advance();
                self.advance();
                break;
            }
            match self.advance() {
                Some(c) => body.push(c),
                None => break,
            }
        }
        TokenKind::TripleString(dedent(&body))
    }

    /// `"…"` with escape sequences left raw for the parser to unescape.
    fn lex_string(&mut self) -> TokenKind {
        self.advance();
        let mut body = String::new();
        loop {
            match self.peek() {
                None | Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    body.push(self.advance().unwrap());
                    if let Some(c) = self.advance() {
                        body.push(c);
                    }
                }
                Some(c) => {
                    body.push(c);
                    self.advance();
                }
            }
        }
        TokenKind::String(body)
    }

    /// `~…~` raw string: no escape processing except `\~` → literal `~`.
    fn lex_raw_string(&mut self) -> TokenKind {
        self.advance();
        let mut body = String::new();
        loop {
            match self.peek() {
                None | Some('~') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_at(1) == Some('~') => {
                    self.advance();
                    self.advance();
                    body.push('~');
                }
                Some(c) => {
                    body.push(c);
                    self.advance();
                }
            }
        }
        TokenKind::RawString(body)
    }

    fn two_char(&mut self, second: char, with: TokenKind, without: TokenKind) -> TokenKind {
        if self.peek_at(1) == Some(second) {
            self.advance();
            self.advance();
            with
        } else {
            self.advance();
            without
        }
    }

    /// Returns every token including a trailing `Eof`. Unterminated
    /// strings/comments are not lexer-level errors (spec §4.1); they
    /// simply end at EOF and the parser surfaces the resulting syntax
    /// error.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let position = self.here();
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, position));
                break;
            };
            let kind = match c {
                '0'..='9' => self.lex_number(),
                '.' if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => self.lex_leading_dot_number(),
                c if c.is_alphabetic() || c == '_' => self.lex_identifier(),
                '"' if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') => self.lex_triple_string(),
                '"' => self.lex_string(),
                '~' => self.lex_raw_string(),
                '+' => match self.peek_at(1) {
                    Some('+') => {
                        self.advance();
                        self.advance();
                        TokenKind::PlusPlus
                    }
                    Some('=') => {
                        self.advance();
                        self.advance();
                        TokenKind::PlusEq
                    }
                    _ => {
                        self.advance();
                        TokenKind::Plus
                    }
                },
                '-' => match self.peek_at(1) {
                    Some('-') => {
                        self.advance();
                        self.advance();
                        TokenKind::MinusMinus
                    }
                    Some('=') => {
                        self.advance();
                        self.advance();
                        TokenKind::MinusEq
                    }
                    _ => {
                        self.advance();
                        TokenKind::Minus
                    }
                },
                '*' => self.two_char('=', TokenKind::StarEq, TokenKind::Star),
                '/' => self.two_char('=', TokenKind::SlashEq, TokenKind::Slash),
                '%' => self.two_char('=', TokenKind::PercentEq, TokenKind::Percent),
                '=' => self.two_char('=', TokenKind::EqEq, TokenKind::Eq),
                '!' => self.two_char('=', TokenKind::NotEq, TokenKind::NotEq),
                '<' => self.two_char('=', TokenKind::LtEq, TokenKind::Lt),
                '>' => self.two_char('=', TokenKind::GtEq, TokenKind::Gt),
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                '[' => {
                    self.advance();
                    TokenKind::LBracket
                }
                ']' => {
                    self.advance();
                    TokenKind::RBracket
                }
                '{' => {
                    self.advance();
                    TokenKind::LBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RBrace
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }
                '?' => {
                    self.advance();
                    TokenKind::Question
                }
                ':' => {
                    self.advance();
                    TokenKind::Colon
                }
                _ => {
                    // Unrecognized character: skip it and let the parser
                    // trip over whatever malformed token stream results
                    // (matches spec §4.1: the lexer never hard-errors).
                    self.advance();
                    continue;
                }
            };
            tokens.push(Token::new(kind, position));
        }
        tokens
    }
}

/// Strips a leading newline if present, then removes the minimum common
/// indentation of all non-blank lines (blank lines left untouched).
fn dedent(body: &str) -> String {
    let body = body.strip_prefix('\n').unwrap_or(body);
    let body = body.strip_prefix("\r\n").unwrap_or(body);
    let lines: Vec<&str> = body.split('\n').collect();
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| if l.trim().is_empty() { l.to_string() } else { l.chars().skip(min_indent).collect() })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn nested_block_comments() {
        let toks = kinds("1 /* outer /* inner */ still outer */ 2");
        assert_eq!(toks, vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]);
    }

    #[test]
    fn number_forms() {
        assert_eq!(kinds("1")[0], TokenKind::Number(1.0));
        assert_eq!(kinds("3.14")[0], TokenKind::Number(3.14));
        assert_eq!(kinds(".5")[0], TokenKind::Number(0.5));
        assert_eq!(kinds("1e10")[0], TokenKind::Number(1e10));
        assert_eq!(kinds("2E+5")[0], TokenKind::Number(2e5));
        assert_eq!(kinds("1.5e-3")[0], TokenKind::Number(1.5e-3));
    }

    #[test]
    fn triple_quote_dedent() {
        let toks = kinds("\"\"\"\n  hello\n    world\n  \"\"\"");
        match &toks[0] {
            TokenKind::TripleString(s) => assert_eq!(s, "hello\n  world\n"),
            other => panic!("expected triple string, got {other:?}"),
        }
    }

    #[test]
    fn tilde_raw_string_preserves_escapes_except_tilde() {
        let toks = kinds(r"~a\nb\~c~");
        match &toks[0] {
            TokenKind::RawString(s) => assert_eq!(s, r"a\nb~c"),
            other => panic!("expected raw string, got {other:?}"),
        }
    }

    #[test]
    fn keywords_vs_identifiers() {
        assert_eq!(kinds("if")[0], TokenKind::Keyword(Keyword::If));
        assert_eq!(kinds("iffy")[0], TokenKind::Identifier("iffy".to_string()));
    }

    #[test]
    fn unterminated_string_does_not_panic() {
        let toks = kinds("\"abc");
        assert_eq!(toks, vec![TokenKind::String("abc".to_string()), TokenKind::Eof]);
    }
}
