//! Tokenizer for RDL text
//!
//! Line comments are returned as tokens, carrying the line they appear on, so
//! that the parser can tell a comment leading an item from one trailing it.
//! Block comments are skipped as whitespace.

use std::fmt::{Display, Formatter};

use super::error::{ParseError, ParseErrorKind, ParseResult};

#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    /// Letters, digits, `_`, `.` and `-`, not starting with a digit
    Ident(String),
    /// String literal with escapes resolved
    Str(String),
    /// Numeric literal text, validated but not converted
    Number(String),
    /// Body of a `//` comment, trimmed
    Comment(String),
    Punct(char),
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier '{s}'"),
            TokenKind::Str(s) => write!(f, "string {s:?}"),
            TokenKind::Number(s) => write!(f, "number {s}"),
            TokenKind::Comment(_) => write!(f, "comment"),
            TokenKind::Punct(c) => write!(f, "'{c}'"),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

const PUNCTUATION: &[char] = &['{', '}', '(', ')', '<', '>', '[', ']', ',', ';', '=', ':'];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Current `(line, column)`, 1-based.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            file: None,
            line: self.line,
            column: self.column,
            kind,
        }
    }

    fn skip_whitespace(&mut self) -> ParseResult<()> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek_char() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(self.error(ParseErrorKind::UnexpectedEof {
                                    expected: String::from("end of block comment"),
                                }))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Reads the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> ParseResult<Option<Token>> {
        self.skip_whitespace()?;
        let (line, column) = self.position();
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(None),
        };
        let kind = if c == '/' && self.peek_at(1) == Some('/') {
            self.bump();
            self.bump();
            TokenKind::Comment(self.rest_of_line().trim().to_owned())
        } else if c == '"' {
            self.bump();
            TokenKind::Str(self.string_body()?)
        } else if c.is_ascii_digit()
            || ((c == '-' || c == '+' || c == '.')
                && self.peek_at(1).map_or(false, |d| d.is_ascii_digit() || d == '.'))
        {
            TokenKind::Number(self.number()?)
        } else if c.is_alphabetic() || c == '_' {
            let mut s = String::new();
            while let Some(c) = self.peek_char() {
                if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' {
                    s.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            TokenKind::Ident(s)
        } else if PUNCTUATION.contains(&c) {
            self.bump();
            TokenKind::Punct(c)
        } else {
            return Err(self.error(ParseErrorKind::BadCharacter(c)));
        };
        Ok(Some(Token { kind, line, column }))
    }

    fn rest_of_line(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }

    fn string_body(&mut self) -> ParseResult<String> {
        let mut s = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error(ParseErrorKind::UnterminatedString)),
                Some('"') => return Ok(s),
                Some('\\') => {
                    let esc = self
                        .bump()
                        .ok_or_else(|| self.error(ParseErrorKind::UnterminatedString))?;
                    match esc {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        '"' | '\\' | '/' | '\'' => s.push(esc),
                        'u' => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = self
                                    .bump()
                                    .and_then(|h| h.to_digit(16))
                                    .ok_or_else(|| self.error(ParseErrorKind::BadEscape('u')))?;
                                code = code * 16 + digit;
                            }
                            let ch = char::from_u32(code)
                                .ok_or_else(|| self.error(ParseErrorKind::BadEscape('u')))?;
                            s.push(ch);
                        }
                        other => return Err(self.error(ParseErrorKind::BadEscape(other))),
                    }
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn number(&mut self) -> ParseResult<String> {
        let mut s = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek_char() {
            s.push(sign);
            self.bump();
        }
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' | '.' => s.push(c),
                'e' | 'E' => {
                    s.push(c);
                    self.bump();
                    if let Some(sign @ ('-' | '+')) = self.peek_char() {
                        s.push(sign);
                    } else {
                        continue;
                    }
                }
                _ => break,
            }
            self.bump();
        }
        if s.parse::<f64>().is_err() {
            return Err(self.error(ParseErrorKind::BadNumber(s)));
        }
        Ok(s)
    }

    /// Reads raw text up to `;` or end of line, for media-type lists.
    ///
    /// A terminating `;` is consumed. A `//` comment ending the line is
    /// consumed and returned separately.
    pub fn raw_line(&mut self) -> (String, Option<String>) {
        let mut text = String::new();
        let mut comment = None;
        while let Some(c) = self.peek_char() {
            match c {
                '\n' => break,
                ';' => {
                    self.bump();
                    break;
                }
                '/' if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    comment = Some(self.rest_of_line().trim().to_owned());
                    break;
                }
                _ => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        (text.trim().to_owned(), comment)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        let mut lx = Lexer::new(text);
        let mut out = Vec::new();
        while let Some(tok) = lx.next_token().unwrap() {
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn basic_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("type Foo Map<String,Int32> (min=-1.5e3, x_a=\"q\\\"\") ;"),
            vec![
                Ident("type".into()),
                Ident("Foo".into()),
                Ident("Map".into()),
                Punct('<'),
                Ident("String".into()),
                Punct(','),
                Ident("Int32".into()),
                Punct('>'),
                Punct('('),
                Ident("min".into()),
                Punct('='),
                Number("-1.5e3".into()),
                Punct(','),
                Ident("x_a".into()),
                Punct('='),
                Str("q\"".into()),
                Punct(')'),
                Punct(';'),
            ]
        );
    }

    #[test]
    fn comments_keep_lines() {
        let mut lx = Lexer::new("// leading\nString name; // trailing\n/* skipped */ x");
        let first = lx.next_token().unwrap().unwrap();
        assert_eq!(first.kind, TokenKind::Comment("leading".into()));
        assert_eq!(first.line, 1);
        lx.next_token().unwrap();
        lx.next_token().unwrap();
        lx.next_token().unwrap();
        let trailing = lx.next_token().unwrap().unwrap();
        assert_eq!(trailing.kind, TokenKind::Comment("trailing".into()));
        assert_eq!(trailing.line, 2);
        let x = lx.next_token().unwrap().unwrap();
        assert_eq!((x.line, x.column), (3, 15));
    }

    #[test]
    fn dotted_and_dashed_identifiers() {
        assert_eq!(
            kinds("com.example.auth content-type"),
            vec![
                TokenKind::Ident("com.example.auth".into()),
                TokenKind::Ident("content-type".into())
            ]
        );
    }

    #[test]
    fn raw_media_list() {
        let mut lx = Lexer::new(" application/json, text/plain // media\nnext");
        let (text, comment) = lx.raw_line();
        assert_eq!(text, "application/json, text/plain");
        assert_eq!(comment.as_deref(), Some("media"));
        let mut lx = Lexer::new("a/b;c");
        assert_eq!(lx.raw_line(), ("a/b".to_string(), None));
    }

    #[test]
    fn lexical_errors() {
        assert!(matches!(
            Lexer::new("\"open").next_token(),
            Err(ParseError { kind: ParseErrorKind::UnterminatedString, .. })
        ));
        assert!(matches!(
            Lexer::new("\"\\q\"").next_token(),
            Err(ParseError { kind: ParseErrorKind::BadEscape('q'), .. })
        ));
        assert!(matches!(
            Lexer::new("@").next_token(),
            Err(ParseError { kind: ParseErrorKind::BadCharacter('@'), .. })
        ));
    }
}
