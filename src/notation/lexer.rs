use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use crate::error::{Location, SyntaxError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Area,
    Service,
    CapabilitySet,
    Send,
    Submit,
    Request,
    Invoke,
    Progress,
    PubSub,
    Composite,
    Enum,
    Attribute,
    Fundamental,
    Extends,
    Errors,
    Extra,
    Replay,
}

impl Keyword {
    pub const ALL: [Keyword; 17] = [
        Keyword::Area,
        Keyword::Service,
        Keyword::CapabilitySet,
        Keyword::Send,
        Keyword::Submit,
        Keyword::Request,
        Keyword::Invoke,
        Keyword::Progress,
        Keyword::PubSub,
        Keyword::Composite,
        Keyword::Enum,
        Keyword::Attribute,
        Keyword::Fundamental,
        Keyword::Extends,
        Keyword::Errors,
        Keyword::Extra,
        Keyword::Replay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Area => "AREA",
            Keyword::Service => "SERVICE",
            Keyword::CapabilitySet => "CAPABILITYSET",
            Keyword::Send => "SEND",
            Keyword::Submit => "SUBMIT",
            Keyword::Request => "REQUEST",
            Keyword::Invoke => "INVOKE",
            Keyword::Progress => "PROGRESS",
            Keyword::PubSub => "PUBSUB",
            Keyword::Composite => "COMPOSITE",
            Keyword::Enum => "ENUM",
            Keyword::Attribute => "ATTRIBUTE",
            Keyword::Fundamental => "FUNDAMENTAL",
            Keyword::Extends => "EXTENDS",
            Keyword::Errors => "ERRORS",
            Keyword::Extra => "EXTRA",
            Keyword::Replay => "REPLAY",
        }
    }

    pub fn from_ident(ident: &str) -> Option<Keyword> {
        Self::ALL.into_iter().find(|k| k.as_str() == ident)
    }

    /// Keywords that open a declaration.
    pub fn starts_declaration(self) -> bool {
        !matches!(self, Keyword::Extends | Keyword::Extra | Keyword::Replay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    IntLit(u32),
    StringLit(String),
    /// Text of a `///` line, without the marker and one optional space.
    DocLine(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Dot,
    Question,
    Equals,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{name}`"),
            TokenKind::Keyword(kw) => write!(f, "keyword `{}`", kw.as_str()),
            TokenKind::IntLit(value) => write!(f, "integer `{value}`"),
            TokenKind::StringLit(_) => write!(f, "string literal"),
            TokenKind::DocLine(_) => write!(f, "doc comment"),
            TokenKind::LBrace => write!(f, "`{{`"),
            TokenKind::RBrace => write!(f, "`}}`"),
            TokenKind::LBracket => write!(f, "`[`"),
            TokenKind::RBracket => write!(f, "`]`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::Dot => write!(f, "`.`"),
            TokenKind::Question => write!(f, "`?`"),
            TokenKind::Equals => write!(f, "`=`"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

/// Result of lexing one source file.
#[derive(Debug, Default)]
pub struct Lexed {
    /// Always terminated by an `Eof` token.
    pub tokens: Vec<Token>,
    /// `//!` lines, in order.
    pub unit_doc: Vec<String>,
    pub errors: Vec<SyntaxError>,
}

pub struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    file: Option<Arc<str>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: Option<Arc<str>>) -> Self {
        Lexer {
            source: source.chars().peekable(),
            file,
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.file.clone(), self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut iter = self.source.clone();
        iter.next();
        iter.next()
    }

    fn peek_third(&self) -> Option<char> {
        let mut iter = self.source.clone();
        iter.next();
        iter.next();
        iter.next()
    }

    fn rest_of_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.source.peek()
            && ch != '\n'
        {
            text.push(ch);
            self.advance();
        }
        if text.ends_with('\r') {
            text.pop();
        }
        text
    }

    /// Lex the whole source. Bad characters are reported and skipped so the
    /// parser can still run in recovery mode.
    pub fn tokenize(mut self) -> Lexed {
        let mut lexed = Lexed::default();
        loop {
            let start = self.location();
            match self.next_token(&mut lexed) {
                Ok(Some(TokenKind::Eof)) => {
                    lexed.tokens.push(Token {
                        kind: TokenKind::Eof,
                        location: start,
                    });
                    return lexed;
                }
                Ok(Some(kind)) => lexed.tokens.push(Token {
                    kind,
                    location: start,
                }),
                Ok(None) => {}
                Err(err) => lexed.errors.push(err),
            }
        }
    }

    /// `Ok(None)` means trivia was consumed (whitespace, comments, `//!`).
    fn next_token(&mut self, lexed: &mut Lexed) -> Result<Option<TokenKind>, SyntaxError> {
        let start = self.location();
        let Some(&ch) = self.source.peek() else {
            return Ok(Some(TokenKind::Eof));
        };

        if ch.is_whitespace() {
            self.advance();
            return Ok(None);
        }

        if ch == '/' {
            return self.lex_comment(start, lexed);
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut ident = String::new();
            while let Some(&ch) = self.source.peek()
                && (ch.is_ascii_alphanumeric() || ch == '_')
            {
                ident.push(ch);
                self.advance();
            }
            return Ok(Some(match Keyword::from_ident(&ident) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Ident(ident),
            }));
        }

        if ch.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&ch) = self.source.peek()
                && ch.is_ascii_digit()
            {
                digits.push(ch);
                self.advance();
            }
            return digits
                .parse::<u32>()
                .map(|value| Some(TokenKind::IntLit(value)))
                .map_err(|_| SyntaxError::new(start, format!("integer `{digits}` is out of range")));
        }

        if ch == '"' {
            return self.lex_string_lit(start).map(Some);
        }

        self.advance();
        let kind = match ch {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            '=' => TokenKind::Equals,
            other => {
                return Err(SyntaxError::new(
                    start,
                    format!("unexpected character `{other}`"),
                ));
            }
        };
        Ok(Some(kind))
    }

    fn lex_comment(
        &mut self,
        start: Location,
        lexed: &mut Lexed,
    ) -> Result<Option<TokenKind>, SyntaxError> {
        match self.peek_second() {
            Some('/') => {
                let third = self.peek_third();
                self.advance();
                self.advance();
                match third {
                    Some('/') => {
                        self.advance();
                        // `////` is an ordinary comment
                        if self.source.peek() == Some(&'/') {
                            self.rest_of_line();
                            return Ok(None);
                        }
                        Ok(Some(TokenKind::DocLine(self.doc_text())))
                    }
                    Some('!') => {
                        self.advance();
                        let text = self.doc_text();
                        lexed.unit_doc.push(text);
                        Ok(None)
                    }
                    _ => {
                        self.rest_of_line();
                        Ok(None)
                    }
                }
            }
            Some('*') => {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.source.peek() == Some(&'/') => {
                            self.advance();
                            return Ok(None);
                        }
                        Some(_) => {}
                        None => {
                            return Err(SyntaxError::new(start, "unterminated block comment"));
                        }
                    }
                }
            }
            _ => {
                self.advance();
                Err(SyntaxError::new(start, "unexpected character `/`"))
            }
        }
    }

    fn doc_text(&mut self) -> String {
        if self.source.peek() == Some(&' ') {
            self.advance();
        }
        self.rest_of_line()
    }

    fn lex_string_lit(&mut self, start: Location) -> Result<TokenKind, SyntaxError> {
        self.advance(); // opening quote
        let mut buf = String::new();
        loop {
            let Some(ch) = self.advance() else {
                return Err(SyntaxError::new(start, "unterminated string literal"));
            };
            match ch {
                '"' => break,
                '\\' => {
                    let esc_at = self.location();
                    let unescaped = match self.advance() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(other) => {
                            return Err(SyntaxError::new(
                                esc_at,
                                format!("invalid escape sequence `\\{other}`"),
                            ));
                        }
                        None => {
                            return Err(SyntaxError::new(start, "unterminated string literal"));
                        }
                    };
                    buf.push(unescaped);
                }
                _ => buf.push(ch),
            }
        }
        Ok(TokenKind::StringLit(buf))
    }
}

/// Quote `text` as a string literal the lexer reads back verbatim.
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let lexed = Lexer::new(source, None).tokenize();
        assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);
        lexed.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_punctuation() {
        assert_eq!(
            kinds("AREA Foo 12 { x: Bar[]? }"),
            vec![
                TokenKind::Keyword(Keyword::Area),
                TokenKind::Ident("Foo".into()),
                TokenKind::IntLit(12),
                TokenKind::LBrace,
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::Ident("Bar".into()),
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Question,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_doc_lines() {
        let lexed = Lexer::new("//! unit\n// plain\n/* block\n */ /// doc\n///\n////x\n", None)
            .tokenize();
        assert_eq!(lexed.unit_doc, vec!["unit".to_string()]);
        let kinds: Vec<_> = lexed.tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::DocLine("doc".into()),
                TokenKind::DocLine(String::new()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_doc_line_keeps_extra_indentation() {
        assert_eq!(
            kinds("///   indented"),
            vec![TokenKind::DocLine("  indented".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        let text = "say \"hi\"\n\tback\\slash";
        let quoted = escape_string(text);
        assert_eq!(
            kinds(&quoted),
            vec![TokenKind::StringLit(text.into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_locations() {
        let lexed = Lexer::new("AREA\n  Foo", Some(Arc::from("a.mosdl"))).tokenize();
        let foo = &lexed.tokens[1];
        assert_eq!((foo.location.line, foo.location.column), (2, 3));
        assert_eq!(foo.location.to_string(), "a.mosdl:2:3");
    }

    #[test]
    fn test_bad_input_is_reported_and_skipped() {
        let lexed = Lexer::new("AREA # Foo \"open", None).tokenize();
        assert_eq!(lexed.errors.len(), 2);
        assert!(lexed.errors[0].message.contains('#'));
        assert!(lexed.errors[1].message.contains("unterminated"));
        assert_eq!(lexed.tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_integer_overflow() {
        let lexed = Lexer::new("99999999999", None).tokenize();
        assert_eq!(lexed.errors.len(), 1);
    }
}
