//! Tokenizer shared by the document and schema parsers.
//!
//! Comments are first-class tokens (`//`, `///`, `//!` each get their own
//! kind) so the comment attacher can make a second pass over the same
//! stream. Whitespace runs (spaces, tabs, CR) merge into one token; every
//! `\n` is its own `Newline` token because newlines separate root entries.

use memchr::memchr;

use crate::error::{Error, Position, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Double-quoted string, escapes resolved.
    Str(String),
    /// Single-quoted string; `''` collapses to `'`, nothing else is special.
    SingleStr(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equal,
    Colon,
    Pipe,
    LAngle,
    RAngle,
    Comma,
    Question,
    /// `// …`, text without the marker, trimmed.
    Comment(String),
    /// `/// …`
    OuterDoc(String),
    /// `//! …`
    InnerDoc(String),
    Newline,
    Whitespace,
    Eof,
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(
            self,
            Token::Comment(_) | Token::OuterDoc(_) | Token::InnerDoc(_)
        )
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, Token::Whitespace) || self.is_comment()
    }

    /// Short human name used in "expected X, got Y" messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Ident(_) => "identifier",
            Token::Str(_) | Token::SingleStr(_) => "string",
            Token::Int(_) => "integer",
            Token::Float(_) => "float",
            Token::Bool(_) => "boolean",
            Token::Null => "null",
            Token::LBrace => "'{'",
            Token::RBrace => "'}'",
            Token::LBracket => "'['",
            Token::RBracket => "']'",
            Token::Equal => "'='",
            Token::Colon => "':'",
            Token::Pipe => "'|'",
            Token::LAngle => "'<'",
            Token::RAngle => "'>'",
            Token::Comma => "','",
            Token::Question => "'?'",
            Token::Comment(_) => "comment",
            Token::OuterDoc(_) => "doc comment",
            Token::InnerDoc(_) => "inner doc comment",
            Token::Newline => "newline",
            Token::Whitespace => "whitespace",
            Token::Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: Position,
}

impl Spanned {
    pub fn new(token: Token, pos: Position) -> Self {
        Self { token, pos }
    }
}

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        // A leading BOM is tolerated and skipped.
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input. The result always ends with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    /// Advance over `s`, which must be exactly the text at the cursor.
    fn consume_str(&mut self, s: &str) {
        debug_assert!(self.input[self.pos..].starts_with(s));
        for ch in s.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += s.len();
    }

    fn consume_ascii(&mut self, len: usize) {
        self.pos += len;
        self.column += len;
    }

    fn next_token(&mut self) -> Result<Spanned> {
        let pos = self.position();
        let Some(byte) = self.peek_byte() else {
            return Ok(Spanned::new(Token::Eof, pos));
        };

        let token = match byte {
            b'\n' => {
                self.pos += 1;
                self.line += 1;
                self.column = 1;
                Token::Newline
            }
            b' ' | b'\t' | b'\r' => {
                let mut len = 0;
                while matches!(self.peek_byte_at(len), Some(b' ' | b'\t' | b'\r')) {
                    len += 1;
                }
                self.consume_ascii(len);
                Token::Whitespace
            }
            b'/' => self.scan_comment(pos)?,
            b'"' => self.scan_double_quoted(pos)?,
            b'\'' => self.scan_single_quoted(pos)?,
            b'{' => self.punct(Token::LBrace),
            b'}' => self.punct(Token::RBrace),
            b'[' => self.punct(Token::LBracket),
            b']' => self.punct(Token::RBracket),
            b'=' => self.punct(Token::Equal),
            b':' => self.punct(Token::Colon),
            b'|' => self.punct(Token::Pipe),
            b'<' => self.punct(Token::LAngle),
            b'>' => self.punct(Token::RAngle),
            b',' => self.punct(Token::Comma),
            b'?' => self.punct(Token::Question),
            b'+' | b'-' => self.scan_number(pos)?,
            b'0'..=b'9' => self.scan_number(pos)?,
            b if b.is_ascii_alphabetic() || b == b'_' => self.scan_ident(),
            _ => {
                let ch = self.input[self.pos..]
                    .chars()
                    .next()
                    .expect("cursor is on a char boundary");
                return Err(Error::lex(pos, format!("unexpected character '{ch}'")));
            }
        };

        Ok(Spanned::new(token, pos))
    }

    fn punct(&mut self, token: Token) -> Token {
        self.consume_ascii(1);
        token
    }

    fn scan_comment(&mut self, pos: Position) -> Result<Token> {
        if self.peek_byte_at(1) != Some(b'/') {
            return Err(Error::lex(pos, "unexpected character '/'"));
        }

        // Longest-specific-first: `//!` and `///` win over `//`.
        let (marker_len, kind) = match self.peek_byte_at(2) {
            Some(b'!') => (3, CommentKind::Inner),
            Some(b'/') => (3, CommentKind::Outer),
            _ => (2, CommentKind::Line),
        };
        self.consume_ascii(marker_len);

        let rest = &self.input[self.pos..];
        let end = memchr(b'\n', rest.as_bytes()).unwrap_or(rest.len());
        let text = rest[..end].trim().to_string();
        self.consume_str(&rest[..end]);

        Ok(match kind {
            CommentKind::Line => Token::Comment(text),
            CommentKind::Outer => Token::OuterDoc(text),
            CommentKind::Inner => Token::InnerDoc(text),
        })
    }

    fn scan_double_quoted(&mut self, start: Position) -> Result<Token> {
        self.consume_ascii(1);
        let mut value = String::new();
        let mut chars = self.input[self.pos..].char_indices();

        while let Some((idx, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.consume_str(&self.input[self.pos..self.pos + idx + 1]);
                    return Ok(Token::Str(value));
                }
                '\n' => break,
                '\\' => match chars.next() {
                    Some((_, escape)) => {
                        let resolved = match escape {
                            '"' => '"',
                            '\\' => '\\',
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            'b' => '\u{0008}',
                            'f' => '\u{000C}',
                            other => {
                                let mut pos = start;
                                pos.column += 1 + self.input[self.pos..self.pos + idx]
                                    .chars()
                                    .count();
                                return Err(Error::lex(
                                    pos,
                                    format!("invalid escape sequence '\\{other}'"),
                                ));
                            }
                        };
                        value.push(resolved);
                    }
                    None => break,
                },
                other => value.push(other),
            }
        }

        Err(Error::lex(start, "unterminated string"))
    }

    fn scan_single_quoted(&mut self, start: Position) -> Result<Token> {
        self.consume_ascii(1);
        let mut value = String::new();
        let mut chars = self.input[self.pos..].char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            if ch == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    value.push('\'');
                    continue;
                }
                self.consume_str(&self.input[self.pos..self.pos + idx + 1]);
                return Ok(Token::SingleStr(value));
            }
            value.push(ch);
        }

        Err(Error::lex(start, "unterminated string"))
    }

    fn scan_number(&mut self, start: Position) -> Result<Token> {
        let bytes = self.input.as_bytes();
        let begin = self.pos;
        let mut idx = begin;

        if matches!(bytes.get(idx), Some(&(b'+' | b'-'))) {
            idx += 1;
        }
        let digits_start = idx;
        while matches!(bytes.get(idx), Some(&(b'0'..=b'9'))) {
            idx += 1;
        }
        if idx == digits_start {
            let sign = bytes[begin] as char;
            return Err(Error::lex(start, format!("unexpected character '{sign}'")));
        }

        // A dot only continues the number when digits follow it.
        let mut is_float = false;
        if bytes.get(idx) == Some(&b'.') && matches!(bytes.get(idx + 1), Some(&(b'0'..=b'9'))) {
            is_float = true;
            idx += 2;
            while matches!(bytes.get(idx), Some(&(b'0'..=b'9'))) {
                idx += 1;
            }
        }

        let text = &self.input[begin..idx];
        self.consume_ascii(idx - begin);

        if is_float {
            let parsed: f64 = text
                .parse()
                .map_err(|_| Error::lex(start, format!("malformed number '{text}'")))?;
            Ok(Token::Float(parsed))
        } else {
            let parsed: i64 = text
                .parse()
                .map_err(|_| Error::lex(start, format!("malformed number '{text}'")))?;
            Ok(Token::Int(parsed))
        }
    }

    fn scan_ident(&mut self) -> Token {
        let bytes = self.input.as_bytes();
        let begin = self.pos;
        let mut idx = begin;
        while matches!(bytes.get(idx), Some(b) if b.is_ascii_alphanumeric() || *b == b'_') {
            idx += 1;
        }
        let text = &self.input[begin..idx];
        self.consume_ascii(idx - begin);

        match text {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            "null" => Token::Null,
            _ => Token::Ident(text.to_string()),
        }
    }
}

enum CommentKind {
    Line,
    Outer,
    Inner,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn non_trivia(input: &str) -> Vec<Token> {
        tokens(input)
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace | Token::Newline))
            .collect()
    }

    #[rstest::rstest]
    fn test_punctuation() {
        assert_eq!(
            non_trivia("{ } [ ] = : | < > , ?"),
            vec![
                Token::LBrace,
                Token::RBrace,
                Token::LBracket,
                Token::RBracket,
                Token::Equal,
                Token::Colon,
                Token::Pipe,
                Token::LAngle,
                Token::RAngle,
                Token::Comma,
                Token::Question,
                Token::Eof,
            ]
        );
    }

    #[rstest::rstest]
    fn test_numbers() {
        assert_eq!(
            non_trivia("42 -5 +7 3.25 -0.5"),
            vec![
                Token::Int(42),
                Token::Int(-5),
                Token::Int(7),
                Token::Float(3.25),
                Token::Float(-0.5),
                Token::Eof,
            ]
        );
    }

    #[rstest::rstest]
    fn test_dot_without_digits_is_an_error() {
        // `1.x` lexes as the int 1 and then a stray dot.
        let err = Tokenizer::new("a = 1.x").tokenize().unwrap_err();
        assert!(err.message.contains("unexpected character '.'"));
    }

    #[rstest::rstest]
    fn test_keywords_and_idents() {
        assert_eq!(
            non_trivia("true false null name _x"),
            vec![
                Token::Bool(true),
                Token::Bool(false),
                Token::Null,
                Token::Ident("name".into()),
                Token::Ident("_x".into()),
                Token::Eof,
            ]
        );
    }

    #[rstest::rstest]
    fn test_double_quoted_escapes() {
        assert_eq!(
            non_trivia(r#""a\"b\\c\nd\te\rf\bg\fh""#),
            vec![
                Token::Str("a\"b\\c\nd\te\rf\u{0008}g\u{000C}h".into()),
                Token::Eof
            ]
        );
    }

    #[rstest::rstest]
    fn test_double_quoted_invalid_escape() {
        let err = Tokenizer::new(r#""bad\x""#).tokenize().unwrap_err();
        assert!(err.message.contains("invalid escape sequence"));
    }

    #[rstest::rstest]
    fn test_unterminated_string_reports_start() {
        let err = Tokenizer::new("key = \"open").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.position, Some(Position::new(1, 7)));
    }

    #[rstest::rstest]
    fn test_single_quoted() {
        assert_eq!(
            non_trivia("'it''s' 'no \\n escape'"),
            vec![
                Token::SingleStr("it's".into()),
                Token::SingleStr("no \\n escape".into()),
                Token::Eof,
            ]
        );
    }

    #[rstest::rstest]
    fn test_comment_classification() {
        assert_eq!(
            tokens("// plain\n/// outer\n//! inner\n"),
            vec![
                Token::Comment("plain".into()),
                Token::Newline,
                Token::OuterDoc("outer".into()),
                Token::Newline,
                Token::InnerDoc("inner".into()),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[rstest::rstest]
    fn test_comment_marker_tiebreak() {
        // `////x` is an outer doc whose text starts with a slash.
        assert_eq!(
            tokens("////x"),
            vec![Token::OuterDoc("/x".into()), Token::Eof]
        );
        assert_eq!(
            tokens("//!important"),
            vec![Token::InnerDoc("important".into()), Token::Eof]
        );
    }

    #[rstest::rstest]
    fn test_whitespace_merging_and_newlines() {
        assert_eq!(
            tokens("a \t\r\nb"),
            vec![
                Token::Ident("a".into()),
                Token::Whitespace,
                Token::Newline,
                Token::Ident("b".into()),
                Token::Eof,
            ]
        );
    }

    #[rstest::rstest]
    fn test_positions() {
        let spanned = Tokenizer::new("ab = 1\ncd = 2").tokenize().unwrap();
        let find = |target: &Token| spanned.iter().find(|s| s.token == *target).unwrap().pos;
        assert_eq!(find(&Token::Ident("ab".into())), Position::new(1, 1));
        assert_eq!(find(&Token::Int(1)), Position::new(1, 6));
        assert_eq!(find(&Token::Ident("cd".into())), Position::new(2, 1));
        assert_eq!(find(&Token::Int(2)), Position::new(2, 6));
    }

    #[rstest::rstest]
    fn test_bom_skipped() {
        assert_eq!(
            tokens("\u{feff}a"),
            vec![Token::Ident("a".into()), Token::Eof]
        );
    }

    #[rstest::rstest]
    fn test_crlf_merges_into_whitespace() {
        let toks = tokens("a\r\nb");
        assert_eq!(
            toks,
            vec![
                Token::Ident("a".into()),
                Token::Whitespace,
                Token::Newline,
                Token::Ident("b".into()),
                Token::Eof,
            ]
        );
    }

    #[rstest::rstest]
    fn test_int_overflow_is_malformed() {
        let err = Tokenizer::new("99999999999999999999").tokenize().unwrap_err();
        assert!(err.message.contains("malformed number"));
    }

    #[rstest::rstest]
    fn test_unexpected_character() {
        let err = Tokenizer::new("a = @").tokenize().unwrap_err();
        assert!(err.message.contains("unexpected character '@'"));
        assert_eq!(err.position, Some(Position::new(1, 5)));
    }
}
