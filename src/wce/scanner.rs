//! Character-level tokenizer for WCE scripts.
//!
//! The grammar is keyword-driven: each definition kind expects a fixed
//! sequence of uppercase keywords, each followed by a fixed number of
//! arguments on the same logical property. The scanner tracks the line
//! number for error reporting, strips `//` comments to end of line,
//! treats quoted strings as single tokens and keeps one token of
//! lookahead for optional blocks and top-level dispatch.

use crate::error::{Error, Result};

/// One token with the line it started on. `quoted` distinguishes a tag
/// string from a bare keyword or number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub line: usize,
    pub quoted: bool,
}

pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    peeked: Option<Token>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { chars: input.chars().peekable(), line: 1, peeked: None }
    }

    /// Current line number (of the last token handed out).
    pub fn line(&self) -> usize {
        self.peeked.as_ref().map_or(self.line, |t| t.line)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_blank(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    // only a comment if a second slash follows
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if ahead.peek() == Some(&'/') {
                        while let Some(c) = self.bump() {
                            if c == '\n' {
                                break;
                            }
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        if let Some(tok) = self.peeked.take() {
            return Ok(Some(tok));
        }
        self.skip_blank();
        let line = self.line;
        match self.chars.peek() {
            None => Ok(None),
            Some('"') => {
                self.bump();
                let mut text = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some(c) => text.push(c),
                        None => {
                            return Err(Error::WceParse {
                                line,
                                message: "unterminated string".to_string(),
                            });
                        }
                    }
                }
                Ok(Some(Token { text, line, quoted: true }))
            }
            Some(_) => {
                let mut text = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || c == '"' {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
                Ok(Some(Token { text, line, quoted: false }))
            }
        }
    }

    /// One-token lookahead.
    pub fn peek(&mut self) -> Result<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.next_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn grammar_err(&self, expected: &str, found: Option<&Token>) -> Error {
        Error::WceGrammar {
            line: found.map_or(self.line, |t| t.line),
            expected: expected.to_string(),
            found: found.map_or_else(|| "end of input".to_string(), |t| t.text.clone()),
        }
    }

    /// Consume the expected keyword, erroring on anything else.
    pub fn keyword(&mut self, expected: &str) -> Result<()> {
        let tok = self.next_token()?;
        match tok {
            Some(ref t) if !t.quoted && t.text == expected => Ok(()),
            other => Err(self.grammar_err(expected, other.as_ref())),
        }
    }

    /// Consume the expected keyword followed by exactly `argc` argument
    /// tokens.
    pub fn property(&mut self, expected: &str, argc: usize) -> Result<Vec<Token>> {
        self.keyword(expected)?;
        self.args(expected, argc)
    }

    /// Consume a `?`-suffixed keyword whose value is either the literal
    /// `NULL` (absent) or `argc` real arguments.
    pub fn property_nullable(&mut self, expected: &str, argc: usize) -> Result<Option<Vec<Token>>> {
        let keyword = format!("{expected}?");
        self.keyword(&keyword)?;
        let first = self
            .next_token()?
            .ok_or_else(|| self.grammar_err("value or NULL", None))?;
        if !first.quoted && first.text == "NULL" {
            return Ok(None);
        }
        let mut out = vec![first];
        out.extend(self.args(expected, argc - 1)?);
        Ok(Some(out))
    }

    /// Consume a keyword followed by a count and that many argument
    /// tokens (variable-arity lists such as visibility ranges).
    pub fn property_counted(&mut self, expected: &str) -> Result<Vec<Token>> {
        self.keyword(expected)?;
        let count = self
            .next_token()?
            .ok_or_else(|| self.grammar_err("count", None))?;
        let n = parse_usize(&count)?;
        self.args(expected, n)
    }

    fn args(&mut self, expected: &str, argc: usize) -> Result<Vec<Token>> {
        let mut out = Vec::with_capacity(argc);
        for _ in 0..argc {
            match self.next_token()? {
                Some(t) => out.push(t),
                None => return Err(self.grammar_err(expected, None)),
            }
        }
        Ok(out)
    }
}

fn numeric_err(tok: &Token, what: &str) -> Error {
    Error::WceParse {
        line: tok.line,
        message: format!("expected {what}, found `{}`", tok.text),
    }
}

pub fn parse_usize(tok: &Token) -> Result<usize> {
    tok.text.parse().map_err(|_| numeric_err(tok, "a count"))
}

pub fn parse_u32(tok: &Token) -> Result<u32> {
    tok.text.parse().map_err(|_| numeric_err(tok, "an unsigned integer"))
}

pub fn parse_i32(tok: &Token) -> Result<i32> {
    tok.text.parse().map_err(|_| numeric_err(tok, "an integer"))
}

pub fn parse_u16(tok: &Token) -> Result<u16> {
    tok.text.parse().map_err(|_| numeric_err(tok, "a 16-bit unsigned integer"))
}

pub fn parse_u8(tok: &Token) -> Result<u8> {
    tok.text.parse().map_err(|_| numeric_err(tok, "an 8-bit unsigned integer"))
}

pub fn parse_f32(tok: &Token) -> Result<f32> {
    tok.text.parse().map_err(|_| numeric_err(tok, "a number"))
}

pub fn parse_bool(tok: &Token) -> Result<bool> {
    match tok.text.as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(numeric_err(tok, "0 or 1")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_comments_and_lines() {
        let mut s = Scanner::new("// header\nTAG \"WALL_MDF\" // trailing\nBRIGHTNESS 0.5\n");
        let t = s.next_token().unwrap().unwrap();
        assert_eq!((t.text.as_str(), t.line, t.quoted), ("TAG", 2, false));
        let t = s.next_token().unwrap().unwrap();
        assert_eq!((t.text.as_str(), t.quoted), ("WALL_MDF", true));
        let t = s.next_token().unwrap().unwrap();
        assert_eq!((t.text.as_str(), t.line), ("BRIGHTNESS", 3));
    }

    #[test]
    fn test_property_arity() {
        let mut s = Scanner::new("XYZ 1.0 -2.0 0.5");
        let args = s.property("XYZ", 3).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(parse_f32(&args[1]).unwrap(), -2.0);
    }

    #[test]
    fn test_keyword_mismatch_reports_line_and_tokens() {
        let mut s = Scanner::new("\n\nWRONG 1");
        let err = s.property("RIGHT", 1).unwrap_err();
        match err {
            Error::WceGrammar { line, expected, found } => {
                assert_eq!(line, 3);
                assert_eq!(expected, "RIGHT");
                assert_eq!(found, "WRONG");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nullable_property() {
        let mut s = Scanner::new("SLEEP? NULL\nSLEEP? 100");
        assert_eq!(s.property_nullable("SLEEP", 1).unwrap(), None);
        let present = s.property_nullable("SLEEP", 1).unwrap().unwrap();
        assert_eq!(parse_u32(&present[0]).unwrap(), 100);
    }

    #[test]
    fn test_counted_property() {
        let mut s = Scanner::new("VISLIST 3 1 4 7");
        let items = s.property_counted("VISLIST").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(parse_u16(&items[2]).unwrap(), 7);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut s = Scanner::new("ENDMATERIALDEFINITION");
        assert_eq!(s.peek().unwrap().unwrap().text, "ENDMATERIALDEFINITION");
        assert_eq!(s.next_token().unwrap().unwrap().text, "ENDMATERIALDEFINITION");
        assert!(s.next_token().unwrap().is_none());
    }
}
