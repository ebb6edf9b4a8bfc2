//! Minimal C tokenizer
//!
//! Produces just enough structure to find top-level function definitions:
//! identifiers, literals and single-character punctuation. Comments and
//! preprocessor directives are dropped. Each token remembers whether it was
//! separated from its predecessor by whitespace so declarations can be
//! rendered back with normalized spacing.

use crate::extract::ExtractError;

/// Kind of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident,
    /// Numeric literal
    Number,
    /// String or character literal
    Literal,
    /// Any other single character
    Punct(char),
}

/// A token borrowed from the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// 1-based source line
    pub line: usize,
    /// Whitespace, a comment or a directive preceded this token
    pub space_before: bool,
}

impl<'a> Token<'a> {
    /// Check whether this token is the punctuation character `c`
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    /// Check whether this token is the identifier or keyword `word`
    pub fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }
}

/// Tokenize C source text
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ExtractError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    at_line_start: bool,
    space_before: bool,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            at_line_start: true,
            space_before: false,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek(0)?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.at_line_start = true;
        }
        Some(b)
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, ExtractError> {
        while let Some(b) = self.peek(0) {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => {
                    self.bump();
                    self.space_before = true;
                }
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'#' if self.at_line_start => self.skip_directive(),
                b'"' | b'\'' => self.lex_literal(b)?,
                b if b.is_ascii_alphabetic() || b == b'_' => {
                    self.lex_while(TokenKind::Ident, |c| c.is_ascii_alphanumeric() || c == b'_')
                }
                b if b.is_ascii_digit() => {
                    self.lex_while(TokenKind::Number, |c| c.is_ascii_alphanumeric() || c == b'.')
                }
                _ => {
                    let start = self.pos;
                    let ch = self.src[start..].chars().next().unwrap_or('\u{fffd}');
                    self.pos += ch.len_utf8();
                    self.push(TokenKind::Punct(ch), start, self.line);
                }
            }
        }
        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        self.tokens.push(Token {
            kind,
            text: &self.src[start..self.pos],
            line,
            space_before: self.space_before,
        });
        self.space_before = false;
        self.at_line_start = false;
    }

    fn lex_while(&mut self, kind: TokenKind, accept: impl Fn(u8) -> bool) {
        let start = self.pos;
        let line = self.line;
        while self.peek(0).is_some_and(&accept) {
            self.pos += 1;
        }
        self.push(kind, start, line);
    }

    fn lex_literal(&mut self, quote: u8) -> Result<(), ExtractError> {
        let start = self.pos;
        let line = self.line;
        self.bump();
        loop {
            match self.bump() {
                Some(b'\\') => {
                    self.bump();
                }
                Some(b) if b == quote => break,
                Some(b'\n') | None => {
                    return Err(ExtractError::Lex {
                        line,
                        message: "unterminated literal".to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        self.push(TokenKind::Literal, start, line);
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.bump();
        }
        self.space_before = true;
    }

    fn skip_block_comment(&mut self) -> Result<(), ExtractError> {
        let line = self.line;
        let at_line_start = self.at_line_start;
        self.pos += 2;
        loop {
            match self.bump() {
                Some(b'*') if self.peek(0) == Some(b'/') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
                None => {
                    return Err(ExtractError::Lex {
                        line,
                        message: "unterminated block comment".to_string(),
                    })
                }
            }
        }
        // A comment does not end the run of leading whitespace on a line
        self.at_line_start = self.at_line_start || at_line_start;
        self.space_before = true;
        Ok(())
    }

    /// Skip a preprocessor directive, honoring backslash continuations
    fn skip_directive(&mut self) {
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' if self.peek(1) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                }
                b'\\' if self.peek(1) == Some(b'\r') && self.peek(2) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                    self.bump();
                }
                b'\n' => break,
                _ => {
                    self.bump();
                }
            }
        }
        self.space_before = true;
    }
}

/// Render tokens back to text, collapsing any separating whitespace to one space
pub fn render(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 && tok.space_before {
            out.push(' ');
        }
        out.push_str(tok.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_declaration() {
        let toks = tokenize("static int BhAPI_count(void) {").unwrap();
        let texts: Vec<&str> = toks.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["static", "int", "BhAPI_count", "(", "void", ")", "{"]);
        assert!(toks[3].is_punct('('));
        assert!(!toks[3].space_before);
        assert!(toks[2].space_before);
    }

    #[test]
    fn test_comments_and_directives_are_skipped() {
        let src = "#include <Python.h>\n#define X \\\n  1\n/* c */ int // tail\nx;";
        let toks = tokenize(src).unwrap();
        let texts: Vec<&str> = toks.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["int", "x", ";"]);
        assert_eq!(toks[0].line, 4);
        assert_eq!(toks[1].line, 5);
    }

    #[test]
    fn test_hash_inside_line_is_punct() {
        assert_eq!(
            kinds("a # b"),
            vec![TokenKind::Ident, TokenKind::Punct('#'), TokenKind::Ident]
        );
    }

    #[test]
    fn test_literals() {
        let toks = tokenize(r#"f("a;{b\"", '}')"#).unwrap();
        assert_eq!(toks[2].kind, TokenKind::Literal);
        assert_eq!(toks[2].text, r#""a;{b\"""#);
        assert_eq!(toks[4].text, "'}'");
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        assert!(matches!(
            tokenize("int x; /* never closed"),
            Err(ExtractError::Lex { line: 1, .. })
        ));
    }

    #[test]
    fn test_render_normalizes_whitespace() {
        let toks = tokenize("(const char  *name,\n     int\tlen)").unwrap();
        assert_eq!(render(&toks), "(const char *name, int len)");
    }
}
