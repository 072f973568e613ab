// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tokenizer for C translation units.
//!
//! Preprocessing directives are not expanded here. Their tokens are returned separately together
//! with their position in the token stream, so definitions can be replayed in source order.

use crate::error::{AnalyzerError, Result};
use dyncheck_metadata::Location;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Question,
    Colon,
    Dot,
    Arrow,
    Ellipsis,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    Shl,
    Shr,
    Inc,
    Dec,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    Hash,
    HashHash,
}

/// Longest punctuators first.
const PUNCTUATORS: &[(&str, Punct)] = &[
    ("...", Punct::Ellipsis),
    ("<<=", Punct::ShlAssign),
    (">>=", Punct::ShrAssign),
    ("->", Punct::Arrow),
    ("++", Punct::Inc),
    ("--", Punct::Dec),
    ("<<", Punct::Shl),
    (">>", Punct::Shr),
    ("<=", Punct::Le),
    (">=", Punct::Ge),
    ("==", Punct::EqEq),
    ("!=", Punct::Ne),
    ("&&", Punct::AndAnd),
    ("||", Punct::OrOr),
    ("+=", Punct::AddAssign),
    ("-=", Punct::SubAssign),
    ("*=", Punct::MulAssign),
    ("/=", Punct::DivAssign),
    ("%=", Punct::RemAssign),
    ("&=", Punct::AndAssign),
    ("|=", Punct::OrAssign),
    ("^=", Punct::XorAssign),
    ("##", Punct::HashHash),
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    (",", Punct::Comma),
    (";", Punct::Semi),
    ("?", Punct::Question),
    (":", Punct::Colon),
    (".", Punct::Dot),
    ("+", Punct::Plus),
    ("-", Punct::Minus),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("%", Punct::Percent),
    ("&", Punct::Amp),
    ("|", Punct::Pipe),
    ("^", Punct::Caret),
    ("~", Punct::Tilde),
    ("!", Punct::Bang),
    ("<", Punct::Lt),
    (">", Punct::Gt),
    ("=", Punct::Assign),
    ("#", Punct::Hash),
];

/// An integer constant as written in the source. Its C type is only known once a machine model
/// is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLiteral {
    pub value: u128,
    pub unsigned: bool,
    /// Number of `l` suffixes: 0, 1 (`long`) or 2 (`long long`).
    pub longs: u8,
    /// Decimal literals never get an unsigned type without a `u` suffix.
    pub decimal: bool,
}

/// The element type of a string literal, given by its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    /// `u8"..."`
    Utf8,
    /// `u"..."`
    Utf16,
    /// `U"..."`
    Utf32,
    /// `L"..."`, elements are `wchar_t`.
    Wide,
}

impl Encoding {
    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "u8" => Encoding::Utf8,
            "u" => Encoding::Utf16,
            "U" => Encoding::Utf32,
            "L" => Encoding::Wide,
            _ => Encoding::Plain,
        }
    }
}

/// One character of a literal. An escape sequence always denotes a single code unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralChar {
    Source(char),
    Escape(u32),
}

impl LiteralChar {
    fn value(self) -> u32 {
        match self {
            LiteralChar::Source(c) => c as u32,
            LiteralChar::Escape(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLiteral {
    pub encoding: Encoding,
    pub chars: Vec<LiteralChar>,
}

impl StrLiteral {
    /// Number of code units of `unit_width` bits, without the terminating null.
    pub fn code_units(&self, unit_width: u32) -> usize {
        self.chars
            .iter()
            .map(|c| match (c, unit_width) {
                (LiteralChar::Escape(_), _) => 1,
                (LiteralChar::Source(c), 8) => c.len_utf8(),
                (LiteralChar::Source(c), 16) => c.len_utf16(),
                (LiteralChar::Source(_), _) => 1,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(IntLiteral),
    Float(String),
    /// Character constants have type `int` in C.
    Char(i64),
    Str(StrLiteral),
    Punct(Punct),
    Unknown(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
    /// Byte range in the source text.
    pub span: Range<usize>,
}

impl Token {
    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// A preprocessing directive, without its leading `#`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub line: u32,
    /// Number of regular tokens that precede the directive.
    pub position: usize,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Line where the comment starts.
    pub line: u32,
    /// Comment text without the delimiters.
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub directives: Vec<Directive>,
    pub comments: Vec<Comment>,
}

/// Split `src` into tokens, directives and comments.
pub fn tokenize(file: &str, src: &str) -> Result<Lexed> {
    Lexer {
        file,
        src,
        bytes: src.as_bytes(),
        pos: 0,
        line: 1,
        line_start: 0,
        at_line_start: true,
        directive: None,
        out: Lexed::default(),
    }
    .run()
}

struct Lexer<'a> {
    file: &'a str,
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    at_line_start: bool,
    directive: Option<Directive>,
    out: Lexed,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Lexed> {
        while let Some(c) = self.peek(0) {
            match c {
                b'\n' => {
                    self.pos += 1;
                    self.newline();
                    self.at_line_start = true;
                    self.finish_directive();
                }
                b'\\' if self.continuation_len().is_some() => self.skip_continuation(),
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
                b'#' if self.at_line_start && self.directive.is_none() => {
                    self.pos += 1;
                    self.at_line_start = false;
                    self.directive = Some(Directive {
                        line: self.line,
                        position: self.out.tokens.len(),
                        tokens: Vec::new(),
                    });
                }
                c if c.is_ascii_whitespace() => self.pos += 1,
                _ => {
                    self.at_line_start = false;
                    match self.token() {
                        Ok(token) => match &mut self.directive {
                            Some(directive) => directive.tokens.push(token),
                            None => self.out.tokens.push(token),
                        },
                        // Directives such as `#error` may hold arbitrary text.
                        Err(_) if self.directive.is_some() => self.skip_line(),
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        self.finish_directive();
        Ok(self.out)
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn location(&self) -> Location {
        Location::new(self.file, self.line, self.column())
    }

    fn column(&self) -> u32 {
        (self.pos - self.line_start + 1) as u32
    }

    /// Record that `self.pos` is at the beginning of a new line.
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.pos;
    }

    /// Length of a backslash-newline sequence at the current position.
    fn continuation_len(&self) -> Option<usize> {
        match (self.peek(1), self.peek(2)) {
            (Some(b'\n'), _) => Some(2),
            (Some(b'\r'), Some(b'\n')) => Some(3),
            _ => None,
        }
    }

    fn skip_continuation(&mut self) {
        if let Some(len) = self.continuation_len() {
            self.pos += len;
            self.newline();
        }
    }

    /// Move to the end of the current line, leaving the newline unconsumed.
    fn skip_line(&mut self) {
        self.pos =
            self.src[self.pos..].find('\n').map_or(self.src.len(), |offset| self.pos + offset);
    }

    fn finish_directive(&mut self) {
        if let Some(directive) = self.directive.take() {
            self.out.directives.push(directive);
        }
    }

    fn line_comment(&mut self) {
        let start = self.pos + 2;
        let end = self.src[start..].find('\n').map_or(self.src.len(), |offset| start + offset);
        self.out.comments.push(Comment { line: self.line, text: self.src[start..end].to_string() });
        self.pos = end;
    }

    fn block_comment(&mut self) -> Result<()> {
        let location = self.location();
        let start = self.pos + 2;
        let Some(offset) = self.src[start..].find("*/") else {
            return Err(AnalyzerError::lex(location, "unterminated /* comment"));
        };
        let text = &self.src[start..start + offset];
        self.out.comments.push(Comment { line: self.line, text: text.to_string() });
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                self.line += 1;
                self.line_start = start + idx + 1;
            }
        }
        self.pos = start + offset + 2;
        Ok(())
    }

    fn token(&mut self) -> Result<Token> {
        let start = self.pos;
        let (line, column) = (self.line, self.column());
        let kind = match self.bytes[self.pos] {
            c if c == b'_' || c.is_ascii_alphabetic() || c >= 0x80 => self.ident_or_prefixed()?,
            c if c.is_ascii_digit() => self.number()?,
            b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
            b'\'' => self.char_literal(false)?,
            b'"' => self.string_literal(Encoding::Plain)?,
            _ => self.punct(),
        };
        Ok(Token { kind, line, column, span: start..self.pos })
    }

    fn ident_or_prefixed(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c == b'_' || c.is_ascii_alphanumeric() || c >= 0x80)
        {
            self.pos += 1;
        }
        let name = &self.src[start..self.pos];
        if matches!(name, "L" | "u" | "U" | "u8") {
            match self.peek(0) {
                Some(b'\'') => return self.char_literal(true),
                Some(b'"') => return self.string_literal(Encoding::from_prefix(name)),
                _ => {}
            }
        }
        Ok(TokenKind::Ident(name.to_string()))
    }

    fn number(&mut self) -> Result<TokenKind> {
        let location = self.location();
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if matches!(c, b'e' | b'E' | b'p' | b'P') && matches!(self.peek(1), Some(b'+' | b'-')) {
                self.pos += 2;
            } else if c == b'.' || c == b'_' || c.is_ascii_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        classify_number(text).ok_or_else(|| {
            AnalyzerError::lex(location, format!("invalid integer constant `{text}`"))
        })
    }

    /// Consume one, possibly escaped, character of a literal.
    fn literal_char(&mut self, quote: u8) -> Result<Option<LiteralChar>> {
        let location = self.location();
        let unterminated = || {
            AnalyzerError::lex(
                location.clone(),
                format!("missing terminating {} character", quote as char),
            )
        };
        let Some(c) = self.src[self.pos..].chars().next() else {
            return Err(unterminated());
        };
        if c == '\n' {
            return Err(unterminated());
        }
        self.pos += c.len_utf8();
        if c as u32 == quote as u32 {
            return Ok(None);
        }
        if c != '\\' {
            return Ok(Some(LiteralChar::Source(c)));
        }
        let Some(escaped) = self.peek(0) else {
            return Err(unterminated());
        };
        self.pos += 1;
        let value = match escaped {
            b'n' => 0x0a,
            b't' => 0x09,
            b'r' => 0x0d,
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'0'..=b'7' => {
                let mut value = (escaped - b'0') as u32;
                for _ in 0..2 {
                    match self.peek(0) {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                value
            }
            b'x' => {
                let mut value: u32 = 0;
                while let Some(d) = self.peek(0).and_then(|c| (c as char).to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    self.pos += 1;
                }
                value
            }
            other => other as u32,
        };
        Ok(Some(LiteralChar::Escape(value)))
    }

    fn char_literal(&mut self, prefixed: bool) -> Result<TokenKind> {
        let location = self.location();
        self.pos += 1;
        let mut chars = Vec::new();
        while let Some(c) = self.literal_char(b'\'')? {
            chars.push(c.value());
        }
        let value = match chars.as_slice() {
            [] => return Err(AnalyzerError::lex(location, "empty character constant")),
            [c] if prefixed => *c as i64,
            // Plain `char` is signed.
            [c] => (*c as u8) as i8 as i64,
            // Multi-character constants follow GCC: bytes are packed into an `int`.
            many => {
                many.iter().fold(0i64, |acc, c| ((acc << 8) | (*c as i64 & 0xff)) as i32 as i64)
            }
        };
        Ok(TokenKind::Char(value))
    }

    fn string_literal(&mut self, encoding: Encoding) -> Result<TokenKind> {
        self.pos += 1;
        let mut chars = Vec::new();
        while let Some(c) = self.literal_char(b'"')? {
            chars.push(c);
        }
        Ok(TokenKind::Str(StrLiteral { encoding, chars }))
    }

    fn punct(&mut self) -> TokenKind {
        let rest = &self.src[self.pos..];
        if let Some((text, punct)) = PUNCTUATORS.iter().find(|(text, _)| rest.starts_with(text)) {
            self.pos += text.len();
            return TokenKind::Punct(*punct);
        }
        let c = rest.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
        self.pos += c.len_utf8().max(1);
        TokenKind::Unknown(c)
    }
}

/// Interpret a preprocessing number. Returns `None` for malformed integer constants.
fn classify_number(text: &str) -> Option<TokenKind> {
    let lower = text.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let is_float = if is_hex { lower.contains('.') || lower.contains('p') } else {
        lower.contains('.') || lower.contains('e')
    };
    if is_float {
        return Some(TokenKind::Float(text.to_string()));
    }

    let digits_end = lower.trim_end_matches(['u', 'l']).len();
    let (digits, suffix) = lower.split_at(digits_end);
    let (unsigned, longs) = match suffix {
        "" => (false, 0),
        "u" => (true, 0),
        "l" => (false, 1),
        "ul" | "lu" => (true, 1),
        "ll" => (false, 2),
        "ull" | "llu" => (true, 2),
        _ => return None,
    };
    // `lL` and `Ll` are not valid suffixes.
    if longs == 2 && !(text.contains("ll") || text.contains("LL")) {
        return None;
    }

    let (radix, body) = if is_hex {
        (16, &digits[2..])
    } else if let Some(bin) = digits.strip_prefix("0b") {
        (2, bin)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if body.is_empty() || body.starts_with(['+', '-']) {
        return None;
    }
    let value = u128::from_str_radix(body, radix).ok()?;
    Some(TokenKind::Int(IntLiteral { value, unsigned, longs, decimal: radix == 10 }))
}
