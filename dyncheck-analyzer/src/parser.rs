// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Precedence-climbing parser for C expressions.
//!
//! The parser only sees the (macro-expanded) tokens of a single expression, so there is no
//! symbol table: a parenthesized group is a cast when it starts with a type keyword or with one
//! of the standard integer typedefs.

use crate::error::ParseError;
use crate::expr::{BinaryOperator, Expr, MAX_NESTING, UnaryOperator};
use crate::lexer::{Encoding, Punct, Token, TokenKind};
use crate::types::CType;

type ParseResult<T> = Result<T, ParseError>;

/// Parse `tokens` as a single expression. Every token must be consumed.
pub fn parse_expression(tokens: &[Token]) -> ParseResult<Expr> {
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.expression()?;
    if parser.pos < tokens.len() {
        return Err(parser.error("unexpected token after expression"));
    }
    Ok(expr)
}

const TYPE_SPECIFIERS: &[&str] = &[
    "void", "_Bool", "char", "short", "int", "long", "signed", "unsigned", "float", "double",
    "const", "volatile", "restrict", "struct", "union", "enum", "_Ptr", "_Array_ptr",
    "_Nt_array_ptr",
];

/// Typedefs from `<stddef.h>` and `<stdint.h>`.
fn typedef(name: &str) -> Option<CType> {
    let typ = match name {
        "size_t" | "uintptr_t" => CType::PointerSized { signed: false },
        "ptrdiff_t" | "intptr_t" | "ssize_t" => CType::PointerSized { signed: true },
        _ => {
            let (signed, bits) = match name.strip_prefix('u') {
                Some(rest) => (false, rest),
                None => (true, name),
            };
            let width = bits.strip_prefix("int")?.strip_suffix("_t")?.parse().ok()?;
            if !matches!(width, 8 | 16 | 32 | 64) {
                return None;
            }
            CType::Fixed { width, signed }
        }
    };
    Some(typ)
}

fn binary_operator(punct: Punct) -> Option<BinaryOperator> {
    use BinaryOperator::*;
    let op = match punct {
        Punct::Star => Mult,
        Punct::Slash => Div,
        Punct::Percent => Mod,
        Punct::Plus => Plus,
        Punct::Minus => Minus,
        Punct::Shl => Shl,
        Punct::Shr => Shr,
        Punct::Lt => Lt,
        Punct::Gt => Gt,
        Punct::Le => Le,
        Punct::Ge => Ge,
        Punct::EqEq => Equal,
        Punct::Ne => Notequal,
        Punct::Amp => Bitand,
        Punct::Caret => Bitxor,
        Punct::Pipe => Bitor,
        Punct::AndAnd => And,
        Punct::OrOr => Or,
        _ => return None,
    };
    Some(op)
}

/// `None` stands for plain assignment.
fn assignment_operator(punct: Punct) -> Option<Option<BinaryOperator>> {
    use BinaryOperator::*;
    let op = match punct {
        Punct::Assign => None,
        Punct::AddAssign => Some(Plus),
        Punct::SubAssign => Some(Minus),
        Punct::MulAssign => Some(Mult),
        Punct::DivAssign => Some(Div),
        Punct::RemAssign => Some(Mod),
        Punct::AndAssign => Some(Bitand),
        Punct::OrAssign => Some(Bitor),
        Punct::XorAssign => Some(Bitxor),
        Punct::ShlAssign => Some(Shl),
        Punct::ShrAssign => Some(Shr),
        _ => return None,
    };
    Some(op)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Nesting of the expression being parsed. Every level of the resulting tree adds at least
    /// one.
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> ParseError {
        ParseError { index: self.pos, message: message.to_string() }
    }

    /// Enter one more level of nesting.
    fn nest(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("expression is nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|token| &token.kind)
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek() {
            Some(TokenKind::Punct(punct)) => Some(*punct),
            _ => None,
        }
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(TokenKind::Ident(name)) => Some(name),
            _ => None,
        }
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.peek_punct() == Some(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct, message: &str) -> ParseResult<()> {
        if self.eat(punct) { Ok(()) } else { Err(self.error(message)) }
    }

    fn expect_ident(&mut self, message: &str) -> ParseResult<String> {
        let name = self.peek_ident().map(str::to_string).ok_or_else(|| self.error(message))?;
        self.pos += 1;
        Ok(name)
    }

    /// Whether the token at `pos + offset` starts a type name.
    fn is_type_start(&self, offset: usize) -> bool {
        match self.tokens.get(self.pos + offset).map(|token| &token.kind) {
            Some(TokenKind::Ident(name)) => {
                TYPE_SPECIFIERS.contains(&name.as_str()) || typedef(name).is_some()
            }
            _ => false,
        }
    }

    /// expression: assignment (`,` assignment)*
    fn expression(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        self.nest()?;
        let mut lhs = self.assignment()?;
        while self.eat(Punct::Comma) {
            self.nest()?;
            let rhs = self.assignment()?;
            lhs = Expr::Comma { lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.conditional()?;
        match self.peek_punct().and_then(assignment_operator) {
            Some(op) => {
                self.pos += 1;
                let depth = self.depth;
                self.nest()?;
                let rhs = self.assignment()?;
                self.depth = depth;
                Ok(Expr::Assign { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
            }
            None => Ok(lhs),
        }
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        self.nest()?;
        let c = self.binary(1)?;
        if !self.eat(Punct::Question) {
            self.depth = depth;
            return Ok(c);
        }
        let t = self.expression()?;
        self.expect(Punct::Colon, "expected `:` in conditional expression")?;
        let e = self.conditional()?;
        self.depth = depth;
        Ok(Expr::Conditional { c: Box::new(c), t: Box::new(t), e: Box::new(e) })
    }

    fn binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut lhs = self.cast()?;
        while let Some(op) = self.peek_punct().and_then(binary_operator) {
            if op.precedence() < min_precedence {
                break;
            }
            self.pos += 1;
            self.nest()?;
            let rhs = self.binary(op.precedence() + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn cast(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        self.nest()?;
        let e = if self.peek_punct() == Some(Punct::LParen) && self.is_type_start(1) {
            self.pos += 1;
            let typ = self.type_name()?;
            self.expect(Punct::RParen, "expected `)` after type name")?;
            if self.peek_punct() == Some(Punct::LBrace) {
                return Err(self.error("compound literals are not supported"));
            }
            let e = self.cast()?;
            Expr::Cast { typ, e: Box::new(e) }
        } else {
            self.unary()?
        };
        self.depth = depth;
        Ok(e)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_punct() {
            Some(Punct::Bang) => Some(UnaryOperator::Not),
            Some(Punct::Tilde) => Some(UnaryOperator::Bitnot),
            Some(Punct::Minus) => Some(UnaryOperator::UnaryMinus),
            Some(Punct::Plus) => Some(UnaryOperator::UnaryPlus),
            Some(Punct::Amp) => Some(UnaryOperator::AddressOf),
            Some(Punct::Star) => Some(UnaryOperator::Dereference),
            Some(Punct::Inc) => Some(UnaryOperator::PreIncrement),
            Some(Punct::Dec) => Some(UnaryOperator::PreDecrement),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            self.nest()?;
            let e = match op {
                UnaryOperator::PreIncrement | UnaryOperator::PreDecrement => self.unary()?,
                _ => self.cast()?,
            };
            return Ok(Expr::unary(op, e));
        }

        if self.peek_ident() == Some("sizeof") {
            self.pos += 1;
            self.nest()?;
            if self.peek_punct() == Some(Punct::LParen) && self.is_type_start(1) {
                self.pos += 1;
                let typ = self.type_name()?;
                self.expect(Punct::RParen, "expected `)` after type name")?;
                return Ok(Expr::SizeOfType(typ));
            }
            let e = self.unary()?;
            return Ok(Expr::SizeOfExpr(Box::new(e)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut e = self.primary()?;
        loop {
            match self.peek_punct() {
                Some(Punct::LParen) => {
                    self.pos += 1;
                    self.nest()?;
                    let mut arguments = Vec::new();
                    if !self.eat(Punct::RParen) {
                        loop {
                            arguments.push(self.assignment()?);
                            if self.eat(Punct::RParen) {
                                break;
                            }
                            self.expect(Punct::Comma, "expected `,` or `)` in argument list")?;
                        }
                    }
                    e = Expr::Call { function: Box::new(e), arguments };
                }
                Some(Punct::LBracket) => {
                    self.pos += 1;
                    self.nest()?;
                    let index = self.expression()?;
                    self.expect(Punct::RBracket, "expected `]`")?;
                    e = Expr::Index { array: Box::new(e), index: Box::new(index) };
                }
                Some(punct @ (Punct::Dot | Punct::Arrow)) => {
                    self.pos += 1;
                    self.nest()?;
                    let field = self.expect_ident("expected member name")?;
                    e = Expr::Member { lhs: Box::new(e), field, arrow: punct == Punct::Arrow };
                }
                Some(punct @ (Punct::Inc | Punct::Dec)) => {
                    self.pos += 1;
                    self.nest()?;
                    e = Expr::Postfix { increment: punct == Punct::Inc, e: Box::new(e) };
                }
                _ => return Ok(e),
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let Some(kind) = self.peek().cloned() else {
            return Err(self.error("expected expression"));
        };
        self.pos += 1;
        match kind {
            TokenKind::Int(literal) => Ok(Expr::Int(literal)),
            TokenKind::Char(value) => Ok(Expr::Char(value)),
            TokenKind::Float(text) => Ok(Expr::Float(text)),
            TokenKind::Str(mut literal) => {
                // Adjacent string literals are concatenated. A prefix applies to the whole result.
                while let Some(TokenKind::Str(next)) = self.peek() {
                    literal.encoding = match (literal.encoding, next.encoding) {
                        (Encoding::Plain, encoding) | (encoding, Encoding::Plain) => encoding,
                        (lhs, rhs) if lhs == rhs => lhs,
                        _ => {
                            return Err(self.error("string literals with different prefixes"));
                        }
                    };
                    literal.chars.extend_from_slice(&next.chars);
                    self.pos += 1;
                }
                Ok(Expr::Str(literal))
            }
            TokenKind::Ident(name) => Ok(Expr::Ident(name)),
            TokenKind::Punct(Punct::LParen) => {
                let e = self.expression()?;
                self.expect(Punct::RParen, "expected `)`")?;
                Ok(e)
            }
            TokenKind::Punct(_) | TokenKind::Unknown(_) => {
                self.pos -= 1;
                Err(self.error("expected expression"))
            }
        }
    }

    /// type-name: specifier-qualifier-list abstract-pointer-declarator?
    fn type_name(&mut self) -> ParseResult<CType> {
        let mut signed = None;
        let mut longs = 0;
        let mut base: Option<CType> = None;

        while let Some(name) = self.peek_ident().map(str::to_string) {
            match name.as_str() {
                "const" | "volatile" | "restrict" => {}
                "signed" => signed = Some(true),
                "unsigned" => signed = Some(false),
                "long" => longs += 1,
                "short" => base = Some(CType::Short { signed: true }),
                "int" => {
                    if base.is_none() {
                        base = Some(CType::Int { signed: true });
                    }
                }
                "char" => base = Some(CType::Char { signed: None }),
                "void" => base = Some(CType::Void),
                "_Bool" => base = Some(CType::Bool),
                "float" => base = Some(CType::Float),
                "double" => base = Some(CType::Double),
                "struct" | "union" | "enum" => {
                    self.pos += 1;
                    let tag = self.expect_ident("expected tag name")?;
                    base = Some(CType::Record(format!("{name} {tag}")));
                    continue;
                }
                "_Ptr" | "_Array_ptr" | "_Nt_array_ptr" => {
                    self.pos += 1;
                    self.skip_type_arguments()?;
                    base = Some(CType::Pointer);
                    continue;
                }
                other => match typedef(other) {
                    Some(typ) if base.is_none() && signed.is_none() && longs == 0 => {
                        base = Some(typ)
                    }
                    _ => break,
                },
            }
            self.pos += 1;
        }

        let typ = match (base, longs) {
            (Some(typ @ (CType::Pointer | CType::Record(_))), _) => typ,
            (Some(CType::Double), 1) if signed.is_none() => CType::LongDouble,
            (Some(CType::Int { .. }), 0) => CType::Int { signed: signed.unwrap_or(true) },
            (None, 0) => match signed {
                Some(signed) => CType::Int { signed },
                None => return Err(self.error("expected type specifier")),
            },
            (Some(CType::Int { .. }) | None, 1) => CType::Long { signed: signed.unwrap_or(true) },
            (Some(CType::Int { .. }) | None, 2) => {
                CType::LongLong { signed: signed.unwrap_or(true) }
            }
            (Some(CType::Short { .. }), 0) => CType::Short { signed: signed.unwrap_or(true) },
            (Some(CType::Char { .. }), 0) => CType::Char { signed },
            (Some(typ), 0) if signed.is_none() => typ,
            _ => return Err(self.error("invalid combination of type specifiers")),
        };

        // Abstract declarator: only pointers are understood.
        let mut typ = typ;
        while self.eat(Punct::Star) {
            typ = CType::Pointer;
            while matches!(self.peek_ident(), Some("const" | "volatile" | "restrict")) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_punct(), Some(Punct::LParen | Punct::LBracket)) {
            return Err(self.error("function and array type names are not supported"));
        }
        Ok(typ)
    }

    /// Skip `<...>` after a checked pointer keyword.
    fn skip_type_arguments(&mut self) -> ParseResult<()> {
        self.expect(Punct::Lt, "expected `<` after checked pointer type")?;
        let mut depth = 1;
        while depth > 0 {
            match self.peek_punct() {
                Some(Punct::Lt) => depth += 1,
                Some(Punct::Gt) => depth -= 1,
                Some(Punct::Shr) => depth -= 2,
                None if self.peek().is_none() => {
                    return Err(self.error("unterminated checked pointer type"));
                }
                _ => {}
            }
            self.pos += 1;
        }
        if depth < 0 {
            return Err(self.error("unbalanced `>` in checked pointer type"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{IntLiteral, tokenize};

    fn parse(src: &str) -> ParseResult<Expr> {
        parse_expression(&tokenize("p.c", src).unwrap().tokens)
    }

    fn int(value: u128) -> Expr {
        Expr::Int(IntLiteral { value, unsigned: false, longs: 0, decimal: true })
    }

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    #[test]
    fn check_precedence() {
        use BinaryOperator::*;
        assert_eq!(
            parse("1 + 2 * 3 == 7 && x").unwrap(),
            Expr::binary(
                And,
                Expr::binary(
                    Equal,
                    Expr::binary(Plus, int(1), Expr::binary(Mult, int(2), int(3))),
                    int(7),
                ),
                ident("x"),
            )
        );
        assert_eq!(
            parse("a - b - c").unwrap(),
            Expr::binary(Minus, Expr::binary(Minus, ident("a"), ident("b")), ident("c"))
        );
        assert_eq!(
            parse("a || b && c").unwrap(),
            Expr::binary(Or, ident("a"), Expr::binary(And, ident("b"), ident("c")))
        );
    }

    #[test]
    fn check_unary_and_postfix() {
        assert_eq!(
            parse("!p->next").unwrap(),
            Expr::unary(
                UnaryOperator::Not,
                Expr::Member { lhs: Box::new(ident("p")), field: "next".into(), arrow: true }
            )
        );
        assert_eq!(
            parse("-a[i]").unwrap(),
            Expr::unary(
                UnaryOperator::UnaryMinus,
                Expr::Index { array: Box::new(ident("a")), index: Box::new(ident("i")) }
            )
        );
        assert!(matches!(parse("i++").unwrap(), Expr::Postfix { increment: true, .. }));
        assert!(matches!(
            parse("f(1, g(2))").unwrap(),
            Expr::Call { arguments, .. } if arguments.len() == 2
        ));
        assert!(matches!(
            parse("f()").unwrap(),
            Expr::Call { arguments, .. } if arguments.is_empty()
        ));
    }

    #[test]
    fn check_conditional_and_assignment() {
        assert!(matches!(
            parse("c ? 1 : d ? 2 : 3").unwrap(),
            Expr::Conditional { e, .. } if matches!(*e, Expr::Conditional { .. })
        ));
        assert!(matches!(
            parse("x = y += 1").unwrap(),
            Expr::Assign { op: None, rhs, .. }
                if matches!(*rhs, Expr::Assign { op: Some(BinaryOperator::Plus), .. })
        ));
        assert!(matches!(parse("(a, 0)").unwrap(), Expr::Comma { .. }));
    }

    #[test]
    fn check_casts() {
        assert_eq!(
            parse("(unsigned long) -1").unwrap(),
            Expr::Cast {
                typ: CType::Long { signed: false },
                e: Box::new(Expr::unary(UnaryOperator::UnaryMinus, int(1)))
            }
        );
        assert!(matches!(parse("(void *)0").unwrap(), Expr::Cast { typ: CType::Pointer, .. }));
        assert!(matches!(parse("(_Ptr<int>)0").unwrap(), Expr::Cast { typ: CType::Pointer, .. }));
        assert!(matches!(
            parse("(_Array_ptr<_Ptr<char>>)p").unwrap(),
            Expr::Cast { typ: CType::Pointer, .. }
        ));
        assert!(matches!(
            parse("(uint8_t)300").unwrap(),
            Expr::Cast { typ: CType::Fixed { width: 8, signed: false }, .. }
        ));
        assert!(matches!(
            parse("(long long unsigned int)1").unwrap(),
            Expr::Cast { typ: CType::LongLong { signed: false }, .. }
        ));
        assert!(matches!(
            parse("(struct node *)p").unwrap(),
            Expr::Cast { typ: CType::Pointer, .. }
        ));
        // A parenthesized variable is not a cast.
        assert_eq!(parse("(x)").unwrap(), ident("x"));
    }

    #[test]
    fn check_sizeof() {
        assert_eq!(parse("sizeof(int)").unwrap(), Expr::SizeOfType(CType::Int { signed: true }));
        assert_eq!(
            parse("sizeof(size_t)").unwrap(),
            Expr::SizeOfType(CType::PointerSized { signed: false })
        );
        assert_eq!(parse("sizeof x").unwrap(), Expr::SizeOfExpr(Box::new(ident("x"))));
        assert_eq!(parse("sizeof (x)").unwrap(), Expr::SizeOfExpr(Box::new(ident("x"))));
    }

    #[test]
    fn check_errors() {
        assert!(parse("").is_err());
        assert!(parse("1 +").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("(int[2]){0}").is_err());
        assert!(parse("(int (*)(void))f").is_err());
        assert!(parse("(unsigned double)1").is_err());
    }

    #[test]
    fn check_nesting_limit() {
        let nested = |depth| format!("{}0{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested(40)).unwrap(), int(0));
        let err = parse(&nested(1000)).unwrap_err();
        assert_eq!(err.message, "expression is nested too deeply");
        assert!(parse(&format!("{}x", "!".repeat(1000))).is_err());
        assert!(parse(&format!("x{}", "[0]".repeat(1000))).is_err());
        // Long operator chains build deep trees too.
        assert!(parse(&vec!["1"; 1000].join(" + ")).is_err());
        assert!(parse(&vec!["1"; 50].join(" + ")).is_ok());
    }

    #[test]
    fn check_string_concatenation() {
        let Expr::Str(literal) = parse(r#""ab" L"c" "d""#).unwrap() else {
            panic!("expected a string literal");
        };
        assert_eq!(literal.encoding, Encoding::Wide);
        assert_eq!(literal.code_units(32), 4);
        assert!(parse(r#"u"a" U"b""#).is_err());
    }
}
