// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constant folding of C expressions.
//!
//! Folding follows the C integer semantics of the selected machine model. Anything whose value
//! depends on the program state, or whose behavior is undefined (signed overflow, division by
//! zero, out of range shifts), folds to `None`.

use crate::expr::{BinaryOperator, Expr, MAX_NESTING, UnaryOperator};
use crate::lexer::{Encoding, IntLiteral, StrLiteral};
use crate::machine_model::MachineModel;
use crate::types::{CType, IntType};
use std::cell::Cell;
use tracing::trace;

/// An integer constant together with its C type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstInt {
    pub value: i128,
    pub typ: IntType,
}

impl ConstInt {
    pub fn new(value: i128, typ: IntType) -> Self {
        ConstInt { value: typ.wrap(value), typ }
    }

    /// Build the result of an arithmetic operation: unsigned types wrap around, signed
    /// overflow has no value.
    fn checked(value: Option<i128>, typ: IntType) -> Option<Self> {
        let value = value?;
        if typ.signed && !typ.contains(value) {
            trace!(value, ?typ, "signed_overflow");
            return None;
        }
        Some(ConstInt::new(value, typ))
    }

    fn convert(self, typ: IntType) -> Self {
        ConstInt::new(self.value, typ)
    }
}

/// The value of a constant expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(ConstInt),
    /// An integer converted to a pointer type, e.g., `(void *)0`.
    Pointer(i128),
    /// The address of an object, e.g., a string literal. Never null, otherwise unknown.
    Address,
}

impl Value {
    pub fn is_true(&self) -> bool {
        match self {
            Value::Int(int) => int.value != 0,
            Value::Pointer(address) => *address != 0,
            Value::Address => true,
        }
    }
}

pub struct Evaluator<'a> {
    model: &'a MachineModel,
    depth: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(model: &'a MachineModel) -> Self {
        Evaluator { model, depth: Cell::new(0) }
    }

    /// The truth value of `expr` when used as a condition, if it is a constant.
    pub fn condition(&self, expr: &Expr) -> Option<bool> {
        self.eval(expr).map(|value| value.is_true())
    }

    pub fn eval(&self, expr: &Expr) -> Option<Value> {
        let depth = self.depth.get();
        if depth >= MAX_NESTING {
            trace!(depth, "nesting_limit");
            return None;
        }
        self.depth.set(depth + 1);
        let value = self.fold(expr);
        self.depth.set(depth);
        value
    }

    fn fold(&self, expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Int(literal) => self.literal(literal).map(Value::Int),
            Expr::Char(value) => {
                Some(Value::Int(ConstInt::new(i128::from(*value), self.model.int())))
            }
            Expr::Str(_) => Some(Value::Address),
            Expr::Unary { op: UnaryOperator::AddressOf, e } => match e.as_ref() {
                Expr::Ident(_) | Expr::Str(_) => Some(Value::Address),
                _ => None,
            },
            Expr::Unary { op, e } => self.unary(*op, self.eval(e)?),
            Expr::Binary { op: BinaryOperator::And, lhs, rhs } => self.logical(false, lhs, rhs),
            Expr::Binary { op: BinaryOperator::Or, lhs, rhs } => self.logical(true, lhs, rhs),
            Expr::Binary { op, lhs, rhs } => self.binary(*op, self.eval(lhs)?, self.eval(rhs)?),
            Expr::Conditional { c, t, e } => self.conditional(c, t, e),
            Expr::Cast { typ, e } => self.cast(typ, self.eval(e)?),
            Expr::SizeOfType(typ) => self.size_of(typ),
            Expr::SizeOfExpr(e) => match e.as_ref() {
                Expr::Str(literal) => self.size_of_literal(literal),
                _ => None,
            },
            Expr::Comma { rhs, .. } => self.eval(rhs),
            Expr::Float(_)
            | Expr::Ident(_)
            | Expr::Postfix { .. }
            | Expr::Assign { .. }
            | Expr::Call { .. }
            | Expr::Index { .. }
            | Expr::Member { .. } => None,
        }
    }

    fn int(&self, value: bool) -> Value {
        Value::Int(ConstInt::new(value as i128, self.model.int()))
    }

    fn size(&self, bytes: u64) -> Option<Value> {
        Some(Value::Int(ConstInt::new(bytes as i128, self.model.size_t())))
    }

    fn size_of(&self, typ: &CType) -> Option<Value> {
        self.size(self.model.size_of(typ)?)
    }

    /// Size of the array holding a string literal, terminating null included.
    fn size_of_literal(&self, literal: &StrLiteral) -> Option<Value> {
        let unit_width = match literal.encoding {
            Encoding::Plain | Encoding::Utf8 => self.model.char_width,
            Encoding::Utf16 => 16,
            Encoding::Utf32 => 32,
            Encoding::Wide => self.model.wchar_width,
        };
        let units = literal.code_units(unit_width) as u64 + 1;
        self.size(units * u64::from(unit_width / 8))
    }

    /// Type an integer literal: the first candidate type that can represent the value.
    fn literal(&self, literal: &IntLiteral) -> Option<ConstInt> {
        let model = self.model;
        let int = IntType::signed(model.int_width);
        let uint = IntType::unsigned(model.int_width);
        let long = IntType::signed(model.long_int_width);
        let ulong = IntType::unsigned(model.long_int_width);
        let llong = IntType::signed(model.long_long_int_width);
        let ullong = IntType::unsigned(model.long_long_int_width);
        let candidates: &[IntType] = match (literal.unsigned, literal.longs, literal.decimal) {
            (false, 0, true) => &[int, long, llong],
            (false, 0, false) => &[int, uint, long, ulong, llong, ullong],
            (true, 0, _) => &[uint, ulong, ullong],
            (false, 1, true) => &[long, llong],
            (false, 1, false) => &[long, ulong, llong, ullong],
            (true, 1, _) => &[ulong, ullong],
            (false, _, true) => &[llong],
            (false, _, false) => &[llong, ullong],
            (true, _, _) => &[ullong],
        };
        let value = i128::try_from(literal.value).ok()?;
        let typ = candidates.iter().find(|typ| typ.contains(value))?;
        Some(ConstInt::new(value, *typ))
    }

    /// Integer operand after integer promotion. Pointers are not integers.
    fn promoted(&self, value: Value) -> Option<ConstInt> {
        match value {
            Value::Int(int) => Some(int.convert(int.typ.promote(self.model.int()))),
            Value::Pointer(_) | Value::Address => None,
        }
    }

    fn unary(&self, op: UnaryOperator, value: Value) -> Option<Value> {
        if op == UnaryOperator::Not {
            return Some(self.int(!value.is_true()));
        }
        let operand = self.promoted(value)?;
        let typ = operand.typ;
        let result = match op {
            UnaryOperator::UnaryPlus => operand,
            UnaryOperator::UnaryMinus => ConstInt::checked(Some(-operand.value), typ)?,
            UnaryOperator::Bitnot => ConstInt::new(!operand.value, typ),
            _ => return None,
        };
        Some(Value::Int(result))
    }

    /// `&&` and `||`. The right operand decides the result when the left one is unknown but
    /// the right one alone determines it, e.g., `x && 0`.
    fn logical(&self, is_or: bool, lhs: &Expr, rhs: &Expr) -> Option<Value> {
        // The value that short-circuits the operator.
        let decisive = is_or;
        match (self.condition(lhs), self.condition(rhs)) {
            (Some(l), _) if l == decisive => Some(self.int(decisive)),
            (Some(_), Some(r)) => Some(self.int(r)),
            (None, Some(r)) if r == decisive => Some(self.int(decisive)),
            _ => None,
        }
    }

    fn conditional(&self, c: &Expr, t: &Expr, e: &Expr) -> Option<Value> {
        let (chosen, other) = if self.condition(c)? { (t, e) } else { (e, t) };
        let chosen = self.eval(chosen)?;
        // Both arms share the type given by the usual arithmetic conversions.
        match (self.promoted(chosen), self.eval(other).and_then(|other| self.promoted(other))) {
            (Some(value), Some(other)) => {
                Some(Value::Int(value.convert(value.typ.common(other.typ))))
            }
            _ => Some(chosen),
        }
    }

    fn binary(&self, op: BinaryOperator, lhs: Value, rhs: Value) -> Option<Value> {
        use BinaryOperator::*;
        match (lhs, rhs) {
            (Value::Int(_), Value::Int(_)) => {}
            // Pointers can only be compared.
            _ => return self.compare_addresses(op, lhs, rhs),
        }
        let (lhs, rhs) = (self.promoted(lhs)?, self.promoted(rhs)?);

        if matches!(op, Shl | Shr) {
            return self.shift(op, lhs, rhs).map(Value::Int);
        }

        let typ = lhs.typ.common(rhs.typ);
        let (a, b) = (lhs.convert(typ).value, rhs.convert(typ).value);
        let result = match op {
            Lt => return Some(self.int(a < b)),
            Gt => return Some(self.int(a > b)),
            Le => return Some(self.int(a <= b)),
            Ge => return Some(self.int(a >= b)),
            Equal => return Some(self.int(a == b)),
            Notequal => return Some(self.int(a != b)),
            Plus => ConstInt::checked(a.checked_add(b), typ)?,
            Minus => ConstInt::checked(a.checked_sub(b), typ)?,
            Mult if typ.signed => ConstInt::checked(a.checked_mul(b), typ)?,
            Mult => ConstInt::new((a as u128).wrapping_mul(b as u128) as i128, typ),
            Div | Mod if b == 0 => {
                trace!(?op, "division_by_zero");
                return None;
            }
            Div => ConstInt::checked(a.checked_div(b), typ)?,
            Mod => {
                // `INT_MIN % -1` is undefined as `INT_MIN / -1` overflows.
                ConstInt::checked(a.checked_div(b), typ)?;
                ConstInt::new(a % b, typ)
            }
            Bitand => ConstInt::new(a & b, typ),
            Bitor => ConstInt::new(a | b, typ),
            Bitxor => ConstInt::new(a ^ b, typ),
            Shl | Shr | And | Or => return None,
        };
        Some(Value::Int(result))
    }

    fn shift(&self, op: BinaryOperator, lhs: ConstInt, rhs: ConstInt) -> Option<ConstInt> {
        let typ = lhs.typ;
        if rhs.value < 0 || rhs.value >= typ.width as i128 {
            trace!(amount = rhs.value, width = typ.width, "shift_out_of_range");
            return None;
        }
        let amount = rhs.value as u32;
        if op == BinaryOperator::Shr {
            return Some(ConstInt::new(lhs.value >> amount, typ));
        }
        if typ.signed {
            if lhs.value < 0 {
                return None;
            }
            return ConstInt::checked(Some(lhs.value << amount), typ);
        }
        Some(ConstInt::new(lhs.value << amount, typ))
    }

    /// Comparisons where at least one side is a pointer.
    fn compare_addresses(&self, op: BinaryOperator, lhs: Value, rhs: Value) -> Option<Value> {
        // Only null pointer constants can be compared to addresses.
        let known = |value: Value| match value {
            Value::Int(int) if int.value == 0 => Some(Some(0)),
            Value::Int(_) => None,
            Value::Pointer(address) => Some(Some(address)),
            Value::Address => Some(None),
        };
        let (a, b) = (known(lhs)?, known(rhs)?);
        let equal = match (a, b) {
            (Some(a), Some(b)) => a == b,
            (Some(0), None) | (None, Some(0)) => false,
            _ => return None,
        };
        match op {
            BinaryOperator::Equal => Some(self.int(equal)),
            BinaryOperator::Notequal => Some(self.int(!equal)),
            _ => None,
        }
    }

    fn cast(&self, typ: &CType, value: Value) -> Option<Value> {
        match typ {
            CType::Bool => {
                let bool_type = self.model.int_type(typ)?;
                Some(Value::Int(ConstInt::new(value.is_true() as i128, bool_type)))
            }
            CType::Pointer => match value {
                Value::Int(int) => {
                    let address = IntType::unsigned(self.model.pointer_width).wrap(int.value);
                    Some(Value::Pointer(address))
                }
                other => Some(other),
            },
            _ => {
                let target = self.model.int_type(typ)?;
                match value {
                    Value::Int(int) => Some(Value::Int(int.convert(target))),
                    Value::Pointer(address) => Some(Value::Int(ConstInt::new(address, target))),
                    Value::Address => None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::machine_model::DataModel;
    use crate::parser::parse_expression;

    fn fold_with(model: &MachineModel, src: &str) -> Option<bool> {
        let expr = parse_expression(&tokenize("e.c", src).unwrap().tokens).unwrap();
        Evaluator::new(model).condition(&expr)
    }

    fn fold(src: &str) -> Option<bool> {
        fold_with(&MachineModel::default(), src)
    }

    fn value(src: &str) -> Option<i128> {
        let expr = parse_expression(&tokenize("e.c", src).unwrap().tokens).unwrap();
        match Evaluator::new(&MachineModel::default()).eval(&expr)? {
            Value::Int(int) => Some(int.value),
            _ => None,
        }
    }

    #[test]
    fn check_literals() {
        assert_eq!(fold("0"), Some(false));
        assert_eq!(fold("1"), Some(true));
        assert_eq!(fold("'\\0'"), Some(false));
        assert_eq!(fold("\"text\""), Some(true));
        assert_eq!(fold("x"), None);
        assert_eq!(fold("0.0"), None);
    }

    #[test]
    fn check_literal_types() {
        // 2147483648 does not fit `int`, so it is a `long` and stays positive.
        assert_eq!(fold("-2147483648 < 0"), Some(true));
        // 0x80000000 is an `unsigned int`.
        assert_eq!(fold("-0x80000000 > 0"), Some(true));
        // `long` can represent every `unsigned int`.
        assert_eq!(fold("4294967295u == -1l"), Some(false));
        assert_eq!(fold("18446744073709551615u == -1"), Some(true));
    }

    #[test]
    fn check_arithmetic() {
        assert_eq!(value("2 + 3 * 4"), Some(14));
        assert_eq!(value("7 / 2"), Some(3));
        assert_eq!(value("-7 / 2"), Some(-3));
        assert_eq!(value("-7 % 2"), Some(-1));
        assert_eq!(value("1 << 4 | 1"), Some(17));
        assert_eq!(value("-16 >> 2"), Some(-4));
        assert_eq!(value("~0"), Some(-1));
        assert_eq!(value("0x0f ^ 0xff"), Some(0xf0));
        assert_eq!(fold("10 - 10"), Some(false));
    }

    #[test]
    fn check_unsigned_wrap() {
        assert_eq!(value("0u - 1"), Some(u32::MAX as i128));
        assert_eq!(fold("0u - 1 > 0"), Some(true));
        assert_eq!(fold("-1 < 0u"), Some(false));
        assert_eq!(value("4294967295u + 1"), Some(0));
        assert_eq!(value("18446744073709551615ull * 2"), Some(u64::MAX as i128 - 1));
    }

    #[test]
    fn check_undefined_behavior_is_unknown() {
        assert_eq!(fold("2147483647 + 1"), None);
        assert_eq!(fold("1 / 0"), None);
        assert_eq!(fold("1 % 0"), None);
        assert_eq!(fold("(-2147483647 - 1) / -1"), None);
        assert_eq!(fold("(-2147483647 - 1) % -1"), None);
        assert_eq!(fold("1 << 32"), None);
        assert_eq!(fold("1 << -1"), None);
        assert_eq!(fold("-1 << 1"), None);
        assert_eq!(fold("1 << 31"), None);
        assert_eq!(value("1u << 31"), Some(1 << 31));
    }

    #[test]
    fn check_logical_operators() {
        assert_eq!(fold("1 && 0"), Some(false));
        assert_eq!(fold("0 || 2"), Some(true));
        assert_eq!(fold("0 && x"), Some(false));
        assert_eq!(fold("1 || x"), Some(true));
        assert_eq!(fold("x && 0"), Some(false));
        assert_eq!(fold("x || 1"), Some(true));
        assert_eq!(fold("x && 1"), None);
        assert_eq!(fold("!5"), Some(false));
        assert_eq!(fold("!!5"), Some(true));
        assert_eq!(value("3 && 4"), Some(1));
    }

    #[test]
    fn check_conditional() {
        assert_eq!(fold("1 ? 0 : x"), Some(false));
        assert_eq!(fold("0 ? x : 3"), Some(true));
        assert_eq!(fold("x ? 0 : 0"), None);
        // The arms are converted to `unsigned int`.
        assert_eq!(fold("(1 ? -1 : 0u) > 0"), Some(true));
    }

    #[test]
    fn check_casts_and_pointers() {
        assert_eq!(fold("(unsigned char)256"), Some(false));
        assert_eq!(fold("(_Bool)256"), Some(true));
        assert_eq!(fold("(signed char)255 < 0"), Some(true));
        assert_eq!(fold("(void *)0"), Some(false));
        assert_eq!(fold("(int *)16"), Some(true));
        assert_eq!(fold("(void *)0 == 0"), Some(true));
        assert_eq!(fold("(void *)0 != (char *)0"), Some(false));
        assert_eq!(fold("\"s\" == 0"), Some(false));
        assert_eq!(fold("&x != 0"), Some(true));
        assert_eq!(fold("&x == &y"), None);
        assert_eq!(fold("(void *)0 < (void *)1"), None);
        assert_eq!(fold("(_Ptr<int>)0"), Some(false));
        assert_eq!(fold("(long)(void *)0"), Some(false));
    }

    #[test]
    fn check_sizeof() {
        assert_eq!(value("sizeof(int)"), Some(4));
        assert_eq!(value("sizeof(char *)"), Some(8));
        assert_eq!(value("sizeof \"abc\""), Some(4));
        assert_eq!(fold("sizeof(x)"), None);
        assert_eq!(fold("sizeof(int) - 4"), Some(false));
        let ilp32 = MachineModel::new(DataModel::Ilp32);
        assert_eq!(fold_with(&ilp32, "sizeof(long) == 8"), Some(false));
        assert_eq!(fold_with(&MachineModel::default(), "sizeof(long) == 8"), Some(true));
    }

    #[test]
    fn check_sizeof_string_literals() {
        assert_eq!(value(r#"sizeof L"ab""#), Some(12));
        assert_eq!(value(r#"sizeof u"ab""#), Some(6));
        assert_eq!(value(r#"sizeof U"ab""#), Some(12));
        assert_eq!(value(r#"sizeof u8"ab""#), Some(3));
        assert_eq!(value(r#"sizeof "\xff""#), Some(2));
        assert_eq!(value(r#"sizeof "\377\n""#), Some(3));
        assert_eq!(value("sizeof \"\u{e9}\""), Some(3));
        assert_eq!(value(r#"sizeof "ab" "cd""#), Some(5));
        let llp64 = MachineModel::new(DataModel::Llp64);
        assert_eq!(fold_with(&llp64, r#"sizeof L"ab" == 6"#), Some(true));
    }

    #[test]
    fn check_sizeof_long_double() {
        assert_eq!(fold("sizeof(long double) == 16"), Some(true));
        let llp64 = MachineModel::new(DataModel::Llp64);
        assert_eq!(fold_with(&llp64, "sizeof(long double) == 8"), Some(true));
        let ilp32 = MachineModel::new(DataModel::Ilp32);
        assert_eq!(fold_with(&ilp32, "sizeof(long double) == 12"), Some(true));
    }

    #[test]
    fn check_deep_expression_is_unknown() {
        let model = MachineModel::default();
        let zero = Expr::Int(IntLiteral { value: 0, unsigned: false, longs: 0, decimal: true });
        let nested = |depth: usize| {
            (0..depth).fold(zero.clone(), |e, _| Expr::unary(UnaryOperator::UnaryPlus, e))
        };
        assert_eq!(Evaluator::new(&model).condition(&nested(10)), Some(false));
        assert_eq!(Evaluator::new(&model).condition(&nested(1000)), None);
        // The depth is restored after every evaluation.
        let evaluator = Evaluator::new(&model);
        for _ in 0..MAX_NESTING + 1 {
            assert_eq!(evaluator.condition(&nested(10)), Some(false));
        }
    }

    #[test]
    fn check_comma() {
        assert_eq!(fold("(f(), 0)"), Some(false));
        assert_eq!(fold("(0, x)"), None);
    }
}
