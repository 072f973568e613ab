// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// The C types that can be named in casts and `sizeof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    Void,
    Bool,
    /// Plain `char` has no signedness of its own.
    Char { signed: Option<bool> },
    Short { signed: bool },
    Int { signed: bool },
    Long { signed: bool },
    LongLong { signed: bool },
    /// `intN_t` / `uintN_t`.
    Fixed { width: u32, signed: bool },
    /// `size_t`, `ptrdiff_t`, `intptr_t` and `uintptr_t`.
    PointerSized { signed: bool },
    Float,
    Double,
    LongDouble,
    /// Any pointer, including the checked pointer types `_Ptr<T>`, `_Array_ptr<T>` and
    /// `_Nt_array_ptr<T>`.
    Pointer,
    /// `struct`, `union` and `enum` types, by name.
    Record(String),
}

/// A two's complement integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntType {
    pub width: u32,
    pub signed: bool,
}

impl IntType {
    pub fn signed(width: u32) -> Self {
        IntType { width, signed: true }
    }

    pub fn unsigned(width: u32) -> Self {
        IntType { width, signed: false }
    }

    pub fn min(&self) -> i128 {
        if self.signed { -(1i128 << (self.width - 1)) } else { 0 }
    }

    pub fn max(&self) -> i128 {
        if self.signed { (1i128 << (self.width - 1)) - 1 } else { (1i128 << self.width) - 1 }
    }

    pub fn contains(&self, value: i128) -> bool {
        self.min() <= value && value <= self.max()
    }

    /// Reduce `value` modulo 2^width into the range of this type.
    pub fn wrap(&self, value: i128) -> i128 {
        let mask = (1i128 << self.width) - 1;
        let low = value & mask;
        if self.signed && low > self.max() { low - (1i128 << self.width) } else { low }
    }

    /// Integer promotion: anything narrower than `int` becomes `int`.
    pub fn promote(self, int: IntType) -> IntType {
        if self.width < int.width { int } else { self }
    }

    /// The usual arithmetic conversions, applied to already promoted operands.
    pub fn common(self, other: IntType) -> IntType {
        if self == other {
            return self;
        }
        if self.signed == other.signed {
            return if self.width >= other.width { self } else { other };
        }
        let (unsigned, signed) = if self.signed { (other, self) } else { (self, other) };
        if unsigned.width >= signed.width { unsigned } else { signed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_ranges() {
        assert_eq!(IntType::signed(8).min(), -128);
        assert_eq!(IntType::signed(32).max(), i32::MAX as i128);
        assert_eq!(IntType::unsigned(64).max(), u64::MAX as i128);
        assert!(IntType::unsigned(16).contains(65535));
        assert!(!IntType::unsigned(16).contains(-1));
    }

    #[test]
    fn check_wrap() {
        assert_eq!(IntType::unsigned(32).wrap(-1), u32::MAX as i128);
        assert_eq!(IntType::signed(8).wrap(255), -1);
        assert_eq!(IntType::signed(8).wrap(128), -128);
        assert_eq!(IntType::unsigned(64).wrap(1i128 << 64), 0);
        assert_eq!(IntType::signed(64).wrap(u64::MAX as i128), -1);
    }

    #[test]
    fn check_conversions() {
        let int = IntType::signed(32);
        let uint = IntType::unsigned(32);
        let long = IntType::signed(64);
        let ulong = IntType::unsigned(64);
        assert_eq!(IntType::unsigned(8).promote(int), int);
        assert_eq!(uint.promote(int), uint);
        assert_eq!(int.common(uint), uint);
        assert_eq!(uint.common(long), long);
        assert_eq!(long.common(ulong), ulong);
        assert_eq!(int.common(long), long);
    }
}
