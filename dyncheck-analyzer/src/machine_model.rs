// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target information needed to give C constants their type.

use crate::types::{CType, IntType};
use strum_macros::{Display, EnumString, VariantNames};

/// The usual C data models. They only differ on the width of `long` and pointers.
#[derive(Debug, Clone, Copy, Default, Display, EnumString, VariantNames, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum DataModel {
    /// 32-bit targets.
    Ilp32,
    /// 64-bit Unix targets.
    #[default]
    Lp64,
    /// 64-bit Windows.
    Llp64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineModel {
    pub bool_width: u32,
    pub char_is_unsigned: bool,
    pub char_width: u32,
    pub short_int_width: u32,
    pub int_width: u32,
    pub long_int_width: u32,
    pub long_long_int_width: u32,
    pub pointer_width: u32,
    pub float_width: u32,
    pub double_width: u32,
    pub long_double_width: u32,
    /// Width of `wchar_t`, the element type of `L"..."` literals.
    pub wchar_width: u32,
}

impl MachineModel {
    pub fn new(data_model: DataModel) -> Self {
        // `long double` follows the x86 ABIs: 80-bit extended precision padded to 12 bytes on
        // i386 and to 16 bytes on x86_64, plain `double` with MSVC.
        let (long_int_width, pointer_width, long_double_width, wchar_width) = match data_model {
            DataModel::Ilp32 => (32, 32, 96, 32),
            DataModel::Lp64 => (64, 64, 128, 32),
            DataModel::Llp64 => (32, 64, 64, 16),
        };
        MachineModel {
            bool_width: 8,
            char_is_unsigned: false,
            char_width: 8,
            short_int_width: 16,
            int_width: 32,
            long_int_width,
            long_long_int_width: 64,
            pointer_width,
            float_width: 32,
            double_width: 64,
            long_double_width,
            wchar_width,
        }
    }

    pub fn int(&self) -> IntType {
        IntType::signed(self.int_width)
    }

    pub fn size_t(&self) -> IntType {
        IntType::unsigned(self.pointer_width)
    }

    /// The integer type used to represent values of `typ`, if it is an integer type.
    /// `_Bool` is an unsigned type of `bool_width` bits.
    pub fn int_type(&self, typ: &CType) -> Option<IntType> {
        let int = match typ {
            CType::Bool => IntType::unsigned(self.bool_width),
            CType::Char { signed } => {
                IntType { width: self.char_width, signed: signed.unwrap_or(!self.char_is_unsigned) }
            }
            CType::Short { signed } => IntType { width: self.short_int_width, signed: *signed },
            CType::Int { signed } => IntType { width: self.int_width, signed: *signed },
            CType::Long { signed } => IntType { width: self.long_int_width, signed: *signed },
            CType::LongLong { signed } => {
                IntType { width: self.long_long_int_width, signed: *signed }
            }
            CType::Fixed { width, signed } => IntType { width: *width, signed: *signed },
            CType::PointerSized { signed } => {
                IntType { width: self.pointer_width, signed: *signed }
            }
            CType::Void
            | CType::Float
            | CType::Double
            | CType::LongDouble
            | CType::Pointer
            | CType::Record(_) => return None,
        };
        Some(int)
    }

    /// Size in bytes of `typ`, or `None` for incomplete and unknown types.
    pub fn size_of(&self, typ: &CType) -> Option<u64> {
        let bits = match typ {
            CType::Float => self.float_width,
            CType::Double => self.double_width,
            CType::LongDouble => self.long_double_width,
            CType::Pointer => self.pointer_width,
            CType::Void | CType::Record(_) => return None,
            _ => self.int_type(typ)?.width,
        };
        Some(u64::from(bits / 8))
    }
}

impl Default for MachineModel {
    fn default() -> Self {
        MachineModel::new(DataModel::default())
    }
}
