use crate::analysis::platform::Platform;
use std::fmt;

/// The static type of an expression, as understood by the front end.
/// Integer widths are not fixed here: they depend on the target `Platform`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum BaseType {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    LongDouble,
    Record,
    Container,
    Iterator,
    Unknown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Sign {
    Signed,
    Unsigned,
    Unknown,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ValueType {
    pub base: BaseType,
    pub sign: Sign,
    /// Levels of pointer indirection, 0 for a plain value
    pub pointer: u8,
    pub is_const: bool,
}

/// Constructors
impl ValueType {
    pub fn new(base: BaseType, sign: Sign) -> Self {
        Self {
            base,
            sign,
            pointer: 0,
            is_const: false,
        }
    }

    pub fn bool() -> Self {
        Self::new(BaseType::Bool, Sign::Unknown)
    }

    pub fn char() -> Self {
        Self::new(BaseType::Char, Sign::Signed)
    }

    pub fn uchar() -> Self {
        Self::new(BaseType::Char, Sign::Unsigned)
    }

    pub fn short() -> Self {
        Self::new(BaseType::Short, Sign::Signed)
    }

    pub fn int() -> Self {
        Self::new(BaseType::Int, Sign::Signed)
    }

    pub fn uint() -> Self {
        Self::new(BaseType::Int, Sign::Unsigned)
    }

    pub fn long() -> Self {
        Self::new(BaseType::Long, Sign::Signed)
    }

    pub fn ulong() -> Self {
        Self::new(BaseType::Long, Sign::Unsigned)
    }

    pub fn long_long() -> Self {
        Self::new(BaseType::LongLong, Sign::Signed)
    }

    pub fn float() -> Self {
        Self::new(BaseType::Float, Sign::Unknown)
    }

    pub fn double() -> Self {
        Self::new(BaseType::Double, Sign::Unknown)
    }

    pub fn record() -> Self {
        Self::new(BaseType::Record, Sign::Unknown)
    }

    pub fn container() -> Self {
        Self::new(BaseType::Container, Sign::Unknown)
    }

    pub fn unknown() -> Self {
        Self::new(BaseType::Unknown, Sign::Unknown)
    }

    pub fn pointer_to(mut self) -> Self {
        self.pointer += 1;
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }
}

/// Queries
impl ValueType {
    /// Returns true if this is an integer type, bool and char included
    pub fn is_integral(&self) -> bool {
        use BaseType::*;
        self.pointer == 0 && matches!(self.base, Bool | Char | Short | Int | Long | LongLong)
    }

    pub fn is_float(&self) -> bool {
        use BaseType::*;
        self.pointer == 0 && matches!(self.base, Float | Double | LongDouble)
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer > 0
    }

    pub fn is_bool(&self) -> bool {
        self.pointer == 0 && self.base == BaseType::Bool
    }

    pub fn is_unsigned(&self) -> bool {
        self.sign == Sign::Unsigned
    }

    /// Returns true if this type is one of the signed integer types
    pub fn is_signed_integer(&self) -> bool {
        self.is_integral() && self.sign == Sign::Signed
    }

    /// Types compare equal when their base, sign and indirection match
    pub fn is_type_equal(&self, other: &ValueType) -> bool {
        self.base == other.base && self.sign == other.sign && self.pointer == other.pointer
    }

    /// Returns the number of bits used to represent the given type on `platform`.
    /// Non integral types and pointers have no width here.
    pub fn bit_length(&self, platform: &Platform) -> Option<u32> {
        use BaseType::*;
        if self.pointer > 0 {
            return None;
        }
        let bits = match self.base {
            Bool => 1,
            Char => platform.char_bit,
            Short => platform.short_bit,
            Int => platform.int_bit,
            Long => platform.long_bit,
            LongLong => platform.long_long_bit,
            _ => return None,
        };
        Some(u32::from(bits))
    }

    /// The `[min, max]` range of an integral type on `platform`.
    /// Types of 64 bits and more, and integers of unknown sign, return `None`.
    pub fn range(&self, platform: &Platform) -> Option<(i128, i128)> {
        let bits = self.bit_length(platform)?;
        if bits == 0 || bits >= 64 {
            return None;
        }
        let unsigned_max = (1i128 << bits) - 1;
        match (self.base, self.sign) {
            (BaseType::Bool, _) | (_, Sign::Unsigned) => Some((0, unsigned_max)),
            (_, Sign::Signed) => Some((-(1i128 << (bits - 1)), unsigned_max / 2)),
            (_, Sign::Unknown) => None,
        }
    }

    fn rank(&self) -> u8 {
        use BaseType::*;
        match self.base {
            Bool => 0,
            Char => 1,
            Short => 2,
            Int => 3,
            Long => 4,
            LongLong => 5,
            Float => 6,
            Double => 7,
            LongDouble => 8,
            _ => 0,
        }
    }

    /// Integer promotion: everything narrower than `int` becomes `int`
    pub fn promoted(&self) -> ValueType {
        if self.is_integral() && self.rank() < 3 {
            ValueType::int()
        } else {
            self.clone()
        }
    }

    /// The type of `lhs op rhs` for an arithmetic or bitwise operator, following the usual
    /// arithmetic conversions. Pointer arithmetic keeps the pointer type.
    pub fn arithmetic_result(lhs: &ValueType, rhs: &ValueType) -> ValueType {
        if lhs.is_pointer() {
            return lhs.clone();
        }
        if rhs.is_pointer() {
            return rhs.clone();
        }
        if !(lhs.is_integral() || lhs.is_float()) || !(rhs.is_integral() || rhs.is_float()) {
            return ValueType::unknown();
        }
        let (lhs, rhs) = (lhs.promoted(), rhs.promoted());
        let mut result = if lhs.rank() >= rhs.rank() {
            lhs.clone()
        } else {
            rhs.clone()
        };
        if result.is_integral() && lhs.rank() == rhs.rank() && (lhs.is_unsigned() || rhs.is_unsigned())
        {
            result.sign = Sign::Unsigned;
        }
        result.is_const = false;
        result
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BaseType::*;
        let base = match self.base {
            Void => "void",
            Bool => "bool",
            Char => "char",
            Short => "short",
            Int => "int",
            Long => "long",
            LongLong => "long long",
            Float => "float",
            Double => "double",
            LongDouble => "long double",
            Record => "record",
            Container => "container",
            Iterator => "iterator",
            Unknown => "unknown",
        };
        if self.is_const {
            write!(f, "const ")?;
        }
        if self.base != Bool && self.pointer == 0 || self.base != Bool && self.pointer > 0 {
            match (self.sign, self.base) {
                (Sign::Unsigned, _) => write!(f, "unsigned ")?,
                (Sign::Signed, Char) => write!(f, "signed ")?,
                _ => {}
            }
        }
        write!(f, "{}", base)?;
        for _ in 0..self.pointer {
            write!(f, " *")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_on_unix64() {
        let platform = Platform::unix64();
        assert_eq!(ValueType::uchar().range(&platform), Some((0, 255)));
        assert_eq!(ValueType::char().range(&platform), Some((-128, 127)));
        assert_eq!(
            ValueType::int().range(&platform),
            Some((i32::MIN as i128, i32::MAX as i128))
        );
        assert_eq!(ValueType::bool().range(&platform), Some((0, 1)));
        assert_eq!(ValueType::new(BaseType::Char, Sign::Unknown).range(&platform), None);
        // 64 bit types are out of reach
        assert_eq!(ValueType::long().range(&platform), None);
        assert_eq!(ValueType::int().pointer_to().range(&platform), None);
    }

    #[test]
    fn test_arithmetic_result() {
        let r = ValueType::arithmetic_result(&ValueType::uchar(), &ValueType::int());
        assert_eq!(r, ValueType::int());
        let r = ValueType::arithmetic_result(&ValueType::uint(), &ValueType::int());
        assert_eq!(r, ValueType::uint());
        let r = ValueType::arithmetic_result(&ValueType::int().pointer_to(), &ValueType::int());
        assert!(r.is_pointer());
        let r = ValueType::arithmetic_result(&ValueType::int(), &ValueType::double());
        assert!(r.is_float());
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueType::uchar().to_string(), "unsigned char");
        assert_eq!(ValueType::char().to_string(), "signed char");
        assert_eq!(ValueType::int().to_string(), "int");
        assert_eq!(ValueType::int().pointer_to().to_string(), "int *");
    }
}
