//! Registry of the element encodings a safetensors header may name.

use std::fmt;
use std::str::FromStr;

use crate::error::ConvertError;

/// On-disk element encoding of a tensor.
///
/// Discriminants double as indices into [`DType::ALL`] and the statistics
/// tables, so the declaration order is part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    F64,
    F32,
    F16,
    BF16,
    I64,
    I32,
    I16,
    I8,
    U8,
    BOOL,
    /// Any name the registry does not recognise.
    Unknown,
}

struct DTypeInfo {
    dtype: DType,
    width: usize,
    name: &'static str,
}

const REGISTRY: [DTypeInfo; 10] = [
    DTypeInfo { dtype: DType::F64, width: 8, name: "F64" },
    DTypeInfo { dtype: DType::F32, width: 4, name: "F32" },
    DTypeInfo { dtype: DType::F16, width: 2, name: "F16" },
    DTypeInfo { dtype: DType::BF16, width: 2, name: "BF16" },
    DTypeInfo { dtype: DType::I64, width: 8, name: "I64" },
    DTypeInfo { dtype: DType::I32, width: 4, name: "I32" },
    DTypeInfo { dtype: DType::I16, width: 2, name: "I16" },
    DTypeInfo { dtype: DType::I8, width: 1, name: "I8" },
    DTypeInfo { dtype: DType::U8, width: 1, name: "U8" },
    DTypeInfo { dtype: DType::BOOL, width: 1, name: "BOOL" },
];

impl DType {
    /// Every known encoding in registry order (excludes [`DType::Unknown`]).
    pub const ALL: [DType; 10] = [
        DType::F64,
        DType::F32,
        DType::F16,
        DType::BF16,
        DType::I64,
        DType::I32,
        DType::I16,
        DType::I8,
        DType::U8,
        DType::BOOL,
    ];

    /// Number of known encodings.
    pub const COUNT: usize = Self::ALL.len();

    /// Resolve a header dtype name. Matching is exact and case-sensitive;
    /// anything else yields [`DType::Unknown`].
    pub fn resolve(name: &str) -> DType {
        REGISTRY.iter().find(|info| info.name == name).map_or(DType::Unknown, |info| info.dtype)
    }

    /// Size of one element in bytes. [`DType::Unknown`] has width 0.
    pub const fn byte_width(self) -> usize {
        match self.index() {
            Some(i) => REGISTRY[i].width,
            None => 0,
        }
    }

    /// Canonical header name, e.g. `"BF16"`.
    pub const fn name(self) -> &'static str {
        match self.index() {
            Some(i) => REGISTRY[i].name,
            None => "UNKNOWN",
        }
    }

    /// `F64`, `F32`, `F16` and `BF16`.
    pub const fn is_float_family(self) -> bool {
        matches!(self, DType::F64 | DType::F32 | DType::F16 | DType::BF16)
    }

    /// `I64`, `I32`, `I16`, `I8` and `U8`.
    pub const fn is_int_family(self) -> bool {
        matches!(self, DType::I64 | DType::I32 | DType::I16 | DType::I8 | DType::U8)
    }

    /// Already a 16-bit float; the engine leaves these untouched.
    pub const fn is_compact_float(self) -> bool {
        matches!(self, DType::F16 | DType::BF16)
    }

    /// Position in [`DType::ALL`], `None` for [`DType::Unknown`].
    pub const fn index(self) -> Option<usize> {
        match self {
            DType::Unknown => None,
            other => Some(other as usize),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = ConvertError;

    /// Strict counterpart of [`DType::resolve`]: unknown names are an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match DType::resolve(s) {
            DType::Unknown => Err(ConvertError::UnknownName(s.to_string())),
            dtype => Ok(dtype),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_matches_enum_order() {
        for (i, info) in REGISTRY.iter().enumerate() {
            assert_eq!(info.dtype as usize, i, "{} out of place", info.name);
            assert_eq!(DType::ALL[i], info.dtype);
        }
    }

    #[test]
    fn resolve_round_trips_names() {
        for dtype in DType::ALL {
            assert_eq!(DType::resolve(dtype.name()), dtype);
        }
    }

    #[test]
    fn resolve_is_case_sensitive() {
        assert_eq!(DType::resolve("f32"), DType::Unknown);
        assert_eq!(DType::resolve("Bf16"), DType::Unknown);
        assert_eq!(DType::resolve(""), DType::Unknown);
        assert_eq!(DType::resolve("U16"), DType::Unknown);
    }

    #[test]
    fn widths() {
        assert_eq!(DType::F64.byte_width(), 8);
        assert_eq!(DType::BF16.byte_width(), 2);
        assert_eq!(DType::U8.byte_width(), 1);
        assert_eq!(DType::BOOL.byte_width(), 1);
        assert_eq!(DType::Unknown.byte_width(), 0);
    }

    #[test]
    fn families_are_disjoint() {
        for dtype in DType::ALL {
            assert!(!(dtype.is_float_family() && dtype.is_int_family()), "{dtype}");
        }
        assert!(!DType::BOOL.is_float_family());
        assert!(!DType::BOOL.is_int_family());
        assert!(!DType::Unknown.is_int_family());
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert_eq!("I16".parse::<DType>().unwrap(), DType::I16);
        assert!("F8_E4M3".parse::<DType>().is_err());
    }
}
