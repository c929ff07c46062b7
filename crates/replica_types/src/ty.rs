//! Type identity handle.
//!
//! `Ty` is the key used everywhere a runtime type is named: the copier
//! cache, the shallow-copyable cache, registrations and values.
//!
//! # Design
//!
//! - 32-bit index into an immutable [`TypeTable`](crate::TypeTable)
//! - Well-known types have fixed indices (0-16) so values can report their
//!   runtime type without consulting a table
//! - Type equality is O(1) index comparison; two `Ty` are equal iff they
//!   denote the same closed type

use std::fmt;

/// A 32-bit index into the type table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Ty(u32);

impl Ty {
    // === Well-known types (indices 0-16) ===
    // Pre-registered at table creation.

    /// The universal "any object" type.
    pub const OBJECT: Self = Self(0);
    /// The void type (no values).
    pub const VOID: Self = Self(1);
    /// The `bool` type.
    pub const BOOL: Self = Self(2);
    /// The `char` type.
    pub const CHAR: Self = Self(3);
    /// 8-bit signed integer.
    pub const I8: Self = Self(4);
    /// 16-bit signed integer.
    pub const I16: Self = Self(5);
    /// 32-bit signed integer.
    pub const I32: Self = Self(6);
    /// 64-bit signed integer.
    pub const I64: Self = Self(7);
    /// 8-bit unsigned integer.
    pub const U8: Self = Self(8);
    /// 16-bit unsigned integer.
    pub const U16: Self = Self(9);
    /// 32-bit unsigned integer.
    pub const U32: Self = Self(10);
    /// 64-bit unsigned integer.
    pub const U64: Self = Self(11);
    /// 32-bit float.
    pub const F32: Self = Self(12);
    /// 64-bit float.
    pub const F64: Self = Self(13);
    /// Immutable UTF-8 string.
    pub const STR: Self = Self(14);
    /// Type metadata (values are `Ty` handles).
    pub const TYPE: Self = Self(15);
    /// Root of the error-shaped class hierarchy.
    pub const EXCEPTION: Self = Self(16);

    /// Number of well-known types.
    pub const WELL_KNOWN_COUNT: u32 = 17;

    /// Create a handle from a raw index.
    ///
    /// The caller must ensure the index exists in the table it is used with.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Index into table storage.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is a well-known (pre-registered) type.
    #[inline]
    pub const fn is_well_known(self) -> bool {
        self.0 < Self::WELL_KNOWN_COUNT
    }

    /// Human-readable name for well-known types.
    ///
    /// Returns `None` for dynamically registered types, which need a
    /// table to render their names.
    #[inline]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("object"),
            1 => Some("void"),
            2 => Some("bool"),
            3 => Some("char"),
            4 => Some("i8"),
            5 => Some("i16"),
            6 => Some("i32"),
            7 => Some("i64"),
            8 => Some("u8"),
            9 => Some("u16"),
            10 => Some("u32"),
            11 => Some("u64"),
            12 => Some("f32"),
            13 => Some("f64"),
            14 => Some("str"),
            15 => Some("type"),
            16 => Some("exception"),
            _ => None,
        }
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Ty::{}", name.to_uppercase()),
            None => write!(f, "Ty({})", self.0),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "type#{}", self.0),
        }
    }
}

// Compile-time size assertion: Ty must be exactly 4 bytes
const _: () = assert!(std::mem::size_of::<Ty>() == 4);
