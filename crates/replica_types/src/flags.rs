//! Declared type metadata flags.
//!
//! These are facts supplied when a type is registered (the equivalent of
//! declaration attributes). They are consumed verbatim; nothing in the
//! copier computes them.

use bitflags::bitflags;

bitflags! {
    /// Declared properties of a registered type.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TypeFlags: u8 {
        /// No type may derive from this one.
        const SEALED = 1 << 0;
        /// Cannot be instantiated directly.
        const ABSTRACT = 1 << 1;
        /// Instances never change after construction.
        const IMMUTABLE = 1 << 2;
    }
}
