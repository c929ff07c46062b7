//! Shallow-copyable classifier.
//!
//! Decides, per type, whether a value can be handed to the copy unchanged:
//! either it has no identity and no mutable reference-typed parts, or it is
//! declared immutable. Results are memoized write-once per type and never
//! evicted, so the classifier can be shared by every thread using a registry.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashSet};

use replica_types::{Primitive, Ty, TypeKind, TypeTable};

/// Tuples with more components than this are never shallow-copyable.
const MAX_TUPLE_ARITY: usize = 8;

/// Memoized `Ty -> bool` classifier over a [`TypeTable`].
pub struct ShallowClassifier {
    table: Arc<TypeTable>,
    cache: DashMap<Ty, bool, FxBuildHasher>,
}

impl ShallowClassifier {
    pub fn new(table: Arc<TypeTable>) -> Self {
        Self {
            table,
            cache: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Whether values of `ty` may be returned as their own copy.
    ///
    /// Unknown types are not shallow-copyable.
    pub fn is_shallow_copyable(&self, ty: Ty) -> bool {
        let mut visiting = FxHashSet::default();
        self.classify(ty, &mut visiting)
    }

    /// Number of memoized classifications.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn classify(&self, ty: Ty, visiting: &mut FxHashSet<Ty>) -> bool {
        if let Some(cached) = self.cache.get(&ty) {
            return *cached;
        }

        // Re-entering a struct means the value type contains itself.
        if !visiting.insert(ty) {
            return false;
        }
        let result = self.classify_uncached(ty, visiting);
        visiting.remove(&ty);

        // First writer wins; a racing thread computed the same answer.
        *self.cache.entry(ty).or_insert(result)
    }

    fn classify_uncached(&self, ty: Ty, visiting: &mut FxHashSet<Ty>) -> bool {
        let Some(info) = self.table.get(ty) else {
            return false;
        };

        if ty == Ty::TYPE || (info.is_sealed() && info.is_immutable()) {
            return true;
        }

        match &info.kind {
            TypeKind::Primitive(Primitive::Void) => false,
            TypeKind::Primitive(_) | TypeKind::Enum => true,

            TypeKind::Tuple(elems) => {
                elems.len() <= MAX_TUPLE_ARITY
                    && elems.iter().all(|&elem| self.classify(elem, visiting))
            }

            TypeKind::Struct { fields } => fields
                .iter()
                .all(|field| field.ty.is_some_and(|f| self.classify(f, visiting))),

            TypeKind::Class { .. } => self.table.is_error_shaped(ty),

            TypeKind::Object
            | TypeKind::TypeHandle
            | TypeKind::Interface
            | TypeKind::Array { .. }
            | TypeKind::GenericDefinition { .. }
            | TypeKind::Pointer(_)
            | TypeKind::ByRef(_) => false,
        }
    }
}
