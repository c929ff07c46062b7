use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use replica_types::{ArrayObject, ArrayRef, Ty, TypeTable, Value, ValueError};

use super::{mismatch, ObjectCopier};
use crate::{CopyContext, CopyError, DeepCopier, GeneralizedCopier};

type Index = SmallVec<[usize; 4]>;

/// Shared copier for arrays of rank 2 and above.
///
/// Matched by predicate rather than registered per type. Elements are
/// copied through [`ObjectCopier::copy_any`], so one instance serves every
/// element type.
#[derive(Copy, Clone, Debug, Default)]
pub struct MultiDimensionalArrayCopier;

impl MultiDimensionalArrayCopier {
    fn copy_rank2(
        source: &ArrayRef,
        dest: &ArrayRef,
        ctx: &mut CopyContext,
    ) -> Result<(), CopyError> {
        let (rows, cols) = (source.lengths()[0], source.lengths()[1]);
        for i in 0..rows {
            for j in 0..cols {
                Self::copy_element(source, dest, &[i, j], ctx)?;
            }
        }
        Ok(())
    }

    /// Walk every element by decomposing its row-major offset into a
    /// mixed-radix multi-index.
    fn copy_ranked(
        source: &ArrayRef,
        dest: &ArrayRef,
        ctx: &mut CopyContext,
    ) -> Result<(), CopyError> {
        let lengths = source.lengths();
        let rank = lengths.len();

        let mut strides: Index = smallvec![1; rank];
        for d in (0..rank.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * lengths[d + 1];
        }

        let mut index: Index = smallvec![0; rank];
        for flat in 0..source.len() {
            for ((slot, &stride), &len) in index.iter_mut().zip(&strides).zip(lengths) {
                *slot = (flat / stride) % len;
            }
            Self::copy_element(source, dest, &index, ctx)?;
        }
        Ok(())
    }

    fn copy_element(
        source: &ArrayRef,
        dest: &ArrayRef,
        index: &[usize],
        ctx: &mut CopyContext,
    ) -> Result<(), CopyError> {
        let elem = source
            .get_at(index)
            .ok_or_else(|| ValueError::IndexOutOfRange {
                index: index.to_vec(),
                lengths: source.lengths().to_vec(),
            })?;
        let copied = ObjectCopier::copy_any(&elem, ctx)?;
        dest.set_at(index, copied)?;
        Ok(())
    }
}

impl DeepCopier for MultiDimensionalArrayCopier {
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        if let Some(copy) = ctx.try_get_copy(input) {
            return Ok(copy);
        }
        let Value::Array(source) = input else {
            return Err(mismatch("multi-dimensional array", input));
        };

        let registry = ctx.registry();
        let elem_ty = registry
            .table()
            .get(source.ty())
            .and_then(|info| info.array())
            .map(|(elem, _)| elem)
            .ok_or_else(|| mismatch(&registry.type_name(source.ty()), input))?;

        if registry.is_shallow_copyable(elem_ty) {
            let copy = ArrayObject::new(source.ty(), source.lengths(), source.to_vec())?;
            let copy = Value::Array(copy);
            ctx.record_copy(input, copy.clone());
            return Ok(copy);
        }

        let dest = ArrayObject::with_lengths(source.ty(), source.lengths());
        ctx.record_copy(input, Value::Array(Arc::clone(&dest)));
        if source.rank() == 2 {
            Self::copy_rank2(source, &dest, ctx)?;
        } else {
            Self::copy_ranked(source, &dest, ctx)?;
        }
        Ok(Value::Array(dest))
    }

    fn strategy_name(&self) -> &'static str {
        "multi-dimensional array"
    }
}

impl GeneralizedCopier for MultiDimensionalArrayCopier {
    fn is_supported_type(&self, ty: Ty, table: &TypeTable) -> bool {
        table
            .get(ty)
            .and_then(|info| info.array())
            .is_some_and(|(_, rank)| rank != 1)
    }

    fn into_copier(self: Arc<Self>) -> Arc<dyn DeepCopier> {
        self
    }
}
