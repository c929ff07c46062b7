use std::marker::PhantomData;
use std::sync::Arc;

use replica_types::{ArrayRef, ObjRef, StructValue, Ty, TupleValue, Value};

use crate::{CopyContext, CopyError, DeepCopier};

/// A Rust type that can travel through the untyped copier as a [`Value`].
pub trait CopyValue: Sized + Send + Sync + 'static {
    /// Runtime type of this value; `None` for null.
    fn runtime_type(&self) -> Option<Ty>;

    fn into_value(self) -> Value;

    /// Convert back, returning the value unchanged if it has the wrong shape.
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl CopyValue for Value {
    fn runtime_type(&self) -> Option<Ty> {
        Value::runtime_type(self)
    }

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

macro_rules! copy_value_scalar {
    ($($rust:ty => $variant:ident($ty:expr, $wide:ty)),* $(,)?) => {$(
        impl CopyValue for $rust {
            fn runtime_type(&self) -> Option<Ty> {
                Some($ty)
            }

            fn into_value(self) -> Value {
                Value::$variant($ty, <$wide>::from(self))
            }

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$variant(ty, v) if ty == $ty => <$rust>::try_from(v).map_err(|_| value),
                    other => Err(other),
                }
            }
        }
    )*};
}

copy_value_scalar! {
    i8 => Int(Ty::I8, i64),
    i16 => Int(Ty::I16, i64),
    i32 => Int(Ty::I32, i64),
    i64 => Int(Ty::I64, i64),
    u8 => UInt(Ty::U8, u64),
    u16 => UInt(Ty::U16, u64),
    u32 => UInt(Ty::U32, u64),
    u64 => UInt(Ty::U64, u64),
}

impl CopyValue for f64 {
    fn runtime_type(&self) -> Option<Ty> {
        Some(Ty::F64)
    }

    fn into_value(self) -> Value {
        Value::Float(Ty::F64, self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(Ty::F64, v) => Ok(v),
            other => Err(other),
        }
    }
}

impl CopyValue for bool {
    fn runtime_type(&self) -> Option<Ty> {
        Some(Ty::BOOL)
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl CopyValue for char {
    fn runtime_type(&self) -> Option<Ty> {
        Some(Ty::CHAR)
    }

    fn into_value(self) -> Value {
        Value::Char(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(other),
        }
    }
}

impl CopyValue for Arc<str> {
    fn runtime_type(&self) -> Option<Ty> {
        Some(Ty::STR)
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl CopyValue for ObjRef {
    fn runtime_type(&self) -> Option<Ty> {
        Some(self.ty())
    }

    fn into_value(self) -> Value {
        Value::Object(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => Err(other),
        }
    }
}

impl CopyValue for ArrayRef {
    fn runtime_type(&self) -> Option<Ty> {
        Some(self.ty())
    }

    fn into_value(self) -> Value {
        Value::Array(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Array(arr) => Ok(arr),
            other => Err(other),
        }
    }
}

impl CopyValue for StructValue {
    fn runtime_type(&self) -> Option<Ty> {
        Some(self.ty())
    }

    fn into_value(self) -> Value {
        Value::Struct(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Struct(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl CopyValue for TupleValue {
    fn runtime_type(&self) -> Option<Ty> {
        Some(self.ty())
    }

    fn into_value(self) -> Value {
        Value::Tuple(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Tuple(t) => Ok(t),
            other => Err(other),
        }
    }
}

/// Typed view of an untyped copier.
///
/// A pure bridge: it converts at the boundary and otherwise forwards. When
/// the underlying strategy is shallow the input is returned without going
/// through [`Value`] at all.
pub struct TypedCopier<T> {
    ty_name: Arc<str>,
    inner: Arc<dyn DeepCopier>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T: CopyValue> TypedCopier<T> {
    pub fn new(ty_name: &str, inner: Arc<dyn DeepCopier>) -> Self {
        Self {
            ty_name: Arc::from(ty_name),
            inner,
            _marker: PhantomData,
        }
    }

    pub fn deep_copy(&self, input: T, ctx: &mut CopyContext) -> Result<T, CopyError> {
        if self.inner.is_shallow() {
            return Ok(input);
        }
        let copy = self.inner.deep_copy(&input.into_value(), ctx)?;
        T::from_value(copy).map_err(|found| CopyError::TypeMismatch {
            expected: self.ty_name.to_string(),
            found: found.kind_name().to_owned(),
        })
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.is_shallow()
    }

    /// The untyped strategy behind this adapter.
    pub fn untyped(&self) -> &Arc<dyn DeepCopier> {
        &self.inner
    }
}

impl<T> Clone for TypedCopier<T> {
    fn clone(&self) -> Self {
        Self {
            ty_name: Arc::clone(&self.ty_name),
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}
