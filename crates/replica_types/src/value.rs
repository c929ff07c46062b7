//! Runtime values.
//!
//! # Identity
//!
//! Objects and arrays are reference types: a [`Value`] holding one is a
//! handle (`Arc`) and two handles are "the same object" iff they point at
//! the same allocation. Structs and tuples are value types and have no
//! identity. Strings are shared immutably and never need a copy.
//!
//! Object fields and array elements sit behind a `RwLock` so that a copy can
//! be allocated first and populated afterwards, and so that cyclic graphs can
//! be built at all.
//!
//! # Thread Safety
//!
//! Every value is `Send + Sync`. Locks are only held for the duration of a
//! single field or element access; nothing in this module holds a guard
//! across a call into user code.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::{Ty, ValueError};

/// Shared handle to a heap object.
pub type ObjRef = Arc<Object>;

/// Shared handle to a heap array.
pub type ArrayRef = Arc<ArrayObject>;

/// Dynamically typed slot content.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    /// Signed integer tagged with its exact type (`I8`..`I64`).
    Int(Ty, i64),
    /// Unsigned integer tagged with its exact type (`U8`..`U64`).
    UInt(Ty, u64),
    /// Float tagged with its exact type (`F32`/`F64`).
    Float(Ty, f64),
    Str(Arc<str>),
    /// Enumeration value: enum type and discriminant.
    Enum(Ty, i64),
    /// Type metadata.
    Type(Ty),
    Object(ObjRef),
    Array(ArrayRef),
    Struct(StructValue),
    Tuple(TupleValue),
}

impl Value {
    #[inline]
    pub fn i32(v: i32) -> Self {
        Value::Int(Ty::I32, i64::from(v))
    }

    #[inline]
    pub fn i64(v: i64) -> Self {
        Value::Int(Ty::I64, v)
    }

    #[inline]
    pub fn u8(v: u8) -> Self {
        Value::UInt(Ty::U8, u64::from(v))
    }

    #[inline]
    pub fn f64(v: f64) -> Self {
        Value::Float(Ty::F64, v)
    }

    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Allocate a new object of type `ty` and wrap it.
    pub fn object(ty: Ty, fields: Vec<Value>) -> Self {
        Value::Object(Object::new(ty, fields))
    }

    /// Allocate a new rank-1 array of type `ty` and wrap it.
    pub fn vector(ty: Ty, elems: Vec<Value>) -> Self {
        Value::Array(ArrayObject::vector(ty, elems))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Concrete runtime type of the stored value; `None` for null.
    pub fn runtime_type(&self) -> Option<Ty> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => Ty::BOOL,
            Value::Char(_) => Ty::CHAR,
            Value::Str(_) => Ty::STR,
            Value::Type(_) => Ty::TYPE,
            Value::Int(ty, _) | Value::UInt(ty, _) | Value::Float(ty, _) | Value::Enum(ty, _) => {
                *ty
            }
            Value::Object(obj) => obj.ty,
            Value::Array(arr) => arr.ty,
            Value::Struct(s) => s.ty,
            Value::Tuple(t) => t.ty,
        })
    }

    /// Address of the referenced heap object, for reference types only.
    ///
    /// Two values with the same identity are the same object. The address is
    /// only meaningful while some handle keeps the allocation alive.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(obj) => Some(Arc::as_ptr(obj) as usize),
            Value::Array(arr) => Some(Arc::as_ptr(arr) as usize),
            _ => None,
        }
    }

    /// Reference identity. Value types, scalars and null never compare equal.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Short name of the value's shape, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int(..) => "int",
            Value::UInt(..) => "uint",
            Value::Float(..) => "float",
            Value::Str(_) => "str",
            Value::Enum(..) => "enum",
            Value::Type(_) => "type",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Tuple(_) => "tuple",
        }
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&TupleValue> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(_, v) => Some(*v),
            _ => None,
        }
    }

    /// Structural equality over possibly cyclic graphs.
    ///
    /// Two graphs are equal if they have the same shape, the same runtime
    /// types and equal scalars at every position. A pair of objects already
    /// under comparison is assumed equal, so cycles terminate. Reference
    /// identity is not compared: a graph and its deep copy are equal.
    pub fn structural_eq(&self, other: &Value) -> bool {
        let mut visiting = FxHashSet::default();
        structural_eq(self, other, &mut visiting)
    }
}

fn structural_eq(a: &Value, b: &Value, visiting: &mut FxHashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::Int(tx, x), Value::Int(ty, y)) | (Value::Enum(tx, x), Value::Enum(ty, y)) => {
            tx == ty && x == y
        }
        (Value::UInt(tx, x), Value::UInt(ty, y)) => tx == ty && x == y,
        (Value::Float(tx, x), Value::Float(ty, y)) => tx == ty && x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Type(x), Value::Type(y)) => x == y,
        (Value::Struct(x), Value::Struct(y)) => {
            x.ty == y.ty && slices_eq(&x.fields, &y.fields, visiting)
        }
        (Value::Tuple(x), Value::Tuple(y)) => {
            x.ty == y.ty && slices_eq(&x.items, &y.items, visiting)
        }
        (Value::Object(x), Value::Object(y)) => {
            if x.ty != y.ty {
                return false;
            }
            let key = (Arc::as_ptr(x) as usize, Arc::as_ptr(y) as usize);
            if !visiting.insert(key) {
                return true;
            }
            slices_eq(&x.fields(), &y.fields(), visiting)
        }
        (Value::Array(x), Value::Array(y)) => {
            if x.ty != y.ty || x.lengths != y.lengths {
                return false;
            }
            let key = (Arc::as_ptr(x) as usize, Arc::as_ptr(y) as usize);
            if !visiting.insert(key) {
                return true;
            }
            slices_eq(&x.to_vec(), &y.to_vec(), visiting)
        }
        _ => false,
    }
}

fn slices_eq(a: &[Value], b: &[Value], visiting: &mut FxHashSet<(usize, usize)>) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| structural_eq(x, y, visiting))
}

/// Heap object with reference identity.
pub struct Object {
    ty: Ty,
    fields: RwLock<Vec<Value>>,
}

impl Object {
    pub fn new(ty: Ty, fields: Vec<Value>) -> ObjRef {
        Arc::new(Self {
            ty,
            fields: RwLock::new(fields),
        })
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        self.ty
    }

    pub fn field_count(&self) -> usize {
        self.fields.read().len()
    }

    /// Clone of the field at `index`.
    pub fn field(&self, index: usize) -> Option<Value> {
        self.fields.read().get(index).cloned()
    }

    pub fn set_field(&self, index: usize, value: Value) -> Result<(), ValueError> {
        let mut fields = self.fields.write();
        let len = fields.len();
        let slot = fields
            .get_mut(index)
            .ok_or(ValueError::FieldOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Snapshot of all fields.
    pub fn fields(&self) -> Vec<Value> {
        self.fields.read().clone()
    }
}

// Fields are not printed: graphs may be cyclic.
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("ty", &self.ty)
            .field("fields", &self.field_count())
            .finish()
    }
}

/// Heap array with reference identity, row-major, zero lower bounds.
pub struct ArrayObject {
    ty: Ty,
    lengths: SmallVec<[usize; 2]>,
    elems: RwLock<Vec<Value>>,
}

impl ArrayObject {
    /// Array with the given per-dimension lengths and row-major elements.
    pub fn new(ty: Ty, lengths: &[usize], elems: Vec<Value>) -> Result<ArrayRef, ValueError> {
        let expected = lengths.iter().product::<usize>();
        if expected != elems.len() {
            return Err(ValueError::ShapeMismatch {
                lengths: lengths.to_vec(),
                expected,
                found: elems.len(),
            });
        }
        Ok(Arc::new(Self {
            ty,
            lengths: SmallVec::from_slice(lengths),
            elems: RwLock::new(elems),
        }))
    }

    /// Rank-1 array over `elems`.
    pub fn vector(ty: Ty, elems: Vec<Value>) -> ArrayRef {
        Arc::new(Self {
            ty,
            lengths: smallvec::smallvec![elems.len()],
            elems: RwLock::new(elems),
        })
    }

    /// Array of the given shape with every element null.
    pub fn with_lengths(ty: Ty, lengths: &[usize]) -> ArrayRef {
        let count = lengths.iter().product::<usize>();
        Arc::new(Self {
            ty,
            lengths: SmallVec::from_slice(lengths),
            elems: RwLock::new(vec![Value::Null; count]),
        })
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        self.ty
    }

    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Total element count across all dimensions.
    pub fn len(&self) -> usize {
        self.elems.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major offset of a multi-index, if in bounds.
    pub fn flat_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.lengths.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &len) in index.iter().zip(&self.lengths) {
            if i >= len {
                return None;
            }
            flat = flat * len + i;
        }
        Some(flat)
    }

    /// Element at a row-major offset.
    pub fn get(&self, flat: usize) -> Option<Value> {
        self.elems.read().get(flat).cloned()
    }

    pub fn set(&self, flat: usize, value: Value) -> Result<(), ValueError> {
        let mut elems = self.elems.write();
        let slot = elems
            .get_mut(flat)
            .ok_or_else(|| ValueError::IndexOutOfRange {
                index: vec![flat],
                lengths: self.lengths.to_vec(),
            })?;
        *slot = value;
        Ok(())
    }

    /// Element at a multi-index.
    pub fn get_at(&self, index: &[usize]) -> Option<Value> {
        self.get(self.flat_index(index)?)
    }

    pub fn set_at(&self, index: &[usize], value: Value) -> Result<(), ValueError> {
        let flat = self
            .flat_index(index)
            .ok_or_else(|| ValueError::IndexOutOfRange {
                index: index.to_vec(),
                lengths: self.lengths.to_vec(),
            })?;
        self.set(flat, value)
    }

    /// Snapshot of all elements in row-major order.
    pub fn to_vec(&self) -> Vec<Value> {
        self.elems.read().clone()
    }
}

impl fmt::Debug for ArrayObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayObject")
            .field("ty", &self.ty)
            .field("lengths", &self.lengths)
            .finish()
    }
}

/// Value-type instance; copied by value, no identity.
#[derive(Clone, Debug)]
pub struct StructValue {
    ty: Ty,
    fields: Vec<Value>,
}

impl StructValue {
    pub fn new(ty: Ty, fields: Vec<Value>) -> Self {
        Self { ty, fields }
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        self.ty
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }
}

/// Immutable tuple; items are shared between clones of the tuple.
#[derive(Clone, Debug)]
pub struct TupleValue {
    ty: Ty,
    items: Arc<[Value]>,
}

impl TupleValue {
    pub fn new(ty: Ty, items: Vec<Value>) -> Self {
        Self {
            ty,
            items: items.into(),
        }
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        self.ty
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }
}
