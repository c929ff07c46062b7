use std::sync::Arc;

use replica_types::{Object, StructValue, Ty, TupleValue, TypeKind, TypeTable, Value};

use super::mismatch;
use crate::{BaseCopier, CopierRegistry, CopyContext, CopyError, DeepCopier, SpecializableCopier};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Shape {
    Class,
    Struct,
    Tuple,
}

/// Copies a class, struct or tuple one field at a time.
///
/// Field copiers are resolved from the declared field types when the copier
/// is built. A field whose declared type is unknown gets the void copier.
/// A class's declared fields are its full instance layout.
pub struct FieldwiseCopier {
    ty: Ty,
    ty_name: String,
    shape: Shape,
    fields: Vec<Arc<dyn DeepCopier>>,
}

impl FieldwiseCopier {
    pub fn new(ty: Ty, registry: &CopierRegistry) -> Result<Self, CopyError> {
        let info = registry
            .table()
            .get(ty)
            .ok_or(CopyError::UnknownType { ty })?;

        let (shape, field_tys): (Shape, Vec<Option<Ty>>) = match &info.kind {
            TypeKind::Class { fields, .. } => {
                (Shape::Class, fields.iter().map(|f| f.ty).collect())
            }
            TypeKind::Struct { fields } => (Shape::Struct, fields.iter().map(|f| f.ty).collect()),
            TypeKind::Tuple(elems) => (Shape::Tuple, elems.iter().copied().map(Some).collect()),
            _ => {
                return Err(CopyError::ConstructionFailed {
                    ty: info.name.clone(),
                    reason: "field-wise copying needs a class, struct or tuple".to_owned(),
                })
            }
        };

        let fields = field_tys
            .into_iter()
            .map(|field| registry.resolve_field(field))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ty,
            ty_name: info.name.clone(),
            shape,
            fields,
        })
    }

    pub fn ty(&self) -> Ty {
        self.ty
    }

    fn copy_fields(
        &self,
        source: &[Value],
        ctx: &mut CopyContext,
        mut store: impl FnMut(usize, Value) -> Result<(), CopyError>,
    ) -> Result<(), CopyError> {
        if source.len() != self.fields.len() {
            return Err(CopyError::TypeMismatch {
                expected: format!("{} with {} fields", self.ty_name, self.fields.len()),
                found: format!("{} fields", source.len()),
            });
        }
        for (i, (value, copier)) in source.iter().zip(&self.fields).enumerate() {
            store(i, copier.deep_copy(value, ctx)?)?;
        }
        Ok(())
    }

    fn copy_object(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        if let Some(copy) = ctx.try_get_copy(input) {
            return Ok(copy);
        }
        let Value::Object(source) = input else {
            return Err(mismatch(&self.ty_name, input));
        };
        // A derived instance in a slot declared as this type.
        if source.ty() != self.ty {
            return ctx.deep_copy(input);
        }

        let values = source.fields();
        let dest = Object::new(self.ty, vec![Value::Null; values.len()]);
        ctx.record_copy(input, Value::Object(Arc::clone(&dest)));
        self.copy_fields(&values, ctx, |i, v| {
            dest.set_field(i, v).map_err(CopyError::from)
        })?;
        Ok(Value::Object(dest))
    }

    fn copy_struct(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        let Value::Struct(source) = input else {
            return Err(mismatch(&self.ty_name, input));
        };
        if source.ty() != self.ty {
            return Err(mismatch(&self.ty_name, input));
        }
        let mut copied = Vec::with_capacity(self.fields.len());
        self.copy_fields(source.fields(), ctx, |_, v| {
            copied.push(v);
            Ok(())
        })?;
        Ok(Value::Struct(StructValue::new(self.ty, copied)))
    }

    fn copy_tuple(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        let Value::Tuple(source) = input else {
            return Err(mismatch(&self.ty_name, input));
        };
        if source.ty() != self.ty {
            return Err(mismatch(&self.ty_name, input));
        }
        let mut copied = Vec::with_capacity(self.fields.len());
        self.copy_fields(source.items(), ctx, |_, v| {
            copied.push(v);
            Ok(())
        })?;
        Ok(Value::Tuple(TupleValue::new(self.ty, copied)))
    }
}

impl DeepCopier for FieldwiseCopier {
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        if input.is_null() {
            return Ok(Value::Null);
        }
        match self.shape {
            Shape::Class => self.copy_object(input, ctx),
            Shape::Struct => self.copy_struct(input, ctx),
            Shape::Tuple => self.copy_tuple(input, ctx),
        }
    }

    fn into_base(self: Arc<Self>) -> Option<Arc<dyn BaseCopier>> {
        match self.shape {
            Shape::Class => Some(self),
            Shape::Struct | Shape::Tuple => None,
        }
    }

    fn strategy_name(&self) -> &'static str {
        "fieldwise"
    }
}

impl BaseCopier for FieldwiseCopier {
    /// Copy the fields of `input` into the existing object `output`.
    fn populate(
        &self,
        input: &Value,
        output: &Value,
        ctx: &mut CopyContext,
    ) -> Result<(), CopyError> {
        let (Value::Object(source), Value::Object(dest)) = (input, output) else {
            return Err(mismatch(&self.ty_name, input));
        };
        ctx.record_copy(input, output.clone());
        self.copy_fields(&source.fields(), ctx, |i, v| {
            dest.set_field(i, v).map_err(CopyError::from)
        })
    }
}

/// Builds a [`FieldwiseCopier`] for any concrete class, struct or tuple.
///
/// Registered as a specializable plugin, this makes every composite type in
/// the table copyable without an explicit registration.
#[derive(Copy, Clone, Debug, Default)]
pub struct FieldwisePlugin;

impl SpecializableCopier for FieldwisePlugin {
    fn is_supported_type(&self, ty: Ty, table: &TypeTable) -> bool {
        table.get(ty).is_some_and(|info| match info.kind {
            TypeKind::Class { .. } => !info.is_abstract(),
            TypeKind::Struct { .. } | TypeKind::Tuple(_) => true,
            _ => false,
        })
    }

    fn specialize(
        &self,
        ty: Ty,
        registry: &CopierRegistry,
    ) -> Result<Arc<dyn DeepCopier>, CopyError> {
        Ok(Arc::new(FieldwiseCopier::new(ty, registry)?))
    }
}
