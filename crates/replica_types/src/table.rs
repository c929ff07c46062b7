//! Runtime type table.
//!
//! The table is the explicit replacement for runtime reflection: every type
//! a copier can be asked about is registered here once, at startup, and the
//! table is immutable afterwards. Closed generic instantiations, arrays,
//! tuples, pointers and by-ref types are interned, so asking for the same
//! shape twice yields the same [`Ty`].
//!
//! # Hierarchy Index
//!
//! [`TypeTableBuilder::build`] precomputes, for every class, its ancestor
//! chain (immediate base first, ending at [`Ty::OBJECT`]) and whether the
//! class is error-shaped (derives from [`Ty::EXCEPTION`]). Resolution walks
//! these slices instead of chasing base types at copy time.

use rustc_hash::FxHashMap;

use crate::{Ty, TypeFlags, TypeTableError};

/// Built-in scalar kinds backing the well-known types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Primitive {
    Void,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
}

/// A declared field of a class or struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Declared type, or `None` if it could not be resolved at registration.
    pub ty: Option<Ty>,
}

/// Whether a generic definition instantiates to classes or structs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GenericShape {
    Class,
    Struct,
}

/// Structural kind of a registered type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// The universal type. Also instantiable as a bare object.
    Object,
    Primitive(Primitive),
    /// C-like enumeration.
    Enum,
    /// Type metadata.
    TypeHandle,
    /// Reference type with single inheritance.
    Class { base: Ty, fields: Vec<Field> },
    /// Value type.
    Struct { fields: Vec<Field> },
    Interface,
    /// Immutable tuple-like aggregate with value semantics.
    Tuple(Box<[Ty]>),
    /// Reference type; elements stored row-major with zero lower bounds.
    Array { elem: Ty, rank: u8 },
    /// Open (unconstructed) generic definition.
    GenericDefinition { arity: usize, shape: GenericShape },
    Pointer(Ty),
    ByRef(Ty),
}

/// Link from a closed generic instantiation back to its definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericInstance {
    pub definition: Ty,
    pub args: Box<[Ty]>,
}

/// Everything the table knows about one type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    pub flags: TypeFlags,
    pub generic: Option<GenericInstance>,
}

impl TypeInfo {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: TypeFlags::empty(),
            generic: None,
        }
    }

    fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Value types are copied by value; they never appear in an identity map.
    pub fn is_value_type(&self) -> bool {
        match &self.kind {
            TypeKind::Primitive(p) => !matches!(p, Primitive::Str),
            TypeKind::Enum | TypeKind::Struct { .. } | TypeKind::Tuple(_) => true,
            TypeKind::GenericDefinition { shape, .. } => *shape == GenericShape::Struct,
            _ => false,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeFlags::ABSTRACT)
    }

    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeFlags::SEALED)
    }

    pub fn is_immutable(&self) -> bool {
        self.flags.contains(TypeFlags::IMMUTABLE)
    }

    pub fn is_generic_definition(&self) -> bool {
        matches!(self.kind, TypeKind::GenericDefinition { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer(_))
    }

    pub fn is_by_ref(&self) -> bool {
        matches!(self.kind, TypeKind::ByRef(_))
    }

    /// Element type and rank, if this is an array.
    pub fn array(&self) -> Option<(Ty, u8)> {
        match self.kind {
            TypeKind::Array { elem, rank } => Some((elem, rank)),
            _ => None,
        }
    }

    /// Declared fields of a class or struct; empty for everything else.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Class { fields, .. } | TypeKind::Struct { fields } => fields.as_slice(),
            _ => &[],
        }
    }
}

/// Key for structurally interned types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum TypeKey {
    Tuple(Box<[Ty]>),
    Array(Ty, u8),
    Instance(Ty, Box<[Ty]>),
    Pointer(Ty),
    ByRef(Ty),
}

/// Immutable registry of runtime types plus the precomputed hierarchy index.
#[derive(Debug)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
    /// Ancestor chain per type, immediate base first. Empty for non-classes.
    ancestors: Vec<Box<[Ty]>>,
    error_shaped: Vec<bool>,
    interned: FxHashMap<TypeKey, Ty>,
}

impl TypeTable {
    /// Look up a type.
    #[inline]
    pub fn get(&self, ty: Ty) -> Option<&TypeInfo> {
        self.types.get(ty.index())
    }

    /// Registered name, or `"<unknown>"` for a foreign handle.
    pub fn name(&self, ty: Ty) -> &str {
        self.get(ty).map_or("<unknown>", |info| info.name.as_str())
    }

    /// Ancestor chain of a class, immediate base first, ending at `OBJECT`.
    pub fn ancestors(&self, ty: Ty) -> &[Ty] {
        self.ancestors
            .get(ty.index())
            .map(|chain| &**chain)
            .unwrap_or(&[])
    }

    /// Whether the type is, or derives from, [`Ty::EXCEPTION`].
    pub fn is_error_shaped(&self, ty: Ty) -> bool {
        self.error_shaped.get(ty.index()).copied().unwrap_or(false)
    }

    /// Whether `ty` is `target` or derives from it.
    pub fn is_subtype_of(&self, ty: Ty, target: Ty) -> bool {
        ty == target || self.ancestors(ty).contains(&target)
    }

    /// Open definition of a closed generic instantiation.
    pub fn generic_definition(&self, ty: Ty) -> Option<Ty> {
        self.get(ty)?.generic.as_ref().map(|g| g.definition)
    }

    /// Generic arguments of a closed instantiation; empty otherwise.
    pub fn generic_args(&self, ty: Ty) -> &[Ty] {
        self.get(ty)
            .and_then(|info| info.generic.as_ref())
            .map(|g| &*g.args)
            .unwrap_or(&[])
    }

    pub fn is_value_type(&self, ty: Ty) -> bool {
        self.get(ty).is_some_and(TypeInfo::is_value_type)
    }

    /// Find an already-registered array type.
    pub fn array_of(&self, elem: Ty, rank: u8) -> Option<Ty> {
        self.interned.get(&TypeKey::Array(elem, rank)).copied()
    }

    /// Find an already-registered closed instantiation.
    pub fn instance_of(&self, definition: Ty, args: &[Ty]) -> Option<Ty> {
        self.interned
            .get(&TypeKey::Instance(definition, args.into()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate all registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Ty, &TypeInfo)> {
        self.types.iter().enumerate().map(|(i, info)| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "table size is bounded by u32 at registration"
            )]
            let raw = i as u32;
            (Ty::from_raw(raw), info)
        })
    }
}

/// Handles returned by [`TypeTableBuilder::standard_types`].
#[derive(Clone, Copy, Debug)]
pub struct StandardTypes {
    pub decimal: Ty,
    pub date_time: Ty,
    pub date_time_offset: Ty,
    pub time_span: Ty,
    pub guid: Ty,
    pub version: Ty,
    pub uri: Ty,
    /// Open `Nullable<T>` definition; close it with
    /// [`TypeTableBuilder::nullable`].
    pub nullable: Ty,
}

/// Startup-time registration of types.
///
/// Shapes that are interned (tuples, arrays, instantiations, pointers,
/// by-ref) return the existing handle when registered twice. Nominal types
/// (classes, structs, interfaces, enums) are always fresh.
pub struct TypeTableBuilder {
    types: Vec<TypeInfo>,
    interned: FxHashMap<TypeKey, Ty>,
}

impl TypeTableBuilder {
    /// Create a builder with the well-known types pre-registered.
    pub fn new() -> Self {
        let immutable = TypeFlags::SEALED | TypeFlags::IMMUTABLE;
        let prim = |name: &str, p: Primitive| TypeInfo::new(name, TypeKind::Primitive(p));

        // Order must match the `Ty` constants.
        let types = vec![
            TypeInfo::new("object", TypeKind::Object),
            prim("void", Primitive::Void),
            prim("bool", Primitive::Bool),
            prim("char", Primitive::Char),
            prim("i8", Primitive::I8),
            prim("i16", Primitive::I16),
            prim("i32", Primitive::I32),
            prim("i64", Primitive::I64),
            prim("u8", Primitive::U8),
            prim("u16", Primitive::U16),
            prim("u32", Primitive::U32),
            prim("u64", Primitive::U64),
            prim("f32", Primitive::F32),
            prim("f64", Primitive::F64),
            prim("str", Primitive::Str).with_flags(immutable),
            TypeInfo::new("type", TypeKind::TypeHandle).with_flags(immutable),
            TypeInfo::new(
                "exception",
                TypeKind::Class {
                    base: Ty::OBJECT,
                    fields: Vec::new(),
                },
            ),
        ];
        debug_assert_eq!(types.len(), Ty::WELL_KNOWN_COUNT as usize);

        Self {
            types,
            interned: FxHashMap::default(),
        }
    }

    fn push(&mut self, info: TypeInfo) -> Ty {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "more than u32::MAX registered types is not a supported configuration"
        )]
        let ty = Ty::from_raw(self.types.len() as u32);
        self.types.push(info);
        ty
    }

    fn intern(&mut self, key: TypeKey, make: impl FnOnce(&Self) -> TypeInfo) -> Ty {
        if let Some(&ty) = self.interned.get(&key) {
            return ty;
        }
        let info = make(self);
        let ty = self.push(info);
        self.interned.insert(key, ty);
        ty
    }

    fn info(&self, ty: Ty) -> Result<&TypeInfo, TypeTableError> {
        self.types
            .get(ty.index())
            .ok_or(TypeTableError::UnknownType { ty })
    }

    fn info_mut(&mut self, ty: Ty) -> Result<&mut TypeInfo, TypeTableError> {
        self.types
            .get_mut(ty.index())
            .ok_or(TypeTableError::UnknownType { ty })
    }

    fn name_of(&self, ty: Ty) -> &str {
        self.types
            .get(ty.index())
            .map_or("<unknown>", |info| info.name.as_str())
    }

    /// Register a class deriving directly from `OBJECT`.
    pub fn class(&mut self, name: &str) -> Ty {
        self.push(TypeInfo::new(
            name,
            TypeKind::Class {
                base: Ty::OBJECT,
                fields: Vec::new(),
            },
        ))
    }

    /// Register a class deriving from `base`.
    pub fn derived(&mut self, name: &str, base: Ty) -> Result<Ty, TypeTableError> {
        let ty = self.class(name);
        self.set_base(ty, base)?;
        Ok(ty)
    }

    /// Register an error-shaped class deriving from `EXCEPTION`.
    pub fn exception(&mut self, name: &str) -> Ty {
        self.push(TypeInfo::new(
            name,
            TypeKind::Class {
                base: Ty::EXCEPTION,
                fields: Vec::new(),
            },
        ))
    }

    /// Register a value type.
    pub fn structure(&mut self, name: &str) -> Ty {
        self.push(TypeInfo::new(
            name,
            TypeKind::Struct { fields: Vec::new() },
        ))
    }

    pub fn interface(&mut self, name: &str) -> Ty {
        self.push(TypeInfo::new(name, TypeKind::Interface))
    }

    pub fn enumeration(&mut self, name: &str) -> Ty {
        self.push(TypeInfo::new(name, TypeKind::Enum))
    }

    /// Register an open generic class definition with `arity` parameters.
    pub fn generic_class(&mut self, name: &str, arity: usize) -> Ty {
        self.push(TypeInfo::new(
            name,
            TypeKind::GenericDefinition {
                arity,
                shape: GenericShape::Class,
            },
        ))
    }

    /// Register an open generic struct definition with `arity` parameters.
    pub fn generic_struct(&mut self, name: &str, arity: usize) -> Ty {
        self.push(TypeInfo::new(
            name,
            TypeKind::GenericDefinition {
                arity,
                shape: GenericShape::Struct,
            },
        ))
    }

    /// Close a generic definition over `args`.
    ///
    /// The instantiation starts with no fields and, for class shapes, a base
    /// of `OBJECT`; attach both with [`set_fields`](Self::set_fields) and
    /// [`set_base`](Self::set_base).
    pub fn instantiate(&mut self, definition: Ty, args: &[Ty]) -> Result<Ty, TypeTableError> {
        let def = self.info(definition)?;
        let TypeKind::GenericDefinition { arity, shape } = def.kind else {
            return Err(TypeTableError::NotGenericDefinition {
                name: def.name.clone(),
            });
        };
        if arity != args.len() {
            return Err(TypeTableError::GenericArity {
                name: def.name.clone(),
                expected: arity,
                found: args.len(),
            });
        }
        for &arg in args {
            self.info(arg)?;
        }

        let key = TypeKey::Instance(definition, args.into());
        Ok(self.intern(key, |b| {
            let rendered: Vec<&str> = args.iter().map(|&a| b.name_of(a)).collect();
            let name = format!("{}<{}>", b.name_of(definition), rendered.join(", "));
            let kind = match shape {
                GenericShape::Class => TypeKind::Class {
                    base: Ty::OBJECT,
                    fields: Vec::new(),
                },
                GenericShape::Struct => TypeKind::Struct { fields: Vec::new() },
            };
            let mut info = TypeInfo::new(name, kind);
            info.generic = Some(GenericInstance {
                definition,
                args: args.into(),
            });
            info
        }))
    }

    /// Register (or find) the array type `elem[rank]`.
    pub fn array(&mut self, elem: Ty, rank: u8) -> Result<Ty, TypeTableError> {
        self.info(elem)?;
        if rank == 0 {
            return Err(TypeTableError::ZeroRank {
                elem: self.name_of(elem).to_owned(),
            });
        }
        Ok(self.intern(TypeKey::Array(elem, rank), |b| {
            let commas = ",".repeat(usize::from(rank) - 1);
            TypeInfo::new(
                format!("{}[{commas}]", b.name_of(elem)),
                TypeKind::Array { elem, rank },
            )
        }))
    }

    /// Register (or find) the tuple of `elems`.
    pub fn tuple(&mut self, elems: &[Ty]) -> Result<Ty, TypeTableError> {
        for &elem in elems {
            self.info(elem)?;
        }
        Ok(self.intern(TypeKey::Tuple(elems.into()), |b| {
            let rendered: Vec<&str> = elems.iter().map(|&e| b.name_of(e)).collect();
            TypeInfo::new(
                format!("({})", rendered.join(", ")),
                TypeKind::Tuple(elems.into()),
            )
        }))
    }

    pub fn pointer(&mut self, pointee: Ty) -> Result<Ty, TypeTableError> {
        self.info(pointee)?;
        Ok(self.intern(TypeKey::Pointer(pointee), |b| {
            TypeInfo::new(format!("{}*", b.name_of(pointee)), TypeKind::Pointer(pointee))
        }))
    }

    pub fn by_ref(&mut self, referent: Ty) -> Result<Ty, TypeTableError> {
        self.info(referent)?;
        Ok(self.intern(TypeKey::ByRef(referent), |b| {
            TypeInfo::new(format!("{}&", b.name_of(referent)), TypeKind::ByRef(referent))
        }))
    }

    /// Replace the declared fields of a class or struct.
    pub fn set_fields<'a>(
        &mut self,
        ty: Ty,
        fields: impl IntoIterator<Item = (&'a str, Option<Ty>)>,
    ) -> Result<(), TypeTableError> {
        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(name, ty)| Field {
                name: name.to_owned(),
                ty,
            })
            .collect();
        for field in &fields {
            if let Some(field_ty) = field.ty {
                self.info(field_ty)?;
            }
        }

        let info = self.info_mut(ty)?;
        match &mut info.kind {
            TypeKind::Class { fields: slot, .. } | TypeKind::Struct { fields: slot } => {
                *slot = fields;
                Ok(())
            }
            _ => Err(TypeTableError::NotComposite {
                name: info.name.clone(),
                what: "fields",
            }),
        }
    }

    /// Set the base class of a class.
    pub fn set_base(&mut self, ty: Ty, base: Ty) -> Result<(), TypeTableError> {
        let base_info = self.info(base)?;
        let base_ok = matches!(base_info.kind, TypeKind::Object | TypeKind::Class { .. });
        if !base_ok {
            return Err(TypeTableError::InvalidBase {
                name: self.name_of(ty).to_owned(),
                base: base_info.name.clone(),
            });
        }

        let info = self.info_mut(ty)?;
        match &mut info.kind {
            TypeKind::Class { base: slot, .. } => {
                *slot = base;
                Ok(())
            }
            _ => Err(TypeTableError::NotComposite {
                name: info.name.clone(),
                what: "a base type",
            }),
        }
    }

    /// Add declared flags to a type.
    pub fn set_flags(&mut self, ty: Ty, flags: TypeFlags) -> Result<(), TypeTableError> {
        self.info_mut(ty)?.flags.insert(flags);
        Ok(())
    }

    /// Register the immutable library types most tables need.
    ///
    /// `Decimal`, `DateTime`, `DateTimeOffset`, `TimeSpan` and `Guid` are
    /// sealed immutable structs; `Version` and `Uri` are sealed immutable
    /// classes. All of them are copied by reference. Each call registers a
    /// fresh set, so call it once per builder.
    pub fn standard_types(&mut self) -> StandardTypes {
        let immutable = TypeFlags::SEALED | TypeFlags::IMMUTABLE;
        let structure = || TypeKind::Struct { fields: Vec::new() };
        let class = || TypeKind::Class {
            base: Ty::OBJECT,
            fields: Vec::new(),
        };
        let mut push = |name: &str, kind: TypeKind| {
            self.push(TypeInfo::new(name, kind).with_flags(immutable))
        };

        let decimal = push("Decimal", structure());
        let date_time = push("DateTime", structure());
        let date_time_offset = push("DateTimeOffset", structure());
        let time_span = push("TimeSpan", structure());
        let guid = push("Guid", structure());
        let version = push("Version", class());
        let uri = push("Uri", class());

        StandardTypes {
            decimal,
            date_time,
            date_time_offset,
            time_span,
            guid,
            version,
            uri,
            nullable: self.generic_struct("Nullable", 1),
        }
    }

    /// Register (or find) `Nullable<inner>`, a struct of a presence flag
    /// and the value. It is shallow-copyable exactly when `inner` is.
    pub fn nullable(&mut self, standard: &StandardTypes, inner: Ty) -> Result<Ty, TypeTableError> {
        if !self.info(inner)?.is_value_type() {
            return Err(TypeTableError::NotValueType {
                name: self.name_of(inner).to_owned(),
            });
        }
        let ty = self.instantiate(standard.nullable, &[inner])?;
        self.set_fields(ty, [("has_value", Some(Ty::BOOL)), ("value", Some(inner))])?;
        Ok(ty)
    }

    /// Validate and freeze the table, computing the hierarchy index.
    pub fn build(self) -> Result<TypeTable, TypeTableError> {
        let mut ancestors = Vec::with_capacity(self.types.len());
        let mut error_shaped = Vec::with_capacity(self.types.len());

        for (i, info) in self.types.iter().enumerate() {
            let mut chain = Vec::new();
            if let TypeKind::Class { base, .. } = info.kind {
                let mut current = base;
                loop {
                    if current.index() == i || chain.contains(&current) {
                        return Err(TypeTableError::InheritanceCycle {
                            name: info.name.clone(),
                        });
                    }
                    chain.push(current);
                    match self.info(current)?.kind {
                        TypeKind::Class { base, .. } => current = base,
                        _ => break,
                    }
                }
            }
            let is_exception = i == Ty::EXCEPTION.index() || chain.contains(&Ty::EXCEPTION);
            error_shaped.push(is_exception);
            ancestors.push(chain.into_boxed_slice());
        }

        Ok(TypeTable {
            types: self.types,
            ancestors,
            error_shaped,
            interned: self.interned,
        })
    }
}

impl Default for TypeTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
