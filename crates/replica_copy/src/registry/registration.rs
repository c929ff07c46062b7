//! Startup-time registrations: copier factories and surrogate converters.

use std::fmt;
use std::sync::Arc;

use replica_types::Ty;

use crate::strategies::{Converter, FieldwiseCopier, SurrogateCopier, ValueSurrogateCopier};
use crate::{CopierRegistry, CopyError, DeepCopier};

/// Stable name of a strategy, used to look up pre-built singletons.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct StrategyId(&'static str);

impl StrategyId {
    pub const FIELDWISE: Self = Self("fieldwise");
    pub const SURROGATE: Self = Self("surrogate");
    pub const VALUE_SURROGATE: Self = Self("value-surrogate");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Everything a factory gets to build a strategy for one concrete type.
pub struct Activation<'a> {
    /// The concrete type being resolved. For subtype registrations this is
    /// the derived type, not the type the registration was made for.
    pub ty: Ty,
    /// Generic arguments of the matched instantiation; empty otherwise.
    pub generic_args: &'a [Ty],
    /// Registry for sub-copier lookups during construction.
    pub registry: &'a CopierRegistry,
    /// Converter found for the type, for surrogate strategies.
    pub converter: Option<Arc<dyn Converter>>,
}

type CopierFactory =
    dyn Fn(&Activation<'_>) -> Result<Arc<dyn DeepCopier>, CopyError> + Send + Sync;

type ConverterFactory =
    dyn Fn(Ty, &[Ty]) -> Result<Arc<dyn Converter>, CopyError> + Send + Sync;

/// A registered copier strategy for a type or an open generic definition.
#[derive(Clone)]
pub struct CopierRegistration {
    id: StrategyId,
    factory: Arc<CopierFactory>,
    applies_to_subtypes: bool,
}

impl CopierRegistration {
    pub fn new(
        id: StrategyId,
        factory: impl Fn(&Activation<'_>) -> Result<Arc<dyn DeepCopier>, CopyError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            id,
            factory: Arc::new(factory),
            applies_to_subtypes: false,
        }
    }

    /// Register a single pre-built copier instance.
    pub fn instance(id: StrategyId, copier: Arc<dyn DeepCopier>) -> Self {
        Self::new(id, move |_| Ok(Arc::clone(&copier)))
    }

    /// Field-by-field copying for the registered type.
    pub fn fieldwise() -> Self {
        Self::new(StrategyId::FIELDWISE, |activation| {
            let copier = FieldwiseCopier::new(activation.ty, activation.registry)?;
            Ok(Arc::new(copier))
        })
    }

    /// Surrogate round-trip for reference types; needs the converter.
    pub(crate) fn surrogate() -> Self {
        Self::new(StrategyId::SURROGATE, |activation| {
            let (converter, surrogate) = surrogate_parts(activation)?;
            let name = activation.registry.type_name(activation.ty);
            Ok(Arc::new(SurrogateCopier::new(name, converter, surrogate)))
        })
    }

    /// Surrogate round-trip for value types; needs the converter.
    pub(crate) fn value_surrogate() -> Self {
        Self::new(StrategyId::VALUE_SURROGATE, |activation| {
            let (converter, surrogate) = surrogate_parts(activation)?;
            Ok(Arc::new(ValueSurrogateCopier::new(converter, surrogate)))
        })
    }

    /// Also use this registration for every type deriving from the
    /// registered one, instantiated per derived type.
    #[must_use]
    pub fn applies_to_subtypes(mut self) -> Self {
        self.applies_to_subtypes = true;
        self
    }

    pub fn id(&self) -> StrategyId {
        self.id
    }

    pub fn is_for_subtypes(&self) -> bool {
        self.applies_to_subtypes
    }

    pub(crate) fn build(
        &self,
        activation: &Activation<'_>,
    ) -> Result<Arc<dyn DeepCopier>, CopyError> {
        (self.factory)(activation)
    }
}

fn surrogate_parts(
    activation: &Activation<'_>,
) -> Result<(Arc<dyn Converter>, Arc<dyn DeepCopier>), CopyError> {
    let converter = activation
        .converter
        .clone()
        .ok_or_else(|| CopyError::ConstructionFailed {
            ty: activation.registry.type_name(activation.ty),
            reason: "surrogate strategies need a converter".to_owned(),
        })?;
    let surrogate = activation.registry.require(converter.surrogate_type())?;
    Ok((converter, surrogate))
}

impl fmt::Debug for CopierRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopierRegistration")
            .field("id", &self.id)
            .field("applies_to_subtypes", &self.applies_to_subtypes)
            .finish_non_exhaustive()
    }
}

/// A registered surrogate converter for a type or an open generic
/// definition.
#[derive(Clone)]
pub struct ConverterRegistration {
    factory: Arc<ConverterFactory>,
}

impl ConverterRegistration {
    /// Factory receiving the concrete type and its generic arguments.
    pub fn new(
        factory: impl Fn(Ty, &[Ty]) -> Result<Arc<dyn Converter>, CopyError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Register a single converter instance.
    pub fn instance(converter: Arc<dyn Converter>) -> Self {
        Self::new(move |_, _| Ok(Arc::clone(&converter)))
    }

    pub(crate) fn create(
        &self,
        ty: Ty,
        generic_args: &[Ty],
    ) -> Result<Arc<dyn Converter>, CopyError> {
        (self.factory)(ty, generic_args)
    }
}

impl fmt::Debug for ConverterRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistration").finish_non_exhaustive()
    }
}
