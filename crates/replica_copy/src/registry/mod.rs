//! Copier registry: resolves and caches one strategy per type.
//!
//! # Resolution Order
//!
//! The first rule that matches wins:
//!
//! 1. `OBJECT` gets the universal object copier (`VOID` gets the void copier)
//! 2. A registration for the exact type, or for its generic definition
//! 3. Shallow-copyable types get the shared shallow copier
//! 4. Rank-1 arrays get an [`ArrayCopier`]; higher ranks get the shared
//!    [`MultiDimensionalArrayCopier`]
//! 5. A registered converter builds a surrogate copier
//! 6. An ancestor registration marked "applies to subtypes"
//! 7. Specializable plugins, in order
//! 8. Generalized plugins, in order
//! 9. Interfaces and abstract classes get the universal object copier
//! 10. Otherwise, not found (never cached)
//!
//! Open generic definitions, pointers and by-ref types are rejected before
//! any of this runs.
//!
//! # Concurrency
//!
//! The cache is a `DashMap`. A type under construction is represented by a
//! [`PendingSlot`](crate::guard::PendingSlot) placeholder; see
//! [`guard`](crate::guard). No shard lock is held while a copier is built.
//!
//! A copier built during an enclosing construction that it depends on is
//! published only once that enclosing construction succeeds. If it fails,
//! the dependent copier is discarded along with it, so a published entry
//! never forwards to a failed construction.

mod construction;
mod registration;
mod services;

use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::{debug, trace};

use replica_types::{Ty, TypeInfo, TypeTable};

use crate::classify::ShallowClassifier;
use crate::guard::{CacheEntry, DeferredCopier, PendingSlot, Settled};
use crate::strategies::{
    ArrayCopier, Converter, CopyValue, MultiDimensionalArrayCopier, ObjectCopier,
    ShallowCopier, TypedCopier, VoidCopier,
};
use crate::{
    BaseCopier, CopyConfig, CopyError, DeepCopier, GeneralizedCopier, SpecializableCopier,
};

use construction::{Constructions, Parked};

pub use registration::{Activation, ConverterRegistration, CopierRegistration, StrategyId};
pub use services::{CopierServices, Services};

/// Plugin lists, read from the services once.
struct Plugins {
    generalized: Vec<Arc<dyn GeneralizedCopier>>,
    specializable: Vec<Arc<dyn SpecializableCopier>>,
}

/// Startup-time configuration of a [`CopierRegistry`].
pub struct CopierRegistryBuilder {
    table: Arc<TypeTable>,
    copiers: FxHashMap<Ty, CopierRegistration>,
    converters: FxHashMap<Ty, ConverterRegistration>,
    services: Arc<dyn CopierServices>,
    config: CopyConfig,
}

impl CopierRegistryBuilder {
    pub fn new(table: Arc<TypeTable>) -> Self {
        Self {
            table,
            copiers: FxHashMap::default(),
            converters: FxHashMap::default(),
            services: Arc::new(Services::new()),
            config: CopyConfig::default(),
        }
    }

    /// Register a strategy for `ty` or, if `ty` is a generic definition,
    /// for all of its instantiations. A later registration replaces an
    /// earlier one.
    pub fn register_copier(
        &mut self,
        ty: Ty,
        registration: CopierRegistration,
    ) -> Result<&mut Self, CopyError> {
        self.check_known(ty)?;
        self.copiers.insert(ty, registration);
        Ok(self)
    }

    /// Register a surrogate converter for `ty` or its instantiations.
    pub fn register_converter(
        &mut self,
        ty: Ty,
        registration: ConverterRegistration,
    ) -> Result<&mut Self, CopyError> {
        self.check_known(ty)?;
        self.converters.insert(ty, registration);
        Ok(self)
    }

    #[must_use]
    pub fn with_services(mut self, services: impl CopierServices + 'static) -> Self {
        self.services = Arc::new(services);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: CopyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> CopierRegistry {
        debug!(
            types = self.table.len(),
            copiers = self.copiers.len(),
            converters = self.converters.len(),
            "building copier registry"
        );
        CopierRegistry {
            classifier: ShallowClassifier::new(Arc::clone(&self.table)),
            table: self.table,
            copiers: self.copiers,
            converters: self.converters,
            surrogate: CopierRegistration::surrogate(),
            value_surrogate: CopierRegistration::value_surrogate(),
            services: self.services,
            config: self.config,
            plugins: OnceLock::new(),
            cache: DashMap::with_hasher(FxBuildHasher),
            constructions: Constructions::default(),
            typed: DashMap::with_hasher(FxBuildHasher),
            object: Arc::new(ObjectCopier),
            void: Arc::new(VoidCopier),
            shallow: Arc::new(ShallowCopier),
            multi_array: Arc::new(MultiDimensionalArrayCopier),
        }
    }

    fn check_known(&self, ty: Ty) -> Result<(), CopyError> {
        match self.table.get(ty) {
            Some(_) => Ok(()),
            None => Err(CopyError::UnknownType { ty }),
        }
    }
}

/// Resolves, caches and hands out copier strategies.
///
/// Shared by every thread copying values of the types in its table. At most
/// one copier is ever published per type; once published it is never
/// replaced.
pub struct CopierRegistry {
    table: Arc<TypeTable>,
    copiers: FxHashMap<Ty, CopierRegistration>,
    converters: FxHashMap<Ty, ConverterRegistration>,
    surrogate: CopierRegistration,
    value_surrogate: CopierRegistration,
    services: Arc<dyn CopierServices>,
    config: CopyConfig,
    classifier: ShallowClassifier,
    plugins: OnceLock<Plugins>,
    cache: DashMap<Ty, CacheEntry, FxBuildHasher>,
    constructions: Constructions,
    typed: DashMap<(Ty, TypeId), Box<dyn Any + Send + Sync>, FxBuildHasher>,
    object: Arc<dyn DeepCopier>,
    void: Arc<dyn DeepCopier>,
    shallow: Arc<dyn DeepCopier>,
    multi_array: Arc<MultiDimensionalArrayCopier>,
}

impl CopierRegistry {
    pub fn builder(table: Arc<TypeTable>) -> CopierRegistryBuilder {
        CopierRegistryBuilder::new(table)
    }

    #[inline]
    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// Owned type name for error messages.
    pub fn type_name(&self, ty: Ty) -> String {
        self.table.name(ty).to_owned()
    }

    pub fn is_shallow_copyable(&self, ty: Ty) -> bool {
        self.classifier.is_shallow_copyable(ty)
    }

    /// Whether a finished copier is published for `ty`.
    pub fn is_cached(&self, ty: Ty) -> bool {
        self.cache
            .get(&ty)
            .is_some_and(|entry| matches!(*entry, CacheEntry::Ready(_)))
    }

    /// Look up or build the copier for `ty`.
    ///
    /// Returns `Ok(None)` when no strategy applies; that outcome is not
    /// cached, so a later call runs the resolution again. If another thread
    /// is building the copier, waits for it and reports the same outcome.
    /// Requests made while the calling thread is itself constructing get a
    /// [`DeferredCopier`] instead.
    pub fn resolve(&self, ty: Ty) -> Result<Option<Arc<dyn DeepCopier>>, CopyError> {
        self.check_supported(ty)?;

        loop {
            let pending = match self.cache.get(&ty).as_deref() {
                Some(CacheEntry::Ready(copier)) => {
                    trace!(?ty, "copier cache hit");
                    return Ok(Some(Arc::clone(copier)));
                }
                Some(CacheEntry::Pending(slot)) => Some(Arc::clone(slot)),
                None => None,
            };

            if let Some(slot) = pending {
                match self.join(ty, slot) {
                    Settled::Ready(copier) => return Ok(Some(copier)),
                    Settled::NotFound => return Ok(None),
                    Settled::Failed(err) => return Err(err),
                    Settled::Retry | Settled::OwnConstruction => continue,
                }
            }

            let slot = match self.cache.entry(ty) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    let slot = PendingSlot::new(ty, self.table.name(ty));
                    entry.insert(CacheEntry::Pending(Arc::clone(&slot)));
                    slot
                }
            };
            return self.construct(ty, slot);
        }
    }

    /// Like [`resolve`](Self::resolve), failing with `CopierNotFound`.
    pub fn require(&self, ty: Ty) -> Result<Arc<dyn DeepCopier>, CopyError> {
        self.resolve(ty)?.ok_or_else(|| CopyError::CopierNotFound {
            ty: self.type_name(ty),
        })
    }

    /// Typed adapter over the copier for `ty`, cached per `(ty, T)`.
    pub fn require_typed<T: CopyValue>(&self, ty: Ty) -> Result<TypedCopier<T>, CopyError> {
        let key = (ty, TypeId::of::<T>());
        if let Some(cached) = self.typed.get(&key) {
            if let Some(copier) = cached.downcast_ref::<TypedCopier<T>>() {
                return Ok(copier.clone());
            }
        }

        let copier = TypedCopier::<T>::new(self.table.name(ty), self.require(ty)?);
        let entry = self
            .typed
            .entry(key)
            .or_insert_with(|| Box::new(copier.clone()));
        Ok(entry
            .downcast_ref::<TypedCopier<T>>()
            .cloned()
            .unwrap_or(copier))
    }

    /// The copier for `ty` in populate mode.
    pub fn require_base(&self, ty: Ty) -> Result<Arc<dyn BaseCopier>, CopyError> {
        self.require(ty)?
            .into_base()
            .ok_or_else(|| CopyError::BaseCopierNotFound {
                ty: self.type_name(ty),
            })
    }

    /// Copier for a declared field type; `None` means the declared type
    /// could not be resolved and the slot can only hold null.
    pub fn resolve_field(&self, ty: Option<Ty>) -> Result<Arc<dyn DeepCopier>, CopyError> {
        match ty {
            Some(ty) => self.require(ty),
            None => Ok(Arc::clone(&self.void)),
        }
    }

    pub(crate) fn is_object_copier(&self, copier: &Arc<dyn DeepCopier>) -> bool {
        Arc::ptr_eq(copier, &self.object)
    }

    /// Meet a construction already in progress for `ty`.
    fn join(&self, ty: Ty, slot: Arc<PendingSlot>) -> Settled {
        if slot.is_owned_by_current_thread() {
            trace!(?ty, "copier under construction; handing out placeholder");
            self.constructions.capture(&slot);
            return Settled::Ready(Arc::new(DeferredCopier::new(slot)));
        }
        if self.constructions.is_constructing() {
            trace!(?ty, "copier under construction on another thread");
            return Settled::Ready(Arc::new(DeferredCopier::new(slot)));
        }
        trace!(?ty, "waiting for copier construction on another thread");
        slot.outcome()
    }

    /// Build the copier for `ty` under the placeholder `slot`.
    fn construct(
        &self,
        ty: Ty,
        slot: Arc<PendingSlot>,
    ) -> Result<Option<Arc<dyn DeepCopier>>, CopyError> {
        self.constructions.enter(slot);
        let mut claim = Claim {
            registry: self,
            settled: false,
        };
        let created = self.create(ty);
        claim.settled = true;

        let Some((index, frame)) = self.constructions.leave() else {
            return created;
        };
        match created {
            Ok(Some(copier)) if frame.depends_on < index => {
                trace!(
                    ?ty,
                    frame = frame.depends_on,
                    "parking copier until the enclosing construction settles"
                );
                let mut parked = frame.parked;
                parked.push(Parked {
                    slot: frame.slot,
                    copier: Arc::clone(&copier),
                });
                self.constructions.park(frame.depends_on, parked);
                Ok(Some(copier))
            }
            Ok(Some(copier)) => {
                self.publish(ty, &frame.slot, &copier);
                for parked in &frame.parked {
                    self.publish(parked.slot.ty(), &parked.slot, &parked.copier);
                }
                Ok(Some(copier))
            }
            Ok(None) => {
                self.discard(frame.parked);
                self.cache.remove(&ty);
                frame.slot.not_found();
                Ok(None)
            }
            Err(err) => {
                self.discard(frame.parked);
                self.cache.remove(&ty);
                frame.slot.fail(err.clone());
                Err(err)
            }
        }
    }

    fn publish(&self, ty: Ty, slot: &PendingSlot, copier: &Arc<dyn DeepCopier>) {
        debug!(
            ty = self.table.name(ty),
            strategy = copier.strategy_name(),
            "published copier"
        );
        self.cache.insert(ty, CacheEntry::Ready(Arc::clone(copier)));
        slot.fulfill(copier);
    }

    /// Drop copiers whose enclosing construction did not succeed.
    fn discard(&self, parked: Vec<Parked>) {
        for Parked { slot, .. } in parked {
            let ty = slot.ty();
            debug!(ty = self.table.name(ty), "discarding dependent copier");
            self.cache.remove_if(&ty, |_, entry| {
                matches!(entry, CacheEntry::Pending(pending) if Arc::ptr_eq(pending, &slot))
            });
            slot.abandon();
        }
    }

    fn check_supported(&self, ty: Ty) -> Result<&TypeInfo, CopyError> {
        let info = self.table.get(ty).ok_or(CopyError::UnknownType { ty })?;
        let name = || info.name.clone();
        if info.is_generic_definition() {
            return Err(CopyError::OpenGenericDefinition { ty: name() });
        }
        if info.is_pointer() {
            return Err(CopyError::PointerType { ty: name() });
        }
        if info.is_by_ref() {
            return Err(CopyError::ByRefType { ty: name() });
        }
        Ok(info)
    }

    /// Run the resolution rules for a type with no cached copier.
    #[tracing::instrument(level = "debug", skip(self))]
    fn create(&self, ty: Ty) -> Result<Option<Arc<dyn DeepCopier>>, CopyError> {
        let info = self.check_supported(ty)?;

        if ty == Ty::OBJECT {
            return Ok(Some(Arc::clone(&self.object)));
        }
        if ty == Ty::VOID {
            return Ok(Some(Arc::clone(&self.void)));
        }

        if let Some((registration, args)) = self.registration_for(ty) {
            return self.instantiate(registration, ty, args, None).map(Some);
        }

        if self.classifier.is_shallow_copyable(ty) {
            return Ok(Some(Arc::clone(&self.shallow)));
        }

        if let Some((elem, rank)) = info.array() {
            if rank == 1 {
                let elem_copier = self.require(elem)?;
                let copier = ArrayCopier::new(info.name.clone(), elem, elem_copier);
                return Ok(Some(Arc::new(copier)));
            }
            if self.multi_array.is_supported_type(ty, &self.table) {
                return Ok(Some(Arc::clone(&self.multi_array).into_copier()));
            }
        }

        if let Some(copier) = self.from_converter(ty, info)? {
            return Ok(Some(copier));
        }

        if let Some(copier) = self.from_ancestors(ty)? {
            return Ok(Some(copier));
        }

        let plugins = self.plugins();
        if let Some(plugin) = plugins
            .specializable
            .iter()
            .find(|plugin| plugin.is_supported_type(ty, &self.table))
        {
            return plugin.specialize(ty, self).map(Some);
        }
        if let Some(plugin) = plugins
            .generalized
            .iter()
            .find(|plugin| plugin.is_supported_type(ty, &self.table))
        {
            return Ok(Some(Arc::clone(plugin).into_copier()));
        }

        if info.is_interface() || info.is_abstract() {
            return Ok(Some(Arc::clone(&self.object)));
        }

        Ok(None)
    }

    /// Registration for the exact type, else for its generic definition.
    fn registration_for(&self, ty: Ty) -> Option<(&CopierRegistration, &[Ty])> {
        let args = self.table.generic_args(ty);
        if let Some(registration) = self.copiers.get(&ty) {
            return Some((registration, args));
        }
        let definition = self.table.generic_definition(ty)?;
        self.copiers.get(&definition).map(|registration| (registration, args))
    }

    /// Build a registered strategy, preferring a pre-built singleton.
    fn instantiate(
        &self,
        registration: &CopierRegistration,
        ty: Ty,
        generic_args: &[Ty],
        converter: Option<Arc<dyn Converter>>,
    ) -> Result<Arc<dyn DeepCopier>, CopyError> {
        if let Some(copier) = self.services.singleton(registration.id(), ty) {
            trace!(?ty, id = %registration.id(), "using singleton copier");
            return Ok(copier);
        }
        registration.build(&Activation {
            ty,
            generic_args,
            registry: self,
            converter,
        })
    }

    fn from_converter(
        &self,
        ty: Ty,
        info: &TypeInfo,
    ) -> Result<Option<Arc<dyn DeepCopier>>, CopyError> {
        let registration = self.converters.get(&ty).or_else(|| {
            let definition = self.table.generic_definition(ty)?;
            self.converters.get(&definition)
        });
        let Some(registration) = registration else {
            return Ok(None);
        };

        let args = self.table.generic_args(ty);
        let converter = registration.create(ty, args)?;
        if converter.source_type() != ty {
            return Err(CopyError::ConverterMismatch {
                converter: converter.name().to_owned(),
                expected: self.type_name(ty),
                found: self.type_name(converter.source_type()),
            });
        }

        let wrapper = if info.is_value_type() {
            &self.value_surrogate
        } else {
            &self.surrogate
        };
        self.instantiate(wrapper, ty, args, Some(converter)).map(Some)
    }

    /// Walk the hierarchy index for a registration that covers subtypes.
    fn from_ancestors(&self, ty: Ty) -> Result<Option<Arc<dyn DeepCopier>>, CopyError> {
        for &ancestor in self.table.ancestors(ty) {
            let Some((registration, args)) = self.registration_for(ancestor) else {
                continue;
            };
            if registration.is_for_subtypes() {
                trace!(?ty, ?ancestor, "reusing subtype registration");
                return self.instantiate(registration, ty, args, None).map(Some);
            }
        }
        Ok(None)
    }

    fn plugins(&self) -> &Plugins {
        self.plugins.get_or_init(|| {
            let plugins = Plugins {
                generalized: self.services.generalized(),
                specializable: self.services.specializable(),
            };
            debug!(
                generalized = plugins.generalized.len(),
                specializable = plugins.specializable.len(),
                "initialized copier plugins"
            );
            plugins
        })
    }
}

/// Construction claim on the innermost frame. If construction unwinds
/// before settling, the frame is closed, its placeholder removed and its
/// slot failed, so waiters on other threads are released.
struct Claim<'a> {
    registry: &'a CopierRegistry,
    settled: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let registry = self.registry;
        if let Some((_, frame)) = registry.constructions.leave() {
            registry.discard(frame.parked);
            let ty = frame.slot.ty();
            registry.cache.remove(&ty);
            frame.slot.fail(CopyError::ConstructionFailed {
                ty: registry.type_name(ty),
                reason: "construction panicked".to_owned(),
            });
        }
    }
}
