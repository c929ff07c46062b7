//! Construction collaborator: pre-built singletons and plugin lists.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use replica_types::Ty;

use super::StrategyId;
use crate::{DeepCopier, GeneralizedCopier, SpecializableCopier};

/// Supplies strategies the registry does not build itself.
///
/// The plugin lists are read once, on first use, and kept for the life of
/// the registry.
pub trait CopierServices: Send + Sync {
    /// A pre-built instance for a registered strategy and concrete type.
    fn singleton(&self, id: StrategyId, ty: Ty) -> Option<Arc<dyn DeepCopier>>;

    /// Strategies matched by predicate, in priority order.
    fn generalized(&self) -> Vec<Arc<dyn GeneralizedCopier>>;

    /// Plugins building per-type strategies, in priority order.
    fn specializable(&self) -> Vec<Arc<dyn SpecializableCopier>>;
}

/// In-memory [`CopierServices`] with builder-style registration.
#[derive(Default)]
pub struct Services {
    singletons: FxHashMap<(StrategyId, Ty), Arc<dyn DeepCopier>>,
    generalized: Vec<Arc<dyn GeneralizedCopier>>,
    specializable: Vec<Arc<dyn SpecializableCopier>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_singleton(mut self, id: StrategyId, ty: Ty, copier: Arc<dyn DeepCopier>) -> Self {
        self.singletons.insert((id, ty), copier);
        self
    }

    #[must_use]
    pub fn with_generalized(mut self, plugin: Arc<dyn GeneralizedCopier>) -> Self {
        self.generalized.push(plugin);
        self
    }

    #[must_use]
    pub fn with_specializable(mut self, plugin: Arc<dyn SpecializableCopier>) -> Self {
        self.specializable.push(plugin);
        self
    }
}

impl CopierServices for Services {
    fn singleton(&self, id: StrategyId, ty: Ty) -> Option<Arc<dyn DeepCopier>> {
        self.singletons.get(&(id, ty)).cloned()
    }

    fn generalized(&self) -> Vec<Arc<dyn GeneralizedCopier>> {
        self.generalized.clone()
    }

    fn specializable(&self) -> Vec<Arc<dyn SpecializableCopier>> {
        self.specializable.clone()
    }
}
