//! Cycle-safe deep copying of object graphs.
//!
//! Given a [`TypeTable`](replica_types::TypeTable) describing every runtime
//! type, a [`CopierRegistry`] resolves one copy strategy per type and a
//! [`CopyContext`] drives it, keeping an identity map so that shared and
//! cyclic references in the original are shared and cyclic in the copy.
//!
//! # Architecture
//!
//! - [`classify`]: memoized shallow-copyable classification
//! - [`guard`]: under-construction placeholders for the copier cache
//! - [`strategies`]: the built-in copiers
//! - [`registry`]: resolution, registration and caching
//! - [`context`]: identity map and context pool
//! - [`Replicator`]: pooled entry point
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use replica_copy::{CopierRegistration, CopierRegistry, Replicator};
//! use replica_types::{Ty, TypeTableBuilder, Value};
//!
//! let mut types = TypeTableBuilder::new();
//! let node = types.class("Node");
//! types.set_fields(node, [("value", Some(Ty::I64)), ("next", Some(node))]).unwrap();
//! let table = Arc::new(types.build().unwrap());
//!
//! let mut builder = CopierRegistry::builder(table);
//! builder.register_copier(node, CopierRegistration::fieldwise()).unwrap();
//! let replicator = Replicator::new(builder.build());
//!
//! let original = Value::object(node, vec![Value::i64(1), Value::Null]);
//! let copy = replicator.deep_copy(&original).unwrap();
//! assert!(copy.structural_eq(&original));
//! assert!(!copy.ptr_eq(&original));
//! ```

pub mod classify;
mod config;
pub mod context;
mod copier;
mod error;
pub mod guard;
pub mod registry;
mod replicator;
pub mod strategies;
mod tracing_setup;

#[cfg(test)]
mod test_helpers;

pub use config::CopyConfig;
pub use context::{CopyContext, CopyContextPool, PooledContext};
pub use copier::{BaseCopier, DeepCopier, GeneralizedCopier, SpecializableCopier};
pub use error::CopyError;
pub use registry::{
    Activation, ConverterRegistration, CopierRegistration, CopierRegistry, CopierRegistryBuilder,
    CopierServices, Services, StrategyId,
};
pub use replicator::Replicator;
pub use strategies::{Converter, CopyValue, Populator, TypedCopier};
pub use tracing_setup::init_tracing;
