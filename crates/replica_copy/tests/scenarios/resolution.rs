//! Strategy resolution through the public registry API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use replica_copy::strategies::FieldwiseCopier;
use replica_copy::{
    CopierRegistration, CopierRegistry, CopyContext, CopyError, DeepCopier, GeneralizedCopier,
    Replicator, Services, SpecializableCopier,
};
use replica_types::{Ty, TypeTable, Value};

use crate::common::{field, model};

/// Copier that only reports which plugin produced it.
struct Named(&'static str);

impl DeepCopier for Named {
    fn deep_copy(&self, input: &Value, _ctx: &mut CopyContext) -> Result<Value, CopyError> {
        Ok(input.clone())
    }

    fn strategy_name(&self) -> &'static str {
        self.0
    }
}

impl GeneralizedCopier for Named {
    fn is_supported_type(&self, ty: Ty, table: &TypeTable) -> bool {
        table.name(ty) == "Node"
    }

    fn into_copier(self: Arc<Self>) -> Arc<dyn DeepCopier> {
        self
    }
}

/// Specializable plugin for classes whose name starts with a prefix.
struct Prefixed(&'static str, &'static str);

impl SpecializableCopier for Prefixed {
    fn is_supported_type(&self, ty: Ty, table: &TypeTable) -> bool {
        table.name(ty).starts_with(self.0)
    }

    fn specialize(
        &self,
        _ty: Ty,
        _registry: &CopierRegistry,
    ) -> Result<Arc<dyn DeepCopier>, CopyError> {
        Ok(Arc::new(Named(self.1)))
    }
}

#[test]
fn second_resolve_is_the_same_copier() {
    let m = model();
    let registry = m.registry();

    let first = registry.require(m.person).unwrap();
    let second = registry.require(m.person).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(registry.is_cached(m.person));
}

#[test]
fn unsupported_kinds_are_rejected() {
    let m = model();
    let registry = m.registry();

    assert_eq!(
        registry.resolve(m.box_def).err(),
        Some(CopyError::OpenGenericDefinition {
            ty: "Box".to_owned()
        })
    );
    assert!(matches!(
        registry.resolve(m.node_ptr),
        Err(CopyError::PointerType { .. })
    ));
    assert!(matches!(
        registry.resolve(m.node_ref),
        Err(CopyError::ByRefType { .. })
    ));
    assert!(!registry.is_cached(m.node_ptr));
}

#[test]
fn class_without_a_strategy_is_not_found() {
    let m = model();
    let replicator = Replicator::new(m.builder().build());

    let err = replicator.deep_copy(&m.node(1, Value::Null)).unwrap_err();

    assert_eq!(err.to_string(), "could not find a copier for type `Node`");
    assert!(!replicator.registry().is_cached(m.node));
}

#[test]
fn self_referential_registration_builds_through_a_placeholder() {
    let m = model();
    let mut builder = m.builder();
    builder
        .register_copier(m.node, CopierRegistration::fieldwise())
        .unwrap();
    let replicator = Replicator::new(builder.build());
    let list = m.node(1, m.node(2, m.node(3, Value::Null)));

    let copy = replicator.deep_copy(&list).unwrap();

    assert!(copy.structural_eq(&list));
    assert!(!field(&copy, 1).ptr_eq(&field(&list, 1)));
    assert_eq!(
        replicator.registry().require(m.node).unwrap().strategy_name(),
        "fieldwise"
    );
}

#[test]
fn specializable_plugins_run_before_generalized_ones() {
    let m = model();
    let services = Services::new()
        .with_generalized(Arc::new(Named("generalized")))
        .with_specializable(Arc::new(Prefixed("No", "first")))
        .with_specializable(Arc::new(Prefixed("Node", "second")));
    let registry = m.builder().with_services(services).build();

    assert_eq!(registry.require(m.node).unwrap().strategy_name(), "first");
}

#[test]
fn generalized_plugin_applies_when_no_specializable_does() {
    let m = model();
    let services = Services::new()
        .with_specializable(Arc::new(Prefixed("Person", "person")))
        .with_generalized(Arc::new(Named("generalized")));
    let registry = m.builder().with_services(services).build();

    assert_eq!(
        registry.require(m.node).unwrap().strategy_name(),
        "generalized"
    );
    assert_eq!(registry.require(m.person).unwrap().strategy_name(), "person");
}

#[test]
fn subtype_registration_serves_every_derived_class() {
    let m = model();
    let mut builder = m.builder();
    builder
        .register_copier(
            m.animal,
            CopierRegistration::fieldwise().applies_to_subtypes(),
        )
        .unwrap();
    let registry = builder.build();

    for ty in [m.dog, m.puppy] {
        assert_eq!(registry.require(ty).unwrap().strategy_name(), "fieldwise");
    }
    assert!(registry.resolve(m.person).unwrap().is_none());

    let rex = m.dog("rex");
    let copy = Replicator::new(registry).deep_copy(&rex).unwrap();
    assert!(copy.structural_eq(&rex));
    assert!(!copy.ptr_eq(&rex));
}

#[test]
fn fieldwise_copier_can_be_built_directly() {
    let m = model();
    let registry = m.registry();

    let copier = FieldwiseCopier::new(m.person, &registry).unwrap();

    assert_eq!(copier.ty(), m.person);
    assert_eq!(copier.strategy_name(), "fieldwise");
}
