//! Shared registries under parallel load.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rayon::prelude::*;
use replica_copy::strategies::FieldwiseCopier;
use replica_copy::{
    CopierRegistration, CopierRegistry, CopyError, DeepCopier, Replicator, Services,
    SpecializableCopier, StrategyId,
};
use replica_types::{ArrayObject, Ty, TypeTable, Value};

use crate::common::{field, model};

#[test]
fn parallel_copies_share_one_replicator() {
    let m = model();
    let replicator = m.replicator();

    let copies: Vec<_> = (0..128_i64)
        .into_par_iter()
        .map(|i| {
            let tail = m.node(i + 1, Value::Null);
            let head = m.node(i, tail.clone());
            let pair = Value::vector(m.node_array, vec![head.clone(), tail]);
            (pair.clone(), replicator.deep_copy(&pair).unwrap())
        })
        .collect();

    for (original, copy) in &copies {
        assert!(copy.structural_eq(original));
        let elems = copy.as_array().unwrap().to_vec();
        assert!(field(&elems[0], 1).ptr_eq(&elems[1]));
        assert!(!elems[1].ptr_eq(&original.as_array().unwrap().to_vec()[1]));
    }
}

#[test]
fn slow_construction_runs_once_for_racing_threads() {
    let m = model();
    let built = Arc::new(AtomicUsize::new(0));
    let mut builder = m.builder();
    {
        let built = Arc::clone(&built);
        builder
            .register_copier(
                m.node,
                CopierRegistration::new(StrategyId::new("slow"), move |activation| {
                    built.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    let copier = FieldwiseCopier::new(activation.ty, activation.registry)?;
                    Ok(Arc::new(copier))
                }),
            )
            .unwrap();
    }
    let replicator = Replicator::new(builder.build());
    let list = m.node(1, m.node(2, Value::Null));

    thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| replicator.deep_copy(&list)))
            .collect();
        for worker in workers {
            let copy = worker.join().unwrap().unwrap();
            assert!(copy.structural_eq(&list));
        }
    });

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(replicator.registry().is_cached(m.node));
}

/// Plugin that takes its time before declining every type.
struct SlowDecline {
    entered: Arc<AtomicBool>,
}

impl SpecializableCopier for SlowDecline {
    fn is_supported_type(&self, _ty: Ty, _table: &TypeTable) -> bool {
        self.entered.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        false
    }

    fn specialize(
        &self,
        ty: Ty,
        registry: &CopierRegistry,
    ) -> Result<Arc<dyn DeepCopier>, CopyError> {
        Err(CopyError::CopierNotFound {
            ty: registry.type_name(ty),
        })
    }
}

#[test]
fn racing_thread_sees_not_found_from_the_builder() {
    let m = model();
    let entered = Arc::new(AtomicBool::new(false));
    let services = Services::new().with_specializable(Arc::new(SlowDecline {
        entered: Arc::clone(&entered),
    }));
    let registry = m.builder().with_services(services).build();
    let missing = CopyError::CopierNotFound {
        ty: "Node".to_owned(),
    };

    thread::scope(|scope| {
        let builder = scope.spawn(|| registry.require(m.node).err());
        while !entered.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        // The first thread is still inside resolution of `Node`.
        assert_eq!(registry.require(m.node).err(), Some(missing.clone()));
        assert_eq!(builder.join().unwrap(), Some(missing.clone()));
    });

    assert!(!registry.is_cached(m.node));
    assert!(registry.resolve(m.node).unwrap().is_none());
}

#[test]
fn failed_copy_leaves_no_state_in_the_pool() {
    let m = model();
    let replicator = m.replicator();
    let good = m.node(1, Value::Null);
    let broken = Value::object(m.node, vec![Value::i64(2)]);
    let graph = Value::Array(ArrayObject::vector(
        m.object_array,
        vec![good.clone(), broken],
    ));

    let err = replicator.deep_copy(&graph).unwrap_err();
    assert!(matches!(err, CopyError::TypeMismatch { .. }));
    assert_eq!(replicator.pool().idle_count(), 1);

    let first = replicator.deep_copy(&good).unwrap();
    let second = replicator.deep_copy(&good).unwrap();
    assert!(!first.ptr_eq(&second));
    assert!(replicator.pool().acquire().is_empty());
}
