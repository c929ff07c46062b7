//! Identity preservation across whole object graphs.

use pretty_assertions::assert_eq;
use replica_types::{StructValue, Ty, Value};

use crate::common::{field, model, set_field};

#[test]
fn mutual_cycle_is_closed_on_the_copy() {
    let m = model();
    let a = m.node(1, Value::Null);
    let b = m.node(2, a.clone());
    set_field(&a, 1, b.clone());

    let a2 = m.replicator().deep_copy(&a).unwrap();
    let b2 = field(&a2, 1);

    assert_eq!(field(&a2, 0).as_i64(), Some(1));
    assert_eq!(field(&b2, 0).as_i64(), Some(2));
    assert!(field(&b2, 1).ptr_eq(&a2));
    assert!(!a2.ptr_eq(&a));
    assert!(!b2.ptr_eq(&b));

    set_field(&a, 1, Value::Null);
    set_field(&a2, 1, Value::Null);
}

#[test]
fn self_reference_points_at_the_copy() {
    let m = model();
    let a = m.node(7, Value::Null);
    set_field(&a, 1, a.clone());

    let copy = m.replicator().deep_copy(&a).unwrap();

    assert!(!copy.ptr_eq(&a));
    assert!(field(&copy, 1).ptr_eq(&copy));

    set_field(&a, 1, Value::Null);
    set_field(&copy, 1, Value::Null);
}

#[test]
fn shared_child_stays_shared() {
    let m = model();
    let rex = m.dog("rex");
    let bob = m.person("bob", Value::Null, rex.clone());
    let ann = m.person("ann", bob.clone(), rex.clone());

    let copy = m.replicator().deep_copy(&ann).unwrap();
    let bob2 = field(&copy, 1);

    assert!(field(&copy, 2).ptr_eq(&field(&bob2, 2)));
    assert!(!field(&copy, 2).ptr_eq(&rex));
    assert!(!bob2.ptr_eq(&bob));
}

#[test]
fn acyclic_graph_is_equal_but_disjoint() {
    let m = model();
    let list = m.node(1, m.node(2, m.node(3, Value::Null)));

    let copy = m.replicator().deep_copy(&list).unwrap();

    assert!(copy.structural_eq(&list));
    let (mut original, mut copied) = (list, copy);
    while !original.is_null() {
        assert!(!original.ptr_eq(&copied));
        original = field(&original, 1);
        copied = field(&copied, 1);
    }
    assert!(copied.is_null());
}

#[test]
fn derived_pet_keeps_its_runtime_type() {
    let m = model();
    let pup = Value::object(
        m.puppy,
        vec![Value::str("bit"), Value::Bool(false), Value::u8(1)],
    );
    let ann = m.person("ann", Value::Null, pup.clone());

    let copy = m.replicator().deep_copy(&ann).unwrap();
    let pet = field(&copy, 2);

    assert_eq!(pet.runtime_type(), Some(m.puppy));
    assert!(pet.structural_eq(&pup));
    assert!(!pet.ptr_eq(&pup));
}

#[test]
fn shallow_values_come_back_unchanged() {
    let m = model();
    let replicator = m.replicator();

    let text = Value::str("immutable");
    assert!(replicator.deep_copy(&text).unwrap().ptr_eq(&text));

    let point = Value::Struct(StructValue::new(m.point, vec![Value::i32(1), Value::i32(2)]));
    assert!(replicator.deep_copy(&point).unwrap().structural_eq(&point));
    assert!(replicator.registry().is_shallow_copyable(m.point));

    assert!(replicator.deep_copy(&Value::Null).unwrap().is_null());
    let ty = Value::Type(Ty::STR);
    assert!(replicator.deep_copy(&ty).unwrap().structural_eq(&ty));
}

#[test]
fn typed_entry_point_copies_objects() {
    let m = model();
    let replicator = m.replicator();
    let node = m.node(3, m.node(4, Value::Null));
    let obj = node.as_object().unwrap().clone();

    let copied = replicator.deep_copy_typed(obj.clone()).unwrap();

    assert!(!std::sync::Arc::ptr_eq(&copied, &obj));
    assert!(Value::Object(copied).structural_eq(&node));
    assert_eq!(replicator.deep_copy_typed(42_i64).unwrap(), 42);
}
