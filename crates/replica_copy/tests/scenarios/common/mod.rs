//! Shared type model for the scenarios.
//!
//! ```text
//! class Node { value: i64, next: Node }
//! class Person { name: str, friend: Person, pet: Animal }
//! abstract class Animal { name: str }
//! class Dog : Animal { name: str, good: bool }
//! class Puppy : Dog { name: str, good: bool, age: u8 }
//! struct Point { x: i32, y: i32 }
//! class Money { cents: i64, currency: str }   // copied through (i64, str)
//! class Box<T>; Box<Node> { item: Node }
//! ```

use std::sync::Arc;

use replica_copy::strategies::FieldwisePlugin;
use replica_copy::{CopierRegistry, CopierRegistryBuilder, Replicator, Services};
use replica_types::{Ty, TypeFlags, TypeTable, TypeTableBuilder, Value};

pub struct Model {
    pub table: Arc<TypeTable>,
    pub node: Ty,
    pub person: Ty,
    pub animal: Ty,
    pub dog: Ty,
    pub puppy: Ty,
    pub point: Ty,
    pub money: Ty,
    pub money_pair: Ty,
    pub box_def: Ty,
    pub box_node: Ty,
    pub node_array: Ty,
    pub object_array: Ty,
    pub i32_array: Ty,
    pub i64_grid: Ty,
    pub node_cube: Ty,
    pub node_ptr: Ty,
    pub node_ref: Ty,
}

pub fn model() -> Model {
    replica_copy::init_tracing();
    let mut b = TypeTableBuilder::new();

    let node = b.class("Node");
    b.set_fields(node, [("value", Some(Ty::I64)), ("next", Some(node))])
        .unwrap();

    let animal = b.class("Animal");
    b.set_flags(animal, TypeFlags::ABSTRACT).unwrap();
    b.set_fields(animal, [("name", Some(Ty::STR))]).unwrap();
    let dog = b.derived("Dog", animal).unwrap();
    b.set_fields(dog, [("name", Some(Ty::STR)), ("good", Some(Ty::BOOL))])
        .unwrap();
    let puppy = b.derived("Puppy", dog).unwrap();
    b.set_fields(
        puppy,
        [
            ("name", Some(Ty::STR)),
            ("good", Some(Ty::BOOL)),
            ("age", Some(Ty::U8)),
        ],
    )
    .unwrap();

    let person = b.class("Person");
    b.set_fields(
        person,
        [
            ("name", Some(Ty::STR)),
            ("friend", Some(person)),
            ("pet", Some(animal)),
        ],
    )
    .unwrap();

    let point = b.structure("Point");
    b.set_fields(point, [("x", Some(Ty::I32)), ("y", Some(Ty::I32))])
        .unwrap();

    let money = b.class("Money");
    b.set_fields(money, [("cents", Some(Ty::I64)), ("currency", Some(Ty::STR))])
        .unwrap();
    let money_pair = b.tuple(&[Ty::I64, Ty::STR]).unwrap();

    let box_def = b.generic_class("Box", 1);
    let box_node = b.instantiate(box_def, &[node]).unwrap();
    b.set_fields(box_node, [("item", Some(node))]).unwrap();

    let node_array = b.array(node, 1).unwrap();
    let object_array = b.array(Ty::OBJECT, 1).unwrap();
    let i32_array = b.array(Ty::I32, 1).unwrap();
    let i64_grid = b.array(Ty::I64, 2).unwrap();
    let node_cube = b.array(node, 3).unwrap();
    let node_ptr = b.pointer(node).unwrap();
    let node_ref = b.by_ref(node).unwrap();

    Model {
        table: Arc::new(b.build().unwrap()),
        node,
        person,
        animal,
        dog,
        puppy,
        point,
        money,
        money_pair,
        box_def,
        box_node,
        node_array,
        object_array,
        i32_array,
        i64_grid,
        node_cube,
        node_ptr,
        node_ref,
    }
}

impl Model {
    pub fn builder(&self) -> CopierRegistryBuilder {
        CopierRegistry::builder(Arc::clone(&self.table))
    }

    /// Registry copying every composite type field by field.
    pub fn registry(&self) -> Arc<CopierRegistry> {
        Arc::new(self.builder().with_services(fieldwise()).build())
    }

    pub fn replicator(&self) -> Replicator {
        Replicator::from_shared(self.registry())
    }

    pub fn node(&self, value: i64, next: Value) -> Value {
        Value::object(self.node, vec![Value::i64(value), next])
    }

    pub fn dog(&self, name: &str) -> Value {
        Value::object(self.dog, vec![Value::str(name), Value::Bool(true)])
    }

    pub fn person(&self, name: &str, friend: Value, pet: Value) -> Value {
        Value::object(self.person, vec![Value::str(name), friend, pet])
    }
}

pub fn fieldwise() -> Services {
    Services::new().with_specializable(Arc::new(FieldwisePlugin))
}

/// Field `index` of an object value.
pub fn field(value: &Value, index: usize) -> Value {
    value.as_object().unwrap().field(index).unwrap()
}

/// Set field `index` of an object value.
pub fn set_field(value: &Value, index: usize, to: Value) {
    value.as_object().unwrap().set_field(index, to).unwrap();
}
