//! Shared fixtures for unit tests.
//!
//! `World` is a small type table exercising every resolution rule:
//! self-referential classes, a class hierarchy, value types, generics,
//! arrays of several ranks and the unsupported kinds.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use replica_types::{Ty, TypeFlags, TypeTable, TypeTableBuilder, Value};

use crate::strategies::FieldwisePlugin;
use crate::{CopierRegistry, CopierRegistryBuilder, Services};

pub struct World {
    pub table: Arc<TypeTable>,
    /// `class Node { value: i64, next: Node }`
    pub node: Ty,
    /// `class Person { name: str, friend: Person, pet: Animal }`
    pub person: Ty,
    /// `abstract class Animal { name: str }`
    pub animal: Ty,
    /// `class Dog : Animal { name: str, good: bool }`
    pub dog: Ty,
    pub shape: Ty,
    /// `struct Point { x: i32, y: i32 }`
    pub point: Ty,
    /// `struct Labeled { label: str, node: Node }`
    pub labeled: Ty,
    /// `class Box<T>` definition and `Box<i32>`.
    pub box_def: Ty,
    pub box_i32: Ty,
    /// `class Opaque { blob: <unknown> }`
    pub opaque: Ty,
    pub i32_array: Ty,
    pub node_array: Ty,
    pub i32_grid: Ty,
    pub object_grid: Ty,
    pub node_cube: Ty,
    pub pair: Ty,
    pub node_pair: Ty,
    pub i32_ptr: Ty,
    pub i32_ref: Ty,
}

pub fn world() -> World {
    crate::init_tracing();
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

    let shape = b.interface("IShape");

    let point = b.structure("Point");
    b.set_fields(point, [("x", Some(Ty::I32)), ("y", Some(Ty::I32))])
        .unwrap();
    let labeled = b.structure("Labeled");
    b.set_fields(labeled, [("label", Some(Ty::STR)), ("node", Some(node))])
        .unwrap();

    let box_def = b.generic_class("Box", 1);
    let box_i32 = b.instantiate(box_def, &[Ty::I32]).unwrap();
    b.set_fields(box_i32, [("item", Some(Ty::I32))]).unwrap();

    let opaque = b.class("Opaque");
    b.set_fields(opaque, [("blob", None)]).unwrap();

    let i32_array = b.array(Ty::I32, 1).unwrap();
    let node_array = b.array(node, 1).unwrap();
    let i32_grid = b.array(Ty::I32, 2).unwrap();
    let object_grid = b.array(Ty::OBJECT, 2).unwrap();
    let node_cube = b.array(node, 3).unwrap();
    let pair = b.tuple(&[Ty::I32, Ty::STR]).unwrap();
    let node_pair = b.tuple(&[node, node]).unwrap();
    let i32_ptr = b.pointer(Ty::I32).unwrap();
    let i32_ref = b.by_ref(Ty::I32).unwrap();

    World {
        table: Arc::new(b.build().unwrap()),
        node,
        person,
        animal,
        dog,
        shape,
        point,
        labeled,
        box_def,
        box_i32,
        opaque,
        i32_array,
        node_array,
        i32_grid,
        object_grid,
        node_cube,
        pair,
        node_pair,
        i32_ptr,
        i32_ref,
    }
}

impl World {
    pub fn builder(&self) -> CopierRegistryBuilder {
        CopierRegistry::builder(Arc::clone(&self.table))
    }

    /// Registry where every composite type is copied field by field.
    pub fn fieldwise_registry(&self) -> Arc<CopierRegistry> {
        let services = Services::new().with_specializable(Arc::new(FieldwisePlugin));
        Arc::new(self.builder().with_services(services).build())
    }

    pub fn node(&self, value: i64, next: Value) -> Value {
        Value::object(self.node, vec![Value::i64(value), next])
    }
}
