//! Arrays of every rank.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use replica_types::{ArrayObject, Value};

use crate::common::{field, model};

#[test]
fn vector_of_nodes_copies_each_element_once() {
    let m = model();
    let shared = m.node(1, Value::Null);
    let original = Value::vector(
        m.node_array,
        vec![shared.clone(), m.node(2, Value::Null), shared.clone()],
    );

    let copy = m.replicator().deep_copy(&original).unwrap();
    let elems = copy.as_array().unwrap().to_vec();

    assert_eq!(elems.len(), 3);
    assert!(elems[0].ptr_eq(&elems[2]));
    assert!(!elems[0].ptr_eq(&shared));
    assert!(copy.structural_eq(&original));
}

#[test]
fn array_containing_itself() {
    let m = model();
    let array = ArrayObject::with_lengths(m.object_array, &[2]);
    let original = Value::Array(array.clone());
    array.set(0, original.clone()).unwrap();
    array.set(1, Value::str("tail")).unwrap();

    let copy = m.replicator().deep_copy(&original).unwrap();
    let copied = copy.as_array().unwrap();

    assert!(!copy.ptr_eq(&original));
    assert!(copied.get(0).unwrap().ptr_eq(&copy));
    assert_eq!(copied.get(1).unwrap().as_str(), Some("tail"));

    array.set(0, Value::Null).unwrap();
    copied.set(0, Value::Null).unwrap();
}

#[test]
fn scalar_vector_is_a_fresh_array() {
    let m = model();
    let original = Value::vector(m.i32_array, (0..5).map(Value::i32).collect());

    let copy = m.replicator().deep_copy(&original).unwrap();

    assert!(!copy.ptr_eq(&original));
    assert!(copy.structural_eq(&original));
}

#[test]
fn cube_of_nodes_keeps_shape_and_sharing() {
    let m = model();
    let cube = ArrayObject::with_lengths(m.node_cube, &[2, 2, 3]);
    let shared = m.node(-1, Value::Null);
    cube.set_at(&[0, 0, 0], shared.clone()).unwrap();
    cube.set_at(&[1, 1, 2], shared.clone()).unwrap();
    cube.set_at(&[1, 0, 1], m.node(9, Value::Null)).unwrap();
    let original = Value::Array(cube);

    let copy = m.replicator().deep_copy(&original).unwrap();
    let copied = copy.as_array().unwrap();

    assert_eq!(copied.rank(), 3);
    assert_eq!(copied.lengths(), &[2, 2, 3]);
    let first = copied.get_at(&[0, 0, 0]).unwrap();
    assert!(first.ptr_eq(&copied.get_at(&[1, 1, 2]).unwrap()));
    assert!(!first.ptr_eq(&shared));
    assert_eq!(field(&copied.get_at(&[1, 0, 1]).unwrap(), 0).as_i64(), Some(9));
    assert!(copied.get_at(&[0, 1, 2]).unwrap().is_null());
}

#[test]
fn empty_dimension_is_copied() {
    let m = model();
    let original = Value::Array(ArrayObject::with_lengths(m.node_cube, &[3, 0, 2]));

    let copy = m.replicator().deep_copy(&original).unwrap();

    assert_eq!(copy.as_array().unwrap().lengths(), &[3, 0, 2]);
    assert!(!copy.ptr_eq(&original));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Every element lands at the same index in the copy.
    #[test]
    fn prop_cube_elements_keep_their_index(
        lengths in prop::collection::vec(0_usize..4, 3),
    ) {
        let m = model();
        let cube = ArrayObject::with_lengths(m.node_cube, &lengths);
        for flat in 0..cube.len() {
            let value = i64::try_from(flat).unwrap();
            cube.set(flat, m.node(value, Value::Null)).unwrap();
        }
        let original = Value::Array(cube);

        let copy = m.replicator().deep_copy(&original).unwrap();
        let copied = copy.as_array().unwrap();

        prop_assert_eq!(copied.lengths(), lengths.as_slice());
        for flat in 0..copied.len() {
            let elem = copied.get(flat).unwrap();
            prop_assert_eq!(field(&elem, 0).as_i64(), i64::try_from(flat).ok());
        }
    }

    /// Scalar grids are equal but never the same array.
    #[test]
    fn prop_scalar_grid_round_trips(
        rows in 0_usize..5,
        cols in 0_usize..5,
        seed in any::<i64>(),
    ) {
        let m = model();
        let elems = (0..rows * cols)
            .map(|i| Value::i64(seed.wrapping_add(i64::try_from(i).unwrap())))
            .collect();
        let original = Value::Array(ArrayObject::new(m.i64_grid, &[rows, cols], elems).unwrap());

        let copy = m.replicator().deep_copy(&original).unwrap();

        prop_assert!(!copy.ptr_eq(&original));
        prop_assert!(copy.structural_eq(&original));
    }
}
