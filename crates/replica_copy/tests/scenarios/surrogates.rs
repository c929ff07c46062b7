//! Converter round trips.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use replica_copy::{ConverterRegistration, Converter, CopyError, Replicator};
use replica_types::{Ty, TupleValue, Value};

use crate::common::{field, model, Model};

/// `Money` <-> `(cents, currency)`.
struct MoneyAsPair {
    money: Ty,
    pair: Ty,
}

impl Converter for MoneyAsPair {
    fn name(&self) -> &str {
        "MoneyAsPair"
    }

    fn source_type(&self) -> Ty {
        self.money
    }

    fn surrogate_type(&self) -> Ty {
        self.pair
    }

    fn to_surrogate(&self, value: &Value) -> Result<Value, CopyError> {
        let fields = value.as_object().unwrap().fields();
        Ok(Value::Tuple(TupleValue::new(self.pair, fields)))
    }

    fn from_surrogate(&self, surrogate: &Value) -> Result<Value, CopyError> {
        let items = surrogate.as_tuple().unwrap().items().to_vec();
        Ok(Value::object(self.money, items))
    }
}

/// `Box<T>` <-> its item.
struct Unboxed {
    boxed: Ty,
    item: Ty,
}

impl Converter for Unboxed {
    fn name(&self) -> &str {
        "Unboxed"
    }

    fn source_type(&self) -> Ty {
        self.boxed
    }

    fn surrogate_type(&self) -> Ty {
        self.item
    }

    fn to_surrogate(&self, value: &Value) -> Result<Value, CopyError> {
        Ok(field(value, 0))
    }

    fn from_surrogate(&self, surrogate: &Value) -> Result<Value, CopyError> {
        Ok(Value::object(self.boxed, vec![surrogate.clone()]))
    }
}

fn money_replicator(m: &Model) -> Replicator {
    let converter = Arc::new(MoneyAsPair {
        money: m.money,
        pair: m.money_pair,
    });
    let mut builder = m.builder().with_services(crate::common::fieldwise());
    builder
        .register_converter(m.money, ConverterRegistration::instance(converter))
        .unwrap();
    Replicator::new(builder.build())
}

#[test]
fn copy_matches_converting_through_the_surrogate() {
    let m = model();
    let replicator = money_replicator(&m);
    let converter = MoneyAsPair {
        money: m.money,
        pair: m.money_pair,
    };
    let price = Value::object(m.money, vec![Value::i64(1999), Value::str("EUR")]);

    let copy = replicator.deep_copy(&price).unwrap();
    let surrogate = converter.to_surrogate(&price).unwrap();
    let expected = converter
        .from_surrogate(&replicator.deep_copy(&surrogate).unwrap())
        .unwrap();

    assert!(copy.structural_eq(&expected));
    assert!(!copy.ptr_eq(&price));
    assert_eq!(
        replicator.registry().require(m.money).unwrap().strategy_name(),
        "surrogate"
    );
}

#[test]
fn generic_converter_sees_the_instantiation() {
    let m = model();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut builder = m.builder().with_services(crate::common::fieldwise());
    {
        let seen = Arc::clone(&seen);
        builder
            .register_converter(
                m.box_def,
                ConverterRegistration::new(move |ty, args| {
                    seen.lock().push((ty, args.to_vec()));
                    Ok(Arc::new(Unboxed {
                        boxed: ty,
                        item: args[0],
                    }))
                }),
            )
            .unwrap();
    }
    let replicator = Replicator::new(builder.build());

    let inner = m.node(5, Value::Null);
    let boxed = Value::object(m.box_node, vec![inner.clone()]);
    let copy = replicator.deep_copy(&boxed).unwrap();

    assert_eq!(*seen.lock(), vec![(m.box_node, vec![m.node])]);
    assert!(copy.structural_eq(&boxed));
    assert!(!field(&copy, 0).ptr_eq(&inner));
}

#[test]
fn converter_must_describe_the_registered_type() {
    let m = model();
    let mut builder = m.builder();
    builder
        .register_converter(
            m.node,
            ConverterRegistration::instance(Arc::new(MoneyAsPair {
                money: m.money,
                pair: m.money_pair,
            })),
        )
        .unwrap();
    let registry = builder.build();

    assert_eq!(
        registry.require(m.node).err(),
        Some(CopyError::ConverterMismatch {
            converter: "MoneyAsPair".to_owned(),
            expected: "Node".to_owned(),
            found: "Money".to_owned(),
        })
    );
}
