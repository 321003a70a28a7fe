//! End-to-end store/load tests driving the codec through the client

use std::io::Cursor;

use rust_decimal::Decimal;
use url::Url;
use uuid::Uuid;

use docmap_client::{ClientError, Datastore};
use docmap_core::{entity_model, Filter, Fk, Key};

#[derive(Debug, Default, Clone, PartialEq)]
struct Simple {
    bar: i64,
    baz: Option<String>,
}

entity_model! {
    Simple("Simple") {
        key bar: i64,
        baz: Option<String> as "_baz",
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Complex {
    id: i64,
    guid: Option<Uuid>,
    uri: Option<Url>,
    amount: Decimal,
    io: Option<Cursor<Vec<u8>>>,
}

entity_model! {
    Complex("Complex") {
        key id: i64,
        guid: Option<Uuid>,
        uri: Option<Url>,
        amount: Decimal,
        io: Option<Cursor<Vec<u8>>>,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Enumerable {
    id: i64,
    ints: Option<Vec<i32>>,
    chars: Vec<char>,
    floats: Vec<f32>,
}

entity_model! {
    Enumerable("Enumerable") {
        key id: i64,
        ints: Option<Vec<i32>>,
        chars: Vec<char>,
        floats: Vec<f32>,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct NestedEntities {
    id: i64,
    simple: Option<Simple>,
    complex: Option<Complex>,
    enumerable: Option<Enumerable>,
    simple_list: Vec<Simple>,
}

entity_model! {
    NestedEntities("NestedEntities") {
        key id: i64,
        simple: Option<Simple>,
        complex: Option<Complex>,
        enumerable: Option<Enumerable>,
        simple_list: Vec<Simple>,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct FkOwner {
    id: i64,
    simple: Option<Fk<Simple>>,
}

entity_model! {
    FkOwner("FkOwner") {
        key id: i64,
        simple: Option<Fk<Simple>> as "fkSimple",
    }
}

#[test]
fn simple_insert_and_lookup() {
    let db = Datastore::new();
    let mut x = Simple {
        bar: 0,
        baz: Some("Hello world!".to_string()),
    };
    let key = db.insert(&mut x).unwrap();
    assert_eq!(key.id(), Some(x.bar));

    let y: Simple = db.lookup(&key).unwrap().unwrap();
    assert_eq!(y.bar, x.bar);
    assert_eq!(y.baz, x.baz);
}

#[test]
fn delete_simple() {
    let db = Datastore::new();
    let mut x = Simple {
        bar: 0,
        baz: Some("Hello world!".to_string()),
    };
    let key = db.upsert(&mut x).unwrap();
    assert!(db.lookup::<Simple>(&key).unwrap().is_some());

    db.delete(&x).unwrap();
    assert!(db.lookup::<Simple>(&key).unwrap().is_none());
}

#[test]
fn update_roundtrip() {
    let db = Datastore::new();
    let mut x = Simple {
        bar: 0,
        baz: Some("before".to_string()),
    };
    let key = db.insert(&mut x).unwrap();

    x.baz = Some("after".to_string());
    db.update(&x).unwrap();

    let y: Simple = db.lookup(&key).unwrap().unwrap();
    assert_eq!(y.baz.as_deref(), Some("after"));
}

#[test]
fn complex_scalar_fields_roundtrip() {
    let db = Datastore::new();
    let mut x = Complex {
        id: 0,
        guid: Some(Uuid::new_v4()),
        uri: Some(Url::parse("http://google.ca/").unwrap()),
        amount: Decimal::from(987_654_321),
        io: Some(Cursor::new(b"hello world!".to_vec())),
    };
    let key = db.insert(&mut x).unwrap();

    let y: Complex = db.lookup(&key).unwrap().unwrap();
    assert_eq!(y.guid, x.guid);
    assert_eq!(y.uri, x.uri);
    assert_eq!(y.amount, x.amount);

    let stored = y.io.unwrap();
    assert_eq!(stored.position(), 0);
    assert_eq!(stored.get_ref(), x.io.as_ref().unwrap().get_ref());
}

#[test]
fn nested_entities_roundtrip() {
    let db = Datastore::new();
    let mut x = NestedEntities {
        id: 0,
        simple: Some(Simple {
            bar: 0,
            baz: Some("hello world!".to_string()),
        }),
        complex: Some(Complex {
            id: 0,
            guid: Some(Uuid::new_v4()),
            uri: Some(Url::parse("https://google.com/").unwrap()),
            amount: Decimal::from(99),
            io: None,
        }),
        enumerable: Some(Enumerable {
            id: 0,
            ints: None,
            chars: "hello world!".chars().collect(),
            floats: vec![
                f32::MIN,
                f32::MAX,
                0.0,
                f32::NEG_INFINITY,
                f32::INFINITY,
            ],
        }),
        simple_list: vec![
            Simple {
                bar: 0,
                baz: Some("Simple0".to_string()),
            },
            Simple {
                bar: 0,
                baz: Some("Simple1".to_string()),
            },
            Simple {
                bar: 0,
                baz: Some("Simple2".to_string()),
            },
        ],
    };
    let key = db.insert(&mut x).unwrap();

    let rt: NestedEntities = db.lookup(&key).unwrap().unwrap();
    assert_eq!(rt.id, x.id);
    assert_eq!(rt.simple, x.simple);
    assert_eq!(rt.enumerable, x.enumerable);
    assert_eq!(
        rt.simple_list
            .iter()
            .map(|s| s.baz.clone())
            .collect::<Vec<_>>(),
        x.simple_list
            .iter()
            .map(|s| s.baz.clone())
            .collect::<Vec<_>>()
    );

    let rt_complex = rt.complex.unwrap();
    let in_complex = x.complex.unwrap();
    assert_eq!(rt_complex.guid, in_complex.guid);
    assert_eq!(rt_complex.uri, in_complex.uri);
    assert_eq!(rt_complex.amount, in_complex.amount);
}

#[test]
fn renamed_fields_store_under_wire_name() {
    let db = Datastore::new();
    let mut x = Simple {
        bar: 99,
        baz: Some("hello world!".to_string()),
    };
    let key = db.insert(&mut x).unwrap();
    assert_eq!(key.id(), Some(99));

    // queries built from the property name agree with the stored name
    let hits: Vec<Simple> = db
        .query(&Filter::equal::<Simple, Option<String>>("baz", &x.baz).unwrap())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].baz, x.baz);

    let misses: Vec<Simple> = db
        .query(
            &Filter::equal::<Simple, Option<String>>("baz", &Some("nope".to_string())).unwrap(),
        )
        .unwrap();
    assert!(misses.is_empty());
}

#[test]
fn query_ordering_operators() {
    let db = Datastore::new();
    for (id, label) in [(1, "a"), (2, "b"), (3, "c")] {
        let mut x = Simple {
            bar: id,
            baz: Some(label.to_string()),
        };
        db.insert(&mut x).unwrap();
    }

    let ge: Vec<Simple> = db
        .query(&Filter::greater_than_or_equal::<Simple, i64>("bar", &2).unwrap())
        .unwrap();
    let mut ids: Vec<i64> = ge.iter().map(|s| s.bar).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn query_does_not_cross_kinds() {
    let db = Datastore::new();
    let mut s = Simple {
        bar: 50,
        baz: Some("only simple".to_string()),
    };
    db.insert(&mut s).unwrap();
    let mut c = Complex {
        id: 50,
        ..Complex::default()
    };
    db.insert(&mut c).unwrap();

    let hits: Vec<Simple> = db
        .query(&Filter::equal::<Simple, i64>("bar", &50).unwrap())
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn foreign_keys_store_as_key_references() {
    let db = Datastore::new();
    let mut target = Simple {
        bar: 33,
        baz: Some("hello world!".to_string()),
    };
    let target_key = db.insert(&mut target).unwrap();

    let mut owner = FkOwner {
        id: 31337,
        simple: Some(Fk::from_value(target.clone())),
    };
    let owner_key = db.insert(&mut owner).unwrap();

    let rt: FkOwner = db.lookup(&owner_key).unwrap().unwrap();
    assert_eq!(rt.id, 31337);
    let fk = rt.simple.unwrap();
    assert_eq!(fk.key(), Some(&target_key));
    // the wire holds only the reference, so the value must be re-fetched
    assert!(fk.value().is_none());

    let resolved: Simple = db.resolve_fk(&fk).unwrap().unwrap();
    assert_eq!(resolved, target);
}

#[test]
fn resolve_fk_of_deleted_target_is_none() {
    let db = Datastore::new();
    let fk = Fk::<Simple>::from_key(Key::with_id("Simple", 777));
    let resolved: Option<Simple> = db.resolve_fk(&fk).unwrap();
    assert!(resolved.is_none());
}

#[test]
fn insert_twice_conflicts() {
    let db = Datastore::new();
    let mut a = Simple {
        bar: 7,
        baz: None,
    };
    db.insert(&mut a).unwrap();

    let mut b = Simple {
        bar: 7,
        baz: Some("other".to_string()),
    };
    match db.insert(&mut b) {
        Err(ClientError::AlreadyExists(key)) => assert_eq!(key.id(), Some(7)),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    // upsert replaces instead
    db.upsert(&mut b).unwrap();
    let rt: Simple = db.lookup(&Key::with_id("Simple", 7)).unwrap().unwrap();
    assert_eq!(rt.baz.as_deref(), Some("other"));
}
