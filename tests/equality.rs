use keepsake::{
    ConstructionError, Context, Definition, KeyOrder, Node, Settings, Store, Value, ValueObjectType,
};
use serde_json::json;

fn plain(store: &Store, name: &str) -> ValueObjectType {
    ValueObjectType::define_in(store, name, Definition::new().validate(|_| true)).expect("type")
}

#[test]
fn equal_input_yields_the_same_instance() {
    let store = Store::default();
    let p = plain(&store, "P");
    let first = p.construct("x").expect("first");
    let second = p.construct("x").expect("second");
    assert!(first.is_same(&second));
    assert_eq!(first, second);
    assert_eq!(first.to_string(), "\"x\"");
    assert_eq!(store.count(p.key()), 1);
}

#[test]
fn equal_records_yield_the_same_instance() {
    let store = Store::default();
    let p = plain(&store, "P");
    let first = p.construct(json!({ "key": { "second": [1, 2, "three"] } })).expect("first");
    let second = p.construct(json!({ "key": { "second": [1, 2, "three"] } })).expect("second");
    let different = p.construct(json!({ "key": { "second": [1, 2, "four"] } })).expect("different");
    assert!(first.is_same(&second));
    assert!(!first.is_same(&different));
    assert_ne!(first, different);
}

#[test]
fn equal_input_of_different_shapes_stays_apart() {
    let store = Store::default();
    let p = plain(&store, "P");
    let text = p.construct("1").expect("text");
    let number = p.construct(1i64).expect("number");
    let list = p.construct(json!(["1"])).expect("list");
    assert!(!text.is_same(&number));
    assert!(!text.is_same(&list));
    assert_eq!(store.count(p.key()), 3);
}

#[test]
fn integral_floats_equal_the_integer() {
    let store = Store::default();
    let p = plain(&store, "P");
    let number = p.construct(1i64).expect("number");
    let float = p.construct(json!(1.0)).expect("float");
    assert!(number.is_same(&float));
    // the first one kept decides the published text
    assert_eq!(float.to_string(), "1");

    let half = p.construct(json!(1.5)).expect("half");
    assert!(!number.is_same(&half));
    let nested = p.construct(json!({ "n": [2.0] })).expect("nested");
    assert!(nested.is_same(&p.construct(json!({ "n": [2] })).expect("again")));
    assert_eq!(store.count(p.key()), 3);
}

#[test]
fn field_order_matters_by_default() {
    let store = Store::default();
    let p = plain(&store, "P");
    let ab = p.construct(json!({ "a": 1, "b": 2 })).expect("ab");
    let ba = p.construct(json!({ "b": 2, "a": 1 })).expect("ba");
    assert!(!ab.is_same(&ba));
}

#[test]
fn field_order_can_be_ignored() {
    let settings = Settings {
        key_order: KeyOrder::Sorted,
        ..Settings::default()
    };
    let store = Store::from_settings(&settings);
    let p = plain(&store, "P");
    let ab = p.construct(json!({ "a": 1, "b": 2 })).expect("ab");
    let ba = p.construct(json!({ "b": 2, "a": 1 })).expect("ba");
    assert!(ab.is_same(&ba));
    // the first one kept decides the order that is published
    assert_eq!(ba.to_string(), r#"{"a":1,"b":2}"#);
}

#[test]
fn derived_values_are_shared_across_types() {
    let store = Store::default();
    let split = |ctx: &mut Context| -> Result<Node, ConstructionError> {
        Ok(ctx.value().as_str().and_then(|s| s.split('.').nth(1)).into())
    };
    let splitting = || Definition::new().validate(|_| true).pre_parse("parsed", split);
    let a = ValueObjectType::define_in(&store, "A", splitting()).expect("a");
    let b = ValueObjectType::define_in(&store, "B", splitting()).expect("b");

    let from_a = a.construct("test.parsed").expect("from a");
    let from_b = b.construct("other.parsed").expect("from b");
    assert!(!from_a.is_same(&from_b));
    assert!(from_a.get("parsed").expect("a").is_same(from_b.get("parsed").expect("b")));
}

#[test]
fn nested_values_are_shared_between_instances() {
    let store = Store::default();
    let p = plain(&store, "P");
    let q = plain(&store, "Q");
    let a = p.construct(json!({ "test": { "again": "value" } })).expect("a");
    let b = q.construct(json!({ "again": "value" })).expect("b");

    let nested = a.path("test").expect("a.test");
    assert!(nested.is_same(b.value()));
    assert!(a.path("test.again").expect("a.test.again").is_same(b.get("again").expect("b.again")));
    // the mirrored property and the field inside the value are one record
    assert!(nested.is_same(a.path("value.test").expect("a.value.test")));
}

#[test]
fn composites_are_keyed_by_their_own_type() {
    let store = Store::default();
    let c = plain(&store, "C");
    let d = plain(&store, "D");
    let owner = ValueObjectType::define_in(
        &store,
        "Owner",
        Definition::new()
            .validate(|_| true)
            .pre_parse("c", |ctx| Ok(ctx.value().clone()))
            .pre_parse("d", |ctx| Ok(ctx.value().clone()))
            .composite("c", &c)
            .composite("d", &d),
    )
    .expect("owner");
    let instance = owner.construct("same").expect("instance");
    let from_c = instance.get("c").and_then(Value::as_instance).expect("c");
    let from_d = instance.get("d").and_then(Value::as_instance).expect("d");
    assert!(!from_c.is_same(from_d));
    assert_eq!(from_c.value_of(), from_d.value_of());
}
