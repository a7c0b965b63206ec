use keepsake::{Definition, Store, Value, ValueObjectType};
use serde_json::json;

fn plain(store: &Store, name: &str) -> ValueObjectType {
    ValueObjectType::define_in(store, name, Definition::new().validate(|_| true)).expect("type")
}

#[test]
fn strings_encode_as_json_text() {
    let store = Store::default();
    let p = plain(&store, "P");
    assert_eq!(p.construct("x").expect("x").to_string(), "\"x\"");
    assert_eq!(p.construct("say \"hi\"").expect("quoted").to_string(), r#""say \"hi\"""#);
    assert_eq!(p.construct(12i64).expect("number").to_string(), "12");
    assert_eq!(p.construct(true).expect("bool").to_string(), "true");
}

#[test]
fn records_keep_their_field_order() {
    let store = Store::default();
    let p = plain(&store, "P");
    let instance = p.construct(json!({ "zebra": 1, "apple": [null, false] })).expect("instance");
    assert_eq!(instance.to_string(), r#"{"zebra":1,"apple":[null,false]}"#);
}

#[test]
fn value_of_unwraps_nested_instances() {
    let store = Store::default();
    let email = plain(&store, "Email");
    let person = ValueObjectType::define_in(
        &store,
        "Person",
        Definition::new()
            .validate(|_| true)
            .pre_parse("email", |ctx| Ok(ctx.get("value.email").into()))
            .composite("email", &email),
    )
    .expect("person");
    let raw = json!({ "name": "Ann", "email": "ann@example.org" });
    let ann = person.construct(raw.clone()).expect("ann");

    assert!(matches!(ann.value().path("email"), Some(Value::Instance(_))));
    assert_eq!(ann.value_of(), raw);
    assert_eq!(ann.to_string(), r#"{"name":"Ann","email":"ann@example.org"}"#);
}

#[test]
fn text_decodes_back_to_the_plain_value() {
    let store = Store::default();
    let p = plain(&store, "P");
    for raw in [
        json!("text"),
        json!(3.5),
        json!([1, "two", { "three": [3] }]),
        json!({ "key1": { "key2": { "key3": "value" } } }),
    ] {
        let instance = p.construct(raw.clone()).expect("instance");
        let decoded: serde_json::Value = serde_json::from_str(&instance.to_string()).expect("json");
        assert_eq!(decoded, instance.value_of());
        assert_eq!(decoded, raw);
    }
}

#[test]
fn debug_output_names_the_type() {
    let store = Store::default();
    let p = plain(&store, "Money");
    let instance = p.construct(json!({ "amount": 5 })).expect("instance");
    assert_eq!(format!("{instance:?}"), r#"Money({"amount":5})"#);
}
