use keepsake::{ConstructionError, Definition, Instance, Store, Value, ValueObjectType};
use serde_json::json;

fn nested(store: &Store) -> ValueObjectType {
    ValueObjectType::define_in(
        store,
        "Nested",
        Definition::new()
            .validate(|_| true)
            .pre_parse("a.b", |ctx| Ok(ctx.value().clone())),
    )
    .expect("nested")
}

fn violation(path: &str) -> ConstructionError {
    ConstructionError::ImmutabilityViolation { path: path.to_string() }
}

#[test]
fn pre_parsed_properties_are_frozen_at_any_depth() {
    let store = Store::default();
    let overwrite = ValueObjectType::define_in(
        &store,
        "Overwrite",
        Definition::new()
            .validate(|_| true)
            .pre_parse("a.b", |ctx| Ok(ctx.value().clone()))
            .post_parse("z", |ctx| ctx.set("a.b", "z")),
    )
    .expect("overwrite");
    assert_eq!(overwrite.construct("v"), Err(violation("a.b")));
    // the same input without the offending post-parser publishes fine
    let instance = nested(&store).construct("v").expect("instance");
    assert_eq!(instance.path("a.b").and_then(Value::as_str), Some("v"));
}

#[test]
fn the_value_and_its_mirrors_are_frozen() {
    let store = Store::default();
    for path in ["value", "value.key1", "key1", "key1.key2.key3", "original"] {
        let target = path.to_string();
        let offending = ValueObjectType::define_in(
            &store,
            "Offending",
            Definition::new()
                .validate(|_| true)
                .post_parse("attempt", move |ctx| ctx.set(&target, "roar")),
        )
        .expect("offending");
        let raw = json!({ "key1": { "key2": { "key3": "value" } } });
        assert_eq!(offending.construct(raw), Err(violation(path)), "writing {path}");
    }
    assert_eq!(store.len(), 0);
    assert_eq!(store.value_count(), 0);
}

#[test]
fn composites_are_frozen_inside_the_owner() {
    let store = Store::default();
    let inner = ValueObjectType::define_in(&store, "Inner", Definition::new().validate(|_| true))
        .expect("inner");
    let owner = ValueObjectType::define_in(
        &store,
        "Owner",
        Definition::new()
            .validate(|_| true)
            .pre_parse("inner", |ctx| Ok(ctx.value().clone()))
            .composite("inner", &inner)
            .post_parse("attempt", |ctx| ctx.set("value.inner", "replaced")),
    )
    .expect("owner");
    assert_eq!(owner.construct("v"), Err(violation("value.inner")));
}

#[test]
fn a_failed_attempt_leaves_published_instances_alone() {
    let store = Store::default();
    let published = nested(&store).construct(json!({ "deep": [ { "x": 1 } ] })).expect("published");
    let before = published.to_string();

    let meddling = ValueObjectType::define_in(
        &store,
        "Meddling",
        Definition::new()
            .validate(|_| true)
            .post_parse("attempt", |ctx| ctx.set("deep", "gone")),
    )
    .expect("meddling");
    assert!(meddling.construct(json!({ "deep": [ { "x": 1 } ] })).is_err());
    assert_eq!(published.to_string(), before);
    assert_eq!(published.path("deep.0.x").and_then(Value::as_i64), Some(1));
}

#[test]
fn instances_can_be_shared_between_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Instance>();
    assert_send_sync::<Value>();
    assert_send_sync::<ValueObjectType>();
    assert_send_sync::<Store>();
}
