use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use keepsake::{Definition, Store, Value, ValueObjectType};
use serde_json::json;

fn person(store: &Store) -> ValueObjectType {
    let email = ValueObjectType::define_in(
        store,
        "Email",
        Definition::new().validate(|ctx| ctx.value().as_str().is_some_and(|s| s.contains('@'))),
    )
    .expect("email");
    ValueObjectType::define_in(
        store,
        "Person",
        Definition::new()
            .validate(|ctx| ctx.get_str("value.name").is_some())
            .pre_parse("email", |ctx| Ok(ctx.get("value.email").into()))
            .composite("email", &email)
            .post_parse("initial", |ctx| {
                let name = ctx.get_str("name");
                Ok(name.and_then(|name| name.chars().next()).map(String::from).into())
            }),
    )
    .expect("person")
}

fn raw(n: u64) -> Value {
    Value::from(json!({
        "name": format!("Person {n}"),
        "email": format!("person{n}@example.org"),
        "tags": ["a", "b", { "nested": n }],
    }))
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let store = Store::default();
    let person = person(&store);

    let hit = raw(0);
    person.construct(hit.clone()).expect("warm up");
    c.bench_function("construct hit", |b| b.iter(|| person.construct(black_box(hit.clone()))));

    let mut n = 1;
    c.bench_function("construct miss", |b| {
        b.iter(|| {
            n += 1;
            person.construct(black_box(raw(n)))
        })
    });
    println!("{} instances, {} shared values", store.len(), store.value_count());

    c.bench_function("validate", |b| b.iter(|| person.validate(black_box(hit.clone()))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
