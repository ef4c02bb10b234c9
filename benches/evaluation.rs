use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use formwork::form::{compile, evaluate, options, CompileOptions, Condition, Dependency, Field, FormDefinition};
use formwork::rules::ChainAdapter;
use serde_json::{json, Value};

fn create_contacts_form() -> FormDefinition {
    FormDefinition::new(vec![
        Field::select("country", options([("United States", "US"), ("Canada", "CA")])),
        Field::input("state").dependency(Dependency::hides("country", Condition::not_equals("US"))),
        Field::array(
            "contacts",
            vec![
                Field::select("kind", options([("Email", "email"), ("Phone", "phone")])),
                Field::input("email")
                    .rules(".email()")
                    .dependency(Dependency::hides("kind", Condition::not_equals("email"))),
                Field::input("phone")
                    .rules(".min(7)")
                    .dependency(Dependency::hides("kind", Condition::not_equals("phone"))),
            ],
        ),
    ])
    .unwrap()
}

fn contacts(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            if i % 2 == 0 {
                json!({ "kind": "email", "email": format!("user{}@example.com", i) })
            } else {
                json!({ "kind": "phone", "phone": "5551234" })
            }
        })
        .collect();
    json!({ "country": "US", "state": "TX", "contacts": items })
}

fn benchmark_evaluate(c: &mut Criterion) {
    let definition = create_contacts_form();
    let mut group = c.benchmark_group("evaluate");

    for count in [1usize, 10, 100] {
        let values = contacts(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &values, |b, values| {
            b.iter(|| evaluate(black_box(&definition), black_box(values)));
        });
    }

    group.finish();
}

fn benchmark_validate(c: &mut Criterion) {
    let schema = compile(create_contacts_form(), &ChainAdapter, CompileOptions::default()).unwrap();
    let values = contacts(10);

    c.bench_function("validate_submission", |b| {
        b.iter(|| schema.validate(black_box(&values)));
    });
}

fn benchmark_compile(c: &mut Criterion) {
    let definition = create_contacts_form();

    c.bench_function("compile_definition", |b| {
        b.iter(|| compile(black_box(definition.clone()), &ChainAdapter, CompileOptions::default()).unwrap());
    });
}

criterion_group!(benches, benchmark_evaluate, benchmark_validate, benchmark_compile);
criterion_main!(benches);
