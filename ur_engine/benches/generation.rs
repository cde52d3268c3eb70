//! Generation benchmarks over a list-heavy form

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};
use ur_engine::prelude::*;

fn line_items() -> Field {
    let item = FieldDefinition::object(vec![
        ("lineId", FieldDefinition::string()),
        ("description", FieldDefinition::string()),
        (
            "label",
            FieldDefinition::string().with_automatic_value(Expression::call(
                Builtin::Concat,
                vec![(
                    "values",
                    Expression::list(vec![
                        Expression::self_path("lineId"),
                        Expression::string(": "),
                        Expression::self_path("description"),
                    ]),
                )],
            )),
        ),
        (
            "net",
            FieldDefinition::number().with_automatic_value(Expression::sum(
                Expression::self_path("amount"),
                Expression::self_segments(&["..", "surcharge"]),
            )),
        ),
        ("amount", FieldDefinition::number()),
    ]);
    Field::new("lines", FieldDefinition::list(item, "lineId"))
}

fn data(rows: usize) -> Value {
    let lines: Vec<Value> = (0..rows)
        .map(|i| json!({"lineId": format!("l{}", i), "description": "Service", "amount": i}))
        .collect();
    json!({"surcharge": 5, "lines": lines})
}

fn engine(rows: usize) -> ReportingEngine {
    let config = EngineConfig::new(EnginePreferences::default()).with_sequential_ids("bench");
    ReportingEngine::new(vec![line_items()], vec![], data(rows), config)
        .unwrap_or_else(|e| panic!("benchmark form must build: {}", e))
}

fn edit(key: &str, value: Value) -> Map<String, Value> {
    Map::from_iter([(key.to_string(), value)])
}

/// Build plus the first generation, every node dirty
fn bench_initial_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("initial_generation");

    for rows in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                let mut engine = engine(rows);
                black_box(engine.run_generation().ok());
            });
        });
    }

    group.finish();
}

/// One edit that fans out to every row
fn bench_fan_out_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out_edit");

    for rows in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            let mut engine = engine(rows);
            let _ = engine.run_generation();
            let mut surcharge = 0;

            b.iter(|| {
                surcharge += 1;
                engine.submit_edit("bench", "data", edit("surcharge", json!(surcharge)));
                black_box(engine.run_generation().ok());
            });
        });
    }

    group.finish();
}

/// A generation with nothing dirty
fn bench_quiet_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("quiet_generation");

    for rows in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            let mut engine = engine(rows);
            let _ = engine.run_generation();

            b.iter(|| {
                black_box(engine.run_generation().ok());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_initial_generation,
    bench_fan_out_edit,
    bench_quiet_generation
);
criterion_main!(benches);
