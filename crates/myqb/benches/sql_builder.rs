use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use myqb::{FieldMap, QueryBuilder, table};

/// Build a SELECT over `n` columns with `n` equality conditions:
/// SELECT `col0`, ... FROM `t` WHERE `col0`=0 AND `col1`=1 ...
fn build_select(n: usize) -> QueryBuilder {
    let columns: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
    let mut map = FieldMap::new();
    for (i, column) in columns.iter().enumerate() {
        map = map.entry(column.clone(), i as i64);
    }
    table("t").select(&refs).where_cond(map)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/build");

    for n in [1, 5, 10, 50, 100] {
        let qb = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &qb, |b, qb| {
            b.iter(|| black_box(qb.build().unwrap()));
        });
    }

    group.finish();
}

fn bench_configure_and_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/configure_and_build");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let qb = build_select(n);
                black_box(qb.build().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_insert_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/insert_batch");

    for n in [5, 20, 100, 500] {
        let rows: Vec<myqb::Row> = (0..n)
            .map(|i| {
                myqb::Row::new()
                    .col("id", i as i64)
                    .col("name", format!("user{i}"))
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| {
                let qb = table("users").insert(rows.clone());
                black_box(qb.build().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_configure_and_build, bench_insert_batch);
criterion_main!(benches);
