use std::fmt::Write;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rowbind_reader::{Options, Reader};
use rowbind_tests::{Measurement, Person};

fn measurements(rows: usize) -> String {
    let mut text = String::new();
    for i in 0..rows {
        writeln!(text, "{i},{}.5", i % 97).unwrap();
    }
    text
}

fn people(rows: usize) -> String {
    let mut text = String::from("id,name,age\n");
    for i in 0..rows {
        writeln!(text, "{i},person{i},{}", i % 90).unwrap();
    }
    text
}

fn bench_pull_vs_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_bound");
    for rows in [100, 10_000] {
        let input = measurements(rows);
        group.throughput(Throughput::Bytes(input.len() as u64));

        group.bench_with_input(BenchmarkId::new("pull", rows), &input, |b, input| {
            b.iter(|| {
                let mut reader = Reader::new(std::io::Cursor::new(input.clone()), Options::default());
                let mut row = Measurement::default();
                let mut sum = 0i64;
                while reader.read(&mut row) {
                    sum += row.int;
                }
                reader.done().unwrap();
                sum
            });
        });

        group.bench_with_input(BenchmarkId::new("collect", rows), &input, |b, input| {
            b.iter(|| {
                let mut reader = Reader::new(std::io::Cursor::new(input.clone()), Options::default());
                let mut out: Vec<Measurement> = Vec::with_capacity(rows);
                reader.read_all(&mut out).unwrap();
                out.len()
            });
        });
    }
    group.finish();
}

fn bench_header_bound(c: &mut Criterion) {
    let input = people(10_000);
    let mut group = c.benchmark_group("name_bound");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("visit", |b| {
        b.iter(|| {
            let mut reader = Reader::new(std::io::Cursor::new(input.clone()), Options::default());
            let mut total = 0u64;
            reader.for_each(|p: Person| total += u64::from(p.age)).unwrap();
            total
        });
    });
    group.bench_function("sequence", |b| {
        b.iter(|| {
            let mut reader = Reader::new(std::io::Cursor::new(input.clone()), Options::default());
            let mut rows: Vec<Vec<String>> = Vec::new();
            reader.read_all(&mut rows).unwrap();
            rows.len()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_pull_vs_collect, bench_header_bound);
criterion_main!(benches);
