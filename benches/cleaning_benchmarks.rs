use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ordereda::application::{Analysis, DatasetPreparer};
use ordereda::domain::entity::{CleaningConfig, MissingValueStrategy, RawTable};
use ordereda::infrastructure::parser::DelimitedParser;
use strum::IntoEnumIterator;

const CATEGORIES: [&str; 4] = ["Books", "Toys", "Games", "Garden"];

// 欠損・重複・不正値を一定の割合で含む注文データを生成する
fn build_orders(rows: usize) -> String {
    let mut csv = String::from("order_id,customer_id,product_id,order_date,price,quantity,category\n");
    for i in 0..rows {
        let id = if i % 50 == 0 && i > 0 { i - 1 } else { i };
        let day = 1 + (i % 28);
        let price = if i % 17 == 0 { String::new() } else { format!("{:.2}", (i % 97) as f64 * 1.5 - 3.0) };
        let quantity = if i % 23 == 0 { String::new() } else { (i % 6).to_string() };
        let category = if i % 31 == 0 { "" } else { CATEGORIES[i % CATEGORIES.len()] };
        let date = if i % 41 == 0 { "n/a".to_string() } else { format!("2024-02-{:02} 10:{:02}:00", day, i % 60) };
        let row = if id == i {
            format!("{},C{},P{},{},{},{},{}\n", id, id % 300, id % 40, date, price, quantity, category)
        } else {
            // 直前の行と同じ内容を重複として入れる
            csv.lines().last().map(|l| format!("{}\n", l)).unwrap_or_default()
        };
        csv.push_str(&row);
    }
    csv
}

fn parse(rows: usize) -> RawTable {
    DelimitedParser::default()
        .parse("bench", build_orders(rows).as_bytes())
        .expect("generated input parses")
}

fn bench_parse(c: &mut Criterion) {
    let input = build_orders(10_000);
    let parser = DelimitedParser::default();
    c.bench_function("parse_10k_rows", |b| {
        b.iter(|| black_box(parser.parse("bench", black_box(input.as_bytes()))))
    });
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");
    for rows in [1_000, 10_000] {
        let raw = parse(rows);
        for strategy in MissingValueStrategy::iter() {
            let preparer = DatasetPreparer::new(CleaningConfig::with_strategy(strategy));
            group.bench_with_input(BenchmarkId::new(strategy.to_string(), rows), &raw, |b, raw| {
                b.iter(|| black_box(preparer.prepare(raw)))
            });
        }
    }
    group.finish();
}

fn bench_views(c: &mut Criterion) {
    let prepared = DatasetPreparer::new(CleaningConfig::with_strategy(MissingValueStrategy::FillConstant))
        .prepare(&parse(10_000));
    let analysis = Analysis::of(&prepared);

    c.bench_function("time_series_10k_rows", |b| b.iter(|| black_box(analysis.time_series())));
    c.bench_function("correlation_10k_rows", |b| b.iter(|| black_box(analysis.correlation())));
    c.bench_function("univariate_price_10k_rows", |b| b.iter(|| black_box(analysis.univariate("price"))));
}

criterion_group!(benches, bench_parse, bench_prepare, bench_views);
criterion_main!(benches);
