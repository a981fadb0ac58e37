//! Benchmarks pour le parsing KOF

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kof::parser::layout::DEFAULT_HEADER;
use kof::ParseOptions;

/// Fichier synthétique: points isolés, lignes et polygones
fn synthetic_kof(groups: usize, with_header: bool) -> String {
    let mut content = String::new();
    if with_header {
        content.push_str(DEFAULT_HEADER);
        content.push('\n');
    }

    for g in 0..groups {
        let north = 6_540_000.0 + g as f64 * 25.0;
        let east = 314_000.0 + g as f64 * 10.0;
        let row = |name: String, dn: f64, de: f64| {
            if with_header {
                format!(
                    "05 {:<10} {:<8} {:>12.3} {:>11.3} {:>8.3}\n",
                    name,
                    "8001",
                    north + dn,
                    east + de,
                    12.5
                )
            } else {
                format!("05 {} 8001 {:.3} {:.3} 12.500\n", name, north + dn, east + de)
            }
        };

        content.push_str(&row(format!("P{g}"), 0.0, 0.0));
        content.push_str("09 91\n");
        for i in 0..4 {
            content.push_str(&row(format!("L{g}-{i}"), f64::from(i), 1.0));
        }
        content.push_str("09 99\n09 91\n");
        for (dn, de) in [(0.0, 0.0), (0.0, 5.0), (5.0, 5.0), (5.0, 0.0)] {
            content.push_str(&row(format!("F{g}"), dn + 10.0, de));
        }
        content.push_str("09 96\n");
    }
    content
}

fn bench_parse_modes(c: &mut Criterion) {
    let options = ParseOptions::default();
    let mut group = c.benchmark_group("parse_modes");

    for (label, with_header) in [("tokens", false), ("columns", true)] {
        let content = synthetic_kof(1_000, with_header);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &content, |b, content| {
            b.iter(|| {
                let result = kof::parse_str(black_box(content), &options);
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_decode_bytes(c: &mut Criterion) {
    let content = synthetic_kof(1_000, false);
    let bytes = content.into_bytes();

    let mut group = c.benchmark_group("decode_bytes");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("utf8", |b| {
        b.iter(|| black_box(kof::reader::decode_bytes(black_box(&bytes))))
    });
    group.finish();
}

criterion_group!(benches, bench_parse_modes, bench_decode_bytes);
criterion_main!(benches);
