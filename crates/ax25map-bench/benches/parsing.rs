use ax25map_bench::util::generate_synthetic_log;
use ax25map_index::{BuilderOptions, LineParser, build_topology};
use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_parse_lines(c: &mut Criterion) {
    let log = generate_synthetic_log(5_000, 200);
    let parser = LineParser::default();

    c.bench_function("parse_15k_lines", |b| {
        b.iter(|| {
            let frames = log
                .iter()
                .filter_map(|line| parser.parse_line(black_box(line)))
                .count();
            black_box(frames);
        })
    });
}

fn bench_full_rebuild(c: &mut Criterion) {
    let log = generate_synthetic_log(5_000, 200);

    c.bench_function("build_topology_5k_frames", |b| {
        b.iter(|| {
            let graph = build_topology(black_box(&log), BuilderOptions::default(), Utc::now());
            black_box(graph);
        })
    });
}

criterion_group!(benches, bench_parse_lines, bench_full_rebuild);
criterion_main!(benches);
