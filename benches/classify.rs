use criterion::{criterion_group, criterion_main, Criterion};
use std::path::{Path, PathBuf};

use mboxstat::config::Config;
use mboxstat::parser::archive::ArchiveSource;
use mboxstat::scan::Scanner;
use mboxstat::stats::Aggregator;

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("sample.mbox")
}

fn text_sniff(_: &[u8]) -> String {
    "text/plain".to_string()
}

fn bench_scan_headers(c: &mut Criterion) {
    let config = Config::default();
    let source = ArchiveSource::Mbox(fixture_path());

    c.bench_function("scan_headers_only", |b| {
        b.iter(|| {
            let scanner = Scanner::new(&config, &text_sniff, false);
            let mut aggregator = Aggregator::new();
            scanner
                .scan(&source, &mut aggregator, &mut |_, _| Ok(()), None)
                .unwrap()
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let config = Config::default();
    let raw = std::fs::read(fixture_path()).unwrap();

    c.bench_function("classify_message", |b| {
        let scanner = Scanner::new(&config, &text_sniff, true);
        b.iter(|| {
            let mut aggregator = Aggregator::new();
            scanner.process_message(&raw, &mut aggregator)
        })
    });
}

criterion_group!(benches, bench_scan_headers, bench_classify);
criterion_main!(benches);
