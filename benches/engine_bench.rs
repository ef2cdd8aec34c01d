//! Benchmarks for search execution and encoding detection.

use std::path::PathBuf;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use audit_parser::config::{SearchDefinition, SearchFlags};
use audit_parser::detect::detect_encoding;
use audit_parser::engine::{execute_all, ExecutionOptions};
use audit_parser::models::{OsFamily, Producer, System};

fn synthetic_system(index: usize, lines: usize) -> Arc<System> {
    let mut content = String::from("KPNIXVERSION: 0.6.22\n");
    for i in 0..lines {
        content.push_str(&format!(
            "Users_etcpasswd::user{}:x:{}:{}::/home/user{}:/bin/bash\n",
            i,
            1000 + i,
            1000 + i,
            i
        ));
        content.push_str(&format!("System_PackageInstalledSoftware::ii  pkg{}  1.{}.0  amd64\n", i % 200, i % 7));
    }
    Arc::new(System {
        system_name: format!("host{:03}", index),
        os_family: OsFamily::Linux,
        distro_family: None,
        producer: Producer::KpNixAudit,
        producer_version: "0.6.22".to_string(),
        source_path: PathBuf::from(format!("host{:03}.txt", index)),
        content,
        encoding: "UTF-8",
        encoding_confidence: 1.0,
        sha256: String::new(),
        discovery_index: index,
    })
}

fn definitions() -> Vec<SearchDefinition> {
    let mut users = SearchDefinition::new(
        "users",
        r"^Users_etcpasswd::(?P<user>[^:]*):[^:]*:(?P<uid>\d+)",
        SearchFlags::default(),
    )
    .unwrap();
    users.field_list = Some(vec!["user".to_string(), "uid".to_string()]);

    let mut packages = SearchDefinition::new(
        "packages",
        r"^System_PackageInstalledSoftware::ii\s+(?P<name>\S+)\s+(?P<version>\S+)",
        SearchFlags {
            unique: true,
            ..Default::default()
        },
    )
    .unwrap();
    packages.field_list = Some(vec!["name".to_string(), "version".to_string()]);

    vec![users, packages]
}

/// Benchmark execute_all with different worker counts
fn bench_execute_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute_all_workers");
    let systems: Vec<Arc<System>> = (0..16).map(|i| synthetic_system(i, 2_000)).collect();
    let definitions = definitions();
    let bytes: usize = systems.iter().map(|s| s.content.len()).sum();

    for workers in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Bytes((bytes * definitions.len()) as u64));
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            let options = ExecutionOptions {
                workers,
                ..Default::default()
            };
            b.iter(|| execute_all(black_box(&definitions), black_box(&systems), &options));
        });
    }

    group.finish();
}

/// Benchmark encoding detection on UTF-8 and UTF-16 input
fn bench_detect_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_encoding");
    let text = synthetic_system(0, 5_000).content.clone();

    let utf8 = text.as_bytes().to_vec();
    let mut utf16 = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        utf16.extend_from_slice(&unit.to_le_bytes());
    }

    for (name, bytes) in [("utf8", &utf8), ("utf16le_no_bom", &utf16)] {
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("detect", name), bytes, |b, bytes| {
            b.iter(|| detect_encoding(black_box(bytes)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_execute_workers, bench_detect_encoding);
criterion_main!(benches);
