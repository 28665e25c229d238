// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for PPD parsing and native job-status mapping in the
// spoolwerk-bridge crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use spoolwerk_bridge::cups::map_job_state;
use spoolwerk_bridge::cups::ppd::PpdFile;
use spoolwerk_bridge::winspool::api::job_status;
use spoolwerk_bridge::winspool::map_job_status;

// ---------------------------------------------------------------------------
// Helper: synthesise a driver definition of a given size
// ---------------------------------------------------------------------------

/// A PPD with `options` UI groups of `choices` choices each, plus the
/// comment and multi-line invocation noise real vendor files carry.
fn build_ppd(options: usize, choices: usize) -> String {
    let mut ppd = String::from("*PPD-Adobe: \"4.3\"\n*FormatVersion: \"4.3\"\n");
    ppd.push_str("*% Generated for benchmarking\n*ModelName: \"Bench LaserJet\"\n");
    for o in 0..options {
        ppd.push_str(&format!("*OpenUI *Option{o}/Option {o}: PickOne\n"));
        ppd.push_str(&format!("*DefaultOption{o}: Choice{}\n", choices / 2));
        for c in 0..choices {
            ppd.push_str(&format!(
                "*Option{o} Choice{c}/Choice {c}: \"<</Option{o} {c}>>\n  setpagedevice\"\n*End\n"
            ));
        }
        ppd.push_str(&format!("*CloseUI: *Option{o}\n"));
    }
    ppd.push_str("*OpenUI *PageSize/Media Size: PickOne\n*DefaultPageSize: A4\n");
    ppd.push_str("*PageSize Letter/US Letter: \"<</PageSize[612 792]>>setpagedevice\"\n");
    ppd.push_str("*PageSize A4/A4: \"<</PageSize[595 842]>>setpagedevice\"\n");
    ppd.push_str("*CloseUI: *PageSize\n");
    ppd
}

/// Benchmark parsing small and vendor-sized PPDs.
fn bench_parse_ppd(c: &mut Criterion) {
    let small = build_ppd(4, 4);
    c.bench_function("parse_ppd (4 options)", |b| {
        b.iter(|| {
            let ppd = PpdFile::parse(black_box(&small));
            assert!(ppd.is_ok());
        });
    });

    let large = build_ppd(80, 12);
    c.bench_function("parse_ppd (80 options x 12 choices)", |b| {
        b.iter(|| {
            let ppd = PpdFile::parse(black_box(&large));
            assert!(ppd.is_ok());
        });
    });
}

/// Benchmark building the driver option tree from a parsed PPD.
fn bench_driver_options(c: &mut Criterion) {
    let ppd = match PpdFile::parse(&build_ppd(80, 12)) {
        Ok(ppd) => ppd,
        Err(e) => panic!("benchmark PPD rejected: {e}"),
    };
    c.bench_function("driver_options (80 options)", |b| {
        b.iter(|| black_box(black_box(&ppd).driver_options()));
    });
}

/// Benchmark both native status mappings.
fn bench_status_mapping(c: &mut Criterion) {
    let bits = job_status::PAUSED | job_status::PRINTING | job_status::PAPEROUT;
    c.bench_function("map_job_status (winspool bitmask)", |b| {
        b.iter(|| black_box(map_job_status(black_box(bits))));
    });
    c.bench_function("map_job_state (ipp job-state)", |b| {
        b.iter(|| {
            for state in 3..=9 {
                black_box(map_job_state(black_box(state)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_parse_ppd,
    bench_driver_options,
    bench_status_mapping,
);
criterion_main!(benches);
