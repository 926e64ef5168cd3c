//! Performance benchmarks for Annomics
//!
//! Run with: cargo bench

use annomics::bed::BedRecordView;
use annomics::core::{
    join_regions, join_regions_parallel, summarize_sample, AnnotateOptions, AnnotationType, Annotator,
    GenomeBuild, GenomicInterval, Strand, TrackIndex, TrackRecord, TrackSet,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const CHROMS: [&str; 4] = ["chr1", "chr2", "chr3", "chrX"];

/// Deterministic pseudo-random generator so runs are comparable
fn lcg(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    *state >> 33
}

fn synthetic_track(count: usize, seed: u64) -> Vec<TrackRecord> {
    let mut state = seed;
    (0..count)
        .map(|i| {
            let chrom = CHROMS[i % CHROMS.len()];
            let start = lcg(&mut state) % 200_000_000;
            let len = 200 + lcg(&mut state) % 5_000;
            TrackRecord::new(chrom, start, start + len, format!("f:{}", i + 1))
        })
        .collect()
}

fn synthetic_regions(count: usize) -> Vec<GenomicInterval> {
    let mut state = 42;
    (0..count)
        .map(|i| {
            let start = lcg(&mut state) % 200_000_000;
            GenomicInterval::new(CHROMS[i % CHROMS.len()], start, start + 1_000, Strand::Unknown)
        })
        .collect()
}

fn synthetic_tracks(features: usize) -> TrackSet {
    let types = [AnnotationType::CpgIslands, AnnotationType::Exons, AnnotationType::Promoters];
    let tracks = types
        .iter()
        .enumerate()
        .map(|(i, t)| TrackIndex::from_records(t.provider_key(GenomeBuild::Hg19), *t, synthetic_track(features, i as u64 + 1)))
        .collect();
    TrackSet::from_tracks(GenomeBuild::Hg19, tracks)
}

/// Benchmark building a track index
fn bench_track_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_index");
    for size in [10_000usize, 100_000] {
        let records = synthetic_track(size, 7);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| {
                let index = TrackIndex::from_records("hg19_cpg_islands", AnnotationType::CpgIslands, records.clone());
                black_box(index)
            })
        });
    }
    group.finish();
}

/// Benchmark the overlap join, sequential and parallel
fn bench_join(c: &mut Criterion) {
    let tracks = synthetic_tracks(100_000);
    let mut group = c.benchmark_group("join");
    for size in [10_000usize, 100_000] {
        let regions = synthetic_regions(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("sequential", size), &regions, |b, regions| {
            b.iter(|| black_box(join_regions(regions, &tracks)))
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), &regions, |b, regions| {
            b.iter(|| black_box(join_regions_parallel(regions, &tracks)))
        });
    }
    group.finish();
}

/// Benchmark annotation plus summary for one sample
fn bench_annotate_and_summarize(c: &mut Criterion) {
    let annotator = match Annotator::with_tracks(AnnotateOptions::new(GenomeBuild::Hg19), synthetic_tracks(50_000)) {
        Ok(annotator) => annotator,
        Err(e) => {
            eprintln!("Skipping annotate benchmark: {}", e);
            return;
        }
    };
    let regions = synthetic_regions(50_000);

    c.bench_function("annotate_and_summarize_50k", |b| {
        b.iter(|| {
            let dataset = annotator.annotate("bench", regions.clone());
            black_box(summarize_sample(&dataset))
        })
    });
}

/// Benchmark BED line parsing
fn bench_bed_parsing(c: &mut Criterion) {
    let lines = [
        ("bed3", "chr1\t1000000\t1001000"),
        ("bed6", "chr1\t1000000\t1001000\tpeak_1\t500\t+"),
        ("bed12", "chr1\t1000000\t1001000\tgene\t0\t-\t1000100\t1000900\t0,0,0\t2\t100,200\t0,800"),
    ];
    let mut group = c.benchmark_group("bed_parse");
    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(BedRecordView::parse(line.as_bytes())))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_track_indexing,
    bench_join,
    bench_annotate_and_summarize,
    bench_bed_parsing,
);
criterion_main!(benches);
