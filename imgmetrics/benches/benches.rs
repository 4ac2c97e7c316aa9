use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imgmetrics::{compute_psnr, compute_ssim, Rgb8Image};
use rand::{Rng, SeedableRng};

fn make_pair(width: usize, height: usize) -> (Rgb8Image, Rgb8Image) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let source: Vec<[u8; 3]> = (0..width * height)
        .map(|_| [rng.gen(), rng.gen(), rng.gen()])
        .collect();
    let distorted = source
        .iter()
        .map(|px| px.map(|v| v.saturating_add(rng.gen_range(0..8))))
        .collect();

    (
        Rgb8Image::new(source, width, height),
        Rgb8Image::new(distorted, width, height),
    )
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    for size in [256usize, 512, 1024] {
        let (source, distorted) = make_pair(size, size);

        group.bench_with_input(BenchmarkId::new("psnr", size), &size, |b, _| {
            b.iter(|| compute_psnr(black_box(&source), black_box(&distorted)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("ssim", size), &size, |b, _| {
            b.iter(|| compute_ssim(black_box(&source), black_box(&distorted)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_metrics);
criterion_main!(benches);
