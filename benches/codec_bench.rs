use bppm::{compress, decompress, Config, Silent};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_config() -> Config {
    Config {
        memory_mib: 16,
        order_limit: 4,
    }
}

fn text_input() -> Vec<u8> {
    let phrase = b"it was the best of times, it was the worst of times. ";
    phrase.iter().cycle().take(1 << 16).copied().collect()
}

fn random_input() -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0xBE7C);
    let mut buf = vec![0u8; 1 << 16];
    rng.fill(&mut buf[..]);
    buf
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    let config = bench_config();

    let text = text_input();
    group.bench_function("text_64k", |b| {
        b.iter(|| compress(&text, &config, &mut Silent).unwrap())
    });

    let random = random_input();
    group.bench_function("random_64k", |b| {
        b.iter(|| compress(&random, &config, &mut Silent).unwrap())
    });
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");
    let config = bench_config();

    let text_code = compress(&text_input(), &config, &mut Silent).unwrap();
    group.bench_function("text_64k", |b| {
        b.iter(|| decompress(&text_code, &config, &mut Silent).unwrap())
    });

    let random_code = compress(&random_input(), &config, &mut Silent).unwrap();
    group.bench_function("random_64k", |b| {
        b.iter(|| decompress(&random_code, &config, &mut Silent).unwrap())
    });
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
