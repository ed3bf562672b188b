use criterion::{black_box, criterion_group, criterion_main, Criterion};
use amlres::bitmap::{synth_bitmap, RGB565};
use amlres::codec::{gzip_compress, gzip_decompress};
use amlres::image::{self, Asset, PackOptions};
use amlres::{classify, CodecId, Container};

fn splash() -> Vec<u8> {
    synth_bitmap(1920, 1080, 16, Some(RGB565))
}

fn bench_gzip(c: &mut Criterion) {
    let data = splash();
    let gz   = gzip_compress(&data, 6);

    c.bench_function("gzip_compress_1080p_rgb565", |b| b.iter(|| gzip_compress(black_box(&data), 6)));
    c.bench_function("gzip_decompress_1080p_rgb565", |b| b.iter(|| gzip_decompress(black_box(&gz))));
    c.bench_function("classify_gzip_1080p_rgb565", |b| b.iter(|| classify(black_box(&gz))));
}

fn bench_pack_and_walk(c: &mut Criterion) {
    let assets: Vec<Asset> = ["bootup", "upgrade_logo", "upgrade_success", "upgrade_fail"]
        .iter()
        .map(|name| Asset { name: name.to_string(), data: splash(), codec: CodecId::Stored })
        .collect();
    let opts = PackOptions::default();

    c.bench_function("pack_4_splash_stored", |b| {
        b.iter(|| {
            let mut container = image::build(black_box(&assets), &opts).unwrap();
            container.pack()
        })
    });

    let bytes = image::build(&assets, &opts).unwrap().pack();
    c.bench_function("walk_4_splash_stored", |b| b.iter(|| Container::from_bytes(black_box(&bytes)).unwrap()));
}

criterion_group!(benches, bench_gzip, bench_pack_and_walk);
criterion_main!(benches);
