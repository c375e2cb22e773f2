use std::sync::Arc;

use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};
use nexusfile::{
    backend::{AccessMode, MemoryConnector},
    Compression, File, NumType, UNLIMITED,
};

fn slab_io(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("slab_io");
    group.plot_config(plot_config);

    for size in [32i64, 64, 128, 256].iter() {
        let num_elements = size * size;
        let frame = vec![1.0f32; usize::try_from(num_elements).unwrap()];
        group.throughput(Throughput::Bytes(num_elements as u64 * 4));

        for compression in [Compression::None, Compression::Lzw] {
            let mut file =
                File::open_with(Arc::new(MemoryConnector::new()), "bench", AccessMode::Create)
                    .unwrap();
            file.make_comp_data(
                "frames",
                NumType::Float32,
                &[UNLIMITED, *size, *size],
                compression,
                &[1, *size, *size],
                true,
            )
            .unwrap();
            let mut index = 0;
            group.bench_function(BenchmarkId::new(format!("append_{compression}"), size), |b| {
                b.iter(|| {
                    file.put_slab(&frame, &[index, 0, 0], &[1, *size, *size])
                        .unwrap();
                    index += 1;
                });
            });
            group.bench_function(BenchmarkId::new(format!("read_{compression}"), size), |b| {
                b.iter(|| file.get_slab::<f32>(&[0, 0, 0], &[1, *size, *size]).unwrap());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, slab_io);
criterion_main!(benches);
