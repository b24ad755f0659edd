use criterion::{Criterion, black_box, criterion_group, criterion_main};
use he_recsys::features::PlainFeatureTable;
use he_recsys::params::SchemeConfig;
use he_recsys::pipeline::Pipeline;

fn sample_inputs(users: usize, songs: usize, dim: usize) -> (Vec<(String, String)>, PlainFeatureTable, PlainFeatureTable) {
    let edges = (0..users)
        .flat_map(|u| (0..songs).filter(move |s| (u + s) % 2 == 0).map(move |s| (format!("u{}", u), format!("s{}", s))))
        .collect();
    let row = |i: usize| (0..dim).map(|j| ((i + j) % 7) as f64).collect::<Vec<f64>>();
    let user_table =
        PlainFeatureTable::from_rows((0..users).map(|u| (format!("u{}", u), row(u)))).expect("user table");
    let song_table =
        PlainFeatureTable::from_rows((0..songs).map(|s| (format!("s{}", s), row(s + 3)))).expect("song table");
    (edges, user_table, song_table)
}

fn bench_pipeline(c: &mut Criterion) {
    // key generation happens once, outside the measured loop
    let (edges, users, songs) = sample_inputs(4, 4, 8);

    let approx = Pipeline::new(&SchemeConfig::approx_real(64, vec![60, 40, 40, 60], 2f64.powi(40)))
        .expect("approx pipeline");
    c.bench_function("pipeline_approx_real_4x4", |b| {
        b.iter(|| black_box(approx.run(&edges, &users, &songs).expect("run")))
    });

    let exact = Pipeline::new(&SchemeConfig::exact_integer(64, 1032193)).expect("exact pipeline");
    c.bench_function("pipeline_exact_integer_4x4", |b| {
        b.iter(|| black_box(exact.run(&edges, &users, &songs).expect("run")))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_pipeline
}
criterion_main!(benches);
