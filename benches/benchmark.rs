use criterion::{Criterion, black_box, criterion_group, criterion_main};
use depth_arm_tracker::clustering::{Clusterer, KMeans, TermCriteria};
use depth_arm_tracker::projector::deproject;
use depth_arm_tracker::segmentation::BackgroundSegmenter;
use depth_arm_tracker::synthetic::{ArmPose, SceneConfig, SceneGenerator};

fn bench_segmentation(c: &mut Criterion) {
    let mut generator = SceneGenerator::new(SceneConfig::default(), 0);
    let grid = generator.render(&ArmPose::default()).unwrap();
    let segmenter = BackgroundSegmenter::default();

    c.bench_function("background_segmentation", |b| {
        b.iter(|| segmenter.segment(black_box(&grid)))
    });
}

fn bench_kmeans(c: &mut Criterion) {
    let mut generator = SceneGenerator::new(SceneConfig::default(), 0);
    let grid = generator.render(&ArmPose::default()).unwrap();
    let cloud = deproject(&BackgroundSegmenter::default().segment(&grid));
    let criteria = TermCriteria::new(3, 30, 1e-3);

    c.bench_function("kmeans_k12", |b| {
        let mut kmeans = KMeans::with_seed(0);
        b.iter(|| kmeans.cluster(black_box(&cloud), 12, &criteria))
    });
}

criterion_group!(benches, bench_segmentation, bench_kmeans);
criterion_main!(benches);
