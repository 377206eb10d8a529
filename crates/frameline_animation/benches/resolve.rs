use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frameline_animation::{
    resolve, Animation, Animator, CompositeAnimation, Keyframe, NumberInterpolator, Point, PointInterpolator,
};

fn dense_track(len: usize) -> Vec<Keyframe<f32>> {
    (0..len)
        .map(|i| Keyframe::new(i as f32 / (len - 1) as f32, (i * i) as f32))
        .collect()
}

fn bench_resolve(c: &mut Criterion) {
    let track = dense_track(256);
    c.bench_function("resolve_256_keyframes", |b| {
        b.iter(|| resolve(black_box(0.6180), &track, &NumberInterpolator, false))
    });
    c.bench_function("resolve_256_keyframes_reverse", |b| {
        b.iter(|| resolve(black_box(0.6180), &track, &NumberInterpolator, true))
    });
}

fn bench_composite_tick(c: &mut Criterion) {
    let timeline = CompositeAnimation::new();
    for i in 0..64 {
        let leaf = Animation::new(
            vec![
                Keyframe::new(0.0, Point::new(0.0, 0.0)),
                Keyframe::new(1.0, Point::new(100.0, 50.0)),
            ],
            |value| {
                black_box(value);
            },
            PointInterpolator,
        )
        .unwrap();
        timeline.add_animation(format!("leaf{i}"), &leaf, i as f32 * 0.05).unwrap();
    }
    timeline.set_loops(true);
    timeline.start_animation();

    c.bench_function("composite_64_children_tick", |b| {
        b.iter(|| timeline.animate(black_box(1.0 / 60.0)))
    });
}

criterion_group!(benches, bench_resolve, bench_composite_tick);
criterion_main!(benches);
