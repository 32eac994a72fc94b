// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::DMatrix;
use rand::Rng;

use multiview_losses_rs::core::camera::Camera;
use multiview_losses_rs::core::depth;
use multiview_losses_rs::core::projection::{self, Config};
use multiview_losses_rs::misc::type_aliases::{Mat3, Mat4, Point3};

fn camera() -> Camera {
    #[rustfmt::skip]
    let k = Mat3::new(
        200.0, 0.0,   112.0,
        0.0,   200.0, 112.0,
        0.0,   0.0,   1.0,
    );
    Camera::new(k, Mat4::identity())
}

fn criterion_benchmark(c: &mut Criterion) {
    let config = Config::default();
    let mut rng = rand::thread_rng();

    c.bench_function("inverse_projection 8x224x224", |b| {
        let depth = DMatrix::from_fn(224, 224, |_, _| {
            config.codec.encode(rng.gen_range(1.0..12.0))
        });
        let depths = vec![depth; 8];
        let cameras = vec![camera(); 8];
        b.iter(|| projection::inverse_projection(&config, black_box(&depths), &cameras))
    });

    c.bench_function("projection 8x16384 points", |b| {
        let cloud: Vec<Point3> = (0..16_384)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(1.0..5.0),
                )
            })
            .collect();
        let clouds = vec![cloud; 8];
        let cameras = vec![camera(); 8];
        b.iter(|| projection::projection(&config, black_box(&clouds), &cameras))
    });

    c.bench_function("min_pool 224x224 by 4", |b| {
        let mat = DMatrix::repeat(224, 224, depth::BACKGROUND);
        b.iter(|| depth::min_pool(black_box(&mat), (4, 4)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
