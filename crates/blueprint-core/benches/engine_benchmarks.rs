use blueprint_core::{CommitOptions, Config, Engine};
use blueprint_schema::{Blueprint, Rules};
use criterion::{criterion_group, criterion_main, Criterion};

fn blueprint(name: &str, packages: usize) -> Blueprint {
    let mut bp = Blueprint::new(name).unwrap();
    for i in 0..packages {
        bp.add_package("apt", &format!("lib{i:04}"), "1.0");
    }
    bp
}

fn bench_commit(c: &mut Criterion) {
    c.bench_function("engine_commit_500pkg", |b| {
        b.iter_with_setup(
            || {
                let store_dir = tempfile::tempdir().unwrap();
                let engine = Engine::new(store_dir.path(), Config::default());
                (store_dir, engine, blueprint("web", 500))
            },
            |(_sd, engine, bp)| {
                engine
                    .commit(&bp, &Rules::default(), &CommitOptions::default())
                    .unwrap();
            },
        );
    });
}

fn bench_checkout(c: &mut Criterion) {
    let store_dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(store_dir.path(), Config::default());
    engine
        .commit(
            &blueprint("web", 500),
            &Rules::default(),
            &CommitOptions::default(),
        )
        .unwrap();
    c.bench_function("engine_checkout_500pkg", |b| {
        b.iter(|| engine.checkout("web", None).unwrap());
    });
}

fn bench_diff(c: &mut Criterion) {
    c.bench_function("engine_diff_500pkg", |b| {
        b.iter_with_setup(
            || {
                let store_dir = tempfile::tempdir().unwrap();
                let engine = Engine::new(store_dir.path(), Config::default());
                let rules = Rules::default();
                let options = CommitOptions::default();
                engine.commit(&blueprint("a", 500), &rules, &options).unwrap();
                engine.commit(&blueprint("b", 250), &rules, &options).unwrap();
                (store_dir, engine)
            },
            |(_sd, engine)| {
                engine.diff("a", "b", "a-minus-b").unwrap();
            },
        );
    });
}

criterion_group!(benches, bench_commit, bench_checkout, bench_diff);
criterion_main!(benches);
