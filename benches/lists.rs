use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use listdb::{Db, DbOptions};

fn options() -> DbOptions {
    DbOptions {
        create_if_missing: true,
        sync_writes: false,
        max_background_jobs: 2,
    }
}

fn open_temp_db() -> (TempDir, Db) {
    let dir = TempDir::new().expect("tempdir");
    let db = Db::open(dir.path(), options()).expect("open");
    (dir, db)
}

fn value(i: u32) -> Bytes {
    Bytes::from(format!("v{i:08}"))
}

fn preload(db: &Db, key: &[u8], n: u32) {
    for i in 0..n {
        db.rpush(key, &[value(i)]).expect("rpush");
    }
}

fn bench_rpush(c: &mut Criterion) {
    c.bench_function("rpush/10k", |b| {
        b.iter_batched(
            open_temp_db,
            |(_dir, db)| {
                preload(&db, b"bench", 10_000);
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_pop_both_ends(c: &mut Criterion) {
    c.bench_function("pop_both_ends/10k", |b| {
        b.iter_batched(
            || {
                let (dir, db) = open_temp_db();
                preload(&db, b"bench", 10_000);
                (dir, db)
            },
            |(_dir, db)| {
                for _ in 0..5_000 {
                    db.lpop(b"bench").expect("lpop");
                    db.rpop(b"bench").expect("rpop");
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_lrange(c: &mut Criterion) {
    let (_dir, db) = open_temp_db();
    preload(&db, b"bench", 10_000);

    c.bench_function("lrange/full-10k", |b| {
        b.iter(|| db.lrange(b"bench", 0, -1).expect("lrange"));
    });
    c.bench_function("lrange/window-100", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| {
            let start = rng.gen_range(0..9_900);
            db.lrange(b"bench", start, start + 99).expect("lrange")
        });
    });
}

fn bench_lindex(c: &mut Criterion) {
    let (_dir, db) = open_temp_db();
    preload(&db, b"bench", 10_000);

    c.bench_function("lindex/random", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| {
            let offset = rng.gen_range(-10_000..10_000);
            db.lindex(b"bench", offset).expect("lindex")
        });
    });
}

fn bench_rotate(c: &mut Criterion) {
    let (_dir, db) = open_temp_db();
    preload(&db, b"bench", 1_000);

    c.bench_function("rpoplpush/rotate", |b| {
        b.iter(|| db.rpoplpush(b"bench", b"bench").expect("rotate"));
    });
}

criterion_group!(
    benches,
    bench_rpush,
    bench_pop_both_ends,
    bench_lrange,
    bench_lindex,
    bench_rotate
);
criterion_main!(benches);
