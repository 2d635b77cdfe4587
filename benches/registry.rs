use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use querycache::registry::CacheRegistry;

fn bench_get_or_create_existing(c: &mut Criterion) {
    let registry: CacheRegistry<u64> = CacheRegistry::new(64);
    let names: Vec<String> = (0..32).map(|i| format!("graph_{i}")).collect();
    for name in &names {
        let _ = registry.get_or_create(name);
    }

    c.bench_function("registry_get_or_create_existing", |b| {
        b.iter(|| {
            for name in &names {
                let _ = std::hint::black_box(registry.get_or_create(std::hint::black_box(name)));
            }
        })
    });
}

fn bench_create_remove_cycle(c: &mut Criterion) {
    let names: Vec<String> = (0..32).map(|i| format!("graph_{i}")).collect();
    c.bench_function("registry_create_populate_remove", |b| {
        b.iter_batched(
            || CacheRegistry::<u64>::new(64),
            |registry| {
                for name in &names {
                    let cache = registry.get_or_create(name);
                    for i in 0..16u64 {
                        let _ = cache.put(&format!("RETURN {i}"), i);
                    }
                }
                for name in &names {
                    registry.remove(name);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_get_or_create_existing, bench_create_remove_cycle);
criterion_main!(benches);
