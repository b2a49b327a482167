//! Benchmarks for the component injector

use component_injector::{Inject, Injector};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

#[allow(dead_code)]
struct SmallComponent {
    value: i32,
}

#[allow(dead_code)]
struct MediumComponent {
    name: String,
    values: Vec<i32>,
}

trait Greeter: Send + Sync {
    fn greeting(&self) -> String;
}

struct English;
impl Greeter for English {
    fn greeting(&self) -> String {
        "hello".into()
    }
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("instance_small", |b| {
        b.iter(|| {
            let injector = Injector::new();
            injector
                .register(SmallComponent { value: 42 })
                .finish()
                .unwrap();
            black_box(injector)
        })
    });

    group.bench_function("instance_with_capability", |b| {
        b.iter(|| {
            let injector = Injector::new();
            injector
                .register(English)
                .satisfies::<dyn Greeter>(|g| g)
                .finish()
                .unwrap();
            black_box(injector)
        })
    });

    group.bench_function("factory", |b| {
        b.iter(|| {
            let injector = Injector::new();
            injector
                .register_factory(|| MediumComponent {
                    name: "test".to_string(),
                    values: vec![1, 2, 3, 4, 5],
                })
                .finish()
                .unwrap();
            black_box(injector)
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let cached = Injector::new();
    cached
        .register(SmallComponent { value: 42 })
        .finish()
        .unwrap();

    group.bench_function("cached", |b| {
        b.iter(|| black_box(cached.get_component::<SmallComponent>().unwrap()))
    });

    let by_capability = Injector::new();
    by_capability
        .register(English)
        .satisfies::<dyn Greeter>(|g| g)
        .finish()
        .unwrap();

    group.bench_function("cached_capability", |b| {
        b.iter(|| black_box(by_capability.get_component::<dyn Greeter>().unwrap()))
    });

    group.finish();
}

fn bench_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("scope");

    let injector = Injector::new();
    injector
        .register(SmallComponent { value: 42 })
        .finish()
        .unwrap();

    group.bench_function("enter_exit", |b| {
        let scope = injector.scope();
        b.iter(|| {
            let guard = scope.enter();
            black_box(&guard);
        })
    });

    group.bench_function("enter_register_resolve_exit", |b| {
        let scope = injector.scope();
        b.iter(|| {
            let _guard = scope.enter();
            injector
                .register(SmallComponent { value: 7 })
                .finish()
                .unwrap();
            black_box(injector.get_component::<SmallComponent>().unwrap())
        })
    });

    group.finish();
}

fn bench_inject(c: &mut Criterion) {
    let mut group = c.benchmark_group("inject");

    let injector = Injector::new();
    injector
        .register(English)
        .satisfies::<dyn Greeter>(|g| g)
        .finish()
        .unwrap();

    let consumer = injector.inject(|g: Inject<dyn Greeter>| g.greeting());

    group.bench_function("wrapped_call", |b| {
        b.iter(|| black_box(consumer.call(()).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_scope,
    bench_inject
);
criterion_main!(benches);
