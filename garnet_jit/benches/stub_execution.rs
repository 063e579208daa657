//! Arithmetic Stub Benchmarks
//!
//! Measures stub compilation cost, fast-path execution against the general
//! evaluator, and cache lookup overhead.
//!
//! # Key Metrics
//!
//! - Stub execution vs general evaluation: the fast path must win
//! - Compilation cost: small enough to amortize after a few hits
//! - Cache hit time: a read lock and a hash lookup

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use garnet_core::Value;
use garnet_jit::cache::{StubCache, StubKey};
use garnet_jit::ic::{BinaryArithCompiler, BinaryArithOp, fallback};

// =============================================================================
// Compilation
// =============================================================================

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for op in BinaryArithOp::ALL.iter() {
        group.bench_with_input(BenchmarkId::new("operator", op), op, |b, &op| {
            b.iter(|| black_box(BinaryArithCompiler::new(op, false).compile().unwrap()))
        });
    }

    // The double-allowed Ursh recipe is the longest stub.
    group.bench_function("ursh_with_doubles", |b| {
        b.iter(|| {
            black_box(
                BinaryArithCompiler::new(BinaryArithOp::Ursh, true)
                    .compile()
                    .unwrap(),
            )
        })
    });

    group.finish();
}

// =============================================================================
// Execution
// =============================================================================

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    let add = BinaryArithCompiler::new(BinaryArithOp::Add, false)
        .compile()
        .unwrap();
    let div = BinaryArithCompiler::new(BinaryArithOp::Div, false)
        .compile()
        .unwrap();
    let bit_or = BinaryArithCompiler::new(BinaryArithOp::BitOr, false)
        .compile()
        .unwrap();
    let ursh = BinaryArithCompiler::new(BinaryArithOp::Ursh, true)
        .compile()
        .unwrap();

    // Fast path all the way to a boxed result.
    group.bench_function("add_fast", |b| {
        b.iter(|| black_box(add.execute(Value::int32(2), Value::int32(3))))
    });

    // Guard failure is the shortest possible run.
    group.bench_function("add_guard_bail", |b| {
        b.iter(|| black_box(add.execute(Value::double(1.5), Value::int32(3))))
    });

    // Overflow check fires after the arithmetic.
    group.bench_function("add_overflow_bail", |b| {
        b.iter(|| black_box(add.execute(Value::int32(i32::MAX), Value::int32(1))))
    });

    // Division runs the pre-check, the divide, and the remainder check.
    group.bench_function("div_exact", |b| {
        b.iter(|| black_box(div.execute(Value::int32(84), Value::int32(2))))
    });

    // Boxed-word shortcut skips unbox and rebox.
    group.bench_function("bitor_boxed_word", |b| {
        b.iter(|| black_box(bit_or.execute(Value::int32(0x0f0f), Value::int32(0x00ff))))
    });

    // Wide unsigned shift takes the double materialization path.
    group.bench_function("ursh_wide_double", |b| {
        b.iter(|| black_box(ursh.execute(Value::int32(-1), Value::int32(0))))
    });

    group.finish();
}

// =============================================================================
// Stub vs General Evaluator
// =============================================================================

fn bench_stub_vs_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("stub_vs_fallback");

    let add = BinaryArithCompiler::new(BinaryArithOp::Add, false)
        .compile()
        .unwrap();
    let band = BinaryArithCompiler::new(BinaryArithOp::BitAnd, false)
        .compile()
        .unwrap();

    group.bench_function("add_stub", |b| {
        b.iter(|| black_box(add.execute(Value::int32(41), Value::int32(1))))
    });

    group.bench_function("add_fallback", |b| {
        b.iter(|| {
            black_box(fallback::evaluate(
                BinaryArithOp::Add,
                Value::int32(41),
                Value::int32(1),
            ))
        })
    });

    group.bench_function("bitand_stub", |b| {
        b.iter(|| black_box(band.execute(Value::int32(-1), Value::int32(0xff))))
    });

    group.bench_function("bitand_fallback", |b| {
        b.iter(|| {
            black_box(fallback::evaluate(
                BinaryArithOp::BitAnd,
                Value::int32(-1),
                Value::int32(0xff),
            ))
        })
    });

    group.finish();
}

// =============================================================================
// Cache
// =============================================================================

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");

    let cache = StubCache::new();
    for op in BinaryArithOp::ALL {
        cache.get_or_compile(StubKey::new(op, false)).unwrap();
    }

    group.bench_function("lookup_hit", |b| {
        let key = StubKey::new(BinaryArithOp::Add, false);
        b.iter(|| black_box(cache.lookup(key)))
    });

    group.bench_function("get_or_compile_hit", |b| {
        let key = StubKey::new(BinaryArithOp::Mul, false);
        b.iter(|| black_box(cache.get_or_compile(key).unwrap()))
    });

    group.bench_function("lookup_miss", |b| {
        let key = StubKey::new(BinaryArithOp::Ursh, true);
        b.iter(|| black_box(cache.lookup(key)))
    });

    group.finish();
}

// =============================================================================
// Criterion Groups
// =============================================================================

criterion_group!(
    stub_benches,
    bench_compile,
    bench_execute,
    bench_stub_vs_fallback,
    bench_cache,
);

criterion_main!(stub_benches);
