//! Criterion benchmarks for the IONA expression interpreter.
//!
//! Run: cargo bench --locked
//! Results written to target/criterion/

use iona_expr::config::InterpreterConfig;
use iona_expr::host::Interpreter;
use iona_expr::vm::bytecode::*;
use iona_expr::vm::context::Context;
use iona_expr::vm::debug::NoopSink;
use iona_expr::vm::dispatch::OpcodeTable;
use iona_expr::vm::gas::GasMeter;
use iona_expr::vm::integrity;
use iona_expr::vm::interpreter::{eval, EvalArgs, Limits};
use iona_expr::vm::state::MemoryStore;
use iona_expr::vm::word::U256;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Helpers ──────────────────────────────────────────────────────────────

/// `n` constant pushes folded by one variadic add.
fn wide_add(n: u16) -> ExpressionBundle {
    let mut ops: Vec<Op> = (0..n).map(|_| Op::constant(0)).collect();
    ops.push(Op::variadic(ADD, n));
    ExpressionBundle::new(vec![Source::new(ops)], vec![U256::from(3u64)])
}

/// Counts down from `start` in a do-while.
fn countdown(start: u64) -> ExpressionBundle {
    ExpressionBundle::new(
        vec![
            Source::new(vec![Op::constant(0), Op::stack(0), Op::do_while(1, 1)]),
            Source::new(vec![Op::stack(0), Op::constant(1), Op::variadic(SUB, 2), Op::stack(1)]),
        ],
        vec![U256::from(start), U256::from(1u64)],
    )
}

fn eval_once(b: &ExpressionBundle, table: &OpcodeTable, store: &MemoryStore) {
    let mut gas = GasMeter::new(u64::MAX);
    let ctx = Context::empty();
    let args = EvalArgs { bundle: b, source_index: 0, context: &ctx, caller: [0u8; 32], max_outputs: None };
    let _ = black_box(eval(table, Limits::default(), args, store, &mut gas, &mut NoopSink));
}

// ── Benches ──────────────────────────────────────────────────────────────

fn bench_variadic_add(c: &mut Criterion) {
    let table = OpcodeTable::standard();
    let store = MemoryStore::default();
    let mut group = c.benchmark_group("variadic_add");
    for n in [2u16, 16, 128] {
        let b = wide_add(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &b, |bench, b| {
            bench.iter(|| eval_once(b, &table, &store))
        });
    }
    group.finish();
}

fn bench_do_while(c: &mut Criterion) {
    let table = OpcodeTable::standard();
    let store = MemoryStore::default();
    let mut group = c.benchmark_group("do_while_countdown");
    for n in [10u64, 100, 1_000] {
        let b = countdown(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &b, |bench, b| {
            bench.iter(|| eval_once(b, &table, &store))
        });
    }
    group.finish();
}

fn bench_integrity(c: &mut Criterion) {
    let table = OpcodeTable::standard();
    let b = countdown(10);
    c.bench_function("integrity_check", |bench| {
        bench.iter(|| integrity::check(black_box(&b), &table, Limits::default(), &[1]))
    });
}

fn bench_host_counter(c: &mut Criterion) {
    let mut host = Interpreter::new(InterpreterConfig::default());
    let b = ExpressionBundle::new(
        vec![Source::new(vec![
            Op::constant(0), Op::simple(GET), Op::constant(1), Op::variadic(ADD, 2),
            Op::constant(0), Op::stack(0), Op::simple(SET),
        ])],
        vec![U256::ZERO, U256::from(1u64)],
    );
    let Ok(id) = host.deploy(b, &[1]) else { return };
    let ctx = Context::empty();
    c.bench_function("host_counter_evaluate", |bench| {
        bench.iter(|| host.evaluate(&id, 0, &ctx, &[1u8; 32]))
    });
}

criterion_group!(benches, bench_variadic_add, bench_do_while, bench_integrity, bench_host_counter);
criterion_main!(benches);
