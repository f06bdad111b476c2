//! Determinism tests.
//!
//! An evaluation is a pure function of (bundle, entrypoint, context, store
//! snapshot). Running it twice, or with debug ops inserted, must not change
//! the stack, the buffered writes or the gas used by non-debug ops.

use iona_expr::sentinel::{consume_sentinel_tuples, sentinel_from_label};
use iona_expr::vm::bytecode::*;
use iona_expr::vm::context::Context;
use iona_expr::vm::debug::{DebugMode, NoopSink, RecordingSink};
use iona_expr::vm::dispatch::OpcodeTable;
use iona_expr::vm::gas::GasMeter;
use iona_expr::vm::interpreter::{eval, EvalArgs, EvalOutput, Limits};
use iona_expr::vm::state::{MemoryStore, Store};
use iona_expr::vm::word::{parse_word, Word, U256};

fn w(v: u64) -> Word { U256::from(v) }

const CALLER: [u8; 32] = [7u8; 32];

/// Hash of a stored value, a bounded loop and a nested call.
fn workload(with_debug: bool) -> ExpressionBundle {
    let dbg = |mode| if with_debug { vec![Op::debug(mode)] } else { vec![] };
    let main = [
        dbg(DebugMode::State),
        vec![Op::constant(0), Op::simple(GET), Op::context(0, 0), Op::variadic(HASH, 2)],
        dbg(DebugMode::Stack),
        vec![Op::constant(1), Op::loop_n(4, 1, 1)],
        dbg(DebugMode::Context),
        vec![Op::stack(0), Op::stack(1), Op::call(2, 2, 1), Op::constant(0), Op::stack(2), Op::simple(SET)],
        dbg(DebugMode::Constants),
    ]
    .concat();
    let body = [dbg(DebugMode::Stack), vec![Op::stack(0), Op::constant(1), Op::variadic(MUL, 2)]].concat();
    let callee = vec![Op::stack(0), Op::stack(1), Op::variadic(SATURATING_ADD, 2)];
    ExpressionBundle::new(vec![Source::new(main), Source::new(body), Source::new(callee)], vec![w(1), w(3)])
}

fn store() -> MemoryStore {
    let mut s = MemoryStore::default();
    s.set(&CALLER, w(1), w(1234)).unwrap();
    s
}

fn context() -> Context {
    Context::new(vec![vec![w(55)]])
}

fn run(bundle: &ExpressionBundle, sink: &mut RecordingSink) -> EvalOutput {
    let mut gas = GasMeter::new(1_000_000);
    let ctx = context();
    let args = EvalArgs { bundle, source_index: 0, context: &ctx, caller: CALLER, max_outputs: None };
    eval(&OpcodeTable::standard(), Limits::default(), args, &store(), &mut gas, sink).unwrap()
}

#[test]
fn test_repeated_evaluation_is_identical() {
    let b = workload(false);
    let first = run(&b, &mut RecordingSink::default());
    for _ in 0..5 {
        assert_eq!(run(&b, &mut RecordingSink::default()), first);
    }
    assert_eq!(first.stack.len(), 3);
    assert_eq!(first.writes.len(), 1);
}

#[test]
fn test_debug_ops_are_transparent() {
    let plain = run(&workload(false), &mut RecordingSink::default());
    let mut sink = RecordingSink::default();
    let traced = run(&workload(true), &mut sink);

    assert_eq!(traced.stack, plain.stack);
    assert_eq!(traced.writes, plain.writes);
    // debug costs nothing
    assert_eq!(traced.gas_used, plain.gas_used);
    // 4 top-level taps + one per loop iteration
    assert_eq!(sink.events.len(), 8);
    assert_eq!(sink.events[0].mode, DebugMode::State);
    assert_eq!(sink.events[0].words[..4], [w(0), w(0), w(0), w(0)]);
}

#[test]
fn test_workload_result() {
    let out = run(&workload(false), &mut RecordingSink::default());
    let h = sha3_keccak(&[w(1234), w(55)]);
    // loop-n multiplies the carried 3 by 3 four times
    let looped = w(243);
    let sum = h.saturating_add(looped);
    assert_eq!(out.stack, vec![h, looped, sum]);
    assert_eq!(out.writes, vec![(w(1), sum)]);
}

fn sha3_keccak(words: &[Word]) -> Word {
    iona_expr::vm::word::keccak_words(words)
}

#[test]
fn test_sentinel_decoding_of_output_stack() {
    let sentinel = sentinel_from_label("IONA_TRANSFER_LIST");
    let b = ExpressionBundle::new(
        vec![Source::new(vec![
            Op::constant(0),
            Op::constant(1), Op::constant(2),
            Op::constant(3), Op::constant(4),
        ])],
        vec![sentinel, w(1), w(100), w(2), w(200)],
    );
    let mut gas = GasMeter::new(1_000);
    let ctx = Context::empty();
    let args = EvalArgs { bundle: &b, source_index: 0, context: &ctx, caller: CALLER, max_outputs: None };
    let mut stack = eval(&OpcodeTable::standard(), Limits::default(), args, &MemoryStore::default(), &mut gas, &mut NoopSink)
        .unwrap()
        .stack;
    let tuples = consume_sentinel_tuples(&mut stack, sentinel, 2).unwrap();
    assert_eq!(tuples, vec![vec![w(1), w(100)], vec![w(2), w(200)]]);
    assert!(stack.is_empty());
}

#[test]
fn test_keccak_golden_vector() {
    // keccak256(uint256(1))
    let expected = parse_word("0xb10e2d527612073b26eecdfd717e6a320cf44b4afac2b0732d9fcbe2b7fa0cf6").unwrap();
    assert_eq!(sha3_keccak(&[w(1)]), expected);
}
