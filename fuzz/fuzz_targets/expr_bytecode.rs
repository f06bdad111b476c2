#![no_main]
use libfuzzer_sys::fuzz_target;

// Fuzz the expression interpreter with arbitrary bytecode.
//
// Executing arbitrary bytecode must never panic: every failure (out of gas,
// unknown opcode, stack underflow, call depth, ...) comes back as a VmError.
// Bundles that pass the integrity check must additionally never reach an
// unknown opcode or a missing constant.
fuzz_target!(|data: &[u8]| {
    use iona_expr::vm::bytecode::{ExpressionBundle, Source};
    use iona_expr::vm::context::Context;
    use iona_expr::vm::debug::NoopSink;
    use iona_expr::vm::dispatch::OpcodeTable;
    use iona_expr::vm::errors::VmError;
    use iona_expr::vm::gas::GasMeter;
    use iona_expr::vm::integrity;
    use iona_expr::vm::interpreter::{eval, EvalArgs, Limits};
    use iona_expr::vm::state::MemoryStore;
    use iona_expr::vm::word::U256;

    // First byte picks the split between two sources; the rest is bytecode.
    let Some((&split, body)) = data.split_first() else { return };
    let cut = (split as usize * 4).min(body.len() / 4 * 4);
    let (a, b) = body.split_at(cut);
    let b = &b[..b.len() / 4 * 4];
    let (Ok(s0), Ok(s1)) = (Source::decode(a), Source::decode(b)) else { return };

    let bundle = ExpressionBundle::new(vec![s0, s1], vec![U256::from(1u64), U256::from(2u64), U256::MAX]);
    let table = OpcodeTable::standard();
    let limits = Limits::default();
    let checked = integrity::check(&bundle, &table, limits, &[0]).is_ok();

    let ctx = Context::new(vec![vec![U256::from(7u64)]]);
    let store = MemoryStore::default();
    // Budget: 1M gas bounds do-while bodies without hanging the fuzzer.
    let mut gas = GasMeter::new(1_000_000);
    let args = EvalArgs { bundle: &bundle, source_index: 0, context: &ctx, caller: [0u8; 32], max_outputs: None };
    let result = eval(&table, limits, args, &store, &mut gas, &mut NoopSink);

    if checked {
        assert!(!matches!(
            result,
            Err(VmError::UnknownOpcode(_))
                | Err(VmError::ConstantOutOfRange(_))
        ));
    }
});
