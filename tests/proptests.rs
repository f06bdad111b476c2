use proptest::prelude::*;

use iona_expr::vm::bytecode::*;
use iona_expr::vm::context::Context;
use iona_expr::vm::debug::{DebugMode, NoopSink, RecordingSink};
use iona_expr::vm::dispatch::OpcodeTable;
use iona_expr::vm::errors::VmError;
use iona_expr::vm::gas::GasMeter;
use iona_expr::vm::integrity;
use iona_expr::vm::interpreter::{eval, EvalArgs, EvalOutput, Limits};
use iona_expr::vm::state::MemoryStore;
use iona_expr::vm::word::{Word, U256};

fn w(v: u128) -> Word { U256::from(v) }

fn run_ops(ops: Vec<Op>, constants: Vec<Word>) -> Result<EvalOutput, VmError> {
    let b = ExpressionBundle::new(vec![Source::new(ops)], constants);
    let mut gas = GasMeter::new(10_000_000);
    let ctx = Context::empty();
    let args = EvalArgs { bundle: &b, source_index: 0, context: &ctx, caller: [0u8; 32], max_outputs: None };
    eval(&OpcodeTable::standard(), Limits::default(), args, &MemoryStore::default(), &mut gas, &mut NoopSink)
}

fn binary(opcode: u16, a: u128, b: u128) -> Result<Word, VmError> {
    run_ops(vec![Op::constant(0), Op::constant(1), Op::variadic(opcode, 2)], vec![w(a), w(b)]).map(|o| o.stack[0])
}

fn arb_opcode() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(ADD), Just(SUB), Just(MUL), Just(DIV), Just(MOD), Just(MIN), Just(MAX),
        Just(SATURATING_ADD), Just(SATURATING_SUB), Just(SATURATING_MUL),
    ]
}

/// Straight-line programs over a few constants: every op is a constant read
/// or a binary arithmetic op applied when the height allows it.
fn arb_program() -> impl Strategy<Value = (Vec<Op>, Vec<Word>)> {
    (
        proptest::collection::vec(any::<u64>(), 1..4),
        proptest::collection::vec((any::<bool>(), arb_opcode(), 0u16..4), 1..24),
    )
        .prop_map(|(consts, steps)| {
            let mut ops = Vec::new();
            let mut height = 0usize;
            for (push, opcode, idx) in steps {
                if push || height < 2 {
                    ops.push(Op::constant(idx % consts.len() as u16));
                    height += 1;
                } else {
                    ops.push(Op::variadic(opcode, 2));
                    height -= 1;
                }
            }
            (ops, consts.into_iter().map(U256::from).collect())
        })
}

proptest! {
    #[test]
    fn add_matches_u128(a in 0u128..u128::MAX / 2, b in 0u128..u128::MAX / 2) {
        prop_assert_eq!(binary(ADD, a, b).unwrap(), w(a + b));
    }

    #[test]
    fn sub_matches_checked_u128(a in any::<u128>(), b in any::<u128>()) {
        match a.checked_sub(b) {
            Some(d) => prop_assert_eq!(binary(SUB, a, b).unwrap(), w(d)),
            None => prop_assert_eq!(binary(SUB, a, b).unwrap_err(), VmError::Underflow("sub")),
        }
    }

    #[test]
    fn mul_of_u64s_never_overflows(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(binary(MUL, a as u128, b as u128).unwrap(), w(a as u128 * b as u128));
    }

    #[test]
    fn div_mod_match_u128(a in any::<u128>(), b in any::<u128>()) {
        if b == 0 {
            prop_assert_eq!(binary(DIV, a, b).unwrap_err(), VmError::DivisionByZero("div"));
            prop_assert_eq!(binary(MOD, a, b).unwrap_err(), VmError::DivisionByZero("mod"));
        } else {
            prop_assert_eq!(binary(DIV, a, b).unwrap(), w(a / b));
            prop_assert_eq!(binary(MOD, a, b).unwrap(), w(a % b));
        }
    }

    #[test]
    fn comparisons_are_consistent(a in any::<u128>(), b in any::<u128>()) {
        let cmp = |op: u16| {
            run_ops(vec![Op::constant(0), Op::constant(1), Op::simple(op)], vec![w(a), w(b)]).unwrap().stack[0]
        };
        prop_assert_eq!(cmp(LESS_THAN), w((a < b) as u128));
        prop_assert_eq!(cmp(GREATER_THAN), w((a > b) as u128));
        prop_assert_eq!(cmp(EQUAL_TO), w((a == b) as u128));
        prop_assert_eq!(cmp(LESS_THAN_OR_EQUAL_TO), w((a <= b) as u128));
    }

    #[test]
    fn debug_insertion_is_transparent((ops, consts) in arb_program(), every in 1usize..4) {
        let plain = run_ops(ops.clone(), consts.clone());

        let mut traced_ops = Vec::new();
        for (i, op) in ops.into_iter().enumerate() {
            if i % every == 0 {
                traced_ops.push(Op::debug(DebugMode::Stack));
            }
            traced_ops.push(op);
        }
        let b = ExpressionBundle::new(vec![Source::new(traced_ops)], consts);
        let mut gas = GasMeter::new(10_000_000);
        let ctx = Context::empty();
        let args = EvalArgs { bundle: &b, source_index: 0, context: &ctx, caller: [0u8; 32], max_outputs: None };
        let mut sink = RecordingSink::default();
        let traced = eval(&OpcodeTable::standard(), Limits::default(), args, &MemoryStore::default(), &mut gas, &mut sink);

        prop_assert_eq!(plain, traced);
    }

    #[test]
    fn integrity_passing_programs_never_underflow((ops, consts) in arb_program()) {
        let b = ExpressionBundle::new(vec![Source::new(ops.clone())], consts.clone());
        prop_assert!(integrity::check(&b, &OpcodeTable::standard(), Limits::default(), &[0]).is_ok());
        match run_ops(ops, consts) {
            Err(VmError::StackUnderflow { .. }) | Err(VmError::StackReadOutOfRange { .. }) => {
                prop_assert!(false, "checked program underflowed at runtime");
            }
            _ => {}
        }
    }

    #[test]
    fn arbitrary_bytecode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(src) = Source::decode(&bytes) {
            let _ = run_ops(src.ops().to_vec(), vec![w(1), w(2)]);
        }
    }
}
