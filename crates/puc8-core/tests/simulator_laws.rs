//! Architectural laws of the simulator checked over whole input spaces.

use proptest::prelude::*;
use puc8_core::execute::alu;
use puc8_core::{
    decode, disassemble, execute_instruction, run, AluOp, Fault, ImageEntry, MachineState,
    MemoryImage, ScriptedConsole, WORD_MASK,
};
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const PUSH_R0: u32 = 0b0100_0_0000_0000_0000;
const POP_R0: u32 = 0b0110_0_0000_0000_0000;
const CALL_16: u32 = 0b0101_1_0000_0001_0000;
const RET: u32 = 0b0110_0_1111_0000_0000;

const fn sign(value: u8) -> bool {
    value & 0x80 != 0
}

#[test]
fn addition_flags_hold_for_every_byte_pair() {
    for a in 0..=u8::MAX {
        for b in 0..=u8::MAX {
            let output = alu(AluOp::Add, a, u16::from(b));
            let sum = u16::from(a) + u16::from(b);
            let result = a.wrapping_add(b);

            assert_eq!(output.value, result);
            assert_eq!(output.flags.zero, sum % 256 == 0, "{a} + {b}");
            assert_eq!(output.flags.carry, sum >= 256, "{a} + {b}");
            assert_eq!(output.flags.negative, sign(result), "{a} + {b}");
            assert_eq!(
                output.flags.overflow,
                sign(a) == sign(b) && sign(result) != sign(a),
                "{a} + {b}"
            );
        }
    }
}

#[test]
fn subtraction_flags_hold_for_every_byte_pair() {
    for a in 0..=u8::MAX {
        for b in 0..=u8::MAX {
            let output = alu(AluOp::Sub, a, u16::from(b));
            let result = a.wrapping_sub(b);

            assert_eq!(output.value, result);
            assert_eq!(output.flags.zero, a == b, "{a} - {b}");
            assert_eq!(output.flags.carry, a >= b, "{a} - {b}");
            assert_eq!(output.flags.negative, sign(result), "{a} - {b}");
            assert_eq!(
                output.flags.overflow,
                sign(a) != sign(b) && sign(result) != sign(a),
                "{a} - {b}"
            );
        }
    }
}

#[rstest]
#[case(PUSH_R0, 0, Fault::StackOverflow)]
#[case(CALL_16, 0, Fault::StackOverflow)]
#[case(POP_R0, 255, Fault::StackUnderflow)]
#[case(RET, 255, Fault::StackUnderflow)]
fn stack_bounds_fault_without_touching_state(
    #[case] word: u32,
    #[case] sp: u8,
    #[case] expected: Fault,
) {
    let mut state = MachineState::default();
    state.regs[14] = sp;
    state.regs[0] = 0xAA;
    let before = state.clone();

    let result = execute_instruction(word, &state, &mut ScriptedConsole::default());
    assert_eq!(result, Err(expected));
    assert_eq!(state, before);
}

#[test]
fn stack_fills_exactly_down_to_address_one() {
    let mut state = MachineState::default();
    let mut console = ScriptedConsole::default();
    for _ in 0..255 {
        state = execute_instruction(PUSH_R0, &state, &mut console).unwrap();
    }
    assert_eq!(state.sp(), 0);
    assert_eq!(
        execute_instruction(PUSH_R0, &state, &mut console),
        Err(Fault::StackOverflow)
    );
}

#[test]
fn load_immediate_then_store_to_output_prints_the_code() {
    let image = MemoryImage {
        code: vec![
            ImageEntry::new(0b0010_1_0000_0000_0101, "ldr r0, 5"),
            ImageEntry::new(0b0001_1_0000_0000_0111, "str r0, [7]"),
        ],
        data: Vec::new(),
    };
    let mut console = ScriptedConsole::default();
    let pc = run(&image, 2, &mut console).unwrap();
    assert_eq!(pc, 2);
    assert_eq!(console.output(), &[5]);
}

#[test]
fn echo_program_copies_input_to_output() {
    let image = MemoryImage {
        code: vec![
            ImageEntry::new(0b0000_1_0000_0000_1000, "ldr r0, [8]"),
            ImageEntry::new(0b0001_1_0000_0000_0111, "str r0, [7]"),
            ImageEntry::new(0b0011_1_0000_0000_0000, "b 0"),
        ],
        data: Vec::new(),
    };
    let mut console = ScriptedConsole::new(b"hi");
    let error = run(&image, 100, &mut console).unwrap_err();
    assert_eq!(console.output_text(), "hi");
    assert_eq!(error.steps, 6);
    assert_eq!(error.state.pc(), 0);
}

proptest! {
    #[test]
    fn decodable_words_disassemble(word in 0..=WORD_MASK) {
        if let Ok(decoded) = decode(word) {
            prop_assert!(!decoded.variant.alias);
            prop_assert!(disassemble(word, None).is_ok());
        } else {
            prop_assert!(disassemble(word, None).is_err());
        }
    }

    #[test]
    fn operand_fields_reencode_to_the_same_word(word in 0..=WORD_MASK) {
        if let Ok(decoded) = decode(word) {
            let fields: Vec<u32> = (0..decoded.variant.operands.len())
                .map(|index| decoded.operand(index))
                .collect();
            prop_assert_eq!(decoded.variant.encode(&fields), word);
        }
    }

    #[test]
    fn execution_never_panics(word in 0..=WORD_MASK, regs in any::<[u8; 16]>()) {
        let mut state = MachineState::default();
        state.regs = regs;
        let mut console = ScriptedConsole::new(b"x");
        let _ = execute_instruction(word, &state, &mut console);
    }
}

#[test]
fn every_table_mnemonic_decodes_to_itself() {
    for spec in puc8_core::INSTRUCTION_TABLE {
        for variant in spec.variants.iter().filter(|v| v.is_encodable() && !v.alias) {
            let word = variant.encode(&vec![0; variant.operands.len()]);
            let decoded = decode(word).unwrap();
            assert_eq!(decoded.spec.mnemonic, spec.mnemonic);
        }
    }
}
