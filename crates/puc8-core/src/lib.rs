//! Core model of the PUC8 processor: instruction table, disassembler and
//! simulator.

/// Host-facing console contract for the memory-mapped devices.
pub mod api;
pub use api::{Console, ConsoleError};

/// Instruction table and word layout.
pub mod encoding;
pub use encoding::{
    lookup, AluOp, Bits, Condition, Directive, InstructionSpec, OperandKind, Operation, Variant,
    INSTRUCTION_TABLE, WORD_BITS, WORD_MASK,
};

/// Word decoding against the instruction table.
pub mod decoder;
pub use decoder::{decode, DecodeError, DecodedInstruction, Fields};

/// Word to assembler text.
pub mod disasm;
pub use disasm::{disassemble, disassemble_image, format_word_fields, Disassembly, DisassemblyRow};

/// Assembled program image and symbol maps.
pub mod image;
pub use image::{ImageEntry, MemoryImage, Section, SymbolMap, UnknownSection, SECTION_CAPACITY};

/// Integer literal parsing.
pub mod literal;
pub use literal::parse_integer;

/// Data memory and device map.
pub mod memory;
pub use memory::{new_memory, Device, CONTROL_PORT, INPUT_PORT, MEMORY_BYTES, OUTPUT_PORT};

/// Console implementations.
pub mod peripherals;
pub use peripherals::{LineConsole, ScriptedConsole, StdConsole};

/// Architectural state and state diffs.
pub mod state;
pub use state::{
    diff, format_changes, Change, Flag, Flags, MachineState, ParseRegisterError, Register,
    REGISTER_COUNT, STACK_TOP,
};

/// Runtime faults.
pub mod fault;
pub use fault::Fault;

/// Instruction execution.
pub mod execute;
pub use execute::{execute_instruction, run, run_state, step, SimulationError};

/// Interactive debugger.
pub mod debugger;
pub use debugger::{Command, CommandError, Debugger, DebuggerError, Flow, HELP_TEXT};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
