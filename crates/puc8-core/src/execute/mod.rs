//! Instruction execution for the PUC8 ISA.
//!
//! Execution is a transition function: [`step`] reads a state and returns
//! the successor without touching the original. The only side effects are
//! device accesses routed through a [`Console`]. A faulting step returns the
//! [`Fault`] and no successor, so the caller still holds the state the
//! instruction started from.

mod flags;
mod helpers;

pub use flags::{alu, AluOutput};
pub use helpers::{condition_holds, effective_address};

use thiserror::Error;
use tracing::{debug, trace};

use crate::api::Console;
use crate::decoder::{decode, DecodeError};
use crate::encoding::{AluOp, Operation};
use crate::fault::Fault;
use crate::image::MemoryImage;
use crate::memory::{load, store};
use crate::state::{MachineState, Register, STACK_TOP};

/// A fault together with the state the faulting instruction started from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{fault} at pc {} after {steps} steps", .state.pc())]
pub struct SimulationError {
    /// What went wrong.
    pub fault: Fault,
    /// State before the faulting instruction.
    pub state: MachineState,
    /// Number of instructions completed before the fault.
    pub steps: u64,
}

/// Fetches the word at `pc` and executes it.
///
/// Addresses past the end of the code image fetch a zero word.
///
/// # Errors
///
/// Returns a [`Fault`] when the word does not decode, the stack bounds are
/// exceeded or a device access fails.
pub fn step<C: Console + ?Sized>(
    image: &MemoryImage,
    state: &MachineState,
    console: &mut C,
) -> Result<MachineState, Fault> {
    execute_instruction(image.fetch(state.pc()), state, console)
}

/// Executes one instruction word against `state`.
///
/// # Errors
///
/// See [`step`].
pub fn execute_instruction<C: Console + ?Sized>(
    word: u32,
    state: &MachineState,
    console: &mut C,
) -> Result<MachineState, Fault> {
    let decoded = decode(word)?;
    let fields = decoded.fields;
    trace!(pc = state.pc(), word, mnemonic = decoded.spec.mnemonic, "execute");

    let mut next = state.clone();
    next.set_reg(Register::PC, state.pc().wrapping_add(1));

    let indexed = || effective_address(state.regs[fields.r2()], fields.c4_signed());

    match decoded.spec.operation {
        Operation::Load => {
            let address = if fields.immediate() { fields.c8() } else { indexed() };
            next.regs[fields.r1()] = load(&state.memory, address, console)?;
        }
        Operation::Store => {
            let address = if fields.immediate() { fields.c8() } else { indexed() };
            store(&mut next.memory, address, state.regs[fields.r1()], console)?;
        }
        Operation::Move => {
            next.regs[fields.r1()] = if fields.immediate() {
                fields.c8()
            } else {
                state.regs[fields.r2()]
            };
        }
        Operation::Branch(condition) => {
            if condition_holds(condition, state.flags) {
                let target = if fields.immediate() {
                    fields.c8()
                } else {
                    effective_address(next.regs[fields.r2()], fields.c4_signed())
                };
                next.set_reg(Register::PC, target);
            }
        }
        Operation::Push => {
            let sp = state.sp();
            if sp == 0 {
                return Err(Fault::StackOverflow);
            }
            next.memory[usize::from(sp)] = state.regs[fields.r1()];
            next.set_reg(Register::SP, sp - 1);
        }
        Operation::Pop => {
            let sp = state.sp();
            if sp == STACK_TOP {
                return Err(Fault::StackUnderflow);
            }
            next.regs[fields.r1()] = state.memory[usize::from(sp) + 1];
            next.set_reg(Register::SP, next.sp().wrapping_add(1));
        }
        Operation::Call => {
            let sp = state.sp();
            if sp == 0 {
                return Err(Fault::StackOverflow);
            }
            next.memory[usize::from(sp)] = state.pc().wrapping_add(1);
            let target = if fields.immediate() {
                fields.c8()
            } else {
                state.regs[fields.r1()]
            };
            next.set_reg(Register::PC, target);
            next.set_reg(Register::SP, sp - 1);
        }
        Operation::Alu(op) => {
            let b = if fields.immediate() {
                match op {
                    AluOp::And | AluOp::Orr | AluOp::Eor => 1_u16 << fields.c4(),
                    _ => u16::from(fields.c4()),
                }
            } else {
                u16::from(state.regs[fields.r3()])
            };
            let output = alu(op, state.regs[fields.r2()], b);
            next.regs[fields.r1()] = output.value;
            next.flags = output.flags;
        }
        Operation::Directive(_) => return Err(DecodeError { word }.into()),
    }

    Ok(next)
}

/// Runs `steps` instructions from `state` and returns the final state.
///
/// # Errors
///
/// Returns a [`SimulationError`] carrying the last good state when an
/// instruction faults.
pub fn run_state<C: Console + ?Sized>(
    image: &MemoryImage,
    mut state: MachineState,
    steps: u64,
    console: &mut C,
) -> Result<MachineState, SimulationError> {
    for completed in 0..steps {
        match step(image, &state, console) {
            Ok(next) => state = next,
            Err(fault) => {
                debug!(class = fault.class(), pc = state.pc(), completed, "simulation fault");
                return Err(SimulationError {
                    fault,
                    state,
                    steps: completed,
                });
            }
        }
    }
    Ok(state)
}

/// Runs `steps` instructions from reset and returns the final program
/// counter.
///
/// # Errors
///
/// See [`run_state`].
pub fn run<C: Console + ?Sized>(
    image: &MemoryImage,
    steps: u64,
    console: &mut C,
) -> Result<u8, SimulationError> {
    run_state(image, MachineState::with_image(image), steps, console).map(|state| state.pc())
}
