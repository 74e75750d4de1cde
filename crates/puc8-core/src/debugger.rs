//! Interactive single-step debugger.
//!
//! Before each command the debugger prints the current program counter, the
//! word's bit groups and its disassembly. After each command it prints what
//! changed, indented under the prompt.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::api::Console;
use crate::disasm::{disassemble, format_word_fields};
use crate::execute::{step, SimulationError};
use crate::image::{MemoryImage, SymbolMap};
use crate::literal::parse_integer;
use crate::state::{diff, format_changes, MachineState, Register};

/// Upper bound on instructions executed by one `c` command.
pub const CONTINUE_LIMIT: u64 = 1 << 16;

/// Text printed for `h` and for unrecognized input.
pub const HELP_TEXT: &str = "\
Available commands:
   h       This help.
   n       Advance to next instruction.
   c       Continue until a branch is taken.
   p       Print current state.
   q       Exit simulator.
   rx      Print contents of register x.
   rx = y  Set register x to value y.
   [a]     Print contents of memory address a.
   [a] = y Set memory address a to value y.
";

/// One debugger command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `h`
    Help,
    /// `n` or an empty line.
    Step,
    /// `c`
    Continue,
    /// `p`
    Print,
    /// `q`
    Quit,
    /// `rX`
    ShowRegister(Register),
    /// `rX = y`
    SetRegister(Register, u8),
    /// `[a]`
    ShowMemory(u8),
    /// `[a] = y`
    SetMemory(u8, u8),
}

/// Reasons a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Not a command at all; the help text is shown.
    #[error("unknown command '{0}'")]
    Unknown(String),
    /// `r` followed by something other than a register number.
    #[error("invalid register '{0}'")]
    BadRegister(String),
    /// Bracketed text that is not a decimal address below 256.
    #[error("invalid address '{0}'")]
    BadAddress(String),
    /// Right-hand side of an assignment is not an integer.
    #[error("invalid value '{0}'")]
    BadValue(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        match line {
            "" | "n" => return Ok(Self::Step),
            "h" => return Ok(Self::Help),
            "c" => return Ok(Self::Continue),
            "p" => return Ok(Self::Print),
            "q" => return Ok(Self::Quit),
            _ => {}
        }

        let tokens: Vec<&str> = line.split('=').map(str::trim).collect();
        let value = match tokens.as_slice() {
            [_] => None,
            [_, value] => Some(parse_value(value)?),
            _ => return Err(CommandError::Unknown(line.to_string())),
        };
        let target = tokens[0];

        if let Some(inner) = target
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let address = inner
                .trim()
                .parse::<u8>()
                .map_err(|_| CommandError::BadAddress(inner.to_string()))?;
            return Ok(value.map_or(Self::ShowMemory(address), |v| {
                Self::SetMemory(address, v)
            }));
        }

        if let Ok(register) = target.parse::<Register>() {
            return Ok(value.map_or(Self::ShowRegister(register), |v| {
                Self::SetRegister(register, v)
            }));
        }

        if target.len() >= 2 && target.starts_with('r') {
            return Err(CommandError::BadRegister(target.to_string()));
        }
        Err(CommandError::Unknown(line.to_string()))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_value(text: &str) -> Result<u8, CommandError> {
    parse_integer(text)
        .map(|value| (value & 0xFF) as u8)
        .ok_or_else(|| CommandError::BadValue(text.to_string()))
}

/// Failures that end a debugging session.
#[derive(Debug, Error)]
pub enum DebuggerError {
    /// Reading commands or writing output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An instruction faulted.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Whether the session continues after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next command.
    Proceed,
    /// Leave the session.
    Exit,
}

/// Interactive session over one memory image.
pub struct Debugger<'a, C> {
    image: &'a MemoryImage,
    symbols: Option<&'a SymbolMap>,
    state: MachineState,
    console: C,
    steps: u64,
}

impl<'a, C: Console> Debugger<'a, C> {
    /// Starts a session from reset with the image's data loaded.
    pub fn new(image: &'a MemoryImage, console: C) -> Self {
        Self {
            image,
            symbols: None,
            state: MachineState::with_image(image),
            console,
            steps: 0,
        }
    }

    /// Uses `symbols` when printing disassembly.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn with_symbols(mut self, symbols: &'a SymbolMap) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Current machine state.
    #[must_use]
    pub const fn state(&self) -> &MachineState {
        &self.state
    }

    /// Instructions executed so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// `pc: bits (disassembly)` line for the instruction about to run.
    #[must_use]
    pub fn status_line(&self) -> String {
        let pc = self.state.pc();
        let word = self.image.fetch(pc);
        let text = disassemble(word, self.symbols)
            .map_or_else(|error| error.to_string(), |dis| dis.to_string());
        format!("{pc:3}: {} ({text})", format_word_fields(word))
    }

    /// Applies one command, writing any report to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError`] when writing fails or an instruction faults.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow, DebuggerError> {
        match command {
            Command::Help => out.write_all(HELP_TEXT.as_bytes())?,
            Command::Step => self.step_once()?,
            Command::Continue => self.continue_until_branch(out)?,
            Command::Print => writeln!(out, "{}", self.state)?,
            Command::Quit => return Ok(Flow::Exit),
            Command::ShowRegister(register) => {
                writeln!(out, "{register} = {}", self.state.reg(register))?;
            }
            Command::SetRegister(register, value) => self.state.set_reg(register, value),
            Command::ShowMemory(address) => {
                writeln!(out, "[{address}] = {}", self.state.memory[usize::from(address)])?;
            }
            Command::SetMemory(address, value) => {
                self.state.memory[usize::from(address)] = value;
            }
        }
        Ok(Flow::Proceed)
    }

    /// Reads commands from `input` until `q` or end of input.
    ///
    /// # Errors
    ///
    /// Returns [`DebuggerError`] on I/O failure or when an instruction
    /// faults; the fault carries the state at that point.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> Result<(), DebuggerError> {
        let mut line = String::new();
        loop {
            writeln!(out, "{}", self.status_line())?;
            write!(out, ">> ")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }

            let before = self.state.clone();
            match line.parse::<Command>() {
                Ok(command) => {
                    if self.execute(command, &mut out)? == Flow::Exit {
                        return Ok(());
                    }
                }
                Err(CommandError::Unknown(_)) => out.write_all(HELP_TEXT.as_bytes())?,
                Err(error) => writeln!(out, "{error}")?,
            }

            let changes = diff(&before, &self.state);
            if !changes.is_empty() {
                writeln!(out, "     {}", format_changes(&changes))?;
            }
        }
    }

    fn step_once(&mut self) -> Result<(), SimulationError> {
        match step(self.image, &self.state, &mut self.console) {
            Ok(next) => {
                self.state = next;
                self.steps += 1;
                Ok(())
            }
            Err(fault) => Err(SimulationError {
                fault,
                state: self.state.clone(),
                steps: self.steps,
            }),
        }
    }

    fn continue_until_branch<W: Write>(&mut self, out: &mut W) -> Result<(), DebuggerError> {
        for _ in 0..CONTINUE_LIMIT {
            let expected = self.state.pc().wrapping_add(1);
            self.step_once()?;
            if self.state.pc() != expected {
                return Ok(());
            }
        }
        debug!(limit = CONTINUE_LIMIT, "continue limit reached");
        writeln!(out, "no branch taken after {CONTINUE_LIMIT} instructions")?;
        Ok(())
    }
}
