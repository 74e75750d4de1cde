//! Terminal consoles backing the memory-mapped display and keyboard.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Stdin, Stdout, Write};

use crate::api::{Console, ConsoleError};

/// Console over a host byte stream pair.
///
/// Output is flushed after every character so that interleaving with the
/// debugger prompt stays readable.
#[derive(Debug)]
pub struct StdConsole<R, W> {
    input: R,
    output: W,
}

impl StdConsole<Stdin, Stdout> {
    /// Console bound to the process standard input and output.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<R: Read, W: Write> StdConsole<R, W> {
    /// Wraps a reader for the keyboard and a writer for the display.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Releases the underlying streams.
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: Read, W: Write> Console for StdConsole<R, W> {
    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        let mut byte = [0_u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Err(ConsoleError::InputExhausted),
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        self.output.write_all(&[byte])?;
        self.output.flush()?;
        Ok(())
    }

    fn write_newline(&mut self) -> Result<(), ConsoleError> {
        self.write_char(b'\n')
    }
}

/// Console whose keyboard reads whole lines.
///
/// Each keyboard read consumes one input line and answers with its first
/// byte; an empty line answers `\n`. Used when the keyboard shares a
/// stream with a line-based command reader, so the Enter that ends a typed
/// character is not left behind as an extra command.
#[derive(Debug)]
pub struct LineConsole<R, W> {
    input: R,
    output: W,
    line: Vec<u8>,
}

impl LineConsole<BufReader<Stdin>, Stdout> {
    /// Console bound to the process standard input and output.
    ///
    /// The reader buffers a single byte so that input not yet claimed by
    /// the keyboard stays available to other readers of stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::with_capacity(1, io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    /// Wraps a line reader for the keyboard and a writer for the display.
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            line: Vec::new(),
        }
    }

    /// Releases the underlying streams.
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        self.line.clear();
        if self.input.read_until(b'\n', &mut self.line)? == 0 {
            return Err(ConsoleError::InputExhausted);
        }
        Ok(self.line[0])
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        self.output.write_all(&[byte])?;
        self.output.flush()?;
        Ok(())
    }

    fn write_newline(&mut self) -> Result<(), ConsoleError> {
        self.write_char(b'\n')
    }
}

/// In-memory console fed from a fixed input script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedConsole {
    /// Creates a console that will answer keyboard reads from `input`.
    #[must_use]
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Everything written to the display so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Display output decoded lossily as text.
    #[must_use]
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Number of keyboard characters not yet consumed.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}

impl Console for ScriptedConsole {
    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        self.input.pop_front().ok_or(ConsoleError::InputExhausted)
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        self.output.push(byte);
        Ok(())
    }

    fn write_newline(&mut self) -> Result<(), ConsoleError> {
        self.output.push(b'\n');
        Ok(())
    }
}
