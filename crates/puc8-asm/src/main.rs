//! CLI entry point for the PUC8 assembler binary.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use puc8_asm::assembler::{assemble_lines, Assembly};
use puc8_asm::emitter::{emit_asm, emit_json, emit_listing, emit_vhdl};
use puc8_asm::preprocess::Preprocessor;
use puc8_asm::source::write_dump;
use puc8_core::{run, Debugger, DebuggerError, LineConsole, SimulationError, StdConsole};
use serde_json as _;
use thiserror as _;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
use pretty_assertions as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;

/// Output format for an assembled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// VHDL ROM and RAM initializers.
    Vhdl,
    /// Re-assemblable source.
    Asm,
    /// Disassembly listing.
    Listing,
    /// Image and symbols as JSON.
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Assembler and simulator for the PUC8 processor")]
struct Cli {
    /// Assembly source file.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output file; `-` writes to stdout.
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Simulate the program interactively.
    #[arg(short, long)]
    simulate: bool,

    /// Run headless and fail unless the final pc equals N.
    #[arg(short, long, value_name = "N")]
    test: Option<u8>,

    /// Instructions executed by --test.
    #[arg(long, default_value_t = 1000)]
    steps: u64,

    /// Output preprocessed assembly instead of an image.
    #[arg(short = 'E')]
    preprocess_only: bool,

    /// Image output format.
    #[arg(short, long, value_enum, default_value_t = Format::Vhdl)]
    format: Format,
}

impl Cli {
    fn writes_stdout(&self) -> bool {
        self.output == "-"
    }

    /// VHDL package name: the output file stem, none when writing to stdout.
    fn package(&self) -> Option<String> {
        if self.writes_stdout() {
            return None;
        }
        Path::new(&self.output)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    }
}

fn open_output(cli: &Cli) -> Result<Box<dyn Write>> {
    if cli.writes_stdout() {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(&cli.output).with_context(|| format!("cannot create {}", cli.output))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn run_cli(cli: &Cli) -> Result<()> {
    let lines = Preprocessor::new().process(&cli.file)?;

    if cli.preprocess_only {
        let mut out = open_output(cli)?;
        write_dump(&lines, &mut out)?;
        out.flush()?;
        return Ok(());
    }

    let assembly = assemble_lines(lines)?;

    if cli.simulate {
        return simulate(&assembly);
    }
    if let Some(expected) = cli.test {
        return run_test(&assembly, cli.steps, expected);
    }

    let mut out = open_output(cli)?;
    match cli.format {
        Format::Vhdl => emit_vhdl(&assembly.image, cli.package().as_deref(), &mut out)?,
        Format::Asm => emit_asm(&assembly.image, &mut out)?,
        Format::Listing => emit_listing(&assembly.image, &assembly.symbol_map(), &mut out)?,
        Format::Json => emit_json(&assembly.image, &assembly.symbol_map(), &mut out)?,
    }
    out.flush()?;
    Ok(())
}

fn simulate(assembly: &Assembly) -> Result<()> {
    let symbols = assembly.symbol_map();
    let mut debugger = Debugger::new(&assembly.image, LineConsole::stdio()).with_symbols(&symbols);
    debugger.run(BufReader::with_capacity(1, io::stdin()), io::stdout())?;
    debug!(steps = debugger.steps(), "simulation ended");
    Ok(())
}

fn run_test(assembly: &Assembly, steps: u64, expected: u8) -> Result<()> {
    let mut console = StdConsole::stdio();
    let pc = run(&assembly.image, steps, &mut console)?;
    if pc != expected {
        bail!("pc after {steps} steps is {pc}, expected {expected}");
    }
    debug!(pc, steps, "test passed");
    Ok(())
}

fn simulation_error(error: &anyhow::Error) -> Option<&SimulationError> {
    if let Some(simulation) = error.downcast_ref::<SimulationError>() {
        return Some(simulation);
    }
    match error.downcast_ref::<DebuggerError>() {
        Some(DebuggerError::Simulation(simulation)) => Some(simulation),
        _ => None,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run_cli(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            if let Some(simulation) = simulation_error(&error) {
                eprintln!("{}", simulation.state);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("puc8-asm").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = parse(&["prog.asm"]);
        assert_eq!(cli.file, PathBuf::from("prog.asm"));
        assert_eq!(cli.output, "-");
        assert!(!cli.simulate);
        assert_eq!(cli.test, None);
        assert_eq!(cli.steps, 1000);
        assert!(!cli.preprocess_only);
        assert_eq!(cli.format, Format::Vhdl);
        assert_eq!(cli.package(), None);
    }

    #[test]
    fn short_flags() {
        let cli = parse(&["prog.asm", "-o", "out/rom.vhd", "-t", "12", "-E", "-f", "listing"]);
        assert_eq!(cli.output, "out/rom.vhd");
        assert_eq!(cli.test, Some(12));
        assert!(cli.preprocess_only);
        assert_eq!(cli.format, Format::Listing);
        assert_eq!(cli.package().as_deref(), Some("rom"));
    }

    #[test]
    fn rejects_out_of_range_test_pc() {
        assert!(Cli::try_parse_from(["puc8-asm", "prog.asm", "-t", "256"]).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Cli::try_parse_from(["puc8-asm"]).is_err());
    }

    #[test]
    fn finds_simulation_errors_inside_debugger_errors() {
        let simulation = SimulationError {
            fault: puc8_core::Fault::StackUnderflow,
            state: puc8_core::MachineState::default(),
            steps: 0,
        };
        let direct = anyhow::Error::new(simulation.clone());
        assert_eq!(simulation_error(&direct), Some(&simulation));

        let wrapped = anyhow::Error::new(DebuggerError::Simulation(simulation.clone()));
        assert_eq!(simulation_error(&wrapped), Some(&simulation));

        assert_eq!(simulation_error(&anyhow::anyhow!("other")), None);
    }
}
