//! Image emitters: VHDL ROM/RAM initializers, re-assemblable source, a
//! disassembly listing and JSON.

use std::io::{self, Write};

use puc8_core::{disassemble_image, format_word_fields, ImageEntry, MemoryImage, SymbolMap};
use serde_json::json;

/// Writes the image as VHDL array initializers.
///
/// With a package name the arrays are wrapped in a VHDL package with its
/// own `ROMT`/`RAMT` types; without one they are bare `signal`
/// declarations meant to be pasted into an architecture.
///
/// # Errors
///
/// Propagates write failures.
pub fn emit_vhdl<W: Write>(image: &MemoryImage, package: Option<&str>, out: &mut W) -> io::Result<()> {
    match package {
        Some(pkg) => {
            writeln!(out, "library ieee;")?;
            writeln!(out, "use ieee.std_logic_1164.all;")?;
            writeln!(out)?;
            writeln!(out, "package {pkg} is")?;
            writeln!(
                out,
                "  type {pkg}ROMT is array(0 to 255) of std_logic_vector(16 downto 0);"
            )?;
            writeln!(
                out,
                "  type {pkg}RAMT is array(0 to 255) of std_logic_vector(7 downto 0);"
            )?;
            writeln!(out)?;
            write!(out, "  constant {pkg}_rom: {pkg}ROMT := ")?;
        }
        None => write!(out, "  signal rom: ROMT := ")?,
    }
    emit_array(&image.code, |word| format!("{word:017b}"), out)?;

    match package {
        Some(pkg) => write!(out, "  constant {pkg}_ram: {pkg}RAMT := ")?,
        None => write!(out, "  signal ram: RAMT := ")?,
    }
    emit_array(&image.data, |byte| format!("{byte:08b}"), out)?;

    if let Some(pkg) = package {
        writeln!(out, "end package {pkg};")?;
    }
    Ok(())
}

fn emit_array<T, W>(entries: &[ImageEntry<T>], bits: impl Fn(&T) -> String, out: &mut W) -> io::Result<()>
where
    T: Default + PartialEq,
    W: Write,
{
    writeln!(out, "(")?;
    for (index, entry) in entries.iter().enumerate() {
        if !entry.is_padding() {
            writeln!(
                out,
                "    {index:3} => \"{}\", -- {}",
                bits(&entry.value),
                entry.annotation
            )?;
        }
    }
    writeln!(out, "     others => (others => '0'));")
}

/// Writes the image back as assembly source.
///
/// Each entry is replaced by its annotation; a run of padding entries is
/// replaced by a `.org` to the next annotated address.
///
/// # Errors
///
/// Propagates write failures.
pub fn emit_asm<W: Write>(image: &MemoryImage, out: &mut W) -> io::Result<()> {
    writeln!(out, ".section code")?;
    emit_asm_section(&image.code, out)?;
    writeln!(out, ".section data")?;
    emit_asm_section(&image.data, out)
}

fn emit_asm_section<T, W: Write>(entries: &[ImageEntry<T>], out: &mut W) -> io::Result<()> {
    let mut skipped = false;
    for (address, entry) in entries.iter().enumerate() {
        if entry.annotation.is_empty() {
            skipped = true;
            continue;
        }
        if skipped {
            writeln!(out, ".org {address}")?;
            skipped = false;
        }
        writeln!(out, "{}", entry.annotation)?;
    }
    Ok(())
}

/// Writes a disassembly listing of the code section followed by a dump of
/// the data section.
///
/// # Errors
///
/// Propagates write failures.
pub fn emit_listing<W: Write>(image: &MemoryImage, symbols: &SymbolMap, out: &mut W) -> io::Result<()> {
    writeln!(out, "; code")?;
    for row in disassemble_image(image, Some(symbols)) {
        let text = row
            .text
            .map_or_else(|| "???".to_string(), |text| text.to_string());
        writeln!(
            out,
            "{:3}: {}  {text:<20} ; {}",
            row.address,
            format_word_fields(row.word),
            row.annotation
        )?;
    }

    writeln!(out, "; data")?;
    for (address, entry) in image.data.iter().enumerate() {
        if !entry.is_padding() {
            writeln!(out, "{address:3}: {:08b}  ; {}", entry.value, entry.annotation)?;
        }
    }
    Ok(())
}

/// Writes the image and symbol maps as pretty-printed JSON.
///
/// # Errors
///
/// Propagates write and serialization failures.
pub fn emit_json<W: Write>(image: &MemoryImage, symbols: &SymbolMap, out: &mut W) -> io::Result<()> {
    let document = json!({
        "code": image.code,
        "data": image.data,
        "symbols": symbols,
    });
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)
}
