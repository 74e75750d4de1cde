//! Preprocessed source lines.
//!
//! A [`SourceLine`] is what the preprocessor hands to both passes: a
//! lowercase, comment-free instruction with its optional label and the
//! `file:line` it came from. Macro expansion keeps the origin of the
//! template line, so errors inside a macro body point at the body.

use std::fmt;
use std::io::{self, Write};

use crate::errors::Origin;
use crate::parser::Instruction;

/// One logical line after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Where the line was written.
    pub origin: Origin,
    /// Label defined on this line, without the colon.
    pub label: Option<String>,
    /// Instruction or directive text, trimmed and lowercased.
    pub instruction: Option<String>,
}

impl SourceLine {
    /// Creates a line.
    #[must_use]
    pub const fn new(origin: Origin, label: Option<String>, instruction: Option<String>) -> Self {
        Self {
            origin,
            label,
            instruction,
        }
    }

    /// Tokenizes the instruction text, if any.
    #[must_use]
    pub fn parse(&self) -> Option<Instruction> {
        self.instruction.as_deref().map(Instruction::parse)
    }

    /// Instruction text, or the empty string.
    #[must_use]
    pub fn text(&self) -> &str {
        self.instruction.as_deref().unwrap_or("")
    }
}

/// The `label: instruction` part of a dump line.
struct Body<'a>(&'a SourceLine);

impl fmt::Display for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.0.label {
            write!(f, "{label}: ")?;
        }
        f.write_str(self.0.text())
    }
}

/// Formats as one dump line with an unpadded origin:
/// `file:line label: instruction`.
impl fmt::Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.origin, Body(self))
    }
}

/// Column widths that right-align every origin of a line stream.
///
/// The file column is as wide as the longest file name. The line column is
/// `ceil(log10(n))` digits for the highest line number `n`, so a stream
/// ending on line 10 still gets one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OriginWidths {
    file: usize,
    line: usize,
}

impl OriginWidths {
    /// Measures `lines`.
    #[must_use]
    pub fn of(lines: &[SourceLine]) -> Self {
        let file = lines
            .iter()
            .map(|line| line.origin.file.chars().count())
            .max()
            .unwrap_or(0);
        let last = lines.iter().map(|line| line.origin.line).max().unwrap_or(0);

        let mut digits = 0;
        let mut bound = 1_usize;
        while bound < last {
            bound = bound.saturating_mul(10);
            digits += 1;
        }
        Self { file, line: digits }
    }

    /// `file:line` padded on the left to these widths.
    #[must_use]
    pub fn format(&self, origin: &Origin) -> String {
        format!(
            "{:>file$}:{:>line$}",
            origin.file,
            origin.line,
            file = self.file,
            line = self.line
        )
    }
}

/// Writes the preprocessed dump, one line per entry, origins right-aligned.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_dump<W: Write>(lines: &[SourceLine], out: &mut W) -> io::Result<()> {
    let widths = OriginWidths::of(lines);
    for line in lines {
        writeln!(out, "{} {}", widths.format(&line.origin), Body(line))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_format_with_and_without_label() {
        let origin = Origin::new("a.asm", 4);
        let labelled = SourceLine::new(
            origin.clone(),
            Some("loop".to_string()),
            Some("b @loop".to_string()),
        );
        assert_eq!(labelled.to_string(), "a.asm:4 loop: b @loop");

        let bare = SourceLine::new(origin, None, Some("ret".to_string()));
        assert_eq!(bare.to_string(), "a.asm:4 ret");
    }

    fn line(file: &str, number: usize, text: &str) -> SourceLine {
        SourceLine::new(Origin::new(file, number), None, Some(text.to_string()))
    }

    #[test]
    fn dump_right_aligns_files_and_line_numbers() {
        let lines = vec![
            line("main.asm", 2, "mov r0, 1"),
            line("io.asm", 7, "ret"),
            SourceLine::new(Origin::new("main.asm", 12), Some("end".to_string()), None),
        ];
        let mut out = Vec::new();
        write_dump(&lines, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "main.asm: 2 mov r0, 1\n  io.asm: 7 ret\nmain.asm:12 end: \n"
        );
    }

    #[test]
    fn line_width_follows_the_highest_line_number() {
        let width = |last| OriginWidths::of(&[line("a", last, "ret")]).line;
        assert_eq!(width(1), 0);
        assert_eq!(width(5), 1);
        assert_eq!(width(10), 1);
        assert_eq!(width(11), 2);
        assert_eq!(width(100), 2);
        assert_eq!(OriginWidths::of(&[]), OriginWidths::default());
    }

    #[test]
    fn label_only_lines_have_no_instruction() {
        let line = SourceLine::new(Origin::new("a.asm", 1), Some("end".to_string()), None);
        assert!(line.parse().is_none());
        assert_eq!(line.text(), "");
    }
}
