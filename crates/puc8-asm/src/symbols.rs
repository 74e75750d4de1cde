//! Symbol table and pass-1 address assignment.
//!
//! This module implements the first pass of assembly: walking preprocessed
//! lines, advancing a location counter per section, and binding every label
//! to the counter of the section it appears in. `.equ` binds a constant
//! with no section. No operand is resolved here, so forward references are
//! free.

use std::collections::BTreeMap;

use puc8_core::{parse_integer, Section, SymbolMap, UnknownSection};

use crate::errors::{AsmError, ErrorKind, Origin};
use crate::source::SourceLine;

/// A label or constant binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Address or constant value.
    pub value: i64,
    /// Section of a label, `None` for `.equ` constants.
    pub section: Option<Section>,
    /// Where the name was bound.
    pub origin: Origin,
}

/// Name to binding map, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::LabelRedefinition`] when `name` is already bound.
    pub fn define(&mut self, name: &str, symbol: Symbol) -> Result<(), ErrorKind> {
        if let Some(existing) = self.symbols.get(name) {
            return Err(ErrorKind::LabelRedefinition {
                name: name.to_string(),
                first: existing.origin.clone(),
            });
        }
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    fn rebind(&mut self, name: &str, value: i64) {
        if let Some(symbol) = self.symbols.get_mut(name) {
            symbol.value = value;
        }
    }

    /// Looks up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Value bound to `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<i64> {
        self.get(name).map(|symbol| symbol.value)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(name, symbol)| (name.as_str(), symbol))
    }

    /// Length of the longest bound name, constants included.
    #[must_use]
    pub fn longest_name(&self) -> usize {
        self.symbols.keys().map(String::len).max().unwrap_or(0)
    }

    /// Address-to-name maps for the disassembler.
    ///
    /// Only labels with an in-range address are included; where several
    /// labels share an address the alphabetically first one wins.
    #[must_use]
    pub fn symbol_map(&self) -> SymbolMap {
        let mut map = SymbolMap::default();
        for (name, symbol) in &self.symbols {
            if let (Some(section), Ok(address)) = (symbol.section, u8::try_from(symbol.value)) {
                map.insert(section, address, name);
            }
        }
        map
    }
}

#[derive(Debug, Default)]
struct Counters {
    code: i64,
    data: i64,
}

impl Counters {
    fn get_mut(&mut self, section: Section) -> &mut i64 {
        match section {
            Section::Code => &mut self.code,
            Section::Data => &mut self.data,
        }
    }
}

/// Assigns addresses to all labels (pass 1).
///
/// Every line other than `.org`, `.equ` and `.section` occupies one entry
/// in the active section. A label on a `.org` line names the address the
/// directive moves to.
///
/// # Errors
///
/// Returns an [`AsmError`] on a duplicate name, a malformed or backwards
/// `.org`, a malformed `.equ`, an unknown section, or `.db` in the code
/// section.
pub fn assign_addresses(lines: &[SourceLine]) -> Result<SymbolTable, AsmError> {
    let mut table = SymbolTable::new();
    let mut section = Section::Code;
    let mut counters = Counters::default();

    for line in lines {
        assign_line(line, &mut table, &mut section, &mut counters)
            .map_err(|kind| kind.at(line.origin.clone()))?;
    }

    Ok(table)
}

fn assign_line(
    line: &SourceLine,
    table: &mut SymbolTable,
    section: &mut Section,
    counters: &mut Counters,
) -> Result<(), ErrorKind> {
    let here = *counters.get_mut(*section);
    if let Some(label) = &line.label {
        table.define(
            label,
            Symbol {
                value: here,
                section: Some(*section),
                origin: line.origin.clone(),
            },
        )?;
    }

    let Some(instruction) = line.parse() else {
        return Ok(());
    };
    let operands = instruction.operands.as_slice();

    match instruction.mnemonic.as_str() {
        ".org" => {
            let operand = operands.first().ok_or(ErrorKind::MissingOperand {
                directive: ".org",
                required: "an address argument",
            })?;
            let requested =
                parse_integer(operand).ok_or_else(|| ErrorKind::BadAddress(operand.clone()))?;
            if requested < here {
                return Err(ErrorKind::OrgBackwards {
                    current: here,
                    requested,
                });
            }
            *counters.get_mut(*section) = requested;
            if let Some(label) = &line.label {
                table.rebind(label, requested);
            }
        }
        ".equ" => {
            let [name, value, ..] = operands else {
                return Err(ErrorKind::MissingOperand {
                    directive: ".equ",
                    required: "2 arguments",
                });
            };
            let value = parse_integer(value).ok_or_else(|| ErrorKind::BadConstant(value.clone()))?;
            table.define(
                name,
                Symbol {
                    value,
                    section: None,
                    origin: line.origin.clone(),
                },
            )?;
        }
        ".db" if *section == Section::Code => return Err(ErrorKind::DbInCodeSection),
        ".section" => {
            let name = operands.first().ok_or(ErrorKind::MissingOperand {
                directive: ".section",
                required: "a section name",
            })?;
            *section = name
                .parse()
                .map_err(|UnknownSection(name)| ErrorKind::UnknownSection(name))?;
        }
        _ => *counters.get_mut(*section) += 1,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{normalize, split_label};

    fn lines(source: &str) -> Vec<SourceLine> {
        source
            .lines()
            .enumerate()
            .filter_map(|(index, raw)| {
                let (label, instruction) = split_label(&normalize(raw));
                (label.is_some() || instruction.is_some())
                    .then(|| SourceLine::new(Origin::new("t.asm", index + 1), label, instruction))
            })
            .collect()
    }

    fn assign(source: &str) -> Result<SymbolTable, AsmError> {
        assign_addresses(&lines(source))
    }

    #[test]
    fn labels_take_the_location_counter() {
        let table = assign("start: mov r0, 1\nloop: b @loop\nend:").unwrap();
        assert_eq!(table.value("start"), Some(0));
        assert_eq!(table.value("loop"), Some(1));
        assert_eq!(table.value("end"), Some(2));
        assert_eq!(table.get("loop").unwrap().section, Some(Section::Code));
    }

    #[test]
    fn forward_references_need_no_definition_yet() {
        let table = assign("b @later\nmov r0, 0\nlater: ret").unwrap();
        assert_eq!(table.value("later"), Some(2));
    }

    #[test]
    fn sections_keep_separate_counters() {
        let source = "\
mov r0, 0
.section data
a: .db 1
b: .db 2
.section code
c: ret
";
        let table = assign(source).unwrap();
        assert_eq!(table.value("a"), Some(0));
        assert_eq!(table.value("b"), Some(1));
        assert_eq!(table.value("c"), Some(1));
        assert_eq!(table.get("b").unwrap().section, Some(Section::Data));
    }

    #[test]
    fn org_moves_the_counter_and_rebinds_its_label() {
        let table = assign("mov r0, 0\nhere: .org 10\nnext: ret").unwrap();
        assert_eq!(table.value("here"), Some(10));
        assert_eq!(table.value("next"), Some(10));
    }

    #[test]
    fn equ_binds_a_constant() {
        let table = assign(".equ size, 0x10\nmov r0, 0").unwrap();
        let symbol = table.get("size").unwrap();
        assert_eq!(symbol.value, 16);
        assert_eq!(symbol.section, None);
        assert_eq!(table.longest_name(), 4);
    }

    #[test]
    fn redefinition_is_an_error() {
        let error = assign("x: ret\nx: ret").unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::LabelRedefinition {
                name: "x".to_string(),
                first: Origin::new("t.asm", 1),
            }
        );
        assert_eq!(error.origin, Some(Origin::new("t.asm", 2)));

        let equ = assign("x: ret\n.equ x, 1").unwrap_err();
        assert!(matches!(equ.kind, ErrorKind::LabelRedefinition { .. }));
    }

    #[test]
    fn directive_errors() {
        let cases = [
            (
                ".org",
                ErrorKind::MissingOperand {
                    directive: ".org",
                    required: "an address argument",
                },
            ),
            (".org @x", ErrorKind::BadAddress("@x".to_string())),
            (
                "ret\nret\n.org 1",
                ErrorKind::OrgBackwards {
                    current: 2,
                    requested: 1,
                },
            ),
            (
                ".equ x",
                ErrorKind::MissingOperand {
                    directive: ".equ",
                    required: "2 arguments",
                },
            ),
            (".equ x, y", ErrorKind::BadConstant("y".to_string())),
            (".db 1", ErrorKind::DbInCodeSection),
            (".section bss", ErrorKind::UnknownSection("bss".to_string())),
        ];
        for (source, expected) in cases {
            assert_eq!(assign(source).unwrap_err().kind, expected, "{source}");
        }
    }

    #[test]
    fn symbol_map_holds_labels_only() {
        let table = assign(".equ k, 3\nf: ret\n.section data\nv: .db 0").unwrap();
        let map = table.symbol_map();
        assert_eq!(map.lookup(Section::Code, 0), Some("f"));
        assert_eq!(map.lookup(Section::Data, 0), Some("v"));
        assert_eq!(map.lookup(Section::Code, 3), None);
    }
}
