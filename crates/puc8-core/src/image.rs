//! Assembled memory image and address-to-symbol maps.
//!
//! An image holds two independent sections addressed from zero: `code`
//! (17-bit instruction words, one per address) and `data` (bytes). Every
//! entry carries the annotation the assembler produced for it, so that
//! emitters and the simulator trace can point back at the source line.
//! Padding entries created by `.org` are zero with an empty annotation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Maximum number of entries in either section.
pub const SECTION_CAPACITY: usize = 256;

/// Assembly section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Section {
    /// Instruction words.
    Code,
    /// Data bytes.
    Data,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Code => "code",
            Self::Data => "data",
        })
    }
}

/// Error returned for section names other than `code` and `data`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownSection(pub String);

impl fmt::Display for UnknownSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown section '{}'", self.0)
    }
}

impl std::error::Error for UnknownSection {}

impl FromStr for Section {
    type Err = UnknownSection;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "code" => Ok(Self::Code),
            "data" => Ok(Self::Data),
            other => Err(UnknownSection(other.to_string())),
        }
    }
}

/// One section entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ImageEntry<T> {
    /// Word or byte value.
    pub value: T,
    /// `origin: label: source` text, empty for padding.
    pub annotation: String,
}

impl<T> ImageEntry<T> {
    /// Creates an annotated entry.
    pub fn new(value: T, annotation: impl Into<String>) -> Self {
        Self {
            value,
            annotation: annotation.into(),
        }
    }
}

impl<T: Default> ImageEntry<T> {
    /// Zero entry without annotation.
    #[must_use]
    pub fn padding() -> Self {
        Self::default()
    }

    /// Returns `true` for entries created by `.org` padding.
    #[must_use]
    pub fn is_padding(&self) -> bool
    where
        T: PartialEq,
    {
        self.annotation.is_empty() && self.value == T::default()
    }
}

/// Assembled program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryImage {
    /// Instruction words, indexed by program counter.
    pub code: Vec<ImageEntry<u32>>,
    /// Initial data memory, indexed by address.
    pub data: Vec<ImageEntry<u8>>,
}

impl MemoryImage {
    /// Returns the word at `pc`, or a zero word past the end of the image.
    #[must_use]
    pub fn fetch(&self, pc: u8) -> u32 {
        self.code.get(usize::from(pc)).map_or(0, |entry| entry.value)
    }

    /// Returns the annotation of the word at `pc`.
    #[must_use]
    pub fn annotation(&self, pc: u8) -> &str {
        self.code
            .get(usize::from(pc))
            .map_or("", |entry| entry.annotation.as_str())
    }
}

/// Address-to-name maps used to print symbolic operands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SymbolMap {
    /// Labels bound in the code section.
    pub code: BTreeMap<u8, String>,
    /// Labels bound in the data section.
    pub data: BTreeMap<u8, String>,
}

impl SymbolMap {
    /// Records `name` at `address` unless the address already has a name.
    pub fn insert(&mut self, section: Section, address: u8, name: impl Into<String>) {
        let map = match section {
            Section::Code => &mut self.code,
            Section::Data => &mut self.data,
        };
        map.entry(address).or_insert_with(|| name.into());
    }

    /// Name bound to `address` in `section`.
    #[must_use]
    pub fn lookup(&self, section: Section, address: u8) -> Option<&str> {
        let map = match section {
            Section::Code => &self.code,
            Section::Data => &self.data,
        };
        map.get(&address).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_past_end_reads_zero() {
        let mut image = MemoryImage::default();
        image.code.push(ImageEntry::new(0x1_2345, "x"));
        assert_eq!(image.fetch(0), 0x1_2345);
        assert_eq!(image.fetch(1), 0);
        assert_eq!(image.annotation(0), "x");
        assert_eq!(image.annotation(200), "");
    }

    #[test]
    fn padding_entries() {
        assert!(ImageEntry::<u8>::padding().is_padding());
        assert!(!ImageEntry::new(0_u8, "a.asm:1: .db 0").is_padding());
        assert!(!ImageEntry::new(1_u8, "").is_padding());
    }

    #[test]
    fn section_names() {
        assert_eq!("code".parse(), Ok(Section::Code));
        assert_eq!("data".parse(), Ok(Section::Data));
        assert_eq!(
            "bss".parse::<Section>(),
            Err(UnknownSection("bss".to_string()))
        );
        assert_eq!(Section::Data.to_string(), "data");
    }

    #[test]
    fn symbol_map_keeps_first_name() {
        let mut map = SymbolMap::default();
        map.insert(Section::Code, 3, "loop");
        map.insert(Section::Code, 3, "again");
        map.insert(Section::Data, 3, "buffer");
        assert_eq!(map.lookup(Section::Code, 3), Some("loop"));
        assert_eq!(map.lookup(Section::Data, 3), Some("buffer"));
        assert_eq!(map.lookup(Section::Data, 4), None);
    }
}
