//! Register file naming.
//!
//! The sixteen registers are plain 8-bit cells. Three of them carry a
//! conventional role and an alias name: `r13` is the frame pointer, `r14` the
//! stack pointer and `r15` the program counter.

use std::fmt;
use std::str::FromStr;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// A register index in `0..16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(u8);

impl Register {
    /// Frame pointer, `r13`.
    pub const FP: Self = Self(13);
    /// Stack pointer, `r14`.
    pub const SP: Self = Self(14);
    /// Program counter, `r15`.
    pub const PC: Self = Self(15);

    /// Returns the register with the given index, if it exists.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Array index into the register file.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Alias name for the three special-purpose registers.
    #[must_use]
    pub const fn alias(self) -> Option<&'static str> {
        match self.0 {
            13 => Some("fp"),
            14 => Some("sp"),
            15 => Some("pc"),
            _ => None,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alias() {
            Some(alias) => f.write_str(alias),
            None => write!(f, "r{}", self.0),
        }
    }
}

/// Error returned when text does not name a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseRegisterError;

impl fmt::Display for ParseRegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a register")
    }
}

impl std::error::Error for ParseRegisterError {}

impl FromStr for Register {
    type Err = ParseRegisterError;

    /// Accepts `r0`..`r15` and the aliases `fp`, `sp`, `pc`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "fp" => return Ok(Self::FP),
            "sp" => return Ok(Self::SP),
            "pc" => return Ok(Self::PC),
            _ => {}
        }
        let digits = text.strip_prefix('r').ok_or(ParseRegisterError)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseRegisterError);
        }
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or(ParseRegisterError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_and_alias_names() {
        assert_eq!("r0".parse(), Ok(Register(0)));
        assert_eq!("r15".parse(), Ok(Register::PC));
        assert_eq!("sp".parse(), Ok(Register::SP));
        assert_eq!("fp".parse(), Ok(Register::FP));
    }

    #[test]
    fn rejects_non_registers() {
        for text in ["r16", "r", "x1", "r-1", "r+1", "R1", "r1a", ""] {
            assert_eq!(text.parse::<Register>(), Err(ParseRegisterError), "{text}");
        }
    }

    #[test]
    fn displays_aliases() {
        assert_eq!(Register(12).to_string(), "r12");
        assert_eq!(Register::FP.to_string(), "fp");
        assert_eq!(Register::SP.to_string(), "sp");
        assert_eq!(Register::PC.to_string(), "pc");
    }
}
