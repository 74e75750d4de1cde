//! Structured error reporting for assembler phases.
//!
//! Every failure is fatal and carries the `file:line` of the source line
//! that caused it when one is known. Errors format as
//!
//! ```text
//! prog.asm:12: value error: b: label '@loop' not defined
//! ```

use std::fmt;
use std::path::PathBuf;

use puc8_core::Section;
use thiserror::Error;

use crate::encoder::OperandError;

/// A `file:line` source position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    /// File name as given on the command line or in `.include`.
    pub file: String,
    /// 1-indexed line number.
    pub line: usize,
}

impl Origin {
    /// Creates an origin.
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Broad category of an assembly error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed directive, unknown mnemonic, wrong operand shape.
    Syntax,
    /// Well-formed text with an unusable meaning.
    Value,
    /// A source file could not be read.
    Io,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax error",
            Self::Value => "value error",
            Self::Io => "I/O error",
        })
    }
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A source file could not be opened or read.
    #[error("cannot read {}: {message}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Operating system message.
        message: String,
    },
    /// A file includes itself, directly or through other files.
    #[error("circular include of {}", .0.display())]
    CircularInclude(PathBuf),
    /// `.include` without exactly one operand.
    #[error("expected string constant")]
    ExpectedString,
    /// A quoted operand that is not closed or is empty.
    #[error("malformed string constant {0}")]
    MalformedString(String),
    /// `.macro` without a name.
    #[error("missing macro name")]
    MissingMacroName,
    /// `.macro` inside a macro definition.
    #[error("cannot nest macro definitions")]
    NestedMacro,
    /// Macro named like an instruction or directive.
    #[error("macro definition {0} shadows mnemonic")]
    MacroShadowsMnemonic(String),
    /// Second definition of a macro.
    #[error("redefinition of macro {0}")]
    MacroRedefinition(String),
    /// End of file reached inside a macro definition.
    #[error("macro {0} is missing .endmacro")]
    UnterminatedMacro(String),
    /// `.endmacro` without an open definition.
    #[error(".endmacro without .macro")]
    StrayEndMacro,
    /// `$N` in a macro body with no matching call operand.
    #[error("invalid argument ${argument} in call to macro {name}")]
    MacroArgument {
        /// Macro being expanded.
        name: String,
        /// Text following `$`.
        argument: char,
    },
    /// First token is neither a mnemonic, a directive nor a macro.
    #[error("unrecognized mnemonic '{0}'")]
    UnknownMnemonic(String),
    /// A directive is missing required operands.
    #[error("{directive} directive requires {required}")]
    MissingOperand {
        /// Directive name.
        directive: &'static str,
        /// Description of what is missing.
        required: &'static str,
    },
    /// `.section` with a name other than `code` or `data`.
    #[error("unknown section '{0}'")]
    UnknownSection(String),
    /// Operand resolution failed for every variant.
    #[error("{mnemonic}: {error}")]
    Operand {
        /// Mnemonic being encoded.
        mnemonic: String,
        /// Failure of the last variant tried.
        error: OperandError,
    },
    /// A label or `.equ` name bound twice.
    #[error("redefinition of label {name} (first defined at {first})")]
    LabelRedefinition {
        /// Symbol name.
        name: String,
        /// Where it was first bound.
        first: Origin,
    },
    /// `.org` operand is not an integer.
    #[error("cannot parse .org address {0}")]
    BadAddress(String),
    /// `.org` below the current location.
    #[error(".org {requested} cannot reduce current address {current}")]
    OrgBackwards {
        /// Location counter before the directive.
        current: i64,
        /// Requested address.
        requested: i64,
    },
    /// `.equ` value is not an integer.
    #[error("cannot parse .equ value {0}")]
    BadConstant(String),
    /// `.db` while the code section is active.
    #[error("cannot use .db in code section")]
    DbInCodeSection,
    /// An instruction while the data section is active.
    #[error("cannot use instructions in data section")]
    InstructionInDataSection,
    /// A section grew past 256 entries.
    #[error("{0} section exceeds 256 entries")]
    SectionOverflow(Section),
}

impl ErrorKind {
    /// Category used in the error prefix.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Io { .. } => ErrorClass::Io,
            Self::Operand { error, .. } => error.class(),
            Self::CircularInclude(_)
            | Self::LabelRedefinition { .. }
            | Self::BadAddress(_)
            | Self::OrgBackwards { .. }
            | Self::BadConstant(_)
            | Self::DbInCodeSection
            | Self::InstructionInDataSection
            | Self::SectionOverflow(_) => ErrorClass::Value,
            _ => ErrorClass::Syntax,
        }
    }

    /// Attaches a source position.
    #[must_use]
    pub const fn at(self, origin: Origin) -> AsmError {
        AsmError {
            kind: self,
            origin: Some(origin),
        }
    }
}

/// An assembly error with optional source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Where, when known.
    pub origin: Option<Origin>,
}

impl AsmError {
    /// Creates an error without a position.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, origin: None }
    }

    /// Sets the position unless one is already present.
    #[must_use]
    pub fn or_at(mut self, origin: &Origin) -> Self {
        if self.origin.is_none() {
            self.origin = Some(origin.clone());
        }
        self
    }

    /// Category of the underlying kind.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{origin}: {}: {}", self.class(), self.kind),
            None => write!(f, "{}: {}", self.class(), self.kind),
        }
    }
}

impl std::error::Error for AsmError {}

impl From<ErrorKind> for AsmError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
