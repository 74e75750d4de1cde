//! Preprocessing: include splicing, macro expansion and `.db` splitting.
//!
//! The preprocessor turns raw files into a flat stream of [`SourceLine`]s
//! that the two assembler passes consume. It owns the session state that
//! outlives a single file: the macro table and the expansion nonce used to
//! make `_`-prefixed labels unique per call.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{AsmError, ErrorKind, Origin};
use crate::mnemonic::{is_reserved, END_MACRO, INCLUDE, MACRO};
use crate::parser::{normalize, split_label, unquote, Instruction};
use crate::source::SourceLine;

/// Joins a local label to its call nonce. Written labels end at the first
/// `:`, so no source label can contain it.
const HYGIENE_SEPARATOR: char = ':';

/// A macro being recorded between `.macro` and `.endmacro`.
#[derive(Debug)]
struct Definition {
    name: String,
    origin: Origin,
    body: Vec<SourceLine>,
}

/// Preprocessing session.
#[derive(Debug, Default)]
pub struct Preprocessor {
    macros: HashMap<String, Vec<SourceLine>>,
    nonce: usize,
    active: Vec<PathBuf>,
}

impl Preprocessor {
    /// Creates a session with no macros.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of macro calls expanded so far.
    #[must_use]
    pub const fn nonce(&self) -> usize {
        self.nonce
    }

    /// Returns `true` when `name` is a defined macro.
    #[must_use]
    pub fn is_macro(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Reads and preprocesses a file.
    ///
    /// # Errors
    ///
    /// Returns an [`AsmError`] when the file or one of its includes cannot
    /// be read, includes form a cycle, or a directive is malformed.
    pub fn process(&mut self, path: &Path) -> Result<Vec<SourceLine>, AsmError> {
        let text = fs::read_to_string(path).map_err(|e| ErrorKind::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.process_source(path, &text)
    }

    /// Preprocesses in-memory text as if it had been read from `path`.
    ///
    /// Includes are resolved relative to the directory of `path`.
    ///
    /// # Errors
    ///
    /// See [`Preprocessor::process`].
    pub fn process_source(&mut self, path: &Path, text: &str) -> Result<Vec<SourceLine>, AsmError> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.active.contains(&key) {
            return Err(ErrorKind::CircularInclude(path.to_path_buf()).into());
        }

        self.active.push(key);
        let result = self.process_lines(path, text);
        self.active.pop();

        if let Ok(lines) = &result {
            debug!(file = %path.display(), lines = lines.len(), "preprocessed");
        }
        result
    }

    fn process_lines(&mut self, path: &Path, text: &str) -> Result<Vec<SourceLine>, AsmError> {
        let file = path.display().to_string();
        let mut out = Vec::new();
        let mut definition: Option<Definition> = None;

        for (index, raw) in text.lines().enumerate() {
            let origin = Origin::new(file.clone(), index + 1);
            let (label, instruction) = split_label(&normalize(raw));
            self.process_line(path, &origin, label, instruction, &mut out, &mut definition)
                .map_err(|e| e.or_at(&origin))?;
        }

        if let Some(open) = definition {
            return Err(ErrorKind::UnterminatedMacro(open.name).at(open.origin));
        }
        Ok(out)
    }

    fn process_line(
        &mut self,
        path: &Path,
        origin: &Origin,
        label: Option<String>,
        instruction: Option<String>,
        out: &mut Vec<SourceLine>,
        definition: &mut Option<Definition>,
    ) -> Result<(), AsmError> {
        let Some(text) = instruction else {
            if label.is_some() {
                target(out, definition).push(SourceLine::new(origin.clone(), label, None));
            }
            return Ok(());
        };
        let parsed = Instruction::parse(&text);

        match parsed.mnemonic.as_str() {
            INCLUDE => {
                let [operand] = parsed.operands.as_slice() else {
                    return Err(ErrorKind::ExpectedString.into());
                };
                let name = unquote(operand)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| ErrorKind::MalformedString(operand.clone()))?;
                let included = path.parent().unwrap_or_else(|| Path::new("")).join(name);

                let target = target(out, definition);
                if label.is_some() {
                    target.push(SourceLine::new(origin.clone(), label, None));
                }
                target.extend(self.process(&included)?);
            }
            ".db" if !parsed.operands.is_empty() => {
                let lines = split_db(origin, label, &parsed.operands)?;
                target(out, definition).extend(lines);
            }
            MACRO => {
                let [name] = parsed.operands.as_slice() else {
                    return Err(ErrorKind::MissingMacroName.into());
                };
                if definition.is_some() {
                    return Err(ErrorKind::NestedMacro.into());
                }
                if is_reserved(name) {
                    return Err(ErrorKind::MacroShadowsMnemonic(name.clone()).into());
                }
                if self.macros.contains_key(name) {
                    return Err(ErrorKind::MacroRedefinition(name.clone()).into());
                }
                if let Some(label) = label {
                    warn!(%origin, label = %label, "label on .macro line is ignored");
                }
                *definition = Some(Definition {
                    name: name.clone(),
                    origin: origin.clone(),
                    body: Vec::new(),
                });
            }
            END_MACRO => {
                let closed = definition.take().ok_or(ErrorKind::StrayEndMacro)?;
                debug!(name = %closed.name, lines = closed.body.len(), "macro defined");
                self.macros.insert(closed.name, closed.body);
            }
            name if self.macros.contains_key(name) => {
                let expanded = self.expand(name, &parsed.operands)?;
                let target = target(out, definition);
                if label.is_some() {
                    target.push(SourceLine::new(origin.clone(), label, None));
                }
                target.extend(expanded);
            }
            _ => {
                target(out, definition).push(SourceLine::new(origin.clone(), label, Some(text)));
            }
        }
        Ok(())
    }

    fn expand(&mut self, name: &str, operands: &[String]) -> Result<Vec<SourceLine>, ErrorKind> {
        let nonce = self.nonce;
        let body = self.macros.get(name).map_or(&[][..], Vec::as_slice);

        let mut expanded = Vec::with_capacity(body.len());
        for line in body {
            let label = line.label.as_ref().map(|label| {
                if label.starts_with('_') {
                    format!("{label}{HYGIENE_SEPARATOR}{nonce}")
                } else {
                    label.clone()
                }
            });
            let instruction = line
                .instruction
                .as_deref()
                .map(|text| substitute(text, name, operands, nonce))
                .transpose()?;
            expanded.push(SourceLine::new(line.origin.clone(), label, instruction));
        }

        self.nonce += 1;
        Ok(expanded)
    }
}

fn target<'a>(
    out: &'a mut Vec<SourceLine>,
    definition: &'a mut Option<Definition>,
) -> &'a mut Vec<SourceLine> {
    match definition {
        Some(open) => &mut open.body,
        None => out,
    }
}

/// Emits one `.db` line per operand, and one per character of a string.
fn split_db(
    origin: &Origin,
    mut label: Option<String>,
    operands: &[String],
) -> Result<Vec<SourceLine>, ErrorKind> {
    let mut lines = Vec::new();
    for operand in operands {
        if operand.starts_with(['"', '\'']) {
            let quote = &operand[..1];
            let text = unquote(operand)
                .filter(|text| !text.is_empty())
                .ok_or_else(|| ErrorKind::MalformedString(operand.clone()))?;
            for c in text.chars() {
                let instruction = format!(".db {quote}{c}{quote}");
                lines.push(SourceLine::new(origin.clone(), label.take(), Some(instruction)));
            }
        } else {
            let instruction = format!(".db {operand}");
            lines.push(SourceLine::new(origin.clone(), label.take(), Some(instruction)));
        }
    }
    Ok(lines)
}

/// Replaces `$N` with call operand `N` and suffixes `@_name` uses with the
/// call nonce.
fn substitute(text: &str, name: &str, operands: &[String], nonce: usize) -> Result<String, ErrorKind> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut index = 0;

    while index < chars.len() {
        let c = chars[index];
        let next = chars.get(index + 1).copied();
        match (c, next) {
            ('$', Some(argument)) => {
                let value = argument
                    .to_digit(10)
                    .and_then(|n| operands.get(n as usize))
                    .ok_or_else(|| ErrorKind::MacroArgument {
                        name: name.to_string(),
                        argument,
                    })?;
                out.push_str(value);
                index += 2;
            }
            ('@', Some('_')) => {
                while index < chars.len() && !chars[index].is_whitespace() && chars[index] != ']' {
                    out.push(chars[index]);
                    index += 1;
                }
                out.push(HYGIENE_SEPARATOR);
                out.push_str(&nonce.to_string());
            }
            _ => {
                out.push(c);
                index += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn preprocess(text: &str) -> Result<Vec<SourceLine>, AsmError> {
        Preprocessor::new().process_source(Path::new("test.asm"), text)
    }

    fn instructions(lines: &[SourceLine]) -> Vec<String> {
        lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn strips_comments_and_blank_lines() {
        let lines = preprocess("; header\n\n  MOV R0, 1 ; one\nend:\n").unwrap();
        assert_eq!(instructions(&lines), vec!["test.asm:3 mov r0, 1", "test.asm:4 end: "]);
    }

    #[test]
    fn splits_db_strings_per_character() {
        let lines = preprocess("msg: .db \"Hi\", 0").unwrap();
        assert_eq!(
            instructions(&lines),
            vec![
                "test.asm:1 msg: .db \"h\"",
                "test.asm:1 .db \"i\"",
                "test.asm:1 .db 0",
            ]
        );
    }

    #[test]
    fn db_string_literals_are_folded_to_lowercase() {
        let lines = preprocess(".DB 'Ok'").unwrap();
        assert_eq!(lines[0].text(), ".db 'o'");
        assert_eq!(lines[1].text(), ".db 'k'");
    }

    #[test]
    fn rejects_malformed_db_string() {
        let error = preprocess(".db \"\"").unwrap_err();
        assert_eq!(error.kind, ErrorKind::MalformedString("\"\"".to_string()));
        assert_eq!(error.origin, Some(Origin::new("test.asm", 1)));
    }

    #[test]
    fn expands_macro_arguments() {
        let source = ".macro inc\nadd $0, $0, 1\n.endmacro\ninc r3\n";
        let lines = preprocess(source).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "add r3, r3, 1");
        assert_eq!(lines[0].origin, Origin::new("test.asm", 2));
    }

    #[test]
    fn local_labels_are_unique_per_call() {
        let source = "\
.macro wait
_loop: sub $0, $0, 1
bnz @_loop
.endmacro
wait r1
wait r2
";
        let mut session = Preprocessor::new();
        let lines = session.process_source(Path::new("m.asm"), source).unwrap();
        let dump = instructions(&lines);
        assert_eq!(
            dump,
            vec![
                "m.asm:2 _loop:0: sub r1, r1, 1",
                "m.asm:3 bnz @_loop:0",
                "m.asm:2 _loop:1: sub r2, r2, 1",
                "m.asm:3 bnz @_loop:1",
            ]
        );
        assert_eq!(session.nonce(), 2);
    }

    #[test]
    fn local_label_use_stops_at_bracket() {
        let source = ".macro get\nldr r0, [@_v]\n_v: .db 1\n.endmacro\nget\n";
        let lines = preprocess(source).unwrap();
        assert_eq!(lines[0].text(), "ldr r0, [@_v:0]");
        assert_eq!(lines[1].label.as_deref(), Some("_v:0"));
    }

    #[test]
    fn label_on_call_line_becomes_its_own_line() {
        let source = ".macro two\nmov r0, 2\n.endmacro\nstart: two\n";
        let lines = preprocess(source).unwrap();
        assert_eq!(lines[0].label.as_deref(), Some("start"));
        assert!(lines[0].instruction.is_none());
        assert_eq!(lines[1].text(), "mov r0, 2");
    }

    #[test]
    fn calls_inside_a_definition_expand_into_the_body() {
        let source = "\
.macro one
mov $0, 1
.endmacro
.macro both
one r1
one r2
.endmacro
both
";
        let lines = preprocess(source).unwrap();
        assert_eq!(instructions(&lines), vec!["test.asm:2 mov r1, 1", "test.asm:2 mov r2, 1"]);
    }

    #[test]
    fn out_of_range_argument_is_an_error() {
        let source = ".macro m\nmov $1, 0\n.endmacro\nm r0\n";
        let error = preprocess(source).unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::MacroArgument {
                name: "m".to_string(),
                argument: '1'
            }
        );
        assert_eq!(error.origin, Some(Origin::new("test.asm", 4)));
    }

    #[test]
    fn macro_definition_errors() {
        let cases = [
            (".macro\n", ErrorKind::MissingMacroName),
            (".macro a\n.macro b\n", ErrorKind::NestedMacro),
            (".macro add\n", ErrorKind::MacroShadowsMnemonic("add".to_string())),
            (".macro .org\n", ErrorKind::MacroShadowsMnemonic(".org".to_string())),
            (
                ".macro a\n.endmacro\n.macro a\n",
                ErrorKind::MacroRedefinition("a".to_string()),
            ),
            (".endmacro\n", ErrorKind::StrayEndMacro),
            (".macro open\nmov r0, 1\n", ErrorKind::UnterminatedMacro("open".to_string())),
        ];
        for (source, expected) in cases {
            let error = preprocess(source).unwrap_err();
            assert_eq!(error.kind, expected, "{source:?}");
            assert!(error.origin.is_some());
        }
    }

    #[test]
    fn include_requires_a_quoted_name() {
        assert_eq!(
            preprocess(".include").unwrap_err().kind,
            ErrorKind::ExpectedString
        );
        assert_eq!(
            preprocess(".include lib.asm").unwrap_err().kind,
            ErrorKind::MalformedString("lib.asm".to_string())
        );
    }

    #[test]
    fn missing_include_reports_the_include_line() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("main.asm");
        let error = Preprocessor::new()
            .process_source(&root, "\n.include \"nope.asm\"\n")
            .unwrap_err();
        assert!(matches!(error.kind, ErrorKind::Io { .. }));
        assert_eq!(error.origin.map(|o| o.line), Some(2));
    }
}
