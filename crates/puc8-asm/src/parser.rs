//! Line normalization and instruction tokenizing.
//!
//! Source text is case-insensitive, quoted literals included. A line is
//! normalized (comment stripped, trimmed, lowercased), split into an
//! optional label and instruction, and the instruction is tokenized into a
//! mnemonic and comma-separated operands. Quotes may be `"` or `'`; nothing
//! inside them is split or treated as a comment.

use std::fmt;

/// Strips a `;` comment, trims, and lowercases the whole line.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut quote = None;
    let mut end = raw.len();
    for (index, c) in raw.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == ';' => {
                end = index;
                break;
            }
            None if c == '"' || c == '\'' => quote = Some(c),
            None => {}
        }
    }
    raw[..end].trim().to_ascii_lowercase()
}

/// Splits `label: instruction` on the first colon outside quotes.
///
/// Empty parts come back as `None`.
#[must_use]
pub fn split_label(text: &str) -> (Option<String>, Option<String>) {
    let (label, instruction) = split_quoted(text, |c| c == ':', 2)
        .split_first()
        .map_or(("", ""), |(first, rest)| {
            if rest.is_empty() {
                ("", *first)
            } else {
                (*first, rest[0])
            }
        });
    (non_empty(label), non_empty(instruction))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Splits on characters matching `is_separator` outside quotes, producing at
/// most `limit` pieces. Pieces are not trimmed and may be empty.
#[must_use]
pub fn split_quoted(text: &str, is_separator: impl Fn(char) -> bool, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        if pieces.len() + 1 >= limit {
            break;
        }
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if is_separator(c) => {
                pieces.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            None => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Returns the text between matching quotes, if `operand` is a quoted string.
#[must_use]
pub fn unquote(operand: &str) -> Option<&str> {
    let first = operand.chars().next()?;
    if operand.len() < 2 || !(first == '"' || first == '\'') || !operand.ends_with(first) {
        return None;
    }
    Some(&operand[1..operand.len() - 1])
}

/// A tokenized instruction or directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// First token.
    pub mnemonic: String,
    /// Operands with whitespace removed and register aliases translated.
    pub operands: Vec<String>,
}

impl Instruction {
    /// Tokenizes normalized instruction text.
    ///
    /// `ldr r1, [r2, -1]` yields `["r1", "[r2]", "-1"]`: a bracketed
    /// register with a displacement becomes an indirect-register operand
    /// followed by the constant.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let tokens: Vec<&str> = split_quoted(text, char::is_whitespace, usize::MAX)
            .into_iter()
            .filter(|token| !token.is_empty())
            .collect();
        let Some((mnemonic, rest)) = tokens.split_first() else {
            return Self {
                mnemonic: String::new(),
                operands: Vec::new(),
            };
        };

        let joined = rest.concat();
        let mut operands: Vec<String> = if joined.is_empty() {
            Vec::new()
        } else {
            split_quoted(&joined, |c| c == ',', usize::MAX)
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        for index in 1..operands.len() {
            let previous = &operands[index - 1];
            if previous.starts_with('[') && !previous.ends_with(']') && operands[index].ends_with(']')
            {
                operands[index - 1].push(']');
                operands[index].pop();
            }
        }

        for operand in &mut operands {
            if let Some(translated) = translate_alias(operand) {
                *operand = translated.to_string();
            }
        }

        Self {
            mnemonic: (*mnemonic).to_string(),
            operands,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.join(", "))?;
        }
        Ok(())
    }
}

fn translate_alias(operand: &str) -> Option<&'static str> {
    Some(match operand {
        "pc" => "r15",
        "sp" => "r14",
        "fp" => "r13",
        "[pc]" => "[r15]",
        "[sp]" => "[r14]",
        "[fp]" => "[r13]",
        _ => return None,
    })
}
