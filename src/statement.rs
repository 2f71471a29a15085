//! A single decoded source line: optional label, directive/instruction
//! name, and trimmed operand lexemes
//!
//! Grounded on the teacher's `Statement`/`TokenSpan` pair in
//! `assembler/src/statement.rs`: lex once, carry the line number and raw
//! text along for diagnostics, and hand typed accessors to the passes
//! instead of re-splitting strings everywhere.

use regex::Regex;

use crate::error::AssemblerError;

pub const MAX_LINE_LENGTH: usize = 80;

#[derive(Debug, Clone)]
pub struct Line {
    pub line_number: usize,
    pub label: Option<String>,
    pub keyword: String,
    pub operands: Vec<String>,
    pub raw: String,
}

/// Split a line into comma-separated operand lexemes, respecting quoted
/// strings and matrix bracket groups the way the teacher's line tokenizer
/// respects quoted strings (`assembler/src/assembler.rs`'s `first_pass`).
fn split_operands(text: &str, line_number: usize, raw: &str) -> Result<Vec<String>, AssemblerError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let malformed = || AssemblerError::MalformedOperandList { line_number, line: raw.to_string() };

    let re = Regex::new(r#""[^"]*"|[^,]+"#).unwrap();
    let mut operands = Vec::new();
    let mut cursor = 0usize;
    let mut first = true;
    for mat in re.find_iter(text) {
        let gap = &text[cursor..mat.start()];
        let expected_gap = if first { "" } else { "," };
        if gap.trim() != expected_gap {
            return Err(malformed());
        }
        operands.push(mat.as_str().trim().to_string());
        cursor = mat.end();
        first = false;
    }
    if text[cursor..].trim() != "" {
        return Err(malformed());
    }
    if operands.iter().any(|op| op.is_empty()) {
        return Err(malformed());
    }
    Ok(operands)
}

impl Line {
    /// Decode a single (already macro-expanded) physical line. Returns
    /// `Ok(None)` for blank lines and comments, which pass 1 simply skips.
    pub fn decode(line_number: usize, raw: &str) -> Result<Option<Line>, AssemblerError> {
        if raw.chars().count() > MAX_LINE_LENGTH {
            return Err(AssemblerError::LineTooLong { line_number, line: raw.to_string() });
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            return Ok(None);
        }

        let (label, rest) = match trimmed.find(':') {
            Some(colon) => {
                let candidate = trimmed[..colon].trim();
                crate::symbol::SymbolTable::validate_name(candidate, line_number, raw)?;
                (Some(candidate.to_string()), trimmed[colon + 1..].trim())
            }
            None => (None, trimmed),
        };

        if rest.is_empty() {
            return Err(AssemblerError::MissingInstruction { line_number, line: raw.to_string() });
        }

        let mut parts = rest.splitn(2, char::is_whitespace);
        let keyword = parts.next().unwrap_or("").to_string();
        let operand_text = parts.next().unwrap_or("");
        let operands = split_operands(operand_text, line_number, raw)?;

        Ok(Some(Line { line_number, label, keyword, operands, raw: raw.to_string() }))
    }

    pub fn is_directive(&self) -> bool {
        self.keyword.starts_with('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(Line::decode(1, "   ").unwrap().is_none());
        assert!(Line::decode(1, "  ; a comment").unwrap().is_none());
    }

    #[test]
    fn label_is_split_from_instruction() {
        let line = Line::decode(1, "LOOP: mov r1, r2").unwrap().unwrap();
        assert_eq!(line.label, Some("LOOP".to_string()));
        assert_eq!(line.keyword, "mov");
        assert_eq!(line.operands, vec!["r1".to_string(), "r2".to_string()]);
    }

    #[test]
    fn directive_is_recognised_by_leading_dot() {
        let line = Line::decode(1, ".data 1, 2, 3").unwrap().unwrap();
        assert!(line.is_directive());
        assert_eq!(line.operands, vec!["1", "2", "3"]);
    }

    #[test]
    fn doubled_comma_is_an_error() {
        let err = Line::decode(1, ".data 1,, 2");
        assert!(matches!(err, Err(AssemblerError::MalformedOperandList { .. })));
    }

    #[test]
    fn over_long_line_is_an_error() {
        let long = "a".repeat(81);
        let err = Line::decode(1, &long);
        assert!(matches!(err, Err(AssemblerError::LineTooLong { .. })));
    }

    #[test]
    fn string_directive_keeps_quoted_text_as_one_operand() {
        let line = Line::decode(1, ".string \"hi there\"").unwrap().unwrap();
        assert_eq!(line.operands, vec!["\"hi there\""]);
    }

    #[test]
    fn label_with_nothing_after_the_colon_is_missing_instruction_not_invalid_name() {
        let err = Line::decode(1, "LOOP:");
        assert!(matches!(err, Err(AssemblerError::MissingInstruction { .. })));
    }
}
