//! Parsing for `.data`, `.string`, and `.mat` directive operand lists
//!
//! Grounded on the per-directive function layout in the teacher's
//! `directives.rs`, generalized to this ISA's three data directives
//! (`.extern`/`.entry` are handled directly by the first pass since they
//! only touch the symbol table, not the data list).

use crate::encoder::in_range;
use crate::error::{AssemblerError, Span};

/// `.data N1, N2, ...` — each value must be a valid decimal integer in
/// `[-512, 511]`.
pub fn parse_data(operands: &[String], line_number: usize, line: &str) -> Result<Vec<i32>, AssemblerError> {
    if operands.is_empty() {
        return Err(AssemblerError::MalformedOperandList { line_number, line: line.to_string() });
    }
    operands.iter().map(|op| parse_integer(op, line_number, line)).collect()
}

fn parse_integer(text: &str, line_number: usize, line: &str) -> Result<i32, AssemblerError> {
    let value: i32 = text.parse().map_err(|_| AssemblerError::MalformedNumber {
        text: text.to_string(),
        span: Span::locate(line, text),
        line_number,
        line: line.to_string(),
    })?;
    if !in_range(value) {
        return Err(AssemblerError::ValueOutOfRange { value, line_number, line: line.to_string() });
    }
    Ok(value)
}

/// `.string "..."` — the ASCII code of each character, followed by a
/// terminating zero word.
pub fn parse_string(operands: &[String], line_number: usize, line: &str) -> Result<Vec<i32>, AssemblerError> {
    if operands.len() != 1 {
        return Err(AssemblerError::MalformedOperandList { line_number, line: line.to_string() });
    }
    let text = &operands[0];
    if !text.starts_with('"') || !text.ends_with('"') || text.len() < 2 {
        return Err(AssemblerError::UnterminatedString { line_number, line: line.to_string() });
    }
    let inner = &text[1..text.len() - 1];
    let mut values: Vec<i32> = inner.chars().map(|c| c as i32).collect();
    values.push(0);
    Ok(values)
}

/// `.mat [R][C] V1, V2, ...` — returns `(rows, cols, values)`, with `values`
/// already padded/truncated to exactly `rows * cols` entries. `overflowed`
/// is set if more initialisers were supplied than cells exist.
pub struct MatrixDirective {
    pub rows: u16,
    pub cols: u16,
    pub values: Vec<i32>,
    pub overflowed: bool,
}

pub fn parse_mat(
    keyword_rest: &str,
    operands: &[String],
    line_number: usize,
    line: &str,
) -> Result<MatrixDirective, AssemblerError> {
    let (rows, cols) = parse_dimensions(keyword_rest, line_number, line)?;
    let n_cells = rows as usize * cols as usize;

    let mut values: Vec<i32> = Vec::with_capacity(n_cells);
    for op in operands {
        values.push(parse_integer(op, line_number, line)?);
    }

    let overflowed = values.len() > n_cells;
    values.truncate(n_cells);
    values.resize(n_cells, 0);

    Ok(MatrixDirective { rows, cols, values, overflowed })
}

fn parse_dimensions(text: &str, line_number: usize, line: &str) -> Result<(u16, u16), AssemblerError> {
    let malformed = || AssemblerError::InvalidMatrixDimensions {
        text: text.to_string(),
        line_number,
        line: line.to_string(),
    };

    let text = text.trim();
    let parts: Vec<&str> = text.trim_start_matches('[').trim_end_matches(']').split("][").collect();
    if parts.len() != 2 {
        return Err(malformed());
    }
    let rows: u16 = parts[0].parse().map_err(|_| malformed())?;
    let cols: u16 = parts[1].parse().map_err(|_| malformed())?;
    if rows == 0 || cols == 0 {
        return Err(malformed());
    }
    Ok((rows, cols))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_directive_parses_values() {
        let operands = vec!["1".to_string(), "-2".to_string(), "0".to_string()];
        assert_eq!(parse_data(&operands, 1, "").unwrap(), vec![1, -2, 0]);
    }

    #[test]
    fn data_directive_rejects_out_of_range() {
        let operands = vec!["600".to_string()];
        let err = parse_data(&operands, 1, "");
        assert!(matches!(err, Err(AssemblerError::ValueOutOfRange { .. })));
    }

    #[test]
    fn empty_string_emits_one_terminator_word() {
        let operands = vec!["\"\"".to_string()];
        let values = parse_string(&operands, 1, "").unwrap();
        assert_eq!(values, vec![0]);
    }

    #[test]
    fn string_directive_appends_null_terminator() {
        let operands = vec!["\"hi\"".to_string()];
        let values = parse_string(&operands, 1, "").unwrap();
        assert_eq!(values, vec!['h' as i32, 'i' as i32, 0]);
    }

    #[test]
    fn matrix_without_initialisers_is_all_zero() {
        let mat = parse_mat("[1][1]", &[], 1, "").unwrap();
        assert_eq!(mat.values, vec![0]);
        assert!(!mat.overflowed);
    }

    #[test]
    fn matrix_extra_initialisers_are_discarded_with_warning() {
        let operands = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let mat = parse_mat("[1][2]", &operands, 1, "").unwrap();
        assert_eq!(mat.values, vec![1, 2]);
        assert!(mat.overflowed);
    }
}
