//! Macro pre-processor: `mcro ... mcroend` collection and textual expansion
//!
//! Grounded on the teacher's regex-based line tokenizing in
//! `assembler/src/assembler.rs` (`first_pass`), generalized into an explicit
//! two-phase collector/expander matching the state machine in spec.md §4.6.

use std::collections::HashMap;

use crate::encoder::is_opcode;
use crate::error::AssemblerError;
use crate::symbol::SymbolTable;

const RESERVED_MACRO_WORDS: &[&str] = &["mcro", "mcroend", "data", "string", "mat", "extern", "entry"];

#[derive(Debug, Clone)]
struct Macro {
    body: Vec<String>,
}

enum CollectorState {
    Outside,
    Inside { name: String, body: Vec<String> },
}

/// Scan the raw source for `mcro ... mcroend` definitions (the "Definition
/// phase" of spec.md §4.3 / the state machine of §4.6). Returns the table of
/// collected macros.
fn collect_macros(source: &str) -> Result<HashMap<String, Macro>, AssemblerError> {
    let mut macros = HashMap::new();
    let mut state = CollectorState::Outside;

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = raw_line.trim();

        match &mut state {
            CollectorState::Outside => {
                if trimmed.is_empty() || trimmed.starts_with(';') {
                    continue;
                }
                let mut tokens = trimmed.split_whitespace();
                let first = tokens.next().unwrap_or("");
                if first == "mcroend" {
                    return Err(AssemblerError::MacroEndWithoutStart {
                        line_number,
                        line: raw_line.to_string(),
                    });
                }
                if first == "mcro" {
                    let name = tokens.next().unwrap_or("").to_string();
                    if tokens.next().is_some() {
                        return Err(AssemblerError::TrailingTextAfterMacroKeyword {
                            line_number,
                            line: raw_line.to_string(),
                        });
                    }
                    validate_macro_name(&name, line_number, raw_line)?;
                    if macros.contains_key(&name) {
                        return Err(AssemblerError::DuplicateMacro {
                            name,
                            line_number,
                            line: raw_line.to_string(),
                        });
                    }
                    state = CollectorState::Inside { name, body: Vec::new() };
                }
                // Any other line outside a macro definition is ignored
                // during collection; it is handled in the expansion phase.
            }
            CollectorState::Inside { name, body } => {
                let mut tokens = trimmed.split_whitespace();
                match tokens.next() {
                    Some("mcro") => {
                        return Err(AssemblerError::NestedMacroDefinition {
                            name: tokens.next().unwrap_or("").to_string(),
                            line_number,
                            line: raw_line.to_string(),
                        });
                    }
                    Some("mcroend") => {
                        if tokens.next().is_some() {
                            return Err(AssemblerError::TrailingTextAfterMacroKeyword {
                                line_number,
                                line: raw_line.to_string(),
                            });
                        }
                        macros.insert(name.clone(), Macro { body: body.clone() });
                        state = CollectorState::Outside;
                    }
                    _ => body.push(raw_line.to_string()),
                }
            }
        }
    }

    if let CollectorState::Inside { name, .. } = state {
        return Err(AssemblerError::DanglingMacroDefinition { name });
    }

    Ok(macros)
}

fn validate_macro_name(name: &str, line_number: usize, line: &str) -> Result<(), AssemblerError> {
    SymbolTable::validate_name(name, line_number, line)?;
    if is_opcode(name) || RESERVED_MACRO_WORDS.contains(&name) {
        return Err(AssemblerError::ReservedWord { name: name.to_string(), line_number, line: line.to_string() });
    }
    Ok(())
}

/// First token after optional leading whitespace, and after a leading
/// `LABEL:` prefix if present — the lookup key used to spot a macro call.
fn call_site_name(trimmed: &str) -> (Option<&str>, &str) {
    if let Some(colon) = trimmed.find(':') {
        let label = trimmed[..colon].trim();
        let rest = trimmed[colon + 1..].trim();
        let name = rest.split_whitespace().next().unwrap_or("");
        (Some(label), name)
    } else {
        let name = trimmed.split_whitespace().next().unwrap_or("");
        (None, name)
    }
}

/// Re-read the source and replace each macro call (possibly label-prefixed)
/// with the macro's stored body, dropping the `mcro`/`mcroend` lines and
/// the bodies between them (the "Expansion phase" of spec.md §4.3).
fn expand(source: &str, macros: &HashMap<String, Macro>) -> String {
    let mut out = String::new();
    let mut state = CollectorState::Outside;

    for raw_line in source.lines() {
        let trimmed = raw_line.trim();

        match &mut state {
            CollectorState::Outside => {
                let mut tokens = trimmed.split_whitespace();
                if tokens.next() == Some("mcro") {
                    let name = tokens.next().unwrap_or("").to_string();
                    state = CollectorState::Inside { name, body: Vec::new() };
                    continue;
                }

                let (label, name) = call_site_name(trimmed);
                if let Some(found) = macros.get(name) {
                    emit_expansion(&mut out, label, found);
                } else {
                    out.push_str(raw_line);
                    out.push('\n');
                }
            }
            CollectorState::Inside { .. } => {
                if trimmed.split_whitespace().next() == Some("mcroend") {
                    state = CollectorState::Outside;
                }
            }
        }
    }

    out
}

fn emit_expansion(out: &mut String, label: Option<&str>, found: &Macro) {
    let mut body_lines = found.body.iter();
    match (label, body_lines.next()) {
        (Some(label), Some(first)) => {
            out.push_str(label);
            out.push_str(": ");
            out.push_str(first.trim_start());
            out.push('\n');
        }
        (None, Some(first)) => {
            out.push_str(first);
            out.push('\n');
        }
        _ => {}
    }
    for line in body_lines {
        out.push_str(line);
        out.push('\n');
    }
}

/// Run the full macro pre-processor over a unit's raw source, producing the
/// `.am` expanded text stream. Any malformed definition aborts before pass 1
/// per spec.md §4.3's failure semantics.
pub fn preprocess(source: &str) -> Result<String, AssemblerError> {
    let macros = collect_macros(source)?;
    Ok(expand(source, &macros))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_with_label_fuses_label_with_first_body_line() {
        let source = "mcro M\n\tinc r1\n\tinc r2\nmcroend\nL: M\n";
        let expanded = preprocess(source).unwrap();
        let lines: Vec<&str> = expanded.lines().collect();
        assert_eq!(lines, vec!["L: inc r1", "\tinc r2"]);
    }

    #[test]
    fn non_matching_lines_pass_through_unchanged() {
        let source = "mcro M\n\tstop\nmcroend\nmov r1, r2\n";
        let expanded = preprocess(source).unwrap();
        assert_eq!(expanded, "mov r1, r2\n");
    }

    #[test]
    fn dangling_definition_is_an_error() {
        let source = "mcro M\n\tstop\n";
        let err = preprocess(source);
        assert!(matches!(err, Err(AssemblerError::DanglingMacroDefinition { .. })));
    }

    #[test]
    fn nested_definition_is_an_error() {
        let source = "mcro OUTER\nmcro INNER\nmcroend\nmcroend\n";
        let err = preprocess(source);
        assert!(matches!(err, Err(AssemblerError::NestedMacroDefinition { .. })));
    }

    #[test]
    fn duplicate_name_is_an_error() {
        let source = "mcro M\nstop\nmcroend\nmcro M\nstop\nmcroend\n";
        let err = preprocess(source);
        assert!(matches!(err, Err(AssemblerError::DuplicateMacro { .. })));
    }

    #[test]
    fn mcroend_without_mcro_is_an_error() {
        let source = "mcroend\n";
        let err = preprocess(source);
        assert!(matches!(err, Err(AssemblerError::MacroEndWithoutStart { .. })));
    }

    #[test]
    fn call_without_label_expands_plainly() {
        let source = "mcro M\n\tinc r1\nmcroend\nM\n";
        let expanded = preprocess(source).unwrap();
        assert_eq!(expanded, "\tinc r1\n");
    }
}
