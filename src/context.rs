//! Per-unit orchestration: macro expansion → pass 1 → pass 2 → artefacts
//!
//! One [AssembledUnit] owns everything scoped to a single input file — its
//! symbol table, instruction list, and data list are all dropped together
//! when it goes out of scope, matching the ownership rules in spec.md §3.
//! The "global error flag" from the source this was distilled from is
//! modeled here as a plain field rather than process-global state, per the
//! design note in spec.md §9.

use crate::encoder::strip_leading_zeros;
use crate::error::{AssemblerError, AssemblerWarning};
use crate::first_pass;
use crate::second_pass;
use crate::symbol::SymbolKind;

/// Everything produced (or attempted) for one `.as` input
pub struct AssembledUnit {
    pub expanded_source: String,
    /// Whether the macro phase itself completed (spec.md §4.3's "expansion
    /// itself cannot fail" / "any malformed definition ... aborts the
    /// pipeline before pass 1"). The `.am` artefact is written whenever this
    /// is `true`, regardless of what pass 1/2 do afterward — an expanded
    /// source that happens to be empty is not the same as a failed macro
    /// phase, so callers must not infer success from `expanded_source`
    /// being non-empty.
    pub macro_phase_succeeded: bool,
    pub errors: Vec<AssemblerError>,
    pub warnings: Vec<AssemblerWarning>,
    /// `.ob` contents, present only if assembly fully succeeded
    pub object_file: Option<String>,
    /// `.ent` contents, present only on success and if any entry exists
    pub entries_file: Option<String>,
    /// `.ext` contents, present only on success and if any external was used
    pub externals_file: Option<String>,
}

impl AssembledUnit {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Run the full pipeline over one unit's raw source text.
pub fn assemble(source: &str) -> AssembledUnit {
    let expanded_source = match crate::macros::preprocess(source) {
        Ok(expanded) => expanded,
        Err(e) => {
            return AssembledUnit {
                expanded_source: String::new(),
                macro_phase_succeeded: false,
                errors: vec![e],
                warnings: Vec::new(),
                object_file: None,
                entries_file: None,
                externals_file: None,
            };
        }
    };

    let mut pass1 = first_pass::run(&expanded_source);

    if !pass1.errors.is_empty() {
        return AssembledUnit {
            expanded_source,
            macro_phase_succeeded: true,
            errors: pass1.errors,
            warnings: pass1.warnings,
            object_file: None,
            entries_file: None,
            externals_file: None,
        };
    }

    let pass2 = second_pass::run(&pass1.instructions, &mut pass1.symbols);
    if !pass2.errors.is_empty() {
        return AssembledUnit {
            expanded_source,
            macro_phase_succeeded: true,
            errors: pass2.errors,
            warnings: pass1.warnings,
            object_file: None,
            entries_file: None,
            externals_file: None,
        };
    }

    let object_file = Some(render_object_file(&pass1, &pass2));
    let entries_file = render_entries_file(&pass1);
    let externals_file = render_externals_file(&pass1);

    AssembledUnit {
        expanded_source,
        macro_phase_succeeded: true,
        errors: Vec::new(),
        warnings: pass1.warnings,
        object_file,
        entries_file,
        externals_file,
    }
}

fn render_object_file(pass1: &first_pass::FirstPassOutput, pass2: &second_pass::SecondPassOutput) -> String {
    let mut out = String::new();
    let icf_digits = strip_leading_zeros(&crate::encoder::word_to_base4(pass1.icf));
    let dcf_digits = strip_leading_zeros(&crate::encoder::word_to_base4(pass1.dcf));
    out.push_str(&format!("{} {}\n", icf_digits, dcf_digits));

    for instruction in &pass2.instructions {
        let mut address = instruction.address;
        for word in &instruction.words {
            out.push_str(&format!("{}\t{}\n", crate::encoder::word_to_base4(address), word));
            address += 1;
        }
    }

    for item in &pass1.data {
        // `item.address` was already rewritten from a DC-relative offset to
        // an absolute address by `SymbolTable::relocate_data`'s sibling
        // logic in pass 1 (ICF + offset) — see the data-relocation note in
        // DESIGN.md for why this does not also add MEMORY_START a second
        // time, despite spec.md §3's literal "MEMORY_START + ICF + DC
        // offset" phrasing.
        out.push_str(&format!("{}\t{}\n", crate::encoder::word_to_base4(item.address), item.base4()));
    }

    out
}

fn render_entries_file(pass1: &first_pass::FirstPassOutput) -> Option<String> {
    let mut out = String::new();
    for symbol in pass1.symbols.iter() {
        if matches!(symbol.kind, SymbolKind::Entry(_)) {
            out.push_str(&format!("{} {}\n", symbol.name, crate::encoder::word_to_base4(symbol.address)));
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn render_externals_file(pass1: &first_pass::FirstPassOutput) -> Option<String> {
    let mut out = String::new();
    for symbol in pass1.symbols.iter() {
        if matches!(symbol.kind, SymbolKind::External) {
            for &address in &symbol.external_uses {
                out.push_str(&format!("{} {}\n", symbol.name, crate::encoder::word_to_base4(address)));
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_resolution_scenario() {
        let source = ".entry MAIN\nMAIN: stop\n";
        let unit = assemble(source);
        assert!(!unit.has_errors(), "unexpected errors: {:?}", unit.errors);
        let ent = unit.entries_file.expect("expected .ent output");
        assert!(ent.starts_with("MAIN "));
    }

    #[test]
    fn external_reference_scenario() {
        let source = ".extern FOO\njmp FOO\n";
        let unit = assemble(source);
        assert!(!unit.has_errors(), "unexpected errors: {:?}", unit.errors);
        let ext = unit.externals_file.expect("expected .ext output");
        assert_eq!(ext.lines().count(), 1);
        assert!(ext.starts_with("FOO "));
    }

    #[test]
    fn data_relocation_scenario() {
        let source = "stop\nX: .data 7\n";
        let unit = assemble(source);
        assert!(!unit.has_errors(), "unexpected errors: {:?}", unit.errors);
        let ob = unit.object_file.unwrap();
        // ICF = 101 (one instruction word), DCF = 1: word_to_base4(101) =
        // "abcbb" -> stripped "bcbb"; word_to_base4(1) = "aaaab" -> stripped "b"
        assert!(ob.starts_with("bcbb b\n"));
    }

    #[test]
    fn macro_only_source_expands_empty_but_macro_phase_succeeded() {
        // A source that is nothing but a macro definition (never called)
        // expands to an empty string, which is not the same as the macro
        // phase having failed — the driver must still write `.am` for it.
        let source = "mcro M\n\tstop\nmcroend\n";
        let unit = assemble(source);
        assert!(unit.macro_phase_succeeded);
        assert_eq!(unit.expanded_source, "");
    }

    #[test]
    fn dangling_macro_definition_means_macro_phase_did_not_succeed() {
        let source = "mcro M\n\tstop\n";
        let unit = assemble(source);
        assert!(!unit.macro_phase_succeeded);
    }

    #[test]
    fn macro_phase_succeeded_even_when_a_later_pass_fails() {
        let source = "mov #600, r1\n";
        let unit = assemble(source);
        assert!(unit.macro_phase_succeeded);
        assert!(unit.has_errors());
    }

    #[test]
    fn error_accumulation_scenario_blocks_all_output() {
        let source = "mov #600, r1\nmov r1, r9\n";
        let unit = assemble(source);
        assert_eq!(unit.errors.len(), 2);
        assert!(unit.object_file.is_none());
        assert!(unit.entries_file.is_none());
        assert!(unit.externals_file.is_none());
    }
}
