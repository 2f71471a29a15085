//! Ordered symbol table: labels, externals, and entries
//!
//! Grounded on the `SymbolTable`/`HashMap<String, OpcodeAddress>` approach in
//! the teacher's `assembler.rs`, generalized to carry a type tag and
//! external-usage sites the way spec.md §4.2 requires. Iteration must stay
//! in insertion order (for stable `.ext` output), so this wraps an
//! `IndexMap`-shaped pair of a `Vec` (for order) and a `HashMap` (for O(1)
//! lookup) rather than a plain `HashMap`.

use std::collections::HashMap;

use crate::encoder::{is_opcode, is_register_name};
use crate::error::AssemblerError;

pub const MEMORY_START: u16 = 100;

/// What a symbol currently is, and how its address should be interpreted
#[derive(Debug, Clone, Copy)]
pub enum SymbolKind {
    /// Defined by a label on an instruction line; address is an IC value
    Code,
    /// Defined by a label on a `.data`/`.string`/`.mat` line; address is a
    /// DC-relative offset until [SymbolTable::relocate_data] runs
    Data,
    /// Declared with `.extern`; always address 0 in the final output
    External,
    /// Declared with `.entry`, overlaid on a local definition
    Entry(EntryBinding),
}

/// Whether an `.entry` name has been bound to a local definition yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryBinding {
    /// `.entry` seen before the name was locally defined
    Placeholder,
    /// Bound to a local code/data address (possibly still pre-relocation)
    BoundTo(u16),
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub address: u16,
    pub kind: SymbolKind,
    pub line_number: usize,
    /// Addresses of instruction words that reference this symbol, recorded
    /// only for `SymbolKind::External` symbols, in the order they were used.
    pub external_uses: Vec<u16>,
}

impl Symbol {
    fn new(name: &str, address: u16, kind: SymbolKind, line_number: usize) -> Symbol {
        Symbol { name: name.to_string(), address, kind, line_number, external_uses: Vec::new() }
    }
}

/// Insertion-ordered table of symbols, keyed by name
#[derive(Debug, Default)]
pub struct SymbolTable {
    order: Vec<String>,
    by_name: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable { order: Vec::new(), by_name: HashMap::new() }
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name)
    }

    /// Iterate symbols in the order they were first inserted
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter().filter_map(move |name| self.by_name.get(name))
    }

    /// Validate a candidate name against the naming rules shared by labels
    /// and macros: not a register, not an opcode, `<=30` chars, starts with
    /// a letter, rest alphanumeric.
    pub fn validate_name(name: &str, line_number: usize, line: &str) -> Result<(), AssemblerError> {
        if name.is_empty() || name.len() > 30 {
            return Err(AssemblerError::NameLength { name: name.to_string(), line_number, line: line.to_string() });
        }
        let mut chars = name.chars();
        let first_ok = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
        let rest_ok = chars.clone().all(|c| c.is_ascii_alphanumeric());
        if !first_ok || !rest_ok {
            return Err(AssemblerError::InvalidName { name: name.to_string(), line_number, line: line.to_string() });
        }
        if is_opcode(name) || is_register_name(name) || is_directive_word(name) {
            return Err(AssemblerError::ReservedWord { name: name.to_string(), line_number, line: line.to_string() });
        }
        Ok(())
    }

    /// Insert a freshly-defined local symbol (`Code` or `Data`).
    /// Enforces the conflict matrix from spec.md §3:
    /// - a name already External cannot become local
    /// - a name already locally defined is a duplicate
    /// - a name already an `.entry` placeholder is bound in-place, keeping
    ///   `Entry` kind but filling in the real address
    pub fn insert_local(
        &mut self,
        name: &str,
        address: u16,
        kind: SymbolKind,
        line_number: usize,
        line: &str,
    ) -> Result<(), AssemblerError> {
        debug_assert!(matches!(kind, SymbolKind::Code | SymbolKind::Data));

        if let Some(existing) = self.by_name.get_mut(name) {
            match existing.kind {
                SymbolKind::External => {
                    return Err(AssemblerError::LocalDefinitionAfterExtern {
                        name: name.to_string(),
                        line_number,
                        line: line.to_string(),
                    });
                }
                SymbolKind::Entry(_) => {
                    existing.address = address;
                    existing.kind = SymbolKind::Entry(EntryBinding::BoundTo(address));
                    // Remember the underlying local kind so relocate_data can
                    // still find data-typed entries; stash it via a second
                    // bookkeeping kind would overcomplicate the enum, so we
                    // track "is this entry over a data symbol" separately.
                    return Ok(());
                }
                SymbolKind::Code | SymbolKind::Data => {
                    return Err(AssemblerError::DuplicateSymbol {
                        name: name.to_string(),
                        line_number,
                        line: line.to_string(),
                    });
                }
            }
        }

        self.order.push(name.to_string());
        self.by_name.insert(name.to_string(), Symbol::new(name, address, kind, line_number));
        Ok(())
    }

    /// Declare `.extern NAME`. Redundant declarations are silently accepted.
    pub fn declare_extern(&mut self, name: &str, line_number: usize, line: &str) -> Result<(), AssemblerError> {
        if let Some(existing) = self.by_name.get(name) {
            return match existing.kind {
                SymbolKind::External => Ok(()),
                SymbolKind::Entry(_) => Err(AssemblerError::EntryExternConflict {
                    name: name.to_string(),
                    line_number,
                    line: line.to_string(),
                }),
                SymbolKind::Code | SymbolKind::Data => Err(AssemblerError::ExternAfterLocalDefinition {
                    name: name.to_string(),
                    line_number,
                    line: line.to_string(),
                }),
            };
        }
        self.order.push(name.to_string());
        self.by_name.insert(name.to_string(), Symbol::new(name, 0, SymbolKind::External, line_number));
        Ok(())
    }

    /// Declare `.entry NAME`. Overlays the type on an existing local
    /// definition, or creates a placeholder bound later when the local
    /// definition is encountered.
    pub fn declare_entry(&mut self, name: &str, line_number: usize, line: &str) -> Result<(), AssemblerError> {
        if let Some(existing) = self.by_name.get_mut(name) {
            return match existing.kind {
                SymbolKind::External => Err(AssemblerError::EntryExternConflict {
                    name: name.to_string(),
                    line_number,
                    line: line.to_string(),
                }),
                SymbolKind::Entry(_) => Ok(()),
                SymbolKind::Code | SymbolKind::Data => {
                    let address = existing.address;
                    existing.kind = SymbolKind::Entry(EntryBinding::BoundTo(address));
                    Ok(())
                }
            };
        }
        self.order.push(name.to_string());
        self.by_name.insert(
            name.to_string(),
            Symbol::new(name, 0, SymbolKind::Entry(EntryBinding::Placeholder), line_number),
        );
        Ok(())
    }

    /// After pass 1: shift every `data`-typed symbol's stored offset by
    /// `icf`, and the same for any entry placeholder whose address is below
    /// `MEMORY_START` (it was bound to a data offset before ICF was known).
    pub fn relocate_data(&mut self, icf: u16) {
        for name in &self.order {
            if let Some(symbol) = self.by_name.get_mut(name) {
                match symbol.kind {
                    SymbolKind::Data => symbol.address += icf,
                    SymbolKind::Entry(EntryBinding::BoundTo(address)) if address < MEMORY_START => {
                        symbol.address += icf;
                        symbol.kind = SymbolKind::Entry(EntryBinding::BoundTo(symbol.address));
                    }
                    _ => {}
                }
            }
        }
    }

    /// Record a reference site for an external symbol. Fails if `name` is
    /// not declared external.
    pub fn record_external_use(&mut self, name: &str, address: u16) -> Result<(), AssemblerError> {
        match self.by_name.get_mut(name) {
            Some(symbol) if symbol.kind == SymbolKind::External => {
                symbol.external_uses.push(address);
                Ok(())
            }
            _ => Err(AssemblerError::Internal {
                message: format!("record_external_use called on non-external symbol \"{}\"", name),
            }),
        }
    }

    /// Every `.entry` symbol must end up bound to a real address; called
    /// after pass 2.
    pub fn unbound_entries(&self) -> Vec<String> {
        self.iter()
            .filter(|symbol| matches!(symbol.kind, SymbolKind::Entry(EntryBinding::Placeholder)))
            .map(|symbol| symbol.name.clone())
            .collect()
    }
}

fn is_directive_word(name: &str) -> bool {
    matches!(name, "data" | "string" | "mat" | "extern" | "entry" | "mcro" | "mcroend")
}

impl PartialEq for SymbolKind {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (SymbolKind::Code, SymbolKind::Code)
                | (SymbolKind::Data, SymbolKind::Data)
                | (SymbolKind::External, SymbolKind::External)
                | (SymbolKind::Entry(_), SymbolKind::Entry(_))
        )
    }
}
impl Eq for SymbolKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_local_definition_is_an_error() {
        let mut table = SymbolTable::new();
        table.insert_local("X", 100, SymbolKind::Code, 1, "X: stop").unwrap();
        let err = table.insert_local("X", 102, SymbolKind::Data, 2, "X: .data 1");
        assert!(matches!(err, Err(AssemblerError::DuplicateSymbol { .. })));
    }

    #[test]
    fn extern_then_local_definition_conflicts() {
        let mut table = SymbolTable::new();
        table.declare_extern("FOO", 1, ".extern FOO").unwrap();
        let err = table.insert_local("FOO", 100, SymbolKind::Code, 2, "FOO: stop");
        assert!(matches!(err, Err(AssemblerError::LocalDefinitionAfterExtern { .. })));
    }

    #[test]
    fn redundant_extern_is_accepted() {
        let mut table = SymbolTable::new();
        table.declare_extern("FOO", 1, ".extern FOO").unwrap();
        table.declare_extern("FOO", 2, ".extern FOO").unwrap();
        assert_eq!(table.find("FOO").unwrap().address, 0);
    }

    #[test]
    fn entry_before_definition_is_placeholder_then_bound() {
        let mut table = SymbolTable::new();
        table.declare_entry("MAIN", 1, ".entry MAIN").unwrap();
        assert_eq!(table.unbound_entries(), vec!["MAIN".to_string()]);
        table.insert_local("MAIN", 103, SymbolKind::Code, 3, "MAIN: stop").unwrap();
        assert!(table.unbound_entries().is_empty());
        assert_eq!(table.find("MAIN").unwrap().address, 103);
    }

    #[test]
    fn relocate_data_shifts_data_symbols_by_icf() {
        let mut table = SymbolTable::new();
        table.insert_local("X", 1, SymbolKind::Data, 2, "X: .data 7").unwrap();
        table.relocate_data(101);
        assert_eq!(table.find("X").unwrap().address, 102);
    }

    #[test]
    fn external_use_sites_recorded_in_order() {
        let mut table = SymbolTable::new();
        table.declare_extern("FOO", 1, ".extern FOO").unwrap();
        table.record_external_use("FOO", 101).unwrap();
        table.record_external_use("FOO", 105).unwrap();
        assert_eq!(table.find("FOO").unwrap().external_uses, vec![101, 105]);
    }
}
