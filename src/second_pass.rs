//! Pass 2: resolve symbolic references and emit base-4 encoded words
//!
//! Mirrors the teacher's `second_pass`/`parse_statement` shape in
//! `assembler.rs` — walk the instruction list built in pass 1 and encode
//! each one — generalized to this ISA's addressing modes and ARE scheme
//! (spec.md §4.5).

use crate::addressing::Operand;
use crate::encoder::{self, Are, ModeDigit};
use crate::error::AssemblerError;
use crate::instruction::Instruction;
use crate::symbol::{SymbolKind, SymbolTable};

/// One instruction's fully-encoded words, in emission order starting at
/// `address` (opcode word first, then operand words).
pub struct EncodedInstruction {
    pub address: u16,
    pub words: Vec<String>,
}

pub struct SecondPassOutput {
    pub instructions: Vec<EncodedInstruction>,
    pub errors: Vec<AssemblerError>,
}

pub fn run(instructions: &[Instruction], symbols: &mut SymbolTable) -> SecondPassOutput {
    let mut out = Vec::with_capacity(instructions.len());
    let mut errors = Vec::new();

    for instruction in instructions {
        match encode_instruction(instruction, symbols) {
            Ok(encoded) => out.push(encoded),
            Err(e) => errors.push(e),
        }
    }

    for name in symbols.unbound_entries() {
        errors.push(AssemblerError::UndefinedEntry { name });
    }

    SecondPassOutput { instructions: out, errors }
}

fn encode_instruction(
    instruction: &Instruction,
    symbols: &mut SymbolTable,
) -> Result<EncodedInstruction, AssemblerError> {
    let src_mode = instruction.src.as_ref().map(Operand::mode_digit).unwrap_or(ModeDigit::Immediate);
    let dest_mode = instruction.dest.as_ref().map(Operand::mode_digit).unwrap_or(ModeDigit::Immediate);

    let mut words = vec![encoder::instruction_word(&instruction.opcode, src_mode, dest_mode, Are::Absolute)];

    match (&instruction.src, &instruction.dest) {
        (Some(Operand::Register(src_reg)), Some(Operand::Register(dest_reg))) => {
            words.push(shared_register_word(*src_reg, *dest_reg));
        }
        (src, dest) => {
            if let Some(src) = src {
                encode_operand(src, true, instruction, symbols, &mut words)?;
            }
            if let Some(dest) = dest {
                encode_operand(dest, false, instruction, symbols, &mut words)?;
            }
        }
    }

    if words.len() as u16 != instruction.length {
        return Err(AssemblerError::Internal {
            message: format!(
                "line {}: encoded {} words but pass 1 computed length {}",
                instruction.line_number,
                words.len(),
                instruction.length
            ),
        });
    }

    Ok(EncodedInstruction { address: instruction.address, words })
}

fn encode_operand(
    operand: &Operand,
    is_source: bool,
    instruction: &Instruction,
    symbols: &mut SymbolTable,
    words: &mut Vec<String>,
) -> Result<(), AssemblerError> {
    match operand {
        Operand::Immediate(value) => {
            words.push(immediate_word(*value, Are::Absolute));
        }
        Operand::Register(register) => {
            words.push(lone_register_word(*register, is_source));
        }
        Operand::Direct(name) => {
            let word_address = instruction.address + words.len() as u16;
            words.push(resolve_label(name, word_address, instruction, symbols)?);
        }
        Operand::Matrix { label, row_register, col_register } => {
            let word_address = instruction.address + words.len() as u16;
            words.push(resolve_label(label, word_address, instruction, symbols)?);
            words.push(shared_register_word(*row_register, *col_register));
        }
    }
    Ok(())
}

fn resolve_label(
    name: &str,
    word_address: u16,
    instruction: &Instruction,
    symbols: &mut SymbolTable,
) -> Result<String, AssemblerError> {
    let symbol = symbols.find(name).ok_or_else(|| AssemblerError::UndefinedSymbol {
        name: name.to_string(),
        line_number: instruction.line_number,
        line: String::new(),
    })?;

    let are = if symbol.kind == SymbolKind::External { Are::External } else { Are::Relocatable };
    let address = symbol.address;

    if are == Are::External {
        symbols.record_external_use(name, word_address)?;
    }

    Ok(direct_word(address, are))
}

/// `address` in the upper 8 bits, ARE in the low 2 bits
fn direct_word(address: u16, are: Are) -> String {
    let bits = ((address & 0xFF) << 2) | are.bits();
    encoder::word_to_base4(bits)
}

/// An immediate operand word: the value's low 8 bits in the upper 4 digits,
/// ARE forced into the low digit — the same `<< 2 | are.bits()` composition
/// every other operand word in this module uses, so the low base-4 digit is
/// always one of `a`/`b`/`c` (never a raw value bit) as spec.md §8's
/// invariant requires. See DESIGN.md's "immediate ARE composition" entry for
/// why this takes only the value's low 8 bits rather than the full masked
/// 10-bit two's-complement pattern `encode_signed` uses for `.data` words.
fn immediate_word(value: i32, are: Are) -> String {
    let low_byte = (value as i16 as u16) & 0xFF;
    let bits = (low_byte << 2) | are.bits();
    encoder::word_to_base4(bits)
}

/// A single register operand: its number in bits 9-6 if source, else 5-2;
/// all other bits zero, ARE absolute.
fn lone_register_word(register: u8, is_source: bool) -> String {
    let shift = if is_source { 6 } else { 2 };
    let bits = (register as u16) << shift;
    encoder::word_to_base4(bits)
}

/// Two registers sharing one word: source in bits 9-6, destination in bits
/// 5-2, ARE absolute.
fn shared_register_word(src_register: u8, dest_register: u8) -> String {
    let bits = ((src_register as u16) << 6) | ((dest_register as u16) << 2);
    encoder::word_to_base4(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::MEMORY_START;

    fn instr(opcode: &str, src: Option<Operand>, dest: Option<Operand>, length: u16) -> Instruction {
        Instruction { line_number: 1, address: MEMORY_START, opcode: opcode.to_string(), src, dest, length }
    }

    #[test]
    fn two_register_share_one_word() {
        let instruction = instr("mov", Some(Operand::Register(3)), Some(Operand::Register(5)), 2);
        let mut symbols = SymbolTable::new();
        let encoded = encode_instruction(&instruction, &mut symbols).unwrap();
        assert_eq!(encoded.words.len(), 2);
        assert_eq!(encoded.words[0], "aadda");
        // r3 in bits 9-6, r5 in bits 5-2, ARE 'a' in bits 1-0: 0011010100
        assert_eq!(encoded.words[1], shared_register_word(3, 5));
        assert_eq!(encoded.words[1], "adbba");
    }

    #[test]
    fn external_reference_records_use_site_and_are_b() {
        let mut symbols = SymbolTable::new();
        symbols.declare_extern("FOO", 1, ".extern FOO").unwrap();
        let instruction = instr("jmp", None, Some(Operand::Direct("FOO".to_string())), 2);
        let encoded = encode_instruction(&instruction, &mut symbols).unwrap();
        assert_eq!(encoded.words.len(), 2);
        assert_eq!(encoded.words[1].chars().last().unwrap(), 'b');
        assert_eq!(symbols.find("FOO").unwrap().external_uses, vec![MEMORY_START + 1]);
    }

    #[test]
    fn undefined_symbol_is_an_error() {
        let mut symbols = SymbolTable::new();
        let instruction = instr("jmp", None, Some(Operand::Direct("NOPE".to_string())), 2);
        let err = encode_instruction(&instruction, &mut symbols);
        assert!(matches!(err, Err(AssemblerError::UndefinedSymbol { .. })));
    }

    #[test]
    fn immediate_operand_forces_are_absolute() {
        let instruction = instr("mov", Some(Operand::Immediate(5)), Some(Operand::Register(2)), 3);
        let mut symbols = SymbolTable::new();
        let encoded = encode_instruction(&instruction, &mut symbols).unwrap();
        assert_eq!(
            encoded.words,
            vec!["aaada".to_string(), "aabba".to_string(), "aaaca".to_string()]
        );
        assert_eq!(encoded.words[1].chars().last().unwrap(), 'a');
    }

    #[test]
    fn lone_register_operand_uses_destination_slot() {
        let instruction = instr("inc", None, Some(Operand::Register(3)), 2);
        let mut symbols = SymbolTable::new();
        let encoded = encode_instruction(&instruction, &mut symbols).unwrap();
        assert_eq!(encoded.words, vec!["bdada".to_string(), "aaada".to_string()]);
    }

    #[test]
    fn matrix_operand_emits_address_then_index_register_pair() {
        let mut symbols = SymbolTable::new();
        symbols.insert_local("M", MEMORY_START, SymbolKind::Data, 1, "M: .data 0").unwrap();
        let src = Operand::Matrix { label: "M".to_string(), row_register: 2, col_register: 3 };
        let instruction = instr("mov", Some(src), Some(Operand::Register(1)), 4);
        let encoded = encode_instruction(&instruction, &mut symbols).unwrap();
        assert_eq!(
            encoded.words,
            vec!["aacda".to_string(), "bcbac".to_string(), "acada".to_string(), "aaaba".to_string()]
        );
    }
}
