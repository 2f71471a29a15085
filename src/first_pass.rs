//! Pass 1: lex, classify, allocate IC/DC, build the symbol table
//!
//! Mirrors the shape of the teacher's `first_pass` in `assembler.rs` (lex
//! each line, dispatch directive vs. instruction, accumulate into a symbol
//! table and an ordered statement list) generalized to this ISA's directives
//! and addressing-mode legality rules (spec.md §4.4).

use crate::addressing;
use crate::data::DataItem;
use crate::directives;
use crate::error::{AssemblerError, AssemblerWarning};
use crate::instruction::Instruction;
use crate::statement::Line;
use crate::symbol::{SymbolKind, SymbolTable, MEMORY_START};

pub struct FirstPassOutput {
    pub symbols: SymbolTable,
    pub instructions: Vec<Instruction>,
    pub data: Vec<DataItem>,
    pub icf: u16,
    pub dcf: u16,
    pub errors: Vec<AssemblerError>,
    pub warnings: Vec<AssemblerWarning>,
}

struct Pass1<'a> {
    symbols: SymbolTable,
    instructions: Vec<Instruction>,
    data: Vec<DataItem>,
    ic: u16,
    dc: u16,
    errors: Vec<AssemblerError>,
    warnings: Vec<AssemblerWarning>,
    expanded_source: &'a str,
}

pub fn run(expanded_source: &str) -> FirstPassOutput {
    let mut pass = Pass1 {
        symbols: SymbolTable::new(),
        instructions: Vec::new(),
        data: Vec::new(),
        ic: MEMORY_START,
        dc: 0,
        errors: Vec::new(),
        warnings: Vec::new(),
        expanded_source,
    };

    for (index, raw_line) in expanded_source.lines().enumerate() {
        let line_number = index + 1;
        match Line::decode(line_number, raw_line) {
            Ok(Some(line)) => pass.process_line(line),
            Ok(None) => {}
            Err(e) => pass.errors.push(e),
        }
    }

    pass.symbols.relocate_data(pass.ic);
    for item in &mut pass.data {
        item.address += pass.ic;
    }

    FirstPassOutput {
        symbols: pass.symbols,
        instructions: pass.instructions,
        data: pass.data,
        icf: pass.ic,
        dcf: pass.dc,
        errors: pass.errors,
        warnings: pass.warnings,
    }
}

impl<'a> Pass1<'a> {
    fn process_line(&mut self, line: Line) {
        if line.is_directive() {
            self.process_directive(line);
        } else {
            self.process_instruction(line);
        }
    }

    fn process_directive(&mut self, line: Line) {
        let directive = line.keyword.as_str();
        match directive {
            ".data" => self.process_data_directive(&line),
            ".string" => self.process_string_directive(&line),
            ".mat" => self.process_mat_directive(&line),
            ".extern" => self.process_extern_directive(&line),
            ".entry" => self.process_entry_directive(&line),
            _ => self.errors.push(AssemblerError::InvalidName {
                name: directive.to_string(),
                line_number: line.line_number,
                line: line.raw.clone(),
            }),
        }
    }

    fn append_data(&mut self, line: &Line, values: Vec<i32>) {
        if let Some(label) = &line.label {
            if let Err(e) = self.symbols.insert_local(
                label,
                self.dc,
                SymbolKind::Data,
                line.line_number,
                &line.raw,
            ) {
                self.errors.push(e);
            }
        }
        for value in values {
            self.data.push(DataItem::new(self.dc, value));
            self.dc += 1;
        }
    }

    fn process_data_directive(&mut self, line: &Line) {
        match directives::parse_data(&line.operands, line.line_number, &line.raw) {
            Ok(values) => self.append_data(line, values),
            Err(e) => self.errors.push(e),
        }
    }

    fn process_string_directive(&mut self, line: &Line) {
        match directives::parse_string(&line.operands, line.line_number, &line.raw) {
            Ok(values) => self.append_data(line, values),
            Err(e) => self.errors.push(e),
        }
    }

    /// `.mat [R][C]` is separated from its first initialiser by whitespace,
    /// not a comma, so the dimensions and the first value lexeme arrive
    /// fused together as the first entry of `line.operands` (the tokenizer
    /// only splits on commas). Split that entry once on its first
    /// whitespace run before handing the rest to [directives::parse_mat].
    fn process_mat_directive(&mut self, line: &Line) {
        let Some(first) = line.operands.first() else {
            self.errors.push(AssemblerError::InvalidMatrixDimensions {
                text: String::new(),
                line_number: line.line_number,
                line: line.raw.clone(),
            });
            return;
        };
        let mut parts = first.splitn(2, char::is_whitespace);
        let dims = parts.next().unwrap_or("");
        let mut values: Vec<String> = Vec::new();
        if let Some(first_value) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
            values.push(first_value.to_string());
        }
        values.extend(line.operands[1..].iter().cloned());

        match directives::parse_mat(dims, &values, line.line_number, &line.raw) {
            Ok(mat) => {
                if mat.overflowed {
                    self.warnings.push(AssemblerWarning::MatrixInitializerOverflow { line_number: line.line_number });
                }
                self.append_data(line, mat.values);
            }
            Err(e) => self.errors.push(e),
        }
    }

    fn process_extern_directive(&mut self, line: &Line) {
        if line.label.is_some() {
            self.warnings.push(AssemblerWarning::LabelOnDirective { directive: ".extern", line_number: line.line_number });
        }
        let Some(name) = line.operands.first() else {
            self.errors.push(AssemblerError::MalformedOperandList { line_number: line.line_number, line: line.raw.clone() });
            return;
        };
        if line.operands.len() > 1 {
            self.errors.push(AssemblerError::MalformedOperandList { line_number: line.line_number, line: line.raw.clone() });
            return;
        }
        if let Err(e) = SymbolTable::validate_name(name, line.line_number, &line.raw) {
            self.errors.push(e);
            return;
        }
        if let Err(e) = self.symbols.declare_extern(name, line.line_number, &line.raw) {
            self.errors.push(e);
        }
    }

    fn process_entry_directive(&mut self, line: &Line) {
        if line.label.is_some() {
            self.warnings.push(AssemblerWarning::LabelOnDirective { directive: ".entry", line_number: line.line_number });
        }
        let Some(name) = line.operands.first() else {
            self.errors.push(AssemblerError::MalformedOperandList { line_number: line.line_number, line: line.raw.clone() });
            return;
        };
        if line.operands.len() > 1 {
            self.errors.push(AssemblerError::MalformedOperandList { line_number: line.line_number, line: line.raw.clone() });
            return;
        }
        if let Err(e) = SymbolTable::validate_name(name, line.line_number, &line.raw) {
            self.errors.push(e);
            return;
        }
        if let Err(e) = self.symbols.declare_entry(name, line.line_number, &line.raw) {
            self.errors.push(e);
        }
    }

    fn process_instruction(&mut self, line: Line) {
        let spec = match addressing::opcode_spec(&line.keyword) {
            Some(spec) => spec,
            None => {
                self.errors.push(AssemblerError::InvalidName {
                    name: line.keyword.clone(),
                    line_number: line.line_number,
                    line: line.raw.clone(),
                });
                return;
            }
        };

        if line.operands.len() != spec.n_operands {
            self.errors.push(AssemblerError::WrongOperandCount {
                opcode: line.keyword.clone(),
                found: line.operands.len(),
                expected: match spec.n_operands {
                    0 => "0",
                    1 => "1",
                    _ => "2",
                },
                line_number: line.line_number,
                line: line.raw.clone(),
            });
            return;
        }

        let mut operands = Vec::with_capacity(line.operands.len());
        let mut parse_failed = false;
        for op_text in &line.operands {
            match addressing::parse_operand(op_text, line.line_number, &line.raw) {
                Ok(op) => operands.push(op),
                Err(e) => {
                    self.errors.push(e);
                    parse_failed = true;
                }
            }
        }
        if parse_failed {
            return;
        }

        let (src, dest) = match operands.len() {
            2 => (Some(operands[0].clone()), Some(operands[1].clone())),
            1 => (None, Some(operands[0].clone())),
            _ => (None, None),
        };

        if let Some(s) = &src {
            if !spec.src.allows(s) {
                self.errors.push(AssemblerError::IllegalAddressingMode {
                    opcode: line.keyword.clone(),
                    slot: "source",
                    line_number: line.line_number,
                    line: line.raw.clone(),
                });
                return;
            }
        }
        if let Some(d) = &dest {
            if !spec.dest.allows(d) {
                self.errors.push(AssemblerError::IllegalAddressingMode {
                    opcode: line.keyword.clone(),
                    slot: "destination",
                    line_number: line.line_number,
                    line: line.raw.clone(),
                });
                return;
            }
        }

        let length = addressing::instruction_length(src.as_ref(), dest.as_ref());
        if length > 5 {
            self.errors.push(AssemblerError::Internal {
                message: format!("instruction length {} exceeds the maximum of 5", length),
            });
            return;
        }

        let address = self.ic;
        if let Some(label) = &line.label {
            if let Err(e) = self.symbols.insert_local(label, address, SymbolKind::Code, line.line_number, &line.raw) {
                self.errors.push(e);
            }
        }

        self.instructions.push(Instruction {
            line_number: line.line_number,
            address,
            opcode: line.keyword.clone(),
            src,
            dest,
            length,
        });
        self.ic += length;
    }
}
