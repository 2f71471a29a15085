//! A two-pass assembler for a 16-opcode / 4-addressing-mode, 10-bit-word
//! machine: macro pre-processing, symbol-table construction with deferred
//! data-address relocation, and bit-exact base-4 encoding.

pub mod addressing;
pub mod context;
pub mod data;
pub mod directives;
pub mod encoder;
pub mod error;
pub mod first_pass;
pub mod instruction;
pub mod logging;
pub mod macros;
pub mod second_pass;
pub mod statement;
pub mod symbol;