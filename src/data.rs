//! Data items produced by `.data`, `.string`, and `.mat` directives

use crate::encoder::encode_signed;

#[derive(Debug, Clone)]
pub struct DataItem {
    /// Offset from 0 during pass 1; rewritten to the final address
    /// (`ICF + offset`) once ICF is known — `IC`/`ICF` already starts from
    /// and embeds `MEMORY_START`, so it is not added a second time here
    /// (see DESIGN.md's resolution of the `.ob` data-address formula).
    pub address: u16,
    pub value: i32,
}

impl DataItem {
    pub fn new(offset: u16, value: i32) -> DataItem {
        DataItem { address: offset, value }
    }

    pub fn base4(&self) -> String {
        encode_signed(self.value)
    }
}
