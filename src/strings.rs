//! Localized string lookup for the `DrawString` bytecode op (spec §4.6 #18).

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StringError {
    #[error("string id {0} is not present in the string table")]
    InvalidStringID(u16),
}

/// A source of localized strings the VM can render. Hosts may swap in a
/// table loaded from disk; [`DefaultStringTable`] ships a small built-in
/// English set so the VM works without one.
pub trait StringTable {
    fn get(&self, id: u16) -> Result<&str, StringError>;
}

/// A handful of the Another World English strings, keyed by their original
/// resource string ids. Good enough to drive the intro and password screens;
/// a host wanting the full set supplies its own [`StringTable`].
pub struct DefaultStringTable {
    entries: BTreeMap<u16, String>,
}

impl Default for DefaultStringTable {
    fn default() -> Self {
        let entries = [
            (0x001, "P"),
            (0x002, "E"),
            (0x003, "R"),
            (0x004, "Q"),
            (0x005, "W"),
            (0x006, "X"),
            (0x064, "Another World"),
            (0x0C9, "Insert disk"),
        ]
        .into_iter()
        .map(|(id, s)| (id, s.to_owned()))
        .collect();
        DefaultStringTable { entries }
    }
}

impl StringTable for DefaultStringTable {
    fn get(&self, id: u16) -> Result<&str, StringError> {
        self.entries.get(&id).map(|s| s.as_str()).ok_or(StringError::InvalidStringID(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_is_invalid() {
        let table = DefaultStringTable::default();
        assert!(matches!(table.get(0xFFFF), Err(StringError::InvalidStringID(0xFFFF))));
    }

    #[test]
    fn known_id_resolves() {
        let table = DefaultStringTable::default();
        assert_eq!(table.get(0x064).unwrap(), "Another World");
    }
}
