//! The host capability the VM uses to fetch raw bank/resource-list bytes
//! (spec §4.9). The VM never opens files itself; a concrete filesystem
//! implementation is provided for convenience but is an external
//! collaborator, not part of the VM core.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::filename::{Filename, RESOURCE_LIST_FILENAME};

pub trait ResourceReader {
    fn read_bank(&self, bank_id: u8) -> io::Result<Vec<u8>>;
    fn read_resource_list(&self) -> io::Result<Vec<u8>>;
}

/// Reads banks and `MEMLIST.BIN` straight off disk from a data directory.
pub struct FsResourceReader {
    data_dir: PathBuf,
}

impl FsResourceReader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        FsResourceReader {
            data_dir: data_dir.into(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

impl ResourceReader for FsResourceReader {
    fn read_bank(&self, bank_id: u8) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(&Filename::new(bank_id).as_string()))
    }

    fn read_resource_list(&self) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(RESOURCE_LIST_FILENAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_path_uses_uppercase_name() {
        let reader = FsResourceReader::new(Path::new("/data"));
        assert_eq!(
            reader.path_for(&Filename::new(0x0A).as_string()),
            Path::new("/data/BANK0A")
        );
    }
}
