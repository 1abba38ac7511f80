//! Owns decoded resource blobs keyed by resource id and resolves per-kind
//! addresses (spec §4.3).

use std::collections::HashMap;
use std::io;

use log::debug;
use thiserror::Error;

use super::directory::{DirectoryError, ResourceDescriptor, ResourceDirectory, ResourceKind};
use super::parts::{GamePart, PartResourceIds};
use super::reader::ResourceReader;
use super::rle::{self, RleError};

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("error parsing the resource directory")]
    Directory(DirectoryError),
    #[error("error decompressing a resource")]
    Rle(RleError),
    #[error("I/O error reading a bank file")]
    Io(io::Error),
    #[error("resource id {0} is not a valid index into the resource directory")]
    InvalidResourceID(usize),
}

impl From<DirectoryError> for MemoryError {
    fn from(value: DirectoryError) -> Self {
        MemoryError::Directory(value)
    }
}

impl From<RleError> for MemoryError {
    fn from(value: RleError) -> Self {
        MemoryError::Rle(value)
    }
}

impl From<io::Error> for MemoryError {
    fn from(value: io::Error) -> Self {
        MemoryError::Io(value)
    }
}

/// The addresses handed back after a successful game-part load: the three
/// always-present ids plus the optional shared animations id, and a bitmap
/// payload if one of the part's resources happened to be a bitmap (spec
/// §4.3 storage policy: consumed once, never retained).
#[derive(Debug, Default)]
pub struct LoadedPartAddresses {
    pub palettes_id: usize,
    pub bytecode_id: usize,
    pub polygons_id: usize,
    pub animations_id: Option<usize>,
    pub bitmap: Option<Vec<u8>>,
}

/// A bitmap resource loaded individually (spec §4.3: "route straight to
/// buffer 0 and discard it").
#[derive(Debug)]
pub struct TemporaryBitmap(pub Vec<u8>);

pub struct Memory<R: ResourceReader> {
    directory: ResourceDirectory,
    reader: R,
    resources: HashMap<usize, Vec<u8>>,
    /// Resource ids loaded since the last game-part switch that are not
    /// part of the four "core" ids -- dropped by `unload_all_individual_resources`.
    individually_loaded: Vec<usize>,
    current_part: Option<GamePart>,
}

impl<R: ResourceReader> Memory<R> {
    pub fn new(reader: R) -> Result<Self, MemoryError> {
        let bytes = reader.read_resource_list()?;
        let directory = ResourceDirectory::parse(&bytes[..])?;
        Ok(Memory {
            directory,
            reader,
            resources: HashMap::new(),
            individually_loaded: Vec::new(),
            current_part: None,
        })
    }

    pub fn current_part(&self) -> Option<GamePart> {
        self.current_part
    }

    fn descriptor(&self, resource_id: usize) -> Result<&ResourceDescriptor, MemoryError> {
        self.directory
            .get(resource_id)
            .ok_or(MemoryError::InvalidResourceID(resource_id))
    }

    fn fetch_and_decode(&self, resource_id: usize) -> Result<Vec<u8>, MemoryError> {
        let descriptor = self.descriptor(resource_id)?;
        let bank = self.reader.read_bank(descriptor.bank_id)?;
        let start = descriptor.bank_offset as usize;
        let end = start + descriptor.packed_size as usize;
        let packed = bank
            .get(start..end)
            .ok_or(MemoryError::InvalidResourceID(resource_id))?;

        if descriptor.packed_size == descriptor.unpacked_size {
            Ok(packed.to_vec())
        } else {
            Ok(rle::decode(packed, descriptor.unpacked_size as usize)?)
        }
    }

    /// Drop every currently held resource and load the (three or four)
    /// resources listed for `part`, decompressing as needed (spec §4.3).
    pub fn load_game_part(&mut self, part: GamePart) -> Result<LoadedPartAddresses, MemoryError> {
        debug!("loading game part {:?}", part);
        self.resources.clear();
        self.individually_loaded.clear();
        self.current_part = Some(part);

        let PartResourceIds {
            palettes_id,
            bytecode_id,
            polygons_id,
            animations_id,
        } = part.resource_ids();

        let mut bitmap = None;
        for &id in [Some(palettes_id), Some(bytecode_id), Some(polygons_id), animations_id]
            .iter()
            .flatten()
        {
            self.load_into_store(id, &mut bitmap)?;
        }

        Ok(LoadedPartAddresses {
            palettes_id,
            bytecode_id,
            polygons_id,
            animations_id,
            bitmap,
        })
    }

    fn load_into_store(
        &mut self,
        resource_id: usize,
        bitmap_out: &mut Option<Vec<u8>>,
    ) -> Result<(), MemoryError> {
        let kind = self.descriptor(resource_id)?.kind;
        let decoded = self.fetch_and_decode(resource_id)?;
        if kind == ResourceKind::Bitmap {
            *bitmap_out = Some(decoded);
        } else {
            self.resources.insert(resource_id, decoded);
        }
        Ok(())
    }

    /// Decompress a single resource on demand. Bitmaps are routed straight
    /// to the caller as a [`TemporaryBitmap`] and never retained; everything
    /// else is inserted into the retained store (spec §4.3).
    pub fn load_individual_resource(
        &mut self,
        resource_id: usize,
    ) -> Result<Option<TemporaryBitmap>, MemoryError> {
        let kind = self.descriptor(resource_id)?.kind;
        let decoded = self.fetch_and_decode(resource_id)?;
        if kind == ResourceKind::Bitmap {
            Ok(Some(TemporaryBitmap(decoded)))
        } else {
            self.resources.insert(resource_id, decoded);
            self.individually_loaded.push(resource_id);
            Ok(None)
        }
    }

    /// Drop retained audio/polygon/bitmap resources loaded since the last
    /// game-part switch, keeping the game-part's core ids (spec §4.3).
    pub fn unload_all_individual_resources(&mut self) {
        for id in self.individually_loaded.drain(..) {
            self.resources.remove(&id);
        }
    }

    /// Returns the decoded bytes only if `resource_id` is currently loaded
    /// AND its recorded kind matches `expected_kind` (spec §4.3).
    pub fn resource_location(&self, resource_id: usize, expected_kind: ResourceKind) -> Option<&[u8]> {
        let descriptor = self.directory.get(resource_id)?;
        if descriptor.kind != expected_kind {
            return None;
        }
        self.resources.get(&resource_id).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeReader {
        list: Vec<u8>,
        banks: RefCell<HashMap<u8, Vec<u8>>>,
    }

    impl ResourceReader for FakeReader {
        fn read_bank(&self, bank_id: u8) -> io::Result<Vec<u8>> {
            Ok(self.banks.borrow().get(&bank_id).cloned().unwrap_or_default())
        }

        fn read_resource_list(&self) -> io::Result<Vec<u8>> {
            Ok(self.list.clone())
        }
    }

    fn record(kind: u8, bank: u8, offset: u32, packed: u16, unpacked: u16) -> Vec<u8> {
        let mut buf = vec![0u8; 20];
        buf[0] = 0x01;
        buf[1] = kind;
        buf[7] = bank;
        buf[8..12].copy_from_slice(&offset.to_be_bytes());
        buf[14..16].copy_from_slice(&packed.to_be_bytes());
        buf[18..20].copy_from_slice(&unpacked.to_be_bytes());
        buf
    }

    #[test]
    fn resource_location_rejects_kind_mismatch() {
        let mut list = record(4, 1, 0, 3, 3); // Bytecode, stored uncompressed
        list.push(0xFF);
        let mut banks = HashMap::new();
        banks.insert(1u8, vec![1, 2, 3]);
        let reader = FakeReader {
            list,
            banks: RefCell::new(banks),
        };
        let mut mem = Memory::new(reader).unwrap();
        mem.load_individual_resource(0).unwrap();
        assert!(mem.resource_location(0, ResourceKind::Bytecode).is_some());
        assert!(mem.resource_location(0, ResourceKind::Music).is_none());
    }

    #[test]
    fn invalid_resource_id_is_rejected() {
        let mut list = record(4, 1, 0, 3, 3);
        list.push(0xFF);
        let reader = FakeReader {
            list,
            banks: RefCell::new(HashMap::new()),
        };
        let mut mem = Memory::new(reader).unwrap();
        let err = mem.load_individual_resource(5).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidResourceID(5)));
    }

    #[test]
    fn unload_all_individual_resources_keeps_core_four() {
        let mut list = record(4, 1, 0, 3, 3); // id 0: bytecode (core, stand-in)
        list.extend(record(0, 1, 3, 2, 2)); // id 1: sound, individually loaded
        list.push(0xFF);
        let mut banks = HashMap::new();
        banks.insert(1u8, vec![1, 2, 3, 4, 5]);
        let reader = FakeReader {
            list,
            banks: RefCell::new(banks),
        };
        let mut mem = Memory::new(reader).unwrap();
        mem.resources.insert(0, vec![1, 2, 3]); // simulate a core resource
        mem.load_individual_resource(1).unwrap();
        assert!(mem.resource_location(1, ResourceKind::SoundOrEmpty).is_some());
        mem.unload_all_individual_resources();
        assert!(mem.resource_location(1, ResourceKind::SoundOrEmpty).is_none());
        assert!(mem.resources.contains_key(&0));
    }
}
