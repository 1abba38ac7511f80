//! Parses `MEMLIST.BIN` into the resource descriptor table (spec §4.1).

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;

/// Upper bound on record count before the terminator, matching spec §4.1.
const MAX_RESOURCE_RECORDS: usize = 1000;

/// A record's length on disk, and the terminator value for its first byte.
const RECORD_SIZE: usize = 20;
const END_OF_LIST_MARKER: u8 = 0xFF;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("invalid resource type byte {0}")]
    InvalidResourceType(u8),
    #[error("resource reports packed_size > unpacked_size ({packed} > {unpacked})")]
    InvalidResourceSize { packed: u16, unpacked: u16 },
    #[error("unexpected end of MEMLIST.BIN stream")]
    EndOfStream,
    #[error("more than {MAX_RESOURCE_RECORDS} records before a terminator")]
    ResourceListTooLarge,
}

impl From<io::Error> for DirectoryError {
    fn from(_: io::Error) -> Self {
        DirectoryError::EndOfStream
    }
}

/// The kinds a resource can be, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    SoundOrEmpty,
    Music,
    Bitmap,
    Palettes,
    Bytecode,
    Polygons,
    SpritePolygons,
}

impl ResourceKind {
    fn from_byte(byte: u8) -> Result<Self, DirectoryError> {
        match byte {
            0 => Ok(ResourceKind::SoundOrEmpty),
            1 => Ok(ResourceKind::Music),
            2 => Ok(ResourceKind::Bitmap),
            3 => Ok(ResourceKind::Palettes),
            4 => Ok(ResourceKind::Bytecode),
            5 => Ok(ResourceKind::Polygons),
            6 => Ok(ResourceKind::SpritePolygons),
            other => Err(DirectoryError::InvalidResourceType(other)),
        }
    }
}

/// One parsed MEMLIST.BIN record. Immutable after directory load (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub bank_id: u8,
    pub bank_offset: u32,
    pub packed_size: u16,
    pub unpacked_size: u16,
}

impl ResourceDescriptor {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Option<Self>, DirectoryError> {
        let state = reader.read_u8()?;
        if state == END_OF_LIST_MARKER {
            return Ok(None);
        }

        let kind_byte = reader.read_u8()?;
        // bytes 2..7 (rank, bank_id placeholder, etc.) are reserved/ignored up
        // to the real bank_id field at offset 7.
        let mut reserved = [0u8; 5];
        reader.read_exact(&mut reserved)?;
        let bank_id = reader.read_u8()?;
        let bank_offset = reader.read_u32::<BigEndian>()?;
        let mut reserved2 = [0u8; 2];
        reader.read_exact(&mut reserved2)?;
        let packed_size = reader.read_u16::<BigEndian>()?;
        let mut reserved3 = [0u8; 2];
        reader.read_exact(&mut reserved3)?;
        let unpacked_size = reader.read_u16::<BigEndian>()?;

        let kind = ResourceKind::from_byte(kind_byte)?;
        if packed_size > unpacked_size {
            return Err(DirectoryError::InvalidResourceSize {
                packed: packed_size,
                unpacked: unpacked_size,
            });
        }

        let _ = state;
        Ok(Some(ResourceDescriptor {
            kind,
            bank_id,
            bank_offset,
            packed_size,
            unpacked_size,
        }))
    }
}

/// The parsed directory: a flat, index-addressed table of descriptors.
#[derive(Debug, Default)]
pub struct ResourceDirectory {
    pub entries: Vec<ResourceDescriptor>,
}

impl ResourceDirectory {
    pub fn parse<R: Read>(mut reader: R) -> Result<Self, DirectoryError> {
        let mut entries = Vec::new();
        loop {
            match ResourceDescriptor::from_reader(&mut reader)? {
                Some(descriptor) => {
                    entries.push(descriptor);
                    if entries.len() > MAX_RESOURCE_RECORDS {
                        return Err(DirectoryError::ResourceListTooLarge);
                    }
                }
                None => break,
            }
        }
        Ok(ResourceDirectory { entries })
    }

    pub fn get(&self, resource_id: usize) -> Option<&ResourceDescriptor> {
        self.entries.get(resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_only_yields_empty_list() {
        let dir = ResourceDirectory::parse(&[0xFFu8][..]).unwrap();
        assert!(dir.entries.is_empty());
    }

    fn record(kind: u8, bank: u8, offset: u32, packed: u16, unpacked: u16) -> Vec<u8> {
        let mut buf = vec![0u8; RECORD_SIZE];
        buf[0] = 0x01; // state: in use
        buf[1] = kind;
        buf[7] = bank;
        buf[8..12].copy_from_slice(&offset.to_be_bytes());
        buf[14..16].copy_from_slice(&packed.to_be_bytes());
        buf[18..20].copy_from_slice(&unpacked.to_be_bytes());
        buf
    }

    #[test]
    fn parses_a_concrete_descriptor() {
        let mut stream = record(4, 5, 0xDEADBEEF, 0x8BAD, 0xF00D);
        stream.push(0xFF);
        let dir = ResourceDirectory::parse(&stream[..]).unwrap();
        assert_eq!(dir.entries.len(), 1);
        let d = dir.entries[0];
        assert!(matches!(d.kind, ResourceKind::Bytecode));
        assert_eq!(d.bank_id, 5);
        assert_eq!(d.bank_offset, 0xDEADBEEF);
        assert_eq!(d.packed_size, 0x8BAD);
        assert_eq!(d.unpacked_size, 0xF00D);
    }

    #[test]
    fn packed_larger_than_unpacked_is_rejected() {
        let mut stream = record(4, 5, 0xDEADBEEF, 0xF00E, 0xF00D);
        stream.push(0xFF);
        let err = ResourceDirectory::parse(&stream[..]).unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidResourceSize { .. }));
    }

    #[test]
    fn missing_terminator_is_end_of_stream() {
        let stream = record(4, 5, 0, 10, 10);
        let err = ResourceDirectory::parse(&stream[..]).unwrap_err();
        assert!(matches!(err, DirectoryError::EndOfStream));
    }

    #[test]
    fn unknown_kind_byte_is_rejected() {
        let mut stream = record(9, 1, 0, 1, 1);
        stream.push(0xFF);
        let err = ResourceDirectory::parse(&stream[..]).unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidResourceType(9)));
    }

    #[test]
    fn exactly_the_maximum_record_count_before_a_terminator_succeeds() {
        let mut stream = Vec::new();
        for _ in 0..MAX_RESOURCE_RECORDS {
            stream.extend(record(4, 0, 0, 1, 1));
        }
        stream.push(0xFF);
        let dir = ResourceDirectory::parse(&stream[..]).unwrap();
        assert_eq!(dir.entries.len(), MAX_RESOURCE_RECORDS);
    }

    #[test]
    fn one_more_than_the_maximum_record_count_is_rejected() {
        let mut stream = Vec::new();
        for _ in 0..MAX_RESOURCE_RECORDS + 1 {
            stream.extend(record(4, 0, 0, 1, 1));
        }
        stream.push(0xFF);
        let err = ResourceDirectory::parse(&stream[..]).unwrap_err();
        assert!(matches!(err, DirectoryError::ResourceListTooLarge));
    }
}
