//! The resource layer: directory parsing, decompression, and the retained
//! resource store (spec §4.1–§4.3).

pub mod directory;
pub mod memory;
pub mod parts;
pub mod reader;
pub mod rle;

pub use directory::{DirectoryError, ResourceDescriptor, ResourceDirectory, ResourceKind};
pub use memory::{LoadedPartAddresses, Memory, MemoryError, TemporaryBitmap};
pub use parts::{GamePart, PartResourceIds, ANIMATIONS_RESOURCE_ID};
pub use reader::{FsResourceReader, ResourceReader};
pub use rle::RleError;
