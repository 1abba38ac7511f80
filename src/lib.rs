//! A byte-accurate reimplementation of the Another World (1991) virtual
//! machine: resource loading, the bytecode interpreter, the polygon
//! rasterizer, and the audio mixer, wired together behind a small
//! [`host::Host`] trait a frontend implements (spec §1).

pub mod audio;
pub mod config;
pub mod filename;
pub mod host;
pub mod numeric;
pub mod resource;
pub mod strings;
pub mod video;
pub mod vm;

pub use config::{Config, TimingMode};
pub use host::{Host, Surface};
pub use resource::{FsResourceReader, GamePart, ResourceReader};
pub use strings::{DefaultStringTable, StringError, StringTable};
pub use vm::{Input, Machine, MachineError};
