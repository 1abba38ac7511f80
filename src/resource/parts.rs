//! `GamePart` and the fixed per-part resource table (spec §3).

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::EnumCount;

/// One of the nine self-contained chapters/screens. The original data
/// carries two distinct raw IDs for password entry (`0x3E88`/`0x3E89`); per
/// the spec's Open Questions this is collapsed into a single variant here,
/// and both raw IDs alias it (see [`GamePart::try_from_raw`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, EnumCount)]
#[repr(u16)]
pub enum GamePart {
    CopyProtection = 0x3E80,
    IntroCinematic = 0x3E81,
    Gameplay1 = 0x3E82,
    Gameplay2 = 0x3E83,
    Gameplay3 = 0x3E84,
    ArenaCinematic = 0x3E85,
    Gameplay4 = 0x3E86,
    EndingCinematic = 0x3E87,
    PasswordEntry = 0x3E88,
}

/// The second, duplicate raw ID the original conflates with password entry.
const PASSWORD_ENTRY_ALIAS_RAW: u16 = 0x3E89;

impl GamePart {
    /// Resolve a raw bytecode-supplied ID to a `GamePart`, folding the
    /// known duplicate password-entry ID into [`GamePart::PasswordEntry`].
    pub fn try_from_raw(raw: u16) -> Result<Self, u16> {
        if raw == PASSWORD_ENTRY_ALIAS_RAW {
            return Ok(GamePart::PasswordEntry);
        }
        GamePart::try_from_primitive(raw).map_err(|e| e.number)
    }

    /// All parts except copy protection and password entry may schedule a
    /// transition into password entry (spec §6).
    pub fn allows_password_entry(self) -> bool {
        !matches!(self, GamePart::CopyProtection | GamePart::PasswordEntry)
    }

    fn table_index(self) -> usize {
        self as u16 as usize - GamePart::CopyProtection as u16 as usize
    }

    /// The four (or three) resource ids making up this part: palettes,
    /// bytecode, polygons, and an optional animations/sprite-polygon id.
    pub fn resource_ids(self) -> PartResourceIds {
        PART_TABLE[self.table_index()]
    }
}

/// The `{palettes_id, bytecode_id, polygons_id, animations_id?}` tuple for
/// one game part (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartResourceIds {
    pub palettes_id: usize,
    pub bytecode_id: usize,
    pub polygons_id: usize,
    pub animations_id: Option<usize>,
}

/// The animations resource id (`0x11`) is identical across every gameplay
/// part that uses one (spec §3).
pub const ANIMATIONS_RESOURCE_ID: usize = 0x11;

const NUM_PARTS: usize = GamePart::COUNT;

static PART_TABLE: [PartResourceIds; NUM_PARTS] = [
    PartResourceIds {
        palettes_id: 0x14,
        bytecode_id: 0x15,
        polygons_id: 0x16,
        animations_id: None,
    },
    PartResourceIds {
        palettes_id: 0x17,
        bytecode_id: 0x18,
        polygons_id: 0x19,
        animations_id: None,
    },
    PartResourceIds {
        palettes_id: 0x1A,
        bytecode_id: 0x1B,
        polygons_id: 0x1C,
        animations_id: Some(ANIMATIONS_RESOURCE_ID),
    },
    PartResourceIds {
        palettes_id: 0x1D,
        bytecode_id: 0x1E,
        polygons_id: 0x1F,
        animations_id: Some(ANIMATIONS_RESOURCE_ID),
    },
    PartResourceIds {
        palettes_id: 0x20,
        bytecode_id: 0x21,
        polygons_id: 0x22,
        animations_id: Some(ANIMATIONS_RESOURCE_ID),
    },
    PartResourceIds {
        palettes_id: 0x23,
        bytecode_id: 0x24,
        polygons_id: 0x25,
        animations_id: None,
    },
    PartResourceIds {
        palettes_id: 0x26,
        bytecode_id: 0x27,
        polygons_id: 0x28,
        animations_id: Some(ANIMATIONS_RESOURCE_ID),
    },
    PartResourceIds {
        palettes_id: 0x29,
        bytecode_id: 0x2A,
        polygons_id: 0x2B,
        animations_id: Some(ANIMATIONS_RESOURCE_ID),
    },
    PartResourceIds {
        palettes_id: 0x7D,
        bytecode_id: 0x7E,
        polygons_id: 0x7F,
        animations_id: None,
    },
];
