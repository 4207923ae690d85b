//! Persisted user settings with integrity checking and version skew handling.
//!
//! The record is 16 bytes, little-endian:
//!
//! | offset | field              |
//! |--------|--------------------|
//! | 0..2   | magic              |
//! | 2..4   | format version     |
//! | 4..8   | header CRC-32      |
//! | 8      | default input      |
//! | 9      | pedestal preference|
//! | 10     | smoothing          |
//! | 11     | disable free-run   |
//! | 12..16 | body CRC-32        |
//!
//! Each checksum covers the preceding bytes of its own section.

use core::fmt;

use crc::{CRC_32_ISO_HDLC, Crc};

use crate::video::InputSelector;

/// Size of the serialized record.
pub const RECORD_LEN: usize = 16;

/// Identifies a settings record written by this firmware family.
pub const SETTINGS_MAGIC: u16 = 0x4b59;

/// Layout version understood by this build.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4;
const BODY_START: usize = 8;
const BODY_LEN: usize = 4;

const CHECKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Raw settings record as stored in non-volatile memory.
pub type SettingsRecord = [u8; RECORD_LEN];

/// User-facing settings body.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub default_input: InputSelector,
    pub pedestal_preference: bool,
    pub smoothing: bool,
    pub disable_free_run: bool,
}

impl Settings {
    /// Compiled-in defaults substituted for corrupt records.
    #[must_use]
    pub const fn defaults() -> Self {
        Self {
            default_input: InputSelector::Component,
            pedestal_preference: false,
            smoothing: false,
            disable_free_run: false,
        }
    }

    fn encode(self) -> [u8; BODY_LEN] {
        [
            self.default_input.to_raw(),
            u8::from(self.pedestal_preference),
            u8::from(self.smoothing),
            u8::from(self.disable_free_run),
        ]
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        Some(Self {
            default_input: InputSelector::from_raw(bytes[0])?,
            pedestal_preference: bytes[1] != 0,
            smoothing: bytes[2] != 0,
            disable_free_run: bytes[3] != 0,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Classification of a settings load, reported once at boot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    /// Both checksums verified against the current layout.
    Valid,
    /// An older layout was found and promoted to the current version.
    Upgraded { from: u16 },
    /// Magic or header checksum mismatch; the whole record was reset.
    HeaderCorrupt,
    /// Header valid but the body failed verification; the body was reset.
    BodyCorrupt,
    /// The record was written by a newer build and is used read-only.
    Downgrading { found: u16 },
}

impl LoadOutcome {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            LoadOutcome::Valid => "valid",
            LoadOutcome::Upgraded { .. } => "upgraded",
            LoadOutcome::HeaderCorrupt => "header-corrupt",
            LoadOutcome::BodyCorrupt => "body-corrupt",
            LoadOutcome::Downgrading { .. } => "downgrading",
        }
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Upgraded { from } => write!(f, "upgraded from v{from}"),
            LoadOutcome::Downgrading { found } => write!(f, "downgrading from v{found}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Non-volatile backing store for the settings record.
pub trait SettingsStorage {
    type Error;

    fn read(&mut self, record: &mut SettingsRecord) -> Result<(), Self::Error>;

    fn write(&mut self, record: &SettingsRecord) -> Result<(), Self::Error>;
}

/// Errors produced while persisting settings.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SettingsError<E> {
    /// The backing store rejected the operation.
    Storage(E),
    /// Persisting is refused because the record belongs to a newer build.
    Downgrading,
}

impl<E: fmt::Debug> fmt::Display for SettingsError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Storage(err) => write!(f, "settings storage error: {err:?}"),
            SettingsError::Downgrading => {
                f.write_str("settings belong to a newer firmware; refusing to overwrite")
            }
        }
    }
}

/// In-memory settings with the integrity state computed at load time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SettingsStore {
    settings: Settings,
    format_version: u16,
    dirty: bool,
    downgrading: bool,
    outcome: LoadOutcome,
}

impl SettingsStore {
    /// Store holding compiled-in defaults, marked dirty.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            settings: Settings::defaults(),
            format_version: FORMAT_VERSION,
            dirty: true,
            downgrading: false,
            outcome: LoadOutcome::HeaderCorrupt,
        }
    }

    /// Validates `record` and returns the resulting store.
    #[must_use]
    pub fn load(record: &SettingsRecord) -> Self {
        let magic = u16::from_le_bytes([record[0], record[1]]);
        let version = u16::from_le_bytes([record[2], record[3]]);
        let header_crc = read_u32(record, HEADER_LEN);

        if magic != SETTINGS_MAGIC || header_crc != CHECKSUM.checksum(&record[..HEADER_LEN]) {
            return Self::with_defaults();
        }

        let body = &record[BODY_START..BODY_START + BODY_LEN];

        if version > FORMAT_VERSION {
            // Newer layout: take the fields we recognise and never write back.
            // An input code unknown to this build has no selector, so only
            // that field falls back to its default.
            let settings = Settings::decode(body).unwrap_or(Settings {
                default_input: Settings::defaults().default_input,
                pedestal_preference: body[1] != 0,
                smoothing: body[2] != 0,
                disable_free_run: body[3] != 0,
            });
            return Self {
                settings,
                format_version: version,
                dirty: false,
                downgrading: true,
                outcome: LoadOutcome::Downgrading { found: version },
            };
        }

        let body_crc = read_u32(record, BODY_START + BODY_LEN);
        let decoded = if body_crc == CHECKSUM.checksum(body) {
            Settings::decode(body)
        } else {
            None
        };

        match decoded {
            Some(settings) if version == FORMAT_VERSION => Self {
                settings,
                format_version: version,
                dirty: false,
                downgrading: false,
                outcome: LoadOutcome::Valid,
            },
            Some(settings) => Self {
                settings,
                format_version: FORMAT_VERSION,
                dirty: true,
                downgrading: false,
                outcome: LoadOutcome::Upgraded { from: version },
            },
            None => Self {
                settings: Settings::defaults(),
                format_version: FORMAT_VERSION,
                dirty: true,
                downgrading: false,
                outcome: LoadOutcome::BodyCorrupt,
            },
        }
    }

    /// Reads the record from `storage`; a read failure counts as corruption.
    pub fn load_from<S: SettingsStorage>(storage: &mut S) -> Self {
        let mut record = [0u8; RECORD_LEN];
        match storage.read(&mut record) {
            Ok(()) => Self::load(&record),
            Err(_) => Self::with_defaults(),
        }
    }

    /// Serializes the record with fresh checksums and clears the dirty flag.
    pub fn write(&mut self, record: &mut SettingsRecord) {
        record[0..2].copy_from_slice(&SETTINGS_MAGIC.to_le_bytes());
        record[2..4].copy_from_slice(&self.format_version.to_le_bytes());
        let header_crc = CHECKSUM.checksum(&record[..HEADER_LEN]);
        record[HEADER_LEN..BODY_START].copy_from_slice(&header_crc.to_le_bytes());

        record[BODY_START..BODY_START + BODY_LEN].copy_from_slice(&self.settings.encode());
        let body_crc = CHECKSUM.checksum(&record[BODY_START..BODY_START + BODY_LEN]);
        record[BODY_START + BODY_LEN..].copy_from_slice(&body_crc.to_le_bytes());

        self.dirty = false;
    }

    /// Writes the record to `storage` when it needs persisting.
    ///
    /// Returns `Ok(false)` when nothing had to be written.
    pub fn persist_to<S: SettingsStorage>(
        &mut self,
        storage: &mut S,
    ) -> Result<bool, SettingsError<S::Error>> {
        if self.downgrading {
            return Err(SettingsError::Downgrading);
        }
        if !self.dirty {
            return Ok(false);
        }

        let mut record = [0u8; RECORD_LEN];
        self.write(&mut record);
        if let Err(err) = storage.write(&record) {
            self.dirty = true;
            return Err(SettingsError::Storage(err));
        }
        Ok(true)
    }

    /// Applies an explicit user change.
    ///
    /// The store becomes dirty only when the settings actually differ.
    pub fn update(&mut self, settings: Settings) {
        if settings != self.settings {
            self.settings = settings;
            self.dirty = true;
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn is_downgrading(&self) -> bool {
        self.downgrading
    }

    /// `true` when the boot path should write the record back.
    #[must_use]
    pub const fn should_persist(&self) -> bool {
        self.dirty && !self.downgrading
    }

    #[must_use]
    pub const fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    #[must_use]
    pub const fn format_version(&self) -> u16 {
        self.format_version
    }
}

fn read_u32(record: &SettingsRecord, offset: usize) -> u32 {
    u32::from_le_bytes([
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
    ])
}
