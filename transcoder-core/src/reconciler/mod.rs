//! Hybrid interrupt/poll tracking of the decoder status registers.
//!
//! The reconciler is pure state: the controller reads the registers through
//! the chip driver, hands the snapshot in, and acts on the returned
//! [`Observation`]. Chip status is never debounced; every difference counts.

use crate::video::{FieldRate, InterlaceState, LockState, VideoStandard};

const STATUS1_IN_LOCK: u8 = 0x01;
const STATUS1_LOST_LOCK: u8 = 0x02;
const STATUS1_FSC_LOCK: u8 = 0x04;
const STATUS1_COLOR_KILL: u8 = 0x80;
const STATUS3_HLOCK: u8 = 0x01;
const STATUS3_50HZ: u8 = 0x04;
const STATUS3_FREERUN: u8 = 0x10;
const STATUS3_INTERLACED: u8 = 0x40;

/// Raw values of the three decoder status registers.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DecoderStatusSnapshot {
    pub status1: u8,
    pub status2: u8,
    pub status3: u8,
}

impl DecoderStatusSnapshot {
    #[must_use]
    pub const fn new(status1: u8, status2: u8, status3: u8) -> Self {
        Self {
            status1,
            status2,
            status3,
        }
    }

    #[must_use]
    pub const fn in_lock(&self) -> bool {
        status1_in_lock(self.status1)
    }

    #[must_use]
    pub const fn lost_lock(&self) -> bool {
        self.status1 & STATUS1_LOST_LOCK != 0
    }

    #[must_use]
    pub const fn fsc_lock(&self) -> bool {
        self.status1 & STATUS1_FSC_LOCK != 0
    }

    #[must_use]
    pub const fn standard(&self) -> VideoStandard {
        VideoStandard::from_bits(self.status1 >> 4)
    }

    #[must_use]
    pub const fn color_kill(&self) -> bool {
        status1_color_kill(self.status1)
    }

    #[must_use]
    pub const fn horizontal_lock(&self) -> bool {
        self.status3 & STATUS3_HLOCK != 0
    }

    #[must_use]
    pub const fn field_rate(&self) -> FieldRate {
        if self.status3 & STATUS3_50HZ != 0 {
            FieldRate::Hz50
        } else {
            FieldRate::Hz60
        }
    }

    #[must_use]
    pub const fn freerun(&self) -> bool {
        self.status3 & STATUS3_FREERUN != 0
    }

    #[must_use]
    pub const fn interlaced(&self) -> bool {
        self.status3 & STATUS3_INTERLACED != 0
    }
}

/// Signal-activity bit of status register 1.
#[must_use]
pub const fn status1_in_lock(status1: u8) -> bool {
    status1 & STATUS1_IN_LOCK != 0
}

/// Color-kill bit of status register 1.
#[must_use]
pub const fn status1_color_kill(status1: u8) -> bool {
    status1 & STATUS1_COLOR_KILL != 0
}

/// Changes detected while processing one snapshot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Observation {
    pub reconfigure: bool,
    pub standard_changed: Option<VideoStandard>,
    pub lock_changed: Option<(LockState, LockState)>,
    pub interlace_changed: Option<(InterlaceState, InterlaceState)>,
}

/// Lock, interlace and standard classification for the active input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusReconciler {
    previous: Option<DecoderStatusSnapshot>,
    standard: Option<VideoStandard>,
    lock: LockState,
    interlace: InterlaceState,
    check_once_more: bool,
    chroma_enabled: bool,
}

impl StatusReconciler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous: None,
            standard: None,
            lock: LockState::Unknown,
            interlace: InterlaceState::Unknown,
            // The first iteration after boot always polls.
            check_once_more: true,
            chroma_enabled: true,
        }
    }

    /// Forgets everything learned about the previous input.
    ///
    /// Chroma tracking is kept; it mirrors encoder state that survives an
    /// input switch.
    pub fn reset(&mut self) {
        let chroma_enabled = self.chroma_enabled;
        *self = Self::new();
        self.chroma_enabled = chroma_enabled;
    }

    /// `true` when the status registers must be read this iteration.
    #[must_use]
    pub const fn wants_poll(&self, interrupt_asserted: bool) -> bool {
        interrupt_asserted
            || self.check_once_more
            || matches!(self.lock, LockState::Unknown)
            || matches!(self.interlace, InterlaceState::Unknown)
    }

    /// Folds a freshly read snapshot into the tracked state.
    pub fn observe(&mut self, snapshot: DecoderStatusSnapshot) -> Observation {
        let mut observation = Observation::default();

        let status1_changed = self
            .previous
            .is_none_or(|previous| previous.status1 != snapshot.status1);
        if status1_changed {
            let standard = snapshot.standard();
            if self.standard != Some(standard) {
                self.standard = Some(standard);
                observation.standard_changed = Some(standard);
                observation.reconfigure = true;
            }
        }

        let freerun = snapshot.freerun();
        let running_free = matches!(self.lock, LockState::RunningFree);
        if freerun != running_free || matches!(self.lock, LockState::Unknown) {
            let next = if freerun {
                LockState::RunningFree
            } else if snapshot.in_lock() {
                LockState::Locked
            } else {
                LockState::Unknown
            };
            if next != self.lock {
                observation.lock_changed = Some((self.lock, next));
                observation.reconfigure = true;
                self.lock = next;
            }
        }

        let interlace = if snapshot.interlaced() {
            InterlaceState::Interlaced
        } else {
            InterlaceState::Progressive
        };
        if interlace != self.interlace {
            observation.interlace_changed = Some((self.interlace, interlace));
            observation.reconfigure = true;
            self.interlace = interlace;
        }

        self.previous = Some(snapshot);
        observation
    }

    /// Schedules exactly one follow-up poll after an interrupt-triggered pass.
    pub fn finish_poll(&mut self, interrupt_asserted: bool) {
        self.check_once_more = interrupt_asserted;
    }

    /// Tracks the color-kill bit; returns the new chroma state on a transition.
    pub fn observe_color_kill(&mut self, status1: u8) -> Option<bool> {
        let kill = status1_color_kill(status1);
        if kill && self.chroma_enabled {
            self.chroma_enabled = false;
            Some(false)
        } else if !kill && !self.chroma_enabled {
            self.chroma_enabled = true;
            Some(true)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn lock(&self) -> LockState {
        self.lock
    }

    #[must_use]
    pub const fn interlace(&self) -> InterlaceState {
        self.interlace
    }

    #[must_use]
    pub const fn standard(&self) -> Option<VideoStandard> {
        self.standard
    }

    #[must_use]
    pub const fn previous(&self) -> Option<DecoderStatusSnapshot> {
        self.previous
    }

    #[must_use]
    pub const fn chroma_enabled(&self) -> bool {
        self.chroma_enabled
    }

    #[must_use]
    pub const fn check_once_more(&self) -> bool {
        self.check_once_more
    }
}

impl Default for StatusReconciler {
    fn default() -> Self {
        Self::new()
    }
}
