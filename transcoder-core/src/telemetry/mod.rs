//! Telemetry event catalog and recorder shared by firmware and host targets.
//!
//! The controller records every state transition it acts on into a fixed-size
//! ring. Firmware drains new records into defmt each iteration; the emulator
//! prints them after every command. Events carry compact numeric codes so a
//! diagnostics channel can ship them without the payload formatting.

use core::fmt;

use heapless::HistoryBuf;

use crate::bus::BusFault;
use crate::video::{
    ColorSpace, DisplayMode, InterlaceState, LockState, NoiseReduction, OutputFormat,
    PhysicalInput, VideoStandard,
};

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic identifier assigned to every record.
pub type EventId = u32;

/// Main-loop iteration counter used as the telemetry timestamp.
pub type LoopTick = u32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    DecoderConfigured,
    EncoderConfigured,
    InputAdvanced,
    LockChanged,
    InterlaceChanged,
    StandardChanged,
    ChromaChanged,
    DisplayModeChanged,
    NoiseReductionChanged,
    OutputFormatChanged,
    InterruptsCleared,
    BusFault,
}

impl TelemetryEventKind {
    const ALL: [TelemetryEventKind; 12] = [
        TelemetryEventKind::DecoderConfigured,
        TelemetryEventKind::EncoderConfigured,
        TelemetryEventKind::InputAdvanced,
        TelemetryEventKind::LockChanged,
        TelemetryEventKind::InterlaceChanged,
        TelemetryEventKind::StandardChanged,
        TelemetryEventKind::ChromaChanged,
        TelemetryEventKind::DisplayModeChanged,
        TelemetryEventKind::NoiseReductionChanged,
        TelemetryEventKind::OutputFormatChanged,
        TelemetryEventKind::InterruptsCleared,
        TelemetryEventKind::BusFault,
    ];

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::DecoderConfigured => 0x0001,
            TelemetryEventKind::EncoderConfigured => 0x0002,
            TelemetryEventKind::InputAdvanced => 0x0003,
            TelemetryEventKind::LockChanged => 0x0010,
            TelemetryEventKind::InterlaceChanged => 0x0011,
            TelemetryEventKind::StandardChanged => 0x0012,
            TelemetryEventKind::ChromaChanged => 0x0013,
            TelemetryEventKind::DisplayModeChanged => 0x0020,
            TelemetryEventKind::NoiseReductionChanged => 0x0021,
            TelemetryEventKind::OutputFormatChanged => 0x0022,
            TelemetryEventKind::InterruptsCleared => 0x0030,
            TelemetryEventKind::BusFault => 0x00f0,
        }
    }

    #[must_use]
    pub fn from_raw(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.to_raw() == code)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TelemetryEventKind::DecoderConfigured => "decoder-configured",
            TelemetryEventKind::EncoderConfigured => "encoder-configured",
            TelemetryEventKind::InputAdvanced => "input-advanced",
            TelemetryEventKind::LockChanged => "lock-changed",
            TelemetryEventKind::InterlaceChanged => "interlace-changed",
            TelemetryEventKind::StandardChanged => "standard-changed",
            TelemetryEventKind::ChromaChanged => "chroma-changed",
            TelemetryEventKind::DisplayModeChanged => "display-mode-changed",
            TelemetryEventKind::NoiseReductionChanged => "noise-reduction-changed",
            TelemetryEventKind::OutputFormatChanged => "output-format-changed",
            TelemetryEventKind::InterruptsCleared => "interrupts-cleared",
            TelemetryEventKind::BusFault => "bus-fault",
        }
    }
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryPayload {
    None,
    Input(PhysicalInput),
    Lock {
        from: LockState,
        to: LockState,
    },
    Interlace {
        from: InterlaceState,
        to: InterlaceState,
    },
    Standard(VideoStandard),
    Chroma(bool),
    Display(DisplayMode),
    NoiseReduction(NoiseReduction),
    OutputFormat(OutputFormat),
    Encoder {
        lock: LockState,
        interlace: InterlaceState,
        output_format: OutputFormat,
    },
    Fault(BusFault),
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Input(input) => write!(f, "{input}"),
            TelemetryPayload::Lock { from, to } => write!(f, "{from} -> {to}"),
            TelemetryPayload::Interlace { from, to } => write!(f, "{from} -> {to}"),
            TelemetryPayload::Standard(standard) => write!(f, "{standard}"),
            TelemetryPayload::Chroma(enabled) => {
                f.write_str(if *enabled { "enabled" } else { "killed" })
            }
            TelemetryPayload::Display(mode) => write!(
                f,
                "range {} {}",
                mode.range.index(),
                match mode.color {
                    ColorSpace::Rgb => "rgb",
                    ColorSpace::YPbPr => "ypbpr",
                }
            ),
            TelemetryPayload::NoiseReduction(mode) => f.write_str(mode.label()),
            TelemetryPayload::OutputFormat(format) => f.write_str(format.label()),
            TelemetryPayload::Encoder {
                lock,
                interlace,
                output_format,
            } => write!(f, "{lock} {interlace} {}", output_format.label()),
            TelemetryPayload::Fault(fault) => write!(f, "{fault}"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub tick: LoopTick,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>6}] {}", self.tick, self.event)?;
        if self.details != TelemetryPayload::None {
            write!(f, " {}", self.details)?;
        }
        Ok(())
    }
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Records an event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        details: TelemetryPayload,
        tick: LoopTick,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            tick,
            event,
            details,
        });

        id
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.ring.oldest_ordered()
    }

    /// Records with an id at or after `from`, oldest first.
    ///
    /// Records that already fell out of the ring are silently skipped.
    pub fn since(&self, from: EventId) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.ring
            .oldest_ordered()
            .filter(move |record| record.id.wrapping_sub(from) < EventId::MAX / 2)
    }

    /// The id the next record will receive.
    #[must_use]
    pub const fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
