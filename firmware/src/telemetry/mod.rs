//! Mirrors control-core telemetry to defmt (target) or stdout (host).
//!
//! The controller keeps its own ring of [`TelemetryRecord`]s; the firmware
//! only remembers the next event it has not printed yet and forwards anything
//! newer after each loop iteration.

use transcoder_core::bus::BusFault;
use transcoder_core::settings::{LoadOutcome, Settings};
use transcoder_core::telemetry::{EventId, TelemetryRecord, TelemetryRecorder};

/// Cursor into the controller's telemetry ring.
#[derive(Debug, Default)]
pub struct TelemetryDrain {
    next: EventId,
}

impl TelemetryDrain {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Logs every record newer than the last drain. Returns how many were
    /// emitted.
    pub fn drain<const CAPACITY: usize>(
        &mut self,
        recorder: &TelemetryRecorder<CAPACITY>,
    ) -> usize {
        let mut emitted = 0;
        for record in recorder.since(self.next) {
            if record.id != self.next {
                emit_overrun(record.id.wrapping_sub(self.next));
            }
            emit_record(record);
            self.next = record.id.wrapping_add(1);
            emitted += 1;
        }
        emitted
    }

    #[must_use]
    pub const fn next(&self) -> EventId {
        self.next
    }
}

#[cfg(target_os = "none")]
fn emit_record(record: &TelemetryRecord) {
    defmt::info!(
        "telemetry:{} {}",
        record.event.label(),
        defmt::Display2Format(record)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_record(record: &TelemetryRecord) {
    println!("telemetry:{} {}", record.event.label(), record);
}

#[cfg(target_os = "none")]
fn emit_overrun(skipped: EventId) {
    defmt::warn!("telemetry: {} records overwritten before drain", skipped);
}

#[cfg(not(target_os = "none"))]
fn emit_overrun(skipped: EventId) {
    println!("telemetry: {skipped} records overwritten before drain");
}

#[cfg(target_os = "none")]
pub fn log_settings_loaded(outcome: LoadOutcome, settings: &Settings) {
    defmt::info!(
        "settings: {} input={} pedestal={} smoothing={} disable_free_run={}",
        outcome.label(),
        settings.default_input.physical().label(),
        settings.pedestal_preference,
        settings.smoothing,
        settings.disable_free_run
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_settings_loaded(outcome: LoadOutcome, settings: &Settings) {
    println!(
        "settings: {} input={} pedestal={} smoothing={} disable_free_run={}",
        outcome.label(),
        settings.default_input.physical().label(),
        settings.pedestal_preference,
        settings.smoothing,
        settings.disable_free_run
    );
}

#[cfg(target_os = "none")]
pub fn log_settings_not_persisted() {
    defmt::warn!("settings: record could not be written back");
}

#[cfg(not(target_os = "none"))]
pub fn log_settings_not_persisted() {
    println!("settings: record could not be written back");
}

#[cfg(target_os = "none")]
pub fn log_bus_fault(fault: BusFault) {
    defmt::warn!(
        "fault: i2c device=0x{:02x} size={}",
        fault.address,
        fault.size
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_bus_fault(fault: BusFault) {
    println!("fault: {fault}");
}
