//! Terminal fail-stop path entered on a fatal bus fault.

use core::fmt;
use core::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::bus::BusFault;

/// Self-reset delay armed before the blink loop.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(4);

/// Indicator toggle period while halted.
pub const DEFAULT_FAULT_BLINK: Duration = Duration::from_millis(500);

/// How the main loop reacts to a [`BusFault`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FaultPolicy {
    /// Enter the blink loop and never return.
    #[default]
    Halt,
    /// Log the fault and keep iterating.
    Continue,
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultPolicy::Halt => "halt",
            FaultPolicy::Continue => "continue",
        })
    }
}

/// Timing of the fault path.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FaultConfig {
    /// `Some` arms the hardware watchdog so the board resets itself.
    pub watchdog: Option<Duration>,
    pub blink_period: Duration,
}

impl FaultConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            watchdog: Some(DEFAULT_WATCHDOG_TIMEOUT),
            blink_period: DEFAULT_FAULT_BLINK,
        }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Board services the fault path needs.
pub trait FaultPlatform {
    /// Reports the fault before anything else happens. Defaults to a no-op.
    fn record_fault(&mut self, fault: BusFault) {
        let _ = fault;
    }

    /// Starts the self-reset timer. It is never fed afterwards.
    fn arm_watchdog(&mut self, timeout: Duration);

    /// Drives both chips into reset and powerdown.
    fn hold_chips_in_reset(&mut self);

    /// Sets every indicator to `on`.
    fn set_indicators(&mut self, on: bool);
}

/// Lockstep indicator pattern: all on, all off, repeated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FaultBlink {
    level: bool,
}

impl FaultBlink {
    #[must_use]
    pub const fn new() -> Self {
        Self { level: true }
    }

    /// Returns the level for the next frame and advances the pattern.
    pub fn next_frame(&mut self) -> bool {
        let level = self.level;
        self.level = !self.level;
        level
    }
}

impl Default for FaultBlink {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail-stop: arm the watchdog, park the chips, blink forever.
pub fn halt<P, D>(fault: BusFault, platform: &mut P, delay: &mut D, config: &FaultConfig) -> !
where
    P: FaultPlatform,
    D: DelayNs,
{
    platform.record_fault(fault);
    if let Some(timeout) = config.watchdog {
        platform.arm_watchdog(timeout);
    }
    platform.hold_chips_in_reset();

    let period_ms = u32::try_from(config.blink_period.as_millis()).unwrap_or(u32::MAX);
    let mut blink = FaultBlink::new();
    loop {
        platform.set_indicators(blink.next_frame());
        delay.delay_ms(period_ms);
    }
}
