//! Host stand-in for the board's fail-stop path.

use std::io::Write;
use std::process;
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use transcoder_core::bus::BusFault;
use transcoder_core::fault::FaultPlatform;

/// Exit status reported once the emulated watchdog fires.
pub const WATCHDOG_EXIT_CODE: i32 = 3;

/// Prints each fault-path step and ends the process after a few blink frames.
pub struct HostBoard<W: Write> {
    out: W,
    frames_left: usize,
}

impl<W: Write> HostBoard<W> {
    pub fn new(out: W, frames: usize) -> Self {
        Self {
            out,
            frames_left: frames,
        }
    }

    fn emit(&mut self, line: &str) {
        // Nothing useful can be done if stdout is gone while halting.
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}

impl<W: Write> FaultPlatform for HostBoard<W> {
    fn record_fault(&mut self, fault: BusFault) {
        self.emit(&format!("FAULT {fault}"));
    }

    fn arm_watchdog(&mut self, timeout: Duration) {
        self.emit(&format!("watchdog armed, reset in {}ms", timeout.as_millis()));
    }

    fn hold_chips_in_reset(&mut self) {
        self.emit("chips held in reset");
    }

    fn set_indicators(&mut self, on: bool) {
        if self.frames_left == 0 {
            self.emit("board reset");
            process::exit(WATCHDOG_EXIT_CODE);
        }
        self.frames_left -= 1;
        self.emit(if on { "indicators: all on" } else { "indicators: all off" });
    }
}

/// Real-time delay so the blink cadence matches the board.
pub struct HostDelay;

impl DelayNs for HostDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
