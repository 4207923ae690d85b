//! Build-time controller options selected by cargo features.

use transcoder_core::controller::ControllerConfig;

/// Pin assignments are fixed by the board; only behaviour toggles live here.
#[must_use]
pub const fn controller_config() -> ControllerConfig {
    let mut config = ControllerConfig::new();
    config.freerun_test_pattern = cfg!(feature = "freerun-test-pattern");
    if !cfg!(feature = "autoreset") {
        config.fault.watchdog = None;
    }
    config
}

/// Options baked into this image.
pub const CONTROLLER_CONFIG: ControllerConfig = controller_config();

/// Converts a core duration to timer ticks, saturating on overflow.
#[must_use]
pub fn embassy_duration(duration: core::time::Duration) -> embassy_time::Duration {
    embassy_time::Duration::from_micros(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
}
