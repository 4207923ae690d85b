use core::time::Duration;

use embassy_stm32::Peri;
use embassy_stm32::gpio::Output;
use embassy_stm32::peripherals::IWDG;
use embassy_stm32::wdg::IndependentWatchdog;
use transcoder_core::bus::BusFault;
use transcoder_core::chips::{ChipPower, ResetLines};
use transcoder_core::controller::Indicators;
use transcoder_core::fault::FaultPlatform;

use crate::telemetry;

/// Front-panel LEDs, active high.
pub struct Leds {
    cvbs: Output<'static>,
    svideo: Output<'static>,
    option: Output<'static>,
}

impl Leds {
    pub fn new(cvbs: Output<'static>, svideo: Output<'static>, option: Output<'static>) -> Self {
        Self {
            cvbs,
            svideo,
            option,
        }
    }
}

/// Board resources used outside the chip bus.
pub struct Board {
    leds: Leds,
    reset: ResetLines<Output<'static>>,
    watchdog: Option<Peri<'static, IWDG>>,
}

impl Board {
    pub fn new(leds: Leds, reset: ResetLines<Output<'static>>, watchdog: Peri<'static, IWDG>) -> Self {
        Self {
            leds,
            reset,
            watchdog: Some(watchdog),
        }
    }

    pub fn show(&mut self, indicators: Indicators) {
        self.leds.cvbs.set_level(indicators.cvbs.into());
        self.leds.svideo.set_level(indicators.svideo.into());
        self.leds.option.set_level(indicators.option.into());
    }
}

impl FaultPlatform for Board {
    fn record_fault(&mut self, fault: BusFault) {
        telemetry::log_bus_fault(fault);
    }

    fn arm_watchdog(&mut self, timeout: Duration) {
        // The IWDG cannot be stopped once started, so it is only armed here.
        if let Some(peripheral) = self.watchdog.take() {
            let timeout_us = u32::try_from(timeout.as_micros()).unwrap_or(u32::MAX);
            let mut watchdog = IndependentWatchdog::new(peripheral, timeout_us);
            watchdog.unleash();
        }
    }

    fn hold_chips_in_reset(&mut self) {
        let Ok(()) = self.reset.hold_in_reset();
    }

    fn set_indicators(&mut self, on: bool) {
        self.show(Indicators::all(on));
    }
}
