//! Intent-level interface to the decoder/encoder pair.
//!
//! The controller never encodes register values. It describes the desired
//! configuration with [`DecoderSetup`] and [`EncoderConfig`] and leaves the
//! per-register recipes to a [`ChipDriver`] implementation.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::bus::BusFault;
use crate::policy::OutputDecision;
use crate::reconciler::DecoderStatusSnapshot;
use crate::video::{
    DisplayMode, FieldRate, InterlaceState, LockState, NoiseReduction, OutputFormat,
    PhysicalInput,
};

/// Settle time after each reset line transition during power-up.
pub const RESET_SETTLE_MS: u32 = 10;

/// Full decoder configuration for one physical input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DecoderSetup {
    pub input: PhysicalInput,
    pub pedestal: bool,
    pub smoothing: bool,
    pub display: DisplayMode,
    pub noise_reduction: NoiseReduction,
    pub output: OutputDecision,
}

/// Full encoder configuration derived from the reconciled decoder state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EncoderConfig {
    pub lock: LockState,
    pub interlace: InterlaceState,
    pub input: PhysicalInput,
    pub display: DisplayMode,
    pub output_format: OutputFormat,
    pub noise_reduction: NoiseReduction,
    pub field_rate: FieldRate,
    pub output: OutputDecision,
    pub chroma_enabled: bool,
}

/// Chip recipes driven by the controller.
///
/// Every method maps onto a fixed sequence of bus transactions; a
/// [`BusFault`] from any of them is fatal.
pub trait ChipDriver {
    /// Reads decoder status register 1 (activity and color kill).
    fn read_status1(&mut self) -> Result<u8, BusFault>;

    /// Reads all three decoder status registers.
    fn read_status(&mut self) -> Result<DecoderStatusSnapshot, BusFault>;

    /// Resets and fully configures the decoder for `setup.input`.
    fn setup_decoder(&mut self, setup: &DecoderSetup) -> Result<(), BusFault>;

    /// Applies only the decoder side of an output decision.
    fn apply_decoder_output(&mut self, decision: OutputDecision) -> Result<(), BusFault>;

    /// Resets and fully configures the encoder.
    fn setup_encoder(&mut self, config: &EncoderConfig) -> Result<(), BusFault>;

    /// Enables or suppresses encoder chroma output.
    fn set_chroma(&mut self, enabled: bool) -> Result<(), BusFault>;

    /// Clears all three decoder interrupt groups.
    fn clear_interrupts(&mut self) -> Result<(), BusFault>;
}

impl<C: ChipDriver + ?Sized> ChipDriver for &mut C {
    fn read_status1(&mut self) -> Result<u8, BusFault> {
        (**self).read_status1()
    }

    fn read_status(&mut self) -> Result<DecoderStatusSnapshot, BusFault> {
        (**self).read_status()
    }

    fn setup_decoder(&mut self, setup: &DecoderSetup) -> Result<(), BusFault> {
        (**self).setup_decoder(setup)
    }

    fn apply_decoder_output(&mut self, decision: OutputDecision) -> Result<(), BusFault> {
        (**self).apply_decoder_output(decision)
    }

    fn setup_encoder(&mut self, config: &EncoderConfig) -> Result<(), BusFault> {
        (**self).setup_encoder(config)
    }

    fn set_chroma(&mut self, enabled: bool) -> Result<(), BusFault> {
        (**self).set_chroma(enabled)
    }

    fn clear_interrupts(&mut self) -> Result<(), BusFault> {
        (**self).clear_interrupts()
    }
}

/// Reset and powerdown lines of the two chips.
pub trait ChipPower {
    type Error;

    /// Brings both chips out of reset in the order the decoder expects.
    fn power_up<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error>;

    /// Drives every reset/powerdown line active.
    fn hold_in_reset(&mut self) -> Result<(), Self::Error>;
}

/// Active-low reset wiring shared by both chips.
pub struct ResetLines<P> {
    decoder_reset: P,
    decoder_powerdown: P,
    encoder_reset: P,
}

impl<P: OutputPin> ResetLines<P> {
    #[must_use]
    pub const fn new(decoder_reset: P, decoder_powerdown: P, encoder_reset: P) -> Self {
        Self {
            decoder_reset,
            decoder_powerdown,
            encoder_reset,
        }
    }
}

impl<P: OutputPin> ChipPower for ResetLines<P> {
    type Error = P::Error;

    fn power_up<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        self.decoder_powerdown.set_high()?;
        self.encoder_reset.set_high()?;
        delay.delay_ms(RESET_SETTLE_MS);

        self.decoder_reset.set_high()?;
        self.encoder_reset.set_low()?;
        delay.delay_ms(RESET_SETTLE_MS);
        self.encoder_reset.set_high()
    }

    fn hold_in_reset(&mut self) -> Result<(), Self::Error> {
        self.decoder_reset.set_low()?;
        self.decoder_powerdown.set_low()?;
        self.encoder_reset.set_low()
    }
}
