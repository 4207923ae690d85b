//! Behavioural model of the decoder/encoder pair.
//!
//! Status registers are synthesised from the source attached to whichever
//! input the last decoder setup selected, using the same bit layout the real
//! decoder reports.

use transcoder_core::bus::BusFault;
use transcoder_core::chips::{ChipDriver, DecoderSetup, EncoderConfig};
use transcoder_core::policy::OutputDecision;
use transcoder_core::reconciler::DecoderStatusSnapshot;
use transcoder_core::video::{PhysicalInput, VideoStandard};

use crate::commands::SignalLevel;

const DECODER_ADDRESS: u8 = 0x20;
const ENCODER_ADDRESS: u8 = 0x2a;

/// Observable state of the simulated encoder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncoderState {
    pub config: Option<EncoderConfig>,
    pub chroma_enabled: bool,
    pub sleeping: bool,
}

pub struct SimChips {
    sources: [SignalLevel; 3],
    pub interlaced: bool,
    pub standard: u8,
    pub color_kill: bool,
    interrupt: bool,
    fail_next: bool,
    decoder: Option<DecoderSetup>,
    decoder_output: OutputDecision,
    encoder: EncoderState,
    transactions: u64,
}

impl SimChips {
    pub fn new() -> Self {
        Self {
            sources: [SignalLevel::None; 3],
            interlaced: true,
            standard: 0,
            color_kill: false,
            interrupt: false,
            fail_next: false,
            decoder: None,
            decoder_output: OutputDecision::DISABLED,
            encoder: EncoderState {
                config: None,
                chroma_enabled: true,
                sleeping: false,
            },
            transactions: 0,
        }
    }

    /// Input the decoder mux currently points at.
    pub fn selected_input(&self) -> PhysicalInput {
        self.decoder.map_or(PhysicalInput::Cvbs, |setup| setup.input)
    }

    pub fn source(&self, input: PhysicalInput) -> SignalLevel {
        self.sources[index(input)]
    }

    /// Attaches a source and raises the interrupt if the active input changed.
    pub fn set_source(&mut self, input: PhysicalInput, level: SignalLevel) {
        let slot = &mut self.sources[index(input)];
        if *slot != level {
            *slot = level;
            if input == self.selected_input() {
                self.interrupt = true;
            }
        }
    }

    /// Applies a signal property change; the decoder interrupts on any
    /// status change of the active source.
    pub fn signal_changed(&mut self) {
        if self.source(self.selected_input()) != SignalLevel::None {
            self.interrupt = true;
        }
    }

    pub fn raise_interrupt(&mut self) {
        self.interrupt = true;
    }

    pub fn interrupt_asserted(&self) -> bool {
        self.interrupt
    }

    pub fn fail_next_transaction(&mut self) {
        self.fail_next = true;
    }

    pub fn decoder_output(&self) -> OutputDecision {
        self.decoder_output
    }

    pub fn encoder(&self) -> &EncoderState {
        &self.encoder
    }

    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    pub fn status(&self) -> DecoderStatusSnapshot {
        let interlaced = if self.interlaced { 0x40 } else { 0x00 };
        let standard_bits = (self.standard & 0x07) << 4;
        let color_kill = if self.color_kill { 0x80 } else { 0x00 };
        let fifty_hz = if is_fifty_hz(VideoStandard::from_bits(self.standard)) {
            0x04
        } else {
            0x00
        };

        match self.source(self.selected_input()) {
            SignalLevel::Locked => DecoderStatusSnapshot::new(
                0x01 | 0x04 | standard_bits | color_kill,
                0x00,
                0x01 | fifty_hz | interlaced,
            ),
            SignalLevel::FreeRun => {
                DecoderStatusSnapshot::new(standard_bits, 0x00, 0x10 | interlaced)
            }
            SignalLevel::None => DecoderStatusSnapshot::new(0x00, 0x00, 0x00),
        }
    }

    fn transaction(&mut self, address: u8, size: usize) -> Result<(), BusFault> {
        self.transactions += 1;
        if std::mem::take(&mut self.fail_next) {
            return Err(BusFault::new(address, size));
        }
        Ok(())
    }
}

impl Default for SimChips {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipDriver for SimChips {
    fn read_status1(&mut self) -> Result<u8, BusFault> {
        self.transaction(DECODER_ADDRESS, 2)?;
        Ok(self.status().status1)
    }

    fn read_status(&mut self) -> Result<DecoderStatusSnapshot, BusFault> {
        self.transaction(DECODER_ADDRESS, 2)?;
        Ok(self.status())
    }

    fn setup_decoder(&mut self, setup: &DecoderSetup) -> Result<(), BusFault> {
        self.transaction(DECODER_ADDRESS, 2)?;
        if self.decoder.map(|previous| previous.input) != Some(setup.input) {
            self.interrupt = false;
        }
        self.decoder = Some(*setup);
        self.decoder_output = setup.output;
        Ok(())
    }

    fn apply_decoder_output(&mut self, decision: OutputDecision) -> Result<(), BusFault> {
        self.transaction(DECODER_ADDRESS, 2)?;
        self.decoder_output = decision;
        Ok(())
    }

    fn setup_encoder(&mut self, config: &EncoderConfig) -> Result<(), BusFault> {
        self.transaction(ENCODER_ADDRESS, 2)?;
        self.encoder.sleeping = config.output.request_sleep;
        self.encoder.chroma_enabled = config.chroma_enabled;
        self.encoder.config = Some(*config);
        Ok(())
    }

    fn set_chroma(&mut self, enabled: bool) -> Result<(), BusFault> {
        self.transaction(ENCODER_ADDRESS, 2)?;
        self.encoder.chroma_enabled = enabled;
        Ok(())
    }

    fn clear_interrupts(&mut self) -> Result<(), BusFault> {
        self.transaction(DECODER_ADDRESS, 2)?;
        self.interrupt = false;
        Ok(())
    }
}

const fn index(input: PhysicalInput) -> usize {
    match input {
        PhysicalInput::Cvbs => 0,
        PhysicalInput::SVideo => 1,
        PhysicalInput::Component => 2,
    }
}

const fn is_fifty_hz(standard: VideoStandard) -> bool {
    matches!(
        standard,
        VideoStandard::PalBghid | VideoStandard::Secam | VideoStandard::PalCombinationN
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcoder_core::reconciler::status1_in_lock;
    use transcoder_core::video::FieldRate;

    #[test]
    fn locked_source_reports_lock_and_standard() {
        let mut chips = SimChips::new();
        chips.set_source(PhysicalInput::Cvbs, SignalLevel::Locked);
        chips.standard = 4;

        let snapshot = chips.status();
        assert!(snapshot.in_lock());
        assert!(!snapshot.freerun());
        assert_eq!(snapshot.standard(), VideoStandard::PalBghid);
        assert_eq!(snapshot.field_rate(), FieldRate::Hz50);
        assert!(snapshot.interlaced());
    }

    #[test]
    fn freerun_source_has_no_activity() {
        let mut chips = SimChips::new();
        chips.set_source(PhysicalInput::Cvbs, SignalLevel::FreeRun);

        let snapshot = chips.status();
        assert!(!status1_in_lock(snapshot.status1));
        assert!(snapshot.freerun());
    }

    #[test]
    fn source_change_on_active_input_raises_interrupt() {
        let mut chips = SimChips::new();
        chips.set_source(PhysicalInput::SVideo, SignalLevel::Locked);
        assert!(!chips.interrupt_asserted());

        chips.set_source(PhysicalInput::Cvbs, SignalLevel::Locked);
        assert!(chips.interrupt_asserted());
        chips.clear_interrupts().expect("clear");
        assert!(!chips.interrupt_asserted());
    }

    #[test]
    fn injected_failure_hits_exactly_one_transaction() {
        let mut chips = SimChips::new();
        chips.fail_next_transaction();

        assert_eq!(chips.read_status1(), Err(BusFault::new(DECODER_ADDRESS, 2)));
        assert_eq!(chips.read_status1(), Ok(0x00));
        assert_eq!(chips.transactions(), 2);
    }
}
