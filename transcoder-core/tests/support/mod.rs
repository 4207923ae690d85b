#![allow(dead_code)]

use heapless::Vec as HeaplessVec;
use transcoder_core::bus::BusFault;
use transcoder_core::chips::{ChipDriver, DecoderSetup, EncoderConfig};
use transcoder_core::controller::{Controller, ControllerConfig};
use transcoder_core::debounce::ButtonEdges;
use transcoder_core::policy::OutputDecision;
use transcoder_core::reconciler::DecoderStatusSnapshot;
use transcoder_core::settings::Settings;

pub const JOURNAL_CAPACITY: usize = 256;

pub const STATUS1_LOCKED: u8 = 0x01;
pub const STATUS1_COLOR_KILL: u8 = 0x80;
pub const STATUS1_PAL: u8 = 0x40;
pub const STATUS3_50HZ: u8 = 0x04;
pub const STATUS3_FREERUN: u8 = 0x10;
pub const STATUS3_INTERLACED: u8 = 0x40;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChipCall {
    ReadStatus,
    SetupDecoder(DecoderSetup),
    DecoderOutput(OutputDecision),
    SetupEncoder(EncoderConfig),
    Chroma(bool),
    ClearInterrupts,
}

/// Scripted decoder status plus a journal of every intent the controller issued.
pub struct MockChips {
    pub status: DecoderStatusSnapshot,
    pub fail_next: Option<BusFault>,
    pub calls: HeaplessVec<ChipCall, JOURNAL_CAPACITY>,
}

impl MockChips {
    pub fn new() -> Self {
        Self {
            status: DecoderStatusSnapshot::default(),
            fail_next: None,
            calls: HeaplessVec::new(),
        }
    }

    pub fn set_status(&mut self, status1: u8, status3: u8) {
        self.status = DecoderStatusSnapshot::new(status1, 0, status3);
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, predicate: impl Fn(&ChipCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn encoder_setups(&self) -> HeaplessVec<EncoderConfig, JOURNAL_CAPACITY> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ChipCall::SetupEncoder(config) => Some(*config),
                _ => None,
            })
            .collect()
    }

    pub fn decoder_setups(&self) -> HeaplessVec<DecoderSetup, JOURNAL_CAPACITY> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ChipCall::SetupDecoder(setup) => Some(*setup),
                _ => None,
            })
            .collect()
    }

    fn log(&mut self, call: ChipCall) -> Result<(), BusFault> {
        if let Some(fault) = self.fail_next.take() {
            return Err(fault);
        }
        self.calls
            .push(call)
            .expect("mock chip journal capacity exceeded");
        Ok(())
    }
}

impl ChipDriver for MockChips {
    fn read_status1(&mut self) -> Result<u8, BusFault> {
        if let Some(fault) = self.fail_next.take() {
            return Err(fault);
        }
        Ok(self.status.status1)
    }

    fn read_status(&mut self) -> Result<DecoderStatusSnapshot, BusFault> {
        self.log(ChipCall::ReadStatus)?;
        Ok(self.status)
    }

    fn setup_decoder(&mut self, setup: &DecoderSetup) -> Result<(), BusFault> {
        self.log(ChipCall::SetupDecoder(*setup))
    }

    fn apply_decoder_output(&mut self, decision: OutputDecision) -> Result<(), BusFault> {
        self.log(ChipCall::DecoderOutput(decision))
    }

    fn setup_encoder(&mut self, config: &EncoderConfig) -> Result<(), BusFault> {
        self.log(ChipCall::SetupEncoder(*config))
    }

    fn set_chroma(&mut self, enabled: bool) -> Result<(), BusFault> {
        self.log(ChipCall::Chroma(enabled))
    }

    fn clear_interrupts(&mut self) -> Result<(), BusFault> {
        self.log(ChipCall::ClearInterrupts)
    }
}

pub fn started(settings: &Settings) -> Controller<MockChips> {
    started_with(settings, ControllerConfig::default())
}

pub fn started_with(settings: &Settings, config: ControllerConfig) -> Controller<MockChips> {
    let mut controller = Controller::new(MockChips::new(), config, settings);
    controller.start().expect("initial setup");
    controller.chips_mut().clear_calls();
    controller
}

pub fn idle(controller: &mut Controller<MockChips>, polls: usize) {
    for _ in 0..polls {
        controller
            .poll(ButtonEdges::NONE, false)
            .expect("poll should succeed");
    }
}
