//! Register recipes for the ADV7280A decoder and ADV7391 encoder.
//!
//! [`BoardChips`] turns the intent-level requests of the control core into
//! the fixed write sequences each chip needs. Everything here is bus-agnostic
//! so the recipes run unchanged against the host recording bus in tests.

mod decoder;
mod encoder;

use embedded_hal::delay::DelayNs;
use transcoder_core::bus::{BusFault, CommandBus};
use transcoder_core::chips::{ChipDriver, DecoderSetup, EncoderConfig, RESET_SETTLE_MS};
use transcoder_core::policy::OutputDecision;
use transcoder_core::reconciler::DecoderStatusSnapshot;
use transcoder_core::video::{DisplayMode, VIDEO_RANGE_COUNT};

pub use decoder::DECODER_ADDRESS;
pub use encoder::ENCODER_ADDRESS;

/// One entry of the brightness / IRE table shared by both chips.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VideoRangeRecipe {
    /// Encoder SD mode register 7 (0x87).
    pub encoder_mode: u8,
    /// Decoder autodetect/pedestal register (0x02).
    pub decoder_autodetect: u8,
    /// Encoder SD brightness (0xA1).
    pub encoder_brightness: u8,
    /// Encoder DAC gain (0x0B).
    pub encoder_dac_gain: u8,
}

const fn range(
    encoder_mode: u8,
    decoder_autodetect: u8,
    encoder_brightness: u8,
    encoder_dac_gain: u8,
) -> VideoRangeRecipe {
    VideoRangeRecipe {
        encoder_mode,
        decoder_autodetect,
        encoder_brightness,
        encoder_dac_gain,
    }
}

pub const VIDEO_RANGES: [VideoRangeRecipe; VIDEO_RANGE_COUNT as usize] = [
    range(0x00, 0x04, 0x00, 0x00),
    range(0x08, 0x04, 0xf9, 0x20),
    range(0x08, 0x34, 0x00, 0x00),
    range(0x08, 0x34, 0xf9, 0x20),
    range(0x08, 0x34, 0x71, 0x40),
    range(0x08, 0x34, 0xea, 0x40),
];

/// Recipe for the range selected by `display`.
#[must_use]
pub const fn video_range(display: DisplayMode) -> VideoRangeRecipe {
    VIDEO_RANGES[display.range.index() as usize]
}

/// Decoder/encoder pair on a shared command bus.
pub struct BoardChips<B, D> {
    bus: B,
    delay: D,
}

impl<B: CommandBus, D: DelayNs> BoardChips<B, D> {
    #[must_use]
    pub const fn new(bus: B, delay: D) -> Self {
        Self { bus, delay }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[must_use]
    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }
}

impl<B: CommandBus, D: DelayNs> ChipDriver for BoardChips<B, D> {
    fn read_status1(&mut self) -> Result<u8, BusFault> {
        decoder::read_status1(&mut self.bus)
    }

    fn read_status(&mut self) -> Result<DecoderStatusSnapshot, BusFault> {
        decoder::read_status(&mut self.bus)
    }

    fn setup_decoder(&mut self, setup: &DecoderSetup) -> Result<(), BusFault> {
        decoder::power_down(&mut self.bus)?;
        encoder::soft_reset(&mut self.bus);
        decoder::power_on(&mut self.bus)?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        decoder::configure(&mut self.bus, setup)
    }

    fn apply_decoder_output(&mut self, decision: OutputDecision) -> Result<(), BusFault> {
        decoder::apply_output(&mut self.bus, decision)
    }

    fn setup_encoder(&mut self, config: &EncoderConfig) -> Result<(), BusFault> {
        encoder::configure(&mut self.bus, config)
    }

    fn set_chroma(&mut self, enabled: bool) -> Result<(), BusFault> {
        encoder::set_chroma(&mut self.bus, enabled)
    }

    fn clear_interrupts(&mut self) -> Result<(), BusFault> {
        decoder::clear_interrupts(&mut self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcoder_core::chips::{DecoderSetup, EncoderConfig};
    use transcoder_core::video::{
        ColorSpace, DisplayMode, FieldRate, InterlaceState, LockState, NoiseReduction,
        OutputFormat, PhysicalInput, VideoRange,
    };

    /// Bus that journals every write and answers reads from a register file.
    struct RecordingBus {
        pub writes: Vec<(u8, u8, Vec<u8>)>,
        pub decoder_registers: [u8; 256],
        pub fail_device: Option<u8>,
    }

    impl RecordingBus {
        fn new() -> Self {
            Self {
                writes: Vec::new(),
                decoder_registers: [0; 256],
                fail_device: None,
            }
        }

        fn value_of(&self, device: u8, register: u8) -> Option<u8> {
            self.writes
                .iter()
                .rev()
                .find(|(d, r, _)| *d == device && *r == register)
                .and_then(|(_, _, bytes)| bytes.first().copied())
        }

        fn position(&self, device: u8, register: u8, value: u8) -> Option<usize> {
            self.writes
                .iter()
                .position(|(d, r, bytes)| *d == device && *r == register && bytes == &[value])
        }
    }

    impl CommandBus for RecordingBus {
        fn write(&mut self, device: u8, register: u8, bytes: &[u8]) -> Result<(), BusFault> {
            if self.fail_device == Some(device) {
                return Err(BusFault::new(device, bytes.len() + 1));
            }
            self.writes.push((device, register, bytes.to_vec()));
            Ok(())
        }

        fn read(&mut self, device: u8, register: u8) -> Result<u8, BusFault> {
            if self.fail_device == Some(device) {
                return Err(BusFault::new(device, 2));
            }
            Ok(self.decoder_registers[usize::from(register)])
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        pub total_ms: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += ms;
        }
    }

    fn chips() -> BoardChips<RecordingBus, CountingDelay> {
        BoardChips::new(RecordingBus::new(), CountingDelay::default())
    }

    fn decoder_setup(input: PhysicalInput) -> DecoderSetup {
        DecoderSetup {
            input,
            pedestal: false,
            smoothing: false,
            display: DisplayMode::initial(),
            noise_reduction: NoiseReduction::Off,
            output: OutputDecision::ENABLED,
        }
    }

    fn encoder_config() -> EncoderConfig {
        EncoderConfig {
            lock: LockState::Locked,
            interlace: InterlaceState::Interlaced,
            input: PhysicalInput::Cvbs,
            display: DisplayMode::initial(),
            output_format: OutputFormat::Component,
            noise_reduction: NoiseReduction::Off,
            field_rate: FieldRate::Hz60,
            output: OutputDecision::ENABLED,
            chroma_enabled: true,
        }
    }

    #[test]
    fn decoder_setup_selects_input_mux() {
        for (input, insel, afe) in [
            (PhysicalInput::Cvbs, 0x00, (0x52, 0xcd)),
            (PhysicalInput::SVideo, 0x09, (0x53, 0xce)),
            (PhysicalInput::Component, 0x0c, (0x53, 0xce)),
        ] {
            let mut chips = chips();
            chips.setup_decoder(&decoder_setup(input)).expect("setup");
            let (bus, delay) = chips.into_parts();

            assert_eq!(bus.value_of(DECODER_ADDRESS, 0x00), Some(insel), "{input}");
            assert_eq!(bus.value_of(DECODER_ADDRESS, afe.0), Some(afe.1), "{input}");
            assert_eq!(delay.total_ms, RESET_SETTLE_MS);
        }
    }

    #[test]
    fn decoder_setup_powers_up_before_configuring() {
        let mut chips = chips();
        chips
            .setup_decoder(&decoder_setup(PhysicalInput::Cvbs))
            .expect("setup");
        let bus = chips.into_parts().0;

        let sleep = bus.position(DECODER_ADDRESS, 0x0f, 0x20).expect("powerdown");
        let reset = bus.position(ENCODER_ADDRESS, 0x17, 0x07).expect("reset");
        let wake = bus.position(DECODER_ADDRESS, 0x0f, 0x00).expect("wake");
        let mux = bus.position(DECODER_ADDRESS, 0x00, 0x00).expect("mux");
        assert!(sleep < reset && reset < wake && wake < mux);
    }

    #[test]
    fn interrupt_map_is_restored_to_main_map() {
        let mut chips = chips();
        chips
            .setup_decoder(&decoder_setup(PhysicalInput::SVideo))
            .expect("setup");
        chips.clear_interrupts().expect("clear");
        let bus = chips.into_parts().0;

        let map_writes: Vec<u8> = bus
            .writes
            .iter()
            .filter(|(d, r, _)| *d == DECODER_ADDRESS && *r == 0x0e)
            .map(|(_, _, bytes)| bytes[0])
            .collect();
        assert_eq!(map_writes, [0x20, 0x00, 0x20, 0x00]);
    }

    #[test]
    fn pedestal_forces_decoder_autodetect() {
        let mut setup = decoder_setup(PhysicalInput::Cvbs);
        setup.pedestal = true;
        let mut chips = chips();
        chips.setup_decoder(&setup).expect("setup");

        assert_eq!(chips.bus_mut().value_of(DECODER_ADDRESS, 0x02), Some(0x34));
    }

    #[test]
    fn smoothing_and_input_noise_reduction_shape_cti_register() {
        let cases = [
            (false, NoiseReduction::Off, 0xc1),
            (true, NoiseReduction::Off, 0xcf),
            (false, NoiseReduction::InputOnly, 0xe1),
            (true, NoiseReduction::Both, 0xef),
            (false, NoiseReduction::OutputOnly, 0xc1),
        ];
        for (smoothing, noise_reduction, expected) in cases {
            let mut setup = decoder_setup(PhysicalInput::Cvbs);
            setup.smoothing = smoothing;
            setup.noise_reduction = noise_reduction;
            let mut chips = chips();
            chips.setup_decoder(&setup).expect("setup");

            assert_eq!(
                chips.bus_mut().value_of(DECODER_ADDRESS, 0x4d),
                Some(expected),
                "{smoothing} {noise_reduction:?}"
            );
        }
    }

    #[test]
    fn decoder_output_tristates_when_disabled() {
        let mut chips = chips();
        chips
            .apply_decoder_output(OutputDecision::DISABLED)
            .expect("tristate");
        assert_eq!(chips.bus_mut().value_of(DECODER_ADDRESS, 0x03), Some(0xcc));

        chips
            .apply_decoder_output(OutputDecision::ENABLED)
            .expect("enable");
        assert_eq!(chips.bus_mut().value_of(DECODER_ADDRESS, 0x03), Some(0x8c));
    }

    #[test]
    fn encoder_sleep_request_stops_after_power_register() {
        let mut config = encoder_config();
        config.output = OutputDecision::DISABLED;
        let mut chips = chips();
        chips.setup_encoder(&config).expect("sleep");

        let bus = chips.into_parts().0;
        assert_eq!(bus.writes, [(ENCODER_ADDRESS, 0x00, vec![0x01])]);
    }

    #[test]
    fn encoder_follows_field_rate_format_and_color_space() {
        let mut config = encoder_config();
        let mut chips = chips();
        chips.setup_encoder(&config).expect("ntsc");
        {
            let bus = chips.bus_mut();
            assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x00), Some(0x1e));
            assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x80), Some(0x72));
            assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x82), Some(0xc0));
            assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x02), Some(0x54));
            assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x84), Some(0x00));
            assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x88), Some(0x04));
        }

        config.field_rate = FieldRate::Hz50;
        config.output_format = OutputFormat::Composite;
        config.display.color = ColorSpace::YPbPr;
        config.noise_reduction = NoiseReduction::OutputOnly;
        config.chroma_enabled = false;
        chips.setup_encoder(&config).expect("pal");

        let bus = chips.bus_mut();
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x80), Some(0x71));
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x82), Some(0xc2));
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x02), Some(0x74));
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x84), Some(0x10));
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x88), Some(0x24));
    }

    #[test]
    fn encoder_writes_subcarrier_as_one_block() {
        let mut chips = chips();
        chips.setup_encoder(&encoder_config()).expect("setup");

        let bus = chips.into_parts().0;
        let block = bus
            .writes
            .iter()
            .find(|(d, r, _)| *d == ENCODER_ADDRESS && *r == 0x8c)
            .expect("subcarrier block");
        assert_eq!(block.2, [0xcb, 0x8a, 0x09, 0x2a]);
    }

    #[test]
    fn video_range_splits_across_both_chips() {
        let mut display = DisplayMode::initial();
        display.range = VideoRange::new(4).expect("range");

        let mut chips = chips();
        let mut setup = decoder_setup(PhysicalInput::Cvbs);
        setup.display = display;
        chips.setup_decoder(&setup).expect("decoder");
        let mut config = encoder_config();
        config.display = display;
        chips.setup_encoder(&config).expect("encoder");

        let bus = chips.bus_mut();
        assert_eq!(bus.value_of(DECODER_ADDRESS, 0x02), Some(0x34));
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x87), Some(0x08));
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0xa1), Some(0x71));
        assert_eq!(bus.value_of(ENCODER_ADDRESS, 0x0b), Some(0x40));
    }

    #[test]
    fn chroma_toggles_single_register() {
        let mut chips = chips();
        chips.set_chroma(false).expect("suppress");
        chips.set_chroma(true).expect("restore");

        let bus = chips.into_parts().0;
        assert_eq!(
            bus.writes,
            [
                (ENCODER_ADDRESS, 0x84, vec![0x10]),
                (ENCODER_ADDRESS, 0x84, vec![0x00]),
            ]
        );
    }

    #[test]
    fn status_reads_cover_three_registers() {
        let mut chips = chips();
        chips.bus_mut().decoder_registers[0x10] = 0x05;
        chips.bus_mut().decoder_registers[0x12] = 0x01;
        chips.bus_mut().decoder_registers[0x13] = 0x40;

        let snapshot = chips.read_status().expect("status");
        assert_eq!(snapshot, DecoderStatusSnapshot::new(0x05, 0x01, 0x40));
        assert_eq!(chips.read_status1(), Ok(0x05));
    }

    #[test]
    fn failed_encoder_reset_is_tolerated() {
        let mut chips = chips();
        chips.bus_mut().fail_device = Some(ENCODER_ADDRESS);

        assert!(
            chips
                .setup_decoder(&decoder_setup(PhysicalInput::Cvbs))
                .is_ok()
        );
        assert_eq!(
            chips.setup_encoder(&encoder_config()),
            Err(BusFault::new(ENCODER_ADDRESS, 2))
        );
    }
}
