//! ADV7391 encoder recipes.

use transcoder_core::bus::{BusFault, CommandBus};
use transcoder_core::chips::EncoderConfig;
use transcoder_core::video::{ColorSpace, FieldRate, OutputFormat};

use super::video_range;

pub const ENCODER_ADDRESS: u8 = 0x2a;

const POWER_MODE: u8 = 0x00;
const SD_MODE_1: u8 = 0x80;
const SD_MODE_2: u8 = 0x82;
const SD_MODE_3: u8 = 0x83;
const SD_MODE_4: u8 = 0x84;
const SD_MODE_7: u8 = 0x87;
const SD_MODE_8: u8 = 0x88;
const SD_BRIGHTNESS: u8 = 0xa1;
const DAC_GAIN: u8 = 0x0b;
const MODE_SELECT: u8 = 0x01;
const MODE_REGISTER_0: u8 = 0x10;
const CSC_MODE: u8 = 0x02;
const FSC_BASE: u8 = 0x8c;
const SOFT_RESET: u8 = 0x17;

const POWER_SLEEP: u8 = 0x01;
/// All DACs on, PLL off.
const POWER_DACS_ON: u8 = 0x1e;

const CHROMA_ENABLED: u8 = 0x00;
const CHROMA_SUPPRESSED: u8 = 0x10;

/// NTSC subcarrier frequency words, FSC0..FSC3.
const FSC_NTSC: [u8; 4] = [0xcb, 0x8a, 0x09, 0x2a];

/// Resets the encoder; it may drop off the bus before acknowledging.
pub fn soft_reset<B: CommandBus>(bus: &mut B) {
    bus.write_allowing_failure(ENCODER_ADDRESS, SOFT_RESET, 0x07);
}

pub fn configure<B: CommandBus>(bus: &mut B, config: &EncoderConfig) -> Result<(), BusFault> {
    if config.output.request_sleep {
        return bus.write_register(ENCODER_ADDRESS, POWER_MODE, POWER_SLEEP);
    }
    bus.write_register(ENCODER_ADDRESS, POWER_MODE, POWER_DACS_ON)?;

    let sd_mode_8 = if config.noise_reduction.on_output() {
        0x24
    } else {
        0x04
    };
    let sd_mode_1 = match config.field_rate {
        FieldRate::Hz50 => 0x71,
        FieldRate::Hz60 => 0x72,
    };
    let sd_mode_2 = match config.output_format {
        OutputFormat::Component => 0xc0,
        OutputFormat::Composite => 0xc2,
    };
    let csc = match config.display.color {
        ColorSpace::Rgb => 0x54,
        ColorSpace::YPbPr => 0x74,
    };
    let range = video_range(config.display);

    for (register, value) in [
        (MODE_REGISTER_0, 0x10),
        (SD_MODE_8, sd_mode_8),
        (MODE_SELECT, 0x00),
        (SD_MODE_1, sd_mode_1),
        (SD_MODE_2, sd_mode_2),
        (CSC_MODE, csc),
        (SD_MODE_3, 0x76),
        (SD_MODE_7, range.encoder_mode),
        (SD_BRIGHTNESS, range.encoder_brightness),
        (DAC_GAIN, range.encoder_dac_gain),
    ] {
        bus.write_register(ENCODER_ADDRESS, register, value)?;
    }
    bus.write(ENCODER_ADDRESS, FSC_BASE, &FSC_NTSC)?;
    set_chroma(bus, config.chroma_enabled)
}

pub fn set_chroma<B: CommandBus>(bus: &mut B, enabled: bool) -> Result<(), BusFault> {
    let value = if enabled {
        CHROMA_ENABLED
    } else {
        CHROMA_SUPPRESSED
    };
    bus.write_register(ENCODER_ADDRESS, SD_MODE_4, value)
}
