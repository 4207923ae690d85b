//! ADV7280A decoder recipes.

use transcoder_core::bus::{BusFault, CommandBus};
use transcoder_core::chips::DecoderSetup;
use transcoder_core::policy::OutputDecision;
use transcoder_core::reconciler::DecoderStatusSnapshot;
use transcoder_core::video::PhysicalInput;

use super::video_range;

pub const DECODER_ADDRESS: u8 = 0x20;

const INPUT_CONTROL: u8 = 0x00;
const AUTODETECT: u8 = 0x02;
const OUTPUT_CONTROL: u8 = 0x03;
const POWER_MANAGEMENT: u8 = 0x0f;
const MAP_SELECT: u8 = 0x0e;
const STATUS_1: u8 = 0x10;
const STATUS_2: u8 = 0x12;
const STATUS_3: u8 = 0x13;
const CTI_DNR_CONTROL: u8 = 0x4d;

const POWER_DOWN: u8 = 0x20;
const POWER_ON: u8 = 0x00;

const MAP_USER: u8 = 0x00;
const MAP_INTERRUPT: u8 = 0x20;

/// Autodetect value that also enables the 7.5 IRE pedestal.
const AUTODETECT_PEDESTAL: u8 = 0x34;

const OUTPUT_ENABLED: u8 = 0x8c;
const OUTPUT_TRISTATE: u8 = 0xcc;

/// CTI enabled, alpha blender off, DNR off.
const CTI_BASE: u8 = 0xc1;
const CTI_ALPHA_SMOOTHEST: u8 = 0x0e;
const CTI_DNR_ENABLE: u8 = 0x20;

/// Lock, unlock, SD field and color-kill events, active low until cleared.
const INTERRUPT_SETUP: [(u8, u8); 7] = [
    (0x44, 0x63),
    (0x43, 0x63),
    (0x48, 0x10),
    (0x47, 0x17),
    (0x4c, 0x3f),
    (0x4b, 0x3f),
    (0x40, 0xd0),
];

const INTERRUPT_CLEAR: [(u8, u8); 3] = [(0x43, 0x63), (0x47, 0x17), (0x4b, 0x3f)];

/// Clamp, sync and comb-filter registers written after every setup.
const FIXED_CONFIG: [(u8, u8); 12] = [
    // Write-only shadow of status 3: keep the crystal pins driven.
    (0x13, 0x00),
    (0x14, 0x11),
    (0x15, 0x60),
    (0x1d, 0x40),
    (0x31, 0x02),
    (0x6b, 0x14),
    // Free-run coasts at 480i.
    (0xf9, 0x07),
    (0x38, 0xc0),
    (0x39, 0xc0),
    (0x19, 0xf0),
    (0x17, 0x59),
    (0x3d, 0x32),
];

const fn input_select(input: PhysicalInput) -> u8 {
    match input {
        PhysicalInput::Cvbs => 0x00,
        PhysicalInput::SVideo => 0x09,
        PhysicalInput::Component => 0x0c,
    }
}

/// Value of the CTI/DNR control register.
pub const fn cti_dnr(smoothing: bool, input_noise_reduction: bool) -> u8 {
    let mut value = CTI_BASE;
    if smoothing {
        value |= CTI_ALPHA_SMOOTHEST;
    }
    if input_noise_reduction {
        value |= CTI_DNR_ENABLE;
    }
    value
}

pub fn power_down<B: CommandBus>(bus: &mut B) -> Result<(), BusFault> {
    bus.write_register(DECODER_ADDRESS, POWER_MANAGEMENT, POWER_DOWN)
}

pub fn power_on<B: CommandBus>(bus: &mut B) -> Result<(), BusFault> {
    bus.write_register(DECODER_ADDRESS, POWER_MANAGEMENT, POWER_ON)
}

/// Everything after leaving powerdown.
pub fn configure<B: CommandBus>(bus: &mut B, setup: &DecoderSetup) -> Result<(), BusFault> {
    match setup.input {
        PhysicalInput::Cvbs => bus.write_register(DECODER_ADDRESS, 0x52, 0xcd)?,
        PhysicalInput::SVideo | PhysicalInput::Component => {
            bus.write_register(DECODER_ADDRESS, 0x53, 0xce)?;
        }
    }
    bus.write_register(DECODER_ADDRESS, INPUT_CONTROL, input_select(setup.input))?;

    bus.write_register(DECODER_ADDRESS, MAP_SELECT, MAP_INTERRUPT)?;
    for (register, value) in INTERRUPT_SETUP {
        bus.write_register(DECODER_ADDRESS, register, value)?;
    }
    bus.write_register(DECODER_ADDRESS, MAP_SELECT, MAP_USER)?;

    let autodetect = if setup.pedestal {
        AUTODETECT_PEDESTAL
    } else {
        video_range(setup.display).decoder_autodetect
    };
    bus.write_register(DECODER_ADDRESS, AUTODETECT, autodetect)?;

    apply_output(bus, setup.output)?;

    for (register, value) in FIXED_CONFIG {
        bus.write_register(DECODER_ADDRESS, register, value)?;
    }
    bus.write_register(
        DECODER_ADDRESS,
        CTI_DNR_CONTROL,
        cti_dnr(setup.smoothing, setup.noise_reduction.on_input()),
    )
}

pub fn apply_output<B: CommandBus>(bus: &mut B, decision: OutputDecision) -> Result<(), BusFault> {
    let value = if decision.enable_driver {
        OUTPUT_ENABLED
    } else {
        OUTPUT_TRISTATE
    };
    bus.write_register(DECODER_ADDRESS, OUTPUT_CONTROL, value)
}

pub fn clear_interrupts<B: CommandBus>(bus: &mut B) -> Result<(), BusFault> {
    bus.write_register(DECODER_ADDRESS, MAP_SELECT, MAP_INTERRUPT)?;
    for (register, value) in INTERRUPT_CLEAR {
        bus.write_register(DECODER_ADDRESS, register, value)?;
    }
    bus.write_register(DECODER_ADDRESS, MAP_SELECT, MAP_USER)
}

pub fn read_status1<B: CommandBus>(bus: &mut B) -> Result<u8, BusFault> {
    bus.read(DECODER_ADDRESS, STATUS_1)
}

pub fn read_status<B: CommandBus>(bus: &mut B) -> Result<DecoderStatusSnapshot, BusFault> {
    Ok(DecoderStatusSnapshot::new(
        bus.read(DECODER_ADDRESS, STATUS_1)?,
        bus.read(DECODER_ADDRESS, STATUS_2)?,
        bus.read(DECODER_ADDRESS, STATUS_3)?,
    ))
}
