use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Timer};
use transcoder_core::bus::I2cBus;
use transcoder_core::chips::{ChipPower, ResetLines};
use transcoder_core::controller::Controller;
use transcoder_core::fault::{FaultPolicy, halt};
use transcoder_core::settings::SettingsStore;

use crate::buttons::SharedButtons;
use crate::chips::BoardChips;
use crate::config::{CONTROLLER_CONFIG, embassy_duration};
use crate::telemetry::{self, TelemetryDrain};

mod board;
mod flash_settings;
mod tick_task;

use board::{Board, Leds};
use flash_settings::FlashSettings;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Button sampling period.
const TICK_PERIOD: Duration = Duration::from_millis(10);

pub(super) static BUTTONS: SharedButtons<CriticalSectionRawMutex> =
    SharedButtons::new(CONTROLLER_CONFIG.debounce_ticks);

static TICK_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[hal::interrupt]
unsafe fn USART3_4_5_6_LPUART1() {
    unsafe { TICK_EXECUTOR.on_interrupt() }
}

#[embassy_executor::main]
pub async fn main(_spawner: Spawner) {
    let config = CONTROLLER_CONFIG;
    let hal::Peripherals {
        PA0,
        PA1,
        PA4,
        PA5,
        PA6,
        PA7,
        PB0,
        PB1,
        PB2,
        PB8,
        PB9,
        I2C1,
        IWDG,
        FLASH,
        ..
    } = hal::init(hal::Config::default());

    hal::interrupt::USART3_4_5_6_LPUART1.set_priority(Priority::P1);
    let tick_spawner = TICK_EXECUTOR.start(hal::interrupt::USART3_4_5_6_LPUART1);
    tick_spawner
        .spawn(tick_task::run(
            Input::new(PA0, Pull::Up),
            Input::new(PA1, Pull::Up),
            TICK_PERIOD,
        ))
        .expect("failed to spawn button tick task");

    let mut delay = Delay;
    let mut reset = ResetLines::new(
        Output::new(PA4, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
    );
    let Ok(()) = reset.power_up(&mut delay);
    Timer::after(embassy_duration(config.power_up_settle)).await;

    let mut storage = FlashSettings::new(hal::flash::Flash::new_blocking(FLASH));
    let mut store = SettingsStore::load_from(&mut storage);
    telemetry::log_settings_loaded(store.outcome(), store.settings());
    if store.should_persist() && store.persist_to(&mut storage).is_err() {
        telemetry::log_settings_not_persisted();
    }

    let mut board = Board::new(
        Leds::new(
            Output::new(PB0, Level::Low, Speed::Low),
            Output::new(PB1, Level::Low, Speed::Low),
            Output::new(PB2, Level::Low, Speed::Low),
        ),
        reset,
        IWDG,
    );
    let decoder_interrupt = Input::new(PA7, Pull::Up);

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = Hertz::khz(100);
    let bus = I2cBus::new(I2c::new_blocking(I2C1, PB8, PB9, i2c_config));
    let mut controller = Controller::new(BoardChips::new(bus, Delay), config, store.settings());
    let mut drain = TelemetryDrain::new();

    if let Err(fault) = controller.start() {
        controller.record_fault(fault);
        drain.drain(controller.telemetry());
        halt(fault, &mut board, &mut delay, &config.fault);
    }
    board.show(controller.state().indicators);
    drain.drain(controller.telemetry());

    let loop_period = embassy_duration(config.loop_period);
    loop {
        let edges = BUTTONS.take_edges();
        match controller.poll(edges, decoder_interrupt.is_low()) {
            Ok(report) => board.show(report.indicators),
            Err(fault) => {
                controller.record_fault(fault);
                drain.drain(controller.telemetry());
                if config.fault_policy == FaultPolicy::Halt {
                    halt(fault, &mut board, &mut delay, &config.fault);
                }
            }
        }
        drain.drain(controller.telemetry());
        Timer::after(loop_period).await;
    }
}
