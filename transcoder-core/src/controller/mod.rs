//! Main-loop controller tying the state machines to the chip driver.
//!
//! [`Controller`] owns every piece of mutable device state. Integrators call
//! [`Controller::start`] once after power-up and [`Controller::poll`] from a
//! fixed-period loop, handing in the button edges consumed since the previous
//! iteration and the level of the decoder interrupt line. A [`BusFault`]
//! returned from either call should be routed according to the configured
//! [`FaultPolicy`].

use core::time::Duration;

use crate::bus::BusFault;
use crate::chips::{ChipDriver, DecoderSetup, EncoderConfig};
use crate::cycler::{ButtonAction, DEFAULT_IDLE_THRESHOLD, InputCycler};
use crate::debounce::{ButtonEdges, DEFAULT_DEBOUNCE_TICKS};
use crate::fault::{FaultConfig, FaultPolicy};
use crate::policy::{OutputDecision, OutputPolicy};
use crate::reconciler::{StatusReconciler, status1_in_lock};
use crate::settings::Settings;
use crate::telemetry::{LoopTick, TelemetryEventKind, TelemetryPayload, TelemetryRecorder};
use crate::video::{
    DisplayMode, FieldRate, InputSelector, LockState, NoiseReduction, OutputFormat,
    PhysicalInput,
};

/// Main-loop period.
pub const DEFAULT_LOOP_PERIOD: Duration = Duration::from_millis(10);

/// Polls per indicator toggle while the component output is active.
pub const DEFAULT_BLINK_DIVIDER: u16 = 25;

/// Tunables for the control loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControllerConfig {
    pub debounce_ticks: u8,
    pub idle_threshold: u16,
    pub loop_period: Duration,
    pub power_up_settle: Duration,
    pub blink_divider: u16,
    pub fault: FaultConfig,
    pub fault_policy: FaultPolicy,
    /// Decoder emits its free-run test pattern instead of blanking outputs.
    pub freerun_test_pattern: bool,
}

impl ControllerConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            debounce_ticks: DEFAULT_DEBOUNCE_TICKS,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            loop_period: DEFAULT_LOOP_PERIOD,
            power_up_settle: Duration::from_millis(10),
            blink_divider: DEFAULT_BLINK_DIVIDER,
            fault: FaultConfig::new(),
            fault_policy: FaultPolicy::Halt,
            freerun_test_pattern: true,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Levels of the three front-panel indicators.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Indicators {
    pub cvbs: bool,
    pub svideo: bool,
    pub option: bool,
}

impl Indicators {
    /// Steady pattern identifying `input`.
    #[must_use]
    pub const fn for_input(input: PhysicalInput, option: bool) -> Self {
        let (cvbs, svideo) = match input {
            PhysicalInput::Cvbs => (true, false),
            PhysicalInput::SVideo => (false, true),
            PhysicalInput::Component => (true, true),
        };
        Self {
            cvbs,
            svideo,
            option,
        }
    }

    /// Blink frame: the input's primary indicator at `lit`, the other dark.
    #[must_use]
    pub const fn blinking(input: PhysicalInput, lit: bool, option: bool) -> Self {
        match input {
            PhysicalInput::SVideo => Self {
                cvbs: false,
                svideo: lit,
                option,
            },
            PhysicalInput::Cvbs | PhysicalInput::Component => Self {
                cvbs: lit,
                svideo: false,
                option,
            },
        }
    }

    #[must_use]
    pub const fn all(on: bool) -> Self {
        Self {
            cvbs: on,
            svideo: on,
            option: on,
        }
    }
}

/// Everything the controller knows about the device configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceState {
    pub selector: InputSelector,
    pub pedestal_preference: bool,
    pub smoothing: bool,
    pub display: DisplayMode,
    pub noise_reduction: NoiseReduction,
    pub output_format: OutputFormat,
    pub disable_on_freerun: bool,
    pub indicators: Indicators,
}

impl DeviceState {
    #[must_use]
    pub const fn from_settings(settings: &Settings, freerun_test_pattern: bool) -> Self {
        Self {
            selector: settings.default_input,
            pedestal_preference: settings.pedestal_preference,
            smoothing: settings.smoothing,
            display: DisplayMode::initial(),
            noise_reduction: NoiseReduction::Off,
            output_format: OutputFormat::Component,
            disable_on_freerun: OutputPolicy::disable_on_freerun(
                freerun_test_pattern,
                settings.disable_free_run,
            ),
            indicators: Indicators::for_input(
                settings.default_input.physical(),
                settings.smoothing,
            ),
        }
    }
}

/// Summary of one main-loop iteration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PollReport {
    pub tick: LoopTick,
    pub switched_to: Option<PhysicalInput>,
    pub chroma: Option<bool>,
    pub action: Option<ButtonAction>,
    pub polled: bool,
    pub reconfigured: bool,
    pub indicators: Indicators,
}

/// Runtime control core for one decoder/encoder pair.
pub struct Controller<C> {
    chips: C,
    config: ControllerConfig,
    state: DeviceState,
    reconciler: StatusReconciler,
    cycler: InputCycler,
    telemetry: TelemetryRecorder,
    tick: LoopTick,
    blink_polls: u16,
    blink_lit: bool,
}

impl<C: ChipDriver> Controller<C> {
    #[must_use]
    pub fn new(chips: C, config: ControllerConfig, settings: &Settings) -> Self {
        let state = DeviceState::from_settings(settings, config.freerun_test_pattern);
        Self {
            chips,
            cycler: InputCycler::new(state.selector.physical(), config.idle_threshold),
            config,
            state,
            reconciler: StatusReconciler::new(),
            telemetry: TelemetryRecorder::new(),
            tick: 0,
            blink_polls: 0,
            blink_lit: true,
        }
    }

    /// Performs the initial full setup of both chips.
    pub fn start(&mut self) -> Result<(), BusFault> {
        self.full_setup()?;
        self.state.indicators =
            Indicators::for_input(self.cycler.current(), self.state.smoothing);
        Ok(())
    }

    /// Runs one main-loop iteration.
    pub fn poll(
        &mut self,
        edges: ButtonEdges,
        interrupt_asserted: bool,
    ) -> Result<PollReport, BusFault> {
        self.tick = self.tick.wrapping_add(1);
        let mut report = PollReport {
            tick: self.tick,
            switched_to: None,
            chroma: None,
            action: None,
            polled: false,
            reconfigured: false,
            indicators: self.state.indicators,
        };

        let status1 = self.chips.read_status1()?;

        if let Some(next) = self.cycler.observe(status1_in_lock(status1)) {
            self.state.selector =
                InputSelector::from_physical(next, self.state.pedestal_preference);
            self.record(TelemetryEventKind::InputAdvanced, TelemetryPayload::Input(next));
            self.full_setup()?;
            self.blink_polls = 0;
            self.blink_lit = true;
            report.switched_to = Some(next);
        }

        if let Some(enabled) = self.reconciler.observe_color_kill(status1) {
            self.chips.set_chroma(enabled)?;
            self.state.indicators.option = !enabled;
            self.record(
                TelemetryEventKind::ChromaChanged,
                TelemetryPayload::Chroma(enabled),
            );
            report.chroma = Some(enabled);
        }

        if let Some(action) = ButtonAction::from_edges(edges) {
            self.apply_action(action);
            self.full_setup()?;
            report.action = Some(action);
        }

        if self.reconciler.wants_poll(interrupt_asserted) {
            report.polled = true;
            report.reconfigured = self.reconcile(interrupt_asserted)?;
        }

        self.refresh_indicators();
        report.indicators = self.state.indicators;
        Ok(report)
    }

    /// Applies an explicit settings change and reconfigures both chips.
    pub fn apply_settings(&mut self, settings: &Settings) -> Result<(), BusFault> {
        self.state.pedestal_preference = settings.pedestal_preference;
        self.state.smoothing = settings.smoothing;
        self.state.disable_on_freerun = OutputPolicy::disable_on_freerun(
            self.config.freerun_test_pattern,
            settings.disable_free_run,
        );
        self.state.selector =
            InputSelector::from_physical(self.cycler.current(), settings.pedestal_preference);
        self.full_setup()
    }

    /// Notes a fault that the caller decided to survive.
    pub fn record_fault(&mut self, fault: BusFault) {
        self.record(TelemetryEventKind::BusFault, TelemetryPayload::Fault(fault));
    }

    fn apply_action(&mut self, action: ButtonAction) {
        match action {
            ButtonAction::NextDisplayMode => {
                self.state.display = self.state.display.advanced();
                self.record(
                    TelemetryEventKind::DisplayModeChanged,
                    TelemetryPayload::Display(self.state.display),
                );
            }
            ButtonAction::NextNoiseReduction => {
                self.state.noise_reduction = self.state.noise_reduction.next();
                self.record(
                    TelemetryEventKind::NoiseReductionChanged,
                    TelemetryPayload::NoiseReduction(self.state.noise_reduction),
                );
            }
            ButtonAction::ToggleOutputFormat => {
                self.state.output_format = self.state.output_format.toggled();
                self.blink_polls = 0;
                self.blink_lit = true;
                self.record(
                    TelemetryEventKind::OutputFormatChanged,
                    TelemetryPayload::OutputFormat(self.state.output_format),
                );
            }
        }
    }

    fn reconcile(&mut self, interrupt_asserted: bool) -> Result<bool, BusFault> {
        let snapshot = self.chips.read_status()?;
        let observation = self.reconciler.observe(snapshot);

        if let Some(standard) = observation.standard_changed {
            self.record(
                TelemetryEventKind::StandardChanged,
                TelemetryPayload::Standard(standard),
            );
        }
        if let Some((from, to)) = observation.lock_changed {
            self.record(
                TelemetryEventKind::LockChanged,
                TelemetryPayload::Lock { from, to },
            );
        }
        if let Some((from, to)) = observation.interlace_changed {
            self.record(
                TelemetryEventKind::InterlaceChanged,
                TelemetryPayload::Interlace { from, to },
            );
        }

        if observation.reconfigure {
            let decision = self.output_decision();
            self.chips.apply_decoder_output(decision)?;
            self.setup_encoder()?;
        }

        if interrupt_asserted {
            self.chips.clear_interrupts()?;
            self.record(TelemetryEventKind::InterruptsCleared, TelemetryPayload::None);
        }
        self.reconciler.finish_poll(interrupt_asserted);

        Ok(observation.reconfigure)
    }

    fn full_setup(&mut self) -> Result<(), BusFault> {
        self.reconciler.reset();

        let setup = DecoderSetup {
            input: self.state.selector.physical(),
            pedestal: self.state.selector.pedestal(),
            smoothing: self.state.smoothing,
            display: self.state.display,
            noise_reduction: self.state.noise_reduction,
            output: self.output_decision(),
        };
        self.chips.setup_decoder(&setup)?;
        self.record(
            TelemetryEventKind::DecoderConfigured,
            TelemetryPayload::Input(setup.input),
        );

        self.setup_encoder()
    }

    fn setup_encoder(&mut self) -> Result<(), BusFault> {
        let config = self.encoder_config();
        self.chips.setup_encoder(&config)?;
        self.record(
            TelemetryEventKind::EncoderConfigured,
            TelemetryPayload::Encoder {
                lock: config.lock,
                interlace: config.interlace,
                output_format: config.output_format,
            },
        );
        Ok(())
    }

    fn refresh_indicators(&mut self) {
        let input = self.cycler.current();
        let option = self.state.indicators.option;

        self.state.indicators = match self.state.output_format {
            OutputFormat::Composite => Indicators::for_input(input, option),
            OutputFormat::Component => {
                self.blink_polls = self.blink_polls.saturating_add(1);
                if self.blink_polls >= self.config.blink_divider.max(1) {
                    self.blink_polls = 0;
                    self.blink_lit = !self.blink_lit;
                }
                Indicators::blinking(input, self.blink_lit, option)
            }
        };
    }

    const fn output_decision(&self) -> OutputDecision {
        OutputPolicy::decide(self.reconciler.lock(), self.state.disable_on_freerun)
    }

    fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            lock: self.reconciler.lock(),
            interlace: self.reconciler.interlace(),
            input: self.state.selector.physical(),
            display: self.state.display,
            output_format: self.state.output_format,
            noise_reduction: self.state.noise_reduction,
            field_rate: self
                .reconciler
                .previous()
                .map_or(FieldRate::Hz60, |snapshot| snapshot.field_rate()),
            output: self.output_decision(),
            chroma_enabled: self.reconciler.chroma_enabled(),
        }
    }

    fn record(&mut self, event: TelemetryEventKind, details: TelemetryPayload) {
        self.telemetry.record(event, details, self.tick);
    }

    #[must_use]
    pub const fn state(&self) -> &DeviceState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[must_use]
    pub const fn reconciler(&self) -> &StatusReconciler {
        &self.reconciler
    }

    #[must_use]
    pub const fn cycler(&self) -> &InputCycler {
        &self.cycler
    }

    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    #[must_use]
    pub const fn lock(&self) -> LockState {
        self.reconciler.lock()
    }

    #[must_use]
    pub const fn tick(&self) -> LoopTick {
        self.tick
    }

    #[must_use]
    pub const fn chips(&self) -> &C {
        &self.chips
    }

    pub fn chips_mut(&mut self) -> &mut C {
        &mut self.chips
    }

    #[must_use]
    pub fn into_chips(self) -> C {
        self.chips
    }
}
