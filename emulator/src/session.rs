use std::fs;
use std::io;
use std::path::PathBuf;

use transcoder_core::bus::BusFault;
use transcoder_core::controller::{Controller, ControllerConfig, Indicators, PollReport};
use transcoder_core::debounce::{ButtonBank, ButtonEdges};
use transcoder_core::fault::FaultPolicy;
use transcoder_core::settings::{
    RECORD_LEN, SettingsError, SettingsRecord, SettingsStorage, SettingsStore,
};
use transcoder_core::telemetry::EventId;
use transcoder_core::video::{ColorSpace, FieldRate, InputSelector, PhysicalInput};

use crate::commands::{self, Command, HELP_TOPICS, Press, SettingChange};
use crate::sim::SimChips;

/// Where the emulated settings record lives between runs.
#[derive(Debug)]
pub enum SettingsBackend {
    /// Volatile; starts blank like an erased flash page.
    Memory(Option<SettingsRecord>),
    File(PathBuf),
}

impl SettingsStorage for SettingsBackend {
    type Error = io::Error;

    fn read(&mut self, record: &mut SettingsRecord) -> Result<(), Self::Error> {
        match self {
            SettingsBackend::Memory(stored) => {
                *record = stored.unwrap_or([0xff; RECORD_LEN]);
                Ok(())
            }
            SettingsBackend::File(path) => {
                let bytes = fs::read(path)?;
                let exact = bytes
                    .get(..RECORD_LEN)
                    .and_then(|slice| SettingsRecord::try_from(slice).ok())
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::UnexpectedEof, "settings record truncated")
                    })?;
                *record = exact;
                Ok(())
            }
        }
    }

    fn write(&mut self, record: &SettingsRecord) -> Result<(), Self::Error> {
        match self {
            SettingsBackend::Memory(stored) => {
                *stored = Some(*record);
                Ok(())
            }
            SettingsBackend::File(path) => fs::write(path, record),
        }
    }
}

/// Startup options taken from the command line.
#[derive(Debug)]
pub struct SessionOptions {
    pub settings: SettingsBackend,
    pub fault_policy: FaultPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settings: SettingsBackend::Memory(None),
            fault_policy: FaultPolicy::Halt,
        }
    }
}

/// Output of one console command.
#[derive(Debug, Default)]
pub struct Response {
    pub lines: Vec<String>,
    /// Set when a fault must stop the emulated board.
    pub halted: Option<BusFault>,
}

impl Response {
    fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            halted: None,
        }
    }
}

pub struct Session {
    controller: Controller<SimChips>,
    store: SettingsStore,
    storage: SettingsBackend,
    buttons: ButtonBank,
    next_event: EventId,
    boot_lines: Vec<String>,
}

impl Session {
    /// Loads settings and performs the initial chip setup.
    pub fn new(options: SessionOptions) -> Result<Self, BusFault> {
        let SessionOptions {
            settings: mut storage,
            fault_policy,
        } = options;
        let config = ControllerConfig {
            fault_policy,
            ..ControllerConfig::new()
        };

        let mut store = SettingsStore::load_from(&mut storage);
        let mut boot_lines = vec![format!(
            "settings: {} (format v{})",
            store.outcome(),
            store.format_version()
        )];
        if store.should_persist() {
            boot_lines.push(describe_persist(store.persist_to(&mut storage)));
        }

        let mut controller = Controller::new(SimChips::new(), config, store.settings());
        controller.start()?;

        let mut session = Self {
            buttons: ButtonBank::new(config.debounce_ticks),
            controller,
            store,
            storage,
            next_event: 0,
            boot_lines,
        };
        let mut lines = Vec::new();
        session.drain_telemetry(&mut lines);
        session.boot_lines.extend(lines);
        Ok(session)
    }

    /// Lines produced while booting; empty after the first call.
    pub fn take_boot_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.boot_lines)
    }

    pub fn controller(&self) -> &Controller<SimChips> {
        &self.controller
    }

    pub fn handle_command(&mut self, line: &str) -> Response {
        let lowered = line.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Response::default();
        }

        let command = match commands::parse(&lowered) {
            Ok(command) => command,
            Err(err) => {
                return Response {
                    lines: vec![format!("ERR syntax {}", err.trim_end())],
                    halted: None,
                };
            }
        };

        match command {
            Command::Status => Response {
                lines: self.status_lines(),
                halted: None,
            },
            Command::Poll(count) => self.run(count, ButtonEdges::NONE),
            Command::Signal { level, input } => {
                let input = input.unwrap_or_else(|| self.controller.chips().selected_input());
                self.controller.chips_mut().set_source(input, level);
                Response::line(format!("OK {input} source {level}"))
            }
            Command::Interlace(on) => {
                let chips = self.controller.chips_mut();
                chips.interlaced = on;
                chips.signal_changed();
                Response::line(format!("OK interlace {}", on_off(on)))
            }
            Command::Standard(code) => {
                let chips = self.controller.chips_mut();
                chips.standard = code;
                chips.signal_changed();
                Response::line(format!("OK standard {code}"))
            }
            Command::ColorKill(on) => {
                let chips = self.controller.chips_mut();
                chips.color_kill = on;
                chips.signal_changed();
                Response::line(format!("OK color-kill {}", on_off(on)))
            }
            Command::Irq => {
                self.controller.chips_mut().raise_interrupt();
                Response::line("OK interrupt asserted")
            }
            Command::Press(press) => {
                let edges = self.press(press);
                self.run(1, edges)
            }
            Command::Settings => Response {
                lines: self.settings_lines(),
                halted: None,
            },
            Command::Set(change) => self.change_setting(change),
            Command::FailBus => {
                self.controller.chips_mut().fail_next_transaction();
                Response::line("OK next bus transaction will fail")
            }
            Command::Telemetry => Response {
                lines: self
                    .controller
                    .telemetry()
                    .oldest_first()
                    .map(|record| format!("telemetry: {record}"))
                    .collect(),
                halted: None,
            },
            Command::Help(topic) => Response {
                lines: help_lines(topic),
                halted: None,
            },
        }
    }

    /// Holds the buttons long enough to debounce, then releases them.
    fn press(&mut self, press: Press) -> ButtonEdges {
        let (advance, option) = match press {
            Press::Advance => (true, false),
            Press::Option => (false, true),
            Press::Both => (true, true),
        };
        let window = self.buttons.advance().window();
        for _ in 0..window {
            self.buttons.sample(advance, option);
        }
        let edges = self.buttons.take_edges();
        for _ in 0..window {
            self.buttons.sample(false, false);
        }
        edges
    }

    fn run(&mut self, count: u32, mut edges: ButtonEdges) -> Response {
        let mut response = Response::default();
        let mut last = None;
        for _ in 0..count {
            let interrupt = self.controller.chips().interrupt_asserted();
            match self.controller.poll(edges, interrupt) {
                Ok(report) => last = Some(report),
                Err(fault) => {
                    if let Some(halted) = self.fault(fault, &mut response.lines) {
                        response.halted = Some(halted);
                        return response;
                    }
                }
            }
            edges = ButtonEdges::NONE;
            self.drain_telemetry(&mut response.lines);
        }
        if let Some(report) = last {
            response.lines.push(describe_report(&report));
        }
        response
    }

    fn change_setting(&mut self, change: SettingChange) -> Response {
        let mut settings = *self.store.settings();
        match change {
            SettingChange::DefaultInput(selector) => settings.default_input = selector,
            SettingChange::PedestalPreference(on) => settings.pedestal_preference = on,
            SettingChange::Smoothing(on) => settings.smoothing = on,
            SettingChange::DisableFreeRun(on) => settings.disable_free_run = on,
        }
        self.store.update(settings);

        let mut response = Response::default();
        if let Err(fault) = self.controller.apply_settings(&settings) {
            response.halted = self.fault(fault, &mut response.lines);
            if response.halted.is_some() {
                return response;
            }
        }
        self.drain_telemetry(&mut response.lines);
        if self.store.is_dirty() {
            let result = self.store.persist_to(&mut self.storage);
            response.lines.push(describe_persist(result));
        } else {
            response.lines.push("settings: unchanged".to_string());
        }
        response
    }

    /// Applies the configured policy; returns the fault when the board halts.
    fn fault(&mut self, fault: BusFault, lines: &mut Vec<String>) -> Option<BusFault> {
        self.controller.record_fault(fault);
        self.drain_telemetry(lines);
        match self.controller.config().fault_policy {
            FaultPolicy::Halt => Some(fault),
            FaultPolicy::Continue => {
                lines.push(format!("ERR {fault}; continuing"));
                None
            }
        }
    }

    fn drain_telemetry(&mut self, lines: &mut Vec<String>) {
        for record in self.controller.telemetry().since(self.next_event) {
            lines.push(format!("telemetry: {record}"));
            self.next_event = record.id.wrapping_add(1);
        }
    }

    fn status_lines(&self) -> Vec<String> {
        let controller = &self.controller;
        let state = controller.state();
        let reconciler = controller.reconciler();
        let chips = controller.chips();
        let standard = reconciler
            .standard()
            .map_or("unknown", |standard| standard.label());

        vec![
            format!(
                "input={} pedestal={} lock={} interlace={} standard={}",
                state.selector.physical(),
                on_off(state.selector.pedestal()),
                reconciler.lock(),
                reconciler.interlace(),
                standard,
            ),
            format!(
                "display=range{}/{} noise-reduction={} output={} chroma={}",
                state.display.range.index(),
                color_label(state.display.color),
                state.noise_reduction.label(),
                state.output_format.label(),
                on_off(chips.encoder().chroma_enabled),
            ),
            format!(
                "indicators {} tick={} idle-polls={} disable-on-freerun={}",
                describe_indicators(state.indicators),
                controller.tick(),
                controller.cycler().idle_polls(),
                on_off(state.disable_on_freerun),
            ),
            format!(
                "decoder output={} encoder={} irq={} transactions={}",
                if chips.decoder_output().enable_driver {
                    "enabled"
                } else {
                    "tristate"
                },
                describe_encoder(chips),
                if chips.interrupt_asserted() {
                    "asserted"
                } else {
                    "idle"
                },
                chips.transactions(),
            ),
            format!(
                "sources {}",
                PhysicalInput::ALL
                    .iter()
                    .map(|input| format!("{input}={}", chips.source(*input)))
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
        ]
    }

    fn settings_lines(&self) -> Vec<String> {
        let settings = self.store.settings();
        vec![
            format!(
                "settings: {} dirty={} downgrading={}",
                self.store.outcome(),
                self.store.is_dirty(),
                self.store.is_downgrading(),
            ),
            format!(
                "  input={} pedestal={} smoothing={} disable-free-run={}",
                describe_selector(settings.default_input),
                on_off(settings.pedestal_preference),
                on_off(settings.smoothing),
                on_off(settings.disable_free_run),
            ),
        ]
    }
}

fn describe_persist<E: std::fmt::Debug>(result: Result<bool, SettingsError<E>>) -> String {
    match result {
        Ok(true) => "settings: saved".to_string(),
        Ok(false) => "settings: unchanged".to_string(),
        Err(SettingsError::Downgrading) => "settings: not saved (newer format)".to_string(),
        Err(err) => format!("ERR {err}"),
    }
}

fn describe_report(report: &PollReport) -> String {
    let mut line = format!("OK tick={}", report.tick);
    if let Some(input) = report.switched_to {
        line.push_str(&format!(" switched={input}"));
    }
    if let Some(action) = report.action {
        line.push_str(&format!(" action={}", action.label()));
    }
    if let Some(chroma) = report.chroma {
        line.push_str(&format!(" chroma={}", on_off(chroma)));
    }
    if report.reconfigured {
        line.push_str(" reconfigured");
    }
    line.push(' ');
    line.push_str(&describe_indicators(report.indicators));
    line
}

fn describe_encoder(chips: &SimChips) -> String {
    let encoder = chips.encoder();
    match encoder.config {
        _ if encoder.sleeping => "sleep".to_string(),
        Some(config) => format!(
            "{}/{}",
            match config.field_rate {
                FieldRate::Hz50 => "50hz",
                FieldRate::Hz60 => "60hz",
            },
            config.output_format.label()
        ),
        None => "unconfigured".to_string(),
    }
}

fn describe_indicators(indicators: Indicators) -> String {
    format!(
        "[cvbs={} svideo={} option={}]",
        on_off(indicators.cvbs),
        on_off(indicators.svideo),
        on_off(indicators.option)
    )
}

fn describe_selector(selector: InputSelector) -> String {
    if selector.pedestal() {
        format!("{}-pedestal", selector.physical())
    } else {
        selector.physical().to_string()
    }
}

fn color_label(color: ColorSpace) -> &'static str {
    match color {
        ColorSpace::Rgb => "rgb",
        ColorSpace::YPbPr => "ypbpr",
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS.iter().find(|(name, _)| *name == target) {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcoder_core::video::{LockState, NoiseReduction, OutputFormat};

    fn session() -> Session {
        Session::new(SessionOptions::default()).expect("boot")
    }

    #[test]
    fn boot_initialises_blank_settings() {
        let mut session = session();
        let lines = session.take_boot_lines();

        assert_eq!(lines[0], "settings: header-corrupt (format v1)");
        assert_eq!(lines[1], "settings: saved");
        assert!(session.take_boot_lines().is_empty());
    }

    #[test]
    fn locked_source_is_reconciled_on_poll() {
        let mut session = session();
        session.handle_command("signal locked component");

        let response = session.handle_command("poll");
        assert!(response.halted.is_none());
        assert_eq!(session.controller().lock(), LockState::Locked);
        assert!(
            response
                .lines
                .iter()
                .any(|line| line.contains("lock-changed"))
        );
    }

    #[test]
    fn idle_input_advances_after_threshold() {
        let mut session = session();

        session.handle_command("poll 21");
        assert_eq!(
            session.controller().chips().selected_input(),
            PhysicalInput::Cvbs
        );
    }

    #[test]
    fn press_is_debounced_into_one_action() {
        let mut session = session();
        session.handle_command("signal locked component");

        let response = session.handle_command("press both");
        assert_eq!(
            session.controller().state().output_format,
            OutputFormat::Composite
        );
        assert!(response.lines.last().is_some_and(|line| line.contains("action=")));

        session.handle_command("press advance");
        assert_eq!(
            session.controller().state().noise_reduction,
            NoiseReduction::InputOnly
        );
    }

    #[test]
    fn bus_fault_halts_by_default() {
        let mut session = session();
        session.handle_command("fail-bus");

        let response = session.handle_command("poll 5");
        assert_eq!(response.halted, Some(BusFault::new(0x20, 2)));
    }

    #[test]
    fn bus_fault_is_survived_when_configured() {
        let mut session = Session::new(SessionOptions {
            fault_policy: FaultPolicy::Continue,
            ..SessionOptions::default()
        })
        .expect("boot");
        session.handle_command("fail-bus");

        let response = session.handle_command("poll 2");
        assert!(response.halted.is_none());
        assert!(response.lines.iter().any(|line| line.starts_with("ERR ")));
        assert_eq!(session.controller().tick(), 2);
    }

    #[test]
    fn setting_change_is_persisted_once() {
        let mut session = session();

        let response = session.handle_command("set smoothing on");
        assert_eq!(response.lines.last().map(String::as_str), Some("settings: saved"));
        assert!(session.controller().state().smoothing);

        let response = session.handle_command("set smoothing on");
        assert_eq!(
            response.lines.last().map(String::as_str),
            Some("settings: unchanged")
        );
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut session = session();
        let response = session.handle_command("frobnicate");
        assert!(response.lines[0].starts_with("ERR syntax"));
    }
}
