//! Console grammar for the emulator.
//!
//! Lines are lowercased before parsing, so every keyword here is matched in
//! lowercase only.

use std::fmt;

use transcoder_core::video::{InputSelector, PhysicalInput};
use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{alt, delimited, eof, opt, preceded, separated_pair};
use winnow::prelude::*;
use winnow::token::rest;

/// Simulated source attached to a decoder input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignalLevel {
    Locked,
    FreeRun,
    None,
}

impl fmt::Display for SignalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalLevel::Locked => "locked",
            SignalLevel::FreeRun => "freerun",
            SignalLevel::None => "none",
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Press {
    Advance,
    Option,
    Both,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingChange {
    DefaultInput(InputSelector),
    PedestalPreference(bool),
    Smoothing(bool),
    DisableFreeRun(bool),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    Status,
    Poll(u32),
    Signal {
        level: SignalLevel,
        input: Option<PhysicalInput>,
    },
    Interlace(bool),
    Standard(u8),
    ColorKill(bool),
    Irq,
    Press(Press),
    Settings,
    Set(SettingChange),
    FailBus,
    Telemetry,
    Help(Option<&'a str>),
}

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("status", "status                              - show controller and chip state"),
    ("poll", "poll [n]                            - run n loop iterations (default 1)"),
    (
        "signal",
        "signal <locked|freerun|none> [input] - set the source on an input",
    ),
    ("interlace", "interlace <on|off>                  - interlaced source"),
    ("standard", "standard <0-7>                      - autodetected standard code"),
    ("color-kill", "color-kill <on|off>                 - decoder color kill"),
    ("irq", "irq                                 - assert the decoder interrupt"),
    (
        "press",
        "press <advance|option|both>         - press buttons and run one iteration",
    ),
    ("settings", "settings                            - show persisted settings"),
    (
        "set",
        "set <input|pedestal|smoothing|disable-free-run> <value> - change a setting",
    ),
    ("fail-bus", "fail-bus                            - fail the next bus transaction"),
    ("telemetry", "telemetry                           - dump the telemetry ring"),
    ("help", "help [topic]                        - show help"),
];

/// Parses one lowercased console line.
pub fn parse(line: &str) -> Result<Command<'_>, String> {
    delimited(space0, command, (space0, eof))
        .parse(line)
        .map_err(|err| err.to_string())
}

fn command<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    alt((
        "status".value(Command::Status),
        preceded("poll", opt(preceded(space1, dec_uint))).map(|n| Command::Poll(n.unwrap_or(1))),
        signal,
        preceded(("interlace", space1), on_off).map(Command::Interlace),
        preceded(("standard", space1), dec_uint.verify(|code: &u8| *code < 8))
            .map(Command::Standard),
        preceded(("color-kill", space1), on_off).map(Command::ColorKill),
        "irq".value(Command::Irq),
        preceded(("press", space1), press).map(Command::Press),
        "settings".value(Command::Settings),
        preceded(("set", space1), setting).map(Command::Set),
        "fail-bus".value(Command::FailBus),
        "telemetry".value(Command::Telemetry),
        help,
    ))
    .parse_next(input)
}

fn signal<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    let level = preceded(
        ("signal", space1),
        alt((
            "locked".value(SignalLevel::Locked),
            "freerun".value(SignalLevel::FreeRun),
            "none".value(SignalLevel::None),
        )),
    )
    .parse_next(input)?;
    let input_name = opt(preceded(space1, physical_input)).parse_next(input)?;
    Ok(Command::Signal {
        level,
        input: input_name,
    })
}

fn help<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    preceded("help", opt(preceded(space1, rest.map(str::trim))))
        .map(|topic: Option<&str>| Command::Help(topic.filter(|topic| !topic.is_empty())))
        .parse_next(input)
}

fn on_off(input: &mut &str) -> ModalResult<bool> {
    alt(("on".value(true), "off".value(false))).parse_next(input)
}

fn press(input: &mut &str) -> ModalResult<Press> {
    alt((
        "advance".value(Press::Advance),
        "option".value(Press::Option),
        "both".value(Press::Both),
    ))
    .parse_next(input)
}

fn physical_input(input: &mut &str) -> ModalResult<PhysicalInput> {
    alt((
        "cvbs".value(PhysicalInput::Cvbs),
        "svideo".value(PhysicalInput::SVideo),
        "component".value(PhysicalInput::Component),
    ))
    .parse_next(input)
}

fn input_selector(input: &mut &str) -> ModalResult<InputSelector> {
    alt((
        "cvbs-pedestal".value(InputSelector::CvbsPedestal),
        "svideo-pedestal".value(InputSelector::SVideoPedestal),
        "cvbs".value(InputSelector::Cvbs),
        "svideo".value(InputSelector::SVideo),
        "component".value(InputSelector::Component),
    ))
    .parse_next(input)
}

fn setting(input: &mut &str) -> ModalResult<SettingChange> {
    alt((
        separated_pair("input", space1, input_selector).map(|(_, s)| SettingChange::DefaultInput(s)),
        separated_pair("pedestal", space1, on_off)
            .map(|(_, on)| SettingChange::PedestalPreference(on)),
        separated_pair("smoothing", space1, on_off).map(|(_, on)| SettingChange::Smoothing(on)),
        separated_pair("disable-free-run", space1, on_off)
            .map(|(_, on)| SettingChange::DisableFreeRun(on)),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_keywords() {
        assert_eq!(parse("status"), Ok(Command::Status));
        assert_eq!(parse("  irq "), Ok(Command::Irq));
        assert_eq!(parse("settings"), Ok(Command::Settings));
        assert_eq!(parse("fail-bus"), Ok(Command::FailBus));
    }

    #[test]
    fn poll_count_defaults_to_one() {
        assert_eq!(parse("poll"), Ok(Command::Poll(1)));
        assert_eq!(parse("poll 25"), Ok(Command::Poll(25)));
        assert!(parse("poll x").is_err());
    }

    #[test]
    fn signal_accepts_optional_input() {
        assert_eq!(
            parse("signal locked"),
            Ok(Command::Signal {
                level: SignalLevel::Locked,
                input: None
            })
        );
        assert_eq!(
            parse("signal none svideo"),
            Ok(Command::Signal {
                level: SignalLevel::None,
                input: Some(PhysicalInput::SVideo)
            })
        );
    }

    #[test]
    fn standard_code_is_three_bits() {
        assert_eq!(parse("standard 4"), Ok(Command::Standard(4)));
        assert!(parse("standard 8").is_err());
    }

    #[test]
    fn set_distinguishes_pedestal_selectors() {
        assert_eq!(
            parse("set input cvbs-pedestal"),
            Ok(Command::Set(SettingChange::DefaultInput(
                InputSelector::CvbsPedestal
            )))
        );
        assert_eq!(
            parse("set input cvbs"),
            Ok(Command::Set(SettingChange::DefaultInput(InputSelector::Cvbs)))
        );
        assert_eq!(
            parse("set disable-free-run on"),
            Ok(Command::Set(SettingChange::DisableFreeRun(true)))
        );
    }

    #[test]
    fn help_topic_is_optional() {
        assert_eq!(parse("help"), Ok(Command::Help(None)));
        assert_eq!(parse("help press"), Ok(Command::Help(Some("press"))));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(parse("status now").is_err());
        assert!(parse("press everything").is_err());
    }
}
