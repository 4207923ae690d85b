mod support;

use support::{
    ChipCall, STATUS1_COLOR_KILL, STATUS1_LOCKED, STATUS1_PAL, STATUS3_50HZ, STATUS3_FREERUN,
    STATUS3_INTERLACED, idle, started,
};
use transcoder_core::debounce::ButtonEdges;
use transcoder_core::policy::OutputDecision;
use transcoder_core::settings::Settings;
use transcoder_core::telemetry::{TelemetryEventKind, TelemetryPayload};
use transcoder_core::video::{FieldRate, InterlaceState, LockState, VideoStandard};

#[test]
fn freerun_clearing_while_locked_reconfigures_once() {
    let mut controller = started(&Settings::defaults());
    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED, STATUS3_FREERUN | STATUS3_INTERLACED);

    idle(&mut controller, 1);
    assert_eq!(controller.lock(), LockState::RunningFree);
    controller.chips_mut().clear_calls();

    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED, STATUS3_INTERLACED);
    let report = controller
        .poll(ButtonEdges::NONE, true)
        .expect("interrupt poll");

    assert!(report.reconfigured);
    assert_eq!(controller.lock(), LockState::Locked);

    // The scheduled follow-up sees the same registers and stays quiet.
    let follow_up = controller
        .poll(ButtonEdges::NONE, false)
        .expect("follow-up poll");
    assert!(follow_up.polled);
    assert!(!follow_up.reconfigured);

    let chips = controller.chips();
    assert_eq!(chips.encoder_setups().len(), 1);
    assert_eq!(
        chips.count(|call| matches!(call, ChipCall::DecoderOutput(_))),
        1
    );

    let locked_changes = controller
        .telemetry()
        .oldest_first()
        .filter(|record| {
            record.details
                == TelemetryPayload::Lock {
                    from: LockState::RunningFree,
                    to: LockState::Locked,
                }
        })
        .count();
    assert_eq!(locked_changes, 1);
}

#[test]
fn interrupt_clears_groups_and_polls_exactly_once_more() {
    let mut controller = started(&Settings::defaults());
    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED, STATUS3_INTERLACED);
    idle(&mut controller, 2);
    controller.chips_mut().clear_calls();

    let interrupt = controller
        .poll(ButtonEdges::NONE, true)
        .expect("interrupt poll");
    assert!(interrupt.polled);
    assert_eq!(
        controller
            .chips()
            .count(|call| matches!(call, ChipCall::ClearInterrupts)),
        1
    );

    let follow_up = controller.poll(ButtonEdges::NONE, false).expect("poll");
    assert!(follow_up.polled, "one unconditional poll after an interrupt");

    let quiet = controller.poll(ButtonEdges::NONE, false).expect("poll");
    assert!(!quiet.polled, "back to interrupt-only triggering");
    assert_eq!(
        controller
            .chips()
            .count(|call| matches!(call, ChipCall::ClearInterrupts)),
        1
    );
}

#[test]
fn standard_change_reconfigures_encoder_with_field_rate() {
    let mut controller = started(&Settings::defaults());
    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED, STATUS3_INTERLACED);
    idle(&mut controller, 2);
    controller.chips_mut().clear_calls();

    controller.chips_mut().set_status(
        STATUS1_LOCKED | STATUS1_PAL,
        STATUS3_INTERLACED | STATUS3_50HZ,
    );
    let report = controller.poll(ButtonEdges::NONE, true).expect("poll");

    assert!(report.reconfigured);
    assert_eq!(
        controller.reconciler().standard(),
        Some(VideoStandard::PalBghid)
    );
    let setups = controller.chips().encoder_setups();
    assert_eq!(setups.len(), 1);
    assert_eq!(setups[0].field_rate, FieldRate::Hz50);
    assert_eq!(setups[0].lock, LockState::Locked);
    assert_eq!(setups[0].interlace, InterlaceState::Interlaced);
}

#[test]
fn interlace_transitions_are_tracked_both_ways() {
    let mut controller = started(&Settings::defaults());
    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED, STATUS3_INTERLACED);
    idle(&mut controller, 2);
    assert_eq!(controller.reconciler().interlace(), InterlaceState::Interlaced);

    controller.chips_mut().set_status(STATUS1_LOCKED, 0);
    let report = controller.poll(ButtonEdges::NONE, true).expect("poll");
    assert!(report.reconfigured);
    assert_eq!(
        controller.reconciler().interlace(),
        InterlaceState::Progressive
    );
}

#[test]
fn outputs_follow_lock_when_freerun_disabled() {
    let settings = Settings {
        disable_free_run: true,
        ..Settings::defaults()
    };
    let mut controller = started(&settings);

    controller
        .chips_mut()
        .set_status(0, STATUS3_FREERUN | STATUS3_INTERLACED);
    idle(&mut controller, 1);
    assert!(
        controller
            .chips()
            .calls
            .contains(&ChipCall::DecoderOutput(OutputDecision::DISABLED))
    );
    let setups = controller.chips().encoder_setups();
    assert_eq!(setups.last().map(|c| c.output), Some(OutputDecision::DISABLED));

    controller.chips_mut().clear_calls();
    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED, STATUS3_INTERLACED);
    controller.poll(ButtonEdges::NONE, true).expect("poll");
    assert!(
        controller
            .chips()
            .calls
            .contains(&ChipCall::DecoderOutput(OutputDecision::ENABLED))
    );
}

#[test]
fn test_pattern_build_keeps_outputs_enabled_in_freerun() {
    let mut controller = started(&Settings::defaults());
    controller
        .chips_mut()
        .set_status(0, STATUS3_FREERUN | STATUS3_INTERLACED);
    idle(&mut controller, 1);

    assert!(
        controller
            .chips()
            .encoder_setups()
            .iter()
            .all(|config| config.output == OutputDecision::ENABLED)
    );
}

#[test]
fn color_kill_switches_chroma_once_per_transition() {
    let mut controller = started(&Settings::defaults());
    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED | STATUS1_COLOR_KILL, STATUS3_INTERLACED);

    let first = controller.poll(ButtonEdges::NONE, false).expect("poll");
    assert_eq!(first.chroma, Some(false));
    assert!(first.indicators.option);
    idle(&mut controller, 3);

    controller
        .chips_mut()
        .set_status(STATUS1_LOCKED, STATUS3_INTERLACED);
    let cleared = controller.poll(ButtonEdges::NONE, false).expect("poll");
    assert_eq!(cleared.chroma, Some(true));
    assert!(!cleared.indicators.option);

    let chroma_writes = controller
        .chips()
        .count(|call| matches!(call, ChipCall::Chroma(_)));
    assert_eq!(chroma_writes, 2);

    let chroma_events = controller
        .telemetry()
        .oldest_first()
        .filter(|record| record.event == TelemetryEventKind::ChromaChanged)
        .count();
    assert_eq!(chroma_events, 2);
}
