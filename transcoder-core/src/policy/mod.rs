//! Output enablement policy.

use crate::video::LockState;

/// Decoder and encoder output posture for one lock state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OutputDecision {
    /// Decoder output drivers active (otherwise tristated).
    pub enable_driver: bool,
    /// Encoder DACs put to sleep; encoder setup stops after this.
    pub request_sleep: bool,
}

impl OutputDecision {
    pub const ENABLED: Self = Self {
        enable_driver: true,
        request_sleep: false,
    };

    pub const DISABLED: Self = Self {
        enable_driver: false,
        request_sleep: true,
    };
}

/// Pure mapping from lock state to output posture.
pub struct OutputPolicy;

impl OutputPolicy {
    /// Outputs are disabled only when `disable_on_freerun` is set and the
    /// decoder is not locked.
    #[must_use]
    pub const fn decide(lock: LockState, disable_on_freerun: bool) -> OutputDecision {
        if disable_on_freerun && !matches!(lock, LockState::Locked) {
            OutputDecision::DISABLED
        } else {
            OutputDecision::ENABLED
        }
    }

    /// Combines the build-time test pattern option with the user setting.
    #[must_use]
    pub const fn disable_on_freerun(freerun_test_pattern: bool, disable_free_run: bool) -> bool {
        !freerun_test_pattern || disable_free_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_clear_always_enables() {
        for lock in [LockState::Unknown, LockState::RunningFree, LockState::Locked] {
            assert_eq!(OutputPolicy::decide(lock, false), OutputDecision::ENABLED);
        }
    }

    #[test]
    fn flag_set_disables_unless_locked() {
        assert_eq!(
            OutputPolicy::decide(LockState::Locked, true),
            OutputDecision::ENABLED
        );
        assert_eq!(
            OutputPolicy::decide(LockState::RunningFree, true),
            OutputDecision::DISABLED
        );
        assert_eq!(
            OutputPolicy::decide(LockState::Unknown, true),
            OutputDecision::DISABLED
        );
    }

    #[test]
    fn test_pattern_build_keeps_outputs_unless_user_opts_out() {
        assert!(!OutputPolicy::disable_on_freerun(true, false));
        assert!(OutputPolicy::disable_on_freerun(true, true));
        assert!(OutputPolicy::disable_on_freerun(false, false));
    }
}
