//! Input auto-cycling and button action mapping.

use crate::debounce::ButtonEdges;
use crate::video::PhysicalInput;

/// Inactive polls tolerated on one input; the next inactive poll after
/// these advances to the successor.
pub const DEFAULT_IDLE_THRESHOLD: u16 = 20;

/// Advances through the physical inputs while no signal is present.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InputCycler {
    current: PhysicalInput,
    idle_polls: u16,
    threshold: u16,
}

impl InputCycler {
    #[must_use]
    pub const fn new(current: PhysicalInput, threshold: u16) -> Self {
        Self {
            current,
            idle_polls: 0,
            threshold,
        }
    }

    /// Records one main-loop iteration.
    ///
    /// Returns the newly selected input once the idle counter exceeds the
    /// threshold.
    pub fn observe(&mut self, activity: bool) -> Option<PhysicalInput> {
        if activity {
            self.idle_polls = 0;
            return None;
        }

        self.idle_polls = self.idle_polls.saturating_add(1);
        if self.idle_polls > self.threshold {
            self.idle_polls = 0;
            self.current = self.current.next();
            Some(self.current)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn current(&self) -> PhysicalInput {
        self.current
    }

    #[must_use]
    pub const fn idle_polls(&self) -> u16 {
        self.idle_polls
    }
}

/// User action derived from the buttons pressed during one iteration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonAction {
    /// Option alone: next video range / color space.
    NextDisplayMode,
    /// Advance alone: next noise reduction placement.
    NextNoiseReduction,
    /// Both together: component / composite output.
    ToggleOutputFormat,
}

impl ButtonAction {
    #[must_use]
    pub const fn from_edges(edges: ButtonEdges) -> Option<Self> {
        match (edges.advance, edges.option) {
            (true, true) => Some(ButtonAction::ToggleOutputFormat),
            (true, false) => Some(ButtonAction::NextNoiseReduction),
            (false, true) => Some(ButtonAction::NextDisplayMode),
            (false, false) => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ButtonAction::NextDisplayMode => "display-mode",
            ButtonAction::NextNoiseReduction => "noise-reduction",
            ButtonAction::ToggleOutputFormat => "output-format",
        }
    }
}
