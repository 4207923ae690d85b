//! Counter-based button debouncing.
//!
//! `sample` runs from the periodic tick context and never touches a bus;
//! `read` runs from the main loop and consumes the latched press edge. The two
//! halves share state only through whatever lock the integrator wraps around
//! [`ButtonBank`].

/// Default number of consecutive differing ticks before a level change is accepted.
pub const DEFAULT_DEBOUNCE_TICKS: u8 = 5;

/// Debounce state for a single active-high button input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DebouncedButton {
    raw: bool,
    stable: bool,
    counter: u8,
    window: u8,
    edge: bool,
}

impl DebouncedButton {
    /// Creates a released button that requires `window` differing ticks per change.
    ///
    /// A window of zero is treated as one so every accepted change still needs
    /// a differing sample.
    #[must_use]
    pub const fn new(window: u8) -> Self {
        Self {
            raw: false,
            stable: false,
            counter: 0,
            window: if window == 0 { 1 } else { window },
            edge: false,
        }
    }

    /// Feeds one raw sample. Bounded work, safe for interrupt context.
    pub fn sample(&mut self, pressed: bool) {
        self.raw = pressed;
        if self.raw == self.stable {
            self.counter = 0;
            return;
        }

        self.counter = self.counter.saturating_add(1);
        if self.counter >= self.window {
            self.stable = self.raw;
            self.counter = 0;
            if self.stable {
                self.edge = true;
            }
        }
    }

    /// Returns `true` once per debounced press and clears the latch.
    pub fn read(&mut self) -> bool {
        core::mem::replace(&mut self.edge, false)
    }

    /// Debounced level.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.stable
    }

    #[must_use]
    pub const fn window(&self) -> u8 {
        self.window
    }
}

impl Default for DebouncedButton {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_TICKS)
    }
}

/// Press edges consumed from the bank during one main-loop iteration.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ButtonEdges {
    pub advance: bool,
    pub option: bool,
}

impl ButtonEdges {
    pub const NONE: Self = Self {
        advance: false,
        option: false,
    };

    #[must_use]
    pub const fn any(self) -> bool {
        self.advance || self.option
    }
}

/// The two front-panel buttons.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonBank {
    advance: DebouncedButton,
    option: DebouncedButton,
}

impl ButtonBank {
    #[must_use]
    pub const fn new(window: u8) -> Self {
        Self {
            advance: DebouncedButton::new(window),
            option: DebouncedButton::new(window),
        }
    }

    /// Samples both buttons on the same tick.
    pub fn sample(&mut self, advance_pressed: bool, option_pressed: bool) {
        self.advance.sample(advance_pressed);
        self.option.sample(option_pressed);
    }

    /// Consumes both latched edges in a single call.
    pub fn take_edges(&mut self) -> ButtonEdges {
        ButtonEdges {
            advance: self.advance.read(),
            option: self.option.read(),
        }
    }

    #[must_use]
    pub const fn advance(&self) -> &DebouncedButton {
        &self.advance
    }

    #[must_use]
    pub const fn option(&self) -> &DebouncedButton {
        &self.option
    }
}

impl Default for ButtonBank {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_TICKS)
    }
}
