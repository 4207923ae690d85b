//! Button bank shared between the tick task and the control loop.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use transcoder_core::debounce::{ButtonBank, ButtonEdges};

/// Debounced buttons behind a blocking mutex.
///
/// The tick task only calls [`SharedButtons::sample`]; the control loop only
/// calls [`SharedButtons::take_edges`]. Edges latch until taken, so a press
/// is never lost between loop iterations.
pub struct SharedButtons<M: RawMutex> {
    bank: Mutex<M, RefCell<ButtonBank>>,
}

impl<M: RawMutex> SharedButtons<M> {
    #[must_use]
    pub const fn new(window: u8) -> Self {
        Self {
            bank: Mutex::new(RefCell::new(ButtonBank::new(window))),
        }
    }

    /// Feeds one raw sample per button; `true` means pressed.
    pub fn sample(&self, advance_pressed: bool, option_pressed: bool) {
        self.bank
            .lock(|bank| bank.borrow_mut().sample(advance_pressed, option_pressed));
    }

    pub fn take_edges(&self) -> ButtonEdges {
        self.bank.lock(|bank| bank.borrow_mut().take_edges())
    }
}
