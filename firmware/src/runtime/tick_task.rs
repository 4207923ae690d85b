use embassy_stm32::gpio::Input;
use embassy_time::{Duration, Ticker};

use super::BUTTONS;

/// Samples both active-low buttons once per tick.
#[embassy_executor::task]
pub async fn run(advance: Input<'static>, option: Input<'static>, period: Duration) -> ! {
    let mut ticker = Ticker::every(period);
    loop {
        BUTTONS.sample(advance.is_low(), option.is_low());
        ticker.next().await;
    }
}
