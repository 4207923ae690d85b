use embassy_stm32::flash::{Blocking, Error, FLASH_SIZE, Flash};
use transcoder_core::settings::{SettingsRecord, SettingsStorage};

/// Erase granularity of the G0 flash.
const PAGE_SIZE: u32 = 2048;

/// Settings live in the last flash page, clear of the firmware image.
#[allow(clippy::cast_possible_truncation)]
const SETTINGS_OFFSET: u32 = FLASH_SIZE as u32 - PAGE_SIZE;

/// [`SettingsStorage`] over the internal flash.
pub struct FlashSettings {
    flash: Flash<'static, Blocking>,
}

impl FlashSettings {
    pub fn new(flash: Flash<'static, Blocking>) -> Self {
        Self { flash }
    }
}

impl SettingsStorage for FlashSettings {
    type Error = Error;

    fn read(&mut self, record: &mut SettingsRecord) -> Result<(), Self::Error> {
        self.flash.blocking_read(SETTINGS_OFFSET, record)
    }

    fn write(&mut self, record: &SettingsRecord) -> Result<(), Self::Error> {
        self.flash
            .blocking_erase(SETTINGS_OFFSET, SETTINGS_OFFSET + PAGE_SIZE)?;
        self.flash.blocking_write(SETTINGS_OFFSET, record)
    }
}
