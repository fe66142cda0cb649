//! Persisted configuration storage in the last two flash pages.
//!
//! STM32F103 flash programs in half-words and can always clear bits of an
//! already-programmed word, which is what lets `invalidate` zero a page's
//! magic without erasing anything.

use embassy_stm32::flash::{Blocking, Flash};
use serial_core::config::{ConfigFlash, FlashError, CONFIG_BLOB_SIZE, CONFIG_PAGES};

/// Flash size of the F103C8.
const FLASH_SIZE: u32 = 64 * 1024;

/// Erase-page size on low/medium-density parts.
const PAGE_SIZE: u32 = 1024;

/// The two configuration pages sit at the very top of flash, out of the
/// firmware image's way.
const PAGE_OFFSETS: [u32; CONFIG_PAGES] = [FLASH_SIZE - 2 * PAGE_SIZE, FLASH_SIZE - PAGE_SIZE];

pub struct BoardFlash {
    flash: Flash<'static, Blocking>,
}

impl BoardFlash {
    pub fn new(flash: Flash<'static, Blocking>) -> Self {
        Self { flash }
    }
}

impl ConfigFlash for BoardFlash {
    fn read(&mut self, page: usize, buf: &mut [u8; CONFIG_BLOB_SIZE]) {
        if self.flash.blocking_read(PAGE_OFFSETS[page], buf).is_err() {
            // an unreadable page must not validate
            buf.fill(0);
        }
    }

    fn write(&mut self, page: usize, blob: &[u8; CONFIG_BLOB_SIZE]) -> Result<(), FlashError> {
        let offset = PAGE_OFFSETS[page];
        self.flash
            .blocking_erase(offset, offset + PAGE_SIZE)
            .map_err(|_| FlashError)?;
        self.flash
            .blocking_write(offset, blob)
            .map_err(|_| FlashError)
    }

    fn invalidate(&mut self, page: usize) -> Result<(), FlashError> {
        self.flash
            .blocking_write(PAGE_OFFSETS[page], &[0u8; 4])
            .map_err(|_| FlashError)
    }
}
