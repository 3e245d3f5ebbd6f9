use crate::overlay::raster::RgbaBuffer;
use crate::overlay::toolkit::ClipboardService;
use anyhow::{Context, Result};
use std::borrow::Cow;

/// System clipboard via `arboard`. A fresh handle is opened per call; on
/// some platforms a long-lived handle goes stale after another app writes.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardService for SystemClipboard {
    fn write_image(&mut self, image: &RgbaBuffer) -> Result<()> {
        let mut cb = arboard::Clipboard::new().context("opening clipboard")?;
        cb.set_image(arboard::ImageData {
            width: image.width as usize,
            height: image.height as usize,
            bytes: Cow::Borrowed(&image.pixels),
        })
        .context("writing image to clipboard")?;
        Ok(())
    }

    fn read_image(&mut self) -> Result<Option<RgbaBuffer>> {
        let mut cb = arboard::Clipboard::new().context("opening clipboard")?;
        match cb.get_image() {
            Ok(img) => {
                let buffer =
                    RgbaBuffer::from_pixels(img.width as u32, img.height as u32, img.bytes.into_owned())?;
                Ok(Some(buffer))
            }
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
