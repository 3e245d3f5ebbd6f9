use crate::overlay::geometry::Rect;
use crate::overlay::raster::RgbaBuffer;
use crate::overlay::toolkit::{DisplayInfo, DisplayService};
use anyhow::{Context, Result};
use screenshots::Screen;

/// Displays and full-screen grabs through the `screenshots` crate. Both
/// lists come from `Screen::all()`, so their order matches.
#[derive(Debug, Default)]
pub struct ScreenDisplays;

impl ScreenDisplays {
    pub fn new() -> Self {
        Self
    }
}

fn display_info(index: usize, screen: &Screen) -> DisplayInfo {
    let info = &screen.display_info;
    DisplayInfo {
        index,
        bounds: Rect::new(
            info.x as f64,
            info.y as f64,
            info.width as f64,
            info.height as f64,
        ),
        scale_factor: info.scale_factor as f64,
    }
}

impl DisplayService for ScreenDisplays {
    fn list_displays(&self) -> Result<Vec<DisplayInfo>> {
        let screens = Screen::all().context("enumerating displays")?;
        Ok(screens
            .iter()
            .enumerate()
            .map(|(index, screen)| display_info(index, screen))
            .collect())
    }

    fn capture_screen_sources(&mut self, size_hint: (u32, u32)) -> Result<Vec<RgbaBuffer>> {
        let screens = Screen::all().context("enumerating displays")?;
        tracing::debug!(count = screens.len(), ?size_hint, "capturing screens");
        screens
            .iter()
            .map(|screen| {
                let image = screen
                    .capture()
                    .with_context(|| format!("capturing display {}", screen.display_info.id))?;
                Ok(RgbaBuffer::from_image(image))
            })
            .collect()
    }
}
