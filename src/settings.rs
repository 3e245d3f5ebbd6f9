use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::overlay::geometry::Size;
use crate::overlay::raster::Rgba;
use crate::overlay::toolkit::WindowConfig;
use crate::overlay::transform::ScaleLimits;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BorderColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BorderColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self) -> Rgba {
        Rgba::rgba(self.r, self.g, self.b, 255)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySettings {
    #[serde(default = "default_window_width")]
    pub window_width: f64,
    #[serde(default = "default_window_height")]
    pub window_height: f64,
    #[serde(default = "default_true")]
    pub transparent: bool,
    #[serde(default = "default_true")]
    pub frameless: bool,
    #[serde(default = "default_true")]
    pub resizable: bool,
    #[serde(default = "default_border_width")]
    pub border_width: f64,
    #[serde(default = "default_border_color")]
    pub border_color: BorderColor,
    #[serde(default)]
    pub border_hidden: bool,
    #[serde(default = "default_opacity")]
    pub initial_opacity: f32,
    #[serde(default = "default_opacity_step")]
    pub opacity_step: f32,
    #[serde(default = "default_min_opacity")]
    pub min_opacity: f32,
    #[serde(default = "default_max_opacity")]
    pub max_opacity: f32,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    /// Smallest window side, in logical pixels. Matches the viewport's
    /// minimum inner size so window zoom never asks for less.
    #[serde(default = "default_min_window_size")]
    pub min_window_size: f64,
    /// Wait between hiding the window and grabbing the screen. Empirical; the
    /// compositor needs a moment to drop the window from the back buffer.
    #[serde(default = "default_capture_settle_delay_ms")]
    pub capture_settle_delay_ms: u64,
    #[serde(default = "default_programmatic_move_grace_ms")]
    pub programmatic_move_grace_ms: u64,
    #[serde(default = "default_color_key_tolerance")]
    pub color_key_tolerance: f64,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

fn default_window_width() -> f64 {
    1200.0
}

fn default_window_height() -> f64 {
    800.0
}

fn default_true() -> bool {
    true
}

fn default_border_width() -> f64 {
    2.0
}

fn default_border_color() -> BorderColor {
    BorderColor::rgb(255, 0, 0)
}

fn default_opacity() -> f32 {
    0.1
}

fn default_opacity_step() -> f32 {
    0.05
}

fn default_min_opacity() -> f32 {
    0.05
}

fn default_max_opacity() -> f32 {
    0.95
}

fn default_zoom_step() -> f64 {
    1.1
}

fn default_min_scale() -> f64 {
    0.05
}

fn default_max_scale() -> f64 {
    20.0
}

fn default_min_window_size() -> f64 {
    40.0
}

fn default_capture_settle_delay_ms() -> u64 {
    200
}

fn default_programmatic_move_grace_ms() -> u64 {
    50
}

fn default_color_key_tolerance() -> f64 {
    30.0
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            transparent: true,
            frameless: true,
            resizable: true,
            border_width: default_border_width(),
            border_color: default_border_color(),
            border_hidden: false,
            initial_opacity: default_opacity(),
            opacity_step: default_opacity_step(),
            min_opacity: default_min_opacity(),
            max_opacity: default_max_opacity(),
            zoom_step: default_zoom_step(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            min_window_size: default_min_window_size(),
            capture_settle_delay_ms: default_capture_settle_delay_ms(),
            programmatic_move_grace_ms: default_programmatic_move_grace_ms(),
            color_key_tolerance: default_color_key_tolerance(),
            debug_logging: false,
            log_file: None,
            export_dir: None,
        }
    }
}

/// Result of [`OverlaySettings::load`]. Loading happens before logging is
/// up, so the repair is reported to the caller instead of logged.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: OverlaySettings,
    pub repaired: bool,
}

impl OverlaySettings {
    pub fn load(path: &str) -> anyhow::Result<LoadedSettings> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(LoadedSettings {
                settings: Self::default(),
                repaired: false,
            });
        }
        let mut settings: Self = serde_json::from_str(&content)?;
        let repaired = settings.sanitize();
        Ok(LoadedSettings { settings, repaired })
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Repairs values the engine cannot work with. Returns `true` when
    /// anything changed.
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();
        let defaults = Self::default();

        if !(self.window_width > 0.0) {
            self.window_width = defaults.window_width;
        }
        if !(self.window_height > 0.0) {
            self.window_height = defaults.window_height;
        }
        if !(self.border_width >= 0.0) {
            self.border_width = defaults.border_width;
        }
        if !(self.min_opacity >= 0.0 && self.max_opacity <= 1.0 && self.min_opacity <= self.max_opacity)
        {
            self.min_opacity = defaults.min_opacity;
            self.max_opacity = defaults.max_opacity;
        }
        if !(self.opacity_step > 0.0) {
            self.opacity_step = defaults.opacity_step;
        }
        self.initial_opacity = if self.initial_opacity.is_finite() {
            self.initial_opacity.clamp(self.min_opacity, self.max_opacity)
        } else {
            defaults.initial_opacity
        };
        if !(self.zoom_step > 1.0) {
            self.zoom_step = defaults.zoom_step;
        }
        if !(self.min_scale > 0.0 && self.min_scale <= 1.0 && self.max_scale >= 1.0) {
            self.min_scale = defaults.min_scale;
            self.max_scale = defaults.max_scale;
        }
        if !(self.min_window_size >= 1.0) {
            self.min_window_size = defaults.min_window_size;
        }
        if !(0.0..=100.0).contains(&self.color_key_tolerance) {
            self.color_key_tolerance = defaults.color_key_tolerance;
        }

        *self != before
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            size: Size::new(self.window_width, self.window_height),
            transparent: self.transparent,
            frameless: self.frameless,
            resizable: self.resizable,
        }
    }

    pub fn effective_border_width(&self) -> f64 {
        if self.border_hidden {
            0.0
        } else {
            self.border_width
        }
    }

    pub fn scale_limits(&self) -> ScaleLimits {
        ScaleLimits {
            min: self.min_scale,
            max: self.max_scale,
        }
    }

    pub fn capture_settle_delay(&self) -> Duration {
        Duration::from_millis(self.capture_settle_delay_ms)
    }

    pub fn programmatic_move_grace(&self) -> Duration {
        Duration::from_millis(self.programmatic_move_grace_ms)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs_next::picture_dir)
            .or_else(dirs_next::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
