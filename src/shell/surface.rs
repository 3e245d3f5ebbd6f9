//! Shared state between the session's toolkit/presenter seams and the
//! eframe app that actually owns the viewport.
//!
//! The seams only record: bounds writes and visibility changes become
//! queued viewport commands, presenter calls become paint state. The app
//! flushes the queue once per frame.
//!
//! Hiding never sends `Visible(false)`. An invisible viewport gets no
//! redraws on some backends, and the frame loop is what finishes a capture
//! and shows the window again. Instead the window is parked off-screen and
//! paints nothing until it is shown.

use crate::overlay::geometry::{IntRect, Point, Rect, Size};
use crate::overlay::raster::{render_view, LayerPlacement, Rgba, RgbaBuffer};
use crate::overlay::toolkit::{Presenter, WindowId, WindowToolkit};
use crate::shell::viewport::ViewportCtx;
use anyhow::{bail, Result};
use eframe::egui;
use std::cell::RefCell;
use std::rc::Rc;

/// Where a hidden window waits, far outside any real display.
pub const PARKED_POSITION: egui::Pos2 = egui::pos2(-32000.0, -32000.0);

#[derive(Debug, Clone)]
pub struct ShellState {
    pub window: WindowId,
    /// Last outer rectangle reported by the viewport, in points.
    pub os_outer: IntRect,
    pub pixels_per_point: f32,
    pub alive: bool,
    /// `false` while parked; the app paints nothing.
    pub visible: bool,
    /// Position to return to when a parked window is shown.
    parked_from: Option<IntRect>,
    pub background: Option<RgbaBuffer>,
    /// Bumped on every background change so the texture can be re-uploaded.
    pub background_generation: u64,
    pub layer: Option<LayerPlacement>,
    pub opacity: f32,
    pub border_width: f64,
    pub border_color: Rgba,
    pending: Vec<egui::ViewportCommand>,
}

impl ShellState {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            os_outer: IntRect::default(),
            pixels_per_point: 1.0,
            alive: true,
            visible: true,
            parked_from: None,
            background: None,
            background_generation: 0,
            layer: None,
            opacity: 0.0,
            border_width: 0.0,
            border_color: Rgba::TRANSPARENT,
            pending: Vec::new(),
        }
    }

    pub fn pending_commands(&self) -> &[egui::ViewportCommand] {
        &self.pending
    }
}

/// Cloneable handle; one copy is boxed as the toolkit, one as the presenter
/// and one stays with the app.
#[derive(Debug, Clone)]
pub struct EguiSurface {
    state: Rc<RefCell<ShellState>>,
}

impl EguiSurface {
    pub fn new(window: WindowId) -> Self {
        Self {
            state: Rc::new(RefCell::new(ShellState::new(window))),
        }
    }

    pub fn state(&self) -> std::cell::Ref<'_, ShellState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> std::cell::RefMut<'_, ShellState> {
        self.state.borrow_mut()
    }

    /// Sends every queued command, in order, and asks for a repaint if any
    /// were sent.
    pub fn flush(&self, ctx: &impl ViewportCtx) -> usize {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        let count = pending.len();
        for cmd in pending {
            ctx.send_viewport_cmd(cmd);
        }
        if count > 0 {
            ctx.request_repaint();
        }
        count
    }

    fn check(&self, id: WindowId) -> Result<()> {
        let state = self.state.borrow();
        if state.window != id {
            bail!("unknown window {id}");
        }
        if !state.alive {
            bail!("window {id} is closed");
        }
        Ok(())
    }
}

impl WindowToolkit for EguiSurface {
    fn outer_bounds(&self, id: WindowId) -> Result<IntRect> {
        self.check(id)?;
        Ok(self.state.borrow().os_outer)
    }

    fn set_bounds(&mut self, id: WindowId, bounds: IntRect) -> Result<()> {
        self.check(id)?;
        let mut state = self.state.borrow_mut();
        state.pending.push(egui::ViewportCommand::OuterPosition(egui::pos2(
            bounds.x as f32,
            bounds.y as f32,
        )));
        state.pending.push(egui::ViewportCommand::InnerSize(egui::vec2(
            bounds.width as f32,
            bounds.height as f32,
        )));
        Ok(())
    }

    fn hide(&mut self, id: WindowId) -> Result<()> {
        self.check(id)?;
        let mut state = self.state.borrow_mut();
        if state.parked_from.is_none() {
            state.parked_from = Some(state.os_outer);
        }
        state.visible = false;
        state
            .pending
            .push(egui::ViewportCommand::OuterPosition(PARKED_POSITION));
        Ok(())
    }

    fn show(&mut self, id: WindowId) -> Result<()> {
        self.check(id)?;
        let mut state = self.state.borrow_mut();
        if let Some(home) = state.parked_from.take() {
            state.pending.push(egui::ViewportCommand::OuterPosition(egui::pos2(
                home.x as f32,
                home.y as f32,
            )));
        }
        state.visible = true;
        state.pending.push(egui::ViewportCommand::Focus);
        Ok(())
    }

    fn is_alive(&self, id: WindowId) -> bool {
        let state = self.state.borrow();
        state.window == id && state.alive
    }

    /// Re-renders the presented layer in software at the viewport's pixel
    /// density, which is what the user sees minus the tinted background.
    fn capture_page(&mut self, id: WindowId, rect: Rect) -> Result<RgbaBuffer> {
        self.check(id)?;
        let state = self.state.borrow();
        let ppp = state.pixels_per_point.max(f32::EPSILON) as f64;
        let border = state.border_width;
        let view = rect.translate(Point::new(-border, -border));
        let out = match (&state.background, state.layer) {
            (Some(source), Some(placement)) => render_view(source, placement, view, ppp),
            _ => render_view(
                &RgbaBuffer::new(0, 0, Rgba::TRANSPARENT),
                LayerPlacement {
                    size: Size::new(0.0, 0.0),
                    position: Point::ZERO,
                },
                view,
                ppp,
            ),
        };
        Ok(out)
    }
}

impl Presenter for EguiSurface {
    fn set_background(&mut self, _id: WindowId, image: Option<&RgbaBuffer>) {
        let mut state = self.state.borrow_mut();
        state.background = image.cloned();
        state.background_generation += 1;
        if state.background.is_none() {
            state.layer = None;
        }
    }

    fn set_layer(&mut self, _id: WindowId, size: Size, position: Point) {
        self.state.borrow_mut().layer = Some(LayerPlacement { size, position });
    }

    fn set_opacity(&mut self, _id: WindowId, opacity: f32) {
        self.state.borrow_mut().opacity = opacity;
    }

    fn set_border(&mut self, _id: WindowId, width: f64, color: Rgba) {
        let mut state = self.state.borrow_mut();
        state.border_width = width;
        state.border_color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::EguiSurface;
    use crate::overlay::geometry::{IntRect, Point, Rect, Size};
    use crate::overlay::raster::{Rgba, RgbaBuffer};
    use crate::overlay::toolkit::{Presenter, WindowId, WindowToolkit};
    use eframe::egui;

    const ID: WindowId = WindowId(1);

    #[test]
    fn bounds_write_queues_position_then_size() {
        let mut surface = EguiSurface::new(ID);
        surface
            .set_bounds(ID, IntRect::new(10, 20, 300, 200))
            .unwrap();
        assert_eq!(surface.state().pending_commands().len(), 2);
        assert!(surface.set_bounds(WindowId(9), IntRect::default()).is_err());
    }

    #[test]
    fn capture_page_renders_layer_inside_border() {
        let mut surface = EguiSurface::new(ID);
        let red = Rgba::rgba(255, 0, 0, 255);
        surface.set_border(ID, 2.0, red);
        surface.set_background(ID, Some(&RgbaBuffer::new(4, 4, red)));
        surface.set_layer(ID, Size::new(4.0, 4.0), Point::ZERO);

        let raster = surface
            .capture_page(ID, Rect::new(2.0, 2.0, 6.0, 6.0))
            .unwrap();
        assert_eq!((raster.width, raster.height), (6, 6));
        assert_eq!(raster.pixel(0, 0), red);
        assert_eq!(raster.pixel(5, 5), Rgba::TRANSPARENT);
    }

    #[test]
    fn hide_parks_off_screen_and_show_returns_home() {
        let mut surface = EguiSurface::new(ID);
        surface.state_mut().os_outer = IntRect::new(40, 30, 300, 200);

        surface.hide(ID).unwrap();
        assert!(!surface.state().visible);
        // The app reports the parked position on its next frame.
        surface.state_mut().os_outer = IntRect::new(-32000, -32000, 300, 200);
        surface.hide(ID).unwrap();
        surface.show(ID).unwrap();

        let state = surface.state();
        assert!(state.visible);
        let commands = state.pending_commands();
        assert!(!commands
            .iter()
            .any(|cmd| matches!(cmd, egui::ViewportCommand::Visible(_))));
        assert!(matches!(
            commands[2],
            egui::ViewportCommand::OuterPosition(pos) if pos == egui::pos2(40.0, 30.0)
        ));
    }

    #[test]
    fn clearing_background_drops_layer() {
        let mut surface = EguiSurface::new(ID);
        surface.set_layer(ID, Size::new(1.0, 1.0), Point::ZERO);
        surface.set_background(ID, None);
        assert!(surface.state().layer.is_none());
        assert_eq!(surface.state().background_generation, 1);
    }
}
