//! GameView: projects the scene into a terminal framebuffer.
//!
//! The tower is drawn twice, as two elevations: a front view (world `x`
//! across, `y` up) and a side view (world `z` across, `y` up). Together they
//! show the overhang along both movement axes. The camera follows the top of
//! the tower so the mover is always on screen.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::core::GameSnapshot;
use crate::fb::{CellStyle, FrameBuffer, Rgb};
use crate::scene::{Scene, SceneBlock};
use crate::types::{Axis, Phase, BASE_LAYERS};

/// Rows kept free above the tower top.
const HEADROOM: f32 = 6.0;

/// Width of the HUD column on the right.
const HUD_W: i32 = 18;

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub enabled: bool,
    pub client_count: u16,
    pub controller_id: Option<usize>,
    pub streaming_count: u16,
}

/// Inner drawing area of one elevation panel, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Panel {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    axis: Axis,
}

/// Colour of a layer: hue steps 4 degrees per layer starting at 30.
pub fn layer_color(layer: i32) -> Rgb {
    Rgb::from_hsl(30.0 + 4.0 * layer as f32, 1.0, 0.5)
}

/// A lightweight terminal renderer for the stacking game.
pub struct GameView {
    /// Terminal columns per world unit.
    cell_w: f32,
}

impl Default for GameView {
    fn default() -> Self {
        // 2 columns per unit roughly compensates for the glyph aspect ratio.
        Self { cell_w: 2.0 }
    }
}

impl GameView {
    pub fn new(cell_w: f32) -> Self {
        Self {
            cell_w: if cell_w > 0.0 { cell_w } else { 2.0 },
        }
    }

    /// Render into an existing framebuffer.
    ///
    /// This is the allocation-free hot path. Callers can reuse a framebuffer
    /// across frames and only resize when the terminal size changes.
    pub fn render_into(
        &self,
        scene: &Scene,
        snap: &GameSnapshot,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        self.render_into_with_adapter(scene, snap, None, viewport, fb);
    }

    pub fn render_into_with_adapter(
        &self,
        scene: &Scene,
        snap: &GameSnapshot,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().into_cell(' '));

        let width = viewport.width as i32;
        let height = viewport.height as i32;
        let views_w = (width - HUD_W).max(0);
        let frame_w = views_w / 2;
        let camera_top = self.camera_top(snap, height - 2);

        if frame_w >= 8 && height >= 4 {
            let front = Panel {
                x: 1,
                y: 1,
                w: frame_w - 2,
                h: height - 2,
                axis: Axis::X,
            };
            let side = Panel {
                x: frame_w + 1,
                axis: Axis::Z,
                ..front
            };
            for (panel, title) in [(front, " FRONT x "), (side, " SIDE z ")] {
                self.draw_panel(fb, scene, panel, camera_top, title);
            }
        }

        self.draw_side_panel(fb, scene, snap, adapter, viewport, views_w + 1);

        match scene.phase() {
            Phase::Idle => {
                self.draw_overlay_text(fb, views_w, height, 0, "PRESS SPACE");
            }
            Phase::GameOver => {
                self.draw_overlay_text(fb, views_w, height, 0, "GAME OVER");
                self.draw_overlay_text(fb, views_w, height, 2, "ENTER TO RESTART");
            }
            _ => {}
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, scene: &Scene, snap: &GameSnapshot, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(scene, snap, viewport, &mut fb);
        fb
    }

    pub fn render_with_adapter(
        &self,
        scene: &Scene,
        snap: &GameSnapshot,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
    ) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into_with_adapter(scene, snap, adapter, viewport, &mut fb);
        fb
    }

    /// World `y` shown on the first inner row.
    fn camera_top(&self, snap: &GameSnapshot, inner_h: i32) -> f32 {
        let top = snap.top.map(|b| b.position.y).unwrap_or(0.0);
        (top + HEADROOM).max((inner_h - 1).max(0) as f32)
    }

    fn draw_panel(
        &self,
        fb: &mut FrameBuffer,
        scene: &Scene,
        panel: Panel,
        camera_top: f32,
        title: &str,
    ) {
        let bg = CellStyle {
            fg: Rgb::new(60, 60, 70),
            bg: Rgb::new(20, 20, 28),
            bold: false,
            dim: false,
        };
        let border = CellStyle::fg(Rgb::new(200, 200, 200));

        fb.fill_rect(panel.x, panel.y, panel.w, panel.h, ' ', bg);
        self.draw_border(fb, panel.x - 1, panel.y - 1, panel.w + 2, panel.h + 2, border);
        fb.put_str(panel.x + 1, panel.y - 1, title, border);

        for sb in scene.blocks() {
            self.draw_block(fb, panel, camera_top, sb);
        }
    }

    fn draw_block(&self, fb: &mut FrameBuffer, panel: Panel, camera_top: f32, sb: &SceneBlock) {
        let b = &sb.block;
        let row = panel.y + (camera_top - b.position.y).round() as i32;
        if row < panel.y || row >= panel.y + panel.h {
            return;
        }

        let center = b.position_along(panel.axis);
        let half = b.size_along(panel.axis) / 2.0;
        let origin = panel.x as f32 + panel.w as f32 / 2.0;
        let left = (origin + (center - half) * self.cell_w).round() as i32;
        let right = (origin + (center + half) * self.cell_w).round() as i32;

        let x0 = left.max(panel.x);
        let x1 = right.max(left + 1).min(panel.x + panel.w);
        if x1 <= x0 {
            return;
        }

        let color = layer_color(sb.layer);
        let (ch, style) = if b.is_dynamic() {
            (
                '▓',
                CellStyle {
                    fg: color.darken(0.7),
                    bg: Rgb::new(20, 20, 28),
                    bold: false,
                    dim: false,
                },
            )
        } else {
            (
                '█',
                CellStyle {
                    fg: color,
                    bg: Rgb::new(20, 20, 28),
                    bold: b.axis.is_some(),
                    dim: false,
                },
            )
        };
        fb.fill_rect(x0, row, x1 - x0, 1, ch, style);
    }

    fn draw_border(&self, fb: &mut FrameBuffer, x: i32, y: i32, w: i32, h: i32, style: CellStyle) {
        if w < 2 || h < 2 {
            return;
        }

        fb.put_char(x, y, '┌', style);
        fb.put_char(x + w - 1, y, '┐', style);
        fb.put_char(x, y + h - 1, '└', style);
        fb.put_char(x + w - 1, y + h - 1, '┘', style);

        for dx in 1..w - 1 {
            fb.put_char(x + dx, y, '─', style);
            fb.put_char(x + dx, y + h - 1, '─', style);
        }
        for dy in 1..h - 1 {
            fb.put_char(x, y + dy, '│', style);
            fb.put_char(x + w - 1, y + dy, '│', style);
        }
    }

    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        scene: &Scene,
        snap: &GameSnapshot,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        panel_x: i32,
    ) {
        if panel_x >= viewport.width as i32 {
            return;
        }
        let panel_w = viewport.width as i32 - panel_x;
        if panel_w < 8 {
            return;
        }

        let label = CellStyle {
            bold: true,
            ..CellStyle::fg(Rgb::new(220, 220, 220))
        };
        let value = CellStyle::fg(Rgb::new(200, 200, 200));
        let dim = CellStyle { dim: true, ..value };

        let mut y = 1;
        fb.put_str(panel_x, y, "SCORE", label);
        y += 1;
        fb.put_u32(panel_x, y, scene.score(), value);
        y += 2;

        fb.put_str(panel_x, y, "BEST", label);
        y += 1;
        fb.put_u32(panel_x, y, scene.high_score(), value);
        y += 2;

        fb.put_str(panel_x, y, "HEIGHT", label);
        y += 1;
        let placed = snap.tower_height.saturating_sub(BASE_LAYERS as u32);
        fb.put_u32(panel_x, y, placed, value);
        y += 2;

        fb.put_str(panel_x, y, "LAST", label);
        y += 1;
        match snap.last_placement {
            Some(last) => {
                fb.put_str(panel_x, y, last.placement.as_str(), value);
                if last.points > 0 {
                    let x = panel_x + last.placement.as_str().len() as i32 + 1;
                    fb.put_char(x, y, '+', dim);
                    fb.put_u32(x + 1, y, last.points, dim);
                }
            }
            None => fb.put_str(panel_x, y, "-", value),
        }
        y += 2;

        fb.put_str(panel_x, y, "AI", label);
        y += 1;
        match adapter {
            Some(st) if st.enabled => {
                fb.put_str(panel_x, y, "ON", value);
                if panel_w >= 12 {
                    fb.put_str(panel_x + 3, y, "clients", dim);
                }
                y += 1;
                fb.put_str(panel_x, y, "C", value);
                fb.put_u32(panel_x + 2, y, st.client_count as u32, value);
                y += 1;
                fb.put_str(panel_x, y, "S", value);
                fb.put_u32(panel_x + 2, y, st.streaming_count as u32, value);
                y += 1;
                fb.put_str(panel_x, y, "CTRL", value);
                match st.controller_id {
                    Some(id) => fb.put_u32(panel_x + 5, y, id as u32, value),
                    None => fb.put_str(panel_x + 5, y, "-", value),
                }
            }
            _ => fb.put_str(panel_x, y, "OFF", value),
        }

        let help_y = viewport.height as i32 - 4;
        if help_y > y + 1 {
            fb.put_str(panel_x, help_y, "SPACE place", dim);
            fb.put_str(panel_x, help_y + 1, "ENTER reset", dim);
            fb.put_str(panel_x, help_y + 2, "Q     quit", dim);
        }
    }

    fn draw_overlay_text(&self, fb: &mut FrameBuffer, area_w: i32, area_h: i32, dy: i32, text: &str) {
        let text_w = text.chars().count() as i32;
        let x = ((area_w - text_w) / 2).max(0);
        let y = area_h / 2 - 1 + dy;
        let style = CellStyle {
            bold: true,
            ..CellStyle::fg(Rgb::new(255, 255, 255))
        };
        fb.put_str(x, y, text, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_color_starts_orange() {
        assert_eq!(layer_color(0), Rgb::new(255, 128, 0));
        assert_ne!(layer_color(10), layer_color(0));
        // Full hue cycle after 90 layers.
        assert_eq!(layer_color(90), layer_color(0));
    }

    #[test]
    fn test_camera_keeps_ground_visible_for_short_towers() {
        let view = GameView::default();
        let snap = GameSnapshot::default();
        assert_eq!(view.camera_top(&snap, 20), 19.0);
    }
}
