//! Software presentation: a top-down minimap and the projected first-person
//! view, rasterised into an RGBA buffer the canvas can blit directly.

use crate::grid::Grid;
use crate::pose::Pose;
use crate::raycast::{RayHit, RaycastResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[inline(always)]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    #[inline(always)]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// Scale the colour channels, keeping alpha
    #[inline(always)]
    pub fn shaded(&self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Color {
            r: (self.r as f32 * f) as u8,
            g: (self.g as f32 * f) as u8,
            b: (self.b as f32 * f) as u8,
            a: self.a,
        }
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const SKY: Color = Color::rgb(40, 44, 64);
    pub const FLOOR: Color = Color::rgb(52, 48, 40);
    pub const WALL: Color = Color::rgb(128, 128, 128);
    pub const MINIMAP_FLOOR: Color = Color::rgb(24, 24, 24);
    pub const MINIMAP_WALL: Color = Color::rgb(128, 128, 128);
    pub const PLAYER: Color = Color::rgb(0, 0, 255);
    pub const RAY: Color = Color::rgb(220, 200, 60);
}

/// Faces crossed while stepping in y are drawn darker
const SIDE_SHADE: f32 = 0.65;
/// Per-cell distance fog
const FOG: f64 = 0.18;
/// Minimap player marker edge, in pixels
const PLAYER_SIZE: u32 = 6;

/// RGBA8 pixel buffer, row-major
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    stride: usize,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        FrameBuffer {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            stride: width as usize * 4,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            *self = FrameBuffer::new(width, height);
        }
    }

    pub fn clear(&mut self, color: Color) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    #[inline(always)]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            let idx = y as usize * self.stride + x as usize * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.stride + x as usize * 4;
        let p = &self.pixels[idx..idx + 4];
        Some(Color::new(p[0], p[1], p[2], p[3]))
    }

    /// Vertical span `[y_start, y_end)`, clipped to the buffer
    pub fn draw_vline(&mut self, x: u32, y_start: u32, y_end: u32, color: Color) {
        if x >= self.width {
            return;
        }
        let y1 = y_end.min(self.height);
        for y in y_start..y1 {
            self.set_pixel(x, y, color);
        }
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Color) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for dy in y..y_end {
            for dx in x..x_end {
                self.set_pixel(dx, dy, color);
            }
        }
    }

    /// Bresenham line; endpoints may lie off-buffer
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            if x >= 0 && y >= 0 {
                self.set_pixel(x as u32, y as u32, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// On-screen wall slice for one ray: rows `[top, bottom)` and its colour
pub fn wall_span(hit: &RayHit, height: u32) -> Option<(u32, u32, Color)> {
    if !hit.hit {
        return None;
    }
    let h = height as f64;
    let line = if hit.distance > 1e-6 {
        (h / hit.distance).min(h * 4.0)
    } else {
        h * 4.0
    };
    let mid = h / 2.0;
    let top = (mid - line / 2.0).max(0.0) as u32;
    let bottom = (mid + line / 2.0).min(h) as u32;
    if bottom <= top {
        return None;
    }

    let side = match hit.face {
        Some(face) if !face.is_vertical() => SIDE_SHADE,
        _ => 1.0,
    };
    let fog = (1.0 / (1.0 + hit.distance.max(0.0) * FOG)) as f32;
    Some((top, bottom, Color::WALL.shaded(side * fog)))
}

/// Draw sky, floor and one wall slice per screen column.
///
/// Columns are spread evenly over the rays, so the result does not need to
/// have exactly one ray per column.
pub fn draw_scene(fb: &mut FrameBuffer, result: &RaycastResult) {
    let (w, h) = (fb.width, fb.height);
    let half = h / 2;
    fb.fill_rect(0, 0, w, half, Color::SKY);
    fb.fill_rect(0, half, w, h - half, Color::FLOOR);

    if result.is_empty() {
        return;
    }
    let rays = result.len();
    for x in 0..w {
        let index = (x as usize * rays / w as usize).min(rays - 1);
        if let Some((top, bottom, color)) = wall_span(&result[index], h) {
            fb.draw_vline(x, top, bottom, color);
        }
    }
}

/// Where the minimap sits on screen and how big a cell is
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimapLayout {
    pub origin_x: u32,
    pub origin_y: u32,
    pub cell_px: f64,
    /// Draw every n-th ray of the fan; 0 draws none
    pub ray_stride: usize,
}

impl MinimapLayout {
    #[inline(always)]
    fn to_screen(&self, x: f64, y: f64) -> (i32, i32) {
        (
            (self.origin_x as f64 + x * self.cell_px).round() as i32,
            (self.origin_y as f64 + y * self.cell_px).round() as i32,
        )
    }
}

/// Top-down view: grid cells, the ray fan, the player marker and a heading tick
pub fn draw_minimap(
    fb: &mut FrameBuffer,
    grid: &Grid,
    pose: Pose,
    result: &RaycastResult,
    layout: &MinimapLayout,
) {
    let cell = layout.cell_px;
    if cell <= 0.0 {
        return;
    }

    let span_w = (grid.width() as f64 * cell).ceil() as u32;
    let span_h = (grid.height() as f64 * cell).ceil() as u32;
    fb.fill_rect(
        layout.origin_x,
        layout.origin_y,
        span_w,
        span_h,
        Color::MINIMAP_FLOOR,
    );
    let size = cell.ceil() as u32;
    for (cx, cy) in grid.iter_walls() {
        let (sx, sy) = layout.to_screen(cx as f64, cy as f64);
        fb.fill_rect(sx as u32, sy as u32, size, size, Color::MINIMAP_WALL);
    }

    let (px, py) = layout.to_screen(pose.x, pose.y);
    if layout.ray_stride > 0 {
        for hit in result.iter().step_by(layout.ray_stride) {
            let end_x = pose.x + hit.angle.cos() * hit.ray_distance;
            let end_y = pose.y + hit.angle.sin() * hit.ray_distance;
            let (ex, ey) = layout.to_screen(end_x, end_y);
            fb.draw_line(px, py, ex, ey, Color::RAY);
        }
    }

    let half = PLAYER_SIZE as i32 / 2;
    fb.fill_rect(
        (px - half).max(0) as u32,
        (py - half).max(0) as u32,
        PLAYER_SIZE,
        PLAYER_SIZE,
        Color::PLAYER,
    );
    let tick = (PLAYER_SIZE * 2) as f64;
    let forward = pose.forward();
    fb.draw_line(
        px,
        py,
        px + (forward.x * tick).round() as i32,
        py + (forward.y * tick).round() as i32,
        Color::PLAYER,
    );
}
