//! RGBA canvas and plate-carrée rasterisation of scattered grid points.

use radar_common::{BoundingBox, DecodedField};
use rayon::prelude::*;

use crate::colormap::{Color, ReflectivityScale};

/// Pixel rectangle on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Largest rect inside `self` with the aspect ratio of `extent`, centred.
    pub fn fit_extent(&self, extent: &BoundingBox) -> Rect {
        let scale = (self.width as f64 / extent.width()).min(self.height as f64 / extent.height());
        let width = ((extent.width() * scale).round() as usize).clamp(1, self.width.max(1));
        let height = ((extent.height() * scale).round() as usize).clamp(1, self.height.max(1));
        Rect::new(
            self.x + (self.width - width) / 2,
            self.y + (self.height - height) / 2,
            width,
            height,
        )
    }
}

/// Maps geographic coordinates onto a pixel rectangle (equirectangular).
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub extent: BoundingBox,
    pub rect: Rect,
}

impl Viewport {
    pub fn new(extent: BoundingBox, rect: Rect) -> Self {
        Self { extent, rect }
    }

    /// Pixel containing (lon, lat), if it falls inside the viewport.
    pub fn to_pixel(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if !self.extent.contains_point(lon, lat) {
            return None;
        }
        let fx = (lon - self.extent.min_x) / self.extent.width();
        let fy = (self.extent.max_y - lat) / self.extent.height();
        let px = ((fx * self.rect.width as f64) as usize).min(self.rect.width - 1);
        let py = ((fy * self.rect.height as f64) as usize).min(self.rect.height - 1);
        Some((self.rect.x + px, self.rect.y + py))
    }

    /// Pixels per degree (x, y).
    pub fn scale(&self) -> (f64, f64) {
        (
            self.rect.width as f64 / self.extent.width(),
            self.rect.height as f64 / self.extent.height(),
        )
    }
}

/// RGBA image buffer, row-major, 4 bytes per pixel.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, background: Color) -> Self {
        let pixels = background
            .to_array()
            .iter()
            .copied()
            .cycle()
            .take(width * height * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Color {
        let i = (y * self.width + x) * 4;
        Color::new(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        )
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 4;
            self.pixels[i..i + 4].copy_from_slice(&color.to_array());
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x_end = (rect.x + rect.width).min(self.width);
        let y_end = (rect.y + rect.height).min(self.height);
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Outline drawn inside `rect`.
    pub fn stroke_rect(&mut self, rect: Rect, thickness: usize, color: Color) {
        let t = thickness.min(rect.width).min(rect.height);
        self.fill_rect(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.fill_rect(
            Rect::new(rect.x, rect.y + rect.height - t, rect.width, t),
            color,
        );
        self.fill_rect(Rect::new(rect.x, rect.y, t, rect.height), color);
        self.fill_rect(
            Rect::new(rect.x + rect.width - t, rect.y, t, rect.height),
            color,
        );
    }

    /// Filled five-pointed star centred on (cx, cy).
    pub fn draw_star(&mut self, cx: usize, cy: usize, radius: f64, color: Color) {
        let star = star_polygon(cx as f64 + 0.5, cy as f64 + 0.5, radius);
        let r = radius.ceil() as usize + 1;
        for y in cy.saturating_sub(r)..=(cy + r) {
            for x in cx.saturating_sub(r)..=(cx + r) {
                if point_in_polygon(x as f64 + 0.5, y as f64 + 0.5, &star) {
                    self.set_pixel(x, y, color);
                }
            }
        }
    }

    /// Paint `field` into the viewport with the band colours of `scale`.
    ///
    /// Each grid point covers a block sized to the grid spacing so sparse
    /// grids still render solid. Where blocks overlap the highest value wins,
    /// which makes the result independent of point order.
    pub fn draw_field(&mut self, field: &DecodedField, viewport: &Viewport, scale: &ReflectivityScale) {
        let rect = viewport.rect;
        if rect.width == 0 || rect.height == 0 {
            return;
        }

        let (half_w, half_h) = point_footprint(field, viewport);
        let mut peak = vec![f32::NAN; rect.width * rect.height];

        for (lon, lat, value) in field.points() {
            if value.is_nan() {
                continue;
            }
            let Some((px, py)) = viewport.to_pixel(lon, lat) else {
                continue;
            };
            let (lx, ly) = (px - rect.x, py - rect.y);
            let x_range = lx.saturating_sub(half_w)..=(lx + half_w).min(rect.width - 1);
            for y in ly.saturating_sub(half_h)..=(ly + half_h).min(rect.height - 1) {
                for x in x_range.clone() {
                    let cell = &mut peak[y * rect.width + x];
                    if cell.is_nan() || value > *cell {
                        *cell = value;
                    }
                }
            }
        }

        let canvas_width = self.width;
        self.pixels
            .par_chunks_mut(canvas_width * 4)
            .enumerate()
            .filter(|(y, _)| *y >= rect.y && *y < rect.y + rect.height)
            .for_each(|(y, row)| {
                let values = &peak[(y - rect.y) * rect.width..(y - rect.y + 1) * rect.width];
                for (dx, &value) in values.iter().enumerate() {
                    if let Some(color) = scale.color_for(value) {
                        let i = (rect.x + dx) * 4;
                        row[i..i + 4].copy_from_slice(&color.to_array());
                    }
                }
            });
    }
}

/// Half-size in pixels of the block one grid point covers.
fn point_footprint(field: &DecodedField, viewport: &Viewport) -> (usize, usize) {
    let shape = field.shape();
    let Some(bounds) = field.bounds() else {
        return (0, 0);
    };
    let (sx, sy) = viewport.scale();
    let cell_w = bounds.width() / shape.nx.max(1) as f64 * sx;
    let cell_h = bounds.height() / shape.ny.max(1) as f64 * sy;
    (
        (cell_w / 2.0).ceil().max(0.0) as usize,
        (cell_h / 2.0).ceil().max(0.0) as usize,
    )
}

fn star_polygon(cx: f64, cy: f64, radius: f64) -> Vec<(f64, f64)> {
    let inner = radius * 0.45;
    (0..10)
        .map(|k| {
            let r = if k % 2 == 0 { radius } else { inner };
            let angle = -std::f64::consts::FRAC_PI_2 + k as f64 * std::f64::consts::PI / 5.0;
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect()
}

/// Even-odd rule.
fn point_in_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
