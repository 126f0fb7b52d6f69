use image::Rgba;

use crate::{
    raster::RasterBuffer,
    types::{EdgeMap, PixelPoint},
};

/// Paints an [`EdgeMap`] onto a fresh canvas: opaque background first,
/// then every mark or polygon with a fixed stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderer {
    pub background: Rgba<u8>,
    pub stroke: Rgba<u8>,
    pub line_width: f32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            background: Rgba([255, 255, 255, 255]),
            stroke: Rgba([0, 0, 0, 255]),
            line_width: 1.5,
        }
    }
}

impl Renderer {
    /// Render into a new buffer of the given size.
    pub fn render(&self, width: u32, height: u32, edges: &EdgeMap) -> RasterBuffer {
        let mut target = RasterBuffer::filled(width, height, self.background);
        self.draw(&mut target, edges);
        target
    }

    /// Overwrite `target` completely with the rendering of `edges`.
    pub fn render_into(&self, target: &mut RasterBuffer, edges: &EdgeMap) {
        for pixel in target.as_rgba_mut().pixels_mut() {
            *pixel = self.background;
        }
        self.draw(target, edges);
    }

    fn draw(&self, target: &mut RasterBuffer, edges: &EdgeMap) {
        match edges {
            EdgeMap::Marks(marks) => {
                for mark in marks {
                    self.stroke_segment(target, mark.start, mark.end);
                }
            }
            EdgeMap::Raster(raster) => {
                let image = target.as_rgba_mut();
                for (x, y, value) in raster.enumerate_pixels() {
                    if value.0[0] > 0 && x < image.width() && y < image.height() {
                        image.put_pixel(x, y, self.stroke);
                    }
                }
            }
            EdgeMap::Polygons(polygons) => {
                for polygon in polygons {
                    for (from, to) in polygon.edges() {
                        self.stroke_segment(target, from, to);
                    }
                }
            }
        }
    }

    /// Butt-capped thick line in canvas coordinates (pixel `(px, py)` spans
    /// `[px, px + 1) x [py, py + 1)`). A pixel is painted when its centre
    /// projects onto the segment within half the line width of it.
    fn stroke_segment(&self, target: &mut RasterBuffer, from: PixelPoint, to: PixelPoint) {
        let (x0, y0) = (f64::from(from[0]), f64::from(from[1]));
        let (x1, y1) = (f64::from(to[0]), f64::from(to[1]));
        let (dx, dy) = (x1 - x0, y1 - y0);
        let length_sq = dx * dx + dy * dy;
        if length_sq == 0.0 {
            return;
        }
        let length = length_sq.sqrt();
        let half = f64::from(self.line_width) / 2.0;

        let image = target.as_rgba_mut();
        let (width, height) = (i64::from(image.width()), i64::from(image.height()));
        let min_x = ((x0.min(x1) - half).floor() as i64).max(0);
        let max_x = ((x0.max(x1) + half).ceil() as i64).min(width - 1);
        let min_y = ((y0.min(y1) - half).floor() as i64).max(0);
        let max_y = ((y0.max(y1) + half).ceil() as i64).min(height - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let cx = px as f64 + 0.5 - x0;
                let cy = py as f64 + 0.5 - y0;
                let t = (cx * dx + cy * dy) / length_sq;
                if !(0.0..=1.0).contains(&t) {
                    continue;
                }
                let distance = (cx * dy - cy * dx).abs() / length;
                if distance <= half {
                    image.put_pixel(px as u32, py as u32, self.stroke);
                }
            }
        }
    }
}
