//! Fallback edge detection: a Sobel-like gradient magnitude test on the red
//! channel that needs nothing beyond the raster itself.
//!
//! For every interior pixel `(x, y)` with `1 <= x <= W-2`, `1 <= y <= H-2`
//! the detector computes `Gx`, `Gy` and `mag = sqrt(Gx^2 + Gy^2)` and emits a
//! mark when `mag > threshold.gradient_cutoff()`. Marks come out in raster
//! scan order (row-major, top to bottom, left to right).
//!
//! With [`GradientKernel::Reference`] the neighbours are addressed through
//! flat byte offsets exactly as the reference tracer does:
//!
//! ```text
//! Gx = -top - 2*left - bottom + top[+4] + 2*right + bottom[+4]
//! Gy = -top - 2*top[+4] - top[+8] + bottom + 2*bottom[+4] + bottom[+8]
//! ```
//!
//! `top[+8]` is two pixels right of `top`, so for `x = W-2` it wraps into the
//! first pixel of the next row. A read past the end of the buffer yields no
//! value and the pixel is skipped, which is why the bottom-right interior
//! pixel (and therefore any 3x3 image) never emits.
use image::{GrayImage, Luma};

use crate::{
    raster::{RasterBuffer, CHANNELS},
    types::{EdgeSegment, GradientKernel, MarkStyle, Threshold},
};

/// Gradient-magnitude edge detector used when no vision backend is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradientEdgeDetector {
    pub kernel: GradientKernel,
    pub marks: MarkStyle,
}

impl GradientEdgeDetector {
    pub fn new(kernel: GradientKernel, marks: MarkStyle) -> Self {
        Self { kernel, marks }
    }

    /// Emit one short segment per interior pixel whose gradient magnitude
    /// strictly exceeds the threshold cutoff.
    pub fn detect(&self, buffer: &RasterBuffer, threshold: Threshold) -> Vec<EdgeSegment> {
        let mut marks = Vec::new();
        self.scan(buffer, threshold, |x, y, gx, gy| {
            marks.push(self.mark(x, y, gx, gy));
        });
        marks
    }

    /// Per-pixel form of [`detect`](Self::detect): 255 where an edge is
    /// present, 0 elsewhere. Border pixels are always 0.
    pub fn edge_mask(&self, buffer: &RasterBuffer, threshold: Threshold) -> GrayImage {
        let mut mask = GrayImage::new(buffer.width(), buffer.height());
        self.scan(buffer, threshold, |x, y, _, _| {
            mask.put_pixel(x, y, Luma([255]));
        });
        mask
    }

    /// `(Gx, Gy)` at an interior pixel, or `None` for border pixels and
    /// pixels whose neighbourhood reads fall outside the buffer.
    pub fn gradient_at(&self, buffer: &RasterBuffer, x: u32, y: u32) -> Option<(f64, f64)> {
        let (width, height) = buffer.dimensions();
        if x == 0 || y == 0 || x + 1 >= width || y + 1 >= height {
            return None;
        }
        match self.kernel {
            GradientKernel::Reference => reference_gradient(buffer.as_raw(), width, x, y),
            GradientKernel::Sobel => Some(sobel_gradient(buffer, x, y)),
        }
    }

    fn scan<F>(&self, buffer: &RasterBuffer, threshold: Threshold, mut emit: F)
    where
        F: FnMut(u32, u32, f64, f64),
    {
        let (width, height) = buffer.dimensions();
        if width < 3 || height < 3 {
            return;
        }
        let cutoff = threshold.gradient_cutoff();

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let Some((gx, gy)) = self.gradient_at(buffer, x, y) else {
                    continue;
                };
                let magnitude = (gx * gx + gy * gy).sqrt();
                if magnitude > cutoff {
                    emit(x, y, gx, gy);
                }
            }
        }
    }

    fn mark(&self, x: u32, y: u32, gx: f64, gy: f64) -> EdgeSegment {
        let start = [x as i32, y as i32];
        let step = match self.marks {
            MarkStyle::Diagonal => [1, 1],
            MarkStyle::EdgeTangent => tangent_step(gx, gy),
        };
        EdgeSegment::new(start, [start[0] + step[0], start[1] + step[1]])
    }
}

/// Run the reference detector with the reference marks.
pub fn detect(buffer: &RasterBuffer, threshold: Threshold) -> Vec<EdgeSegment> {
    GradientEdgeDetector::default().detect(buffer, threshold)
}

fn reference_gradient(data: &[u8], width: u32, x: u32, y: u32) -> Option<(f64, f64)> {
    let row = width as usize * CHANNELS;
    let (x, y) = (x as usize, y as usize);
    let top = (y - 1) * row + x * CHANNELS;
    let bottom = (y + 1) * row + x * CHANNELS;
    let left = y * row + (x - 1) * CHANNELS;
    let right = y * row + (x + 1) * CHANNELS;

    let red = |offset: usize| data.get(offset).copied().map(f64::from);

    let gx = -red(top)? - 2.0 * red(left)? - red(bottom)?
        + red(top + 4)?
        + 2.0 * red(right)?
        + red(bottom + 4)?;
    let gy = -red(top)? - 2.0 * red(top + 4)? - red(top + 8)?
        + red(bottom)?
        + 2.0 * red(bottom + 4)?
        + red(bottom + 8)?;

    Some((gx, gy))
}

fn sobel_gradient(buffer: &RasterBuffer, x: u32, y: u32) -> (f64, f64) {
    let image = buffer.as_rgba();
    let red = |dx: i32, dy: i32| {
        let px = (x as i32 + dx) as u32;
        let py = (y as i32 + dy) as u32;
        f64::from(image.get_pixel(px, py).0[0])
    };

    let gx = -red(-1, -1) - 2.0 * red(-1, 0) - red(-1, 1) + red(1, -1) + 2.0 * red(1, 0) + red(1, 1);
    let gy = -red(-1, -1) - 2.0 * red(0, -1) - red(1, -1) + red(-1, 1) + 2.0 * red(0, 1) + red(1, 1);
    (gx, gy)
}

/// Unit step along the edge (perpendicular to the gradient), snapped to the
/// 8-neighbourhood. Falls back to the diagonal when the gradient vanishes.
fn tangent_step(gx: f64, gy: f64) -> [i32; 2] {
    let magnitude = (gx * gx + gy * gy).sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return [1, 1];
    }
    let dx = (-gy / magnitude).round() as i32;
    let dy = (gx / magnitude).round() as i32;
    if dx == 0 && dy == 0 {
        [1, 1]
    } else {
        [dx, dy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gray_buffer(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> RasterBuffer {
        RasterBuffer::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
            let v = f(x, y);
            Rgba([v, v, v, 255])
        }))
    }

    fn vertical_step(width: u32, height: u32) -> RasterBuffer {
        gray_buffer(width, height, |x, _| if x >= width / 2 { 255 } else { 0 })
    }

    #[test]
    fn black_3x3_emits_nothing() {
        let buffer = gray_buffer(3, 3, |_, _| 0);
        for raw in [0, 1, 100, 255] {
            assert!(detect(&buffer, Threshold::new(raw)).is_empty());
        }
    }

    #[test]
    fn bright_centre_3x3_emits_nothing_under_reference_indexing() {
        // The centre pixel carries no weight in either kernel, and the single
        // interior pixel of a 3x3 image reads past the buffer for bottom[+8].
        let buffer = gray_buffer(3, 3, |x, y| if (x, y) == (1, 1) { 255 } else { 0 });
        assert!(detect(&buffer, Threshold::new(0)).is_empty());
        let detector = GradientEdgeDetector::default();
        assert_eq!(detector.gradient_at(&buffer, 1, 1), None);
    }

    #[test]
    fn reference_reads_wrap_and_skip_like_flat_offsets() {
        // 4x4: top[+8] for x = 2 (W-2) wraps to pixel (0, y).
        let buffer = gray_buffer(4, 4, |x, y| if (x, y) == (0, 1) { 200 } else { 0 });
        let detector = GradientEdgeDetector::default();
        // At (2, 2), top is (2, 1) and top[+8] lands on (0, 2), not (0, 1).
        assert_eq!(detector.gradient_at(&buffer, 2, 2), None); // bottom[+8] is past the end
        let (gx, gy) = detector.gradient_at(&buffer, 2, 1).expect("in bounds");
        // At (2, 1) top[+8] is (0, 1): Gy picks up -200, Gx does not see it.
        assert_eq!(gx, 0.0);
        assert_eq!(gy, -200.0);
    }

    #[test]
    fn vertical_step_is_detected_at_the_boundary() {
        let buffer = vertical_step(8, 6);
        let marks = detect(&buffer, Threshold::new(0));
        assert!(!marks.is_empty());
        assert!(marks.iter().any(|m| m.start[0] == 3 || m.start[0] == 4));
        for mark in &marks {
            assert_eq!(mark.end, [mark.start[0] + 1, mark.start[1] + 1]);
        }
    }

    #[test]
    fn marks_stay_inside_the_border() {
        let buffer = gray_buffer(17, 11, |x, y| ((x * 37 + y * 91) % 256) as u8);
        for raw in [0, 10, 80] {
            for mark in detect(&buffer, Threshold::new(raw)) {
                assert!((1..=15).contains(&mark.start[0]), "{mark:?}");
                assert!((1..=9).contains(&mark.start[1]), "{mark:?}");
            }
        }
    }

    #[test]
    fn marks_follow_raster_scan_order() {
        let buffer = gray_buffer(12, 12, |x, y| ((x * x + 3 * y) % 256) as u8);
        let marks = detect(&buffer, Threshold::new(5));
        let keys: Vec<_> = marks.iter().map(|m| (m.start[1], m.start[0])).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn raising_threshold_never_adds_marks() {
        let buffer = gray_buffer(24, 18, |x, y| ((x * 13 + y * 29 + x * y) % 256) as u8);
        let mut previous = usize::MAX;
        for raw in (0..=255).step_by(15) {
            let count = detect(&buffer, Threshold::new(raw)).len();
            assert!(count <= previous, "threshold {raw} produced {count} > {previous}");
            previous = count;
        }
    }

    #[test]
    fn detection_is_deterministic() {
        let buffer = gray_buffer(20, 20, |x, y| ((x * 7) ^ (y * 11)) as u8);
        let first = detect(&buffer, Threshold::new(40));
        let second = detect(&buffer, Threshold::new(40));
        assert_eq!(first, second);
    }

    #[test]
    fn only_the_red_channel_matters() {
        let red_only = RasterBuffer::from_rgba(RgbaImage::from_fn(9, 9, |x, _| {
            if x >= 4 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 255, 255, 0]) }
        }));
        let gray = vertical_step(9, 9);
        let threshold = Threshold::new(30);
        assert_eq!(detect(&red_only, threshold), detect(&gray, threshold));
    }

    #[test]
    fn sobel_kernel_reaches_the_bottom_right_pixel() {
        let buffer = gray_buffer(3, 3, |x, _| if x == 2 { 255 } else { 0 });
        let detector = GradientEdgeDetector::new(GradientKernel::Sobel, MarkStyle::Diagonal);
        let (gx, gy) = detector.gradient_at(&buffer, 1, 1).expect("interior pixel");
        assert_eq!(gx, 4.0 * 255.0);
        assert_eq!(gy, 0.0);
        assert_eq!(detector.detect(&buffer, Threshold::new(0)).len(), 1);
    }

    #[test]
    fn edge_tangent_marks_run_along_a_vertical_edge() {
        let buffer = vertical_step(10, 10);
        let detector = GradientEdgeDetector::new(GradientKernel::Sobel, MarkStyle::EdgeTangent);
        let marks = detector.detect(&buffer, Threshold::new(50));
        assert!(!marks.is_empty());
        for mark in marks {
            assert_eq!(mark.end[0], mark.start[0], "vertical edge gives vertical strokes");
            assert_eq!((mark.end[1] - mark.start[1]).abs(), 1);
        }
    }

    #[test]
    fn edge_mask_agrees_with_marks() {
        let buffer = gray_buffer(15, 10, |x, y| if x + y > 12 { 220 } else { 10 });
        let detector = GradientEdgeDetector::default();
        let threshold = Threshold::new(60);
        let mask = detector.edge_mask(&buffer, threshold);
        let marks = detector.detect(&buffer, threshold);
        let lit = mask.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(lit, marks.len());
        for mark in marks {
            assert_eq!(mask.get_pixel(mark.start[0] as u32, mark.start[1] as u32).0[0], 255);
        }
    }

    #[test]
    fn tiny_buffers_are_ignored() {
        let buffer = gray_buffer(2, 5, |_, _| 255);
        assert!(detect(&buffer, Threshold::new(0)).is_empty());
    }
}
