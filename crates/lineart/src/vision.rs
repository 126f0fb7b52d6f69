use std::sync::Arc;

use image::{GrayImage, Luma, RgbaImage};
use imageproc::{
    contours::{find_contours, BorderType},
    point::Point,
};

use crate::{
    error::{LineArtError, Result},
    traits::{BackendLoader, LoadFuture, VisionBackend},
    types::PixelPoint,
};

/// Smallest threshold handed to `imageproc::edges::canny`.
const MIN_CANNY_THRESHOLD: f32 = f32::EPSILON;

/// [`VisionBackend`] over the `image` and `imageproc` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocBackend;

impl VisionBackend for ImageprocBackend {
    fn name(&self) -> &'static str {
        "imageproc"
    }

    fn to_grayscale(&self, image: &RgbaImage) -> Result<GrayImage> {
        Ok(image::imageops::grayscale(image))
    }

    fn canny(&self, gray: &GrayImage, low: f32, high: f32) -> Result<GrayImage> {
        if gray.width() == 0 || gray.height() == 0 {
            return Err(LineArtError::ProcessingFailure(
                "cannot run Canny on an empty image".to_string(),
            ));
        }
        // imageproc's hysteresis walks off the image when a zero-magnitude
        // border pixel passes the low threshold.
        let low = low.max(MIN_CANNY_THRESHOLD);
        let high = high.max(low);
        Ok(imageproc::edges::canny(gray, low, high))
    }

    fn find_external_contours(&self, edges: &GrayImage) -> Result<Vec<Vec<PixelPoint>>> {
        let contours = find_contours::<i32>(edges);

        let result = contours
            .into_iter()
            .filter(|contour| contour.parent.is_none() && matches!(contour.border_type, BorderType::Outer))
            .map(|contour| contour.points.iter().map(|p| [p.x, p.y]).collect())
            .collect();

        Ok(result)
    }

    fn arc_length(&self, curve: &[PixelPoint], closed: bool) -> f64 {
        if curve.len() < 2 {
            return 0.0;
        }
        imageproc::geometry::arc_length(&to_points(curve), closed)
    }

    fn approximate_polygon(&self, curve: &[PixelPoint], epsilon: f64, closed: bool) -> Vec<PixelPoint> {
        if curve.len() < 3 || epsilon <= 0.0 {
            return curve.to_vec();
        }
        imageproc::geometry::approximate_polygon_dp(&to_points(curve), epsilon, closed)
            .into_iter()
            .map(|p| [p.x, p.y])
            .collect()
    }
}

fn to_points(curve: &[PixelPoint]) -> Vec<Point<i32>> {
    curve.iter().map(|&[x, y]| Point::new(x, y)).collect()
}

/// Provides [`ImageprocBackend`] after a quick self-check.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocLoader;

impl BackendLoader for ImageprocLoader {
    fn name(&self) -> &'static str {
        "imageproc"
    }

    fn load(&self) -> LoadFuture<'_> {
        Box::pin(async move {
            let backend = ImageprocBackend;
            self_check(&backend)?;
            tracing::debug!(backend = backend.name(), "vision backend initialised");
            Ok(Arc::new(backend) as Arc<dyn VisionBackend>)
        })
    }
}

/// A bright square must produce Canny edges and one external contour.
fn self_check(backend: &dyn VisionBackend) -> Result<()> {
    let probe = GrayImage::from_fn(8, 8, |x, y| {
        if (2..6).contains(&x) && (2..6).contains(&y) {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let edges = backend.canny(&probe, 50.0, 100.0)?;
    if edges.pixels().all(|p| p.0[0] == 0) {
        return Err(LineArtError::LibraryUnavailable(format!(
            "{} produced no edges during self-check",
            backend.name()
        )));
    }
    if backend.find_external_contours(&edges)?.is_empty() {
        return Err(LineArtError::LibraryUnavailable(format!(
            "{} found no contours during self-check",
            backend.name()
        )));
    }
    Ok(())
}

/// A loader that never succeeds, for environments without a vision backend.
#[derive(Debug, Clone)]
pub struct UnavailableLoader {
    pub reason: String,
}

impl UnavailableLoader {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl Default for UnavailableLoader {
    fn default() -> Self {
        Self::new("no vision backend configured")
    }
}

impl BackendLoader for UnavailableLoader {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn load(&self) -> LoadFuture<'_> {
        let reason = self.reason.clone();
        Box::pin(async move { Err(LineArtError::LibraryUnavailable(reason)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_image() -> GrayImage {
        // Filled square with a hole, plus a separate blob inside the hole.
        GrayImage::from_fn(40, 40, |x, y| {
            let outer = (5..35).contains(&x) && (5..35).contains(&y);
            let hole = (12..28).contains(&x) && (12..28).contains(&y);
            let island = (17..23).contains(&x) && (17..23).contains(&y);
            if (outer && !hole) || island {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn external_contours_skip_holes_and_nested_shapes() {
        let contours = ImageprocBackend
            .find_external_contours(&ring_image())
            .expect("contours");
        assert_eq!(contours.len(), 1);
        let xs: Vec<i32> = contours[0].iter().map(|p| p[0]).collect();
        assert_eq!(xs.iter().min(), Some(&5));
        assert_eq!(xs.iter().max(), Some(&34));
    }

    #[test]
    fn arc_length_of_closed_square() {
        let square = [[0, 0], [10, 0], [10, 10], [0, 10]];
        assert!((ImageprocBackend.arc_length(&square, true) - 40.0).abs() < 1e-9);
        assert!((ImageprocBackend.arc_length(&square, false) - 30.0).abs() < 1e-9);
        assert_eq!(ImageprocBackend.arc_length(&[[3, 3]], true), 0.0);
    }

    #[test]
    fn approximation_drops_collinear_points() {
        let mut square = Vec::new();
        for x in 0..10 {
            square.push([x, 0]);
        }
        for y in 0..10 {
            square.push([10, y]);
        }
        for x in (1..=10).rev() {
            square.push([x, 10]);
        }
        for y in (1..=10).rev() {
            square.push([0, y]);
        }
        let approx = ImageprocBackend.approximate_polygon(&square, 0.5, true);
        assert!(approx.len() <= 5, "got {approx:?}");
        assert!(approx.len() >= 4);
    }

    #[test]
    fn canny_rejects_empty_images() {
        let empty = GrayImage::new(0, 0);
        assert!(ImageprocBackend.canny(&empty, 1.0, 2.0).is_err());
    }

    #[test]
    fn canny_accepts_zero_and_negative_thresholds() {
        let checker = GrayImage::from_fn(3, 3, |x, y| Luma([if (x + y) % 2 == 0 { 255 } else { 0 }]));
        for (low, high) in [(0.0, 0.0), (-2.5, -5.0)] {
            let edges = ImageprocBackend.canny(&checker, low, high).expect("canny");
            assert_eq!(edges.dimensions(), (3, 3));
        }
    }

    #[tokio::test]
    async fn imageproc_loader_passes_self_check() {
        let backend = ImageprocLoader.load().await.expect("backend loads");
        assert_eq!(backend.name(), "imageproc");
    }

    #[tokio::test]
    async fn unavailable_loader_reports_reason() {
        let err = UnavailableLoader::new("disabled by flag").load().await.err().expect("must fail");
        match err {
            LineArtError::LibraryUnavailable(reason) => assert_eq!(reason, "disabled by flag"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
