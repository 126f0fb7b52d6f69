use image::GrayImage;

use crate::{
    error::Result,
    raster::RasterBuffer,
    traits::VisionBackend,
    types::{EdgeMap, TracedPolygon, TraceSettings},
};

/// Approximates every external contour of an edge image with a polygon
/// whose tolerance is a fixed fraction of that contour's own perimeter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourSimplifier {
    pub tolerance_ratio: f64,
}

impl Default for ContourSimplifier {
    fn default() -> Self {
        Self { tolerance_ratio: 0.01 }
    }
}

impl ContourSimplifier {
    pub fn simplify(&self, backend: &dyn VisionBackend, edges: &GrayImage) -> Result<Vec<TracedPolygon>> {
        let contours = backend.find_external_contours(edges)?;
        let mut polygons = Vec::with_capacity(contours.len());

        for contour in &contours {
            let perimeter = backend.arc_length(contour, true);
            let tolerance = self.tolerance_ratio * perimeter;
            let vertices = backend.approximate_polygon(contour, tolerance, true);
            if vertices.is_empty() {
                continue;
            }
            polygons.push(TracedPolygon {
                vertices,
                perimeter,
                tolerance,
            });
        }

        tracing::debug!(
            contours = contours.len(),
            polygons = polygons.len(),
            "approximated external contours"
        );
        Ok(polygons)
    }
}

/// Grayscale, Canny with `(0.5 * t, t)`, then either the raw edge raster or
/// simplified polygons depending on the simplify flag.
#[derive(Clone)]
pub struct AdvancedPipeline {
    backend: std::sync::Arc<dyn VisionBackend>,
    simplifier: ContourSimplifier,
}

impl AdvancedPipeline {
    pub fn new(backend: std::sync::Arc<dyn VisionBackend>) -> Self {
        Self {
            backend,
            simplifier: ContourSimplifier::default(),
        }
    }

    pub fn with_simplifier(mut self, simplifier: ContourSimplifier) -> Self {
        self.simplifier = simplifier;
        self
    }

    pub fn backend(&self) -> &dyn VisionBackend {
        self.backend.as_ref()
    }

    pub fn trace(&self, input: &RasterBuffer, settings: &TraceSettings) -> Result<EdgeMap> {
        let gray = self.backend.to_grayscale(input.as_rgba())?;
        let (low, high) = settings.threshold.canny_pair();
        let edges = self.backend.canny(&gray, low, high)?;
        drop(gray);

        if !settings.simplify {
            return Ok(EdgeMap::Raster(edges));
        }
        let polygons = self.simplifier.simplify(self.backend(), &edges)?;
        Ok(EdgeMap::Polygons(polygons))
    }
}

impl std::fmt::Debug for AdvancedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvancedPipeline")
            .field("backend", &self.backend.name())
            .field("simplifier", &self.simplifier)
            .finish()
    }
}
