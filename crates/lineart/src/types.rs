use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// Integer pixel coordinate `[x, y]` in image space.
pub type PixelPoint = [i32; 2];

/// The single edge-sensitivity control value.
///
/// One stored integer feeds both pipelines: the fallback detector compares
/// gradient magnitudes against [`Threshold::gradient_cutoff`], the advanced
/// pipeline hands [`Threshold::canny_pair`] to the Canny operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Threshold(i32);

impl Threshold {
    /// Lower bound of the interactive range.
    pub const MIN: i32 = 0;
    /// Upper bound of the interactive range.
    pub const MAX: i32 = 255;
    /// Scale applied to the normalized value for the gradient comparison.
    pub const GRADIENT_SCALE: f64 = 1000.0;

    /// Wrap a raw value as-is. Out-of-range values are accepted.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Wrap a raw value clamped to `[MIN, MAX]`.
    pub fn clamped(raw: i32) -> Self {
        Self(raw.clamp(Self::MIN, Self::MAX))
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// `raw / 255`
    pub fn normalized(self) -> f64 {
        f64::from(self.0) / 255.0
    }

    /// Magnitude a fallback gradient must strictly exceed to count as an edge.
    pub fn gradient_cutoff(self) -> f64 {
        self.normalized() * Self::GRADIENT_SCALE
    }

    /// `(low, high)` hysteresis pair for Canny: `(0.5 * raw, raw)`.
    pub fn canny_pair(self) -> (f32, f32) {
        let high = self.0 as f32;
        (high * 0.5, high)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(100)
    }
}

impl From<i32> for Threshold {
    fn from(raw: i32) -> Self {
        Self::new(raw)
    }
}

/// A short drawable stroke emitted by the fallback detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSegment {
    pub start: PixelPoint,
    pub end: PixelPoint,
}

impl EdgeSegment {
    pub fn new(start: PixelPoint, end: PixelPoint) -> Self {
        Self { start, end }
    }
}

/// A closed polygon produced by contour approximation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedPolygon {
    /// Ordered vertices; the closing edge back to the first vertex is implicit.
    pub vertices: Vec<PixelPoint>,
    /// Closed arc length of the source contour.
    pub perimeter: f64,
    /// Absolute approximation tolerance used for this contour.
    pub tolerance: f64,
}

impl TracedPolygon {
    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .vertices
            .iter()
            .map(|&[x, y]| Coord {
                x: f64::from(x),
                y: f64::from(y),
            })
            .collect();

        Polygon::new(LineString::new(coords), vec![])
    }

    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    /// Edges of the closed path, including the one returning to the start.
    pub fn edges(&self) -> impl Iterator<Item = (PixelPoint, PixelPoint)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Simplified polygons together with the dimensions they were traced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedOutline {
    pub polygons: Vec<TracedPolygon>,
    pub image_width: u32,
    pub image_height: u32,
}

/// Output of one processing run, rebuilt from scratch every time.
#[derive(Debug, Clone)]
pub enum EdgeMap {
    /// Micro-segments from the fallback detector, in raster-scan order.
    Marks(Vec<EdgeSegment>),
    /// Binary Canny output (non-zero = edge).
    Raster(GrayImage),
    /// Approximated external contours.
    Polygons(Vec<TracedPolygon>),
}

impl EdgeMap {
    /// Number of drawable items (marks, edge pixels or polygons).
    pub fn len(&self) -> usize {
        match self {
            Self::Marks(marks) => marks.len(),
            Self::Raster(edges) => edges.pixels().filter(|p| p.0[0] > 0).count(),
            Self::Polygons(polygons) => polygons.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn polygons(&self) -> Option<&[TracedPolygon]> {
        match self {
            Self::Polygons(polygons) => Some(polygons),
            _ => None,
        }
    }
}

/// Neighbour selection used by the fallback gradient.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GradientKernel {
    /// Flat-index neighbour arithmetic of the reference tracer. `Gy` samples
    /// the two pixels right of `top` and `bottom` rather than a true 3x3 window.
    #[default]
    Reference,
    /// Textbook 3x3 Sobel on the red channel.
    Sobel,
}

/// How a detected edge pixel is turned into a drawable stroke.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarkStyle {
    /// `(x, y) -> (x + 1, y + 1)` regardless of edge direction.
    #[default]
    Diagonal,
    /// One-pixel step along the edge, perpendicular to the gradient.
    EdgeTangent,
}

/// Whether the advanced pipeline may be attempted at all.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendPreference {
    /// Load the vision backend if possible, otherwise degrade.
    #[default]
    Auto,
    /// Never load the vision backend.
    Fallback,
}

/// User-facing processing controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TraceSettings {
    #[schemars(range(min = 0, max = 255))]
    pub threshold: Threshold,
    /// Emit vector polygons instead of a raw edge raster.
    pub simplify: bool,
    pub kernel: GradientKernel,
    pub marks: MarkStyle,
    pub backend: BackendPreference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_interpretations_derive_from_one_value() {
        let threshold = Threshold::new(200);
        assert_eq!(threshold.canny_pair(), (100.0, 200.0));
        assert!((threshold.normalized() - 200.0 / 255.0).abs() < 1e-12);
        assert!((threshold.gradient_cutoff() - 200.0 / 255.0 * 1000.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_new_does_not_clamp() {
        assert_eq!(Threshold::new(-10).raw(), -10);
        assert_eq!(Threshold::new(900).raw(), 900);
        assert_eq!(Threshold::clamped(900).raw(), 255);
        assert_eq!(Threshold::clamped(-3).raw(), 0);
    }

    #[test]
    fn zero_threshold_has_zero_cutoff() {
        assert_eq!(Threshold::new(0).gradient_cutoff(), 0.0);
    }

    #[test]
    fn polygon_edges_close_the_path() {
        let polygon = TracedPolygon {
            vertices: vec![[0, 0], [4, 0], [4, 3]],
            perimeter: 12.0,
            tolerance: 0.12,
        };
        let edges: Vec<_> = polygon.edges().collect();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2], ([4, 3], [0, 0]));
        assert!((polygon.area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: TraceSettings =
            serde_json::from_str(r#"{"threshold": 42, "kernel": "sobel"}"#).expect("valid settings");
        assert_eq!(settings.threshold.raw(), 42);
        assert_eq!(settings.kernel, GradientKernel::Sobel);
        assert!(!settings.simplify);
        assert_eq!(settings.marks, MarkStyle::Diagonal);
    }
}
