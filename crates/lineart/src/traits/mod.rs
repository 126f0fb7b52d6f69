use std::{future::Future, pin::Pin, sync::Arc};

use image::{GrayImage, RgbaImage};

use crate::{error::Result, types::PixelPoint};

/// Operations consumed from an external vision library.
///
/// Every value handed back is owned by the caller, so intermediate
/// images and contour lists are released when they leave scope, on early
/// returns as well as on success.
pub trait VisionBackend: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// RGBA to single-channel luminance.
    fn to_grayscale(&self, image: &RgbaImage) -> Result<GrayImage>;

    /// Canny edge operator; edge pixels are non-zero in the result.
    fn canny(&self, gray: &GrayImage, low: f32, high: f32) -> Result<GrayImage>;

    /// Outermost contours of a binary image. Holes and contours nested
    /// inside another contour are not returned.
    fn find_external_contours(&self, edges: &GrayImage) -> Result<Vec<Vec<PixelPoint>>>;

    /// Length of a curve, including the closing edge when `closed`.
    fn arc_length(&self, curve: &[PixelPoint], closed: bool) -> f64;

    /// Reduce a curve to fewer vertices within `epsilon` of the original.
    fn approximate_polygon(&self, curve: &[PixelPoint], epsilon: f64, closed: bool) -> Vec<PixelPoint>;
}

/// Future returned by [`BackendLoader::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Arc<dyn VisionBackend>>> + Send + 'a>>;

/// Best-effort asynchronous acquisition of a [`VisionBackend`].
pub trait BackendLoader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with [`LineArtError::LibraryUnavailable`](crate::LineArtError::LibraryUnavailable)
    /// when the backend cannot be provided.
    fn load(&self) -> LoadFuture<'_>;
}
