use crate::{
    algorithms::{AdvancedPipeline, GradientEdgeDetector},
    capability::PipelineKind,
    error::{LineArtError, Result},
    raster::RasterBuffer,
    types::{EdgeMap, TraceSettings},
};

/// Built-in gradient detector. Ignores the simplify flag and always
/// produces micro-segment marks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPipeline;

impl FallbackPipeline {
    pub fn trace(&self, input: &RasterBuffer, settings: &TraceSettings) -> Result<EdgeMap> {
        let detector = GradientEdgeDetector::new(settings.kernel, settings.marks);
        Ok(EdgeMap::Marks(detector.detect(input, settings.threshold)))
    }
}

/// The strategy chosen for one processing run.
#[derive(Debug, Clone)]
pub enum Pipeline {
    Advanced(AdvancedPipeline),
    Fallback(FallbackPipeline),
}

impl Pipeline {
    pub fn kind(&self) -> PipelineKind {
        match self {
            Self::Advanced(_) => PipelineKind::Advanced,
            Self::Fallback(_) => PipelineKind::Fallback,
        }
    }

    /// Compute a fresh edge map for `input`.
    pub fn trace(&self, input: &RasterBuffer, settings: &TraceSettings) -> Result<EdgeMap> {
        let (width, height) = input.dimensions();
        if width == 0 || height == 0 {
            return Err(LineArtError::ProcessingFailure(format!(
                "cannot trace an empty {width}x{height} image"
            )));
        }
        match self {
            Self::Advanced(pipeline) => pipeline.trace(input, settings),
            Self::Fallback(pipeline) => pipeline.trace(input, settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Threshold;
    use image::{Rgba, RgbaImage};

    fn stripes() -> RasterBuffer {
        RasterBuffer::from_rgba(RgbaImage::from_fn(16, 16, |x, _| {
            if (x / 4) % 2 == 0 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        }))
    }

    #[test]
    fn fallback_ignores_simplify() {
        let settings = TraceSettings {
            threshold: Threshold::new(20),
            simplify: true,
            ..Default::default()
        };
        let edges = Pipeline::Fallback(FallbackPipeline)
            .trace(&stripes(), &settings)
            .expect("trace");
        match edges {
            EdgeMap::Marks(marks) => assert!(!marks.is_empty()),
            other => panic!("expected marks, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_a_processing_failure() {
        let result = Pipeline::Fallback(FallbackPipeline)
            .trace(&RasterBuffer::blank(0, 0), &TraceSettings::default());
        assert!(matches!(result, Err(LineArtError::ProcessingFailure(_))));
    }
}
