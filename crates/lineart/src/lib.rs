//! # Line Art Edge Detection Library
//!
//! Turns a photo or drawing into black-on-white line art. Processing runs
//! through one of two pipelines:
//!
//! - **Advanced**: Canny edge detection from a vision backend, optionally
//!   followed by external contour extraction and Douglas-Peucker
//!   simplification scaled to each contour's perimeter.
//! - **Fallback**: a built-in gradient magnitude detector that emits short
//!   diagonal marks wherever the gradient exceeds the threshold.
//!
//! The [`CapabilitySelector`] loads the vision backend on demand and falls
//! back silently when it is unavailable. A [`Session`] holds the loaded
//! image, the controls and the last rendered output, and exports it as PNG,
//! or as SVG and GeoJSON when simplified shapes are available.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lineart::{CapabilitySelector, ExportFormat, Session, TraceSettings};
//!
//! # async fn run() -> lineart::Result<()> {
//! let session = Session::new(TraceSettings { simplify: true, ..Default::default() });
//! let selector = CapabilitySelector::default();
//!
//! session.load_image("drawing.jpg")?;
//! let report = session.process(&selector).await?;
//! println!("{} pipeline, {} edges", report.pipeline, report.edge_count);
//!
//! session.save(ExportFormat::Svg, "drawing.svg")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Fallback Detector Only
//!
//! ```rust,no_run
//! use lineart::{GradientEdgeDetector, RasterBuffer, Renderer, EdgeMap, Threshold};
//!
//! let input = RasterBuffer::open_for_display("drawing.png")?;
//! let marks = GradientEdgeDetector::default().detect(&input, Threshold::new(60));
//! let art = Renderer::default().render(input.width(), input.height(), &EdgeMap::Marks(marks));
//! art.save_png("drawing-lines.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod raster;
pub mod traits;
pub mod algorithms;
pub mod vision;
pub mod capability;
pub mod pipeline;
pub mod render;
pub mod io;
pub mod session;
pub mod mcp;

pub use error::{LineArtError, Result};
pub use types::*;
pub use raster::RasterBuffer;
pub use traits::*;
pub use algorithms::*;
pub use vision::{ImageprocBackend, ImageprocLoader, UnavailableLoader};
pub use capability::{CapabilitySelector, PipelineKind};
pub use pipeline::{FallbackPipeline, Pipeline};
pub use render::Renderer;
pub use io::*;
pub use session::{CommandOutcome, ProcessReport, RenderedOutput, Session, SessionCommand};
