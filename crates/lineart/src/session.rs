use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    capability::{CapabilitySelector, PipelineKind},
    error::{LineArtError, Result},
    io::{ExportFormat, SvgExporter},
    raster::RasterBuffer,
    render::Renderer,
    types::{EdgeMap, Threshold, TraceSettings, TracedOutline},
};

const NO_IMAGE: &str = "Please upload an image first";
const NO_OUTPUT: &str = "Please process an image first";
const VECTOR_NEEDS_SIMPLIFY: &str = "SVG download only available with simplified shapes";

/// The result of the most recent successful run.
#[derive(Debug, Clone)]
pub struct RenderedOutput {
    pub raster: RasterBuffer,
    pub edges: EdgeMap,
    pub pipeline: PipelineKind,
    pub settings: TraceSettings,
}

/// Summary of one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessReport {
    pub pipeline: PipelineKind,
    pub width: u32,
    pub height: u32,
    /// Marks, edge pixels or polygons, depending on the output kind.
    pub edge_count: usize,
    pub simplified: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    input: Option<Arc<RasterBuffer>>,
    output: Option<Arc<RenderedOutput>>,
    settings: TraceSettings,
}

/// One image, its processed output and the controls that produced it.
///
/// At most one run is in flight at a time; a second call to
/// [`process`](Self::process) while one is running fails with
/// [`LineArtError::Busy`]. The output is replaced only when a run succeeds.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
    busy: AtomicBool,
    renderer: Renderer,
}

/// Holds the busy flag for the lifetime of a run, including runs whose
/// future is dropped before completion.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LineArtError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new(settings: TraceSettings) -> Self {
        Self {
            state: Mutex::new(SessionState {
                settings,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> TraceSettings {
        self.lock().settings
    }

    pub fn set_settings(&self, settings: TraceSettings) {
        self.lock().settings = settings;
    }

    pub fn set_threshold(&self, raw: i32) {
        self.lock().settings.threshold = Threshold::new(raw);
    }

    pub fn set_simplify(&self, simplify: bool) {
        self.lock().settings.simplify = simplify;
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Load an image file, scaled to the display cap. Clears any previous output.
    pub fn load_image<P: AsRef<Path>>(&self, path: P) -> Result<(u32, u32)> {
        let buffer = RasterBuffer::open_for_display(path)?;
        Ok(self.set_image(buffer))
    }

    /// Decode an uploaded image, scaled to the display cap. Clears any previous output.
    pub fn load_image_from_bytes(&self, bytes: &[u8], mime: Option<&str>) -> Result<(u32, u32)> {
        let buffer = RasterBuffer::decode(bytes, mime)?.fit_within(crate::raster::MAX_DISPLAY_DIMENSION);
        Ok(self.set_image(buffer))
    }

    /// Use `buffer` as the input as-is. Clears any previous output.
    pub fn set_image(&self, buffer: RasterBuffer) -> (u32, u32) {
        let dimensions = buffer.dimensions();
        let mut state = self.lock();
        state.input = Some(Arc::new(buffer));
        state.output = None;
        tracing::debug!(width = dimensions.0, height = dimensions.1, "image loaded");
        dimensions
    }

    pub fn input(&self) -> Option<Arc<RasterBuffer>> {
        self.lock().input.clone()
    }

    pub fn output(&self) -> Option<Arc<RenderedOutput>> {
        self.lock().output.clone()
    }

    /// Run edge detection on the loaded image and render the result.
    pub async fn process(&self, selector: &CapabilitySelector) -> Result<ProcessReport> {
        let (input, settings) = {
            let state = self.lock();
            let input = state
                .input
                .clone()
                .ok_or_else(|| LineArtError::NotReady(NO_IMAGE.to_string()))?;
            (input, state.settings)
        };
        let _busy = BusyGuard::acquire(&self.busy)?;

        tracing::info!(threshold = settings.threshold.raw(), simplify = settings.simplify, "Starting image processing");

        let pipeline = selector.select_pipeline(settings.backend).await;
        let edges = pipeline.trace(&input, &settings).inspect_err(|error| {
            tracing::error!(pipeline = %pipeline.kind(), %error, "Processing error");
        })?;
        let raster = self.renderer.render(input.width(), input.height(), &edges);

        let report = ProcessReport {
            pipeline: pipeline.kind(),
            width: raster.width(),
            height: raster.height(),
            edge_count: edges.len(),
            simplified: edges.polygons().is_some(),
        };

        self.lock().output = Some(Arc::new(RenderedOutput {
            raster,
            edges,
            pipeline: report.pipeline,
            settings,
        }));

        tracing::info!(pipeline = %report.pipeline, edges = report.edge_count, "Image processing completed");
        Ok(report)
    }

    fn rendered(&self) -> Result<Arc<RenderedOutput>> {
        self.output()
            .ok_or_else(|| LineArtError::NotReady(NO_OUTPUT.to_string()))
    }

    pub fn export_png(&self) -> Result<Vec<u8>> {
        self.rendered()?.raster.to_png_bytes()
    }

    pub fn png_data_url(&self) -> Result<String> {
        self.rendered()?.raster.to_png_data_url()
    }

    /// The simplified polygon set of the last run.
    ///
    /// Requires the simplify flag to be on and the last run to have produced
    /// polygons (the fallback detector never does).
    pub fn traced_outline(&self) -> Result<TracedOutline> {
        if !self.settings().simplify {
            return Err(LineArtError::UnsupportedExport(VECTOR_NEEDS_SIMPLIFY.to_string()));
        }
        let rendered = self.rendered()?;
        let polygons = rendered.edges.polygons().ok_or_else(|| {
            LineArtError::UnsupportedExport(format!(
                "{VECTOR_NEEDS_SIMPLIFY}; the {} pipeline produced none",
                rendered.pipeline
            ))
        })?;
        Ok(TracedOutline {
            polygons: polygons.to_vec(),
            image_width: rendered.raster.width(),
            image_height: rendered.raster.height(),
        })
    }

    pub fn export_svg(&self) -> Result<String> {
        let outline = self.traced_outline()?;
        Ok(SvgExporter::default().export(&outline.polygons, outline.image_width, outline.image_height))
    }

    pub fn export_geojson(&self) -> Result<String> {
        self.traced_outline()?.to_geojson_string()
    }

    /// Write the last output in `format` to `path`.
    pub fn save<P: AsRef<Path>>(&self, format: ExportFormat, path: P) -> Result<()> {
        match format {
            ExportFormat::Png => std::fs::write(path, self.export_png()?)?,
            ExportFormat::Svg => std::fs::write(path, self.export_svg()?)?,
            ExportFormat::GeoJson => std::fs::write(path, self.export_geojson()?)?,
        }
        Ok(())
    }

    pub async fn execute(&self, command: SessionCommand, selector: &CapabilitySelector) -> Result<CommandOutcome> {
        match command {
            SessionCommand::LoadImage { path } => {
                let (width, height) = self.load_image(&path)?;
                Ok(CommandOutcome::Loaded { width, height })
            }
            SessionCommand::Configure { settings } => {
                self.set_settings(settings);
                Ok(CommandOutcome::Configured { settings })
            }
            SessionCommand::Process => Ok(CommandOutcome::Processed(self.process(selector).await?)),
            SessionCommand::Export { format, path } => {
                self.save(format, &path)?;
                Ok(CommandOutcome::Exported { format, path })
            }
        }
    }
}

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum SessionCommand {
    /// Load an image file as the session input
    #[serde(rename = "load_image")]
    LoadImage {
        #[schemars(length(min = 1))]
        path: String,
    },

    /// Replace the processing controls
    #[serde(rename = "configure")]
    Configure { settings: TraceSettings },

    /// Run edge detection on the loaded image
    #[serde(rename = "process")]
    Process,

    /// Write the last output to a file
    #[serde(rename = "export")]
    Export {
        format: ExportFormat,
        #[schemars(length(min = 1))]
        path: String,
    },
}

impl SessionCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SessionCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::LoadImage { .. } => "Load an image file, scaled so its longest side is at most 500 pixels",
            Self::Configure { .. } => "Set threshold, simplify flag, kernel, mark style and backend preference",
            Self::Process => "Detect edges and render line art, using the vision backend when available",
            Self::Export { .. } => "Export the rendered output as PNG, or simplified shapes as SVG or GeoJSON",
        }
    }
}

/// What a [`SessionCommand`] did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandOutcome {
    Loaded { width: u32, height: u32 },
    Configured { settings: TraceSettings },
    Processed(ProcessReport),
    Exported { format: ExportFormat, path: String },
}
