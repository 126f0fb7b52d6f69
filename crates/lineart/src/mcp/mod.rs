use crate::{
    capability::{CapabilitySelector, PipelineKind},
    error::LineArtError,
    io::ExportFormat,
    session::{ProcessReport, Session, SessionCommand},
    types::{BackendPreference, GradientKernel, MarkStyle, Threshold},
};
use rmcp::{
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, Error as McpError, ServerHandler,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ts_rs::TS;

/// Request for loading an image from disk
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadImageRequest {
    #[schemars(description = "Path to the image file")]
    pub path: String,
}

/// Request for changing processing controls. Omitted fields keep their value.
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SetOptionsRequest {
    #[schemars(
        description = "Edge threshold (higher = fewer edges)",
        range(min = 0, max = 255)
    )]
    pub threshold: Option<i32>,
    #[schemars(description = "Simplify edges into polygons (advanced pipeline only)")]
    pub simplify: Option<bool>,
    #[schemars(description = "Gradient kernel for the fallback detector: reference or sobel")]
    pub kernel: Option<GradientKernel>,
    #[schemars(description = "Mark style for the fallback detector: diagonal or edge_tangent")]
    pub marks: Option<MarkStyle>,
    #[schemars(description = "Backend preference: auto or fallback")]
    pub backend: Option<BackendPreference>,
}

/// Request for writing the rendered output to a file
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportRequest {
    #[schemars(description = "Destination file path", length(min = 1))]
    pub path: String,
}

/// Response describing a completed processing run
#[derive(Debug, Serialize, schemars::JsonSchema, TS)]
#[ts(export)]
pub struct ProcessResponse {
    #[schemars(description = "Pipeline that produced the output: advanced or fallback")]
    pub pipeline: String,
    pub width: u32,
    pub height: u32,
    #[schemars(description = "Number of marks, edge pixels or polygons")]
    pub edge_count: u32,
    #[schemars(description = "Whether simplified polygons are available for SVG/GeoJSON export")]
    pub simplified: bool,
}

impl From<ProcessReport> for ProcessResponse {
    fn from(report: ProcessReport) -> Self {
        Self {
            pipeline: report.pipeline.to_string(),
            width: report.width,
            height: report.height,
            edge_count: u32::try_from(report.edge_count).unwrap_or(u32::MAX),
            simplified: report.simplified,
        }
    }
}

/// MCP server exposing a line art session as tools
#[derive(Clone)]
pub struct LineArtMcpServer {
    session: Arc<Session>,
    selector: Arc<CapabilitySelector>,
}

impl LineArtMcpServer {
    pub fn new() -> Self {
        Self::with_selector(CapabilitySelector::default())
    }

    pub fn with_selector(selector: CapabilitySelector) -> Self {
        Self {
            session: Arc::new(Session::default()),
            selector: Arc::new(selector),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn export(&self, format: ExportFormat, path: &str) -> Result<CallToolResult, McpError> {
        match self.session.save(format, path) {
            Ok(()) => Ok(text(format!("Exported {format} to {path}"))),
            Err(e) => Ok(failure(&e)),
        }
    }
}

impl Default for LineArtMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

fn text(message: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(message.into())])
}

fn failure(error: &LineArtError) -> CallToolResult {
    tracing::warn!(%error, "tool call failed");
    CallToolResult::error(vec![Content::text(error.user_message())])
}

#[tool(tool_box)]
impl LineArtMcpServer {
    #[tool(description = "Load an image file; it is scaled so its longest side is at most 500 pixels")]
    fn load_image(&self, #[tool(aggr)] LoadImageRequest { path }: LoadImageRequest) -> Result<CallToolResult, McpError> {
        match self.session.load_image(&path) {
            Ok((width, height)) => Ok(text(format!("Image loaded from {path} ({width}x{height})"))),
            Err(e) => Ok(failure(&e)),
        }
    }

    #[tool(description = "Set the edge threshold, simplify flag, fallback kernel, mark style or backend preference")]
    fn set_options(&self, #[tool(aggr)] request: SetOptionsRequest) -> Result<CallToolResult, McpError> {
        let mut settings = self.session.settings();
        if let Some(raw) = request.threshold {
            settings.threshold = Threshold::new(raw);
        }
        if let Some(simplify) = request.simplify {
            settings.simplify = simplify;
        }
        if let Some(kernel) = request.kernel {
            settings.kernel = kernel;
        }
        if let Some(marks) = request.marks {
            settings.marks = marks;
        }
        if let Some(backend) = request.backend {
            settings.backend = backend;
        }
        self.session.set_settings(settings);

        let json = serde_json::to_string_pretty(&settings)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(text(json))
    }

    #[tool(description = "Detect edges in the loaded image and render line art")]
    async fn process_image(&self) -> Result<CallToolResult, McpError> {
        match self.session.process(&self.selector).await {
            Ok(report) => {
                let response = ProcessResponse::from(report);
                let json = serde_json::to_string_pretty(&response)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                Ok(text(json))
            }
            Err(e) => Ok(failure(&e)),
        }
    }

    #[tool(description = "Write the rendered line art to a PNG file")]
    fn export_png(&self, #[tool(aggr)] ExportRequest { path }: ExportRequest) -> Result<CallToolResult, McpError> {
        self.export(ExportFormat::Png, &path)
    }

    #[tool(description = "Write the simplified shapes to an SVG file (requires simplify)")]
    fn export_svg(&self, #[tool(aggr)] ExportRequest { path }: ExportRequest) -> Result<CallToolResult, McpError> {
        self.export(ExportFormat::Svg, &path)
    }

    #[tool(description = "Write the simplified shapes to a GeoJSON file (requires simplify)")]
    fn export_geojson(&self, #[tool(aggr)] ExportRequest { path }: ExportRequest) -> Result<CallToolResult, McpError> {
        self.export(ExportFormat::GeoJson, &path)
    }

    #[tool(description = "Report whether the vision backend is loaded and which pipeline the next run would try")]
    fn get_status(&self) -> String {
        let settings = self.session.settings();
        let preferred = match settings.backend {
            BackendPreference::Auto => PipelineKind::Advanced,
            BackendPreference::Fallback => PipelineKind::Fallback,
        };
        format!(
            "backend: {} (loaded: {})\npreferred pipeline: {preferred}\nimage loaded: {}\noutput ready: {}\nbusy: {}",
            self.selector.loader_name(),
            self.selector.is_loaded(),
            self.session.input().is_some(),
            self.session.output().is_some(),
            self.session.is_busy(),
        )
    }

    #[tool(description = "Get the JSON schema for SessionCommand")]
    fn get_command_schema(&self) -> String {
        let schema = SessionCommand::schema();
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|e| format!("Failed to serialize schema: {}", e))
    }
}

#[tool(tool_box)]
impl ServerHandler for LineArtMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Line Art Server - Convert images to black-on-white line art using Canny edge detection with contour simplification, or a built-in gradient detector when no vision backend is available.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::UnavailableLoader;

    #[test]
    fn response_uses_pipeline_name() {
        let response = ProcessResponse::from(ProcessReport {
            pipeline: PipelineKind::Fallback,
            width: 10,
            height: 8,
            edge_count: 3,
            simplified: false,
        });
        assert_eq!(response.pipeline, "fallback");
        assert_eq!(response.edge_count, 3);
    }

    #[test]
    fn set_options_keeps_unspecified_fields() {
        let server = LineArtMcpServer::with_selector(CapabilitySelector::new(UnavailableLoader::default()));
        server
            .set_options(SetOptionsRequest { simplify: Some(true), ..Default::default() })
            .expect("first update");
        server
            .set_options(SetOptionsRequest { threshold: Some(40), ..Default::default() })
            .expect("second update");

        let settings = server.session().settings();
        assert!(settings.simplify);
        assert_eq!(settings.threshold.raw(), 40);
    }

    #[tokio::test]
    async fn processing_without_image_reports_an_error_result() {
        let server = LineArtMcpServer::with_selector(CapabilitySelector::new(UnavailableLoader::default()));
        let result = server.process_image().await.expect("tool result");
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn schema_tool_lists_commands() {
        let schema = LineArtMcpServer::default().get_command_schema();
        assert!(schema.contains("load_image"));
        assert!(schema.contains("export"));
    }
}
