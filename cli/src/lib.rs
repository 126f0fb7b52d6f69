use clap::ValueEnum;
use lineart::{CapabilitySelector, ExportFormat, LineArtError, ProcessReport, Session, TraceSettings};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    LineArt(#[from] lineart::LineArtError),
    #[error("Job lists no export formats")]
    NoFormats,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Tracing configuration for one image
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TraceJob {
    pub input: String,
    pub output_dir: String,
    /// Output file stem; defaults to the input file stem.
    pub name: Option<String>,
    #[serde(default)]
    pub settings: TraceSettings,
    #[serde(default = "default_formats")]
    pub formats: Vec<ExportFormat>,
}

fn default_formats() -> Vec<ExportFormat> {
    vec![ExportFormat::Png]
}

impl TraceJob {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let job: TraceJob = toml::from_str(content)?;
        job.validate()?;
        Ok(job)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CliError> {
        let job: TraceJob = serde_json::from_str(content)?;
        job.validate()?;
        Ok(job)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    fn validate(&self) -> Result<(), CliError> {
        if self.formats.is_empty() {
            return Err(CliError::NoFormats);
        }
        Ok(())
    }

    pub fn output_stem(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            Path::new(&self.input)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "traced-image".to_string())
        })
    }

    pub fn output_path(&self, format: ExportFormat) -> PathBuf {
        Path::new(&self.output_dir).join(format!("{}.{}", self.output_stem(), format.extension()))
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TraceJob)
    }

    /// Trace the input and write every requested format.
    ///
    /// Any load or processing error aborts the job. A vector format the run
    /// cannot provide (simplify off, or the fallback pipeline) is skipped.
    pub async fn run(&self, selector: &CapabilitySelector) -> Result<JobReport, CliError> {
        fs::create_dir_all(&self.output_dir)?;

        let session = Session::new(self.settings);
        session.load_image(&self.input)?;
        let process = session.process(selector).await?;
        tracing::info!("Traced {} ({} pipeline, {} edges)", self.input, process.pipeline, process.edge_count);

        let mut report = JobReport { process, written: Vec::new(), skipped: Vec::new() };
        for &format in &self.formats {
            let path = self.output_path(format);
            match session.save(format, &path) {
                Ok(()) => {
                    tracing::info!("Saved {:?}", path);
                    report.written.push(path);
                }
                Err(e @ LineArtError::UnsupportedExport(_)) => {
                    tracing::warn!("Skipping {} export: {}", format, e.user_message());
                    report.skipped.push(format);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(report)
    }
}

/// What [`TraceJob::run`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub process: ProcessReport,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<ExportFormat>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// User preferences persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
}

impl Preferences {
    /// Read preferences, or the defaults when the file does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Flip the theme and persist it.
    pub fn toggle_theme<P: AsRef<Path>>(&mut self, path: P) -> Result<Theme, CliError> {
        self.theme = self.theme.toggled();
        self.save(path)?;
        Ok(self.theme)
    }
}
