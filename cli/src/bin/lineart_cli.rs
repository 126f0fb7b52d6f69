use clap::{Parser, Subcommand, ValueEnum};
use cli::{Preferences, Theme, TraceJob};
use color_eyre::eyre::{eyre, Result};
use lineart::{
    BackendPreference, CapabilitySelector, ExportFormat, GradientKernel, MarkStyle,
    Session, SessionCommand, Threshold, TraceSettings,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Preferences file
    #[arg(long, global = true, default_value = "lineart.toml")]
    prefs: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one image to line art
    Trace {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Output file; the extension picks PNG, SVG or GeoJSON
        #[arg(short, long)]
        output: PathBuf,
        /// Edge threshold, 0-255 (higher = fewer edges)
        #[arg(short, long, default_value_t = Threshold::default().raw())]
        threshold: i32,
        /// Simplify edges into polygons
        #[arg(short, long)]
        simplify: bool,
        /// Gradient kernel for the fallback detector
        #[arg(long, value_enum, default_value_t = KernelArg::Reference)]
        kernel: KernelArg,
        /// Mark style for the fallback detector
        #[arg(long, value_enum, default_value_t = MarksArg::Diagonal)]
        marks: MarksArg,
        /// Skip the vision backend and use the gradient detector
        #[arg(long)]
        fallback: bool,
    },
    /// Trace the image described by a TOML or JSON job file
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the JSON schema for job files or session commands
    Schema {
        #[arg(value_enum, default_value_t = SchemaKind::Job)]
        kind: SchemaKind,
    },
    /// Show or change the persisted theme
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    Show,
    Toggle,
    Set {
        #[arg(value_enum)]
        theme: Theme,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KernelArg {
    Reference,
    Sobel,
}

#[derive(Clone, Copy, ValueEnum)]
enum MarksArg {
    Diagonal,
    EdgeTangent,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    Job,
    Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trace { input, output, threshold, simplify, kernel, marks, fallback } => {
            let settings = TraceSettings {
                threshold: Threshold::new(threshold),
                simplify,
                kernel: match kernel {
                    KernelArg::Reference => GradientKernel::Reference,
                    KernelArg::Sobel => GradientKernel::Sobel,
                },
                marks: match marks {
                    MarksArg::Diagonal => MarkStyle::Diagonal,
                    MarksArg::EdgeTangent => MarkStyle::EdgeTangent,
                },
                backend: if fallback { BackendPreference::Fallback } else { BackendPreference::Auto },
            };
            trace_one(&CapabilitySelector::default(), &input, &output, settings).await?;
        }
        Commands::Run { config } => run_job(&config).await?,
        Commands::Schema { kind } => {
            let json = match kind {
                SchemaKind::Job => serde_json::to_string_pretty(&TraceJob::schema())?,
                SchemaKind::Command => serde_json::to_string_pretty(&SessionCommand::schema())?,
            };
            println!("{json}");
        }
        Commands::Theme { action } => {
            let mut prefs = Preferences::load(&cli.prefs)?;
            match action {
                ThemeAction::Show => println!("{}", prefs.theme),
                ThemeAction::Toggle => println!("{}", prefs.toggle_theme(&cli.prefs)?),
                ThemeAction::Set { theme } => {
                    prefs.theme = theme;
                    prefs.save(&cli.prefs)?;
                    println!("{}", prefs.theme);
                }
            }
        }
    }

    Ok(())
}

fn format_for(path: &Path) -> Result<ExportFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => Ok(ExportFormat::Png),
        "svg" => Ok(ExportFormat::Svg),
        "geojson" | "json" => Ok(ExportFormat::GeoJson),
        other => Err(eyre!("Cannot export to '.{other}', use .png, .svg or .geojson")),
    }
}

async fn trace_one(
    selector: &CapabilitySelector,
    input: &Path,
    output: &Path,
    settings: TraceSettings,
) -> Result<()> {
    let format = format_for(output)?;
    let session = Session::new(settings);
    session.load_image(input)?;
    let report = session.process(selector).await?;
    info!(
        "Traced {:?} with the {} pipeline: {} edges at {}x{}",
        input, report.pipeline, report.edge_count, report.width, report.height
    );
    session.save(format, output)?;
    info!("Saved {:?}", output);
    Ok(())
}

async fn run_job(config_path: &Path) -> Result<()> {
    let job = TraceJob::from_file(config_path)?;
    info!("Loaded job for {}", job.input);
    let report = job.run(&CapabilitySelector::default()).await?;
    info!("Job completed: {} written, {} skipped", report.written.len(), report.skipped.len());
    Ok(())
}
