use anyhow::{Context, Result};
use ax25map_app::{FileLogSource, LayoutOutcome, LayoutSession, LogSource, StaticLogSource, TopologyService};
use ax25map_core::SsidMode;
use ax25map_events::{EventBus, LayoutAlgorithm};
use ax25map_graph::{Canvas, InvalidCanvas, LayoutConfig};
use ax25map_index::{BuilderOptions, ExportFormat, ExportOptions, export};
use ax25map_project::{FileLayoutStore, Settings};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Packet-radio network topology mapper", long_about = None)]
struct Cli {
    /// Settings file (JSON). Missing keys fall back to defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the topology from a monitor log and print it
    Topology(TopologyArgs),
    /// Lay out the topology and print positions, anchors and quality
    Layout(LayoutArgs),
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Monitor log to read, `-` for stdin. Defaults to the configured log
    /// with `--config`, stdin otherwise
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Treat `CALL-1` and `CALL-2` as different stations
    #[arg(long)]
    keep_ssid: bool,
}

#[derive(clap::Args, Debug)]
struct TopologyArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[arg(long)]
    directed: bool,

    /// Include stations with no hop edges in text exports
    #[arg(long)]
    emit_isolated: bool,
}

#[derive(clap::Args, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    input: InputArgs,

    /// force-directed, spring or hub
    #[arg(short, long)]
    algorithm: Option<LayoutAlgorithm>,

    #[arg(long)]
    width: Option<f32>,

    #[arg(long)]
    height: Option<f32>,

    /// Fixed seed for reproducible placements
    #[arg(long)]
    seed: Option<u64>,

    /// Save the resulting layout, into the configured layouts directory
    /// unless one is given
    #[arg(long)]
    save: Option<Option<PathBuf>>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Dot,
    Mermaid,
    Edges,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let configured = cli.config.is_some();
    match cli.command {
        Command::Topology(args) => run_topology(&settings, configured, args),
        Command::Layout(args) => run_layout(&settings, configured, args),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogInput {
    File(PathBuf),
    Stdin,
}

impl LogInput {
    fn resolve(settings: &Settings, configured: bool, input: &InputArgs) -> Self {
        match &input.input {
            Some(path) if path.as_path() == Path::new("-") => LogInput::Stdin,
            Some(path) => LogInput::File(path.clone()),
            None if configured => LogInput::File(settings.log_file_path.clone()),
            None => LogInput::Stdin,
        }
    }
}

fn save_dir(settings: &Settings, save: Option<Option<PathBuf>>) -> Option<PathBuf> {
    save.map(|dir| dir.unwrap_or_else(|| settings.layouts_dir.clone()))
}

fn canvas_for(settings: &Settings, args: &LayoutArgs) -> Result<Canvas, InvalidCanvas> {
    Canvas::try_new(
        args.width.unwrap_or(settings.canvas_width),
        args.height.unwrap_or(settings.canvas_height),
    )
}

fn builder_options(settings: &Settings, input: &InputArgs) -> BuilderOptions {
    BuilderOptions {
        ssid_mode: if input.keep_ssid {
            SsidMode::Keep
        } else {
            settings.ssid_mode()
        },
        include_destinations: settings.include_destinations,
    }
}

fn log_source(input: LogInput) -> Result<Box<dyn LogSource>> {
    if let LogInput::File(path) = input {
        return Ok(Box::new(FileLogSource::new(path)));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read log from stdin")?;
    Ok(Box::new(StaticLogSource::from_text(&text)))
}

fn load_service(settings: &Settings, configured: bool, input: &InputArgs) -> Result<TopologyService> {
    let service = TopologyService::new(builder_options(settings, input), EventBus::new());
    let source = log_source(LogInput::resolve(settings, configured, input))?;
    service.refresh(source.as_ref())?;
    Ok(service)
}

fn run_topology(settings: &Settings, configured: bool, args: TopologyArgs) -> Result<()> {
    let service = load_service(settings, configured, &args.input)?;
    let graph = service.snapshot();

    let options = ExportOptions {
        directed: args.directed,
        emit_isolated: args.emit_isolated,
    };
    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(graph.as_ref())?,
        OutputFormat::Dot => export(&graph, ExportFormat::Dot, options),
        OutputFormat::Mermaid => export(&graph, ExportFormat::Mermaid, options),
        OutputFormat::Edges => export(&graph, ExportFormat::Edges, options),
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn run_layout(settings: &Settings, configured: bool, args: LayoutArgs) -> Result<()> {
    let canvas = canvas_for(settings, &args)?;
    let service = load_service(settings, configured, &args.input)?;

    let algorithm = args.algorithm.unwrap_or(settings.layout_algorithm);
    let config = LayoutConfig {
        seed: args.seed.or(settings.layout_seed),
    };

    let mut session = LayoutSession::new(canvas, config, settings.anchor_debounce(), service.events().clone());
    let report = match session.run(algorithm, &service) {
        LayoutOutcome::Completed(report) => report,
        LayoutOutcome::Stale { algorithm } => {
            anyhow::bail!("Topology changed during the {algorithm} layout run")
        }
    };

    if let Some(dir) = save_dir(settings, args.save) {
        let store = FileLayoutStore::new(&dir);
        session.save_layout(&store)?;
        tracing::info!("Saved {algorithm} layout to {}", store.path_for(algorithm).display());
    }

    println!("{}", serde_json::to_string_pretty(report.as_ref())?);
    Ok(())
}
