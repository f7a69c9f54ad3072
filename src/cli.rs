use crate::config::{Config, load_config};
use crate::graph::Graph;
use crate::ir::DiagramSource;
use crate::layout::ViewportMetrics;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::theme::Theme;
use crate::view::DiagramView;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "STACKMAP_LOG";

#[derive(Parser, Debug)]
#[command(name = "stackmap", version, about = "Layered technology-stack diagrams with routed connectors")]
pub struct Args {
    /// Input file (.json5/.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout, render, interaction)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Theme, overriding the config file
    #[arg(short = 't', long = "theme", value_enum)]
    pub theme: Option<ThemeName>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Layer key to show, or 'all'
    #[arg(short = 'l', long = "layer")]
    pub layer: Option<String>,

    /// Node id to select before rendering
    #[arg(short = 's', long = "select")]
    pub select: Option<String>,

    /// Write the computed layout as JSON to this path
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Modern,
    Dark,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging();
    execute(&args)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn execute(args: &Args) -> Result<()> {
    let config = resolve_config(args)?;
    let input = read_input(args.input.as_deref())?;
    let source = DiagramSource::parse(&input)?;
    let graph = Graph::from_source(&source)?;
    tracing::info!(nodes = graph.len(), layers = graph.layers().len(), "loaded diagram");

    let metrics = ViewportMetrics::unmeasured(config.render.width, config.render.height);
    let mut view = DiagramView::new(graph, &config, metrics);
    if let Some(layer) = args.layer.as_deref() {
        view.set_layer(layer).inspect_err(|err| {
            tracing::warn!(layer, %err, "layer switch rejected");
        })?;
    }
    if let Some(id) = args.select.as_deref() {
        view.select_node(id).inspect_err(|err| {
            tracing::warn!(node = id, %err, "selection rejected");
        })?;
    }

    let svg = render_svg(&view.frame(), view.graph(), &config.theme, &config);
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
    }

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &view)?;
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(theme) = args.theme {
        config.theme = match theme {
            ThemeName::Modern => Theme::modern(),
            ThemeName::Dark => Theme::dark(),
        };
    }
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
