use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use ayeeye::*;

#[derive(Debug, Parser)]
#[command(
    name = "ayeeye",
    about = "Annotate chat text with detected rhetorical biases and render the hierarchy map."
)]
struct AnnotateArgs {
    /// Path to the detector output (JSON with text and annotations). Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Path to the output file. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output format (defaults to the output file extension or html).
    #[arg(short = 'e', long = "output-format")]
    output_format: Option<OutputFormat>,

    /// Canvas width for the settled graph layout.
    #[arg(long = "canvas-width", default_value_t = DEFAULT_CANVAS_WIDTH)]
    canvas_width: f32,

    /// Canvas height for the settled graph layout.
    #[arg(long = "canvas-height", default_value_t = DEFAULT_CANVAS_HEIGHT)]
    canvas_height: f32,

    /// Maximum simulation ticks to run before the layout is considered settled.
    #[arg(long = "settle-ticks", default_value_t = 500)]
    settle_ticks: usize,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Html,
    Json,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
        {
            Some(ext) if ext == "html" || ext == "htm" => Some(OutputFormat::Html),
            Some(ext) if ext == "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// The bias detector's output document, as fed to the CLI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputDocument {
    text: String,
    #[serde(default)]
    annotations: Vec<BiasAnnotation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportPayload {
    text: String,
    spans: Vec<LocatedSpan>,
    segments: Vec<Segment>,
    html: String,
    graph: HierarchyGraph,
    positions: HashMap<String, NodePosition>,
    svg: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(err) = dispatch() {
        eprintln!("\u{001b}[31merror:\u{001b}[0m {err:?}");
        std::process::exit(1);
    }
}

fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let rest: Vec<String> = std::iter::once(args[0].clone())
                .chain(args.iter().skip(2).cloned())
                .collect();
            run_serve_command(rest)
        }
        Some("annotate") => {
            let annotate_args = AnnotateArgs::parse_from(
                std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned()),
            );
            run_annotate(annotate_args)
        }
        _ => {
            let annotate_args = AnnotateArgs::parse_from(args);
            run_annotate(annotate_args)
        }
    }
}

#[cfg(feature = "server")]
fn run_serve_command(args: Vec<String>) -> Result<()> {
    let serve_args = serve::ServeArgs::parse_from(args);
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(serve::run_serve(serve_args, None))
}

#[cfg(not(feature = "server"))]
fn run_serve_command(_args: Vec<String>) -> Result<()> {
    anyhow::bail!("this build does not include the server feature; rebuild with --features server");
}

fn run_annotate(cli: AnnotateArgs) -> Result<()> {
    let input_source = parse_input(cli.input.as_deref())?;
    let output_dest = parse_output(cli.output.as_deref())?;
    let format = determine_format(cli.output_format, &output_dest);

    let raw = load_input(&input_source)?;
    let document: InputDocument =
        serde_json::from_str(&raw).context("failed to parse detector output document")?;

    let spans = locate(&document.text, &document.annotations);
    let markup = AnnotatedText::render(&document.text, &spans);
    let graph = HierarchyGraph::build(&document.annotations);

    let mut layout = ForceLayout::new(&graph, cli.canvas_width, cli.canvas_height)?;
    layout.run_to_idle(cli.settle_ticks);

    let rendered = match format {
        OutputFormat::Html => render_report_html(&markup, &graph, &layout),
        OutputFormat::Json => {
            let html = markup.to_html();
            let svg = render_graph_svg(&graph, &layout);
            let payload = ReportPayload {
                text: document.text,
                spans,
                segments: markup.segments,
                html,
                positions: layout.positions(),
                graph,
                svg,
            };
            let mut json = serde_json::to_string_pretty(&payload)?;
            json.push('\n');
            json
        }
    };

    write_output(output_dest, rendered.as_bytes(), cli.quiet)?;
    Ok(())
}

fn render_report_html(
    markup: &AnnotatedText,
    graph: &HierarchyGraph,
    layout: &ForceLayout,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AyeEye bias report</title>
<style>
  body {{ font-family: Inter, system-ui, sans-serif; margin: 2rem; color: #1a202c; }}
  .bias-highlight {{ border-bottom: 2px solid #ef4444; }}
  .bias-highlight.active {{ background: #fef3c7; }}
  .bias-text-container {{ max-width: 48rem; line-height: 1.6; white-space: pre-wrap; }}
  .bias-map {{ margin-top: 2rem; }}
</style>
</head>
<body>
<h1>Bias report</h1>
<p>{} bias instance(s) across {} categor{}.</p>
<div class="bias-text-container">{}</div>
{}</body>
</html>
"#,
        graph.instance_count(),
        graph.category_count(),
        if graph.category_count() == 1 { "y" } else { "ies" },
        markup.to_html(),
        render_graph_svg(graph, layout)
    );
    html
}

fn parse_input(input: Option<&str>) -> Result<InputSource> {
    match input {
        None | Some("-") => Ok(InputSource::Stdin),
        Some(path) => Ok(InputSource::File(PathBuf::from(path))),
    }
}

fn parse_output(output: Option<&str>) -> Result<OutputDestination> {
    match output {
        None | Some("-") => Ok(OutputDestination::Stdout),
        Some(path) => Ok(OutputDestination::File(PathBuf::from(path))),
    }
}

fn determine_format(
    requested: Option<OutputFormat>,
    destination: &OutputDestination,
) -> OutputFormat {
    if let Some(format) = requested {
        return format;
    }
    if let OutputDestination::File(path) = destination {
        if let Some(format) = OutputFormat::from_path(path) {
            return format;
        }
    }
    OutputFormat::Html
}

fn load_input(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read detector output from stdin")?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display())),
    }
}

fn write_output(destination: OutputDestination, bytes: &[u8], quiet: bool) -> Result<()> {
    match destination {
        OutputDestination::Stdout => {
            io::stdout()
                .write_all(bytes)
                .context("failed to write output to stdout")?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("wrote bias report to {}", path.display());
            }
        }
    }
    Ok(())
}
