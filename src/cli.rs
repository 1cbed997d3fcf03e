use crate::cloud::{LabelEvent, WordCloud};
use crate::config::load_config;
use crate::layout::PlacementEngine;
use crate::layout_dump::write_layout_dump;
use crate::rasterizer::{BlockRasterizer, TextRasterizer};
use crate::render::{
    FontRasterizer, render_mask_svg, render_svg, write_output_png, write_output_svg,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "wcl", version, about = "Raster word-cloud layout")]
pub struct Args {
    /// Label events, one per line ('word', '-word', 'word 7'), or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Surface width, overrides the config file
    #[arg(short = 'w', long = "width")]
    pub width: Option<u32>,

    /// Surface height, overrides the config file
    #[arg(short = 'H', long = "height")]
    pub height: Option<u32>,

    /// Text rasterizer
    #[arg(long = "rasterizer", value_enum, default_value = "font")]
    pub rasterizer: RasterizerKind,

    /// Write the computed positions as JSON
    #[arg(long = "dump")]
    pub dump: Option<PathBuf>,

    /// Place labels one queued unit at a time
    #[arg(long = "deferred")]
    pub deferred: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterizerKind {
    Font,
    Block,
}

pub fn run() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    if let Some(width) = args.width {
        config.surface.width = width;
    }
    if let Some(height) = args.height {
        config.surface.height = height;
    }
    let render_cfg = config.render.clone();

    let input = read_input(args.input.as_deref())?;
    let events = parse_events(&input)?;
    if events.is_empty() {
        return Err(anyhow::anyhow!("No label events found in input"));
    }

    let rasterizer: Box<dyn TextRasterizer> = match args.rasterizer {
        RasterizerKind::Font => Box::new(FontRasterizer::new()),
        RasterizerKind::Block => Box::new(BlockRasterizer::new()),
    };
    let mut cloud = WordCloud::new(config, rasterizer)?;
    for (line, event) in events {
        let text = event.text().to_string();
        event
            .apply(&mut cloud)
            .with_context(|| format!("line {line}: cannot apply event for {text:?}"))?;
    }

    if args.deferred {
        cloud.schedule_layout();
        let mut units = 0usize;
        while cloud.tick() {
            units += 1;
            log::trace!("ran unit {units}, {} pending", cloud.pending());
        }
        log::info!("deferred layout finished after {units} units");
    } else {
        let report = cloud.layout();
        if report.failed > 0 {
            log::warn!("{} labels could not be rasterized", report.failed);
        }
    }

    let engine = cloud.engine();
    if let Some(path) = args.dump.as_deref() {
        write_layout_dump(path, engine)
            .with_context(|| format!("failed to write layout dump {}", path.display()))?;
    }
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg_for(engine, args.rasterizer), args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(engine.final_surface().raster(), &output, &render_cfg)?;
        }
    }
    Ok(())
}

// Block glyphs have no font to re-render with, so trace the pixels instead.
fn svg_for(engine: &PlacementEngine, rasterizer: RasterizerKind) -> String {
    match rasterizer {
        RasterizerKind::Font => render_svg(engine),
        RasterizerKind::Block => render_mask_svg(engine),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Events with their 1-based line numbers.
fn parse_events(input: &str) -> Result<Vec<(usize, LabelEvent)>> {
    let mut events = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        if let Some(event) =
            LabelEvent::parse_line(line).with_context(|| format!("line {}", idx + 1))?
        {
            events.push((idx + 1, event));
        }
    }
    Ok(events)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}
