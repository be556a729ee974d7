//! Consolidate Raw Segments
//!
//! Reads raw line-detector output as a JSON array of `{pt1, pt2}` segments,
//! consolidates it with a named preset and writes the merged segments as
//! JSON. With `--draw`, the raw and merged segments are also rendered to an
//! image, over `--page` when given.
//!
//! Usage:
//!   cargo run --release --bin consolidate_segments -- raw.json
//!   cargo run --release --bin consolidate_segments -- raw.json --preset page_vertical --output merged.json
//!   cargo run --release --bin consolidate_segments -- raw.json --page page.png --draw merged.png
//!
//! Presets: default, page_vertical, page_horizontal, header_separator,
//! ruler_tick (with --ruler-width).

use borelog_oxide::config::ConsolidationConfig;
use borelog_oxide::draw;
use borelog_oxide::geometry::Segment;
use borelog_oxide::lines::{RawSegment, consolidate, load_page};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

struct CliConfig {
    input: PathBuf,
    output: Option<PathBuf>,
    page: Option<PathBuf>,
    draw: Option<PathBuf>,
    preset: String,
    ruler_width: u32,
}

impl CliConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut input = None;
        let mut output = None;
        let mut page = None;
        let mut draw = None;
        let mut preset = String::from("default");
        let mut ruler_width = 100;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--output" | "-o" => {
                    i += 1;
                    if i < args.len() {
                        output = Some(PathBuf::from(&args[i]));
                    }
                },
                "--page" => {
                    i += 1;
                    if i < args.len() {
                        page = Some(PathBuf::from(&args[i]));
                    }
                },
                "--draw" => {
                    i += 1;
                    if i < args.len() {
                        draw = Some(PathBuf::from(&args[i]));
                    }
                },
                "--preset" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        preset = args[i].clone();
                    }
                },
                "--ruler-width" => {
                    i += 1;
                    if i < args.len() {
                        ruler_width = args[i]
                            .parse()
                            .map_err(|e| format!("invalid --ruler-width {}: {}", args[i], e))?;
                    }
                },
                other if input.is_none() => input = Some(PathBuf::from(other)),
                other => return Err(format!("unexpected argument {}", other)),
            }
            i += 1;
        }

        Ok(Self {
            input: input.ok_or("missing input file")?,
            output,
            page,
            draw,
            preset,
            ruler_width,
        })
    }

    fn consolidation_config(&self) -> Result<ConsolidationConfig, String> {
        match self.preset.as_str() {
            "default" => Ok(ConsolidationConfig::default()),
            "page_vertical" => Ok(ConsolidationConfig::page_vertical()),
            "page_horizontal" => Ok(ConsolidationConfig::page_horizontal()),
            "header_separator" => Ok(ConsolidationConfig::header_separator()),
            "ruler_tick" => Ok(ConsolidationConfig::ruler_tick(self.ruler_width)),
            other => Err(format!("unknown preset {}", other)),
        }
    }
}

fn run(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let consolidation_config = config.consolidation_config()?;

    let content = fs::read_to_string(&config.input)?;
    let raw: Vec<RawSegment> = serde_json::from_str(&content)?;
    let segments: Vec<Segment> = raw.into_iter().map(Segment::from).collect();

    let start = Instant::now();
    let result = consolidate(segments, &consolidation_config)?;
    let elapsed = start.elapsed();

    eprintln!(
        "Consolidated {} segments into {} in {:.2?} ({} preset)",
        result.raw.len(),
        result.merged.len(),
        elapsed,
        config.preset
    );

    let merged: Vec<RawSegment> = result
        .merged
        .iter()
        .map(|s| RawSegment {
            pt1: s.pt1,
            pt2: s.pt2,
        })
        .collect();
    let json = serde_json::to_string_pretty(&merged)?;

    if let Some(path) = &config.draw {
        let canvas = match &config.page {
            Some(page_path) => {
                let page = load_page(page_path)?;
                let mut canvas = draw::draw_on_page(&page, &[], &result.raw);
                draw::draw_segments(&mut canvas, &result.merged, draw::HORIZONTAL_COLOR);
                canvas
            },
            None => {
                let (width, height) = extent(&result.raw);
                draw::draw_lines(width, height, &result.merged, &result.raw)
            },
        };
        draw::save(&canvas, path)?;
        eprintln!("Wrote {} (raw in red, merged in green)", path.display());
    }

    match &config.output {
        Some(path) => {
            fs::write(path, json)?;
            eprintln!("Wrote {}", path.display());
        },
        None => println!("{}", json),
    }

    Ok(())
}

/// Canvas size that holds every segment.
fn extent(segments: &[Segment]) -> (u32, u32) {
    let (mut width, mut height) = (1.0_f64, 1.0_f64);
    for segment in segments {
        width = width.max(segment.pt1.x.max(segment.pt2.x) + 1.0);
        height = height.max(segment.pt1.y.max(segment.pt2.y) + 1.0);
    }
    (width.ceil() as u32, height.ceil() as u32)
}

fn main() {
    env_logger::init();

    let config = match CliConfig::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: consolidate_segments <raw.json> [--preset NAME] [--ruler-width PX] [--output FILE] [--page IMAGE] [--draw IMAGE]");
            std::process::exit(2);
        },
    };

    if let Err(e) = run(&config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
