use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};

use arms_workspace_rust::diff::{self, DiffOutcome};
use arms_workspace_rust::export::{self, DocSection};
use arms_workspace_rust::instructions::{self, default_presets};
use arms_workspace_rust::overlay::{self, LayerMode, OverlayStyle};
use arms_workspace_rust::settings::{self, Settings};
use arms_workspace_rust::viewport::{NaturalSize, fit_to_container, layout_overlay};
use arms_workspace_rust::{MediaKind, detections, extract_json, media, server};

#[derive(Parser, Debug)]
#[command(
    name = "arms-workspace-rust",
    version,
    about = "Archive media workspace tools: OCR overlays, correction diffs and exports"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Highlight words changed between raw OCR text and its correction
    Diff {
        #[arg(long = "original")]
        original: PathBuf,
        #[arg(long = "corrected")]
        corrected: PathBuf,
        #[arg(long = "format", value_enum, default_value = "markers")]
        format: DiffFormat,
    },
    /// Separate the JSON block of a model response from the surrounding note (stdin by default)
    Extract {
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },
    /// Initial zoom for an image of natural size WxH inside a container of WxH
    Fit {
        #[arg(long = "natural", value_parser = parse_size)]
        natural: (f64, f64),
        #[arg(long = "container", value_parser = parse_size)]
        container: (f64, f64),
    },
    /// Project detection boxes to overlay percentages
    Project {
        #[arg(short = 'd', long = "detections")]
        detections: PathBuf,
        /// Image whose natural size is used
        #[arg(long = "image", conflicts_with = "natural")]
        image: Option<PathBuf>,
        /// Natural size as WxH
        #[arg(long = "natural", value_parser = parse_size)]
        natural: Option<(f64, f64)>,
    },
    /// Render an image with its detection layer as SVG, PNG or JPEG
    Overlay {
        #[arg(long = "image")]
        image: PathBuf,
        #[arg(short = 'd', long = "detections")]
        detections: PathBuf,
        #[arg(long = "mode", value_enum, default_value = "outline")]
        mode: OverlayModeArg,
        /// Output file; the extension picks the format (.svg, .png, .jpg)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Print the request prompt for a media kind or file
    Instructions {
        /// image, video or audio
        #[arg(long = "media", required_unless_present = "file")]
        media: Option<String>,
        /// Media file; its kind and name are used in the prompt
        #[arg(long = "file")]
        file: Option<PathBuf>,
        /// Studio tab id (chat, sns, alt, json, youtube, timeline, meeting, todo)
        #[arg(long = "tab")]
        tab: Option<String>,
    },
    /// Export or import instruction preset templates (CSV)
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Save a result panel as a JSON download
    ExportJson {
        #[arg(long = "file-name")]
        file_name: String,
        /// Key and file suffix; defaults to the configured OCR engine label
        #[arg(long = "label")]
        label: Option<String>,
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
    },
    /// Save result sections as a Word document
    ExportDocx {
        #[arg(long = "title")]
        title: String,
        /// HEADING=PATH, repeatable
        #[arg(long = "section", value_parser = parse_section, required = true)]
        sections: Vec<(String, PathBuf)>,
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
    },
    /// Serve the workspace operations over HTTP
    Serve {
        #[arg(long = "addr", default_value = "127.0.0.1:8787")]
        addr: String,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    /// Write the current presets as CSV
    Export {
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Merge presets from a CSV file and print the result as CSV
    Import {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DiffFormat {
    Markers,
    Annotated,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OverlayModeArg {
    Outline,
    Text,
}

impl From<OverlayModeArg> for LayerMode {
    fn from(value: OverlayModeArg) -> Self {
        match value {
            OverlayModeArg::Outline => LayerMode::Outline,
            OverlayModeArg::Text => LayerMode::TextLayer,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    arms_workspace_rust::logging::init(cli.verbose)?;
    let settings = settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;

    match cli.command {
        Command::Diff {
            original,
            corrected,
            format,
        } => run_diff(&settings, &original, &corrected, format),
        Command::Extract { input } => {
            let text = read_text(input.as_deref())?;
            let payload = extract_json(&text);
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Command::Fit { natural, container } => {
            let scale = fit_to_container(natural.0, natural.1, container.0, container.1);
            println!("{}", scale);
            Ok(())
        }
        Command::Project {
            detections: detections_path,
            image,
            natural,
        } => {
            let natural = match (image, natural) {
                (Some(image), _) => media::natural_size(&image)?,
                (None, Some((width, height))) => NaturalSize {
                    width: width as u32,
                    height: height as u32,
                },
                (None, None) => return Err(anyhow!("either --image or --natural is required")),
            };
            let boxes = detections::load_detections(&detections_path)?;
            let overlay = layout_overlay(&boxes, natural);
            println!("{}", serde_json::to_string_pretty(&overlay)?);
            Ok(())
        }
        Command::Overlay {
            image,
            detections,
            mode,
            output,
        } => run_overlay(&settings, &image, &detections, mode.into(), output),
        Command::Instructions {
            media: media_arg,
            file,
            tab,
        } => {
            let (kind, file_name) = match &file {
                Some(path) => {
                    let probed = media::probe(path)?;
                    (probed.kind, Some(probed.name))
                }
                None => {
                    let value = media_arg.unwrap_or_default();
                    let kind = MediaKind::parse(&value)
                        .ok_or_else(|| anyhow!("unknown media kind '{}'", value))?;
                    (kind, None)
                }
            };
            let prompt = instructions::render_request_prompt(
                &settings,
                kind,
                tab.as_deref(),
                file_name.as_deref(),
            )?;
            print!("{}", prompt);
            Ok(())
        }
        Command::Templates { action } => run_templates(action),
        Command::ExportJson {
            file_name,
            label,
            input,
            output_dir,
        } => {
            let text = read_text(input.as_deref())?;
            let label = label.unwrap_or_else(|| settings.ocr_engine.export_label().to_string());
            let download = export::json_download(&file_name, &text, &label)?
                .ok_or_else(|| anyhow!("nothing to export: input is empty"))?;
            let dir = output_dir.unwrap_or_else(arms_workspace_rust::default_export_dir);
            let path = export::write_export(&dir, &download.file_name, download.contents.as_bytes())?;
            println!("{}", path.display());
            Ok(())
        }
        Command::ExportDocx {
            title,
            sections,
            output_dir,
        } => {
            let sections = sections
                .into_iter()
                .map(|(heading, path)| {
                    let body = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read section: {}", path.display()))?;
                    Ok(DocSection { heading, body })
                })
                .collect::<Result<Vec<_>>>()?;
            let bytes = export::docx_document(&title, &sections)?;
            let dir = output_dir.unwrap_or_else(arms_workspace_rust::default_export_dir);
            let path = export::write_export(&dir, &format!("{}.docx", title), &bytes)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Serve { addr } => server::run_server(settings, addr).await,
    }
}

fn run_diff(settings: &Settings, original: &Path, corrected: &Path, format: DiffFormat) -> Result<()> {
    let original = std::fs::read_to_string(original)
        .with_context(|| format!("failed to read original: {}", original.display()))?;
    let corrected = std::fs::read_to_string(corrected)
        .with_context(|| format!("failed to read corrected: {}", corrected.display()))?;
    let outcome = diff::compare_with_ratio(&original, &corrected, settings.diff_divergence_ratio);
    match format {
        DiffFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        DiffFormat::Annotated => println!("{}", diff::render_annotated(&outcome)),
        DiffFormat::Markers => match &outcome {
            DiffOutcome::Aligned(tokens) => {
                println!("{}", corrected.trim_end());
                println!("{}", diff::render_markers(tokens));
            }
            other => println!("{}", diff::render_annotated(other)),
        },
    }
    Ok(())
}

fn run_overlay(
    settings: &Settings,
    image: &Path,
    detections_path: &Path,
    mode: LayerMode,
    output: Option<PathBuf>,
) -> Result<()> {
    let probed = media::probe(image)?;
    if !probed.kind.is_image() {
        return Err(anyhow!("overlay needs an image, got {}", probed.mime));
    }
    let bytes = std::fs::read(image)
        .with_context(|| format!("failed to read image: {}", image.display()))?;
    let natural = media::natural_size(image)?;
    let boxes = detections::load_detections(detections_path)?;
    let style = OverlayStyle::from_settings(settings);
    let svg = overlay::render_overlay_svg(&bytes, &probed.mime, natural, &boxes, mode, &style);

    let output = match output {
        Some(path) => path,
        None => {
            let stem = image
                .file_stem()
                .and_then(|value| value.to_str())
                .unwrap_or("overlay");
            arms_workspace_rust::default_export_dir().join(format!("{}_overlay.png", stem))
        }
    };
    let ext = output
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_lowercase())
        .unwrap_or_default();
    let rendered = match ext.as_str() {
        "svg" => svg.into_bytes(),
        "jpg" | "jpeg" => overlay::render_svg_bytes(&svg, "image/jpeg")?,
        "png" => overlay::render_svg_bytes(&svg, "image/png")?,
        other => return Err(anyhow!("unsupported overlay output extension '{}'", other)),
    };
    let dir = output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = output
        .file_name()
        .and_then(|value| value.to_str())
        .ok_or_else(|| anyhow!("invalid output path: {}", output.display()))?;
    let path = export::write_export(dir, name, &rendered)?;
    println!("{}", path.display());
    Ok(())
}

fn run_templates(action: TemplateAction) -> Result<()> {
    match action {
        TemplateAction::Export { output } => {
            let csv = export::export_templates(&default_presets())?;
            match output {
                Some(path) => std::fs::write(&path, csv)
                    .with_context(|| format!("failed to write templates: {}", path.display()))?,
                None => print!("{}", csv),
            }
        }
        TemplateAction::Import { input } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read templates: {}", input.display()))?;
            let import = export::import_templates(&content);
            if import.skipped > 0 {
                tracing::warn!(skipped = import.skipped, path = %input.display(), "some template rows were not imported");
            }
            let mut presets = default_presets();
            export::merge_presets(&mut presets, import.presets);
            print!("{}", export::export_templates(&presets)?);
        }
    }
    Ok(())
}

fn read_text(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input: {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .with_context(|| "stdin must be UTF-8 text")?;
            Ok(buffer)
        }
    }
}

fn parse_size(value: &str) -> Result<(f64, f64), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", value))?;
    let width = width
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid width '{}': {}", width, err))?;
    let height = height
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid height '{}': {}", height, err))?;
    Ok((width, height))
}

fn parse_section(value: &str) -> Result<(String, PathBuf), String> {
    let (heading, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected HEADING=PATH, got '{}'", value))?;
    let heading = heading.trim();
    if heading.is_empty() {
        return Err("section heading is empty".to_string());
    }
    Ok((heading.to_string(), PathBuf::from(path.trim())))
}
