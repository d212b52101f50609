use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use textreel::chunker::{chunk, ChunkPlan};
use textreel::encoding::{FfmpegMode, FfmpegPipe};
use textreel::fonts::{discover_font, load_font, unsupported_codepoints, CellEstimate, FontMetrics};
use textreel::rasterizer::{save_frame_png, FramePainter};
use textreel::sanitize;
use textreel::settings::{parse_color, RenderSettings, Rgb};

#[derive(Debug, Parser)]
#[command(name = "textreel")]
#[command(about = "Compile a text file into a slideshow video")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render every slide and encode the final video.
    Build {
        /// Input text file, UTF-8.
        input: PathBuf,
        #[arg(short = 'o', long = "output", default_value = "output_video.mp4")]
        output: PathBuf,
        #[command(flatten)]
        style: StyleArgs,
        /// Explicit TTF font file; otherwise well-known system paths are searched.
        #[arg(long)]
        font: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "auto")]
        encoder: EncoderChoice,
        /// Also write each rendered slide as a PNG into this directory.
        #[arg(long, value_name = "DIR")]
        dump_frames: Option<PathBuf>,
        /// Keep emojis and other symbols instead of rewriting them to text.
        #[arg(long)]
        keep_emojis: bool,
    },
    /// Chunk only: report how the text would split into slides.
    Check {
        /// Input text file, UTF-8.
        input: PathBuf,
        #[command(flatten)]
        style: StyleArgs,
        #[arg(long)]
        font: Option<PathBuf>,
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
        #[arg(long)]
        keep_emojis: bool,
    },
}

#[derive(Debug, Args)]
struct StyleArgs {
    /// Video width in pixels.
    #[arg(long, default_value_t = 1920)]
    width: u32,
    /// Video height in pixels.
    #[arg(long, default_value_t = 1080)]
    height: u32,
    #[arg(long = "font-size", default_value_t = 32)]
    font_size: u32,
    /// Blank border kept clear of text, in pixels.
    #[arg(long, default_value_t = 96)]
    margin: u32,
    #[arg(long = "line-spacing", default_value_t = 1.3)]
    line_spacing: f32,
    /// Seconds each slide stays on screen.
    #[arg(long, default_value_t = 3.0)]
    duration: f32,
    #[arg(long, default_value_t = 30)]
    fps: u32,
    #[arg(long = "background-color", default_value = "black", value_parser = parse_color)]
    background_color: Rgb,
    #[arg(long = "text-color", default_value = "white", value_parser = parse_color)]
    text_color: Rgb,
}

impl StyleArgs {
    fn to_settings(&self) -> RenderSettings {
        RenderSettings {
            width: self.width,
            height: self.height,
            font_size: self.font_size,
            margin: self.margin,
            line_spacing: self.line_spacing,
            fps: self.fps,
            seconds_per_slide: self.duration,
            background: self.background_color,
            foreground: self.text_color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum EncoderChoice {
    #[default]
    Auto,
    System,
    Sidecar,
}

impl From<EncoderChoice> for FfmpegMode {
    fn from(choice: EncoderChoice) -> Self {
        match choice {
            EncoderChoice::Auto => Self::Auto,
            EncoderChoice::System => Self::System,
            EncoderChoice::Sidecar => Self::Sidecar,
        }
    }
}

fn version_string() -> String {
    match option_env!("TEXTREEL_GIT_HASH") {
        Some(hash) => format!("{} ({hash})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_owned(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            style,
            font,
            encoder,
            dump_frames,
            keep_emojis,
        } => run_build(
            &input,
            &output,
            &style,
            font.as_deref(),
            encoder,
            dump_frames.as_deref(),
            keep_emojis,
        ),
        Commands::Check {
            input,
            style,
            font,
            json,
            keep_emojis,
        } => run_check(&input, &style, font.as_deref(), json, keep_emojis),
    }
}

fn run_build(
    input: &Path,
    output: &Path,
    style: &StyleArgs,
    font: Option<&Path>,
    encoder: EncoderChoice,
    dump_frames: Option<&Path>,
    keep_emojis: bool,
) -> Result<()> {
    let settings = style.to_settings();
    settings.validate()?;

    let text = sanitize::prepare(&read_input(input)?, keep_emojis);

    let font_path = resolve_font(font)?;
    eprintln!("using font {}", font_path.display());
    let font = load_font(&font_path)?;

    let frames = {
        let metrics = FontMetrics::new(&font, settings.font_size as f32);
        chunk(&text, &settings, &metrics)
    };

    let missing = unsupported_codepoints(&font, &text);
    if !missing.is_empty() {
        let listed = missing
            .iter()
            .map(|ch| format!("U+{:04X}", *ch as u32))
            .collect::<Vec<_>>()
            .join(" ");
        eprintln!(
            "warning: {} has no glyphs for {listed}; those draw as replacement boxes",
            font_path.display()
        );
    }

    if let Some(dir) = dump_frames {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create frame dump directory {}", dir.display()))?;
    }

    let staging = stage_output(output)?;
    let pipe = FfmpegPipe::spawn(&settings, staging.path(), encoder.into())?;
    let repeats = settings.frames_per_slide();
    let total_slides = frames.len();

    let mut painter = FramePainter::new(font, settings.clone());
    for (index, frame) in frames.iter().enumerate() {
        let rgba = painter.render_frame_rgba(frame);

        if let Some(dir) = dump_frames {
            save_frame_png(&dir.join(format!("slide_{index:04}.png")), &settings, &rgba)?;
        }

        for _ in 0..repeats {
            pipe.write_frame(rgba.clone())?;
        }
        eprintln!("rendered slide {}/{}", index + 1, total_slides);
    }

    pipe.finish()?;
    staging.persist(output).map_err(|error| {
        anyhow!(
            "failed to move finished video into place at {}: {}",
            output.display(),
            error.error
        )
    })?;

    println!(
        "Wrote {} ({} slides, {:.1}s)",
        output.display(),
        total_slides,
        total_slides as f32 * settings.seconds_per_slide
    );
    Ok(())
}

fn run_check(
    input: &Path,
    style: &StyleArgs,
    font: Option<&Path>,
    json: bool,
    keep_emojis: bool,
) -> Result<()> {
    let settings = style.to_settings();
    settings.validate()?;

    let text = sanitize::prepare(&read_input(input)?, keep_emojis);

    let loaded = match font {
        Some(path) => Some(load_font(path)?),
        None => discover_font().map(|path| load_font(&path)).transpose()?,
    };

    let frames = match &loaded {
        Some(font) => chunk(
            &text,
            &settings,
            &FontMetrics::new(font, settings.font_size as f32),
        ),
        None => {
            eprintln!("no font found, estimating widths from character cells");
            chunk(&text, &settings, &CellEstimate::new(settings.font_size))
        }
    };

    let plan = ChunkPlan::new(&frames, &settings);
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!(
            "OK: {} ({}x{}, {} slides, {} wrapped lines, {:.1}s)",
            input.display(),
            settings.width,
            settings.height,
            plan.frames,
            plan.lines,
            plan.total_seconds
        );
        println!("max lines per slide: {}", plan.max_lines_per_frame);
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }
    fs::read_to_string(path)
        .with_context(|| format!("failed to read input text {}", path.display()))
}

fn resolve_font(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("font file not found: {}", path.display());
        }
        return Ok(path.to_path_buf());
    }
    discover_font()
        .ok_or_else(|| anyhow!("no usable font found; pass one with --font /path/to/font.ttf"))
}

/// The encoder writes here; the file moves to the real output path only
/// after ffmpeg exits cleanly.
fn stage_output(output: &Path) -> Result<tempfile::NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let suffix = output
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| ".mp4".to_owned());
    tempfile::Builder::new()
        .prefix("textreel-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .with_context(|| format!("failed to create staging file next to {}", output.display()))
}
