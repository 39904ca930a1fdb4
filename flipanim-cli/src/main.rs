//! flipanim CLI Tool
//!
//! Command-line interface for converting images into device animation packs
//! and icons, and for inspecting finished packs.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use flipanim_core::{AnimationSettings, BubbleConfig, Locale};
use flipanim_decoder::AnimationPack;
use flipanim_encoder::session::{self, SessionConfig};
use flipanim_encoder::{
    collect_sources, output_dir_name, FilterOptions, FrameErrorPolicy, MagickFilter, PixelMode,
    PotraceTracer, Threshold,
};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "flipanim")]
#[command(about = "Convert images into 1-bit animation and icon packs for the device")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an animated image or a folder of stills into an animation pack
    Animation {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        timing: TimingArgs,

        #[command(flatten)]
        bubble: BubbleArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        packing: PackingArgs,

        /// End the frame order with a trailing 0
        #[arg(long)]
        wraparound: bool,
    },

    /// Convert images into icons of a given size
    Icon {
        #[command(flatten)]
        io: IoArgs,

        /// Icon size as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size, default_value = "10x10")]
        size: (u32, u32),

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        packing: PackingArgs,
    },

    /// Show information about a finished animation pack
    Inspect {
        /// Animation folder containing meta.txt
        dir: PathBuf,

        /// Write one PNG per playback step into this folder
        #[arg(long)]
        preview: Option<PathBuf>,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Source image or folder of still images
    source: Option<PathBuf>,

    /// Output folder (a _WxH suffix is appended when missing)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct TimingArgs {
    /// JSON file with default animation settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Times the active block repeats
    #[arg(long)]
    active_cycles: Option<u32>,

    /// Frames per second
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Seconds before the next animation in the pack plays
    #[arg(long)]
    duration: Option<u32>,

    /// Seconds before active frames can trigger again
    #[arg(long)]
    cooldown: Option<u32>,

    /// Frames reserved for the active block
    #[arg(long)]
    active_frames: Option<u32>,
}

#[derive(Args)]
struct BubbleArgs {
    /// Speech bubble text; a literal \n starts a new line
    #[arg(long, default_value = "")]
    bubble_text: String,

    /// Bubble anchor: center, bottomcenter, topcenter, leftcenter, rightcenter,
    /// bottomright, topright, bottomleft, topleft
    #[arg(long, default_value = "center")]
    bubble_locale: String,

    /// First frame showing the bubble
    #[arg(long, default_value = "0")]
    bubble_start: u32,

    /// Frame the bubble disappears at (0 with start 0 means whole animation)
    #[arg(long, default_value = "0")]
    bubble_end: u32,
}

#[derive(Args)]
struct FilterArgs {
    /// Edge detection radius
    #[arg(long)]
    edge: Option<u32>,

    /// Invert colors
    #[arg(long)]
    invert: bool,

    /// Convert to monochrome
    #[arg(long)]
    monochrome: bool,

    /// Convert to grayscale
    #[arg(long)]
    grayscale: bool,

    /// Sharpen geometry, e.g. 0x1.0
    #[arg(long)]
    sharpen: Option<String>,

    /// Floyd-Steinberg dithering
    #[arg(long)]
    dither: bool,

    /// Contrast stretch levels, e.g. 2%x1%
    #[arg(long)]
    contrast_stretch: Option<String>,

    /// Binarization threshold, 0.1 to 0.9
    #[arg(long, default_value = "0.5")]
    threshold: f64,

    /// ImageMagick executable
    #[arg(long, default_value = "magick")]
    magick: PathBuf,
}

#[derive(Args)]
struct PackingArgs {
    /// Require the filtered frames to be 1-bit images
    #[arg(long)]
    strict: bool,

    /// What to do with a frame that fails the strict bit-depth check
    #[arg(long, value_enum, default_value_t = OnFrameError::Abort)]
    on_frame_error: OnFrameError,

    /// Also trace every frame into an SVG with potrace
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OnFrameError {
    Skip,
    Abort,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Animation {
            io,
            timing,
            bubble,
            filter,
            packing,
            wraparound,
        } => {
            let mut config = SessionConfig::animation();
            config.settings = load_settings(&timing)?;
            config.bubble = Some(
                BubbleConfig::new(Locale::parse(&bubble.bubble_locale), bubble.bubble_text)
                    .with_frames(bubble.bubble_start, bubble.bubble_end),
            );
            config.wraparound = wraparound;
            convert(io, config, &filter, &packing)?
        }

        Commands::Icon {
            io,
            size,
            filter,
            packing,
        } => convert(io, SessionConfig::icon(size.0, size.1), &filter, &packing)?,

        Commands::Inspect { dir, preview } => inspect(&dir, preview.as_deref())?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then the settings file, then explicit flags
fn load_settings(timing: &TimingArgs) -> Result<AnimationSettings> {
    let mut settings = match &timing.settings {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            AnimationSettings::from_json(&json)
                .with_context(|| format!("Invalid settings file {}", path.display()))?
        }
        None => AnimationSettings::default(),
    };

    let overrides = [
        (timing.active_cycles, &mut settings.active_cycles),
        (timing.frame_rate, &mut settings.frame_rate),
        (timing.duration, &mut settings.duration),
        (timing.cooldown, &mut settings.cooldown),
        (timing.active_frames, &mut settings.active_frames),
    ];
    for (flag, field) in overrides {
        if let Some(value) = flag {
            *field = value;
        }
    }

    settings
        .validate()
        .context("Timing values must be positive")?;
    Ok(settings)
}

fn filter_options(args: &FilterArgs, width: u32, height: u32) -> Result<FilterOptions> {
    Ok(FilterOptions {
        edge: args.edge,
        invert: args.invert,
        monochrome: args.monochrome,
        grayscale: args.grayscale,
        sharpen: args.sharpen.clone(),
        dither: args.dither,
        contrast_stretch: args.contrast_stretch.clone(),
        threshold: Threshold::from_fraction(args.threshold)?,
        ..FilterOptions::new(width, height)
    })
}

fn convert(io: IoArgs, mut config: SessionConfig, filter: &FilterArgs, packing: &PackingArgs) -> Result<()> {
    let source = io
        .source
        .context("No source given: pass an image or folder (interactive selection is not available)")?;
    let output = io
        .output
        .context("No output folder given: pass --output (interactive selection is not available)")?;

    config.filter = filter_options(filter, config.width(), config.height())?;
    config.pixel_mode = if packing.strict {
        PixelMode::Strict
    } else {
        PixelMode::Direct
    };
    config.on_frame_error = match packing.on_frame_error {
        OnFrameError::Skip => FrameErrorPolicy::Skip,
        OnFrameError::Abort => FrameErrorPolicy::Abort,
    };
    config.trace = packing.trace;

    let output_dir = output_dir_name(&output, config.width(), config.height());
    let sources = collect_sources(&source).context("Failed to read source")?;

    println!("Converting {} source(s) from {}", sources.len(), source.display());
    println!("Output: {}", output_dir.display());

    let magick = MagickFilter::with_program(&filter.magick);
    let potrace = PotraceTracer::new();
    let report = session::run(config, &magick, Some(&potrace), &sources, &output_dir)
        .context("Conversion failed")?;

    for skipped in &report.skipped {
        println!("Skipped {} (not a 1-bit image)", skipped.display());
    }
    println!(
        "Successfully wrote {} frame(s) to {}",
        report.frame_count,
        report.output_dir.display()
    );
    if let Some(metadata) = &report.metadata {
        println!(
            "Frames order: {}",
            metadata
                .frame_order
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    Ok(())
}

fn inspect(dir: &Path, preview: Option<&Path>) -> Result<()> {
    let pack = AnimationPack::open(dir).context("Failed to open animation pack")?;
    print_info(&pack);

    if let Some(preview_dir) = preview {
        let written = pack
            .export_previews(preview_dir)
            .context("Failed to write previews")?;
        println!("\nWrote {} preview(s) to {}", written.len(), preview_dir.display());
    }
    Ok(())
}

fn print_info(pack: &AnimationPack) {
    let meta = pack.metadata();
    println!("\n=== Animation Pack ===");
    println!("Folder: {}", pack.dir().display());
    println!("Resolution: {}x{}", meta.width, meta.height);
    println!(
        "Frames: {} passive, {} active",
        meta.passive_frames, meta.settings.active_frames
    );
    println!("Frame files: {} ({} bytes)", pack.frame_count(), pack.total_bytes());
    println!("Frame rate: {} fps", meta.settings.frame_rate);
    println!("Duration: {} s", meta.settings.duration);
    println!("Active cycles: {}", meta.settings.active_cycles);
    println!("Active cooldown: {} s", meta.settings.cooldown);

    match &meta.bubble {
        Some(bubble) => {
            println!("\n=== Bubble ===");
            println!("  Text: {}", bubble.text);
            println!(
                "  Anchor: ({}, {}) {}/{}",
                bubble.x, bubble.y, bubble.align_h, bubble.align_v
            );
            println!("  Frames: {}..{}", bubble.start_frame, bubble.end_frame);
        }
        None => println!("\nNo bubble"),
    }
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width = w.trim().parse().map_err(|_| format!("invalid width {w:?}"))?;
    let height = h.trim().parse().map_err(|_| format!("invalid height {h:?}"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got {s:?}"));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(args: &[&str]) -> TimingArgs {
        let mut argv = vec!["flipanim", "animation", "in.gif", "-o", "out"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Animation { timing, .. } => timing,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("10x10"), Ok((10, 10)));
        assert_eq!(parse_size("24X12"), Ok((24, 12)));
        assert!(parse_size("10").is_err());
        assert!(parse_size("0x5").is_err());
    }

    #[test]
    fn test_settings_defaults_and_flags() {
        assert_eq!(load_settings(&timing(&[])).unwrap(), AnimationSettings::default());

        let settings = load_settings(&timing(&["--frame-rate", "8", "--cooldown", "30"])).unwrap();
        assert_eq!(settings.frame_rate, 8);
        assert_eq!(settings.cooldown, 30);
        assert_eq!(settings.duration, 3600);
    }

    #[test]
    fn test_flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "frame_rate": 12, "duration": 60 }"#).unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let settings = load_settings(&timing(&["--settings", &path_arg, "--duration", "90"])).unwrap();
        assert_eq!(settings.frame_rate, 12);
        assert_eq!(settings.duration, 90);
    }

    #[test]
    fn test_zero_timing_rejected() {
        assert!(load_settings(&timing(&["--frame-rate", "0"])).is_err());
        assert!(load_settings(&timing(&["--active-cycles", "0"])).is_err());
        assert!(load_settings(&timing(&["--duration", "0"])).is_err());
        assert!(load_settings(&timing(&["--cooldown", "0"])).is_err());
        assert!(load_settings(&timing(&["--active-frames", "0"])).is_ok());
    }

    #[test]
    fn test_zero_timing_in_settings_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "frame_rate": 0 }"#).unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        assert!(load_settings(&timing(&["--settings", &path_arg])).is_err());
        assert!(load_settings(&timing(&["--settings", &path_arg, "--frame-rate", "6"])).is_ok());
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let cli = Cli::try_parse_from(["flipanim", "icon", "in.png", "--threshold", "0.55"]).unwrap();
        let Commands::Icon { filter, .. } = cli.command else {
            unreachable!()
        };
        assert!(filter_options(&filter, 10, 10).is_err());
    }
}
