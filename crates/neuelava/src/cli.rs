use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lavaconfig::AntialiasSetting;
use renderer::{Antialiasing, ColorSpaceMode};
use thermal::{BlendMode, NoiseModel, Shape, Variant};

#[derive(Parser, Debug)]
#[command(
    name = "neuelava",
    author,
    version,
    about = "Mask-driven thermal gradient renderer",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Flags shared by every command that builds a session.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Session file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "NEUELAVA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Which gradient to draw: `neue-lava`, `mask-gradient`, or `shape`.
    #[arg(long, value_name = "NAME", value_parser = parse_variant)]
    pub variant: Option<Variant>,

    /// Solid for the `shape` variant: `sphere`, `cube`, or `octahedron`.
    #[arg(long, value_name = "SHAPE", value_parser = parse_shape)]
    pub shape: Option<Shape>,

    /// Palette theme to start with (see `neuelava themes`).
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Image to use as the mask instead of the bundled set.
    #[arg(long, value_name = "PATH")]
    pub mask: Option<PathBuf>,

    /// One-based bundled mask to start on.
    #[arg(long, value_name = "N")]
    pub mask_index: Option<usize>,

    /// Override a numeric parameter; may be repeated.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub overrides: Vec<(String, f32)>,

    /// Field noise: `simplex` or `fbm`.
    #[arg(long, value_name = "MODEL", value_parser = parse_noise)]
    pub noise: Option<NoiseModel>,

    /// Glow blend mode (additive, normal, multiply, screen, subtractive).
    #[arg(long, value_name = "MODE", value_parser = parse_blend)]
    pub blend: Option<BlendMode>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Render a single still frame instead of animating continuously.
    #[arg(long)]
    pub still: bool,

    /// Timestamp in seconds to evaluate for still mode.
    #[arg(long, value_name = "SECONDS")]
    pub time: Option<f32>,

    /// Optional FPS cap (0 = uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Window size (e.g. `1280x800`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count.
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto"
    )]
    pub color_space: ColorSpaceMode,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Timestamp in seconds to render.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,

    /// Side of the square PNG in pixels.
    #[arg(long, value_name = "PIXELS")]
    pub size: Option<u32>,

    /// Directory the PNG is written to.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Skip the title, swatches and footer.
    #[arg(long)]
    pub no_branding: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Print the resolved values as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the preview window (the default).
    Run(RunArgs),
    /// Render one branded PNG without opening a window.
    Export(ExportArgs),
    /// List palette themes.
    Themes,
    /// Print every parameter with its range and resolved value.
    Params(ParamsArgs),
    /// List the bundled masks and whether each one is present.
    Masks(SessionArgs),
    /// Print resolved directories for config, data, and share roots.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_assignment(value: &str) -> Result<(String, f32), String> {
    let (name, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{value}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("parameter name must not be empty".to_string());
    }
    let number: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{}' for {name}", raw.trim()))?;
    if !number.is_finite() {
        return Err(format!("{name} must be a finite number"));
    }
    Ok((name.to_string(), number))
}

pub fn parse_variant(value: &str) -> Result<Variant, String> {
    Variant::find(value).ok_or_else(|| {
        format!("unknown variant '{}'; expected neue-lava, mask-gradient, or shape", value.trim())
    })
}

pub fn parse_shape(value: &str) -> Result<Shape, String> {
    value.parse()
}

pub fn parse_noise(value: &str) -> Result<NoiseModel, String> {
    value.parse()
}

pub fn parse_blend(value: &str) -> Result<BlendMode, String> {
    value.parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height".to_string())?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    lavaconfig::parse_antialias(value).map(antialiasing_from_setting)
}

pub fn antialiasing_from_setting(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        AntialiasSetting::Samples2 => Antialiasing::Samples(2),
        AntialiasSetting::Samples4 => Antialiasing::Samples(4),
        AntialiasSetting::Samples8 => Antialiasing::Samples(8),
        AntialiasSetting::Samples16 => Antialiasing::Samples(16),
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}
