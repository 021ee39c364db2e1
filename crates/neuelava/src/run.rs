use std::fs;

use anyhow::{bail, ensure, Context, Result};
use lavaconfig::LavaConfig;
use renderer::{
    Branding, ExportSettings, LoaderSettings, MaskCatalog, RenderPolicy, Renderer, RendererConfig,
};
use thermal::ParameterStore;
use tracing_subscriber::EnvFilter;

use crate::cli::{antialiasing_from_setting, ExportArgs, RunArgs, SessionArgs};
use crate::paths::AppPaths;
use crate::state::AppState;

const MAX_EXPORT_SIZE: u32 = 8192;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is reserved for command output such as `params --json`
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads `--config`, or `config.toml` in the config directory when present.
pub fn load_config(paths: &AppPaths, args: &SessionArgs) -> Result<LavaConfig> {
    let (path, explicit) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (paths.config_file(), false),
    };
    if !path.exists() {
        if explicit {
            bail!("config file {} does not exist", path.display());
        }
        return Ok(LavaConfig::default());
    }
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config = LavaConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid config file at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded session config");
    Ok(config)
}

/// Layers the variant's defaults, the remembered theme, the config file and
/// the command line, in that order.
pub fn build_parameters(
    config: &LavaConfig,
    state: &AppState,
    args: &SessionArgs,
) -> Result<ParameterStore> {
    let variant = args.variant.unwrap_or_else(|| config.variant());
    let mut store = ParameterStore::for_variant(&variant);
    if config.palette.theme.is_none() && args.theme.is_none() {
        if let Some(theme) = &state.theme {
            if let Err(err) = store.apply_theme(theme) {
                tracing::warn!(theme = %theme, error = %err, "ignoring remembered theme");
            }
        }
    }
    config.apply_to(&mut store)?;
    if let Some(theme) = &args.theme {
        store.apply_theme(theme)?;
    }
    store.load_values(
        args.overrides
            .iter()
            .map(|(name, value)| (name.as_str(), *value)),
    )?;
    if let Some(noise) = args.noise {
        store.set_noise_model(noise);
    }
    if let Some(blend) = args.blend {
        store.set_blend_mode(blend);
    }
    Ok(store)
}

pub fn session_config(
    paths: &AppPaths,
    state: &AppState,
    args: &SessionArgs,
) -> Result<RendererConfig> {
    let lava = load_config(paths, args)?;
    let parameters = build_parameters(&lava, state, args)?;

    let count = lava.masks.count;
    if let Some(index) = args.mask_index {
        ensure!(
            (1..=count).contains(&index),
            "--mask-index must be between 1 and {count}"
        );
    }
    let start = args
        .mask_index
        .or(state.last_mask)
        .unwrap_or(lava.masks.start);
    let directory = lava
        .masks
        .directory
        .clone()
        .unwrap_or_else(|| paths.mask_dir());

    let branding = &lava.export.branding;
    let config = RendererConfig {
        variant: args.variant.unwrap_or_else(|| lava.variant()),
        shape: args.shape.or(lava.render.shape).unwrap_or_default(),
        antialiasing: lava
            .render
            .antialias
            .map(antialiasing_from_setting)
            .unwrap_or_default(),
        policy: RenderPolicy::Animate {
            target_fps: lava.render.fps.filter(|fps| *fps > 0.0),
        },
        parameters,
        catalog: MaskCatalog::new(directory, count, start),
        upload: args.mask.clone(),
        loader: LoaderSettings {
            read_timeout: lava.loading.read_timeout(),
            decode_timeout: lava.loading.decode_timeout(),
            failsafe: lava.loading.failsafe(),
            max_upload_bytes: lava.loading.max_upload_bytes(),
        },
        export: ExportSettings {
            size: lava.export.size,
            directory: lava
                .export
                .directory
                .clone()
                .unwrap_or_else(|| paths.export_dir()),
            branding: Branding {
                enabled: branding.enabled,
                title: branding.title.clone(),
                subtitle: branding.subtitle.clone(),
                footer: branding.footer.clone(),
            },
        },
        ..RendererConfig::default()
    };
    Ok(config)
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let mut state = AppState::load_or_default(&paths.state_file())?;
    let mut config = session_config(&paths, &state, &args.session)?;

    if let Some(size) = args.size {
        config.surface_size = size;
    }
    if let Some(antialias) = args.antialias {
        config.antialiasing = antialias;
    }
    config.color_space = args.color_space;
    config.policy = if args.still {
        RenderPolicy::Still { time: args.time }
    } else {
        let target_fps = match args.fps {
            Some(fps) if fps > 0.0 => Some(fps),
            Some(_) => None,
            None => match &config.policy {
                RenderPolicy::Animate { target_fps } => *target_fps,
                RenderPolicy::Still { .. } => None,
            },
        };
        RenderPolicy::Animate { target_fps }
    };

    tracing::info!(
        variant = config.variant.name,
        masks = %config.catalog.directory().display(),
        upload = ?config.upload,
        policy = ?config.policy,
        "starting neue-lava preview"
    );

    let summary = Renderer::new(config).run()?;
    tracing::info!(
        mask = summary.mask_index,
        theme = ?summary.theme,
        exports = summary.exports.len(),
        "preview closed"
    );
    if state.record_session(&summary, chrono::Utc::now()) {
        state.persist(&paths.state_file())?;
    }
    Ok(())
}

pub fn export(args: ExportArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let mut state = AppState::load_or_default(&paths.state_file())?;
    let mut config = session_config(&paths, &state, &args.session)?;

    if let Some(size) = args.size {
        ensure!(
            (1..=MAX_EXPORT_SIZE).contains(&size),
            "--size must be between 1 and {MAX_EXPORT_SIZE}"
        );
        config.export.size = size;
    }
    if let Some(output) = args.output {
        config.export.directory = output;
    }
    if args.no_branding {
        config.export.branding.enabled = false;
    }
    ensure!(args.time.is_finite(), "--time must be a finite number");

    let path = Renderer::new(config).export_still(args.time)?;
    println!("{}", path.display());

    state.record_export(chrono::Utc::now());
    state.persist(&paths.state_file())?;
    Ok(())
}
