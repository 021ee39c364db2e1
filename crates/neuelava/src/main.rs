mod cli;
mod paths;
mod run;
mod state;

use anyhow::{Context, Result};
use cli::{Command, ParamsArgs, SessionArgs};
use paths::AppPaths;
use serde_json::json;
use state::AppState;
use thermal::{ColorSlot, ParamGroup, THEMES};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Run(args)) => run::run(args),
        Some(Command::Export(args)) => run::export(args),
        Some(Command::Themes) => run_themes(),
        Some(Command::Params(args)) => run_params(args),
        Some(Command::Masks(args)) => run_masks(&args),
        Some(Command::Where) => run_where(),
        None => run::run(cli.run),
    }
}

fn run_themes() -> Result<()> {
    println!("Themes:");
    for theme in &THEMES {
        let colors = theme
            .colors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {:<10} {colors}", theme.name);
    }
    Ok(())
}

fn run_params(args: ParamsArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let state = AppState::load_or_default(&paths.state_file())?;
    let lava = run::load_config(&paths, &args.session)?;
    let store = run::build_parameters(&lava, &state, &args.session)?;

    if args.json {
        let parameters: serde_json::Map<String, serde_json::Value> = store
            .entries()
            .map(|(spec, value)| (spec.name.to_string(), json!(value)))
            .collect();
        let colors: serde_json::Map<String, serde_json::Value> = ColorSlot::ALL
            .iter()
            .map(|slot| (slot.name().to_string(), json!(store.colors().get(*slot).to_string())))
            .collect();
        let document = json!({
            "theme": store.theme(),
            "noise": store.noise_model().name(),
            "blend": store.blend_mode().name(),
            "parameters": parameters,
            "colors": colors,
        });
        let rendered =
            serde_json::to_string_pretty(&document).context("failed to encode parameters")?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Theme: {}  noise: {}  blend: {}",
        store.theme().unwrap_or("(custom)"),
        store.noise_model(),
        store.blend_mode()
    );
    println!("  {:<18} {:>7} {:>6} {:>6}  group", "name", "value", "min", "max");
    for (spec, value) in store.entries() {
        let group = match spec.group {
            ParamGroup::Flow => "flow",
            ParamGroup::Animation => "animation",
            ParamGroup::Glow => "glow",
        };
        println!(
            "  {:<18} {value:>7.3} {:>6.2} {:>6.2}  {group}",
            spec.name, spec.min, spec.max
        );
    }
    println!("Colors:");
    for slot in ColorSlot::ALL {
        println!("  {:<14} {}", slot.name(), store.colors().get(slot));
    }
    Ok(())
}

fn run_masks(args: &SessionArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let state = AppState::load_or_default(&paths.state_file())?;
    let config = run::session_config(&paths, &state, args)?;
    let catalog = &config.catalog;

    println!("Bundled masks in {}:", catalog.directory().display());
    for (index, path) in catalog.entries() {
        let marker = if index == catalog.current() { '*' } else { ' ' };
        let status = if path.is_file() { "present" } else { "missing" };
        println!("{marker} {index:>2} {status:<8} {}", path.display());
    }
    Ok(())
}

fn run_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    let state = AppState::load_or_default(&paths.state_file())?;
    println!("Configuration directories:");
    println!("  config:     {}", paths.config_dir().display());
    println!("  data:       {}", paths.data_dir().display());
    println!("  share:      {}", paths.share_dir().display());
    println!("  session:    {}", paths.config_file().display());
    println!("  state:      {}", paths.state_file().display());
    println!("  exports:    {}", paths.export_dir().display());
    println!("Mask search roots:");
    for root in paths.mask_roots() {
        println!("  {}", root.display());
    }
    if let Some(mask) = state.last_mask {
        println!("Last mask: {mask}");
    }
    if let Some(theme) = &state.theme {
        println!("Last theme: {theme}");
    }
    if let Some(timestamp) = &state.last_export {
        println!("Last export: {timestamp}");
    }
    Ok(())
}
