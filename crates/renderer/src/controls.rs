//! Keyboard bindings for the preview window.

use thermal::ParameterStore;
use tracing::{info, warn};
use winit::keyboard::{Key, NamedKey};

use crate::catalog::MaskCatalog;
use crate::loader::MaskSource;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    PreviousMask,
    NextMask,
    NextTheme,
    ToggleNoiseModel,
    CycleBlendMode,
    /// Nudge a named parameter by `delta`.
    Adjust { parameter: &'static str, delta: f32 },
    Export,
    Quit,
}

/// What the window has to do after an action ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Parameters changed; the next frame picks them up.
    Redraw,
    LoadMask(MaskSource),
    Export,
    Quit,
}

pub fn action_for_key(key: &Key) -> Option<Action> {
    let action = match key {
        Key::Named(NamedKey::ArrowLeft) => Action::PreviousMask,
        Key::Named(NamedKey::ArrowRight) => Action::NextMask,
        Key::Named(NamedKey::ArrowUp) => Action::Adjust {
            parameter: "morph_speed",
            delta: 0.1,
        },
        Key::Named(NamedKey::ArrowDown) => Action::Adjust {
            parameter: "morph_speed",
            delta: -0.1,
        },
        Key::Named(NamedKey::Escape) => Action::Quit,
        Key::Character(text) => return action_for_char(text.as_str()),
        _ => return None,
    };
    Some(action)
}

fn action_for_char(text: &str) -> Option<Action> {
    let adjust = |parameter, delta| Action::Adjust { parameter, delta };
    let action = match text.to_ascii_lowercase().as_str() {
        "t" => Action::NextTheme,
        "n" => Action::ToggleNoiseModel,
        "b" => Action::CycleBlendMode,
        "e" => Action::Export,
        "q" => Action::Quit,
        "[" => adjust("glow_spread", -0.01),
        "]" => adjust("glow_spread", 0.01),
        "-" => adjust("glow_intensity", -0.1),
        "=" | "+" => adjust("glow_intensity", 0.1),
        "," => adjust("band_position", -0.05),
        "." => adjust("band_position", 0.05),
        _ => return None,
    };
    Some(action)
}

/// Runs `action` against the session state.
pub fn apply(action: Action, parameters: &mut ParameterStore, catalog: &mut MaskCatalog) -> Effect {
    match action {
        Action::PreviousMask => {
            catalog.previous();
            Effect::LoadMask(catalog.current_source())
        }
        Action::NextMask => {
            catalog.next();
            Effect::LoadMask(catalog.current_source())
        }
        Action::NextTheme => {
            let theme = parameters.cycle_theme();
            info!(theme = theme.name, "theme changed");
            Effect::Redraw
        }
        Action::ToggleNoiseModel => {
            let model = parameters.toggle_noise_model();
            info!(%model, "noise model changed");
            Effect::Redraw
        }
        Action::CycleBlendMode => {
            let mode = parameters.cycle_blend_mode();
            info!(%mode, "glow blend mode changed");
            Effect::Redraw
        }
        Action::Adjust { parameter, delta } => {
            match parameters.adjust(parameter, delta) {
                Ok(value) => info!(parameter, value, "parameter adjusted"),
                Err(err) => warn!(parameter, error = %err, "parameter adjustment rejected"),
            }
            Effect::Redraw
        }
        Action::Export => Effect::Export,
        Action::Quit => Effect::Quit,
    }
}

/// `neue-lava · mask-3 · inferno`, with a trailing marker while loading.
pub fn window_title(mask: Option<&str>, theme: Option<&str>, loading: bool) -> String {
    let mut title = String::from("neue-lava");
    for part in [mask, theme].into_iter().flatten() {
        title.push_str(" \u{b7} ");
        title.push_str(part);
    }
    if loading {
        title.push_str(" (loading\u{2026})");
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermal::{BlendMode, NoiseModel};

    fn key(text: &str) -> Key {
        Key::Character(text.into())
    }

    #[test]
    fn arrows_and_letters_map_to_actions() {
        assert_eq!(
            action_for_key(&Key::Named(NamedKey::ArrowLeft)),
            Some(Action::PreviousMask)
        );
        assert_eq!(action_for_key(&key("T")), Some(Action::NextTheme));
        assert_eq!(action_for_key(&key("q")), Some(Action::Quit));
        assert_eq!(
            action_for_key(&key("]")),
            Some(Action::Adjust {
                parameter: "glow_spread",
                delta: 0.01
            })
        );
        assert_eq!(action_for_key(&key("z")), None);
        assert_eq!(action_for_key(&Key::Named(NamedKey::Space)), None);
    }

    #[test]
    fn mask_navigation_wraps_around() {
        let mut parameters = ParameterStore::default();
        let mut catalog = MaskCatalog::new("masks", 7, 1);
        let effect = apply(Action::PreviousMask, &mut parameters, &mut catalog);
        assert_eq!(effect, Effect::LoadMask(catalog.source(7)));
        let effect = apply(Action::NextMask, &mut parameters, &mut catalog);
        assert_eq!(effect, Effect::LoadMask(catalog.source(1)));
    }

    #[test]
    fn toggles_update_the_store() {
        let mut parameters = ParameterStore::default();
        let mut catalog = MaskCatalog::default();
        apply(Action::ToggleNoiseModel, &mut parameters, &mut catalog);
        apply(Action::CycleBlendMode, &mut parameters, &mut catalog);
        assert_eq!(parameters.noise_model(), NoiseModel::Fbm);
        assert_eq!(parameters.blend_mode(), BlendMode::Normal);

        let before = parameters.theme().map(str::to_string);
        apply(Action::NextTheme, &mut parameters, &mut catalog);
        assert_ne!(parameters.theme().map(str::to_string), before);
    }

    #[test]
    fn adjustments_respect_ranges() {
        let mut parameters = ParameterStore::default();
        let mut catalog = MaskCatalog::default();
        for _ in 0..100 {
            apply(
                action_for_key(&key("]")).unwrap(),
                &mut parameters,
                &mut catalog,
            );
        }
        assert_eq!(parameters.get("glow_spread").unwrap(), 0.5);
    }

    #[test]
    fn title_lists_mask_theme_and_loading() {
        assert_eq!(window_title(None, None, false), "neue-lava");
        assert_eq!(
            window_title(Some("mask-3"), Some("inferno"), true),
            "neue-lava \u{b7} mask-3 \u{b7} inferno (loading\u{2026})"
        );
    }
}
