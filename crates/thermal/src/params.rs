//! Owner of every tweakable value: stop positions, colours, animation and
//! glow settings.
//!
//! Values are clamped on the way in. The five coupled flow positions also
//! follow the panel's slider coupling: an edited position is held between its
//! neighbours and the whole progression is then re-clamped with a minimum gap.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use thiserror::Error;

use crate::color::Rgb8;
use crate::field::{AnimationState, NoiseModel};
use crate::glow::{BlendMode, GlowConfig};
use crate::palette::Palette;
use crate::snapshot::FrameSnapshot;
use crate::theme::{find_theme, next_theme, Theme, THEMES};
use crate::variant::Variant;

/// Minimum distance the flow sliders keep between neighbouring positions.
pub const FLOW_GAP: f32 = 0.01;

/// Upper bound of the interactive orange and red sliders.
pub const FLOW_CAP: f32 = 0.9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("unknown theme '{0}'")]
    UnknownTheme(String),
    #[error("unknown colour slot '{0}'")]
    UnknownColor(String),
    #[error("parameter '{name}' must be a finite number, got {value}")]
    NonFinite { name: String, value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    Flow,
    Animation,
    Glow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub group: ParamGroup,
}

const fn spec(name: &'static str, default: f32, min: f32, max: f32, group: ParamGroup) -> ParamSpec {
    ParamSpec {
        name,
        default,
        min,
        max,
        group,
    }
}

pub const PARAMS: [ParamSpec; 15] = [
    spec("blue_start", 0.05, 0.0, 1.0, ParamGroup::Flow),
    spec("cyan_transition", 0.42, 0.0, 1.0, ParamGroup::Flow),
    spec("yellow_transition", 0.81, 0.0, 1.0, ParamGroup::Flow),
    spec("orange_transition", 0.85, 0.0, 1.0, ParamGroup::Flow),
    spec("red_end", 0.95, 0.0, 1.0, ParamGroup::Flow),
    spec("blue_end2", 1.0, 0.0, 1.0, ParamGroup::Flow),
    spec("morph_speed", 0.8, 0.1, 5.0, ParamGroup::Animation),
    spec("band_position", 0.5, 0.0, 1.0, ParamGroup::Animation),
    spec("gradient_scale", 1.0, 0.1, 3.0, ParamGroup::Animation),
    spec("gradient_speed", 0.05, 0.0, 0.2, ParamGroup::Animation),
    spec("noise_strength", 0.1, 0.0, 0.5, ParamGroup::Animation),
    spec("glow_noise", 0.3, 0.0, 1.0, ParamGroup::Animation),
    spec("glow_intensity", 1.0, 0.0, 5.0, ParamGroup::Glow),
    spec("glow_spread", 0.2, 0.01, 0.5, ParamGroup::Glow),
    spec("glow_falloff", 0.5, 0.1, 2.0, ParamGroup::Glow),
];

pub fn find_param(name: &str) -> Option<&'static ParamSpec> {
    let wanted = name.trim();
    PARAMS.iter().find(|spec| spec.name.eq_ignore_ascii_case(wanted))
}

fn default_of(name: &str) -> f32 {
    find_param(name).map_or(0.0, |spec| spec.default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSlot {
    Blue,
    Cyan,
    Yellow,
    Orange,
    Red,
    Blue2,
}

impl ColorSlot {
    pub const ALL: [ColorSlot; 6] = [
        ColorSlot::Blue,
        ColorSlot::Cyan,
        ColorSlot::Yellow,
        ColorSlot::Orange,
        ColorSlot::Red,
        ColorSlot::Blue2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorSlot::Blue => "color_blue",
            ColorSlot::Cyan => "color_cyan",
            ColorSlot::Yellow => "color_yellow",
            ColorSlot::Orange => "color_orange",
            ColorSlot::Red => "color_red",
            ColorSlot::Blue2 => "color_blue2",
        }
    }
}

impl fmt::Display for ColorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorSlot {
    type Err = ParamError;

    /// Accepts `color_blue` or just `blue`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|slot| {
                slot.name().eq_ignore_ascii_case(wanted)
                    || slot.name()["color_".len()..].eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ParamError::UnknownColor(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColors {
    pub blue: Rgb8,
    pub cyan: Rgb8,
    pub yellow: Rgb8,
    pub orange: Rgb8,
    pub red: Rgb8,
    pub blue2: Rgb8,
}

impl PaletteColors {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            blue: theme.blue,
            cyan: theme.cyan,
            yellow: theme.yellow,
            orange: theme.orange,
            red: theme.red,
            blue2: theme.blue,
        }
    }

    pub fn get(&self, slot: ColorSlot) -> Rgb8 {
        match slot {
            ColorSlot::Blue => self.blue,
            ColorSlot::Cyan => self.cyan,
            ColorSlot::Yellow => self.yellow,
            ColorSlot::Orange => self.orange,
            ColorSlot::Red => self.red,
            ColorSlot::Blue2 => self.blue2,
        }
    }

    fn slot_mut(&mut self, slot: ColorSlot) -> &mut Rgb8 {
        match slot {
            ColorSlot::Blue => &mut self.blue,
            ColorSlot::Cyan => &mut self.cyan,
            ColorSlot::Yellow => &mut self.yellow,
            ColorSlot::Orange => &mut self.orange,
            ColorSlot::Red => &mut self.red,
            ColorSlot::Blue2 => &mut self.blue2,
        }
    }

    /// The five primary colours, as shown in export swatches.
    pub fn primaries(&self) -> [Rgb8; 5] {
        [self.blue, self.cyan, self.yellow, self.orange, self.red]
    }

    pub fn to_vec3s(&self) -> [Vec3; 6] {
        ColorSlot::ALL.map(|slot| self.get(slot).to_vec3())
    }
}

impl Default for PaletteColors {
    fn default() -> Self {
        Self::from_theme(&THEMES[0])
    }
}

/// Every value the shading code reads, owned in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    blue_start: f32,
    cyan_transition: f32,
    yellow_transition: f32,
    orange_transition: f32,
    red_end: f32,
    blue_end2: f32,
    morph_speed: f32,
    band_position: f32,
    gradient_scale: f32,
    gradient_speed: f32,
    noise_strength: f32,
    glow_noise: f32,
    glow_intensity: f32,
    glow_spread: f32,
    glow_falloff: f32,
    colors: PaletteColors,
    noise_model: NoiseModel,
    blend_mode: BlendMode,
    /// Name of the last theme applied, cleared by manual colour edits.
    theme: Option<String>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self {
            blue_start: default_of("blue_start"),
            cyan_transition: default_of("cyan_transition"),
            yellow_transition: default_of("yellow_transition"),
            orange_transition: default_of("orange_transition"),
            red_end: default_of("red_end"),
            blue_end2: default_of("blue_end2"),
            morph_speed: default_of("morph_speed"),
            band_position: default_of("band_position"),
            gradient_scale: default_of("gradient_scale"),
            gradient_speed: default_of("gradient_speed"),
            noise_strength: default_of("noise_strength"),
            glow_noise: default_of("glow_noise"),
            glow_intensity: default_of("glow_intensity"),
            glow_spread: default_of("glow_spread"),
            glow_falloff: default_of("glow_falloff"),
            colors: PaletteColors::default(),
            noise_model: NoiseModel::default(),
            blend_mode: BlendMode::default(),
            theme: Some(THEMES[0].name.to_string()),
        }
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table defaults with the variant's own starting values layered on top.
    pub fn for_variant(variant: &Variant) -> Self {
        let mut store = Self::default();
        if let Err(err) = store.load_values(variant.default_overrides().iter().copied()) {
            tracing::warn!(variant = variant.name, error = %err, "ignoring variant defaults");
        }
        store
    }

    fn slot(&self, name: &str) -> Option<f32> {
        let value = match name {
            "blue_start" => self.blue_start,
            "cyan_transition" => self.cyan_transition,
            "yellow_transition" => self.yellow_transition,
            "orange_transition" => self.orange_transition,
            "red_end" => self.red_end,
            "blue_end2" => self.blue_end2,
            "morph_speed" => self.morph_speed,
            "band_position" => self.band_position,
            "gradient_scale" => self.gradient_scale,
            "gradient_speed" => self.gradient_speed,
            "noise_strength" => self.noise_strength,
            "glow_noise" => self.glow_noise,
            "glow_intensity" => self.glow_intensity,
            "glow_spread" => self.glow_spread,
            "glow_falloff" => self.glow_falloff,
            _ => return None,
        };
        Some(value)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut f32> {
        let slot = match name {
            "blue_start" => &mut self.blue_start,
            "cyan_transition" => &mut self.cyan_transition,
            "yellow_transition" => &mut self.yellow_transition,
            "orange_transition" => &mut self.orange_transition,
            "red_end" => &mut self.red_end,
            "blue_end2" => &mut self.blue_end2,
            "morph_speed" => &mut self.morph_speed,
            "band_position" => &mut self.band_position,
            "gradient_scale" => &mut self.gradient_scale,
            "gradient_speed" => &mut self.gradient_speed,
            "noise_strength" => &mut self.noise_strength,
            "glow_noise" => &mut self.glow_noise,
            "glow_intensity" => &mut self.glow_intensity,
            "glow_spread" => &mut self.glow_spread,
            "glow_falloff" => &mut self.glow_falloff,
            _ => return None,
        };
        Some(slot)
    }

    fn resolve(name: &str, value: f32) -> Result<&'static ParamSpec, ParamError> {
        let spec = find_param(name).ok_or_else(|| ParamError::UnknownParameter(name.to_string()))?;
        if !value.is_finite() {
            return Err(ParamError::NonFinite {
                name: spec.name.to_string(),
                value,
            });
        }
        Ok(spec)
    }

    pub fn get(&self, name: &str) -> Result<f32, ParamError> {
        find_param(name)
            .and_then(|spec| self.slot(spec.name))
            .ok_or_else(|| ParamError::UnknownParameter(name.to_string()))
    }

    /// Interactive edit. Returns the value actually stored.
    pub fn set(&mut self, name: &str, value: f32) -> Result<f32, ParamError> {
        let spec = Self::resolve(name, value)?;
        let mut value = value.clamp(spec.min, spec.max);
        if let Some((low, high)) = self.flow_bounds(spec.name) {
            value = value.max(low).min(high);
        }
        if let Some(slot) = self.slot_mut(spec.name) {
            *slot = value;
        }
        if spec.group == ParamGroup::Flow {
            self.apply_flow_constraints();
        }
        let stored = self.get(spec.name)?;
        tracing::debug!(parameter = spec.name, value = stored, "parameter updated");
        Ok(stored)
    }

    /// Interactive nudge by `delta`.
    pub fn adjust(&mut self, name: &str, delta: f32) -> Result<f32, ParamError> {
        let current = self.get(name)?;
        self.set(name, current + delta)
    }

    /// Bulk load (config file, command line). Values are clamped to their
    /// static ranges and the flow progression is repaired once at the end by
    /// raising later positions, so the order of `values` does not matter.
    pub fn load_values<'a, I>(&mut self, values: I) -> Result<(), ParamError>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut flow_touched = false;
        for (name, value) in values {
            let spec = Self::resolve(name, value)?;
            if let Some(slot) = self.slot_mut(spec.name) {
                *slot = value.clamp(spec.min, spec.max);
            }
            flow_touched |= spec.group == ParamGroup::Flow;
        }
        if flow_touched {
            self.raise_flow_progression();
            self.apply_flow_constraints();
        }
        Ok(())
    }

    /// Lifts each flow position to at least its predecessor plus the gap.
    ///
    /// Position `i` is first capped at `1 - (4 - i) * FLOW_GAP` so every later
    /// position still fits below 1.0.
    fn raise_flow_progression(&mut self) {
        let mut slots = [
            &mut self.blue_start,
            &mut self.cyan_transition,
            &mut self.yellow_transition,
            &mut self.orange_transition,
            &mut self.red_end,
        ];
        let last = slots.len() - 1;
        let mut floor: Option<f32> = None;
        for (index, slot) in slots.iter_mut().enumerate() {
            let cap = 1.0 - (last - index) as f32 * FLOW_GAP;
            let mut value = slot.min(cap);
            if let Some(floor) = floor {
                value = value.max(floor + FLOW_GAP).min(cap);
            }
            **slot = value;
            floor = Some(value);
        }
    }

    /// Range an interactive flow slider allows given its neighbours.
    fn flow_bounds(&self, name: &str) -> Option<(f32, f32)> {
        let bounds = match name {
            "blue_start" => (0.0, (self.cyan_transition - FLOW_GAP).max(0.0)),
            "cyan_transition" => (
                self.blue_start + FLOW_GAP,
                (self.blue_start + FLOW_GAP).max(self.yellow_transition - FLOW_GAP),
            ),
            "yellow_transition" => (
                self.cyan_transition + FLOW_GAP,
                (self.cyan_transition + FLOW_GAP).max(self.orange_transition - FLOW_GAP),
            ),
            "orange_transition" => (
                self.yellow_transition + FLOW_GAP,
                (self.yellow_transition + FLOW_GAP)
                    .max(self.red_end - FLOW_GAP)
                    .min(FLOW_CAP),
            ),
            "red_end" => (self.orange_transition + FLOW_GAP, FLOW_CAP),
            _ => return None,
        };
        Some(bounds)
    }

    /// Re-clamps the five coupled positions into a progression.
    pub fn apply_flow_constraints(&mut self) {
        if self.blue_start >= self.cyan_transition {
            self.blue_start = (self.cyan_transition - FLOW_GAP).max(0.0);
        }
        if self.cyan_transition >= self.yellow_transition {
            self.cyan_transition = (self.blue_start + FLOW_GAP).max(self.yellow_transition - FLOW_GAP);
        }
        if self.yellow_transition >= self.orange_transition {
            self.yellow_transition =
                (self.cyan_transition + FLOW_GAP).max(self.orange_transition - FLOW_GAP);
        }
        if self.orange_transition >= self.red_end {
            self.orange_transition =
                (self.yellow_transition + FLOW_GAP).max((self.red_end - FLOW_GAP).min(FLOW_CAP));
        }
    }

    pub fn stop_positions(&self) -> [f32; 6] {
        [
            self.blue_start,
            self.cyan_transition,
            self.yellow_transition,
            self.orange_transition,
            self.red_end,
            self.blue_end2,
        ]
    }

    pub fn colors(&self) -> &PaletteColors {
        &self.colors
    }

    /// Sets one colour. Editing blue also moves the ring-closing blue.
    pub fn set_color(&mut self, slot: ColorSlot, color: Rgb8) {
        *self.colors.slot_mut(slot) = color;
        if slot == ColorSlot::Blue {
            self.colors.blue2 = color;
        }
        self.theme = None;
    }

    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }

    pub fn apply_theme(&mut self, name: &str) -> Result<&'static Theme, ParamError> {
        let theme = find_theme(name).ok_or_else(|| ParamError::UnknownTheme(name.to_string()))?;
        self.use_theme(theme);
        Ok(theme)
    }

    /// Applies the theme after the current one.
    pub fn cycle_theme(&mut self) -> &'static Theme {
        let theme = next_theme(self.theme.as_deref().unwrap_or_default());
        self.use_theme(theme);
        theme
    }

    fn use_theme(&mut self, theme: &'static Theme) {
        self.colors = PaletteColors::from_theme(theme);
        self.theme = Some(theme.name.to_string());
        tracing::debug!(theme = theme.name, "theme applied");
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise_model
    }

    pub fn set_noise_model(&mut self, model: NoiseModel) {
        self.noise_model = model;
    }

    pub fn toggle_noise_model(&mut self) -> NoiseModel {
        self.noise_model = self.noise_model.toggled();
        self.noise_model
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn cycle_blend_mode(&mut self) -> BlendMode {
        self.blend_mode = self.blend_mode.next();
        self.blend_mode
    }

    /// All numeric parameters with their current values, in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static ParamSpec, f32)> + '_ {
        PARAMS
            .iter()
            .map(move |spec| (spec, self.slot(spec.name).unwrap_or(spec.default)))
    }

    pub fn animation(&self, time: f32, variant: &Variant) -> AnimationState {
        AnimationState {
            time,
            morph_speed: self.morph_speed,
            band_position: self.band_position,
            gradient_scale: self.gradient_scale,
            gradient_speed: self.gradient_speed,
            noise_strength: self.noise_strength,
            glow_noise: self.glow_noise,
            noise_model: variant.noise_model(self.noise_model),
        }
    }

    pub fn glow(&self) -> GlowConfig {
        GlowConfig {
            intensity: self.glow_intensity,
            spread: self.glow_spread,
            falloff: self.glow_falloff,
            blend_mode: self.blend_mode,
        }
    }

    /// Freezes the current values for one frame. Stop order is repaired on
    /// the copy; the store itself keeps what was set.
    pub fn snapshot(&self, time: f32, variant: &Variant) -> FrameSnapshot {
        let palette =
            variant.palette(|| Palette::thermal(self.stop_positions(), self.colors.to_vec3s()));
        FrameSnapshot {
            animation: self.animation(time, variant),
            palette,
            glow: self.glow(),
            variant: *variant,
        }
    }
}
