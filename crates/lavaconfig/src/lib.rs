use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thermal::params::find_param;
use thermal::{find_theme, BlendMode, ColorSlot, NoiseModel, ParamError, ParameterStore, Rgb8, Shape, Variant};

pub const DEFAULT_MASK_COUNT: usize = 7;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_EXPORT_SIZE: u32 = 1280;

const MIN_EXPORT_SIZE: u32 = 64;
const MAX_EXPORT_SIZE: u32 = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid configuration: {0}")]
    Param(#[from] ParamError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

/// Session configuration, usually `config.toml` in the config directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LavaConfig {
    pub version: u32,
    #[serde(default)]
    pub render: RenderSection,
    /// Numeric overrides keyed by parameter name.
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
    #[serde(default)]
    pub palette: PaletteSection,
    #[serde(default)]
    pub masks: MaskSection,
    #[serde(default)]
    pub loading: LoadingSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RenderSection {
    pub variant: Option<String>,
    pub shape: Option<Shape>,
    pub noise: Option<NoiseModel>,
    pub blend: Option<BlendMode>,
    pub fps: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_antialias_opt")]
    pub antialias: Option<AntialiasSetting>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaletteSection {
    pub theme: Option<String>,
    /// Colour slot (`blue`, `color_red`, ...) to `#rrggbb` or `r,g,b`.
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaskSection {
    pub directory: Option<PathBuf>,
    #[serde(default = "default_mask_count")]
    pub count: usize,
    /// One-based index shown first when no mask is given.
    #[serde(default = "default_mask_start")]
    pub start: usize,
}

impl Default for MaskSection {
    fn default() -> Self {
        Self {
            directory: None,
            count: DEFAULT_MASK_COUNT,
            start: default_mask_start(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoadingSection {
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub read_timeout: Option<Duration>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub decode_timeout: Option<Duration>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub failsafe: Option<Duration>,
    pub max_upload_bytes: Option<u64>,
}

impl LoadingSection {
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout.unwrap_or(Duration::from_secs(5))
    }

    pub fn decode_timeout(&self) -> Duration {
        self.decode_timeout.unwrap_or(Duration::from_secs(5))
    }

    pub fn failsafe(&self) -> Duration {
        self.failsafe.unwrap_or(Duration::from_secs(10))
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportSection {
    #[serde(default = "default_export_size")]
    pub size: u32,
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub branding: BrandingSection,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            size: DEFAULT_EXPORT_SIZE,
            directory: None,
            branding: BrandingSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrandingSection {
    pub enabled: bool,
    pub title: String,
    pub subtitle: String,
    pub footer: String,
}

impl Default for BrandingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "NEUE\u{2014}LAVA\u{2122}".into(),
            subtitle: "BY STUDI\u{d8}E".into(),
            footer: "\u{a9}2025 OYGARERDAL.COM".into(),
        }
    }
}

fn default_mask_count() -> usize {
    DEFAULT_MASK_COUNT
}

fn default_mask_start() -> usize {
    1
}

fn default_export_size() -> u32 {
    DEFAULT_EXPORT_SIZE
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl Default for LavaConfig {
    fn default() -> Self {
        Self {
            version: 1,
            render: RenderSection::default(),
            parameters: BTreeMap::new(),
            palette: PaletteSection::default(),
            masks: MaskSection::default(),
            loading: LoadingSection::default(),
            export: ExportSection::default(),
        }
    }
}

impl LavaConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LavaConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn variant(&self) -> Variant {
        self.render
            .variant
            .as_deref()
            .and_then(Variant::find)
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if let Some(name) = &self.render.variant {
            if Variant::find(name).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "render.variant '{name}' is unknown; expected one of neue-lava, mask-gradient, shape"
                )));
            }
        }

        if let Some(fps) = self.render.fps {
            if fps.is_nan() || fps < 0.0 {
                return Err(ConfigError::Invalid("render.fps must be >= 0".into()));
            }
        }

        for (name, value) in &self.parameters {
            if find_param(name).is_none() {
                return Err(ParamError::UnknownParameter(name.clone()).into());
            }
            if !value.is_finite() {
                return Err(ParamError::NonFinite {
                    name: name.clone(),
                    value: *value,
                }
                .into());
            }
        }

        if let Some(theme) = &self.palette.theme {
            if find_theme(theme).is_none() {
                return Err(ParamError::UnknownTheme(theme.clone()).into());
            }
        }

        for (slot, raw) in &self.palette.colors {
            slot.parse::<ColorSlot>()?;
            raw.parse::<Rgb8>().map_err(|err| {
                ConfigError::Invalid(format!("palette.colors.{slot}: {err}"))
            })?;
        }

        if self.masks.count == 0 {
            return Err(ConfigError::Invalid("masks.count must be at least 1".into()));
        }
        if self.masks.start == 0 || self.masks.start > self.masks.count {
            return Err(ConfigError::Invalid(format!(
                "masks.start must be between 1 and {}",
                self.masks.count
            )));
        }

        for (field, value) in [
            ("read_timeout", self.loading.read_timeout),
            ("decode_timeout", self.loading.decode_timeout),
            ("failsafe", self.loading.failsafe),
        ] {
            if value.is_some_and(|duration| duration.is_zero()) {
                return Err(ConfigError::Invalid(format!(
                    "loading.{field} must be greater than zero"
                )));
            }
        }
        if self.loading.max_upload_bytes == Some(0) {
            return Err(ConfigError::Invalid(
                "loading.max_upload_bytes must be greater than zero".into(),
            ));
        }

        if !(MIN_EXPORT_SIZE..=MAX_EXPORT_SIZE).contains(&self.export.size) {
            return Err(ConfigError::Invalid(format!(
                "export.size must be between {MIN_EXPORT_SIZE} and {MAX_EXPORT_SIZE}"
            )));
        }

        Ok(())
    }

    /// Pushes theme, colours, numeric overrides and enum choices into
    /// `store`, in that order.
    pub fn apply_to(&self, store: &mut ParameterStore) -> Result<(), ConfigError> {
        if let Some(theme) = &self.palette.theme {
            store.apply_theme(theme)?;
        }
        for (slot, raw) in &self.palette.colors {
            let slot = slot.parse::<ColorSlot>()?;
            let color = raw
                .parse::<Rgb8>()
                .map_err(|err| ConfigError::Invalid(format!("palette.colors.{slot}: {err}")))?;
            store.set_color(slot, color);
        }
        store.load_values(
            self.parameters
                .iter()
                .map(|(name, value)| (name.as_str(), *value)),
        )?;
        if let Some(noise) = self.render.noise {
            store.set_noise_model(noise);
        }
        if let Some(blend) = self.render.blend {
            store.set_blend_mode(blend);
        }
        tracing::debug!(
            overrides = self.parameters.len(),
            colors = self.palette.colors.len(),
            "configuration applied to parameter store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[render]
variant = "mask-gradient"
shape = "octahedron"
noise = "fbm"
blend = "screen"
antialias = 4

[parameters]
morph_speed = 1.5
glow_spread = 0.3
red_end = 0.97

[palette]
theme = "warm"

[palette.colors]
red = "#ff0000"

[masks]
directory = "/opt/neue-lava/masks"
count = 5
start = 2

[loading]
read_timeout = "2s"
decode_timeout = 3
failsafe = "10s"
max_upload_bytes = 2048

[export]
size = 512

[export.branding]
enabled = false
"##;

    #[test]
    fn parses_sample_config() {
        let config = LavaConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.variant(), Variant::MASK_GRADIENT);
        assert_eq!(config.render.shape, Some(Shape::Octahedron));
        assert_eq!(config.render.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(config.masks.count, 5);
        assert_eq!(config.loading.read_timeout(), Duration::from_secs(2));
        assert_eq!(config.loading.decode_timeout(), Duration::from_secs(3));
        assert_eq!(config.loading.max_upload_bytes(), 2048);
        assert_eq!(config.export.size, 512);
        assert!(!config.export.branding.enabled);
        assert_eq!(config.export.branding.title, "NEUE\u{2014}LAVA\u{2122}");
    }

    #[test]
    fn defaults_follow_session_limits() {
        let config = LavaConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.loading.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.loading.failsafe(), Duration::from_secs(10));
        assert_eq!(config.loading.max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.masks.count, 7);
        assert_eq!(config.export.size, 1280);
        assert_eq!(config.variant(), Variant::NEUE_LAVA);
    }

    #[test]
    fn applies_to_parameter_store() {
        let config = LavaConfig::from_toml_str(SAMPLE).unwrap();
        let mut store = ParameterStore::new();
        config.apply_to(&mut store).unwrap();
        assert_eq!(store.get("morph_speed").unwrap(), 1.5);
        assert_eq!(store.get("red_end").unwrap(), 0.97);
        assert_eq!(store.colors().blue, Rgb8::new(30, 17, 2));
        assert_eq!(store.colors().red, Rgb8::new(255, 0, 0));
        assert_eq!(store.noise_model(), NoiseModel::Fbm);
        assert_eq!(store.blend_mode(), BlendMode::Screen);
    }

    #[test]
    fn rejects_unknown_parameter() {
        let err = LavaConfig::from_toml_str("version = 1\n[parameters]\nwobble = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Param(ParamError::UnknownParameter(_))));
    }

    #[test]
    fn rejects_unknown_theme_and_bad_colour() {
        let err = LavaConfig::from_toml_str("version = 1\n[palette]\ntheme = \"neon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Param(ParamError::UnknownTheme(_))));

        let err = LavaConfig::from_toml_str("version = 1\n[palette.colors]\nred = \"#zzzzzz\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_sections() {
        for input in [
            "version = 2",
            "version = 1\n[masks]\ncount = 0\n",
            "version = 1\n[masks]\ncount = 3\nstart = 4\n",
            "version = 1\n[loading]\nfailsafe = 0\n",
            "version = 1\n[export]\nsize = 16\n",
            "version = 1\n[render]\nvariant = \"lamp\"\n",
        ] {
            let err = LavaConfig::from_toml_str(input).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{input}: {err}");
        }
    }

    #[test]
    fn rejects_unrepresentable_timeouts() {
        for value in ["inf", "1e300", "nan", "-1.5"] {
            let input = format!("version = 1\n[loading]\nread_timeout = {value}\n");
            let err = LavaConfig::from_toml_str(&input).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)), "{value}: {err}");
        }
        let config =
            LavaConfig::from_toml_str("version = 1\n[loading]\nread_timeout = 2.5\n").unwrap();
        assert_eq!(config.loading.read_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = LavaConfig::from_toml_str("version = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
