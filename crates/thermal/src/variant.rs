use crate::field::NoiseModel;
use crate::palette::Palette;

/// Where the gradient gets its mask value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeSource {
    /// Red channel of a mask image.
    TextureMask,
    /// Distance from the centre of a procedural solid.
    Procedural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseSource {
    /// Whatever the parameter store selects.
    FromParameters,
    Fixed(NoiseModel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSet {
    /// Six editable stops from the parameter store.
    Thermal,
    /// Fixed blue, yellow, red ramp.
    Tricolor,
}

/// Selects which flavour of the shared gradient and glow code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub name: &'static str,
    pub shape: ShapeSource,
    pub noise: NoiseSource,
    /// Draw the glow layer at all.
    pub glow: bool,
    /// Modulate glow alpha with simplex noise.
    pub glow_noise: bool,
    pub stops: StopSet,
}

impl Variant {
    pub const NEUE_LAVA: Variant = Variant {
        name: "neue-lava",
        shape: ShapeSource::TextureMask,
        noise: NoiseSource::FromParameters,
        glow: true,
        glow_noise: true,
        stops: StopSet::Thermal,
    };

    pub const MASK_GRADIENT: Variant = Variant {
        name: "mask-gradient",
        shape: ShapeSource::TextureMask,
        noise: NoiseSource::Fixed(NoiseModel::Simplex),
        glow: true,
        glow_noise: false,
        stops: StopSet::Thermal,
    };

    pub const SHAPE: Variant = Variant {
        name: "shape",
        shape: ShapeSource::Procedural,
        noise: NoiseSource::FromParameters,
        glow: false,
        glow_noise: false,
        stops: StopSet::Tricolor,
    };

    pub const ALL: [Variant; 3] = [Variant::NEUE_LAVA, Variant::MASK_GRADIENT, Variant::SHAPE];

    pub fn find(name: &str) -> Option<Variant> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|variant| variant.name.eq_ignore_ascii_case(wanted))
    }

    /// Parameter values this variant starts from instead of the table defaults.
    pub fn default_overrides(&self) -> &'static [(&'static str, f32)] {
        match self.name {
            "mask-gradient" => &[
                ("morph_speed", 1.0),
                ("glow_intensity", 2.0),
                ("glow_falloff", 0.4),
                ("blue_start", 0.0),
                ("cyan_transition", 0.65),
                ("yellow_transition", 0.7),
                ("orange_transition", 0.75),
            ],
            "shape" => &[("morph_speed", 1.0)],
            _ => &[],
        }
    }

    pub fn noise_model(&self, requested: NoiseModel) -> NoiseModel {
        match self.noise {
            NoiseSource::FromParameters => requested,
            NoiseSource::Fixed(model) => model,
        }
    }

    /// Picks the variant's stop set, using `thermal` when it is editable.
    pub fn palette(&self, thermal: impl FnOnce() -> Palette) -> Palette {
        match self.stops {
            StopSet::Thermal => thermal(),
            StopSet::Tricolor => Palette::tricolor(),
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::NEUE_LAVA
    }
}
