use crate::color::Rgb8;

/// Named preset for the five primary palette colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub blue: Rgb8,
    pub cyan: Rgb8,
    pub yellow: Rgb8,
    pub orange: Rgb8,
    pub red: Rgb8,
}

impl Theme {
    /// Colours in stop order, without the ring-closing copy of blue.
    pub fn colors(&self) -> [Rgb8; 5] {
        [self.blue, self.cyan, self.yellow, self.orange, self.red]
    }
}

pub const THEMES: [Theme; 4] = [
    Theme {
        name: "Original",
        blue: Rgb8::new(0, 0, 105),
        cyan: Rgb8::new(0, 60, 255),
        yellow: Rgb8::new(0, 255, 255),
        orange: Rgb8::new(255, 225, 0),
        red: Rgb8::new(245, 60, 35),
    },
    Theme {
        name: "Muted",
        blue: Rgb8::new(16, 17, 30),
        cyan: Rgb8::new(61, 73, 110),
        yellow: Rgb8::new(77, 223, 235),
        orange: Rgb8::new(255, 225, 0),
        red: Rgb8::new(245, 60, 35),
    },
    Theme {
        name: "Cool",
        blue: Rgb8::new(25, 25, 25),
        cyan: Rgb8::new(71, 71, 73),
        yellow: Rgb8::new(215, 240, 187),
        orange: Rgb8::new(0, 180, 255),
        red: Rgb8::new(35, 245, 220),
    },
    Theme {
        name: "Warm",
        blue: Rgb8::new(30, 17, 2),
        cyan: Rgb8::new(255, 255, 255),
        yellow: Rgb8::new(217, 230, 173),
        orange: Rgb8::new(255, 225, 0),
        red: Rgb8::new(245, 60, 35),
    },
];

/// Case-insensitive theme lookup.
pub fn find_theme(name: &str) -> Option<&'static Theme> {
    let wanted = name.trim();
    THEMES.iter().find(|theme| theme.name.eq_ignore_ascii_case(wanted))
}

/// Theme after `name` in [`THEMES`], wrapping; unknown names start over.
pub fn next_theme(name: &str) -> &'static Theme {
    let index = THEMES
        .iter()
        .position(|theme| theme.name.eq_ignore_ascii_case(name.trim()))
        .map_or(0, |index| (index + 1) % THEMES.len());
    &THEMES[index]
}
