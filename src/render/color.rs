//! Sequential color scale for the choropleth.

use std::fmt;

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    /// Format as CSS: rgb(r,g,b)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

const NO_DATA: Rgb = Rgb { r: 150, g: 150, b: 150 };

// Plasma, sampled at even steps from low to high.
const STOPS: &[Rgb] = &[
    Rgb { r:  13, g:   8, b: 135 },
    Rgb { r:  70, g:   3, b: 159 },
    Rgb { r: 114, g:   1, b: 168 },
    Rgb { r: 156, g:  23, b: 158 },
    Rgb { r: 189, g:  55, b: 134 },
    Rgb { r: 216, g:  87, b: 107 },
    Rgb { r: 237, g: 121, b:  83 },
    Rgb { r: 251, g: 159, b:  58 },
    Rgb { r: 253, g: 202, b:  38 },
    Rgb { r: 240, g: 249, b:  33 },
];

/// Maps values in `[min, max]` onto the color ramp. Bounds are integers:
/// floor of the lowest and ceil of the highest observed value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn from_range(lo: f64, hi: f64) -> Self {
        Self { min: lo.floor(), max: hi.ceil() }
    }

    /// Position of `value` in the scale, clamped to [0, 1].
    pub fn position(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 { return 0.0 }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> Rgb {
        if !value.is_finite() { return NO_DATA }
        ramp(self.position(value))
    }
}

/// Linear interpolation between the two stops surrounding `t`.
pub fn ramp(t: f64) -> Rgb {
    let scaled = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(STOPS.len() - 2);
    let frac = scaled - i as f64;
    let (a, b) = (STOPS[i], STOPS[i + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    Rgb { r: lerp(a.r, b.r), g: lerp(a.g, b.g), b: lerp(a.b, b.b) }
}
