//! Colormap definitions and application logic.

use crate::util::f32_to_u8;

/// Available colormaps for image frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Black to white.
    #[default]
    Grayscale,
    /// White to black.
    Inverted,
    /// Hot (Thermal) - black to red to yellow to white.
    Hot,
    /// Viridis (approximate) - blue to teal to green to yellow.
    Viridis,
}

impl Colormap {
    pub const ALL: [Colormap; 4] = [
        Colormap::Grayscale,
        Colormap::Inverted,
        Colormap::Hot,
        Colormap::Viridis,
    ];

    /// Apply the colormap to a normalized value [0, 1] and return RGBA bytes.
    #[must_use]
    pub fn apply(self, val: f32) -> [u8; 4] {
        let val = if val.is_nan() { 0.0 } else { val.clamp(0.0, 1.0) };
        match self {
            Colormap::Grayscale => {
                let v = f32_to_u8(val * 255.0);
                [v, v, v, 255]
            }
            Colormap::Inverted => {
                let v = f32_to_u8((1.0 - val) * 255.0);
                [v, v, v, 255]
            }
            Colormap::Hot => {
                if val < 1.0 / 3.0 {
                    [f32_to_u8(val * 3.0 * 255.0), 0, 0, 255]
                } else if val < 2.0 / 3.0 {
                    [255, f32_to_u8((val * 3.0 - 1.0) * 255.0), 0, 255]
                } else {
                    [255, 255, f32_to_u8((val * 3.0 - 2.0) * 255.0), 255]
                }
            }
            Colormap::Viridis => {
                let r = f32_to_u8(255.0 * val.powf(2.0));
                let g = f32_to_u8(255.0 * val);
                let b = f32_to_u8(255.0 * (1.0 - val));
                [r, g, b, 255]
            }
        }
    }
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Colormap::Grayscale => write!(f, "Grayscale"),
            Colormap::Inverted => write!(f, "Inverted"),
            Colormap::Hot => write!(f, "Hot (Thermal)"),
            Colormap::Viridis => write!(f, "Viridis"),
        }
    }
}
