//! Marker value types and the factory that stamps them out.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Supported marker outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Shape {
    #[default]
    Circle,
    Diamond,
}

impl Shape {
    /// Flag bit of the circle shape.
    pub const CIRCLE_BIT: u8 = 0b01;
    /// Flag bit of the diamond shape.
    pub const DIAMOND_BIT: u8 = 0b10;

    /// All supported shapes.
    pub const ALL: [Shape; 2] = [Shape::Circle, Shape::Diamond];

    /// Resolves a shape from flag bits; exactly one supported bit must be set.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedShape`] for empty, combined or unknown bits.
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            Self::CIRCLE_BIT => Ok(Shape::Circle),
            Self::DIAMOND_BIT => Ok(Shape::Diamond),
            other => Err(Error::UnsupportedShape(format!("flag value {other:#04b}"))),
        }
    }

    /// Lowercase name of the shape.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Shape::Circle => "circle",
            Shape::Diamond => "diamond",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circle" | "ellipse" => Ok(Shape::Circle),
            "diamond" => Ok(Shape::Diamond),
            _ => Err(Error::UnsupportedShape(s.to_string())),
        }
    }
}

/// RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Opaque color from RGB components.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color from RGBA components.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Components as `[r, g, b, a]`.
    #[must_use]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parses a color name or a `#rrggbb` / `#rrggbbaa` hex string.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let named = match s.to_ascii_lowercase().as_str() {
            "red" => Some(Color::RED),
            "green" => Some(Color::GREEN),
            "blue" => Some(Color::BLUE),
            "yellow" => Some(Color::YELLOW),
            "cyan" => Some(Color::CYAN),
            "magenta" => Some(Color::MAGENTA),
            "white" => Some(Color::WHITE),
            "black" => Some(Color::BLACK),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let invalid = || Error::Configuration(format!("invalid color: {s}"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// Style accessors shared by markers and the factory that creates them.
pub trait MarkerStyle {
    /// Marker outline.
    fn shape(&self) -> Shape;

    /// Changes the marker outline.
    fn set_shape(&mut self, shape: Shape);

    /// Pixel diameter.
    fn size(&self) -> f32;

    /// Changes the pixel diameter.
    fn set_size(&mut self, size: f32);

    /// Pen and brush color.
    fn color(&self) -> Color;

    /// Changes pen and brush color.
    fn set_color(&mut self, color: Color);

    /// Whether the marker is filled or only outlined.
    fn filled(&self) -> bool;

    /// Changes the fill flag.
    fn set_filled(&mut self, filled: bool);

    /// Parses and applies a shape name.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedShape`] if the name is not a supported
    /// shape; the current shape is left unchanged.
    fn set_marker_shape_name(&mut self, name: &str) -> Result<()> {
        let shape = name.parse()?;
        self.set_shape(shape);
        Ok(())
    }
}

/// One visual marker owned by a marker group.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRecord {
    /// Position in image pixel coordinates.
    pub x: f64,
    pub y: f64,
    pub shape: Shape,
    pub size: f32,
    pub color: Color,
    pub filled: bool,
    pub visible: bool,
    /// Key of this marker inside its owning group; maintained by the tree.
    pub(crate) key: Option<usize>,
    /// Detection probability, when the data carries one.
    pub probability: Option<f32>,
}

impl MarkerRecord {
    /// Key of this marker inside its owning group, `None` while detached.
    #[must_use]
    pub fn key(&self) -> Option<usize> {
        self.key
    }

    /// Position as `(x, y)`.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Moves the marker.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }
}

impl MarkerStyle for MarkerRecord {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    fn size(&self) -> f32 {
        self.size
    }

    fn set_size(&mut self, size: f32) {
        self.size = size;
    }

    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn filled(&self) -> bool {
        self.filled
    }

    fn set_filled(&mut self, filled: bool) {
        self.filled = filled;
    }
}

/// Stamps out markers with a fixed style.
///
/// Markers copy the style at creation time; changing the factory later does
/// not affect markers it already produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFactory {
    shape: Shape,
    size: f32,
    color: Color,
    filled: bool,
}

impl Default for MarkerFactory {
    fn default() -> Self {
        Self {
            shape: Shape::Circle,
            size: 3.0,
            color: Color::RED,
            filled: true,
        }
    }
}

impl MarkerFactory {
    /// Creates a factory with the given style.
    #[must_use]
    pub fn new(shape: Shape, size: f32, color: Color, filled: bool) -> Self {
        Self {
            shape,
            size,
            color,
            filled,
        }
    }

    /// Sets the shape.
    #[must_use]
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets the size.
    #[must_use]
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Sets the color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the fill flag.
    #[must_use]
    pub fn with_filled(mut self, filled: bool) -> Self {
        self.filled = filled;
        self
    }

    /// Creates a hidden, unparented marker at `(x, y)`.
    #[must_use]
    pub fn stamp(&self, x: f64, y: f64, probability: Option<f32>) -> MarkerRecord {
        MarkerRecord {
            x,
            y,
            shape: self.shape,
            size: self.size,
            color: self.color,
            filled: self.filled,
            visible: false,
            key: None,
            probability,
        }
    }
}

impl MarkerStyle for MarkerFactory {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    fn size(&self) -> f32 {
        self.size
    }

    fn set_size(&mut self, size: f32) {
        self.size = size;
    }

    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn filled(&self) -> bool {
        self.filled
    }

    fn set_filled(&mut self, filled: bool) {
        self.filled = filled;
    }
}
