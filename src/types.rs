//! Shared boundary types for the drawing board.
//!
//! This module defines the data that crosses the two key seams:
//! - Engine → Surface (in-memory): points, strokes, actor placements
//! - Surface → Terminal: `Cell`s carrying a glyph and a `Style`

// ---------------------------------------------------------------------------
// Shared style primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Named(NamedColor),
    Rgb { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    /// Parse a CSS-like color string: a terminal color name, one of the sprite
    /// palette names, `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)`.
    ///
    /// Returns the color together with its alpha (1.0 unless given).
    pub fn parse(s: &str) -> Option<(Color, f64)> {
        let s = s.trim().to_ascii_lowercase();

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return None;
            }
            let channel = |i: usize| {
                hex.get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            };
            return Some((
                Color::Rgb {
                    r: channel(0)?,
                    g: channel(2)?,
                    b: channel(4)?,
                },
                1.0,
            ));
        }

        if let Some(args) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() < 3 || parts.len() > 4 {
                return None;
            }
            let r = parts[0].parse().ok()?;
            let g = parts[1].parse().ok()?;
            let b = parts[2].parse().ok()?;
            let a = match parts.get(3) {
                Some(a) => a.parse::<f64>().ok()?.clamp(0.0, 1.0),
                None => 1.0,
            };
            return Some((Color::Rgb { r, g, b }, a));
        }

        let named = match s.as_str() {
            "black" => Color::Named(NamedColor::Black),
            "red" => Color::Named(NamedColor::Red),
            "green" => Color::Named(NamedColor::Green),
            "yellow" => Color::Named(NamedColor::Yellow),
            "blue" => Color::Named(NamedColor::Blue),
            "magenta" | "fuschia" | "fuchsia" => Color::Named(NamedColor::Magenta),
            "cyan" => Color::Named(NamedColor::Cyan),
            "white" => Color::Named(NamedColor::White),
            "original" => Color::Rgb { r: 106, g: 215, b: 229 },
            "periwinkle" => Color::Rgb { r: 150, g: 160, b: 255 },
            "orange" => Color::Rgb { r: 255, g: 165, b: 0 },
            "lime-green" | "lime" => Color::Rgb { r: 50, g: 205, b: 50 },
            "forest-green" => Color::Rgb { r: 34, g: 139, b: 34 },
            "purple" => Color::Rgb { r: 128, g: 0, b: 128 },
            "gray" | "grey" => Color::Rgb { r: 128, g: 128, b: 128 },
            "brown" => Color::Rgb { r: 139, g: 69, b: 19 },
            "hot-pink" | "pink" => Color::Rgb { r: 255, g: 105, b: 180 },
            _ => return None,
        };
        Some((named, 1.0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dim: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            ch: ' ',
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

// ---------------------------------------------------------------------------
// Engine → Surface boundary (in-memory only, never serialized)
// ---------------------------------------------------------------------------

/// A point in canvas pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Stroke style for a line segment. `color` is a CSS-like color string.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
}

/// Where and how an actor sprite is drawn: a translate + rotate transform
/// plus the horizontal offset into the walk-cycle sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub sprite_offset: i32,
}

/// Handle for a transient speech bubble owned by the surface.
pub type BubbleId = u64;
