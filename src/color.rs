// ============================================================================
// CELL COLORS + DISPLAY COLOR MAP
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An opaque RGB bead color. Always printed as lowercase `#rrggbb`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellColor([u8; 3]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}' (expected #rrggbb)")]
pub struct ColorParseError(pub String);

impl CellColor {
    /// Painting with white removes the bead instead of storing it.
    pub const WHITE: CellColor = CellColor([0xff, 0xff, 0xff]);
    /// Substituted for a pure-white brush.
    pub const NEAR_WHITE: CellColor = CellColor([0xfc, 0xfc, 0xfc]);
    /// Placeholder written by an overlay erase.
    pub const EMPTY: CellColor = CellColor([0xbf, 0xbf, 0xbf]);

    pub const DEFAULT_BRUSH: CellColor = CellColor([0xff, 0x00, 0x00]);
    pub const DEFAULT_BACKGROUND: CellColor = CellColor([0x1a, 0x1a, 0x1a]);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }

    pub fn is_white(self) -> bool {
        self == Self::WHITE
    }

    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

/// Brush colors handed to the store are never pure white.
pub fn coerce_brush_color(color: CellColor) -> CellColor {
    if color.is_white() {
        CellColor::NEAR_WHITE
    } else {
        color
    }
}

impl fmt::Display for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellColor({})", self)
    }
}

impl FromStr for CellColor {
    type Err = ColorParseError;

    /// Accepts `#rrggbb`, `rrggbb` and `#rgb` in any letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        match hex.len() {
            6 => {
                let val = u32::from_str_radix(hex, 16).map_err(|_| err())?;
                Ok(Self([(val >> 16) as u8, (val >> 8) as u8, val as u8]))
            }
            3 => {
                let mut rgb = [0u8; 3];
                for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                    let nibble = c.to_digit(16).ok_or_else(err)? as u8;
                    *slot = nibble * 17;
                }
                Ok(Self(rgb))
            }
            _ => Err(err()),
        }
    }
}

impl Serialize for CellColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// COLOR MAP – re-skin stored colors without touching the cells
// ============================================================================

/// Stored color → display color. Entries are created lazily (identity) the
/// first time a stored color is observed, then edited by the palette.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorMap {
    entries: BTreeMap<CellColor, CellColor>,
}

impl ColorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add identity entries for colors seen for the first time.
    /// Returns how many entries were added.
    pub fn observe(&mut self, colors: impl IntoIterator<Item = CellColor>) -> usize {
        let mut added = 0;
        for c in colors {
            if !self.entries.contains_key(&c) {
                self.entries.insert(c, c);
                added += 1;
            }
        }
        added
    }

    /// Display color for a stored color (falls back to the stored color).
    pub fn resolve(&self, stored: CellColor) -> CellColor {
        self.entries.get(&stored).copied().unwrap_or(stored)
    }

    pub fn get(&self, stored: CellColor) -> Option<CellColor> {
        self.entries.get(&stored).copied()
    }

    /// Returns `true` when the entry actually changed.
    pub fn remap(&mut self, stored: CellColor, display: CellColor) -> bool {
        self.entries.insert(stored, display) != Some(display)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellColor, CellColor)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonicalises_to_lowercase() {
        let c: CellColor = "#BFbFbf".parse().unwrap();
        assert_eq!(c, CellColor::EMPTY);
        assert_eq!(c.to_string(), "#bfbfbf");
        assert_eq!("ff0000".parse::<CellColor>().unwrap(), CellColor::DEFAULT_BRUSH);
        assert_eq!("#fff".parse::<CellColor>().unwrap(), CellColor::WHITE);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "#", "#12345", "#gggggg", "red", "#1234567", "transparent"] {
            assert!(bad.parse::<CellColor>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn brush_coercion_only_touches_white() {
        assert_eq!(coerce_brush_color(CellColor::WHITE), CellColor::NEAR_WHITE);
        assert_eq!(coerce_brush_color(CellColor::EMPTY), CellColor::EMPTY);
    }

    #[test]
    fn observe_adds_identity_once() {
        let mut map = ColorMap::new();
        let red = CellColor::from_rgb(255, 0, 0);
        assert_eq!(map.observe([red, red, CellColor::EMPTY]), 2);
        assert!(map.remap(red, CellColor::from_rgb(0, 0, 255)));
        // re-observing keeps the user's remap
        assert_eq!(map.observe([red]), 0);
        assert_eq!(map.resolve(red), CellColor::from_rgb(0, 0, 255));
        assert_eq!(map.resolve(CellColor::NEAR_WHITE), CellColor::NEAR_WHITE);
        assert!(!map.remap(red, CellColor::from_rgb(0, 0, 255)));
    }
}
