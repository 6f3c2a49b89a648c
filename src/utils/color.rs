//! Background color parsing
//!
//! Accepts the color forms the request boundary allows: the `transparent`
//! sentinel, `#RRGGBB`/`RRGGBB` hex strings, `rgb(r, g, b)` and bare `r,g,b`
//! triples. Anything unrecognized resolves to white instead of failing the
//! request.
//!
//! The sentinel is matched exactly, so `TRANSPARENT` is an unrecognized color.
//! After a leading `#` only the first three hex pairs are read, which lets
//! `#RRGGBBAA` resolve to its RGB part.

use serde::{Deserialize, Serialize};

/// A concrete background color
///
/// Components are kept exactly as parsed. Values outside 0-255 are clamped
/// only when the color is written into an 8-bit channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: i32,
    pub g: i32,
    pub b: i32,
}

impl RgbColor {
    #[must_use]
    pub const fn new(r: i32, g: i32, b: i32) -> Self {
        Self { r, g, b }
    }

    /// Default color used when a specification cannot be parsed
    #[must_use]
    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Components saturated into 8-bit channel values
    #[must_use]
    pub fn to_rgb8(self) -> [u8; 3] {
        [
            Self::saturate(self.r),
            Self::saturate(self.g),
            Self::saturate(self.b),
        ]
    }

    fn saturate(component: i32) -> u8 {
        component.clamp(0, 255) as u8
    }
}

/// Resolved background color specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundColor {
    /// No compositing; transparency survives to the encoder
    #[default]
    Transparent,
    /// Flatten onto this color
    Solid(RgbColor),
}

impl BackgroundColor {
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }
}

/// Utility for parsing color specification strings
pub struct ColorParser;

impl ColorParser {
    const TRANSPARENT: &'static str = "transparent";

    /// Resolve a color specification
    ///
    /// `None`, the empty string and exactly `transparent` yield the sentinel.
    /// Malformed specifications fall back to white.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgtransform::utils::{BackgroundColor, ColorParser, RgbColor};
    ///
    /// let red = BackgroundColor::Solid(RgbColor::new(255, 0, 0));
    /// assert_eq!(ColorParser::parse(Some("#FF0000")), red);
    /// assert_eq!(ColorParser::parse(Some("rgb(255, 0, 0)")), red);
    /// assert_eq!(ColorParser::parse(Some("255,0,0")), red);
    /// assert!(ColorParser::parse(None).is_transparent());
    /// ```
    pub fn parse(spec: Option<&str>) -> BackgroundColor {
        let Some(spec) = spec.filter(|s| !s.is_empty() && *s != Self::TRANSPARENT) else {
            return BackgroundColor::Transparent;
        };
        let spec = spec.trim();

        let parsed = if let Some(inner) = spec.strip_prefix("rgb(") {
            Self::parse_triple(inner.trim_end_matches(')'))
        } else if spec.contains(',') {
            Self::parse_triple(spec)
        } else if spec.starts_with('#') || Self::is_bare_hex(spec) {
            Self::parse_hex(spec)
        } else {
            None
        };

        BackgroundColor::Solid(parsed.unwrap_or_else(|| {
            log::debug!("Unrecognized background color '{spec}', using white");
            RgbColor::white()
        }))
    }

    /// Parse a `r,g,b` triple; whitespace around components is ignored
    pub fn parse_triple(triple: &str) -> Option<RgbColor> {
        let components = triple
            .split(',')
            .map(|part| part.trim().parse::<i32>().ok())
            .collect::<Option<Vec<_>>>()?;

        match components.as_slice() {
            [r, g, b] => Some(RgbColor::new(*r, *g, *b)),
            _ => None,
        }
    }

    /// Parse a `#RRGGBB` or `RRGGBB` hex string
    ///
    /// With a leading `#`, characters after the third pair are ignored.
    pub fn parse_hex(hex: &str) -> Option<RgbColor> {
        let hex = match hex.strip_prefix('#') {
            Some(prefixed) => prefixed.get(0..6)?,
            None => hex,
        };
        if !Self::is_bare_hex(hex) {
            return None;
        }

        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|s| i32::from_str_radix(s, 16).ok())
        };

        Some(RgbColor::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    fn is_bare_hex(candidate: &str) -> bool {
        candidate.len() == 6 && candidate.chars().all(|c| c.is_ascii_hexdigit())
    }
}
