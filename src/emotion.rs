//! Color-to-emotion classification.
//!
//! Dialogue lines are color-tagged in the authoring tool. Two tool versions
//! shipped different default palettes, so both are matched:
//!
//! | Emotion | Legacy | Current |
//! |---|---|---|
//! | Neutral | `#FFFFFF`, `#808080` | `#BFBFBF`, `#EDEDED` |
//! | Angry | `#FF0000` | `#E84C3D` |
//! | Happy | `#FFFF00` | `#F2C40F` |
//! | Sad | `#0000FF` | `#3366DB` |
//! | Surprised | `#00FF00` | `#2ECC70` |
//!
//! Pure black is the tool's "no color" state and always means Neutral.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Rgba;

/// Per-channel tolerance (0–1 scale) for an exact palette match.
pub const DEFAULT_TOLERANCE: f32 = 0.01;

/// Discrete emotion of a dialogue line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emotion {
    /// Default.
    Neutral,
    /// Angry.
    Angry,
    /// Happy.
    Happy,
    /// Sad.
    Sad,
    /// Surprised.
    Surprised,
}

impl Emotion {
    /// Sprite pose name for this emotion.
    pub fn pose(&self) -> &'static str {
        match self {
            Self::Neutral => "Base",
            Self::Angry => "Angry",
            Self::Happy => "Happy",
            Self::Sad => "Sad",
            Self::Surprised => "Surprised",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    (r, g, b)
}

/// Legacy authoring-tool palette.
pub const LEGACY_PALETTE: [((u8, u8, u8), Emotion); 6] = [
    (rgb(0xFF, 0xFF, 0xFF), Emotion::Neutral),
    (rgb(0x80, 0x80, 0x80), Emotion::Neutral),
    (rgb(0xFF, 0x00, 0x00), Emotion::Angry),
    (rgb(0xFF, 0xFF, 0x00), Emotion::Happy),
    (rgb(0x00, 0x00, 0xFF), Emotion::Sad),
    (rgb(0x00, 0xFF, 0x00), Emotion::Surprised),
];

/// Current authoring-tool palette.
pub const CURRENT_PALETTE: [((u8, u8, u8), Emotion); 6] = [
    (rgb(0xBF, 0xBF, 0xBF), Emotion::Neutral),
    (rgb(0xED, 0xED, 0xED), Emotion::Neutral),
    (rgb(0xE8, 0x4C, 0x3D), Emotion::Angry),
    (rgb(0xF2, 0xC4, 0x0F), Emotion::Happy),
    (rgb(0x33, 0x66, 0xDB), Emotion::Sad),
    (rgb(0x2E, 0xCC, 0x70), Emotion::Surprised),
];

fn to_rgba(c: (u8, u8, u8)) -> Rgba {
    Rgba::from_u8(c.0, c.1, c.2)
}

/// Nearest entry of a palette: (distance, emotion). Earlier entries win ties.
fn nearest(palette: &[((u8, u8, u8), Emotion)], color: &Rgba) -> (f32, Emotion) {
    let mut best = (f32::INFINITY, Emotion::Neutral);
    for (c, emotion) in palette {
        let d = to_rgba(*c).distance(color);
        if d < best.0 {
            best = (d, *emotion);
        }
    }
    best
}

/// Palette-based classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionClassifier {
    tolerance: f32,
}

impl Default for EmotionClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl EmotionClassifier {
    /// Classifier with a per-channel exact-match tolerance.
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
        }
    }

    /// Classify a color annotation; an absent color is Neutral.
    pub fn classify(&self, color: Option<&Rgba>) -> Emotion {
        let color = match color {
            Some(c) if !c.is_black() => c,
            _ => return Emotion::Neutral,
        };

        for palette in [&LEGACY_PALETTE[..], &CURRENT_PALETTE[..]] {
            if let Some((_, emotion)) = palette
                .iter()
                .find(|(c, _)| to_rgba(*c).approx_eq(color, self.tolerance))
            {
                return *emotion;
            }
        }

        let (legacy_d, legacy) = nearest(&LEGACY_PALETTE, color);
        let (current_d, current) = nearest(&CURRENT_PALETTE, color);
        if current_d < legacy_d {
            current
        } else {
            legacy
        }
    }
}

/// Classify with the default tolerance.
pub fn classify(color: &Rgba) -> Emotion {
    EmotionClassifier::default().classify(Some(color))
}
