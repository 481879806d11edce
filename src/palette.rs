//! Named color palette for boxes and peer identities.
//!
//! Colors are stored in the shared document by name, so every renderer can
//! map them to its own theme. `hex` gives the default mapping.

#[cfg(test)]
#[path = "palette_test.rs"]
mod palette_test;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One entry of the fixed palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteColor {
    Love,
    Gold,
    Rose,
    Pine,
    Foam,
    Iris,
}

impl PaletteColor {
    /// Every palette entry, in display order.
    pub const ALL: [Self; 6] = [Self::Love, Self::Gold, Self::Rose, Self::Pine, Self::Foam, Self::Iris];

    /// Pick a color uniformly at random.
    #[must_use]
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    /// Pick a color uniformly at random from the given generator.
    #[must_use]
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// The name stored in the shared document.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Love => "love",
            Self::Gold => "gold",
            Self::Rose => "rose",
            Self::Pine => "pine",
            Self::Foam => "foam",
            Self::Iris => "iris",
        }
    }

    /// Default CSS hex value.
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            Self::Love => "#eb6f92",
            Self::Gold => "#f6c177",
            Self::Rose => "#ebbcba",
            Self::Pine => "#31748f",
            Self::Foam => "#9ccfd8",
            Self::Iris => "#c4a7e7",
        }
    }
}

impl fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a document carries a color name outside the palette.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown palette color: {0}")]
pub struct UnknownColor(pub String);

impl FromStr for PaletteColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownColor(s.to_owned()))
    }
}
