//! Hero model as delivered by the upstream provider.
//!
//! The structs mirror the provider's JSON schema. All leaf values are kept
//! as strings because that is what the provider returns (including numeric
//! power stats), and the cache diff only needs value equality, not numeric
//! interpretation.

use serde::{Deserialize, Serialize};

/// Power statistics block of a hero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerStats {
    #[serde(default)]
    pub intelligence: String,
    #[serde(default)]
    pub strength: String,
    #[serde(default)]
    pub speed: String,
}

/// Biography block of a hero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Biography {
    #[serde(default, rename = "full-name")]
    pub full_name: String,
    #[serde(default)]
    pub publisher: String,
}

/// Image block of a hero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub url: String,
}

/// A hero as cached and served by the proxy.
///
/// Value equality across the whole payload drives the refresh diff: two
/// heroes compare equal exactly when no subscriber-visible field changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub powerstats: PowerStats,
    #[serde(default)]
    pub biography: Biography,
    #[serde(default)]
    pub image: Image,
}

impl Hero {
    /// Create a hero with only identity fields set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the power stats block.
    pub fn with_powerstats(mut self, powerstats: PowerStats) -> Self {
        self.powerstats = powerstats;
        self
    }

    /// Set the biography block.
    pub fn with_biography(mut self, biography: Biography) -> Self {
        self.biography = biography;
        self
    }

    /// Set the image block.
    pub fn with_image(mut self, image: Image) -> Self {
        self.image = image;
        self
    }
}
