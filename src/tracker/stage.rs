use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

/// A named phase of the nightly pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Scrape,
    Enrich,
    Deduplicate,
    Mockup,
    Personalize,
    Email,
}

impl Stage {
    /// Comma separated list of the recognized stage names
    #[must_use]
    pub fn names() -> String {
        Self::VARIANTS.join(", ")
    }
}
