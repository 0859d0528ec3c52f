use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const FALLBACK_COLOR: &str = "#95a5a6";
pub const FALLBACK_EMOJI: &str = "👤";

/// Behavior cluster a student was assigned to.
///
/// Labels outside the known set are kept verbatim in `Other` so they survive
/// a parse/display round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Archetype {
    HighPerformer,
    TalentedButInconsistent,
    ModeratePerformer,
    EarlyStruggler,
    DisengagedAtRisk,
    Other(String),
}

impl Archetype {
    pub const KNOWN: [Archetype; 5] = [
        Archetype::HighPerformer,
        Archetype::TalentedButInconsistent,
        Archetype::ModeratePerformer,
        Archetype::EarlyStruggler,
        Archetype::DisengagedAtRisk,
    ];

    pub fn parse(label: &str) -> Self {
        match label {
            "High Performer" => Archetype::HighPerformer,
            "Talented but Inconsistent" => Archetype::TalentedButInconsistent,
            "Moderate Performer" => Archetype::ModeratePerformer,
            "Early Struggler" => Archetype::EarlyStruggler,
            "Disengaged At-Risk" => Archetype::DisengagedAtRisk,
            other => Archetype::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Archetype::HighPerformer => "High Performer",
            Archetype::TalentedButInconsistent => "Talented but Inconsistent",
            Archetype::ModeratePerformer => "Moderate Performer",
            Archetype::EarlyStruggler => "Early Struggler",
            Archetype::DisengagedAtRisk => "Disengaged At-Risk",
            Archetype::Other(label) => label,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Archetype::HighPerformer => "#2ecc71",
            Archetype::TalentedButInconsistent => "#f39c12",
            Archetype::ModeratePerformer => "#3498db",
            Archetype::EarlyStruggler => "#e74c3c",
            Archetype::DisengagedAtRisk => "#9b59b6",
            Archetype::Other(_) => FALLBACK_COLOR,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Archetype::HighPerformer => "🌟",
            Archetype::TalentedButInconsistent => "⚡",
            Archetype::ModeratePerformer => "📚",
            Archetype::EarlyStruggler => "🔧",
            Archetype::DisengagedAtRisk => "⚠️",
            Archetype::Other(_) => FALLBACK_EMOJI,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Archetype {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Archetype::parse(s))
    }
}

impl From<String> for Archetype {
    fn from(label: String) -> Self {
        match Archetype::parse(&label) {
            Archetype::Other(_) => Archetype::Other(label),
            known => known,
        }
    }
}

impl From<Archetype> for String {
    fn from(archetype: Archetype) -> Self {
        match archetype {
            Archetype::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}
