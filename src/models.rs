use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;

/// A student's normalized engagement level per activity, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngagementVector(IndexMap<String, f64>);

impl EngagementVector {
    pub fn insert(&mut self, activity: impl Into<String>, level: f64) {
        self.0.insert(activity.into(), level);
    }

    pub fn get(&self, activity: &str) -> Option<f64> {
        self.0.get(activity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(activity, level)| (activity.as_str(), *level))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for EngagementVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Target engagement per activity for successful students of one archetype.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuccessTemplate(IndexMap<String, f64>);

impl SuccessTemplate {
    pub fn insert(&mut self, activity: impl Into<String>, target: f64) {
        self.0.insert(activity.into(), target);
    }

    pub fn get(&self, activity: &str) -> Option<f64> {
        self.0.get(activity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(activity, target)| (activity.as_str(), *target))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for SuccessTemplate {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Historical correlation between each activity and course success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMap(IndexMap<String, f64>);

impl CorrelationMap {
    pub fn insert(&mut self, activity: impl Into<String>, correlation: f64) {
        self.0.insert(activity.into(), correlation);
    }

    pub fn get(&self, activity: &str) -> Option<f64> {
        self.0.get(activity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(activity, corr)| (activity.as_str(), *corr))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for CorrelationMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub activity: String,
    pub current: f64,
    pub target: f64,
    pub gap: f64,
    pub correlation: f64,
    pub priority_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationSummary {
    pub focus_count: usize,
    pub total_gap: f64,
}

/// One row of the cluster assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub student_id: String,
    pub archetype: Archetype,
    pub final_result: Option<String>,
}

impl StudentRecord {
    /// Course code embedded in ids shaped like `11391_AAA_2013J`.
    pub fn course(&self) -> &str {
        match self.student_id.split_once('_') {
            Some((_, course)) => course,
            None => "Unknown",
        }
    }

    pub fn outcome(&self) -> &str {
        self.final_result.as_deref().unwrap_or("Unknown")
    }

    pub fn passed(&self) -> bool {
        matches!(self.outcome(), "Pass" | "Distinction")
    }
}

/// A student's level on one activity, with the archetype's target beside it
/// when a template exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementLevel {
    pub activity: String,
    pub level: f64,
    pub target: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapStatus {
    AboveTarget,
    Close,
    BelowTarget,
}

impl fmt::Display for GapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GapStatus::AboveTarget => "Above Target",
            GapStatus::Close => "Close",
            GapStatus::BelowTarget => "Below Target",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub activity: String,
    pub you: f64,
    pub successful_peers: f64,
    pub gap: f64,
    pub status: GapStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationTier {
    Strong,
    Moderate,
    Weak,
}

impl fmt::Display for CorrelationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CorrelationTier::Strong => "strong",
            CorrelationTier::Moderate => "moderate",
            CorrelationTier::Weak => "weak",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCorrelation {
    pub activity: String,
    pub correlation: f64,
    pub tier: CorrelationTier,
}
