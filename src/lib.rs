//! Skill-gap scoring for personalized learning recommendations.
//!
//! The core is three pure functions: [`scoring::compute_recommendations`],
//! [`explain::explain`] and [`explain::action_text`]. Everything else loads
//! the precomputed artifacts they consume or presents what they return.

pub mod archetype;
pub mod compare;
pub mod data;
pub mod dataset;
pub mod db;
pub mod error;
pub mod explain;
pub mod models;
pub mod report;
pub mod scoring;

pub use archetype::Archetype;
pub use error::DashboardError;
pub use explain::{action_text, explain};
pub use models::{CorrelationMap, EngagementVector, Recommendation, SuccessTemplate};
pub use scoring::compute_recommendations;
