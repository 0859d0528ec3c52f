use std::collections::HashMap;

use indexmap::IndexMap;

use crate::archetype::Archetype;
use crate::error::{DashboardError, Result};
use crate::models::{CorrelationMap, EngagementVector, StudentRecord, SuccessTemplate};

/// Everything the dashboard reads, loaded once per invocation.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub students: Vec<StudentRecord>,
    pub engagement: IndexMap<String, EngagementVector>,
    pub templates: IndexMap<Archetype, SuccessTemplate>,
    pub correlations: Option<CorrelationMap>,
    pub success_rates: HashMap<Archetype, f64>,
}

impl Dataset {
    pub fn student(&self, student_id: &str) -> Result<&StudentRecord> {
        self.students
            .iter()
            .find(|s| s.student_id == student_id)
            .ok_or_else(|| DashboardError::UnknownStudent(student_id.to_string()))
    }

    pub fn engagement_for(&self, student_id: &str) -> Result<&EngagementVector> {
        self.engagement
            .get(student_id)
            .ok_or_else(|| DashboardError::MissingEngagement(student_id.to_string()))
    }

    pub fn template_for(&self, archetype: &Archetype) -> Result<&SuccessTemplate> {
        self.templates
            .get(archetype)
            .ok_or_else(|| DashboardError::MissingTemplate {
                archetype: archetype.to_string(),
            })
    }

    pub fn success_rate(&self, archetype: &Archetype) -> Option<f64> {
        self.success_rates.get(archetype).copied()
    }

    /// Archetypes in order of first appearance among the students.
    pub fn archetypes(&self) -> Vec<&Archetype> {
        let mut seen: Vec<&Archetype> = Vec::new();
        for student in &self.students {
            if !seen.contains(&&student.archetype) {
                seen.push(&student.archetype);
            }
        }
        seen
    }

    pub fn students_in<'a>(
        &'a self,
        archetype: Option<&'a Archetype>,
    ) -> impl Iterator<Item = &'a StudentRecord> + 'a {
        self.students
            .iter()
            .filter(move |s| archetype.map_or(true, |a| &s.archetype == a))
    }
}
