use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::archetype::Archetype;
use crate::compare;
use crate::dataset::Dataset;
use crate::error::{DashboardError, Result};
use crate::explain::{action_text, explain};
use crate::models::{
    ComparisonRow, CorrelationMap, EngagementLevel, Recommendation, RecommendationSummary,
};
use crate::scoring::{self, FOCUS_LIMIT};

#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub student_id: String,
    pub course: String,
    pub archetype: Archetype,
    pub archetype_color: &'static str,
    pub archetype_emoji: &'static str,
    pub outcome: String,
    pub passed: bool,
    pub archetype_success_rate: Option<f64>,
}

/// A scored recommendation together with everything needed to present it.
#[derive(Debug, Clone, Serialize)]
pub struct PlanItem {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub gap_percent: f64,
    pub progress: f64,
    pub explanations: Vec<String>,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentPlan {
    pub profile: StudentProfile,
    pub template_missing: bool,
    pub summary: RecommendationSummary,
    pub recommendations: Vec<PlanItem>,
    pub comparison: Vec<ComparisonRow>,
    /// Charted activities with template targets alongside.
    pub engagement: Vec<EngagementLevel>,
    /// Every activity, lowest engagement first.
    pub engagement_detail: Vec<EngagementLevel>,
}

impl StudentPlan {
    pub fn focus(&self) -> &[PlanItem] {
        &self.recommendations[..self.recommendations.len().min(FOCUS_LIMIT)]
    }
}

/// Score one student against their archetype's template.
///
/// A missing template is not an error here: the plan comes back with
/// `template_missing` set so the caller can say so.
pub fn build_plan(dataset: &Dataset, student_id: &str) -> Result<StudentPlan> {
    let student = dataset.student(student_id)?;
    let engagement = dataset.engagement_for(student_id)?;
    let archetype = &student.archetype;

    let profile = StudentProfile {
        student_id: student.student_id.clone(),
        course: student.course().to_string(),
        archetype: archetype.clone(),
        archetype_color: archetype.color(),
        archetype_emoji: archetype.emoji(),
        outcome: student.outcome().to_string(),
        passed: student.passed(),
        archetype_success_rate: dataset.success_rate(archetype),
    };

    let template = match dataset.template_for(archetype) {
        Ok(template) => template,
        Err(DashboardError::MissingTemplate { .. }) => {
            warn!(student = student_id, archetype = %archetype, "no success template");
            return Ok(StudentPlan {
                profile,
                template_missing: true,
                summary: scoring::summarize(&[]),
                recommendations: Vec::new(),
                comparison: Vec::new(),
                engagement: compare::visible_engagement(engagement, None),
                engagement_detail: compare::engagement_by_level(engagement, None),
            });
        }
        Err(err) => return Err(err),
    };

    let recommendations = scoring::compute_recommendations(
        engagement,
        template,
        dataset.correlations.as_ref(),
    );
    let summary = scoring::summarize(&recommendations);
    let items = recommendations
        .into_iter()
        .map(|rec| PlanItem {
            gap_percent: scoring::gap_percent(&rec),
            progress: scoring::progress(&rec),
            explanations: explain(&rec, archetype),
            action: action_text(&rec.activity).into_owned(),
            recommendation: rec,
        })
        .collect();

    Ok(StudentPlan {
        profile,
        template_missing: false,
        summary,
        recommendations: items,
        comparison: compare::peer_comparison(engagement, template),
        engagement: compare::visible_engagement(engagement, Some(template)),
        engagement_detail: compare::engagement_by_level(engagement, Some(template)),
    })
}

/// Terminal rendering of the recommendations section.
pub fn render_recommendations(plan: &StudentPlan, limit: usize) -> String {
    let mut output = String::new();
    let profile = &plan.profile;

    let _ = writeln!(
        output,
        "{} {} ({}, course {}, outcome {})",
        profile.archetype_emoji,
        profile.student_id,
        profile.archetype,
        profile.course,
        profile.outcome
    );
    if let Some(rate) = profile.archetype_success_rate {
        let _ = writeln!(output, "Archetype success rate: {:.1}%", rate * 100.0);
    }
    let _ = writeln!(output);

    if plan.template_missing {
        let _ = writeln!(
            output,
            "No success template available for archetype: {}",
            profile.archetype
        );
        return output;
    }

    if plan.recommendations.is_empty() {
        let _ = writeln!(
            output,
            "Great job! You're meeting or exceeding targets in all areas!"
        );
        return output;
    }

    let shown = plan.recommendations.len().min(limit);
    let _ = writeln!(
        output,
        "Summary: Focus on these {} areas. Total engagement gap: {:.2}",
        shown, plan.summary.total_gap
    );

    for (i, item) in plan.recommendations.iter().take(limit).enumerate() {
        let rec = &item.recommendation;
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Priority {}: {} (Gap: {:.3})",
            i + 1,
            rec.activity.to_uppercase(),
            rec.gap
        );
        let _ = writeln!(
            output,
            "  current {:.3} / target {:.3} ({:.0}% of target)",
            rec.current,
            rec.target,
            item.progress * 100.0
        );
        for line in &item.explanations {
            let _ = writeln!(output, "  - {line}");
        }
        let _ = writeln!(output, "  Action: {}", item.action);
    }

    output
}

pub fn render_comparison(rows: &[ComparisonRow]) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<16} {:>8} {:>10} {:>8}  Status",
        "Activity", "You", "Peers", "Gap"
    );
    for row in rows {
        let _ = writeln!(
            output,
            "{:<16} {:>8.3} {:>10.3} {:>+8.3}  {}",
            row.activity, row.you, row.successful_peers, row.gap, row.status
        );
    }
    output
}

pub fn render_correlations(correlations: Option<&CorrelationMap>) -> String {
    let mut output = String::new();
    let Some(correlations) = correlations else {
        let _ = writeln!(output, "Activity correlation data not available.");
        return output;
    };

    for entry in compare::ranked_correlations(correlations) {
        let _ = writeln!(
            output,
            "- {}: {:+.2} ({})",
            entry.activity, entry.correlation, entry.tier
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Strong (>0.3): activities strongly linked to success");
    let _ = writeln!(output, "Moderate (0.1-0.3): activities with some impact");
    let _ = writeln!(output, "Weak (<0.1): less impact on success");
    output
}

pub fn build_report(
    plan: &StudentPlan,
    correlations: Option<&CorrelationMap>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    let profile = &plan.profile;

    let _ = writeln!(output, "# Skill Gap Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        profile.student_id,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Profile");
    let _ = writeln!(output, "- Course: {}", profile.course);
    let _ = writeln!(
        output,
        "- Archetype: {} {} ({})",
        profile.archetype_emoji, profile.archetype, profile.archetype_color
    );
    let _ = writeln!(output, "- Outcome: {}", profile.outcome);
    if let Some(rate) = profile.archetype_success_rate {
        let _ = writeln!(output, "- Archetype success rate: {:.1}%", rate * 100.0);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Engagement");
    if plan.engagement.is_empty() {
        let _ = writeln!(output, "No engagement recorded.");
    } else {
        for entry in &plan.engagement {
            match entry.target {
                Some(target) => {
                    let _ = writeln!(
                        output,
                        "- {}: {:.3} (successful peers {:.3})",
                        entry.activity, entry.level, target
                    );
                }
                None => {
                    let _ = writeln!(output, "- {}: {:.3}", entry.activity, entry.level);
                }
            }
        }
    }

    if !plan.engagement_detail.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Detailed Engagement by Activity");
        let _ = writeln!(output, "| Activity | Engagement |");
        let _ = writeln!(output, "|---|---|");
        for entry in &plan.engagement_detail {
            let _ = writeln!(output, "| {} | {:.3} |", entry.activity, entry.level);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    if plan.template_missing {
        let _ = writeln!(
            output,
            "No success template available for archetype: {}",
            profile.archetype
        );
    } else if plan.recommendations.is_empty() {
        let _ = writeln!(
            output,
            "Great job! You're meeting or exceeding targets in all areas!"
        );
    } else {
        let _ = writeln!(
            output,
            "Focus on these {} areas. Total engagement gap: {:.2}",
            plan.summary.focus_count, plan.summary.total_gap
        );
        for (i, item) in plan.focus().iter().enumerate() {
            let rec = &item.recommendation;
            let _ = writeln!(output);
            let _ = writeln!(
                output,
                "### Priority {}: {} (Gap: {:.3})",
                i + 1,
                rec.activity.to_uppercase(),
                rec.gap
            );
            let _ = writeln!(
                output,
                "Current {:.3}, target {:.3}, progress {:.0}%",
                rec.current,
                rec.target,
                item.progress * 100.0
            );
            let _ = writeln!(output);
            let _ = writeln!(output, "Why this matters:");
            for line in &item.explanations {
                let _ = writeln!(output, "- {line}");
            }
            let _ = writeln!(output);
            let _ = writeln!(output, "Recommended action: {}", item.action);
        }
    }

    if !plan.comparison.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Peer Comparison");
        let _ = writeln!(output, "| Activity | You | Successful Peers | Gap | Status |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for row in &plan.comparison {
            let _ = writeln!(
                output,
                "| {} | {:.3} | {:.3} | {:+.3} | {} |",
                row.activity, row.you, row.successful_peers, row.gap, row.status
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Activity Correlations");
    output.push_str(&render_correlations(correlations));

    output
}
